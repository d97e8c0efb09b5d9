//! Validation Engine (spec §4.6): the auto-validation decision, and the
//! cascade/send-back propagation across sibling episodes of the same
//! series. Kept as pure, synchronous functions operating on
//! [`PendingValidation`] collections passed in by the caller — this
//! crate has no equivalent `validation_service.py` in the retrieved
//! corpus, so the decision rule is ground-truthed directly on spec §4.6's
//! prose and the Open Question resolution recorded in `SPEC_FULL.md`
//! (5-point "clearly ahead" margin), following the teacher's preference
//! for small, independently testable core functions (`core::organizer`,
//! `core::matcher`) over a stateful service object.

use crate::core::entities::PendingValidation;
use crate::core::value_objects::SearchHit;

/// Whether `candidates` (score-descending) qualify for auto-validation
/// (spec §4.6): the top scores at least `threshold`, and no other
/// candidate comes within `margin` points of it. Returns the id to
/// validate against.
pub fn decide_auto_validate(candidates: &[SearchHit], threshold: f64, margin: f64) -> Option<&str> {
    let top = candidates.first()?;
    if top.score < threshold {
        return None;
    }
    let clearly_ahead = candidates
        .get(1)
        .map(|second| top.score - second.score >= margin)
        .unwrap_or(true);
    clearly_ahead.then_some(top.id.as_str())
}

/// Refinement for series (spec §4.6): a single remaining TVDB-shaped
/// candidate is accepted even below `threshold`, because episode-count
/// filtering (`core::matcher::score_series_results`) already did most of
/// the discriminating work by eliminating incompatible seasons.
pub fn decide_auto_validate_series(candidates: &[SearchHit], threshold: f64, margin: f64) -> Option<&str> {
    if candidates.len() == 1 {
        return Some(candidates[0].id.as_str());
    }
    decide_auto_validate(candidates, threshold, margin)
}

/// Applies a manual validation to `target` and cascades it across every
/// other still-pending item in `siblings` whose candidate list contains
/// `chosen_candidate_id` (spec §4.6) — each sibling is validated against
/// its *own* copy of that candidate, preserving its own per-file score.
/// Returns the ids of the siblings that were cascaded (not including
/// `target`).
pub fn validate_and_cascade(
    target: &mut PendingValidation,
    chosen_candidate_id: &str,
    siblings: &mut [&mut PendingValidation],
) -> crate::error::Result<Vec<crate::core::entities::PendingValidationId>> {
    target.validate(chosen_candidate_id, false)?;

    let mut cascaded = Vec::new();
    for sibling in siblings.iter_mut() {
        if sibling.id == target.id {
            continue;
        }
        if sibling.candidates.iter().any(|c| c.id == chosen_candidate_id) {
            sibling.validate(chosen_candidate_id, true)?;
            cascaded.push(sibling.id.clone());
        }
    }
    Ok(cascaded)
}

/// Inverse of [`validate_and_cascade`] (spec §4.6): sending a validated
/// item back to pending also sends back every other item that shares its
/// `selected_candidate_id`.
pub fn send_back_and_cascade(target: &mut PendingValidation, siblings: &mut [&mut PendingValidation]) {
    let shared_id = target.selected_candidate_id.clone();
    target.send_back();

    let Some(shared_id) = shared_id else {
        return;
    };
    for sibling in siblings.iter_mut() {
        if sibling.id == target.id {
            continue;
        }
        if sibling.selected_candidate_id.as_deref() == Some(shared_id.as_str()) {
            sibling.send_back();
        }
    }
}

/// Synthesizes a score-100 candidate from an explicit catalog id, per the
/// manual loop's `external-id` action (spec §4.6).
pub fn candidate_from_external_id(details: &crate::core::value_objects::MediaDetails, source: &str) -> SearchHit {
    SearchHit {
        id: details.id.clone(),
        title: details.title.clone(),
        original_title: details.original_title.clone(),
        year: details.year,
        source: source.to_string(),
        score: 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, score: f64) -> SearchHit {
        SearchHit {
            id: id.to_string(),
            title: "Title".to_string(),
            original_title: None,
            year: None,
            source: "movies".to_string(),
            score,
        }
    }

    #[test]
    fn auto_validates_clear_leader() {
        let candidates = vec![hit("a", 95.0), hit("b", 60.0)];
        assert_eq!(decide_auto_validate(&candidates, 85.0, 5.0), Some("a"));
    }

    #[test]
    fn rejects_ambiguous_top_two() {
        let candidates = vec![hit("a", 90.0), hit("b", 88.0)];
        assert_eq!(decide_auto_validate(&candidates, 85.0, 5.0), None);
    }

    #[test]
    fn rejects_below_threshold() {
        let candidates = vec![hit("a", 80.0)];
        assert_eq!(decide_auto_validate(&candidates, 85.0, 5.0), None);
    }

    #[test]
    fn series_single_survivor_bypasses_threshold() {
        let candidates = vec![hit("a", 40.0)];
        assert_eq!(decide_auto_validate_series(&candidates, 85.0, 5.0), Some("a"));
    }

    #[test]
    fn cascade_validates_siblings_sharing_candidate() {
        let mut target = PendingValidation::new(crate::core::entities::VideoFile::new(
            "/d/Show.S01E01.mkv".into(),
            100,
        ));
        target.candidates = vec![hit("tvdb-1", 90.0)];

        let mut sibling = PendingValidation::new(crate::core::entities::VideoFile::new(
            "/d/Show.S01E02.mkv".into(),
            100,
        ));
        sibling.candidates = vec![hit("tvdb-1", 70.0)];

        let mut unrelated = PendingValidation::new(crate::core::entities::VideoFile::new(
            "/d/Other.S01E01.mkv".into(),
            100,
        ));
        unrelated.candidates = vec![hit("tvdb-2", 90.0)];

        let mut siblings = vec![&mut sibling, &mut unrelated];
        let cascaded = validate_and_cascade(&mut target, "tvdb-1", &mut siblings).unwrap();

        assert_eq!(cascaded, vec![sibling_id(&siblings, 0)]);
        assert!(siblings[0].auto_validated);
        assert_eq!(siblings[1].validation_status, crate::core::entities::ValidationStatus::Pending);
    }

    fn sibling_id(
        siblings: &[&mut PendingValidation],
        index: usize,
    ) -> crate::core::entities::PendingValidationId {
        siblings[index].id.clone()
    }

    #[test]
    fn send_back_cascades_to_shared_candidate() {
        let mut target = PendingValidation::new(crate::core::entities::VideoFile::new(
            "/d/Show.S01E01.mkv".into(),
            100,
        ));
        target.candidates = vec![hit("tvdb-1", 90.0)];
        target.validate("tvdb-1", false).unwrap();

        let mut sibling = PendingValidation::new(crate::core::entities::VideoFile::new(
            "/d/Show.S01E02.mkv".into(),
            100,
        ));
        sibling.candidates = vec![hit("tvdb-1", 70.0)];
        sibling.validate("tvdb-1", true).unwrap();

        let mut siblings = vec![&mut sibling];
        send_back_and_cascade(&mut target, &mut siblings);

        assert_eq!(target.validation_status, crate::core::entities::ValidationStatus::Pending);
        assert_eq!(siblings[0].validation_status, crate::core::entities::ValidationStatus::Pending);
    }
}
