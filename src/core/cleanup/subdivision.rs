//! The subdivision algorithm (spec §4.12): splitting an overfull
//! alphabetic-sort directory into balanced `Xx-Yy` ranges. Ground-truthed
//! line-for-line on `examples/original_source/src/services/cleanup/
//! subdivision_algorithm.py` (`_parse_parent_range`,
//! `_find_sibling_for_key`, `_refine_out_of_range_dest`,
//! `_refine_plans_destinations`, `calculate_subdivision_ranges`). Kept
//! synchronous and pure (spec §5): callers pre-list directory entries via
//! [`crate::core::fs_port::Filesystem`] and pass them in.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::entities::SubdivisionPlan;
use crate::core::text_normalize::{sort_key, strip_accents};

lazy_static! {
    static ref RANGE_PATTERN: Regex = Regex::new(r"^(?i)([A-Za-z]{1,3})-([A-Za-z]{1,3})$").unwrap();
    static ref SINGLE_LETTER: Regex = Regex::new(r"^(?i)([A-Za-z])$").unwrap();
}

/// Parses a parent directory name into its 2-letter sort-key range (spec
/// §4.12): `"C"` → `("CA","CZ")`, `"E-F"` → `("EA","FZ")`,
/// `"L-Ma"` → `("LA","MA")`, anything else (a genre folder, `"#"`, ...)
/// → `("AA","ZZ")` (accept-everything fallback).
pub fn parse_parent_range(dir_name: &str) -> (String, String) {
    let clean = strip_accents(dir_name);

    if let Some(cap) = RANGE_PATTERN.captures(&clean) {
        let start_part = cap[1].to_uppercase();
        let end_part = cap[2].to_uppercase();
        let start = if start_part.len() == 1 {
            format!("{}A", &start_part[..1])
        } else {
            start_part[..2].to_string()
        };
        let end = if end_part.len() == 1 {
            format!("{}Z", &end_part[..1])
        } else {
            end_part[..2].to_string()
        };
        return (start, end);
    }

    if let Some(cap) = SINGLE_LETTER.captures(&clean) {
        let letter = cap[1].to_uppercase();
        return (format!("{letter}A"), format!("{letter}Z"));
    }

    ("AA".to_string(), "ZZ".to_string())
}

/// Whether `name` is itself an alphabetic range/single-letter directory
/// name (`"C"`, `"E-F"`), as opposed to a genre or prefix-group folder
/// (spec §4.12, reused by the Prefix Grouper to skip already-subdivided
/// directories).
pub fn is_range_dir(name: &str) -> bool {
    let clean = strip_accents(name);
    RANGE_PATTERN.is_match(&clean) || SINGLE_LETTER.is_match(&clean)
}

/// Key used to sort/bucket a directory entry's name (spec §4.12): strip
/// article, strip accents, letters only, 2 chars, padded with `A`.
fn entry_sort_key(name: &str) -> String {
    sort_key(name)
}

/// Finds which sibling of `parent_dir` a given `sort_key` belongs to by
/// scanning `siblings` (already listed, directories only, `parent_dir`
/// excluded) for one whose parsed range contains it; falls back to the
/// grandparent when no sibling matches (spec §4.12).
pub fn find_sibling_for_key(parent_dir: &Path, siblings: &[PathBuf], key: &str) -> PathBuf {
    let mut sorted_siblings = siblings.to_vec();
    sorted_siblings.sort();

    for sibling in &sorted_siblings {
        let Some(name) = sibling.file_name().and_then(|n| n.to_str()) else { continue };
        if !name.chars().next().is_some_and(|c| c.is_alphabetic()) {
            continue;
        }
        let (start, end) = parse_parent_range(name);
        if start.as_str() <= key && key <= end.as_str() {
            return sibling.clone();
        }
    }

    parent_dir.parent().map(Path::to_path_buf).unwrap_or_else(|| parent_dir.to_path_buf())
}

/// Refines an out-of-range item's destination when the target directory
/// has itself been subdivided into `Xx-Yy` ranges (spec §4.12):
/// `target_subdirs` lists the target directory's own subdirectories
/// (already listed, directories only).
pub fn refine_out_of_range_dest(planned_dest: &Path, target_subdirs: &[PathBuf]) -> PathBuf {
    let Some(item_name) = planned_dest.file_name().and_then(|n| n.to_str()) else {
        return planned_dest.to_path_buf();
    };

    let mut range_subdirs: Vec<&PathBuf> = target_subdirs
        .iter()
        .filter(|d| {
            d.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| parse_parent_range(n) != ("AA".to_string(), "ZZ".to_string()))
        })
        .collect();
    if range_subdirs.is_empty() {
        return planned_dest.to_path_buf();
    }
    range_subdirs.sort();

    let key = entry_sort_key(item_name);
    for subdir in range_subdirs {
        let Some(name) = subdir.file_name().and_then(|n| n.to_str()) else { continue };
        let (start, end) = parse_parent_range(name);
        if start.as_str() <= key.as_str() && key.as_str() <= end.as_str() {
            return subdir.join(item_name);
        }
    }

    planned_dest.to_path_buf()
}

/// Re-resolves every plan's out-of-range items against the completed set
/// of plans (spec §4.12): if an item's planned destination directory is
/// itself being subdivided by another plan in this batch, redirect it
/// into the matching sub-range.
pub fn refine_plans_destinations(plans: &mut [SubdivisionPlan]) {
    let snapshot: Vec<SubdivisionPlan> = plans.to_vec();

    for plan in plans.iter_mut() {
        for (_, dest) in plan.out_of_range_items.iter_mut() {
            let Some(target_dir) = dest.parent() else { continue };
            let Some(item_name) = dest.file_name().and_then(|n| n.to_str()) else { continue };

            let Some(target_plan) = snapshot.iter().find(|p| p.parent_dir == target_dir) else { continue };

            let key = entry_sort_key(item_name);
            for (start, end) in &target_plan.ranges {
                let range_start = if start.len() == 1 { format!("{start}A") } else { start.to_uppercase() };
                let range_end = if end.len() == 1 { format!("{end}Z") } else { end.to_uppercase() };
                if range_start.as_str() <= key.as_str() && key.as_str() <= range_end.as_str() {
                    *dest = target_dir.join(format!("{start}-{end}")).join(item_name);
                    break;
                }
            }
        }
    }
}

/// Computes a subdivision plan for `parent_dir` given its already-listed
/// direct entries (spec §4.12): balanced groups (`ceil(n/max)`, minimum
/// 2), remainder distributed to the first groups, cuts adjusted
/// forward-then-backward so a run of identical keys is never split, the
/// first/last group's bound forced to the parent's own range, and every
/// out-of-range item routed to a sibling (or the grandparent).
pub fn calculate_subdivision_ranges(
    parent_dir: &Path,
    entries: &[PathBuf],
    max_per_subdir: usize,
    siblings: &[PathBuf],
) -> SubdivisionPlan {
    let mut keyed: Vec<(String, PathBuf)> = entries
        .iter()
        .filter_map(|item| {
            let name = item.file_name()?.to_str()?;
            Some((entry_sort_key(name), item.clone()))
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let parent_name = parent_dir.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let (parent_start, parent_end) = parse_parent_range(parent_name);

    let mut in_range: Vec<(String, PathBuf)> = Vec::new();
    let mut out_of_range: Vec<(PathBuf, PathBuf)> = Vec::new();
    for (key, item) in &keyed {
        if parent_start.as_str() <= key.as_str() && key.as_str() <= parent_end.as_str() {
            in_range.push((key.clone(), item.clone()));
        } else {
            let dest_dir = find_sibling_for_key(parent_dir, siblings, key);
            let item_name = item.file_name().map(PathBuf::from).unwrap_or_default();
            out_of_range.push((item.clone(), dest_dir.join(item_name)));
        }
    }
    in_range.sort_by(|a, b| a.0.cmp(&b.0));

    if in_range.is_empty() {
        return SubdivisionPlan {
            parent_dir: parent_dir.to_path_buf(),
            current_count: keyed.len(),
            max_allowed: max_per_subdir,
            ranges: Vec::new(),
            items_to_move: Vec::new(),
            out_of_range_items: out_of_range,
        };
    }

    let total = in_range.len();
    let num_groups = (total + max_per_subdir - 1) / max_per_subdir.max(1);
    let num_groups = num_groups.max(2);

    let base_size = total / num_groups;
    let remainder = total % num_groups;

    let mut ranges: Vec<(String, String)> = Vec::new();
    let mut moves: Vec<(PathBuf, PathBuf)> = Vec::new();

    let mut idx = 0usize;
    for g in 0..num_groups {
        let group_size = base_size + usize::from(g < remainder);
        if group_size == 0 {
            continue;
        }

        let mut group_end = idx + group_size;

        if g < num_groups - 1 && group_end < total {
            let current_key = in_range[group_end - 1].0.clone();
            while group_end < total && in_range[group_end].0 == current_key {
                group_end += 1;
            }
            if group_end >= total && g < num_groups - 1 {
                group_end = idx + group_size;
                let current_key = in_range[group_end - 1].0.clone();
                while group_end > idx + 1 && in_range[group_end - 1].0 == current_key {
                    group_end -= 1;
                }
            }
        }

        let group = &in_range[idx..group_end];
        if group.is_empty() {
            continue;
        }

        let start_key = if g == 0 { parent_start.clone() } else { group[0].0.clone() };
        let end_key = if g == num_groups - 1 || group_end >= total {
            parent_end.clone()
        } else {
            group.last().unwrap().0.clone()
        };

        let start_label = capitalize(&start_key);
        let end_label = capitalize(&end_key);
        let range_label = format!("{start_label}-{end_label}");
        let dest = parent_dir.join(&range_label);

        for (_, item) in group {
            let item_name = item.file_name().map(PathBuf::from).unwrap_or_default();
            moves.push((item.clone(), dest.join(item_name)));
        }
        ranges.push((start_label, end_label));

        idx = group_end;
        if idx >= total {
            break;
        }
    }

    SubdivisionPlan {
        parent_dir: parent_dir.to_path_buf(),
        current_count: keyed.len(),
        max_allowed: max_per_subdir,
        ranges,
        items_to_move: moves,
        out_of_range_items: out_of_range,
    }
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_letter_range() {
        assert_eq!(parse_parent_range("C"), ("CA".to_string(), "CZ".to_string()));
    }

    #[test]
    fn parses_letter_pair_range() {
        assert_eq!(parse_parent_range("E-F"), ("EA".to_string(), "FZ".to_string()));
        assert_eq!(parse_parent_range("L-Ma"), ("LA".to_string(), "MA".to_string()));
    }

    #[test]
    fn non_range_name_accepts_everything() {
        assert_eq!(parse_parent_range("Action"), ("AA".to_string(), "ZZ".to_string()));
    }

    #[test]
    fn balances_groups_with_remainder() {
        let entries: Vec<PathBuf> = ('a'..='z').map(|c| PathBuf::from(format!("/S/{c}how"))).collect();
        let plan = calculate_subdivision_ranges(Path::new("/storage/S"), &entries, 10, &[]);
        assert!(plan.ranges.len() >= 2);
        assert_eq!(plan.ranges.first().unwrap().0, "Sa");
        assert_eq!(plan.ranges.last().unwrap().1, "Sz");
        let total_moved: usize = plan.items_to_move.len();
        assert_eq!(total_moved, 26);
    }

    #[test]
    fn out_of_range_item_routes_to_sibling() {
        let entries = vec![PathBuf::from("/storage/S-Z/Jadotville")];
        let siblings = vec![PathBuf::from("/storage/A-R")];
        let plan = calculate_subdivision_ranges(Path::new("/storage/S-Z"), &entries, 10, &siblings);
        assert_eq!(plan.out_of_range_items.len(), 1);
        assert_eq!(plan.out_of_range_items[0].1, PathBuf::from("/storage/A-R/Jadotville"));
    }
}
