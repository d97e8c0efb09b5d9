//! Preflight checks module.

mod ffprobe;

use colored::Colorize;

use crate::config::Config;

/// Result of a preflight check.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub success: bool,
    pub message: String,
    pub hint: Option<String>,
}

impl CheckResult {
    pub fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            success: true,
            message: message.to_string(),
            hint: None,
        }
    }

    pub fn fail(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }
}

/// Run all preflight checks. Unlike the managed-directory check in
/// `Config::validate` (fatal, spec §6), a missing catalog key is only
/// surfaced here as a warning: the pipeline still runs, those items just
/// stay pending (spec §6: "that catalog is disabled").
pub fn run_preflight_checks(config: &Config) -> Vec<CheckResult> {
    vec![
        ffprobe::check(),
        catalog_check("TMDB", config.tmdb.is_some()),
        catalog_check("TVDB", config.tvdb.is_some()),
    ]
}

fn catalog_check(name: &'static str, configured: bool) -> CheckResult {
    if configured {
        CheckResult::ok(name, "API key configured")
    } else {
        CheckResult::fail(
            name,
            "API key not configured",
            &format!("set CINEORG_{name}_API_KEY to enable this catalog"),
        )
    }
}

/// Print preflight check results.
pub fn print_results(results: &[CheckResult]) {
    for result in results {
        if result.success {
            println!("{} {}: {}", "[OK]".green(), result.name.bold(), result.message);
        } else {
            println!("{} {}: {}", "[WARN]".yellow(), result.name.bold(), result.message);
            if let Some(ref hint) = result.hint {
                println!("  {} {}", "->".yellow(), hint);
            }
        }
    }
}

/// Whether the blocking checks passed. Catalog checks are advisory only
/// (spec §6: a missing key disables that catalog, it does not abort the
/// run); only a missing `ffprobe` is reported as a failure here, and even
/// that is not fatal to `main` — a failed probe is non-fatal to a scan
/// (spec §4.4), so the caller only uses this to decide whether to print a
/// louder warning, not whether to exit.
pub fn all_passed(results: &[CheckResult]) -> bool {
    results.iter().all(|r| r.success || r.name != "ffprobe")
}
