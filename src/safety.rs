// src/safety.rs

//! Pattern safety gate.
//!
//! A stateless denylist classifier over generated source text. Each entry is a
//! case-insensitive regex; the pattern source doubles as the issue id reported
//! back to callers, so `rm -rf /` is reported as `rm\s+-rf`.
//!
//! An empty result only means that no *known* dangerous signature matched.
//! The gate is trivially bypassed by obfuscation and is not a security
//! boundary; it exists to keep obviously destructive output away from the
//! sandbox.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Denylist, in reporting order.
pub const DANGEROUS_PATTERNS: &[&str] = &[
    // recursive force delete (POSIX)
    r"rm\s+-rf",
    // recursive force remove (PowerShell)
    r"Remove-Item\s+-Recurse",
    r"Format-Volume",
    r"Format-Drive",
    r"shutdown",
    r"\breboot\b",
    // absolute-path destructive write
    r"Set-Content\s+-Path\s+C:\\",
    r"DeleteFile",
];

static COMPILED: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    DANGEROUS_PATTERNS
        .iter()
        .filter_map(|pat| {
            match RegexBuilder::new(pat).case_insensitive(true).build() {
                Ok(re) => Some((*pat, re)),
                Err(e) => {
                    tracing::error!(pattern = %pat, error = %e, "invalid denylist pattern");
                    None
                }
            }
        })
        .collect()
});

/// Return the ids of every denylist pattern that matches `code`.
///
/// Order follows [`DANGEROUS_PATTERNS`], each id appears at most once.
pub fn check_safety(code: &str) -> Vec<String> {
    COMPILED
        .iter()
        .filter(|(_, re)| re.is_match(code))
        .map(|(id, _)| id.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pattern_compiles() {
        assert_eq!(COMPILED.len(), DANGEROUS_PATTERNS.len());
    }

    #[test]
    fn recursive_force_delete_is_flagged() {
        assert_eq!(check_safety("rm -rf /"), vec![r"rm\s+-rf".to_string()]);
        assert_eq!(check_safety("sudo rm    -rf ~/x"), vec![r"rm\s+-rf".to_string()]);
    }

    #[test]
    fn matching_ignores_case() {
        let issues = check_safety("remove-item -recurse C:\\temp\nFORMAT-VOLUME -DriveLetter D");
        assert_eq!(
            issues,
            vec![
                r"Remove-Item\s+-Recurse".to_string(),
                "Format-Volume".to_string()
            ]
        );
    }

    #[test]
    fn issues_follow_denylist_order_not_text_order() {
        let code = "os.system('shutdown -h now')\nsubprocess.run('rm -rf /tmp/x')";
        assert_eq!(
            check_safety(code),
            vec![r"rm\s+-rf".to_string(), "shutdown".to_string()]
        );
    }

    #[test]
    fn reboot_needs_a_word_boundary() {
        assert_eq!(check_safety("sudo reboot"), vec![r"\breboot\b".to_string()]);
        assert!(check_safety("rebooted_count = 3").is_empty());
    }

    #[test]
    fn absolute_path_writes_and_delete_file_are_flagged() {
        let code = "Set-Content -Path C:\\Windows\\x.txt 'x'\n[IO.File]::DeleteFile('a')";
        assert_eq!(
            check_safety(code),
            vec![
                r"Set-Content\s+-Path\s+C:\\".to_string(),
                "DeleteFile".to_string()
            ]
        );
    }

    #[test]
    fn clean_code_reports_nothing() {
        assert!(check_safety("print(\"hello\")").is_empty());
        assert!(check_safety("for f in files:\n    print(f)").is_empty());
    }

    #[test]
    fn check_is_pure() {
        let code = "rm -rf build && shutdown now";
        assert_eq!(check_safety(code), check_safety(code));
    }

    #[test]
    fn obfuscation_is_not_caught() {
        // best-effort gate only
        assert!(check_safety("import os; os.system('r' + 'm -r' + 'f /')").is_empty());
    }
}
