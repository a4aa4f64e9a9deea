// src/language.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Script languages the generator can target and the sandbox can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    Python,
    Powershell,
    Bash,
    Javascript,
}

impl Default for TargetLanguage {
    fn default() -> Self {
        TargetLanguage::Python
    }
}

impl TargetLanguage {
    pub const ALL: [TargetLanguage; 4] = [
        TargetLanguage::Python,
        TargetLanguage::Powershell,
        TargetLanguage::Bash,
        TargetLanguage::Javascript,
    ];

    /// Canonical lowercase name, as used on the wire and in config.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetLanguage::Python => "python",
            TargetLanguage::Powershell => "powershell",
            TargetLanguage::Bash => "bash",
            TargetLanguage::Javascript => "javascript",
        }
    }

    /// File extension (without the dot) for the materialised script.
    pub fn extension(self) -> &'static str {
        match self {
            TargetLanguage::Python => "py",
            TargetLanguage::Powershell => "ps1",
            TargetLanguage::Bash => "sh",
            TargetLanguage::Javascript => "js",
        }
    }

    /// Human-facing name used in prompts.
    pub fn display_name(self) -> &'static str {
        match self {
            TargetLanguage::Python => "Python",
            TargetLanguage::Powershell => "PowerShell",
            TargetLanguage::Bash => "Bash",
            TargetLanguage::Javascript => "JavaScript (Node.js)",
        }
    }

    /// Arguments placed before the script path when invoking the interpreter.
    pub fn interpreter_args(self) -> &'static [&'static str] {
        match self {
            // isolated mode: ignore PYTHON* env vars and user site-packages
            TargetLanguage::Python => &["-I"],
            TargetLanguage::Powershell => &["-NoProfile", "-NonInteractive", "-File"],
            TargetLanguage::Bash => &[],
            TargetLanguage::Javascript => &[],
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language '{0}' (expected one of: python, powershell, bash, javascript)")]
pub struct UnknownLanguage(pub String);

impl FromStr for TargetLanguage {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(TargetLanguage::Python),
            "powershell" | "pwsh" | "ps" | "ps1" => Ok(TargetLanguage::Powershell),
            "bash" | "sh" | "shell" => Ok(TargetLanguage::Bash),
            "javascript" | "js" | "node" | "nodejs" => Ok(TargetLanguage::Javascript),
            _ => Err(UnknownLanguage(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_parse_case_insensitively() {
        assert_eq!("PY".parse::<TargetLanguage>(), Ok(TargetLanguage::Python));
        assert_eq!("pwsh".parse::<TargetLanguage>(), Ok(TargetLanguage::Powershell));
        assert_eq!(" Shell ".parse::<TargetLanguage>(), Ok(TargetLanguage::Bash));
        assert_eq!("node".parse::<TargetLanguage>(), Ok(TargetLanguage::Javascript));
    }

    #[test]
    fn unknown_language_is_rejected() {
        let err = "cobol".parse::<TargetLanguage>().unwrap_err();
        assert_eq!(err, UnknownLanguage("cobol".to_string()));
    }

    #[test]
    fn canonical_names_round_trip() {
        for lang in TargetLanguage::ALL {
            assert_eq!(lang.as_str().parse::<TargetLanguage>(), Ok(lang));
        }
    }

    #[test]
    fn extensions_are_distinct() {
        let exts: std::collections::BTreeSet<_> =
            TargetLanguage::ALL.iter().map(|l| l.extension()).collect();
        assert_eq!(exts.len(), TargetLanguage::ALL.len());
        assert_eq!(TargetLanguage::Powershell.extension(), "ps1");
    }
}
