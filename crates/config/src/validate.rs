//! Semantic validation of a loaded [`PickerConfig`].
//!
//! Parsing already rejects malformed files; this pass catches values that
//! parse but cannot work at runtime.

use std::fmt;

use crate::schema::{CommandSpec, PickerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. `media.default_image_quality`.
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &PickerConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    let quality = config.media.default_image_quality;
    if !(1..=100).contains(&quality) {
        result.push(
            Severity::Error,
            "media.default_image_quality",
            format!("must be between 1 and 100, got {quality}"),
        );
    }

    let launchers: [(&str, &Option<CommandSpec>); 4] = [
        ("launcher.pick_image", &config.launcher.pick_image),
        ("launcher.capture_image", &config.launcher.capture_image),
        ("launcher.pick_video", &config.launcher.pick_video),
        ("launcher.capture_video", &config.launcher.capture_video),
    ];
    for (path, spec) in launchers {
        if let Some(spec) = spec
            && spec.program.trim().is_empty()
        {
            result.push(Severity::Error, format!("{path}.program"), "program is empty");
        }
    }

    if config.storage.capture_dir() == config.storage.output_dir() {
        result.push(
            Severity::Warning,
            "storage.output_dir",
            "same as capture_dir; scaled copies will sit next to raw captures",
        );
    }

    for cap in &config.permissions.granted {
        if !config.permissions.explicit.contains(cap) {
            result.push(
                Severity::Warning,
                "permissions.granted",
                format!("{cap:?} is granted but never requires an explicit grant"),
            );
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::schema::{CapabilityName, CommandSpec},
        std::path::PathBuf,
    };

    #[test]
    fn default_config_is_clean() {
        let result = validate(&PickerConfig::default());
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 0);
    }

    #[test]
    fn flags_bad_quality_and_empty_program() {
        let mut cfg = PickerConfig::default();
        cfg.media.default_image_quality = 0;
        cfg.launcher.capture_video = Some(CommandSpec {
            program: "  ".into(),
            args: vec![],
        });
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 2);
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "launcher.capture_video.program")
        );
    }

    #[test]
    fn warns_on_shared_dirs_and_redundant_grant() {
        let mut cfg = PickerConfig::default();
        cfg.storage.capture_dir = Some(PathBuf::from("/x"));
        cfg.storage.output_dir = Some(PathBuf::from("/x"));
        cfg.permissions.explicit = vec![CapabilityName::Photos];
        cfg.permissions.granted = vec![CapabilityName::Camera];
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 2);
    }
}
