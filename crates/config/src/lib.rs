//! Configuration loading, validation and env substitution.
//!
//! Config files: `picker.toml`, `picker.yaml`, `picker.yml` or `picker.json`,
//! searched in `./` then the user config directory.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        apply_env_overrides, config_dir, discover_and_load, find_or_default_config_path,
        load_config, save_config,
    },
    schema::{
        CapabilityName, CommandSpec, LauncherConfig, MediaConfig, MetricsConfig,
        PermissionsConfig, PickerConfig, PromptAnswer, StorageConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
