use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::PickerConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["picker.toml", "picker.yaml", "picker.yml", "picker.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<PickerConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./picker.{toml,yaml,yml,json}`
/// 2. `<user config dir>/picker.{toml,yaml,yml,json}`
///
/// Returns `PickerConfig::default()` if nothing is found or the file is
/// unreadable; the failure is logged.
pub fn discover_and_load() -> PickerConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                PickerConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            PickerConfig::default()
        },
    };
    apply_env_overrides(&mut config);
    config
}

/// Apply `PICKER_DATA_DIR` and `PICKER_CACHE_PATH` on top of file values.
pub fn apply_env_overrides(config: &mut PickerConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut PickerConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(dir) = lookup("PICKER_DATA_DIR").filter(|v| !v.is_empty()) {
        config.storage.data_dir = Some(PathBuf::from(dir));
    }
    if let Some(path) = lookup("PICKER_CACHE_PATH").filter(|v| !v.is_empty()) {
        config.storage.cache_path = Some(PathBuf::from(path));
    }
}

fn find_config_file() -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .or_else(|| {
            let dir = config_dir()?;
            CONFIG_FILENAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|p| p.exists())
        })
}

/// Returns the user-global config directory (e.g. `~/.config/picker/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "picker").map(|d| d.config_dir().to_path_buf())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("picker.toml")
}

/// Serialize `config` as TOML to `path`, creating parent directories.
pub fn save_config(config: &PickerConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<PickerConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::schema::PromptAnswer, tempfile::TempDir};

    #[test]
    fn loads_yaml_and_json() {
        let tmp = TempDir::new().unwrap();

        let yaml = tmp.path().join("picker.yaml");
        std::fs::write(&yaml, "permissions:\n  prompt: deny\n").unwrap();
        assert_eq!(load_config(&yaml).unwrap().permissions.prompt, PromptAnswer::Deny);

        let json = tmp.path().join("picker.json");
        std::fs::write(&json, r#"{"media": {"cover_frame_offset_ms": 1500}}"#).unwrap();
        assert_eq!(load_config(&json).unwrap().media.cover_frame_offset_ms, 1500);
    }

    #[test]
    fn rejects_unknown_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("picker.ini");
        std::fs::write(&path, "x=1").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("picker.toml");
        let mut cfg = PickerConfig::default();
        cfg.metrics.enabled = true;
        save_config(&cfg, &path).unwrap();
        assert!(load_config(&path).unwrap().metrics.enabled);
    }

    #[test]
    fn env_overrides_replace_storage_paths() {
        let mut cfg = PickerConfig::default();
        apply_env_overrides_with(&mut cfg, |name| match name {
            "PICKER_DATA_DIR" => Some("/data".into()),
            "PICKER_CACHE_PATH" => Some(String::new()),
            _ => None,
        });
        assert_eq!(cfg.storage.data_dir, Some(PathBuf::from("/data")));
        assert!(cfg.storage.cache_path.is_none());
    }
}
