//! Layered configuration for the extraction engine (C8, §4.8).
//!
//! - Defaults, compiled in.
//! - An optional TOML file at `.code-intel/settings.toml`, discovered by
//!   walking ancestors of the current directory.
//! - `CODEINTEL_`-prefixed environment variables, using `__` to separate
//!   nested keys (e.g. `CODEINTEL_INDEXING__PARALLEL_THREADS=8`).
//!
//! Configuration is read once at pipeline startup (§4.8); a single-file
//! `parseFile`/`extract` call never consults it.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

const CONFIG_DIR_NAME: &str = ".code-intel";
const ENV_PREFIX: &str = "CODEINTEL_";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Size of the worker pool dispatching per-file extraction (§4.7, §5).
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    /// Extra ignore globs layered on top of gitignore-aware walking (§4.7).
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Soft per-file deadline in milliseconds (§5 Cancellation/timeouts).
    #[serde(default = "default_extraction_deadline_ms")]
    pub extraction_deadline_ms: u64,

    /// Whether files under conventional test directories are walked.
    #[serde(default = "default_true")]
    pub include_tests: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LanguageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Logging levels by module, consumed by [`crate::logging`] (§4.9).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub default: String,

    #[serde(default)]
    pub modules: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

fn default_version() -> u32 {
    1
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_extraction_deadline_ms() -> u64 {
    5_000
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            indexing: IndexingConfig::default(),
            languages: default_languages(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            ignore_patterns: vec![
                "target/**".to_string(),
                "node_modules/**".to_string(),
                ".git/**".to_string(),
                "*.generated.*".to_string(),
            ],
            extraction_deadline_ms: default_extraction_deadline_ms(),
            include_tests: true,
        }
    }
}

fn default_languages() -> HashMap<String, LanguageConfig> {
    let mut langs = HashMap::new();
    for lang in crate::parsing::Language::all() {
        langs.insert(
            lang.config_key().to_string(),
            LanguageConfig {
                enabled: true,
                extensions: lang.extensions().iter().map(|s| s.to_string()).collect(),
            },
        );
    }
    langs
}

impl Settings {
    /// Load configuration layering defaults, workspace file, and env vars.
    pub fn load() -> Result<Self, figment::Error> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR_NAME).join("settings.toml"));

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(
                Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
            .extract()
    }

    /// Load configuration from a specific file (defaults still apply).
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(
                Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
            .extract()
    }

    /// Walk ancestors of the current directory looking for `.code-intel/`.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR_NAME);
            if config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }
        None
    }

    /// The workspace root (the directory containing `.code-intel/`), if any.
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            if ancestor.join(CONFIG_DIR_NAME).is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }
        None
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR_NAME).join("settings.toml");
        if !force && config_path.exists() {
            return Err("configuration file already exists; use --force to overwrite".into());
        }
        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert!(settings.indexing.parallel_threads > 0);
        assert!(settings.languages.contains_key("rust"));
        assert!(settings.languages.contains_key("ruby"));
        assert!(settings.languages.contains_key("bash"));
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2

[indexing]
parallel_threads = 4
ignore_patterns = ["custom/**"]
include_tests = false
extraction_deadline_ms = 2000

[languages.rust]
enabled = false
"#;
        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.indexing.parallel_threads, 4);
        assert_eq!(settings.indexing.ignore_patterns, vec!["custom/**"]);
        assert!(!settings.indexing.include_tests);
        assert_eq!(settings.indexing.extraction_deadline_ms, 2000);
        assert!(!settings.languages["rust"].enabled);
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let mut settings = Settings::default();
        settings.indexing.parallel_threads = 2;
        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.indexing.parallel_threads, 2);
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
[indexing]
parallel_threads = 16
"#;
        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.indexing.parallel_threads, 16);
        assert_eq!(settings.version, 1);
        assert!(settings.indexing.include_tests);
    }

    #[test]
    fn test_layered_config() {
        let temp_dir = TempDir::new().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let config_dir = temp_dir.path().join(CONFIG_DIR_NAME);
        fs::create_dir_all(&config_dir).unwrap();

        let toml_content = r#"
[indexing]
parallel_threads = 8
include_tests = true
"#;
        fs::write(config_dir.join("settings.toml"), toml_content).unwrap();

        unsafe {
            std::env::set_var("CODEINTEL_INDEXING__PARALLEL_THREADS", "16");
        }

        let settings = Settings::load().unwrap();
        assert_eq!(settings.indexing.parallel_threads, 16);
        assert!(settings.indexing.include_tests);

        unsafe {
            std::env::remove_var("CODEINTEL_INDEXING__PARALLEL_THREADS");
        }
        std::env::set_current_dir(original_dir).unwrap();
    }
}
