use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use meallog_ocr::DEFAULT_REVIEW_THRESHOLD;

const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "meals.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Could not determine a home directory for application data")]
    NoProjectDirs,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the meal database. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    pub ocr: OcrConfig,
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language spec.
    pub language: String,
    pub tessdata_path: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "jpn+eng".to_string(),
            tessdata_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Scans below this aggregate confidence are not saved without `--yes`.
    pub confidence_threshold: f32,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self { confidence_threshold: DEFAULT_REVIEW_THRESHOLD }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "meallog", "MealLog")
}

impl AppConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_content)?)
    }

    /// Load an explicit config file, or the default one if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match project_dirs() {
                Some(dirs) => dirs.config_dir().join(CONFIG_FILE),
                None => return Ok(Self::default()),
            },
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                tracing::debug!("Loaded config from {}", path.display());
                Self::from_toml(&content)
            }
            Err(e) if explicit.is_none() && e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => project_dirs()
                .map(|d| d.data_dir().to_path_buf())
                .ok_or(ConfigError::NoProjectDirs),
        }
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join(DATABASE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let c = AppConfig::from_toml("").unwrap();
        assert_eq!(c.data_dir, None);
        assert_eq!(c.ocr.language, "jpn+eng");
        assert_eq!(c.review.confidence_threshold, DEFAULT_REVIEW_THRESHOLD);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let c = AppConfig::from_toml(
            r#"
            data_dir = "/tmp/meals"

            [ocr]
            tessdata_path = "/usr/share/tessdata"
            "#,
        )
        .unwrap();
        assert_eq!(c.database_path().unwrap(), PathBuf::from("/tmp/meals/meals.db"));
        assert_eq!(c.ocr.language, "jpn+eng");
        assert_eq!(c.ocr.tessdata_path.as_deref(), Some("/usr/share/tessdata"));
    }

    #[test]
    fn review_threshold_override() {
        let c = AppConfig::from_toml("[review]\nconfidence_threshold = 0.9").unwrap();
        assert_eq!(c.review.confidence_threshold, 0.9);
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        assert!(matches!(AppConfig::from_toml("data_dir = ["), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(AppConfig::load(Some(&missing)), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ocr]\nlanguage = \"jpn\"\n").unwrap();
        assert_eq!(AppConfig::load(Some(&path)).unwrap().ocr.language, "jpn");
    }
}
