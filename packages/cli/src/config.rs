//! `notas.toml` loading.
//!
//! ```toml
//! [extract]
//! code_pattern = '^[A-Z]{3}-\d{4}$'
//! exam_weight = 0.4
//!
//! [extract.extra_aliases]
//! final = ["nota acta"]
//!
//! [portal]
//! base_url = "https://portal.example.cl"
//! login_path = "/alumnos/login.aspx"
//! grades_path = "/alumnos/concent-notas.asp"
//! ```
//!
//! Credentials are never read from the file, only from the environment.

use std::path::{Path, PathBuf};

use notas_extract::ExtractOptions;
use notas_portal::PortalSettings;
use serde::Deserialize;

/// Config file looked up in the working directory when `--config` is not
/// given.
pub const DEFAULT_CONFIG_FILE: &str = "notas.toml";

/// Errors that can occur while loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unexpected values.
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of `notas.toml`. Every table is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub extract: ExtractOptions,
    pub portal: PortalSettings,
}

/// Parses config file contents.
///
/// # Errors
///
/// Returns the TOML error if the contents are invalid.
pub fn parse(contents: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(contents)
}

/// Loads the config file.
///
/// An explicit path must exist. Without one, [`DEFAULT_CONFIG_FILE`] is
/// read if present and defaults are used otherwise.
///
/// # Errors
///
/// * [`ConfigError::Io`] if the file cannot be read
/// * [`ConfigError::Parse`] if the file is invalid
pub fn load(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                log::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                return Ok(FileConfig::default());
            }
            default
        }
    };

    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config = parse(&contents).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;

    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use notas_extract::DEFAULT_CODE_PATTERN;
    use notas_extract::columns::Field;

    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.extract.code_pattern, DEFAULT_CODE_PATTERN);
        assert_eq!(config.extract.lab_keywords, vec!["lab"]);
    }

    #[test]
    fn reads_extract_and_portal_tables() {
        let config = parse(
            r#"
                [extract]
                code_pattern = '^[A-Z]{3}-\d{4}$'
                lab_keywords = ["lab", "taller"]
                exam_weight = 0.4
                prefer_embedded_json = false

                [extract.extra_aliases]
                final = ["nota acta"]
                code = ["clave"]

                [portal]
                base_url = "https://portal.example.cl"
                max_hops = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.extract.code_pattern, r"^[A-Z]{3}-\d{4}$");
        assert_eq!(config.extract.lab_keywords, vec!["lab", "taller"]);
        assert_eq!(config.extract.exam_weight, Some(0.4));
        assert!(!config.extract.prefer_embedded_json);
        assert_eq!(config.extract.extra_aliases[&Field::Final], vec!["nota acta"]);
        assert_eq!(config.extract.extra_aliases[&Field::Code], vec!["clave"]);
        assert_eq!(
            config.portal.base_url.as_deref(),
            Some("https://portal.example.cl")
        );
        assert_eq!(config.portal.max_hops, Some(2));
    }

    #[test]
    fn rejects_unknown_tables_and_fields() {
        assert!(parse("[output]\npath = \"x\"").is_err());
        assert!(parse("[extract.extra_aliases]\nprofesor = [\"docente\"]").is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load(Some(Path::new("/nonexistent/notas.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
