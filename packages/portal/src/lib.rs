#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Sources of grades page HTML.
//!
//! [`PortalClient`] logs into a student portal and downloads the grades
//! page, following meta refreshes and frames. [`LocalFile`] reads a page
//! saved from a browser. Both implement [`GradesPageSource`], so callers
//! can run extraction without caring where the HTML came from.
//!
//! Credentials and URLs come from environment variables, optionally
//! layered over [`PortalSettings`] read from a config file.

pub mod client;
pub mod form;
pub mod navigate;

use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::{Deserialize, Serialize};

pub use client::PortalClient;
pub use form::LoginForm;

/// Default number of meta refresh or frame hops followed.
pub const DEFAULT_MAX_HOPS: u8 = 3;

/// Default pause after logging in, in milliseconds.
pub const DEFAULT_LOGIN_PAUSE_MS: u64 = 300;

/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Errors that can occur while obtaining a grades page.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// An HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A required environment variable is not set.
    #[error("Missing environment variable: {name}")]
    MissingEnv { name: String },

    /// A URL could not be parsed or resolved.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The portal did not accept the credentials.
    #[error(
        "Login rejected: check the credentials or the form field names (user_field='{user_field}', pass_field='{pass_field}')"
    )]
    LoginRejected {
        user_field: String,
        pass_field: String,
    },

    /// The login page has no form.
    #[error("No login form found on the login page")]
    LoginFormNotFound,

    /// The grades URL kept redirecting through refresh or frame pages.
    #[error("Gave up after {hops} meta refresh/frame hops (last URL: {url})")]
    TooManyHops { hops: u8, url: String },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves `reference` against `base`, like a browser resolving a link.
///
/// # Errors
///
/// * [`PortalError::InvalidUrl`] if the result is not a valid URL
pub fn resolve_url(base: &Url, reference: &str) -> Result<Url, PortalError> {
    base.join(reference).map_err(|e| PortalError::InvalidUrl {
        url: reference.to_owned(),
        reason: e.to_string(),
    })
}

/// Non-secret portal settings, as read from the `[portal]` table of a
/// config file. Environment variables take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PortalSettings {
    pub base_url: Option<String>,
    pub login_path: Option<String>,
    pub grades_path: Option<String>,
    pub user_field: Option<String>,
    pub pass_field: Option<String>,
    pub max_hops: Option<u8>,
    pub login_pause_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

/// Everything needed to log in and download the grades page.
#[derive(Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub login_url: Url,
    pub grades_url: Url,
    pub user: String,
    pub pass: String,
    /// Login form user field name; detected when `None`.
    pub user_field: Option<String>,
    /// Login form password field name; detected when `None`.
    pub pass_field: Option<String>,
    pub max_hops: u8,
    pub login_pause_ms: u64,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalConfig")
            .field("login_url", &self.login_url.as_str())
            .field("grades_url", &self.grades_url.as_str())
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("user_field", &self.user_field)
            .field("pass_field", &self.pass_field)
            .field("max_hops", &self.max_hops)
            .finish_non_exhaustive()
    }
}

impl PortalConfig {
    /// Reads the configuration from the process environment.
    ///
    /// `PORTAL_USER` and `PORTAL_PASS` are always required. `PORTAL_BASE`,
    /// `LOGIN_PATH` and `NOTAS_PATH` are required unless `settings`
    /// provides them. `LOGIN_USER_FIELD` and `LOGIN_PASS_FIELD` are
    /// optional.
    ///
    /// # Errors
    ///
    /// * [`PortalError::MissingEnv`] if a required variable is not set
    /// * [`PortalError::InvalidUrl`] if the URLs cannot be built
    pub fn from_env(settings: &PortalSettings) -> Result<Self, PortalError> {
        Self::from_lookup(settings, |name| std::env::var(name).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_lookup(
        settings: &PortalSettings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, PortalError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &str, fallback: Option<&String>| {
            var(name)
                .or_else(|| fallback.cloned())
                .ok_or_else(|| PortalError::MissingEnv {
                    name: name.to_owned(),
                })
        };

        let user = require("PORTAL_USER", None)?;
        let pass = require("PORTAL_PASS", None)?;
        let base = require("PORTAL_BASE", settings.base_url.as_ref())?;
        let login_path = require("LOGIN_PATH", settings.login_path.as_ref())?;
        let grades_path = require("NOTAS_PATH", settings.grades_path.as_ref())?;

        let base = Url::parse(&base).map_err(|e| PortalError::InvalidUrl {
            url: base.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            login_url: resolve_url(&base, &login_path)?,
            grades_url: resolve_url(&base, &grades_path)?,
            user,
            pass,
            user_field: var("LOGIN_USER_FIELD").or_else(|| settings.user_field.clone()),
            pass_field: var("LOGIN_PASS_FIELD").or_else(|| settings.pass_field.clone()),
            max_hops: settings.max_hops.unwrap_or(DEFAULT_MAX_HOPS),
            login_pause_ms: settings.login_pause_ms.unwrap_or(DEFAULT_LOGIN_PAUSE_MS),
            timeout_secs: settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }
}

/// Something that can produce the HTML of a grades page.
pub trait GradesPageSource: Send + Sync {
    /// Fetches the page HTML.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError`] if the page cannot be obtained.
    fn fetch_html(&self) -> impl std::future::Future<Output = Result<String, PortalError>> + Send;

    /// Returns a short description of the source for log messages.
    fn describe(&self) -> String;
}

/// Decodes page bytes as UTF-8, falling back to Latin-1.
///
/// Latin-1 maps every byte to the code point of the same value, so the
/// fallback never fails.
#[must_use]
pub fn decode_page(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| {
        log::debug!("Page is not valid UTF-8, decoding as Latin-1");
        e.into_bytes().into_iter().map(char::from).collect()
    })
}

/// A grades page saved to disk.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GradesPageSource for LocalFile {
    async fn fetch_html(&self) -> Result<String, PortalError> {
        let bytes = tokio::fs::read(&self.path).await?;
        log::debug!("Read {} bytes from {}", bytes.len(), self.path.display());
        Ok(decode_page(bytes))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const FULL_ENV: &[(&str, &str)] = &[
        ("PORTAL_USER", "alumno"),
        ("PORTAL_PASS", "secreto"),
        ("PORTAL_BASE", "https://portal.example.cl"),
        ("LOGIN_PATH", "/alumnos/login.aspx"),
        ("NOTAS_PATH", "/alumnos/concent-notas.asp"),
    ];

    #[test]
    fn builds_urls_from_environment() {
        let config = PortalConfig::from_lookup(&PortalSettings::default(), env(FULL_ENV)).unwrap();
        assert_eq!(
            config.login_url.as_str(),
            "https://portal.example.cl/alumnos/login.aspx"
        );
        assert_eq!(
            config.grades_url.as_str(),
            "https://portal.example.cl/alumnos/concent-notas.asp"
        );
        assert_eq!(config.user_field, None);
        assert_eq!(config.max_hops, DEFAULT_MAX_HOPS);
        assert_eq!(config.login_pause_ms, DEFAULT_LOGIN_PAUSE_MS);
    }

    #[test]
    fn missing_credentials_are_reported_by_name() {
        let err = PortalConfig::from_lookup(
            &PortalSettings::default(),
            env(&[("PORTAL_USER", "alumno"), ("PORTAL_PASS", "  ")]),
        )
        .unwrap_err();
        assert!(matches!(err, PortalError::MissingEnv { ref name } if name == "PORTAL_PASS"));
    }

    #[test]
    fn settings_fill_in_missing_urls_and_env_wins() {
        let settings: PortalSettings = toml::from_str(
            r#"
                base_url = "https://intranet.example.cl"
                login_path = "/login"
                grades_path = "/notas"
                user_field = "rut"
                max_hops = 5
            "#,
        )
        .unwrap();

        let config = PortalConfig::from_lookup(
            &settings,
            env(&[
                ("PORTAL_USER", "alumno"),
                ("PORTAL_PASS", "secreto"),
                ("NOTAS_PATH", "/alumnos/notas.asp"),
                ("LOGIN_USER_FIELD", "email"),
            ]),
        )
        .unwrap();
        assert_eq!(config.login_url.as_str(), "https://intranet.example.cl/login");
        assert_eq!(
            config.grades_url.as_str(),
            "https://intranet.example.cl/alumnos/notas.asp"
        );
        assert_eq!(config.user_field.as_deref(), Some("email"));
        assert_eq!(config.max_hops, 5);
    }

    #[test]
    fn invalid_base_url_is_an_error() {
        let mut pairs = FULL_ENV.to_vec();
        pairs[2] = ("PORTAL_BASE", "portal sin esquema");
        let err = PortalConfig::from_lookup(&PortalSettings::default(), env(&pairs)).unwrap_err();
        assert!(matches!(err, PortalError::InvalidUrl { .. }));
    }

    #[test]
    fn debug_output_hides_password() {
        let config = PortalConfig::from_lookup(&PortalSettings::default(), env(FULL_ENV)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secreto"));
        assert!(debug.contains("alumno"));
    }

    #[test]
    fn decodes_latin1_pages() {
        assert_eq!(decode_page("Cálculo".as_bytes().to_vec()), "Cálculo");
        assert_eq!(decode_page(vec![b'C', 0xE1, b'l']), "Cál");
    }
}
