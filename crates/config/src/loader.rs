//! Settings loader for terra-stac
//!
//! Sources are applied from lowest to highest precedence: built-in defaults,
//! an optional JSON file, then environment variables named after the fields
//! in upper case (`ROLE_ADMIN`, `OIDC_ISSUER`, ...).

use crate::settings::Settings;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use terra_stac_core::{Error, Result};

/// Loader that assembles `Settings` at startup
#[derive(Debug, Default)]
pub struct SettingsLoader {
    /// Optional JSON file with settings
    file: Option<PathBuf>,
    /// Variables to read instead of the process environment
    vars: Option<HashMap<String, String>>,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read settings from a JSON file before applying the environment
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Use the given variables instead of the process environment
    pub fn vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars = Some(vars);
        self
    }

    /// Load and validate the settings
    pub fn load(self) -> Result<Settings> {
        let mut settings = match &self.file {
            Some(path) => read_file(path)?,
            None => Settings::default(),
        };

        let vars = self.vars.unwrap_or_else(|| std::env::vars().collect());
        apply_env(&mut settings, &vars)?;

        settings.validate()?;
        tracing::debug!(
            file = ?self.file,
            oidc = settings.oidc_issuer.is_some(),
            "settings loaded"
        );
        Ok(settings)
    }
}

fn read_file(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::configuration(format!(
            "failed to read settings file '{}': {e}",
            path.display()
        ))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::configuration(format!(
            "invalid settings file '{}': {e}",
            path.display()
        ))
    })
}

fn apply_env(settings: &mut Settings, vars: &HashMap<String, String>) -> Result<()> {
    let get = |name: &str| vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(v) = get("ROLE_ADMIN") {
        settings.role_admin = v.to_string();
    }
    if let Some(v) = get("ROLE_EDITOR") {
        settings.role_editor = v.to_string();
    }
    if let Some(v) = get("ROLE_ANONYMOUS") {
        settings.role_anonymous = v.to_string();
    }
    if let Some(v) = get("EDITOR_PUBLIC_COLLECTIONS") {
        settings.editor_public_collections = parse_bool("EDITOR_PUBLIC_COLLECTIONS", v)?;
    }
    if let Some(v) = get("OIDC_ISSUER") {
        settings.oidc_issuer = Some(v.to_string());
    }
    if let Some(v) = get("OIDC_ROLES_CLAIM") {
        settings.oidc_roles_claim = v.to_string();
    }
    if let Some(v) = get("OIDC_AUDIENCE") {
        settings.oidc_audience = Some(v.to_string());
    }
    if let Some(v) = get("STAC_ID") {
        settings.stac_id = v.to_string();
    }
    if let Some(v) = get("STAC_TITLE") {
        settings.stac_title = v.to_string();
    }
    if let Some(v) = get("STAC_DESCRIPTION") {
        settings.stac_description = v.to_string();
    }
    if let Some(v) = get("CORS_ALLOW_ORIGINS") {
        settings.cors_allow_origins = parse_list("CORS_ALLOW_ORIGINS", v)?;
    }
    if let Some(v) = get("CORS_ALLOW_METHODS") {
        settings.cors_allow_methods = parse_list("CORS_ALLOW_METHODS", v)?;
    }
    if let Some(v) = get("CORS_ALLOW_CREDENTIALS") {
        settings.cors_allow_credentials = parse_bool("CORS_ALLOW_CREDENTIALS", v)?;
    }
    if let Some(v) = get("APP_HOST") {
        settings.app_host = v.to_string();
    }
    if let Some(v) = get("APP_PORT") {
        settings.app_port = v
            .parse()
            .map_err(|e| Error::configuration(format!("APP_PORT: invalid port '{v}': {e}")))?;
    }
    if let Some(v) = get("COLLECTIONS_PAGE_SIZE") {
        settings.collections_page_size = v.parse().map_err(|e| {
            Error::configuration(format!("COLLECTIONS_PAGE_SIZE: invalid size '{v}': {e}"))
        })?;
    }

    Ok(())
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::configuration(format!(
            "{name}: expected a boolean, got '{value}'"
        ))),
    }
}

/// Lists are comma separated; a JSON array is accepted as well.
fn parse_list(name: &str, value: &str) -> Result<Vec<String>> {
    if value.starts_with('[') {
        return serde_json::from_str(value)
            .map_err(|e| Error::configuration(format!("{name}: invalid list: {e}")));
    }
    Ok(value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}
