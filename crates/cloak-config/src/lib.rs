//! Configuration for the cloak-server CLI.
//!
//! A small TOML file holding the API base URL and, once the server is
//! registered, its credential and the last PKI validator. Values load as
//! defaults ← file ← `CLOAK_SERVERAPI__*` environment; the CLI writes the
//! file back after every successful command.

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use cloak_api::Credential;

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://app.encrypt.me/";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CLOAK_CONFIG";

/// Prefix of environment overrides for the `[serverapi]` table, e.g.
/// `CLOAK_SERVERAPI__BASE_URL`.
pub const SERVERAPI_ENV_PREFIX: &str = "CLOAK_SERVERAPI__";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub serverapi: ServerApi,
}

/// The `[serverapi]` table.
#[derive(Debug, Deserialize, Serialize)]
pub struct ServerApi {
    /// Root URL of the management site.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Set by `register`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,

    /// Set by `register` (plaintext, the file is written owner-only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Validator of the last PKI bundle fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pki_etag: Option<String>,
}

impl Default for ServerApi {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            server_id: None,
            auth_token: None,
            pki_etag: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

impl Config {
    /// The configured base URL, parsed.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        parse_base_url(&self.serverapi.base_url)
    }

    /// Replace the base URL after checking it parses.
    pub fn set_base_url(&mut self, raw: &str) -> Result<(), ConfigError> {
        parse_base_url(raw)?;
        self.serverapi.base_url = raw.to_owned();
        Ok(())
    }

    /// The stored credential, if both halves are present.
    pub fn credential(&self) -> Option<Credential> {
        let server_id = self.serverapi.server_id.as_deref()?;
        let auth_token = self.serverapi.auth_token.clone()?;
        Some(Credential::new(server_id, SecretString::from(auth_token)))
    }

    /// Store a new credential. Any cached PKI validator belongs to the old
    /// identity and is dropped.
    pub fn set_credential(&mut self, credential: &Credential) {
        self.serverapi.server_id = Some(credential.server_id().to_owned());
        self.serverapi.auth_token = Some(credential.auth_token().expose_secret().to_owned());
        self.serverapi.pki_etag = None;
    }

    pub fn pki_etag(&self) -> Option<&str> {
        self.serverapi.pki_etag.as_deref()
    }

    pub fn set_pki_etag(&mut self, etag: Option<&str>) {
        self.serverapi.pki_etag = etag.map(str::to_owned);
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("{raw}: {e}"),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("{raw}: not a base URL"),
        });
    }
    Ok(url)
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: explicit path, then `$CLOAK_CONFIG`,
/// then the platform config directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("me", "encrypt", "cloak-server").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("cloak-server");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from `path` + environment. A missing file is not an
/// error; every field has a default.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let vars = std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
    load_config_with_env(path, vars)
}

/// [`load_config`] with the environment passed in.
///
/// Overrides are `CLOAK_SERVERAPI__<KEY>` and are taken as plain strings:
/// a numeric server id or a quoted ETag is kept exactly as given.
pub fn load_config_with_env(
    path: &Path,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let mut figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path));

    for (var, value) in vars {
        let Some(key) = var.strip_prefix(SERVERAPI_ENV_PREFIX) else {
            continue;
        };
        if key.is_empty() || key.contains('.') {
            continue;
        }
        debug!(var = %var, "config override from environment");
        let key = format!("serverapi.{}", key.to_ascii_lowercase());
        figment = figment.merge(Serialized::default(&key, value));
    }

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parent
/// directories. The file holds the auth token, so on Unix it is created
/// readable by the owner only.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    write_private(path, toml_str.as_bytes())?;

    debug!(path = %path.display(), "config saved");
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; tighten an existing file before writing
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(contents)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_with_env(&dir.path().join("absent.toml"), env(&[])).unwrap();

        assert_eq!(cfg.serverapi.base_url, DEFAULT_BASE_URL);
        assert!(cfg.credential().is_none());
        assert!(cfg.pki_etag().is_none());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_base_url("https://staging.example/").unwrap();
        cfg.set_credential(&Credential::new("srv_1", SecretString::from("tok".to_string())));
        cfg.set_pki_etag(Some("\"v1\""));
        save_config(&cfg, &path).unwrap();

        let loaded = load_config_with_env(&path, env(&[])).unwrap();
        assert_eq!(loaded.base_url().unwrap().as_str(), "https://staging.example/");
        let credential = loaded.credential().unwrap();
        assert_eq!(credential.server_id(), "srv_1");
        assert_eq!(credential.auth_token().expose_secret(), "tok");
        assert_eq!(loaded.pki_etag(), Some("\"v1\""));
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        save_config(&Config::default(), &path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn existing_readable_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "stale contents that are much longer than the new file\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut cfg = Config::default();
        cfg.set_credential(&Credential::new("srv_1", SecretString::from("tok".to_string())));
        save_config(&cfg, &path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("stale"));
        let loaded = load_config_with_env(&path, env(&[])).unwrap();
        assert_eq!(loaded.credential().unwrap().server_id(), "srv_1");
    }

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn env_values_stay_strings() {
        let dir = tempfile::tempdir().unwrap();
        let vars = env(&[
            ("CLOAK_SERVERAPI__SERVER_ID", "12345"),
            ("CLOAK_SERVERAPI__AUTH_TOKEN", "true"),
            ("CLOAK_SERVERAPI__PKI_ETAG", "\"v1\""),
        ]);
        let cfg = load_config_with_env(&dir.path().join("absent.toml"), vars).unwrap();

        let credential = cfg.credential().unwrap();
        assert_eq!(credential.server_id(), "12345");
        assert_eq!(credential.auth_token().expose_secret(), "true");
        assert_eq!(cfg.pki_etag(), Some("\"v1\""));
    }

    #[test]
    fn env_overrides_file_and_ignores_other_vars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[serverapi]\nbase_url = \"https://file.example/\"\nserver_id = \"srv_file\"\n",
        )
        .unwrap();

        let vars = env(&[
            ("CLOAK_SERVERAPI__BASE_URL", "https://env.example/"),
            ("CLOAK_OUTPUT", "json"),
            ("CLOAK_TIMEOUT", "5"),
        ]);
        let cfg = load_config_with_env(&path, vars).unwrap();

        assert_eq!(cfg.base_url().unwrap().as_str(), "https://env.example/");
        assert_eq!(cfg.serverapi.server_id.as_deref(), Some("srv_file"));
    }

    #[test]
    fn half_a_credential_is_none() {
        let mut cfg = Config::default();
        cfg.serverapi.server_id = Some("srv_1".into());
        assert!(cfg.credential().is_none());
    }

    #[test]
    fn new_credential_drops_stale_etag() {
        let mut cfg = Config::default();
        cfg.set_pki_etag(Some("old"));
        cfg.set_credential(&Credential::new("srv_2", SecretString::from("t".to_string())));
        assert!(cfg.pki_etag().is_none());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let mut cfg = Config::default();
        let err = cfg.set_base_url("not a url").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "base_url"));
        assert!(cfg.set_base_url("mailto:ops@example.com").is_err());
        assert_eq!(cfg.serverapi.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn explicit_path_wins() {
        let explicit = Path::new("/tmp/explicit-cloak.toml");
        assert_eq!(config_path(Some(explicit)), explicit);
    }
}
