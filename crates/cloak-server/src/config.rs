//! CLI session: the loaded config file plus the global flags that shape
//! how API calls are made.
//!
//! `cloak_config` owns the file format; this module turns it and the
//! command line into an `ApiClient` and a `Credential`.

use std::path::PathBuf;
use std::time::Duration;

use cloak_api::{ApiClient, Credential, TlsMode, TransportConfig};
use cloak_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub struct Session {
    pub path: PathBuf,
    pub config: Config,
}

impl Session {
    /// Load the config named by `--config` / `$CLOAK_CONFIG` / the platform
    /// default and apply `--base-url`.
    pub fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let path = cloak_config::config_path(global.config.as_deref());
        let mut config = cloak_config::load_config(&path)?;

        if let Some(ref base_url) = global.base_url {
            config.set_base_url(base_url)?;
        }

        Ok(Self { path, config })
    }

    /// Write the config back, keeping `--base-url` overrides and anything
    /// the command stored.
    pub fn save(&self) -> Result<(), CliError> {
        cloak_config::save_config(&self.config, &self.path)?;
        Ok(())
    }

    /// The stored server credential, or `NoCredentials` if this host has
    /// not been registered.
    pub fn credential(&self) -> Result<Credential, CliError> {
        self.config.credential().ok_or_else(|| CliError::NoCredentials {
            path: self.path.display().to_string(),
        })
    }

    /// Build an API client for the configured base URL.
    pub fn client(&self, global: &GlobalOpts) -> Result<ApiClient, CliError> {
        let base_url = self.config.base_url()?;
        let client = ApiClient::new(&base_url, &transport_config(global))?;
        tracing::debug!(api_root = %client.api_root(), "API client ready");
        Ok(client)
    }
}

fn transport_config(global: &GlobalOpts) -> TransportConfig {
    let tls = if global.insecure {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca) = global.ca_cert {
        TlsMode::CustomCa(ca.clone())
    } else {
        TlsMode::System
    };

    TransportConfig {
        tls,
        timeout: Duration::from_secs(global.timeout),
    }
}
