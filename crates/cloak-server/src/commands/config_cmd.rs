//! Config subcommand handlers.

use std::fmt::Write as _;

use cloak_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::Session;
use crate::output;

/// Format config for display, masking the auth token.
fn format_config_redacted(cfg: &Config) -> String {
    let api = &cfg.serverapi;
    let mut out = String::new();

    let _ = writeln!(out, "[serverapi]");
    let _ = writeln!(out, "base_url = \"{}\"", api.base_url);
    if let Some(ref id) = api.server_id {
        let _ = writeln!(out, "server_id = \"{id}\"");
    }
    if api.auth_token.is_some() {
        let _ = writeln!(out, "auth_token = \"****\"");
    }
    if let Some(ref etag) = api.pki_etag {
        let _ = writeln!(out, "pki_etag = {etag:?}");
    }

    out.trim_end().to_owned()
}

pub fn handle(args: &ConfigArgs, session: &Session, global: &GlobalOpts) {
    let out = match args.command {
        ConfigCommand::Show => format_config_redacted(&session.config),
        ConfigCommand::Path => session.path.display().to_string(),
    };
    output::print_output(&out, global.quiet);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_masks_the_token() {
        let mut cfg = Config::default();
        cfg.serverapi.server_id = Some("srv_1".into());
        cfg.serverapi.auth_token = Some("secret-token".into());

        let text = format_config_redacted(&cfg);
        assert!(text.contains("server_id = \"srv_1\""));
        assert!(text.contains("auth_token = \"****\""));
        assert!(!text.contains("secret-token"));
    }
}
