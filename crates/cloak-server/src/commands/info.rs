//! `info`: show this server's record.

use tabled::Tabled;

use cloak_api::{ApiResult, Server};

use crate::cli::GlobalOpts;
use crate::config::Session;
use crate::error::CliError;
use crate::output::{self, Detail};

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Protocol")]
    protocol: &'static str,
    #[tabled(rename = "Settings")]
    settings: String,
}

fn entry_rows(protocol: &'static str, entries: &[ApiResult]) -> Vec<EntryRow> {
    entries
        .iter()
        .map(|entry| EntryRow {
            protocol,
            settings: output::summarize(entry.raw()),
        })
        .collect()
}

/// Human-readable view of a server record.
pub fn server_detail(server: &Server) -> String {
    let mut rows = entry_rows("openvpn", server.openvpn());
    rows.extend(entry_rows("ikev2", server.ikev2()));

    Detail::new()
        .row("Server ID", server.server_id())
        .row("Name", server.name().unwrap_or("-"))
        .row("OpenVPN", server.openvpn().len().to_string())
        .row("IKEv2", server.ikev2().len().to_string())
        .table("Target", &rows)
        .render()
}

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let credential = session.credential()?;
    let client = session.client(global)?;

    let server = Server::retrieve(&client, credential).await?;

    let out = output::render_single(global.output, &server, server_detail)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
