//! `req`: request a certificate for this server's private key.

use serde_json::json;

use cloak_api::{RcgenCsrBuilder, Server};

use crate::cli::{GlobalOpts, ReqArgs};
use crate::commands::util;
use crate::config::Session;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    args: &ReqArgs,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let credential = session.credential()?;
    let key_pem = util::read_pem(&args.key)?;
    let client = session.client(global)?;

    let server = Server::with_credential(credential);
    let requested = server
        .request_certificate(&client, &RcgenCsrBuilder, &key_pem)
        .await?;

    let summary = json!({ "server_id": server.server_id(), "requested": requested });
    let out = output::render_single(global.output, &summary, |_| {
        format!("Certificate requested for {}.", server.server_id())
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
