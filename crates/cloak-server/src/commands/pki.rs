//! `pki`: download this server's PKI bundle, conditionally on the cached
//! ETag.

use tabled::Tabled;
use tracing::debug;

use cloak_api::{ApiResult, Pki, PkiFetch, Server};

use crate::cli::{GlobalOpts, PkiArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output::{self, Detail};

#[derive(Tabled)]
struct CertRow {
    #[tabled(rename = "Role")]
    role: &'static str,
    #[tabled(rename = "Certificate")]
    summary: String,
}

fn cert_rows<'a>(role: &'static str, certs: &'a [ApiResult]) -> impl Iterator<Item = CertRow> + 'a {
    certs.iter().map(move |cert| CertRow {
        role,
        summary: output::summarize(cert.raw()),
    })
}

fn pki_detail(pki: &Pki) -> String {
    let entity = pki.entity().map(std::slice::from_ref).unwrap_or_default();
    let rows: Vec<CertRow> = cert_rows("entity", entity)
        .chain(cert_rows("intermediate", pki.intermediates()))
        .chain(cert_rows("extra", pki.extras()))
        .chain(cert_rows("anchor", pki.anchors()))
        .collect();

    Detail::new()
        .row("ETag", pki.etag().unwrap_or("-"))
        .row("Entity", if pki.entity().is_some() { "yes" } else { "no" })
        .row("Intermediates", pki.intermediates().len().to_string())
        .row("Extras", pki.extras().len().to_string())
        .row("Anchors", pki.anchors().len().to_string())
        .table("Chain", &rows)
        .render()
}

pub async fn handle(
    args: &PkiArgs,
    session: &mut Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let credential = session.credential()?;
    let client = session.client(global)?;

    let etag = if args.force {
        None
    } else {
        args.etag
            .as_deref()
            .or_else(|| session.config.pki_etag())
            .map(str::to_owned)
    };
    debug!(etag = ?etag, "fetching PKI");

    let server = Server::with_credential(credential);
    match server.get_pki(&client, etag.as_deref()).await? {
        PkiFetch::NotModified => {
            output::print_output("PKI not modified.", global.quiet);
        }
        PkiFetch::Pki(pki) => {
            session.config.set_pki_etag(pki.etag());
            let out = output::render_single(global.output, &pki, pki_detail)?;
            output::print_output(&out, global.quiet);
        }
    }
    Ok(())
}
