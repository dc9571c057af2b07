// Server entity
//
// A registered gateway node: its credential plus the server record the
// API returns. Registration and retrieval build one; the certificate
// operations run against an existing one.

use std::ops::Deref;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::header::ETAG;
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::Credential;
use crate::client::{ApiClient, CallOptions, read_json};
use crate::csr::CsrBuilder;
use crate::error::Error;
use crate::pki::{Pki, PkiFetch};
use crate::result::{ApiResult, Field, GENERIC, Schema};

/// API version new registrations are made against.
pub const DEFAULT_API_VERSION: &str = "2017-01-01";

static TARGET_FIELDS: [Field; 2] = [
    Field::list("openvpn", &GENERIC),
    Field::list("ikev2", &GENERIC),
];

/// The `target` sub-object: per-protocol configuration entries.
pub static TARGET: Schema = Schema::new("target", &TARGET_FIELDS);

static SERVER_FIELDS: [Field; 1] = [Field::one("target", &TARGET)];

/// Shape of a server record.
pub static SERVER: Schema = Schema::new("server", &SERVER_FIELDS);

/// Account details for registering a new server.
#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub email: &'a str,
    pub password: &'a SecretString,
    pub target_id: &'a str,
    /// Server name; the local host name when `None`.
    pub name: Option<&'a str>,
    pub api_version: &'a str,
}

impl<'a> Registration<'a> {
    pub fn new(email: &'a str, password: &'a SecretString, target_id: &'a str) -> Self {
        Self {
            email,
            password,
            target_id,
            name: None,
            api_version: DEFAULT_API_VERSION,
        }
    }

    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn api_version(mut self, version: &'a str) -> Self {
        self.api_version = version;
        self
    }
}

#[derive(Serialize)]
struct RegisterForm<'a> {
    email: &'a str,
    password: &'a str,
    target: &'a str,
    name: &'a str,
}

/// A registered server and its last known state.
#[derive(Debug, Clone)]
pub struct Server {
    credential: Credential,
    result: ApiResult,
}

impl Server {
    pub fn new(credential: Credential, raw: Value) -> Self {
        Self {
            credential,
            result: ApiResult::new(&SERVER, raw),
        }
    }

    /// A handle for a server known only by its credential. The record is
    /// null until fetched with [`Server::retrieve`].
    pub fn with_credential(credential: Credential) -> Self {
        Self::new(credential, Value::Null)
    }

    // ── Constructors ─────────────────────────────────────────────────

    /// Register a new server with a team.
    ///
    /// `POST servers/` with the account email/password, target id and
    /// server name. The reply carries the new `server_id`, `auth_token`
    /// and the `server` record.
    pub async fn register(
        client: &ApiClient,
        registration: &Registration<'_>,
    ) -> Result<Self, Error> {
        let name = registration
            .name
            .map_or_else(default_server_name, str::to_owned);

        let form = RegisterForm {
            email: registration.email,
            password: registration.password.expose_secret(),
            target: registration.target_id,
            name: &name,
        };

        debug!(target_id = registration.target_id, name = %name, "registering server");
        let options = CallOptions::new().api_version(registration.api_version);
        let resp = client.post("servers/", Some(&form), &options).await?;
        let reply = read_json(resp).await?;

        let server_id = required_str(&reply, "server_id")?;
        let auth_token = required_str(&reply, "auth_token")?;
        let record = reply
            .get("server")
            .filter(|record| !record.is_null())
            .cloned()
            .ok_or_else(|| missing_key(&reply, "server"))?;

        info!(server_id = %server_id, "server registered");
        let credential = Credential::new(server_id, SecretString::from(auth_token));
        Ok(Self::new(credential, record))
    }

    /// Fetch the current state of an existing server.
    ///
    /// `GET server/`, authenticated as `credential`.
    pub async fn retrieve(client: &ApiClient, credential: Credential) -> Result<Self, Error> {
        debug!(server_id = credential.server_id(), "retrieving server");
        let options = CallOptions::new().auth(&credential);
        let resp = client.get("server/", &options).await?;
        let record = read_json(resp).await?;

        Ok(Self::new(credential, record))
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Ask the server API to issue a certificate for this server.
    ///
    /// Builds a CSR for `key_pem` with this server's id as common name and
    /// posts it base64-encoded to `server/csr/`. Returns `true` once the
    /// request is accepted; rejection is always an `Err`.
    pub async fn request_certificate(
        &self,
        client: &ApiClient,
        csr_builder: &impl CsrBuilder,
        key_pem: &str,
    ) -> Result<bool, Error> {
        let der = csr_builder.build_csr(key_pem, self.credential.server_id())?;
        let csr = STANDARD.encode(der);

        debug!(server_id = self.credential.server_id(), "submitting CSR");
        let options = CallOptions::new().auth(&self.credential);
        client
            .post("server/csr/", Some(&[("csr", csr.as_str())]), &options)
            .await?;

        Ok(true)
    }

    /// Fetch this server's PKI bundle.
    ///
    /// With an `etag` from an earlier [`Pki`], the request is conditional
    /// and an unchanged bundle comes back as [`PkiFetch::NotModified`]
    /// without a body.
    pub async fn get_pki(
        &self,
        client: &ApiClient,
        etag: Option<&str>,
    ) -> Result<PkiFetch, Error> {
        let mut options = CallOptions::new().auth(&self.credential);
        if let Some(etag) = etag {
            options = options.header("If-None-Match", etag);
        }

        let resp = client.get("server/pki/", &options).await?;
        if resp.status() == StatusCode::NOT_MODIFIED {
            debug!("PKI not modified");
            return Ok(PkiFetch::NotModified);
        }

        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = read_json(resp).await?;

        Ok(PkiFetch::Pki(Pki::with_etag(body, etag)))
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn server_id(&self) -> &str {
        self.credential.server_id()
    }

    /// The server's display name, as recorded by the API.
    pub fn name(&self) -> Option<&str> {
        self.result.str("name")
    }

    pub fn target(&self) -> Option<&ApiResult> {
        self.result.object("target")
    }

    /// OpenVPN configuration entries of the linked target.
    pub fn openvpn(&self) -> &[ApiResult] {
        self.target()
            .map(|t| t.list("openvpn"))
            .unwrap_or_default()
    }

    /// IKEv2 configuration entries of the linked target.
    pub fn ikev2(&self) -> &[ApiResult] {
        self.target()
            .map(|t| t.list("ikev2"))
            .unwrap_or_default()
    }
}

impl Deref for Server {
    type Target = ApiResult;

    fn deref(&self) -> &ApiResult {
        &self.result
    }
}

impl Serialize for Server {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.result.serialize(serializer)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Name registered when none is given: the host's canonical DNS name,
/// else its nodename, else `localhost`.
pub fn default_server_name() -> String {
    let short = hostname::get().ok().and_then(|h| h.into_string().ok());
    let canonical = short.as_deref().and_then(canonical_name);
    pick_server_name(canonical, short)
}

fn pick_server_name(canonical: Option<String>, short: Option<String>) -> String {
    canonical
        .filter(|name| name.contains('.'))
        .or_else(|| short.filter(|name| !name.is_empty()))
        .unwrap_or_else(|| "localhost".into())
}

#[cfg(unix)]
fn canonical_name(host: &str) -> Option<String> {
    let hints = dns_lookup::AddrInfoHints {
        flags: libc::AI_CANONNAME,
        ..dns_lookup::AddrInfoHints::default()
    };
    match dns_lookup::getaddrinfo(Some(host), None, Some(hints)) {
        Ok(mut addrs) => addrs.find_map(|addr| addr.ok()?.canonname),
        Err(e) => {
            debug!(host, error = ?e, "canonical name lookup failed");
            None
        }
    }
}

#[cfg(not(unix))]
fn canonical_name(_host: &str) -> Option<String> {
    None
}

fn required_str(reply: &Value, key: &str) -> Result<String, Error> {
    reply
        .get(key)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| missing_key(reply, key))
}

fn missing_key(reply: &Value, key: &str) -> Error {
    Error::Deserialization {
        message: format!("registration reply has no '{key}'"),
        body: reply.to_string(),
    }
}
