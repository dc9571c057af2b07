// Server API HTTP client
//
// Wraps `reqwest::Client` with API-root URL resolution, version and
// credential headers, and the single status check every call goes
// through. Entity modules (server, pki) build on the `get`/`post` verbs
// here and never touch `reqwest` directly.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::auth::Credential;
use crate::error::{ApiError, Error};
use crate::transport::TransportConfig;

/// Header carrying the API version a request was written against.
pub const API_VERSION_HEADER: &str = "X-Cloak-API-Version";

/// Root under the base URL that all server API paths are relative to.
const API_ROOT: &str = "/api/server/";

/// Per-call request decoration: API version, extra headers, credential.
#[derive(Debug, Default, Clone)]
pub struct CallOptions<'a> {
    api_version: Option<&'a str>,
    headers: Vec<(&'static str, String)>,
    auth: Option<&'a Credential>,
}

impl<'a> CallOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `X-Cloak-API-Version: <version>`.
    pub fn api_version(mut self, version: &'a str) -> Self {
        self.api_version = Some(version);
        self
    }

    /// Add a request header.
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Authenticate the call as `credential`.
    pub fn auth(mut self, credential: &'a Credential) -> Self {
        self.auth = Some(credential);
        self
    }

    fn header_map(&self) -> Result<HeaderMap, Error> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            insert_header(&mut map, name, value)?;
        }
        if let Some(version) = self.api_version {
            insert_header(&mut map, API_VERSION_HEADER, version)?;
        }
        Ok(map)
    }
}

fn insert_header(map: &mut HeaderMap, name: &str, value: &str) -> Result<(), Error> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
        name: name.to_owned(),
        reason: e.to_string(),
    })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
        name: name.to_owned(),
        reason: e.to_string(),
    })?;
    map.insert(header_name, header_value);
    Ok(())
}

/// Raw HTTP client for the server management API.
///
/// Holds the API root (`<base_url>/api/server/`) and one reusable
/// `reqwest::Client`. Every response with a status outside `200..400`
/// becomes [`Error::Api`]; everything in range, 3xx included, is handed
/// back to the caller untouched.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_root: Url,
}

impl ApiClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the site root (e.g. `https://app.encrypt.me/`); any
    /// path on it is replaced by the API root.
    pub fn new(base_url: &Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(base_url, http)
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(base_url: &Url, http: reqwest::Client) -> Result<Self, Error> {
        let api_root = base_url.join(API_ROOT)?;
        Ok(Self { http, api_root })
    }

    /// The resolved API root, always ending in `/api/server/`.
    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Resolve `path` against the API root.
    ///
    /// Standard relative resolution: `"server/pki/"` lands under the root,
    /// while an absolute path or full URL replaces it.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.api_root.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    /// Send a GET request.
    pub async fn get(
        &self,
        path: &str,
        options: &CallOptions<'_>,
    ) -> Result<reqwest::Response, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let builder = self.http.get(url);
        Self::send(builder, options).await
    }

    /// Send a POST request with an optional form-encoded body.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        data: Option<&B>,
        options: &CallOptions<'_>,
    ) -> Result<reqwest::Response, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let mut builder = self.http.post(url);
        if let Some(data) = data {
            builder = builder.form(data);
        }
        Self::send(builder, options).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn send(
        builder: reqwest::RequestBuilder,
        options: &CallOptions<'_>,
    ) -> Result<reqwest::Response, Error> {
        let mut builder = builder.headers(options.header_map()?);
        if let Some(credential) = options.auth {
            builder = credential.apply(builder);
        }

        let resp = builder.send().await?;
        Self::check_status(resp).await
    }

    /// Pass responses in `200..400` through, turn the rest into `Error::Api`.
    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if (200..400).contains(&status.as_u16()) {
            return Ok(resp);
        }

        debug!(status = status.as_u16(), "request rejected");
        let headers = resp.headers().clone();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(status = status.as_u16(), error = %e, "failed to read error body");
                String::new()
            }
        };
        Err(ApiError::new(status, headers, body).into())
    }
}

/// Read a response body as JSON, keeping the body on failure.
pub(crate) async fn read_json(resp: reqwest::Response) -> Result<serde_json::Value, Error> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::with_client(&Url::parse(base).unwrap(), reqwest::Client::new()).unwrap()
    }

    #[test]
    fn api_root_replaces_base_path() {
        let api = client("https://app.encrypt.me/some/prefix/");
        assert_eq!(api.api_root().as_str(), "https://app.encrypt.me/api/server/");
    }

    #[test]
    fn relative_paths_join_under_root() {
        let api = client("https://app.encrypt.me/");
        assert_eq!(
            api.url("server/pki/").unwrap().as_str(),
            "https://app.encrypt.me/api/server/server/pki/"
        );
        assert_eq!(
            api.url("servers/").unwrap().as_str(),
            "https://app.encrypt.me/api/server/servers/"
        );
    }

    #[test]
    fn absolute_paths_replace_root() {
        let api = client("https://app.encrypt.me/");
        assert_eq!(
            api.url("/api/other/").unwrap().as_str(),
            "https://app.encrypt.me/api/other/"
        );
        assert_eq!(
            api.url("https://mirror.example/x").unwrap().as_str(),
            "https://mirror.example/x"
        );
    }

    #[test]
    fn options_build_version_and_extra_headers() {
        let options = CallOptions::new()
            .api_version("2017-01-01")
            .header("If-None-Match", "\"abc\"");
        let map = options.header_map().unwrap();
        assert_eq!(map.get(API_VERSION_HEADER).unwrap(), "2017-01-01");
        assert_eq!(map.get("if-none-match").unwrap(), "\"abc\"");
    }

    #[test]
    fn invalid_header_value_is_reported() {
        let options = CallOptions::new().header("If-None-Match", "bad\nvalue");
        assert!(matches!(
            options.header_map(),
            Err(Error::InvalidHeader { ref name, .. }) if name == "If-None-Match"
        ));
    }
}
