// cloak-api: Async Rust client for the Encrypt.me server management API

pub mod auth;
pub mod client;
pub mod csr;
pub mod error;
pub mod pki;
pub mod result;
pub mod server;
pub mod transport;

pub use auth::Credential;
pub use client::{API_VERSION_HEADER, ApiClient, CallOptions};
pub use csr::{CsrBuilder, RcgenCsrBuilder};
pub use error::{ApiError, Error};
pub use pki::{Pki, PkiFetch};
pub use result::{ApiResult, Attr, Field, GENERIC, Schema};
pub use server::{DEFAULT_API_VERSION, Registration, Server, default_server_name};
pub use transport::{TlsMode, TransportConfig};

pub use reqwest::StatusCode;
pub use reqwest::header::HeaderMap;
