use std::ops::Deref;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::result::{ApiResult, Field, GENERIC, Schema};

static PKI_FIELDS: [Field; 4] = [
    Field::one("entity", &GENERIC),
    Field::list("intermediates", &GENERIC),
    Field::list("extras", &GENERIC),
    Field::list("anchors", &GENERIC),
];

/// Shape of the `server/pki/` response: one entity certificate plus the
/// intermediate, extra and anchor certificates around it.
pub static PKI: Schema = Schema::new("pki", &PKI_FIELDS);

/// A server's certificate chain bundle.
///
/// The `etag` is the validator the server sent alongside the body. It is
/// set by [`Server::get_pki`](crate::Server::get_pki) only and is not part
/// of the decoded data.
#[derive(Debug, Clone)]
pub struct Pki {
    result: ApiResult,
    etag: Option<String>,
}

impl Pki {
    pub fn new(raw: Value) -> Self {
        Self {
            result: ApiResult::new(&PKI, raw),
            etag: None,
        }
    }

    pub(crate) fn with_etag(raw: Value, etag: Option<String>) -> Self {
        Self {
            etag,
            ..Self::new(raw)
        }
    }

    /// Cache validator to send back on the next fetch.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn entity(&self) -> Option<&ApiResult> {
        self.result.object("entity")
    }

    pub fn intermediates(&self) -> &[ApiResult] {
        self.result.list("intermediates")
    }

    pub fn extras(&self) -> &[ApiResult] {
        self.result.list("extras")
    }

    pub fn anchors(&self) -> &[ApiResult] {
        self.result.list("anchors")
    }

    pub fn into_result(self) -> ApiResult {
        self.result
    }
}

impl Deref for Pki {
    type Target = ApiResult;

    fn deref(&self) -> &ApiResult {
        &self.result
    }
}

impl Serialize for Pki {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.result.serialize(serializer)
    }
}

/// Outcome of a conditional PKI fetch.
#[derive(Debug, Clone)]
pub enum PkiFetch {
    /// The validator we sent still matches; keep the cached copy.
    NotModified,
    /// A fresh bundle.
    Pki(Pki),
}

impl PkiFetch {
    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::NotModified)
    }

    pub fn into_pki(self) -> Option<Pki> {
        match self {
            Self::NotModified => None,
            Self::Pki(pki) => Some(pki),
        }
    }
}
