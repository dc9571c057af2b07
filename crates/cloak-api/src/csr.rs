// Certificate signing requests
//
// `Server::request_certificate` only needs "key + common name in, DER
// out". The rcgen-backed builder is the default; tests and callers with
// an HSM or other signer plug in their own `CsrBuilder`.

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use tracing::debug;

use crate::error::Error;

/// Builds a DER-encoded PKCS#10 request for a private key.
pub trait CsrBuilder {
    /// Sign a request whose subject is `CN=<common_name>` and whose public
    /// key matches `key_pem` (a PEM-encoded PKCS#8 private key).
    fn build_csr(&self, key_pem: &str, common_name: &str) -> Result<Vec<u8>, Error>;
}

/// [`CsrBuilder`] backed by `rcgen`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RcgenCsrBuilder;

impl CsrBuilder for RcgenCsrBuilder {
    fn build_csr(&self, key_pem: &str, common_name: &str) -> Result<Vec<u8>, Error> {
        let key_pair = KeyPair::from_pem(key_pem).map_err(|e| Error::InvalidKey(e.to_string()))?;

        let mut subject = DistinguishedName::new();
        subject.push(DnType::CommonName, common_name);

        let mut params = CertificateParams::default();
        params.distinguished_name = subject;

        let csr = params
            .serialize_request(&key_pair)
            .map_err(|e| Error::Csr(e.to_string()))?;

        debug!(common_name, "built certificate signing request");
        Ok(csr.der().to_vec())
    }
}
