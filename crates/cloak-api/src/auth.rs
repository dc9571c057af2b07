use secrecy::{ExposeSecret, SecretString};

/// Identity of one registered server: its id plus the token issued at
/// registration.
///
/// Sent as HTTP basic auth on every authenticated call. The token is a
/// [`SecretString`] so it never shows up in `Debug` output or logs.
#[derive(Debug, Clone)]
pub struct Credential {
    server_id: String,
    auth_token: SecretString,
}

impl Credential {
    pub fn new(server_id: impl Into<String>, auth_token: impl Into<SecretString>) -> Self {
        Self {
            server_id: server_id.into(),
            auth_token: auth_token.into(),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn auth_token(&self) -> &SecretString {
        &self.auth_token
    }

    /// Attach this credential to a request as basic auth.
    pub(crate) fn apply(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.basic_auth(&self.server_id, Some(self.auth_token.expose_secret()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let token = SecretString::from("tok-very-secret".to_string());
        let credential = Credential::new("srv_123", token);
        let debug = format!("{credential:?}");
        assert!(debug.contains("srv_123"));
        assert!(!debug.contains("tok-very-secret"));
        assert_eq!(credential.auth_token().expose_secret(), "tok-very-secret");
    }
}
