use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CredentialsError {
    #[error("access token cannot be empty")]
    EmptyToken,
}

pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Access token issued by the login flow.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_token: String,
    token_type: String,
}

impl Credentials {
    /// A blank token type falls back to `Bearer`.
    ///
    /// # Errors
    ///
    /// Returns `CredentialsError::EmptyToken` if the token is blank.
    pub fn new(
        access_token: impl Into<String>,
        token_type: Option<String>,
    ) -> Result<Self, CredentialsError> {
        let access_token = access_token.into().trim().to_string();
        if access_token.is_empty() {
            return Err(CredentialsError::EmptyToken);
        }
        let token_type = token_type
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());
        Ok(Self {
            access_token,
            token_type,
        })
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    #[must_use]
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token_type", &self.token_type)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_joins_type_and_token() {
        let creds = Credentials::new("abc", Some("bearer".into())).unwrap();
        assert_eq!(creds.authorization_header(), "bearer abc");
    }

    #[test]
    fn missing_type_defaults_to_bearer() {
        let creds = Credentials::new(" tok ", Some("  ".into())).unwrap();
        assert_eq!(creds.token_type(), "Bearer");
        assert_eq!(creds.access_token(), "tok");
    }

    #[test]
    fn blank_token_is_rejected() {
        assert_eq!(
            Credentials::new("   ", None).unwrap_err(),
            CredentialsError::EmptyToken
        );
    }

    #[test]
    fn debug_output_hides_token() {
        let creds = Credentials::new("secret", None).unwrap();
        assert!(!format!("{creds:?}").contains("secret"));
    }
}
