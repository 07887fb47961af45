use crate::auth::CloudAuth;
use crate::error::{CloudError, Result};

/// `Authorization: Bearer <token>` for protected STAC APIs.
///
/// The token is only sent to the host it was configured for, so signed
/// asset URLs on other hosts are fetched without it.
pub struct BearerAuth {
    token: String,
    host: Option<String>,
}

fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    rest.split(['/', '?']).next().filter(|h| !h.is_empty())
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into(), host: None }
    }

    pub fn from_env(var: &str) -> Result<Self> {
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token.trim())),
            _ => Err(CloudError::Auth(format!("{var} not set"))),
        }
    }

    /// Restrict the token to requests whose host matches `url`'s host.
    pub fn scoped_to(mut self, url: &str) -> Self {
        self.host = host_of(url).map(str::to_string);
        self
    }
}

impl CloudAuth for BearerAuth {
    fn sign_request(&self, url: &str, _method: &str, headers: &mut Vec<(String, String)>) -> Result<()> {
        if let Some(host) = &self.host {
            if host_of(url) != Some(host.as_str()) {
                return Ok(());
            }
        }
        headers.push(("Authorization".to_string(), format!("Bearer {}", self.token)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_token_only_sent_to_its_host() {
        let auth = BearerAuth::new("s3cret").scoped_to("https://stac.example.com/v1");
        let mut headers = Vec::new();
        auth.sign_request("https://stac.example.com/v1/search", "POST", &mut headers).unwrap();
        assert_eq!(headers, vec![("Authorization".to_string(), "Bearer s3cret".to_string())]);

        headers.clear();
        auth.sign_request("https://bucket.s3.amazonaws.com/B03.tif", "GET", &mut headers).unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn missing_env_is_auth_error() {
        let err = BearerAuth::from_env("TIDEMARK_TEST_TOKEN_THAT_IS_NOT_SET").err().unwrap();
        assert!(err.is_auth());
    }
}
