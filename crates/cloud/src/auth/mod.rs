//! Request authentication for STAC endpoints and asset hosts.

mod bearer;
mod none;

pub use bearer::BearerAuth;
pub use none::NoAuth;

use crate::error::Result;

/// Adds credentials to outgoing requests.
pub trait CloudAuth: Send + Sync {
    /// Push authentication headers for a request to `url`.
    fn sign_request(&self, url: &str, method: &str, headers: &mut Vec<(String, String)>) -> Result<()>;
}

/// `BearerAuth` when the environment variable holds a token, otherwise `NoAuth`.
pub fn from_env(var: &str) -> Box<dyn CloudAuth> {
    match BearerAuth::from_env(var) {
        Ok(auth) => Box::new(auth),
        Err(_) => Box::new(NoAuth),
    }
}
