//! Bearer token for the Météo-France nowcast API.
//!
//! The portal sets an `mfsession` cookie on an anonymous visit; the API expects
//! that cookie's value ROT13-encoded as a bearer token.

use std::sync::Arc;
use tracing::debug;

use crate::{
    error::{RainError, Result},
    http::Fetch,
};

pub const SESSION_COOKIE: &str = "mfsession";

/// Token derived for a single request sequence. Never cached.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn from_cookie(cookie_value: &str) -> Self {
        Self(rot13(cookie_value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// Rotates ASCII letters by 13 places. Self-inverse.
pub fn rot13(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'a'..='z' => (((c as u8 - b'a') + 13) % 26 + b'a') as char,
            'A'..='Z' => (((c as u8 - b'A') + 13) % 26 + b'A') as char,
            _ => c,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct SessionTokenResolver {
    fetcher: Arc<dyn Fetch>,
    portal_url: String,
}

impl SessionTokenResolver {
    pub fn new(fetcher: Arc<dyn Fetch>, portal_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            portal_url: portal_url.into(),
        }
    }

    /// Visits the portal and derives a token from its session cookie.
    pub async fn resolve(&self) -> Result<SessionToken> {
        let res = self.fetcher.get(&self.portal_url, &[]).await?;
        debug!(url = %self.portal_url, status = res.status, "session portal answered");

        let cookie = res
            .cookie(SESSION_COOKIE)
            .ok_or_else(|| RainError::MissingSessionCookie(SESSION_COOKIE.to_string()))?;

        Ok(SessionToken::from_cookie(cookie))
    }
}
