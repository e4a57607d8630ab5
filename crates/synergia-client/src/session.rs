//! Cookie-based session state shared by every request.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Cookie the portal expects to find before it serves any page. Installed
/// ahead of caller cookies so a freshly built client is already usable.
const SENTINEL_COOKIE: &str = "TestCookie=1";

/// A single session cookie.
///
/// This is the unit callers persist after [`authorize`](crate::Client::authorize)
/// and feed back into [`ClientBuilder::cookies`](crate::ClientBuilder::cookies)
/// to resume a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    /// Cookie name.
    pub key: String,
    /// Cookie value.
    pub value: String,
}

impl SessionCookie {
    /// Builds a cookie from any pair of string-likes.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Owns the cookie jar for one logical portal session.
///
/// The jar itself is handed to reqwest's cookie middleware, which absorbs
/// `Set-Cookie` headers from every response; this type only controls seeding
/// and snapshotting.
#[derive(Debug)]
pub(crate) struct SessionStore {
    jar: Arc<Jar>,
    origin: Url,
}

impl SessionStore {
    /// Creates the jar and seeds it: sentinel first, then caller cookies.
    pub(crate) fn new(origin: Url, seed: &[SessionCookie]) -> Self {
        let jar = Arc::new(Jar::default());
        jar.add_cookie_str(SENTINEL_COOKIE, &origin);
        for cookie in seed {
            jar.add_cookie_str(&format!("{}={}", cookie.key, cookie.value), &origin);
        }
        Self { jar, origin }
    }

    /// Shared handle for wiring the jar into a `reqwest::Client`.
    pub(crate) fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    /// Current cookies for the portal origin, sorted by key.
    ///
    /// The jar does not preserve insertion order, so sorting is what keeps
    /// snapshots deterministic for callers that diff or persist them.
    pub(crate) fn snapshot(&self) -> Vec<SessionCookie> {
        let header = match self.jar.cookies(&self.origin) {
            Some(header) => header,
            None => return Vec::new(),
        };
        let raw = match header.to_str() {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        let mut cookies: Vec<SessionCookie> = raw
            .split("; ")
            .filter_map(|pair| pair.split_once('='))
            .map(|(key, value)| SessionCookie::new(key, value))
            .collect();
        cookies.sort_by(|a, b| a.key.cmp(&b.key));
        cookies
    }
}
