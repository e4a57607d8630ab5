//! The portal client: session wiring, builder and the request executor.

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Method, Response, Url};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::{Endpoints, USER_AGENT};
use crate::document::Document;
use crate::download::DownloadPolicy;
use crate::error::{SynergiaError, SynergiaResult};
use crate::session::{SessionCookie, SessionStore};

/// Async client for one logical portal session.
///
/// All methods take `&self`, so a client is cheap to share by reference
/// across tasks. Requests from one client go on the wire one at a time;
/// concurrent callers queue rather than interleave their cookie updates.
#[derive(Debug)]
pub struct Client {
    pub(crate) endpoints: Endpoints,
    pub(crate) session: SessionStore,
    pub(crate) http: reqwest::Client,
    pub(crate) http_manual_redirect: reqwest::Client,
    pub(crate) gate: Mutex<()>,
    pub(crate) download_policy: DownloadPolicy,
}

impl Client {
    /// Client against the production portal, seeded with `cookies`.
    ///
    /// Pass an empty iterator for a fresh session that still has to go
    /// through [`authorize`](Client::authorize).
    pub fn new(cookies: impl IntoIterator<Item = SessionCookie>) -> SynergiaResult<Self> {
        Self::builder().cookies(cookies).build()
    }

    /// Builder with default endpoints, an empty cookie seed and the default
    /// download policy.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Snapshot of the current session cookies, sorted by key.
    ///
    /// This is what callers persist and later feed back into
    /// [`ClientBuilder::cookies`] to resume the session.
    pub fn session_cookies(&self) -> Vec<SessionCookie> {
        self.session.snapshot()
    }

    /// GET `target` and parse the response into a [`Document`].
    pub async fn get(&self, target: &str) -> SynergiaResult<Document> {
        self.execute(Method::GET, target, None).await
    }

    /// POST an urlencoded form to `target` and parse the response into a
    /// [`Document`].
    pub async fn post(&self, target: &str, form: &[(&str, &str)]) -> SynergiaResult<Document> {
        self.execute(Method::POST, target, Some(form)).await
    }

    /// Issues a request with the session cookies, follows redirects, insists
    /// on a success status and parses the final body.
    ///
    /// `target` is either an absolute URL or a path relative to the portal
    /// base URL.
    pub async fn execute(
        &self,
        method: Method,
        target: &str,
        form: Option<&[(&str, &str)]>,
    ) -> SynergiaResult<Document> {
        let response = self.send(&self.http, method, target, form).await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;
        Ok(Document::parse(&body))
    }

    /// Issues a request and hands back the raw response: no status check, no
    /// body parsing, and with `follow_redirects = false` no redirect
    /// following either.
    ///
    /// Binary payloads and the download handshake go through here.
    pub async fn execute_raw(
        &self,
        method: Method,
        target: &str,
        form: Option<&[(&str, &str)]>,
        follow_redirects: bool,
    ) -> SynergiaResult<Response> {
        let client = if follow_redirects {
            &self.http
        } else {
            &self.http_manual_redirect
        };
        self.send(client, method, target, form).await
    }

    async fn send(
        &self,
        client: &reqwest::Client,
        method: Method,
        target: &str,
        form: Option<&[(&str, &str)]>,
    ) -> SynergiaResult<Response> {
        let url = self.endpoints.resolve(target);
        debug!(method = %method, url = %url, "portal request");
        let mut request = client.request(method, url);
        if let Some(form) = form {
            request = request.form(form);
        }
        // One request on the wire at a time; the jar sees cookie updates in
        // a defined order even when callers race.
        let _turn = self.gate.lock().await;
        Ok(request.send().await?)
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    endpoints: Endpoints,
    cookies: Vec<SessionCookie>,
    download_policy: DownloadPolicy,
    timeout: Duration,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            cookies: Vec::new(),
            download_policy: DownloadPolicy::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientBuilder {
    /// Overrides the portal endpoints, for tests or alternate deployments.
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Appends cookies to the session seed. The sentinel cookie is installed
    /// before any of these.
    pub fn cookies(mut self, cookies: impl IntoIterator<Item = SessionCookie>) -> Self {
        self.cookies.extend(cookies);
        self
    }

    /// Overrides the attachment readiness-polling policy.
    pub fn download_policy(mut self, policy: DownloadPolicy) -> Self {
        self.download_policy = policy;
        self
    }

    /// Per-request timeout. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client: parses the portal origin, seeds the cookie jar and
    /// constructs the two HTTP clients (redirect-following and manual) over
    /// the shared jar.
    pub fn build(self) -> SynergiaResult<Client> {
        let origin =
            Url::parse(&self.endpoints.portal_base_url).map_err(|e| SynergiaError::InvalidTarget {
                target: self.endpoints.portal_base_url.clone(),
                message: e.to_string(),
            })?;
        let session = SessionStore::new(origin, &self.cookies);
        // Redirect policy is a client-level setting in reqwest, so the
        // manual-redirect path needs its own client over the same jar.
        let http = http_client(&session, self.timeout, Policy::limited(10))?;
        let http_manual_redirect = http_client(&session, self.timeout, Policy::none())?;
        Ok(Client {
            endpoints: self.endpoints,
            session,
            http,
            http_manual_redirect,
            gate: Mutex::new(()),
            download_policy: self.download_policy,
        })
    }
}

fn http_client(
    session: &SessionStore,
    timeout: Duration,
    redirects: Policy,
) -> SynergiaResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .cookie_provider(session.jar())
        .timeout(timeout)
        .redirect(redirects)
        .build()?)
}
