//! Portal endpoints and the fixed client identity.

use serde::{Deserialize, Serialize};

/// User-Agent sent with every request. The portal tailors responses to the
/// client fingerprint, so this must stay constant across a session.
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/47.0.2526.73 Safari/537.36";

/// OAuth client id registered for the portal web application.
pub const OAUTH_CLIENT_ID: &str = "46";

fn default_portal_base_url() -> String {
    "https://synergia.librus.pl".to_string()
}

fn default_oauth_base_url() -> String {
    "https://api.librus.pl".to_string()
}

fn default_check_key_url() -> String {
    "https://sandbox.librus.pl/index.php?action=CSCheckKey".to_string()
}

/// Base URLs of the portal deployment.
///
/// Defaults point at the production portal; tests and alternate deployments
/// override them through [`ClientBuilder::endpoints`](crate::ClientBuilder::endpoints).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    /// Host serving the logged-in portal pages.
    #[serde(default = "default_portal_base_url")]
    pub portal_base_url: String,
    /// Host serving the OAuth authorization endpoints.
    #[serde(default = "default_oauth_base_url")]
    pub oauth_base_url: String,
    /// Endpoint polled while an attachment is prepared for download.
    #[serde(default = "default_check_key_url")]
    pub check_key_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            portal_base_url: default_portal_base_url(),
            oauth_base_url: default_oauth_base_url(),
            check_key_url: default_check_key_url(),
        }
    }
}

impl Endpoints {
    /// Absolute targets pass through untouched; anything else is joined onto
    /// the portal base URL.
    pub(crate) fn resolve(&self, target: &str) -> String {
        if target.starts_with("https://") || target.starts_with("http://") {
            return target.to_string();
        }
        let base = self.portal_base_url.trim_end_matches('/');
        let path = target.trim_start_matches('/');
        format!("{base}/{path}")
    }

    pub(crate) fn authorization_entry_url(&self) -> String {
        let base = self.oauth_base_url.trim_end_matches('/');
        format!("{base}/OAuth/Authorization?client_id={OAUTH_CLIENT_ID}&response_type=code&scope=mydata")
    }

    pub(crate) fn authorization_login_url(&self) -> String {
        let base = self.oauth_base_url.trim_end_matches('/');
        format!("{base}/OAuth/Authorization?client_id={OAUTH_CLIENT_ID}")
    }

    pub(crate) fn authorization_2fa_url(&self) -> String {
        let base = self.oauth_base_url.trim_end_matches('/');
        format!("{base}/OAuth/Authorization/2FA?client_id={OAUTH_CLIENT_ID}")
    }
}
