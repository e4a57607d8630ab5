//! Form-based portal authorization.

use tracing::{info, warn};

use crate::client::Client;
use crate::error::{SynergiaError, SynergiaResult};
use crate::session::SessionCookie;

impl Client {
    /// Runs the three-step form authorization and returns the resulting
    /// session cookie snapshot for the caller to persist.
    ///
    /// Steps: open the OAuth authorization page, post the credentials, then
    /// probe the second-factor endpoint the portal routes dual-factor
    /// accounts through (no code is submitted; the probe completes the
    /// exchange for ordinary accounts). A failing step surfaces as
    /// [`SynergiaError::Auth`] naming the step, with the transport failure
    /// as its source.
    ///
    /// A clean return means the exchange completed. The portal does not
    /// reliably signal rejected credentials with an error status, so callers
    /// who need certainty should follow up by fetching a protected resource.
    pub async fn authorize(
        &self,
        login: &str,
        password: &str,
    ) -> SynergiaResult<Vec<SessionCookie>> {
        info!("starting portal authorization");
        self.get(&self.endpoints.authorization_entry_url())
            .await
            .map_err(|e| auth_step_failed("entry", e))?;
        let form = [("action", "login"), ("login", login), ("pass", password)];
        self.post(&self.endpoints.authorization_login_url(), &form)
            .await
            .map_err(|e| auth_step_failed("credentials", e))?;
        self.get(&self.endpoints.authorization_2fa_url())
            .await
            .map_err(|e| auth_step_failed("two_factor", e))?;
        let cookies = self.session_cookies();
        info!(cookies = cookies.len(), "authorization completed");
        Ok(cookies)
    }
}

fn auth_step_failed(step: &'static str, source: SynergiaError) -> SynergiaError {
    warn!(step, error = %source, "authorization step failed");
    SynergiaError::Auth {
        step,
        source: Box::new(source),
    }
}
