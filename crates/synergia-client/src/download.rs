//! Attachment downloads: redirect classification, readiness polling and the
//! binary payload.
//!
//! The portal never serves a file straight from its page URL. The initial
//! request answers with a redirect that either points at the file itself
//! (direct delivery) or at a waiting page whose query string carries a
//! single-use key; in the second case the file is prepared asynchronously
//! and the client polls a check endpoint until the portal reports it ready.

use std::path::Path;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::{header, Method, Response, Url};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::client::Client;
use crate::error::{SynergiaError, SynergiaResult};

/// Marker in a redirect URL meaning the file is served without preparation.
const DIRECT_DELIVERY_MARKER: &str = "GetFile";
/// Suffix appended to a direct-delivery URL to address the file body.
const DIRECT_DELIVERY_SUFFIX: &str = "/get";
/// Query parameter carrying the one-time download token.
const SINGLE_USE_KEY_PARAM: &str = "singleUseKey";
/// Verb in a prepared-delivery URL while the file is still being prepared.
const TRY_DOWNLOAD_VERB: &str = "CSTryToDownload";
/// Verb that addresses the prepared file once it is ready.
const DOWNLOAD_VERB: &str = "CSDownload";
/// Substring of the check-key response body that signals readiness.
const READY_MARKER: &str = "ready";

/// Bounds for the readiness-polling loop of a prepared-delivery download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadPolicy {
    /// Maximum number of readiness checks before giving up.
    pub max_checks: u32,
    /// Base delay in milliseconds for exponential backoff between checks.
    pub poll_base_ms: u64,
    /// Maximum delay in milliseconds (cap for exponential backoff).
    pub poll_max_ms: u64,
    /// Overall deadline in milliseconds for the polling phase of one
    /// download.
    pub deadline_ms: u64,
}

impl Default for DownloadPolicy {
    fn default() -> Self {
        Self {
            max_checks: 30,
            poll_base_ms: 500,
            poll_max_ms: 8_000,
            deadline_ms: 120_000,
        }
    }
}

/// Computes the delay before the next readiness check using exponential
/// backoff capped at `poll_max_ms`.
fn poll_backoff(policy: &DownloadPolicy, check: u32) -> u64 {
    let delay = policy.poll_base_ms.saturating_mul(2u64.saturating_pow(check));
    delay.min(policy.poll_max_ms)
}

/// How the portal chose to deliver a requested file.
#[derive(Debug, PartialEq, Eq)]
enum Delivery {
    /// Served immediately from the contained URL.
    Direct(String),
    /// Prepared asynchronously; poll with `key`, then fetch the
    /// verb-substituted `target`.
    Prepared { key: String, target: String },
}

/// Classifies the redirect the portal answered a download request with.
fn classify_redirect(location: &Url) -> SynergiaResult<Delivery> {
    if location.as_str().contains(DIRECT_DELIVERY_MARKER) {
        return Ok(Delivery::Direct(format!(
            "{location}{DIRECT_DELIVERY_SUFFIX}"
        )));
    }
    let key = location
        .query_pairs()
        .find_map(|(name, value)| {
            if name == SINGLE_USE_KEY_PARAM {
                Some(value.into_owned())
            } else {
                None
            }
        })
        .ok_or_else(|| SynergiaError::MissingDownloadKey {
            url: location.to_string(),
        })?;
    Ok(Delivery::Prepared {
        key,
        target: location.to_string(),
    })
}

/// The URL a prepared file is fetched from once the portal reports it ready.
fn download_url(target: &str) -> String {
    target.replace(TRY_DOWNLOAD_VERB, DOWNLOAD_VERB)
}

impl Client {
    /// Downloads a portal file, e.g. a message attachment path of the form
    /// `wiadomosci/pobierz_zalacznik/{message}/{file}`.
    ///
    /// Direct-delivery redirects are fetched immediately; prepared-delivery
    /// redirects are polled per the client's [`DownloadPolicy`], reusing the
    /// same single-use key on every check. An exhausted polling budget
    /// surfaces as [`SynergiaError::DownloadStuck`].
    pub async fn download(&self, path: &str) -> SynergiaResult<Attachment> {
        debug!(path, "requesting file");
        let response = self.execute_raw(Method::GET, path, None, false).await?;
        let status = response.status().as_u16();
        let location = match response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
        {
            Some(location) => location.to_string(),
            None => {
                return Err(SynergiaError::MissingRedirect {
                    path: path.to_string(),
                    status,
                })
            }
        };
        // Location may be relative; resolve it against the request URL.
        let location = response
            .url()
            .join(&location)
            .map_err(|e| SynergiaError::InvalidTarget {
                target: location.clone(),
                message: e.to_string(),
            })?;
        match classify_redirect(&location)? {
            Delivery::Direct(url) => {
                debug!(url = %url, "direct delivery");
                self.fetch_binary(&url).await
            }
            Delivery::Prepared { key, target } => {
                debug!(target = %target, "prepared delivery, waiting for readiness");
                let url = self.wait_until_ready(&key, &target).await?;
                self.fetch_binary(&url).await
            }
        }
    }

    async fn fetch_binary(&self, url: &str) -> SynergiaResult<Attachment> {
        let response = self
            .execute_raw(Method::GET, url, None, true)
            .await?
            .error_for_status()?;
        Ok(Attachment { response })
    }

    /// Polls the check-key endpoint until the portal reports the file ready,
    /// then returns the URL to fetch it from.
    ///
    /// The single-use key and the redirect target stay fixed across checks;
    /// only the delay between checks grows.
    async fn wait_until_ready(&self, key: &str, target: &str) -> SynergiaResult<String> {
        let policy = &self.download_policy;
        let form = [(SINGLE_USE_KEY_PARAM, key)];
        let started = Instant::now();
        let mut checks = 0u32;
        loop {
            let response = self
                .execute_raw(Method::POST, &self.endpoints.check_key_url, Some(&form), true)
                .await?
                .error_for_status()?;
            let body = response.text().await?;
            checks += 1;
            if body.contains(READY_MARKER) {
                debug!(checks, "file ready");
                return Ok(download_url(target));
            }
            if checks >= policy.max_checks {
                break;
            }
            let elapsed_ms = started.elapsed().as_millis() as u64;
            let delay = poll_backoff(policy, checks - 1);
            if elapsed_ms.saturating_add(delay) > policy.deadline_ms {
                break;
            }
            debug!(checks, delay_ms = delay, "file not ready, backing off");
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let elapsed_ms = started.elapsed().as_millis() as u64;
        warn!(checks, elapsed_ms, "giving up waiting for file readiness");
        Err(SynergiaError::DownloadStuck { checks, elapsed_ms })
    }
}

/// A downloaded file.
///
/// Metadata is readable before the body is consumed; the body itself can be
/// buffered with [`bytes`](Attachment::bytes) or streamed to disk with
/// [`save_to`](Attachment::save_to).
#[derive(Debug)]
pub struct Attachment {
    response: Response,
}

impl Attachment {
    /// MIME type reported by the portal, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Payload size from the Content-Length header, if the portal sent one.
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// File name from the Content-Disposition header, if the portal sent
    /// one. `filename*` values are returned as transmitted, without
    /// percent-decoding.
    pub fn file_name(&self) -> Option<String> {
        let disposition = self
            .response
            .headers()
            .get(header::CONTENT_DISPOSITION)?
            .to_str()
            .ok()?;
        content_disposition_file_name(disposition)
    }

    /// Buffers the whole payload in memory.
    pub async fn bytes(self) -> SynergiaResult<Bytes> {
        Ok(self.response.bytes().await?)
    }

    /// Streams the payload to `path`, returning the number of bytes written.
    pub async fn save_to(self, path: impl AsRef<Path>) -> SynergiaResult<u64> {
        let mut file = tokio::fs::File::create(path.as_ref()).await?;
        let mut stream = self.response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

/// Pulls the file name out of a Content-Disposition value, preferring the
/// RFC 5987 `filename*` form over the plain one.
fn content_disposition_file_name(value: &str) -> Option<String> {
    for part in value.split(';') {
        let part = part.trim();
        if let Some(encoded) = part.strip_prefix("filename*=") {
            if let Some(name) = encoded.trim_matches('"').split("''").nth(1) {
                return Some(name.to_string());
            }
        }
    }
    for part in value.split(';') {
        let part = part.trim();
        if let Some(name) = part.strip_prefix("filename=") {
            return Some(name.trim_matches('"').to_string());
        }
    }
    None
}

// ─── Tests ───────────────────────────────────────────────────────────────────
