//! Error taxonomy for the portal client.

use thiserror::Error;

/// A convenience `Result` alias using [`SynergiaError`].
pub type SynergiaResult<T> = Result<T, SynergiaError>;

/// Top-level error type for the portal client.
#[derive(Error, Debug)]
pub enum SynergiaError {
    /// A network, protocol or non-success-status failure from the HTTP
    /// layer.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A filesystem error while streaming an attachment to disk.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A CSS selector that failed to compile. Programming error in the
    /// caller; distinct from a valid selector that matches nothing.
    #[error("Invalid selector {selector:?}: {message}")]
    Selector {
        /// The selector as written.
        selector: String,
        /// The parser's complaint.
        message: String,
    },

    /// A request target or redirect URL that could not be parsed.
    #[error("Invalid request target {target:?}: {message}")]
    InvalidTarget {
        /// The offending target.
        target: String,
        /// The parser's complaint.
        message: String,
    },

    /// One of the authorization steps failed.
    #[error("Authorization step '{step}' failed: {source}")]
    Auth {
        /// Which transition failed: `entry`, `credentials` or `two_factor`.
        step: &'static str,
        /// The underlying failure.
        #[source]
        source: Box<SynergiaError>,
    },

    /// A download request was not answered with a redirect.
    #[error("Download of {path:?} answered {status} without a Location header")]
    MissingRedirect {
        /// The requested file path.
        path: String,
        /// The status the portal answered with instead.
        status: u16,
    },

    /// A prepared-delivery redirect without a single-use key.
    #[error("Download redirect {url:?} carries no single-use key")]
    MissingDownloadKey {
        /// The redirect URL as received.
        url: String,
    },

    /// The portal kept reporting a file as not ready until the polling
    /// budget ran out.
    #[error("File still not ready after {checks} checks ({elapsed_ms} ms)")]
    DownloadStuck {
        /// Readiness checks issued before giving up.
        checks: u32,
        /// Wall-clock time spent polling, in milliseconds.
        elapsed_ms: u64,
    },
}
