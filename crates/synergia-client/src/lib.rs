//! Session, request, DOM-mapping and file-download engine for the Librus
//! Synergia school portal.
//!
//! The portal exposes no formal API; everything is scraped from
//! server-rendered HTML behind a form-based login. This crate owns the
//! session cookies, the request executor, the declarative DOM-to-record
//! mapping strategies and the asynchronous attachment-download protocol.
//! Knowledge of specific pages lives in `synergia-resources`, which drives
//! the engine through [`MappingSpec`]s and parser functions.
//!
//! # Main types
//!
//! - [`Client`] — One logical portal session and the executor for every
//!   request.
//! - [`ClientBuilder`] — Cookie seed, endpoint overrides, timeout and
//!   download policy.
//! - [`SessionCookie`] — The persistable unit of session state.
//! - [`MappingSpec`] — Which page to fetch and what to select from it.
//! - [`Document`] — A parsed portal page.
//! - [`Attachment`] / [`DownloadPolicy`] — A downloaded file and the
//!   readiness-polling bounds that produced it.
//! - [`SynergiaError`] / [`SynergiaResult`] — Error taxonomy and alias.

mod auth;

/// Client facade, builder and request executor.
pub mod client;
/// Portal endpoints and the fixed client identity.
pub mod config;
/// Parsed HTML documents and selector helpers.
pub mod document;
/// Attachment downloads and readiness polling.
pub mod download;
/// Error taxonomy.
pub mod error;
/// DOM-to-record mapping strategies.
pub mod mapping;
/// Session cookies and their jar.
pub mod session;

pub use client::{Client, ClientBuilder};
pub use config::Endpoints;
pub use document::{compile_selector, normalized_text, Document};
pub use download::{Attachment, DownloadPolicy};
pub use error::{SynergiaError, SynergiaResult};
pub use mapping::{key_value_pairs, table_fields, MappingSpec};
pub use session::SessionCookie;

pub use reqwest::Method;
pub use scraper::{ElementRef, Selector};
