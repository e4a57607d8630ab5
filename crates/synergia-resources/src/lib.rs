//! Typed access to the Librus Synergia portal resources.
//!
//! Each module owns the selectors and row layouts of one portal area and
//! drives the mapping strategies of `synergia-client`; no markup knowledge
//! leaks into the engine. Records are serde-serializable so callers can
//! persist or forward what they scrape.
//!
//! # Main types
//!
//! - [`Inbox`] / [`Folder`] — Message folders, messages and attachments.
//! - [`Homework`] — Assignment listings and detail pages.
//! - [`Absences`] — Absence records.
//! - [`Calendar`] — The monthly event calendar.
//! - [`Info`] — The student card and the lucky number.

/// Absence records.
pub mod absences;
/// The event calendar.
pub mod calendar;
/// Homework assignments.
pub mod homework;
/// Message folders.
pub mod inbox;
/// Account details.
pub mod info;

mod text;

pub use absences::{Absence, Absences};
pub use calendar::{Calendar, CalendarEvent, EventDetails};
pub use homework::{Assignment, AssignmentDetails, Homework};
pub use inbox::{Folder, Inbox, Message, MessageAttachment, MessageSummary};
pub use info::{AccountInfo, Info};
