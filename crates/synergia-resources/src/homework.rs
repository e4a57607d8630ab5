//! Homework assignments: ranged listings and detail pages.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use synergia_client::{
    normalized_text, Client, Document, ElementRef, MappingSpec, Selector, SynergiaResult,
};
use tracing::debug;

use crate::text::{first_date, trailing_id};

static CELLS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("static selector is valid"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("static selector is valid"));

/// One row of the assignment listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assignment id, when the row links to a detail page.
    pub id: Option<u64>,
    /// School subject.
    pub subject: String,
    /// Assignment topic.
    pub topic: String,
    /// Due date, when the row carries one.
    pub due: Option<NaiveDate>,
}

/// Detail fields of one assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentDetails {
    /// School subject.
    pub subject: Option<String>,
    /// Teacher who added the assignment.
    pub teacher: Option<String>,
    /// Assignment topic.
    pub topic: Option<String>,
    /// When the assignment was added.
    pub added: Option<NaiveDate>,
    /// Due date.
    pub due: Option<NaiveDate>,
}

impl AssignmentDetails {
    fn from_fields(fields: &HashMap<String, String>) -> Self {
        Self {
            subject: fields.get("subject").cloned(),
            teacher: fields.get("teacher").cloned(),
            topic: fields.get("topic").cloned(),
            added: fields.get("added").map(String::as_str).and_then(first_date),
            due: fields.get("due").map(String::as_str).and_then(first_date),
        }
    }
}

/// Homework access for one client session.
pub struct Homework<'a> {
    client: &'a Client,
}

impl<'a> Homework<'a> {
    /// Homework over `client`'s session.
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Assignments due between `from` and `to`, across all subjects.
    pub async fn list(&self, from: NaiveDate, to: NaiveDate) -> SynergiaResult<Vec<Assignment>> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        let form = [
            ("dataOd", from.as_str()),
            ("dataDo", to.as_str()),
            ("przedmiot", "-1"),
        ];
        let rows = self
            .client
            .map_list(
                MappingSpec::post("moje_zadania", "table.decorated tbody tr", &form),
                parse_assignment_row,
            )
            .await?;
        debug!(assignments = rows.len(), "listed homework");
        Ok(rows)
    }

    /// Detail fields of one assignment. The detail table is positional;
    /// missing trailing rows simply leave fields unset.
    pub async fn details(&self, id: u64) -> SynergiaResult<AssignmentDetails> {
        let endpoint = format!("moje_zadania/podglad/{id}");
        let fields = self
            .client
            .map_table(
                MappingSpec::get(&endpoint, "table.decorated"),
                &["subject", "teacher", "topic", "added", "due"],
            )
            .await?;
        Ok(AssignmentDetails::from_fields(&fields))
    }
}

// Row layout: subject | topic | due date | preview link.
fn parse_assignment_row(_: &Document, row: ElementRef<'_>) -> Option<Assignment> {
    let cells: Vec<ElementRef<'_>> = row.select(&CELLS).collect();
    let subject = cells.first().copied().map(normalized_text)?;
    let topic = cells.get(1).copied().map(normalized_text)?;
    let due = cells
        .get(2)
        .copied()
        .map(normalized_text)
        .as_deref()
        .and_then(first_date);
    let id = row
        .select(&LINK)
        .next()
        .and_then(|link| link.attr("href"))
        .and_then(trailing_id);
    Some(Assignment {
        id,
        subject,
        topic,
        due,
    })
}
