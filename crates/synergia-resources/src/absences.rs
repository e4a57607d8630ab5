//! Absence records.

use std::sync::LazyLock;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use synergia_client::{
    normalized_text, Client, Document, ElementRef, MappingSpec, Selector, SynergiaResult,
};

use crate::text::first_date;

static CELLS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("static selector is valid"));

/// One recorded absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Absence {
    /// School day the absence was recorded for.
    pub date: NaiveDate,
    /// Portal category, e.g. excused or unexcused.
    pub category: String,
    /// Number of lessons covered, when the row carries one.
    pub lessons: Option<u32>,
}

/// Absence access for one client session.
pub struct Absences<'a> {
    client: &'a Client,
}

impl<'a> Absences<'a> {
    /// Absences over `client`'s session.
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// All recorded absences. Summary rows without a date fall out of the
    /// listing on their own.
    pub async fn list(&self) -> SynergiaResult<Vec<Absence>> {
        self.client
            .map_list(
                MappingSpec::get("przegladaj_nb/uczen", "table.decorated tbody tr"),
                parse_absence_row,
            )
            .await
    }
}

// Row layout: date | category | lesson count.
fn parse_absence_row(_: &Document, row: ElementRef<'_>) -> Option<Absence> {
    let cells: Vec<ElementRef<'_>> = row.select(&CELLS).collect();
    let date = cells
        .first()
        .copied()
        .map(normalized_text)
        .as_deref()
        .and_then(first_date)?;
    let category = cells.get(1).copied().map(normalized_text)?;
    let lessons = cells
        .get(2)
        .copied()
        .map(normalized_text)
        .and_then(|count| count.parse().ok());
    Some(Absence {
        date,
        category,
        lessons,
    })
}
