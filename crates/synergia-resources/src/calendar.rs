//! The event calendar.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use synergia_client::{
    normalized_text, Client, Document, ElementRef, MappingSpec, Selector, SynergiaResult,
};

use crate::text::first_date;

static DAY_NUMBER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.kalendarz-numer-dnia").expect("static selector is valid"));

static EVENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"szczegoly/(\d+)").expect("static pattern is valid"));

/// One cell of the monthly calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Day of month the event sits on.
    pub day: Option<u32>,
    /// Event id, when the cell links to a detail page.
    pub id: Option<u64>,
    /// Event text as rendered in the cell.
    pub title: String,
}

/// Detail fields of one calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Event date.
    pub date: Option<NaiveDate>,
    /// Lesson number the event occupies.
    pub lesson: Option<String>,
    /// Teacher the event belongs to.
    pub teacher: Option<String>,
    /// Event category, e.g. test or excursion.
    pub category: Option<String>,
    /// Room, when one is assigned.
    pub room: Option<String>,
}

impl EventDetails {
    fn from_fields(fields: &HashMap<String, String>) -> Self {
        Self {
            date: fields.get("date").map(String::as_str).and_then(first_date),
            lesson: fields.get("lesson").cloned(),
            teacher: fields.get("teacher").cloned(),
            category: fields.get("category").cloned(),
            room: fields.get("room").cloned(),
        }
    }
}

/// Calendar access for one client session.
pub struct Calendar<'a> {
    client: &'a Client,
}

impl<'a> Calendar<'a> {
    /// Calendar over `client`'s session.
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Events of the month the portal currently serves, one record per
    /// non-empty event cell.
    pub async fn events(&self) -> SynergiaResult<Vec<CalendarEvent>> {
        self.client
            .map_list(
                MappingSpec::get("terminarz", "div.kalendarz-dzien td[onclick]"),
                parse_event,
            )
            .await
    }

    /// Detail fields of one event, keyed in the row order of the detail
    /// table.
    pub async fn event(&self, id: u64) -> SynergiaResult<EventDetails> {
        let endpoint = format!("terminarz/szczegoly/{id}");
        let fields = self
            .client
            .map_table(
                MappingSpec::get(&endpoint, "table.decorated"),
                &["date", "lesson", "teacher", "category", "room"],
            )
            .await?;
        Ok(EventDetails::from_fields(&fields))
    }
}

fn parse_event(_: &Document, cell: ElementRef<'_>) -> Option<CalendarEvent> {
    let title = normalized_text(cell);
    if title.is_empty() {
        return None;
    }
    let id = cell.attr("onclick").and_then(event_id);
    Some(CalendarEvent {
        day: enclosing_day(cell),
        id,
        title,
    })
}

fn event_id(onclick: &str) -> Option<u64> {
    EVENT_ID.captures(onclick)?.get(1)?.as_str().parse().ok()
}

// Walks up to the enclosing day cell and reads its day number.
fn enclosing_day(cell: ElementRef<'_>) -> Option<u32> {
    cell.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| {
            el.attr("class")
                .is_some_and(|class| class.contains("kalendarz-dzien"))
        })
        .and_then(|day| day.select(&DAY_NUMBER).next())
        .map(normalized_text)
        .and_then(|number| number.parse().ok())
}
