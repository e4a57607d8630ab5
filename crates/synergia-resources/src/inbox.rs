//! Message folders: listings, single messages and their attachments.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use synergia_client::{
    normalized_text, Attachment, Client, Document, ElementRef, MappingSpec, Selector,
    SynergiaResult,
};
use tracing::debug;

use crate::text::{parse_datetime, trailing_id};

static CELLS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("static selector is valid"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("static selector is valid"));
static SENDER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.message-sender").expect("static selector is valid"));
static TOPIC: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.message-topic").expect("static selector is valid"));
static SENT_AT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.message-date").expect("static selector is valid"));
static CONTENT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.container-message-content").expect("static selector is valid")
});
static ATTACHMENTS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[href*="pobierz_zalacznik"]"#).expect("static selector is valid")
});

/// Portal folders messages live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Folder {
    /// Incoming messages.
    Received,
    /// Messages sent from this account.
    Sent,
    /// Deleted messages.
    Trash,
}

impl Folder {
    /// Numeric id the portal uses for this folder in URLs.
    pub fn id(self) -> u32 {
        match self {
            Folder::Received => 5,
            Folder::Sent => 6,
            Folder::Trash => 7,
        }
    }
}

/// One row of a folder listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Message id, when the row links to a readable message.
    pub id: Option<u64>,
    /// Sender, or recipient in the sent folder.
    pub sender: String,
    /// Message title.
    pub title: String,
    /// When the message was sent.
    pub sent_at: Option<NaiveDateTime>,
    /// Whether the portal still renders the message as unread.
    pub unread: bool,
}

/// A file attached to a message, downloadable through [`Inbox::attachment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttachment {
    /// File name as shown in the message.
    pub name: String,
    /// Portal path the download flow starts from.
    pub path: String,
}

/// A fully opened message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sender as rendered in the message header.
    pub sender: String,
    /// Message title.
    pub title: String,
    /// When the message was sent.
    pub sent_at: Option<NaiveDateTime>,
    /// Message body with whitespace collapsed.
    pub content: String,
    /// Files attached to the message.
    pub attachments: Vec<MessageAttachment>,
}

/// Message-folder access for one client session.
pub struct Inbox<'a> {
    client: &'a Client,
}

impl<'a> Inbox<'a> {
    /// Inbox over `client`'s session.
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Lists the messages of `folder` in the order the portal serves them.
    pub async fn messages(&self, folder: Folder) -> SynergiaResult<Vec<MessageSummary>> {
        let endpoint = format!("wiadomosci/{}", folder.id());
        let rows = self
            .client
            .map_list(
                MappingSpec::get(&endpoint, "table.decorated.stretch tbody tr"),
                parse_summary_row,
            )
            .await?;
        debug!(folder = folder.id(), messages = rows.len(), "listed folder");
        Ok(rows)
    }

    /// Opens one message. `None` when the page carries no message container,
    /// which is how the portal serves deleted or inaccessible messages.
    pub async fn message(&self, folder: Folder, id: u64) -> SynergiaResult<Option<Message>> {
        let endpoint = format!("wiadomosci/1/{}/{id}", folder.id());
        self.client
            .map_first(
                MappingSpec::get(&endpoint, "table.stretch.container-message"),
                parse_message,
            )
            .await
    }

    /// Downloads one of a message's attachments.
    pub async fn attachment(&self, attachment: &MessageAttachment) -> SynergiaResult<Attachment> {
        self.client.download(&attachment.path).await
    }
}

// Row layout: checkbox | sender | linked title (bold style when unread) |
// sent-at timestamp. Header rows have no `td` cells and fall out on their
// own.
fn parse_summary_row(_: &Document, row: ElementRef<'_>) -> Option<MessageSummary> {
    let cells: Vec<ElementRef<'_>> = row.select(&CELLS).collect();
    let sender = cells.get(1).copied().map(normalized_text)?;
    let title_cell = cells.get(2).copied()?;
    let link = title_cell.select(&LINK).next()?;
    let title = normalized_text(link);
    let id = link.attr("href").and_then(trailing_id);
    let unread = title_cell
        .attr("style")
        .is_some_and(|style| style.contains("bold"));
    let sent_at = cells
        .get(3)
        .copied()
        .map(normalized_text)
        .as_deref()
        .and_then(parse_datetime);
    Some(MessageSummary {
        id,
        sender,
        title,
        sent_at,
        unread,
    })
}

// The selected element is the message header table; body text and attachment
// anchors sit beside it and are reached through the whole document.
fn parse_message(doc: &Document, header: ElementRef<'_>) -> Option<Message> {
    let sender = header.select(&SENDER).next().map(normalized_text)?;
    let title = header.select(&TOPIC).next().map(normalized_text)?;
    let sent_at = header
        .select(&SENT_AT)
        .next()
        .map(normalized_text)
        .as_deref()
        .and_then(parse_datetime);
    let content = doc
        .select_first(&CONTENT)
        .map(normalized_text)
        .unwrap_or_default();
    let attachments = doc.select(&ATTACHMENTS).filter_map(parse_attachment).collect();
    Some(Message {
        sender,
        title,
        sent_at,
        content,
        attachments,
    })
}

fn parse_attachment(anchor: ElementRef<'_>) -> Option<MessageAttachment> {
    let path = anchor.attr("href")?.trim_start_matches('/').to_string();
    Some(MessageAttachment {
        name: normalized_text(anchor),
        path,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use synergia_client::compile_selector;

    const FOLDER_PAGE: &str = r#"<html><body>
        <table class="decorated stretch"><tbody>
            <tr>
                <td class="center"><input type="checkbox"></td>
                <td>Jan Kowalski (nauczyciel)</td>
                <td style="font-weight: bold;"><a href="/wiadomosci/1/5/3621">Sprawdzian z matematyki</a></td>
                <td class="center">2024-03-05 14:22:10</td>
            </tr>
            <tr>
                <td class="center"><input type="checkbox"></td>
                <td>Anna Nowak</td>
                <td><a href="/wiadomosci/1/5/3588">Wycieczka klasowa</a></td>
                <td class="center">2024-03-01 08:05:44</td>
            </tr>
        </tbody></table>
    </body></html>"#;

    const MESSAGE_PAGE: &str = r#"<html><body>
        <table class="stretch container-message"><tbody>
            <tr><td class="message-sender">Jan Kowalski (nauczyciel)</td></tr>
            <tr><td class="message-topic">Sprawdzian z matematyki</td></tr>
            <tr><td class="message-date">2024-03-05 14:22:10</td></tr>
        </tbody></table>
        <div class="container-message-content">
            Prosze powtorzyc uklady rownan.
            Zakres w zalaczniku.
        </div>
        <a href="/wiadomosci/pobierz_zalacznik/3621/77">zakres_materialu.pdf</a>
    </body></html>"#;

    #[test]
    fn folder_rows_parse_sender_title_id_and_unread_state() {
        let doc = Document::parse(FOLDER_PAGE);
        let selector = compile_selector("table.decorated.stretch tbody tr").unwrap();
        let rows: Vec<MessageSummary> = doc
            .select(&selector)
            .filter_map(|row| parse_summary_row(&doc, row))
            .collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, Some(3621));
        assert_eq!(rows[0].sender, "Jan Kowalski (nauczyciel)");
        assert_eq!(rows[0].title, "Sprawdzian z matematyki");
        assert!(rows[0].unread);
        assert!(!rows[1].unread);
        assert_eq!(
            rows[1].sent_at.unwrap().to_string(),
            "2024-03-01 08:05:44"
        );
    }

    #[test]
    fn rows_without_a_message_link_are_skipped() {
        let page = r#"<table class="decorated stretch"><tbody>
            <tr><td colspan="4">Brak wiadomosci</td></tr>
        </tbody></table>"#;
        let doc = Document::parse(page);
        let selector = compile_selector("table.decorated.stretch tbody tr").unwrap();
        let rows: Vec<MessageSummary> = doc
            .select(&selector)
            .filter_map(|row| parse_summary_row(&doc, row))
            .collect();
        assert!(rows.is_empty());
    }

    #[test]
    fn message_pages_parse_header_content_and_attachments() {
        let doc = Document::parse(MESSAGE_PAGE);
        let selector = compile_selector("table.stretch.container-message").unwrap();
        let header = doc.select_first(&selector).unwrap();
        let message = parse_message(&doc, header).unwrap();

        assert_eq!(message.sender, "Jan Kowalski (nauczyciel)");
        assert_eq!(message.title, "Sprawdzian z matematyki");
        assert_eq!(
            message.content,
            "Prosze powtorzyc uklady rownan. Zakres w zalaczniku."
        );
        assert_eq!(
            message.attachments,
            vec![MessageAttachment {
                name: "zakres_materialu.pdf".to_string(),
                path: "wiadomosci/pobierz_zalacznik/3621/77".to_string(),
            }]
        );
    }
}
