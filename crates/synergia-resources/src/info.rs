//! Account details and the lucky number.

use serde::{Deserialize, Serialize};
use synergia_client::{
    normalized_text, Client, Document, ElementRef, MappingSpec, SynergiaResult,
};

/// The student card from the account page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Student name.
    pub name: Option<String>,
    /// Class designation.
    pub class: Option<String>,
    /// Index number within the class register.
    pub index: Option<String>,
    /// Class educator.
    pub educator: Option<String>,
}

/// Account-page access for one client session.
pub struct Info<'a> {
    client: &'a Client,
}

impl<'a> Info<'a> {
    /// Account info over `client`'s session.
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// The student card, read positionally from the account page's
    /// two-column table.
    pub async fn account(&self) -> SynergiaResult<AccountInfo> {
        let fields = self
            .client
            .map_table(
                MappingSpec::get("informacja", "table.decorated"),
                &["name", "class", "index", "educator"],
            )
            .await?;
        Ok(AccountInfo {
            name: fields.get("name").cloned(),
            class: fields.get("class").cloned(),
            index: fields.get("index").cloned(),
            educator: fields.get("educator").cloned(),
        })
    }

    /// Today's lucky number, or `None` when the school has not drawn one.
    pub async fn lucky_number(&self) -> SynergiaResult<Option<u32>> {
        self.client
            .map_first(
                MappingSpec::get("uczen/index", "#luckyNumber"),
                parse_lucky_number,
            )
            .await
    }
}

fn parse_lucky_number(_: &Document, element: ElementRef<'_>) -> Option<u32> {
    normalized_text(element).parse().ok()
}
