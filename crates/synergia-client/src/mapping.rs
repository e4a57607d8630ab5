//! Declarative extraction of data from portal pages.
//!
//! A resource module describes a page with a [`MappingSpec`] (endpoint,
//! selector, method, form) and supplies a parser; the strategies here fetch
//! the page and turn matched elements into owned records. All markup
//! knowledge stays in the resource modules; this layer only understands
//! "elements matching a selector" and "two-column rows".

use std::collections::HashMap;
use std::sync::LazyLock;

use reqwest::Method;
use scraper::{ElementRef, Selector};

use crate::client::Client;
use crate::document::{compile_selector, normalized_text, Document};
use crate::error::SynergiaResult;

static VALUE_CELLS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr td:nth-child(2)").expect("static selector is valid"));

static ROWS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("static selector is valid"));

/// Describes one extraction: which page to fetch and which elements of it to
/// hand to the parser.
#[derive(Debug, Clone)]
pub struct MappingSpec<'a> {
    /// Request target, absolute or relative to the portal base URL.
    pub endpoint: &'a str,
    /// CSS selector choosing the elements to parse.
    pub selector: &'a str,
    /// HTTP method used to fetch the page.
    pub method: Method,
    /// Urlencoded form body, for POST endpoints.
    pub form: Option<&'a [(&'a str, &'a str)]>,
}

impl<'a> MappingSpec<'a> {
    /// Spec for a GET endpoint.
    pub fn get(endpoint: &'a str, selector: &'a str) -> Self {
        Self {
            endpoint,
            selector,
            method: Method::GET,
            form: None,
        }
    }

    /// Spec for a POST endpoint with an urlencoded form.
    pub fn post(endpoint: &'a str, selector: &'a str, form: &'a [(&'a str, &'a str)]) -> Self {
        Self {
            endpoint,
            selector,
            method: Method::POST,
            form: Some(form),
        }
    }
}

impl Client {
    /// Fetches the page and maps every element matching the spec's selector
    /// through `parser`, keeping results in document order.
    ///
    /// Elements the parser declines (returns `None` for) are dropped without
    /// renumbering the rest. Zero matches is an ordinary outcome and yields
    /// an empty vector, not an error. Each call fetches the page anew;
    /// nothing is cached.
    ///
    /// The parser also receives the whole [`Document`], so a detail-page
    /// parser can pull surrounding context (attachment anchors, content
    /// blocks) that lives outside the selected element.
    pub async fn map_list<T, P>(&self, spec: MappingSpec<'_>, parser: P) -> SynergiaResult<Vec<T>>
    where
        P: for<'d> Fn(&'d Document, ElementRef<'d>) -> Option<T>,
    {
        let selector = compile_selector(spec.selector)?;
        let document = self.execute(spec.method, spec.endpoint, spec.form).await?;
        Ok(document
            .select(&selector)
            .filter_map(|element| parser(&document, element))
            .collect())
    }

    /// Exactly the first element [`map_list`](Client::map_list) would
    /// produce, or `None` when it would produce nothing.
    pub async fn map_first<T, P>(
        &self,
        spec: MappingSpec<'_>,
        parser: P,
    ) -> SynergiaResult<Option<T>>
    where
        P: for<'d> Fn(&'d Document, ElementRef<'d>) -> Option<T>,
    {
        Ok(self.map_list(spec, parser).await?.into_iter().next())
    }

    /// Fetches the page, takes the first element matching the spec's
    /// selector as a two-column table and zips `keys` positionally against
    /// its value column (see [`table_fields`]).
    ///
    /// No matching table yields an empty map.
    pub async fn map_table(
        &self,
        spec: MappingSpec<'_>,
        keys: &[&str],
    ) -> SynergiaResult<HashMap<String, String>> {
        let selector = compile_selector(spec.selector)?;
        let document = self.execute(spec.method, spec.endpoint, spec.form).await?;
        let fields = match document.select(&selector).next() {
            Some(table) => table_fields(table, keys),
            None => HashMap::new(),
        };
        Ok(fields)
    }
}

/// Zips `keys` positionally against the second `<td>` of each row of
/// `table`, in document order.
///
/// The mapping is positional, not label-keyed: with fewer value rows than
/// keys the trailing keys are simply absent from the map, and rows beyond
/// the last key are dropped.
pub fn table_fields(table: ElementRef<'_>, keys: &[&str]) -> HashMap<String, String> {
    keys.iter()
        .zip(table.select(&VALUE_CELLS))
        .map(|(key, cell)| ((*key).to_string(), normalized_text(cell)))
        .collect()
}

/// Both columns of each row of `table` as `(first cell, second cell)` text
/// pairs, in row order.
///
/// Row order is load-bearing: zipping the first elements of the result
/// against the second ones reproduces the table, which is what positional
/// consumers rely on. Rows with fewer than two element children are skipped.
pub fn key_value_pairs(table: ElementRef<'_>) -> Vec<(String, String)> {
    table
        .select(&ROWS)
        .filter_map(|row| {
            let mut cells = row.children().filter_map(ElementRef::wrap);
            let key = cells.next()?;
            let value = cells.next()?;
            Some((normalized_text(key), normalized_text(value)))
        })
        .collect()
}
