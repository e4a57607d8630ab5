//! Parsed HTML documents and selector helpers.
//!
//! A [`Document`] is produced from one response body and queried through
//! compiled CSS selectors. It is never mutated; resource modules pull owned
//! records out of it and drop it.

use scraper::{ElementRef, Html, Selector};

use crate::error::{SynergiaError, SynergiaResult};

/// One parsed portal page.
#[derive(Debug)]
pub struct Document {
    tree: Html,
}

impl Document {
    /// Parses a response body. Parsing is lenient, as browsers are; broken
    /// markup yields a best-effort tree rather than an error.
    pub fn parse(body: &str) -> Self {
        Self {
            tree: Html::parse_document(body),
        }
    }

    /// All elements matching `selector`, in document order.
    pub fn select<'a>(
        &'a self,
        selector: &'a Selector,
    ) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.tree.select(selector)
    }

    /// First element matching `selector`, if any.
    pub fn select_first<'a>(&'a self, selector: &'a Selector) -> Option<ElementRef<'a>> {
        self.tree.select(selector).next()
    }
}

/// Compiles a CSS selector, turning syntax errors into
/// [`SynergiaError::Selector`].
///
/// An invalid selector is a programming error in the calling resource module
/// and is kept distinct from a valid selector that matches nothing, which is
/// an ordinary empty result.
pub fn compile_selector(css: &str) -> SynergiaResult<Selector> {
    Selector::parse(css).map_err(|e| SynergiaError::Selector {
        selector: css.to_string(),
        message: e.to_string(),
    })
}

/// Text content of an element with all whitespace runs collapsed to single
/// spaces and the ends trimmed.
pub fn normalized_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
