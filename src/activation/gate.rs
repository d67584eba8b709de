//! Document checks for the activation gate.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use super::blocklist::is_blocked_domain;

// ============================================================================
// DocumentInfo
// ============================================================================

/// What the gate needs to know about the current document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    /// Declared doctype name, `None` if the document has no doctype.
    pub doctype: Option<String>,
    /// Tag name of the top-level element, `None` if there is none yet.
    pub document_element: Option<String>,
}

impl DocumentInfo {
    /// Creates info for a document.
    #[inline]
    #[must_use]
    pub fn new(doctype: Option<String>, document_element: Option<String>) -> Self {
        Self {
            doctype,
            document_element,
        }
    }

    /// A regular `<!DOCTYPE html>` document rooted at `<html>`.
    #[inline]
    #[must_use]
    pub fn html() -> Self {
        Self::new(Some("html".to_string()), Some("HTML".to_string()))
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Returns `true` if the bridge should run for this document.
#[must_use]
pub fn should_activate(document: &DocumentInfo, url: &Url) -> bool {
    doctype_check(document)
        && suffix_check(url)
        && document_element_check(document)
        && !is_blocked_domain(url)
}

fn doctype_check(document: &DocumentInfo) -> bool {
    document.doctype.as_deref().is_none_or(|name| name == "html")
}

fn document_element_check(document: &DocumentInfo) -> bool {
    document
        .document_element
        .as_deref()
        .is_none_or(|tag| tag.eq_ignore_ascii_case("html"))
}

/// Path suffixes of documents that are never HTML pages.
const PROHIBITED_SUFFIXES: [&str; 2] = [".xml", ".pdf"];

/// Rejects non-HTML resources by path suffix. The query is not part of
/// [`Url::path`].
fn suffix_check(url: &Url) -> bool {
    let path = url.path();
    !PROHIBITED_SUFFIXES
        .iter()
        .any(|suffix| path.ends_with(suffix))
}

// ============================================================================
// Tests
// ============================================================================
