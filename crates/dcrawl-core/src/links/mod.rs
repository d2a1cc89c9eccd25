//! Document link extraction collaborator.

mod html;

use crate::session::Session;

pub use html::{extract_links, HtmlLinkExtractor, SelectorError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Absolute document URLs, de-duplicated, in page order. May be empty.
    Links(Vec<String>),
    /// The page demanded a login (redirect to the login page, 401, 403).
    AuthRequired,
    Error(String),
}

pub trait LinkExtractor: Send {
    fn find_document_links(&self, url: &str, session: &dyn Session) -> LinkOutcome;
}
