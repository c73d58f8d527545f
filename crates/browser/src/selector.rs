//! Logical selectors, independent of the automation backend.

use std::fmt;

use serde::Serialize;

/// Describes how to find one element on the page.
///
/// Backends translate these into whatever lookup they support; the engine
/// only ever deals in selectors and the handles they resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Selector {
    /// A raw CSS selector.
    Css(String),
    /// A visible button, link, or menu entry whose text equals the label
    /// (whitespace-collapsed, case-insensitive).
    Clickable(String),
    /// The input, textarea, or select associated with a visible label.
    Field(String),
    /// The first row of `table` whose text contains `contains`.
    Row { table: String, contains: String },
}

impl Selector {
    pub fn css(css: impl Into<String>) -> Self {
        Self::Css(css.into())
    }

    pub fn clickable(label: impl Into<String>) -> Self {
        Self::Clickable(label.into())
    }

    pub fn field(label: impl Into<String>) -> Self {
        Self::Field(label.into())
    }

    pub fn row(table: impl Into<String>, contains: impl Into<String>) -> Self {
        Self::Row {
            table: table.into(),
            contains: contains.into(),
        }
    }

    /// Reject selectors that can never match anything.
    pub fn validate(&self) -> Result<(), crate::BrowserError> {
        let empty = match self {
            Self::Css(s) | Self::Clickable(s) | Self::Field(s) => s.trim().is_empty(),
            Self::Row { table, contains } => table.trim().is_empty() || contains.is_empty(),
        };
        if empty {
            return Err(crate::BrowserError::InvalidSelector(self.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(css) => write!(f, "css({css})"),
            Self::Clickable(label) => write!(f, "clickable({label})"),
            Self::Field(label) => write!(f, "field({label})"),
            Self::Row { table, contains } => write!(f, "row({table} ~ {contains})"),
        }
    }
}
