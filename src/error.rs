// #![deny(clippy::unwrap_used, clippy::expect_used)]

use serde::{Deserialize, Serialize};

/// A struct that represents an error with a context and possibly the propagated source error.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ContextError {
    pub context: String,
    pub source_error: Option<String>,
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source_error {
            Some(source_error) => write!(
                formatter,
                "{}: {}",
                self.context,
                minimize_first_letter(source_error.to_string()),
            ),
            None => write!(formatter, "{}", self.context),
        }
    }
}

impl std::error::Error for ContextError {}

impl ContextError {
    /// Create a new `ContextError` with the given context.
    pub fn with_context<S: Into<String>>(context: S) -> ContextError {
        ContextError {
            context: context.into(),
            source_error: None,
        }
    }

    /// Create a new `ContextError` with the given context and source error.
    pub fn with_error<S: Into<String>>(context: S, error: &dyn std::error::Error) -> ContextError {
        ContextError {
            context: context.into(),
            source_error: Some(error.to_string()),
        }
    }
}

/// The failures which abort an export as a whole. Everything else that can go wrong while
/// assembling a bundle is recovered locally and reported as an `AssemblyIssue`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportError {
    /// The request did not contain any annex.
    NoAnnexes,
    /// Every annex of the request is empty.
    NoDocuments,
    /// All the annexes failed and the bundle would not contain a single page.
    NoPages,
    /// The glyph sets could not be loaded or parsed, there is no fallback for them.
    Fonts(ContextError),
    /// The table of contents could not be rendered.
    Rendering(ContextError),
    /// The assembled document could not be written out.
    Serialization(ContextError),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::NoAnnexes => write!(formatter, "There are no annexes to export"),
            ExportError::NoDocuments => write!(
                formatter,
                "None of the annexes contains a document, add at least one file before exporting"
            ),
            ExportError::NoPages => write!(formatter, "The exported bundle would contain no pages"),
            ExportError::Fonts(error) => write!(formatter, "Unable to load the fonts: {error}"),
            ExportError::Rendering(error) => {
                write!(formatter, "Unable to render the table of contents: {error}")
            }
            ExportError::Serialization(error) => {
                write!(formatter, "Unable to write the bundle: {error}")
            }
        }
    }
}

impl std::error::Error for ExportError {}

impl ExportError {
    /// Whether the error comes from checking the request (or its result) rather than from a
    /// failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ExportError::NoAnnexes | ExportError::NoDocuments | ExportError::NoPages
        )
    }
}

/// Minimizes the first letter of a string, it is used for standardizing the error message.
fn minimize_first_letter(string: String) -> String {
    let mut characters = string.chars();
    match characters.next() {
        None => String::new(),
        Some(character) => character.to_lowercase().chain(characters).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_error_lowercases_the_source_message() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file");
        let error = ContextError::with_error("Failed to read the font", &source);
        assert_eq!(error.to_string(), "Failed to read the font: no such file");
    }

    #[test]
    fn validation_errors_are_distinguished() {
        assert!(ExportError::NoAnnexes.is_validation());
        assert!(ExportError::NoPages.is_validation());
        assert!(!ExportError::Fonts(ContextError::with_context("missing")).is_validation());
    }
}
