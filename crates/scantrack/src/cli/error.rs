//! Helpful error types for CLI commands
//!
//! Every error carries what went wrong, optional context, and `TRY:` hints.

use scantrack_db::StoreError;
use scantrack_server::{ScanError, StoreKind};
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions
            .extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    /// The store file could not be opened or is corrupt.
    pub fn store_open_failed(path: &Path, kind: StoreKind, err: &StoreError) -> Self {
        Self::new(format!("Cannot open {} store", kind.as_str()))
            .with_context(format!("{}: {}", path.display(), err))
            .with_suggestions([
                format!("TRY: Check permissions: ls -la {}", path.display()),
                "TRY: Point at another file with --db or --json-file".to_string(),
            ])
    }

    /// Map a service error onto what the user can do about it.
    pub fn from_scan_error(err: ScanError) -> Self {
        match &err {
            ScanError::Validation(msg) => Self::new(msg.clone()),
            ScanError::CannotCreate { barcode } => {
                Self::new(format!("Barcode {} has not been scanned yet", barcode))
                    .with_context("A new barcode must start with a positive increment")
                    .with_suggestion(format!(
                        "TRY: scantrack scan {} --by NAME --increment 1",
                        barcode
                    ))
            }
            ScanError::Store(store_err) if store_err.is_unavailable() => {
                Self::new("Database not available")
                    .with_context(store_err.to_string())
                    .with_suggestion("TRY: Retry in a few seconds")
            }
            ScanError::Store(store_err) => {
                Self::new("Store operation failed").with_context(store_err.to_string())
            }
        }
    }
}

impl From<ScanError> for HelpfulError {
    fn from(err: ScanError) -> Self {
        Self::from_scan_error(err)
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
