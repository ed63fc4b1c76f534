//! Warnings collected while generating output.
//!
//! Nothing in the pipeline aborts. Every ambiguity becomes a [`Warning`],
//! and the rendered messages are kept once each, in the order they were
//! first raised.

use std::fmt;

use indexmap::IndexSet;

use crate::literal::LiteralError;

/// A non-fatal problem found while generating.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    EmptyExec,
    NoAssignments,
    DuplicateAssignment { name: String },
    MissingValue { name: String },
    NoLiteral { name: String },
    NotConfident { name: String, error: Option<LiteralError> },
    Unreferenced { name: String },
    Unresolved { name: String },
    UnresolvedNoLiteral { name: String },
    BestEffort { name: String, error: LiteralError },
    FormatterUnavailable,
    FormatterFailed { message: Option<String> },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::EmptyExec => write!(f, "EXEC statement is empty."),
            Warning::NoAssignments => write!(f, "No parameter assignments were parsed."),
            Warning::DuplicateAssignment { name } => {
                write!(f, "Duplicate assignment for {} in EXEC statement; last value wins.", name)
            }
            Warning::MissingValue { name } => {
                write!(f, "Missing value for {} in EXEC statement.", name)
            }
            Warning::NoLiteral { name } => write!(f, "No literal value was parsed for {}.", name),
            Warning::NotConfident { name, error: Some(e) } => {
                write!(f, "Type inference is not confident for {}: {}.", name, e)
            }
            Warning::NotConfident { name, error: None } => {
                write!(f, "Type inference is not confident for {}.", name)
            }
            Warning::Unreferenced { name } => {
                write!(f, "EXEC parameter {} is not referenced in the SQL statement.", name)
            }
            Warning::Unresolved { name } => {
                write!(f, "Unresolved placeholder {} left unchanged.", name)
            }
            Warning::UnresolvedNoLiteral { name } => {
                write!(f, "Placeholder {} left unchanged due to missing literal.", name)
            }
            Warning::BestEffort { name, error } => {
                write!(f, "Used best-effort value for {}: {}.", name, error)
            }
            Warning::FormatterUnavailable => {
                write!(f, "SQL formatter is unavailable; output was left unformatted.")
            }
            Warning::FormatterFailed { message: Some(m) } => {
                write!(f, "SQL formatter failed; output was left unformatted: {}", m)
            }
            Warning::FormatterFailed { message: None } => {
                write!(f, "SQL formatter failed; output was left unformatted.")
            }
        }
    }
}

/// Ordered, de-duplicated warning messages.
#[derive(Debug, Default)]
pub struct Diagnostics {
    messages: IndexSet<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: Warning) {
        let message = warning.to_string();
        if !self.messages.contains(&message) {
            tracing::debug!("{}", message);
            self.messages.insert(message);
        }
    }

    pub fn extend(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        for warning in warnings {
            self.warn(warning);
        }
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages.into_iter().collect()
    }
}
