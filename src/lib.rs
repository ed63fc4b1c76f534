//! # tracesql: runnable SQL from traced statements
//!
//! Traced `sp_executesql` calls come in two pieces: SQL with numbered
//! placeholders and an EXEC parameter list that binds them. tracesql puts
//! them back together, either as a typed `DECLARE` block in front of the
//! original SQL or, when the types cannot be trusted, with each placeholder
//! replaced by its literal.
//!
//! ## Quick Example
//!
//! ```
//! use tracesql::prelude::*;
//!
//! let result = tracesql::generate(
//!     "SELECT @0 AS NumberValue, @1 AS TextValue",
//!     "@0=7,@1=N'AB'",
//! );
//!
//! assert_eq!(result.mode, Mode::Declare);
//! assert!(result.output_sql.starts_with("DECLARE @0 int = 7,"));
//! ```
//!
//! ## Pipeline
//!
//! | Stage          | Module           |
//! |----------------|------------------|
//! | Skip quotes and comments | [`scanner`] |
//! | Find/replace `@name` tokens | [`placeholder`] |
//! | Type literals  | [`literal`]      |
//! | Parse `@n=v` lists | [`assignment`] |
//! | Choose DECLARE or inline | [`generator`] |
//! | Pretty-print   | [`format`]       |

pub mod assignment;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod format;
pub mod generator;
pub mod literal;
pub mod placeholder;
pub mod scanner;

pub mod prelude {
    pub use crate::assignment::{ParameterRegistry, ParsedParam, parse_assignments};
    pub use crate::config::Config;
    pub use crate::error::*;
    pub use crate::format::{Dialect, FormatOptions, KeywordCase, SqlFormatter, SqlParserFormatter};
    pub use crate::generator::{DeclarePolicy, GenerationResult, Generator, Mode};
    pub use crate::literal::{Classification, SqlType, classify};
    pub use crate::placeholder::{PlaceholderReference, collect_placeholders};
}

/// Generate output for `sql` and its EXEC parameter list with default
/// settings (variant fallback, no formatter).
///
/// # Example
///
/// ```
/// use tracesql::generate;
///
/// let result = generate("SELECT @0 AS A, @2 AS Missing", "@0=7,@1=8");
/// assert!(result.output_sql.contains("@2 sql_variant;"));
/// ```
pub fn generate(sql: &str, exec: &str) -> generator::GenerationResult {
    generator::generate(sql, exec)
}
