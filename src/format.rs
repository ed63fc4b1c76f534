//! Output formatting.
//!
//! The pretty-printer is a collaborator behind [`SqlFormatter`]; the crate
//! bundles [`SqlParserFormatter`], built on `sqlparser`. [`format_output`]
//! is the only caller and never lets a formatter failure escape: errors and
//! panics both become warnings and the text is returned as it was.
//!
//! Only the SQL body goes through the formatter. The generated `DECLARE`
//! block is T-SQL that `sqlparser` does not print back faithfully.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use sqlparser::dialect::{
    Dialect as ParserDialect, GenericDialect, MsSqlDialect, PostgreSqlDialect,
};
use sqlparser::ast::Statement;
use sqlparser::keywords::Keyword;
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::{Token, Tokenizer, TokenizerError};
use thiserror::Error;

use crate::diagnostics::{Diagnostics, Warning};
use crate::scanner::contains_comment;

/// SQL dialect the formatter parses with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    MsSql,
    Generic,
    Postgres,
}

impl Dialect {
    fn parser_dialect(self) -> Box<dyn ParserDialect> {
        match self {
            Dialect::MsSql => Box::new(MsSqlDialect {}),
            Dialect::Generic => Box::new(GenericDialect {}),
            Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        }
    }
}

/// Casing applied to keywords in formatted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordCase {
    #[default]
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    pub dialect: Dialect,
    pub keyword_case: KeywordCase,
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("{0}")]
    Parse(#[from] ParserError),

    #[error("{0}")]
    Tokenize(#[from] TokenizerError),

    #[error("comments would be lost")]
    Comments,

    #[error("formatted SQL no longer parses: {0}")]
    Reparse(ParserError),

    #[error("formatted SQL does not match the input")]
    Changed,

    #[error("{0}")]
    Other(String),
}

/// A SQL pretty-printer.
pub trait SqlFormatter {
    fn format(&self, sql: &str, options: &FormatOptions) -> Result<String, FormatError>;
}

impl<F> SqlFormatter for F
where
    F: Fn(&str, &FormatOptions) -> Result<String, FormatError>,
{
    fn format(&self, sql: &str, options: &FormatOptions) -> Result<String, FormatError> {
        self(sql, options)
    }
}

/// Formats by parsing with `sqlparser` and pretty-printing each statement.
///
/// Refuses SQL with comments, since the parser drops them. The printed text
/// is parsed again and must give the same statements, otherwise the result
/// is an error and the caller keeps the input.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlParserFormatter;

impl SqlFormatter for SqlParserFormatter {
    fn format(&self, sql: &str, options: &FormatOptions) -> Result<String, FormatError> {
        if contains_comment(sql) {
            return Err(FormatError::Comments);
        }

        let dialect = options.dialect.parser_dialect();
        let statements = Parser::parse_sql(dialect.as_ref(), sql)?;

        let pretty = statements
            .iter()
            .map(|stmt| format!("{:#};", stmt))
            .collect::<Vec<_>>()
            .join("\n\n");

        let formatted = match options.keyword_case {
            KeywordCase::Upper => pretty,
            KeywordCase::Lower => lowercase_keywords(dialect.as_ref(), &pretty)?,
        };

        verify_round_trip(dialect.as_ref(), &statements, &formatted)?;
        Ok(formatted)
    }
}

fn verify_round_trip(
    dialect: &dyn ParserDialect,
    original: &[Statement],
    formatted: &str,
) -> Result<(), FormatError> {
    let reparsed = Parser::parse_sql(dialect, formatted).map_err(FormatError::Reparse)?;
    if reparsed.as_slice() != original {
        return Err(FormatError::Changed);
    }
    Ok(())
}

fn lowercase_keywords(dialect: &dyn ParserDialect, sql: &str) -> Result<String, FormatError> {
    let tokens = Tokenizer::new(dialect, sql).with_unescape(false).tokenize()?;

    Ok(tokens
        .into_iter()
        .map(|token| match token {
            Token::Word(mut word) if word.quote_style.is_none() && word.keyword != Keyword::NoKeyword => {
                word.value = word.value.to_lowercase();
                Token::Word(word).to_string()
            }
            other => other.to_string(),
        })
        .collect())
}

/// Run `formatter` over `text`, falling back to the input on any failure.
///
/// Blank text is returned as-is without consulting the formatter.
pub fn format_output(
    text: &str,
    formatter: Option<&dyn SqlFormatter>,
    options: &FormatOptions,
    diagnostics: &mut Diagnostics,
) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }

    let Some(formatter) = formatter else {
        diagnostics.warn(Warning::FormatterUnavailable);
        return text.to_string();
    };

    match panic::catch_unwind(AssertUnwindSafe(|| formatter.format(text, options))) {
        Ok(Ok(formatted)) => formatted,
        Ok(Err(e)) => {
            tracing::debug!("formatter returned an error: {}", e);
            let message = e.to_string();
            diagnostics.warn(Warning::FormatterFailed {
                message: (!message.is_empty()).then_some(message),
            });
            text.to_string()
        }
        Err(payload) => {
            tracing::debug!("formatter panicked");
            diagnostics.warn(Warning::FormatterFailed {
                message: panic_message(payload.as_ref()),
            });
            text.to_string()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper(sql: &str, _: &FormatOptions) -> Result<String, FormatError> {
        Ok(sql.to_uppercase())
    }

    fn failing(_: &str, _: &FormatOptions) -> Result<String, FormatError> {
        Err(FormatError::Other("bad input".into()))
    }

    fn silent_failure(_: &str, _: &FormatOptions) -> Result<String, FormatError> {
        Err(FormatError::Other(String::new()))
    }

    fn panicking(_: &str, _: &FormatOptions) -> Result<String, FormatError> {
        panic!("formatter exploded")
    }

    fn run(text: &str, formatter: Option<&dyn SqlFormatter>) -> (String, Vec<String>) {
        let mut diags = Diagnostics::new();
        let out = format_output(text, formatter, &FormatOptions::default(), &mut diags);
        (out, diags.into_messages())
    }

    #[test]
    fn test_formatter_applied() {
        let (out, warnings) = run("select 1", Some(&upper));
        assert_eq!(out, "SELECT 1");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_formatter_warns() {
        let (out, warnings) = run("select 1", None);
        assert_eq!(out, "select 1");
        assert_eq!(
            warnings,
            vec!["SQL formatter is unavailable; output was left unformatted.".to_string()]
        );
    }

    #[test]
    fn test_failing_formatter_keeps_text() {
        let (out, warnings) = run("select 1", Some(&failing));
        assert_eq!(out, "select 1");
        assert_eq!(
            warnings,
            vec!["SQL formatter failed; output was left unformatted: bad input".to_string()]
        );
    }

    #[test]
    fn test_failure_without_message() {
        let (_, warnings) = run("select 1", Some(&silent_failure));
        assert_eq!(
            warnings,
            vec!["SQL formatter failed; output was left unformatted.".to_string()]
        );
    }

    #[test]
    fn test_panicking_formatter_is_contained() {
        let (out, warnings) = run("select 1", Some(&panicking));
        assert_eq!(out, "select 1");
        assert_eq!(
            warnings,
            vec!["SQL formatter failed; output was left unformatted: formatter exploded".to_string()]
        );
    }

    #[test]
    fn test_blank_text_skips_formatter() {
        let (out, warnings) = run("  \n", Some(&panicking));
        assert_eq!(out, "  \n");
        assert!(warnings.is_empty());

        let (out, warnings) = run("", None);
        assert_eq!(out, "");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_sqlparser_formatter_parses_select() {
        let out = SqlParserFormatter
            .format("select a, b from t where id = 7", &FormatOptions::default())
            .unwrap();
        assert!(out.starts_with("SELECT"));
        assert!(out.contains("FROM"));
        assert!(out.contains("id = 7"));
        assert!(out.trim_end().ends_with(';'));
    }

    #[test]
    fn test_sqlparser_formatter_lowercase_keywords() {
        let options = FormatOptions {
            keyword_case: KeywordCase::Lower,
            ..FormatOptions::default()
        };
        let out = SqlParserFormatter
            .format("SELECT CustomerCode FROM Customers WHERE x = 'It''s'", &options)
            .unwrap();
        assert!(out.starts_with("select"));
        assert!(out.contains("from"));
        assert!(out.contains("CustomerCode"));
        assert!(out.contains("'It''s'"));
    }

    #[test]
    fn test_sqlparser_formatter_rejects_garbage() {
        let err = SqlParserFormatter
            .format("SELEC FROM WHERE (", &FormatOptions::default())
            .unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_round_trip_rejects_changed_text() {
        let dialect = MsSqlDialect {};
        let original = Parser::parse_sql(&dialect, "SELECT 1").unwrap();
        assert!(verify_round_trip(&dialect, &original, "SELECT\n  1;").is_ok());
        assert!(matches!(
            verify_round_trip(&dialect, &original, "SELECT 2"),
            Err(FormatError::Changed)
        ));
        assert!(matches!(
            verify_round_trip(&dialect, &original, "SELECT 'x"),
            Err(FormatError::Reparse(_))
        ));
    }

    #[test]
    fn test_escaped_national_string_survives_or_is_refused() {
        let sql = "SELECT N'O''Brien' AS LastName";
        for keyword_case in [KeywordCase::Upper, KeywordCase::Lower] {
            let options = FormatOptions {
                keyword_case,
                ..FormatOptions::default()
            };
            let (out, warnings) = {
                let mut diags = Diagnostics::new();
                let out = format_output(sql, Some(&SqlParserFormatter), &options, &mut diags);
                (out, diags.into_messages())
            };
            assert!(out.contains("N'O''Brien'"), "{out}");
            if out == sql {
                assert_eq!(warnings.len(), 1);
                assert!(warnings[0].starts_with("SQL formatter failed"));
            } else {
                assert!(warnings.is_empty());
            }
        }
    }

    #[test]
    fn test_sqlparser_formatter_refuses_comments() {
        let (out, warnings) = run("SELECT 1 -- keep me", Some(&SqlParserFormatter));
        assert_eq!(out, "SELECT 1 -- keep me");
        assert_eq!(
            warnings,
            vec!["SQL formatter failed; output was left unformatted: comments would be lost"
                .to_string()]
        );
    }

    #[test]
    fn test_dialect_from_config_name() {
        #[derive(Deserialize)]
        struct Wrapper {
            dialect: Dialect,
            case: KeywordCase,
        }
        let w: Wrapper = toml::from_str("dialect = \"postgres\"\ncase = \"lower\"").unwrap();
        assert_eq!(w.dialect, Dialect::Postgres);
        assert_eq!(w.case, KeywordCase::Lower);
    }
}
