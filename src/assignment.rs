//! Parser for the EXEC parameter list of a traced call.
//!
//! ```text
//! exec sp_executesql N'SELECT @0, @1', N'@0 int,@1 nvarchar(2)', @0=7, @1=N'AB'
//! ──────────────┬────────────────────  ──────────┬──────────────  ───┬──  ───┬────
//!               └── skipped                      └── skipped        └───────┴── assignments
//! ```
//!
//! The text is split on commas outside single-quoted strings. Segments that
//! are not `@name = value` are ignored.

use indexmap::IndexMap;
use nom::{
    IResult,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::recognize,
    sequence::{pair, tuple},
};
use serde::Serialize;

use crate::diagnostics::Warning;
use crate::literal::{LiteralError, SqlType, classify};
use crate::placeholder::placeholder_key;
use crate::scanner::{is_placeholder_char, skip_single_quoted};

/// One `@name = value` assignment from the EXEC text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedParam {
    /// Name as written, e.g. `@0`.
    pub name: String,
    /// Trimmed value text after `=`.
    pub raw_token: String,
    pub normalized_literal: Option<String>,
    pub inferred_type: Option<SqlType>,
    pub confident: bool,
    pub parse_error: Option<LiteralError>,
}

impl ParsedParam {
    /// Classify `raw_token` and build the parameter.
    pub fn new(name: impl Into<String>, raw_token: impl Into<String>) -> Self {
        let raw_token = raw_token.into();
        let c = classify(&raw_token);
        Self {
            name: name.into(),
            raw_token,
            normalized_literal: c.normalized_literal,
            inferred_type: c.inferred_type,
            confident: c.confident,
            parse_error: c.parse_error,
        }
    }

    pub fn key(&self) -> String {
        placeholder_key(&self.name)
    }

    /// Type to declare with, if it is known exactly.
    pub fn confident_type(&self) -> Option<SqlType> {
        self.inferred_type.filter(|_| self.confident)
    }
}

/// Parameters keyed by normalized name, in order of first assignment.
///
/// A repeated name keeps its original position but takes the newer value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterRegistry {
    params: IndexMap<String, ParsedParam>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `param`, returning the value it replaced.
    pub fn insert(&mut self, param: ParsedParam) -> Option<ParsedParam> {
        self.params.insert(param.key(), param)
    }

    pub fn get(&self, key: &str) -> Option<&ParsedParam> {
        self.params.get(key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParsedParam)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn params(&self) -> impl Iterator<Item = &ParsedParam> {
        self.params.values()
    }

    pub fn into_params(self) -> Vec<ParsedParam> {
        self.params.into_values().collect()
    }
}

/// Registry plus the warnings raised while building it.
#[derive(Debug, Default)]
pub struct ParsedAssignments {
    pub registry: ParameterRegistry,
    pub warnings: Vec<Warning>,
}

/// Parse an EXEC parameter list.
pub fn parse_assignments(exec: &str) -> ParsedAssignments {
    let mut parsed = ParsedAssignments::default();

    if exec.trim().is_empty() {
        parsed.warnings.push(Warning::EmptyExec);
        return parsed;
    }

    for segment in split_segments(exec) {
        let Some((name, value)) = parse_segment(segment) else {
            tracing::trace!("skipping EXEC segment {:?}", segment.trim());
            continue;
        };

        let param = ParsedParam::new(name, value);
        if parsed.registry.insert(param).is_some() {
            parsed.warnings.push(Warning::DuplicateAssignment {
                name: name.to_string(),
            });
        }
    }

    if parsed.registry.is_empty() {
        parsed.warnings.push(Warning::NoAssignments);
    }

    parsed
}

/// Split on commas that are not inside a single-quoted string.
pub fn split_segments(exec: &str) -> Vec<&str> {
    let bytes = exec.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => i = skip_single_quoted(exec, i),
            b',' => {
                segments.push(&exec[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    segments.push(&exec[start..]);
    segments
}

/// Split `@name = value` into name and value, dropping a trailing `;`.
pub fn parse_segment(segment: &str) -> Option<(&str, &str)> {
    let (rest, name) = assignment_head(segment).ok()?;
    let value = rest.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    Some((name, value.trim_start()))
}

fn assignment_head(input: &str) -> IResult<&str, &str> {
    let (input, _) = multispace0(input)?;
    let (input, name) = recognize(pair(
        char('@'),
        take_while1(|c: char| c.is_ascii() && is_placeholder_char(c as u8)),
    ))(input)?;
    let (input, _) = tuple((multispace0, char('='), multispace0))(input)?;
    Ok((input, name))
}
