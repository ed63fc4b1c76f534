//! Placeholder discovery and substitution.
//!
//! A single left-to-right pass finds `@name` tokens while skipping string
//! literals, quoted and bracketed identifiers, comments and `@@` system
//! variables. What happens at each token is decided by a
//! [`PlaceholderVisitor`]: the [`Collector`] records references, the
//! [`Substituter`] swaps in literals from a [`ParameterRegistry`].

use indexmap::IndexMap;
use serde::Serialize;

use crate::assignment::ParameterRegistry;
use crate::scanner::{
    placeholder_end, skip_block_comment, skip_bracketed, skip_double_quoted, skip_line_comment,
    skip_single_quoted, skip_system_variable,
};

/// Case-normalized lookup key for a placeholder name.
pub fn placeholder_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// A placeholder occurrence as seen during a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderToken<'a> {
    /// Token text as written, including the `@`.
    pub text: &'a str,
    /// Normalized key.
    pub key: String,
    /// Byte offset of the `@`.
    pub start: usize,
    /// Byte offset just past the token.
    pub end: usize,
}

/// A placeholder referenced by the SQL, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderReference {
    pub name: String,
    pub key: String,
}

/// Decides what happens to each placeholder token.
///
/// Returning `None` leaves the token unchanged in the output.
pub trait PlaceholderVisitor {
    fn visit(&mut self, token: &PlaceholderToken<'_>) -> Option<String>;
}

/// Records each distinct placeholder once, keeping the first spelling.
#[derive(Debug, Default)]
pub struct Collector {
    references: IndexMap<String, PlaceholderReference>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_references(self) -> Vec<PlaceholderReference> {
        self.references.into_values().collect()
    }
}

impl PlaceholderVisitor for Collector {
    fn visit(&mut self, token: &PlaceholderToken<'_>) -> Option<String> {
        self.references
            .entry(token.key.clone())
            .or_insert_with(|| PlaceholderReference {
                name: token.text.to_string(),
                key: token.key.clone(),
            });
        None
    }
}

/// Replaces placeholders that have a normalized literal in the registry.
pub struct Substituter<'r> {
    registry: &'r ParameterRegistry,
}

impl<'r> Substituter<'r> {
    pub fn new(registry: &'r ParameterRegistry) -> Self {
        Self { registry }
    }
}

impl PlaceholderVisitor for Substituter<'_> {
    fn visit(&mut self, token: &PlaceholderToken<'_>) -> Option<String> {
        self.registry
            .get(&token.key)
            .and_then(|param| param.normalized_literal.clone())
    }
}

/// Walk `sql` once, letting `visitor` rewrite each placeholder.
pub fn transform<V>(sql: &str, visitor: &mut V) -> String
where
    V: PlaceholderVisitor + ?Sized,
{
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        let next = bytes.get(i + 1).copied();
        i = match (bytes[i], next) {
            (b'\'', _) => skip_single_quoted(sql, i),
            (b'"', _) => skip_double_quoted(sql, i),
            (b'[', _) => skip_bracketed(sql, i),
            (b'-', Some(b'-')) => skip_line_comment(sql, i),
            (b'/', Some(b'*')) => skip_block_comment(sql, i),
            (b'@', Some(b'@')) => skip_system_variable(sql, i),
            (b'@', _) => match placeholder_end(sql, i) {
                Some(end) => {
                    let text = &sql[i..end];
                    let token = PlaceholderToken {
                        text,
                        key: placeholder_key(text),
                        start: i,
                        end,
                    };
                    if let Some(replacement) = visitor.visit(&token) {
                        out.push_str(&sql[copied..i]);
                        out.push_str(&replacement);
                        copied = end;
                    }
                    end
                }
                None => i + 1,
            },
            _ => i + 1,
        };
    }

    out.push_str(&sql[copied..]);
    out
}

/// Placeholders used by `sql`, deduplicated by key, in encounter order.
pub fn collect_placeholders(sql: &str) -> Vec<PlaceholderReference> {
    let mut collector = Collector::new();
    transform(sql, &mut collector);
    collector.into_references()
}

/// Replace every placeholder that has a literal in `registry`.
pub fn substitute_placeholders(sql: &str, registry: &ParameterRegistry) -> String {
    transform(sql, &mut Substituter::new(registry))
}
