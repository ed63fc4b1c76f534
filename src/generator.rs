//! DECLARE / inline output generation.
//!
//! Given the traced SQL and its EXEC parameter list, decide whether the
//! placeholders can be turned into one `DECLARE` block or have to be
//! substituted inline, build the text, and run the SQL body through the
//! formatter.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::assignment::{ParameterRegistry, ParsedAssignments, ParsedParam, parse_assignments};
use crate::diagnostics::{Diagnostics, Warning};
use crate::format::{FormatOptions, SqlFormatter, format_output};
use crate::literal::SqlType;
use crate::placeholder::{PlaceholderReference, collect_placeholders, substitute_placeholders};

/// How the output was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Declare,
    Inline,
}

/// What to do with placeholders whose type or value is uncertain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeclarePolicy {
    /// Declare them as `sql_variant`, initialized when a literal exists.
    #[default]
    VariantFallback,
    /// Fall back to inline substitution for the whole statement.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub mode: Mode,
    pub output_sql: String,
    pub warnings: Vec<String>,
    pub params: Vec<ParsedParam>,
}

/// How a referenced placeholder is bound by the EXEC text.
#[derive(Debug, Clone, Copy)]
enum Binding<'a> {
    Typed { literal: &'a str, ty: SqlType },
    Untyped { literal: &'a str },
    NoLiteral,
    Missing,
}

impl<'a> Binding<'a> {
    fn of(param: Option<&'a ParsedParam>) -> Self {
        let Some(param) = param else {
            return Binding::Missing;
        };
        match (param.normalized_literal.as_deref(), param.confident_type()) {
            (None, _) => Binding::NoLiteral,
            (Some(literal), Some(ty)) => Binding::Typed { literal, ty },
            (Some(literal), None) => Binding::Untyped { literal },
        }
    }

    fn declaration(&self, name: &str) -> String {
        match self {
            Binding::Typed { literal, ty } => format!("{} {} = {}", name, ty, literal),
            Binding::Untyped { literal } => format!("{} {} = {}", name, SqlType::Variant, literal),
            Binding::NoLiteral | Binding::Missing => format!("{} {}", name, SqlType::Variant),
        }
    }
}

/// Builds [`GenerationResult`]s.
///
/// # Example
///
/// ```
/// use tracesql::generator::{Generator, Mode};
///
/// let result = Generator::new().generate("SELECT @0", "@0=7");
/// assert_eq!(result.mode, Mode::Declare);
/// assert!(result.output_sql.starts_with("DECLARE @0 int = 7;"));
/// ```
pub struct Generator {
    policy: DeclarePolicy,
    formatter: Option<Box<dyn SqlFormatter>>,
    format_options: FormatOptions,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// A generator with the default policy and no formatter.
    pub fn new() -> Self {
        Self {
            policy: DeclarePolicy::default(),
            formatter: None,
            format_options: FormatOptions::default(),
        }
    }

    pub fn policy(mut self, policy: DeclarePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn formatter(mut self, formatter: impl SqlFormatter + 'static) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }

    pub fn format_options(mut self, options: FormatOptions) -> Self {
        self.format_options = options;
        self
    }

    /// Generate output for `sql` using the assignments in `exec`.
    pub fn generate(&self, sql: &str, exec: &str) -> GenerationResult {
        let ParsedAssignments { registry, warnings } = parse_assignments(exec);
        let mut diags = Diagnostics::new();
        diags.extend(warnings);

        let references = collect_placeholders(sql);
        let bindings: Vec<(&PlaceholderReference, Binding<'_>)> = references
            .iter()
            .map(|r| (r, Binding::of(registry.get(&r.key))))
            .collect();

        for (reference, binding) in &bindings {
            let name = reference.name.clone();
            match binding {
                Binding::Missing => diags.warn(Warning::MissingValue { name }),
                Binding::NoLiteral => diags.warn(Warning::NoLiteral { name }),
                Binding::Untyped { .. } => {
                    let error = registry
                        .get(&reference.key)
                        .and_then(|p| p.parse_error.clone());
                    diags.warn(Warning::NotConfident { name, error });
                }
                Binding::Typed { .. } => {}
            }
        }

        for (key, param) in registry.iter() {
            if !references.iter().any(|r| r.key == key) {
                diags.warn(Warning::Unreferenced {
                    name: param.name.clone(),
                });
            }
        }

        let can_declare = !bindings.is_empty()
            && match self.policy {
                DeclarePolicy::VariantFallback => true,
                DeclarePolicy::Strict => bindings
                    .iter()
                    .all(|(_, b)| matches!(b, Binding::Typed { .. })),
            };

        let (mode, header, body) = if can_declare {
            (Mode::Declare, Some(declare_header(bindings)), sql.trim().to_string())
        } else {
            (Mode::Inline, None, inline(sql, &references, &registry, &mut diags))
        };
        tracing::debug!(
            ?mode,
            placeholders = references.len(),
            params = registry.len(),
            "generated output"
        );

        let body = format_output(
            &body,
            self.formatter.as_deref(),
            &self.format_options,
            &mut diags,
        );
        let output_sql = match header {
            Some(header) => format!("{}\n\n{}", header, body),
            None => body,
        };

        GenerationResult {
            mode,
            output_sql,
            warnings: diags.into_messages(),
            params: registry.into_params(),
        }
    }
}

/// Generate with the default [`Generator`].
pub fn generate(sql: &str, exec: &str) -> GenerationResult {
    Generator::new().generate(sql, exec)
}

/// The `DECLARE` statement for every referenced placeholder.
fn declare_header(mut bindings: Vec<(&PlaceholderReference, Binding<'_>)>) -> String {
    bindings.sort_by(|a, b| declaration_order(&a.0.name, &b.0.name));
    let declarations: Vec<String> = bindings
        .iter()
        .map(|(reference, binding)| binding.declaration(&reference.name))
        .collect();
    format!("DECLARE {};", declarations.join(",\n        "))
}

fn inline(
    sql: &str,
    references: &[PlaceholderReference],
    registry: &ParameterRegistry,
    diags: &mut Diagnostics,
) -> String {
    for reference in references {
        let name = reference.name.clone();
        match registry.get(&reference.key) {
            None => diags.warn(Warning::Unresolved { name }),
            Some(param) if param.normalized_literal.is_none() => {
                diags.warn(Warning::UnresolvedNoLiteral { name })
            }
            Some(param) => {
                if let Some(error) = &param.parse_error {
                    diags.warn(Warning::BestEffort {
                        name,
                        error: error.clone(),
                    });
                }
            }
        }
    }
    substitute_placeholders(sql, registry)
}

/// Order for declarations: `@<digits>` names first by numeric value, then
/// every other name in its original position.
pub fn declaration_order(a: &str, b: &str) -> Ordering {
    match (numeric_suffix(a), numeric_suffix(b)) {
        (Some(x), Some(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Digits of an `@<digits>` name without leading zeros (`"0"` stays `"0"`).
fn numeric_suffix(name: &str) -> Option<&str> {
    let digits = name.strip_prefix('@')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let trimmed = digits.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed })
}
