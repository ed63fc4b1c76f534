//! SQL Server literal classification.
//!
//! Maps a raw value token from a trace (`7`, `N'AB'`, `0xA0FF`, `12.340`,
//! `'2024-01-01'`, ...) to the literal to embed and the type it would have
//! in a `DECLARE`. Only the token's surface syntax is considered.
//!
//! Recognized shapes, first match wins:
//!
//! | Token             | Type                                   |
//! |-------------------|----------------------------------------|
//! | `NULL`            | none (never confident)                 |
//! | `N'...'`          | `nvarchar(L)`, `nvarchar(max)` > 4000  |
//! | `'YYYY-MM-DD hh:mm:ss[.f]'` | `datetime2(f)`               |
//! | `'YYYY-MM-DD'`    | `date`                                 |
//! | `'hh:mm:ss[.f]'`  | `time(f)`                              |
//! | `'...'`           | `varchar(L)`, `varchar(max)` > 8000    |
//! | `0x...`           | `varbinary(B)`, `varbinary(max)` > 8000|
//! | `[+-]digits`      | `int`, or `bigint` outside 32 bits     |
//! | `[+-]d.d`         | `decimal(p,s)`, p <= 38                |

use std::fmt;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while_m_n},
    character::complete::{char, digit0, digit1, none_of, one_of},
    combinator::{all_consuming, map, opt, recognize, value},
    multi::fold_many0,
    sequence::{delimited, pair, preceded, tuple},
};
use num_bigint::BigInt;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Longest `nvarchar(n)`; anything longer is `nvarchar(max)`.
pub const MAX_NVARCHAR_LENGTH: usize = 4000;
/// Longest `varchar(n)`; anything longer is `varchar(max)`.
pub const MAX_VARCHAR_LENGTH: usize = 8000;
/// Longest `varbinary(n)` in bytes; anything longer is `varbinary(max)`.
pub const MAX_VARBINARY_LENGTH: usize = 8000;
/// Maximum `decimal` precision.
pub const MAX_DECIMAL_PRECISION: usize = 38;
/// Maximum fractional-second digits for `time` and `datetime2`.
pub const MAX_FRACTION_DIGITS: usize = 7;

/// Length argument of a sized string or binary type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Max,
    Fixed(usize),
}

impl Length {
    /// `Fixed(len)` (at least 1) up to `limit`, `Max` beyond it.
    fn bounded(len: usize, limit: usize) -> Self {
        if len > limit {
            Length::Max
        } else {
            Length::Fixed(len.max(1))
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Max => write!(f, "max"),
            Length::Fixed(n) => write!(f, "{}", n),
        }
    }
}

/// A SQL Server type as it appears in a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Int,
    BigInt,
    Decimal { precision: usize, scale: usize },
    NVarChar(Length),
    VarChar(Length),
    VarBinary(Length),
    Date,
    Time(usize),
    DateTime2(usize),
    /// `sql_variant`, the stand-in for values of unknown type.
    Variant,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Int => write!(f, "int"),
            SqlType::BigInt => write!(f, "bigint"),
            SqlType::Decimal { precision, scale } => write!(f, "decimal({},{})", precision, scale),
            SqlType::NVarChar(len) => write!(f, "nvarchar({})", len),
            SqlType::VarChar(len) => write!(f, "varchar({})", len),
            SqlType::VarBinary(len) => write!(f, "varbinary({})", len),
            SqlType::Date => write!(f, "date"),
            SqlType::Time(digits) => write!(f, "time({})", digits),
            SqlType::DateTime2(digits) => write!(f, "datetime2({})", digits),
            SqlType::Variant => write!(f, "sql_variant"),
        }
    }
}

impl Serialize for SqlType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Why a token did not get a confident type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("value is empty")]
    Empty,

    #[error("NULL carries no type information")]
    Null,

    #[error("hex literal has an odd number of digits ({0})")]
    OddHexDigits(usize),

    #[error("integer literal could not be parsed: {0}")]
    IntegerParse(String),

    #[error("decimal precision {0} exceeds SQL Server limit of 38")]
    PrecisionExceeded(usize),

    #[error("unsupported token format")]
    Unsupported,
}

impl Serialize for LiteralError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of classifying one token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// Literal text to embed in SQL, if one could be produced.
    pub normalized_literal: Option<String>,
    pub inferred_type: Option<SqlType>,
    /// True only when the type follows from the syntax alone.
    pub confident: bool,
    pub parse_error: Option<LiteralError>,
}

impl Classification {
    fn typed(literal: String, ty: SqlType) -> Self {
        Self {
            normalized_literal: Some(literal),
            inferred_type: Some(ty),
            confident: true,
            parse_error: None,
        }
    }

    fn uncertain(literal: Option<String>, error: LiteralError) -> Self {
        Self {
            normalized_literal: literal,
            inferred_type: None,
            confident: false,
            parse_error: Some(error),
        }
    }
}

/// Classify a raw value token.
pub fn classify(token: &str) -> Classification {
    let token = token.trim();

    if token.is_empty() {
        return Classification::uncertain(None, LiteralError::Empty);
    }
    if token.eq_ignore_ascii_case("NULL") {
        return Classification::uncertain(Some("NULL".to_string()), LiteralError::Null);
    }
    if let Ok((_, text)) = all_consuming(national_string)(token) {
        // nvarchar lengths count UTF-16 code units
        let units = text.encode_utf16().count();
        let ty = SqlType::NVarChar(Length::bounded(units, MAX_NVARCHAR_LENGTH));
        return Classification::typed(format!("N{}", quote(&text)), ty);
    }
    if let Ok((_, text)) = all_consuming(quoted_string)(token) {
        let ty = temporal_type(&text).unwrap_or_else(|| {
            SqlType::VarChar(Length::bounded(text.chars().count(), MAX_VARCHAR_LENGTH))
        });
        return Classification::typed(quote(&text), ty);
    }
    if let Ok((_, digits)) = all_consuming(hex_literal)(token) {
        return classify_hex(digits);
    }
    if all_consuming(integer)(token).is_ok() {
        return classify_integer(token);
    }
    if let Ok((_, (int_digits, frac_digits))) = all_consuming(decimal)(token) {
        return classify_decimal(token, int_digits, frac_digits);
    }

    Classification::uncertain(Some(token.to_string()), LiteralError::Unsupported)
}

fn classify_hex(digits: &str) -> Classification {
    if digits.len() % 2 != 0 {
        return Classification::uncertain(None, LiteralError::OddHexDigits(digits.len()));
    }
    let ty = SqlType::VarBinary(Length::bounded(digits.len() / 2, MAX_VARBINARY_LENGTH));
    Classification::typed(format!("0x{}", digits), ty)
}

fn classify_integer(token: &str) -> Classification {
    let value: BigInt = match token.parse() {
        Ok(v) => v,
        Err(e) => {
            return Classification::uncertain(
                Some(token.to_string()),
                LiteralError::IntegerParse(e.to_string()),
            );
        }
    };

    let fits_int = value >= BigInt::from(i32::MIN) && value <= BigInt::from(i32::MAX);
    let ty = if fits_int { SqlType::Int } else { SqlType::BigInt };
    Classification::typed(value.to_string(), ty)
}

fn classify_decimal(token: &str, int_digits: usize, frac_digits: usize) -> Classification {
    let literal = token.strip_prefix('+').unwrap_or(token).to_string();
    // `.5` is read as `0.5`
    let precision = int_digits.max(1) + frac_digits;
    if precision > MAX_DECIMAL_PRECISION {
        return Classification::uncertain(Some(literal), LiteralError::PrecisionExceeded(precision));
    }
    Classification::typed(
        literal,
        SqlType::Decimal {
            precision,
            scale: frac_digits,
        },
    )
}

/// Re-quote `text` as a SQL string body.
fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn temporal_type(text: &str) -> Option<SqlType> {
    if let Ok((_, digits)) = all_consuming(datetime)(text) {
        return Some(SqlType::DateTime2(digits));
    }
    if all_consuming(date)(text).is_ok() {
        return Some(SqlType::Date);
    }
    if let Ok((_, digits)) = all_consuming(time)(text) {
        return Some(SqlType::Time(digits));
    }
    None
}

// ---------------------------------------------------------------------------
// Token shapes
// ---------------------------------------------------------------------------

/// `'...'` with `''` as the only escape; yields the decoded text.
fn quoted_string(input: &str) -> IResult<&str, String> {
    delimited(
        char('\''),
        fold_many0(
            alt((value('\'', tag("''")), none_of("'"))),
            String::new,
            |mut acc, c| {
                acc.push(c);
                acc
            },
        ),
        char('\''),
    )(input)
}

/// `N'...'`.
fn national_string(input: &str) -> IResult<&str, String> {
    preceded(one_of("Nn"), quoted_string)(input)
}

/// `0x` followed by hex digits; yields the digits.
fn hex_literal(input: &str) -> IResult<&str, &str> {
    preceded(tag_no_case("0x"), take_while(|c: char| c.is_ascii_hexdigit()))(input)
}

fn sign(input: &str) -> IResult<&str, Option<char>> {
    opt(one_of("+-"))(input)
}

fn integer(input: &str) -> IResult<&str, &str> {
    recognize(pair(sign, digit1))(input)
}

/// `d+.d*` or `.d+`; yields the integer and fractional digit counts.
fn decimal(input: &str) -> IResult<&str, (usize, usize)> {
    preceded(
        sign,
        alt((
            map(tuple((digit1, char('.'), digit0)), |(int, _, frac): (&str, char, &str)| {
                (int.len(), frac.len())
            }),
            map(preceded(char('.'), digit1), |frac: &str| (0, frac.len())),
        )),
    )(input)
}

fn digits<'a>(n: usize) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    take_while_m_n(n, n, |c: char| c.is_ascii_digit())
}

fn date(input: &str) -> IResult<&str, ()> {
    value(
        (),
        tuple((digits(4), char('-'), digits(2), char('-'), digits(2))),
    )(input)
}

/// `hh:mm:ss[.fffffff]`; yields the number of fractional digits.
fn time(input: &str) -> IResult<&str, usize> {
    let (input, _) = tuple((digits(2), char(':'), digits(2), char(':'), digits(2)))(input)?;
    let (input, fraction) = opt(preceded(
        char('.'),
        take_while_m_n(1, MAX_FRACTION_DIGITS, |c: char| c.is_ascii_digit()),
    ))(input)?;
    Ok((input, fraction.map_or(0, str::len)))
}

fn datetime(input: &str) -> IResult<&str, usize> {
    preceded(pair(date, char(' ')), time)(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_of(token: &str) -> String {
        classify(token)
            .inferred_type
            .map(|t| t.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_empty_token() {
        let c = classify("   ");
        assert!(!c.confident);
        assert_eq!(c.normalized_literal, None);
        assert_eq!(c.parse_error, Some(LiteralError::Empty));
    }

    #[test]
    fn test_null_is_never_confident() {
        for token in ["NULL", "null", "Null"] {
            let c = classify(token);
            assert!(!c.confident);
            assert_eq!(c.inferred_type, None);
            assert_eq!(c.normalized_literal.as_deref(), Some("NULL"));
            assert_eq!(c.parse_error, Some(LiteralError::Null));
        }
    }

    #[test]
    fn test_national_strings() {
        let c = classify("N'AB'");
        assert!(c.confident);
        assert_eq!(c.normalized_literal.as_deref(), Some("N'AB'"));
        assert_eq!(type_of("N'AB'"), "nvarchar(2)");
        assert_eq!(type_of("N''"), "nvarchar(1)");
        // the escaped quote counts as one character
        assert_eq!(type_of("N'it''s'"), "nvarchar(4)");
        assert_eq!(classify("n'x'").normalized_literal.as_deref(), Some("N'x'"));
    }

    #[test]
    fn test_national_length_boundary() {
        let at_limit = format!("N'{}'", "a".repeat(4000));
        let over = format!("N'{}'", "a".repeat(4001));
        let long = format!("N'{}'", "a".repeat(4100));
        assert_eq!(type_of(&at_limit), "nvarchar(4000)");
        assert_eq!(type_of(&over), "nvarchar(max)");
        assert_eq!(type_of(&long), "nvarchar(max)");
    }

    #[test]
    fn test_national_length_counts_utf16_units() {
        assert_eq!(type_of("N'日本語'"), "nvarchar(3)");
        assert_eq!(type_of("N'😀'"), "nvarchar(2)");
        assert_eq!(type_of("N'a😀b'"), "nvarchar(4)");
    }

    #[test]
    fn test_national_boundary_uses_utf16_units() {
        // 2000 surrogate pairs fill nvarchar(4000) exactly
        let at_limit = format!("N'{}'", "😀".repeat(2000));
        let over = format!("N'{}a'", "😀".repeat(2000));
        assert_eq!(type_of(&at_limit), "nvarchar(4000)");
        assert_eq!(type_of(&over), "nvarchar(max)");
    }

    #[test]
    fn test_plain_strings() {
        assert_eq!(type_of("'abc'"), "varchar(3)");
        assert_eq!(type_of("''"), "varchar(1)");
        assert_eq!(classify("'o''k'").normalized_literal.as_deref(), Some("'o''k'"));
        assert_eq!(type_of(&format!("'{}'", "x".repeat(8000))), "varchar(8000)");
        assert_eq!(type_of(&format!("'{}'", "x".repeat(8001))), "varchar(max)");
        assert_eq!(type_of(&format!("'{}'", "x".repeat(8100))), "varchar(max)");
    }

    #[test]
    fn test_unterminated_string_is_unsupported() {
        let c = classify("'abc");
        assert!(!c.confident);
        assert_eq!(c.parse_error, Some(LiteralError::Unsupported));
        assert_eq!(c.normalized_literal.as_deref(), Some("'abc"));
        assert_eq!(classify("'a'b'").parse_error, Some(LiteralError::Unsupported));
    }

    #[test]
    fn test_temporal_strings() {
        assert_eq!(type_of("'2024-01-31 13:45:00'"), "datetime2(0)");
        assert_eq!(type_of("'2024-01-31 13:45:00.123'"), "datetime2(3)");
        assert_eq!(type_of("'2024-01-31 13:45:00.1234567'"), "datetime2(7)");
        assert_eq!(type_of("'2024-01-31'"), "date");
        assert_eq!(type_of("'13:45:00'"), "time(0)");
        assert_eq!(type_of("'13:45:00.5'"), "time(1)");
        assert_eq!(
            classify("'2024-01-31'").normalized_literal.as_deref(),
            Some("'2024-01-31'")
        );
    }

    #[test]
    fn test_near_temporal_strings_fall_back_to_varchar() {
        assert_eq!(type_of("'2024-01-31 13:45:00.12345678'"), "varchar(28)");
        assert_eq!(type_of("'2024-1-31'"), "varchar(9)");
        assert_eq!(type_of("'2024-01-31T13:45:00'"), "varchar(19)");
        assert_eq!(type_of("'13:45'"), "varchar(5)");
        assert_eq!(type_of("'13:45:00.'"), "varchar(9)");
    }

    #[test]
    fn test_national_temporal_stays_nvarchar() {
        assert_eq!(type_of("N'2024-01-31'"), "nvarchar(10)");
    }

    #[test]
    fn test_hex() {
        assert_eq!(type_of("0xA0FF"), "varbinary(2)");
        assert_eq!(classify("0xa0ff").normalized_literal.as_deref(), Some("0xa0ff"));
        assert_eq!(type_of("0x"), "varbinary(1)");
        assert_eq!(type_of(&format!("0x{}", "AB".repeat(8000))), "varbinary(8000)");
        assert_eq!(type_of(&format!("0x{}", "AB".repeat(8001))), "varbinary(max)");
    }

    #[test]
    fn test_odd_hex_has_no_literal() {
        let c = classify("0xABC");
        assert!(!c.confident);
        assert_eq!(c.normalized_literal, None);
        assert_eq!(c.parse_error, Some(LiteralError::OddHexDigits(3)));
    }

    #[test]
    fn test_integers() {
        assert_eq!(type_of("7"), "int");
        assert_eq!(type_of("2147483647"), "int");
        assert_eq!(type_of("2147483648"), "bigint");
        assert_eq!(type_of("-2147483648"), "int");
        assert_eq!(type_of("-2147483649"), "bigint");
        assert_eq!(type_of("123456789012345678901234567890123456789012"), "bigint");
    }

    #[test]
    fn test_integer_literal_is_canonical() {
        assert_eq!(classify("+42").normalized_literal.as_deref(), Some("42"));
        assert_eq!(classify("007").normalized_literal.as_deref(), Some("7"));
        assert_eq!(classify("-0").normalized_literal.as_deref(), Some("0"));
    }

    #[test]
    fn test_decimals() {
        assert_eq!(type_of("12.340"), "decimal(5,3)");
        assert_eq!(type_of(".5"), "decimal(2,1)");
        assert_eq!(type_of("5."), "decimal(1,0)");
        assert_eq!(type_of("-0.25"), "decimal(3,2)");
        assert_eq!(classify("+1.5").normalized_literal.as_deref(), Some("1.5"));
    }

    #[test]
    fn test_decimal_precision_limit() {
        let ok = format!("{}.{}", "1".repeat(20), "2".repeat(18));
        assert_eq!(type_of(&ok), "decimal(38,18)");

        let too_wide = format!("{}.{}", "1".repeat(20), "2".repeat(19));
        let c = classify(&too_wide);
        assert!(!c.confident);
        assert_eq!(c.inferred_type, None);
        assert_eq!(c.normalized_literal.as_deref(), Some(too_wide.as_str()));
        assert_eq!(c.parse_error, Some(LiteralError::PrecisionExceeded(39)));
        assert!(c.parse_error.unwrap().to_string().contains("exceeds SQL Server limit"));
    }

    #[test]
    fn test_unsupported_tokens_pass_through() {
        for token in ["GETDATE()", "1e5", "@other", "TRUE", "1.2.3", "--1"] {
            let c = classify(token);
            assert!(!c.confident, "{token} should not be confident");
            assert_eq!(c.normalized_literal.as_deref(), Some(token));
            assert_eq!(c.parse_error, Some(LiteralError::Unsupported));
        }
    }

    #[test]
    fn test_token_is_trimmed() {
        assert_eq!(classify("  7 ").normalized_literal.as_deref(), Some("7"));
    }

    #[test]
    fn test_confident_results_always_carry_type_and_literal() {
        let tokens = ["1", "N'a'", "'b'", "0x00", "1.0", "'2024-01-01'", "NULL", "0x1", "x"];
        for token in tokens {
            let c = classify(token);
            if c.confident {
                assert!(c.inferred_type.is_some() && c.normalized_literal.is_some());
                assert!(c.parse_error.is_none());
            }
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        for token in ["12.340", "N'x'", "0xA0", "2147483648", "NULL", "junk"] {
            assert_eq!(classify(token), classify(token));
        }
    }
}
