//! Leaf predicates: single-field boolean tests.
//!
//! A [`Predicate`] pairs a column name with one operator from a closed set. Field
//! values are raw strings; each operator family interprets them at evaluation time
//! (text, numeric, date, boolean). Data-shaped failures (a non-numeric value under a
//! numeric operator, an unparsable date) are absorbed into the boolean result rather
//! than raised; only a failing `custom` callback makes evaluation return an error.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};

use crate::error::{FilterError, FilterResult};
use crate::types::Row;

/// Date format used by date predicates unless overridden: the registry's
/// `AAAAMMDD` convention (e.g. `20170203`).
pub const DEFAULT_DATE_FORMAT: &str = "%Y%m%d";

/// User-supplied predicate callback.
///
/// Receives the whole row; an `Err` aborts the run as a configuration bug.
pub type CustomFn =
    Arc<dyn Fn(&Row) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// Comparison direction shared by the numeric and date operator families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal.
    Ge,
    /// Less than or equal.
    Le,
}

/// Text operand with its case-folded form precomputed at construction.
#[derive(Debug, Clone)]
pub struct TextOperand {
    raw: String,
    folded: String,
}

impl TextOperand {
    fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let folded = raw.to_lowercase();
        Self { raw, folded }
    }
}

/// Numeric operand kept raw alongside its parse result.
///
/// An unparsable operand is not a construction error: it simply never compares
/// equal/ordered to anything, so the predicate is `false` (`ne`: `true`) for every
/// row. This is what makes `ne(field, "")` a usable non-empty test.
#[derive(Debug, Clone)]
pub struct NumberOperand {
    raw: String,
    parsed: Option<f64>,
}

impl NumberOperand {
    fn new(raw: impl ToString) -> Self {
        let raw = raw.to_string();
        let parsed = raw.trim().parse::<f64>().ok();
        Self { raw, parsed }
    }
}

/// Date operand with its format and parse result.
#[derive(Debug, Clone)]
pub struct DateOperand {
    raw: String,
    format: String,
    parsed: Option<NaiveDate>,
}

impl DateOperand {
    fn new(raw: impl Into<String>, format: impl Into<String>) -> Self {
        let raw = raw.into();
        let format = format.into();
        let parsed = NaiveDate::parse_from_str(raw.trim(), &format).ok();
        Self { raw, format, parsed }
    }
}

/// Compiled regex operand; the pattern is kept for recompilation when case
/// sensitivity changes.
#[derive(Debug, Clone)]
pub struct RegexOperand {
    pattern: String,
    compiled: Regex,
}

/// Closed set of leaf operators.
pub enum PredicateOp {
    /// Substring match.
    Contains(TextOperand),
    /// Prefix match.
    StartsWith(TextOperand),
    /// Suffix match.
    EndsWith(TextOperand),
    /// Unanchored regex search, compiled once at construction.
    Matches(RegexOperand),
    /// Numeric comparison; both sides parsed as `f64`.
    Number(CmpOp, NumberOperand),
    /// Date comparison under a fixed format.
    Date(CmpOp, DateOperand),
    /// Boolean equality over the fixed truthy/falsy token set.
    BoolEq(bool),
    /// Boolean inequality over the fixed truthy/falsy token set.
    BoolNe(bool),
    /// User callback over the whole row.
    Custom(CustomFn),
}

impl Clone for PredicateOp {
    fn clone(&self) -> Self {
        match self {
            Self::Contains(op) => Self::Contains(op.clone()),
            Self::StartsWith(op) => Self::StartsWith(op.clone()),
            Self::EndsWith(op) => Self::EndsWith(op.clone()),
            Self::Matches(op) => Self::Matches(op.clone()),
            Self::Number(cmp, op) => Self::Number(*cmp, op.clone()),
            Self::Date(cmp, op) => Self::Date(*cmp, op.clone()),
            Self::BoolEq(v) => Self::BoolEq(*v),
            Self::BoolNe(v) => Self::BoolNe(*v),
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
        }
    }
}

impl fmt::Debug for PredicateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains(op) => f.debug_tuple("Contains").field(&op.raw).finish(),
            Self::StartsWith(op) => f.debug_tuple("StartsWith").field(&op.raw).finish(),
            Self::EndsWith(op) => f.debug_tuple("EndsWith").field(&op.raw).finish(),
            Self::Matches(op) => f.debug_tuple("Matches").field(&op.pattern).finish(),
            Self::Number(cmp, op) => f.debug_tuple("Number").field(cmp).field(&op.raw).finish(),
            Self::Date(cmp, op) => f.debug_tuple("Date").field(cmp).field(&op.raw).finish(),
            Self::BoolEq(v) => f.debug_tuple("BoolEq").field(v).finish(),
            Self::BoolNe(v) => f.debug_tuple("BoolNe").field(v).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A single-field boolean test.
///
/// Immutable once constructed; reused across every row of a run. Text operators are
/// case-insensitive by default (matching the registry tooling this replaces); see
/// [`Predicate::case_sensitive`].
#[derive(Debug, Clone)]
pub struct Predicate {
    field: String,
    op: PredicateOp,
    case_sensitive: bool,
    split_on: Option<char>,
}

impl Predicate {
    fn new(field: impl Into<String>, op: PredicateOp) -> Self {
        Self {
            field: field.into(),
            op,
            case_sensitive: false,
            split_on: None,
        }
    }

    /// Substring test.
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, PredicateOp::Contains(TextOperand::new(value)))
    }

    /// Prefix test.
    pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, PredicateOp::StartsWith(TextOperand::new(value)))
    }

    /// Suffix test.
    pub fn ends_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, PredicateOp::EndsWith(TextOperand::new(value)))
    }

    /// Unanchored regex test. The pattern compiles once here; a malformed pattern
    /// fails construction.
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> FilterResult<Self> {
        let pattern = pattern.into();
        let compiled = compile_pattern(&pattern, false)?;
        Ok(Self::new(
            field,
            PredicateOp::Matches(RegexOperand { pattern, compiled }),
        ))
    }

    /// Numeric `>`.
    pub fn gt(field: impl Into<String>, value: impl ToString) -> Self {
        Self::number(field, CmpOp::Gt, value)
    }

    /// Numeric `<`.
    pub fn lt(field: impl Into<String>, value: impl ToString) -> Self {
        Self::number(field, CmpOp::Lt, value)
    }

    /// Numeric `>=`.
    pub fn ge(field: impl Into<String>, value: impl ToString) -> Self {
        Self::number(field, CmpOp::Ge, value)
    }

    /// Numeric `<=`.
    pub fn le(field: impl Into<String>, value: impl ToString) -> Self {
        Self::number(field, CmpOp::Le, value)
    }

    /// Numeric equality.
    pub fn eq(field: impl Into<String>, value: impl ToString) -> Self {
        Self::number(field, CmpOp::Eq, value)
    }

    /// Numeric inequality. A field (or operand) that does not parse as a number is
    /// trivially not equal, so this evaluates to `true` for it.
    pub fn ne(field: impl Into<String>, value: impl ToString) -> Self {
        Self::number(field, CmpOp::Ne, value)
    }

    fn number(field: impl Into<String>, cmp: CmpOp, value: impl ToString) -> Self {
        Self::new(field, PredicateOp::Number(cmp, NumberOperand::new(value)))
    }

    /// Date equality under [`DEFAULT_DATE_FORMAT`].
    pub fn date_eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::date(field, CmpOp::Eq, value)
    }

    /// Date inequality under [`DEFAULT_DATE_FORMAT`]; unparsable dates are trivially
    /// not equal.
    pub fn date_ne(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::date(field, CmpOp::Ne, value)
    }

    /// Date `>` under [`DEFAULT_DATE_FORMAT`].
    pub fn date_gt(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::date(field, CmpOp::Gt, value)
    }

    /// Date `<` under [`DEFAULT_DATE_FORMAT`].
    pub fn date_lt(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::date(field, CmpOp::Lt, value)
    }

    /// Date `>=` under [`DEFAULT_DATE_FORMAT`].
    pub fn date_ge(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::date(field, CmpOp::Ge, value)
    }

    /// Date `<=` under [`DEFAULT_DATE_FORMAT`].
    pub fn date_le(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::date(field, CmpOp::Le, value)
    }

    fn date(field: impl Into<String>, cmp: CmpOp, value: impl Into<String>) -> Self {
        Self::new(
            field,
            PredicateOp::Date(cmp, DateOperand::new(value, DEFAULT_DATE_FORMAT)),
        )
    }

    /// Boolean equality. Field tokens true/t/1/yes/y are truthy, false/f/0/no/n are
    /// falsy (case-insensitive); anything else counts as false.
    pub fn bool_eq(field: impl Into<String>, value: bool) -> Self {
        Self::new(field, PredicateOp::BoolEq(value))
    }

    /// Boolean inequality; same token rules as [`Predicate::bool_eq`].
    pub fn bool_ne(field: impl Into<String>, value: bool) -> Self {
        Self::new(field, PredicateOp::BoolNe(value))
    }

    /// Custom row test. `field` is a diagnostic label (the callback sees the whole
    /// row), not a column reference.
    pub fn custom<F>(field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Row) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        Self::new(field, PredicateOp::Custom(Arc::new(f)))
    }

    /// Replace the date format of a date predicate (default
    /// [`DEFAULT_DATE_FORMAT`]); the operand is re-parsed under the new format.
    /// No effect on other operator families.
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        if let PredicateOp::Date(cmp, op) = &self.op {
            self.op = PredicateOp::Date(*cmp, DateOperand::new(op.raw.clone(), format));
        }
        self
    }

    /// Change text-operator case sensitivity (default: insensitive).
    ///
    /// Recompiles a regex operand, which can fail for patterns valid only under one
    /// flag set.
    pub fn case_sensitive(mut self, yes: bool) -> FilterResult<Self> {
        if let PredicateOp::Matches(op) = &mut self.op {
            op.compiled = compile_pattern(&op.pattern, yes)?;
        }
        self.case_sensitive = yes;
        Ok(self)
    }

    /// Treat the field as a `sep`-separated list for text operators: the predicate
    /// holds if any element (trimmed) matches. Registry exports pack secondary CNAE
    /// codes into one comma-separated field; this is the general form of that.
    pub fn split_values(mut self, sep: char) -> Self {
        self.split_on = Some(sep);
        self
    }

    /// The column this predicate tests, or its label for `custom`.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The column this predicate reads, if it reads one directly.
    ///
    /// `custom` returns `None`: its callback receives the whole row, so the field is
    /// only a label and is exempt from header validation.
    pub fn references_column(&self) -> Option<&str> {
        match self.op {
            PredicateOp::Custom(_) => None,
            _ => Some(&self.field),
        }
    }

    /// Evaluate this predicate against one row.
    ///
    /// Only a failing `custom` callback returns `Err`; every data-shaped failure is
    /// folded into the boolean per the operator family's policy.
    pub fn evaluate(&self, row: &Row) -> FilterResult<bool> {
        match &self.op {
            PredicateOp::Contains(op) => Ok(self.text_match(row, |hay, needle| hay.contains(needle), op)),
            PredicateOp::StartsWith(op) => {
                Ok(self.text_match(row, |hay, needle| hay.starts_with(needle), op))
            }
            PredicateOp::EndsWith(op) => {
                Ok(self.text_match(row, |hay, needle| hay.ends_with(needle), op))
            }
            PredicateOp::Matches(op) => Ok(self.each_part(row, |part| op.compiled.is_match(part))),
            PredicateOp::Number(cmp, op) => {
                let field = row.get(&self.field).and_then(|v| v.trim().parse::<f64>().ok());
                Ok(match (field, op.parsed) {
                    (Some(a), Some(b)) => compare(*cmp, a.partial_cmp(&b)),
                    // Absent/unparsable on either side: no match, except "not
                    // equal", which holds trivially.
                    _ => matches!(cmp, CmpOp::Ne),
                })
            }
            PredicateOp::Date(cmp, op) => {
                let field = row
                    .get(&self.field)
                    .and_then(|v| NaiveDate::parse_from_str(v.trim(), &op.format).ok());
                Ok(match (field, op.parsed) {
                    (Some(a), Some(b)) => compare(*cmp, a.partial_cmp(&b)),
                    _ => matches!(cmp, CmpOp::Ne),
                })
            }
            PredicateOp::BoolEq(want) => Ok(truthy(row.get(&self.field).unwrap_or("")) == *want),
            PredicateOp::BoolNe(want) => Ok(truthy(row.get(&self.field).unwrap_or("")) != *want),
            PredicateOp::Custom(f) => f(row).map_err(|source| FilterError::CustomPredicate {
                field: self.field.clone(),
                record: row.record_index(),
                source,
            }),
        }
    }

    fn text_match<F>(&self, row: &Row, test: F, operand: &TextOperand) -> bool
    where
        F: Fn(&str, &str) -> bool,
    {
        if self.case_sensitive {
            self.each_part(row, |part| test(part, &operand.raw))
        } else {
            self.each_part(row, |part| test(&part.to_lowercase(), &operand.folded))
        }
    }

    /// Apply `test` to the raw field value, or to each trimmed element when
    /// [`Predicate::split_values`] is set. A missing field behaves as "".
    fn each_part<F>(&self, row: &Row, test: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        let value = row.get(&self.field).unwrap_or("");
        match self.split_on {
            Some(sep) => value.split(sep).map(str::trim).any(test),
            None => test(value),
        }
    }
}

fn compile_pattern(pattern: &str, case_sensitive: bool) -> FilterResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|source| FilterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

fn compare(cmp: CmpOp, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    match cmp {
        CmpOp::Eq => matches!(ordering, Some(Equal)),
        CmpOp::Ne => !matches!(ordering, Some(Equal)),
        CmpOp::Gt => matches!(ordering, Some(Greater)),
        CmpOp::Lt => matches!(ordering, Some(Less)),
        CmpOp::Ge => matches!(ordering, Some(Greater | Equal)),
        CmpOp::Le => matches!(ordering, Some(Less | Equal)),
    }
}

fn truthy(token: &str) -> bool {
    matches!(
        token.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "1" | "yes" | "y"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Header;

    fn row(columns: &[&str], values: &[&str]) -> Row {
        let header =
            Arc::new(Header::new(columns.iter().map(|s| s.to_string()).collect()).unwrap());
        Row::new(header, 1, values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn contains_is_case_insensitive_by_default() {
        let r = row(&["CORREIO_ELETRONICO"], &["Someone@Gmail.com"]);
        assert!(Predicate::contains("CORREIO_ELETRONICO", "@gmail")
            .evaluate(&r)
            .unwrap());
        assert!(!Predicate::contains("CORREIO_ELETRONICO", "@gmail")
            .case_sensitive(true)
            .unwrap()
            .evaluate(&r)
            .unwrap());
    }

    #[test]
    fn string_ops_treat_missing_field_as_empty() {
        let r = row(&["UF"], &["MG"]);
        // Missing column behaves like "".
        assert!(!Predicate::contains("CEP", "3").evaluate(&r).unwrap());
        assert!(Predicate::starts_with("CEP", "").evaluate(&r).unwrap());
        assert!(Predicate::ends_with("CEP", "").evaluate(&r).unwrap());
    }

    #[test]
    fn regex_matches_unanchored_and_fails_construction_on_bad_pattern() {
        let r = row(&["CNPJ_BASICO"], &["12345678"]);
        let p = Predicate::regex("CNPJ_BASICO", r"^[0-9]{8}$").unwrap();
        assert!(p.evaluate(&r).unwrap());

        let err = Predicate::regex("CNPJ_BASICO", "[").unwrap_err();
        assert!(matches!(err, FilterError::InvalidPattern { .. }));
    }

    #[test]
    fn numeric_parse_failure_is_false_except_ne() {
        let r = row(&["TELEFONE_1"], &[""]);
        assert!(!Predicate::gt("TELEFONE_1", "0").evaluate(&r).unwrap());
        assert!(!Predicate::eq("TELEFONE_1", "0").evaluate(&r).unwrap());
        assert!(Predicate::ne("TELEFONE_1", "").evaluate(&r).unwrap());
    }

    #[test]
    fn numeric_comparisons() {
        let r = row(&["CAPITAL"], &["1500.50"]);
        assert!(Predicate::gt("CAPITAL", 1000).evaluate(&r).unwrap());
        assert!(Predicate::le("CAPITAL", "1500.50").evaluate(&r).unwrap());
        assert!(Predicate::ge("CAPITAL", "1500.50").evaluate(&r).unwrap());
        assert!(!Predicate::lt("CAPITAL", 1500).evaluate(&r).unwrap());
        assert!(Predicate::ne("CAPITAL", 0).evaluate(&r).unwrap());
    }

    #[test]
    fn date_comparisons_use_registry_format() {
        let r = row(&["DATA_INICIO_ATIVIDADE"], &["20170118"]);
        assert!(Predicate::date_eq("DATA_INICIO_ATIVIDADE", "20170118")
            .evaluate(&r)
            .unwrap());
        assert!(Predicate::date_gt("DATA_INICIO_ATIVIDADE", "20161231")
            .evaluate(&r)
            .unwrap());
        assert!(Predicate::date_lt("DATA_INICIO_ATIVIDADE", "20180101")
            .evaluate(&r)
            .unwrap());
    }

    #[test]
    fn date_parse_failure_is_false_except_ne() {
        let r = row(&["DATA_SITUACAO_ESPECIAL"], &[""]);
        assert!(!Predicate::date_ge("DATA_SITUACAO_ESPECIAL", "20200101")
            .evaluate(&r)
            .unwrap());
        assert!(Predicate::date_ne("DATA_SITUACAO_ESPECIAL", "20200101")
            .evaluate(&r)
            .unwrap());
    }

    #[test]
    fn bool_tokens() {
        for token in ["true", "T", "1", "yes", "Y"] {
            let r = row(&["OPTANTE_SIMPLES"], &[token]);
            assert!(Predicate::bool_eq("OPTANTE_SIMPLES", true).evaluate(&r).unwrap());
        }
        for token in ["false", "F", "0", "no", "N", "", "talvez"] {
            let r = row(&["OPTANTE_SIMPLES"], &[token]);
            assert!(!Predicate::bool_eq("OPTANTE_SIMPLES", true).evaluate(&r).unwrap());
            assert!(Predicate::bool_ne("OPTANTE_SIMPLES", true).evaluate(&r).unwrap());
        }
    }

    #[test]
    fn split_values_matches_any_element() {
        let r = row(&["CNAE_FISCAL_SECUNDARIA"], &["7911200, 7912100 ,8599604"]);
        let p = Predicate::contains("CNAE_FISCAL_SECUNDARIA", "8599604").split_values(',');
        assert!(p.evaluate(&r).unwrap());

        let p = Predicate::starts_with("CNAE_FISCAL_SECUNDARIA", "7912").split_values(',');
        assert!(p.evaluate(&r).unwrap());

        let p = Predicate::contains("CNAE_FISCAL_SECUNDARIA", "9999999").split_values(',');
        assert!(!p.evaluate(&r).unwrap());
    }

    #[test]
    fn custom_error_carries_field_and_record() {
        let r = row(&["UF"], &["MG"]);
        let p = Predicate::custom("check", |_| Err("boom".into()));
        let err = p.evaluate(&r).unwrap_err();
        match err {
            FilterError::CustomPredicate { field, record, .. } => {
                assert_eq!(field, "check");
                assert_eq!(record, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn custom_sees_whole_row() {
        let r = row(&["DDD_1", "TELEFONE_1"], &["31", "987654321"]);
        let p = Predicate::custom("has_full_phone", |row| {
            Ok(!row.get("DDD_1").unwrap_or("").is_empty()
                && !row.get("TELEFONE_1").unwrap_or("").is_empty())
        });
        assert!(p.evaluate(&r).unwrap());
    }
}
