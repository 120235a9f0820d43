//! The filter expression engine.
//!
//! An expression is a finite, immutable tree: [`Predicate`] leaves composed by
//! AND/OR/NOT [`FilterExpr`] nodes, all sharing one capability — `evaluate(row) ->
//! bool`. The tree is built once, validated against the input header, and reused for
//! every row of a run.
//!
//! The free functions ([`and`], [`or`], [`not`], [`contains`], [`gt`], ...) mirror
//! the declarative style of filter documents (see [`spec`]):
//!
//! ```rust
//! use cnpj_filter::expr::{and, contains, ne, not, or};
//!
//! let interesting = and(vec![
//!     or(vec![
//!         contains("CNAE_FISCAL_PRINCIPAL", "7911200"),
//!         contains("CNAE_FISCAL_PRINCIPAL", "7912100"),
//!     ]),
//!     not(contains("CORREIO_ELETRONICO", "@gmail")),
//!     ne("TELEFONE_1", ""),
//! ]);
//! ```

pub mod predicate;
pub mod spec;

pub use predicate::{CmpOp, CustomFn, Predicate, PredicateOp, DEFAULT_DATE_FORMAT};
pub use spec::FilterSpec;

use crate::error::{FilterError, FilterResult};
use crate::types::{Header, Row};

/// A filter expression: a predicate leaf or an AND/OR/NOT combinator.
///
/// Evaluation is pure — no shared mutable state between rows — and short-circuits in
/// declaration order, so a `custom` predicate with side effects has reproducible
/// invocation counts.
#[derive(Debug, Clone)]
pub enum FilterExpr {
    /// Leaf test on one field.
    Pred(Predicate),
    /// True iff every child is true; stops at the first false child.
    And(Vec<FilterExpr>),
    /// True iff any child is true; stops at the first true child.
    Or(Vec<FilterExpr>),
    /// Negation of the single child.
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    /// Evaluate the expression against one row.
    ///
    /// The only error path is a failing `custom` callback
    /// ([`FilterError::CustomPredicate`]); short-circuiting means children after the
    /// deciding one are not evaluated at all.
    pub fn evaluate(&self, row: &Row) -> FilterResult<bool> {
        match self {
            Self::Pred(p) => p.evaluate(row),
            Self::And(children) => {
                for child in children {
                    if !child.evaluate(row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Or(children) => {
                for child in children {
                    if child.evaluate(row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not(child) => Ok(!child.evaluate(row)?),
        }
    }

    /// Check the expression against an input header before any row is read.
    ///
    /// Reports the configuration class of failures: predicates referencing columns
    /// the header does not have (`custom` labels are exempt) and AND/OR nodes with
    /// no children. A single-child AND/OR is legal and equal to its child.
    pub fn validate(&self, header: &Header) -> FilterResult<()> {
        match self {
            Self::Pred(p) => match p.references_column() {
                Some(column) if !header.contains(column) => Err(FilterError::UnknownColumn {
                    column: column.to_string(),
                }),
                _ => Ok(()),
            },
            Self::And(children) => Self::validate_children("AND", children, header),
            Self::Or(children) => Self::validate_children("OR", children, header),
            Self::Not(child) => child.validate(header),
        }
    }

    fn validate_children(
        kind: &'static str,
        children: &[FilterExpr],
        header: &Header,
    ) -> FilterResult<()> {
        if children.is_empty() {
            return Err(FilterError::EmptyCombinator { kind });
        }
        for child in children {
            child.validate(header)?;
        }
        Ok(())
    }
}

impl From<Predicate> for FilterExpr {
    fn from(p: Predicate) -> Self {
        Self::Pred(p)
    }
}

/// All children must hold.
pub fn and(children: Vec<FilterExpr>) -> FilterExpr {
    FilterExpr::And(children)
}

/// Any child must hold.
pub fn or(children: Vec<FilterExpr>) -> FilterExpr {
    FilterExpr::Or(children)
}

/// The child must not hold.
pub fn not(child: FilterExpr) -> FilterExpr {
    FilterExpr::Not(Box::new(child))
}

/// Substring test (case-insensitive by default).
pub fn contains(field: impl Into<String>, value: impl Into<String>) -> FilterExpr {
    Predicate::contains(field, value).into()
}

/// Prefix test (case-insensitive by default).
pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> FilterExpr {
    Predicate::starts_with(field, value).into()
}

/// Suffix test (case-insensitive by default).
pub fn ends_with(field: impl Into<String>, value: impl Into<String>) -> FilterExpr {
    Predicate::ends_with(field, value).into()
}

/// Regex test; fails on a malformed pattern.
pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> FilterResult<FilterExpr> {
    Ok(Predicate::regex(field, pattern)?.into())
}

/// Numeric `>`.
pub fn gt(field: impl Into<String>, value: impl ToString) -> FilterExpr {
    Predicate::gt(field, value).into()
}

/// Numeric `<`.
pub fn lt(field: impl Into<String>, value: impl ToString) -> FilterExpr {
    Predicate::lt(field, value).into()
}

/// Numeric `>=`.
pub fn ge(field: impl Into<String>, value: impl ToString) -> FilterExpr {
    Predicate::ge(field, value).into()
}

/// Numeric `<=`.
pub fn le(field: impl Into<String>, value: impl ToString) -> FilterExpr {
    Predicate::le(field, value).into()
}

/// Numeric equality.
pub fn eq(field: impl Into<String>, value: impl ToString) -> FilterExpr {
    Predicate::eq(field, value).into()
}

/// Numeric inequality (true for unparsable fields).
pub fn ne(field: impl Into<String>, value: impl ToString) -> FilterExpr {
    Predicate::ne(field, value).into()
}

/// Date equality.
pub fn date_eq(field: impl Into<String>, value: impl Into<String>) -> FilterExpr {
    Predicate::date_eq(field, value).into()
}

/// Date inequality (true for unparsable fields).
pub fn date_ne(field: impl Into<String>, value: impl Into<String>) -> FilterExpr {
    Predicate::date_ne(field, value).into()
}

/// Date `>`.
pub fn date_gt(field: impl Into<String>, value: impl Into<String>) -> FilterExpr {
    Predicate::date_gt(field, value).into()
}

/// Date `<`.
pub fn date_lt(field: impl Into<String>, value: impl Into<String>) -> FilterExpr {
    Predicate::date_lt(field, value).into()
}

/// Date `>=`.
pub fn date_ge(field: impl Into<String>, value: impl Into<String>) -> FilterExpr {
    Predicate::date_ge(field, value).into()
}

/// Date `<=`.
pub fn date_le(field: impl Into<String>, value: impl Into<String>) -> FilterExpr {
    Predicate::date_le(field, value).into()
}

/// Boolean equality over the fixed token set.
pub fn bool_eq(field: impl Into<String>, value: bool) -> FilterExpr {
    Predicate::bool_eq(field, value).into()
}

/// Boolean inequality over the fixed token set.
pub fn bool_ne(field: impl Into<String>, value: bool) -> FilterExpr {
    Predicate::bool_ne(field, value).into()
}

/// Custom row test; a callback error aborts the run.
pub fn custom<F>(field: impl Into<String>, f: F) -> FilterExpr
where
    F: Fn(&Row) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>
        + Send
        + Sync
        + 'static,
{
    Predicate::custom(field, f).into()
}
