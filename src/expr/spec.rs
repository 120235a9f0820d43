//! Declarative filter documents.
//!
//! Filters can be expressed as JSON trees and compiled to a [`FilterExpr`]:
//!
//! ```json
//! {
//!   "op": "AND",
//!   "conditions": [
//!     { "field": "CNAE_FISCAL_PRINCIPAL", "op": "contains", "value": "7911200" },
//!     { "op": "NOT", "condition":
//!       { "field": "CORREIO_ELETRONICO", "op": "contains", "value": "@gmail" } }
//!   ]
//! }
//! ```
//!
//! Leaf entries accept optional `case_sensitive`, `date_format`, and `split_on`
//! settings. `custom` predicates are intentionally not representable in documents —
//! they are code, attached via [`crate::expr::custom`].

use serde::{Deserialize, Serialize};

use super::{FilterExpr, Predicate};
use crate::error::{FilterError, FilterResult};

/// A filter document node: a combinator branch or a predicate leaf.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterSpec {
    /// AND/OR/NOT node.
    Branch(BranchSpec),
    /// Field predicate.
    Leaf(LeafSpec),
}

/// Combinator node of a filter document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum BranchSpec {
    /// All conditions must hold.
    #[serde(rename = "AND")]
    And { conditions: Vec<FilterSpec> },
    /// Any condition must hold.
    #[serde(rename = "OR")]
    Or { conditions: Vec<FilterSpec> },
    /// The condition must not hold.
    #[serde(rename = "NOT")]
    Not { condition: Box<FilterSpec> },
}

/// Predicate leaf of a filter document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafSpec {
    /// Column the predicate tests.
    pub field: String,
    /// Operator name: contains, startswith, endswith, regex, gt, lt, ge, le, eq,
    /// ne, date_eq, date_ne, date_gt, date_lt, date_ge, date_le, bool_eq, bool_ne.
    pub op: String,
    /// Operand; its expected JSON type depends on the operator family.
    pub value: serde_json::Value,
    /// Text operators only; defaults to case-insensitive.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub case_sensitive: bool,
    /// Date operators only; defaults to the registry's `%Y%m%d`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    /// Text operators only: treat the field as a list separated by this character.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_on: Option<char>,
}

impl FilterSpec {
    /// Parse a JSON filter document.
    pub fn from_json(text: &str) -> FilterResult<Self> {
        serde_json::from_str(text).map_err(|e| FilterError::Spec {
            message: e.to_string(),
        })
    }

    /// Compile the document into an executable expression.
    ///
    /// Unknown operators, mistyped operands, and malformed regex patterns are
    /// configuration errors reported here, before any row is read.
    pub fn compile(&self) -> FilterResult<FilterExpr> {
        match self {
            Self::Branch(BranchSpec::And { conditions }) => Ok(FilterExpr::And(
                conditions.iter().map(Self::compile).collect::<FilterResult<_>>()?,
            )),
            Self::Branch(BranchSpec::Or { conditions }) => Ok(FilterExpr::Or(
                conditions.iter().map(Self::compile).collect::<FilterResult<_>>()?,
            )),
            Self::Branch(BranchSpec::Not { condition }) => {
                Ok(FilterExpr::Not(Box::new(condition.compile()?)))
            }
            Self::Leaf(leaf) => leaf.compile(),
        }
    }
}

impl LeafSpec {
    fn compile(&self) -> FilterResult<FilterExpr> {
        let field = self.field.as_str();
        let mut predicate = match self.op.as_str() {
            "contains" => Predicate::contains(field, self.text_operand()?),
            "startswith" => Predicate::starts_with(field, self.text_operand()?),
            "endswith" => Predicate::ends_with(field, self.text_operand()?),
            "regex" => Predicate::regex(field, self.text_operand()?)?,
            "gt" => Predicate::gt(field, self.scalar_operand()?),
            "lt" => Predicate::lt(field, self.scalar_operand()?),
            "ge" => Predicate::ge(field, self.scalar_operand()?),
            "le" => Predicate::le(field, self.scalar_operand()?),
            "eq" => Predicate::eq(field, self.scalar_operand()?),
            "ne" => Predicate::ne(field, self.scalar_operand()?),
            "date_eq" | "date_ne" | "date_gt" | "date_lt" | "date_ge" | "date_le" => {
                self.compile_date()?
            }
            "bool_eq" => Predicate::bool_eq(field, self.bool_operand()?),
            "bool_ne" => Predicate::bool_ne(field, self.bool_operand()?),
            other => {
                return Err(FilterError::Spec {
                    message: format!("unknown operator '{other}' on field '{field}'"),
                });
            }
        };

        if self.case_sensitive {
            predicate = predicate.case_sensitive(true)?;
        }
        if let Some(sep) = self.split_on {
            predicate = predicate.split_values(sep);
        }
        Ok(FilterExpr::Pred(predicate))
    }

    fn compile_date(&self) -> FilterResult<Predicate> {
        let field = self.field.as_str();
        let value = self.text_operand()?;
        let mut predicate = match self.op.as_str() {
            "date_eq" => Predicate::date_eq(field, value),
            "date_ne" => Predicate::date_ne(field, value),
            "date_gt" => Predicate::date_gt(field, value),
            "date_lt" => Predicate::date_lt(field, value),
            "date_ge" => Predicate::date_ge(field, value),
            "date_le" => Predicate::date_le(field, value),
            op => unreachable!("non-date operator '{op}' routed to compile_date"),
        };
        if let Some(format) = &self.date_format {
            predicate = predicate.with_date_format(format);
        }
        Ok(predicate)
    }

    fn text_operand(&self) -> FilterResult<String> {
        match &self.value {
            serde_json::Value::String(s) => Ok(s.clone()),
            other => Err(self.operand_error("a string", other)),
        }
    }

    /// Numeric operators accept both JSON numbers and numeric strings; the raw form
    /// is kept and parsed by the predicate.
    fn scalar_operand(&self) -> FilterResult<String> {
        match &self.value {
            serde_json::Value::String(s) => Ok(s.clone()),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            other => Err(self.operand_error("a number or string", other)),
        }
    }

    fn bool_operand(&self) -> FilterResult<bool> {
        match &self.value {
            serde_json::Value::Bool(b) => Ok(*b),
            other => Err(self.operand_error("a boolean", other)),
        }
    }

    fn operand_error(&self, expected: &str, got: &serde_json::Value) -> FilterError {
        FilterError::Spec {
            message: format!(
                "operator '{}' on field '{}' expects {expected} operand, got {got}",
                self.op, self.field
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Header, Row};
    use std::sync::Arc;

    fn row(columns: &[&str], values: &[&str]) -> Row {
        let header =
            Arc::new(Header::new(columns.iter().map(|s| s.to_string()).collect()).unwrap());
        Row::new(header, 1, values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn compiles_nested_document() {
        let doc = r#"{
            "op": "AND",
            "conditions": [
                { "field": "CNAE_FISCAL_PRINCIPAL", "op": "contains", "value": "7911200" },
                { "op": "NOT", "condition":
                    { "field": "CORREIO_ELETRONICO", "op": "contains", "value": "@gmail" } },
                { "field": "TELEFONE_1", "op": "ne", "value": "" }
            ]
        }"#;

        let expr = FilterSpec::from_json(doc).unwrap().compile().unwrap();

        let matching = row(
            &["CNAE_FISCAL_PRINCIPAL", "CORREIO_ELETRONICO", "TELEFONE_1"],
            &["7911200", "contato@agencia.com.br", ""],
        );
        assert!(expr.evaluate(&matching).unwrap());

        let gmail = row(
            &["CNAE_FISCAL_PRINCIPAL", "CORREIO_ELETRONICO", "TELEFONE_1"],
            &["7911200", "alguem@gmail.com", ""],
        );
        assert!(!expr.evaluate(&gmail).unwrap());
    }

    #[test]
    fn leaf_settings_round_trip() {
        let doc = r#"{
            "field": "CNAE_FISCAL_SECUNDARIA",
            "op": "contains",
            "value": "7990200",
            "split_on": ","
        }"#;
        let spec = FilterSpec::from_json(doc).unwrap();
        let expr = spec.compile().unwrap();

        let r = row(&["CNAE_FISCAL_SECUNDARIA"], &["1234567,7990200"]);
        assert!(expr.evaluate(&r).unwrap());

        // Serialized form omits defaulted settings.
        let json = serde_json::to_value(&spec).unwrap();
        assert!(json.get("case_sensitive").is_none());
        assert_eq!(json["split_on"], ",");
    }

    #[test]
    fn numeric_operand_may_be_number_or_string() {
        for value in ["\"100\"", "100"] {
            let doc = format!(r#"{{ "field": "CAPITAL", "op": "gt", "value": {value} }}"#);
            let expr = FilterSpec::from_json(&doc).unwrap().compile().unwrap();
            assert!(expr.evaluate(&row(&["CAPITAL"], &["150"])).unwrap());
        }
    }

    #[test]
    fn unknown_operator_is_a_spec_error() {
        let doc = r#"{ "field": "UF", "op": "sounds_like", "value": "MG" }"#;
        let err = FilterSpec::from_json(doc).unwrap().compile().unwrap_err();
        assert!(matches!(err, FilterError::Spec { .. }));
        assert!(err.to_string().contains("sounds_like"));
    }

    #[test]
    fn mistyped_operand_is_a_spec_error() {
        let doc = r#"{ "field": "UF", "op": "contains", "value": 5 }"#;
        let err = FilterSpec::from_json(doc).unwrap().compile().unwrap_err();
        assert!(matches!(err, FilterError::Spec { .. }));

        let doc = r#"{ "field": "ATIVO", "op": "bool_eq", "value": "yes" }"#;
        let err = FilterSpec::from_json(doc).unwrap().compile().unwrap_err();
        assert!(matches!(err, FilterError::Spec { .. }));
    }

    #[test]
    fn bad_regex_in_document_fails_compile() {
        let doc = r#"{ "field": "CNPJ_BASICO", "op": "regex", "value": "[" }"#;
        let err = FilterSpec::from_json(doc).unwrap().compile().unwrap_err();
        assert!(matches!(err, FilterError::InvalidPattern { .. }));
    }

    #[test]
    fn date_format_override() {
        let doc = r#"{
            "field": "DATA_INICIO_ATIVIDADE",
            "op": "date_ge",
            "value": "2017-01-01",
            "date_format": "%Y-%m-%d"
        }"#;
        let expr = FilterSpec::from_json(doc).unwrap().compile().unwrap();
        assert!(expr
            .evaluate(&row(&["DATA_INICIO_ATIVIDADE"], &["2017-06-30"]))
            .unwrap());
    }
}
