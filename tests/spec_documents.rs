//! Declarative filter documents driving a full file run.

use cnpj_filter::expr::FilterSpec;
use cnpj_filter::pipeline::{filter_csv_path, RunOptions, Summary};
use cnpj_filter::FilterError;

#[test]
fn fixture_document_compiles_and_filters_the_fixture_export() {
    let document = std::fs::read_to_string("tests/fixtures/agencias_mg.json").unwrap();
    let expression = FilterSpec::from_json(&document).unwrap().compile().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("matches.csv");
    let summary = filter_csv_path(
        "tests/fixtures/estabelecimentos.csv",
        &output,
        &expression,
        &RunOptions::default(),
    )
    .unwrap();

    assert_eq!(
        summary,
        Summary {
            rows_read: 6,
            rows_matched: 2,
            rows_skipped: 0
        }
    );

    let text = std::fs::read_to_string(&output).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "CNPJ_BASICO;NOME_FANTASIA;SITUACAO_CADASTRAL;DATA_INICIO_ATIVIDADE;CNAE_FISCAL_PRINCIPAL;CNAE_FISCAL_SECUNDARIA;UF;DDD_1;TELEFONE_1;CORREIO_ELETRONICO"
    );
    let matched: Vec<&str> = lines.map(|l| l.split(';').next().unwrap()).collect();
    assert_eq!(matched, ["12345678", "56789012"]);
}

#[test]
fn document_referencing_missing_column_fails_validation_not_streaming() {
    let document = r#"{ "field": "COLUNA_INEXISTENTE", "op": "contains", "value": "x" }"#;
    let expression = FilterSpec::from_json(document).unwrap().compile().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let err = filter_csv_path(
        "tests/fixtures/estabelecimentos.csv",
        &output,
        &expression,
        &RunOptions::default(),
    )
    .unwrap_err();

    assert!(
        matches!(err, FilterError::UnknownColumn { column } if column == "COLUNA_INEXISTENTE")
    );
    // Nothing was written: the failure happened before streaming.
    assert_eq!(std::fs::read(&output).unwrap(), b"");
}

#[test]
fn malformed_json_is_a_spec_error() {
    let err = FilterSpec::from_json("{ not json").unwrap_err();
    assert!(matches!(err, FilterError::Spec { .. }));
}

#[test]
fn split_on_document_matches_secondary_cnae_lists() {
    let document = r#"{
        "op": "AND",
        "conditions": [
            { "field": "CNAE_FISCAL_SECUNDARIA", "op": "contains", "value": "7990200",
              "split_on": "," },
            { "field": "UF", "op": "contains", "value": "MG" }
        ]
    }"#;
    let expression = FilterSpec::from_json(document).unwrap().compile().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let summary = filter_csv_path(
        "tests/fixtures/estabelecimentos.csv",
        &output,
        &expression,
        &RunOptions::default(),
    )
    .unwrap();

    // Only AGENCIA VIAGENS BH lists 7990200 among its secondary codes.
    assert_eq!(summary.rows_matched, 1);
    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.lines().nth(1).unwrap().starts_with("12345678;"));
}

#[test]
fn date_document_selects_recent_establishments() {
    let document = r#"{
        "op": "AND",
        "conditions": [
            { "field": "DATA_INICIO_ATIVIDADE", "op": "date_ge", "value": "20150101" },
            { "field": "SITUACAO_CADASTRAL", "op": "contains", "value": "02" }
        ]
    }"#;
    let expression = FilterSpec::from_json(document).unwrap().compile().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let summary = filter_csv_path(
        "tests/fixtures/estabelecimentos.csv",
        &output,
        &expression,
        &RunOptions::default(),
    )
    .unwrap();

    // 20150310 (12345678), 20190722 (23456789), 20200205 (56789012).
    assert_eq!(summary.rows_matched, 3);
}
