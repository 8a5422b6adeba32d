use std::sync::Arc;

use copyflow_common::Scenario;
use copyflow_workflow::export::{export, export_to_dir, COLUMNS};
use copyflow_workflow::testing::{fail_json, pass_json, ScriptedService, StaticCatalog};
use copyflow_workflow::{StageKind, WorkflowOrchestrator, WorkflowSettings};

async fn two_records() -> Vec<copyflow_common::ResultRecord> {
    let service = Arc::new(
        ScriptedService::new()
            .always(StageKind::ScenarioValidator, pass_json("fine\nreally"))
            .on(StageKind::ContentGenerator, "first line\nsecond\tline\r\n")
            .on(StageKind::ContentValidator, pass_json(""))
            .always(
                StageKind::ProductRecommender,
                r#"{"goods": {"k3_code": "A1", "name": "Ginger\nTea", "price": 29.9}, "reason": "warm\tup"}"#,
            )
            .on(StageKind::ContentRewriter, "rewritten\n\ncopy")
            .always(StageKind::ContentGenerator, "other draft")
            .always(StageKind::ContentValidator, fail_json("too\nshort")),
    );
    let settings = WorkflowSettings::builder()
        .persona("multi\nline persona")
        .max_retries(1)
        .build();
    let orch = WorkflowOrchestrator::new(service, Arc::new(StaticCatalog::default()), settings);
    orch.process_scenarios(
        "topic\twith tab",
        vec![Scenario::new("scene one"), Scenario::new("scene\ntwo")],
    )
    .await;
    orch.collector().records()
}

#[tokio::test]
async fn export_has_header_plus_one_row_per_record() {
    let records = two_records().await;
    assert_eq!(records.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("content.tsv");
    let written = export(&records, &path).unwrap().unwrap();
    assert_eq!(written, path);

    let body = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], COLUMNS.join("\t"));

    for line in &lines[1..] {
        let cells: Vec<&str> = line.split('\t').collect();
        assert_eq!(cells.len(), COLUMNS.len());
        assert!(cells.iter().all(|c| !c.contains('\n') && !c.contains('\r')));
    }
}

#[tokio::test]
async fn rows_split_original_and_rewritten_content() {
    let records = two_records().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("content.tsv");
    export(&records, &path).unwrap();

    let body = std::fs::read_to_string(&path).unwrap();
    let rows: Vec<Vec<&str>> = body.lines().skip(1).map(|l| l.split('\t').collect()).collect();
    let col = |name: &str| COLUMNS.iter().position(|c| *c == name).unwrap();

    let first = &rows[0];
    assert_eq!(first[col("content")], "first line second line");
    assert_eq!(first[col("rewritten_content")], "rewritten copy");
    assert_eq!(first[col("product_name")], "Ginger Tea");
    assert_eq!(first[col("recommendation_reason")], "warm up");
    assert_eq!(first[col("persona")], "multi line persona");
    assert_eq!(first[col("user_input")], "topic with tab");
    assert_eq!(first[col("scenario_validation_reason")], "fine really");
    assert_eq!(first[col("final_status")], "success");

    let second = &rows[1];
    assert_eq!(second[col("scenario")], "scene two");
    assert_eq!(second[col("content_validation_result")], "false");
    assert_eq!(second[col("content_validation_reason")], "too short");
    assert_eq!(second[col("final_status")], "validation_failed");
    assert_eq!(second[col("rewritten_content")], "");
}

#[test]
fn export_to_dir_uses_timestamped_name() {
    let records = tokio_test::block_on(two_records());
    let dir = tempfile::tempdir().unwrap();

    let path = export_to_dir(&records, dir.path()).unwrap().unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("content_"));
    assert!(name.ends_with(".tsv"));
    assert_eq!(name.len(), "content_20250101_120000.tsv".len());
}
