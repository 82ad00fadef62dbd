mod common;

use chrono::NaiveDate;
use common::{operator, FixedSession, MemoryStorage, MemoryStore};
use hsse_etl::core::importer::ImportEngine;
use hsse_etl::core::{Category, RawRow, Table};
use hsse_etl::domain::model::{Sheet, Workbook};
use hsse_etl::utils::error::HsseError;
use serde_json::json;
use std::sync::atomic::Ordering;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn sheet(name: &str, headers: &[&str], rows: Vec<RawRow>) -> Sheet {
    Sheet {
        name: name.to_string(),
        headers: headers.iter().map(|h| h.to_string()).collect(),
        rows,
    }
}

fn incident_rows(count: usize) -> Vec<RawRow> {
    (1..=count)
        .map(|i| {
            let title = if i % 5 == 0 { "REJECT".to_string() } else { format!("Slip {}", i) };
            RawRow::new()
                .with("Title", title)
                .with("Date", 45306)
                .with("Severity", "Minor")
                .with("Location", "Betio depot")
        })
        .collect()
}

#[tokio::test]
async fn test_partial_failures_are_counted_and_listed() {
    let store = MemoryStore::rejecting(|_, row| row["title"] == "REJECT");
    let workbook = Workbook {
        sheets: vec![
            sheet("Incidents", &["Title", "Date", "Severity", "Location"], incident_rows(10)),
            sheet("Notes", &["Comment"], vec![]),
        ],
    };

    let engine = ImportEngine::new(store.clone()).with_today(today());
    let summary = engine.run(&workbook, &operator("op-1"), None).await;

    assert_eq!(summary.incidents, 8);
    assert_eq!(summary.total(), 8);
    assert_eq!(summary.message(), "Successfully imported 8 records");
    assert_eq!(summary.detail_lines(), vec!["Incidents: 8"]);

    assert_eq!(summary.failures.len(), 2);
    assert_eq!(summary.failures[0].sheet, "Incidents");
    assert_eq!(summary.failures[0].row, 5);
    assert_eq!(summary.failures[1].row, 10);
    assert_eq!(summary.failures[0].category, Category::Incidents);
    assert!(summary.failures[0].message.contains("violates check constraint"));

    assert_eq!(summary.skipped_sheets.len(), 1);
    assert_eq!(summary.skipped_sheets[0].sheet, "Notes");

    let stored = store.rows(Table::Incidents).await;
    assert_eq!(stored.len(), 8);
    let first = &stored[0];
    assert_eq!(first.str_field("incident_date"), Some("2024-01-15"));
    assert_eq!(first.str_field("severity"), Some("low"));
    assert_eq!(first.str_field("status"), Some("open"));
}

#[tokio::test]
async fn test_every_record_belongs_to_the_operator() {
    let store = MemoryStore::new();
    let workbook = Workbook {
        sheets: vec![
            sheet("Incidents", &["Title"], vec![RawRow::new().with("Title", "Burn")]),
            sheet(
                "Near Miss",
                &["MM no.", "Issue"],
                vec![RawRow::new().with("MM no.", 1).with("Issue", "Loose rail")],
            ),
            sheet("Risk", &["Title"], vec![RawRow::new().with("Title", "Hot work")]),
            sheet("Training", &["TrainingName"], vec![RawRow::new().with("TrainingName", "First Aid")]),
        ],
    };

    let engine = ImportEngine::new(store.clone()).with_today(today());
    let summary = engine.run(&workbook, &operator("op-42"), None).await;

    assert_eq!(summary.total(), 4);
    assert_eq!(summary.count(Category::Inspections), 1);
    for table in [Table::Incidents, Table::Inspections, Table::RiskAssessments, Table::TrainingRecords] {
        let rows = store.rows(table).await;
        assert_eq!(rows.len(), 1, "{}", table);
        assert_eq!(rows[0].str_field("user_id"), Some("op-42"));
    }

    let risk = &store.rows(Table::RiskAssessments).await[0];
    assert_eq!(risk.data["likelihood"], json!(3));
    assert_eq!(risk.data["consequence"], json!(3));
    assert_eq!(risk.str_field("status"), Some("approved"));

    let training = &store.rows(Table::TrainingRecords).await[0];
    assert_eq!(training.str_field("completion_date"), Some("2024-06-01"));
    assert_eq!(training.data["expiry_date"], json!(null));
}

#[tokio::test]
async fn test_override_category_bypasses_detection() {
    let store = MemoryStore::new();
    let workbook = Workbook {
        sheets: vec![
            sheet("Sheet1", &["Foo"], vec![RawRow::new().with("Foo", "x")]),
            sheet("Near Miss", &["MM no."], vec![RawRow::new().with("MM no.", 7)]),
        ],
    };

    let engine = ImportEngine::new(store.clone()).with_today(today());
    let summary = engine
        .run(&workbook, &operator("op-1"), Some(Category::TrainingRecords))
        .await;

    assert_eq!(summary.training_records, 2);
    assert_eq!(summary.inspections, 0);
    assert!(summary.skipped_sheets.is_empty());
    assert!(store.rows(Table::Inspections).await.is_empty());
}

#[tokio::test]
async fn test_unrecognized_sheet_is_skipped_without_inserts() {
    let store = MemoryStore::new();
    let workbook = Workbook {
        sheets: vec![sheet("Sheet1", &["Foo", "Bar"], vec![RawRow::new().with("Foo", 1)])],
    };

    let summary = ImportEngine::new(store.clone())
        .run(&workbook, &operator("op-1"), None)
        .await;

    assert_eq!(summary.total(), 0);
    assert_eq!(summary.skipped_sheets.len(), 1);
    assert!(store.rows(Table::Incidents).await.is_empty());
}

#[tokio::test]
async fn test_dry_run_inserts_nothing() {
    let store = MemoryStore::new();
    let workbook = Workbook {
        sheets: vec![sheet("Incidents", &["Title"], incident_rows(3))],
    };

    let summary = ImportEngine::new(store.clone())
        .with_dry_run(true)
        .with_today(today())
        .run(&workbook, &operator("op-1"), None)
        .await;

    assert!(summary.dry_run);
    assert_eq!(summary.incidents, 3);
    assert_eq!(summary.message(), "Dry run: 3 records would be imported");
    assert!(store.rows(Table::Incidents).await.is_empty());
}

#[tokio::test]
async fn test_run_file_reads_an_xlsx_workbook() {
    let mut xlsx = rust_xlsxwriter::Workbook::new();
    let near_miss = xlsx.add_worksheet();
    near_miss.set_name("Register 2024").unwrap();
    for (col, header) in ["MM no.", "Date", "Issue", "Loc ID", "Reported by", "Status"].iter().enumerate() {
        near_miss.write_string(0, col as u16, *header).unwrap();
    }
    near_miss.write_number(1, 0, 1).unwrap();
    near_miss.write_number(1, 1, 45306).unwrap();
    near_miss.write_string(1, 2, "Missing guard on pump").unwrap();
    near_miss.write_number(1, 3, 204).unwrap();
    near_miss.write_string(1, 4, "Teaeki").unwrap();
    near_miss.write_string(1, 5, "Closed").unwrap();

    let training = xlsx.add_worksheet();
    training.set_name("Training").unwrap();
    training.write_string(0, 0, "TrainingName").unwrap();
    training.write_string(0, 1, "ExpiryDate").unwrap();
    training.write_string(1, 0, "Fire Warden").unwrap();
    training.write_string(1, 1, "2025-03-31").unwrap();

    let bytes = xlsx.save_to_buffer().unwrap();
    let storage = MemoryStorage::with_file("upload.xlsx", bytes);
    let store = MemoryStore::new();

    let summary = ImportEngine::new(store.clone())
        .with_today(today())
        .run_file(&storage, &FixedSession::logged_in("op-7"), "upload.xlsx", None)
        .await
        .unwrap();

    assert_eq!(summary.inspections, 1);
    assert_eq!(summary.training_records, 1);

    let inspection = &store.rows(Table::Inspections).await[0];
    assert_eq!(inspection.str_field("inspection_date"), Some("2024-01-15"));
    assert_eq!(inspection.str_field("location_id"), Some("204"));
    assert_eq!(inspection.str_field("reported_by"), Some("Teaeki"));
    assert_eq!(inspection.str_field("reporting_type"), Some("Nearmiss"));
    assert_eq!(inspection.str_field("status"), Some("completed"));
    assert_eq!(inspection.str_field("user_id"), Some("op-7"));

    let training = &store.rows(Table::TrainingRecords).await[0];
    assert_eq!(training.str_field("expiry_date"), Some("2025-03-31"));
}

#[tokio::test]
async fn test_invalid_session_aborts_before_reading() {
    let storage = MemoryStorage::with_file("Incidents.csv", b"Title\nSlip\n".to_vec());
    let store = MemoryStore::new();

    let result = ImportEngine::new(store.clone())
        .run_file(&storage, &FixedSession::logged_out(), "Incidents.csv", None)
        .await;

    assert!(matches!(result, Err(HsseError::SessionError { .. })));
    assert_eq!(storage.reads.load(Ordering::SeqCst), 0);
    assert!(store.rows(Table::Incidents).await.is_empty());
}

#[tokio::test]
async fn test_unreadable_file_aborts_with_no_counts() {
    let storage = MemoryStorage::with_file("Incidents.xlsx", b"not a workbook".to_vec());
    let session = FixedSession::logged_in("op-1");
    let engine = ImportEngine::new(MemoryStore::new());

    let result = engine.run_file(&storage, &session, "Incidents.xlsx", None).await;
    assert!(matches!(result, Err(HsseError::WorkbookError(_))));

    let missing = engine.run_file(&storage, &session, "Other.xlsx", None).await;
    assert!(matches!(missing, Err(HsseError::IoError(_))));

    let unsupported = engine.run_file(&storage, &session, "notes.txt", None).await;
    assert!(matches!(unsupported, Err(HsseError::InvalidConfigValueError { .. })));
}

#[tokio::test]
async fn test_csv_upload_is_a_single_sheet_named_after_the_file() {
    let csv = "Title,Date,Type\nForklift collision,01/15/2024,Vehicle\n";
    let storage = MemoryStorage::with_file("Incidents.csv", csv.as_bytes().to_vec());
    let store = MemoryStore::new();

    let summary = ImportEngine::new(store.clone())
        .run_file(&storage, &FixedSession::logged_in("op-1"), "Incidents.csv", None)
        .await
        .unwrap();

    assert_eq!(summary.incidents, 1);
    let row = &store.rows(Table::Incidents).await[0];
    assert_eq!(row.str_field("incident_date"), Some("2024-01-15"));
    assert_eq!(row.str_field("incident_type"), Some("near_miss"));
}
