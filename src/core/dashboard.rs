use crate::core::RecordStore;
use crate::domain::model::{Record, SelectQuery, Table};
use crate::utils::error::Result;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub closed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrainingCounts {
    pub total: usize,
    pub valid: usize,
    pub expiring_soon: usize,
    pub expired: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub near_miss: StatusCounts,
    pub incidents: StatusCounts,
    pub audits: StatusCounts,
    pub training: TrainingCounts,
}

/// Days ahead of today in which an expiring certificate counts as "expiring soon".
pub const EXPIRY_WINDOW_DAYS: i64 = 30;

fn count_statuses<'a>(
    records: impl Iterator<Item = &'a Record>,
    open: &[&str],
    in_progress: &[&str],
    closed: &[&str],
) -> StatusCounts {
    records.fold(StatusCounts::default(), |mut counts, record| {
        counts.total += 1;
        let status = record.str_field("status").unwrap_or_default();
        if open.contains(&status) {
            counts.open += 1;
        } else if in_progress.contains(&status) {
            counts.in_progress += 1;
        } else if closed.contains(&status) {
            counts.closed += 1;
        }
        counts
    })
}

pub fn incident_counts(incidents: &[Record]) -> StatusCounts {
    count_statuses(incidents.iter(), &["open"], &["investigating"], &["closed", "resolved"])
}

fn is_audit(record: &Record) -> bool {
    record
        .str_field("inspection_type")
        .is_some_and(|t| t.eq_ignore_ascii_case("audit"))
}

/// Splits the inspections table into (near miss, audit) counts.
///
/// Imported rows use scheduled/completed while the near-miss form uses
/// open/closed, so both vocabularies are counted.
pub fn inspection_counts(inspections: &[Record]) -> (StatusCounts, StatusCounts) {
    let open = ["open", "scheduled"];
    let in_progress = ["in_progress"];
    let closed = ["closed", "completed"];
    (
        count_statuses(inspections.iter().filter(|r| !is_audit(r)), &open, &in_progress, &closed),
        count_statuses(inspections.iter().filter(|r| is_audit(r)), &open, &in_progress, &closed),
    )
}

pub fn training_counts(training: &[Record], today: NaiveDate) -> TrainingCounts {
    let window_end = today + Duration::days(EXPIRY_WINDOW_DAYS);

    training.iter().fold(TrainingCounts::default(), |mut counts, record| {
        counts.total += 1;
        let status = record.str_field("status").unwrap_or_default();
        let expiry = record
            .str_field("expiry_date")
            .and_then(crate::core::dates::parse_date_str);

        if status == "valid" {
            counts.valid += 1;
        }
        if expiry.is_some_and(|d| d >= today && d <= window_end) {
            counts.expiring_soon += 1;
        }
        if status == "expired" || expiry.is_some_and(|d| d < today) {
            counts.expired += 1;
        }
        counts
    })
}

/// Loads the three dashboard tables concurrently and aggregates them.
pub async fn load_dashboard<R: RecordStore + ?Sized>(store: &R, today: NaiveDate) -> Result<DashboardStats> {
    let query = SelectQuery::all();
    let (incidents, inspections, training) = tokio::try_join!(
        store.select(Table::Incidents, &query),
        store.select(Table::Inspections, &query),
        store.select(Table::TrainingRecords, &query),
    )
    .inspect_err(|e| tracing::error!("Error loading dashboard: {}", e))?;

    let (near_miss, audits) = inspection_counts(&inspections);
    Ok(DashboardStats {
        near_miss,
        incidents: incident_counts(&incidents),
        audits,
        training: training_counts(&training, today),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap_or_default().into()
    }

    #[test]
    fn test_incident_counts_merge_resolved_into_closed() {
        let incidents = vec![
            record(json!({"status": "open"})),
            record(json!({"status": "investigating"})),
            record(json!({"status": "resolved"})),
            record(json!({"status": "closed"})),
            record(json!({"status": "open"})),
        ];
        assert_eq!(
            incident_counts(&incidents),
            StatusCounts {
                total: 5,
                open: 2,
                in_progress: 1,
                closed: 2
            }
        );
    }

    #[test]
    fn test_inspections_split_by_audit_type() {
        let inspections = vec![
            record(json!({"inspection_type": "routine", "status": "scheduled"})),
            record(json!({"inspection_type": "routine", "status": "open"})),
            record(json!({"inspection_type": "audit", "status": "completed"})),
            record(json!({"inspection_type": "Audit", "status": "in_progress"})),
        ];
        let (near_miss, audits) = inspection_counts(&inspections);
        assert_eq!(near_miss.total, 2);
        assert_eq!(near_miss.open, 2);
        assert_eq!(audits.total, 2);
        assert_eq!(audits.closed, 1);
        assert_eq!(audits.in_progress, 1);
    }

    #[test]
    fn test_training_expiry_window() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let training = vec![
            record(json!({"status": "valid", "expiry_date": "2024-06-20"})),
            record(json!({"status": "valid", "expiry_date": "2024-07-01"})),
            record(json!({"status": "valid", "expiry_date": "2024-07-02"})),
            record(json!({"status": "valid", "expiry_date": "2024-05-01"})),
            record(json!({"status": "expired", "expiry_date": null})),
        ];
        let counts = training_counts(&training, today);
        assert_eq!(counts.total, 5);
        assert_eq!(counts.valid, 4);
        assert_eq!(counts.expiring_soon, 2);
        assert_eq!(counts.expired, 2);
    }
}
