use crate::core::RecordStore;
use crate::domain::model::{Operator, Record, SelectQuery, Table};
use crate::utils::error::{HsseError, Result};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The record lists shown to users. Near misses, audits and plain
/// inspections are all views over the inspections table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordView {
    Incidents,
    NearMiss,
    Audits,
    Inspections,
    RiskAssessments,
    TrainingRecords,
}

impl RecordView {
    pub const ALL: [RecordView; 6] = [
        RecordView::Incidents,
        RecordView::NearMiss,
        RecordView::Audits,
        RecordView::Inspections,
        RecordView::RiskAssessments,
        RecordView::TrainingRecords,
    ];

    pub fn table(&self) -> Table {
        match self {
            RecordView::Incidents => Table::Incidents,
            RecordView::NearMiss | RecordView::Audits | RecordView::Inspections => Table::Inspections,
            RecordView::RiskAssessments => Table::RiskAssessments,
            RecordView::TrainingRecords => Table::TrainingRecords,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordView::Incidents => "incidents",
            RecordView::NearMiss => "near_miss",
            RecordView::Audits => "audits",
            RecordView::Inspections => "inspections",
            RecordView::RiskAssessments => "risk_assessments",
            RecordView::TrainingRecords => "training_records",
        }
    }

    /// Statuses a user may set on records in this view.
    pub fn status_options(&self) -> &'static [&'static str] {
        match self {
            RecordView::Incidents => &["open", "investigating", "resolved", "closed"],
            RecordView::NearMiss | RecordView::Audits | RecordView::Inspections => &["open", "in_progress", "closed"],
            RecordView::RiskAssessments => &["draft", "under_review", "approved"],
            RecordView::TrainingRecords => &["valid", "expiring_soon", "expired"],
        }
    }

    fn includes(&self, record: &Record) -> bool {
        let lower = |field: &str| record.str_field(field).map(str::to_lowercase);
        let near_miss = lower("reporting_type").as_deref() == Some("nearmiss");
        let audit = lower("inspection_type").as_deref() == Some("audit");
        match self {
            RecordView::Incidents => record.str_field("incident_type") != Some("near_miss"),
            RecordView::NearMiss => near_miss,
            RecordView::Audits => audit,
            RecordView::Inspections => !near_miss && !audit,
            RecordView::RiskAssessments | RecordView::TrainingRecords => true,
        }
    }
}

impl FromStr for RecordView {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RecordView::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| {
                format!(
                    "unknown record view '{}' (expected one of: {})",
                    s,
                    RecordView::ALL.map(|v| v.as_str()).join(", ")
                )
            })
    }
}

impl fmt::Display for RecordView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub incidents: Vec<Record>,
    pub inspections: Vec<Record>,
    pub risk_assessments: Vec<Record>,
    pub training_records: Vec<Record>,
}

impl RecordSet {
    fn table_rows(&self, table: Table) -> &[Record] {
        match table {
            Table::Incidents => &self.incidents,
            Table::Inspections => &self.inspections,
            Table::RiskAssessments => &self.risk_assessments,
            Table::TrainingRecords => &self.training_records,
            Table::UsersProfile => &[],
        }
    }

    pub fn view(&self, view: RecordView) -> Vec<&Record> {
        self.table_rows(view.table())
            .iter()
            .filter(|r| view.includes(r))
            .collect()
    }

    pub fn counts(&self) -> Vec<(RecordView, usize)> {
        RecordView::ALL.iter().map(|v| (*v, self.view(*v).len())).collect()
    }

    /// Locations and location ids present in a view, sorted.
    pub fn locations(&self, view: RecordView) -> Vec<String> {
        self.view(view)
            .into_iter()
            .flat_map(|r| [r.str_field("location"), r.str_field("location_id")])
            .flatten()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Narrowing applied on top of a view. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub search: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub severity: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl RecordFilter {
    fn record_date(record: &Record) -> Option<NaiveDate> {
        ["inspection_date", "incident_date", "completion_date"]
            .iter()
            .find_map(|field| record.str_field(field))
            .and_then(crate::core::dates::parse_date_str)
    }

    pub fn matches(&self, record: &Record) -> bool {
        if let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) {
            let haystack = serde_json::Value::Object(record.data.clone()).to_string().to_lowercase();
            if !haystack.contains(&term.to_lowercase()) {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if record.str_field("status") != Some(status.as_str()) {
                return false;
            }
        }
        if let Some(location) = &self.location {
            let loc = Some(location.as_str());
            if record.str_field("location") != loc && record.str_field("location_id") != loc {
                return false;
            }
        }
        if let Some(severity) = &self.severity {
            if record.str_field("severity") != Some(severity.as_str()) {
                return false;
            }
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(date) = Self::record_date(record) else {
                return false;
            };
            if self.date_from.is_some_and(|from| date < from) || self.date_to.is_some_and(|to| date > to) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, records: Vec<&'a Record>) -> Vec<&'a Record> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Loads the four record tables concurrently, newest first.
pub async fn load_all<R: RecordStore + ?Sized>(store: &R) -> Result<RecordSet> {
    let query = SelectQuery::all().order_by("created_at", false);
    let (incidents, inspections, risk_assessments, training_records) = tokio::try_join!(
        store.select(Table::Incidents, &query),
        store.select(Table::Inspections, &query),
        store.select(Table::RiskAssessments, &query),
        store.select(Table::TrainingRecords, &query),
    )
    .inspect_err(|e| tracing::error!("Error loading records: {}", e))?;

    Ok(RecordSet {
        incidents,
        inspections,
        risk_assessments,
        training_records,
    })
}

pub async fn update_status<R: RecordStore + ?Sized>(store: &R, view: RecordView, id: &str, status: &str) -> Result<()> {
    if !view.status_options().contains(&status) {
        return Err(HsseError::InvalidConfigValueError {
            field: "status".to_string(),
            value: status.to_string(),
            reason: format!("Allowed for {}: {}", view, view.status_options().join(", ")),
        });
    }
    store
        .update(view.table(), id, serde_json::json!({ "status": status }))
        .await?;
    tracing::info!("Updated {} record {} to {}", view, id, status);
    Ok(())
}

/// Deletes records by id. Only administrators may do this.
pub async fn bulk_delete<R: RecordStore + ?Sized>(
    store: &R,
    operator: &Operator,
    view: RecordView,
    ids: &[String],
) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    crate::core::users::require_admin(store, operator).await?;
    store.delete(view.table(), ids).await?;
    tracing::info!("Deleted {} {} records", ids.len(), view);
    Ok(ids.len())
}
