use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// 工作表中的一列，欄位名稱 -> 原始儲存格值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub cells: HashMap<String, serde_json::Value>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<serde_json::Value>) -> Self {
        self.cells.insert(column.to_string(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.cells.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

/// A row as the data store returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(|v| v.as_str())
    }

    /// Score and band of a stored risk assessment row.
    pub fn risk(&self) -> Option<(i64, RiskBand)> {
        let likelihood = self.data.get("likelihood")?.as_i64()?;
        let consequence = self.data.get("consequence")?.as_i64()?;
        let score = risk_score(likelihood, consequence);
        Some((score, RiskBand::from_score(score)))
    }

    pub fn id(&self) -> Option<String> {
        match self.data.get("id")? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(data: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Incidents,
    Inspections,
    RiskAssessments,
    TrainingRecords,
    UsersProfile,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Incidents => "incidents",
            Table::Inspections => "inspections",
            Table::RiskAssessments => "risk_assessments",
            Table::TrainingRecords => "training_records",
            Table::UsersProfile => "users_profile",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record category a whole sheet is imported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Incidents,
    Inspections,
    RiskAssessments,
    TrainingRecords,
}

impl Category {
    pub fn table(&self) -> Table {
        match self {
            Category::Incidents => Table::Incidents,
            Category::Inspections => Table::Inspections,
            Category::RiskAssessments => Table::RiskAssessments,
            Category::TrainingRecords => Table::TrainingRecords,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Incidents => "incidents",
            Category::Inspections => "inspections",
            Category::RiskAssessments => "risk assessments",
            Category::TrainingRecords => "training records",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown record category '{0}' (expected incidents, inspections, risk_assessments or training)")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "incidents" | "incident" => Ok(Category::Incidents),
            "inspections" | "inspection" | "near_miss" | "audits" => Ok(Category::Inspections),
            "risk_assessments" | "risk" => Ok(Category::RiskAssessments),
            "training" | "training_records" => Ok(Category::TrainingRecords),
            other => Err(ParseCategoryError(other.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The logged-in user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Injury,
    NearMiss,
    Environmental,
    Hazard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Investigating,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionType {
    Routine,
    Planned,
    Emergency,
    Audit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    Scheduled,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    Draft,
    UnderReview,
    Approved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingType {
    Safety,
    Environmental,
    Security,
    Health,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    Valid,
    ExpiringSoon,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub user_id: String,
    pub ref_no: String,
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub location: String,
    pub incident_date: NaiveDate,
    pub time: String,
    pub status: IncidentStatus,
    pub reporter: String,
    pub root_cause: String,
    pub impact: String,
    pub corrective_actions: String,
    pub recommendations: String,
}

/// Inspections, near misses and audits share one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub user_id: String,
    pub inspection_type: InspectionType,
    pub title: String,
    pub location: String,
    pub inspection_date: NaiveDate,
    pub score: i64,
    pub status: InspectionStatus,
    pub findings: String,
    pub time: String,
    pub reported_by: String,
    pub location_id: String,
    pub issue: String,
    pub reporting_type: String,
    pub action_taken: String,
    pub recommendation: String,
    pub responsible_staff: String,
    pub target_date: Option<NaiveDate>,
    pub inspector: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub user_id: String,
    pub title: String,
    pub activity: String,
    pub hazard_identified: String,
    pub likelihood: i64,
    pub consequence: i64,
    pub control_measures: String,
    pub status: RiskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskBand {
    /// Band for a likelihood x consequence score.
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s >= 15 => RiskBand::Critical,
            s if s >= 10 => RiskBand::High,
            s if s >= 5 => RiskBand::Medium,
            _ => RiskBand::Low,
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskBand::Low => "low",
            RiskBand::Medium => "medium",
            RiskBand::High => "high",
            RiskBand::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// Imported factors are unbounded integers, so the product saturates.
pub fn risk_score(likelihood: i64, consequence: i64) -> i64 {
    likelihood.saturating_mul(consequence)
}

impl RiskAssessment {
    pub fn risk_score(&self) -> i64 {
        risk_score(self.likelihood, self.consequence)
    }

    /// Display band for the likelihood x consequence score. Never stored.
    pub fn band(&self) -> RiskBand {
        RiskBand::from_score(self.risk_score())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub user_id: String,
    pub training_name: String,
    pub training_type: TrainingType,
    pub completion_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub certificate_number: String,
    pub status: TrainingStatus,
}

/// One normalized row, ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetRecord {
    Incident(Incident),
    Inspection(Inspection),
    RiskAssessment(RiskAssessment),
    Training(TrainingRecord),
}

impl TargetRecord {
    pub fn table(&self) -> Table {
        match self {
            TargetRecord::Incident(_) => Table::Incidents,
            TargetRecord::Inspection(_) => Table::Inspections,
            TargetRecord::RiskAssessment(_) => Table::RiskAssessments,
            TargetRecord::Training(_) => Table::TrainingRecords,
        }
    }

    pub fn owner(&self) -> &str {
        match self {
            TargetRecord::Incident(r) => &r.user_id,
            TargetRecord::Inspection(r) => &r.user_id,
            TargetRecord::RiskAssessment(r) => &r.user_id,
            TargetRecord::Training(r) => &r.user_id,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            TargetRecord::Incident(r) => serde_json::to_value(r),
            TargetRecord::Inspection(r) => serde_json::to_value(r),
            TargetRecord::RiskAssessment(r) => serde_json::to_value(r),
            TargetRecord::Training(r) => serde_json::to_value(r),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn toggled(self) -> Self {
        match self {
            Role::Admin => Role::User,
            Role::User => Role::Admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn default_role() -> Role {
    Role::User
}

fn default_active() -> bool {
    true
}

/// Row filter in the data API's `column=op.value` form.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    In(String, Vec<String>),
    Gte(String, String),
    Lte(String, String),
    /// Case-insensitive equality.
    ILike(String, String),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::In(c, _) | Filter::Gte(c, _) | Filter::Lte(c, _) | Filter::ILike(c, _) => c,
        }
    }

    pub fn to_query_value(&self) -> String {
        match self {
            Filter::Eq(_, v) => format!("eq.{}", v),
            Filter::In(_, vs) => format!("in.({})", vs.join(",")),
            Filter::Gte(_, v) => format!("gte.{}", v),
            Filter::Lte(_, v) => format!("lte.{}", v),
            Filter::ILike(_, v) => format!("ilike.{}", v),
        }
    }

    /// Evaluates the filter against an already-fetched record. Values compare as text,
    /// which orders ISO dates correctly.
    pub fn matches(&self, record: &Record) -> bool {
        let actual = match record.data.get(self.column()) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => return false,
            Some(other) => other.to_string(),
        };
        match self {
            Filter::Eq(_, v) => &actual == v,
            Filter::In(_, vs) => vs.iter().any(|v| v == &actual),
            Filter::Gte(_, v) => actual.as_str() >= v.as_str(),
            Filter::Lte(_, v) => actual.as_str() <= v.as_str(),
            Filter::ILike(_, v) => actual.eq_ignore_ascii_case(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Default for SelectQuery {
    fn default() -> Self {
        Self {
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
        }
    }
}

impl SelectQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }
}
