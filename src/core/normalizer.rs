use crate::core::dates::{parse_date, parse_time};
use crate::domain::model::{
    Category, Incident, IncidentStatus, IncidentType, Inspection, InspectionStatus, InspectionType, RawRow,
    RiskAssessment, RiskStatus, Severity, TargetRecord, TrainingRecord, TrainingStatus, TrainingType,
};
use chrono::NaiveDate;
use serde_json::Value;

/// Returns the first alias whose cell holds a non-empty value.
pub fn resolve<'a>(row: &'a RawRow, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|alias| row.get(alias))
        .find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
}

/// Text form of a cell. Whole numbers drop the trailing `.0`.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn text(row: &RawRow, aliases: &[&str], default: &str) -> String {
    resolve(row, aliases)
        .map(value_to_string)
        .unwrap_or_else(|| default.to_string())
}

fn lowered(row: &RawRow, aliases: &[&str]) -> String {
    text(row, aliases, "").to_lowercase()
}

/// Reads a small integer the way a lenient spreadsheet user expects:
/// leading digits of a string count ("4 - Likely" is 4). A missing cell
/// gives `default`; a present but unreadable one gives 0.
pub fn integer(row: &RawRow, aliases: &[&str], default: i64) -> i64 {
    match resolve(row, aliases) {
        None => default,
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)).unwrap_or(0),
        Some(value) => {
            let s = value_to_string(value);
            let s = s.trim();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let leading: String = digits.chars().take_while(char::is_ascii_digit).collect();
            leading.parse::<i64>().map(|n| sign * n).unwrap_or(0)
        }
    }
}

/// Keeps only the digits of the cell ("85%" is 85, "7/10" is 710).
pub fn digits_only(row: &RawRow, aliases: &[&str]) -> i64 {
    let digits: String = text(row, aliases, "").chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// First rule whose keyword occurs in `haystack` wins.
fn classify<T: Copy>(haystack: &str, rules: &[(&[&str], T)], default: T) -> T {
    rules
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(_, value)| *value)
        .unwrap_or(default)
}

const INCIDENT_TYPE_RULES: &[(&[&str], IncidentType)] = &[
    (&["injury", "fall", "death", "fatality"], IncidentType::Injury),
    (&["collision", "vehicle", "near"], IncidentType::NearMiss),
    (&["spill", "leak", "overflow", "environment", "pipeline"], IncidentType::Environmental),
    (&["electrical", "fire", "explosion", "hazard", "unsafe"], IncidentType::Hazard),
];

const INCIDENT_STATUS_RULES: &[(&[&str], IncidentStatus)] = &[
    (&["closed", "complete"], IncidentStatus::Closed),
    (&["resolv"], IncidentStatus::Resolved),
    (&["invest"], IncidentStatus::Investigating),
];

const INSPECTION_TYPE_RULES: &[(&[&str], InspectionType)] = &[
    (&["audit"], InspectionType::Audit),
    (&["emergency"], InspectionType::Emergency),
    (&["planned"], InspectionType::Planned),
];

const INSPECTION_STATUS_RULES: &[(&[&str], InspectionStatus)] = &[
    (&["closed", "complete"], InspectionStatus::Completed),
    (&["progress"], InspectionStatus::InProgress),
    (&["open", "schedule"], InspectionStatus::Scheduled),
];

const TRAINING_TYPE_RULES: &[(&[&str], TrainingType)] = &[
    (&["environment"], TrainingType::Environmental),
    (&["security"], TrainingType::Security),
    (&["health"], TrainingType::Health),
];

pub fn incident_type(row: &RawRow) -> IncidentType {
    classify(
        &lowered(row, &["Type", "type", "IncidentType"]),
        INCIDENT_TYPE_RULES,
        IncidentType::NearMiss,
    )
}

/// Severity from the explicit column, escalated by what the impact column describes.
/// A fatal or explosive impact is critical even when the sheet says "low".
pub fn severity(row: &RawRow) -> Severity {
    let severity = lowered(row, &["Severity", "severity", "Priority"]);
    let impact = lowered(row, &["Impact", "impact"]);
    let any = |text: &str, keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    if any(&severity, &["critical", "high"])
        || any(&impact, &["death", "fatal", "explosion", "injury requiring hospital"])
    {
        return Severity::Critical;
    }
    if any(&severity, &["medium", "moderate"])
        || any(&impact, &["spill", "contamination", "environmental", "damage", "loss"])
    {
        return Severity::Medium;
    }
    if any(&severity, &["low", "minor"]) || any(&impact, &["scratch", "minor"]) {
        return Severity::Low;
    }
    Severity::Medium
}

pub fn incident_status(row: &RawRow) -> IncidentStatus {
    classify(&lowered(row, &["Status", "status"]), INCIDENT_STATUS_RULES, IncidentStatus::Open)
}

pub fn inspection_type(row: &RawRow) -> InspectionType {
    classify(
        &lowered(row, &["Type", "type", "InspectionType"]),
        INSPECTION_TYPE_RULES,
        InspectionType::Routine,
    )
}

pub fn inspection_status(row: &RawRow) -> InspectionStatus {
    classify(
        lowered(row, &["Status", "status"]).trim(),
        INSPECTION_STATUS_RULES,
        InspectionStatus::Scheduled,
    )
}

pub fn training_type(row: &RawRow) -> TrainingType {
    classify(
        &lowered(row, &["Type", "type", "Category"]),
        TRAINING_TYPE_RULES,
        TrainingType::Safety,
    )
}

fn date(row: &RawRow, aliases: &[&str]) -> Option<NaiveDate> {
    resolve(row, aliases).and_then(parse_date)
}

fn time(row: &RawRow) -> String {
    resolve(row, &["Time", "time"]).map(parse_time).unwrap_or_default()
}

/// Turns raw rows into target records owned by one operator.
///
/// `today` stands in for missing mandatory dates.
#[derive(Debug, Clone)]
pub struct Normalizer {
    owner: String,
    today: NaiveDate,
}

impl Normalizer {
    pub fn new(owner: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            owner: owner.into(),
            today,
        }
    }

    pub fn normalize(&self, category: Category, row: &RawRow) -> TargetRecord {
        match category {
            Category::Incidents => TargetRecord::Incident(self.incident(row)),
            Category::Inspections => TargetRecord::Inspection(self.inspection(row)),
            Category::RiskAssessments => TargetRecord::RiskAssessment(self.risk_assessment(row)),
            Category::TrainingRecords => TargetRecord::Training(self.training_record(row)),
        }
    }

    pub fn incident(&self, row: &RawRow) -> Incident {
        let description = text(row, &["Description", "description", "Details"], "");
        let title = resolve(row, &["Title", "title", "Type", "type"])
            .map(value_to_string)
            .or_else(|| {
                resolve(row, &["Description"]).map(|d| value_to_string(d).chars().take(100).collect())
            })
            .unwrap_or_else(|| "Imported Incident".to_string());

        Incident {
            user_id: self.owner.clone(),
            ref_no: text(row, &["Ref No", "RefNo", "ref_no", "ReferenceNo"], ""),
            incident_type: incident_type(row),
            severity: severity(row),
            title,
            description,
            location: text(row, &["Location", "location", "Site"], "Unknown"),
            incident_date: date(row, &["Date", "date", "IncidentDate"]).unwrap_or(self.today),
            time: time(row),
            status: incident_status(row),
            reporter: text(row, &["Reporter", "reporter", "Reported By", "ReportedBy"], ""),
            root_cause: text(row, &["Root Cause", "RootCause", "root_cause", "Cause"], ""),
            impact: text(row, &["Impact", "impact", "Effect"], ""),
            corrective_actions: text(
                row,
                &["Action Taken", "ActionTaken", "CorrectiveActions", "Actions"],
                "",
            ),
            recommendations: text(row, &["Recommendations", "recommendations", "Recommendation"], ""),
        }
    }

    pub fn inspection(&self, row: &RawRow) -> Inspection {
        Inspection {
            user_id: self.owner.clone(),
            inspection_type: inspection_type(row),
            title: text(row, &["Issue", "Title", "title", "InspectionName"], "Imported Inspection"),
            location: text(row, &["Location", "location", "Area"], ""),
            inspection_date: date(row, &["Date", "date", "InspectionDate", "Target Date"]).unwrap_or(self.today),
            score: digits_only(row, &["Score", "score", "Rating"]),
            status: inspection_status(row),
            findings: text(row, &["Findings", "findings", "Observations", "Comments", "Issue"], ""),
            time: time(row),
            reported_by: text(row, &["Reported by", "Reporter", "Inspector"], ""),
            location_id: text(row, &["Loc ID", "LocationID", "LocID"], ""),
            issue: text(row, &["Issue", "Description"], ""),
            reporting_type: text(row, &["Types of Reporting", "Type"], "Nearmiss"),
            action_taken: text(row, &["Action Taken", "Actions"], ""),
            recommendation: text(row, &["Recommendation", "Recommendations"], ""),
            responsible_staff: text(row, &["Responsible Staff", "Responsible"], ""),
            target_date: date(row, &["Target Date", "TargetDate"]),
            inspector: text(row, &["Inspector", "Reported by"], ""),
        }
    }

    /// Imported assessments are stored as approved and without a risk level.
    pub fn risk_assessment(&self, row: &RawRow) -> RiskAssessment {
        RiskAssessment {
            user_id: self.owner.clone(),
            title: text(row, &["Title", "title", "RiskTitle"], "Imported Risk Assessment"),
            activity: text(row, &["Activity", "activity", "Task", "Process"], ""),
            hazard_identified: text(row, &["Hazard", "hazard", "Risk", "Threat"], ""),
            likelihood: integer(row, &["Likelihood", "likelihood", "Probability"], 3),
            consequence: integer(row, &["Consequence", "consequence", "Severity", "Impact"], 3),
            control_measures: text(row, &["Controls", "controls", "Mitigation", "Measures"], ""),
            status: RiskStatus::Approved,
        }
    }

    pub fn training_record(&self, row: &RawRow) -> TrainingRecord {
        TrainingRecord {
            user_id: self.owner.clone(),
            training_name: text(row, &["TrainingName", "training", "Course", "Title"], "Imported Training"),
            training_type: training_type(row),
            completion_date: date(row, &["CompletionDate", "completion", "Date"]).unwrap_or(self.today),
            expiry_date: date(row, &["ExpiryDate", "expiry"]),
            certificate_number: text(row, &["CertificateNumber", "certificate", "CertNo"], ""),
            status: TrainingStatus::Valid,
        }
    }
}
