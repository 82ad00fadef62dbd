use crate::domain::model::Category;

/// Column headers that only near-miss / inspection registers carry.
pub const INSPECTION_MARKERS: &[&str] = &["MM no.", "Reported by", "Types of Reporting", "Action Taken", "Loc ID"];

/// Keyword groups looked for in sheet names. A name hitting more than one
/// group is classified by rule priority but reported as ambiguous.
const NAME_KEYWORD_GROUPS: &[(&str, Category, &[&str])] = &[
    ("near miss", Category::Inspections, &["near", "miss"]),
    ("incident", Category::Incidents, &["incident"]),
    ("inspection", Category::Inspections, &["inspection", "audit"]),
    ("risk", Category::RiskAssessments, &["risk", "assessment"]),
    ("training", Category::TrainingRecords, &["training"]),
];

struct SheetSignals {
    name: String,
    has_markers: bool,
}

impl SheetSignals {
    fn name_has(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.name.contains(k))
    }
}

struct Rule {
    reason: &'static str,
    category: Category,
    applies: fn(&SheetSignals) -> bool,
}

const RULES: &[Rule] = &[
    Rule {
        reason: "sheet name mentions a near miss",
        category: Category::Inspections,
        applies: |s| s.name_has(&["near", "miss"]),
    },
    Rule {
        reason: "near-miss register columns",
        category: Category::Inspections,
        applies: |s| s.has_markers && !s.name_has(&["training", "risk"]),
    },
    Rule {
        reason: "sheet name mentions incidents",
        category: Category::Incidents,
        applies: |s| s.name_has(&["incident"]),
    },
    Rule {
        reason: "sheet name mentions inspections or audits",
        category: Category::Inspections,
        applies: |s| s.name_has(&["inspection", "audit"]),
    },
    Rule {
        reason: "sheet name mentions risk assessments",
        category: Category::RiskAssessments,
        applies: |s| s.name_has(&["risk", "assessment"]),
    },
    Rule {
        reason: "sheet name mentions training",
        category: Category::TrainingRecords,
        applies: |s| s.name_has(&["training"]),
    },
    Rule {
        reason: "inspection columns detected",
        category: Category::Inspections,
        applies: |s| s.has_markers,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub reason: &'static str,
    /// Other keyword groups the sheet name also matched.
    pub competing: Vec<&'static str>,
}

impl Classification {
    pub fn is_ambiguous(&self) -> bool {
        !self.competing.is_empty()
    }
}

pub fn has_inspection_markers<S: AsRef<str>>(headers: &[S]) -> bool {
    headers
        .iter()
        .any(|h| INSPECTION_MARKERS.contains(&h.as_ref()))
}

/// Keyword groups present in a sheet name that point at another category
/// than `chosen`, in priority order.
pub fn competing_groups(sheet_name: &str, chosen: Category) -> Vec<&'static str> {
    let lower = sheet_name.to_lowercase();
    NAME_KEYWORD_GROUPS
        .iter()
        .filter(|(_, category, keywords)| *category != chosen && keywords.iter().any(|k| lower.contains(k)))
        .map(|(group, _, _)| *group)
        .collect()
}

/// Decides which category a sheet holds. `None` means the sheet is skipped.
pub fn detect<S: AsRef<str>>(sheet_name: &str, headers: &[S], override_category: Option<Category>) -> Option<Classification> {
    if let Some(category) = override_category {
        return Some(Classification {
            category,
            reason: "category chosen by operator",
            competing: Vec::new(),
        });
    }

    let signals = SheetSignals {
        name: sheet_name.to_lowercase(),
        has_markers: has_inspection_markers(headers),
    };

    let rule = RULES.iter().find(|rule| (rule.applies)(&signals))?;

    Some(Classification {
        category: rule.category,
        reason: rule.reason,
        competing: competing_groups(sheet_name, rule.category),
    })
}
