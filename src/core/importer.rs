use crate::core::detector::{self, Classification};
use crate::core::normalizer::Normalizer;
use crate::core::workbook::{self, WORKBOOK_EXTENSIONS};
use crate::core::{RecordStore, SessionProvider, Storage};
use crate::domain::model::{Category, Operator, Sheet, Workbook};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use crate::utils::validation::validate_file_extension;
use chrono::{Local, NaiveDate};

/// A row the store refused. The batch keeps going after these.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub sheet: String,
    /// 1-based data row number, not counting the header.
    pub row: usize,
    pub category: Category,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSheet {
    pub sheet: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub incidents: usize,
    pub inspections: usize,
    pub risk_assessments: usize,
    pub training_records: usize,
    pub failures: Vec<RowFailure>,
    pub skipped_sheets: Vec<SkippedSheet>,
    pub dry_run: bool,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.incidents + self.inspections + self.risk_assessments + self.training_records
    }

    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Incidents => self.incidents,
            Category::Inspections => self.inspections,
            Category::RiskAssessments => self.risk_assessments,
            Category::TrainingRecords => self.training_records,
        }
    }

    fn add(&mut self, category: Category, imported: usize) {
        match category {
            Category::Incidents => self.incidents += imported,
            Category::Inspections => self.inspections += imported,
            Category::RiskAssessments => self.risk_assessments += imported,
            Category::TrainingRecords => self.training_records += imported,
        }
    }

    pub fn message(&self) -> String {
        if self.dry_run {
            format!("Dry run: {} records would be imported", self.total())
        } else {
            format!("Successfully imported {} records", self.total())
        }
    }

    /// Per-category lines for categories that imported anything.
    pub fn detail_lines(&self) -> Vec<String> {
        [
            ("Incidents", self.incidents),
            ("Inspections", self.inspections),
            ("Risk Assessments", self.risk_assessments),
            ("Training Records", self.training_records),
        ]
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(label, count)| format!("{}: {}", label, count))
        .collect()
    }
}

/// Runs a workbook import: detect each sheet, normalize each row, insert one at a time.
pub struct ImportEngine<R: RecordStore> {
    store: R,
    monitor: SystemMonitor,
    dry_run: bool,
    today: Option<NaiveDate>,
}

impl<R: RecordStore> ImportEngine<R> {
    pub fn new(store: R) -> Self {
        Self::new_with_monitoring(store, false)
    }

    pub fn new_with_monitoring(store: R, monitor_enabled: bool) -> Self {
        Self {
            store,
            monitor: SystemMonitor::new(monitor_enabled),
            dry_run: false,
            today: None,
        }
    }

    /// Normalize everything but skip the inserts.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Fixes the date used when a mandatory date column is missing.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Checks the session, reads and parses the file, then imports it.
    ///
    /// Any failure up to and including parsing aborts the import with no counts.
    pub async fn run_file<S: Storage, P: SessionProvider>(
        &self,
        storage: &S,
        session: &P,
        path: &str,
        override_category: Option<Category>,
    ) -> Result<ImportSummary> {
        let operator = session.current_operator().await?;
        tracing::info!("🔐 Importing as operator {}", operator.id);

        validate_file_extension("file", path, WORKBOOK_EXTENSIONS)?;
        let bytes = storage.read_file(path).await?;
        tracing::debug!("Read {} bytes from {}", bytes.len(), path);

        let workbook = workbook::parse_workbook(path, bytes)?;
        self.monitor.log_stats("Workbook parsed");

        let summary = self.run(&workbook, &operator, override_category).await;
        self.monitor.log_final_stats();
        Ok(summary)
    }

    pub async fn run(&self, workbook: &Workbook, operator: &Operator, override_category: Option<Category>) -> ImportSummary {
        let normalizer = Normalizer::new(
            operator.id.clone(),
            self.today.unwrap_or_else(|| Local::now().date_naive()),
        );
        let mut summary = ImportSummary {
            dry_run: self.dry_run,
            ..Default::default()
        };

        for sheet in &workbook.sheets {
            tracing::info!("Processing sheet \"{}\" with {} rows", sheet.name, sheet.rows.len());

            if sheet.rows.is_empty() {
                tracing::info!("Sheet \"{}\" is empty, skipping", sheet.name);
                summary.skipped_sheets.push(SkippedSheet {
                    sheet: sheet.name.clone(),
                    reason: "no data rows".to_string(),
                });
                continue;
            }

            tracing::debug!("Detected columns in \"{}\": {:?}", sheet.name, sheet.headers);

            let Some(classification) = detector::detect(&sheet.name, &sheet.headers, override_category) else {
                tracing::info!("Sheet \"{}\" not recognized, skipping", sheet.name);
                summary.skipped_sheets.push(SkippedSheet {
                    sheet: sheet.name.clone(),
                    reason: "no category matched the sheet name or columns".to_string(),
                });
                continue;
            };

            self.log_classification(sheet, &classification);

            let imported = self
                .import_sheet(sheet, classification.category, &normalizer, &mut summary.failures)
                .await;
            summary.add(classification.category, imported);
            self.monitor.log_stats(&format!("Sheet \"{}\"", sheet.name));
        }

        if !summary.failures.is_empty() {
            tracing::error!("❌ {} rows failed to import", summary.failures.len());
        }
        tracing::info!("✅ {}", summary.message());
        summary
    }

    fn log_classification(&self, sheet: &Sheet, classification: &Classification) {
        tracing::info!(
            "Importing sheet \"{}\" as {} ({})",
            sheet.name,
            classification.category,
            classification.reason
        );
        if classification.is_ambiguous() {
            tracing::warn!(
                "⚠️ Sheet name \"{}\" also matches {:?}; classified as {} by rule priority",
                sheet.name,
                classification.competing,
                classification.category
            );
        }
    }

    async fn import_sheet(
        &self,
        sheet: &Sheet,
        category: Category,
        normalizer: &Normalizer,
        failures: &mut Vec<RowFailure>,
    ) -> usize {
        let mut count = 0;
        let sheet_failures_before = failures.len();

        for (index, row) in sheet.rows.iter().enumerate() {
            let record = normalizer.normalize(category, row);

            if self.dry_run {
                count += 1;
                continue;
            }

            let outcome = match record.to_json() {
                Ok(body) => self.store.insert(record.table(), body).await,
                Err(e) => Err(e.into()),
            };

            match outcome {
                Ok(()) => count += 1,
                Err(e) => {
                    tracing::warn!("Row {} of \"{}\" was not imported: {}", index + 1, sheet.name, e);
                    failures.push(RowFailure {
                        sheet: sheet.name.clone(),
                        row: index + 1,
                        category,
                        message: e.to_string(),
                    });
                }
            }
        }

        let failed = failures.len() - sheet_failures_before;
        if failed > 0 {
            tracing::error!("Failed to import {} {} from \"{}\"", failed, category, sheet.name);
        }
        tracing::info!("Imported {} {} from \"{}\"", count, category, sheet.name);
        count
    }
}
