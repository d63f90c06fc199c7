use crate::core::generator::EmailGenerator;
use crate::core::loader::load_source;
use crate::core::merger::{merge, MergeMode};
use crate::core::prompt::preview;
use crate::core::selection::{select_many, select_single, SingleSelection};
use crate::core::{
    CompanyRecord, CostTracker, MergedDataset, OutputRow, PromptVariant, Storage, TextGenerator,
};
use crate::domain::model::fields;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

pub const DEFAULT_OUTPUT_FILE: &str = "generated_cold_emails.csv";
const SEPARATOR_WIDTH: usize = 80;

/// When single-selection mode also drafts the CRM-informed email.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum CrmVariantPolicy {
    /// Only when the selected company has at least one non-empty CRM field.
    #[default]
    WhenPresent,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// One index, both variants.
    Single,
    /// Many indices, base variant only, shared cost totals.
    Batch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub primary_path: String,
    pub primary_delimiter: u8,
    pub crm_path: Option<String>,
    pub crm_delimiter: u8,
    pub identity_field: String,
    pub merge_mode: MergeMode,
    pub crm_variant: CrmVariantPolicy,
    pub output_path: String,
    pub stop_keyword: String,
    pub preview_chars: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            primary_path: "companies.csv".to_string(),
            primary_delimiter: b';',
            crm_path: None,
            crm_delimiter: b';',
            identity_field: fields::COMPANY.to_string(),
            merge_mode: MergeMode::default(),
            crm_variant: CrmVariantPolicy::default(),
            output_path: DEFAULT_OUTPUT_FILE.to_string(),
            stop_keyword: crate::core::selection::DEFAULT_STOP_KEYWORD.to_string(),
            preview_chars: 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The merged dataset was empty; nothing was generated.
    NoData,
    /// Single-selection input was rejected.
    InvalidSelection(String),
    /// Batch mode ended without any valid index.
    NothingSelected,
    /// Dry run: prompts were printed, nothing was generated or written.
    Previewed,
    Completed { output_path: String },
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub rows: Vec<OutputRow>,
    pub totals: CostTracker,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
}

impl RunReport {
    fn new(outcome: RunOutcome, started_at: DateTime<Utc>) -> Self {
        Self {
            outcome,
            rows: Vec::new(),
            totals: CostTracker::new(),
            warnings: Vec::new(),
            started_at,
        }
    }
}

/// Drives one run: load, present, select, generate, persist.
pub struct Orchestrator<S: Storage, G: TextGenerator> {
    storage: S,
    generator: EmailGenerator<G>,
    settings: RunSettings,
}

impl<S: Storage, G: TextGenerator> Orchestrator<S, G> {
    pub fn new(storage: S, generator: EmailGenerator<G>, settings: RunSettings) -> Self {
        let generator = generator.with_identity_field(settings.identity_field.clone());
        Self {
            storage,
            generator,
            settings,
        }
    }

    pub async fn load(&self) -> Result<MergedDataset> {
        let primary = load_source(
            &self.storage,
            &self.settings.primary_path,
            self.settings.primary_delimiter,
            "primary",
        )
        .await?;

        let secondary = match &self.settings.crm_path {
            Some(path) => {
                load_source(&self.storage, path, self.settings.crm_delimiter, "CRM").await?
            }
            None => {
                tracing::info!("No CRM source configured, using market data only");
                Vec::new()
            }
        };

        Ok(merge(
            primary,
            &secondary,
            &self.settings.identity_field,
            self.settings.merge_mode,
        ))
    }

    fn identity<'a>(&self, record: &'a CompanyRecord) -> &'a str {
        record.get(&self.settings.identity_field)
    }

    pub fn present<W: Write>(&self, dataset: &MergedDataset, out: &mut W) -> Result<()> {
        writeln!(out, "Available companies:")?;
        for (index, record) in dataset.iter() {
            let name = match self.identity(record) {
                "" => "Unnamed Company",
                name => name,
            };
            writeln!(out, "{}: {}", index, name)?;
        }
        tracing::debug!("Listed {} companies", dataset.len());
        Ok(())
    }

    pub async fn run<R: BufRead, W: Write>(
        &self,
        mode: SelectionMode,
        input: &mut R,
        out: &mut W,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        tracing::info!("🚀 Starting {:?} run at {}", mode, started_at.to_rfc3339());

        let dataset = self.load().await?;
        if dataset.is_empty() {
            tracing::warn!("No companies found in the data");
            writeln!(out, "No companies found in the data.")?;
            return Ok(RunReport::new(RunOutcome::NoData, started_at));
        }

        self.present(&dataset, out)?;

        match mode {
            SelectionMode::Single => self.run_single(&dataset, input, out, started_at).await,
            SelectionMode::Batch => self.run_batch(&dataset, input, out, started_at).await,
        }
    }

    fn wants_crm_variant(&self, record: &CompanyRecord) -> bool {
        match self.settings.crm_variant {
            CrmVariantPolicy::Always => true,
            CrmVariantPolicy::WhenPresent => record.has_crm_context(),
        }
    }

    async fn run_single<R: BufRead, W: Write>(
        &self,
        dataset: &MergedDataset,
        input: &mut R,
        out: &mut W,
        started_at: DateTime<Utc>,
    ) -> Result<RunReport> {
        let (index, record) = match select_single(input, out, dataset.len())? {
            SingleSelection::Index(index) => match dataset.get(index) {
                Some(record) => (index, record),
                None => {
                    return Ok(RunReport::new(
                        RunOutcome::InvalidSelection(format!("Invalid index selected: {}", index)),
                        started_at,
                    ))
                }
            },
            SingleSelection::Invalid(reason) => {
                tracing::error!("{}", reason);
                writeln!(out, "{}", reason)?;
                return Ok(RunReport::new(RunOutcome::InvalidSelection(reason), started_at));
            }
        };

        let mut variants = vec![PromptVariant::Base];
        if self.wants_crm_variant(record) {
            variants.push(PromptVariant::BasePlusCrm);
        } else {
            tracing::info!(
                "Skipping CRM variant for {}: no CRM fields present",
                self.identity(record)
            );
        }

        let mut totals = CostTracker::new();
        let mut rows = Vec::new();
        for variant in variants {
            let prompt = self.generator.renderer().render(record, variant);
            writeln!(out, "\nPrompt preview ({}):", variant)?;
            writeln!(out, "{}", preview(&prompt, self.settings.preview_chars))?;

            let result = self
                .generator
                .generate(record, variant, Some(&mut totals))
                .await;

            writeln!(out, "\nGenerated Email using {}:", variant)?;
            writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))?;
            writeln!(out, "{}", result.text)?;
            writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))?;

            rows.push(OutputRow::new(index, variant, self.identity(record), result));
        }

        let output_path = self.persist(&rows).await?;
        writeln!(out, "Emails and metrics saved to {}", output_path)?;
        self.log_totals(&totals);

        Ok(RunReport {
            outcome: RunOutcome::Completed { output_path },
            rows,
            totals,
            warnings: Vec::new(),
            started_at,
        })
    }

    async fn run_batch<R: BufRead, W: Write>(
        &self,
        dataset: &MergedDataset,
        input: &mut R,
        out: &mut W,
        started_at: DateTime<Utc>,
    ) -> Result<RunReport> {
        let selection = select_many(input, out, dataset.len(), &self.settings.stop_keyword)?;
        if selection.indices.is_empty() {
            writeln!(out, "No valid indices selected. Exiting.")?;
            let mut report = RunReport::new(RunOutcome::NothingSelected, started_at);
            report.warnings = selection.warnings;
            return Ok(report);
        }

        tracing::info!("📋 Generating emails for {} companies", selection.indices.len());

        let mut totals = CostTracker::new();
        let mut rows = Vec::with_capacity(selection.indices.len());
        for (position, &index) in selection.indices.iter().enumerate() {
            let Some(record) = dataset.get(index) else {
                continue;
            };
            tracing::info!(
                "✉️ [{}/{}] {}",
                position + 1,
                selection.indices.len(),
                self.identity(record)
            );

            let result = self
                .generator
                .generate(record, PromptVariant::Base, Some(&mut totals))
                .await;
            rows.push(OutputRow::new(
                index,
                PromptVariant::Base,
                self.identity(record),
                result,
            ));
        }

        let output_path = self.persist(&rows).await?;
        writeln!(out, "Batch run complete. Emails saved to {}", output_path)?;
        self.log_totals(&totals);

        Ok(RunReport {
            outcome: RunOutcome::Completed { output_path },
            rows,
            totals,
            warnings: selection.warnings,
            started_at,
        })
    }

    /// Lists companies, reads one index and prints both rendered prompts
    /// without calling the generation service.
    pub async fn preview<R: BufRead, W: Write>(&self, input: &mut R, out: &mut W) -> Result<RunReport> {
        let started_at = Utc::now();
        let dataset = self.load().await?;
        if dataset.is_empty() {
            writeln!(out, "No companies found in the data.")?;
            return Ok(RunReport::new(RunOutcome::NoData, started_at));
        }

        self.present(&dataset, out)?;
        let record = match select_single(input, out, dataset.len())? {
            SingleSelection::Index(index) => dataset.get(index),
            SingleSelection::Invalid(reason) => {
                writeln!(out, "{}", reason)?;
                return Ok(RunReport::new(RunOutcome::InvalidSelection(reason), started_at));
            }
        };

        if let Some(record) = record {
            for variant in [PromptVariant::Base, PromptVariant::BasePlusCrm] {
                writeln!(out, "\n=== {} prompt ===", variant)?;
                writeln!(out, "{}", self.generator.renderer().render(record, variant))?;
            }
        }

        Ok(RunReport::new(RunOutcome::Previewed, started_at))
    }

    /// Writes the whole output table in one go, replacing any previous file.
    pub async fn persist(&self, rows: &[OutputRow]) -> Result<String> {
        let data = write_table(rows)?;
        self.storage
            .write_file(&self.settings.output_path, &data)
            .await?;
        tracing::info!("💾 Saved {} rows to {}", rows.len(), self.settings.output_path);
        Ok(self.settings.output_path.clone())
    }

    fn log_totals(&self, totals: &CostTracker) {
        tracing::info!(
            "📊 Total tokens used: {}, total estimated cost: ${:.5}",
            totals.total_tokens,
            totals.total_cost
        );
    }
}

pub fn write_table(rows: &[OutputRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record([
            "Index",
            "Version",
            "Company",
            "GeneratedEmail",
            "ResponseTime_sec",
            "TokensUsed",
            "EstimatedCost_$",
        ])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| crate::utils::error::OutreachError::IoError(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GenerationResult;

    #[test]
    fn test_write_table_header_and_empty_cells() {
        let rows = vec![
            OutputRow::new(
                0,
                PromptVariant::Base,
                "Acme",
                GenerationResult {
                    text: "Subject: Hi, there\nBody".to_string(),
                    elapsed_secs: Some(1.5),
                    tokens_used: Some(200),
                    estimated_cost: Some(0.0004),
                },
            ),
            OutputRow::new(2, PromptVariant::Base, "Globex", GenerationResult::failed()),
        ];

        let table = String::from_utf8(write_table(&rows).unwrap()).unwrap();
        let mut lines = table.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Index,Version,Company,GeneratedEmail,ResponseTime_sec,TokensUsed,EstimatedCost_$"
        );
        assert!(table.contains("\"Subject: Hi, there\nBody\""));
        assert!(table.ends_with("2,Market Data,Globex,,,,\n"));
    }

    #[test]
    fn test_write_table_without_rows_keeps_header() {
        let table = String::from_utf8(write_table(&[]).unwrap()).unwrap();
        assert!(table.starts_with("Index,Version,Company"));
    }
}
