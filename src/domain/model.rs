use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Column names shared by the market-data export, the CRM export and the prompt templates.
pub mod fields {
    pub const COMPANY: &str = "Company";
    pub const REVENUE: &str = "Revenue";
    pub const COUNTRIES: &str = "Countries";
    pub const STRATEGY: &str = "Strategy";
    pub const PAIN_POINTS: &str = "Pain Points";
    pub const PRODUCT_USE_CASES: &str = "Products & use cases";

    pub const CONTACT_NAME: &str = "ContactName";
    pub const EMAIL: &str = "Email";
    pub const DOMAIN: &str = "Domain";
    pub const CONTACT_ID: &str = "HS_Contact_ID";
    pub const LAST_INTERACTION: &str = "LastInteraction";
    pub const EMAIL_HISTORY: &str = "EmailHistory";
    pub const CALL_SUMMARY: &str = "CallSummary";
    pub const ADDITIONAL_NOTES: &str = "AdditionalNotes";

    /// CRM columns rendered into the CRM-informed prompt.
    pub const CRM_PROMPT_FIELDS: [&str; 5] = [
        CONTACT_NAME,
        LAST_INTERACTION,
        EMAIL_HISTORY,
        CALL_SUMMARY,
        ADDITIONAL_NOTES,
    ];
}

/// One row of company context. Absent fields read as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub data: HashMap<String, String>,
}

impl CompanyRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> &str {
        self.data.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.data.insert(field.into(), value.into());
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Value of the default `Company` column.
    pub fn company(&self) -> &str {
        self.get(fields::COMPANY)
    }

    /// True when at least one CRM column the prompt renders has a value.
    pub fn has_crm_context(&self) -> bool {
        fields::CRM_PROMPT_FIELDS
            .iter()
            .any(|field| !self.get(field).trim().is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CompanyRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Merged company contexts, indexed by their row position in the primary source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedDataset {
    records: Vec<CompanyRecord>,
}

impl MergedDataset {
    pub fn new(records: Vec<CompanyRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CompanyRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &CompanyRecord)> {
        self.records.iter().enumerate()
    }

    pub fn records(&self) -> &[CompanyRecord] {
        &self.records
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptVariant {
    /// Cold outreach from market data only.
    Base,
    /// Follow-up that also uses the CRM relationship history.
    BasePlusCrm,
}

impl PromptVariant {
    pub fn label(&self) -> &'static str {
        match self {
            PromptVariant::Base => "Market Data",
            PromptVariant::BasePlusCrm => "CRM Data",
        }
    }
}

impl fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one generation call. A failed call leaves `text` empty and
/// every numeric field `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResult {
    pub text: String,
    pub elapsed_secs: Option<f64>,
    pub tokens_used: Option<u64>,
    pub estimated_cost: Option<f64>,
}

impl GenerationResult {
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.tokens_used.is_some()
    }
}

/// Running token and cost totals for one run. Owned by the orchestrator and
/// threaded through each generation call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostTracker {
    pub total_tokens: u64,
    pub total_cost: f64,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tokens: u64, cost: f64) {
        self.total_tokens += tokens;
        self.total_cost += cost;
    }
}

/// One line of the output table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    #[serde(rename = "Index")]
    pub index: usize,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "GeneratedEmail")]
    pub generated_email: String,
    #[serde(rename = "ResponseTime_sec")]
    pub response_time_secs: Option<f64>,
    #[serde(rename = "TokensUsed")]
    pub tokens_used: Option<u64>,
    #[serde(rename = "EstimatedCost_$")]
    pub estimated_cost: Option<f64>,
}

impl OutputRow {
    pub fn new(index: usize, variant: PromptVariant, company: &str, result: GenerationResult) -> Self {
        Self {
            index,
            version: variant.label().to_string(),
            company: company.to_string(),
            generated_email: result.text,
            response_time_secs: result.elapsed_secs,
            tokens_used: result.tokens_used,
            estimated_cost: result.estimated_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_reads_as_empty() {
        let record = CompanyRecord::new().with(fields::COMPANY, "Acme");
        assert_eq!(record.company(), "Acme");
        assert_eq!(record.get(fields::REVENUE), "");
    }

    #[test]
    fn test_crm_context_detection() {
        let record = CompanyRecord::new().with(fields::COMPANY, "Acme");
        assert!(!record.has_crm_context());

        let record = record.with(fields::CALL_SUMMARY, "  ");
        assert!(!record.has_crm_context());

        // identifiers alone add nothing to the prompt
        let record = record
            .with(fields::DOMAIN, "acme.test")
            .with(fields::EMAIL, "jane@acme.test")
            .with(fields::CONTACT_ID, "42");
        assert!(!record.has_crm_context());

        let record = record.with(fields::CONTACT_NAME, "Jane");
        assert!(record.has_crm_context());
    }

    #[test]
    fn test_cost_tracker_accumulates() {
        let mut tracker = CostTracker::new();
        tracker.record(1000, 0.002);
        tracker.record(500, 0.001);
        assert_eq!(tracker.total_tokens, 1500);
        assert!((tracker.total_cost - 0.003).abs() < 1e-12);
    }
}
