use crate::core::{CompanyRecord, MergedDataset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How CRM rows are attached to the market-data rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum MergeMode {
    /// One-to-one join on the identity column.
    #[default]
    Keyed,
    /// The first CRM row annotates every company. Only meaningful when the CRM
    /// export describes the single contact shared by the whole dataset.
    Broadcast,
}

/// Combines the primary rows with the CRM rows. The result always has one
/// record per primary row, in primary order, and the identity field of a
/// primary row is never overwritten.
pub fn merge(
    primary: Vec<CompanyRecord>,
    secondary: &[CompanyRecord],
    identity_field: &str,
    mode: MergeMode,
) -> MergedDataset {
    if secondary.is_empty() {
        return MergedDataset::new(primary);
    }

    let merged = match mode {
        MergeMode::Broadcast => broadcast_merge(primary, secondary, identity_field),
        MergeMode::Keyed => keyed_merge(primary, secondary, identity_field),
    };
    MergedDataset::new(merged)
}

fn annotate(target: &mut CompanyRecord, source: &CompanyRecord, identity_field: &str) {
    for (key, value) in &source.data {
        if key != identity_field {
            target.set(key.clone(), value.clone());
        }
    }
}

fn broadcast_merge(
    mut primary: Vec<CompanyRecord>,
    secondary: &[CompanyRecord],
    identity_field: &str,
) -> Vec<CompanyRecord> {
    if secondary.len() > 1 {
        tracing::warn!(
            "⚠️ Broadcast merge uses only the first of {} CRM rows",
            secondary.len()
        );
    }
    let crm_row = &secondary[0];

    for record in &mut primary {
        annotate(record, crm_row, identity_field);
    }
    tracing::debug!("Broadcast CRM row onto {} companies", primary.len());
    primary
}

fn identity_key(value: &str) -> String {
    value.trim().to_lowercase()
}

fn keyed_merge(
    mut primary: Vec<CompanyRecord>,
    secondary: &[CompanyRecord],
    identity_field: &str,
) -> Vec<CompanyRecord> {
    let mut by_key: HashMap<String, &CompanyRecord> = HashMap::new();
    for crm_row in secondary {
        let key = identity_key(crm_row.get(identity_field));
        if key.is_empty() {
            tracing::warn!("⚠️ Skipping CRM row without a '{}' value", identity_field);
            continue;
        }
        if by_key.contains_key(&key) {
            tracing::warn!(
                "⚠️ Duplicate CRM row for '{}', keeping the first one",
                crm_row.get(identity_field)
            );
            continue;
        }
        by_key.insert(key, crm_row);
    }

    let mut matched = 0;
    for record in &mut primary {
        if let Some(crm_row) = by_key.get(&identity_key(record.get(identity_field))) {
            annotate(record, crm_row, identity_field);
            matched += 1;
        }
    }

    tracing::info!(
        "🔗 Joined CRM data onto {}/{} companies",
        matched,
        primary.len()
    );
    primary
}
