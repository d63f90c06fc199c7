pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{storage::LocalStorage, toml_config::AppConfig};
pub use crate::core::{
    generator::{EmailGenerator, GenerationSettings},
    merger::{merge, MergeMode},
    openai::OpenAiClient,
    orchestrator::{CrmVariantPolicy, Orchestrator, RunOutcome, RunReport, RunSettings, SelectionMode},
    prompt::{render, PromptRenderer},
};
pub use domain::model::{CompanyRecord, CostTracker, GenerationResult, OutputRow, PromptVariant};
pub use utils::error::{OutreachError, Result};
