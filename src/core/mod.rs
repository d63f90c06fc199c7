pub mod generator;
pub mod loader;
pub mod merger;
pub mod openai;
pub mod orchestrator;
pub mod prompt;
pub mod selection;

pub use crate::domain::model::{
    CompanyRecord, CostTracker, GenerationResult, MergedDataset, OutputRow, PromptVariant,
};
pub use crate::domain::ports::{Completion, CompletionRequest, Storage, TextGenerator};
pub use crate::utils::error::Result;
