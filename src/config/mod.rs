pub mod storage;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::merger::MergeMode;
#[cfg(feature = "cli")]
use crate::core::orchestrator::CrmVariantPolicy;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use toml_config::AppConfig;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "cold-outreach")]
#[command(about = "Draft personalized outreach emails from a market-data export")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "outreach.toml")]
    pub config: String,

    /// Select many companies and draft the base email for each
    #[arg(long)]
    pub batch: bool,

    /// Market-data export (delimited text)
    #[arg(long)]
    pub primary: Option<String>,

    /// CRM export (delimited text)
    #[arg(long)]
    pub crm: Option<String>,

    /// Output table path
    #[arg(long)]
    pub output: Option<String>,

    #[arg(long, value_enum)]
    pub merge_mode: Option<MergeMode>,

    #[arg(long, value_enum)]
    pub crm_variant: Option<CrmVariantPolicy>,

    /// Print the rendered prompts for one company without calling the API
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads the config file when it exists, then applies command-line overrides.
    pub fn resolve(&self) -> crate::Result<AppConfig> {
        let mut config = if std::path::Path::new(&self.config).exists() {
            tracing::info!("📁 Loading configuration from: {}", self.config);
            AppConfig::from_file(&self.config)?
        } else {
            tracing::debug!("No config file at {}, using defaults", self.config);
            AppConfig::from_env()
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(primary) = &self.primary {
            config.sources.primary_path = primary.clone();
        }
        if let Some(crm) = &self.crm {
            config.sources.crm_path = Some(crm.clone());
        }
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if let Some(mode) = self.merge_mode {
            config.run.merge_mode = mode;
        }
        if let Some(policy) = self.crm_variant {
            config.run.crm_variant = policy;
        }
    }
}
