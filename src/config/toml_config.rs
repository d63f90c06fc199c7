use crate::core::generator::{
    GenerationSettings, DEFAULT_COST_PER_1K_TOKENS, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE,
};
use crate::core::merger::MergeMode;
use crate::core::openai::DEFAULT_BASE_URL;
use crate::core::orchestrator::{CrmVariantPolicy, RunSettings, DEFAULT_OUTPUT_FILE};
use crate::core::prompt::DEFAULT_SENDER;
use crate::core::selection::DEFAULT_STOP_KEYWORD;
use crate::domain::model::fields;
use crate::utils::error::{OutreachError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sources: SourcesConfig,
    pub generation: GenerationConfig,
    pub prompt: PromptConfig,
    pub run: RunConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub primary_path: String,
    pub primary_delimiter: String,
    pub crm_path: Option<String>,
    pub crm_delimiter: String,
    pub identity_field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub cost_per_1k_tokens: f64,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub sender: String,
    pub preview_chars: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub merge_mode: MergeMode,
    pub crm_variant: CrmVariantPolicy,
    pub stop_keyword: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            primary_path: "companies.csv".to_string(),
            primary_delimiter: ";".to_string(),
            crm_path: None,
            crm_delimiter: ";".to_string(),
            identity_field: fields::COMPANY.to_string(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            cost_per_1k_tokens: DEFAULT_COST_PER_1K_TOKENS,
            timeout_seconds: 60,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            sender: DEFAULT_SENDER.to_string(),
            preview_chars: 400,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_OUTPUT_FILE.to_string(),
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OutreachError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，未提供金鑰時改用 OPENAI_API_KEY
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let mut config: Self =
            toml::from_str(&processed_content).map_err(|e| OutreachError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        config.apply_env_credential();
        Ok(config)
    }

    /// Built-in defaults plus the credential from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_credential();
        config
    }

    fn apply_env_credential(&mut self) {
        if self.generation.api_key.is_none() {
            self.generation.api_key = std::env::var(API_KEY_ENV).ok();
        }
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})，找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| OutreachError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Everything except the credential; dry runs never call the service.
    pub fn validate_offline(&self) -> Result<()> {
        validation::validate_url("generation.base_url", &self.generation.base_url)?;
        validation::validate_non_empty_string("generation.model", &self.generation.model)?;
        validation::validate_range("generation.temperature", self.generation.temperature, 0.0, 2.0)?;
        validation::validate_positive_number(
            "generation.max_tokens",
            u64::from(self.generation.max_tokens),
            1,
        )?;
        validation::validate_positive_number(
            "generation.timeout_seconds",
            self.generation.timeout_seconds,
            1,
        )?;
        if !(self.generation.cost_per_1k_tokens >= 0.0) {
            return Err(OutreachError::InvalidConfigValueError {
                field: "generation.cost_per_1k_tokens".to_string(),
                value: self.generation.cost_per_1k_tokens.to_string(),
                reason: "Rate cannot be negative".to_string(),
            });
        }

        validation::validate_path("sources.primary_path", &self.sources.primary_path)?;
        let mut source_files = vec![self.sources.primary_path.as_str()];
        if let Some(crm_path) = &self.sources.crm_path {
            validation::validate_path("sources.crm_path", crm_path)?;
            source_files.push(crm_path.as_str());
        }
        validation::validate_file_extensions("sources", &source_files, &["csv", "tsv", "txt"])?;
        validation::validate_delimiter("sources.primary_delimiter", &self.sources.primary_delimiter)?;
        validation::validate_delimiter("sources.crm_delimiter", &self.sources.crm_delimiter)?;
        validation::validate_non_empty_string("sources.identity_field", &self.sources.identity_field)?;

        validation::validate_path("output.path", &self.output.path)?;
        validation::validate_non_empty_string("run.stop_keyword", &self.stop_keyword())?;
        Ok(())
    }

    pub fn api_key(&self) -> &str {
        self.generation.api_key.as_deref().unwrap_or("")
    }

    pub fn stop_keyword(&self) -> String {
        self.run
            .stop_keyword
            .clone()
            .unwrap_or_else(|| DEFAULT_STOP_KEYWORD.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.generation.timeout_seconds)
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.generation.model.clone(),
            system_prompt: self.generation.system_prompt.clone(),
            temperature: self.generation.temperature,
            max_tokens: self.generation.max_tokens,
            cost_per_1k_tokens: self.generation.cost_per_1k_tokens,
        }
    }

    pub fn run_settings(&self) -> Result<RunSettings> {
        Ok(RunSettings {
            primary_path: self.sources.primary_path.clone(),
            primary_delimiter: validation::validate_delimiter(
                "sources.primary_delimiter",
                &self.sources.primary_delimiter,
            )?,
            crm_path: self.sources.crm_path.clone(),
            crm_delimiter: validation::validate_delimiter(
                "sources.crm_delimiter",
                &self.sources.crm_delimiter,
            )?,
            identity_field: self.sources.identity_field.clone(),
            merge_mode: self.run.merge_mode,
            crm_variant: self.run.crm_variant,
            output_path: self.output.path.clone(),
            stop_keyword: self.stop_keyword(),
            preview_chars: self.prompt.preview_chars,
        })
    }
}

impl Validate for AppConfig {
    /// Full startup check, including the credential.
    fn validate(&self) -> Result<()> {
        validation::validate_credential("generation.api_key", &self.generation.api_key)?;
        self.validate_offline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_toml_str("[generation]\napi_key = \"sk-test\"\n").unwrap();

        assert_eq!(config.generation.model, "gpt-3.5-turbo");
        assert_eq!(config.generation.temperature, 0.8);
        assert_eq!(config.generation.max_tokens, 300);
        assert_eq!(config.generation.cost_per_1k_tokens, 0.002);
        assert_eq!(config.output.path, "generated_cold_emails.csv");
        assert_eq!(config.run.merge_mode, MergeMode::Keyed);
        assert_eq!(config.run.crm_variant, CrmVariantPolicy::WhenPresent);
        assert_eq!(config.stop_keyword(), "STOP");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[sources]
primary_path = "data/tamtam.csv"
primary_delimiter = ","
crm_path = "data/crm_data.csv"

[generation]
api_key = "sk-file"
model = "gpt-4o-mini"
temperature = 0.3
max_tokens = 500
cost_per_1k_tokens = 0.0006

[prompt]
sender = "Globex"

[run]
merge_mode = "broadcast"
crm_variant = "always"
stop_keyword = "done"

[output]
path = "out/emails.csv"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.sources.crm_path.as_deref(), Some("data/crm_data.csv"));
        assert_eq!(config.api_key(), "sk-file");
        assert_eq!(config.prompt.sender, "Globex");

        let run = config.run_settings().unwrap();
        assert_eq!(run.primary_delimiter, b',');
        assert_eq!(run.merge_mode, MergeMode::Broadcast);
        assert_eq!(run.crm_variant, CrmVariantPolicy::Always);
        assert_eq!(run.stop_keyword, "done");
        assert_eq!(run.output_path, "out/emails.csv");

        let generation = config.generation_settings();
        assert_eq!(generation.model, "gpt-4o-mini");
        assert_eq!(generation.max_tokens, 500);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("COLD_OUTREACH_TEST_MODEL", "gpt-test-model");

        let config =
            AppConfig::from_toml_str("[generation]\nmodel = \"${COLD_OUTREACH_TEST_MODEL}\"\n")
                .unwrap();
        assert_eq!(config.generation.model, "gpt-test-model");

        std::env::remove_var("COLD_OUTREACH_TEST_MODEL");
    }

    #[test]
    fn test_unresolved_placeholder_fails_startup_check() {
        let config = AppConfig::from_toml_str(
            "[generation]\napi_key = \"${COLD_OUTREACH_UNSET_KEY_FOR_TEST}\"\n",
        )
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(OutreachError::InvalidConfigValueError { .. })
        ));
        assert!(config.validate_offline().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_bad_values() {
        let cases = [
            "[generation]\napi_key = \"sk\"\nbase_url = \"invalid-url\"\n",
            "[generation]\napi_key = \"sk\"\ntemperature = 3.0\n",
            "[generation]\napi_key = \"sk\"\nmax_tokens = 0\n",
            "[generation]\napi_key = \"sk\"\ncost_per_1k_tokens = -1.0\n",
            "[generation]\napi_key = \"sk\"\n[sources]\nprimary_path = \"export.xlsx\"\n",
            "[generation]\napi_key = \"sk\"\n[sources]\nprimary_delimiter = \";;\"\n",
        ];
        for case in cases {
            let config = AppConfig::from_toml_str(case).unwrap();
            assert!(config.validate().is_err(), "expected failure for {}", case);
        }
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[output]\npath = \"file-test.csv\"\n")
            .unwrap();

        let config = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output.path, "file-test.csv");
    }
}
