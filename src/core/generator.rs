use crate::core::prompt::PromptRenderer;
use crate::core::{
    CompanyRecord, CompletionRequest, CostTracker, GenerationResult, PromptVariant, TextGenerator,
};
use std::time::Instant;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI sales assistant.";
pub const DEFAULT_TEMPERATURE: f64 = 0.8;
pub const DEFAULT_MAX_TOKENS: u32 = 300;
pub const DEFAULT_COST_PER_1K_TOKENS: f64 = 0.002;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Flat rate applied to prompt + completion tokens. This is an estimate for
    /// budgeting; it ignores the different input/output prices of real billing.
    pub cost_per_1k_tokens: f64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            cost_per_1k_tokens: DEFAULT_COST_PER_1K_TOKENS,
        }
    }
}

impl GenerationSettings {
    pub fn estimate_cost(&self, total_tokens: u64) -> f64 {
        (total_tokens as f64 / 1000.0) * self.cost_per_1k_tokens
    }
}

/// Renders a prompt, makes one completion call and turns the outcome into a
/// `GenerationResult`. Failures are logged and never returned as errors.
pub struct EmailGenerator<G: TextGenerator> {
    client: G,
    renderer: PromptRenderer,
    settings: GenerationSettings,
}

impl<G: TextGenerator> EmailGenerator<G> {
    pub fn new(client: G, renderer: PromptRenderer, settings: GenerationSettings) -> Self {
        Self {
            client,
            renderer,
            settings,
        }
    }

    pub fn renderer(&self) -> &PromptRenderer {
        &self.renderer
    }

    /// Reads the company name from `field` when rendering and logging.
    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.renderer = self.renderer.with_identity_field(field);
        self
    }

    pub async fn generate(
        &self,
        record: &CompanyRecord,
        variant: PromptVariant,
        tracker: Option<&mut CostTracker>,
    ) -> GenerationResult {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            system_prompt: self.settings.system_prompt.clone(),
            prompt: self.renderer.render(record, variant),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let start = Instant::now();
        let outcome = self.client.complete(&request).await;
        let elapsed = start.elapsed().as_secs_f64();

        let completion = match outcome {
            Ok(completion) => completion,
            Err(e) => {
                tracing::error!(
                    "❌ Error generating {} email for {}: {}",
                    variant,
                    self.company_label(record),
                    e
                );
                return GenerationResult::failed();
            }
        };

        let estimated_cost = self.settings.estimate_cost(completion.total_tokens);

        tracing::info!("⏱️ API response time: {:.2} seconds", elapsed);
        tracing::info!(
            "🔢 Tokens used: {}, estimated cost: ${:.5}",
            completion.total_tokens,
            estimated_cost
        );
        if let Some(tracker) = tracker {
            tracker.record(completion.total_tokens, estimated_cost);
            tracing::info!("💰 Running total cost: ${:.5}", tracker.total_cost);
        }

        GenerationResult {
            text: completion.text,
            elapsed_secs: Some(elapsed),
            tokens_used: Some(completion.total_tokens),
            estimated_cost: Some(estimated_cost),
        }
    }

    fn company_label<'a>(&self, record: &'a CompanyRecord) -> &'a str {
        match self.renderer.company(record) {
            "" => "Unknown",
            name => name,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Completion;
    use crate::domain::model::fields;
    use crate::utils::error::{OutreachError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedGenerator {
        total_tokens: u64,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            Ok(Completion {
                text: "Subject: Hello\n\nBody".to_string(),
                prompt_tokens: self.total_tokens / 2,
                completion_tokens: self.total_tokens - self.total_tokens / 2,
                total_tokens: self.total_tokens,
            })
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn complete(&self, _request: &CompletionRequest) -> Result<Completion> {
            Err(OutreachError::GenerationError {
                message: "HTTP 503: unavailable".to_string(),
            })
        }
    }

    fn record() -> CompanyRecord {
        CompanyRecord::new().with(fields::COMPANY, "Acme")
    }

    #[tokio::test]
    async fn test_success_computes_linear_cost_and_updates_tracker() {
        let client = FixedGenerator {
            total_tokens: 1500,
            prompts: Mutex::new(Vec::new()),
        };
        let settings = GenerationSettings {
            cost_per_1k_tokens: 0.002,
            ..GenerationSettings::default()
        };
        let generator = EmailGenerator::new(client, PromptRenderer::default(), settings);
        let mut tracker = CostTracker::new();

        let result = generator
            .generate(&record(), PromptVariant::Base, Some(&mut tracker))
            .await;

        assert!(result.is_success());
        assert_eq!(result.text, "Subject: Hello\n\nBody");
        assert_eq!(result.tokens_used, Some(1500));
        assert_eq!(result.estimated_cost, Some(1500.0 / 1000.0 * 0.002));
        assert!(result.elapsed_secs.unwrap() >= 0.0);
        assert_eq!(tracker.total_tokens, 1500);
        assert_eq!(tracker.total_cost, 1500.0 / 1000.0 * 0.002);
    }

    #[tokio::test]
    async fn test_sends_rendered_prompt_for_variant() {
        let client = FixedGenerator {
            total_tokens: 10,
            prompts: Mutex::new(Vec::new()),
        };
        let generator =
            EmailGenerator::new(client, PromptRenderer::default(), GenerationSettings::default());

        generator
            .generate(&record(), PromptVariant::BasePlusCrm, None)
            .await;

        let prompts = generator.client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(
            prompts[0],
            PromptRenderer::default().render(&record(), PromptVariant::BasePlusCrm)
        );
    }

    #[tokio::test]
    async fn test_identity_field_reaches_rendered_prompt() {
        let client = FixedGenerator {
            total_tokens: 10,
            prompts: Mutex::new(Vec::new()),
        };
        let generator =
            EmailGenerator::new(client, PromptRenderer::default(), GenerationSettings::default())
                .with_identity_field("Account");
        let record = CompanyRecord::new().with("Account", "Umbrella");

        generator.generate(&record, PromptVariant::Base, None).await;

        assert_eq!(generator.company_label(&record), "Umbrella");
        let prompts = generator.client.prompts.lock().unwrap();
        assert!(prompts[0].contains("cold outreach email to Umbrella."));
    }

    #[tokio::test]
    async fn test_failure_returns_empty_result_and_leaves_tracker_untouched() {
        let generator = EmailGenerator::new(
            FailingGenerator,
            PromptRenderer::default(),
            GenerationSettings::default(),
        );
        let mut tracker = CostTracker {
            total_tokens: 42,
            total_cost: 0.5,
        };

        let result = generator
            .generate(&record(), PromptVariant::Base, Some(&mut tracker))
            .await;

        assert_eq!(result, GenerationResult::failed());
        assert!(result.text.is_empty());
        assert!(result.elapsed_secs.is_none());
        assert!(result.tokens_used.is_none());
        assert!(result.estimated_cost.is_none());
        assert_eq!(tracker.total_tokens, 42);
        assert_eq!(tracker.total_cost, 0.5);
    }
}
