use crate::core::{CompanyRecord, PromptVariant};
use crate::domain::model::fields;

pub const DEFAULT_SENDER: &str = "Mirakl";

const WORD_LIMIT: usize = 180;

/// Builds the instruction text sent to the generation service. Rendering is
/// pure: the same record and variant always produce byte-identical output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRenderer {
    sender: String,
    identity_field: String,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_SENDER)
    }
}

impl PromptRenderer {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            identity_field: fields::COMPANY.to_string(),
        }
    }

    /// Column that holds the company name in the loaded sources.
    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = field.into();
        self
    }

    pub fn company<'a>(&self, record: &'a CompanyRecord) -> &'a str {
        record.get(&self.identity_field)
    }

    pub fn render(&self, record: &CompanyRecord, variant: PromptVariant) -> String {
        let company = self.company(record);
        let mut prompt = String::new();

        prompt.push_str(&format!("You are an AI sales assistant at {}.\n", self.sender));
        match variant {
            PromptVariant::Base => prompt.push_str(&format!(
                "Your role: write a personalized cold outreach email to {}.\n",
                company
            )),
            PromptVariant::BasePlusCrm => prompt.push_str(&format!(
                "Your role: write a personalized follow-up email to {} using both our market data and CRM insights.\n",
                company
            )),
        }
        prompt.push_str(&format!(
            "Keep it under {} words and include a compelling subject line and a short body.\n\n",
            WORD_LIMIT
        ));

        prompt.push_str(&format!("Context for {}:\n", company));
        self.push_market_context(&mut prompt, record);

        if variant == PromptVariant::BasePlusCrm {
            prompt.push_str("\nAdditional CRM context:\n");
            push_line(&mut prompt, "Contact Name", record.get(fields::CONTACT_NAME));
            push_line(&mut prompt, "Last Interaction", record.get(fields::LAST_INTERACTION));
            push_line(&mut prompt, "Email History", record.get(fields::EMAIL_HISTORY));
            push_line(&mut prompt, "Call Summary", record.get(fields::CALL_SUMMARY));
            push_line(&mut prompt, "Additional Notes", record.get(fields::ADDITIONAL_NOTES));
        }

        prompt.push('\n');
        prompt.push_str(&self.guidelines());
        prompt.push_str("\nHere is an example email for reference:\n");
        prompt.push_str(&self.example_email());
        prompt.push_str("\nNow craft YOUR new subject line and email body below:");
        prompt
    }

    fn push_market_context(&self, prompt: &mut String, record: &CompanyRecord) {
        push_line(prompt, "Annual online revenue", record.get(fields::REVENUE));
        push_line(prompt, "Countries/Markets", record.get(fields::COUNTRIES));
        push_line(
            prompt,
            "High-level strategy or areas of focus",
            record.get(fields::STRATEGY),
        );
        push_line(prompt, "Potential pain points", record.get(fields::PAIN_POINTS));
        push_line(
            prompt,
            &format!("{} products & use cases", self.sender),
            record.get(fields::PRODUCT_USE_CASES),
        );
    }

    fn guidelines(&self) -> String {
        format!(
            "Guidelines:\n\
             1. Write in a friendly, professional tone aligned with {}'s brand voice.\n\
             2. Provide a subject line first on a separate line, then the email body.\n\
             3. You can reference the sample format below, but make it unique to this company.\n\
             4. Remain concise and avoid bullet points.\n\
             5. Keep the email under {} words.\n",
            self.sender, WORD_LIMIT
        )
    }

    fn example_email(&self) -> String {
        format!(
            "SUBJECT: Driving Growth for ACME Inc.'s Global Expansion\n\
             \n\
             BODY:\n\
             Hi Mark,\n\
             \n\
             I noticed ACME Inc. is expanding into new markets this year. At {sender}, we've helped \
             companies like X and Y streamline their global e-commerce operations, so you can onboard \
             new sellers faster while keeping operational costs low.\n\
             \n\
             Given your strategy to expand to 3 new countries, I'd love to share how our technology \
             could address typical expansion pain points, from cross-border compliance to payment \
             solutions.\n\
             \n\
             If that sounds relevant, I'd be happy to schedule a brief 15-minute chat next week. \
             Looking forward to hearing from you!\n\
             \n\
             Best,\n\
             [Your Name]\n",
            sender = self.sender
        )
    }
}

fn push_line(prompt: &mut String, label: &str, value: &str) {
    prompt.push_str("- ");
    prompt.push_str(label);
    prompt.push_str(": ");
    prompt.push_str(value);
    prompt.push('\n');
}

/// Convenience wrapper over the default renderer.
pub fn render(record: &CompanyRecord, variant: PromptVariant) -> String {
    PromptRenderer::default().render(record, variant)
}

/// First `max_chars` characters of a prompt, for operator previews.
pub fn preview(prompt: &str, max_chars: usize) -> String {
    let mut chars = prompt.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
