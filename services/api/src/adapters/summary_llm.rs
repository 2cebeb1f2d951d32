//! services/api/src/adapters/summary_llm.rs
//!
//! This module contains the adapter for the summary-generating LLM.
//! It implements the `SummaryGenerationService` port from the `core` crate.

use async_openai::types::chat::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use coursewise_core::{
    domain::{Language, PromptFeature, Summary, SummaryStyle},
    ports::{PortError, PortResult, SummaryGenerationService},
};

use crate::adapters::llm::LlmContext;

const DEFAULT_SUMMARY_PROMPT: &str = r#"You are a study assistant summarizing course notes for a student.

Produce a well-structured markdown summary of the provided content:
- Open with a one-paragraph overview of what the material covers.
- Follow with the key concepts, each explained in a sentence or two.
- Close with the points most likely to appear on an exam.

Do not invent facts that are not in the content. Respond with the summary
text only, no preamble and no closing remarks."#;

fn style_directive(style: SummaryStyle) -> &'static str {
    match style {
        SummaryStyle::Casual => {
            "Write in a casual, conversational register, as if explaining to a friend. \
             Contractions and light humor are fine."
        }
        SummaryStyle::Academic => {
            "Write in a formal academic register with precise terminology, \
             suitable for inclusion in lecture notes."
        }
        SummaryStyle::Basic => {
            "Write in plain, simple language a beginner can follow. Short \
             sentences, no jargon without a one-line definition."
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SummaryGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiSummaryAdapter {
    llm: LlmContext,
}

impl OpenAiSummaryAdapter {
    /// Creates a new `OpenAiSummaryAdapter`.
    pub fn new(llm: LlmContext) -> Self {
        Self { llm }
    }
}

//=========================================================================================
// `SummaryGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SummaryGenerationService for OpenAiSummaryAdapter {
    /// Generates one summary of `content` in the requested style and language.
    /// Single attempt, no retry; the response text is used verbatim as markdown.
    async fn generate_summary(
        &self,
        content: &str,
        style: SummaryStyle,
        language: Language,
    ) -> PortResult<Summary> {
        let resolved = self.llm.resolve().await?;

        let template = resolved
            .settings
            .prompt_override(PromptFeature::Summary, style.as_str())
            .unwrap_or(DEFAULT_SUMMARY_PROMPT);
        let system_prompt = format!(
            "{}\n\n{}\nRespond in {}.",
            template,
            style_directive(style),
            language.prompt_name()
        );

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(content.to_string())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&resolved.model)
            .messages(messages)
            .temperature(0.7)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = resolved
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Extract the text content from the first choice in the response.
        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(text) = choice.message.content {
                Ok(Summary {
                    content: text,
                    style,
                    language,
                })
            } else {
                Err(PortError::Unexpected(
                    "Summary LLM response contained no text content.".to_string(),
                ))
            }
        } else {
            Err(PortError::Unexpected(
                "Summary LLM returned no choices in its response.".to_string(),
            ))
        }
    }
}
