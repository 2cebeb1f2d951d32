//! services/api/src/adapters/quiz_llm.rs
//!
//! This module contains the adapter for the quiz-generating LLM.
//! It implements the `QuizGenerationService` port from the `core` crate.
//!
//! The model is asked for a bare JSON array, but its output is treated as
//! untrusted: the first balanced `[...]` substring is extracted from the
//! free text, parsed, and shape-validated before any domain `Question` is
//! constructed.

use async_openai::types::chat::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use coursewise_core::{
    domain::{Difficulty, Language, PromptFeature, Question, OPTIONS_PER_QUESTION},
    ports::{PortError, PortResult, QuizGenerationService},
};
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::adapters::llm::{LlmContext, ResolvedLlm};

const DEFAULT_QUIZ_PROMPT: &str = r#"You are a quiz author creating multiple-choice questions from course notes.

Output a JSON array and NOTHING else: no prose, no markdown fences, no keys
outside the array. Each element must have exactly this shape:

{
  "id": 1,
  "text": "the question",
  "options": ["option A", "option B", "option C", "option D"],
  "correct_answer": 0,
  "explanation": "one or two sentences on why the correct option is right"
}

Rules:
- Exactly 4 options per question.
- "correct_answer" is the zero-based index of the right option.
- Ground every question in the provided content; do not test outside knowledge.
- Vary which index holds the correct option."#;

fn difficulty_directive(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => {
            "Ask easy recall questions: definitions and directly stated facts."
        }
        Difficulty::Medium => {
            "Ask medium questions that require connecting two ideas from the content."
        }
        Difficulty::Hard => {
            "Ask hard questions that require applying the material to a new case \
             or spotting a subtle distinction."
        }
    }
}

//=========================================================================================
// Response Parsing and Validation
//=========================================================================================

/// The shape one generated question must deserialize into.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    id: Option<u32>,
    #[serde(alias = "question")]
    text: String,
    options: Vec<String>,
    #[serde(alias = "correctAnswer")]
    correct_answer: usize,
    explanation: Option<String>,
}

/// Strips markdown code fences so a fenced array still parses.
fn strip_code_fences(text: &str) -> String {
    let fence = Regex::new(r"```[a-zA-Z]*").unwrap();
    fence.replace_all(text, "").to_string()
}

/// Extracts the first balanced `[...]` substring from free text, skipping
/// brackets inside JSON string literals.
fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'[' if !in_string => depth += 1,
            b']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses and validates a raw model response into domain questions.
/// Any shape violation produces a typed error carrying the detail.
fn parse_questions(raw_response: &str, difficulty: Difficulty) -> PortResult<Vec<Question>> {
    let cleaned = strip_code_fences(raw_response);
    let array_text = extract_json_array(&cleaned).ok_or_else(|| {
        PortError::InvalidResponse("response contains no JSON array".to_string())
    })?;

    let raw_questions: Vec<RawQuestion> = serde_json::from_str(array_text)
        .map_err(|e| PortError::InvalidResponse(format!("JSON array failed to parse: {}", e)))?;

    if raw_questions.is_empty() {
        return Err(PortError::InvalidResponse(
            "response contains an empty question array".to_string(),
        ));
    }

    let mut questions = Vec::with_capacity(raw_questions.len());
    for (index, raw) in raw_questions.into_iter().enumerate() {
        if raw.options.len() != OPTIONS_PER_QUESTION {
            return Err(PortError::InvalidResponse(format!(
                "question {} has {} options, expected {}",
                index + 1,
                raw.options.len(),
                OPTIONS_PER_QUESTION
            )));
        }
        if raw.correct_answer >= raw.options.len() {
            return Err(PortError::InvalidResponse(format!(
                "question {} has correct_answer {} out of range",
                index + 1,
                raw.correct_answer
            )));
        }
        questions.push(Question {
            id: raw.id.unwrap_or(index as u32 + 1),
            text: raw.text,
            options: raw.options,
            correct_answer: raw.correct_answer,
            difficulty,
            explanation: raw.explanation,
        });
    }
    Ok(questions)
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `QuizGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiQuizAdapter {
    llm: LlmContext,
}

impl OpenAiQuizAdapter {
    /// Creates a new `OpenAiQuizAdapter`.
    pub fn new(llm: LlmContext) -> Self {
        Self { llm }
    }

    /// Issues one chat completion and returns the raw response text.
    async fn complete(
        &self,
        resolved: &ResolvedLlm,
        system_prompt: String,
        user_content: String,
    ) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_content)
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

        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(text) = choice.message.content {
                Ok(text)
            } else {
                Err(PortError::Unexpected(
                    "Quiz LLM response contained no text content.".to_string(),
                ))
            }
        } else {
            Err(PortError::Unexpected(
                "Quiz LLM returned no choices in its response.".to_string(),
            ))
        }
    }
}

//=========================================================================================
// `QuizGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuizGenerationService for OpenAiQuizAdapter {
    /// Generates `count` questions at one difficulty. Single attempt; a
    /// malformed response fails with the validation detail and the raw
    /// response text only in the log.
    async fn generate_questions(
        &self,
        content: &str,
        difficulty: Difficulty,
        count: usize,
        language: Language,
    ) -> PortResult<Vec<Question>> {
        let resolved = self.llm.resolve().await?;
        let template = resolved
            .settings
            .prompt_override(PromptFeature::Quiz, difficulty.as_str())
            .unwrap_or(DEFAULT_QUIZ_PROMPT);

        let system_prompt = format!(
            "{}\n\n{}\nProduce exactly {} questions. Write all question text, \
             options and explanations in {}.",
            template,
            difficulty_directive(difficulty),
            count,
            language.prompt_name()
        );

        let raw = self
            .complete(&resolved, system_prompt, content.to_string())
            .await?;

        parse_questions(&raw, difficulty).map_err(|e| {
            warn!(
                "Quiz generation response failed validation ({}). Raw response: {}",
                e, raw
            );
            e
        })
    }

    /// Explains why `selected_option` is wrong for `question`. The returned
    /// text is for display only and never replaces the stored explanation.
    async fn evaluate_answer(
        &self,
        question: &Question,
        selected_option: usize,
        language: Language,
    ) -> PortResult<String> {
        let resolved = self.llm.resolve().await?;
        let template = resolved
            .settings
            .prompt_override(PromptFeature::Evaluation, "default")
            .unwrap_or(
                "You are a tutor reviewing a student's wrong answer to a \
                 multiple-choice question. Explain briefly why their choice is \
                 incorrect and why the correct option is right. Be encouraging \
                 and concrete; two to four sentences.",
            );
        let system_prompt = format!("{}\nRespond in {}.", template, language.prompt_name());

        let options = question
            .options
            .iter()
            .enumerate()
            .map(|(i, opt)| format!("{}. {}", i + 1, opt))
            .collect::<Vec<_>>()
            .join("\n");
        let user_content = format!(
            "QUESTION: {}\n\nOPTIONS:\n{}\n\nThe student chose option {}. The correct option is {}.",
            question.text,
            options,
            selected_option + 1,
            question.correct_answer + 1
        );

        self.complete(&resolved, system_prompt, user_content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_ARRAY: &str = r#"[
        {"id": 1, "text": "What is 2+2?", "options": ["3", "4", "5", "6"],
         "correct_answer": 1, "explanation": "Basic arithmetic."}
    ]"#;

    #[test]
    fn parses_a_bare_json_array() {
        let questions = parse_questions(VALID_ARRAY, Difficulty::Easy).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_answer, 1);
        assert_eq!(questions[0].difficulty, Difficulty::Easy);
    }

    #[test]
    fn parses_an_array_wrapped_in_prose_and_fences() {
        let raw = format!(
            "Sure! Here are your questions:\n```json\n{}\n```\nGood luck!",
            VALID_ARRAY
        );
        let questions = parse_questions(&raw, Difficulty::Medium).unwrap();
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn brackets_inside_strings_do_not_confuse_extraction() {
        let raw = r#"[{"id": 1, "text": "Which list is [1, 2]?", "options":
            ["[1]", "[1, 2]", "[2]", "[]"], "correct_answer": 1}]"#;
        let questions = parse_questions(raw, Difficulty::Hard).unwrap();
        assert_eq!(questions[0].options[1], "[1, 2]");
    }

    #[test]
    fn missing_array_is_a_typed_error() {
        let err = parse_questions("I could not generate questions.", Difficulty::Easy)
            .unwrap_err();
        assert!(matches!(err, PortError::InvalidResponse(_)));
    }

    #[test]
    fn wrong_option_count_is_rejected_with_detail() {
        let raw = r#"[{"text": "q", "options": ["a", "b"], "correct_answer": 0}]"#;
        match parse_questions(raw, Difficulty::Easy) {
            Err(PortError::InvalidResponse(detail)) => {
                assert!(detail.contains("2 options"));
            }
            other => panic!("expected InvalidResponse, got {:?}", other),
        }
    }

    #[test]
    fn out_of_range_correct_answer_is_rejected() {
        let raw = r#"[{"text": "q", "options": ["a", "b", "c", "d"], "correct_answer": 4}]"#;
        match parse_questions(raw, Difficulty::Easy) {
            Err(PortError::InvalidResponse(detail)) => {
                assert!(detail.contains("out of range"));
            }
            other => panic!("expected InvalidResponse, got {:?}", other),
        }
    }

    #[test]
    fn question_ids_fall_back_to_position() {
        let raw = r#"[
            {"text": "a", "options": ["a","b","c","d"], "correct_answer": 0},
            {"text": "b", "options": ["a","b","c","d"], "correct_answer": 1}
        ]"#;
        let questions = parse_questions(raw, Difficulty::Easy).unwrap();
        assert_eq!(questions[0].id, 1);
        assert_eq!(questions[1].id, 2);
    }
}
