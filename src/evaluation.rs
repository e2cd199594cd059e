use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::error::AdapterError;
use crate::models::EvaluationMetrics;
use crate::providers::TextGenerator;

const SCORE_FIELDS: [&str; 4] = ["accuracy", "relevancy", "coherence", "completeness"];

/// Why a judge verdict could not be used; always absorbed into zeroed metrics
#[derive(Debug, Error)]
enum JudgeError {
    #[error("judge request failed: {0}")]
    Adapter(#[from] AdapterError),

    #[error("no JSON object found in judge output")]
    NoJson,

    #[error("judge output is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("judge output is not a JSON object")]
    NotAnObject,

    #[error("field `{0}` is missing or not a number")]
    InvalidScore(&'static str),

    #[error("field `notes` is missing or not a string")]
    InvalidNotes,
}

/// Scores a prompt/response pair with a judge model.
///
/// Total: every failure yields [`EvaluationMetrics::failed`] instead of an
/// error.
pub struct JudgeEvaluator {
    judge: Arc<dyn TextGenerator>,
    model: String,
}

impl JudgeEvaluator {
    pub fn new(judge: Arc<dyn TextGenerator>, model: impl Into<String>) -> Self {
        Self {
            judge,
            model: model.into(),
        }
    }

    /// Evaluate a response to a prompt
    pub async fn evaluate(&self, prompt: &str, response: &str) -> EvaluationMetrics {
        match self.try_evaluate(prompt, response).await {
            Ok(metrics) => metrics,
            Err(e) => {
                tracing::warn!(model = %self.model, error = %e, "judge evaluation failed");
                EvaluationMetrics::failed(e)
            }
        }
    }

    async fn try_evaluate(
        &self,
        prompt: &str,
        response: &str,
    ) -> Result<EvaluationMetrics, JudgeError> {
        let instruction = build_judge_prompt(prompt, response);
        let verdict = self.judge.generate(&self.model, &instruction).await?;
        parse_metrics(&verdict)
    }
}

/// Build the evaluation instruction sent as the judge's only message
fn build_judge_prompt(prompt: &str, response: &str) -> String {
    format!(
        r#"You are an impartial judge grading the answer an AI model gave to a prompt.

Original Prompt:
{prompt}

Response to Evaluate:
{response}

Score the response with an integer from 0 to 100 on each criterion:
- accuracy: factual correctness of the response
- relevancy: how directly it addresses the prompt
- coherence: clarity and logical flow
- completeness: whether every part of the prompt is answered

Reply with only a JSON object in exactly this shape and nothing else:
{{"accuracy": <integer>, "relevancy": <integer>, "coherence": <integer>, "completeness": <integer>, "notes": "<brief rationale>"}}"#
    )
}

/// Parse and validate judge output into metrics
fn parse_metrics(verdict: &str) -> Result<EvaluationMetrics, JudgeError> {
    let parsed = parse_json_response(verdict)?;
    let object = parsed.as_object().ok_or(JudgeError::NotAnObject)?;

    let [accuracy, relevancy, coherence, completeness] = [
        extract_score(object, SCORE_FIELDS[0])?,
        extract_score(object, SCORE_FIELDS[1])?,
        extract_score(object, SCORE_FIELDS[2])?,
        extract_score(object, SCORE_FIELDS[3])?,
    ];
    let notes = object
        .get("notes")
        .and_then(Value::as_str)
        .ok_or(JudgeError::InvalidNotes)?;

    Ok(EvaluationMetrics {
        accuracy,
        relevancy,
        coherence,
        completeness,
        notes: notes.to_string(),
    })
}

/// Parse JSON from the response, handling JSON embedded in prose or fences
fn parse_json_response(response: &str) -> Result<Value, JudgeError> {
    match serde_json::from_str(response) {
        Ok(parsed) => Ok(parsed),
        Err(_) => try_extract_embedded_json(response),
    }
}

fn try_extract_embedded_json(response: &str) -> Result<Value, JudgeError> {
    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(serde_json::from_str(&response[start..=end])?),
        _ => Err(JudgeError::NoJson),
    }
}

/// A score must be a JSON number; it is rounded and clamped into 0..=100
fn extract_score(object: &Map<String, Value>, field: &'static str) -> Result<u8, JudgeError> {
    let score = object
        .get(field)
        .and_then(Value::as_f64)
        .ok_or(JudgeError::InvalidScore(field))?;
    Ok(score.round().clamp(0.0, 100.0) as u8)
}
