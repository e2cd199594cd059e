use crate::models::{EvaluateResponse, EvaluationMetrics};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Output format options
#[derive(Debug, Clone, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Print an evaluation in the specified format
pub fn print_evaluation(evaluation: &EvaluateResponse, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print_plain(evaluation),
        OutputFormat::Json => print_json(evaluation),
    }
}

/// Print an evaluation in plain text format
fn print_plain(evaluation: &EvaluateResponse) {
    match render_plain(evaluation) {
        Ok(text) => print!("{}", text),
        Err(e) => eprintln!("Error formatting results: {}", e),
    }
}

/// Render an evaluation as plain text
fn render_plain(evaluation: &EvaluateResponse) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "Prompt: {}", evaluation.prompt)?;
    writeln!(out)?;

    if evaluation.results.is_empty() {
        writeln!(out, "No providers selected.")?;
        return Ok(out);
    }

    render_score_table(&mut out, evaluation)?;
    writeln!(out)?;

    writeln!(out, "📝 DETAILED RESULTS")?;
    writeln!(out, "-------------------")?;
    for (i, result) in evaluation.results.iter().enumerate() {
        writeln!(out, "Result #{} - {}", i + 1, result.llm_name)?;
        writeln!(out, "Response: {}", result.response)?;
        writeln!(out, "Notes: {}", result.metrics.notes)?;
        writeln!(out)?;
    }

    Ok(out)
}

/// One row of scores per provider
fn render_score_table(out: &mut String, evaluation: &EvaluateResponse) -> fmt::Result {
    writeln!(out, "📊 SCORES")?;
    writeln!(out, "---------")?;
    writeln!(
        out,
        "{:<20} {:<9} {:<10} {:<10} {:<12}",
        "Model", "Accuracy", "Relevancy", "Coherence", "Completeness"
    )?;
    writeln!(out, "{}", "-".repeat(65))?;

    for result in &evaluation.results {
        let EvaluationMetrics {
            accuracy,
            relevancy,
            coherence,
            completeness,
            ..
        } = result.metrics;
        writeln!(
            out,
            "{:<20} {:<9} {:<10} {:<10} {:<12}",
            result.llm_name, accuracy, relevancy, coherence, completeness
        )?;
    }

    Ok(())
}

/// Print an evaluation in JSON format
fn print_json(evaluation: &EvaluateResponse) {
    match serde_json::to_string_pretty(evaluation) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results to JSON: {}", e),
    }
}
