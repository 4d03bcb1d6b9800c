//! JSON Schema checks for gateway output.

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde_json::Value;

pub const ANALYSIS_OUTPUT_SCHEMA: &str = include_str!("../../schemas/analysis_output.schema.json");
pub const SYNTHESIS_OUTPUT_SCHEMA: &str =
    include_str!("../../schemas/synthesis_output.schema.json");

/// Validate `instance` against a schema given as JSON text (Draft 2020-12).
pub fn validate_against(schema_text: &str, instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(schema_text).context("parse json schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile json schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("schema validation failed:\n- {}", messages.join("\n- "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_solved_analysis() {
        let value = json!({
            "hasKnowledgeGaps": false,
            "reasoning": "known",
            "analysisConfidence": 90,
            "subGoals": [],
            "directSolution": "X"
        });
        validate_against(ANALYSIS_OUTPUT_SCHEMA, &value).expect("valid");
    }

    #[test]
    fn rejects_analysis_missing_fields() {
        let value = json!({ "hasKnowledgeGaps": true });
        let err = validate_against(ANALYSIS_OUTPUT_SCHEMA, &value).expect_err("invalid");
        assert!(err.to_string().contains("schema validation failed"));
    }

    #[test]
    fn synthesis_requires_summary_string() {
        validate_against(SYNTHESIS_OUTPUT_SCHEMA, &json!({ "summary": "s" })).expect("valid");
        assert!(validate_against(SYNTHESIS_OUTPUT_SCHEMA, &json!({ "summary": 3 })).is_err());
    }
}
