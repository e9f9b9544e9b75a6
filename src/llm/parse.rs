//! Parsing of model responses into analysis outcomes.

use crate::error::AnalysisError;
use crate::models::{normalize_symbol, AnalysisOutcome, AnalysisPayload};
use serde_json::Value;

/// Parse the text returned by a model.
///
/// Markdown fences and surrounding chatter are tolerated; the first
/// JSON object in the text is taken as the payload.
pub fn parse_analysis_response(text: &str) -> AnalysisOutcome {
    match extract_payload(text) {
        Ok(Some(payload)) => AnalysisOutcome::Success(payload),
        Ok(None) => AnalysisOutcome::NoSymbol,
        Err(e) => AnalysisOutcome::failure(e.to_string()),
    }
}

fn extract_payload(text: &str) -> Result<Option<AnalysisPayload>, AnalysisError> {
    let value = first_json_value(text)?;

    if !value.is_object() {
        return Err(AnalysisError::Malformed("payload is not an object".to_string()));
    }

    let symbol = match value["stock_symbol"].as_str().and_then(normalize_symbol) {
        Some(symbol) => symbol,
        None => return Ok(None),
    };

    let impact_strength = integer_field(&value["impact_strength"])
        .ok_or_else(|| AnalysisError::Malformed("missing impact_strength".to_string()))?;
    let confidence = float_field(&value["confidence"])
        .ok_or_else(|| AnalysisError::Malformed("missing confidence".to_string()))?;

    Ok(Some(AnalysisPayload {
        symbol,
        event_category: value["event_type"].as_str().unwrap_or("Other").to_string(),
        direction: value["direction"].as_str().unwrap_or("NEUTRAL").to_string(),
        impact_strength,
        confidence,
        rationale: value["rationale"].as_str().unwrap_or("").to_string(),
    }))
}

/// Deserialize the first JSON value that starts at the first `{`.
/// Anything after it is ignored.
fn first_json_value(text: &str) -> Result<Value, AnalysisError> {
    let start = text
        .find('{')
        .ok_or_else(|| AnalysisError::Malformed("no JSON object in response".to_string()))?;

    serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| AnalysisError::Malformed("no JSON object in response".to_string()))?
        .map_err(|e| AnalysisError::Malformed(e.to_string()))
}

fn integer_field(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

fn float_field(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
