//! Prompt text for combined symbol extraction and impact analysis.

use crate::models::truncate_chars;

const MAX_TITLE_CHARS: usize = 500;
const MAX_BODY_CHARS: usize = 2000;

/// System prompt shared by all providers.
pub const SYSTEM_PROMPT: &str = r#"You are a financial news analyst focused on intraday trading in Indian equities (NSE/BSE).
For each article you identify the single listed stock it affects most and judge its same-day price impact.
Be objective, ignore news that is already priced in, and never invent symbols without clear context.
Respond with ONLY a JSON object, no markdown and no extra text."#;

/// Build the user prompt for one item, capping title and body length.
///
/// Item text is inserted verbatim; braces in a headline are never
/// treated as placeholders.
pub fn analysis_prompt(title: &str, body: &str) -> String {
    let body = if body.trim().is_empty() { title } else { body };
    let title = truncate_chars(title, MAX_TITLE_CHARS);
    let body = truncate_chars(body, MAX_BODY_CHARS);

    format!(
        r#"Analyze this news article for intraday trading.

Title: {title}
Content: {body}

Return a JSON object with exactly these fields:
{{
  "stock_symbol": "<primary NSE/BSE symbol, or null if no listed stock is clearly affected>",
  "event_type": "Earnings|Order|Regulatory|Macro|Other",
  "direction": "BULLISH|BEARISH|NEUTRAL",
  "impact_strength": <integer 1-5, 5 = major catalyst (>3% move), 1 = negligible>,
  "confidence": <float 0.0-1.0>,
  "rationale": "<one line, at most 200 characters, facts from the article only>"
}}

Symbol rules: map company names to their exchange symbol (e.g. "Reliance Industries" -> "RELIANCE").
Indices (NIFTY, SENSEX), commodities and non-Indian listings are not symbols; use null.
"#
    )
}
