use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Headline numbers, already formatted for display by the model
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_invested: String,
    pub final_value: String,
    pub profit: String,
    pub profit_is_positive: bool,
    pub roi: String,
    pub cagr: String,
}

/// One point on the reconstructed investment curve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: String,
    pub invested: f64,
    pub value: f64,
}

/// A fully validated model answer.
///
/// Fields are private and the only constructor is [`parse`], so holding one
/// means every field was present and well-typed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    summary: Summary,
    chart_data: Vec<ChartPoint>,
    analysis: String,
}

impl AnalysisResult {
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Never empty
    pub fn chart_data(&self) -> &[ChartPoint] {
        &self.chart_data
    }

    pub fn analysis(&self) -> &str {
        &self.analysis
    }

    /// Indexes `i` where `invested[i] < invested[i - 1]`.
    ///
    /// Principal should only accumulate; a regression is a data-quality
    /// problem in the model's answer, not a reason to reject it.
    pub fn principal_regressions(&self) -> Vec<usize> {
        self.chart_data
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[1].invested < w[0].invested)
            .map(|(i, _)| i + 1)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseErrorKind {
    /// Not well-formed JSON after fence stripping
    Syntax,
    /// Well-formed JSON of the wrong shape
    Schema,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::Syntax => write!(f, "syntax"),
            ParseErrorKind::Schema => write!(f, "schema"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind} error: {reason}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub reason: String,
    /// The text exactly as the model returned it
    pub raw: String,
}

/// Remove every ``` fence marker (with any language tag glued to it) and trim.
///
/// Purely textual: fences need not be balanced or wrap the whole payload.
pub fn strip_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '.')))
            .unwrap_or(rest.len());
        rest = &rest[tag_len..];
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Sanitize and validate model text into an [`AnalysisResult`].
///
/// All-or-nothing: no defaults, no coercion of numeric-looking strings.
pub fn parse(text: &str) -> Result<AnalysisResult, ParseError> {
    let cleaned = strip_fences(text);

    let value: Value = serde_json::from_str(&cleaned).map_err(|e| ParseError {
        kind: ParseErrorKind::Syntax,
        reason: e.to_string(),
        raw: text.to_string(),
    })?;

    validate(&value).map_err(|reason| ParseError {
        kind: ParseErrorKind::Schema,
        reason,
        raw: text.to_string(),
    })
}

fn validate(value: &Value) -> Result<AnalysisResult, String> {
    let root = as_object(value, "$")?;

    let summary_obj = as_object(required(root, "summary", "$")?, "summary")?;
    let summary = Summary {
        total_invested: string_field(summary_obj, "totalInvested", "summary")?,
        final_value: string_field(summary_obj, "finalValue", "summary")?,
        profit: string_field(summary_obj, "profit", "summary")?,
        profit_is_positive: bool_field(summary_obj, "profitIsPositive", "summary")?,
        roi: string_field(summary_obj, "roi", "summary")?,
        cagr: string_field(summary_obj, "cagr", "summary")?,
    };

    let points = match required(root, "chartData", "$")? {
        Value::Array(items) => items,
        other => return Err(format!("chartData: expected array, got {}", kind_of(other))),
    };
    if points.is_empty() {
        return Err("chartData: must contain at least one point".to_string());
    }
    let chart_data = points
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let path = format!("chartData[{i}]");
            let obj = as_object(item, &path)?;
            Ok(ChartPoint {
                date: string_field(obj, "date", &path)?,
                invested: number_field(obj, "invested", &path)?,
                value: number_field(obj, "value", &path)?,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    let analysis = string_field(root, "analysis", "$")?;
    if analysis.trim().is_empty() {
        return Err("analysis: must not be empty".to_string());
    }

    Ok(AnalysisResult { summary, chart_data, analysis })
}

fn required<'a>(obj: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Value, String> {
    obj.get(key).ok_or_else(|| format!("{path}: missing field `{key}`"))
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, String> {
    value
        .as_object()
        .ok_or_else(|| format!("{path}: expected object, got {}", kind_of(value)))
}

fn string_field(obj: &Map<String, Value>, key: &str, path: &str) -> Result<String, String> {
    match required(obj, key, path)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(format!("{path}.{key}: expected string, got {}", kind_of(other))),
    }
}

fn bool_field(obj: &Map<String, Value>, key: &str, path: &str) -> Result<bool, String> {
    match required(obj, key, path)? {
        Value::Bool(b) => Ok(*b),
        other => Err(format!("{path}.{key}: expected boolean, got {}", kind_of(other))),
    }
}

fn number_field(obj: &Map<String, Value>, key: &str, path: &str) -> Result<f64, String> {
    match required(obj, key, path)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("{path}.{key}: number out of range")),
        other => Err(format!("{path}.{key}: expected number, got {}", kind_of(other))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const VALID: &str = r#"{
        "summary": {
            "totalInvested": "12,000",
            "finalValue": "18,500",
            "profit": "6,500",
            "profitIsPositive": true,
            "roi": "54.2%",
            "cagr": "12.5%"
        },
        "chartData": [
            {"date": "2020-01", "invested": 1000, "value": 1000},
            {"date": "2020-02", "invested": 2000, "value": 2150.5}
        ],
        "analysis": "Steady uptrend with a sharp drawdown in March."
    }"#;

    fn valid_with(edit: impl FnOnce(&mut Value)) -> String {
        let mut v: Value = serde_json::from_str(VALID).unwrap();
        edit(&mut v);
        v.to_string()
    }

    fn schema_err(text: &str) -> ParseError {
        let err = parse(text).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Schema, "reason: {}", err.reason);
        err
    }

    #[test]
    fn test_parse_valid_payload() {
        let r = parse(VALID).unwrap();
        assert_eq!(r.summary().roi, "54.2%");
        assert!(r.summary().profit_is_positive);
        assert_eq!(r.chart_data().len(), 2);
        assert_eq!(r.chart_data()[1].value, 2150.5);
        assert!(r.analysis().starts_with("Steady"));
        assert!(r.principal_regressions().is_empty());
    }

    #[test]
    fn test_strip_fences_any_language() {
        assert_eq!(strip_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_fences("```JSON\n{}\n```"), "{}");
        assert_eq!(strip_fences("  ```\n[1]```  "), "[1]");
        // Unbalanced and mid-text fences are stripped too
        assert_eq!(strip_fences("```javascript\n{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_fences("{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("no fences"), "no fences");
    }

    #[test]
    fn test_fenced_payload_matches_unfenced() {
        let fenced = format!("```json\n{VALID}\n```");
        assert_eq!(parse(&fenced).unwrap(), parse(VALID).unwrap());
    }

    #[test]
    fn test_syntax_error_keeps_raw_text() {
        let raw = "```json\n{\"summary\": {oops}\n```";
        let err = parse(raw).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert_eq!(err.raw, raw);
    }

    #[test]
    fn test_prose_around_json_is_syntax_error() {
        let raw = format!("Here is your backtest:\n{VALID}");
        assert_eq!(parse(&raw).unwrap_err().kind, ParseErrorKind::Syntax);
    }

    #[test]
    fn test_empty_text_is_syntax_error() {
        assert_eq!(parse("").unwrap_err().kind, ParseErrorKind::Syntax);
        assert_eq!(parse("```\n```").unwrap_err().kind, ParseErrorKind::Syntax);
    }

    #[test]
    fn test_missing_top_level_fields() {
        for key in ["summary", "chartData", "analysis"] {
            let text = valid_with(|v| {
                v.as_object_mut().unwrap().remove(key);
            });
            let err = schema_err(&text);
            assert!(err.reason.contains(key), "{}", err.reason);
            assert_eq!(err.raw, text);
        }
    }

    #[test]
    fn test_missing_summary_field() {
        let text = valid_with(|v| {
            v["summary"].as_object_mut().unwrap().remove("cagr");
        });
        assert!(schema_err(&text).reason.contains("cagr"));
    }

    #[test]
    fn test_numeric_strings_are_not_coerced() {
        let text = valid_with(|v| v["chartData"][0]["invested"] = Value::from("1000"));
        let err = schema_err(&text);
        assert!(err.reason.contains("chartData[0].invested"), "{}", err.reason);

        let text = valid_with(|v| v["chartData"][1]["value"] = Value::from("2,150"));
        schema_err(&text);
    }

    #[test]
    fn test_summary_numbers_must_be_strings() {
        let text = valid_with(|v| v["summary"]["roi"] = Value::from(54.2));
        schema_err(&text);
        let text = valid_with(|v| v["summary"]["profitIsPositive"] = Value::from("true"));
        schema_err(&text);
    }

    #[test]
    fn test_empty_or_malformed_chart() {
        schema_err(&valid_with(|v| v["chartData"] = Value::Array(vec![])));
        schema_err(&valid_with(|v| v["chartData"] = Value::from("none")));
        schema_err(&valid_with(|v| {
            v["chartData"] = serde_json::json!([["2020-01", 1000, 1000]]);
        }));
        schema_err(&valid_with(|v| {
            v["chartData"][0].as_object_mut().unwrap().remove("date");
        }));
        schema_err(&valid_with(|v| v["chartData"][0]["value"] = Value::Null));
    }

    #[test]
    fn test_blank_analysis_rejected() {
        schema_err(&valid_with(|v| v["analysis"] = Value::from("   ")));
    }

    #[test]
    fn test_non_object_root_rejected() {
        schema_err("[1, 2, 3]");
        schema_err("\"just text\"");
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let text = valid_with(|v| v["currency"] = Value::from("USD"));
        assert_eq!(parse(&text).unwrap(), parse(VALID).unwrap());
    }

    #[test]
    fn test_principal_regressions_flagged_not_rejected() {
        let text = valid_with(|v| {
            v["chartData"] = serde_json::json!([
                {"date": "2020-01", "invested": 1000, "value": 1000},
                {"date": "2020-02", "invested": 2000, "value": 1900},
                {"date": "2020-03", "invested": 1500, "value": 1700},
            ]);
        });
        let r = parse(&text).unwrap();
        assert_eq!(r.principal_regressions(), vec![2]);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_fence_wrapping_does_not_change_result(
            lang in "[a-zA-Z]{0,10}",
            pad in "[ \n\t]{0,4}",
        ) {
            let fenced = format!("{pad}```{lang}\n{VALID}\n```{pad}");
            prop_assert_eq!(parse(&fenced), parse(VALID));
        }

        #[test]
        fn prop_parse_is_idempotent_on_sanitized_text(
            invested in proptest::collection::vec(0u32..1_000_000, 1..12),
        ) {
            let text = valid_with(|v| {
                v["chartData"] = invested
                    .iter()
                    .enumerate()
                    .map(|(i, x)| serde_json::json!({"date": format!("p{i}"), "invested": x, "value": x}))
                    .collect();
            });
            let sanitized = strip_fences(&format!("```json\n{text}\n```"));
            let first = parse(&sanitized).unwrap();
            prop_assert_eq!(&first, &parse(&sanitized).unwrap());
            prop_assert!(!first.chart_data().is_empty());
            prop_assert_eq!(first.chart_data().len(), invested.len());
        }
    }
}
