//! Tolerant parsing of the evaluation completion.
//!
//! The model is asked for strict JSON but may wrap it in prose or code fences.
//! Parsing never fails hard: anything unusable comes back as `EvaluationRecord::Unparsed`
//! with the original text attached.

use serde::Serialize;
use serde_json::{Map, Value};

const ERR_BAD_JSON: &str = "Failed to parse JSON";
const ERR_NO_JSON: &str = "Invalid response format";

/// The three fields the evaluation prompt asks for. Each may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    #[serde(rename = "JD Match")]
    pub jd_match: Option<String>,
    /// Model order, duplicates kept.
    #[serde(rename = "MissingKeywords")]
    pub missing_keywords: Vec<String>,
    #[serde(rename = "Profile Summary")]
    pub profile_summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EvaluationRecord {
    Parsed(Evaluation),
    Unparsed { error: String, raw: String },
}

impl Evaluation {
    fn from_object(object: &Map<String, Value>) -> Self {
        let jd_match = object.get("JD Match").and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        let missing_keywords = match object.get("MissingKeywords") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect(),
            Some(Value::String(joined)) => joined
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        };

        let profile_summary = object
            .get("Profile Summary")
            .and_then(|v| v.as_str())
            .map(String::from);

        Self {
            jd_match,
            missing_keywords,
            profile_summary,
        }
    }

    /// "83%" → 83, "83" → 83, "N/A" → None.
    pub fn match_percentage(&self) -> Option<u32> {
        normalize_percentage(self.jd_match.as_deref()?)
    }
}

impl EvaluationRecord {
    pub fn is_parsed(&self) -> bool {
        matches!(self, EvaluationRecord::Parsed(_))
    }

    pub fn match_percentage(&self) -> Option<u32> {
        match self {
            EvaluationRecord::Parsed(evaluation) => evaluation.match_percentage(),
            EvaluationRecord::Unparsed { .. } => None,
        }
    }
}

/// Parses the raw completion: whole text first, then the first balanced `{…}` span that
/// decodes to an object.
pub fn parse_evaluation(raw: &str) -> EvaluationRecord {
    if let Some(object) = parse_object(strip_json_fences(raw)) {
        return EvaluationRecord::Parsed(Evaluation::from_object(&object));
    }

    let spans = balanced_object_spans(raw);
    if let Some(object) = spans.iter().find_map(|span| parse_object(span)) {
        return EvaluationRecord::Parsed(Evaluation::from_object(&object));
    }

    let error = if spans.is_empty() {
        ERR_NO_JSON
    } else {
        ERR_BAD_JSON
    };
    EvaluationRecord::Unparsed {
        error: error.to_string(),
        raw: raw.to_string(),
    }
}

pub fn normalize_percentage(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    trimmed
        .strip_suffix('%')
        .unwrap_or(trimmed)
        .trim()
        .parse()
        .ok()
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Top-level balanced `{…}` spans, in order. Braces inside JSON strings
/// (including escaped quotes) do not count. An unclosed span yields nothing.
fn balanced_object_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, byte) in text.bytes().enumerate() {
        if depth == 0 {
            if byte == b'{' {
                depth = 1;
                start = i;
                in_string = false;
                escaped = false;
            }
            continue;
        }

        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(record: EvaluationRecord) -> Evaluation {
        match record {
            EvaluationRecord::Parsed(evaluation) => evaluation,
            other => panic!("expected parsed record, got {other:?}"),
        }
    }

    #[test]
    fn test_pure_json() {
        let raw = r#"{"JD Match":"72%","MissingKeywords":["Kubernetes","Go"],"Profile Summary":"X"}"#;
        let evaluation = parsed(parse_evaluation(raw));
        assert_eq!(evaluation.jd_match.as_deref(), Some("72%"));
        assert_eq!(evaluation.missing_keywords, vec!["Kubernetes", "Go"]);
        assert_eq!(evaluation.profile_summary.as_deref(), Some("X"));
    }

    #[test]
    fn test_json_embedded_in_prose() {
        let raw = "Here is the result:\n{\"JD Match\":\"50%\",\"MissingKeywords\":[],\"Profile Summary\":\"Y\"}\nThanks!";
        let evaluation = parsed(parse_evaluation(raw));
        assert_eq!(evaluation.jd_match.as_deref(), Some("50%"));
        assert!(evaluation.missing_keywords.is_empty());
        assert_eq!(evaluation.profile_summary.as_deref(), Some("Y"));
    }

    #[test]
    fn test_garbage_keeps_raw_exactly() {
        let raw = "  I'm sorry, I can't help with that.\n";
        match parse_evaluation(raw) {
            EvaluationRecord::Unparsed { error, raw: kept } => {
                assert_eq!(kept, raw);
                assert_eq!(error, ERR_NO_JSON);
            }
            other => panic!("expected unparsed, got {other:?}"),
        }
    }

    #[test]
    fn test_broken_braces_report_parse_failure() {
        let raw = "Result: {JD Match: 50%}";
        match parse_evaluation(raw) {
            EvaluationRecord::Unparsed { error, raw: kept } => {
                assert_eq!(error, ERR_BAD_JSON);
                assert_eq!(kept, raw);
            }
            other => panic!("expected unparsed, got {other:?}"),
        }
    }

    #[test]
    fn test_code_fenced_json() {
        let raw = "```json\n{\"JD Match\": \"64%\", \"MissingKeywords\": [\"SQL\"]}\n```";
        let evaluation = parsed(parse_evaluation(raw));
        assert_eq!(evaluation.jd_match.as_deref(), Some("64%"));
        assert_eq!(evaluation.missing_keywords, vec!["SQL"]);
        assert_eq!(evaluation.profile_summary, None);
    }

    #[test]
    fn test_braces_inside_strings_do_not_split_span() {
        let raw = r#"Sure! {"JD Match":"40%","MissingKeywords":["C{++}"],"Profile Summary":"uses \"}\" often"} and {"other":1}"#;
        let evaluation = parsed(parse_evaluation(raw));
        assert_eq!(evaluation.jd_match.as_deref(), Some("40%"));
        assert_eq!(evaluation.missing_keywords, vec!["C{++}"]);
        assert_eq!(evaluation.profile_summary.as_deref(), Some("uses \"}\" often"));
    }

    #[test]
    fn test_later_span_used_when_first_is_invalid() {
        let raw = r#"Template: {JD Match} Answer: {"JD Match":"90%"}"#;
        let evaluation = parsed(parse_evaluation(raw));
        assert_eq!(evaluation.jd_match.as_deref(), Some("90%"));
    }

    #[test]
    fn test_non_object_json_is_not_accepted_directly() {
        let raw = r#"[{"JD Match":"30%"}]"#;
        let evaluation = parsed(parse_evaluation(raw));
        assert_eq!(evaluation.jd_match.as_deref(), Some("30%"));

        assert!(!parse_evaluation("42").is_parsed());
    }

    #[test]
    fn test_missing_and_malformed_fields_tolerated() {
        let evaluation = parsed(parse_evaluation(
            r#"{"JD Match": 83, "MissingKeywords": ["Go", 7, "Go"], "Profile Summary": null}"#,
        ));
        assert_eq!(evaluation.jd_match.as_deref(), Some("83"));
        assert_eq!(evaluation.missing_keywords, vec!["Go", "Go"]);
        assert_eq!(evaluation.profile_summary, None);

        let empty = parsed(parse_evaluation("{}"));
        assert_eq!(empty, Evaluation::default());
    }

    #[test]
    fn test_comma_joined_keywords_string() {
        let evaluation = parsed(parse_evaluation(
            r#"{"MissingKeywords": "Terraform, AWS ,  , Helm"}"#,
        ));
        assert_eq!(evaluation.missing_keywords, vec!["Terraform", "AWS", "Helm"]);
    }

    #[test]
    fn test_percentage_normalization() {
        assert_eq!(normalize_percentage("83%"), Some(83));
        assert_eq!(normalize_percentage("83"), Some(83));
        assert_eq!(normalize_percentage(" 83 % "), Some(83));
        assert_eq!(normalize_percentage("N/A"), None);
        assert_eq!(normalize_percentage("%"), None);
    }

    #[test]
    fn test_record_match_percentage() {
        let record = parse_evaluation(r#"{"JD Match":"N/A"}"#);
        assert!(record.is_parsed());
        assert_eq!(record.match_percentage(), None);
        assert_eq!(parse_evaluation("nope").match_percentage(), None);
        assert_eq!(
            parse_evaluation(r#"{"JD Match":"72%"}"#).match_percentage(),
            Some(72)
        );
    }

    #[test]
    fn test_serializes_with_wire_field_names() {
        let record = parse_evaluation(
            r#"{"JD Match":"72%","MissingKeywords":["Go"],"Profile Summary":"X"}"#,
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["JD Match"], "72%");
        assert_eq!(value["MissingKeywords"][0], "Go");
        assert_eq!(value["Profile Summary"], "X");

        let failed = serde_json::to_value(parse_evaluation("nope")).unwrap();
        assert_eq!(failed["error"], ERR_NO_JSON);
        assert_eq!(failed["raw"], "nope");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_unclosed_span_yields_nothing() {
        assert!(balanced_object_spans("{\"a\": {\"b\": 1}").is_empty());
    }
}
