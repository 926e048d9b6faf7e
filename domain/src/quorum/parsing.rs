//! Verdict parsing for judge responses.
//!
//! These functions extract a structured decision from free-form model output.
//! They are pure domain logic with no I/O.
//!
//! # Extraction contract
//!
//! | Priority | Form | Example |
//! |----------|------|---------|
//! | 1 | Decision tag | `<decision>POSITIVE</decision>` |
//! | 2 | Decision line | `DECISION: NEGATIVE` |
//!
//! `POSITIVE`/`ACCEPT` map to [`Decision::Accept`], `NEGATIVE`/`REJECT` to
//! [`Decision::Reject`]. An optional `<confidence>0.8</confidence>` tag sets
//! the confidence. Anything else is unparseable and yields `None`; what that
//! means is a policy decision left to the caller.

use super::vote::Decision;
use regex::Regex;
use std::sync::LazyLock;

static DECISION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<decision>\s*([a-z]+)\s*</decision>").expect("valid decision regex")
});

static CONFIDENCE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<confidence>\s*([0-9]*\.?[0-9]+)\s*</confidence>")
        .expect("valid confidence regex")
});

/// A whole `DECISION: <literal>` line; the literal may be bracketed.
static DECISION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bdecision:\s*\[?\s*(positive|negative|accept|reject)\s*\]?\s*[.!]?\s*$")
        .expect("valid decision line regex")
});

static REASONING_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<reasoning>(.*?)</reasoning>").expect("valid reasoning regex")
});

/// Structured verdict extracted from a judge response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedVerdict {
    pub decision: Decision,
    pub confidence: Option<f64>,
    pub reasoning: String,
}

/// Map one decision literal (case-insensitive) to a [`Decision`].
pub fn parse_decision_literal(literal: &str) -> Option<Decision> {
    match literal.trim().to_uppercase().as_str() {
        "POSITIVE" | "ACCEPT" => Some(Decision::Accept),
        "NEGATIVE" | "REJECT" => Some(Decision::Reject),
        _ => None,
    }
}

/// Parse a judge response into a verdict.
///
/// Returns `None` when no recognizable decision is present, or when several
/// decision tags disagree.
pub fn parse_verdict(response: &str) -> Option<ParsedVerdict> {
    let (decision, remainder) = match decision_from_tags(response) {
        TagScan::Found(decision) => (decision, DECISION_TAG.replace_all(response, "").into_owned()),
        TagScan::Conflicting => return None,
        TagScan::Absent => decision_from_line(response)?,
    };

    let remainder = CONFIDENCE_TAG.replace_all(&remainder, "");
    let reasoning = REASONING_TAG
        .captures(&remainder)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| remainder.trim().to_string());

    Some(ParsedVerdict {
        decision,
        confidence: parse_confidence(response),
        reasoning,
    })
}

/// Parse an optional `<confidence>` tag, clamped to `[0, 1]`.
pub fn parse_confidence(response: &str) -> Option<f64> {
    CONFIDENCE_TAG
        .captures(response)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|v| v.clamp(0.0, 1.0))
}

enum TagScan {
    Found(Decision),
    Conflicting,
    Absent,
}

fn decision_from_tags(response: &str) -> TagScan {
    let mut found: Option<Decision> = None;
    for caps in DECISION_TAG.captures_iter(response) {
        let Some(decision) = caps.get(1).and_then(|m| parse_decision_literal(m.as_str())) else {
            continue;
        };
        match found {
            Some(existing) if existing != decision => return TagScan::Conflicting,
            _ => found = Some(decision),
        }
    }
    match found {
        Some(decision) => TagScan::Found(decision),
        None => TagScan::Absent,
    }
}

/// Fallback: a `DECISION: <literal>` line. The line is dropped from the reasoning.
fn decision_from_line(response: &str) -> Option<(Decision, String)> {
    let lines: Vec<&str> = response.lines().collect();
    for (index, line) in lines.iter().enumerate() {
        let Some(decision) = DECISION_LINE
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| parse_decision_literal(m.as_str()))
        else {
            continue;
        };
        let remainder = lines
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, l)| *l)
            .collect::<Vec<_>>()
            .join("\n");
        return Some((decision, remainder));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_tag_positive() {
        let verdict = parse_verdict("Looks fine.\n<decision>POSITIVE</decision>").unwrap();
        assert_eq!(verdict.decision, Decision::Accept);
        assert_eq!(verdict.reasoning, "Looks fine.");
    }

    #[test]
    fn test_decision_tag_is_case_insensitive() {
        let verdict = parse_verdict("<Decision> negative </Decision>").unwrap();
        assert_eq!(verdict.decision, Decision::Reject);
    }

    #[test]
    fn test_accept_reject_synonyms() {
        assert_eq!(parse_verdict("<decision>accept</decision>").unwrap().decision, Decision::Accept);
        assert_eq!(parse_verdict("<decision>REJECT</decision>").unwrap().decision, Decision::Reject);
    }

    #[test]
    fn test_reasoning_tag_preferred() {
        let response = "<inner_monologue>hmm</inner_monologue>\n<decision>NEGATIVE</decision>\n<reasoning>\nSQL injection risk.\n</reasoning>";
        let verdict = parse_verdict(response).unwrap();
        assert_eq!(verdict.reasoning, "SQL injection risk.");
    }

    #[test]
    fn test_decision_line_fallback() {
        let response = "The code is clean.\nDecision: POSITIVE\nGood job.";
        let verdict = parse_verdict(response).unwrap();
        assert_eq!(verdict.decision, Decision::Accept);
        assert_eq!(verdict.reasoning, "The code is clean.\nGood job.");
    }

    #[test]
    fn test_decision_line_with_brackets() {
        let verdict = parse_verdict("DECISION: [NEGATIVE]").unwrap();
        assert_eq!(verdict.decision, Decision::Reject);
    }

    #[test]
    fn test_missing_decision_is_none() {
        assert!(parse_verdict("I think this is probably fine.").is_none());
        assert!(parse_verdict("").is_none());
        assert!(parse_verdict("<decision>MAYBE</decision>").is_none());
    }

    #[test]
    fn test_conflicting_tags_are_none() {
        let response = "<decision>POSITIVE</decision> ... <decision>NEGATIVE</decision>";
        assert!(parse_verdict(response).is_none());
    }

    #[test]
    fn test_ambiguous_decision_line_is_none() {
        assert!(parse_verdict("Decision: POSITIVE or NEGATIVE").is_none());
    }

    #[test]
    fn test_decision_line_requires_whole_literal() {
        assert!(parse_verdict("The code leaks memory.\nDecision: Unacceptable").is_none());
        assert!(parse_verdict("Decision: NOT POSITIVE").is_none());
        assert!(parse_verdict("Decision: positively fine").is_none());
        assert!(parse_verdict("Decision: Rejected? no, accepted").is_none());
    }

    #[test]
    fn test_decision_line_tolerates_punctuation() {
        assert_eq!(parse_verdict("decision: accept.").unwrap().decision, Decision::Accept);
        assert_eq!(
            parse_verdict("Final DECISION:  [ reject ]  ").unwrap().decision,
            Decision::Reject
        );
    }

    #[test]
    fn test_confidence_tag() {
        let verdict = parse_verdict("<decision>POSITIVE</decision><confidence>0.75</confidence>").unwrap();
        assert_eq!(verdict.confidence, Some(0.75));
        assert_eq!(verdict.reasoning, "");
        assert_eq!(parse_confidence("<confidence>7</confidence>"), Some(1.0));
        assert_eq!(parse_confidence("no tag"), None);
    }
}
