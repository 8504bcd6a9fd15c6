//! Heuristic annotation of raw analysis text
//!
//! Best-effort text mining over a model's reply: bullets, numbered
//! recommendations, citations, risk sentences and a confidence label.
//! Output is lossy and never authoritative; the raw text is kept verbatim
//! next to it. Nothing here fails: unmatched text yields empty lists.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const MAX_KEY_POINTS: usize = 10;
const MAX_RECOMMENDATIONS: usize = 5;
const MAX_CITATIONS: usize = 10;
const MAX_RISKS: usize = 5;

const ASSERTIVE_MARKERS: &[&str] = &["clearly", "certainly", "definitely", "strong", "compelling"];
const HEDGING_MARKERS: &[&str] = &["uncertain", "unclear", "questionable", "weak", "difficult"];

/// Heuristic confidence label
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

/// Everything extracted from one reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    pub key_points: Vec<String>,
    pub recommendations: Vec<String>,
    pub citations: Vec<String>,
    pub risks: Vec<String>,
    pub confidence: Confidence,
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-•*]\s*(.+)$").expect("valid bullet pattern"))
}

fn numbered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\s*(.+)$").expect("valid numbered pattern"))
}

fn citation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"\[([^\]]+)\]",
            r"|(\d+\s+N\.Y\.\d+\w*(?:\s+\d+)?)",
            r"|(\w+\s+v\.\s+\w+,\s+\d+)",
            r"|(CPL\s+§?\s*\d+(?:\.\d+)*)",
            r"|(§\s*\d+(?:[.\-]\d+)*)",
        ))
        .expect("valid citation pattern")
    })
}

fn risk_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:risk|danger|weakness|vulnerable|problem|issue|concern)[:\s]+([^.]+\.)")
            .expect("valid risk pattern")
    })
}

/// Annotate one reply
pub fn annotate(text: &str) -> Annotations {
    Annotations {
        key_points: extract_key_points(text),
        recommendations: extract_recommendations(text),
        citations: extract_citations(text),
        risks: extract_risks(text),
        confidence: assess_confidence(text),
    }
}

/// Lines starting with `-`, `•` or `*`
pub fn extract_key_points(text: &str) -> Vec<String> {
    capture_lines(text, bullet_re(), MAX_KEY_POINTS)
}

/// Lines starting with `N.`
pub fn extract_recommendations(text: &str) -> Vec<String> {
    capture_lines(text, numbered_re(), MAX_RECOMMENDATIONS)
}

fn capture_lines(text: &str, re: &Regex, limit: usize) -> Vec<String> {
    text.lines()
        .filter_map(|line| re.captures(line.trim()))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .take(limit)
        .collect()
}

/// Bracketed tokens, reporter cites, `X v. Y, N` names and statute sections,
/// de-duplicated in first-seen order
pub fn extract_citations(text: &str) -> Vec<String> {
    let mut citations: Vec<String> = Vec::new();

    for caps in citation_re().captures_iter(text) {
        let Some(m) = (1..caps.len()).find_map(|i| caps.get(i)) else {
            continue;
        };
        let citation = m.as_str().trim().to_string();
        if citation.is_empty() || citations.contains(&citation) {
            continue;
        }
        citations.push(citation);
        if citations.len() == MAX_CITATIONS {
            break;
        }
    }

    citations
}

/// Sentences introduced by a risk word (`risk:`, `concern ...`)
pub fn extract_risks(text: &str) -> Vec<String> {
    risk_re()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| s.len() > 1)
        .take(MAX_RISKS)
        .collect()
}

/// Assertive language wins over hedging; neither is medium
pub fn assess_confidence(text: &str) -> Confidence {
    let lower = text.to_lowercase();
    if ASSERTIVE_MARKERS.iter().any(|m| lower.contains(m)) {
        Confidence::High
    } else if HEDGING_MARKERS.iter().any(|m| lower.contains(m)) {
        Confidence::Low
    } else {
        Confidence::Medium
    }
}
