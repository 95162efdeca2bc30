use regex::Regex;
use std::sync::Mutex;
use std::time::SystemTime;

/// Labels some models prepend to their output; stripped from the answer text.
const LABELS: [&str; 4] = ["Here's a suggestion:", "Suggestion:", "Paragraph:", "Answer:"];

/// Generic talking points used when the raw text contains no bullet lines.
const FALLBACK_TALKING_POINTS: [&str; 5] = [
    "Break down the key components of the question",
    "Share relevant experience and examples",
    "Explain your thought process and approach",
    "Discuss potential challenges and solutions",
    "Highlight the impact and outcomes",
];

/// Stand-in answer when the cleaned text is too short to present on its own.
const SHORT_ANSWER_FILLER: &str = "I would approach this by first understanding the core \
     requirements, then developing a structured solution that addresses the key concerns \
     while maintaining flexibility for future needs. Let me walk you through my thinking...";

const DEFAULT_QUESTION: &str = "How would you handle this situation?";

/// A parsed suggestion, ready for display. Built once per emission; immutable.
#[derive(Debug, Clone)]
pub struct SuggestionRecord {
    pub question: String,
    pub talking_points: Vec<String>,
    pub answer: String,
    pub timestamp: SystemTime,
    pub raw: String,
}

impl SuggestionRecord {
    /// Parse raw generated text into question / talking points / answer.
    ///
    /// Lines starting with `•`, `-`, `*`, or `N.` become talking points;
    /// the rest, minus known labels, becomes the answer. Without any bullet
    /// lines a fixed fallback set is used and the whole cleaned text (or a
    /// filler sentence when it is 50 chars or shorter) becomes the answer.
    pub fn parse(raw: &str, question_hint: Option<&str>) -> Self {
        let numbered = Regex::new(r"^\d+\.").unwrap();
        let lines: Vec<&str> = raw.split('\n').filter(|l| !l.is_empty()).collect();

        let question = match question_hint.map(str::trim).filter(|h| !h.is_empty()) {
            Some(hint) => hint.to_string(),
            None => lines
                .iter()
                .find(|l| l.contains('?') || l.to_lowercase().contains("question"))
                .map(|l| l.trim().to_string())
                .unwrap_or_else(|| DEFAULT_QUESTION.to_string()),
        };

        let mut bullets: Vec<&str> = Vec::new();
        let mut body: Vec<&str> = Vec::new();
        for line in &lines {
            let t = line.trim();
            if t.starts_with('•')
                || t.starts_with('-')
                || t.starts_with('*')
                || numbered.is_match(t)
            {
                bullets.push(line);
            } else {
                body.push(line);
            }
        }

        if bullets.is_empty() {
            let cleaned = strip_labels(raw).trim().to_string();
            let answer = if cleaned.chars().count() > 50 {
                cleaned
            } else {
                SHORT_ANSWER_FILLER.to_string()
            };
            Self {
                question,
                talking_points: FALLBACK_TALKING_POINTS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                answer,
                timestamp: SystemTime::now(),
                raw: raw.to_string(),
            }
        } else {
            let talking_points = bullets
                .iter()
                .map(|l| {
                    l.trim()
                        .trim_start_matches(['•', '-', '*'])
                        .trim()
                        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.')
                        .trim()
                        .to_string()
                })
                .collect();
            let answer = strip_labels(&body.join("\n")).trim().to_string();
            Self {
                question,
                talking_points,
                answer,
                timestamp: SystemTime::now(),
                raw: raw.to_string(),
            }
        }
    }
}

fn strip_labels(text: &str) -> String {
    let mut out = text.to_string();
    for label in LABELS {
        out = out.replace(label, "");
    }
    out
}

/// Take-once cell carrying the question a forced generation was asked about.
///
/// The composition root primes it right before forcing; the consumer takes
/// it while parsing the resulting suggestion. A take clears the cell, so a
/// stale hint can never attach to a later ambient emission.
#[derive(Debug, Default)]
pub struct QuestionHint {
    inner: Mutex<Option<String>>,
}

impl QuestionHint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prime(&self, text: impl Into<String>) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = Some(text.into());
        }
    }

    pub fn take(&self) -> Option<String> {
        self.inner.lock().ok().and_then(|mut slot| slot.take())
    }
}
