use std::fmt;
use std::time::SystemTime;

/// Which capture path a frame or transcript came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    Mic,
    System,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Mic => "mic",
            SourceId::System => "system",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical audio block: mono, 16 kHz, samples in [-1, 1].
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub source: SourceId,
    pub samples: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct TranscriptEvent {
    pub source: SourceId,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SuggestionEvent {
    pub text: String,
    pub at: SystemTime,
}
