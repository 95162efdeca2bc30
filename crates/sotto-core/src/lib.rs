pub mod config;
pub mod error;
pub mod suggestion;
pub mod types;

pub use config::AppConfig;
pub use error::{AssistError, AudioError, ConfigError, SpeechError};
pub use suggestion::{QuestionHint, SuggestionRecord};
pub use types::{AudioFrame, SourceId, SuggestionEvent, TranscriptEvent};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_display() {
        assert_eq!(SourceId::Mic.to_string(), "mic");
        assert_eq!(SourceId::System.to_string(), "system");
    }

    #[test]
    fn test_audio_frame_creation() {
        let frame = AudioFrame {
            source: SourceId::Mic,
            samples: vec![0.0, 0.5, -0.5, 1.0],
        };
        assert_eq!(frame.source, SourceId::Mic);
        assert_eq!(frame.samples.len(), 4);
    }

    #[test]
    fn test_transcript_event_fields() {
        let event = TranscriptEvent {
            source: SourceId::System,
            text: "hello world".to_string(),
        };
        assert_eq!(event.source, SourceId::System);
        assert_eq!(event.text, "hello world");
    }
}
