pub mod client;
pub mod engine;
pub mod openai;
pub mod placeholder;

pub use client::{client_from_config, SuggestClient};
pub use engine::{SuggestEngine, SuggestLimits};
pub use openai::OpenAiClient;
pub use placeholder::PlaceholderClient;
