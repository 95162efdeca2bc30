use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub assist: AssistConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    #[serde(default = "default_device_name")]
    pub mic_device: String,

    /// Device name for system-output loopback. `auto-monitor` picks the
    /// first input whose name looks like a monitor/loopback endpoint.
    #[serde(default = "default_system_device")]
    pub system_device: String,

    #[serde(default = "default_frame_channel_capacity")]
    pub frame_channel_capacity: usize,

    #[serde(default = "default_pcm_buffer_secs")]
    pub pcm_buffer_secs: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            mic_device: default_device_name(),
            system_device: default_system_device(),
            frame_channel_capacity: default_frame_channel_capacity(),
            pcm_buffer_secs: default_pcm_buffer_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_backend")]
    pub backend: String,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,

    #[serde(default = "default_pump_interval_ms")]
    pub pump_interval_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: default_speech_backend(),
            settle_ms: default_settle_ms(),
            stop_timeout_secs: default_stop_timeout_secs(),
            pump_interval_ms: default_pump_interval_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistConfig {
    #[serde(default = "default_assist_client")]
    pub client: String,

    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,

    #[serde(default = "default_snapshot_chars")]
    pub snapshot_chars: usize,

    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            client: default_assist_client(),
            min_chars: default_min_chars(),
            min_interval_secs: default_min_interval_secs(),
            snapshot_chars: default_snapshot_chars(),
            max_context_chars: default_max_context_chars(),
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_device_name() -> String {
    "default".to_string()
}

fn default_system_device() -> String {
    "auto-monitor".to_string()
}

fn default_frame_channel_capacity() -> usize {
    64
}

fn default_pcm_buffer_secs() -> u32 {
    2
}

fn default_speech_backend() -> String {
    "null".to_string()
}

fn default_settle_ms() -> u64 {
    100
}

fn default_stop_timeout_secs() -> u64 {
    5
}

fn default_pump_interval_ms() -> u64 {
    10
}

fn default_assist_client() -> String {
    "placeholder".to_string()
}

fn default_min_chars() -> usize {
    120
}

fn default_min_interval_secs() -> u64 {
    7
}

fn default_snapshot_chars() -> usize {
    2000
}

fn default_max_context_chars() -> usize {
    8000
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_system_prompt() -> String {
    "You are a real-time conversation copilot. Given a live transcript \
     snippet, reply with 2-5 crisp bullet points followed by a short \
     conversational paragraph the speaker could say next."
        .to_string()
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = errors.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let interpolated = interpolate_env_vars(&content)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (for testing).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }
}
