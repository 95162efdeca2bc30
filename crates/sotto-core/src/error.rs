use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to enumerate devices: {0}")]
    DeviceEnumeration(String),

    #[error("failed to build stream: {0}")]
    StreamBuild(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("stream error: {0}")]
    StreamError(String),
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech backend not found: {0}")]
    BackendNotFound(String),

    #[error("failed to create session: {0}")]
    SessionCreate(String),

    #[error("failed to start session: {0}")]
    SessionStart(String),

    #[error("failed to stop session: {0}")]
    SessionStop(String),
}

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("suggestion client not found: {0}")]
    ClientNotFound(String),

    #[error("suggestion request failed: {0}")]
    RequestFailed(String),

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}
