use anyhow::{Context, Result};
use clap::Parser;
use sotto_core::{QuestionHint, SourceId, SuggestionRecord};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sotto", about = "Live conversation copilot for calls and interviews")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// List input capture devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_devices {
        let device_manager = sotto_audio::DeviceManager::new();
        let inputs = device_manager
            .list_input_devices()
            .context("failed to enumerate input devices")?;
        println!("Input devices:");
        for (name, _) in &inputs {
            println!("  - {}", name);
        }
        return Ok(());
    }

    let config = sotto_core::AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        );

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    tracing::info!("sotto starting");

    // ── Audio capture ─────────────────────────────────────────

    let device_manager = sotto_audio::DeviceManager::new();

    tracing::info!("using mic device: {}", config.audio.mic_device);
    let mic_device = device_manager
        .get_input_device(&config.audio.mic_device)
        .with_context(|| format!("failed to get mic device: {}", config.audio.mic_device))?;

    tracing::info!("using system audio device: {}", config.audio.system_device);
    let system_device = device_manager
        .get_loopback_device(&config.audio.system_device)
        .with_context(|| {
            format!(
                "failed to get system audio device: {}",
                config.audio.system_device
            )
        })?;

    let levels = sotto_audio::LevelBus::new();
    let (frame_tx, mut frame_rx) =
        tokio::sync::mpsc::channel(config.audio.frame_channel_capacity);

    let mut mic_capture = sotto_audio::CaptureSource::new(SourceId::Mic, mic_device);
    let mut system_capture = sotto_audio::CaptureSource::new(SourceId::System, system_device);
    mic_capture
        .start(frame_tx.clone(), levels.clone())
        .context("failed to start mic capture")?;
    system_capture
        .start(frame_tx.clone(), levels.clone())
        .context("failed to start system capture")?;
    // Captures hold the only remaining senders, so the forwarder below ends
    // once both streams are stopped.
    drop(frame_tx);

    // ── Speech sessions ───────────────────────────────────────

    let backend = sotto_speech::backend_from_config(&config.speech.backend)?;
    tracing::info!("speech backend '{}' active", backend.name());

    let pcm_capacity =
        config.audio.pcm_buffer_secs as usize * sotto_audio::TARGET_SAMPLE_RATE as usize * 2;
    let timing = sotto_speech::SessionTiming::from(&config.speech);
    let mut manager = sotto_speech::SessionManager::new(backend, timing, pcm_capacity);
    let mut transcripts = manager
        .take_transcript_receiver()
        .context("transcript receiver already taken")?;
    manager
        .start()
        .await
        .context("failed to start speech sessions")?;

    let push = manager.push_handle();
    tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            push.push_audio(frame.source, &frame.samples);
        }
    });

    // ── Suggestions ───────────────────────────────────────────

    let client = sotto_assist::client_from_config(&config.assist)?;
    tracing::info!("suggestion client '{}' active", client.name());

    let limits = sotto_assist::SuggestLimits::from(&config.assist);
    let mut engine = sotto_assist::SuggestEngine::new(client, limits);
    let mut suggestions = engine
        .take_event_receiver()
        .context("suggestion receiver already taken")?;
    let engine = Arc::new(engine);
    let question_hint = Arc::new(QuestionHint::new());

    let transcript_engine = Arc::clone(&engine);
    let transcript_hint = Arc::clone(&question_hint);
    tokio::spawn(async move {
        while let Some(event) = transcripts.recv().await {
            tracing::info!(source = %event.source, "heard: {}", event.text);
            // Remote questions prime the next suggestion's question line.
            if event.source == SourceId::System && event.text.contains('?') {
                transcript_hint.prime(event.text.clone());
            }
            transcript_engine.process_ambient(&event.text);
        }
    });

    let suggestion_hint = Arc::clone(&question_hint);
    tokio::spawn(async move {
        while let Some(event) = suggestions.recv().await {
            let hint = suggestion_hint.take();
            let record = SuggestionRecord::parse(&event.text, hint.as_deref());
            tracing::info!("question: {}", record.question);
            for point in &record.talking_points {
                tracing::info!("  • {}", point);
            }
            tracing::info!("answer: {}", record.answer);
        }
    });

    // ── Level monitor ─────────────────────────────────────────

    let mut mic_level = levels.subscribe(SourceId::Mic);
    let mut system_level = levels.subscribe(SourceId::System);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            let mic = *mic_level.borrow_and_update();
            let system = *system_level.borrow_and_update();
            tracing::debug!(mic, system, "input levels");
        }
    });

    tracing::info!("sotto running — press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!("shutting down");
    mic_capture.stop();
    system_capture.stop();
    tracing::info!(
        mic_dropped = mic_capture.handle().frames_dropped(),
        system_dropped = system_capture.handle().frames_dropped(),
        "capture frame drop counts",
    );
    manager.dispose().await;
    engine.shutdown().await;

    Ok(())
}
