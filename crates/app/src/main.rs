use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use voxgate_app::controller::ControllerConfig;
use voxgate_app::notify::{Notifier, TracingNotifier};
use voxgate_app::prefs::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
use voxgate_app::runtime::{self, recognizer_channel, ControllerHandle};
use voxgate_stt::SpeechRecognizer;
use voxgate_tts::SpeechSynthesizer;

#[derive(Parser, Debug)]
#[command(name = "voxgate", about = "Wake-word-gated voice command controller")]
struct Cli {
    /// Leading word a transcript must carry to be treated as a command
    #[arg(long, default_value = "vox")]
    wake_prefix: String,

    /// Recognition language (BCP-47)
    #[arg(long, default_value = "en-US")]
    language: String,

    /// Input device name (backend default when omitted)
    #[arg(long)]
    device: Option<String>,

    /// Recognition model path override
    #[arg(long)]
    model_path: Option<String>,

    /// Preferred voice for speech output (name or language substring)
    #[arg(long)]
    voice: Option<String>,

    /// Stop after the first recognition session instead of restarting
    #[arg(long)]
    one_shot: bool,

    /// Do not begin listening at startup
    #[arg(long)]
    no_auto_start: bool,

    /// Restart delay in milliseconds
    #[arg(long, default_value_t = 300)]
    restart_delay_ms: u64,

    /// Do not persist the mute preference across runs
    #[arg(long)]
    ephemeral: bool,
}

fn init_logging() -> anyhow::Result<()> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "voxgate.log");
    let (non_blocking_file, _guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(_guard);
    Ok(())
}

#[cfg(feature = "vosk-backend")]
fn build_recognizer(
    cli: &Cli,
    event_tx: tokio::sync::mpsc::Sender<voxgate_stt::RecognizerEvent>,
) -> anyhow::Result<Box<dyn SpeechRecognizer>> {
    let config = voxgate_stt::RecognizerConfig {
        language: cli.language.clone(),
        partial_results: true,
        device: cli.device.clone(),
        model_path: cli.model_path.clone(),
    };
    Ok(Box::new(voxgate_stt::vosk::VoskRecognizer::new(
        config, event_tx,
    )))
}

#[cfg(not(feature = "vosk-backend"))]
fn build_recognizer(
    _cli: &Cli,
    _event_tx: tokio::sync::mpsc::Sender<voxgate_stt::RecognizerEvent>,
) -> anyhow::Result<Box<dyn SpeechRecognizer>> {
    bail!("no speech recognition backend compiled in (enable the `vosk-backend` feature)")
}

#[cfg(feature = "espeak")]
fn build_synthesizer(cli: &Cli) -> anyhow::Result<Box<dyn SpeechSynthesizer>> {
    let config = voxgate_tts::TtsConfig {
        default_voice: cli.voice.clone(),
        ..Default::default()
    };
    Ok(Box::new(voxgate_tts::espeak::EspeakSynthesizer::new(config)))
}

#[cfg(not(feature = "espeak"))]
fn build_synthesizer(_cli: &Cli) -> anyhow::Result<Box<dyn SpeechSynthesizer>> {
    bail!("no speech synthesis backend compiled in (enable the `espeak` feature)")
}

/// Commands the demo binary ships with; a real deployment registers its
/// own set against its command router.
fn register_commands(handle: &ControllerHandle) {
    let h = handle.clone();
    handle.register_command("status report", move || {
        h.speak("Voice control is online.");
    });

    let h = handle.clone();
    handle.register_command("stop listening", move || h.mute());

    let h = handle.clone();
    handle.register_command("say hello", move || {
        h.speak("Hello there.");
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    tracing::info!("Starting VoxGate");

    let cli = Cli::parse();
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    let config = ControllerConfig {
        wake_prefix: cli.wake_prefix.to_lowercase(),
        continuous: !cli.one_shot,
        auto_start: !cli.no_auto_start,
        language: cli.language.clone(),
        restart_delay: Duration::from_millis(cli.restart_delay_ms),
    };

    let (event_tx, event_rx) = recognizer_channel();
    let recognizer = match build_recognizer(&cli, event_tx) {
        Ok(r) => r,
        Err(e) => {
            notifier.notify(&e.to_string(), voxgate_app::notify::NoticeKind::Error);
            bail!(e);
        }
    };
    let synthesizer = match build_synthesizer(&cli) {
        Ok(s) => s,
        Err(e) => {
            notifier.notify(&e.to_string(), voxgate_app::notify::NoticeKind::Error);
            bail!(e);
        }
    };

    let prefs: Box<dyn PreferenceStore> = if cli.ephemeral {
        Box::new(MemoryPreferenceStore::default())
    } else {
        match FilePreferenceStore::at_default_location() {
            Some(store) => Box::new(store),
            None => {
                tracing::warn!("no config directory on this platform; mute will not persist");
                Box::new(MemoryPreferenceStore::default())
            }
        }
    };

    let app = runtime::start(
        config,
        recognizer,
        event_rx,
        synthesizer,
        prefs,
        notifier.clone(),
    )
    .await?;

    register_commands(&app.controller);

    tracing::info!("VoxGate running; Ctrl+C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }

    app.shutdown().await;
    Ok(())
}
