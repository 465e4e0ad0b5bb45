//! Claimflow server and CLI entrypoint.

use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use claimflow::config::Config;
use claimflow::evaluation::{self, EvaluationRecord};
use claimflow::gateway::{AppState, create_router};
use claimflow::metrics::{InfluxLineSink, LogRecorder, TracingSink};
use claimflow::orchestrator::{Capabilities, VideoOrchestrator};
use claimflow::provider::{
    GenaiClaimService, GoogleSearchClient, KeywordBaselineVerifier, SpeechToText, Verifier,
    WhisperClient,
};
use claimflow::storage::{MemoryStore, SqliteStore, Store};
use claimflow::{CancelReason, CancelToken, ClientSet, Video, audio_video_id};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[command(name = "claimflow", version, about = "Verify the claims spoken in short videos")]
struct Cli {
    /// Probe the local server's /healthz and exit 0 when healthy.
    #[arg(long)]
    health_check: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Process one video and print its report as JSON.
    Verify {
        /// Defaults to a hash of the audio when verifying an audio file.
        #[arg(long)]
        video_id: Option<String>,

        #[arg(long, conflicts_with = "audio_file", required_unless_present = "audio_file")]
        transcript_file: Option<PathBuf>,

        #[arg(long)]
        audio_file: Option<PathBuf>,
    },

    /// Score predicted labels against ground truth from a JSON-lines file.
    Evaluate {
        #[arg(long)]
        input: PathBuf,

        /// Only count predictions at or above this confidence.
        #[arg(long)]
        threshold: Option<f32>,

        /// Second JSON-lines file to compare against `input`.
        #[arg(long)]
        baseline: Option<PathBuf>,
    },

    /// Word and character error rate of a transcript against a reference.
    Wer {
        #[arg(long)]
        reference: PathBuf,

        #[arg(long)]
        hypothesis: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.health_check {
        std::process::exit(run_health_check().await);
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Verify {
            video_id,
            transcript_file,
            audio_file,
        } => verify(video_id, transcript_file, audio_file).await,
        Command::Evaluate {
            input,
            threshold,
            baseline,
        } => evaluate(&input, threshold, baseline.as_deref()),
        Command::Wer {
            reference,
            hypothesis,
        } => {
            let reference = std::fs::read_to_string(&reference)
                .with_context(|| format!("reading {}", reference.display()))?;
            let hypothesis = std::fs::read_to_string(&hypothesis)
                .with_context(|| format!("reading {}", hypothesis.display()))?;
            print_json(&evaluation::compare_transcripts(&reference, &hypothesis))
        }
    }
}

fn load_config() -> anyhow::Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}

fn build_orchestrator(config: &Config) -> anyhow::Result<VideoOrchestrator> {
    let http = reqwest::Client::builder()
        .user_agent(concat!("claimflow/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let mut recorder = LogRecorder::new(config.log_retention).with_sink(Arc::new(TracingSink));
    if let Some(influx) = &config.influx {
        tracing::info!(url = %influx.url, bucket = %influx.bucket, "Writing latency metrics to InfluxDB");
        recorder = recorder.with_sink(Arc::new(InfluxLineSink::new(http.clone(), influx.clone())));
    }
    let clients = ClientSet::new(&config.clients, Arc::new(recorder));

    let store: Arc<dyn Store> = match &config.database_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Opening SQLite store");
            Arc::new(SqliteStore::open(path)?)
        }
        None => {
            tracing::warn!("No CLAIMFLOW_DATABASE_PATH configured, results are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let (api_key, engine_id) = config.search_credentials()?;
    let search = GoogleSearchClient::new(http.clone(), api_key, engine_id, config.search_results);

    let llm = Arc::new(GenaiClaimService::new(genai::Client::default(), &config.llm_model));
    let verifier: Arc<dyn Verifier> = if config.baseline_verifier {
        tracing::info!("Using keyword baseline verifier");
        Arc::new(KeywordBaselineVerifier::new())
    } else {
        llm.clone()
    };

    let speech = config.speech_url.as_ref().map(|url| {
        Arc::new(WhisperClient::new(http.clone(), url.clone())) as Arc<dyn SpeechToText>
    });

    let capabilities = Capabilities {
        speech,
        decomposer: llm,
        search: Arc::new(search),
        verifier,
    };

    Ok(VideoOrchestrator::new(
        capabilities,
        clients,
        store,
        config.pipeline.clone(),
    )?)
}

async fn serve() -> anyhow::Result<()> {
    let config = load_config()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        model = %config.llm_model,
        workers = config.pipeline.worker_pool_size,
        "Claimflow starting"
    );

    let orchestrator = Arc::new(build_orchestrator(&config)?);
    let shutdown = CancelToken::new();
    let app = create_router(AppState::new(orchestrator.clone()).with_shutdown(shutdown.clone()));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    orchestrator.recorder().flush().await;
    tracing::info!("Claimflow shutdown complete");
    Ok(())
}

async fn verify(
    video_id: Option<String>,
    transcript_file: Option<PathBuf>,
    audio_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = load_config()?;
    let orchestrator = build_orchestrator(&config)?;

    let cancel = CancelToken::new();
    let abort = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, aborting video");
            abort.cancel(CancelReason::Aborted);
        }
    });

    let report = match (transcript_file, audio_file) {
        (Some(path), _) => {
            let transcript = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let video_id = video_id.unwrap_or_else(|| {
                path.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "video".to_string())
            });
            orchestrator
                .process_transcript(Video::new(video_id, transcript), &cancel)
                .await
        }
        (None, Some(path)) => {
            let audio =
                std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let video_id = video_id.unwrap_or_else(|| audio_video_id(&audio));
            orchestrator.process_audio(&video_id, &audio, &cancel).await
        }
        (None, None) => anyhow::bail!("either --transcript-file or --audio-file is required"),
    };

    orchestrator.recorder().flush().await;
    tracing::info!(summary = %report.digest(), "Video processed");
    print_json(&report)
}

fn read_records(path: &Path) -> anyhow::Result<Vec<EvaluationRecord>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(evaluation::read_jsonl(BufReader::new(file))?)
}

fn evaluate(input: &Path, threshold: Option<f32>, baseline: Option<&Path>) -> anyhow::Result<()> {
    let records = read_records(input)?;

    if let Some(baseline) = baseline {
        let baseline = read_records(baseline)?;
        return print_json(&evaluation::compare(&baseline, &records));
    }

    match threshold {
        Some(t) => print_json(&evaluation::evaluate_with_confidence(&records, t)?),
        None => print_json(&evaluation::evaluate_records(&records)),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_health_check() -> i32 {
    let port = std::env::var("CLAIMFLOW_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let Ok(client) = reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
    else {
        return 1;
    };

    match client.get(&url).send().await {
        Ok(res) if res.status().is_success() => 0,
        _ => 1,
    }
}

async fn shutdown_signal(shutdown: CancelToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }

    shutdown.cancel(CancelReason::Aborted);
}
