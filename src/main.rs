use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use track_pipeline::config::{AppConfig, AudioFormat, CliConfig, FileConfig};
use track_pipeline::media::{Id3CoverTagger, TrackPaths, YtDlpClient};
use track_pipeline::metrics;
use track_pipeline::pipeline::{
    AlwaysExists, BroadcastEventSink, EventSink, FormatOptions, LoggingEventSink,
    PipelineCollaborators, PipelineOptions, TrackDescriptor, TrackPipeline, TrackState,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let resolved_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if resolved_path.is_absolute() {
        return Ok(resolved_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(resolved_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Tracks to download, each as "Artist - Title".
    pub tracks: Vec<String>,

    /// JSON file with an array of track requests
    /// ({"artist", "title", "duration_ms"?, "cover_url"?, "id"?}).
    #[clap(long, value_parser = parse_path)]
    pub tracks_file: Option<PathBuf>,

    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory downloaded tracks are written to.
    #[clap(long, value_parser = parse_path)]
    pub downloads_path: Option<PathBuf>,

    /// Audio format to extract.
    #[clap(long, value_enum, default_value_t = AudioFormat::M4a)]
    pub format: AudioFormat,

    /// Path to the yt-dlp binary. Looked up on PATH when omitted.
    #[clap(long, value_parser = parse_path)]
    pub ytdlp_binary_path: Option<PathBuf>,

    /// Path to the ffmpeg binary handed to yt-dlp.
    #[clap(long, value_parser = parse_path)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Directory holding bundled binaries under deps/bin.
    #[clap(long, value_parser = parse_path)]
    pub resources_path: Option<PathBuf>,

    /// Cookies file forwarded to yt-dlp.
    #[clap(long)]
    pub cookies: Option<String>,

    /// Timeout in seconds for media index lookups and cover art requests.
    #[clap(long, default_value_t = 60)]
    pub media_index_timeout_sec: u64,

    /// Maximum number of downloads started per minute.
    #[clap(long)]
    pub max_downloads_per_minute: Option<f64>,

    /// Print status events as JSON lines on stdout instead of logging them.
    #[clap(long)]
    pub json_events: bool,

    /// Print the Prometheus metrics text before exiting.
    #[clap(long)]
    pub print_metrics: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            downloads_path: self.downloads_path.clone(),
            format: self.format,
            ytdlp_binary_path: self.ytdlp_binary_path.clone(),
            ffmpeg_path: self.ffmpeg_path.clone(),
            resources_path: self.resources_path.clone(),
            cookies: self.cookies.clone(),
            media_index_timeout_sec: self.media_index_timeout_sec,
            max_downloads_per_minute: self.max_downloads_per_minute,
        }
    }
}

/// A track request read from `--tracks-file`.
#[derive(Debug, Deserialize)]
struct TrackRequest {
    id: Option<u64>,
    artist: String,
    title: String,
    duration_ms: Option<u64>,
    cover_url: Option<String>,
}

fn parse_track_arg(id: u64, raw: &str) -> Result<TrackDescriptor> {
    match raw.split_once(" - ") {
        Some((artist, title)) if !artist.trim().is_empty() && !title.trim().is_empty() => {
            Ok(TrackDescriptor::new(id, artist.trim(), title.trim()))
        }
        _ => bail!("Invalid track \"{}\", expected \"Artist - Title\"", raw),
    }
}

fn collect_tracks(cli_args: &CliArgs) -> Result<Vec<TrackDescriptor>> {
    let mut descriptors = Vec::new();
    let mut next_id = 1u64;

    if let Some(path) = &cli_args.tracks_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tracks file: {:?}", path))?;
        let requests: Vec<TrackRequest> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse tracks file: {:?}", path))?;
        for request in requests {
            let id = request.id.unwrap_or(next_id);
            next_id = next_id.max(id) + 1;
            let mut descriptor = TrackDescriptor::new(id, request.artist, request.title)
                .with_duration_ms(request.duration_ms);
            if let Some(cover_url) = request.cover_url {
                descriptor = descriptor.with_cover_url(cover_url);
            }
            descriptors.push(descriptor);
        }
    }

    for raw in &cli_args.tracks {
        descriptors.push(parse_track_arg(next_id, raw)?);
        next_id += 1;
    }

    Ok(descriptors)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let descriptors = collect_tracks(&cli_args)?;
    if descriptors.is_empty() {
        bail!("No tracks given. Pass \"Artist - Title\" arguments or --tracks-file");
    }

    tokio::fs::create_dir_all(&config.downloads_path)
        .await
        .with_context(|| format!("Failed to create {:?}", config.downloads_path))?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    let client = Arc::new(YtDlpClient::from_config(&config)?);
    info!("Using yt-dlp at {:?}", client.binary());

    let (events, printer) = if cli_args.json_events {
        let sink = Arc::new(BroadcastEventSink::default());
        let mut receiver = sink.subscribe();
        let printer = tokio::spawn(async move {
            while let Ok(event) = receiver.recv().await {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Failed to serialize status event: {}", e),
                }
            }
        });
        (sink as Arc<dyn EventSink>, Some(printer))
    } else {
        (Arc::new(LoggingEventSink) as Arc<dyn EventSink>, None)
    };

    let pipeline = TrackPipeline::new(
        PipelineCollaborators {
            media_index: client.clone(),
            fetcher: client,
            tagger: Arc::new(Id3CoverTagger::new(config.media_index_timeout_sec)?),
            existence: Arc::new(AlwaysExists),
            events,
            rate_source: Arc::new(config.pipeline.clone()),
        },
        PipelineOptions {
            settings: config.pipeline.clone(),
            paths: TrackPaths::new(&config.downloads_path, config.format),
            format: FormatOptions {
                format: config.format,
                cookies: config.cookies.clone(),
            },
        },
    );

    for descriptor in &descriptors {
        if !pipeline.resolve(descriptor.clone())? {
            warn!("Skipping duplicate track {}", descriptor);
        }
    }
    pipeline.wait_idle().await;

    let mut failed = 0;
    for descriptor in &descriptors {
        let Some(record) = pipeline.record(descriptor.id) else {
            continue;
        };
        match record.state {
            TrackState::Completed => info!(
                "{}: {:?}",
                descriptor,
                record.file_path.unwrap_or_default()
            ),
            state => {
                failed += 1;
                error!(
                    "{}: {} ({})",
                    descriptor,
                    state,
                    record.error.as_deref().unwrap_or("no error recorded")
                );
            }
        }
    }

    // The pipeline holds the last sender; dropping it ends the printer.
    drop(pipeline);
    if let Some(printer) = printer {
        if tokio::time::timeout(Duration::from_secs(2), printer)
            .await
            .is_err()
        {
            warn!("Timed out flushing status events");
        }
    }

    if cli_args.print_metrics {
        print!("{}", metrics::gather_text());
    }

    if failed > 0 {
        bail!("{} of {} tracks failed", failed, descriptors.len());
    }
    info!("All {} tracks downloaded", descriptors.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_track_arg() {
        let descriptor = parse_track_arg(4, "  Daft Punk - One More Time ").unwrap();
        assert_eq!(descriptor.id, 4);
        assert_eq!(descriptor.artist, "Daft Punk");
        assert_eq!(descriptor.title, "One More Time");

        assert!(parse_track_arg(1, "no separator").is_err());
        assert!(parse_track_arg(1, " - Title").is_err());
    }
}
