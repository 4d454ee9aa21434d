mod file_config;

pub use file_config::{FileConfig, PipelineConfig};

use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub downloads_path: Option<PathBuf>,
    pub format: AudioFormat,
    pub ytdlp_binary_path: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    pub resources_path: Option<PathBuf>,
    pub cookies: Option<String>,
    pub media_index_timeout_sec: u64,
    pub max_downloads_per_minute: Option<f64>,
}

/// Audio container requested from the fetcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum AudioFormat {
    #[default]
    M4a,
    Mp3,
    Opus,
    Flac,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::M4a => "m4a",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "opus",
            AudioFormat::Flac => "flac",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub downloads_path: PathBuf,
    pub format: AudioFormat,
    pub ytdlp_binary_path: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    pub resources_path: Option<PathBuf>,
    pub cookies: Option<String>,
    pub media_index_timeout_sec: u64,

    // Feature configs (with defaults)
    pub pipeline: PipelineSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let downloads_path = file
            .downloads_path
            .map(PathBuf::from)
            .or_else(|| cli.downloads_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "downloads_path must be specified via --downloads-path or in config file"
                )
            })?;

        if downloads_path.exists() && !downloads_path.is_dir() {
            bail!("downloads_path is not a directory: {:?}", downloads_path);
        }

        let format = match file.format {
            Some(raw) => match parse_format(&raw) {
                Some(format) => format,
                None => bail!("Unsupported audio format in config file: {}", raw),
            },
            None => cli.format,
        };

        let ytdlp_binary_path = non_blank(file.ytdlp_binary_path)
            .map(PathBuf::from)
            .or_else(|| cli.ytdlp_binary_path.clone());
        let ffmpeg_path = non_blank(file.ffmpeg_path)
            .map(PathBuf::from)
            .or_else(|| cli.ffmpeg_path.clone());
        let resources_path = non_blank(file.resources_path)
            .map(PathBuf::from)
            .or_else(|| cli.resources_path.clone());
        let cookies = non_blank(file.cookies).or_else(|| non_blank(cli.cookies.clone()));
        let media_index_timeout_sec = file
            .media_index_timeout_sec
            .unwrap_or(cli.media_index_timeout_sec);

        // Pipeline settings - merge file config with defaults
        let defaults = PipelineSettings::default();
        let pipeline_file = file.pipeline.unwrap_or_default();
        let pipeline = PipelineSettings {
            max_downloads_per_minute: pipeline_file
                .max_downloads_per_minute
                .or(cli.max_downloads_per_minute)
                .unwrap_or(defaults.max_downloads_per_minute),
            search_concurrency: pipeline_file
                .search_concurrency
                .unwrap_or(defaults.search_concurrency)
                .max(1),
            download_concurrency: pipeline_file
                .download_concurrency
                .unwrap_or(defaults.download_concurrency)
                .max(1),
            enrich_limit: pipeline_file.enrich_limit.unwrap_or(defaults.enrich_limit),
            duration_window_secs: pipeline_file
                .duration_window_secs
                .unwrap_or(defaults.duration_window_secs),
        };

        Ok(Self {
            downloads_path,
            format,
            ytdlp_binary_path,
            ffmpeg_path,
            resources_path,
            cookies,
            media_index_timeout_sec,
            pipeline,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Raw value, coerced by the rate limiter on every acquire.
    pub max_downloads_per_minute: f64,
    pub search_concurrency: usize,
    pub download_concurrency: usize,
    /// How many raw candidates get extended metadata.
    pub enrich_limit: usize,
    pub duration_window_secs: u64,
}

impl PipelineSettings {
    pub fn duration_window(&self) -> Duration {
        Duration::from_secs(self.duration_window_secs)
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_downloads_per_minute: 3.0,
            search_concurrency: 2,
            download_concurrency: 1,
            enrich_limit: 8,
            duration_window_secs: 10,
        }
    }
}

/// Parses a format string into AudioFormat.
/// Uses clap's ValueEnum trait for parsing.
fn parse_format(s: &str) -> Option<AudioFormat> {
    AudioFormat::from_str(s.trim(), true).ok()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
