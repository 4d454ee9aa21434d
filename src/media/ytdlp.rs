//! yt-dlp backed media index and fetcher.
//!
//! Searches, metadata lookups and downloads all shell out to the yt-dlp
//! binary and parse its JSON output.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::matcher::{Candidate, CandidateDetail, MediaIndex};
use crate::pipeline::{Fetcher, FormatOptions};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Number of results requested from the plain search fallback.
const FALLBACK_SEARCH_RESULTS: usize = 10;

lazy_static! {
    static ref PLAYLIST_PAGE: Regex = Regex::new(r"(music\.)?youtube\.com/playlist\?list=")
        .expect("Failed to compile playlist page pattern");
    static ref WATCH_URL: Regex =
        Regex::new(r"/watch\?v=").expect("Failed to compile watch url pattern");
    static ref LIST_PARAM: Regex =
        Regex::new(r"[?&]list=").expect("Failed to compile list param pattern");
}

/// A single entry of yt-dlp's JSON output.
#[derive(Debug, Clone, Default, Deserialize)]
struct YtDlpInfo {
    #[serde(rename = "_type")]
    kind: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    title: Option<String>,
    description: Option<String>,
    short_description: Option<String>,
    duration: Option<f64>,
    channel: Option<String>,
    uploader: Option<String>,
    is_live: Option<bool>,
    was_live: Option<bool>,
    #[serde(default)]
    entries: Vec<Option<YtDlpInfo>>,
}

impl YtDlpInfo {
    fn is_playlist(&self) -> bool {
        self.kind.as_deref() == Some("playlist")
    }
}

pub fn is_playlist_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }
    if PLAYLIST_PAGE.is_match(url) {
        return true;
    }
    if WATCH_URL.is_match(url) {
        return false;
    }
    LIST_PARAM.is_match(url)
}

fn entry_to_candidate(entry: YtDlpInfo) -> Option<Candidate> {
    if entry.is_playlist() {
        return None;
    }
    let url = entry
        .url
        .filter(|u| !u.is_empty())
        .or(entry.webpage_url.filter(|u| !u.is_empty()))?;
    if is_playlist_url(&url) {
        return None;
    }
    Some(Candidate {
        url,
        title: entry.title,
        description: entry.description,
        duration_seconds: entry.duration.filter(|d| d.is_finite()),
        channel_name: entry.channel,
        uploader_name: entry.uploader,
        is_live: false,
    })
}

fn info_to_detail(info: YtDlpInfo) -> CandidateDetail {
    CandidateDetail {
        is_playlist: info.is_playlist(),
        description: info.description.or(info.short_description),
        duration_seconds: info.duration.filter(|d| d.is_finite() && *d > 0.0),
        channel_name: info.channel,
        uploader_name: info.uploader,
        is_live: info.is_live.unwrap_or(false) || info.was_live.unwrap_or(false),
    }
}

/// Locate the yt-dlp binary: configured path, bundled resources, `PATH`,
/// then common install locations.
pub fn resolve_ytdlp_binary(
    configured: Option<&Path>,
    resources_path: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        warn!("yt-dlp binary is configured but not found at: {:?}", path);
    }

    let exe = if cfg!(windows) { ".exe" } else { "" };
    if let Some(resources) = resources_path {
        let bin_dir = resources.join("deps").join("bin");
        let arch = std::env::consts::ARCH;
        let bundled = [
            bin_dir.join(format!("yt-dlp-{}{}", arch, exe)),
            bin_dir.join(format!("yt-dlp{}", exe)),
            bin_dir.join(format!("yt-dlp-{}", arch)),
            bin_dir.join("yt-dlp"),
        ];
        if let Some(found) = bundled.into_iter().find(|p| p.exists()) {
            return Some(found);
        }
    }

    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            let candidate = dir.join(format!("yt-dlp{}", exe));
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    ["/opt/homebrew/bin/yt-dlp", "/usr/local/bin/yt-dlp"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Locate ffmpeg: configured path, then bundled resources. yt-dlp falls
/// back to its own lookup when None.
pub fn resolve_ffmpeg(configured: Option<&Path>, resources_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured.filter(|p| p.exists()) {
        return Some(path.to_path_buf());
    }
    let exe = if cfg!(windows) { ".exe" } else { "" };
    resources_path
        .map(|r| r.join("deps").join("bin").join(format!("ffmpeg{}", exe)))
        .filter(|p| p.exists())
}

/// Output template that lets yt-dlp pick the extension after extraction.
fn output_template(destination: &Path) -> PathBuf {
    destination.with_extension("%(ext)s")
}

/// Media index and fetcher backed by the yt-dlp command line tool.
#[derive(Debug, Clone)]
pub struct YtDlpClient {
    binary: PathBuf,
    ffmpeg: Option<PathBuf>,
    /// Upper bound for a single metadata command.
    timeout: Duration,
}

impl YtDlpClient {
    pub fn new(binary: PathBuf, ffmpeg: Option<PathBuf>, timeout_sec: u64) -> Self {
        Self {
            binary,
            ffmpeg,
            timeout: Duration::from_secs(timeout_sec),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let binary = resolve_ytdlp_binary(
            config.ytdlp_binary_path.as_deref(),
            config.resources_path.as_deref(),
        )
        .ok_or_else(|| {
            anyhow!("yt-dlp binary not found. Install yt-dlp or set ytdlp_binary_path.")
        })?;
        let ffmpeg = resolve_ffmpeg(config.ffmpeg_path.as_deref(), config.resources_path.as_deref());
        debug!("Using yt-dlp at {:?} (ffmpeg: {:?})", binary, ffmpeg);
        Ok(Self::new(binary, ffmpeg, config.media_index_timeout_sec))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run yt-dlp in JSON mode against `target`.
    async fn dump_json(&self, target: &str, flat: bool) -> Result<YtDlpInfo> {
        let mut command = Command::new(&self.binary);
        command
            .arg("--dump-single-json")
            .args(["--ignore-errors", "--quiet", "--no-warnings"])
            .args(["--socket-timeout", "10"]);
        if flat {
            command.arg("--flat-playlist");
        } else {
            command.arg("--no-playlist");
        }
        command
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .with_context(|| format!("yt-dlp timed out for {}", target))?
            .context("Failed to run yt-dlp")?;

        if !output.status.success() && output.stdout.is_empty() {
            anyhow::bail!(
                "yt-dlp failed for {}: {}",
                target,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("Failed to parse yt-dlp output for {}", target))
    }

    async fn search_entries(&self, target: &str) -> Result<Vec<Candidate>> {
        let info = self.dump_json(target, true).await?;
        Ok(info
            .entries
            .into_iter()
            .flatten()
            .filter_map(entry_to_candidate)
            .collect())
    }
}

#[async_trait]
impl MediaIndex for YtDlpClient {
    /// Music search first, plain video search when that fails or is empty.
    async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        let music_url = format!(
            "https://music.youtube.com/search?q={}",
            urlencoding::encode(query)
        );
        match self.search_entries(&music_url).await {
            Ok(candidates) if !candidates.is_empty() => return Ok(candidates),
            Ok(_) => debug!("Music search returned nothing for {}", query),
            Err(e) => debug!("Music search failed, falling back to ytsearch: {:#}", e),
        }

        self.search_entries(&format!("ytsearch{}:{}", FALLBACK_SEARCH_RESULTS, query))
            .await
    }

    async fn enrich(&self, url: &str) -> Result<CandidateDetail> {
        let info = self.dump_json(url, false).await?;
        Ok(info_to_detail(info))
    }

    fn is_playlist_url(&self, url: &str) -> bool {
        is_playlist_url(url)
    }
}

#[async_trait]
impl Fetcher for YtDlpClient {
    async fn download(&self, url: &str, destination: &Path, options: &FormatOptions) -> Result<()> {
        let mut command = Command::new(&self.binary);
        command
            .args(["--format", "bestaudio/best"])
            .args(["--extract-audio", "--audio-format", options.format.extension()])
            .args(["--audio-quality", "0"])
            .arg("--output")
            .arg(output_template(destination))
            .args(["--force-overwrites", "--no-playlist", "--quiet", "--no-warnings"])
            .arg("--add-header")
            .arg(format!("User-Agent:{}", USER_AGENT));
        if let Some(cookies) = &options.cookies {
            command.arg("--cookies").arg(cookies);
        }
        if let Some(ffmpeg) = &self.ffmpeg {
            command.arg("--ffmpeg-location").arg(ffmpeg);
        }
        command
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = command.output().await.context("Failed to run yt-dlp")?;
        if !output.status.success() {
            anyhow::bail!(
                "yt-dlp download of {} failed ({}): {}",
                url,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_playlist_url() {
        assert!(is_playlist_url("https://www.youtube.com/playlist?list=PL123"));
        assert!(is_playlist_url("https://music.youtube.com/playlist?list=OLAK5"));
        assert!(!is_playlist_url("https://www.youtube.com/watch?v=abc&list=PL123"));
        assert!(is_playlist_url("https://example.com/browse?foo=1&list=x"));
        assert!(!is_playlist_url("https://www.youtube.com/watch?v=abc"));
        assert!(!is_playlist_url("   "));
    }

    #[test]
    fn test_parse_flat_search_output() {
        let json = r#"{
            "_type": "playlist",
            "entries": [
                {"_type": "url", "url": "https://www.youtube.com/watch?v=a", "title": "A - B",
                 "duration": 200.0, "channel": "A - Topic"},
                {"_type": "playlist", "url": "https://www.youtube.com/playlist?list=x"},
                {"_type": "url", "webpage_url": "https://www.youtube.com/watch?v=c", "title": "C"},
                {"_type": "url", "url": "https://music.youtube.com/playlist?list=y"},
                null
            ]
        }"#;
        let info: YtDlpInfo = serde_json::from_str(json).unwrap();
        let candidates: Vec<Candidate> = info
            .entries
            .into_iter()
            .flatten()
            .filter_map(entry_to_candidate)
            .collect();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].url, "https://www.youtube.com/watch?v=a");
        assert_eq!(candidates[0].duration_seconds, Some(200.0));
        assert_eq!(candidates[0].channel_name.as_deref(), Some("A - Topic"));
        assert_eq!(candidates[1].url, "https://www.youtube.com/watch?v=c");
    }

    #[test]
    fn test_detail_from_video_info() {
        let json = r#"{"_type": "video", "short_description": "Provided to YouTube by X",
            "duration": 0, "uploader": "Up", "was_live": true}"#;
        let detail = info_to_detail(serde_json::from_str(json).unwrap());

        assert_eq!(detail.description.as_deref(), Some("Provided to YouTube by X"));
        assert_eq!(detail.duration_seconds, None);
        assert_eq!(detail.uploader_name.as_deref(), Some("Up"));
        assert!(detail.is_live);
        assert!(!detail.is_playlist);
    }

    #[test]
    fn test_output_template_replaces_extension() {
        assert_eq!(
            output_template(Path::new("/music/A/A - B.m4a")),
            PathBuf::from("/music/A/A - B.%(ext)s")
        );
    }

    #[test]
    fn test_resolve_ytdlp_prefers_configured_then_resources() {
        let temp_dir = TempDir::new().unwrap();
        let configured = temp_dir.path().join("custom-yt-dlp");
        std::fs::write(&configured, b"").unwrap();
        assert_eq!(
            resolve_ytdlp_binary(Some(configured.as_path()), None),
            Some(configured.clone())
        );

        let bin_dir = temp_dir.path().join("deps").join("bin");
        std::fs::create_dir_all(&bin_dir).unwrap();
        let bundled = bin_dir.join("yt-dlp");
        std::fs::write(&bundled, b"").unwrap();
        assert_eq!(
            resolve_ytdlp_binary(
                Some(temp_dir.path().join("missing").as_path()),
                Some(temp_dir.path())
            ),
            Some(bundled)
        );
    }

    #[test]
    fn test_resolve_ffmpeg_from_resources() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(resolve_ffmpeg(None, Some(temp_dir.path())), None);

        let bin_dir = temp_dir.path().join("deps").join("bin");
        std::fs::create_dir_all(&bin_dir).unwrap();
        let ffmpeg = bin_dir.join(if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" });
        std::fs::write(&ffmpeg, b"").unwrap();
        assert_eq!(resolve_ffmpeg(None, Some(temp_dir.path())), Some(ffmpeg));
    }
}
