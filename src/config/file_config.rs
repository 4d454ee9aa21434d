use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub downloads_path: Option<String>,
    pub format: Option<String>,
    pub ytdlp_binary_path: Option<String>,
    pub ffmpeg_path: Option<String>,
    pub resources_path: Option<String>,
    pub cookies: Option<String>,
    pub media_index_timeout_sec: Option<u64>,

    // Feature configs
    pub pipeline: Option<PipelineConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_downloads_per_minute: Option<f64>,
    pub search_concurrency: Option<usize>,
    pub download_concurrency: Option<usize>,
    pub enrich_limit: Option<usize>,
    pub duration_window_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_pipeline_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
downloads_path = "/music"
format = "mp3"

[pipeline]
max_downloads_per_minute = 6
search_concurrency = 4
"#
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.downloads_path.as_deref(), Some("/music"));
        assert_eq!(config.format.as_deref(), Some("mp3"));
        let pipeline = config.pipeline.unwrap();
        assert_eq!(pipeline.max_downloads_per_minute, Some(6.0));
        assert_eq!(pipeline.search_concurrency, Some(4));
        assert_eq!(pipeline.download_concurrency, None);
    }

    #[test]
    fn test_load_missing_file_error() {
        let result = FileConfig::load(Path::new("/nonexistent/track-pipeline.toml"));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to read config file"));
    }
}
