//! Concrete media collaborators: the yt-dlp index and fetcher, the ID3
//! cover tagger and destination path layout.

mod paths;
mod tagger;
mod ytdlp;

pub use paths::{strip_file_illegal_chars, TrackPaths};
pub use tagger::{supports_id3, write_cover_tag, Id3CoverTagger};
pub use ytdlp::{is_playlist_url, resolve_ffmpeg, resolve_ytdlp_binary, YtDlpClient};
