#![allow(dead_code)]

pub const ARTIST: &str = "Daft Punk";
pub const TITLE: &str = "One More Time";
pub const DURATION_MS: u64 = 320_000;

pub const OTHER_ARTIST: &str = "Justice";
pub const OTHER_TITLE: &str = "Genesis";

pub const COVER_URL: &str = "https://img.example.com/cover.jpg";

/// Fast enough that spacing never shows up in wall clock tests.
pub const UNTHROTTLED_RATE: f64 = 600_000.0;
