#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use tokio::time::Instant;

use track_pipeline::matcher::{Candidate, CandidateDetail, MediaIndex};
use track_pipeline::pipeline::{
    EventSink, ExistenceCheck, Fetcher, FormatOptions, Tagger, TrackId, TrackPipeline,
    TrackState, TrackStatusEvent,
};

/// Media index answering "artist - title" queries from a table.
#[derive(Default)]
pub struct FakeMediaIndex {
    results: Mutex<HashMap<String, Vec<Candidate>>>,
    details: Mutex<HashMap<String, CandidateDetail>>,
    failing: AtomicBool,
    search_delay: Mutex<Option<Duration>>,
    search_calls: AtomicUsize,
}

impl FakeMediaIndex {
    pub fn add_results(&self, artist: &str, title: &str, candidates: Vec<Candidate>) {
        self.results
            .lock()
            .unwrap()
            .insert(format!("{} - {}", artist, title), candidates);
    }

    pub fn add_detail(&self, url: &str, detail: CandidateDetail) {
        self.details.lock().unwrap().insert(url.to_string(), detail);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_search_delay(&self, delay: Duration) {
        *self.search_delay.lock().unwrap() = Some(delay);
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaIndex for FakeMediaIndex {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.search_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            bail!("index unavailable");
        }
        Ok(self
            .results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn enrich(&self, url: &str) -> Result<CandidateDetail> {
        self.details
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no detail for {}", url))
    }
}

/// Fetcher writing a placeholder file and recording when each download
/// started.
#[derive(Default)]
pub struct FakeFetcher {
    failing_urls: Mutex<HashSet<String>>,
    downloads: Mutex<Vec<(String, PathBuf, Instant)>>,
}

impl FakeFetcher {
    pub fn fail_url(&self, url: &str) {
        self.failing_urls.lock().unwrap().insert(url.to_string());
    }

    pub fn downloaded_urls(&self) -> Vec<String> {
        self.downloads
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _, _)| url.clone())
            .collect()
    }

    pub fn started_at(&self) -> Vec<Instant> {
        self.downloads
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, at)| *at)
            .collect()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn download(&self, url: &str, destination: &Path, _options: &FormatOptions) -> Result<()> {
        self.downloads.lock().unwrap().push((
            url.to_string(),
            destination.to_path_buf(),
            Instant::now(),
        ));
        if self.failing_urls.lock().unwrap().contains(url) {
            bail!("HTTP Error 403: Forbidden");
        }
        std::fs::write(destination, b"audio")?;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTagger {
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeTagger {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tagger for FakeTagger {
    async fn embed_cover_art(
        &self,
        _file_path: &Path,
        _image_url: &str,
        _title: &str,
        _artist: &str,
    ) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            bail!("cover art request returned 404");
        }
        Ok(())
    }
}

/// Every track exists until it is explicitly vanished, or until it has been
/// checked a given number of times.
#[derive(Default)]
pub struct ToggleExistence {
    vanished: Mutex<HashSet<TrackId>>,
    vanish_after: Mutex<HashMap<TrackId, usize>>,
    checks: Mutex<HashMap<TrackId, usize>>,
}

impl ToggleExistence {
    pub fn vanish(&self, id: TrackId) {
        self.vanished.lock().unwrap().insert(id);
    }

    pub fn restore(&self, id: TrackId) {
        self.vanished.lock().unwrap().remove(&id);
        self.vanish_after.lock().unwrap().remove(&id);
    }

    /// Report the track as present for the next `checks` checks only.
    pub fn vanish_after(&self, id: TrackId, checks: usize) {
        self.vanish_after.lock().unwrap().insert(id, checks);
    }

    pub fn checks(&self, id: TrackId) -> usize {
        self.checks.lock().unwrap().get(&id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ExistenceCheck for ToggleExistence {
    async fn exists(&self, track_id: TrackId) -> bool {
        let seen = {
            let mut checks = self.checks.lock().unwrap();
            let count = checks.entry(track_id).or_insert(0);
            *count += 1;
            *count
        };
        if self.vanished.lock().unwrap().contains(&track_id) {
            return false;
        }
        match self.vanish_after.lock().unwrap().get(&track_id) {
            Some(limit) => seen <= *limit,
            None => true,
        }
    }
}

/// Pending dedup markers of a track at the moment an event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAtEmit {
    pub state: TrackState,
    pub search_pending: bool,
    pub download_pending: bool,
}

#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<TrackStatusEvent>>,
    pending: Mutex<Vec<(TrackId, PendingAtEmit)>>,
    pipeline: OnceLock<TrackPipeline>,
}

impl RecordingEventSink {
    /// Also record the pipeline's dedup markers on every event.
    pub fn observe(&self, pipeline: TrackPipeline) {
        let _ = self.pipeline.set(pipeline);
    }

    pub fn events_for(&self, id: TrackId) -> Vec<TrackStatusEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.track_id == id)
            .cloned()
            .collect()
    }

    pub fn states_for(&self, id: TrackId) -> Vec<TrackState> {
        self.events_for(id).into_iter().map(|e| e.state).collect()
    }

    pub fn pending_for(&self, id: TrackId) -> Vec<PendingAtEmit> {
        self.pending
            .lock()
            .unwrap()
            .iter()
            .filter(|(track_id, _)| *track_id == id)
            .map(|(_, pending)| *pending)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: TrackStatusEvent) {
        if let Some(pipeline) = self.pipeline.get() {
            self.pending.lock().unwrap().push((
                event.track_id,
                PendingAtEmit {
                    state: event.state,
                    search_pending: pipeline.is_search_pending(event.track_id),
                    download_pending: pipeline.is_download_pending(event.track_id),
                },
            ));
        }
        self.events.lock().unwrap().push(event);
    }
}
