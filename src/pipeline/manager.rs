//! Track pipeline orchestration.
//!
//! Drives each track through Search -> Queued -> Download -> Completed/Error
//! using two stage queues, one dedup guard per stage and the download rate
//! limiter.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::PipelineSettings;
use crate::matcher::{CandidateMatcher, MatcherConfig, MediaIndex};
use crate::media::TrackPaths;

use super::collaborators::{ExistenceCheck, Fetcher, FormatOptions, Tagger};
use super::dedup::{DedupGuard, DedupPermit};
use super::error::PipelineError;
use super::models::*;
use super::notifier::EventSink;
use super::stage_queue::StageQueue;
use super::throttle::{DownloadThrottler, RateLimitSource, RateLimiter};

/// External collaborators the pipeline delegates to.
#[derive(Clone)]
pub struct PipelineCollaborators {
    pub media_index: Arc<dyn MediaIndex>,
    pub fetcher: Arc<dyn Fetcher>,
    pub tagger: Arc<dyn Tagger>,
    pub existence: Arc<dyn ExistenceCheck>,
    pub events: Arc<dyn EventSink>,
    /// Read on every download to space invocations.
    pub rate_source: Arc<dyn RateLimitSource>,
}

/// Static options for a pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub settings: PipelineSettings,
    pub paths: TrackPaths,
    pub format: FormatOptions,
}

/// Resolves tracks to media sources and downloads them.
///
/// Cheap to clone; clones share the same queues and track registry.
/// `resolve` and `retry` must be called from within a tokio runtime.
#[derive(Clone)]
pub struct TrackPipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    matcher: CandidateMatcher,
    fetcher: Arc<dyn Fetcher>,
    tagger: Arc<dyn Tagger>,
    existence: Arc<dyn ExistenceCheck>,
    events: Arc<dyn EventSink>,
    throttler: Arc<dyn DownloadThrottler>,
    search_queue: Arc<StageQueue>,
    download_queue: Arc<StageQueue>,
    search_guard: DedupGuard,
    download_guard: DedupGuard,
    tracks: RwLock<HashMap<TrackId, TrackRecord>>,
    paths: TrackPaths,
    format: FormatOptions,
}

impl TrackPipeline {
    pub fn new(collaborators: PipelineCollaborators, options: PipelineOptions) -> Self {
        let throttler = Arc::new(RateLimiter::new(collaborators.rate_source.clone()));
        Self::with_throttler(collaborators, options, throttler)
    }

    /// Create a pipeline with a custom download throttler.
    pub fn with_throttler(
        collaborators: PipelineCollaborators,
        options: PipelineOptions,
        throttler: Arc<dyn DownloadThrottler>,
    ) -> Self {
        let settings = &options.settings;
        let matcher = CandidateMatcher::new(
            collaborators.media_index,
            MatcherConfig {
                enrich_limit: settings.enrich_limit,
                duration_window_ms: settings.duration_window().as_millis() as f64,
                ..Default::default()
            },
        );

        info!(
            "Track pipeline starting (search_concurrency={}, download_concurrency={})",
            settings.search_concurrency, settings.download_concurrency
        );

        Self {
            inner: Arc::new(PipelineInner {
                matcher,
                fetcher: collaborators.fetcher,
                tagger: collaborators.tagger,
                existence: collaborators.existence,
                events: collaborators.events,
                throttler,
                search_queue: StageQueue::new("search", settings.search_concurrency),
                download_queue: StageQueue::new("download", settings.download_concurrency),
                search_guard: DedupGuard::new(),
                download_guard: DedupGuard::new(),
                tracks: RwLock::new(HashMap::new()),
                paths: options.paths,
                format: options.format,
            }),
        }
    }

    // =========================================================================
    // Entry Points
    // =========================================================================

    /// Register a track and submit it to the search stage.
    ///
    /// Returns false without doing anything if a search for the same track id
    /// is already pending. Fails if the track is known and past New; use
    /// [`TrackPipeline::retry`] for tracks in Error.
    pub fn resolve(&self, descriptor: TrackDescriptor) -> Result<bool, PipelineError> {
        let id = descriptor.id;
        let Some(permit) = self.inner.search_guard.try_acquire(id) else {
            debug!("Search already pending for track {}", id);
            return Ok(false);
        };

        {
            let mut tracks = self.inner.tracks.write().unwrap();
            match tracks.get_mut(&id) {
                Some(record) if record.state != TrackState::New => {
                    return Err(PipelineError::InvalidTransition {
                        id,
                        from: record.state,
                        to: TrackState::Searching,
                    });
                }
                Some(record) => record.descriptor = descriptor,
                None => {
                    tracks.insert(id, TrackRecord::new(descriptor));
                }
            }
        }

        self.inner.submit_search(id, permit);
        Ok(true)
    }

    /// Send a track in New or Error back to Searching and resubmit it.
    ///
    /// Returns false if a search for the track is already pending.
    pub async fn retry(&self, id: TrackId) -> Result<bool, PipelineError> {
        let state = self.state(id).ok_or(PipelineError::UnknownTrack(id))?;
        if !state.is_retryable() {
            return Err(PipelineError::InvalidTransition {
                id,
                from: state,
                to: TrackState::Searching,
            });
        }
        if !self.inner.existence.exists(id).await {
            return Err(PipelineError::VanishedTrack(id));
        }

        let Some(permit) = self.inner.search_guard.try_acquire(id) else {
            debug!("Search already pending for track {}", id);
            return Ok(false);
        };
        self.inner.transition(
            id,
            TrackState::Searching,
            |record| {
                record.error = None;
                record.resolved_url = None;
                record.file_path = None;
            },
            StatusPayload::None,
        )?;

        info!("Retrying track {}", id);
        self.inner.submit_search(id, permit);
        Ok(true)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn state(&self, id: TrackId) -> Option<TrackState> {
        self.inner.tracks.read().unwrap().get(&id).map(|r| r.state)
    }

    pub fn record(&self, id: TrackId) -> Option<TrackRecord> {
        self.inner.tracks.read().unwrap().get(&id).cloned()
    }

    /// Drop a track from the registry. Pending tasks for it are skipped when
    /// they start.
    pub fn forget(&self, id: TrackId) -> Option<TrackRecord> {
        self.inner.tracks.write().unwrap().remove(&id)
    }

    pub fn is_search_pending(&self, id: TrackId) -> bool {
        self.inner.search_guard.is_pending(id)
    }

    pub fn is_download_pending(&self, id: TrackId) -> bool {
        self.inner.download_guard.is_pending(id)
    }

    /// Resolves once both stage queues are drained.
    pub async fn wait_idle(&self) {
        loop {
            self.inner.search_queue.wait_idle().await;
            self.inner.download_queue.wait_idle().await;
            let idle = [&self.inner.search_queue, &self.inner.download_queue]
                .iter()
                .all(|queue| queue.pending() == 0 && queue.running() == 0);
            if idle {
                return;
            }
        }
    }
}

impl PipelineInner {
    fn submit_search(self: &Arc<Self>, id: TrackId, permit: DedupPermit) {
        let inner = self.clone();
        self.search_queue
            .submit(Box::pin(async move { inner.run_search(id, permit).await }));
    }

    /// Returns false if a download for the track is already pending.
    fn submit_download(self: &Arc<Self>, id: TrackId) -> bool {
        let Some(permit) = self.download_guard.try_acquire(id) else {
            warn!("Download already pending for track {}, not resubmitting", id);
            return false;
        };
        let inner = self.clone();
        self.download_queue
            .submit(Box::pin(async move { inner.run_download(id, permit).await }));
        true
    }

    // =========================================================================
    // Stage Handlers
    // =========================================================================

    // Each handler releases its permit before the final transition, so a
    // listener reacting to the event can resubmit the track right away.

    async fn run_search(self: Arc<Self>, id: TrackId, permit: DedupPermit) -> Result<()> {
        let Some(descriptor) = self.present_descriptor(id).await else {
            return Ok(());
        };

        self.begin_search(id)?;

        match self.matcher.find(&descriptor).await {
            Ok(url) => {
                if self.present_descriptor(id).await.is_none() {
                    return Ok(());
                }
                drop(permit);
                self.transition(
                    id,
                    TrackState::Queued,
                    |record| record.resolved_url = Some(url.clone()),
                    StatusPayload::Resolved { url: url.clone() },
                )?;
                self.submit_download(id);
            }
            Err(e) => {
                let error = PipelineError::from(e);
                if self.present_descriptor(id).await.is_none() {
                    return Ok(());
                }
                error!("Search for {} failed: {}", descriptor, error);
                drop(permit);
                self.fail(id, &error)?;
            }
        }
        Ok(())
    }

    async fn run_download(self: Arc<Self>, id: TrackId, permit: DedupPermit) -> Result<()> {
        self.throttler.acquire().await;

        let Some(descriptor) = self.present_descriptor(id).await else {
            return Ok(());
        };
        let url = self
            .tracks
            .read()
            .unwrap()
            .get(&id)
            .and_then(|r| r.resolved_url.clone())
            .ok_or_else(|| PipelineError::Fetch(format!("No resolved URL for track {}", id)))?;

        self.transition(id, TrackState::Downloading, |_| {}, StatusPayload::None)?;

        let path = match self.download(&descriptor, &url).await {
            Ok(path) => path,
            Err(error) => {
                if self.present_descriptor(id).await.is_none() {
                    return Ok(());
                }
                error!("Download of {} failed: {}", descriptor, error);
                drop(permit);
                self.fail(id, &error)?;
                return Ok(());
            }
        };

        if let Some(cover_url) = descriptor.cover_url.as_deref() {
            if let Err(e) = self
                .tagger
                .embed_cover_art(&path, cover_url, &descriptor.title, &descriptor.artist)
                .await
            {
                let error = PipelineError::Tagging(format!("{:#}", e));
                warn!("{} for {}", error, descriptor);
            }
        }

        if self.present_descriptor(id).await.is_none() {
            return Ok(());
        }
        drop(permit);
        self.transition(
            id,
            TrackState::Completed,
            |record| record.file_path = Some(path.clone()),
            StatusPayload::Downloaded { path: path.clone() },
        )?;
        Ok(())
    }

    async fn download(
        &self,
        descriptor: &TrackDescriptor,
        url: &str,
    ) -> Result<std::path::PathBuf, PipelineError> {
        let path = self
            .paths
            .prepare_destination(descriptor)
            .await
            .map_err(|e| PipelineError::Fetch(format!("{:#}", e)))?;
        debug!("Downloading {} ({}) to {:?}", descriptor, url, path);
        self.fetcher
            .download(url, &path, &self.format)
            .await
            .map_err(|e| PipelineError::Fetch(format!("{:#}", e)))?;
        debug!("Downloaded {} to {:?}", descriptor, path);
        Ok(path)
    }

    // =========================================================================
    // State Machine
    // =========================================================================

    /// Existence guard run before every stage step. Returns the current
    /// descriptor, or None if the track was deleted or forgotten.
    async fn present_descriptor(&self, id: TrackId) -> Option<TrackDescriptor> {
        let descriptor = self
            .tracks
            .read()
            .unwrap()
            .get(&id)
            .map(|r| r.descriptor.clone());
        let Some(descriptor) = descriptor else {
            debug!("Skipping track {}: {}", id, PipelineError::UnknownTrack(id));
            return None;
        };
        if !self.existence.exists(id).await {
            debug!("Skipping track {}: {}", id, PipelineError::VanishedTrack(id));
            return None;
        }
        Some(descriptor)
    }

    /// New -> Searching. A retried track is already Searching.
    fn begin_search(&self, id: TrackId) -> Result<(), PipelineError> {
        match self.current_state(id)? {
            TrackState::Searching => Ok(()),
            _ => self.transition(id, TrackState::Searching, |_| {}, StatusPayload::None),
        }
    }

    fn fail(&self, id: TrackId, error: &PipelineError) -> Result<(), PipelineError> {
        let message = error.to_string();
        self.transition(
            id,
            TrackState::Error,
            |record| record.error = Some(message.clone()),
            StatusPayload::Failed {
                message: message.clone(),
            },
        )
    }

    fn current_state(&self, id: TrackId) -> Result<TrackState, PipelineError> {
        self.tracks
            .read()
            .unwrap()
            .get(&id)
            .map(|r| r.state)
            .ok_or(PipelineError::UnknownTrack(id))
    }

    /// Apply a state change and emit its status event.
    fn transition(
        &self,
        id: TrackId,
        next: TrackState,
        update: impl FnOnce(&mut TrackRecord),
        payload: StatusPayload,
    ) -> Result<(), PipelineError> {
        {
            let mut tracks = self.tracks.write().unwrap();
            let record = tracks.get_mut(&id).ok_or(PipelineError::UnknownTrack(id))?;
            if !record.state.can_transition_to(next) {
                return Err(PipelineError::InvalidTransition {
                    id,
                    from: record.state,
                    to: next,
                });
            }
            record.state = next;
            record.updated_at = Utc::now();
            update(record);
        }

        crate::metrics::record_transition(next);
        self.events.emit(TrackStatusEvent::new(id, next, payload));
        Ok(())
    }
}
