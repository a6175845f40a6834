use crate::api::PneumoniaApi;
use crate::imaging::{ImagePreparer, PreparedImage};
use crate::repository::{ApiResult, PneumoniaRepository, GENERIC_NETWORK_ERROR};
use log::{error, info, warn};
use shared::{ImageRef, PredictionResponse};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const IMAGE_PROCESSING_FAILED: &str = "Failed to process image";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum UiState {
    #[default]
    Idle,
    Loading,
    Success(PredictionResponse),
    Error(String),
}

impl UiState {
    pub fn is_loading(&self) -> bool {
        matches!(self, UiState::Loading)
    }
}

/// Result of asking the view-model to run a prediction.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The call ran; this is the state it settled in.
    Completed(UiState),
    /// A prediction was already in flight; nothing was sent.
    Ignored,
    /// The flow was reset while the call ran; its result was dropped.
    Discarded,
}

/// Owns the screen-flow state and publishes it over watch channels.
///
/// The prediction flow is `Idle -> Loading -> Success | Error`, back to
/// `Idle` only through [`reset`](Self::reset). At most one prediction is in
/// flight per instance. The health flag is tracked separately and never
/// touches [`UiState`].
pub struct PneumoniaViewModel<A> {
    repository: PneumoniaRepository<A>,
    preparer: ImagePreparer,
    ui_state: watch::Sender<UiState>,
    server_healthy: watch::Sender<bool>,
    selected_image: watch::Sender<Option<ImageRef>>,
    in_flight: AtomicBool,
    generation: AtomicU64,
}

impl<A: PneumoniaApi> PneumoniaViewModel<A> {
    pub fn new(repository: PneumoniaRepository<A>, preparer: ImagePreparer) -> Self {
        Self {
            repository,
            preparer,
            ui_state: watch::Sender::new(UiState::Idle),
            server_healthy: watch::Sender::new(false),
            selected_image: watch::Sender::new(None),
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub fn repository(&self) -> &PneumoniaRepository<A> {
        &self.repository
    }

    pub fn ui_state(&self) -> UiState {
        self.ui_state.borrow().clone()
    }

    pub fn is_server_healthy(&self) -> bool {
        *self.server_healthy.borrow()
    }

    pub fn selected_image(&self) -> Option<ImageRef> {
        self.selected_image.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<UiState> {
        self.ui_state.subscribe()
    }

    pub fn subscribe_health(&self) -> watch::Receiver<bool> {
        self.server_healthy.subscribe()
    }

    pub fn subscribe_selected_image(&self) -> watch::Receiver<Option<ImageRef>> {
        self.selected_image.subscribe()
    }

    /// Refreshes the health flag. Returns the new value.
    pub async fn check_server_health(&self) -> bool {
        let healthy = match self.repository.check_health().await {
            ApiResult::Success(health) => health.model_loaded,
            ApiResult::Error(err) => {
                warn!("Server not ready: {} (code {})", err.message, err.code);
                false
            }
            ApiResult::Loading => return self.is_server_healthy(),
        };
        self.server_healthy.send_replace(healthy);
        healthy
    }

    pub fn set_selected_image(&self, image: Option<ImageRef>) {
        self.selected_image.send_replace(image);
    }

    /// Compresses `source` and uploads it. A local failure settles in
    /// `Error("Failed to process image")` without touching the network.
    pub async fn submit_image(&self, source: &Path) -> Submission {
        let Some(flight) = self.begin_flight() else {
            info!("Prediction already in flight; ignoring {}", source.display());
            return Submission::Ignored;
        };

        let preparer = self.preparer.clone();
        let owned = source.to_path_buf();
        let prepared = match tokio::task::spawn_blocking(move || preparer.prepare(&owned)).await {
            Ok(Ok(prepared)) => prepared,
            Ok(Err(err)) => {
                error!("Image preparation failed for {}: {}", source.display(), err);
                return flight.settle(UiState::Error(IMAGE_PROCESSING_FAILED.to_string()));
            }
            Err(err) => {
                error!("Image preparation task failed: {}", err);
                return flight.settle(UiState::Error(IMAGE_PROCESSING_FAILED.to_string()));
            }
        };

        let upload = CachedUpload(prepared);
        let next = self.run_prediction(&upload.0).await;
        drop(upload);
        flight.settle(next)
    }

    /// Uploads an already prepared image.
    pub async fn predict_prepared(&self, image: &PreparedImage) -> Submission {
        let Some(flight) = self.begin_flight() else {
            info!("Prediction already in flight; ignoring {}", image.file_name);
            return Submission::Ignored;
        };
        let next = self.run_prediction(image).await;
        flight.settle(next)
    }

    /// Back to `Idle` with no image selected. A call still in flight keeps
    /// its slot until it finishes, but its result is discarded.
    pub fn reset(&self) {
        self.ui_state.send_modify(|current| {
            self.generation.fetch_add(1, Ordering::AcqRel);
            *current = UiState::Idle;
        });
        self.selected_image.send_replace(None);
    }

    fn begin_flight(&self) -> Option<InFlight<'_>> {
        InFlight::begin(&self.ui_state, &self.in_flight, &self.generation)
    }

    async fn run_prediction(&self, image: &PreparedImage) -> UiState {
        match self.repository.predict(&image.bytes, &image.file_name).await {
            ApiResult::Success(response) => UiState::Success(response),
            ApiResult::Error(err) => UiState::Error(err.message),
            ApiResult::Loading => UiState::Error(GENERIC_NETWORK_ERROR.to_string()),
        }
    }
}

impl<A: PneumoniaApi + 'static> PneumoniaViewModel<A> {
    /// Runs a health check in the background so start-up never waits on it.
    pub fn spawn_health_check(self: &Arc<Self>) -> JoinHandle<bool> {
        let view_model = Arc::clone(self);
        tokio::spawn(async move { view_model.check_server_health().await })
    }
}

/// Holds the single in-flight slot for one prediction.
///
/// A result is published only if no [`reset`](PneumoniaViewModel::reset)
/// happened since the flight began. Dropped without settling (the caller's
/// future was cancelled), it returns `Loading` to `Idle`. The slot is freed
/// on drop either way.
struct InFlight<'a> {
    state: &'a watch::Sender<UiState>,
    busy: &'a AtomicBool,
    generation: &'a AtomicU64,
    started_in: u64,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn begin(
        state: &'a watch::Sender<UiState>,
        busy: &'a AtomicBool,
        generation: &'a AtomicU64,
    ) -> Option<Self> {
        if busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        // Generation changes happen under the channel lock, so Loading and
        // the generation it belongs to are published together.
        let mut started_in = 0;
        state.send_modify(|current| {
            started_in = generation.load(Ordering::Acquire);
            *current = UiState::Loading;
        });
        Some(Self {
            state,
            busy,
            generation,
            started_in,
            settled: false,
        })
    }

    fn is_current(&self) -> bool {
        self.generation.load(Ordering::Acquire) == self.started_in
    }

    fn settle(mut self, next: UiState) -> Submission {
        self.settled = true;
        let published = self.state.send_if_modified(|current| {
            if self.generation.load(Ordering::Acquire) != self.started_in {
                return false;
            }
            *current = next.clone();
            true
        });
        if !published {
            info!("Flow was reset while in flight; dropping result");
            return Submission::Discarded;
        }
        Submission::Completed(next)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Prediction cancelled while in flight");
            if self.is_current() {
                self.state.send_if_modified(|current| {
                    if current.is_loading() {
                        *current = UiState::Idle;
                        true
                    } else {
                        false
                    }
                });
            }
        }
        self.busy.store(false, Ordering::Release);
    }
}

/// Removes the compressed upload from the cache when the submission ends,
/// including when it is cancelled mid-upload.
struct CachedUpload(PreparedImage);

impl Drop for CachedUpload {
    fn drop(&mut self) {
        if let Err(err) = self.0.discard() {
            warn!("Could not remove cached upload: {}", err);
        }
    }
}
