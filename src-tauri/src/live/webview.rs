//! Bridges the live session to the camera running inside the webview.
//!
//! The webview owns `getUserMedia` and the capture canvas. The backend asks
//! for a frame by emitting `live://capture` with a request id; the UI answers
//! through the `submit_frame` command, which completes the pending request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::frame::{CapturedFrame, FrameSubmission};
use super::session::{FrameSource, LiveObserver, LiveUpdate};
use crate::analysis::{PostureIssue, SessionStats};
use crate::error::PostureProError;

pub const CAPTURE_EVENT: &str = "live://capture";
pub const UPDATE_EVENT: &str = "live://update";
pub const STATS_EVENT: &str = "live://stats";
pub const ALERT_EVENT: &str = "live://alert";
pub const RELEASE_EVENT: &str = "live://release";

/// How long the webview has to answer a capture request.
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

const MAIN_WINDOW: &str = "main";

type PendingFrame = oneshot::Sender<Result<CapturedFrame, PostureProError>>;

#[derive(Debug, Clone, Serialize)]
struct CaptureRequest {
    request_id: u64,
}

#[derive(Debug, Clone, Serialize)]
struct AlertPayload {
    issue_count: usize,
}

#[derive(Clone)]
pub struct WebviewFrameSource {
    app: AppHandle,
    pending: Arc<Mutex<HashMap<u64, PendingFrame>>>,
    next_id: Arc<AtomicU64>,
}

impl WebviewFrameSource {
    pub fn new(app: AppHandle) -> Self {
        Self {
            app,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<u64, PendingFrame>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand a submitted frame to the capture waiting for it.
    ///
    /// Returns false when nothing is waiting (timed out or released).
    pub fn fulfil(&self, submission: FrameSubmission) -> bool {
        let Some(sender) = self.pending().remove(&submission.request_id) else {
            debug!("No capture waiting for request {}", submission.request_id);
            return false;
        };
        sender.send(submission.into_frame()).is_ok()
    }
}

impl FrameSource for WebviewFrameSource {
    async fn open(&self) -> Result<(), PostureProError> {
        if self.app.get_webview_window(MAIN_WINDOW).is_none() {
            return Err(PostureProError::Acquisition(
                "Camera view is not available".to_string(),
            ));
        }
        Ok(())
    }

    async fn capture(&self) -> Result<CapturedFrame, PostureProError> {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending().insert(request_id, tx);

        if let Err(e) = self.app.emit(CAPTURE_EVENT, CaptureRequest { request_id }) {
            self.pending().remove(&request_id);
            return Err(PostureProError::Frame(format!(
                "Failed to request frame: {}",
                e
            )));
        }

        match tokio::time::timeout(CAPTURE_TIMEOUT, rx).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(_)) => Err(PostureProError::Frame(
                "Camera released before the frame arrived".to_string(),
            )),
            Err(_) => {
                self.pending().remove(&request_id);
                Err(PostureProError::Frame(format!(
                    "No frame within {} ms",
                    CAPTURE_TIMEOUT.as_millis()
                )))
            }
        }
    }

    fn release(&self) {
        // Dropping the senders fails any capture still waiting.
        self.pending().clear();
        if let Err(e) = self.app.emit(RELEASE_EVENT, ()) {
            warn!("Failed to emit {}: {}", RELEASE_EVENT, e);
        }
    }
}

/// Forwards session output to the webview as events.
pub struct TauriLiveObserver {
    app: AppHandle,
}

impl TauriLiveObserver {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn emit<T: Serialize + Clone>(&self, event: &str, payload: T) {
        if let Err(e) = self.app.emit(event, payload) {
            warn!("Failed to emit {}: {}", event, e);
        }
    }
}

impl LiveObserver for TauriLiveObserver {
    fn on_update(&self, update: &LiveUpdate) {
        self.emit(UPDATE_EVENT, update.clone());
    }

    fn on_stats(&self, stats: &SessionStats) {
        self.emit(STATS_EVENT, *stats);
    }

    fn on_alert(&self, issues: &[PostureIssue]) {
        self.emit(
            ALERT_EVENT,
            AlertPayload {
                issue_count: issues.len(),
            },
        );
    }
}
