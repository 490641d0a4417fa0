//! Live camera analysis session.
//!
//! A session owns two timers: the capture timer, which starts one analysis
//! cycle per tick, and a 1-second duration ticker. At most one cycle is in
//! flight at a time; ticks that land during a flight are dropped. Every cycle
//! carries the generation it started under, and results from an older
//! generation are thrown away.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::frame::CapturedFrame;
use crate::analysis::fallback;
use crate::analysis::{FrameAnalyzer, IssueOrigin, PostureIssue, SessionStats, Settings};
use crate::error::PostureProError;
use crate::overlay::{render_overlay, OverlayScene, OverlayStyle, SurfaceSize};
use crate::task::PeriodicTask;

const DURATION_TICK: Duration = Duration::from_secs(1);

/// Supplies camera frames to the session.
///
/// Frames may arrive JPEG-encoded or as raw RGBA, which the session encodes
/// at [`JPEG_QUALITY`](super::frame::JPEG_QUALITY) before upload.
pub trait FrameSource: Send + Sync + 'static {
    /// Acquire the camera. Failure keeps the session idle.
    fn open(&self) -> impl Future<Output = Result<(), PostureProError>> + Send;

    fn capture(&self) -> impl Future<Output = Result<CapturedFrame, PostureProError>> + Send;

    /// Stop every track. Must be safe to call when nothing is open.
    fn release(&self);
}

/// Receives everything the session publishes.
pub trait LiveObserver: Send + Sync + 'static {
    fn on_update(&self, update: &LiveUpdate);
    fn on_stats(&self, stats: &SessionStats);
    fn on_alert(&self, issues: &[PostureIssue]);
}

/// Result of one completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct LiveUpdate {
    pub generation: u64,
    pub issues: Vec<PostureIssue>,
    pub stats: SessionStats,
    pub overlay: OverlayScene,
    pub origin: IssueOrigin,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveSnapshot {
    pub active: bool,
    pub analyzing: bool,
    pub generation: u64,
    pub settings: Settings,
    pub stats: SessionStats,
    pub good_posture_percent: u8,
    pub current_issues: Vec<PostureIssue>,
}

struct SessionState {
    active: bool,
    generation: u64,
    settings: Settings,
    stats: SessionStats,
    current_issues: Vec<PostureIssue>,
    last_surface: Option<SurfaceSize>,
    capture_timer: Option<PeriodicTask>,
    duration_timer: Option<PeriodicTask>,
}

struct Inner<S, A, O> {
    source: S,
    analyzer: A,
    observer: O,
    state: Mutex<SessionState>,
    in_flight: Arc<AtomicBool>,
}

/// Clears the single-flight flag when the cycle holding it ends.
struct FlightGuard(Arc<AtomicBool>);

impl FlightGuard {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard(flag.clone()))
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct LiveSession<S, A, O> {
    inner: Arc<Inner<S, A, O>>,
}

impl<S, A, O> Clone for LiveSession<S, A, O> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub fn validate_interval(interval_ms: u64) -> Result<Duration, PostureProError> {
    if interval_ms == 0 {
        return Err(PostureProError::Config(
            "Analysis interval must be a positive number of milliseconds".to_string(),
        ));
    }
    Ok(Duration::from_millis(interval_ms))
}

impl<S, A, O> LiveSession<S, A, O>
where
    S: FrameSource,
    A: FrameAnalyzer,
    O: LiveObserver,
{
    pub fn new(source: S, analyzer: A, observer: O, settings: Settings) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                analyzer,
                observer,
                state: Mutex::new(SessionState {
                    active: false,
                    generation: 0,
                    settings,
                    stats: SessionStats::default(),
                    current_issues: Vec::new(),
                    last_surface: None,
                    capture_timer: None,
                    duration_timer: None,
                }),
                in_flight: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_active(&self) -> bool {
        self.state().active
    }

    pub fn stats(&self) -> SessionStats {
        self.state().stats
    }

    pub fn settings(&self) -> Settings {
        self.state().settings
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        let state = self.state();
        LiveSnapshot {
            active: state.active,
            analyzing: self.inner.in_flight.load(Ordering::Acquire),
            generation: state.generation,
            settings: state.settings,
            stats: state.stats,
            good_posture_percent: state.stats.good_posture_percent(),
            current_issues: state.current_issues.clone(),
        }
    }

    /// Acquire the camera and begin periodic analysis.
    ///
    /// A running session is stopped first so the camera is released before
    /// it is acquired again. Must be called from within a Tokio runtime.
    pub async fn start(&self) -> Result<(), PostureProError> {
        self.stop();
        let period = validate_interval(self.settings().analysis_interval_ms)?;

        if let Err(e) = self.inner.source.open().await {
            warn!("Camera acquisition failed: {}", e);
            return Err(match e {
                PostureProError::Acquisition(_) => e,
                other => PostureProError::Acquisition(other.to_string()),
            });
        }

        let stats = {
            let mut state = self.state();
            state.generation += 1;
            state.stats = SessionStats::default();
            state.current_issues.clear();
            state.active = true;
            state.capture_timer = Some(self.capture_timer(period));
            state.duration_timer = Some(self.duration_timer(state.generation));
            info!(
                "Live session {} started ({} ms interval)",
                state.generation, state.settings.analysis_interval_ms
            );
            state.stats
        };

        self.inner.observer.on_stats(&stats);
        Ok(())
    }

    /// Stop timers, release the camera, and invalidate in-flight cycles.
    pub fn stop(&self) {
        let timers = {
            let mut state = self.state();
            if !state.active {
                return;
            }
            state.active = false;
            state.generation += 1;
            state.current_issues.clear();
            debug!("Live session stopped, generation now {}", state.generation);
            (state.capture_timer.take(), state.duration_timer.take())
        };

        drop(timers);
        self.inner.source.release();
        info!("Live session stopped");
    }

    /// Restart the capture timer at a new period, keeping the session active.
    pub fn set_analysis_interval(&self, interval_ms: u64) -> Result<(), PostureProError> {
        let period = validate_interval(interval_ms)?;
        let mut state = self.state();
        state.settings.analysis_interval_ms = interval_ms;
        if state.active {
            // Replacing the handle cancels the old timer.
            state.capture_timer = Some(self.capture_timer(period));
            info!("Capture interval changed to {} ms", interval_ms);
        }
        Ok(())
    }

    pub fn update_settings(&self, settings: Settings) -> Result<(), PostureProError> {
        validate_interval(settings.analysis_interval_ms)?;
        let interval_changed = {
            let mut state = self.state();
            state.settings.sound_alerts = settings.sound_alerts;
            state.settings.sensitivity = settings.sensitivity;
            state.settings.analysis_interval_ms != settings.analysis_interval_ms
        };
        if interval_changed {
            self.set_analysis_interval(settings.analysis_interval_ms)?;
        }
        Ok(())
    }

    fn capture_timer(&self, period: Duration) -> PeriodicTask {
        let weak = Arc::downgrade(&self.inner);
        PeriodicTask::spawn(period, move || match upgrade(&weak) {
            Some(session) => {
                session.tick();
                ControlFlow::Continue(())
            }
            None => ControlFlow::Break(()),
        })
    }

    fn duration_timer(&self, generation: u64) -> PeriodicTask {
        let weak = Arc::downgrade(&self.inner);
        PeriodicTask::spawn(DURATION_TICK, move || {
            let Some(session) = upgrade(&weak) else {
                return ControlFlow::Break(());
            };
            let stats = {
                let mut state = session.state();
                if !state.active || state.generation != generation {
                    return ControlFlow::Break(());
                }
                state.stats.session_duration_seconds += 1;
                state.stats
            };
            session.inner.observer.on_stats(&stats);
            ControlFlow::Continue(())
        })
    }

    fn tick(&self) {
        let Some(guard) = FlightGuard::try_acquire(&self.inner.in_flight) else {
            debug!("Previous frame still analyzing, tick dropped");
            return;
        };

        let generation = {
            let mut state = self.state();
            if !state.active {
                return;
            }
            state.stats.total_frames += 1;
            state.generation
        };

        let session = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            session.run_cycle(generation).await;
        });
    }

    async fn run_cycle(&self, generation: u64) {
        let (remote, surface) = self.analyze_current_frame().await;

        let (issues, origin) = match remote {
            Ok(issues) => (issues, IssueOrigin::Remote),
            Err(e) => {
                if matches!(e, PostureProError::Offline) {
                    debug!("Offline, using simulated analysis");
                } else {
                    warn!("Frame analysis failed, using simulated analysis: {}", e);
                }
                let sensitivity = self.state().settings.sensitivity;
                (fallback::simulate_frame(sensitivity), IssueOrigin::Simulated)
            }
        };

        let (update, sound_alerts) = {
            let mut state = self.state();
            if !state.active || state.generation != generation {
                debug!(
                    "Discarding result from generation {} (current {})",
                    generation, state.generation
                );
                return;
            }

            state.stats.record(&issues);
            state.current_issues = issues.clone();
            if surface.is_some() {
                state.last_surface = surface;
            }

            let overlay = render_overlay(&issues, state.last_surface, OverlayStyle::Live);
            let update = LiveUpdate {
                generation,
                issues,
                stats: state.stats,
                overlay,
                origin,
            };
            (update, state.settings.sound_alerts)
        };

        self.inner.observer.on_update(&update);
        if sound_alerts && !update.issues.is_empty() {
            self.inner.observer.on_alert(&update.issues);
        }
    }

    /// Capture, encode, and submit the current frame.
    async fn analyze_current_frame(
        &self,
    ) -> (Result<Vec<PostureIssue>, PostureProError>, Option<SurfaceSize>) {
        let frame = match self.inner.source.capture().await {
            Ok(frame) => frame,
            Err(e) => return (Err(e), None),
        };
        let surface = frame.surface();

        let jpeg = match frame.into_jpeg() {
            Ok(jpeg) => jpeg,
            Err(e) => return (Err(e), surface),
        };

        let result = self
            .inner
            .analyzer
            .analyze_frame(jpeg)
            .await
            .map(|analysis| analysis.posture_issues);
        (result, surface)
    }
}

fn upgrade<S, A, O>(weak: &Weak<Inner<S, A, O>>) -> Option<LiveSession<S, A, O>> {
    weak.upgrade().map(|inner| LiveSession { inner })
}
