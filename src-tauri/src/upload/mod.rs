//! Whole-video analysis for uploaded recordings.
//!
//! The file goes to the analysis service in a single request. If that fails
//! for any reason a simulated result set covering the video is synthesized
//! instead, so playback always has something to align against.

pub mod report;

use std::ops::ControlFlow;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::analysis::fallback;
use crate::analysis::{
    AnalysisResult, AnalysisTimeline, IssueOrigin, TimelineSummary, VideoAnalyzer, VideoUpload,
};
use crate::error::PostureProError;
use crate::task::PeriodicTask;

pub use report::AnalysisReport;

pub const PROGRESS_EVENT: &str = "upload://progress";

const PROGRESS_TICK: Duration = Duration::from_millis(200);
const PROGRESS_STEP: u8 = 10;
const PROGRESS_DONE: u8 = 100;

/// Upload progress in percent, observable through [`subscribe`](Self::subscribe).
pub struct ProgressTracker {
    tx: watch::Sender<u8>,
    ticker: Mutex<Option<PeriodicTask>>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            tx,
            ticker: Mutex::new(None),
        }
    }

    fn ticker(&self) -> MutexGuard<'_, Option<PeriodicTask>> {
        self.ticker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.tx.subscribe()
    }

    pub fn value(&self) -> u8 {
        *self.tx.borrow()
    }

    pub fn reset(&self) {
        self.ticker().take();
        self.tx.send_replace(0);
    }

    pub fn complete(&self) {
        self.ticker().take();
        self.tx.send_replace(PROGRESS_DONE);
    }

    /// Climb to 100 in steps of 10 every 200 ms, then stop.
    pub fn simulate(&self) {
        let tx = self.tx.clone();
        let task = PeriodicTask::spawn(PROGRESS_TICK, move || {
            let mut reached = PROGRESS_DONE;
            tx.send_modify(|p| {
                *p = p.saturating_add(PROGRESS_STEP).min(PROGRESS_DONE);
                reached = *p;
            });
            if reached >= PROGRESS_DONE {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        *self.ticker() = Some(task);
    }
}

/// The authoritative analysis of one uploaded video.
#[derive(Debug, Clone)]
pub struct VideoAnalysis {
    pub video_name: String,
    pub duration: f64,
    pub timeline: AnalysisTimeline,
    pub origin: IssueOrigin,
}

/// What the UI receives once analysis completes.
#[derive(Debug, Clone, Serialize)]
pub struct VideoAnalysisView {
    pub video_name: String,
    pub duration: f64,
    pub origin: IssueOrigin,
    pub results: Vec<AnalysisResult>,
    pub summary: TimelineSummary,
}

impl From<&VideoAnalysis> for VideoAnalysisView {
    fn from(analysis: &VideoAnalysis) -> Self {
        Self {
            video_name: analysis.video_name.clone(),
            duration: analysis.duration,
            origin: analysis.origin,
            results: analysis.timeline.results().to_vec(),
            summary: analysis.timeline.summary(),
        }
    }
}

/// Holds progress and the current video's results.
#[derive(Default)]
pub struct UploadPipeline {
    progress: ProgressTracker,
    current: Mutex<Option<VideoAnalysis>>,
}

impl UploadPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    fn current_slot(&self) -> MutexGuard<'_, Option<VideoAnalysis>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Option<VideoAnalysis> {
        self.current_slot().clone()
    }

    /// Analyze `video`, falling back to simulated results on any failure.
    ///
    /// `duration` is what the player reported; see
    /// [`fallback::effective_duration`].
    pub async fn analyze<A: VideoAnalyzer>(
        &self,
        analyzer: &A,
        video: VideoUpload,
        duration: Option<f64>,
    ) -> VideoAnalysis {
        self.analyze_with(analyzer, video, duration, fallback::simulate_video)
            .await
    }

    /// [`analyze`](Self::analyze) with an explicit fallback generator.
    pub async fn analyze_with<A, G>(
        &self,
        analyzer: &A,
        video: VideoUpload,
        duration: Option<f64>,
        generate: G,
    ) -> VideoAnalysis
    where
        A: VideoAnalyzer,
        G: FnOnce(f64) -> Vec<AnalysisResult>,
    {
        self.progress.reset();
        let video_name = video.file_name.clone();
        let duration = fallback::effective_duration(duration);

        let (results, origin) = match analyzer.analyze_video(video).await {
            Ok(results) => {
                info!("Received {} results for '{}'", results.len(), video_name);
                self.progress.complete();
                (results, IssueOrigin::Remote)
            }
            Err(e) => {
                log_fallback(&video_name, &e);
                self.progress.simulate();
                (generate(duration), IssueOrigin::Simulated)
            }
        };

        let analysis = VideoAnalysis {
            video_name,
            duration,
            timeline: AnalysisTimeline::new(results),
            origin,
        };
        *self.current_slot() = Some(analysis.clone());
        analysis
    }

    /// Result aligned with playback time `t` for the current video.
    pub fn result_at(&self, t: f64) -> Option<AnalysisResult> {
        self.current_slot()
            .as_ref()
            .and_then(|analysis| analysis.timeline.at(t).cloned())
    }

    pub fn report(&self) -> Option<AnalysisReport> {
        self.current_slot().as_ref().map(AnalysisReport::from_analysis)
    }
}

fn log_fallback(video_name: &str, err: &PostureProError) {
    if matches!(err, PostureProError::Offline) {
        debug!("Offline, simulating analysis for '{}'", video_name);
    } else {
        warn!(
            "Video analysis failed for '{}', using simulated results: {}",
            video_name, err
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{tags, PostureIssue, Severity};

    struct Unreachable;

    impl VideoAnalyzer for Unreachable {
        async fn analyze_video(
            &self,
            _video: VideoUpload,
        ) -> Result<Vec<AnalysisResult>, PostureProError> {
            Err(PostureProError::Transport {
                url: "http://localhost:8000/analyze".to_string(),
                message: "connection refused".to_string(),
            })
        }
    }

    struct Canned(Vec<AnalysisResult>);

    impl VideoAnalyzer for Canned {
        async fn analyze_video(
            &self,
            _video: VideoUpload,
        ) -> Result<Vec<AnalysisResult>, PostureProError> {
            Ok(self.0.clone())
        }
    }

    fn upload() -> VideoUpload {
        VideoUpload {
            file_name: "squat.mp4".to_string(),
            bytes: vec![0; 16],
            mime_type: "video/mp4".to_string(),
        }
    }

    fn result(timestamp: f64, issues: Vec<PostureIssue>) -> AnalysisResult {
        AnalysisResult {
            frame_number: (timestamp * 30.0) as u64,
            timestamp,
            posture_issues: issues,
            pose_detected: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_success_sets_progress_complete() {
        let pipeline = UploadPipeline::new();
        let canned = Canned(vec![result(0.5, vec![]), result(0.0, vec![])]);

        let analysis = pipeline.analyze(&canned, upload(), Some(1.0)).await;
        assert_eq!(analysis.origin, IssueOrigin::Remote);
        assert_eq!(analysis.timeline.results()[0].timestamp, 0.0);
        assert_eq!(pipeline.progress().value(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_progress_climbs_in_steps() {
        let pipeline = UploadPipeline::new();
        let analysis = pipeline
            .analyze_with(&Unreachable, upload(), Some(3.0), |d| {
                fallback::video_results(d, &mut || 0.0)
            })
            .await;

        assert_eq!(analysis.origin, IssueOrigin::Simulated);
        assert_eq!(analysis.timeline.len(), 6);
        assert_eq!(pipeline.progress().value(), 0);

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(pipeline.progress().value(), 20);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(pipeline.progress().value(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_duration_spans_ten_seconds() {
        let pipeline = UploadPipeline::new();
        let analysis = pipeline
            .analyze_with(&Unreachable, upload(), None, |d| {
                fallback::video_results(d, &mut || 0.0)
            })
            .await;
        assert_eq!(analysis.duration, 10.0);
        assert_eq!(analysis.timeline.len(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_video_replaces_previous_results() {
        let pipeline = UploadPipeline::new();
        let neck = PostureIssue::new(tags::NECK_FORWARD, "neck", Severity::Medium);
        pipeline
            .analyze(&Canned(vec![result(0.0, vec![neck])]), upload(), Some(1.0))
            .await;
        assert_eq!(pipeline.result_at(0.1).unwrap().posture_issues.len(), 1);

        pipeline
            .analyze(&Canned(vec![result(0.0, vec![])]), upload(), Some(1.0))
            .await;
        assert!(pipeline.result_at(0.1).unwrap().posture_issues.is_empty());
        assert!(pipeline.result_at(4.0).is_none());
    }
}
