//! Playback-time lookup over an uploaded video's analysis results.

use std::collections::HashMap;

use serde::Serialize;

use super::types::{tags, AnalysisResult};

/// Maximum distance between playback time and a result's timestamp.
pub const ALIGNMENT_TOLERANCE_SECS: f64 = 0.5;

/// The authoritative, timestamp-ordered results for one video.
#[derive(Debug, Clone, Default)]
pub struct AnalysisTimeline {
    results: Vec<AnalysisResult>,
}

impl AnalysisTimeline {
    /// Takes ownership of the producer's results, re-establishing ascending order.
    pub fn new(mut results: Vec<AnalysisResult>) -> Self {
        results.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self { results }
    }

    pub fn results(&self) -> &[AnalysisResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Result aligned with playback time `t`, if any lies within tolerance.
    ///
    /// When two results qualify the earlier timestamp wins.
    pub fn at(&self, t: f64) -> Option<&AnalysisResult> {
        if !t.is_finite() {
            return None;
        }
        let first = self
            .results
            .partition_point(|r| r.timestamp <= t - ALIGNMENT_TOLERANCE_SECS);
        self.results
            .get(first)
            .filter(|r| (r.timestamp - t).abs() < ALIGNMENT_TOLERANCE_SECS)
    }

    pub fn summary(&self) -> TimelineSummary {
        let total = self.results.len();
        let frames_with_pose = self.results.iter().filter(|r| r.pose_detected).count();
        let frames_with_issues = self
            .results
            .iter()
            .filter(|r| !r.posture_issues.is_empty())
            .count();

        let good_posture_percent = if total == 0 {
            0
        } else {
            (((total - frames_with_issues) as f64 / total as f64) * 100.0).round() as u8
        };

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for issue in self.results.iter().flat_map(|r| &r.posture_issues) {
            *counts.entry(issue.issue_type.as_str()).or_default() += 1;
        }
        let issue_breakdown = tags::KNOWN
            .iter()
            .filter_map(|tag| {
                counts.get(tag).map(|&count| IssueCount {
                    issue_type: tag.to_string(),
                    count,
                })
            })
            .collect();

        TimelineSummary {
            total_results: total,
            frames_with_pose,
            frames_with_issues,
            good_posture_percent,
            issue_breakdown,
        }
    }
}

/// Occurrences of one issue tag across a video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueCount {
    pub issue_type: String,
    pub count: usize,
}

/// Aggregate view shown next to the player once analysis completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSummary {
    pub total_results: usize,
    pub frames_with_pose: usize,
    pub frames_with_issues: usize,
    pub good_posture_percent: u8,
    /// Known tags only, in display order, zero counts omitted
    pub issue_breakdown: Vec<IssueCount>,
}
