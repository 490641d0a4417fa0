//! Type definitions shared by the upload and live pipelines.
//!
//! Field names follow the analysis service's JSON so the same types
//! deserialize remote bodies and serialize IPC payloads for the UI.

use serde::{Deserialize, Serialize};

/// Issue tags the fallback generator and the summary know about.
pub mod tags {
    pub const NECK_FORWARD: &str = "neck_forward";
    pub const BACK_SLOUCH: &str = "back_slouch";
    pub const UNEVEN_SHOULDERS: &str = "uneven_shoulders";
    pub const KNEE_OVER_TOE: &str = "knee_over_toe";

    /// Breakdown order used by the upload summary.
    pub const KNOWN: [&str; 4] = [NECK_FORWARD, BACK_SLOUCH, KNEE_OVER_TOE, UNEVEN_SHOULDERS];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A single detected deviation from healthy posture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureIssue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub message: String,
    pub severity: Severity,
}

impl PostureIssue {
    pub fn new(issue_type: &str, message: &str, severity: Severity) -> Self {
        Self {
            issue_type: issue_type.to_string(),
            message: message.to_string(),
            severity,
        }
    }
}

/// Outcome of analyzing one sampled instant of an uploaded video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub frame_number: u64,
    /// Seconds from the start of the video
    pub timestamp: f64,
    #[serde(default)]
    pub posture_issues: Vec<PostureIssue>,
    #[serde(default)]
    pub pose_detected: bool,
}

/// Body returned by `/analyze-frame`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameAnalysis {
    #[serde(default)]
    pub posture_issues: Vec<PostureIssue>,
    #[serde(default)]
    pub pose_detected: bool,
    #[serde(default)]
    pub confidence_score: f64,
}

/// Which branch produced the issues for one analysis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueOrigin {
    Remote,
    Simulated,
}

/// Running counters for one live camera session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_frames: u64,
    pub good_posture_frames: u64,
    /// Sum of issue counts, not a frame count
    pub issues_detected: u64,
    pub session_duration_seconds: u64,
}

impl SessionStats {
    /// Classify a completed cycle.
    pub fn record(&mut self, issues: &[PostureIssue]) {
        if issues.is_empty() {
            self.good_posture_frames += 1;
        } else {
            self.issues_detected += issues.len() as u64;
        }
    }

    /// Rounded share of good-posture frames, 0 before the first frame.
    pub fn good_posture_percent(&self) -> u8 {
        if self.total_frames == 0 {
            return 0;
        }
        let pct = (self.good_posture_frames as f64 / self.total_frames as f64) * 100.0;
        pct.round().min(100.0) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    #[default]
    Medium,
    High,
}

impl Sensitivity {
    /// Base probability threshold for simulated live analysis.
    pub fn base_threshold(self) -> f64 {
        match self {
            Sensitivity::High => 0.6,
            Sensitivity::Medium => 0.8,
            Sensitivity::Low => 0.9,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Sensitivity::Low),
            "medium" => Some(Sensitivity::Medium),
            "high" => Some(Sensitivity::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sensitivity::Low => "low",
            Sensitivity::Medium => "medium",
            Sensitivity::High => "high",
        }
    }
}

/// User-adjustable live analysis settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub sound_alerts: bool,
    pub sensitivity: Sensitivity,
    pub analysis_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_alerts: true,
            sensitivity: Sensitivity::Medium,
            analysis_interval_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posture_issue_wire_names() {
        let issue = PostureIssue::new(tags::BACK_SLOUCH, "Slouching detected", Severity::High);
        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains(r#""type":"back_slouch""#));
        assert!(json.contains(r#""severity":"high""#));
    }

    #[test]
    fn test_frame_analysis_missing_issues_defaults_empty() {
        let analysis: FrameAnalysis = serde_json::from_str(r#"{"pose_detected": false}"#).unwrap();
        assert!(analysis.posture_issues.is_empty());
        assert_eq!(analysis.confidence_score, 0.0);
    }

    #[test]
    fn test_analysis_result_deserialize() {
        let json = r#"{
            "frame_number": 15,
            "timestamp": 0.5,
            "posture_issues": [
                {"type": "analysis_error", "message": "Error occurred", "severity": "low"}
            ],
            "pose_detected": true
        }"#;

        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.frame_number, 15);
        assert_eq!(result.posture_issues[0].issue_type, "analysis_error");
        assert_eq!(result.posture_issues[0].severity, Severity::Low);
    }

    #[test]
    fn test_stats_record_classifies_once() {
        let mut stats = SessionStats::default();
        stats.total_frames = 2;
        stats.record(&[]);
        stats.record(&[
            PostureIssue::new(tags::NECK_FORWARD, "a", Severity::Medium),
            PostureIssue::new(tags::BACK_SLOUCH, "b", Severity::High),
        ]);

        assert_eq!(stats.good_posture_frames, 1);
        assert_eq!(stats.issues_detected, 2);
        assert_eq!(stats.good_posture_percent(), 50);
    }

    #[test]
    fn test_good_posture_percent_empty_session() {
        assert_eq!(SessionStats::default().good_posture_percent(), 0);
    }

    #[test]
    fn test_sensitivity_thresholds() {
        assert_eq!(Sensitivity::High.base_threshold(), 0.6);
        assert_eq!(Sensitivity::Medium.base_threshold(), 0.8);
        assert_eq!(Sensitivity::Low.base_threshold(), 0.9);
        assert_eq!(Sensitivity::from_str("HIGH"), Some(Sensitivity::High));
        assert_eq!(Sensitivity::from_str("extreme"), None);
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.sound_alerts);
        assert_eq!(settings.sensitivity, Sensitivity::Medium);
        assert_eq!(settings.analysis_interval_ms, 1000);
    }
}
