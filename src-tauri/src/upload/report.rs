//! JSON export of an uploaded video's analysis.

use serde::{Deserialize, Serialize};

use super::VideoAnalysis;
use crate::analysis::AnalysisResult;
use crate::error::PostureProError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub video_name: String,
    pub duration: f64,
    /// Number of results, not decoded video frames
    pub total_frames: usize,
    /// Results with at least one issue
    pub issues_detected: usize,
    pub analysis_results: Vec<AnalysisResult>,
}

/// Report contents plus the file name the UI should save it under.
#[derive(Debug, Clone, Serialize)]
pub struct ReportExport {
    pub file_name: String,
    pub contents: String,
}

impl AnalysisReport {
    pub fn from_analysis(analysis: &VideoAnalysis) -> Self {
        let results = analysis.timeline.results();
        Self {
            video_name: analysis.video_name.clone(),
            duration: analysis.duration,
            total_frames: results.len(),
            issues_detected: results
                .iter()
                .filter(|r| !r.posture_issues.is_empty())
                .count(),
            analysis_results: results.to_vec(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("posture-analysis-{}.json", self.video_name)
    }

    pub fn export(&self) -> Result<ReportExport, PostureProError> {
        Ok(ReportExport {
            file_name: self.file_name(),
            contents: serde_json::to_string_pretty(self)?,
        })
    }
}
