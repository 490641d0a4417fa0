//! Tauri commands for uploaded-video analysis.

use base64::Engine;
use serde::{Deserialize, Serialize};
use tauri::Manager;
use tracing::info;

use crate::analysis::{AnalysisResult, VideoUpload};
use crate::overlay::{cleared, render_overlay, OverlayScene, OverlayStyle, SurfaceSize};
use crate::state::AppState;
use crate::upload::report::ReportExport;
use crate::upload::VideoAnalysisView;

/// Request payload for video analysis.
#[derive(Debug, Deserialize)]
pub struct AnalyzeVideoRequest {
    pub file_name: String,
    /// MIME type reported by the file input
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Base64-encoded file contents (from frontend FileReader)
    pub video_base64: String,
    /// Duration reported by the player once metadata loaded
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Issues and overlay for the current playback position.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackFrame {
    pub result: Option<AnalysisResult>,
    pub overlay: OverlayScene,
}

#[tauri::command]
pub async fn analyze_video(
    app: tauri::AppHandle,
    request: AnalyzeVideoRequest,
) -> Result<VideoAnalysisView, String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&request.video_base64)
        .map_err(|e| format!("Invalid base64 video data: {}", e))?;
    info!("Analyzing '{}' ({} bytes)", request.file_name, bytes.len());

    let video = VideoUpload {
        file_name: request.file_name,
        bytes,
        mime_type: request
            .mime_type
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    };

    let state = app.state::<AppState>();
    let analysis = state
        .upload
        .analyze(&state.source, video, request.duration)
        .await;
    Ok(VideoAnalysisView::from(&analysis))
}

#[tauri::command]
pub fn issues_at(
    app: tauri::AppHandle,
    time: f64,
    width: u32,
    height: u32,
) -> Result<PlaybackFrame, String> {
    let state = app.state::<AppState>();
    Ok(playback_frame(
        state.upload.result_at(time),
        SurfaceSize::new(width, height),
    ))
}

#[tauri::command]
pub fn export_report(app: tauri::AppHandle) -> Result<ReportExport, String> {
    let state = app.state::<AppState>();
    let report = state
        .upload
        .report()
        .ok_or_else(|| "No analysis to export".to_string())?;
    info!("Exporting report for '{}'", report.video_name);
    Ok(report.export()?)
}

fn playback_frame(result: Option<AnalysisResult>, size: Option<SurfaceSize>) -> PlaybackFrame {
    let overlay = match &result {
        Some(r) => render_overlay(&r.posture_issues, size, OverlayStyle::Playback),
        None => cleared(size),
    };
    PlaybackFrame { result, overlay }
}
