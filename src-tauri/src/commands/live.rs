//! Tauri commands driving the live camera session.

use tauri::Manager;
use tracing::{debug, info};

use crate::analysis::Settings;
use crate::live::{FrameSubmission, LiveSnapshot};
use crate::state::AppLiveSession;

/// Start analysis once the webview has the camera stream.
#[tauri::command]
pub async fn start_live_session(
    app: tauri::AppHandle,
    settings: Option<Settings>,
) -> Result<LiveSnapshot, String> {
    let session = app.state::<AppLiveSession>().inner().clone();
    if let Some(settings) = settings {
        session.update_settings(settings)?;
    }
    session.start().await?;
    info!("Live session started");
    Ok(session.snapshot())
}

#[tauri::command]
pub fn stop_live_session(app: tauri::AppHandle) -> Result<LiveSnapshot, String> {
    let session = app.state::<AppLiveSession>();
    session.stop();
    Ok(session.snapshot())
}

/// Answer a `live://capture` request.
#[tauri::command]
pub fn submit_frame(app: tauri::AppHandle, submission: FrameSubmission) -> Result<bool, String> {
    let request_id = submission.request_id;
    let delivered = app.state::<AppLiveSession>().source().fulfil(submission);
    if !delivered {
        debug!("Frame {} arrived after its capture was abandoned", request_id);
    }
    Ok(delivered)
}

/// Async so a restarted capture timer lands on the Tokio runtime.
#[tauri::command]
pub async fn update_live_settings(
    app: tauri::AppHandle,
    settings: Settings,
) -> Result<LiveSnapshot, String> {
    let session = app.state::<AppLiveSession>();
    session.update_settings(settings)?;
    Ok(session.snapshot())
}

#[tauri::command]
pub fn get_live_snapshot(app: tauri::AppHandle) -> Result<LiveSnapshot, String> {
    Ok(app.state::<AppLiveSession>().snapshot())
}
