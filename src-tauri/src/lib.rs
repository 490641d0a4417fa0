pub mod analysis;
mod commands;
pub mod config;
pub mod error;
pub mod health;
pub mod live;
pub mod overlay;
pub mod state;
pub mod task;
pub mod upload;

pub use error::PostureProError;

use tauri::{Emitter, Manager};
use tracing::warn;

use crate::config::AppConfig;
use crate::live::{LiveSession, TauriLiveObserver, WebviewFrameSource};
use crate::state::{AppLiveSession, AppState};

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tauri::Builder::default()
        .plugin(tauri_plugin_store::Builder::new().build())
        .invoke_handler(tauri::generate_handler![
            commands::config::get_preference,
            commands::config::set_preference,
            commands::config::get_app_config,
            commands::health::run_health_check,
            commands::upload::analyze_video,
            commands::upload::issues_at,
            commands::upload::export_report,
            commands::live::start_live_session,
            commands::live::stop_live_session,
            commands::live::submit_frame,
            commands::live::update_live_settings,
            commands::live::get_live_snapshot,
        ])
        .setup(|app| {
            let handle = app.handle().clone();

            let config = AppConfig::load().unwrap_or_else(|e| {
                warn!("Using default configuration: {:#}", e);
                AppConfig::default()
            });
            let config = config.with_base_url_override(commands::config::read_preference(
                &handle,
                commands::config::PREF_API_BASE_URL,
            ));
            let state = AppState::new(config);

            let session: AppLiveSession = LiveSession::new(
                WebviewFrameSource::new(handle.clone()),
                state.source.clone(),
                TauriLiveObserver::new(handle.clone()),
                commands::config::settings_from_preferences(&handle),
            );

            // Forward upload progress to the UI.
            let mut progress = state.upload.progress().subscribe();
            let emitter = handle.clone();
            tauri::async_runtime::spawn(async move {
                while progress.changed().await.is_ok() {
                    let value = *progress.borrow_and_update();
                    if let Err(e) = emitter.emit(upload::PROGRESS_EVENT, value) {
                        warn!("Failed to emit upload progress: {}", e);
                    }
                }
            });

            app.manage(state);
            app.manage(session);
            Ok(())
        })
        .on_window_event(|window, event| {
            if let tauri::WindowEvent::Destroyed = event {
                if let Some(session) = window.try_state::<AppLiveSession>() {
                    session.stop();
                }
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
