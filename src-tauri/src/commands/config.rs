use tauri::{AppHandle, Manager};
use tauri_plugin_store::StoreExt;
use tracing::{info, warn};

use crate::analysis::{Sensitivity, Settings};
use crate::config::AppConfig;
use crate::state::{AppLiveSession, AppState};

pub const PREFERENCES_STORE: &str = "preferences.json";

pub const PREF_API_BASE_URL: &str = "api_base_url";
pub const PREF_SOUND_ALERTS: &str = "sound_alerts";
pub const PREF_SENSITIVITY: &str = "sensitivity";
pub const PREF_ANALYSIS_INTERVAL: &str = "analysis_interval_ms";

#[tauri::command]
pub fn get_preference(app: AppHandle, key: &str) -> Result<Option<String>, String> {
    info!("Getting preference: {}", key);
    let store = app.store(PREFERENCES_STORE).map_err(|e| {
        warn!("Failed to open store: {}", e);
        e.to_string()
    })?;
    let value = store.get(key).and_then(|v| v.as_str().map(|s| s.to_string()));
    Ok(value)
}

#[tauri::command]
pub async fn set_preference(app: AppHandle, key: &str, value: &str) -> Result<(), String> {
    info!("Setting preference: {} = {}", key, value);
    if key == PREF_API_BASE_URL && !value.trim().is_empty() {
        crate::analysis::client::normalize_base_url(value)?;
    }

    let store = app.store(PREFERENCES_STORE).map_err(|e| {
        warn!("Failed to open store: {}", e);
        e.to_string()
    })?;
    store.set(key, serde_json::json!(value));
    store.save().map_err(|e| {
        warn!("Failed to save store: {}", e);
        e.to_string()
    })?;

    apply_preference(&app, key)
}

/// Effective configuration after preference overrides.
#[tauri::command]
pub fn get_app_config(app: AppHandle) -> Result<AppConfig, String> {
    Ok(app.state::<AppState>().config())
}

/// Push a changed preference into running state.
fn apply_preference(app: &AppHandle, key: &str) -> Result<(), String> {
    match key {
        PREF_API_BASE_URL => {
            let state = app.state::<AppState>();
            let base = AppConfig::load().unwrap_or_else(|e| {
                warn!("Config reload failed, keeping current values: {:#}", e);
                state.config()
            });
            state.apply_config(base.with_base_url_override(read_preference(app, PREF_API_BASE_URL)));
            Ok(())
        }
        PREF_SOUND_ALERTS | PREF_SENSITIVITY | PREF_ANALYSIS_INTERVAL => {
            let session = app.state::<AppLiveSession>();
            session
                .update_settings(settings_from_preferences(app))
                .map_err(String::from)
        }
        _ => Ok(()),
    }
}

pub fn read_preference(app: &AppHandle, key: &str) -> Option<String> {
    let store = app.store(PREFERENCES_STORE).ok()?;
    store
        .get(key)
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .filter(|s| !s.is_empty())
}

/// Live settings from stored preferences, defaulting anything unset or invalid.
pub fn settings_from_preferences(app: &AppHandle) -> Settings {
    parse_settings(
        read_preference(app, PREF_SOUND_ALERTS).as_deref(),
        read_preference(app, PREF_SENSITIVITY).as_deref(),
        read_preference(app, PREF_ANALYSIS_INTERVAL).as_deref(),
    )
}

fn parse_settings(sound: Option<&str>, sensitivity: Option<&str>, interval: Option<&str>) -> Settings {
    let defaults = Settings::default();
    Settings {
        sound_alerts: sound
            .map(|s| s.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.sound_alerts),
        sensitivity: sensitivity
            .and_then(Sensitivity::from_str)
            .unwrap_or(defaults.sensitivity),
        analysis_interval_ms: interval
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(defaults.analysis_interval_ms),
    }
}
