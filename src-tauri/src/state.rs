use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::analysis::{AnalysisSource, SharedSource};
use crate::config::AppConfig;
use crate::live::{LiveSession, TauriLiveObserver, WebviewFrameSource};
use crate::upload::UploadPipeline;

/// The live session as wired into the desktop app.
pub type AppLiveSession = LiveSession<WebviewFrameSource, SharedSource, TauriLiveObserver>;

/// Process-wide state managed by Tauri.
pub struct AppState {
    config: Mutex<AppConfig>,
    pub source: SharedSource,
    pub upload: UploadPipeline,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let source = SharedSource::new(source_for(&config));
        Self {
            config: Mutex::new(config),
            source,
            upload: UploadPipeline::new(),
        }
    }

    fn config_slot(&self) -> MutexGuard<'_, AppConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> AppConfig {
        self.config_slot().clone()
    }

    /// Swap in a new configuration and rebuild the analysis source.
    pub fn apply_config(&self, config: AppConfig) {
        self.source.replace(source_for(&config));
        info!(
            "Analysis source now {} ({})",
            if config.offline { "simulated" } else { "remote" },
            config.api_base_url
        );
        *self.config_slot() = config;
    }
}

fn source_for(config: &AppConfig) -> AnalysisSource {
    config.analysis_source().unwrap_or_else(|e| {
        warn!("Falling back to simulated analysis: {}", e);
        AnalysisSource::Simulated
    })
}
