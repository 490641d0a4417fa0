use tauri::Manager;
use tracing::info;

use crate::analysis::PostureApiClient;
use crate::health::{check, HealthReport};
use crate::state::AppState;

#[tauri::command]
pub async fn run_health_check(app: tauri::AppHandle) -> Result<HealthReport, String> {
    info!("Running health check");

    let config = app.state::<AppState>().config();
    // Probes run even in offline mode so the page can show what is reachable.
    let client = PostureApiClient::new(&config.api_base_url)?;
    let report = check(&client, config.offline).await;

    info!(
        "Health check against {}: {}/{} endpoints reachable",
        report.api_base_url,
        report.probes.iter().filter(|p| p.reachable).count(),
        report.probes.len()
    );
    Ok(report)
}
