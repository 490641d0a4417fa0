//! Reachability report for the analysis service.

use serde::Serialize;

use crate::analysis::{PostureApiClient, ProbeResult};

/// Endpoints checked on the health page, in display order.
pub const PROBED_ENDPOINTS: [&str; 3] = ["/", "/health", "/stats"];

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub api_base_url: String,
    pub offline: bool,
    /// `status` field reported by `/health`, if any
    pub backend_status: Option<String>,
    pub probes: Vec<ProbeResult>,
    pub all_reachable: bool,
    pub checked_at: String,
}

pub async fn check(client: &PostureApiClient, offline: bool) -> HealthReport {
    let mut probes = Vec::with_capacity(PROBED_ENDPOINTS.len());
    for endpoint in PROBED_ENDPOINTS {
        probes.push(client.probe(endpoint).await);
    }

    let backend_status = probes
        .iter()
        .find(|p| p.endpoint == "/health")
        .and_then(|p| p.body.as_ref())
        .and_then(|body| body.get("status"))
        .and_then(|s| s.as_str())
        .map(|s| s.to_string());

    HealthReport {
        api_base_url: client.base_url().to_string(),
        offline,
        backend_status,
        all_reachable: probes.iter().all(|p| p.reachable),
        probes,
        checked_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_service_report() {
        let client = PostureApiClient::new("http://127.0.0.1:9").unwrap();
        let report = check(&client, true).await;

        assert_eq!(report.probes.len(), 3);
        assert_eq!(report.probes[1].endpoint, "/health");
        assert!(!report.all_reachable);
        assert!(report.backend_status.is_none());
        assert!(report.offline);
        assert!(chrono::DateTime::parse_from_rfc3339(&report.checked_at).is_ok());
    }
}
