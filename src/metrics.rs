use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Port the agent's built-in metrics listener is exposed on.
pub const METRICS_PORT: u16 = 9252;
pub const METRICS_PATH: &str = "/metrics";

/// Handshake payload advertised to the external monitoring collector. The
/// transport (relation channel) is external; this side only produces the
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeTarget {
    pub hostname: String,
    pub port: u16,
    pub metrics_path: String,
}

impl ScrapeTarget {
    pub fn for_host(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port: METRICS_PORT,
            metrics_path: METRICS_PATH.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_target_payload() {
        let target = ScrapeTarget::for_host("runner.example.com");
        assert_eq!(target.port, 9252);
        assert_eq!(target.metrics_path, "/metrics");

        let json = target.to_json().unwrap();
        let parsed: ScrapeTarget = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, target);
    }
}
