use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::time::Instant;

use crate::error::{ErrorSummary, HarnessResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Suite {
    Http,
    Browser,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioReport {
    pub name: String,
    pub suite: Suite,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<ErrorSummary>,
}

/// Result of a whole run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<ScenarioReport>,
}

/// Await one scenario, timing it and turning its error into a report entry
pub async fn run_scenario<T, Fut>(name: &str, suite: Suite, scenario: Fut) -> ScenarioReport
where
    Fut: Future<Output = HarnessResult<T>>,
{
    tracing::info!(scenario = name, "Running scenario");
    let start = Instant::now();
    let result = scenario.await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => {
            tracing::info!(scenario = name, duration_ms, "Scenario passed");
            ScenarioReport {
                name: name.to_string(),
                suite,
                success: true,
                duration_ms,
                error: None,
            }
        }
        Err(e) => {
            if e.is_assertion() {
                tracing::error!(scenario = name, duration_ms, error = %e, "Scenario failed");
            } else {
                tracing::error!(
                    scenario = name,
                    duration_ms,
                    kind = e.kind(),
                    error = %e,
                    "Scenario errored"
                );
            }
            ScenarioReport {
                name: name.to_string(),
                suite,
                success: false,
                duration_ms,
                error: Some(e.to_summary()),
            }
        }
    }
}

impl SuiteReport {
    pub fn new(started_at: DateTime<Utc>, results: Vec<ScenarioReport>) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            started_at,
            finished_at: Utc::now(),
            total: results.len(),
            passed,
            failed: results.len() - passed,
            results,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn write(&self, path: &Path) -> HarnessResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Report written");
        Ok(())
    }

    pub fn log_summary(&self) {
        for result in self.results.iter().filter(|r| !r.success) {
            let message = result
                .error
                .as_ref()
                .map(|e| e.message.as_str())
                .unwrap_or("");
            tracing::warn!(scenario = %result.name, suite = ?result.suite, "FAILED: {}", message);
        }
        tracing::info!(
            total = self.total,
            passed = self.passed,
            failed = self.failed,
            "Acceptance run finished"
        );
    }
}
