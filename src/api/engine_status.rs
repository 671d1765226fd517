use serde::{Serialize, Deserialize};

use crate::logic::config::MonitorConfig;
use crate::logic::model::{ArtifactKind, ArtifactStatus, InferenceStats, ModelContext};
use crate::logic::monitor::HistorySummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub source: String,
    pub risk_policy: String,
    pub lifespan_strategy: String,
    pub poll_interval_ms: u64,

    pub models: Vec<ModelStatus>,
    pub history: HistorySummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub artifact: String, // "classifier" | "scaler" | "regressor"
    pub loaded: bool,
    pub detail: ArtifactStatus,
    pub inference: Option<InferenceStats>,
}

impl EngineStatus {
    pub fn collect(config: &MonitorConfig, context: &ModelContext, history: HistorySummary) -> Self {
        let models = [ArtifactKind::Classifier, ArtifactKind::Scaler, ArtifactKind::Regressor]
            .into_iter()
            .map(|kind| {
                let detail = context.status(kind);
                ModelStatus {
                    artifact: kind.to_string(),
                    loaded: detail.is_loaded(),
                    detail,
                    inference: context.inference_stats(kind),
                }
            })
            .collect();

        Self {
            source: config.source.as_str().to_string(),
            risk_policy: config.risk_policy.as_str().to_string(),
            lifespan_strategy: config.lifespan_strategy.as_str().to_string(),
            poll_interval_ms: config.poll_interval_ms,
            models,
            history,
        }
    }

    pub fn render(&self) -> String {
        let mut out = vec![format!(
            "Source: {} | Risk: {} | Lifespan: {} | Poll: {}ms",
            self.source, self.risk_policy, self.lifespan_strategy, self.poll_interval_ms
        )];
        for model in &self.models {
            match &model.inference {
                Some(stats) => out.push(format!(
                    "  {:<10} {:?} ({} runs, avg {:.2}ms)",
                    model.artifact, model.detail, stats.inference_count, stats.avg_latency_ms
                )),
                None => out.push(format!("  {:<10} {:?}", model.artifact, model.detail)),
            }
        }
        out.push(format!(
            "History: {}/{} results, {} recorded in total",
            self.history.size, self.history.capacity, self.history.total_pushed
        ));
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::monitor::PredictionHistory;

    #[test]
    fn test_collect_empty_context() {
        let status = EngineStatus::collect(
            &MonitorConfig::default(),
            &ModelContext::empty(),
            PredictionHistory::new(10).summary(),
        );

        assert_eq!(status.source, "simulated");
        assert_eq!(status.models.len(), 3);
        assert!(status.models.iter().all(|m| !m.loaded));

        let text = status.render();
        assert!(text.contains("classifier"));
        assert!(text.contains("History: 0/10"));
    }
}
