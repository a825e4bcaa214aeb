//! 任务协调器：对外唯一入口
//!
//! 接收任务、驱动 AgentLoop，循环返回后做质量评估并把完成结果以 fire-and-forget
//! 方式写入产物存储（失败只记日志，不影响结果信封）。多个 run 调用相互独立，
//! 每次执行拥有自己的 AgentLoop 与 StateStore，可并发运行。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::agent::{AgentLoop, AuditTrail, IterationRecord};
use crate::config::AppConfig;
use crate::confidence::{ConfidenceLevel, ConfidenceScorer};
use crate::invoke::{InvokeOptions, Invoker};
use crate::sink::{ArtifactSink, StateSink};
use crate::task::Task;

/// 高置信迭代的判定线（质量分布统计用）
const HIGH_CONFIDENCE_MARK: f64 = 85.0;
const MEDIUM_CONFIDENCE_MARK: f64 = 70.0;

/// 迭代置信度分布
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Distribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// 质量评估：平均置信度达标且至少一半迭代为高置信才算可接受
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub acceptable: bool,
    pub average_confidence: f64,
    pub total_iterations: usize,
    pub high_confidence_count: usize,
    pub distribution: Distribution,
}

/// run 返回的结果信封
#[derive(Debug, Serialize)]
pub struct TaskReport {
    pub task_id: String,
    pub success: bool,
    /// 最近一次成功动作的输出（若有）
    pub result: Option<String>,
    pub error: Option<String>,
    pub iterations: Vec<IterationRecord>,
    pub aggregate_confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub quality: QualityReport,
    pub audit_trail: AuditTrail,
}

/// 任务协调器：持有不可变配置与外部协作方句柄
pub struct TaskCoordinator {
    config: AppConfig,
    invoker: Arc<dyn Invoker>,
    state_sink: Arc<dyn StateSink>,
    artifact_sink: Arc<dyn ArtifactSink>,
}

impl TaskCoordinator {
    pub fn new(
        config: AppConfig,
        invoker: Arc<dyn Invoker>,
        state_sink: Arc<dyn StateSink>,
        artifact_sink: Arc<dyn ArtifactSink>,
    ) -> Self {
        Self {
            config,
            invoker,
            state_sink,
            artifact_sink,
        }
    }

    pub async fn run(&self, task: &Task) -> TaskReport {
        self.run_with_cancel(task, CancellationToken::new()).await
    }

    pub async fn run_with_cancel(&self, task: &Task, cancel: CancellationToken) -> TaskReport {
        let mut agent = AgentLoop::new(
            &self.config.agent,
            self.invoker.clone(),
            self.state_sink.clone(),
            InvokeOptions {
                timeout_secs: self.config.llm.timeout_secs,
            },
        );

        let outcome = agent.run(task, cancel).await;
        let audit_trail = agent.audit_trail();

        let result = audit_trail
            .action_log
            .iter()
            .rev()
            .find(|a| a.success)
            .and_then(|a| a.output.clone());

        let quality = Self::assess_quality(
            &outcome.iterations,
            self.config.agent.confidence_threshold * 100.0,
        );

        let report = TaskReport {
            task_id: task.id.clone(),
            success: outcome.success,
            result,
            error: outcome.error,
            iterations: outcome.iterations,
            aggregate_confidence: outcome.aggregate_confidence,
            confidence_level: ConfidenceScorer::level(outcome.aggregate_confidence),
            quality,
            audit_trail,
        };

        self.store_artifact(task, &report).await;
        report
    }

    /// 迭代置信度的质量评估：平均值达阈值且 ≥50% 迭代为高置信
    fn assess_quality(iterations: &[IterationRecord], min_confidence: f64) -> QualityReport {
        if iterations.is_empty() {
            return QualityReport {
                acceptable: false,
                average_confidence: 0.0,
                total_iterations: 0,
                high_confidence_count: 0,
                distribution: Distribution {
                    high: 0,
                    medium: 0,
                    low: 0,
                },
            };
        }
        let confidences: Vec<f64> = iterations.iter().map(|r| r.confidence).collect();
        let average = confidences.iter().sum::<f64>() / confidences.len() as f64;
        let high = confidences
            .iter()
            .filter(|&&c| c >= HIGH_CONFIDENCE_MARK)
            .count();
        let medium = confidences
            .iter()
            .filter(|&&c| (MEDIUM_CONFIDENCE_MARK..HIGH_CONFIDENCE_MARK).contains(&c))
            .count();
        let low = confidences
            .iter()
            .filter(|&&c| c < MEDIUM_CONFIDENCE_MARK)
            .count();
        QualityReport {
            acceptable: average >= min_confidence && high * 2 >= confidences.len(),
            average_confidence: (average * 10.0).round() / 10.0,
            total_iterations: confidences.len(),
            high_confidence_count: high,
            distribution: Distribution { high, medium, low },
        }
    }

    /// 产物写入是尽力而为的补充步骤，与循环正确性无关
    async fn store_artifact(&self, task: &Task, report: &TaskReport) {
        let blob = match serde_json::to_string_pretty(report) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "artifact serialization failed, skipping");
                return;
            }
        };
        let mut metadata = HashMap::new();
        metadata.insert("task_id".to_string(), task.id.clone());
        metadata.insert("kind".to_string(), task.kind_name().to_string());
        metadata.insert("timestamp".to_string(), Utc::now().to_rfc3339());
        let key = format!("results/{}/{}", task.kind_name(), task.id);
        if let Err(e) = self.artifact_sink.put(&key, &blob, &metadata).await {
            tracing::warn!(error = %e, "artifact persistence failed, continuing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionTier;
    use crate::invoke::{FailingInvoker, MockInvoker};
    use crate::sink::{InMemoryArtifactSink, InMemoryStateSink};

    fn record(iteration: usize, confidence: f64, success: bool) -> IterationRecord {
        IterationRecord {
            iteration,
            confidence,
            tier: ActionTier::from_confidence(confidence),
            action_success: success,
        }
    }

    #[test]
    fn test_quality_empty_not_acceptable() {
        let q = TaskCoordinator::assess_quality(&[], 70.0);
        assert!(!q.acceptable);
        assert_eq!(q.total_iterations, 0);
    }

    #[test]
    fn test_quality_requires_half_high_confidence() {
        // 平均值过线但高置信不足一半
        let q = TaskCoordinator::assess_quality(
            &[
                record(1, 95.0, true),
                record(2, 72.0, true),
                record(3, 73.0, true),
            ],
            70.0,
        );
        assert!(!q.acceptable);
        assert_eq!(q.high_confidence_count, 1);

        let q = TaskCoordinator::assess_quality(
            &[record(1, 95.0, true), record(2, 88.0, true)],
            70.0,
        );
        assert!(q.acceptable);
        assert_eq!(q.distribution.high, 2);
    }

    fn coordinator(invoker: Arc<dyn Invoker>) -> (TaskCoordinator, Arc<InMemoryArtifactSink>) {
        let artifacts = Arc::new(InMemoryArtifactSink::new());
        (
            TaskCoordinator::new(
                AppConfig::default(),
                invoker,
                Arc::new(InMemoryStateSink::new()),
                artifacts.clone(),
            ),
            artifacts,
        )
    }

    #[tokio::test]
    async fn test_run_returns_result_and_stores_artifact() {
        let (coordinator, artifacts) = coordinator(Arc::new(MockInvoker::default()));
        let task = Task::research("Grid storage", vec![]);
        let report = coordinator.run(&task).await;
        assert!(report.success);
        assert!(report.result.is_some());
        assert_eq!(report.confidence_level, ConfidenceLevel::VeryHigh);
        let keys = artifacts.keys();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].contains(&task.id));
    }

    #[tokio::test]
    async fn test_run_surfaces_exhaustion_without_error() {
        let (coordinator, _) = coordinator(Arc::new(FailingInvoker::default()));
        let task = Task::research("Grid storage", vec![]);
        let report = coordinator.run(&task).await;
        assert!(!report.success);
        assert!(report.error.is_none()); // 资源耗尽不是错误
        assert_eq!(report.iterations.len(), 5);
        assert!(!report.quality.acceptable);
    }

    #[tokio::test]
    async fn test_malformed_task_returns_error_envelope() {
        let (coordinator, _) = coordinator(Arc::new(MockInvoker::default()));
        let task = Task::research("", vec![]);
        let report = coordinator.run(&task).await;
        assert!(!report.success);
        assert!(report.error.is_some());
        assert!(report.iterations.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_independent() {
        let (coordinator, artifacts) = coordinator(Arc::new(MockInvoker::default()));
        let coordinator = Arc::new(coordinator);
        let a = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.run(&Task::research("A", vec![])).await })
        };
        let b = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.run(&Task::research("B", vec![])).await })
        };
        let (ra, rb) = (a.await.unwrap(), b.await.unwrap());
        assert!(ra.success && rb.success);
        assert_ne!(ra.task_id, rb.task_id);
        assert_eq!(artifacts.keys().len(), 2);
    }
}
