//! 学习系统：预期 vs 实际的反馈闭环
//!
//! learn 把动作结果写回评分器校准窗口，按固定规则派生洞察，并更新以
//! (执行层级, 结果) 为键的模式统计；每个 Action 在进入下一次迭代前恰好产生一条 Learning。
//! 同时向 StateStore 的有界记忆写入一条紧凑摘要，供同类任务的后续 Observe 阶段检索。

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionTier};
use crate::confidence::ConfidenceScorer;
use crate::state::StateStore;
use crate::task::Task;

/// 模式上下文样本上限（FIFO 淘汰）
const CONTEXT_SAMPLE_CAP: usize = 20;
/// 预测与实际的差值超过该值时判定需要重校准
const RECALIBRATION_GAP: f64 = 20.0;
const UNDERCONFIDENCE_CEILING: f64 = 70.0;
const OVERCONFIDENCE_FLOOR: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsightKind {
    RecalibrateDown,
    RecalibrateUp,
    Underconfidence,
    Overconfidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub detail: String,
}

/// 一次动作的反馈输入
#[derive(Debug, Clone, Copy)]
pub struct Feedback {
    pub success: bool,
    pub confidence_at_decision: f64,
}

/// 一次迭代派生的学习记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learning {
    pub predicted: f64,
    pub success: bool,
    pub insights: Vec<Insight>,
    pub recorded_at: DateTime<Utc>,
}

/// (层级, 结果) 组合的累计统计；会话内只增不删
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternStats {
    pub count: u64,
    pub avg_confidence: f64,
    pub contexts: VecDeque<String>,
}

/// 模式表的可序列化条目（快照与审计导出用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternEntry {
    pub tier: ActionTier,
    pub success: bool,
    pub stats: PatternStats,
}

/// 学习系统：校准反馈 + 洞察规则 + 模式统计
#[derive(Debug, Default)]
pub struct LearningSystem {
    patterns: HashMap<(ActionTier, bool), PatternStats>,
}

impl LearningSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn learn(
        &mut self,
        task: &Task,
        action: &Action,
        feedback: &Feedback,
        scorer: &mut ConfidenceScorer,
        store: &mut StateStore,
    ) -> Learning {
        scorer.record_outcome(action.confidence, feedback.success);

        let predicted = feedback.confidence_at_decision;
        let actual = if feedback.success { 100.0 } else { 0.0 };
        let mut insights = Vec::new();

        if (predicted - actual).abs() > RECALIBRATION_GAP {
            if predicted > actual {
                insights.push(Insight {
                    kind: InsightKind::RecalibrateDown,
                    detail: format!(
                        "predicted {} but outcome was {}, confidence should decrease",
                        predicted, actual
                    ),
                });
            } else {
                insights.push(Insight {
                    kind: InsightKind::RecalibrateUp,
                    detail: format!(
                        "predicted {} but outcome was {}, confidence should increase",
                        predicted, actual
                    ),
                });
            }
        }
        if feedback.success && predicted < UNDERCONFIDENCE_CEILING {
            insights.push(Insight {
                kind: InsightKind::Underconfidence,
                detail: format!("action succeeded despite low confidence {}", predicted),
            });
        }
        if !feedback.success && predicted > OVERCONFIDENCE_FLOOR {
            insights.push(Insight {
                kind: InsightKind::Overconfidence,
                detail: format!("high confidence {} did not guarantee success", predicted),
            });
        }

        let stats = self
            .patterns
            .entry((action.tier, feedback.success))
            .or_insert(PatternStats {
                count: 0,
                avg_confidence: 0.0,
                contexts: VecDeque::new(),
            });
        stats.count += 1;
        let n = stats.count as f64;
        stats.avg_confidence = (stats.avg_confidence * (n - 1.0) + predicted) / n;
        stats.contexts.push_back(task.goal());
        while stats.contexts.len() > CONTEXT_SAMPLE_CAP {
            stats.contexts.pop_front();
        }

        let learning = Learning {
            predicted,
            success: feedback.success,
            insights,
            recorded_at: Utc::now(),
        };

        // 紧凑经验摘要，键由任务种类与迭代序号派生，供同类任务的 Observe 检索
        let summary = format!(
            "{} task \"{}\": tier {} {} at confidence {}.",
            task.kind_name(),
            task.goal(),
            action.tier,
            if feedback.success { "succeeded" } else { "failed" },
            predicted
        );
        store.remember(
            format!("experience:{}:{}", task.kind_name(), store.iteration()),
            summary,
        );

        tracing::debug!(
            predicted,
            success = feedback.success,
            insights = learning.insights.len(),
            "learning recorded"
        );
        learning
    }

    /// 模式表导出（按层级与结果排序，保证确定性）
    pub fn patterns(&self) -> Vec<PatternEntry> {
        let mut entries: Vec<PatternEntry> = self
            .patterns
            .iter()
            .map(|((tier, success), stats)| PatternEntry {
                tier: *tier,
                success: *success,
                stats: stats.clone(),
            })
            .collect();
        entries.sort_by_key(|e| (e.tier, e.success));
        entries
    }

    /// 从快照恢复模式表
    pub fn restore(&mut self, entries: &[PatternEntry]) {
        self.patterns = entries
            .iter()
            .map(|e| ((e.tier, e.success), e.stats.clone()))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn action(tier: ActionTier, confidence: f64, success: bool) -> Action {
        Action {
            tier,
            prompt: "p".to_string(),
            confidence,
            success,
            output: None,
            error: None,
            executed_at: Utc::now(),
        }
    }

    fn setup() -> (LearningSystem, ConfidenceScorer, StateStore, Task) {
        (
            LearningSystem::new(),
            ConfidenceScorer::new(0.1, 20),
            StateStore::new(20),
            Task::research("Grid storage", vec![]),
        )
    }

    #[test]
    fn test_overconfident_failure_insights() {
        let (mut ls, mut scorer, mut store, task) = setup();
        let a = action(ActionTier::ExecuteFully, 95.0, false);
        let learning = ls.learn(
            &task,
            &a,
            &Feedback { success: false, confidence_at_decision: 95.0 },
            &mut scorer,
            &mut store,
        );
        let kinds: Vec<_> = learning.insights.iter().map(|i| i.kind).collect();
        assert!(kinds.contains(&InsightKind::RecalibrateDown));
        assert!(kinds.contains(&InsightKind::Overconfidence));
        assert!(!kinds.contains(&InsightKind::Underconfidence));
    }

    #[test]
    fn test_underconfident_success_insights() {
        let (mut ls, mut scorer, mut store, task) = setup();
        let a = action(ActionTier::ExecuteWithMonitoring, 50.0, true);
        let learning = ls.learn(
            &task,
            &a,
            &Feedback { success: true, confidence_at_decision: 50.0 },
            &mut scorer,
            &mut store,
        );
        let kinds: Vec<_> = learning.insights.iter().map(|i| i.kind).collect();
        assert!(kinds.contains(&InsightKind::RecalibrateUp));
        assert!(kinds.contains(&InsightKind::Underconfidence));
    }

    #[test]
    fn test_small_gap_no_recalibration() {
        let (mut ls, mut scorer, mut store, task) = setup();
        let a = action(ActionTier::ExecuteFully, 90.0, true);
        let learning = ls.learn(
            &task,
            &a,
            &Feedback { success: true, confidence_at_decision: 90.0 },
            &mut scorer,
            &mut store,
        );
        assert!(learning.insights.is_empty());
    }

    #[test]
    fn test_pattern_running_average() {
        let (mut ls, mut scorer, mut store, task) = setup();
        for conf in [80.0, 90.0, 100.0] {
            let a = action(ActionTier::ExecuteFully, conf, true);
            ls.learn(
                &task,
                &a,
                &Feedback { success: true, confidence_at_decision: conf },
                &mut scorer,
                &mut store,
            );
        }
        let patterns = ls.patterns();
        assert_eq!(patterns.len(), 1);
        let entry = &patterns[0];
        assert_eq!(entry.stats.count, 3);
        assert!((entry.stats.avg_confidence - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_context_sample_bounded() {
        let (mut ls, mut scorer, mut store, task) = setup();
        for i in 0..25 {
            let a = action(ActionTier::RequestGuidance, 40.0 + i as f64, false);
            ls.learn(
                &task,
                &a,
                &Feedback { success: false, confidence_at_decision: 40.0 },
                &mut scorer,
                &mut store,
            );
        }
        let patterns = ls.patterns();
        assert_eq!(patterns[0].stats.contexts.len(), 20);
    }

    #[test]
    fn test_experience_written_to_memory() {
        let (mut ls, mut scorer, mut store, task) = setup();
        let a = action(ActionTier::ExecuteFully, 92.0, true);
        ls.learn(
            &task,
            &a,
            &Feedback { success: true, confidence_at_decision: 92.0 },
            &mut scorer,
            &mut store,
        );
        let hits = store.recall_prefix("experience:research");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].1.contains("succeeded"));
    }

    #[test]
    fn test_calibration_recorded_into_scorer() {
        let (mut ls, mut scorer, mut store, task) = setup();
        let a = action(ActionTier::ExecuteFully, 90.0, false);
        ls.learn(
            &task,
            &a,
            &Feedback { success: false, confidence_at_decision: 90.0 },
            &mut scorer,
            &mut store,
        );
        assert_eq!(scorer.history().len(), 1);
        assert!((scorer.historical_accuracy() - 0.1).abs() < 1e-9);
    }
}
