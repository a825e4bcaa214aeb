//! 推理引擎：观察 → 结论
//!
//! 先从观察集合算出 (quality, reliability, consensus) 三元组，再按固定阈值规则生成结论，
//! 每条结论经 ConfidenceScorer 评分，整步置信度为各结论分数的近因加权聚合。
//! 空观察集合不触发任何规则，只产出一条 preliminary 结论：没有信息不能伪装成高置信。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::confidence::{ConfidenceFactors, ConfidenceScorer};
use crate::task::Task;

/// 结论评分时固定的模型不确定度
const MODEL_UNCERTAINTY: f64 = 0.15;

const QUALITY_THRESHOLD: f64 = 0.7;
const RELIABILITY_THRESHOLD: f64 = 0.8;
const CONSENSUS_THRESHOLD: f64 = 0.7;

/// 一条采集到的上下文；创建后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub source: String,
    pub payload: String,
    pub reliability: f64,
    pub theme: String,
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    pub fn new(
        source: impl Into<String>,
        payload: impl Into<String>,
        reliability: f64,
        theme: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            payload: payload.into(),
            reliability: reliability.clamp(0.0, 1.0),
            theme: theme.into(),
            timestamp: Utc::now(),
        }
    }

    /// 完整度指标：词数越多越完整，10 词封顶
    fn completeness(&self) -> f64 {
        let words = self.payload.split_whitespace().count();
        (words as f64 / 10.0).min(1.0)
    }

    /// 清晰度指标：按句子数分档
    fn clarity(&self) -> f64 {
        let sentences = self
            .payload
            .split(['.', '!', '?'])
            .filter(|s| !s.trim().is_empty())
            .count();
        match sentences {
            0 => 0.0,
            1 => 0.6,
            2 => 0.8,
            _ => 1.0,
        }
    }
}

/// 观察集合的分析三元组
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Analysis {
    pub quality: f64,
    pub reliability: f64,
    pub consensus: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConclusionKind {
    HighConfidence,
    ReliableSource,
    ConsensusReached,
    Preliminary,
}

/// 一条推理输出，归属于产出它的 ReasoningStep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conclusion {
    pub kind: ConclusionKind,
    pub statement: String,
    pub rationale: String,
    pub confidence: f64,
}

/// 单次 Reason 调用的结果；记录后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub observations_used: usize,
    pub analysis: Analysis,
    pub conclusions: Vec<Conclusion>,
    /// 各结论分数的聚合值
    pub confidence: f64,
}

/// 推理引擎：保留完整推理链以供审计回放
#[derive(Debug, Default)]
pub struct ReasoningEngine {
    chain: Vec<ReasoningStep>,
}

impl ReasoningEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 计算观察集合的分析三元组；空集合三项均为 0，单条观察 consensus 为 1
    pub fn analyze(observations: &[Observation]) -> Analysis {
        if observations.is_empty() {
            return Analysis {
                quality: 0.0,
                reliability: 0.0,
                consensus: 0.0,
            };
        }
        let n = observations.len() as f64;
        let quality = observations
            .iter()
            .map(|o| o.completeness() * o.clarity())
            .sum::<f64>()
            / n;
        let reliability = observations.iter().map(|o| o.reliability).sum::<f64>() / n;
        let consensus = if observations.len() < 2 {
            1.0
        } else {
            let mut themes: HashMap<&str, usize> = HashMap::new();
            for o in observations {
                *themes.entry(o.theme.as_str()).or_insert(0) += 1;
            }
            let dominant = themes.values().copied().max().unwrap_or(0);
            dominant as f64 / n
        };
        Analysis {
            quality,
            reliability,
            consensus,
        }
    }

    /// 固定阈值规则生成结论并评分；结论列表永不为空
    pub fn reason(
        &mut self,
        observations: &[Observation],
        task: &Task,
        scorer: &ConfidenceScorer,
    ) -> ReasoningStep {
        let analysis = Self::analyze(observations);
        let mut conclusions = Vec::new();

        if analysis.quality > QUALITY_THRESHOLD {
            conclusions.push(Conclusion {
                kind: ConclusionKind::HighConfidence,
                statement: format!("Gathered context supports acting on \"{}\".", task.goal()),
                rationale: format!("observation quality {:.2} above {}", analysis.quality, QUALITY_THRESHOLD),
                confidence: 0.0,
            });
        }
        if analysis.reliability > RELIABILITY_THRESHOLD {
            conclusions.push(Conclusion {
                kind: ConclusionKind::ReliableSource,
                statement: "Sources backing this step are reliable.".to_string(),
                rationale: format!(
                    "mean source reliability {:.2} above {}",
                    analysis.reliability, RELIABILITY_THRESHOLD
                ),
                confidence: 0.0,
            });
        }
        if analysis.consensus > CONSENSUS_THRESHOLD {
            conclusions.push(Conclusion {
                kind: ConclusionKind::ConsensusReached,
                statement: "Observations converge on a single theme.".to_string(),
                rationale: format!("theme consensus {:.2} above {}", analysis.consensus, CONSENSUS_THRESHOLD),
                confidence: 0.0,
            });
        }
        if conclusions.is_empty() {
            conclusions.push(Conclusion {
                kind: ConclusionKind::Preliminary,
                statement: format!(
                    "Preliminary assessment only: more data needed before acting on \"{}\".",
                    task.goal()
                ),
                rationale: "no quality, reliability or consensus rule fired".to_string(),
                confidence: 0.0,
            });
        }

        let historical_accuracy = scorer.historical_accuracy();
        for c in &mut conclusions {
            c.confidence = scorer.score(&ConfidenceFactors {
                data_quality: analysis.quality,
                source_reliability: analysis.reliability,
                model_uncertainty: MODEL_UNCERTAINTY,
                historical_accuracy,
                consensus_level: analysis.consensus,
            });
        }

        let scores: Vec<f64> = conclusions.iter().map(|c| c.confidence).collect();
        let step = ReasoningStep {
            observations_used: observations.len(),
            analysis,
            conclusions,
            confidence: scorer.aggregate(&scores),
        };
        tracing::debug!(
            observations = step.observations_used,
            conclusions = step.conclusions.len(),
            confidence = step.confidence,
            "reasoning step completed"
        );
        self.chain.push(step.clone());
        step
    }

    /// 完整推理链（按时间顺序），用于审计与可解释性
    pub fn chain(&self) -> &[ReasoningStep] {
        &self.chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> ConfidenceScorer {
        ConfidenceScorer::new(0.1, 20)
    }

    fn rich(source: &str, reliability: f64, theme: &str) -> Observation {
        Observation::new(
            source,
            "Solar adoption grew steadily over the last decade across most markets. \
             Storage costs continue to decline year over year. \
             Policy support remains strong in the regions analyzed.",
            reliability,
            theme,
        )
    }

    #[test]
    fn test_empty_observations_yield_single_preliminary() {
        let mut engine = ReasoningEngine::new();
        let task = Task::research("X", vec![]);
        let step = engine.reason(&[], &task, &scorer());
        assert_eq!(step.conclusions.len(), 1);
        assert_eq!(step.conclusions[0].kind, ConclusionKind::Preliminary);
        assert_eq!(step.analysis.quality, 0.0);
        assert_eq!(step.analysis.reliability, 0.0);
        assert_eq!(step.analysis.consensus, 0.0);
    }

    #[test]
    fn test_preliminary_scores_below_triggered_conclusions() {
        let mut engine = ReasoningEngine::new();
        let task = Task::research("X", vec![]);
        let preliminary = engine.reason(&[], &task, &scorer());
        let strong = engine.reason(
            &[rich("a", 0.95, "research"), rich("b", 0.9, "research")],
            &task,
            &scorer(),
        );
        assert!(preliminary.confidence < strong.confidence);
        for c in &strong.conclusions {
            assert!(preliminary.conclusions[0].confidence < c.confidence);
        }
    }

    #[test]
    fn test_threshold_rules_fire_together() {
        let mut engine = ReasoningEngine::new();
        let task = Task::research("Grid storage", vec![]);
        let step = engine.reason(
            &[rich("a", 0.95, "research"), rich("b", 0.9, "research")],
            &task,
            &scorer(),
        );
        let kinds: Vec<_> = step.conclusions.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&ConclusionKind::HighConfidence));
        assert!(kinds.contains(&ConclusionKind::ReliableSource));
        assert!(kinds.contains(&ConclusionKind::ConsensusReached));
        assert!(step.confidence >= 90.0);
    }

    #[test]
    fn test_single_observation_consensus_is_one() {
        let a = ReasoningEngine::analyze(&[rich("a", 0.5, "research")]);
        assert_eq!(a.consensus, 1.0);
    }

    #[test]
    fn test_mixed_themes_lower_consensus() {
        let a = ReasoningEngine::analyze(&[
            rich("a", 0.9, "research"),
            rich("b", 0.9, "error"),
        ]);
        assert!((a.consensus - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_chain_records_every_step() {
        let mut engine = ReasoningEngine::new();
        let task = Task::research("X", vec![]);
        let s = scorer();
        engine.reason(&[], &task, &s);
        engine.reason(&[rich("a", 0.9, "research")], &task, &s);
        assert_eq!(engine.chain().len(), 2);
        assert_eq!(engine.chain()[0].observations_used, 0);
        assert_eq!(engine.chain()[1].observations_used, 1);
    }
}
