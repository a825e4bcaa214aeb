//! 多因子置信度评分与校准
//!
//! score 用固定权重将五个因子合成 0–100 分；aggregate 按时间指数加权聚合多次评分；
//! record_outcome 维护有界校准历史，滚动得出 historical_accuracy 供后续评分使用。
//! 权重方案是确定性的设计选择：同样的输入永远得到同样的分数，校准行为依赖这一可复现性。

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// 评分因子，取值均在 [0,1]；越界输入在加权前被钳制
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceFactors {
    pub data_quality: f64,
    pub source_reliability: f64,
    /// 模型不确定度：加权时取反（1 − uncertainty）
    pub model_uncertainty: f64,
    pub historical_accuracy: f64,
    pub consensus_level: f64,
}

/// 一次预测与实际结果的对照记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub predicted: f64,
    pub success: bool,
}

/// 置信度等级标签（用于结果呈现）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceLevel {
    VeryHigh,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLevel::VeryHigh => write!(f, "very-high"),
            ConfidenceLevel::High => write!(f, "high"),
            ConfidenceLevel::Medium => write!(f, "medium"),
            ConfidenceLevel::Low => write!(f, "low"),
        }
    }
}

const W_DATA_QUALITY: f64 = 0.25;
const W_SOURCE_RELIABILITY: f64 = 0.20;
const W_MODEL_CERTAINTY: f64 = 0.20;
const W_HISTORICAL_ACCURACY: f64 = 0.20;
const W_CONSENSUS: f64 = 0.15;

/// 置信度评分器：固定权重加权 + 指数近因聚合 + 有界校准窗口
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    /// 聚合时的指数衰减系数 k：weight(i) = exp(−k·(n−i−1))，最近的评分权重最高
    decay: f64,
    /// 校准窗口容量（与记忆容量一致）
    capacity: usize,
    history: VecDeque<CalibrationRecord>,
}

impl ConfidenceScorer {
    pub fn new(decay: f64, capacity: usize) -> Self {
        Self {
            decay,
            capacity,
            history: VecDeque::new(),
        }
    }

    /// 固定权重加权求和，缩放到 [0,100] 并取整；越界因子先钳制到 [0,1]
    pub fn score(&self, factors: &ConfidenceFactors) -> f64 {
        let dq = factors.data_quality.clamp(0.0, 1.0);
        let sr = factors.source_reliability.clamp(0.0, 1.0);
        let mu = factors.model_uncertainty.clamp(0.0, 1.0);
        let ha = factors.historical_accuracy.clamp(0.0, 1.0);
        let cl = factors.consensus_level.clamp(0.0, 1.0);

        let raw = W_DATA_QUALITY * dq
            + W_SOURCE_RELIABILITY * sr
            + W_MODEL_CERTAINTY * (1.0 - mu)
            + W_HISTORICAL_ACCURACY * ha
            + W_CONSENSUS * cl;

        (raw * 100.0).round().clamp(0.0, 100.0)
    }

    /// 指数近因加权平均：空序列返回 0，单元素返回其取整值
    pub fn aggregate(&self, scores: &[f64]) -> f64 {
        if scores.is_empty() {
            return 0.0;
        }
        let n = scores.len();
        let mut weighted = 0.0;
        let mut total = 0.0;
        for (i, s) in scores.iter().enumerate() {
            let w = (-self.decay * ((n - 1 - i) as f64)).exp();
            weighted += w * s;
            total += w;
        }
        (weighted / total).round().clamp(0.0, 100.0)
    }

    /// 记录一次预测与实际结果；窗口超出容量时淘汰最旧记录
    pub fn record_outcome(&mut self, predicted: f64, success: bool) {
        self.history.push_back(CalibrationRecord { predicted, success });
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    /// 滚动历史准确度：1 − mean(|predicted − actual·100| / 100)；
    /// 无校准记录时返回 1.0（尚无失准证据）
    pub fn historical_accuracy(&self) -> f64 {
        if self.history.is_empty() {
            return 1.0;
        }
        let sum: f64 = self
            .history
            .iter()
            .map(|r| {
                let actual = if r.success { 100.0 } else { 0.0 };
                (r.predicted - actual).abs() / 100.0
            })
            .sum();
        (1.0 - sum / self.history.len() as f64).clamp(0.0, 1.0)
    }

    pub fn history(&self) -> &VecDeque<CalibrationRecord> {
        &self.history
    }

    /// 分数到等级标签的固定映射
    pub fn level(score: f64) -> ConfidenceLevel {
        if score >= 90.0 {
            ConfidenceLevel::VeryHigh
        } else if score >= 80.0 {
            ConfidenceLevel::High
        } else if score >= 70.0 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> ConfidenceScorer {
        ConfidenceScorer::new(0.1, 20)
    }

    fn factors(v: f64) -> ConfidenceFactors {
        ConfidenceFactors {
            data_quality: v,
            source_reliability: v,
            model_uncertainty: v,
            historical_accuracy: v,
            consensus_level: v,
        }
    }

    #[test]
    fn test_score_in_range() {
        let s = scorer();
        for v in [-5.0, -0.1, 0.0, 0.3, 0.99, 1.0, 2.0, 100.0] {
            let score = s.score(&factors(v));
            assert!((0.0..=100.0).contains(&score), "score {} for v {}", score, v);
        }
    }

    #[test]
    fn test_score_clamps_out_of_range_inputs() {
        let s = scorer();
        // 越界值钳制到边界后应与边界值评分一致
        assert_eq!(s.score(&factors(5.0)), s.score(&factors(1.0)));
        assert_eq!(s.score(&factors(-3.0)), s.score(&factors(0.0)));
    }

    #[test]
    fn test_score_deterministic_weights() {
        let s = scorer();
        let f = ConfidenceFactors {
            data_quality: 1.0,
            source_reliability: 1.0,
            model_uncertainty: 0.0,
            historical_accuracy: 1.0,
            consensus_level: 1.0,
        };
        assert_eq!(s.score(&f), 100.0);
        // 不确定度取反：uncertainty=1 时该项贡献为 0
        let f = ConfidenceFactors {
            model_uncertainty: 1.0,
            ..f
        };
        assert_eq!(s.score(&f), 80.0);
    }

    #[test]
    fn test_aggregate_empty_and_single() {
        let s = scorer();
        assert_eq!(s.aggregate(&[]), 0.0);
        assert_eq!(s.aggregate(&[42.4]), 42.0);
        assert_eq!(s.aggregate(&[96.0]), 96.0);
    }

    #[test]
    fn test_aggregate_recency_weighted() {
        let s = scorer();
        // 同样两个分数，最近的权重更高
        assert!(s.aggregate(&[0.0, 100.0]) > s.aggregate(&[100.0, 0.0]));
        assert!(s.aggregate(&[50.0, 50.0, 90.0]) > s.aggregate(&[90.0, 50.0, 50.0]));
    }

    #[test]
    fn test_historical_accuracy_rolling() {
        let mut s = scorer();
        assert_eq!(s.historical_accuracy(), 1.0);
        s.record_outcome(80.0, true);
        assert!((s.historical_accuracy() - 0.8).abs() < 1e-9);
        s.record_outcome(60.0, false);
        assert!((s.historical_accuracy() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_calibration_window_bounded() {
        let mut s = ConfidenceScorer::new(0.1, 3);
        for i in 0..10 {
            s.record_outcome(i as f64 * 10.0, true);
        }
        assert_eq!(s.history().len(), 3);
        assert_eq!(s.history().front().unwrap().predicted, 70.0);
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(ConfidenceScorer::level(90.0), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceScorer::level(89.0), ConfidenceLevel::High);
        assert_eq!(ConfidenceScorer::level(80.0), ConfidenceLevel::High);
        assert_eq!(ConfidenceScorer::level(70.0), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceScorer::level(69.0), ConfidenceLevel::Low);
    }
}
