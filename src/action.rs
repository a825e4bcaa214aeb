//! 动作执行器：置信度分层与外部操作
//!
//! plan 按整步置信度选择执行层级；execute 对 fully / monitored 层级发起外部调用，
//! 异常在此处被捕获并记录为失败 Action，绝不向外传播。request-guidance 层级不执行
//! 副作用操作，只把低置信状态与依据暴露给调用方——这是一等结果，不是错误。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::invoke::{InvokeOptions, Invoker, Message};
use crate::reasoning::ReasoningStep;
use crate::task::Task;

const FULL_THRESHOLD: f64 = 90.0;
const MONITORED_THRESHOLD: f64 = 70.0;

/// 执行层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionTier {
    ExecuteFully,
    ExecuteWithMonitoring,
    RequestGuidance,
}

impl ActionTier {
    /// 阈值边界精确：90 → fully，70 → monitored，再往下 → guidance
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= FULL_THRESHOLD {
            ActionTier::ExecuteFully
        } else if confidence >= MONITORED_THRESHOLD {
            ActionTier::ExecuteWithMonitoring
        } else {
            ActionTier::RequestGuidance
        }
    }
}

impl std::fmt::Display for ActionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionTier::ExecuteFully => write!(f, "execute-fully"),
            ActionTier::ExecuteWithMonitoring => write!(f, "execute-with-monitoring"),
            ActionTier::RequestGuidance => write!(f, "request-guidance"),
        }
    }
}

/// 计划好的操作：层级 + 提示词 + 依据 + 决策时的置信度快照
#[derive(Debug, Clone)]
pub struct ActionPlan {
    pub tier: ActionTier,
    pub prompt: String,
    pub rationale: String,
    pub confidence: f64,
}

/// 执行完成后记录的动作；每次迭代恰好一条
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub tier: ActionTier,
    pub prompt: String,
    pub confidence: f64,
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub executed_at: DateTime<Utc>,
}

/// 动作执行器：持有外部 Invoker，把层级映射为执行方式
pub struct ActionExecutor {
    invoker: Arc<dyn Invoker>,
    options: InvokeOptions,
}

impl ActionExecutor {
    pub fn new(invoker: Arc<dyn Invoker>, options: InvokeOptions) -> Self {
        Self { invoker, options }
    }

    /// 由推理步骤生成执行计划；层级只由整步置信度决定
    pub fn plan(&self, step: &ReasoningStep, task: &Task) -> ActionPlan {
        let tier = ActionTier::from_confidence(step.confidence);
        let findings = step
            .conclusions
            .iter()
            .map(|c| format!("- {}", c.statement))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Produce the {} deliverable for: {}.\nGrounding findings:\n{}",
            task.kind_name(),
            task.goal(),
            findings
        );
        let rationale = step
            .conclusions
            .iter()
            .map(|c| format!("{:?}: {} (confidence {})", c.kind, c.rationale, c.confidence))
            .collect::<Vec<_>>()
            .join("; ");
        ActionPlan {
            tier,
            prompt,
            rationale,
            confidence: step.confidence,
        }
    }

    /// 执行计划；外部调用的异常在这里被捕获为失败 Action
    pub async fn execute(&self, plan: &ActionPlan) -> Action {
        let executed_at = Utc::now();
        match plan.tier {
            ActionTier::RequestGuidance => {
                tracing::info!(
                    confidence = plan.confidence,
                    "confidence below execution threshold, requesting guidance"
                );
                Action {
                    tier: plan.tier,
                    prompt: plan.prompt.clone(),
                    confidence: plan.confidence,
                    success: false,
                    output: Some(format!("guidance requested: {}", plan.rationale)),
                    error: None,
                    executed_at,
                }
            }
            tier => {
                if tier == ActionTier::ExecuteWithMonitoring {
                    tracing::warn!(
                        confidence = plan.confidence,
                        "executing under monitoring, flagged for audit"
                    );
                }
                match self
                    .invoker
                    .invoke(&[Message::user(plan.prompt.clone())], &self.options)
                    .await
                {
                    Ok(output) => Action {
                        tier,
                        prompt: plan.prompt.clone(),
                        confidence: plan.confidence,
                        success: true,
                        output: Some(output),
                        error: None,
                        executed_at,
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "action invocation failed");
                        Action {
                            tier,
                            prompt: plan.prompt.clone(),
                            confidence: plan.confidence,
                            success: false,
                            output: None,
                            error: Some(e.to_string()),
                            executed_at,
                        }
                    }
                }
            }
        }
    }
}
