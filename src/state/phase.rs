//! Agent 阶段
//!
//! 封闭集合 {idle, observing, reasoning, acting, learning}；每个任务完成时
//! 恰好发生一次回到 idle 的终态转换。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentPhase {
    #[default]
    Idle,
    Observing,
    Reasoning,
    Acting,
    Learning,
}

impl std::fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentPhase::Idle => write!(f, "idle"),
            AgentPhase::Observing => write!(f, "observing"),
            AgentPhase::Reasoning => write!(f, "reasoning"),
            AgentPhase::Acting => write!(f, "acting"),
            AgentPhase::Learning => write!(f, "learning"),
        }
    }
}
