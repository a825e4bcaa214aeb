//! Invoker 抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 Invoker：invoke 一次对话补全，带超时参数。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::AgentError;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 单次调用参数
#[derive(Clone, Debug)]
pub struct InvokeOptions {
    /// 单次调用超时（秒）；必须能容忍短超时
    pub timeout_secs: u64,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// 文本生成客户端 trait：一次补全调用，失败以 AgentError 返回
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, messages: &[Message], options: &InvokeOptions)
        -> Result<String, AgentError>;

    /// 累计 token 使用统计：(prompt, completion, total)；默认 (0, 0, 0)
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
