//! Agent 错误类型
//!
//! 外部调用失败（invoke / 持久化）在调用点被捕获并记录，不会中断循环；
//! 只有任务本身非法或内部不可恢复错误才以结构化错误返回给调用方。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误（外部调用、持久化、任务校验等）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invoke error: {0}")]
    Invoke(String),

    #[error("Invoke timeout after {0}s")]
    InvokeTimeout(u64),

    #[error("Persistence error: {0}")]
    Persistence(String),

    /// 任务非法（如空目标），在任何迭代开始前返回
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
