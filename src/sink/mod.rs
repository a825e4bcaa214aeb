//! 持久化接口与实现
//!
//! 两类接口：StateSink 存放循环快照（键 → JSON 串），ArtifactSink 存放任务完成后的
//! 交付产物（带元数据）。循环只依赖接口，实现可替换：生产用 SQLite/文件系统，
//! 测试用内存表。持久化失败一律由调用方降级处理，不会让接口实现 panic。

mod file;
mod memory;
mod sqlite;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::core::AgentError;

pub use file::FileArtifactSink;
pub use memory::{InMemoryArtifactSink, InMemoryStateSink};
pub use sqlite::SqliteStateSink;

/// 快照存储：同键覆盖写
#[async_trait]
pub trait StateSink: Send + Sync {
    async fn put(&self, key: &str, blob: &str) -> Result<(), AgentError>;
    async fn get(&self, key: &str) -> Result<Option<String>, AgentError>;
}

/// 产物存储：交付物连同描述性元数据一起落盘
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn put(
        &self,
        key: &str,
        blob: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<(), AgentError>;
}
