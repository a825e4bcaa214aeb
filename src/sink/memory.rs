//! 内存实现：测试与无持久化场景用

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::AgentError;
use crate::sink::{ArtifactSink, StateSink};

/// 进程内快照表
#[derive(Debug, Default)]
pub struct InMemoryStateSink {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryStateSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateSink for InMemoryStateSink {
    async fn put(&self, key: &str, blob: &str) -> Result<(), AgentError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AgentError::Persistence("state sink lock poisoned".to_string()))?;
        entries.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AgentError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AgentError::Persistence("state sink lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }
}

/// 进程内产物表，按键保留最近一次写入及其元数据
#[derive(Debug, Default)]
pub struct InMemoryArtifactSink {
    entries: Mutex<HashMap<String, (String, HashMap<String, String>)>>,
}

impl InMemoryArtifactSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已写入的键（断言用，顺序不保证）
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<(String, HashMap<String, String>)> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

#[async_trait]
impl ArtifactSink for InMemoryArtifactSink {
    async fn put(
        &self,
        key: &str,
        blob: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<(), AgentError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AgentError::Persistence("artifact sink lock poisoned".to_string()))?;
        entries.insert(key.to_string(), (blob.to_string(), metadata.clone()));
        Ok(())
    }
}
