//! 文件系统产物存储
//!
//! 每个产物写成根目录下的一个 JSON 文件：{ metadata, body }。键中的路径分隔符
//! 映射为子目录，便于按任务种类浏览。

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use tokio::fs;

use crate::core::AgentError;
use crate::sink::ArtifactSink;

pub struct FileArtifactSink {
    root: PathBuf,
}

#[derive(Serialize)]
struct ArtifactFile<'a> {
    metadata: &'a HashMap<String, String>,
    body: &'a str,
}

impl FileArtifactSink {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactSink for FileArtifactSink {
    async fn put(
        &self,
        key: &str,
        blob: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<(), AgentError> {
        let path = self.root.join(format!("{}.json", key));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AgentError::Persistence(e.to_string()))?;
        }
        let contents = serde_json::to_string_pretty(&ArtifactFile {
            metadata,
            body: blob,
        })?;
        fs::write(&path, contents)
            .await
            .map_err(|e| AgentError::Persistence(e.to_string()))?;
        Ok(())
    }
}
