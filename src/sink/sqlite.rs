//! SQLite 快照存储
//!
//! 单表键值布局：key 为主键，同键 INSERT OR REPLACE 覆盖。连接用互斥量串行化，
//! 快照写入频率低且 blob 很小，不值得为它引入连接池。

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::AgentError;
use crate::sink::StateSink;

pub struct SqliteStateSink {
    conn: Mutex<Connection>,
}

impl SqliteStateSink {
    /// 打开（必要时创建）数据库并确保建表
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AgentError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AgentError::Persistence(e.to_string()))?;
            }
        }
        let conn = Connection::open(path).map_err(|e| AgentError::Persistence(e.to_string()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS snapshots (
                key        TEXT PRIMARY KEY,
                blob       TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| AgentError::Persistence(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl StateSink for SqliteStateSink {
    async fn put(&self, key: &str, blob: &str) -> Result<(), AgentError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AgentError::Persistence("sqlite lock poisoned".to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO snapshots (key, blob, updated_at) VALUES (?1, ?2, ?3)",
            params![key, blob, Utc::now().to_rfc3339()],
        )
        .map_err(|e| AgentError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AgentError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AgentError::Persistence("sqlite lock poisoned".to_string()))?;
        conn.query_row(
            "SELECT blob FROM snapshots WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| AgentError::Persistence(e.to_string()))
    }
}
