//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SAGE__*` 覆盖（双下划线表示嵌套，
//! 如 `SAGE__AGENT__MAX_ITERATIONS=10`）。循环的全部可调参数集中在这里，
//! 以不可变配置结构体的形式传入 TaskCoordinator，不存在散落的全局可变默认值。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::AgentError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentSection,
    pub llm: LlmSection,
    pub storage: StorageSection,
}

/// [agent] 段：循环参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// 单个任务的最大迭代次数
    pub max_iterations: usize,
    /// 完成条件的置信度阈值（0–1，乘以 100 与步骤置信度比较）
    pub confidence_threshold: f64,
    /// 聚合时的指数衰减系数
    pub decay: f64,
    /// 记忆表 / 日志 / 校准窗口的容量
    pub memory_capacity: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            confidence_threshold: 0.7,
            decay: 0.1,
            memory_capacity: 20,
        }
    }
}

/// [llm] 段：后端与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            timeout_secs: 30,
        }
    }
}

/// [storage] 段：快照库与产物目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub state_db: PathBuf,
    pub artifacts_dir: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            state_db: PathBuf::from("data/sage.db"),
            artifacts_dir: PathBuf::from("data/artifacts"),
        }
    }
}

/// 加载配置：
/// 1. 依次探测 config/default.toml 等候选路径，取第一个存在的
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SAGE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, AgentError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SAGE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder
        .build()
        .map_err(|e| AgentError::Config(e.to_string()))?;
    c.try_deserialize()
        .map_err(|e| AgentError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agent.max_iterations, 5);
        assert!((cfg.agent.confidence_threshold - 0.7).abs() < 1e-9);
        assert_eq!(cfg.agent.memory_capacity, 20);
        assert_eq!(cfg.llm.timeout_secs, 30);
    }

    #[test]
    fn test_malformed_override_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("override.toml");
        std::fs::write(&path, "agent = not-a-table").unwrap();
        let err = load_config(Some(path)).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let cfg: AppConfig = toml_from_str(
            r#"
            [agent]
            max_iterations = 3
            "#,
        );
        assert_eq!(cfg.agent.max_iterations, 3);
        // 未给出的键落回默认值
        assert_eq!(cfg.agent.memory_capacity, 20);
    }

    fn toml_from_str(s: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(s, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}
