//! Sage - Rust 自主研究智能体
//!
//! 模块划分：
//! - **agent**: Observe→Reason→Act→Learn 主循环、观察采集与任务协调
//! - **action**: 置信度分层的动作规划与执行
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **confidence**: 多因子置信度评分、近因聚合与校准
//! - **core**: 统一错误类型
//! - **invoke**: 外部模型调用抽象与实现（OpenAI 兼容 / Mock）
//! - **learning**: 结果回灌、洞见提取与行为模式表
//! - **reasoning**: 观察分析与规则化结论推导
//! - **sink**: 快照与产物持久化（SQLite / 文件系统 / 内存）
//! - **state**: 阶段机、有界记忆与审计日志
//! - **task**: 任务模型与校验

pub mod action;
pub mod agent;
pub mod config;
pub mod confidence;
pub mod core;
pub mod invoke;
pub mod learning;
pub mod observability;
pub mod reasoning;
pub mod sink;
pub mod state;
pub mod task;

pub use agent::{AgentLoop, TaskCoordinator, TaskReport};
pub use config::{load_config, AppConfig};
pub use core::AgentError;
pub use task::Task;
