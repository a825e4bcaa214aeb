//! Sage - Rust 自主研究智能体
//!
//! 入口：初始化日志、加载配置、组装协调器并对命令行给出的主题跑一个研究任务。

use std::sync::Arc;

use anyhow::Context;
use sage::agent::TaskCoordinator;
use sage::config::load_config;
use sage::invoke::create_invoker_from_config;
use sage::sink::{FileArtifactSink, SqliteStateSink};
use sage::task::Task;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sage::observability::init();

    let config = load_config(None).context("Failed to load config")?;

    // 用法：sage <topic> [section ...]
    let mut args = std::env::args().skip(1);
    let topic = args
        .next()
        .context("Usage: sage <topic> [section ...]")?;
    let sections: Vec<String> = args.collect();

    let invoker = create_invoker_from_config(&config);
    let state_sink =
        SqliteStateSink::open(&config.storage.state_db).context("Failed to open state db")?;
    let artifact_sink = FileArtifactSink::new(config.storage.artifacts_dir.clone());

    let coordinator = TaskCoordinator::new(
        config,
        invoker,
        Arc::new(state_sink),
        Arc::new(artifact_sink),
    );

    let task = Task::research(&topic, sections);
    let report = coordinator.run(&task).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.success {
        std::process::exit(1);
    }
    Ok(())
}
