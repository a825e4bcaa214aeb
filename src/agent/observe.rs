//! Observe 阶段：采集任务上下文
//!
//! 三个来源：任务简报（按种类分派）、有界记忆里同类任务的先验经验、一次外部调用。
//! 外部调用失败被吸收为一条低可靠度 error 观察——单阶段失败绝不中断当前迭代。

use std::sync::Arc;

use crate::invoke::{InvokeOptions, Invoker, Message};
use crate::reasoning::Observation;
use crate::state::StateStore;
use crate::task::Task;

/// 任务简报观察的可靠度（自有输入，接近确定）
const TASK_RELIABILITY: f64 = 0.95;
/// 外部调用成功结果的可靠度
const INVOKER_RELIABILITY: f64 = 0.9;
/// 先验经验摘要的可靠度
const MEMORY_RELIABILITY: f64 = 0.75;
/// 调用失败观察的可靠度
const FAILURE_RELIABILITY: f64 = 0.2;
/// 最多带入的先验经验条数
const MAX_RECALLED: usize = 3;

pub struct Observer {
    invoker: Arc<dyn Invoker>,
    options: InvokeOptions,
}

impl Observer {
    pub fn new(invoker: Arc<dyn Invoker>, options: InvokeOptions) -> Self {
        Self { invoker, options }
    }

    pub async fn observe(&self, task: &Task, store: &StateStore) -> Vec<Observation> {
        let mut observations = vec![Observation::new(
            "task",
            task.briefing(),
            TASK_RELIABILITY,
            task.kind_name(),
        )];

        // 同类任务的先验经验（最近的优先）
        let recalled = store.recall_prefix(&format!("experience:{}", task.kind_name()));
        for (_, summary) in recalled.into_iter().rev().take(MAX_RECALLED) {
            observations.push(Observation::new(
                "memory",
                summary,
                MEMORY_RELIABILITY,
                "experience",
            ));
        }

        // 一次外部调用采集新鲜上下文；失败吸收为低可靠度观察
        let messages = [
            Message::system("You gather concise factual context for an autonomous agent."),
            Message::user(format!(
                "Gather context for a {} task: {}",
                task.kind_name(),
                task.goal()
            )),
        ];
        match self.invoker.invoke(&messages, &self.options).await {
            Ok(text) => observations.push(Observation::new(
                "invoker",
                text,
                INVOKER_RELIABILITY,
                task.kind_name(),
            )),
            Err(e) => {
                tracing::warn!(error = %e, "context gathering failed, degrading observation");
                observations.push(Observation::new(
                    "invoker",
                    format!("invoke failed: {}", e),
                    FAILURE_RELIABILITY,
                    "error",
                ));
            }
        }

        observations
    }
}
