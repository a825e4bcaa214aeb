//! 主循环
//!
//! 每次迭代严格按 Observe → Reason → Act → Learn 推进：上一迭代的 Learning 记录完成之前，
//! 下一迭代不会开始。完成条件同时要求动作成功**且**整步置信度达到配置阈值——
//! 成功的低置信动作不会提前结束循环，它会在 max_iterations 以内继续追求更高置信的结论。
//! 取消令牌只在迭代开头检查，不会打断进行中的外部调用；无论正常完成、耗尽还是取消，
//! 循环都干净地回到 idle 并返回结果而不是抛错。

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::action::{Action, ActionExecutor, ActionTier};
use crate::agent::Observer;
use crate::config::AgentSection;
use crate::confidence::ConfidenceScorer;
use crate::invoke::{InvokeOptions, Invoker};
use crate::learning::{Feedback, Learning, LearningSystem, PatternEntry};
use crate::reasoning::{Observation, ReasoningEngine, ReasoningStep};
use crate::sink::StateSink;
use crate::state::{AgentPhase, AgentSnapshot, LogSizes, StateStore};
use crate::task::Task;

/// 一次迭代的汇总记录
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub confidence: f64,
    pub tier: ActionTier,
    pub action_success: bool,
}

/// 单个任务执行的结果信封
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    /// 最后一次迭代是否满足完成条件
    pub success: bool,
    pub iterations: Vec<IterationRecord>,
    /// 所有迭代置信度的近因加权聚合
    pub aggregate_confidence: f64,
    pub cancelled: bool,
    pub error: Option<String>,
    pub final_snapshot: AgentSnapshot,
}

/// 只读状态自省（监控/看板用）
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub phase: AgentPhase,
    pub iteration: usize,
    pub confidence: f64,
    pub memory_size: usize,
    pub log_sizes: LogSizes,
}

/// 完整可解释性导出
#[derive(Debug, Clone, Serialize)]
pub struct AuditTrail {
    pub observations: Vec<Observation>,
    pub reasoning_chain: Vec<ReasoningStep>,
    pub action_log: Vec<Action>,
    pub learning_history: Vec<Learning>,
    pub patterns: Vec<PatternEntry>,
}

/// 驱动单个任务的状态机；每个任务执行独占一个实例，组件间无跨任务共享可变状态
pub struct AgentLoop {
    config: AgentSection,
    store: StateStore,
    scorer: ConfidenceScorer,
    reasoning: ReasoningEngine,
    executor: ActionExecutor,
    learning: LearningSystem,
    observer: Observer,
    state_sink: Arc<dyn StateSink>,
    last_confidence: f64,
    snapshot_key: String,
}

impl AgentLoop {
    pub fn new(
        config: &AgentSection,
        invoker: Arc<dyn Invoker>,
        state_sink: Arc<dyn StateSink>,
        options: InvokeOptions,
    ) -> Self {
        Self {
            config: config.clone(),
            store: StateStore::new(config.memory_capacity),
            scorer: ConfidenceScorer::new(config.decay, config.memory_capacity),
            reasoning: ReasoningEngine::new(),
            executor: ActionExecutor::new(invoker.clone(), options.clone()),
            learning: LearningSystem::new(),
            observer: Observer::new(invoker, options),
            state_sink,
            last_confidence: 0.0,
            snapshot_key: String::new(),
        }
    }

    /// 对一个任务跑完整的 Observe→Reason→Act→Learn 循环
    pub async fn run(&mut self, task: &Task, cancel: CancellationToken) -> RunOutcome {
        if let Err(e) = task.validate() {
            // 非法任务在任何迭代开始前返回结构化错误，同样保证回到 idle
            self.store.transition(AgentPhase::Idle);
            return RunOutcome {
                success: false,
                iterations: Vec::new(),
                aggregate_confidence: 0.0,
                cancelled: false,
                error: Some(e.to_string()),
                final_snapshot: self.snapshot(),
            };
        }

        self.snapshot_key = format!("snapshot:{}", task.id);
        self.store.set_task(task.task_ref());
        tracing::info!(task = %task.id, kind = task.kind_name(), goal = %task.goal(), "task started");

        let mut records: Vec<IterationRecord> = Vec::new();
        let mut confidences: Vec<f64> = Vec::new();
        let mut completed = false;
        let mut cancelled = false;

        while self.store.iteration() < self.config.max_iterations {
            if cancel.is_cancelled() {
                tracing::info!(task = %task.id, "cancelled before next iteration");
                cancelled = true;
                break;
            }

            // Observe
            self.store.transition(AgentPhase::Observing);
            self.persist_snapshot().await;
            let observations = self.observer.observe(task, &self.store).await;
            for o in &observations {
                self.store.append_observation(o.clone());
            }

            // Reason
            self.store.transition(AgentPhase::Reasoning);
            self.persist_snapshot().await;
            let step = self.reasoning.reason(&observations, task, &self.scorer);
            self.store.append_reasoning(step.clone());

            // Act
            self.store.transition(AgentPhase::Acting);
            self.persist_snapshot().await;
            let plan = self.executor.plan(&step, task);
            let action = self.executor.execute(&plan).await;
            self.store.append_action(action.clone());

            // Learn：本迭代的 Learning 记录完成后，下一迭代才会开始
            self.store.transition(AgentPhase::Learning);
            self.persist_snapshot().await;
            let feedback = Feedback {
                success: action.success,
                confidence_at_decision: step.confidence,
            };
            let learning = self.learning.learn(
                task,
                &action,
                &feedback,
                &mut self.scorer,
                &mut self.store,
            );
            self.store.append_learning(learning);

            let iteration = self.store.advance_iteration();
            self.last_confidence = step.confidence;
            confidences.push(step.confidence);
            records.push(IterationRecord {
                iteration,
                confidence: step.confidence,
                tier: plan.tier,
                action_success: action.success,
            });
            tracing::info!(
                iteration,
                confidence = step.confidence,
                tier = %plan.tier,
                success = action.success,
                "iteration completed"
            );

            // 完成条件：动作成功且置信度达到阈值；二者缺一则继续迭代
            if action.success
                && step.confidence >= self.config.confidence_threshold * 100.0
            {
                completed = true;
                break;
            }
        }

        // 干净收尾：无论何种退出路径都回到 idle
        self.store.transition(AgentPhase::Idle);
        self.persist_snapshot().await;

        RunOutcome {
            success: completed,
            aggregate_confidence: self.scorer.aggregate(&confidences),
            iterations: records,
            cancelled,
            error: None,
            final_snapshot: self.snapshot(),
        }
    }

    /// 生成当前全量快照（含学习系统的模式表）
    pub fn snapshot(&self) -> AgentSnapshot {
        self.store.snapshot_with(self.learning.patterns())
    }

    /// 从快照恢复状态与模式表
    pub fn restore(&mut self, snapshot: &AgentSnapshot) {
        self.store.restore(snapshot);
        self.learning.restore(&snapshot.patterns);
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            phase: self.store.phase(),
            iteration: self.store.iteration(),
            confidence: self.last_confidence,
            memory_size: self.store.memory_len(),
            log_sizes: self.store.log_sizes(),
        }
    }

    pub fn audit_trail(&self) -> AuditTrail {
        AuditTrail {
            observations: self.store.observations().to_vec(),
            reasoning_chain: self.store.reasoning().to_vec(),
            action_log: self.store.actions().to_vec(),
            learning_history: self.store.learnings().to_vec(),
            patterns: self.learning.patterns(),
        }
    }

    /// 快照持久化失败只记日志并吞掉：内存状态仍是本次执行的权威
    async fn persist_snapshot(&self) {
        let snapshot = self.snapshot();
        match serde_json::to_string(&snapshot) {
            Ok(blob) => {
                if let Err(e) = self.state_sink.put(&self.snapshot_key, &blob).await {
                    tracing::warn!(error = %e, "snapshot persistence failed, continuing");
                }
            }
            Err(e) => tracing::warn!(error = %e, "snapshot serialization failed, continuing"),
        }
    }
}
