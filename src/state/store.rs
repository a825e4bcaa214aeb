//! 状态存储：阶段、迭代计数、有界键值记忆与只追加日志
//!
//! 记忆表按插入顺序淘汰（重插会刷新位置），容量恒不超过配置上限；四类日志只追加，
//! 各自独立套用同一容量策略。快照/恢复做全量序列化，恢复是幂等的。
//! 所有变更只经 remember / append / transition 进入，由持有循环单线程执行保证原子性。

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::learning::{Learning, PatternEntry};
use crate::reasoning::{Observation, ReasoningStep};
use crate::state::AgentPhase;
use crate::task::TaskRef;

/// 各日志当前长度（状态自省用）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LogSizes {
    pub observations: usize,
    pub reasoning: usize,
    pub actions: usize,
    pub learnings: usize,
}

/// 单个 Agent 实例的全量持久化状态；每次状态转换后整体覆盖写出，可恢复
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub phase: AgentPhase,
    pub iteration: usize,
    pub memory: Vec<(String, String)>,
    pub observations: Vec<Observation>,
    pub reasoning: Vec<ReasoningStep>,
    pub actions: Vec<Action>,
    pub learnings: Vec<Learning>,
    pub patterns: Vec<PatternEntry>,
    pub task: Option<TaskRef>,
    pub saved_at: DateTime<Utc>,
}

/// 状态存储：当前执行期间的权威状态；外部持久化失败不影响它
#[derive(Debug, Clone)]
pub struct StateStore {
    phase: AgentPhase,
    iteration: usize,
    capacity: usize,
    memory: VecDeque<(String, String)>,
    observations: Vec<Observation>,
    reasoning: Vec<ReasoningStep>,
    actions: Vec<Action>,
    learnings: Vec<Learning>,
    task: Option<TaskRef>,
}

fn push_bounded<T>(log: &mut Vec<T>, entry: T, capacity: usize) {
    log.push(entry);
    if log.len() > capacity {
        let excess = log.len() - capacity;
        log.drain(..excess);
    }
}

impl StateStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            phase: AgentPhase::Idle,
            iteration: 0,
            capacity,
            memory: VecDeque::new(),
            observations: Vec::new(),
            reasoning: Vec::new(),
            actions: Vec::new(),
            learnings: Vec::new(),
            task: None,
        }
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    pub fn transition(&mut self, phase: AgentPhase) {
        tracing::debug!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
    }

    /// 迭代计数在单次任务执行内单调递增
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// 完成一次迭代，返回新的迭代序号（从 1 开始）
    pub fn advance_iteration(&mut self) -> usize {
        self.iteration += 1;
        self.iteration
    }

    pub fn set_task(&mut self, task: TaskRef) {
        self.task = Some(task);
    }

    pub fn task(&self) -> Option<&TaskRef> {
        self.task.as_ref()
    }

    /// 写入有界记忆：已存在的键刷新到队尾，超容量时淘汰最旧条目
    pub fn remember(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if let Some(pos) = self.memory.iter().position(|(k, _)| k == &key) {
            self.memory.remove(pos);
        }
        self.memory.push_back((key, value.into()));
        while self.memory.len() > self.capacity {
            self.memory.pop_front();
        }
    }

    pub fn recall(&self, key: &str) -> Option<&str> {
        self.memory
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 按键前缀取回记忆条目（插入顺序）
    pub fn recall_prefix(&self, prefix: &str) -> Vec<(&str, &str)> {
        self.memory
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub fn append_observation(&mut self, o: Observation) {
        push_bounded(&mut self.observations, o, self.capacity);
    }

    pub fn append_reasoning(&mut self, step: ReasoningStep) {
        push_bounded(&mut self.reasoning, step, self.capacity);
    }

    pub fn append_action(&mut self, action: Action) {
        push_bounded(&mut self.actions, action, self.capacity);
    }

    pub fn append_learning(&mut self, learning: Learning) {
        push_bounded(&mut self.learnings, learning, self.capacity);
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn reasoning(&self) -> &[ReasoningStep] {
        &self.reasoning
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn learnings(&self) -> &[Learning] {
        &self.learnings
    }

    pub fn log_sizes(&self) -> LogSizes {
        LogSizes {
            observations: self.observations.len(),
            reasoning: self.reasoning.len(),
            actions: self.actions.len(),
            learnings: self.learnings.len(),
        }
    }

    /// 生成全量快照；模式表由持有方（学习系统）提供
    pub fn snapshot_with(&self, patterns: Vec<PatternEntry>) -> AgentSnapshot {
        AgentSnapshot {
            phase: self.phase,
            iteration: self.iteration,
            memory: self.memory.iter().cloned().collect(),
            observations: self.observations.clone(),
            reasoning: self.reasoning.clone(),
            actions: self.actions.clone(),
            learnings: self.learnings.clone(),
            patterns,
            task: self.task.clone(),
            saved_at: Utc::now(),
        }
    }

    /// 从快照恢复（幂等：同一快照恢复多次结果相同）
    pub fn restore(&mut self, snapshot: &AgentSnapshot) {
        self.phase = snapshot.phase;
        self.iteration = snapshot.iteration;
        self.memory = snapshot.memory.iter().cloned().collect();
        self.observations = snapshot.observations.clone();
        self.reasoning = snapshot.reasoning.clone();
        self.actions = snapshot.actions.clone();
        self.learnings = snapshot.learnings.clone();
        self.task = snapshot.task.clone();
    }
}
