//! 任务模型
//!
//! 封闭的带标签任务类型：每个变体只携带自己需要的字段，Observe 阶段按标签分派，
//! 新增任务种类不需要触碰循环内部。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::AgentError;

/// 任务种类（封闭集合）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TaskKind {
    Research {
        topic: String,
        #[serde(default)]
        sections: Vec<String>,
    },
    ContentGeneration {
        title: String,
        #[serde(default)]
        outline: Vec<String>,
    },
}

/// 提交给循环的工作单元；循环执行期间不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(flatten)]
    pub kind: TaskKind,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// 快照中保存的任务引用（不复制参数，仅保留标识）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: String,
    pub kind: String,
    pub goal: String,
}

impl Task {
    pub fn research(topic: impl Into<String>, sections: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: TaskKind::Research {
                topic: topic.into(),
                sections,
            },
            constraints: Vec::new(),
        }
    }

    pub fn content_generation(title: impl Into<String>, outline: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: TaskKind::ContentGeneration {
                title: title.into(),
                outline,
            },
            constraints: Vec::new(),
        }
    }

    pub fn with_constraints(mut self, constraints: Vec<String>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            TaskKind::Research { .. } => "research",
            TaskKind::ContentGeneration { .. } => "content-generation",
        }
    }

    /// 任务的主目标文本
    pub fn goal(&self) -> String {
        match &self.kind {
            TaskKind::Research { topic, .. } => topic.clone(),
            TaskKind::ContentGeneration { title, .. } => title.clone(),
        }
    }

    /// 任务校验：空目标视为非法，在任何迭代开始前被拒绝
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.goal().trim().is_empty() {
            return Err(AgentError::InvalidTask(format!(
                "{} task requires a non-empty goal",
                self.kind_name()
            )));
        }
        Ok(())
    }

    /// Observe 阶段的任务简报：把目标、章节/提纲与约束整理为一段可分析的文本
    pub fn briefing(&self) -> String {
        let constraints = if self.constraints.is_empty() {
            "none stated".to_string()
        } else {
            self.constraints.join("; ")
        };
        match &self.kind {
            TaskKind::Research { topic, sections } => {
                let sections = if sections.is_empty() {
                    "general overview".to_string()
                } else {
                    sections.join(", ")
                };
                format!(
                    "Research task on topic: {}. Sections to cover: {}. Constraints: {}.",
                    topic, sections, constraints
                )
            }
            TaskKind::ContentGeneration { title, outline } => {
                let outline = if outline.is_empty() {
                    "free-form draft".to_string()
                } else {
                    outline.join(", ")
                };
                format!(
                    "Content generation task titled: {}. Outline to follow: {}. Constraints: {}.",
                    title, outline, constraints
                )
            }
        }
    }

    pub fn task_ref(&self) -> TaskRef {
        TaskRef {
            id: self.id.clone(),
            kind: self.kind_name().to_string(),
            goal: self.goal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_goal() {
        let task = Task::research("  ", vec![]);
        assert!(task.validate().is_err());
        let task = Task::research("Solar storage", vec![]);
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_kind_dispatch() {
        let t = Task::research("X", vec![]);
        assert_eq!(t.kind_name(), "research");
        let t = Task::content_generation("Guide", vec!["Intro".into()]);
        assert_eq!(t.kind_name(), "content-generation");
        assert_eq!(t.goal(), "Guide");
    }

    #[test]
    fn test_briefing_mentions_constraints() {
        let t = Task::research("Grid storage", vec!["Overview".into()])
            .with_constraints(vec!["cite public data".into()]);
        let b = t.briefing();
        assert!(b.contains("Grid storage"));
        assert!(b.contains("cite public data"));
    }
}
