//! Observe→Reason→Act→Learn 主循环与任务协调

mod coordinator;
mod loop_;
mod observe;

pub use coordinator::{Distribution, QualityReport, TaskCoordinator, TaskReport};
pub use loop_::{AgentLoop, AgentStatus, AuditTrail, IterationRecord, RunOutcome};
pub use observe::Observer;
