//! 阶段、有界记忆、日志与快照

mod phase;
mod store;

pub use phase::AgentPhase;
pub use store::{AgentSnapshot, LogSizes, StateStore};
