//! 核心公共类型

mod error;

pub use error::AgentError;
