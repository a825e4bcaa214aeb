//! 文本生成服务抽象与实现
//!
//! 循环只通过 Invoker 这一窄接口触达外部「AI」：OpenAiInvoker 走任意 OpenAI 兼容端点，
//! MockInvoker / FailingInvoker 用于测试与离线运行。调用失败以 AgentError 表达，
//! 由调用点（Observe / ActionExecutor）捕获吸收，不会逃逸出循环。

mod mock;
mod openai;
mod traits;

use std::sync::Arc;

pub use mock::{FailingInvoker, MockInvoker};
pub use openai::OpenAiInvoker;
pub use traits::{InvokeOptions, Invoker, Message, Role};

use crate::config::AppConfig;

/// 根据配置与环境变量选择后端：有 OPENAI_API_KEY 走 OpenAI 兼容端点，否则回退 Mock
pub fn create_invoker_from_config(cfg: &AppConfig) -> Arc<dyn Invoker> {
    if std::env::var("OPENAI_API_KEY").is_ok() {
        tracing::info!(model = %cfg.llm.model, "using OpenAI-compatible invoker");
        Arc::new(OpenAiInvoker::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        ))
    } else {
        tracing::info!("no API key found, using mock invoker");
        Arc::new(MockInvoker::default())
    }
}
