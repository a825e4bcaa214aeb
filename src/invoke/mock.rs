//! Mock Invoker（用于测试与离线运行，无需 API）

use async_trait::async_trait;

use crate::core::AgentError;
use crate::invoke::{InvokeOptions, Invoker, Message};

/// 固定返回一段多句文本的 Mock 客户端；可用 with_response 覆盖
#[derive(Debug, Clone)]
pub struct MockInvoker {
    response: String,
}

impl Default for MockInvoker {
    fn default() -> Self {
        Self {
            response: "Adoption of the subject grew steadily across most markets analyzed. \
                       Cost curves continue to decline year over year in public datasets. \
                       Expert commentary remains broadly positive on the mid-term outlook."
                .to_string(),
        }
    }
}

impl MockInvoker {
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl Invoker for MockInvoker {
    async fn invoke(
        &self,
        _messages: &[Message],
        _options: &InvokeOptions,
    ) -> Result<String, AgentError> {
        Ok(self.response.clone())
    }
}

/// 永远失败的客户端，用于验证失败吸收路径
#[derive(Debug, Clone)]
pub struct FailingInvoker {
    message: String,
}

impl Default for FailingInvoker {
    fn default() -> Self {
        Self {
            message: "connection refused".to_string(),
        }
    }
}

impl FailingInvoker {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Invoker for FailingInvoker {
    async fn invoke(
        &self,
        _messages: &[Message],
        _options: &InvokeOptions,
    ) -> Result<String, AgentError> {
        Err(AgentError::Invoke(self.message.clone()))
    }
}
