//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Azure / Mock）与会话 Gateway

pub mod azure;
pub mod gateway;
pub mod history;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use azure::create_azure_client;
pub use gateway::Gateway;
pub use history::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::LlmClient;

use crate::config::LlmSection;

/// 根据配置与环境变量选择 LLM 后端（Azure / OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &LlmSection) -> Arc<dyn LlmClient> {
    let provider = cfg.provider.to_lowercase();
    // 有 Azure Key 且未显式指定 openai 时走 Azure 部署
    let use_azure = std::env::var("AZURE_OPENAI_KEY").is_ok() && provider != "openai";
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok();

    if use_azure {
        let deployment = cfg.azure.deployment.clone();
        tracing::info!(
            "Using Azure OpenAI LLM ({})",
            deployment.as_deref().unwrap_or("env deployment")
        );
        Arc::new(create_azure_client(deployment.as_deref()))
    } else if use_openai {
        let model = cfg.openai.model.clone().unwrap_or_else(|| cfg.model.clone());
        let base = cfg.base_url.as_deref();
        tracing::info!("Using OpenAI LLM ({})", model);
        Arc::new(OpenAiClient::new(
            base,
            &model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        ))
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient::new())
    }
}
