//! Azure OpenAI 客户端（OpenAI 兼容实现的端点变体）
//!
//! 部署信息全部来自环境变量：
//! - `AZURE_OPENAI_ENDPOINT` / `AZURE_OPENAI_KEY`
//! - `AZURE_OPENAI_DEPLOYMENT`（可被参数覆盖）
//! - `AZURE_OPENAI_API_VERSION`

use async_openai::config::AzureConfig;

use crate::llm::OpenAiClient;

pub const DEFAULT_API_VERSION: &str = "2024-06-01";
pub const DEFAULT_DEPLOYMENT: &str = "gpt-4o-mini";

/// 创建 Azure OpenAI 客户端
pub fn create_azure_client(deployment: Option<&str>) -> OpenAiClient<AzureConfig> {
    let endpoint = std::env::var("AZURE_OPENAI_ENDPOINT").unwrap_or_default();
    let api_key = std::env::var("AZURE_OPENAI_KEY").unwrap_or_else(|_| "azure-placeholder".to_string());
    let deployment = deployment
        .map(String::from)
        .or_else(|| std::env::var("AZURE_OPENAI_DEPLOYMENT").ok())
        .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string());
    let api_version = std::env::var("AZURE_OPENAI_API_VERSION")
        .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());

    let config = AzureConfig::new()
        .with_api_base(endpoint)
        .with_api_key(api_key)
        .with_deployment_id(&deployment)
        .with_api_version(api_version);

    OpenAiClient::with_config(config, &deployment)
}
