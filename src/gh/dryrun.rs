//! 干跑开关 HTTP API 客户端
//!
//! 开关的权威状态在服务器端，本地只做缓存避免界面闪烁

use crate::gh::types::handle_http_response;
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 干跑状态响应
#[derive(Debug, Clone, Deserialize)]
pub struct DryRunStatusResp {
    pub enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "lastChanged", default)]
    pub last_changed: Option<String>,
}

/// 干跑开关的 HTTP API 客户端
pub struct DryRunApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl DryRunApi {
    /// 创建新的干跑 API 客户端
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
        }
    }

    async fn post_switch(&self, path: &str, operation_name: &str) -> Result<bool> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/dry-run/{}", self.api_base_url, path);

        info!("[DryRunAPI] 📡 {}", operation_name);
        debug!("[DryRunAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .post(&url)
            .header("operationID", &operation_id)
            .send()
            .await
            .context("请求失败")?;

        let resp: DryRunStatusResp = handle_http_response(response, operation_name).await?;
        Ok(resp.enabled)
    }

    /// 查询干跑状态；查询失败时按关闭处理（临时降级，不阻塞启动）
    pub async fn status(&self) -> bool {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/dry-run/status", self.api_base_url);

        let result: Result<DryRunStatusResp> = async {
            let response = self
                .client
                .get(&url)
                .header("operationID", &operation_id)
                .send()
                .await
                .context("请求失败")?;
            handle_http_response(response, "干跑状态查询").await
        }
        .await;

        match result {
            Ok(resp) => resp.enabled,
            Err(e) => {
                warn!("[DryRunAPI] 状态查询失败，暂按关闭处理: {:?}", e);
                false
            }
        }
    }

    /// 打开干跑
    pub async fn enable(&self) -> Result<bool> {
        self.post_switch("enable", "打开干跑").await
    }

    /// 关闭干跑
    pub async fn disable(&self) -> Result<bool> {
        self.post_switch("disable", "关闭干跑").await
    }

    /// 翻转干跑开关，返回服务器确认后的新状态
    pub async fn toggle(&self) -> Result<bool> {
        self.post_switch("toggle", "翻转干跑开关").await
    }
}
