//! 操作历史 HTTP API 客户端
//!
//! 负责服务器端历史的查询与导出

use crate::gh::history::models::{HistoryAction, HistoryEntry};
use crate::gh::types::{handle_blob_response, handle_http_response};
use anyhow::{Context, Result};
use tracing::{debug, info};
use uuid::Uuid;

/// 历史相关的 HTTP API 客户端
pub struct HistoryApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl HistoryApi {
    /// 创建新的历史 API 客户端
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
        }
    }

    fn query_params(
        username: Option<&str>,
        action: Option<HistoryAction>,
        since: Option<&str>,
    ) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(u) = username {
            params.push(("username", u.to_string()));
        }
        if let Some(a) = action {
            params.push(("action", a.to_string()));
        }
        if let Some(s) = since {
            params.push(("since", s.to_string()));
        }
        params
    }

    /// 查询服务器端操作历史（可按用户名、操作类型、起始时间过滤）
    pub async fn get_history(
        &self,
        username: Option<&str>,
        action: Option<HistoryAction>,
        since: Option<&str>,
    ) -> Result<Vec<HistoryEntry>> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/history", self.api_base_url);

        info!("[HistoryAPI] 📡 请求服务器操作历史");
        debug!("[HistoryAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .query(&Self::query_params(username, action, since))
            .send()
            .await
            .context("请求失败")?;

        let entries: Vec<HistoryEntry> = handle_http_response(response, "操作历史查询").await?;
        info!("[HistoryAPI] ✅ 操作历史响应，条目数: {}", entries.len());
        Ok(entries)
    }

    /// 导出服务器端操作历史（CSV 或 JSON 文件内容）
    pub async fn export_history(
        &self,
        username: Option<&str>,
        action: Option<HistoryAction>,
        since: Option<&str>,
        format: &str,
    ) -> Result<Vec<u8>> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/history/export", self.api_base_url);

        info!("[HistoryAPI] 📡 请求导出操作历史，格式: {}", format);
        debug!("[HistoryAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let mut params = Self::query_params(username, action, since);
        params.push(("format", format.to_string()));

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .query(&params)
            .send()
            .await
            .context("请求失败")?;

        handle_blob_response(response, "操作历史导出").await
    }
}
