//! 列表 HTTP API 客户端
//!
//! 负责服务器端列表的增删改查、批量执行与导出

use crate::gh::history::models::HistoryAction;
use crate::gh::lists::types::{ApplyResult, ListDetails, ListSummary};
use crate::gh::types::{handle_blob_response, handle_http_response};
use anyhow::{Context, Result};
use tracing::{debug, info};
use uuid::Uuid;

/// 列表相关的 HTTP API 客户端
pub struct ListsApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl ListsApi {
    /// 创建新的列表 API 客户端
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
        }
    }

    /// 获取服务器端列表摘要
    pub async fn get_lists(&self) -> Result<Vec<ListSummary>> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/lists", self.api_base_url);

        info!("[ListsAPI] 📡 请求服务器列表");
        debug!("[ListsAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .send()
            .await
            .context("请求失败")?;

        let lists: Vec<ListSummary> = handle_http_response(response, "列表查询").await?;
        info!("[ListsAPI] ✅ 列表响应，共 {} 个", lists.len());
        Ok(lists)
    }

    /// 在服务器端创建列表
    pub async fn create_list(&self, name: &str, items: &[String]) -> Result<ListDetails> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/lists", self.api_base_url);

        info!("[ListsAPI] 📡 创建列表: {}（{} 个成员）", name, items.len());

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("operationID", &operation_id)
            .json(&serde_json::json!({
                "name": name,
                "items": items,
            }))
            .send()
            .await
            .context("请求失败")?;

        handle_http_response(response, "列表创建").await
    }

    /// 获取服务器端列表详情
    pub async fn get_list(&self, id: &str) -> Result<ListDetails> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/lists/{}", self.api_base_url, id);

        debug!("[ListsAPI] 请求列表详情: {}", id);

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .send()
            .await
            .context("请求失败")?;

        handle_http_response(response, "列表详情查询").await
    }

    /// 更新服务器端列表（name/items 均可选，未提供的字段保持不变）
    pub async fn update_list(
        &self,
        id: &str,
        name: Option<&str>,
        items: Option<&[String]>,
    ) -> Result<ListDetails> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/lists/{}", self.api_base_url, id);

        let mut body = serde_json::Map::new();
        if let Some(name) = name {
            body.insert("name".to_string(), serde_json::json!(name));
        }
        if let Some(items) = items {
            body.insert("items".to_string(), serde_json::json!(items));
        }

        info!("[ListsAPI] 📡 更新列表: {}", id);

        let response = self
            .client
            .put(&url)
            .header("Content-Type", "application/json")
            .header("operationID", &operation_id)
            .json(&serde_json::Value::Object(body))
            .send()
            .await
            .context("请求失败")?;

        handle_http_response(response, "列表更新").await
    }

    /// 删除服务器端列表
    pub async fn delete_list(&self, id: &str) -> Result<()> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/lists/{}", self.api_base_url, id);

        info!("[ListsAPI] 📡 删除列表: {}", id);

        let response = self
            .client
            .delete(&url)
            .header("operationID", &operation_id)
            .send()
            .await
            .context("请求失败")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP 错误 {}: {}", status, text);
        }
        Ok(())
    }

    /// 对服务器端列表批量执行关注/取关
    pub async fn apply_list(
        &self,
        id: &str,
        action: HistoryAction,
        skip_processed: bool,
    ) -> Result<ApplyResult> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/lists/{}/apply", self.api_base_url, id);

        info!(
            "[ListsAPI] 📡 批量执行列表: {}, 操作: {}, 跳过已处理: {}",
            id, action, skip_processed
        );

        let response = self
            .client
            .post(&url)
            .header("operationID", &operation_id)
            .query(&[
                ("action", action.to_string()),
                ("skipProcessed", skip_processed.to_string()),
            ])
            .send()
            .await
            .context("请求失败")?;

        let result: ApplyResult = handle_http_response(response, "列表批量执行").await?;
        info!(
            "[ListsAPI] ✅ 批量执行完成 - 执行: {}, 跳过: {}, 干跑: {}",
            result.applied, result.skipped, result.dry_run
        );
        Ok(result)
    }

    /// 导出服务器端单个列表（CSV 或 JSON 文件内容）
    pub async fn export_list(&self, id: &str, format: &str) -> Result<Vec<u8>> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/lists/{}/export", self.api_base_url, id);

        info!("[ListsAPI] 📡 导出列表: {}, 格式: {}", id, format);

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .query(&[("format", format)])
            .send()
            .await
            .context("请求失败")?;

        handle_blob_response(response, "列表导出").await
    }

    /// 导出服务器端全部列表（JSON 文件内容）
    pub async fn export_all_lists(&self) -> Result<Vec<u8>> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/lists/export", self.api_base_url);

        info!("[ListsAPI] 📡 导出全部列表");

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .query(&[("format", "json")])
            .send()
            .await
            .context("请求失败")?;

        handle_blob_response(response, "全部列表导出").await
    }
}
