//! 服务器端撤销 HTTP API 客户端
//!
//! 与 `BatchReconciler::undo_recent` 的客户端回放互补：
//! 这里直接把撤销请求交给服务器执行

use crate::gh::types::handle_http_response;
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// 服务器端撤销结果
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoResult {
    pub refollowed: i64,
    #[serde(default)]
    pub details: Vec<UndoDetail>,
    pub dry_run: bool,
}

/// 单个用户的撤销明细
#[derive(Debug, Clone, Deserialize)]
pub struct UndoDetail {
    pub username: String,
    pub timestamp: String,
}

/// 撤销相关的 HTTP API 客户端
pub struct UndoApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl UndoApi {
    /// 创建新的撤销 API 客户端
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
        }
    }

    /// 请求服务器撤销取关操作
    ///
    /// `until` 为 ISO 8601 时间下界；`usernames` 非空时只撤销其中的用户
    pub async fn undo(
        &self,
        until: Option<&str>,
        usernames: Option<&[String]>,
    ) -> Result<UndoResult> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/undo", self.api_base_url);

        let mut body = serde_json::Map::new();
        body.insert("action".to_string(), serde_json::json!("unfollow"));
        if let Some(until) = until {
            body.insert("until".to_string(), serde_json::json!(until));
        }
        if let Some(usernames) = usernames {
            body.insert("usernames".to_string(), serde_json::json!(usernames));
        }

        info!("[UndoAPI] 📡 请求服务器端撤销");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("operationID", &operation_id)
            .json(&serde_json::Value::Object(body))
            .send()
            .await
            .context("请求失败")?;

        let result: UndoResult = handle_http_response(response, "服务器端撤销").await?;
        info!(
            "[UndoAPI] ✅ 撤销完成 - 重新关注: {}, 干跑: {}",
            result.refollowed, result.dry_run
        );
        Ok(result)
    }
}
