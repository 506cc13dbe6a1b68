//! 服务器端导入 HTTP API 客户端（multipart 上传）
//!
//! 把用户名单交给服务器批量处理：refollow（重新关注）或 exclude（排除）

use crate::gh::types::handle_http_response;
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// 导入数据：内联文本或文件内容
#[derive(Debug, Clone)]
pub enum ImportData {
    /// 直接粘贴的文本（CSV 或 JSON）
    Text(String),
    /// 上传的文件
    File { file_name: String, bytes: Vec<u8> },
}

impl ImportData {
    fn into_form(self) -> reqwest::multipart::Form {
        match self {
            ImportData::Text(data) => reqwest::multipart::Form::new().text("data", data),
            ImportData::File { file_name, bytes } => reqwest::multipart::Form::new().part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            ),
        }
    }
}

/// 服务器端导入目标操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportAction {
    Refollow,
    Exclude,
}

impl ImportAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportAction::Refollow => "refollow",
            ImportAction::Exclude => "exclude",
        }
    }
}

/// 服务器端导入结果
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub received: i64,
    pub applied: i64,
    pub skipped: i64,
    pub dry_run: bool,
    #[serde(default)]
    pub details: Vec<ImportDetail>,
}

/// 单个用户的导入明细
#[derive(Debug, Clone, Deserialize)]
pub struct ImportDetail {
    pub username: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// 导入相关的 HTTP API 客户端
pub struct ImportApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl ImportApi {
    /// 创建新的导入 API 客户端
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
        }
    }

    async fn post_multipart(
        &self,
        path: &str,
        query: &[(&str, String)],
        data: ImportData,
        operation_name: &str,
    ) -> Result<ImportResult> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/import/{}", self.api_base_url, path);

        info!("[ImportAPI] 📡 {}", operation_name);

        let response = self
            .client
            .post(&url)
            .header("operationID", &operation_id)
            .query(query)
            .multipart(data.into_form())
            .send()
            .await
            .context("请求失败")?;

        let result: ImportResult = handle_http_response(response, operation_name).await?;
        info!(
            "[ImportAPI] ✅ {}完成 - 收到: {}, 执行: {}, 跳过: {}, 干跑: {}",
            operation_name, result.received, result.applied, result.skipped, result.dry_run
        );
        Ok(result)
    }

    /// 导入名单并重新关注其中的用户
    pub async fn import_refollow(&self, data: ImportData) -> Result<ImportResult> {
        self.post_multipart("refollow", &[], data, "导入重新关注名单")
            .await
    }

    /// 导入名单并把其中的用户加入排除集
    pub async fn import_exclude(&self, data: ImportData) -> Result<ImportResult> {
        self.post_multipart("exclude", &[], data, "导入排除名单").await
    }

    /// 通用导入入口：显式指定目标操作与是否跳过已处理
    pub async fn import_users(
        &self,
        action: ImportAction,
        data: ImportData,
        skip_processed: bool,
    ) -> Result<ImportResult> {
        self.post_multipart(
            "users",
            &[
                ("action", action.as_str().to_string()),
                ("skipProcessed", skip_processed.to_string()),
            ],
            data,
            "导入用户名单",
        )
        .await
    }
}
