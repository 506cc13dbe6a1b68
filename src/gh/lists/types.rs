//! 列表 API DTO（请求和响应结构体）

use serde::Deserialize;

/// 列表摘要（不含成员）
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSummary {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    pub count: i64,
}

/// 列表详情（含成员）
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDetails {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub items: Vec<String>,
}

/// 服务器端批量执行结果
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub applied: i64,
    pub skipped: i64,
    #[serde(default)]
    pub details: Vec<ApplyDetail>,
    pub dry_run: bool,
}

/// 单个用户的执行明细
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyDetail {
    pub username: String,
    pub action: String,
    #[serde(default)]
    pub skipped_reason: Option<String>,
}
