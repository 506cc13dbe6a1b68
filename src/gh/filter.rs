//! 候选用户筛选 HTTP API 客户端
//!
//! 按活跃度、粉丝数、语言等条件在服务器端筛选候选用户

use crate::gh::follow::types::deserialize_vec_or_null;
use crate::gh::types::handle_http_response;
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

/// 筛选条件（全部可选，未设置的条件不参与过滤）
#[derive(Debug, Clone, Default)]
pub struct FilterQuery {
    pub inactive_days: Option<i64>,
    pub last_push_days: Option<i64>,
    pub followers_lt: Option<i64>,
    pub followers_gt: Option<i64>,
    pub repos_lt: Option<i64>,
    pub repos_gt: Option<i64>,
    pub languages: Vec<String>,
    pub follows_you: Option<bool>,
    pub contrib_lt: Option<i64>,
    pub contrib_gt: Option<i64>,
}

impl FilterQuery {
    fn to_params(&self, page: i64, size: i64) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", page.to_string()), ("size", size.to_string())];
        let mut push_opt = |key: &'static str, value: Option<i64>| {
            if let Some(v) = value {
                params.push((key, v.to_string()));
            }
        };
        push_opt("inactiveDays", self.inactive_days);
        push_opt("lastPushDays", self.last_push_days);
        push_opt("followersLt", self.followers_lt);
        push_opt("followersGt", self.followers_gt);
        push_opt("reposLt", self.repos_lt);
        push_opt("reposGt", self.repos_gt);
        push_opt("contribLt", self.contrib_lt);
        push_opt("contribGt", self.contrib_gt);
        if !self.languages.is_empty() {
            params.push(("languages", self.languages.join(",")));
        }
        if let Some(f) = self.follows_you {
            params.push(("followsYou", f.to_string()));
        }
        params
    }
}

/// 带活跃度统计的候选用户
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedUser {
    pub login: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub last_public_activity: Option<String>,
    #[serde(default)]
    pub last_push_at: Option<String>,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub repos_count: i64,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub follows_you: bool,
    #[serde(default)]
    pub you_follow: bool,
    #[serde(default)]
    pub contributions_estimate: i64,
}

/// 筛选结果
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResult {
    pub total_candidates: i64,
    pub total_matched: i64,
    pub page: i64,
    pub size: i64,
    #[serde(deserialize_with = "deserialize_vec_or_null")]
    pub users: Vec<EnrichedUser>,
}

/// 筛选相关的 HTTP API 客户端
pub struct FilterApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl FilterApi {
    /// 创建新的筛选 API 客户端
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
        }
    }

    /// 按条件筛选候选用户
    pub async fn evaluate(&self, query: &FilterQuery, page: i64, size: i64) -> Result<FilterResult> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/filter/evaluate", self.api_base_url);

        info!("[FilterAPI] 📡 请求候选用户筛选，page={}, size={}", page, size);
        debug!("[FilterAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .query(&query.to_params(page, size))
            .send()
            .await
            .context("请求失败")?;

        let result: FilterResult = handle_http_response(response, "候选用户筛选").await?;
        info!(
            "[FilterAPI] ✅ 筛选响应 - 候选: {}, 命中: {}",
            result.total_candidates, result.total_matched
        );
        Ok(result)
    }

    /// 服务器推荐的筛选结果
    pub async fn smart_suggest(&self, page: i64, size: i64) -> Result<FilterResult> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/filter/smart-suggest", self.api_base_url);

        info!("[FilterAPI] 📡 请求推荐候选，page={}, size={}", page, size);

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .query(&[("page", page.to_string()), ("size", size.to_string())])
            .send()
            .await
            .context("请求失败")?;

        handle_http_response(response, "推荐候选查询").await
    }
}
