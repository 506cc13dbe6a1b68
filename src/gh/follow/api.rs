//! 关注关系 HTTP API 客户端
//!
//! 负责未回关预览、关注/取关单个用户等 HTTP 请求

use crate::gh::follow::models::CandidateUser;
use crate::gh::follow::types::PreviewResp;
use crate::gh::history::models::HistoryAction;
use crate::gh::types::{handle_http_response, MessageResp};
use anyhow::{Context, Result};
use tracing::{debug, info};
use uuid::Uuid;

/// 关注关系相关的 HTTP API 客户端
pub struct FollowApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl FollowApi {
    /// 创建新的关注 API 客户端
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
        }
    }

    /// 分页获取未回关用户预览（含总量统计与当前干跑状态）
    pub async fn non_followers_preview(&self, page: i64, size: i64) -> Result<PreviewResp> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/non-followers/preview", self.api_base_url);

        info!("[FollowAPI] 📡 请求未回关用户预览，page={}, size={}", page, size);
        debug!("[FollowAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .query(&[("page", page.to_string()), ("size", size.to_string())])
            .send()
            .await
            .context("请求失败")?;

        let resp: PreviewResp = handle_http_response(response, "未回关预览").await?;
        info!(
            "[FollowAPI] ✅ 预览响应 - 关注者: {}, 关注中: {}, 未回关: {}, 本页: {}",
            resp.total_followers,
            resp.total_following,
            resp.total_non_followers,
            resp.users.len()
        );
        Ok(resp)
    }

    /// 获取关注者列表
    pub async fn followers(&self) -> Result<Vec<CandidateUser>> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/followers", self.api_base_url);

        info!("[FollowAPI] 📡 请求关注者列表");
        debug!("[FollowAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .send()
            .await
            .context("请求失败")?;

        let followers: Vec<CandidateUser> =
            handle_http_response(response, "关注者列表查询").await?;
        info!("[FollowAPI] ✅ 关注者列表响应，共 {} 个", followers.len());
        Ok(followers)
    }

    /// 关注单个用户
    pub async fn follow(&self, username: &str) -> Result<MessageResp> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/user/following/{}", self.api_base_url, username);

        info!("[FollowAPI] 📡 关注用户: {}", username);

        let response = self
            .client
            .put(&url)
            .header("operationID", &operation_id)
            .send()
            .await
            .context("请求失败")?;

        handle_http_response(response, "关注用户").await
    }

    /// 取消关注单个用户
    pub async fn unfollow(&self, username: &str) -> Result<MessageResp> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}/user/following/{}", self.api_base_url, username);

        info!("[FollowAPI] 📡 取消关注用户: {}", username);

        let response = self
            .client
            .delete(&url)
            .header("operationID", &operation_id)
            .send()
            .await
            .context("请求失败")?;

        handle_http_response(response, "取消关注用户").await
    }

    /// 按操作类型分发到对应端点（关注走 PUT，取关走 DELETE）
    pub async fn execute_action(&self, action: HistoryAction, username: &str) -> Result<()> {
        match action {
            HistoryAction::Follow => self.follow(username).await.map(|_| ()),
            HistoryAction::Unfollow => self.unfollow(username).await.map(|_| ()),
        }
    }
}
