//! 候选用户本地模型定义

use serde::{Deserialize, Serialize};

/// 候选用户：自己关注但未回关的账号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateUser {
    pub login: String,
    #[serde(rename = "avatarUrl", alias = "avatar_url", default)]
    pub avatar_url: String,
    #[serde(rename = "htmlUrl", alias = "html_url", default)]
    pub html_url: String,
}
