//! 关注相关 API DTO（请求和响应结构体）

use crate::gh::follow::models::CandidateUser;
use serde::{Deserialize, Deserializer};

/// 反序列化数组字段，处理 null 值
pub(crate) fn deserialize_vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// 未回关用户预览响应
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResp {
    pub total_followers: i64,
    pub total_following: i64,
    pub total_non_followers: i64,
    pub page: i64,
    pub size: i64,
    #[serde(deserialize_with = "deserialize_vec_or_null")]
    pub users: Vec<CandidateUser>,
    #[serde(default)]
    pub dry_run_enabled: bool,
}
