//! 保存列表本地模型定义

use serde::{Deserialize, Serialize};

/// 已保存的用户列表（本地镜像与单列表载荷共用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}
