//! 操作历史本地模型定义

use serde::{Deserialize, Serialize};

/// 操作类型：关注或取消关注
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Follow,
    Unfollow,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryAction::Follow => "follow",
            HistoryAction::Unfollow => "unfollow",
        }
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HistoryAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "follow" => Ok(HistoryAction::Follow),
            "unfollow" => Ok(HistoryAction::Unfollow),
            other => anyhow::bail!("未知操作类型: {}", other),
        }
    }
}

/// 一条关注/取关操作记录（服务器与本地镜像共用同一结构）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub username: String,
    pub action: HistoryAction,
    /// ISO 8601 时间戳
    pub timestamp: String,
    #[serde(rename = "sourceListId", default, skip_serializing_if = "Option::is_none")]
    pub source_list_id: Option<String>,
    #[serde(rename = "dryRun", default)]
    pub dry_run: bool,
}

/// 待写入历史的草稿（id 与时间戳由 DAO 统一分配）
#[derive(Debug, Clone)]
pub struct HistoryDraft {
    pub username: String,
    pub action: HistoryAction,
    pub source_list_id: Option<String>,
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&HistoryAction::Unfollow).unwrap(),
            "\"unfollow\""
        );
        let parsed: HistoryAction = serde_json::from_str("\"follow\"").unwrap();
        assert_eq!(parsed, HistoryAction::Follow);
    }

    #[test]
    fn entry_tolerates_missing_optional_fields() {
        let entry: HistoryEntry = serde_json::from_str(
            r#"{"id":"1","username":"alice","action":"unfollow","timestamp":"2026-08-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(entry.source_list_id, None);
        assert!(!entry.dry_run);
    }
}
