//! 操作历史本地镜像 DAO
//!
//! 历史记录追加后不再修改，最近的记录排在序列头部

use crate::gh::history::models::{HistoryDraft, HistoryEntry};
use crate::gh::serialization::{generate_id, now_iso};
use crate::gh::store::{LocalStore, HISTORY_KEY};
use anyhow::Result;
use tracing::debug;

/// 历史 DAO（基于本地键值存储）
#[derive(Clone)]
pub struct HistoryDao {
    store: LocalStore,
}

impl HistoryDao {
    /// 创建新的历史 DAO
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// 读取本地历史（最近的在前）
    pub async fn get_history(&self) -> Result<Vec<HistoryEntry>> {
        self.store.get_json(HISTORY_KEY).await
    }

    /// 追加历史：分配 id 与当前时间戳，插入到序列头部
    pub async fn append_history(&self, drafts: Vec<HistoryDraft>) -> Result<Vec<HistoryEntry>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        let now = now_iso();
        let existing = self.get_history().await?;

        let new_entries: Vec<HistoryEntry> = drafts
            .into_iter()
            .map(|d| HistoryEntry {
                id: generate_id(),
                username: d.username,
                action: d.action,
                timestamp: now.clone(),
                source_list_id: d.source_list_id,
                dry_run: d.dry_run,
            })
            .collect();

        let mut all = new_entries.clone();
        all.extend(existing);
        self.store.put_json(HISTORY_KEY, &all).await?;

        debug!("[HistoryDAO] 已追加 {} 条历史记录", new_entries.len());
        Ok(new_entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gh::db::create_test_pool;
    use crate::gh::history::models::HistoryAction;

    fn draft(username: &str, action: HistoryAction) -> HistoryDraft {
        HistoryDraft {
            username: username.to_string(),
            action,
            source_list_id: None,
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn append_assigns_ids_and_prepends() {
        let dao = HistoryDao::new(LocalStore::new(create_test_pool().await));

        let first = dao
            .append_history(vec![draft("alice", HistoryAction::Unfollow)])
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert!(!first[0].id.is_empty());
        assert!(!first[0].timestamp.is_empty());

        dao.append_history(vec![draft("bob", HistoryAction::Unfollow)])
            .await
            .unwrap();

        let all = dao.get_history().await.unwrap();
        assert_eq!(all.len(), 2);
        // 最近追加的在前
        assert_eq!(all[0].username, "bob");
        assert_eq!(all[1].username, "alice");
    }

    #[tokio::test]
    async fn empty_append_writes_nothing() {
        let dao = HistoryDao::new(LocalStore::new(create_test_pool().await));
        let written = dao.append_history(Vec::new()).await.unwrap();
        assert!(written.is_empty());
        assert!(dao.get_history().await.unwrap().is_empty());
    }
}
