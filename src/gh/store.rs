//! 本地持久化镜像（键值存储）
//!
//! 服务器数据的本地兜底缓存：固定 key 分别存放保存列表与操作历史的 JSON 快照。
//! 未配置数据库时所有操作静默降级为无数据，不阻塞上层。

use crate::gh::history::models::HistoryEntry;
use crate::gh::lists::models::SavedList;
use anyhow::{Context, Result};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, warn};

/// 保存列表镜像的存储 key
pub const LISTS_KEY: &str = "gh_utils_saved_lists_v1";
/// 操作历史镜像的存储 key
pub const HISTORY_KEY: &str = "gh_utils_history_v1";

/// 本地键值存储（基于 sqlx）
#[derive(Clone)]
pub struct LocalStore {
    db: Option<Pool<Sqlite>>,
}

impl LocalStore {
    /// 创建新的本地存储
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db: Some(db) }
    }

    /// 创建不可用的存储：读操作返回无数据，写操作为 no-op
    pub fn disabled() -> Self {
        Self { db: None }
    }

    /// 读取指定 key 的原始 payload
    pub async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let Some(db) = &self.db else {
            return Ok(None);
        };
        let row = sqlx::query(
            r#"
            SELECT payload FROM local_store WHERE store_key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(db)
        .await
        .context("查询本地存储失败")?;

        Ok(row.map(|r| r.get("payload")))
    }

    /// 写入指定 key 的原始 payload（整体覆盖）
    pub async fn put_raw(&self, key: &str, payload: &str) -> Result<()> {
        let Some(db) = &self.db else {
            return Ok(());
        };
        sqlx::query(
            r#"
            INSERT INTO local_store (store_key, payload, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(store_key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(payload)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(db)
        .await
        .context("写入本地存储失败")?;
        Ok(())
    }

    /// 读取并反序列化 JSON 序列；数据损坏时按无数据处理
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let Some(raw) = self.get_raw(key).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(values) => Ok(values),
            Err(e) => {
                warn!("[LocalStore] {} 数据损坏，按无数据处理: {:?}", key, e);
                Ok(Vec::new())
            }
        }
    }

    /// 序列化并整体写入 JSON 序列
    pub async fn put_json<T: serde::Serialize>(&self, key: &str, values: &[T]) -> Result<()> {
        let payload = serde_json::to_string(values).context("序列化本地存储数据失败")?;
        self.put_raw(key, &payload).await
    }

    /// 导出本地快照（`{lists, history}`）
    pub async fn export_all(&self) -> Result<String> {
        let lists: Vec<SavedList> = self.get_json(LISTS_KEY).await?;
        let history: Vec<HistoryEntry> = self.get_json(HISTORY_KEY).await?;
        let snapshot = serde_json::json!({ "lists": lists, "history": history });
        serde_json::to_string_pretty(&snapshot).context("序列化本地快照失败")
    }

    /// 导入本地快照：`lists` / `history` 中出现的部分整体替换
    ///
    /// 先完成全部解析再写入，解析失败时不产生部分状态
    pub async fn import_all(&self, json: &str) -> Result<()> {
        let value: serde_json::Value = serde_json::from_str(json).context("解析导入快照失败")?;

        let lists: Option<Vec<SavedList>> = match value.get("lists") {
            Some(raw) => Some(
                serde_json::from_value(raw.clone()).context("解析快照中的 lists 失败")?,
            ),
            None => None,
        };
        let history: Option<Vec<HistoryEntry>> = match value.get("history") {
            Some(raw) => Some(
                serde_json::from_value(raw.clone()).context("解析快照中的 history 失败")?,
            ),
            None => None,
        };

        if let Some(lists) = lists {
            debug!("[LocalStore] 导入 {} 个列表", lists.len());
            self.put_json(LISTS_KEY, &lists).await?;
        }
        if let Some(history) = history {
            debug!("[LocalStore] 导入 {} 条历史", history.len());
            self.put_json(HISTORY_KEY, &history).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gh::db::create_test_pool;

    #[tokio::test]
    async fn raw_round_trip_and_overwrite() {
        let store = LocalStore::new(create_test_pool().await);
        assert_eq!(store.get_raw("k").await.unwrap(), None);

        store.put_raw("k", "v1").await.unwrap();
        assert_eq!(store.get_raw("k").await.unwrap().as_deref(), Some("v1"));

        store.put_raw("k", "v2").await.unwrap();
        assert_eq!(store.get_raw("k").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn disabled_store_is_a_silent_noop() {
        let store = LocalStore::disabled();
        store.put_raw("k", "v").await.unwrap();
        assert_eq!(store.get_raw("k").await.unwrap(), None);
        let values: Vec<SavedList> = store.get_json(LISTS_KEY).await.unwrap();
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn corrupt_payload_reads_as_empty() {
        let store = LocalStore::new(create_test_pool().await);
        store.put_raw(HISTORY_KEY, "{ not json").await.unwrap();
        let values: Vec<HistoryEntry> = store.get_json(HISTORY_KEY).await.unwrap();
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn import_all_replaces_wholesale_without_partial_state() {
        let store = LocalStore::new(create_test_pool().await);
        store
            .import_all(r#"{"lists":[{"id":"1","name":"a","items":["x"],"createdAt":"t","updatedAt":"t"}]}"#)
            .await
            .unwrap();
        let lists: Vec<SavedList> = store.get_json(LISTS_KEY).await.unwrap();
        assert_eq!(lists.len(), 1);

        // history 解析失败：整体报错，已有 lists 不能被覆盖
        let bad = r#"{"lists":[],"history":[{"broken":true}]}"#;
        assert!(store.import_all(bad).await.is_err());
        let lists: Vec<SavedList> = store.get_json(LISTS_KEY).await.unwrap();
        assert_eq!(lists.len(), 1);
    }

    #[tokio::test]
    async fn export_all_contains_both_sections() {
        let store = LocalStore::new(create_test_pool().await);
        let snapshot = store.export_all().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
        assert!(value.get("lists").is_some());
        assert!(value.get("history").is_some());
    }
}
