//! 保存列表本地镜像 DAO
//!
//! 服务器副本是权威数据，本地镜像仅作兜底；成员去重并保留首次出现顺序

use crate::gh::lists::models::SavedList;
use crate::gh::serialization::{dedup_preserve_order, generate_id, now_iso};
use crate::gh::store::{LocalStore, LISTS_KEY};
use anyhow::Result;
use tracing::debug;

/// 列表 DAO（基于本地键值存储）
#[derive(Clone)]
pub struct ListsDao {
    store: LocalStore,
}

impl ListsDao {
    /// 创建新的列表 DAO
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// 读取全部本地列表
    pub async fn get_lists(&self) -> Result<Vec<SavedList>> {
        self.store.get_json(LISTS_KEY).await
    }

    /// 按 id 查找本地列表
    pub async fn get_list(&self, id: &str) -> Result<Option<SavedList>> {
        Ok(self.get_lists().await?.into_iter().find(|l| l.id == id))
    }

    /// 保存列表：`existing_id` 为空时新建（分配新 id），否则原地更新
    pub async fn save_list(
        &self,
        name: &str,
        items: &[String],
        existing_id: Option<&str>,
    ) -> Result<SavedList> {
        let now = now_iso();
        let mut lists = self.get_lists().await?;
        let deduped = dedup_preserve_order(items);

        let saved = if let Some(id) = existing_id {
            let Some(list) = lists.iter_mut().find(|l| l.id == id) else {
                anyhow::bail!("列表不存在: {}", id);
            };
            list.name = name.to_string();
            list.items = deduped;
            list.updated_at = now;
            list.clone()
        } else {
            let list = SavedList {
                id: generate_id(),
                name: name.to_string(),
                items: deduped,
                created_at: now.clone(),
                updated_at: now,
            };
            lists.push(list.clone());
            list
        };

        self.store.put_json(LISTS_KEY, &lists).await?;
        debug!(
            "[ListsDAO] 已保存列表: {}（{} 个成员）",
            saved.name,
            saved.items.len()
        );
        Ok(saved)
    }

    /// 删除本地列表
    pub async fn delete_list(&self, id: &str) -> Result<()> {
        let lists: Vec<SavedList> = self
            .get_lists()
            .await?
            .into_iter()
            .filter(|l| l.id != id)
            .collect();
        self.store.put_json(LISTS_KEY, &lists).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gh::db::create_test_pool;

    fn items(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    async fn test_dao() -> ListsDao {
        ListsDao::new(LocalStore::new(create_test_pool().await))
    }

    #[tokio::test]
    async fn save_then_get_yields_one_deduped_list() {
        let dao = test_dao().await;
        let saved = dao
            .save_list("keep", &items(&["bob", "alice", "bob", "carol", "alice"]), None)
            .await
            .unwrap();

        let lists = dao.get_lists().await.unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].id, saved.id);
        // 去重且保留首次出现顺序
        assert_eq!(lists[0].items, items(&["bob", "alice", "carol"]));
        assert_eq!(lists[0].created_at, lists[0].updated_at);
    }

    #[tokio::test]
    async fn save_with_existing_id_updates_in_place() {
        let dao = test_dao().await;
        let created = dao.save_list("old", &items(&["alice"]), None).await.unwrap();

        let updated = dao
            .save_list("new", &items(&["alice", "bob"]), Some(&created.id))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "new");

        let lists = dao.get_lists().await.unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].items, items(&["alice", "bob"]));
    }

    #[tokio::test]
    async fn save_with_unknown_id_is_an_error() {
        let dao = test_dao().await;
        assert!(dao
            .save_list("x", &items(&["alice"]), Some("missing"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn delete_removes_only_target() {
        let dao = test_dao().await;
        let a = dao.save_list("a", &items(&["alice"]), None).await.unwrap();
        dao.save_list("b", &items(&["bob"]), None).await.unwrap();

        dao.delete_list(&a.id).await.unwrap();
        let lists = dao.get_lists().await.unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].name, "b");
    }
}
