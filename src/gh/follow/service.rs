//! 批量关注/取关对账服务层
//!
//! 计算"已处理"集合（服务器历史优先、本地镜像兜底）、顺序执行批量操作、
//! 隔离单项失败并统一记录结果。网络与历史来源通过能力接口注入。

use crate::gh::follow::api::FollowApi;
use crate::gh::follow::listener::FollowListener;
use crate::gh::history::api::HistoryApi;
use crate::gh::history::dao::HistoryDao;
use crate::gh::history::models::{HistoryAction, HistoryDraft, HistoryEntry};
use crate::gh::serialization::dedup_preserve_order;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 撤销窗口默认值（分钟）
pub const DEFAULT_UNDO_WINDOW_MINUTES: i64 = 60;

/// 对单个用户执行一次关注/取关网络调用的能力接口
#[async_trait]
pub trait FollowExecutor: Send + Sync {
    async fn execute(&self, action: HistoryAction, username: &str) -> Result<()>;
}

#[async_trait]
impl FollowExecutor for FollowApi {
    async fn execute(&self, action: HistoryAction, username: &str) -> Result<()> {
        self.execute_action(action, username).await
    }
}

/// 服务器端历史的查询能力接口
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn entries_for_action(&self, action: HistoryAction) -> Result<Vec<HistoryEntry>>;
}

#[async_trait]
impl HistorySource for HistoryApi {
    async fn entries_for_action(&self, action: HistoryAction) -> Result<Vec<HistoryEntry>> {
        self.get_history(None, Some(action), None).await
    }
}

/// 一次批量操作的结果统计
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub applied: usize,
    pub skipped: usize,
    pub failed: Vec<String>,
    pub dry_run: bool,
}

impl BatchReport {
    /// 人类可读的结果摘要
    pub fn summary(&self) -> String {
        let mut s = format!(
            "已执行 {} 个，跳过 {} 个，失败 {} 个",
            self.applied,
            self.skipped,
            self.failed.len()
        );
        if !self.failed.is_empty() {
            s.push_str(&format!("（失败: {}）", self.failed.join(", ")));
        }
        if self.dry_run {
            s.push_str("（干跑模式，未实际执行）");
        }
        s
    }
}

/// 批量对账器
pub struct BatchReconciler {
    /// 关注/取关执行器（真实实现为 FollowApi）
    executor: Arc<dyn FollowExecutor>,
    /// 服务器历史来源（真实实现为 HistoryApi）
    history_source: Arc<dyn HistorySource>,
    /// 历史本地镜像 DAO
    history_dao: HistoryDao,
    /// 批量操作监听器
    listener: Arc<dyn FollowListener>,
    /// 与视图层共享的干跑状态缓存
    dry_run: Arc<AtomicBool>,
}

impl BatchReconciler {
    /// 创建新的批量对账器
    pub fn new(
        executor: Arc<dyn FollowExecutor>,
        history_source: Arc<dyn HistorySource>,
        history_dao: HistoryDao,
        listener: Arc<dyn FollowListener>,
        dry_run: Arc<AtomicBool>,
    ) -> Self {
        Self {
            executor,
            history_source,
            history_dao,
            listener,
            dry_run,
        }
    }

    /// 计算指定操作类型的"已处理"用户集合
    ///
    /// 服务器历史非空时独占使用；仅当该操作类型的服务器结果为空时才回退本地
    /// 镜像。两个来源从不合并，避免迁移期间的重复计数。
    pub async fn processed_logins(&self, action: HistoryAction) -> Result<HashSet<String>> {
        let server = match self.history_source.entries_for_action(action).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("[Reconcile] 服务器历史查询失败，回退本地镜像: {:?}", e);
                Vec::new()
            }
        };

        let entries = if server.is_empty() {
            debug!("[Reconcile] 服务器 {} 历史为空，使用本地镜像", action);
            self.history_dao
                .get_history()
                .await?
                .into_iter()
                .filter(|e| e.action == action)
                .collect()
        } else {
            debug!(
                "[Reconcile] 使用服务器 {} 历史，共 {} 条",
                action,
                server.len()
            );
            server
        };

        Ok(entries.into_iter().map(|e| e.username).collect())
    }

    /// 顺序执行一批关注/取关操作
    ///
    /// 逐个用户 await 一次网络调用（有意限流，不做并发扇出）；单项失败只记录
    /// 不中断。结束后把实际请求且未失败的用户写入本地历史。
    pub async fn apply_batch(
        &self,
        logins: &[String],
        action: HistoryAction,
        skip_processed: bool,
        source_list_id: Option<String>,
    ) -> Result<BatchReport> {
        let targets = dedup_preserve_order(logins);
        let mut report = BatchReport {
            dry_run: self.dry_run.load(Ordering::SeqCst),
            ..Default::default()
        };
        if targets.is_empty() {
            return Ok(report);
        }

        info!(
            "[Reconcile] 🔄 开始批量{}，共 {} 个用户，跳过已处理: {}",
            action,
            targets.len(),
            skip_processed
        );

        let processed = if skip_processed {
            self.processed_logins(action).await?
        } else {
            HashSet::new()
        };

        let mut succeeded: Vec<String> = Vec::new();
        for login in &targets {
            if processed.contains(login) {
                debug!("[Reconcile]   跳过已处理用户: {}", login);
                report.skipped += 1;
                continue;
            }

            match self.executor.execute(action, login).await {
                Ok(()) => {
                    info!("[Reconcile]   ✅ {} {}", action, login);
                    report.applied += 1;
                    succeeded.push(login.clone());
                    self.listener
                        .on_item_processed(login.clone(), action.to_string(), true)
                        .await;
                }
                Err(e) => {
                    error!("[Reconcile]   ❌ {} {} 失败: {:?}", action, login, e);
                    report.failed.push(login.clone());
                    self.listener
                        .on_item_processed(login.clone(), action.to_string(), false)
                        .await;
                }
            }
        }

        // 实际请求且未失败的用户写入历史（带当前干跑标记）
        let drafts: Vec<HistoryDraft> = succeeded
            .into_iter()
            .map(|username| HistoryDraft {
                username,
                action,
                source_list_id: source_list_id.clone(),
                dry_run: report.dry_run,
            })
            .collect();
        self.history_dao.append_history(drafts).await?;

        info!("[Reconcile] 批量{}完成 - {}", action, report.summary());
        self.listener.on_batch_finished(report.summary()).await;
        Ok(report)
    }

    /// 撤销最近的取关操作：把时间窗口内的 unfollow 历史回放为 follow
    ///
    /// `usernames` 非空时只撤销其中的用户。回放不做已处理跳过，
    /// 否则旧的 follow 历史会挡住重新关注。
    pub async fn undo_recent(
        &self,
        window_minutes: i64,
        usernames: Option<&[String]>,
    ) -> Result<BatchReport> {
        let server = match self
            .history_source
            .entries_for_action(HistoryAction::Unfollow)
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                warn!("[Reconcile] 服务器历史查询失败，回退本地镜像: {:?}", e);
                Vec::new()
            }
        };
        let entries = if server.is_empty() {
            self.history_dao.get_history().await?
        } else {
            server
        };

        let targets = select_recent_logins(
            &entries,
            HistoryAction::Unfollow,
            Utc::now(),
            window_minutes,
            usernames,
        );
        info!(
            "[Reconcile] 🔄 撤销最近 {} 分钟的取关，共 {} 个用户",
            window_minutes,
            targets.len()
        );

        self.apply_batch(&targets, HistoryAction::Follow, false, None)
            .await
    }
}

/// 从历史中选出时间窗口内指定操作的用户（去重，保留首次出现顺序）
///
/// 窗口边界为严格大于：刚好落在窗口边缘之外的记录不入选。
/// 时间戳无法解析的记录跳过并告警。
fn select_recent_logins(
    entries: &[HistoryEntry],
    action: HistoryAction,
    now: DateTime<Utc>,
    window_minutes: i64,
    usernames: Option<&[String]>,
) -> Vec<String> {
    let cutoff = now - Duration::minutes(window_minutes);
    let subset: Option<HashSet<&str>> =
        usernames.map(|us| us.iter().map(|u| u.as_str()).collect());

    let mut selected = Vec::new();
    for entry in entries {
        if entry.action != action {
            continue;
        }
        if let Some(subset) = &subset {
            if !subset.contains(entry.username.as_str()) {
                continue;
            }
        }
        let ts = match DateTime::parse_from_rfc3339(&entry.timestamp) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                warn!(
                    "[Reconcile] 历史时间戳无法解析，跳过: {} ({:?})",
                    entry.timestamp, e
                );
                continue;
            }
        };
        if ts > cutoff {
            selected.push(entry.username.clone());
        }
    }
    dedup_preserve_order(&selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gh::db::create_test_pool;
    use crate::gh::follow::listener::EmptyFollowListener;
    use crate::gh::store::LocalStore;
    use std::sync::Mutex;

    /// 记录全部调用的假执行器，可指定特定用户失败
    struct RecordingExecutor {
        calls: Mutex<Vec<(HistoryAction, String)>>,
        fail_for: HashSet<String>,
    }

    impl RecordingExecutor {
        fn new(fail_for: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail_for: fail_for.iter().map(|s| s.to_string()).collect(),
            })
        }

        fn calls(&self) -> Vec<(HistoryAction, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FollowExecutor for RecordingExecutor {
        async fn execute(&self, action: HistoryAction, username: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((action, username.to_string()));
            if self.fail_for.contains(username) {
                anyhow::bail!("模拟网络失败: {}", username);
            }
            Ok(())
        }
    }

    /// 返回固定条目的假历史来源
    struct StaticHistory {
        entries: Vec<HistoryEntry>,
    }

    #[async_trait]
    impl HistorySource for StaticHistory {
        async fn entries_for_action(&self, action: HistoryAction) -> Result<Vec<HistoryEntry>> {
            Ok(self
                .entries
                .iter()
                .filter(|e| e.action == action)
                .cloned()
                .collect())
        }
    }

    fn entry(username: &str, action: HistoryAction, timestamp: &str) -> HistoryEntry {
        HistoryEntry {
            id: username.to_string(),
            username: username.to_string(),
            action,
            timestamp: timestamp.to_string(),
            source_list_id: None,
            dry_run: false,
        }
    }

    fn logins(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    async fn reconciler_with(
        executor: Arc<RecordingExecutor>,
        server_entries: Vec<HistoryEntry>,
        dry_run: bool,
    ) -> (BatchReconciler, HistoryDao) {
        let dao = HistoryDao::new(LocalStore::new(create_test_pool().await));
        let reconciler = BatchReconciler::new(
            executor,
            Arc::new(StaticHistory {
                entries: server_entries,
            }),
            dao.clone(),
            Arc::new(EmptyFollowListener),
            Arc::new(AtomicBool::new(dry_run)),
        );
        (reconciler, dao)
    }

    #[tokio::test]
    async fn skip_processed_uses_server_history() {
        let executor = RecordingExecutor::new(&[]);
        let server = vec![entry(
            "alice",
            HistoryAction::Unfollow,
            "2026-08-01T00:00:00+00:00",
        )];
        let (reconciler, dao) = reconciler_with(executor.clone(), server, false).await;

        let report = reconciler
            .apply_batch(&logins(&["alice", "bob"]), HistoryAction::Unfollow, true, None)
            .await
            .unwrap();

        // alice 已处理：只有 bob 走网络
        assert_eq!(
            executor.calls(),
            vec![(HistoryAction::Unfollow, "bob".to_string())]
        );
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped, 1);
        assert!(report.failed.is_empty());

        let history = dao.get_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].username, "bob");
    }

    #[tokio::test]
    async fn partial_failure_is_isolated_and_not_recorded() {
        let executor = RecordingExecutor::new(&["bob"]);
        let (reconciler, dao) = reconciler_with(executor.clone(), Vec::new(), false).await;

        let report = reconciler
            .apply_batch(
                &logins(&["alice", "bob", "carol"]),
                HistoryAction::Unfollow,
                false,
                None,
            )
            .await
            .unwrap();

        // bob 失败不中断后续用户
        assert_eq!(executor.calls().len(), 3);
        assert_eq!(report.applied, 2);
        assert_eq!(report.failed, logins(&["bob"]));

        let history = dao.get_history().await.unwrap();
        let names: Vec<&str> = history.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(history.len(), 2);
        assert!(names.contains(&"alice"));
        assert!(names.contains(&"carol"));
        assert!(!names.contains(&"bob"));
    }

    #[tokio::test]
    async fn empty_server_history_falls_back_to_local_mirror() {
        let executor = RecordingExecutor::new(&[]);
        let (reconciler, dao) = reconciler_with(executor.clone(), Vec::new(), false).await;

        dao.append_history(vec![HistoryDraft {
            username: "carol".to_string(),
            action: HistoryAction::Unfollow,
            source_list_id: None,
            dry_run: false,
        }])
        .await
        .unwrap();

        let report = reconciler
            .apply_batch(&logins(&["carol"]), HistoryAction::Unfollow, true, None)
            .await
            .unwrap();

        assert!(executor.calls().is_empty());
        assert_eq!(report.skipped, 1);
        assert_eq!(report.applied, 0);
    }

    #[tokio::test]
    async fn dry_run_flag_is_recorded_on_entries() {
        let executor = RecordingExecutor::new(&[]);
        let (reconciler, dao) = reconciler_with(executor, Vec::new(), true).await;

        let report = reconciler
            .apply_batch(&logins(&["alice"]), HistoryAction::Unfollow, false, None)
            .await
            .unwrap();

        assert!(report.dry_run);
        let history = dao.get_history().await.unwrap();
        assert!(history[0].dry_run);
    }

    #[tokio::test]
    async fn undo_replays_recent_unfollows_as_follows() {
        let now = Utc::now();
        let fresh = (now - Duration::minutes(59)).to_rfc3339();
        let stale = (now - Duration::minutes(61)).to_rfc3339();

        let executor = RecordingExecutor::new(&[]);
        let server = vec![
            entry("alice", HistoryAction::Unfollow, &fresh),
            entry("bob", HistoryAction::Unfollow, &stale),
        ];
        let (reconciler, _dao) = reconciler_with(executor.clone(), server, false).await;

        let report = reconciler
            .undo_recent(DEFAULT_UNDO_WINDOW_MINUTES, None)
            .await
            .unwrap();

        // 59 分钟前的在窗口内，61 分钟前的不在
        assert_eq!(
            executor.calls(),
            vec![(HistoryAction::Follow, "alice".to_string())]
        );
        assert_eq!(report.applied, 1);
    }

    #[tokio::test]
    async fn undo_respects_username_subset() {
        let now = Utc::now();
        let fresh = (now - Duration::minutes(5)).to_rfc3339();

        let executor = RecordingExecutor::new(&[]);
        let server = vec![
            entry("alice", HistoryAction::Unfollow, &fresh),
            entry("bob", HistoryAction::Unfollow, &fresh),
        ];
        let (reconciler, _dao) = reconciler_with(executor.clone(), server, false).await;

        let subset = logins(&["bob"]);
        reconciler
            .undo_recent(60, Some(subset.as_slice()))
            .await
            .unwrap();

        assert_eq!(
            executor.calls(),
            vec![(HistoryAction::Follow, "bob".to_string())]
        );
    }

    #[test]
    fn select_recent_skips_unparseable_timestamps_and_dedups() {
        let now = Utc::now();
        let fresh = (now - Duration::minutes(1)).to_rfc3339();
        let entries = vec![
            entry("alice", HistoryAction::Unfollow, &fresh),
            entry("alice", HistoryAction::Unfollow, &fresh),
            entry("mallory", HistoryAction::Unfollow, "not-a-timestamp"),
            entry("carol", HistoryAction::Follow, &fresh),
        ];

        let selected =
            select_recent_logins(&entries, HistoryAction::Unfollow, now, 60, None);
        assert_eq!(selected, logins(&["alice"]));
    }
}
