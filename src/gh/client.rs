//! github-utils 客户端核心实现模块
//!
//! 持有全部视图状态：候选页加载状态机、跨页选择集、激活列表与干跑缓存。
//! 批量动作统一转交对账器执行；本地镜像与网络访问通过各自组件注入。

use crate::gh::db::create_sqlite_pool_with_migration;
use crate::gh::dryrun::DryRunApi;
use crate::gh::filter::FilterApi;
use crate::gh::follow::api::FollowApi;
use crate::gh::follow::listener::{EmptyFollowListener, FollowListener};
use crate::gh::follow::models::CandidateUser;
use crate::gh::follow::service::{BatchReconciler, BatchReport, DEFAULT_UNDO_WINDOW_MINUTES};
use crate::gh::history::api::HistoryApi;
use crate::gh::history::dao::HistoryDao;
use crate::gh::history::models::{HistoryAction, HistoryEntry};
use crate::gh::imports::ImportApi;
use crate::gh::lists::api::ListsApi;
use crate::gh::lists::dao::ListsDao;
use crate::gh::serialization::{logins_to_csv, parse_import_payload, ImportPayload};
use crate::gh::store::LocalStore;
use crate::gh::undo::UndoApi;
use anyhow::Result;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// HTTP API 基础地址
    pub api_base_url: String,
    /// 本地镜像 SQLite 数据库 URL
    ///
    /// 例如：`sqlite://gh_utils.db?mode=rwc`；为 None 时本地镜像降级为无数据
    pub db_url: Option<String>,
    /// 预览分页大小
    pub page_size: i64,
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new(api_base_url: String) -> Self {
        Self {
            api_base_url,
            db_url: Some("sqlite://gh_utils.db?mode=rwc".to_string()),
            page_size: 30,
        }
    }
}

/// 候选页加载状态机：Idle -> Loading -> (Loaded | Errored)，retry 从 Errored 回到 Loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Errored(String),
}

/// 预览总量统计
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewTotals {
    pub followers: i64,
    pub following: i64,
    pub non_followers: i64,
}

/// 当前激活管理的导入列表（带独立选择集，本身不落盘）
#[derive(Debug, Clone)]
pub struct ActiveList {
    pub name: String,
    pub users: Vec<String>,
    pub selection: HashSet<String>,
}

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// 视图层导入的落点
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// 单列表载荷：已成为激活列表
    Activated { name: String, count: usize },
    /// 多列表载荷：已写入本地镜像，未激活任何列表
    Saved(usize),
}

/// github-utils 客户端
///
/// 视图状态只在单个 UI 任务中变更；跨 await 边界不保证原子性，
/// 锁从不跨网络调用持有
#[derive(Clone)]
pub struct GithubUtilsClient {
    pub(crate) config: ClientConfig,
    follow_api: Arc<FollowApi>,
    lists_api: Arc<ListsApi>,
    history_api: Arc<HistoryApi>,
    dryrun_api: Arc<DryRunApi>,
    import_api: Arc<ImportApi>,
    filter_api: Arc<FilterApi>,
    undo_api: Arc<UndoApi>,
    store: LocalStore,
    lists_dao: ListsDao,
    history_dao: HistoryDao,
    reconciler: Arc<BatchReconciler>,
    listener: Arc<dyn FollowListener>,
    // 视图状态槽位
    load_state: Arc<Mutex<LoadState>>,
    candidates: Arc<Mutex<Vec<CandidateUser>>>,
    totals: Arc<Mutex<PreviewTotals>>,
    page: Arc<Mutex<(i64, i64)>>,
    selection: Arc<Mutex<HashSet<String>>>,
    active_list: Arc<Mutex<Option<ActiveList>>>,
    dry_run: Arc<AtomicBool>,
    dry_run_toggle_in_flight: Arc<AtomicBool>,
}

impl GithubUtilsClient {
    /// 创建新的客户端（使用默认空监听器）
    pub async fn new(config: ClientConfig) -> Result<Self> {
        Self::with_listener(config, Arc::new(EmptyFollowListener)).await
    }

    /// 创建新的客户端（带自定义监听器，内部初始化本地镜像）
    pub async fn with_listener(
        config: ClientConfig,
        listener: Arc<dyn FollowListener>,
    ) -> Result<Self> {
        let store = match &config.db_url {
            Some(db_url) => {
                info!("[Client] 初始化本地镜像: {}", db_url);
                LocalStore::new(create_sqlite_pool_with_migration(db_url).await?)
            }
            None => {
                warn!("[Client] 未配置本地镜像数据库，本地兜底不可用");
                LocalStore::disabled()
            }
        };

        let http_client = reqwest::Client::new();
        let base = config.api_base_url.clone();
        let follow_api = Arc::new(FollowApi::new(http_client.clone(), base.clone()));
        let history_api = Arc::new(HistoryApi::new(http_client.clone(), base.clone()));
        let lists_dao = ListsDao::new(store.clone());
        let history_dao = HistoryDao::new(store.clone());
        let dry_run = Arc::new(AtomicBool::new(false));

        let reconciler = Arc::new(BatchReconciler::new(
            follow_api.clone(),
            history_api.clone(),
            history_dao.clone(),
            listener.clone(),
            dry_run.clone(),
        ));

        let page_size = config.page_size;
        Ok(Self {
            follow_api,
            history_api,
            lists_api: Arc::new(ListsApi::new(http_client.clone(), base.clone())),
            dryrun_api: Arc::new(DryRunApi::new(http_client.clone(), base.clone())),
            import_api: Arc::new(ImportApi::new(http_client.clone(), base.clone())),
            filter_api: Arc::new(FilterApi::new(http_client.clone(), base.clone())),
            undo_api: Arc::new(UndoApi::new(http_client, base)),
            store,
            lists_dao,
            history_dao,
            reconciler,
            listener,
            config,
            load_state: Arc::new(Mutex::new(LoadState::Idle)),
            candidates: Arc::new(Mutex::new(Vec::new())),
            totals: Arc::new(Mutex::new(PreviewTotals::default())),
            page: Arc::new(Mutex::new((1, page_size))),
            selection: Arc::new(Mutex::new(HashSet::new())),
            active_list: Arc::new(Mutex::new(None)),
            dry_run,
            dry_run_toggle_in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    /// 注册批量操作监听器
    pub fn set_follow_listener(&mut self, listener: Arc<dyn FollowListener>) {
        self.listener = listener.clone();

        // 用新监听器重建对账器，保持回调一致
        self.reconciler = Arc::new(BatchReconciler::new(
            self.follow_api.clone(),
            self.history_api.clone(),
            self.history_dao.clone(),
            listener,
            self.dry_run.clone(),
        ));
    }

    /// 启动：拉取干跑状态并加载第一页预览
    pub async fn connect(&self) -> Result<()> {
        let enabled = self.refresh_dry_run().await;
        info!("[Client] 🔗 已连接，干跑状态: {}", enabled);
        self.load_preview(1, self.config.page_size).await
    }

    /// 从服务器刷新干跑状态并更新本地缓存
    pub async fn refresh_dry_run(&self) -> bool {
        let enabled = self.dryrun_api.status().await;
        self.dry_run.store(enabled, Ordering::SeqCst);
        enabled
    }

    // ========== 候选页加载 ==========

    /// 加载候选用户预览页；成功或失败都会驱动加载状态机
    pub async fn load_preview(&self, page: i64, size: i64) -> Result<()> {
        *self.load_state.lock().unwrap() = LoadState::Loading;

        match self.follow_api.non_followers_preview(page, size).await {
            Ok(resp) => {
                *self.candidates.lock().unwrap() = resp.users;
                *self.totals.lock().unwrap() = PreviewTotals {
                    followers: resp.total_followers,
                    following: resp.total_following,
                    non_followers: resp.total_non_followers,
                };
                *self.page.lock().unwrap() = (resp.page, resp.size);
                self.dry_run.store(resp.dry_run_enabled, Ordering::SeqCst);
                *self.load_state.lock().unwrap() = LoadState::Loaded;
                Ok(())
            }
            Err(e) => {
                *self.load_state.lock().unwrap() = LoadState::Errored(e.to_string());
                Err(e)
            }
        }
    }

    /// 翻页（跨页选择集不受影响）
    pub async fn set_page(&self, page: i64) -> Result<()> {
        let (_, size) = *self.page.lock().unwrap();
        self.load_preview(page, size).await
    }

    /// 调整分页大小并回到第一页
    pub async fn set_page_size(&self, size: i64) -> Result<()> {
        self.load_preview(1, size).await
    }

    /// 加载失败后的重试；仅在 Errored 状态下生效
    pub async fn retry(&self) -> Result<()> {
        let errored = matches!(*self.load_state.lock().unwrap(), LoadState::Errored(_));
        if !errored {
            return Ok(());
        }
        let (page, size) = *self.page.lock().unwrap();
        self.load_preview(page, size).await
    }

    // ========== 选择集 ==========

    /// 翻转单个用户的选中状态（再次调用恢复原状）
    pub fn toggle_selection(&self, login: &str) {
        let mut selection = self.selection.lock().unwrap();
        if !selection.remove(login) {
            selection.insert(login.to_string());
        }
    }

    /// 全选当前页候选（并入跨页选择集）
    pub fn select_all_on_page(&self) {
        let candidates = self.candidates.lock().unwrap();
        let mut selection = self.selection.lock().unwrap();
        for user in candidates.iter() {
            selection.insert(user.login.clone());
        }
    }

    /// 清空选择集
    pub fn clear_selection(&self) {
        self.selection.lock().unwrap().clear();
    }

    /// 当前选择集（排序后返回，便于展示与导出）
    pub fn selection(&self) -> Vec<String> {
        let mut logins: Vec<String> = self.selection.lock().unwrap().iter().cloned().collect();
        logins.sort();
        logins
    }

    pub fn selection_count(&self) -> usize {
        self.selection.lock().unwrap().len()
    }

    pub fn is_selected(&self, login: &str) -> bool {
        self.selection.lock().unwrap().contains(login)
    }

    // ========== 视图状态读取 ==========

    pub fn candidates(&self) -> Vec<CandidateUser> {
        self.candidates.lock().unwrap().clone()
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state.lock().unwrap().clone()
    }

    pub fn totals(&self) -> PreviewTotals {
        *self.totals.lock().unwrap()
    }

    pub fn page(&self) -> (i64, i64) {
        *self.page.lock().unwrap()
    }

    /// 当前干跑状态（本地缓存，权威状态在服务器）
    pub fn dry_run(&self) -> bool {
        self.dry_run.load(Ordering::SeqCst)
    }

    /// 界面状态行：总量、已选数量与干跑提示
    pub fn status_line(&self) -> String {
        let totals = self.totals();
        let mut line = format!(
            "未回关 {} 人（关注中 {} / 关注者 {}），已选择 {} 人",
            totals.non_followers,
            totals.following,
            totals.followers,
            self.selection_count()
        );
        if self.dry_run() {
            line.push_str("，干跑模式已开启");
        }
        line
    }

    // ========== 批量操作 ==========

    /// 取关当前选择集；批次完成后清空选择
    pub async fn unfollow_selected(&self, skip_processed: bool) -> Result<BatchReport> {
        self.apply_selected(HistoryAction::Unfollow, skip_processed).await
    }

    /// 关注当前选择集；批次完成后清空选择
    pub async fn follow_selected(&self, skip_processed: bool) -> Result<BatchReport> {
        self.apply_selected(HistoryAction::Follow, skip_processed).await
    }

    async fn apply_selected(
        &self,
        action: HistoryAction,
        skip_processed: bool,
    ) -> Result<BatchReport> {
        let logins = self.selection();
        if logins.is_empty() {
            // 输入校验失败：不发起任何网络调用
            anyhow::bail!("未选择任何用户");
        }

        let report = self
            .reconciler
            .apply_batch(&logins, action, skip_processed, None)
            .await?;

        // 批次成功后清空选择（部分失败也算批次完成）
        self.clear_selection();
        Ok(report)
    }

    /// 撤销最近的取关操作（客户端回放，默认窗口 60 分钟）
    pub async fn undo_recent(
        &self,
        window_minutes: Option<i64>,
        usernames: Option<&[String]>,
    ) -> Result<BatchReport> {
        self.reconciler
            .undo_recent(
                window_minutes.unwrap_or(DEFAULT_UNDO_WINDOW_MINUTES),
                usernames,
            )
            .await
    }

    // ========== 激活列表 ==========

    /// 导入 JSON 载荷：单列表成为激活列表（选择集置空），多列表逐个落盘
    pub async fn import_payload(&self, json: &str) -> Result<ImportOutcome> {
        match parse_import_payload(json)? {
            ImportPayload::SingleList { name, items } => {
                let count = items.len();
                info!("[Client] 📥 导入激活列表: {}（{} 个用户）", name, count);
                *self.active_list.lock().unwrap() = Some(ActiveList {
                    name: name.clone(),
                    users: items,
                    selection: HashSet::new(),
                });
                Ok(ImportOutcome::Activated { name, count })
            }
            ImportPayload::MultiList(lists) => {
                let count = lists.len();
                for list in &lists {
                    self.lists_dao.save_list(&list.name, &list.items, None).await?;
                }
                info!("[Client] 📥 已导入 {} 个列表到本地镜像", count);
                Ok(ImportOutcome::Saved(count))
            }
        }
    }

    /// 当前激活列表
    pub fn active_list(&self) -> Option<ActiveList> {
        self.active_list.lock().unwrap().clone()
    }

    /// 清除激活列表
    pub fn clear_active_list(&self) {
        *self.active_list.lock().unwrap() = None;
    }

    /// 翻转激活列表内用户的选中状态
    pub fn toggle_active_selection(&self, login: &str) -> Result<()> {
        let mut slot = self.active_list.lock().unwrap();
        let Some(active) = slot.as_mut() else {
            anyhow::bail!("没有激活列表");
        };
        if !active.selection.remove(login) {
            if !active.users.iter().any(|u| u == login) {
                anyhow::bail!("用户不在激活列表中: {}", login);
            }
            active.selection.insert(login.to_string());
        }
        Ok(())
    }

    /// 对激活列表的选择集执行关注/取关
    ///
    /// 关注走 PUT、取关走 DELETE，两条路径各自指向正确端点
    pub async fn apply_active_list(
        &self,
        action: HistoryAction,
        skip_processed: bool,
    ) -> Result<BatchReport> {
        let logins: Vec<String> = {
            let slot = self.active_list.lock().unwrap();
            let Some(active) = slot.as_ref() else {
                anyhow::bail!("没有激活列表");
            };
            if active.selection.is_empty() {
                anyhow::bail!("激活列表中未选择任何用户");
            }
            // 按列表顺序执行
            active
                .users
                .iter()
                .filter(|u| active.selection.contains(u.as_str()))
                .cloned()
                .collect()
        };

        let report = self
            .reconciler
            .apply_batch(&logins, action, skip_processed, None)
            .await?;

        if let Some(active) = self.active_list.lock().unwrap().as_mut() {
            active.selection.clear();
        }
        Ok(report)
    }

    // ========== 导入导出 ==========

    /// 导出当前选择集
    ///
    /// `save_as` 非空时同时把选择集落盘为本地列表；文件内容与落盘互相独立
    pub async fn export_selection(
        &self,
        format: ExportFormat,
        save_as: Option<&str>,
    ) -> Result<Vec<u8>> {
        let logins = self.selection();
        if logins.is_empty() {
            anyhow::bail!("未选择任何用户");
        }

        if let Some(name) = save_as {
            self.lists_dao.save_list(name, &logins, None).await?;
            info!("[Client] 💾 选择集已保存为列表: {}", name);
        }

        Ok(match format {
            ExportFormat::Csv => logins_to_csv(&logins).into_bytes(),
            ExportFormat::Json => {
                serde_json::to_vec_pretty(&serde_json::json!({ "users": logins }))?
            }
        })
    }

    /// 把激活列表导出为单列表 JSON 载荷（可重新导入）
    pub fn export_active_list(&self) -> Result<Vec<u8>> {
        let slot = self.active_list.lock().unwrap();
        let Some(active) = slot.as_ref() else {
            anyhow::bail!("没有激活列表");
        };
        Ok(serde_json::to_vec_pretty(&serde_json::json!({
            "name": active.name,
            "items": active.users,
        }))?)
    }

    /// 导出本地快照（`{lists, history}`）
    pub async fn export_local_snapshot(&self) -> Result<String> {
        self.store.export_all().await
    }

    /// 导入本地快照（整体替换）
    pub async fn import_local_snapshot(&self, json: &str) -> Result<()> {
        self.store.import_all(json).await
    }

    // ========== 干跑开关 ==========

    /// 翻转干跑开关（单飞：已有请求进行中时不再发起网络调用，返回缓存值）
    pub async fn toggle_dry_run(&self) -> Result<bool> {
        if self.dry_run_toggle_in_flight.swap(true, Ordering::SeqCst) {
            debug!("[Client] 干跑开关请求进行中，忽略本次请求");
            return Ok(self.dry_run());
        }

        let result = self.dryrun_api.toggle().await;
        self.dry_run_toggle_in_flight.store(false, Ordering::SeqCst);

        match result {
            Ok(enabled) => {
                self.dry_run.store(enabled, Ordering::SeqCst);
                self.listener.on_dry_run_changed(enabled).await;
                info!("[Client] 干跑开关已切换: {}", enabled);
                Ok(enabled)
            }
            // 失败不改动缓存，错误原样上抛
            Err(e) => Err(e),
        }
    }

    // ========== 历史与其余 API 入口 ==========

    /// 本地镜像历史（最近的在前）
    pub async fn local_history(&self) -> Result<Vec<HistoryEntry>> {
        self.history_dao.get_history().await
    }

    /// 服务器端历史
    pub async fn server_history(
        &self,
        username: Option<&str>,
        action: Option<HistoryAction>,
        since: Option<&str>,
    ) -> Result<Vec<HistoryEntry>> {
        self.history_api.get_history(username, action, since).await
    }

    pub fn follow_api(&self) -> &FollowApi {
        &self.follow_api
    }

    pub fn history_api(&self) -> &HistoryApi {
        &self.history_api
    }

    pub fn lists_api(&self) -> &ListsApi {
        &self.lists_api
    }

    pub fn lists_dao(&self) -> &ListsDao {
        &self.lists_dao
    }

    pub fn import_api(&self) -> &ImportApi {
        &self.import_api
    }

    pub fn filter_api(&self) -> &FilterApi {
        &self.filter_api
    }

    pub fn undo_api(&self) -> &UndoApi {
        &self.undo_api
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 不配置本地镜像、指向不可达地址的客户端：
    /// 任何真实网络调用都会立刻失败，方便验证"未发起调用"类属性
    async fn offline_client() -> GithubUtilsClient {
        let mut config = ClientConfig::new("http://localhost:0".to_string());
        config.db_url = None;
        GithubUtilsClient::new(config).await.unwrap()
    }

    #[tokio::test]
    async fn toggle_selection_is_an_involution() {
        let client = offline_client().await;
        assert!(client.selection().is_empty());

        client.toggle_selection("alice");
        assert_eq!(client.selection(), vec!["alice".to_string()]);
        assert!(client.is_selected("alice"));

        client.toggle_selection("alice");
        assert!(client.selection().is_empty());
    }

    #[tokio::test]
    async fn empty_selection_aborts_before_any_network_call() {
        let client = offline_client().await;
        let err = client.unfollow_selected(true).await.unwrap_err();
        assert!(err.to_string().contains("未选择"));
    }

    #[tokio::test]
    async fn active_list_round_trips_through_export_import() {
        let client = offline_client().await;
        client
            .import_payload(r#"{"name":"keep","items":["alice","bob"]}"#)
            .await
            .unwrap();

        let exported = client.export_active_list().unwrap();

        let other = offline_client().await;
        other
            .import_payload(std::str::from_utf8(&exported).unwrap())
            .await
            .unwrap();

        let active = other.active_list().unwrap();
        assert_eq!(active.name, "keep");
        assert_eq!(active.users, vec!["alice".to_string(), "bob".to_string()]);
        assert!(active.selection.is_empty());
    }

    #[tokio::test]
    async fn import_replaces_previous_active_list() {
        let client = offline_client().await;
        client
            .import_payload(r#"{"name":"first","items":["alice"]}"#)
            .await
            .unwrap();
        client.toggle_active_selection("alice").unwrap();

        client
            .import_payload(r#"{"name":"second","items":["bob"]}"#)
            .await
            .unwrap();

        let active = client.active_list().unwrap();
        assert_eq!(active.name, "second");
        // 新激活列表的选择集是全新的
        assert!(active.selection.is_empty());
    }

    #[tokio::test]
    async fn active_selection_rejects_unknown_login() {
        let client = offline_client().await;
        client
            .import_payload(r#"{"name":"l","items":["alice"]}"#)
            .await
            .unwrap();
        assert!(client.toggle_active_selection("mallory").is_err());
    }

    #[tokio::test]
    async fn in_flight_guard_suppresses_second_toggle() {
        let client = offline_client().await;
        client.dry_run.store(true, Ordering::SeqCst);
        client.dry_run_toggle_in_flight.store(true, Ordering::SeqCst);

        // 地址不可达：若发起网络调用必然报错，能拿到缓存值说明被守卫短路
        let enabled = client.toggle_dry_run().await.unwrap();
        assert!(enabled);
        assert!(client.dry_run_toggle_in_flight.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn failed_toggle_releases_guard_and_keeps_cache() {
        let client = offline_client().await;
        client.dry_run.store(true, Ordering::SeqCst);

        assert!(client.toggle_dry_run().await.is_err());
        // 失败后守卫释放、缓存不变
        assert!(!client.dry_run_toggle_in_flight.load(Ordering::SeqCst));
        assert!(client.dry_run());
    }

    #[tokio::test]
    async fn import_rejects_malformed_payload() {
        let client = offline_client().await;
        assert!(client.import_payload("{ nope").await.is_err());
        assert!(client.active_list().is_none());
    }

    #[tokio::test]
    async fn selection_survives_candidate_replacement() {
        let client = offline_client().await;
        client.toggle_selection("alice");

        // 模拟翻页后的候选替换：只更新候选，不动选择集
        *client.candidates.lock().unwrap() = vec![CandidateUser {
            login: "bob".to_string(),
            avatar_url: String::new(),
            html_url: String::new(),
        }];
        client.select_all_on_page();

        assert_eq!(
            client.selection(),
            vec!["alice".to_string(), "bob".to_string()]
        );
    }

    #[tokio::test]
    async fn export_csv_has_header_and_sorted_logins() {
        let client = offline_client().await;
        client.toggle_selection("bob");
        client.toggle_selection("alice");

        let bytes = client
            .export_selection(ExportFormat::Csv, None)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "login\nalice\nbob\n");
    }

    #[tokio::test]
    #[ignore]
    async fn run_against_local_server() {
        // 冒烟：需要本地启动 github-utils 服务端
        let config = ClientConfig::new("http://localhost:8080/api".to_string());
        let client = GithubUtilsClient::new(config).await.unwrap();
        client.connect().await.unwrap();
        println!("{}", client.status_line());
        for user in client.candidates().iter().take(5) {
            println!("  - {}", user.login);
        }
    }
}
