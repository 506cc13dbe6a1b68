//! 批量操作监听器回调接口

use async_trait::async_trait;

/// 批量操作监听器回调接口（由调用方注册，用于驱动 UI 展示）
#[async_trait]
pub trait FollowListener: Send + Sync {
    /// 单个用户处理完成（成功或失败）
    async fn on_item_processed(&self, username: String, action: String, ok: bool);

    /// 一批操作结束，参数为人类可读的结果摘要
    async fn on_batch_finished(&self, summary: String);

    /// 干跑开关状态变更
    async fn on_dry_run_changed(&self, enabled: bool);
}

/// 默认空实现（无操作）
pub struct EmptyFollowListener;

#[async_trait]
impl FollowListener for EmptyFollowListener {
    async fn on_item_processed(&self, _username: String, _action: String, _ok: bool) {
        // 默认不做任何处理
    }

    async fn on_batch_finished(&self, _summary: String) {
        // 默认不做任何处理
    }

    async fn on_dry_run_changed(&self, _enabled: bool) {
        // 默认不做任何处理
    }
}
