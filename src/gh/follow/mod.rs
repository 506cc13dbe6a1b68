//! 关注关系模块
//!
//! 未回关预览、关注/取关操作与批量对账

pub mod api;
pub mod listener;
pub mod models;
pub mod service;
pub mod types;

// 重新导出主要类型和函数
pub use api::FollowApi;
pub use listener::{EmptyFollowListener, FollowListener};
pub use models::CandidateUser;
pub use service::{
    BatchReconciler, BatchReport, FollowExecutor, HistorySource, DEFAULT_UNDO_WINDOW_MINUTES,
};
pub use types::PreviewResp;
