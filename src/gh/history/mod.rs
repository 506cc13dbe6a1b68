//! 操作历史模块
//!
//! 服务器端历史查询与本地镜像兜底

pub mod api;
pub mod dao;
pub mod models;

// 重新导出主要类型
pub use api::HistoryApi;
pub use dao::HistoryDao;
pub use models::{HistoryAction, HistoryDraft, HistoryEntry};
