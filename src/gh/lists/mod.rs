//! 保存列表模块
//!
//! 服务器端列表 CRUD / 批量执行 / 导出，以及本地镜像兜底

pub mod api;
pub mod dao;
pub mod models;
pub mod types;

// 重新导出主要类型
pub use api::ListsApi;
pub use dao::ListsDao;
pub use models::SavedList;
pub use types::{ApplyDetail, ApplyResult, ListDetails, ListSummary};
