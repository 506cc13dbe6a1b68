pub mod gh;

// 重新导出常用类型和函数，方便外部使用
pub use gh::{
    client::{ActiveList, ClientConfig, ExportFormat, GithubUtilsClient, ImportOutcome, LoadState},
    follow::{BatchReconciler, BatchReport, CandidateUser, EmptyFollowListener, FollowListener},
    history::{HistoryAction, HistoryEntry},
    lists::SavedList,
};
