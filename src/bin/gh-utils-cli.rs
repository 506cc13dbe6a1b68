//! github-utils CLI 客户端
//!
//! 非交互式 CLI，驱动完整的批量管理工作流：
//! 预览未回关用户、批量关注/取关、撤销、干跑开关与导入导出

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use github_utils_sdk_rust::gh::client::{ClientConfig, ExportFormat, GithubUtilsClient, ImportOutcome};
use github_utils_sdk_rust::gh::follow::FollowListener;
use github_utils_sdk_rust::gh::history::HistoryAction;
use github_utils_sdk_rust::gh::imports::{ImportAction, ImportData};
use github_utils_sdk_rust::gh::serialization::{dedup_preserve_order, logins_from_csv};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// github-utils CLI 客户端
#[derive(Parser, Debug)]
#[command(name = "gh-utils-cli")]
#[command(about = "github-utils CLI 客户端 - 批量管理关注关系", long_about = None)]
struct Args {
    /// HTTP API 基础地址
    #[arg(long, default_value = "http://localhost:8080/api")]
    api_base_url: String,

    /// 本地镜像 SQLite 数据库 URL
    #[arg(long, default_value = "sqlite://gh_utils.db?mode=rwc")]
    db_url: String,

    /// 日志级别（默认: info,github_utils_sdk_rust=debug）
    #[arg(long, default_value = "info,github_utils_sdk_rust=debug")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 分页预览未回关用户
    Preview {
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 30)]
        size: i64,
    },
    /// 批量取消关注指定用户
    Unfollow {
        /// 目标用户名（与 --file 二选一或同时给出）
        users: Vec<String>,
        /// 从 CSV 文件读取用户名（`login` 表头 + 每行一个）
        #[arg(long)]
        file: Option<PathBuf>,
        /// 不跳过已处理用户
        #[arg(long)]
        include_processed: bool,
    },
    /// 批量关注指定用户
    Follow {
        users: Vec<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        include_processed: bool,
    },
    /// 撤销最近的取关操作（回放为关注）
    Undo {
        /// 时间窗口（分钟）
        #[arg(long, default_value_t = 60)]
        minutes: i64,
        /// 只撤销这些用户（为空时撤销窗口内全部）
        #[arg(long)]
        users: Vec<String>,
    },
    /// 查询或翻转干跑开关
    DryRun {
        /// 翻转开关（缺省只查询状态）
        #[arg(long)]
        toggle: bool,
    },
    /// 列出关注者
    Followers,
    /// 服务器推荐的候选用户
    Suggest {
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 30)]
        size: i64,
    },
    /// 查看保存列表（服务器端或本地镜像）
    Lists {
        /// 查服务器端列表（缺省查本地镜像）
        #[arg(long)]
        server: bool,
    },
    /// 对服务器端列表批量执行关注/取关
    ApplyList {
        /// 列表 id
        id: String,
        /// 操作类型（follow / unfollow）
        #[arg(long, default_value = "unfollow")]
        action: String,
        #[arg(long)]
        include_processed: bool,
    },
    /// 把名单文件上传给服务器批量处理
    ImportRemote {
        /// CSV 或 JSON 名单文件
        file: PathBuf,
        /// 目标操作（refollow / exclude）
        #[arg(long, default_value = "refollow")]
        action: String,
        #[arg(long)]
        include_processed: bool,
    },
    /// 请求服务器端撤销取关
    UndoRemote {
        /// ISO 8601 时间下界
        #[arg(long)]
        until: Option<String>,
        #[arg(long)]
        users: Vec<String>,
    },
    /// 查看操作历史
    History {
        /// 查服务器端历史（缺省查本地镜像）
        #[arg(long)]
        server: bool,
        /// 按操作类型过滤（follow / unfollow）
        #[arg(long)]
        action: Option<String>,
        /// 按用户名过滤（仅服务器端）
        #[arg(long)]
        username: Option<String>,
    },
    /// 导出指定用户集合（CSV 或 JSON）
    Export {
        users: Vec<String>,
        /// 导出格式：csv 或 json
        #[arg(long, default_value = "csv")]
        format: String,
        /// 同时保存为本地列表
        #[arg(long)]
        save_as: Option<String>,
        /// 输出文件（缺省打印到 stdout）
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// 导入列表载荷（单列表激活 / 多列表落盘）
    Import {
        /// JSON 载荷文件
        file: PathBuf,
    },
    /// 导出本地快照（`{lists, history}`）
    SnapshotExport {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// 导入本地快照（整体替换）
    SnapshotImport {
        file: PathBuf,
    },
}

/// 初始化日志（同时输出到 stdout 和文件）
fn init_logger(log_level: &str) {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // 创建日志文件（追加模式）
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("无法创建日志文件 debug.log");

    // 输出到 stdout（控制台），保留 ANSI 颜色代码用于终端显示
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    // 输出到文件，禁用 ANSI 颜色代码（文件不需要颜色）
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("[CLI] 📝 日志已同时输出到控制台和文件: debug.log");
}

/// 注册监听器（输出批量执行进度）
fn setup_listener(client: &mut GithubUtilsClient) {
    struct CliFollowListener;
    #[async_trait::async_trait]
    impl FollowListener for CliFollowListener {
        async fn on_item_processed(&self, username: String, action: String, ok: bool) {
            if ok {
                info!("[CLI/Batch] ✅ {} {}", action, username);
            } else {
                error!("[CLI/Batch] ❌ {} {} 失败", action, username);
            }
        }

        async fn on_batch_finished(&self, summary: String) {
            info!("[CLI/Batch] 📊 {}", summary);
        }

        async fn on_dry_run_changed(&self, enabled: bool) {
            info!("[CLI/Batch] 🛡️ 干跑状态变更: {}", enabled);
        }
    }
    client.set_follow_listener(Arc::new(CliFollowListener));
}

/// 合并命令行用户名与 CSV 文件内容（去重，保留首次出现顺序）
fn gather_logins(users: Vec<String>, file: Option<&PathBuf>) -> Result<Vec<String>> {
    let mut logins = users;
    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .context(format!("读取文件失败: {}", path.display()))?;
        logins.extend(logins_from_csv(&text));
    }
    Ok(dedup_preserve_order(&logins))
}

/// 写出导出内容：指定文件或 stdout
fn write_output(bytes: &[u8], output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, bytes).context(format!("写入文件失败: {}", path.display()))?;
            info!("[CLI] 💾 已写入: {}", path.display());
        }
        None => {
            println!("{}", String::from_utf8_lossy(bytes));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    init_logger(&args.log_level);

    info!("[CLI] 🚀 github-utils CLI 客户端");
    info!("[CLI] 🌐 API 地址: {}", args.api_base_url);

    let mut config = ClientConfig::new(args.api_base_url.clone());
    config.db_url = Some(args.db_url.clone());

    let mut client = GithubUtilsClient::new(config).await?;
    setup_listener(&mut client);

    match args.command {
        Command::Preview { page, size } => {
            client.load_preview(page, size).await?;
            info!("[CLI] {}", client.status_line());
            for user in client.candidates() {
                info!("[CLI]   - {}", user.login);
            }
        }
        Command::Unfollow {
            users,
            file,
            include_processed,
        } => {
            let logins = gather_logins(users, file.as_ref())?;
            for login in &logins {
                client.toggle_selection(login);
            }
            let report = client.unfollow_selected(!include_processed).await?;
            info!("[CLI] {}", report.summary());
        }
        Command::Follow {
            users,
            file,
            include_processed,
        } => {
            let logins = gather_logins(users, file.as_ref())?;
            for login in &logins {
                client.toggle_selection(login);
            }
            let report = client.follow_selected(!include_processed).await?;
            info!("[CLI] {}", report.summary());
        }
        Command::Undo { minutes, users } => {
            let subset = if users.is_empty() {
                None
            } else {
                Some(users.as_slice())
            };
            let report = client.undo_recent(Some(minutes), subset).await?;
            info!("[CLI] {}", report.summary());
        }
        Command::DryRun { toggle } => {
            let enabled = if toggle {
                client.toggle_dry_run().await?
            } else {
                client.refresh_dry_run().await
            };
            info!("[CLI] 🛡️ 干跑状态: {}", enabled);
        }
        Command::Followers => {
            let followers = client.follow_api().followers().await?;
            info!("[CLI] 👥 关注者（共 {} 个）:", followers.len());
            for user in followers {
                info!("[CLI]   - {}", user.login);
            }
        }
        Command::Suggest { page, size } => {
            let result = client.filter_api().smart_suggest(page, size).await?;
            info!(
                "[CLI] 🔍 候选 {} / 命中 {}：",
                result.total_candidates, result.total_matched
            );
            for user in result.users {
                info!(
                    "[CLI]   - {}（粉丝 {}，仓库 {}）",
                    user.login, user.followers_count, user.repos_count
                );
            }
        }
        Command::Lists { server } => {
            if server {
                let lists = client.lists_api().get_lists().await?;
                info!("[CLI] 📋 服务器列表（共 {} 个）:", lists.len());
                for list in lists {
                    info!("[CLI]   - {} {}（{} 个成员）", list.id, list.name, list.count);
                }
            } else {
                let lists = client.lists_dao().get_lists().await?;
                info!("[CLI] 📋 本地列表（共 {} 个）:", lists.len());
                for list in lists {
                    info!(
                        "[CLI]   - {} {}（{} 个成员）",
                        list.id,
                        list.name,
                        list.items.len()
                    );
                }
            }
        }
        Command::ApplyList {
            id,
            action,
            include_processed,
        } => {
            let action = action.parse::<HistoryAction>()?;
            let result = client
                .lists_api()
                .apply_list(&id, action, !include_processed)
                .await?;
            info!(
                "[CLI] 📊 执行 {} 个，跳过 {} 个，干跑: {}",
                result.applied, result.skipped, result.dry_run
            );
        }
        Command::ImportRemote {
            file,
            action,
            include_processed,
        } => {
            let action = match action.as_str() {
                "refollow" => ImportAction::Refollow,
                "exclude" => ImportAction::Exclude,
                other => anyhow::bail!("未知导入操作: {}", other),
            };
            let bytes = std::fs::read(&file)
                .context(format!("读取文件失败: {}", file.display()))?;
            let data = ImportData::File {
                file_name: file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "import.csv".to_string()),
                bytes,
            };
            let result = client
                .import_api()
                .import_users(action, data, !include_processed)
                .await?;
            info!(
                "[CLI] 📊 收到 {} 个，执行 {} 个，跳过 {} 个，干跑: {}",
                result.received, result.applied, result.skipped, result.dry_run
            );
        }
        Command::UndoRemote { until, users } => {
            let subset = if users.is_empty() {
                None
            } else {
                Some(users.as_slice())
            };
            let result = client.undo_api().undo(until.as_deref(), subset).await?;
            info!(
                "[CLI] 📊 已重新关注 {} 个，干跑: {}",
                result.refollowed, result.dry_run
            );
        }
        Command::History {
            server,
            action,
            username,
        } => {
            let action = match action {
                Some(raw) => Some(raw.parse::<HistoryAction>()?),
                None => None,
            };
            let entries = if server {
                client
                    .server_history(username.as_deref(), action, None)
                    .await?
            } else {
                let mut entries = client.local_history().await?;
                if let Some(action) = action {
                    entries.retain(|e| e.action == action);
                }
                entries
            };
            info!("[CLI] 📜 历史记录（共 {} 条）:", entries.len());
            for entry in entries {
                info!(
                    "[CLI]   {} {} @ {}{}",
                    entry.action,
                    entry.username,
                    entry.timestamp,
                    if entry.dry_run { "（干跑）" } else { "" }
                );
            }
        }
        Command::Export {
            users,
            format,
            save_as,
            output,
        } => {
            let format = match format.as_str() {
                "csv" => ExportFormat::Csv,
                "json" => ExportFormat::Json,
                other => anyhow::bail!("未知导出格式: {}", other),
            };
            for login in gather_logins(users, None)? {
                client.toggle_selection(&login);
            }
            let bytes = client.export_selection(format, save_as.as_deref()).await?;
            write_output(&bytes, output.as_ref())?;
        }
        Command::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .context(format!("读取文件失败: {}", file.display()))?;
            match client.import_payload(&json).await? {
                ImportOutcome::Activated { name, count } => {
                    info!("[CLI] 📥 已激活列表: {}（{} 个用户）", name, count);
                }
                ImportOutcome::Saved(count) => {
                    info!("[CLI] 📥 已导入 {} 个列表到本地镜像", count);
                }
            }
        }
        Command::SnapshotExport { output } => {
            let snapshot = client.export_local_snapshot().await?;
            write_output(snapshot.as_bytes(), output.as_ref())?;
        }
        Command::SnapshotImport { file } => {
            let json = std::fs::read_to_string(&file)
                .context(format!("读取文件失败: {}", file.display()))?;
            client.import_local_snapshot(&json).await?;
            info!("[CLI] 📥 本地快照已导入");
        }
    }

    Ok(())
}
