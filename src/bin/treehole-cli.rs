//! 树洞 CLI 客户端（测试版）
//!
//! 非交互式 CLI，用于测试和展示树洞功能：
//! 启动后可选登录，拉取并打印帖子列表，可选发布一条帖子，
//! 然后持续运行并展示监听器回调。

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::info;
use treehole_sdk_core::hole::comment::listener::CommentListener;
use treehole_sdk_core::hole::post::listener::PostListener;
use treehole_sdk_core::hole::user::listener::UserListener;
use treehole_sdk_core::{ClientConfig, TreeholeClient};

/// 树洞 CLI 客户端
#[derive(Parser, Debug)]
#[command(name = "treehole-cli")]
#[command(about = "树洞 CLI 客户端 - 用于测试和展示匿名树洞功能", long_about = None)]
struct Args {
    /// 后端 API 基础地址
    #[arg(long, default_value = "http://localhost:10010")]
    api_base_url: String,

    /// 本地 SQLite 数据库 URL
    #[arg(long, default_value = "sqlite://treehole.db?mode=rwc")]
    local_db_url: String,

    /// 登录邮箱（不传则以匿名身份运行）
    #[arg(short, long)]
    email: Option<String>,

    /// 登录密码
    #[arg(short, long)]
    password: Option<String>,

    /// 启动后发布一条帖子
    #[arg(long)]
    post: Option<String>,

    /// 搜索关键词（打印搜索结果后继续运行）
    #[arg(long)]
    search: Option<String>,

    /// 运行时长（秒），0 表示持续运行
    #[arg(short, long, default_value = "0")]
    duration: u64,

    /// 日志级别
    #[arg(long, default_value = "info,treehole_sdk_core=debug")]
    log_level: String,
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

/// 设置监听器（输出所有收到的回调）
fn setup_listeners(client: &mut TreeholeClient) {
    struct CliPostListener;
    #[async_trait::async_trait]
    impl PostListener for CliPostListener {
        async fn on_posts_changed(&self, posts_json: String) {
            info!("[CLI/帖子] 🔄 帖子列表变更: {} 字节", posts_json.len());
        }

        async fn on_post_created(&self, post_id: String) {
            info!("[CLI/帖子] 🆕 帖子已创建: {}", post_id);
        }

        async fn on_post_deleted(&self, post_id: String) {
            info!("[CLI/帖子] 🗑️ 帖子已删除: {}", post_id);
        }
    }

    struct CliCommentListener;
    #[async_trait::async_trait]
    impl CommentListener for CliCommentListener {
        async fn on_comments_changed(&self, comments_json: String) {
            info!("[CLI/评论] 🔄 评论列表变更: {} 字节", comments_json.len());
        }

        async fn on_comment_added(&self, comment_id: String) {
            info!("[CLI/评论] 🆕 评论已添加: {}", comment_id);
        }

        async fn on_comment_deleted(&self, comment_id: String) {
            info!("[CLI/评论] 🗑️ 评论已删除: {}", comment_id);
        }
    }

    struct CliUserListener;
    #[async_trait::async_trait]
    impl UserListener for CliUserListener {
        async fn on_login_state_changed(&self, is_logged_in: bool) {
            info!("[CLI/用户] 🔐 登录状态变更: {}", is_logged_in);
        }

        async fn on_profile_changed(&self, profile_json: String) {
            info!("[CLI/用户] 👤 用户资料变更: {}", profile_json);
        }
    }

    client.set_post_listener(Arc::new(CliPostListener));
    client.set_comment_listener(Arc::new(CliCommentListener));
    client.set_user_listener(Arc::new(CliUserListener));
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level);

    info!("[CLI] 🚀 树洞 CLI 客户端（测试模式）");
    info!("[CLI] 🌐 API 地址: {}", args.api_base_url);
    info!("[CLI] ⏱️  运行时长: {} 秒（0=持续运行）", args.duration);

    let config = ClientConfig {
        api_base_url: args.api_base_url.clone(),
        local_db_url: args.local_db_url.clone(),
    };
    let mut client = TreeholeClient::new(config);
    setup_listeners(&mut client);

    client
        .connect()
        .await
        .map_err(|e| anyhow::anyhow!("初始化失败: {}", e))?;

    let posts = client.post_service()?;
    let users = client.user_service()?;

    // 可选登录
    if let (Some(email), Some(password)) = (&args.email, &args.password) {
        info!("[CLI] 🔐 正在登录: {}", email);
        let user_id = users
            .login_with_email(email, password)
            .await
            .map_err(|e| anyhow::anyhow!("登录失败: {}", e))?;
        info!("[CLI] ✅ 登录成功！用户ID: {}", user_id);
    } else {
        info!("[CLI] 💡 未提供邮箱/密码，以匿名身份运行");
    }

    // 可选发帖
    if let Some(content) = &args.post {
        let author_name = users
            .user_profile()
            .borrow()
            .as_ref()
            .map(|u| u.username.clone())
            .unwrap_or_default();
        let post_id = posts
            .create_post(content, &author_name)
            .await
            .map_err(|e| anyhow::anyhow!("发帖失败: {}", e))?;
        info!("[CLI] ✅ 帖子发布成功: {}", post_id);
    }

    // 可选搜索
    if let Some(query) = &args.search {
        posts.search_posts(query).await;
    }

    // 显示当前可见帖子
    {
        let feed = posts.posts().borrow().clone();
        info!("[CLI] 📋 帖子列表（共 {} 条）:", feed.len());
        for post in feed.iter().take(5) {
            info!(
                "[CLI]   - {} | {} | 评论: {} | {}",
                post.id,
                post.author_name,
                post.comments,
                post.content.chars().take(30).collect::<String>()
            );
        }

        let mine = posts.anonymous_posts().borrow().clone();
        info!("[CLI] 🕵️ 本设备匿名帖子（共 {} 条）", mine.len());
    }

    info!("[CLI] 📥 开始监听回调...");
    if args.duration > 0 {
        info!("[CLI] ⏰ {} 秒后自动退出", args.duration);
        sleep(Duration::from_secs(args.duration)).await;
        client.disconnect().await;
        info!("[CLI] 👋 程序退出");
    } else {
        info!("[CLI] ⏰ 持续运行中，按 Ctrl+C 退出");
        // 持续运行直到被中断
        loop {
            sleep(Duration::from_secs(3600)).await;
        }
    }

    Ok(())
}
