//! 树洞客户端核心实现模块
//!
//! 负责把配置、会话上下文、各 API、认证网关与服务层装配起来。

use crate::hole::anonymous::AnonymousPostDao;
use crate::hole::auth::{AuthApi, AuthGateway};
use crate::hole::comment::{
    api::CommentApi,
    listener::{CommentListener, EmptyCommentListener},
    service::CommentService,
};
use crate::hole::db;
use crate::hole::post::{
    api::PostApi,
    listener::{EmptyPostListener, PostListener},
    service::PostService,
};
use crate::hole::session::SessionContext;
use crate::hole::user::{
    api::UserProfileApi,
    listener::{EmptyUserListener, UserListener},
    service::UserService,
};
use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::info;

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// 后端 HTTP API 基础地址（认证与文档数据库共用）
    pub api_base_url: String,
    /// 本地 SQLite 数据库 URL（匿名帖子索引）
    ///
    /// 例如：`sqlite://treehole.db?mode=rwc`
    pub local_db_url: String,
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self {
            api_base_url: "http://localhost:10010".to_string(),
            local_db_url: "sqlite://treehole.db?mode=rwc".to_string(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// 树洞客户端
///
/// 用法：`new` 之后先注册监听器，再 `connect` 完成装配与首屏加载。
pub struct TreeholeClient {
    pub(crate) config: ClientConfig,
    session: Arc<SessionContext>,

    // 监听器（可由调用方在 connect 之前注册）
    post_listener: Arc<dyn PostListener>,
    comment_listener: Arc<dyn CommentListener>,
    user_listener: Arc<dyn UserListener>,

    // connect 之后可用
    auth: Option<Arc<AuthGateway>>,
    posts: Option<Arc<PostService>>,
    comments: Option<Arc<CommentService>>,
    users: Option<Arc<UserService>>,
    db: Option<Pool<Sqlite>>,
    refresh_task: Option<tokio::task::JoinHandle<()>>,
}

impl TreeholeClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            session: Arc::new(SessionContext::new()),
            post_listener: Arc::new(EmptyPostListener),
            comment_listener: Arc::new(EmptyCommentListener),
            user_listener: Arc::new(EmptyUserListener),
            auth: None,
            posts: None,
            comments: None,
            users: None,
            db: None,
            refresh_task: None,
        }
    }

    /// 注册帖子监听器（connect 之前调用）
    pub fn set_post_listener(&mut self, listener: Arc<dyn PostListener>) {
        self.post_listener = listener;
    }

    /// 注册评论监听器（connect 之前调用）
    pub fn set_comment_listener(&mut self, listener: Arc<dyn CommentListener>) {
        self.comment_listener = listener;
    }

    /// 注册用户监听器（connect 之前调用）
    pub fn set_user_listener(&mut self, listener: Arc<dyn UserListener>) {
        self.user_listener = listener;
    }

    /// 装配客户端：建本地库、建 API 与服务、确保匿名身份、
    /// 完成首屏加载并启动自动刷新任务
    pub async fn connect(&mut self) -> Result<()> {
        info!("[Client] 🚀 正在初始化树洞客户端...");
        info!("[Client]   API 地址: {}", self.config.api_base_url);
        info!("[Client]   本地数据库: {}", self.config.local_db_url);

        let pool = db::create_sqlite_pool_with_migration(&self.config.local_db_url)
            .await
            .context(format!("连接SQLite数据库失败: {}", self.config.local_db_url))?;
        let anonymous = Arc::new(AnonymousPostDao::new(pool.clone()));

        let http_client = reqwest::Client::new();
        let post_api = Arc::new(PostApi::new(
            http_client.clone(),
            self.config.api_base_url.clone(),
            self.session.clone(),
        ));
        let comment_api = Arc::new(CommentApi::new(
            http_client.clone(),
            self.config.api_base_url.clone(),
            self.session.clone(),
        ));
        let profile_api = Arc::new(UserProfileApi::new(
            http_client.clone(),
            self.config.api_base_url.clone(),
            self.session.clone(),
        ));
        let auth_api = AuthApi::new(http_client, self.config.api_base_url.clone());
        let gateway = Arc::new(AuthGateway::new(
            auth_api,
            (*profile_api).clone(),
            self.session.clone(),
        ));

        // 确保进程有一个身份：没有任何身份时自动匿名登录
        gateway.ensure_anonymous_identity().await;

        let posts = Arc::new(PostService::with_listener(
            post_api.clone(),
            self.session.clone(),
            anonymous,
            self.post_listener.clone(),
        ));
        let comments = Arc::new(CommentService::with_listener(
            comment_api,
            post_api,
            self.session.clone(),
            self.comment_listener.clone(),
        ));
        let users = Arc::new(UserService::with_listener(
            gateway.clone(),
            profile_api,
            self.session.clone(),
            self.user_listener.clone(),
        ));

        users.refresh_login_state().await;
        if let Some(user_id) = self.session.current_user_id().await {
            users.load_user_profile(&user_id).await;
        }

        posts.load_posts_with_retry().await;
        posts.load_anonymous_posts().await;
        let refresh_task = posts.spawn_auto_refresh();

        self.auth = Some(gateway);
        self.posts = Some(posts);
        self.comments = Some(comments);
        self.users = Some(users);
        self.db = Some(pool);
        self.refresh_task = Some(refresh_task);

        info!("[Client] ✅ 树洞客户端初始化完成");
        Ok(())
    }

    /// 停止自动刷新并关闭本地数据库
    pub async fn disconnect(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
        if let Some(pool) = self.db.take() {
            pool.close().await;
        }
        self.auth = None;
        self.posts = None;
        self.comments = None;
        self.users = None;
        info!("[Client] 客户端已断开");
    }

    pub fn session(&self) -> Arc<SessionContext> {
        self.session.clone()
    }

    pub fn auth(&self) -> Result<Arc<AuthGateway>> {
        self.auth.clone().context("客户端尚未连接")
    }

    pub fn post_service(&self) -> Result<Arc<PostService>> {
        self.posts.clone().context("客户端尚未连接")
    }

    pub fn comment_service(&self) -> Result<Arc<CommentService>> {
        self.comments.clone().context("客户端尚未连接")
    }

    pub fn user_service(&self) -> Result<Arc<UserService>> {
        self.users.clone().context("客户端尚未连接")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;
    use tracing::error;

    static INIT_LOGGER: Once = Once::new();

    fn init_test_logger() {
        INIT_LOGGER.call_once(|| {
            use tracing_subscriber::prelude::*;
            use tracing_subscriber::EnvFilter;

            // 测试中默认打开当前 crate 和 sqlx 的 debug，关闭底层 HTTP 客户端的 debug 噪音
            let filter_layer = EnvFilter::new(
                "info,treehole_sdk_core=debug,sqlx=debug,hyper_util::client=info,reqwest=info",
            );

            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .with_test_writer();

            tracing_subscriber::registry()
                .with(filter_layer)
                .with(fmt_layer)
                .init();
        });
    }

    fn test_config() -> ClientConfig {
        ClientConfig {
            api_base_url: "http://localhost:10010".to_string(),
            local_db_url: "sqlite://test_treehole.db?mode=rwc".to_string(),
        }
    }

    /// 需要本地后端，手动运行：
    /// `cargo test run_register_login_roundtrip -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn run_register_login_roundtrip() -> Result<()> {
        init_test_logger();

        let mut client = TreeholeClient::new(test_config());
        client.connect().await?;
        let users = client.user_service()?;

        let email = format!("{}@example.com", uuid::Uuid::new_v4());
        let registered = users
            .register_with_email(&email, "123456", "123456", "小树")
            .await?;
        users.logout().await;
        let logged_in = users.login_with_email(&email, "123456").await?;

        // 注册和登录得到同一个身份 ID
        assert_eq!(registered, logged_in);
        assert!(*users.is_logged_in().borrow());
        Ok(())
    }

    /// 需要本地后端，手动运行：
    /// `cargo test run_anonymous_post_flow -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn run_anonymous_post_flow() -> Result<()> {
        init_test_logger();

        let mut client = TreeholeClient::new(test_config());
        client.connect().await?;
        let posts = client.post_service()?;

        // 未登录（匿名身份）发帖：作者 ID 是空串哨兵
        let post_id = posts.create_post("写下一个秘密", "匿名用户").await?;

        posts.load_anonymous_posts().await;
        let mine = posts.anonymous_posts().borrow().clone();
        assert!(mine.iter().any(|p| p.id == post_id));
        // 写入的文档自带自己的 ID
        let stored = mine.iter().find(|p| p.id == post_id).unwrap();
        assert_eq!(stored.author_id, "");

        // 删除后本地匿名索引同步清理
        posts.delete_post(&post_id).await?;
        posts.load_anonymous_posts().await;
        assert!(!posts
            .anonymous_posts()
            .borrow()
            .iter()
            .any(|p| p.id == post_id));
        Ok(())
    }

    /// 需要本地后端，手动运行：
    /// `cargo test run_profile_default_synthesis -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn run_profile_default_synthesis() -> Result<()> {
        init_test_logger();

        let mut client = TreeholeClient::new(test_config());
        client.connect().await?;

        let profiles = UserProfileApi::new(
            reqwest::Client::new(),
            client.config.api_base_url.clone(),
            client.session(),
        );

        // 从未创建过资料的用户：get 合成默认资料，且不落库
        let user_id = format!("ghost-{}", uuid::Uuid::new_v4());
        let first = profiles.get(&user_id).await?;
        let second = profiles.get(&user_id).await?;
        assert_eq!(first.username, second.username);
        assert!(profiles.fetch(&user_id).await?.is_none());

        // 显式创建后才真正存在，删除后恢复"未存储"
        profiles.create(&first).await?;
        assert!(profiles.fetch(&user_id).await?.is_some());
        profiles.delete(&user_id).await?;
        assert!(profiles.fetch(&user_id).await?.is_none());
        Ok(())
    }

    /// 需要本地后端，手动运行：
    /// `cargo test run_comment_counter_flow -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn run_comment_counter_flow() -> Result<()> {
        init_test_logger();

        let mut client = TreeholeClient::new(test_config());
        if let Err(e) = client.connect().await {
            error!("连接失败: {:?}", e);
            return Err(e);
        }
        let posts = client.post_service()?;
        let comments = client.comment_service()?;

        let post_id = posts.create_post("评论计数测试", "匿名用户").await?;

        comments.load_comments(&post_id).await;
        let first = comments.add_comment(&post_id, "第一条评论", "").await?;
        let _second = comments.add_comment(&post_id, "第二条评论", "").await?;

        // 删除一条评论后，计数缓存恰好减一
        comments.delete_comment(&first, &post_id).await?;
        let post_api = PostApi::new(
            reqwest::Client::new(),
            client.config.api_base_url.clone(),
            client.session(),
        );
        let stored = post_api.get(&post_id).await?.unwrap();
        assert_eq!(stored.comments, 1);
        Ok(())
    }
}
