//! 帖子会话服务层
//!
//! 持有可观察的帖子列表状态（watch 通道，后到的订阅者能立即读到
//! 最近一次的值），并编排帖子 API、本地匿名索引与监听器回调。

use crate::hole::anonymous::AnonymousPostDao;
use crate::hole::error::ValidationError;
use crate::hole::post::api::{PostApi, DEFAULT_FEED_LIMIT};
use crate::hole::post::listener::{EmptyPostListener, PostListener};
use crate::hole::post::models::{Post, DEFAULT_AUTHOR_NAME};
use crate::hole::session::SessionContext;
use crate::hole::types::now_millis;
use anyhow::Result;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, error, info};

/// 自动刷新周期
const AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
/// 首屏列表为空时的重试次数
const EMPTY_FEED_RETRIES: u32 = 3;
/// 空列表重试间隔
const EMPTY_FEED_RETRY_DELAY: Duration = Duration::from_secs(1);

/// 帖子会话服务
pub struct PostService {
    api: Arc<PostApi>,
    session: Arc<SessionContext>,
    anonymous: Arc<AnonymousPostDao>,
    listener: Arc<dyn PostListener>,

    posts_tx: watch::Sender<Vec<Post>>,
    user_posts_tx: watch::Sender<Vec<Post>>,
    anonymous_posts_tx: watch::Sender<Vec<Post>>,
    search_query_tx: watch::Sender<String>,
    is_loading_tx: watch::Sender<bool>,

    /// 最近一次列表刷新时间（毫秒），自动刷新据此跳过刚刷新过的窗口
    last_refresh_ms: AtomicI64,
}

impl PostService {
    pub fn new(
        api: Arc<PostApi>,
        session: Arc<SessionContext>,
        anonymous: Arc<AnonymousPostDao>,
    ) -> Self {
        Self::with_listener(api, session, anonymous, Arc::new(EmptyPostListener))
    }

    pub fn with_listener(
        api: Arc<PostApi>,
        session: Arc<SessionContext>,
        anonymous: Arc<AnonymousPostDao>,
        listener: Arc<dyn PostListener>,
    ) -> Self {
        let (posts_tx, _) = watch::channel(Vec::new());
        let (user_posts_tx, _) = watch::channel(Vec::new());
        let (anonymous_posts_tx, _) = watch::channel(Vec::new());
        let (search_query_tx, _) = watch::channel(String::new());
        let (is_loading_tx, _) = watch::channel(false);
        Self {
            api,
            session,
            anonymous,
            listener,
            posts_tx,
            user_posts_tx,
            anonymous_posts_tx,
            search_query_tx,
            is_loading_tx,
            last_refresh_ms: AtomicI64::new(0),
        }
    }

    /// 当前可见帖子列表（首页或搜索结果）
    pub fn posts(&self) -> watch::Receiver<Vec<Post>> {
        self.posts_tx.subscribe()
    }

    /// 当前登录用户的帖子列表
    pub fn user_posts(&self) -> watch::Receiver<Vec<Post>> {
        self.user_posts_tx.subscribe()
    }

    /// 本设备匿名发布的帖子列表
    pub fn anonymous_posts(&self) -> watch::Receiver<Vec<Post>> {
        self.anonymous_posts_tx.subscribe()
    }

    /// 当前搜索关键词
    pub fn search_query(&self) -> watch::Receiver<String> {
        self.search_query_tx.subscribe()
    }

    /// 加载中标志
    pub fn is_loading(&self) -> watch::Receiver<bool> {
        self.is_loading_tx.subscribe()
    }

    /// 加载帖子列表（整表替换）。
    /// 读取失败降级为空列表并记录日志，不向上传播。
    pub async fn load_posts(&self) {
        self.is_loading_tx.send_replace(true);
        let posts = match self.api.list(Some(DEFAULT_FEED_LIMIT)).await {
            Ok(posts) => posts,
            Err(e) => {
                error!("[PostService] 加载帖子失败: {:?}", e);
                Vec::new()
            }
        };
        info!("[PostService] 获取到 {} 条帖子", posts.len());
        self.publish_posts(posts);
        self.last_refresh_ms.store(now_millis(), Ordering::Relaxed);
        self.is_loading_tx.send_replace(false);
    }

    /// 加载帖子列表，列表为空时最多重试 3 次（间隔 1 秒）
    pub async fn load_posts_with_retry(&self) {
        self.load_posts().await;
        for attempt in 1..=EMPTY_FEED_RETRIES {
            if !self.posts_tx.borrow().is_empty() {
                break;
            }
            debug!("[PostService] 帖子列表为空，第 {} 次重试", attempt);
            sleep(EMPTY_FEED_RETRY_DELAY).await;
            self.load_posts().await;
        }
    }

    /// 搜索帖子并替换可见列表
    pub async fn search_posts(&self, query: &str) {
        self.is_loading_tx.send_replace(true);
        self.search_query_tx.send_replace(query.to_string());
        let posts = match self.api.search(query).await {
            Ok(posts) => posts,
            Err(e) => {
                error!("[PostService] 搜索帖子失败: {:?}", e);
                Vec::new()
            }
        };
        self.publish_posts(posts);
        self.is_loading_tx.send_replace(false);
    }

    /// 加载某个用户的帖子；`user_id` 为 None 时取当前会话用户
    pub async fn load_user_posts(&self, user_id: Option<&str>) {
        let user_id = match user_id {
            Some(id) => id.to_string(),
            None => self.session.current_user_id().await.unwrap_or_default(),
        };
        if user_id.is_empty() {
            error!("[PostService] 无法获取用户帖子: 用户ID为空");
            return;
        }

        self.is_loading_tx.send_replace(true);
        match self.api.list_by_author(&user_id).await {
            Ok(posts) => {
                self.user_posts_tx.send_replace(posts);
            }
            Err(e) => {
                error!("[PostService] 获取用户帖子失败: {:?}", e);
                self.user_posts_tx.send_replace(Vec::new());
            }
        }
        self.is_loading_tx.send_replace(false);
    }

    /// 加载本设备匿名发布的帖子：取本地索引里的 ID 集合，
    /// 再从全量帖子中筛选出命中的那些
    pub async fn load_anonymous_posts(&self) {
        self.is_loading_tx.send_replace(true);

        let ids = match self.anonymous.list().await {
            Ok(ids) => ids,
            Err(e) => {
                error!("[PostService] 读取本地匿名索引失败: {:?}", e);
                self.is_loading_tx.send_replace(false);
                return;
            }
        };
        debug!("[PostService] 获取到 {} 个匿名帖子ID", ids.len());

        if ids.is_empty() {
            self.anonymous_posts_tx.send_replace(Vec::new());
            self.is_loading_tx.send_replace(false);
            return;
        }

        match self.api.list(None).await {
            Ok(all_posts) => {
                let mine: Vec<Post> = all_posts
                    .into_iter()
                    .filter(|p| ids.contains(&p.id))
                    .collect();
                debug!("[PostService] 筛选出 {} 条匿名帖子", mine.len());
                self.anonymous_posts_tx.send_replace(mine);
            }
            Err(e) => {
                error!("[PostService] 加载匿名帖子失败: {:?}", e);
                self.anonymous_posts_tx.send_replace(Vec::new());
            }
        }
        self.is_loading_tx.send_replace(false);
    }

    /// 发布帖子。作者 ID 取自当前会话：已登录用用户 ID，
    /// 匿名（或无身份）用空串哨兵，并把新帖子 ID 记入本地匿名索引。
    pub async fn create_post(&self, content: &str, author_name: &str) -> Result<String> {
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }

        let author_id = self.session.authoring_id().await;
        let author_name = if author_name.trim().is_empty() {
            DEFAULT_AUTHOR_NAME.to_string()
        } else {
            author_name.to_string()
        };

        let post = Post {
            content: content.to_string(),
            author_id: author_id.clone(),
            author_name,
            ..Default::default()
        };

        let post_id = self.api.create(&post).await?;
        info!("[PostService] ✅ 帖子创建成功: {}", post_id);

        if author_id.is_empty() {
            if let Err(e) = self.anonymous.remember(&post_id).await {
                error!("[PostService] 记录匿名帖子ID失败: {:?}", e);
            }
        }

        self.listener.on_post_created(post_id.clone()).await;
        self.load_posts().await;
        Ok(post_id)
    }

    /// 删除帖子。成功后从各观察列表中移除该帖子，
    /// 并把它从本地匿名索引中清掉（若在索引里）。
    pub async fn delete_post(&self, post_id: &str) -> Result<()> {
        self.api.delete(post_id).await?;
        info!("[PostService] ✅ 帖子删除成功: {}", post_id);

        let remaining: Vec<Post> = self
            .posts_tx
            .borrow()
            .iter()
            .filter(|p| p.id != post_id)
            .cloned()
            .collect();
        self.publish_posts(remaining);

        let remaining_user: Vec<Post> = self
            .user_posts_tx
            .borrow()
            .iter()
            .filter(|p| p.id != post_id)
            .cloned()
            .collect();
        self.user_posts_tx.send_replace(remaining_user);

        let remaining_anonymous: Vec<Post> = self
            .anonymous_posts_tx
            .borrow()
            .iter()
            .filter(|p| p.id != post_id)
            .cloned()
            .collect();
        self.anonymous_posts_tx.send_replace(remaining_anonymous);

        if let Err(e) = self.anonymous.forget(post_id).await {
            error!("[PostService] 清理匿名索引失败: {:?}", e);
        }

        self.listener.on_post_deleted(post_id.to_string()).await;
        Ok(())
    }

    /// 更新帖子（部分字段），成功后重新加载受影响的列表
    pub async fn update_post(&self, post_id: &str, updates: serde_json::Value) -> Result<()> {
        self.api.update(post_id, updates).await?;
        info!("[PostService] ✅ 帖子更新成功: {}", post_id);

        self.load_posts().await;
        if let Some(user_id) = self.session.current_user_id().await {
            self.load_user_posts(Some(&user_id)).await;
        }
        Ok(())
    }

    /// 启动周期性自动刷新任务：每 30 秒重新拉取一次帖子列表，
    /// 若窗口内刚有过手动刷新则跳过本轮
    pub fn spawn_auto_refresh(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(AUTO_REFRESH_INTERVAL);
            // interval 的第一次 tick 立即完成，跳过它
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let last = service.last_refresh_ms.load(Ordering::Relaxed);
                if now_millis() - last >= AUTO_REFRESH_INTERVAL.as_millis() as i64 {
                    debug!("[PostService] 🔄 自动刷新帖子列表");
                    service.load_posts().await;
                }
            }
        })
    }

    fn publish_posts(&self, posts: Vec<Post>) {
        let json = serde_json::to_string(&posts).unwrap_or_default();
        self.posts_tx.send_replace(posts);
        let listener = self.listener.clone();
        tokio::spawn(async move {
            listener.on_posts_changed(json).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn service_with_unreachable_backend() -> PostService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();

        let session = Arc::new(SessionContext::new());
        let api = Arc::new(PostApi::new(
            reqwest::Client::new(),
            // 无效地址：校验必须在任何网络请求之前完成
            "http://127.0.0.1:0".to_string(),
            session.clone(),
        ));
        PostService::new(api, session, Arc::new(AnonymousPostDao::new(pool)))
    }

    #[tokio::test]
    async fn empty_content_is_rejected_before_any_request() {
        let service = service_with_unreachable_backend().await;

        let err = service.create_post("", "匿名用户").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::EmptyContent)
        );

        let err = service.create_post("   ", "匿名用户").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::EmptyContent)
        );
    }

    #[tokio::test]
    async fn observable_fields_start_empty() {
        let service = service_with_unreachable_backend().await;
        assert!(service.posts().borrow().is_empty());
        assert!(service.user_posts().borrow().is_empty());
        assert!(service.anonymous_posts().borrow().is_empty());
        assert_eq!(service.search_query().borrow().as_str(), "");
        assert!(!*service.is_loading().borrow());
    }
}
