//! 评论会话服务层
//!
//! 持有当前帖子的评论列表状态，并在增删评论后回写帖子的评论数缓存。
//! 评论数是"本地列表长度"推算出来的近似值：没有原子自增可用，
//! 多端并发写入时可能偏差，仅作展示用途。

use crate::hole::comment::api::CommentApi;
use crate::hole::comment::listener::{CommentListener, EmptyCommentListener};
use crate::hole::comment::models::Comment;
use crate::hole::error::ValidationError;
use crate::hole::post::api::PostApi;
use crate::hole::post::models::DEFAULT_AUTHOR_NAME;
use crate::hole::session::SessionContext;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// 评论会话服务
pub struct CommentService {
    api: Arc<CommentApi>,
    posts: Arc<PostApi>,
    session: Arc<SessionContext>,
    listener: Arc<dyn CommentListener>,

    comments_tx: watch::Sender<Vec<Comment>>,
    is_loading_tx: watch::Sender<bool>,
}

impl CommentService {
    pub fn new(api: Arc<CommentApi>, posts: Arc<PostApi>, session: Arc<SessionContext>) -> Self {
        Self::with_listener(api, posts, session, Arc::new(EmptyCommentListener))
    }

    pub fn with_listener(
        api: Arc<CommentApi>,
        posts: Arc<PostApi>,
        session: Arc<SessionContext>,
        listener: Arc<dyn CommentListener>,
    ) -> Self {
        let (comments_tx, _) = watch::channel(Vec::new());
        let (is_loading_tx, _) = watch::channel(false);
        Self {
            api,
            posts,
            session,
            listener,
            comments_tx,
            is_loading_tx,
        }
    }

    /// 当前帖子的评论列表
    pub fn comments(&self) -> watch::Receiver<Vec<Comment>> {
        self.comments_tx.subscribe()
    }

    /// 加载中标志
    pub fn is_loading(&self) -> watch::Receiver<bool> {
        self.is_loading_tx.subscribe()
    }

    /// 加载帖子的评论列表（整表替换）。
    /// 读取失败降级为空列表并记录日志，不向上传播。
    pub async fn load_comments(&self, post_id: &str) {
        self.is_loading_tx.send_replace(true);
        let comments = match self.api.list_for_post(post_id).await {
            Ok(comments) => comments,
            Err(e) => {
                error!("[CommentService] 加载评论失败: {:?}", e);
                Vec::new()
            }
        };
        info!("[CommentService] 成功加载 {} 条评论", comments.len());
        self.publish_comments(comments);
        self.is_loading_tx.send_replace(false);
    }

    /// 添加评论。空内容在任何网络请求之前被拒绝。
    /// 成功后把帖子的评论数缓存回写为"本地列表长度 + 1"，再重新加载列表。
    pub async fn add_comment(
        &self,
        post_id: &str,
        content: &str,
        author_name: &str,
    ) -> Result<String> {
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }

        let author_id = self.session.current_user_id().await.unwrap_or_default();
        let author_name = if author_name.trim().is_empty() {
            DEFAULT_AUTHOR_NAME.to_string()
        } else {
            author_name.to_string()
        };

        let comment = Comment {
            post_id: post_id.to_string(),
            content: content.to_string(),
            author_id,
            author_name,
            ..Default::default()
        };

        let comment_id = self.api.add(&comment).await?;
        info!("[CommentService] ✅ 评论添加成功: {}", comment_id);

        // 回写帖子的评论数缓存（非原子，尽力而为）
        let next_count = self.comments_tx.borrow().len() + 1;
        if let Err(e) = self
            .posts
            .update(post_id, serde_json::json!({"comments": next_count}))
            .await
        {
            error!("[CommentService] 更新帖子评论计数失败: {:?}", e);
        }

        self.listener.on_comment_added(comment_id.clone()).await;
        self.load_comments(post_id).await;
        Ok(comment_id)
    }

    /// 删除评论。成功后从本地列表移除，
    /// 并把帖子的评论数缓存回写为移除后的列表长度（恰好减一）。
    pub async fn delete_comment(&self, comment_id: &str, post_id: &str) -> Result<()> {
        self.api.delete(comment_id).await?;
        info!("[CommentService] ✅ 评论删除成功: {}", comment_id);

        let remaining: Vec<Comment> = self
            .comments_tx
            .borrow()
            .iter()
            .filter(|c| c.id != comment_id)
            .cloned()
            .collect();
        let count = remaining.len();
        self.publish_comments(remaining);

        if let Err(e) = self
            .posts
            .update(post_id, serde_json::json!({"comments": count}))
            .await
        {
            error!("[CommentService] 更新帖子评论计数失败: {:?}", e);
        }

        self.listener.on_comment_deleted(comment_id.to_string()).await;
        Ok(())
    }

    fn publish_comments(&self, comments: Vec<Comment>) {
        let json = serde_json::to_string(&comments).unwrap_or_default();
        self.comments_tx.send_replace(comments);
        let listener = self.listener.clone();
        tokio::spawn(async move {
            listener.on_comments_changed(json).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with_unreachable_backend() -> CommentService {
        let session = Arc::new(SessionContext::new());
        let client = reqwest::Client::new();
        // 无效地址：校验必须在任何网络请求之前完成
        let base = "http://127.0.0.1:0".to_string();
        let api = Arc::new(CommentApi::new(client.clone(), base.clone(), session.clone()));
        let posts = Arc::new(PostApi::new(client, base, session.clone()));
        CommentService::new(api, posts, session)
    }

    #[tokio::test]
    async fn empty_comment_is_rejected_before_any_request() {
        let service = service_with_unreachable_backend();

        let err = service.add_comment("p1", "", "").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::EmptyContent)
        );

        let err = service.add_comment("p1", "  \n", "").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::EmptyContent)
        );
    }
}
