//! 评论 HTTP API 客户端
//!
//! 负责 comments 集合的所有文档数据库请求

use crate::hole::comment::models::Comment;
use crate::hole::error::ValidationError;
use crate::hole::session::SessionContext;
use crate::hole::types::{decode_documents, handle_http_response, now_millis, DocQueryResp};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const COLLECTION: &str = "comments";

/// 评论相关的 HTTP API 客户端
#[derive(Clone)]
pub struct CommentApi {
    client: reqwest::Client,
    api_base_url: String,
    session: Arc<SessionContext>,
}

impl CommentApi {
    pub fn new(client: reqwest::Client, api_base_url: String, session: Arc<SessionContext>) -> Self {
        Self {
            client,
            api_base_url,
            session,
        }
    }

    async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}{}", self.api_base_url, path);
        let token = self.session.token().await.unwrap_or_default();
        debug!("[CommentAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        self.client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("operationID", &operation_id)
            .header("token", token)
            .json(&body)
            .send()
            .await
            .context("请求失败")
    }

    /// 添加评论：空内容在发起请求前拒绝；
    /// 客户端生成 ID 并随文档一次写入
    pub async fn add(&self, comment: &Comment) -> Result<String> {
        if comment.content.trim().is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }

        info!(
            "[CommentAPI] 📡 正在添加评论: postId={}, 内容={}...",
            comment.post_id,
            comment.content.chars().take(20).collect::<String>()
        );

        let comment_id = Uuid::new_v4().to_string();
        let mut doc = comment.clone();
        doc.id = comment_id.clone();
        if doc.created_at == 0 {
            doc.created_at = now_millis();
        }

        let response = self
            .post_json(
                "/document/set",
                serde_json::json!({
                    "collection": COLLECTION,
                    "id": comment_id,
                    "document": doc,
                }),
            )
            .await?;
        handle_http_response::<serde_json::Value>(response, "添加评论").await?;

        info!("[CommentAPI] ✅ 评论添加成功，ID: {}", comment_id);
        Ok(comment_id)
    }

    /// 获取帖子的评论，按创建时间升序（最早在前，与帖子列表相反）。
    /// 解析失败的文档跳过。
    pub async fn list_for_post(&self, post_id: &str) -> Result<Vec<Comment>> {
        info!("[CommentAPI] 📡 正在获取帖子评论: {}", post_id);

        let response = self
            .post_json(
                "/document/query",
                serde_json::json!({
                    "collection": COLLECTION,
                    "filter": {"field": "postId", "value": post_id},
                    "orderBy": {"field": "createdAt", "direction": "asc"},
                }),
            )
            .await?;
        let api_resp = handle_http_response::<DocQueryResp>(response, "评论列表").await?;
        let documents = api_resp.data.map(|d| d.documents).unwrap_or_default();
        let comments: Vec<Comment> = decode_documents(documents, "评论列表");

        info!("[CommentAPI] ✅ 获取到 {} 条评论", comments.len());
        Ok(comments)
    }

    /// 删除评论
    pub async fn delete(&self, comment_id: &str) -> Result<()> {
        info!("[CommentAPI] 📡 正在删除评论 {}", comment_id);

        let response = self
            .post_json(
                "/document/delete",
                serde_json::json!({
                    "collection": COLLECTION,
                    "id": comment_id,
                }),
            )
            .await?;
        handle_http_response::<serde_json::Value>(response, "删除评论").await?;

        info!("[CommentAPI] ✅ 评论删除成功");
        Ok(())
    }
}
