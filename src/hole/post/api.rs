//! 帖子 HTTP API 客户端
//!
//! 负责 posts 集合的所有文档数据库请求

use crate::hole::post::models::Post;
use crate::hole::session::SessionContext;
use crate::hole::types::{decode_documents, handle_http_response, now_millis, DocQueryResp};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// 帖子列表的默认批大小
pub const DEFAULT_FEED_LIMIT: u32 = 20;

const COLLECTION: &str = "posts";

/// 帖子相关的 HTTP API 客户端
#[derive(Clone)]
pub struct PostApi {
    client: reqwest::Client,
    api_base_url: String,
    session: Arc<SessionContext>,
}

impl PostApi {
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
        debug!("[PostAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

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

    /// 创建帖子：客户端生成 ID 并随文档一次写入，写入的记录自带自己的标识，
    /// 不存在"先写入再补 ID"的中间状态。忽略调用方传入的 ID。
    pub async fn create(&self, post: &Post) -> Result<String> {
        info!(
            "[PostAPI] 📡 正在创建帖子: 集合={}, 内容={}...",
            COLLECTION,
            post.content.chars().take(20).collect::<String>()
        );

        let post_id = Uuid::new_v4().to_string();
        let now = now_millis();
        let mut doc = post.clone();
        doc.id = post_id.clone();
        if doc.created_at == 0 {
            doc.created_at = now;
        }
        if doc.updated_at == 0 {
            doc.updated_at = now;
        }

        let response = self
            .post_json(
                "/document/set",
                serde_json::json!({
                    "collection": COLLECTION,
                    "id": post_id,
                    "document": doc,
                }),
            )
            .await?;
        handle_http_response::<serde_json::Value>(response, "创建帖子").await?;

        info!("[PostAPI] ✅ 帖子创建成功，ID: {}", post_id);
        Ok(post_id)
    }

    /// 按 ID 读取帖子，文档不存在时返回 None
    pub async fn get(&self, post_id: &str) -> Result<Option<Post>> {
        debug!("[PostAPI] 读取帖子: {}", post_id);

        let response = self
            .post_json(
                "/document/get",
                serde_json::json!({
                    "collection": COLLECTION,
                    "id": post_id,
                }),
            )
            .await?;
        let api_resp = handle_http_response::<Post>(response, "读取帖子").await?;
        Ok(api_resp.data)
    }

    /// 获取帖子列表，按创建时间倒序（最新在前）。
    /// `limit` 为 None 时不限制条数。解析失败的文档跳过。
    pub async fn list(&self, limit: Option<u32>) -> Result<Vec<Post>> {
        info!(
            "[PostAPI] 📡 正在获取帖子列表: 集合={}, 限制={:?}",
            COLLECTION, limit
        );

        let response = self
            .post_json(
                "/document/query",
                serde_json::json!({
                    "collection": COLLECTION,
                    "orderBy": {"field": "createdAt", "direction": "desc"},
                    "limit": limit,
                }),
            )
            .await?;
        let api_resp = handle_http_response::<DocQueryResp>(response, "帖子列表").await?;
        let documents = api_resp.data.map(|d| d.documents).unwrap_or_default();
        let posts: Vec<Post> = decode_documents(documents, "帖子列表");

        info!("[PostAPI] ✅ 获取到 {} 条帖子", posts.len());
        Ok(posts)
    }

    /// 搜索帖子：拉取全量帖子后在客户端过滤，
    /// 内容或任一标签包含关键词即命中（大小写不敏感）
    pub async fn search(&self, query: &str) -> Result<Vec<Post>> {
        info!("[PostAPI] 📡 正在搜索帖子，关键词: {}", query);

        let all = self.list(None).await?;
        let posts: Vec<Post> = all.into_iter().filter(|p| p.matches_query(query)).collect();

        info!("[PostAPI] ✅ 搜索到 {} 条帖子", posts.len());
        Ok(posts)
    }

    /// 获取某个作者的帖子（服务端按 authorId 过滤），按创建时间倒序
    pub async fn list_by_author(&self, user_id: &str) -> Result<Vec<Post>> {
        info!("[PostAPI] 📡 正在获取用户 {} 的帖子", user_id);

        let response = self
            .post_json(
                "/document/query",
                serde_json::json!({
                    "collection": COLLECTION,
                    "filter": {"field": "authorId", "value": user_id},
                    "orderBy": {"field": "createdAt", "direction": "desc"},
                }),
            )
            .await?;
        let api_resp = handle_http_response::<DocQueryResp>(response, "用户帖子列表").await?;
        let documents = api_resp.data.map(|d| d.documents).unwrap_or_default();
        let posts: Vec<Post> = decode_documents(documents, "用户帖子列表");

        info!("[PostAPI] ✅ 获取到用户 {} 条帖子", posts.len());
        Ok(posts)
    }

    /// 部分字段更新（任意键值，不做 schema 校验）
    pub async fn update(&self, post_id: &str, updates: serde_json::Value) -> Result<()> {
        info!("[PostAPI] 📡 正在更新帖子 {}: {}", post_id, updates);

        let response = self
            .post_json(
                "/document/update",
                serde_json::json!({
                    "collection": COLLECTION,
                    "id": post_id,
                    "fields": updates,
                }),
            )
            .await?;
        handle_http_response::<serde_json::Value>(response, "更新帖子").await?;

        info!("[PostAPI] ✅ 帖子更新成功");
        Ok(())
    }

    /// 删除帖子（不级联删除评论）
    pub async fn delete(&self, post_id: &str) -> Result<()> {
        info!("[PostAPI] 📡 正在删除帖子 {}", post_id);

        let response = self
            .post_json(
                "/document/delete",
                serde_json::json!({
                    "collection": COLLECTION,
                    "id": post_id,
                }),
            )
            .await?;
        handle_http_response::<serde_json::Value>(response, "删除帖子").await?;

        info!("[PostAPI] ✅ 帖子删除成功");
        Ok(())
    }
}
