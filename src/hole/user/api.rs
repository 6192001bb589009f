//! 用户资料 HTTP API 客户端
//!
//! 负责 users 集合的所有文档数据库请求

use crate::hole::session::SessionContext;
use crate::hole::types::handle_http_response;
use crate::hole::user::models::{default_profile, User};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const COLLECTION: &str = "users";

/// 用户资料相关的 HTTP API 客户端
#[derive(Clone)]
pub struct UserProfileApi {
    client: reqwest::Client,
    api_base_url: String,
    session: Arc<SessionContext>,
}

impl UserProfileApi {
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
        debug!("[UserAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

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

    /// 原始读取：资料文档不存在时返回 None
    pub async fn fetch(&self, user_id: &str) -> Result<Option<User>> {
        debug!("[UserAPI] 读取用户资料: {}", user_id);

        let response = self
            .post_json(
                "/document/get",
                serde_json::json!({
                    "collection": COLLECTION,
                    "id": user_id,
                }),
            )
            .await?;
        let api_resp = handle_http_response::<User>(response, "读取用户资料").await?;
        Ok(api_resp.data)
    }

    /// 获取用户资料。资料文档不存在时合成默认资料返回，
    /// 默认资料不会写入后端（显式 create/update 之前始终"未存储"）。
    pub async fn get(&self, user_id: &str) -> Result<User> {
        match self.fetch(user_id).await? {
            Some(user) => {
                info!("[UserAPI] ✅ 获取用户资料成功: {}", user.username);
                Ok(user)
            }
            None => {
                let user = default_profile(user_id);
                info!("[UserAPI] 用户资料不存在，合成默认资料: {}", user.username);
                Ok(user)
            }
        }
    }

    /// 部分字段更新（任意键值，不做 schema 校验）
    pub async fn update(&self, user_id: &str, updates: serde_json::Value) -> Result<()> {
        info!("[UserAPI] 📡 正在更新用户资料 {}: {}", user_id, updates);

        let response = self
            .post_json(
                "/document/update",
                serde_json::json!({
                    "collection": COLLECTION,
                    "id": user_id,
                    "fields": updates,
                }),
            )
            .await?;
        handle_http_response::<serde_json::Value>(response, "更新用户资料").await?;

        info!("[UserAPI] ✅ 用户资料更新成功");
        Ok(())
    }

    /// 创建（整文档覆盖写入，文档 ID 即用户 ID）
    pub async fn create(&self, user: &User) -> Result<()> {
        info!("[UserAPI] 📡 正在创建用户资料: {}", user.id);

        let response = self
            .post_json(
                "/document/set",
                serde_json::json!({
                    "collection": COLLECTION,
                    "id": user.id,
                    "document": user,
                }),
            )
            .await?;
        handle_http_response::<serde_json::Value>(response, "创建用户资料").await?;

        info!("[UserAPI] ✅ 用户资料创建成功");
        Ok(())
    }

    /// 删除用户资料
    pub async fn delete(&self, user_id: &str) -> Result<()> {
        info!("[UserAPI] 📡 正在删除用户资料 {}", user_id);

        let response = self
            .post_json(
                "/document/delete",
                serde_json::json!({
                    "collection": COLLECTION,
                    "id": user_id,
                }),
            )
            .await?;
        handle_http_response::<serde_json::Value>(response, "删除用户资料").await?;

        info!("[UserAPI] ✅ 用户资料删除成功");
        Ok(())
    }
}
