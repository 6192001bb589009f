//! 认证模块
//!
//! `AuthApi` 负责认证后端的 HTTP 调用；`AuthGateway` 在其上编排
//! 注册 / 登录 / 注销 / 邮箱验证 / 当前身份等会话级操作。
//!
//! 注册是三次顺序写入（创建身份、写显示名、写资料文档），不是原子
//! 操作：中途失败会留下部分状态，例如身份已创建但资料文档缺失。

use crate::hole::error::AuthError;
use crate::hole::session::{default_display_name, AuthIdentity, SessionContext};
use crate::hole::types::{handle_http_response, now_millis};
use crate::hole::user::api::UserProfileApi;
use crate::hole::user::models::User;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 认证后端返回的身份数据
#[derive(Debug, Deserialize)]
pub struct AuthTokenData {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub token: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    #[serde(rename = "emailVerified", default)]
    pub email_verified: bool,
}

/// 认证后端的 HTTP API 客户端
#[derive(Clone)]
pub struct AuthApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl AuthApi {
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
        }
    }

    async fn post_json(
        &self,
        path: &str,
        token: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}{}", self.api_base_url, path);
        debug!("[AuthAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

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

    /// 用邮箱和密码创建身份
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthTokenData> {
        info!("[AuthAPI] 🔐 正在注册: {}", email);

        let response = self
            .post_json(
                "/account/register",
                "",
                serde_json::json!({
                    "email": email,
                    "password": password,
                }),
            )
            .await?;
        let api_resp = handle_http_response::<AuthTokenData>(response, "注册").await?;
        let data = api_resp
            .data
            .ok_or_else(|| anyhow::anyhow!("响应中缺少 data 字段"))?;

        info!("[AuthAPI] ✅ 注册成功，用户ID: {}", data.user_id);
        Ok(data)
    }

    /// 在身份记录上写显示名（独立于注册的一次写入）
    pub async fn set_display_name(
        &self,
        token: &str,
        user_id: &str,
        display_name: &str,
    ) -> Result<()> {
        info!("[AuthAPI] 正在设置显示名: {} -> {}", user_id, display_name);

        let response = self
            .post_json(
                "/account/set_display_name",
                token,
                serde_json::json!({
                    "userID": user_id,
                    "displayName": display_name,
                }),
            )
            .await?;
        handle_http_response::<serde_json::Value>(response, "设置显示名").await?;
        Ok(())
    }

    /// 用邮箱和密码登录
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokenData> {
        info!("[AuthAPI] 🔐 正在登录: {}", email);

        let response = self
            .post_json(
                "/account/login",
                "",
                serde_json::json!({
                    "email": email,
                    "password": password,
                }),
            )
            .await?;
        let api_resp = handle_http_response::<AuthTokenData>(response, "登录").await?;
        let data = api_resp
            .data
            .ok_or_else(|| anyhow::anyhow!("响应中缺少 data 字段"))?;

        info!("[AuthAPI] ✅ 登录成功，用户ID: {}", data.user_id);
        Ok(data)
    }

    /// 匿名登录（后端自动分配匿名身份）
    pub async fn anonymous_sign_in(&self) -> Result<AuthTokenData> {
        info!("[AuthAPI] 🔐 正在匿名登录...");

        let response = self
            .post_json("/account/anonymous", "", serde_json::json!({}))
            .await?;
        let api_resp = handle_http_response::<AuthTokenData>(response, "匿名登录").await?;
        let data = api_resp
            .data
            .ok_or_else(|| anyhow::anyhow!("响应中缺少 data 字段"))?;

        info!("[AuthAPI] ✅ 匿名登录成功，用户ID: {}", data.user_id);
        Ok(data)
    }

    /// 给当前身份发送验证邮件
    pub async fn send_email_verification(&self, token: &str, user_id: &str) -> Result<()> {
        info!("[AuthAPI] 📡 正在发送验证邮件: {}", user_id);

        let response = self
            .post_json(
                "/account/send_verification",
                token,
                serde_json::json!({"userID": user_id}),
            )
            .await?;
        handle_http_response::<serde_json::Value>(response, "发送验证邮件").await?;

        info!("[AuthAPI] ✅ 验证邮件发送成功");
        Ok(())
    }

    /// 注销后端会话
    pub async fn logout(&self, token: &str, user_id: &str) -> Result<()> {
        debug!("[AuthAPI] 正在注销: {}", user_id);

        let response = self
            .post_json(
                "/account/logout",
                token,
                serde_json::json!({"userID": user_id}),
            )
            .await?;
        handle_http_response::<serde_json::Value>(response, "注销").await?;
        Ok(())
    }
}

/// 认证网关：会话级认证操作的编排入口
pub struct AuthGateway {
    api: AuthApi,
    profiles: UserProfileApi,
    session: Arc<SessionContext>,
}

impl AuthGateway {
    pub fn new(api: AuthApi, profiles: UserProfileApi, session: Arc<SessionContext>) -> Self {
        Self {
            api,
            profiles,
            session,
        }
    }

    /// 邮箱注册：创建身份、写显示名、写资料文档（顺序执行，不原子）
    pub async fn register_with_email(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<String> {
        info!("[AuthGateway] 开始邮箱注册: {}, 用户名: {}", email, username);

        let data = self.api.register(email, password).await?;

        self.session
            .set_identity(AuthIdentity {
                user_id: data.user_id.clone(),
                token: data.token.clone(),
                email: email.to_string(),
                display_name: username.to_string(),
                email_verified: false,
                is_anonymous: false,
            })
            .await;

        // 在身份记录上写显示名
        self.api
            .set_display_name(&data.token, &data.user_id, username)
            .await?;

        // 创建用户资料文档
        let user = User {
            id: data.user_id.clone(),
            username: username.to_string(),
            email: email.to_string(),
            created_at: now_millis(),
            ..Default::default()
        };
        self.profiles.create(&user).await?;

        info!("[AuthGateway] ✅ 用户注册成功: {}", data.user_id);
        Ok(data.user_id)
    }

    /// 邮箱登录，成功后把身份写入会话
    pub async fn login_with_email(&self, email: &str, password: &str) -> Result<String> {
        let data = self.api.login(email, password).await?;

        self.session
            .set_identity(AuthIdentity {
                user_id: data.user_id.clone(),
                token: data.token.clone(),
                email: if data.email.is_empty() {
                    email.to_string()
                } else {
                    data.email.clone()
                },
                display_name: data.display_name.clone(),
                email_verified: data.email_verified,
                is_anonymous: false,
            })
            .await;

        info!("[AuthGateway] ✅ 用户登录成功: {}", data.user_id);
        Ok(data.user_id)
    }

    /// 给当前身份发送验证邮件；没有身份时不发起任何请求
    pub async fn send_email_verification(&self) -> Result<()> {
        let identity = match self.session.current().await {
            Some(identity) => identity,
            None => {
                warn!("[AuthGateway] 发送验证邮件失败: 用户未登录");
                return Err(AuthError::NotAuthenticated.into());
            }
        };
        self.api
            .send_email_verification(&identity.token, &identity.user_id)
            .await
    }

    /// 注销：立即清除本地会话，后端注销调用只尽力而为（失败仅记日志）
    pub async fn logout(&self) {
        if let Some(identity) = self.session.current().await {
            let api = self.api.clone();
            tokio::spawn(async move {
                if let Err(e) = api.logout(&identity.token, &identity.user_id).await {
                    warn!("[AuthGateway] 后端注销失败（已忽略）: {:?}", e);
                }
            });
        }
        self.session.clear().await;
        info!("[AuthGateway] 用户已注销");
    }

    /// 当前用户：由会话里的最小身份记录合成，
    /// 显示名缺失时回退到"用户 + ID 前 5 位"
    pub async fn current_user(&self) -> Option<User> {
        let identity = self.session.current().await?;
        let username = if identity.display_name.is_empty() {
            default_display_name(&identity.user_id)
        } else {
            identity.display_name.clone()
        };
        Some(User {
            id: identity.user_id,
            username,
            email: identity.email,
            email_verified: identity.email_verified,
            created_at: now_millis(),
            ..Default::default()
        })
    }

    /// 是否已登录（匿名身份不算）
    pub async fn is_logged_in(&self) -> bool {
        self.session.is_logged_in().await
    }

    /// 进程启动时确保存在一个身份：没有任何身份时自动匿名登录。
    /// 匿名登录失败不阻塞启动，只记日志。
    pub async fn ensure_anonymous_identity(&self) {
        if self.session.current().await.is_some() {
            return;
        }
        match self.api.anonymous_sign_in().await {
            Ok(data) => {
                info!("[AuthGateway] 匿名用户登录成功: {}", data.user_id);
                self.session
                    .set_identity(AuthIdentity {
                        user_id: data.user_id,
                        token: data.token,
                        email: String::new(),
                        display_name: String::new(),
                        email_verified: false,
                        is_anonymous: true,
                    })
                    .await;
            }
            Err(e) => {
                warn!("[AuthGateway] 匿名用户登录失败: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_with_unreachable_backend() -> AuthGateway {
        let session = Arc::new(SessionContext::new());
        let client = reqwest::Client::new();
        // 无效地址：未登录的校验必须在任何网络请求之前完成
        let base = "http://127.0.0.1:0".to_string();
        AuthGateway::new(
            AuthApi::new(client.clone(), base.clone()),
            UserProfileApi::new(client, base, session.clone()),
            session,
        )
    }

    #[tokio::test]
    async fn verification_without_identity_fails_locally() {
        let gateway = gateway_with_unreachable_backend();
        let err = gateway.send_email_verification().await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<AuthError>(),
            Some(&AuthError::NotAuthenticated)
        );
    }

    #[tokio::test]
    async fn current_user_falls_back_to_default_display_name() {
        let gateway = gateway_with_unreachable_backend();
        assert!(gateway.current_user().await.is_none());

        gateway
            .session
            .set_identity(AuthIdentity {
                user_id: "abcdef-42".to_string(),
                token: "t".to_string(),
                email: "a@b.c".to_string(),
                display_name: String::new(),
                email_verified: false,
                is_anonymous: false,
            })
            .await;

        let user = gateway.current_user().await.unwrap();
        assert_eq!(user.username, "用户abcde");
        assert_eq!(user.email, "a@b.c");
        assert!(gateway.is_logged_in().await);
    }
}
