//! 用户会话服务层
//!
//! 持有登录状态与用户资料的可观察状态，编排认证网关和资料 API。
//! 所有输入校验在发起网络请求之前完成。

use crate::hole::auth::AuthGateway;
use crate::hole::error::{AuthError, ValidationError};
use crate::hole::session::SessionContext;
use crate::hole::user::api::UserProfileApi;
use crate::hole::user::listener::{EmptyUserListener, UserListener};
use crate::hole::user::models::User;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// 密码最小长度
const MIN_PASSWORD_LEN: usize = 6;

/// 用户会话服务
pub struct UserService {
    gateway: Arc<AuthGateway>,
    profiles: Arc<UserProfileApi>,
    session: Arc<SessionContext>,
    listener: Arc<dyn UserListener>,

    user_profile_tx: watch::Sender<Option<User>>,
    current_user_tx: watch::Sender<Option<User>>,
    is_logged_in_tx: watch::Sender<bool>,
    is_loading_tx: watch::Sender<bool>,
}

impl UserService {
    pub fn new(
        gateway: Arc<AuthGateway>,
        profiles: Arc<UserProfileApi>,
        session: Arc<SessionContext>,
    ) -> Self {
        Self::with_listener(gateway, profiles, session, Arc::new(EmptyUserListener))
    }

    pub fn with_listener(
        gateway: Arc<AuthGateway>,
        profiles: Arc<UserProfileApi>,
        session: Arc<SessionContext>,
        listener: Arc<dyn UserListener>,
    ) -> Self {
        let (user_profile_tx, _) = watch::channel(None);
        let (current_user_tx, _) = watch::channel(None);
        let (is_logged_in_tx, _) = watch::channel(false);
        let (is_loading_tx, _) = watch::channel(false);
        Self {
            gateway,
            profiles,
            session,
            listener,
            user_profile_tx,
            current_user_tx,
            is_logged_in_tx,
            is_loading_tx,
        }
    }

    /// 当前用户资料（users 集合里的文档，或合成的默认资料）
    pub fn user_profile(&self) -> watch::Receiver<Option<User>> {
        self.user_profile_tx.subscribe()
    }

    /// 当前用户（由身份记录合成）
    pub fn current_user(&self) -> watch::Receiver<Option<User>> {
        self.current_user_tx.subscribe()
    }

    /// 登录状态
    pub fn is_logged_in(&self) -> watch::Receiver<bool> {
        self.is_logged_in_tx.subscribe()
    }

    /// 加载中标志
    pub fn is_loading(&self) -> watch::Receiver<bool> {
        self.is_loading_tx.subscribe()
    }

    /// 按当前会话重算登录状态与当前用户（身份变更后调用）
    pub async fn refresh_login_state(&self) {
        let user = self.gateway.current_user().await;
        let is_logged_in = self.gateway.is_logged_in().await;
        self.current_user_tx.send_replace(user);
        self.is_logged_in_tx.send_replace(is_logged_in);
        self.listener.on_login_state_changed(is_logged_in).await;
    }

    /// 邮箱注册。校验顺序：用户名、邮箱、密码非空，密码长度，两次密码一致；
    /// 任一不满足都不发起网络请求。
    pub async fn register_with_email(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
        username: &str,
    ) -> Result<String> {
        if username.trim().is_empty() {
            return Err(ValidationError::EmptyUsername.into());
        }
        if email.trim().is_empty() || password.is_empty() {
            return Err(ValidationError::EmptyCredentials.into());
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort.into());
        }
        if password != confirm_password {
            return Err(ValidationError::PasswordMismatch.into());
        }

        self.is_loading_tx.send_replace(true);
        let result = self.gateway.register_with_email(email, password, username).await;
        match &result {
            Ok(user_id) => {
                info!("[UserService] 用户注册成功: {}", user_id);
                self.refresh_login_state().await;
                self.load_user_profile(user_id).await;
            }
            Err(e) => {
                error!("[UserService] 用户注册失败: {:?}", e);
            }
        }
        self.is_loading_tx.send_replace(false);
        result
    }

    /// 邮箱登录。空邮箱或空密码不发起网络请求。
    pub async fn login_with_email(&self, email: &str, password: &str) -> Result<String> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ValidationError::EmptyCredentials.into());
        }

        self.is_loading_tx.send_replace(true);
        let result = self.gateway.login_with_email(email, password).await;
        match &result {
            Ok(user_id) => {
                info!("[UserService] 用户登录成功: {}", user_id);
                self.refresh_login_state().await;
                self.load_user_profile(user_id).await;
            }
            Err(e) => {
                error!("[UserService] 用户登录失败: {:?}", e);
            }
        }
        self.is_loading_tx.send_replace(false);
        result
    }

    /// 给当前身份发送验证邮件
    pub async fn send_email_verification(&self) -> Result<()> {
        self.gateway.send_email_verification().await
    }

    /// 注销并清空本地可观察状态
    pub async fn logout(&self) {
        self.gateway.logout().await;
        self.is_logged_in_tx.send_replace(false);
        self.current_user_tx.send_replace(None);
        self.user_profile_tx.send_replace(None);
        self.listener.on_login_state_changed(false).await;
    }

    /// 加载用户资料（资料不存在时得到合成的默认资料）
    pub async fn load_user_profile(&self, user_id: &str) {
        self.is_loading_tx.send_replace(true);
        match self.profiles.get(user_id).await {
            Ok(profile) => {
                info!("[UserService] 用户资料加载成功: {}", profile.username);
                let json = serde_json::to_string(&profile).unwrap_or_default();
                self.user_profile_tx.send_replace(Some(profile));
                self.listener.on_profile_changed(json).await;
            }
            Err(e) => {
                error!("[UserService] 用户资料加载失败: {:?}", e);
            }
        }
        self.is_loading_tx.send_replace(false);
    }

    /// 更新当前用户的资料（部分字段），成功后重新加载
    pub async fn update_user_profile(&self, updates: serde_json::Value) -> Result<()> {
        let user_id = match self.session.current_user_id().await {
            Some(id) => id,
            None => return Err(AuthError::NotAuthenticated.into()),
        };

        self.is_loading_tx.send_replace(true);
        let result = self.profiles.update(&user_id, updates).await;
        match &result {
            Ok(()) => {
                info!("[UserService] 用户资料更新成功");
                self.load_user_profile(&user_id).await;
            }
            Err(e) => {
                error!("[UserService] 用户资料更新失败: {:?}", e);
            }
        }
        self.is_loading_tx.send_replace(false);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hole::auth::AuthApi;

    fn service_with_unreachable_backend() -> UserService {
        let session = Arc::new(SessionContext::new());
        let client = reqwest::Client::new();
        // 无效地址：校验必须在任何网络请求之前完成
        let base = "http://127.0.0.1:0".to_string();
        let profiles = Arc::new(UserProfileApi::new(
            client.clone(),
            base.clone(),
            session.clone(),
        ));
        let gateway = Arc::new(AuthGateway::new(
            AuthApi::new(client, base),
            (*profiles).clone(),
            session.clone(),
        ));
        UserService::new(gateway, profiles, session)
    }

    fn validation_of(err: &anyhow::Error) -> Option<&ValidationError> {
        err.downcast_ref::<ValidationError>()
    }

    #[tokio::test]
    async fn register_validation_runs_before_any_request() {
        let service = service_with_unreachable_backend();

        let err = service
            .register_with_email("a@b.c", "123456", "123456", "")
            .await
            .unwrap_err();
        assert_eq!(validation_of(&err), Some(&ValidationError::EmptyUsername));

        let err = service
            .register_with_email("", "123456", "123456", "小树")
            .await
            .unwrap_err();
        assert_eq!(validation_of(&err), Some(&ValidationError::EmptyCredentials));

        let err = service
            .register_with_email("a@b.c", "12345", "12345", "小树")
            .await
            .unwrap_err();
        assert_eq!(validation_of(&err), Some(&ValidationError::PasswordTooShort));

        let err = service
            .register_with_email("a@b.c", "123456", "654321", "小树")
            .await
            .unwrap_err();
        assert_eq!(validation_of(&err), Some(&ValidationError::PasswordMismatch));
    }

    #[tokio::test]
    async fn login_requires_credentials() {
        let service = service_with_unreachable_backend();

        let err = service.login_with_email("", "123456").await.unwrap_err();
        assert_eq!(validation_of(&err), Some(&ValidationError::EmptyCredentials));

        let err = service.login_with_email("a@b.c", "").await.unwrap_err();
        assert_eq!(validation_of(&err), Some(&ValidationError::EmptyCredentials));
    }

    #[tokio::test]
    async fn profile_update_without_identity_fails_locally() {
        let service = service_with_unreachable_backend();
        let err = service
            .update_user_profile(serde_json::json!({"bio": "你好"}))
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<AuthError>(),
            Some(&AuthError::NotAuthenticated)
        );
    }
}
