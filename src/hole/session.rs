//! 会话上下文：保存当前身份（含匿名身份）
//!
//! 所有需要"当前用户是谁"的组件都通过构造函数显式接收
//! `Arc<SessionContext>`，身份变更（登录、注销、匿名登录）
//! 只经由认证网关写入。

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// 当前身份记录（来自认证后端的最小身份信息）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthIdentity {
    /// 用户 ID（认证后端分配）
    pub user_id: String,
    /// 认证 token，随每次后端请求携带
    pub token: String,
    /// 邮箱（匿名身份为空）
    pub email: String,
    /// 显示名（可能为空，展示时回退到默认显示名）
    pub display_name: String,
    /// 邮箱是否已验证
    pub email_verified: bool,
    /// 是否匿名身份
    pub is_anonymous: bool,
}

/// 会话上下文
pub struct SessionContext {
    identity: RwLock<Option<AuthIdentity>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            identity: RwLock::new(None),
        }
    }

    /// 写入当前身份（登录 / 注册 / 匿名登录成功后调用）
    pub async fn set_identity(&self, identity: AuthIdentity) {
        *self.identity.write().await = Some(identity);
    }

    /// 清除当前身份（注销时调用）
    pub async fn clear(&self) {
        *self.identity.write().await = None;
    }

    /// 当前身份快照
    pub async fn current(&self) -> Option<AuthIdentity> {
        self.identity.read().await.clone()
    }

    /// 当前用户 ID（包括匿名身份），没有身份时返回 None
    pub async fn current_user_id(&self) -> Option<String> {
        self.identity
            .read()
            .await
            .as_ref()
            .map(|i| i.user_id.clone())
    }

    /// 当前 token，没有身份时返回 None
    pub async fn token(&self) -> Option<String> {
        self.identity.read().await.as_ref().map(|i| i.token.clone())
    }

    /// 是否已登录（匿名身份不算登录）
    pub async fn is_logged_in(&self) -> bool {
        self.identity
            .read()
            .await
            .as_ref()
            .map(|i| !i.is_anonymous)
            .unwrap_or(false)
    }

    /// 发帖时使用的作者 ID：已登录返回用户 ID，匿名或无身份返回空串。
    /// 空串是"匿名发布"的哨兵值，帖子只能通过本地匿名索引找回。
    pub async fn authoring_id(&self) -> String {
        match self.identity.read().await.as_ref() {
            Some(i) if !i.is_anonymous => i.user_id.clone(),
            _ => String::new(),
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// 默认显示名："用户" + 用户 ID 前 5 个字符
pub fn default_display_name(user_id: &str) -> String {
    format!("用户{}", user_id.chars().take(5).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_display_name_is_deterministic() {
        assert_eq!(
            default_display_name("abcdef123"),
            default_display_name("abcdef123")
        );
        assert_eq!(default_display_name("abcdef123"), "用户abcde");
        // 短 ID 不足 5 个字符时取全部
        assert_eq!(default_display_name("ab"), "用户ab");
        assert_eq!(default_display_name(""), "用户");
    }

    #[tokio::test]
    async fn anonymous_identity_is_not_logged_in() {
        let session = SessionContext::new();
        assert!(!session.is_logged_in().await);
        assert_eq!(session.authoring_id().await, "");

        session
            .set_identity(AuthIdentity {
                user_id: "anon-1".to_string(),
                token: "t".to_string(),
                email: String::new(),
                display_name: String::new(),
                email_verified: false,
                is_anonymous: true,
            })
            .await;
        assert!(!session.is_logged_in().await);
        // 匿名身份发帖时作者 ID 仍为空串哨兵
        assert_eq!(session.authoring_id().await, "");
        assert_eq!(session.current_user_id().await.as_deref(), Some("anon-1"));

        session
            .set_identity(AuthIdentity {
                user_id: "u1".to_string(),
                token: "t2".to_string(),
                email: "a@b.c".to_string(),
                display_name: "树洞用户".to_string(),
                email_verified: true,
                is_anonymous: false,
            })
            .await;
        assert!(session.is_logged_in().await);
        assert_eq!(session.authoring_id().await, "u1");

        session.clear().await;
        assert!(session.current().await.is_none());
    }
}
