//! 用户数据结构

use crate::hole::session::default_display_name;
use crate::hole::types::now_millis;
use serde::{Deserialize, Serialize};

/// 用户资料文档（users 集合），文档 ID 即认证身份 ID。
/// 身份存在不代表资料文档存在。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "avatarUrl", default)]
    pub avatar_url: String,
    #[serde(default)]
    pub bio: String,
    /// 创建时间（毫秒时间戳）
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
    #[serde(rename = "emailVerified", default)]
    pub email_verified: bool,
}

/// 资料文档不存在时合成的默认资料。
/// 用户名由用户 ID 确定性导出，重复调用结果一致；不会写入后端。
pub fn default_profile(user_id: &str) -> User {
    User {
        id: user_id.to_string(),
        username: default_display_name(user_id),
        email: String::new(),
        avatar_url: String::new(),
        bio: String::new(),
        created_at: now_millis(),
        email_verified: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_username_is_deterministic() {
        let a = default_profile("abcde12345");
        let b = default_profile("abcde12345");
        assert_eq!(a.username, b.username);
        assert_eq!(a.username, "用户abcde");
        assert_eq!(a.id, "abcde12345");
        assert!(a.email.is_empty());
        assert!(!a.email_verified);

        let c = default_profile("xyz98");
        assert_ne!(a.username, c.username);
    }
}
