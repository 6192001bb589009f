//! 错误分类：本地校验错误与认证状态错误
//!
//! 校验错误在发起任何网络请求之前返回；后端调用失败统一走
//! `anyhow::Error`（带上下文信息），调用方通过 `downcast_ref`
//! 区分可恢复的校验错误和瞬时的后端错误。

use thiserror::Error;

/// 本地输入校验错误（不会触发网络请求）
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("内容不能为空")]
    EmptyContent,

    #[error("请输入邮箱和密码")]
    EmptyCredentials,

    #[error("请输入用户名")]
    EmptyUsername,

    #[error("密码至少6位")]
    PasswordTooShort,

    #[error("两次密码不一致")]
    PasswordMismatch,
}

/// 认证状态错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("用户未登录")]
    NotAuthenticated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_survives_anyhow_boundary() {
        let err: anyhow::Error = ValidationError::EmptyContent.into();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::EmptyContent)
        );
        assert_eq!(err.to_string(), "内容不能为空");
    }

    #[test]
    fn auth_error_survives_anyhow_boundary() {
        let err: anyhow::Error = AuthError::NotAuthenticated.into();
        assert_eq!(
            err.downcast_ref::<AuthError>(),
            Some(&AuthError::NotAuthenticated)
        );
    }
}
