//! 用户监听器回调接口

use async_trait::async_trait;

/// 用户监听器回调接口
#[async_trait]
pub trait UserListener: Send + Sync {
    /// 登录状态发生变更
    async fn on_login_state_changed(&self, is_logged_in: bool);

    /// 用户资料发生变更，参数为 JSON 字符串
    async fn on_profile_changed(&self, profile_json: String);
}

/// 默认空实现（无操作）
pub struct EmptyUserListener;

#[async_trait]
impl UserListener for EmptyUserListener {
    async fn on_login_state_changed(&self, _is_logged_in: bool) {
        // 默认不做任何处理
    }

    async fn on_profile_changed(&self, _profile_json: String) {
        // 默认不做任何处理
    }
}
