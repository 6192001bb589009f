//! 帖子监听器回调接口

use async_trait::async_trait;

/// 帖子监听器回调接口
#[async_trait]
pub trait PostListener: Send + Sync {
    /// 可见帖子列表发生变更，参数为 JSON 数组字符串
    async fn on_posts_changed(&self, posts_json: String);

    /// 帖子创建成功，参数为帖子 ID
    async fn on_post_created(&self, post_id: String);

    /// 帖子删除成功，参数为帖子 ID
    async fn on_post_deleted(&self, post_id: String);
}

/// 默认空实现（无操作）
pub struct EmptyPostListener;

#[async_trait]
impl PostListener for EmptyPostListener {
    async fn on_posts_changed(&self, _posts_json: String) {
        // 默认不做任何处理
    }

    async fn on_post_created(&self, _post_id: String) {
        // 默认不做任何处理
    }

    async fn on_post_deleted(&self, _post_id: String) {
        // 默认不做任何处理
    }
}
