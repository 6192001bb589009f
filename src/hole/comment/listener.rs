//! 评论监听器回调接口

use async_trait::async_trait;

/// 评论监听器回调接口
#[async_trait]
pub trait CommentListener: Send + Sync {
    /// 当前帖子的评论列表发生变更，参数为 JSON 数组字符串
    async fn on_comments_changed(&self, comments_json: String);

    /// 评论添加成功，参数为评论 ID
    async fn on_comment_added(&self, comment_id: String);

    /// 评论删除成功，参数为评论 ID
    async fn on_comment_deleted(&self, comment_id: String);
}

/// 默认空实现（无操作）
pub struct EmptyCommentListener;

#[async_trait]
impl CommentListener for EmptyCommentListener {
    async fn on_comments_changed(&self, _comments_json: String) {
        // 默认不做任何处理
    }

    async fn on_comment_added(&self, _comment_id: String) {
        // 默认不做任何处理
    }

    async fn on_comment_deleted(&self, _comment_id: String) {
        // 默认不做任何处理
    }
}
