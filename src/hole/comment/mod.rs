//! 评论模块
//!
//! 帖子评论的存取与评论列表状态管理

pub mod api;
pub mod listener;
pub mod models;
pub mod service;

// 重新导出主要类型
pub use api::CommentApi;
pub use listener::{CommentListener, EmptyCommentListener};
pub use models::Comment;
pub use service::CommentService;
