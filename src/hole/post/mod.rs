//! 帖子模块
//!
//! 树洞帖子的存取与列表状态管理

pub mod api;
pub mod listener;
pub mod models;
pub mod service;

// 重新导出主要类型
pub use api::PostApi;
pub use listener::{EmptyPostListener, PostListener};
pub use models::Post;
pub use service::PostService;
