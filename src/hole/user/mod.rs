//! 用户模块
//!
//! 用户资料文档的存取与登录/资料状态管理

pub mod api;
pub mod listener;
pub mod models;
pub mod service;

// 重新导出主要类型
pub use api::UserProfileApi;
pub use listener::{EmptyUserListener, UserListener};
pub use models::User;
pub use service::UserService;
