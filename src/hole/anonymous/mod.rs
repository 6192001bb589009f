//! 本地匿名帖子索引
//!
//! 匿名发布的帖子没有服务端归属，只能靠本设备记录的帖子 ID 找回。

pub mod dao;

pub use dao::AnonymousPostDao;
