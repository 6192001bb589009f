pub mod hole;

// 重新导出常用类型，方便外部使用
pub use hole::{
    auth::AuthGateway,
    client::{ClientConfig, TreeholeClient},
    comment::{Comment, CommentService},
    post::{Post, PostService},
    session::SessionContext,
    user::{User, UserService},
};
