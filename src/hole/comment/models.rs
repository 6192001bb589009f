//! 评论数据结构

use crate::hole::post::models::DEFAULT_AUTHOR_NAME;
use serde::{Deserialize, Serialize};

fn default_author_name() -> String {
    DEFAULT_AUTHOR_NAME.to_string()
}

/// 评论文档（comments 集合），通过 `post_id` 归属到帖子
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "postId", default)]
    pub post_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "authorId", default)]
    pub author_id: String,
    #[serde(rename = "authorName", default = "default_author_name")]
    pub author_name: String,
    /// 创建时间（毫秒时间戳）
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
    #[serde(default)]
    pub likes: i32,
}

impl Default for Comment {
    fn default() -> Self {
        Self {
            id: String::new(),
            post_id: String::new(),
            content: String::new(),
            author_id: String::new(),
            author_name: default_author_name(),
            created_at: 0,
            likes: 0,
        }
    }
}
