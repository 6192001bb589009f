//! 帖子数据结构

use serde::{Deserialize, Serialize};

/// 匿名作者的默认显示名
pub const DEFAULT_AUTHOR_NAME: &str = "匿名用户";

fn default_author_name() -> String {
    DEFAULT_AUTHOR_NAME.to_string()
}

/// 帖子文档（posts 集合）
///
/// `author_id` 为空串表示匿名发布：这样的帖子不归属任何资料，
/// 只能通过本设备的匿名索引找回。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "authorId", default)]
    pub author_id: String,
    #[serde(rename = "authorName", default = "default_author_name")]
    pub author_name: String,
    /// 创建时间（毫秒时间戳）
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
    /// 更新时间（毫秒时间戳）
    #[serde(rename = "updatedAt", default)]
    pub updated_at: i64,
    #[serde(default)]
    pub likes: i32,
    /// 评论数缓存：由客户端在增删评论后回写，最终一致，不保证精确
    #[serde(default)]
    pub comments: i32,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for Post {
    fn default() -> Self {
        Self {
            id: String::new(),
            content: String::new(),
            author_id: String::new(),
            author_name: default_author_name(),
            created_at: 0,
            updated_at: 0,
            likes: 0,
            comments: 0,
            tags: Vec::new(),
        }
    }
}

impl Post {
    /// 搜索匹配：内容或任一标签包含关键词（大小写不敏感）。
    /// 空关键词匹配所有帖子。
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.content.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(content: &str, tags: &[&str]) -> Post {
        Post {
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn query_matches_content_case_insensitively() {
        let p = post("Hello 树洞", &[]);
        assert!(p.matches_query("hello"));
        assert!(p.matches_query("HELLO"));
        assert!(p.matches_query("树洞"));
        assert!(!p.matches_query("再见"));
    }

    #[test]
    fn query_matches_any_tag() {
        let p = post("随便写点", &["心情", "Daily"]);
        assert!(p.matches_query("心情"));
        assert!(p.matches_query("daily"));
        assert!(!p.matches_query("学习"));
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(post("任意内容", &[]).matches_query(""));
        assert!(post("", &[]).matches_query(""));
    }
}
