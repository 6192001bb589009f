//! 匿名帖子索引数据访问层（DAO）
//!
//! 表结构由 sqlx migration 管理（migrations/ 目录）。

use crate::hole::types::now_millis;
use anyhow::{Context, Result};
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashSet;
use tracing::debug;

/// 本地匿名帖子索引 DAO（基于 sqlx）
pub struct AnonymousPostDao {
    db: Pool<Sqlite>,
}

impl AnonymousPostDao {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// 记录一条匿名帖子 ID（幂等：重复记录同一 ID 不报错、不产生重复行）
    pub async fn remember(&self, post_id: &str) -> Result<()> {
        if post_id.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO local_anonymous_posts (post_id, created_at)
            VALUES (?, ?)
            ON CONFLICT(post_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(now_millis())
        .execute(&self.db)
        .await
        .context("记录匿名帖子ID失败")?;

        debug!("[AnonymousDAO] 已记录匿名帖子ID: {}", post_id);
        Ok(())
    }

    /// 帖子删除成功后，把对应 ID 从本地索引中移除
    pub async fn forget(&self, post_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM local_anonymous_posts WHERE post_id = ?
            "#,
        )
        .bind(post_id)
        .execute(&self.db)
        .await
        .context("移除匿名帖子ID失败")?;

        debug!("[AnonymousDAO] 已移除匿名帖子ID: {}", post_id);
        Ok(())
    }

    /// 本设备记录的全部匿名帖子 ID
    pub async fn list(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query(
            r#"
            SELECT post_id FROM local_anonymous_posts
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("查询匿名帖子ID列表失败")?;

        let ids: HashSet<String> = rows
            .into_iter()
            .map(|m| m.get::<String, _>("post_id"))
            .collect();
        debug!("[AnonymousDAO] 本地匿名帖子ID共 {} 个", ids.len());
        Ok(ids)
    }

    /// 某个帖子是否是本设备匿名发布的
    pub async fn contains(&self, post_id: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT post_id FROM local_anonymous_posts WHERE post_id = ?
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.db)
        .await
        .context("查询匿名帖子ID失败")?;

        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    // 内存库必须限制为单连接，否则池里的每个连接各有一份独立的内存数据库
    async fn memory_pool() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn remember_is_idempotent() {
        let dao = AnonymousPostDao::new(memory_pool().await);

        dao.remember("p1").await.unwrap();
        dao.remember("p1").await.unwrap();
        dao.remember("p2").await.unwrap();

        let ids = dao.list().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("p1"));
        assert!(ids.contains("p2"));
        assert!(dao.contains("p1").await.unwrap());
        assert!(!dao.contains("p3").await.unwrap());
    }

    #[tokio::test]
    async fn empty_id_is_not_recorded() {
        let dao = AnonymousPostDao::new(memory_pool().await);
        dao.remember("").await.unwrap();
        assert!(dao.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn forget_prunes_deleted_post() {
        let dao = AnonymousPostDao::new(memory_pool().await);
        dao.remember("p1").await.unwrap();
        dao.remember("p2").await.unwrap();

        dao.forget("p1").await.unwrap();
        let ids = dao.list().await.unwrap();
        assert_eq!(ids.len(), 1);
        assert!(!ids.contains("p1"));

        // 对不存在的 ID 调用也不报错
        dao.forget("p9").await.unwrap();
    }
}
