use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::post::{Comment, Post};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

#[derive(Debug, Clone)]
pub enum LikeOutcome {
    /// The post's updated likes list, most-recent-first.
    Updated(Vec<Uuid>),
    AlreadyLiked,
    NotFound,
}

#[derive(Debug, Clone)]
pub enum UnlikeOutcome {
    Updated(Vec<Uuid>),
    NotLiked,
    NotFound,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// The image reference is stored as opaque text, never fetched or
    /// verified.
    pub async fn create(&self, owner_id: Uuid, image_url: String, caption: String) -> Result<Post> {
        let row = sqlx::query(
            "WITH inserted_post AS ( \
                INSERT INTO posts (owner_id, image_url, caption) \
                VALUES ($1, $2, $3) \
                RETURNING id, owner_id, image_url, caption, likes, comments, created_at \
             ) \
             SELECT p.*, u.username AS owner_username \
             FROM inserted_post p \
             JOIN users u ON p.owner_id = u.id",
        )
        .bind(owner_id)
        .bind(image_url)
        .bind(caption)
        .fetch_one(self.db.pool())
        .await?;

        post_from_row(&row)
    }

    /// Posts authored by anyone in the user's following set, newest first.
    /// An empty following set yields an empty feed, not an error.
    pub async fn feed(&self, user_id: Uuid) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            "SELECT p.id, p.owner_id, u.username AS owner_username, p.image_url, p.caption, \
                    p.likes, p.comments, p.created_at \
             FROM posts p \
             JOIN users u ON u.id = p.owner_id \
             WHERE p.owner_id IN (SELECT unnest(following) FROM users WHERE id = $1) \
             ORDER BY p.created_at DESC, p.id DESC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut posts = Vec::with_capacity(rows.len());
        for row in rows {
            posts.push(post_from_row(&row)?);
        }
        Ok(posts)
    }

    /// Toggle-on: a single guarded update prepends the user id only if absent,
    /// so the row's own atomicity enforces the at-most-once invariant.
    pub async fn like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeOutcome> {
        let row = sqlx::query(
            "UPDATE posts SET likes = array_prepend($2, likes) \
             WHERE id = $1 AND NOT ($2 = ANY(likes)) \
             RETURNING likes",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(row) => Ok(LikeOutcome::Updated(row.get("likes"))),
            None if self.post_exists(post_id).await? => Ok(LikeOutcome::AlreadyLiked),
            None => Ok(LikeOutcome::NotFound),
        }
    }

    /// Toggle-off. `array_remove` keeps the order of the remaining likes.
    pub async fn unlike(&self, post_id: Uuid, user_id: Uuid) -> Result<UnlikeOutcome> {
        let row = sqlx::query(
            "UPDATE posts SET likes = array_remove(likes, $2) \
             WHERE id = $1 AND $2 = ANY(likes) \
             RETURNING likes",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(row) => Ok(UnlikeOutcome::Updated(row.get("likes"))),
            None if self.post_exists(post_id).await? => Ok(UnlikeOutcome::NotLiked),
            None => Ok(UnlikeOutcome::NotFound),
        }
    }

    /// Prepends the comment to the post document. No content validation.
    /// Returns the updated comments list, or None if the post is missing.
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: String,
    ) -> Result<Option<Vec<Comment>>> {
        let comment = Comment {
            id: Uuid::new_v4(),
            user_id,
            text,
            created_at: OffsetDateTime::now_utc(),
        };
        let prepended = serde_json::to_value(vec![&comment])?;

        let row = sqlx::query(
            "UPDATE posts SET comments = $2::jsonb || comments \
             WHERE id = $1 \
             RETURNING comments",
        )
        .bind(post_id)
        .bind(prepended)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(comments_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn post_exists(&self, post_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(exists)
    }
}

fn post_from_row(row: &PgRow) -> Result<Post> {
    Ok(Post {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        owner_username: Some(row.get("owner_username")),
        image_url: row.get("image_url"),
        caption: row.get("caption"),
        likes: row.get("likes"),
        comments: comments_from_row(row)?,
        created_at: row.get("created_at"),
    })
}

fn comments_from_row(row: &PgRow) -> Result<Vec<Comment>> {
    let value: serde_json::Value = row.get("comments");
    Ok(serde_json::from_value(value)?)
}
