use anyhow::Result;
use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::user::{Profile, UserRef};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

#[derive(Debug, Clone)]
pub enum FollowOutcome {
    /// The acting user's updated following list.
    Updated(Vec<Uuid>),
    AlreadyFollowing,
    NotFound,
}

#[derive(Debug, Clone)]
pub enum UnfollowOutcome {
    Updated(Vec<Uuid>),
    NotFollowing,
    NotFound,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Full profile: no password material, follower/following ids resolved to
    /// usernames in stored order.
    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT id, username, email, followers, following, created_at \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let followers: Vec<Uuid> = row.get("followers");
        let following: Vec<Uuid> = row.get("following");

        let mut ids: Vec<Uuid> = followers.iter().chain(following.iter()).copied().collect();
        ids.sort_unstable();
        ids.dedup();
        let usernames = self.resolve_usernames(&ids).await?;

        Ok(Some(Profile {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            followers: resolve_refs(&followers, &usernames),
            following: resolve_refs(&following, &usernames),
            created_at: row.get("created_at"),
        }))
    }

    /// Adds the relation in two single-document steps: acting's `following`
    /// first, then target's `followers`. The steps are not wrapped in one
    /// transaction; a crash between them leaves the relation asymmetric
    /// (accepted inconsistency window).
    pub async fn follow(&self, acting_id: Uuid, target_id: Uuid) -> Result<FollowOutcome> {
        if !self.user_exists(target_id).await? {
            return Ok(FollowOutcome::NotFound);
        }

        let row = sqlx::query(
            "UPDATE users SET following = array_prepend($2, following) \
             WHERE id = $1 AND NOT ($2 = ANY(following)) \
             RETURNING following",
        )
        .bind(acting_id)
        .bind(target_id)
        .fetch_optional(self.db.pool())
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(FollowOutcome::AlreadyFollowing),
        };

        sqlx::query(
            "UPDATE users SET followers = array_prepend($2, followers) \
             WHERE id = $1 AND NOT ($2 = ANY(followers))",
        )
        .bind(target_id)
        .bind(acting_id)
        .execute(self.db.pool())
        .await?;

        Ok(FollowOutcome::Updated(row.get("following")))
    }

    /// Inverse of `follow`, same two-step shape. `array_remove` keeps the
    /// order of the remaining elements.
    pub async fn unfollow(&self, acting_id: Uuid, target_id: Uuid) -> Result<UnfollowOutcome> {
        if !self.user_exists(target_id).await? {
            return Ok(UnfollowOutcome::NotFound);
        }

        let row = sqlx::query(
            "UPDATE users SET following = array_remove(following, $2) \
             WHERE id = $1 AND $2 = ANY(following) \
             RETURNING following",
        )
        .bind(acting_id)
        .bind(target_id)
        .fetch_optional(self.db.pool())
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(UnfollowOutcome::NotFollowing),
        };

        sqlx::query("UPDATE users SET followers = array_remove(followers, $2) WHERE id = $1")
            .bind(target_id)
            .bind(acting_id)
            .execute(self.db.pool())
            .await?;

        Ok(UnfollowOutcome::Updated(row.get("following")))
    }

    async fn user_exists(&self, user_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(exists)
    }

    async fn resolve_usernames(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query("SELECT id, username FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(self.db.pool())
            .await?;

        let mut usernames = HashMap::with_capacity(rows.len());
        for row in rows {
            usernames.insert(row.get("id"), row.get("username"));
        }
        Ok(usernames)
    }
}

fn resolve_refs(ids: &[Uuid], usernames: &HashMap<Uuid, String>) -> Vec<UserRef> {
    ids.iter()
        .filter_map(|id| {
            usernames.get(id).map(|username| UserRef {
                id: *id,
                username: username.clone(),
            })
        })
        .collect()
}
