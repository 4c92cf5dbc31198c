use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use sqlx::Row;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::user::User;
use crate::infra::db::Db;

/// Identity resolved from a bearer token. The embedded user id is trusted
/// as-is: a token outlives the existence check that minted it.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    token_key: [u8; 32],
    token_ttl_hours: u64,
}

impl AuthService {
    pub fn new(db: Db, token_key: [u8; 32], token_ttl_hours: u64) -> Self {
        Self {
            db,
            token_key,
            token_ttl_hours,
        }
    }

    /// Create a user with a hashed password and log them straight in.
    /// Duplicate username/email surface as unique-violation database errors;
    /// the HTTP layer maps them by constraint name.
    pub async fn signup(
        &self,
        username: String,
        email: String,
        password: String,
    ) -> Result<(User, IssuedToken)> {
        let password_hash = hash_password(&password)?;
        let row = sqlx::query(
            "INSERT INTO users (username, email, password_hash) \
             VALUES ($1, $2, $3) \
             RETURNING id, username, email, password_hash, followers, following, created_at",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(self.db.pool())
        .await?;

        let user = user_from_row(&row);
        let token = self.issue_token(user.id)?;

        Ok((user, token))
    }

    /// Look the user up by email and verify the password. Unknown email and
    /// wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<IssuedToken>> {
        let row = sqlx::query("SELECT id, password_hash FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.db.pool())
            .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let user_id: Uuid = row.get("id");
        let password_hash: String = row.get("password_hash");
        if password_hash.is_empty() {
            return Ok(None);
        }

        if !verify_password(password, &password_hash)? {
            return Ok(None);
        }

        Ok(Some(self.issue_token(user_id)?))
    }

    /// Signed, time-bound credential embedding the user id.
    pub fn issue_token(&self, user_id: Uuid) -> Result<IssuedToken> {
        let duration = std::time::Duration::from_secs(self.token_ttl_hours * 60 * 60);
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer("grain")?;
        claims.audience("grain")?;
        claims.subject(&user_id.to_string())?;

        let key = SymmetricKey::<V4>::from(&self.token_key)?;
        let token = local::encrypt(&key, &claims, None, None)?;
        let expires_at = OffsetDateTime::now_utc() + Duration::hours(self.token_ttl_hours as i64);

        Ok(IssuedToken { token, expires_at })
    }

    /// Stateless verification: signature, expiry, issuer, audience. No user
    /// lookup happens here.
    pub fn authenticate(&self, token: &str) -> Result<Option<AuthSession>> {
        let claims = match self.decrypt_claims(token)? {
            Some(claims) => claims,
            None => return Ok(None),
        };
        let user_id = claim_uuid(&claims, "sub")?;
        Ok(Some(AuthSession { user_id }))
    }

    fn decrypt_claims(&self, token: &str) -> Result<Option<Claims>> {
        let key = SymmetricKey::<V4>::from(&self.token_key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with("grain");
        rules.validate_audience_with("grain");

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        Ok(trusted.payload_claims().cloned())
    }
}

pub(crate) fn user_from_row(row: &sqlx::postgres::PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        followers: row.get("followers"),
        following: row.get("following"),
        created_at: row.get("created_at"),
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn claim_uuid(claims: &Claims, name: &str) -> Result<Uuid> {
    let value = claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("missing {} claim", name))?;
    Ok(Uuid::parse_str(value)?)
}
