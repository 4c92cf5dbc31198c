use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::posts::{LikeOutcome, PostService, UnlikeOutcome};
use crate::app::users::{FollowOutcome, UnfollowOutcome, UserService};
use crate::domain::post::{Comment, Post};
use crate::domain::user::{Profile, User};
use crate::http::{AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub user: User,
    pub token: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<SignupResponse>, AppError> {
    if payload.username.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.trim().is_empty()
    {
        return Err(AppError::bad_request(
            "username, email and password are required",
        ));
    }

    let service = AuthService::new(state.db.clone(), state.token_key, state.token_ttl_hours);
    let (user, token) = service
        .signup(payload.username, payload.email, payload.password)
        .await
        .map_err(|err| {
            if let Some(sqlx_err) = err.downcast_ref::<sqlx::Error>() {
                if let Some(db_err) = sqlx_err.as_database_error() {
                    if db_err.code().as_deref() == Some("23505") {
                        let constraint = db_err.constraint().unwrap_or_default();
                        if constraint.contains("users_username_key") {
                            return AppError::conflict("Username already taken");
                        }
                        if constraint.contains("users_email_key") {
                            return AppError::conflict("Email already taken");
                        }
                    }
                }
            }
            tracing::error!(error = ?err, "failed to sign up");
            AppError::internal("Server error")
        })?;

    Ok(Json(SignupResponse {
        user,
        token: token.token,
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if payload.email.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("email and password are required"));
    }

    let service = AuthService::new(state.db.clone(), state.token_key, state.token_ttl_hours);
    let token = service
        .login(&payload.email, &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("Server error")
        })?;

    match token {
        Some(token) => Ok(Json(LoginResponse { token: token.token })),
        None => Err(AppError::unauthorized("invalid credentials")),
    }
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreatePostRequest {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub caption: String,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<Post>, AppError> {
    if payload.image_url.trim().is_empty() || payload.caption.trim().is_empty() {
        return Err(AppError::bad_request("imageUrl and caption are required"));
    }

    let service = PostService::new(state.db.clone());
    let post = service
        .create(auth.user_id, payload.image_url, payload.caption)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, owner_id = %auth.user_id, "failed to create post");
            AppError::internal("Server error")
        })?;

    Ok(Json(post))
}

pub async fn get_feed(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Post>>, AppError> {
    let service = PostService::new(state.db.clone());
    let posts = service.feed(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to fetch feed");
        AppError::internal("Server error")
    })?;

    Ok(Json(posts))
}

pub async fn like_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Uuid>>, AppError> {
    let service = PostService::new(state.db.clone());
    let outcome = service.like(id, auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, user_id = %auth.user_id, "failed to like post");
        AppError::internal("Server error")
    })?;

    match outcome {
        LikeOutcome::Updated(likes) => Ok(Json(likes)),
        LikeOutcome::AlreadyLiked => Err(AppError::bad_request("Post already liked")),
        LikeOutcome::NotFound => Err(AppError::not_found("Post not found")),
    }
}

pub async fn unlike_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Uuid>>, AppError> {
    let service = PostService::new(state.db.clone());
    let outcome = service.unlike(id, auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, user_id = %auth.user_id, "failed to unlike post");
        AppError::internal("Server error")
    })?;

    match outcome {
        UnlikeOutcome::Updated(likes) => Ok(Json(likes)),
        UnlikeOutcome::NotLiked => Err(AppError::bad_request("Post not liked yet")),
        UnlikeOutcome::NotFound => Err(AppError::not_found("Post not found")),
    }
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

pub async fn comment_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let service = PostService::new(state.db.clone());
    let comments = service
        .add_comment(id, auth.user_id, payload.text)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, user_id = %auth.user_id, "failed to comment on post");
            AppError::internal("Server error")
        })?;

    match comments {
        Some(comments) => Ok(Json(comments)),
        None => Err(AppError::not_found("Post not found")),
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct FollowResponse {
    pub following: Vec<Uuid>,
}

pub async fn follow_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FollowResponse>, AppError> {
    let service = UserService::new(state.db.clone());
    let outcome = service.follow(auth.user_id, id).await.map_err(|err| {
        tracing::error!(error = ?err, acting_id = %auth.user_id, target_id = %id, "failed to follow user");
        AppError::internal("Server error")
    })?;

    match outcome {
        FollowOutcome::Updated(following) => Ok(Json(FollowResponse { following })),
        FollowOutcome::AlreadyFollowing => Err(AppError::bad_request("Already following")),
        FollowOutcome::NotFound => Err(AppError::not_found("User not found")),
    }
}

pub async fn unfollow_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FollowResponse>, AppError> {
    let service = UserService::new(state.db.clone());
    let outcome = service.unfollow(auth.user_id, id).await.map_err(|err| {
        tracing::error!(error = ?err, acting_id = %auth.user_id, target_id = %id, "failed to unfollow user");
        AppError::internal("Server error")
    })?;

    match outcome {
        UnfollowOutcome::Updated(following) => Ok(Json(FollowResponse { following })),
        UnfollowOutcome::NotFollowing => Err(AppError::bad_request("Not following")),
        UnfollowOutcome::NotFound => Err(AppError::not_found("User not found")),
    }
}

pub async fn get_profile(
    Path(id): Path<Uuid>,
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Profile>, AppError> {
    let service = UserService::new(state.db.clone());
    let profile = service.get_profile(id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %id, "failed to fetch profile");
        AppError::internal("Server error")
    })?;

    match profile {
        Some(profile) => Ok(Json(profile)),
        None => Err(AppError::not_found("User not found")),
    }
}
