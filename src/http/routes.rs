use axum::{routing::get, routing::post, routing::put, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users/follow/:id", post(handlers::follow_user))
        .route("/users/unfollow/:id", post(handlers::unfollow_user))
        .route("/users/profile/:id", get(handlers::get_profile))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", post(handlers::create_post))
        .route("/posts/feed", get(handlers::get_feed))
        .route("/posts/like/:id", put(handlers::like_post))
        .route("/posts/unlike/:id", put(handlers::unlike_post))
        .route("/posts/comment/:id", post(handlers::comment_post))
}
