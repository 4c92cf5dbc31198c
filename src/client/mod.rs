//! HTTP client for the grain API.
//!
//! Credentials live in an explicit [`Session`] owned by the client rather
//! than any global storage: the bearer token is attached to every outgoing
//! request while present, and any 401 from the server clears it, dropping
//! the client back to anonymous.

mod session;

pub use session::Session;

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::post::{Comment, Post};
use crate::domain::user::{Profile, User};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server rejected the credential. The session has been cleared.
    #[error("not authenticated")]
    Unauthorized,

    #[error("api error ({status}): {msg}")]
    Api { status: u16, msg: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("session storage error: {0}")]
    Session(#[from] std::io::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
    msg: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct SignupResponse {
    user: User,
    token: String,
}

#[derive(Deserialize)]
struct FollowingResponse {
    following: Vec<Uuid>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Session) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.token().is_some()
    }

    /// Drop the stored credential and return to anonymous.
    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.session.clear()?;
        Ok(())
    }

    pub async fn signup(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ClientError> {
        let req = self.http.post(self.url("/auth/signup")).json(&serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
        }));
        let resp = self.execute(req).await?;
        let body: SignupResponse = resp.json().await?;
        self.session.store(body.token)?;
        Ok(body.user)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        let req = self.http.post(self.url("/auth/login")).json(&serde_json::json!({
            "email": email,
            "password": password,
        }));
        let resp = self.execute(req).await?;
        let body: TokenResponse = resp.json().await?;
        self.session.store(body.token)?;
        Ok(())
    }

    pub async fn create_post(
        &mut self,
        image_url: &str,
        caption: &str,
    ) -> Result<Post, ClientError> {
        let req = self.http.post(self.url("/posts")).json(&serde_json::json!({
            "imageUrl": image_url,
            "caption": caption,
        }));
        let resp = self.execute(req).await?;
        Ok(resp.json().await?)
    }

    /// The current feed, newest first. Callers refetch after mutations
    /// instead of patching a local copy.
    pub async fn feed(&mut self) -> Result<Vec<Post>, ClientError> {
        let req = self.http.get(self.url("/posts/feed"));
        let resp = self.execute(req).await?;
        Ok(resp.json().await?)
    }

    pub async fn like(&mut self, post_id: Uuid) -> Result<Vec<Uuid>, ClientError> {
        let req = self.http.put(self.url(&format!("/posts/like/{}", post_id)));
        let resp = self.execute(req).await?;
        Ok(resp.json().await?)
    }

    pub async fn unlike(&mut self, post_id: Uuid) -> Result<Vec<Uuid>, ClientError> {
        let req = self
            .http
            .put(self.url(&format!("/posts/unlike/{}", post_id)));
        let resp = self.execute(req).await?;
        Ok(resp.json().await?)
    }

    pub async fn comment(&mut self, post_id: Uuid, text: &str) -> Result<Vec<Comment>, ClientError> {
        let req = self
            .http
            .post(self.url(&format!("/posts/comment/{}", post_id)))
            .json(&serde_json::json!({ "text": text }));
        let resp = self.execute(req).await?;
        Ok(resp.json().await?)
    }

    pub async fn follow(&mut self, user_id: Uuid) -> Result<Vec<Uuid>, ClientError> {
        let req = self
            .http
            .post(self.url(&format!("/users/follow/{}", user_id)));
        let resp = self.execute(req).await?;
        let body: FollowingResponse = resp.json().await?;
        Ok(body.following)
    }

    pub async fn unfollow(&mut self, user_id: Uuid) -> Result<Vec<Uuid>, ClientError> {
        let req = self
            .http
            .post(self.url(&format!("/users/unfollow/{}", user_id)));
        let resp = self.execute(req).await?;
        let body: FollowingResponse = resp.json().await?;
        Ok(body.following)
    }

    pub async fn profile(&mut self, user_id: Uuid) -> Result<Profile, ClientError> {
        let req = self
            .http
            .get(self.url(&format!("/users/profile/{}", user_id)));
        let resp = self.execute(req).await?;
        Ok(resp.json().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the bearer token when present, send, and translate failures.
    /// A 401 clears the session before surfacing.
    async fn execute(
        &mut self,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        let req = match self.session.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        };

        let resp = req.send().await?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.session.clear()?;
            return Err(ClientError::Unauthorized);
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let msg = resp
                .json::<ErrorBody>()
                .await
                .map(|body| body.msg)
                .unwrap_or_default();
            return Err(ClientError::Api { status, msg });
        }

        Ok(resp)
    }
}
