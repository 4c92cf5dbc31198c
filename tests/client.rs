//! The API client exercised over real HTTP against the app.

mod common;

use common::spawn_server;
use grain::client::{ApiClient, ClientError, Session};

fn temp_session_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("grain-client-test-{}", uuid::Uuid::new_v4()))
}

#[tokio::test]
async fn signup_stores_token() {
    let base_url = spawn_server().await;
    let mut client = ApiClient::new(&base_url, Session::in_memory());
    assert!(!client.is_authenticated());

    let user = client
        .signup("cli_signup", "cli_signup@example.com", "password123")
        .await
        .expect("signup failed");

    assert_eq!(user.username, "cli_signup");
    assert!(client.is_authenticated());

    // The stored token is attached to subsequent requests.
    let feed = client.feed().await.expect("feed failed");
    assert!(feed.is_empty());
}

#[tokio::test]
async fn login_and_logout_roundtrip() {
    let base_url = spawn_server().await;
    let app = common::app().await;
    let user = app.create_user("cli_login").await;

    let mut client = ApiClient::new(&base_url, Session::in_memory());
    client
        .login(&user.email, common::DEFAULT_PASSWORD)
        .await
        .expect("login failed");
    assert!(client.is_authenticated());

    client.logout().expect("logout failed");
    assert!(!client.is_authenticated());

    // Anonymous again: protected calls fail without touching the server state.
    let err = client.feed().await.expect_err("feed should fail");
    assert!(matches!(err, ClientError::Unauthorized));
}

#[tokio::test]
async fn bad_credentials_do_not_authenticate() {
    let base_url = spawn_server().await;
    let app = common::app().await;
    let user = app.create_user("cli_badpw").await;

    let mut client = ApiClient::new(&base_url, Session::in_memory());
    let err = client
        .login(&user.email, "wrong-password")
        .await
        .expect_err("login should fail");

    assert!(matches!(err, ClientError::Unauthorized));
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn rejected_token_clears_session() {
    let base_url = spawn_server().await;

    let mut session = Session::in_memory();
    session.store("stale-or-tampered-token".into()).unwrap();
    let mut client = ApiClient::new(&base_url, session);
    assert!(client.is_authenticated());

    let err = client.feed().await.expect_err("feed should fail");

    // 401 drops the client back to anonymous.
    assert!(matches!(err, ClientError::Unauthorized));
    assert!(!client.is_authenticated());
    assert!(client.session().token().is_none());
}

#[tokio::test]
async fn api_errors_are_typed() {
    let base_url = spawn_server().await;
    let mut client = ApiClient::new(&base_url, Session::in_memory());
    client
        .signup("cli_api_err", "cli_api_err@example.com", "password123")
        .await
        .expect("signup failed");

    let err = client
        .like(uuid::Uuid::new_v4())
        .await
        .expect_err("like should fail");

    match err {
        ClientError::Api { status, msg } => {
            assert_eq!(status, 404);
            assert_eq!(msg, "Post not found");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // A plain API error does not touch the credential.
    assert!(client.is_authenticated());
}

#[tokio::test]
async fn file_backed_session_survives_restart() {
    let base_url = spawn_server().await;
    let path = temp_session_path();

    {
        let session = Session::open(&path).expect("open session failed");
        let mut client = ApiClient::new(&base_url, session);
        client
            .signup("cli_persist", "cli_persist@example.com", "password123")
            .await
            .expect("signup failed");
    }

    // A fresh process picks the credential back up from disk.
    let session = Session::open(&path).expect("reopen session failed");
    let mut client = ApiClient::new(&base_url, session);
    assert!(client.is_authenticated());

    let feed = client.feed().await.expect("feed failed");
    assert!(feed.is_empty());

    client.logout().expect("logout failed");
    let session = Session::open(&path).expect("reopen session failed");
    assert!(session.token().is_none());
}

#[tokio::test]
async fn full_scenario_through_the_client() {
    let base_url = spawn_server().await;

    let mut alice = ApiClient::new(&base_url, Session::in_memory());
    let alice_user = alice
        .signup("cli_alice", "cli_alice@example.com", "password123")
        .await
        .expect("alice signup failed");

    let mut bob = ApiClient::new(&base_url, Session::in_memory());
    let bob_user = bob
        .signup("cli_bob", "cli_bob@example.com", "password123")
        .await
        .expect("bob signup failed");

    let following = bob.follow(alice_user.id).await.expect("follow failed");
    assert_eq!(following, vec![alice_user.id]);

    let post = alice
        .create_post("https://example.com/hello.jpg", "hello")
        .await
        .expect("create post failed");

    // The client refetches rather than patching local state.
    let feed = bob.feed().await.expect("feed failed");
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].caption, "hello");
    assert_eq!(feed[0].owner_username.as_deref(), Some("cli_alice"));

    let likes = bob.like(post.id).await.expect("like failed");
    assert_eq!(likes, vec![bob_user.id]);

    let comments = bob
        .comment(post.id, "nice shot")
        .await
        .expect("comment failed");
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "nice shot");

    let likes = bob.unlike(post.id).await.expect("unlike failed");
    assert!(likes.is_empty());

    let profile = bob.profile(alice_user.id).await.expect("profile failed");
    assert_eq!(profile.username, "cli_alice");
    assert_eq!(profile.followers.len(), 1);
    assert_eq!(profile.followers[0].username, "cli_bob");
}
