use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use service::backend::repository::mock::MemoryBackend;
use service::backend::Collection;
use service::Storefront;
use tower::ServiceExt;

fn build_app() -> (MemoryBackend, Router) {
    let mem = MemoryBackend::new();
    let storefront = Storefront::new(mem.backend(), &configs::AppConfig::default());
    let router = server::startup::app(storefront);
    (mem, router)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(res: axum::response::Response) -> anyhow::Result<Value> {
    let bytes = to_bytes(res.into_body(), usize::MAX).await?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

fn registration() -> Value {
    json!({
        "full_name": "Ana Souza",
        "email": "ana@loja.com",
        "phone": "(11) 98765-4321",
        "password": "secret1",
        "confirm": "secret1"
    })
}

#[tokio::test]
async fn test_register_and_login_flow() -> anyhow::Result<()> {
    let (mem, app) = build_app();

    let res = app.clone().oneshot(post_json("/auth/register", registration())).await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(mem.data.rows(Collection::Profiles).len(), 1);

    let res = app
        .clone()
        .oneshot(post_json("/auth/login", json!({"email": "ana@loja.com", "password": "secret1"})))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("auth_token="));
    let body = body_json(res).await?;
    assert_eq!(body["full_name"], "Ana Souza");

    // The cookie alone authenticates the profile route.
    let pair = cookie.split(';').next().unwrap_or_default().to_string();
    let req = Request::builder().uri("/profile").header(header::COOKIE, pair).body(Body::empty())?;
    let res = app.clone().oneshot(req).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let profile = body_json(res).await?;
    assert_eq!(profile["phone"], "(11) 98765-4321");
    assert_eq!(profile["avatar_url"], configs::PLACEHOLDER_AVATAR_URL);
    Ok(())
}

#[tokio::test]
async fn register_validation_lists_every_field() -> anyhow::Result<()> {
    let (_, app) = build_app();
    let mut bad = registration();
    bad["email"] = json!("ana");
    bad["confirm"] = json!("other");
    let res = app.oneshot(post_json("/auth/register", bad)).await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(res).await?;
    assert!(body["fields"]["email"].is_string());
    assert!(body["fields"]["confirm"].is_string());
    Ok(())
}

#[tokio::test]
async fn wrong_password_shows_platform_message() -> anyhow::Result<()> {
    let (_, app) = build_app();
    app.clone().oneshot(post_json("/auth/register", registration())).await?;
    let res = app
        .oneshot(post_json("/auth/login", json!({"email": "ana@loja.com", "password": "wrong!"})))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(res).await?;
    assert_eq!(body["notification"]["message"], "Error: Invalid login credentials");
    Ok(())
}

#[tokio::test]
async fn logout_revokes_token() -> anyhow::Result<()> {
    let (mem, app) = build_app();
    mem.auth.add_user("ana@loja.com", "secret1", json!({"full_name": "Ana"}));
    let token = mem.auth.issue_token("ana@loja.com").unwrap();
    let bearer = format!("Bearer {token}");

    let req = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .header(header::AUTHORIZATION, bearer.clone())
        .body(Body::empty())?;
    let res = app.clone().oneshot(req).await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let req = Request::builder().uri("/profile").header(header::AUTHORIZATION, bearer).body(Body::empty())?;
    let res = app.oneshot(req).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn profile_update_and_password_change() -> anyhow::Result<()> {
    let (mem, app) = build_app();
    mem.auth.add_user("ana@loja.com", "secret1", json!({"full_name": "Ana"}));
    let token = mem.auth.issue_token("ana@loja.com").unwrap();
    let bearer = format!("Bearer {token}");

    let req = Request::builder()
        .method("PUT")
        .uri("/profile")
        .header(header::AUTHORIZATION, bearer.clone())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"full_name": "Ana Lima", "phone": "(21) 91234-5678"}).to_string()))?;
    let res = app.clone().oneshot(req).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await?["full_name"], "Ana Lima");

    let req = Request::builder()
        .method("POST")
        .uri("/profile/avatar?file_name=eu.jpg")
        .header(header::AUTHORIZATION, bearer.clone())
        .header(header::CONTENT_TYPE, "image/jpeg")
        .body(Body::from(vec![0xff, 0xd8, 0xff]))?;
    let res = app.clone().oneshot(req).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let profile = body_json(res).await?;
    assert_eq!(profile["full_name"], "Ana Lima");
    assert!(profile["avatar_url"].as_str().unwrap_or_default().ends_with(".jpg"));

    let req = Request::builder()
        .method("POST")
        .uri("/auth/update-password")
        .header(header::AUTHORIZATION, bearer)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"password": "novasenha", "confirm": "novasenha"}).to_string()))?;
    assert_eq!(app.clone().oneshot(req).await?.status(), StatusCode::NO_CONTENT);

    let res = app
        .oneshot(post_json("/auth/login", json!({"email": "ana@loja.com", "password": "novasenha"})))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn forgot_password_is_accepted() -> anyhow::Result<()> {
    let (mem, app) = build_app();
    let res = app.oneshot(post_json("/auth/forgot-password", json!({"email": "ana@loja.com"}))).await?;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    assert_eq!(mem.auth.recovery_requests().len(), 1);
    Ok(())
}
