//! HTTP integration tests driving the router in-process.

mod common;

use axum::http::{StatusCode, header};
use serde_json::json;

use common::{TestApp, UploadRequest, basic, bearer};
use wheelhouse::store::Store;
use wheelhouse::types::Capability;

const WHEEL: &[u8] = b"PK\x03\x04 not really a wheel";

fn uploader(app: &TestApp) -> wheelhouse::types::User {
    app.user("uploader", "secret-pw", &Capability::UPLOADER)
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let resp = app.get("/health", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.text(), "OK");
}

#[tokio::test]
async fn test_upload_list_and_download() {
    let app = TestApp::new();
    let admin = app.admin();
    let admin_auth = bearer(&app.token(&admin));
    uploader(&app);
    let auth = basic("uploader", "secret-pw");

    let resp = app
        .json(
            "PUT",
            "/api/feature/download_stats",
            Some(&admin_auth),
            json!({"value": true}),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app
        .upload(
            &auth,
            &UploadRequest::new("demo", "1.0.0", "demo-1.0.0-py3-none-any.whl", WHEEL),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    let body = resp.json();
    assert_eq!(body["data"]["package"], "demo");
    assert_eq!(body["data"]["version"], "1.0.0");
    let path = body["data"]["path"].as_str().unwrap().to_string();
    assert!(path.starts_with("/packages/"));
    assert!(path.ends_with("/demo-1.0.0-py3-none-any.whl"));

    let resp = app.get("/simple/", Some(&auth)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.text().contains("<a href=\"/simple/demo/\">demo</a>"));

    let resp = app.get("/simple/demo/", Some(&auth)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let html = resp.text();
    assert!(html.contains(&path));
    assert!(html.contains("#sha256="));

    let resp = app.get(&path, Some(&auth)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(&resp.body[..], WHEEL);
    assert_eq!(
        resp.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"demo-1.0.0-py3-none-any.whl\""
    );

    let resp = app.get("/api/stats/server", Some(&admin_auth)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let stats = resp.json();
    assert_eq!(stats["data"]["packages"], 1);
    assert_eq!(stats["data"]["downloads"], 1);

    let resp = app
        .get(
            "/api/stats/download/package?granularity=weekly",
            Some(&admin_auth),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let series = resp.json();
    assert_eq!(series["data"].as_array().unwrap().len(), 1);
    assert_eq!(series["data"][0]["downloads"], 1);
}

#[tokio::test]
async fn test_bearer_token_can_upload() {
    let app = TestApp::new();
    let user = uploader(&app);
    let auth = bearer(&app.token(&user));

    let resp = app
        .upload(&auth, &UploadRequest::new("demo", "0.1.0", "demo-0.1.0.tar.gz", WHEEL))
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
}

#[tokio::test]
async fn test_upload_rejects_bad_credentials() {
    let app = TestApp::new();
    uploader(&app);

    let resp = app
        .upload(
            &basic("uploader", "wrong-password"),
            &UploadRequest::new("demo", "1.0.0", "demo-1.0.0.tar.gz", WHEEL),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert!(resp.headers.contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn test_upload_requires_create_for_new_package() {
    let app = TestApp::new();
    app.user("reader", "reader-pw", &[Capability::List, Capability::Download]);

    let resp = app
        .upload(
            &basic("reader", "reader-pw"),
            &UploadRequest::new("demo", "1.0.0", "demo-1.0.0.tar.gz", WHEEL),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert!(app.state.store.get_package_by_name("demo").unwrap().is_none());
}

#[tokio::test]
async fn test_upload_same_file_twice_is_forbidden() {
    let app = TestApp::new();
    uploader(&app);
    let auth = basic("uploader", "secret-pw");
    let form = UploadRequest::new("demo", "1.0.0", "demo-1.0.0.tar.gz", WHEEL);

    assert_eq!(app.upload(&auth, &form).await.status, StatusCode::OK);
    let resp = app.upload(&auth, &form).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.json()["error"], "file already exists");
}

#[tokio::test]
async fn test_upload_actions() {
    let app = TestApp::new();
    uploader(&app);
    let auth = basic("uploader", "secret-pw");

    let mut form = UploadRequest::new("demo", "1.0.0", "demo-1.0.0.tar.gz", WHEEL);
    form.action = "submit";
    assert_eq!(app.upload(&auth, &form).await.status, StatusCode::NOT_ACCEPTABLE);

    form.action = "doc_upload";
    assert_eq!(app.upload(&auth, &form).await.status, StatusCode::NOT_ACCEPTABLE);

    form.action = "bogus";
    assert_eq!(app.upload(&auth, &form).await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_invalid_version() {
    let app = TestApp::new();
    uploader(&app);

    let resp = app
        .upload(
            &basic("uploader", "secret-pw"),
            &UploadRequest::new("demo", "  ", "demo.tar.gz", WHEEL),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_versions_are_ordered() {
    let app = TestApp::new();
    let admin = app.admin();
    uploader(&app);
    let auth = basic("uploader", "secret-pw");

    for version in ["1.0.0", "2.0.0", "1.5.0", "nightly"] {
        let filename = format!("demo-{version}.tar.gz");
        let resp = app
            .upload(&auth, &UploadRequest::new("demo", version, &filename, WHEEL))
            .await;
        assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    }

    let package = app.state.store.get_package_by_name("demo").unwrap().unwrap();
    let resp = app
        .get(
            &format!("/api/package/{}", package.id),
            Some(&bearer(&app.token(&admin))),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let body = resp.json();
    let versions = body["data"]["versions"].as_array().unwrap();
    let order = |v: &str| {
        versions
            .iter()
            .find(|item| item["version"] == v)
            .map(|item| item["version_order"].as_i64().unwrap())
            .unwrap()
    };
    assert_eq!(order("1.0.0"), 1);
    assert_eq!(order("1.5.0"), 2);
    assert_eq!(order("2.0.0"), 3);
    assert_eq!(order("nightly"), 0);
    assert_eq!(versions[0]["files"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_license_and_classifiers_are_recorded() {
    let app = TestApp::new();
    let admin = app.admin();
    uploader(&app);

    let mut form = UploadRequest::new("demo", "1.0.0", "demo-1.0.0.tar.gz", WHEEL);
    form.license = "MIT";
    form.classifiers = vec!["Programming Language :: Python", "License :: OSI Approved"];
    let resp = app.upload(&basic("uploader", "secret-pw"), &form).await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());

    let admin_auth = bearer(&app.token(&admin));
    let package = app.state.store.get_package_by_name("demo").unwrap().unwrap();
    let body = app
        .get(&format!("/api/package/{}", package.id), Some(&admin_auth))
        .await
        .json();
    let version = &body["data"]["versions"][0];
    assert_eq!(version["license"]["code"], "MIT");
    assert_eq!(version["classifiers"].as_array().unwrap().len(), 2);

    let licenses = app.get("/api/license", Some(&admin_auth)).await.json();
    assert_eq!(licenses["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_simple_lookup_normalizes_names() {
    let app = TestApp::new();
    uploader(&app);
    let auth = basic("uploader", "secret-pw");

    let resp = app
        .upload(
            &auth,
            &UploadRequest::new("My_Package", "1.0.0", "My_Package-1.0.0.tar.gz", WHEEL),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());

    assert_eq!(app.get("/simple/My_Package/", Some(&auth)).await.status, StatusCode::OK);
    assert_eq!(app.get("/simple/my-package/", Some(&auth)).await.status, StatusCode::OK);
    assert_eq!(app.get("/simple/my.package", Some(&auth)).await.status, StatusCode::OK);
    assert_eq!(
        app.get("/simple/other/", Some(&auth)).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_simple_index_requires_list() {
    let app = TestApp::new();
    app.user("downloader", "download-pw", &[Capability::Download]);

    let resp = app
        .get("/simple/", Some(&basic("downloader", "download-pw")))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app.get("/simple/", None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_download_unknown_file() {
    let app = TestApp::new();
    uploader(&app);

    let resp = app
        .get(
            "/packages/ab/cd/missing.tar.gz",
            Some(&basic("uploader", "secret-pw")),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_and_profile() {
    let app = TestApp::new();
    uploader(&app);

    let resp = app
        .json(
            "POST",
            "/api/login",
            None,
            json!({"username": "uploader", "password": "secret-pw"}),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let token = resp.json()["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(resp.headers[header::AUTHORIZATION], bearer(&token).as_str());

    let auth = bearer(&token);
    let me = app.get("/api/me", Some(&auth)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["data"]["username"], "uploader");
    assert!(me.json()["data"].get("password").is_none());

    let resp = app
        .json(
            "POST",
            "/api/me",
            Some(&auth),
            json!({"email": "uploader@example.com", "first_name": "Up"}),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["data"]["email"], "uploader@example.com");

    let resp = app.get("/api/me/package", Some(&auth)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.json()["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = TestApp::new();
    uploader(&app);

    let resp = app
        .json(
            "POST",
            "/api/login",
            None,
            json!({"username": "uploader", "password": "nope-nope"}),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new();
    let user = uploader(&app);
    let auth = bearer(&app.token(&user));

    let resp = app
        .json(
            "POST",
            "/api/me/password",
            Some(&auth),
            json!({"current_password": "wrong-one", "new_password": "fresh-pw"}),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .json(
            "POST",
            "/api/me/password",
            Some(&auth),
            json!({"current_password": "secret-pw", "new_password": "fresh-pw"}),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app
        .get("/simple/", Some(&basic("uploader", "fresh-pw")))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn test_token_for_unknown_user_is_bad_request() {
    let app = TestApp::new();
    let ghost = wheelhouse::types::User::new("ghost-user");

    let resp = app.get("/api/me", Some(&bearer(&app.token(&ghost)))).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = TestApp::new();

    let resp = app.get("/api/me", Some("Bearer not.a.token")).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = app.get("/api/me", None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_inactive_user_is_forbidden() {
    let app = TestApp::new();
    let mut user = uploader(&app);
    user.is_active = false;
    app.state.store.update_user(&user).unwrap();

    let resp = app.get("/api/me", Some(&bearer(&app.token(&user)))).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let app = TestApp::new();
    let user = uploader(&app);

    let resp = app.get("/api/user", Some(&bearer(&app.token(&user)))).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_user_management() {
    let app = TestApp::new();
    let admin = app.admin();
    let auth = bearer(&app.token(&admin));

    let resp = app
        .json(
            "POST",
            "/api/user",
            Some(&auth),
            json!({
                "username": "newbie",
                "password": "newbie-pw",
                "email": "newbie@example.com",
                "can_list": true,
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
    let created = resp.json();
    let id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["is_active"], true);
    assert_eq!(created["data"]["can_list"], true);
    assert_eq!(created["data"]["can_create"], false);

    let resp = app
        .json(
            "POST",
            "/api/user",
            Some(&auth),
            json!({"username": "newbie", "password": "other-pw"}),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    let resp = app
        .json(
            "POST",
            "/api/user",
            Some(&auth),
            json!({"username": "no", "password": "short-ok"}),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .json(
            "PUT",
            &format!("/api/user/{id}"),
            Some(&auth),
            json!({"can_create": true, "is_active": false}),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["data"]["can_create"], true);
    assert_eq!(resp.json()["data"]["is_active"], false);

    let resp = app.get("/api/user", Some(&auth)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let users = resp.json();
    assert_eq!(users["data"].as_array().unwrap().len(), 2);
    assert_eq!(users["has_more"], false);

    let resp = app.get("/api/user/not-a-user", Some(&auth)).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_maintainer_management() {
    let app = TestApp::new();
    let admin = app.admin();
    let auth = bearer(&app.token(&admin));
    uploader(&app);
    app.user("helper", "helper-pw", &[Capability::Update]);

    let resp = app
        .upload(
            &basic("uploader", "secret-pw"),
            &UploadRequest::new("demo", "1.0.0", "demo-1.0.0.tar.gz", WHEEL),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let package = app.state.store.get_package_by_name("demo").unwrap().unwrap();
    let base = format!("/api/package/{}/maintainer", package.id);

    let resp = app
        .json("POST", &base, Some(&auth), json!({"username": "helper"}))
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let helper_id = resp.json()["data"]["id"].as_str().unwrap().to_string();

    let resp = app
        .upload(
            &basic("helper", "helper-pw"),
            &UploadRequest::new("demo", "1.1.0", "demo-1.1.0.tar.gz", WHEEL),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());

    let resp = app.get(&base, Some(&auth)).await;
    assert_eq!(resp.json()["data"].as_array().unwrap().len(), 2);

    let remove = axum::http::Request::delete(format!("{base}/{helper_id}"))
        .header(header::AUTHORIZATION, &auth)
        .body(axum::body::Body::empty())
        .unwrap();
    assert_eq!(app.send(remove).await.status, StatusCode::NO_CONTENT);

    let remove = axum::http::Request::delete(format!("{base}/{helper_id}"))
        .header(header::AUTHORIZATION, &auth)
        .body(axum::body::Body::empty())
        .unwrap();
    assert_eq!(app.send(remove).await.status, StatusCode::NOT_FOUND);

    let resp = app
        .upload(
            &basic("helper", "helper-pw"),
            &UploadRequest::new("demo", "1.2.0", "demo-1.2.0.tar.gz", WHEEL),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_package_search() {
    let app = TestApp::new();
    let admin = app.admin();
    let auth = bearer(&app.token(&admin));
    uploader(&app);
    let upload_auth = basic("uploader", "secret-pw");

    for name in ["alpha", "beta", "alphabet"] {
        let filename = format!("{name}-1.0.0.tar.gz");
        let resp = app
            .upload(&upload_auth, &UploadRequest::new(name, "1.0.0", &filename, WHEEL))
            .await;
        assert_eq!(resp.status, StatusCode::OK);
    }

    let resp = app.get("/api/package?search=alpha", Some(&auth)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let names: Vec<String> = resp.json()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["alpha", "alphabet"]);
}

#[tokio::test]
async fn test_features_and_platforms() {
    let app = TestApp::new();
    let admin = app.admin();
    let auth = bearer(&app.token(&admin));

    let resp = app.get("/api/feature", Some(&auth)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(!resp.json()["data"].as_array().unwrap().is_empty());

    let resp = app.get("/api/feature/download_stats", Some(&auth)).await;
    assert_eq!(resp.json()["data"]["value"], false);

    let resp = app.get("/api/feature/unknown", Some(&auth)).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app.get("/api/platform", Some(&auth)).await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app.get("/api/platform/42", Some(&auth)).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_rejects_unknown_granularity() {
    let app = TestApp::new();
    let admin = app.admin();

    let resp = app
        .get(
            "/api/stats/download/package?granularity=daily",
            Some(&bearer(&app.token(&admin))),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_head_is_not_counted_as_download() {
    let app = TestApp::new();
    let admin = app.admin();
    let admin_auth = bearer(&app.token(&admin));
    uploader(&app);
    let auth = basic("uploader", "secret-pw");
    app.state
        .store
        .set_feature(wheelhouse::types::FEATURE_DOWNLOAD_STATS, true)
        .unwrap();

    let resp = app
        .upload(&auth, &UploadRequest::new("demo", "1.0.0", "demo-1.0.0.tar.gz", WHEEL))
        .await;
    let path = resp.json()["data"]["path"].as_str().unwrap().to_string();

    for _ in 0..3 {
        let head = axum::http::Request::head(&path)
            .header(header::AUTHORIZATION, &auth)
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(app.send(head).await.status, StatusCode::OK);
    }

    let stats = app.get("/api/stats/server", Some(&admin_auth)).await.json();
    assert_eq!(stats["data"]["downloads"], 0);

    assert_eq!(app.get(&path, Some(&auth)).await.status, StatusCode::OK);
    let stats = app.get("/api/stats/server", Some(&admin_auth)).await.json();
    assert_eq!(stats["data"]["downloads"], 1);
}

#[tokio::test]
async fn test_unusual_filenames_stay_downloadable() {
    let app = TestApp::new();
    uploader(&app);
    let auth = basic("uploader", "secret-pw");

    for (filename, encoded) in [
        ("demo%41-1.0.0.tar.gz", "demo%2541-1.0.0.tar.gz"),
        ("demo#x-1.0.0.tar.gz", "demo%23x-1.0.0.tar.gz"),
        ("demo x?-1.0.0.tar.gz", "demo%20x%3F-1.0.0.tar.gz"),
        ("pkg..dev-1.0.0.tar.gz", "pkg..dev-1.0.0.tar.gz"),
    ] {
        let resp = app
            .upload(&auth, &UploadRequest::new("demo", "1.0.0", filename, WHEEL))
            .await;
        assert_eq!(resp.status, StatusCode::OK, "{filename}: {}", resp.text());
        let path = resp.json()["data"]["path"].as_str().unwrap().to_string();
        assert!(path.ends_with(&format!("/{encoded}")), "{path}");

        let html = app.get("/simple/demo/", Some(&auth)).await.text();
        assert!(html.contains(&format!("{path}#sha256=")), "{html}");

        let resp = app.get(&path, Some(&auth)).await;
        assert_eq!(resp.status, StatusCode::OK, "{path}");
        assert_eq!(&resp.body[..], WHEEL);
    }
}
