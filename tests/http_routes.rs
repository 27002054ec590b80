use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use quill::application::posts::PostService;
use quill::infra::http::{HttpState, build_router};
use quill::infra::storage::JsonFileStore;

struct TestApp {
    router: Router,
    storage_path: PathBuf,
    _dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage_path = dir.path().join("posts.json");
        let store = JsonFileStore::new(storage_path.clone()).expect("store");
        let posts = Arc::new(PostService::new(Arc::new(store)));

        Self {
            router: build_router(HttpState { posts }),
            storage_path,
            _dir: dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond")
    }

    async fn get(&self, uri: &str) -> Response {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("request should build");
        self.send(request).await
    }

    async fn post_form(&self, uri: &str, form: &str) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .expect("request should build");
        self.send(request).await
    }

    fn stored(&self) -> Value {
        let raw = std::fs::read_to_string(&self.storage_path).expect("storage file");
        serde_json::from_str(&raw).expect("storage is json")
    }

    fn write_storage(&self, contents: &str) {
        std::fs::write(&self.storage_path, contents).expect("write storage");
    }
}

async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

fn assert_redirects_to_index(response: &Response) {
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/")
    );
}

#[tokio::test]
async fn empty_storage_lists_no_posts_and_creates_file() {
    let app = TestApp::new();

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("No posts yet"));
    assert_eq!(app.stored(), json!([]));
}

#[tokio::test]
async fn add_form_renders() {
    let app = TestApp::new();

    let response = app.get("/add").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("action=\"/add\""));
    assert!(html.contains("name=\"title\""));
    assert!(html.contains("name=\"author\""));
    assert!(html.contains("name=\"content\""));
}

#[tokio::test]
async fn post_lifecycle_follows_expected_states() {
    let app = TestApp::new();

    let response = app.post_form("/add", "title=Hi&author=A&content=C").await;
    assert_redirects_to_index(&response);
    assert_eq!(
        app.stored(),
        json!([{"id": 1, "title": "Hi", "author": "A", "content": "C", "likes": 0}])
    );

    let html = body_text(app.get("/").await).await;
    assert!(html.contains("Hi"));
    assert!(html.contains("0 likes"));

    assert_redirects_to_index(&app.get("/like/1").await);
    assert_eq!(app.stored()[0]["likes"], json!(1));

    let response = app.get("/update/1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("value=\"Hi\""));
    assert!(html.contains("action=\"/update/1\""));

    let response = app.post_form("/update/1", "title=Bye&author=A&content=C").await;
    assert_redirects_to_index(&response);
    assert_eq!(
        app.stored(),
        json!([{"id": 1, "title": "Bye", "author": "A", "content": "C", "likes": 1}])
    );

    assert_redirects_to_index(&app.get("/delete/1").await);
    assert_eq!(app.stored(), json!([]));
}

#[tokio::test]
async fn ids_continue_from_the_maximum_after_deletes() {
    let app = TestApp::new();

    for title in ["a", "b", "c"] {
        let form = format!("title={title}&author=x&content=y");
        assert_redirects_to_index(&app.post_form("/add", &form).await);
    }
    assert_redirects_to_index(&app.get("/delete/2").await);
    assert_redirects_to_index(&app.post_form("/add", "title=d&author=x&content=y").await);

    let ids: Vec<u64> = app
        .stored()
        .as_array()
        .expect("array")
        .iter()
        .map(|post| post["id"].as_u64().expect("id"))
        .collect();
    assert_eq!(ids, vec![1, 3, 4]);
}

#[tokio::test]
async fn missing_form_fields_are_stored_empty() {
    let app = TestApp::new();

    assert_redirects_to_index(&app.post_form("/add", "title=Only").await);
    assert_eq!(
        app.stored(),
        json!([{"id": 1, "title": "Only", "author": "", "content": "", "likes": 0}])
    );
}

#[tokio::test]
async fn form_values_are_url_decoded() {
    let app = TestApp::new();

    let form = "title=Hello+World&author=J%C3%B6rg&content=a%26b%3Dc";
    assert_redirects_to_index(&app.post_form("/add", form).await);

    let stored = app.stored();
    assert_eq!(stored[0]["title"], json!("Hello World"));
    assert_eq!(stored[0]["author"], json!("Jörg"));
    assert_eq!(stored[0]["content"], json!("a&b=c"));
}

#[tokio::test]
async fn update_of_unknown_post_is_not_found() {
    let app = TestApp::new();
    app.post_form("/add", "title=Hi&author=A&content=C").await;
    let before = app.stored();

    let response = app.get("/update/99").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.post_form("/update/99", "title=x&author=y&content=z").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    assert_eq!(app.stored(), before);
}

#[tokio::test]
async fn delete_and_like_of_unknown_post_redirect_without_changes() {
    let app = TestApp::new();
    app.post_form("/add", "title=Hi&author=A&content=C").await;
    let before = app.stored();

    assert_redirects_to_index(&app.get("/delete/42").await);
    assert_redirects_to_index(&app.get("/like/42").await);

    assert_eq!(app.stored(), before);
}

#[tokio::test]
async fn like_only_touches_the_target_post() {
    let app = TestApp::new();
    for title in ["a", "b", "c"] {
        app.post_form("/add", &format!("title={title}&author=x&content=y")).await;
    }

    app.get("/like/2").await;
    app.get("/like/2").await;

    let likes: Vec<u64> = app
        .stored()
        .as_array()
        .expect("array")
        .iter()
        .map(|post| post["likes"].as_u64().expect("likes"))
        .collect();
    assert_eq!(likes, vec![0, 2, 0]);
}

#[tokio::test]
async fn non_numeric_post_ids_do_not_match() {
    let app = TestApp::new();

    for uri in ["/update/abc", "/delete/-1", "/like/1.5", "/like/+1"] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {uri}");
    }
}

#[tokio::test]
async fn malformed_storage_is_listed_as_empty_and_then_overwritten() {
    let app = TestApp::new();
    app.write_storage("{definitely not json");

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("No posts yet"));

    app.post_form("/add", "title=Fresh&author=A&content=C").await;
    assert_eq!(
        app.stored(),
        json!([{"id": 1, "title": "Fresh", "author": "A", "content": "C", "likes": 0}])
    );
}

#[tokio::test]
async fn like_defaults_missing_counter_to_zero() {
    let app = TestApp::new();
    app.write_storage(r#"[{"id": 8, "title": "old", "author": "a", "content": "c"}]"#);

    assert_redirects_to_index(&app.get("/like/8").await);
    assert_eq!(app.stored()[0]["likes"], json!(1));
}

#[tokio::test]
async fn health_reports_no_content() {
    let app = TestApp::new();

    let response = app.get("/_health").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn unreadable_storage_surfaces_server_error() {
    let app = TestApp::new();
    std::fs::create_dir(&app.storage_path).expect("directory in place of file");

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = app.get("/_health").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn concurrent_likes_are_all_counted() {
    let app = TestApp::new();
    app.post_form("/add", "title=Hi&author=A&content=C").await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let router = app.router.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .uri("/like/1")
                .body(Body::empty())
                .expect("request should build");
            router.oneshot(request).await.expect("router should respond")
        }));
    }
    for handle in handles {
        let response = handle.await.expect("join");
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    assert_eq!(app.stored()[0]["likes"], json!(20));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn first_access_under_concurrent_reads_keeps_the_new_post() {
    for _ in 0..50 {
        let app = TestApp::new();

        let mut handles = Vec::new();
        let router = app.router.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .method(Method::POST)
                .uri("/add")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("title=x"))
                .expect("request should build");
            router.oneshot(request).await.expect("router should respond")
        }));
        for _ in 0..7 {
            let router = app.router.clone();
            handles.push(tokio::spawn(async move {
                let request = Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .expect("request should build");
                router.oneshot(request).await.expect("router should respond")
            }));
        }

        for handle in handles {
            let status = handle.await.expect("join").status();
            assert!(
                status == StatusCode::OK || status == StatusCode::FOUND,
                "unexpected status {status}"
            );
        }

        let stored = app.stored();
        assert_eq!(stored.as_array().map(Vec::len), Some(1));
        assert_eq!(stored[0]["title"], json!("x"));
    }
}

#[tokio::test]
async fn add_without_a_form_body_stores_empty_fields() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/add")
        .body(Body::empty())
        .expect("request should build");
    assert_redirects_to_index(&app.send(request).await);

    assert_eq!(
        app.stored(),
        json!([{"id": 1, "title": "", "author": "", "content": "", "likes": 0}])
    );
}

fn multipart_request(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    const BOUNDARY: &str = "quill-form-boundary";

    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request should build")
}

#[tokio::test]
async fn multipart_submissions_are_accepted() {
    let app = TestApp::new();

    let response = app.send(multipart_request("/add", &[("title", "Hi")])).await;
    assert_redirects_to_index(&response);
    assert_eq!(
        app.stored(),
        json!([{"id": 1, "title": "Hi", "author": "", "content": "", "likes": 0}])
    );

    let fields = [("title", "Bye"), ("author", "A"), ("content", "two\r\nlines")];
    let response = app.send(multipart_request("/update/1", &fields)).await;
    assert_redirects_to_index(&response);
    assert_eq!(
        app.stored(),
        json!([{"id": 1, "title": "Bye", "author": "A", "content": "two\r\nlines", "likes": 0}])
    );
}
