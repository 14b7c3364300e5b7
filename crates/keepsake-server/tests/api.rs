use std::collections::HashMap;

use keepsake_api::{AppState, AppStateInner};
use keepsake_db::Database;
use keepsake_storage::Storage;
use keepsake_types::api::{
    CouponResponse, IngestReport, MemoryListResponse, MemoryResponse, ReasonResponse,
    SetOrderResponse, VersionResponse,
};

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "s3cret";

struct TestServer {
    base: String,
    state: AppState,
    _dir: tempfile::TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

async fn spawn_server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("test.db")).unwrap();
    keepsake_api::auth::seed_admin(&db, ADMIN_EMAIL, ADMIN_PASSWORD).unwrap();
    let storage = Storage::new(dir.path().join("media"), "").await.unwrap();
    let state = AppStateInner::new(db, storage, "test-secret".to_string(), None);

    let app = keepsake_api::router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{}", addr),
        state,
        _dir: dir,
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

async fn login(server: &TestServer, client: &reqwest::Client) {
    let resp = client
        .post(server.url("/api/auth/login"))
        .json(&serde_json::json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

fn tiny_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 60, 60, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

async fn create_youtube(
    server: &TestServer,
    client: &reqwest::Client,
    title: &str,
    date: &str,
) -> MemoryResponse {
    let resp = client
        .post(server.url("/api/memories/youtube"))
        .json(&serde_json::json!({
            "title": title,
            "description": null,
            "date": date,
            "url": "https://youtube.com/watch?v=abc",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn guard_redirects_follow_the_session() {
    let server = spawn_server().await;
    let anon = client();

    // Anonymous: admin, login and other private pages bounce to the gallery.
    for path in ["/admin", "/login", "/cupons", "/raspadinha"] {
        let resp = anon.get(server.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 303, "path {}", path);
        assert_eq!(resp.headers()["location"], "/");
    }

    // Public surface stays open.
    for path in ["/", "/api/health", "/api/memories"] {
        let resp = anon.get(server.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 200, "path {}", path);
    }

    // Logged in: the login page bounces to the panel, the panel opens.
    let authed = client();
    login(&server, &authed).await;
    let resp = authed.get(server.url("/login")).send().await.unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers()["location"], "/admin");
    let resp = authed.get(server.url("/admin")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn login_rejects_bad_credentials_and_logout_drops_the_session() {
    let server = spawn_server().await;
    let c = client();

    let resp = c
        .post(server.url("/api/auth/login"))
        .json(&serde_json::json!({ "email": ADMIN_EMAIL, "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    login(&server, &c).await;
    assert_eq!(c.get(server.url("/admin")).send().await.unwrap().status(), 200);

    let resp = c.post(server.url("/api/auth/logout")).send().await.unwrap();
    assert_eq!(resp.status(), 204);
    assert_eq!(c.get(server.url("/admin")).send().await.unwrap().status(), 303);
}

#[tokio::test]
async fn admin_api_requires_a_session() {
    let server = spawn_server().await;
    let resp = client()
        .post(server.url("/api/memories/youtube"))
        .json(&serde_json::json!({
            "title": "x", "description": null, "date": "2024-01-01", "url": "https://youtube.com/v"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn memory_crud_and_order_rewrite() {
    let server = spawn_server().await;
    let c = client();
    login(&server, &c).await;

    let a = create_youtube(&server, &c, "a", "2024-01-01").await;
    let b = create_youtube(&server, &c, "b", "2024-01-02").await;
    let third = create_youtube(&server, &c, "c", "2024-01-03").await;

    // Save an explicit order, last created first.
    let resp = c
        .put(server.url("/api/memories/order"))
        .json(&serde_json::json!({ "ids": [third.id, a.id, b.id] }))
        .send()
        .await
        .unwrap();
    let order: SetOrderResponse = resp.json().await.unwrap();
    assert_eq!(order.updated, 3);
    assert!(order.failed.is_empty());

    let list: MemoryListResponse = c
        .get(server.url("/api/memories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list.has_real);
    let titles: Vec<_> = list.items.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, ["c", "a", "b"]);

    // Rename keeps everything else.
    let resp = c
        .put(server.url(&format!("/api/memories/{}", a.id)))
        .json(&serde_json::json!({ "title": "renamed", "description": "d", "date": "2024-02-02" }))
        .send()
        .await
        .unwrap();
    let updated: MemoryResponse = resp.json().await.unwrap();
    assert_eq!(updated.title, "renamed");
    assert_eq!(updated.image_url, a.image_url);

    // Delete, then a second delete is a 404.
    let url = server.url(&format!("/api/memories/{}", b.id));
    assert_eq!(c.delete(&url).send().await.unwrap().status(), 204);
    assert_eq!(c.delete(&url).send().await.unwrap().status(), 404);
}

#[tokio::test]
async fn order_rewrite_reports_unknown_ids() {
    let server = spawn_server().await;
    let c = client();
    login(&server, &c).await;

    let a = create_youtube(&server, &c, "a", "2024-01-01").await;
    let resp = c
        .put(server.url("/api/memories/order"))
        .json(&serde_json::json!({ "ids": [a.id, "does-not-exist"] }))
        .send()
        .await
        .unwrap();
    let order: SetOrderResponse = resp.json().await.unwrap();
    assert_eq!(order.updated, 1);
    assert_eq!(order.failed.len(), 1);
    assert_eq!(order.failed[0].id, "does-not-exist");
}

#[tokio::test]
async fn multipart_upload_stores_and_serves_the_blob() {
    let server = spawn_server().await;
    let c = client();
    login(&server, &c).await;

    let form = reqwest::multipart::Form::new()
        .text("title", "Praia")
        .text("date", "2024-07-01")
        .part(
            "file",
            reqwest::multipart::Part::bytes(tiny_png())
                .file_name("praia.png")
                .mime_str("image/png")
                .unwrap(),
        );
    let resp = c
        .post(server.url("/api/memories"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let report: IngestReport = resp.json().await.unwrap();
    assert_eq!(report.results.len(), 1);
    assert!(report.results[0].success);

    // The reported URL serves the stored bytes.
    let url = report.results[0].url.clone().unwrap();
    let resp = c.get(server.url(&url)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(!resp.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn batch_upload_skips_only_the_bad_file() {
    let server = spawn_server().await;
    let c = client();
    login(&server, &c).await;

    let form = reqwest::multipart::Form::new()
        .text("title", "Ferias")
        .part(
            "files",
            reqwest::multipart::Part::bytes(tiny_png())
                .file_name("a.png")
                .mime_str("image/png")
                .unwrap(),
        )
        .part(
            "files",
            // Claims to be HEIC but is garbage, so conversion fails.
            reqwest::multipart::Part::bytes(b"not an image".to_vec())
                .file_name("b.heic")
                .mime_str("image/heic")
                .unwrap(),
        )
        .part(
            "files",
            reqwest::multipart::Part::bytes(vec![0u8; 64])
                .file_name("c.mp4")
                .mime_str("video/mp4")
                .unwrap(),
        );
    let resp = c
        .post(server.url("/api/memories"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let report: IngestReport = resp.json().await.unwrap();
    assert_eq!(report.results.len(), 3);

    let failed: Vec<_> = report.results.iter().filter(|r| !r.success).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].name, "b.heic");
    assert!(failed[0].error.as_deref().unwrap().contains("b.heic"));

    let rows = server.state.db.list_memories().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r.media_type == "video"));
}

#[tokio::test]
async fn empty_gallery_serves_the_demo_set() {
    let server = spawn_server().await;
    let list: MemoryListResponse = client()
        .get(server.url("/api/memories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!list.has_real);
    assert!(!list.items.is_empty());
}

#[tokio::test]
async fn content_upserts_by_key_and_reads_back_as_a_map() {
    let server = spawn_server().await;
    let c = client();
    login(&server, &c).await;

    let map: HashMap<String, String> = c
        .get(server.url("/api/content"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(map.is_empty());

    for value in ["first", "second"] {
        let resp = c
            .put(server.url("/api/content"))
            .json(&serde_json::json!({ "key": "hero_title", "value": value }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 204);
    }

    let map: HashMap<String, String> = c
        .get(server.url("/api/content"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(map.get("hero_title").map(String::as_str), Some("second"));
}

#[tokio::test]
async fn coupon_redeem_is_idempotent() {
    let server = spawn_server().await;
    let c = client();

    let coupons: Vec<CouponResponse> = c
        .get(server.url("/api/coupons"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(coupons.len() >= 3);
    assert!(coupons.iter().all(|coupon| !coupon.is_redeemed));

    let redeem_url = server.url(&format!("/api/coupons/{}/redeem", coupons[0].id));
    let first: CouponResponse = c.post(&redeem_url).send().await.unwrap().json().await.unwrap();
    assert!(first.is_redeemed);
    let stamp = first.redeemed_at.unwrap();

    let second: CouponResponse = c.post(&redeem_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(second.redeemed_at.unwrap(), stamp);

    let resp = c
        .post(server.url("/api/coupons/unknown/redeem"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn random_reasons_never_repeat_back_to_back() {
    let server = spawn_server().await;
    let c = client();

    let mut last = String::new();
    for _ in 0..30 {
        let reason: ReasonResponse = c
            .get(server.url("/api/reasons/random"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(!reason.texto.is_empty());
        assert_ne!(reason.texto, last);
        last = reason.texto;
    }
}

#[tokio::test]
async fn version_and_timer_respond() {
    let server = spawn_server().await;
    let c = client();

    let version: VersionResponse = c
        .get(server.url("/api/version"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!version.version.is_empty());

    let timer: serde_json::Value = c
        .get(server.url("/api/timer"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(timer["years"].as_i64().unwrap() >= 0);
    assert!(timer["start"].as_str().unwrap().starts_with("2023-10-14"));
}

#[tokio::test]
async fn cleanup_removes_the_named_rows() {
    let server = spawn_server().await;
    let c = client();
    login(&server, &c).await;

    let a = create_youtube(&server, &c, "a", "2024-01-01").await;
    let _b = create_youtube(&server, &c, "b", "2024-01-02").await;

    let resp = c
        .post(server.url("/api/diagnostics/cleanup"))
        .json(&serde_json::json!({ "ids": [a.id] }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["deleted"], 1);
    assert_eq!(server.state.db.list_memories().unwrap().len(), 1);
}
