//! Web interface tests.
//!
//! One test runs the full `run_server` path against a SQLite file; the rest
//! serve the router over an in-memory store on an ephemeral port.

use std::sync::Arc;

use reqwest::redirect::Policy;
use reqwest::StatusCode;
use serde_json::Value;
use tempfile::TempDir;

use support_kb::config::{parse_config, Config};
use support_kb::server::{router, run_server};
use support_kb_core::models::NewEntry;
use support_kb_core::store::memory::InMemoryStore;
use support_kb_core::store::Store;

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap()
}

/// Serve the router over a seeded in-memory store. Returns the base URL.
async fn spawn_memory_server() -> String {
    let store = InMemoryStore::new();
    store
        .add(
            &NewEntry::new(
                "Webhook 403 errors",
                "Signature mismatch",
                "Verify against the raw body",
            )
            .with_category("webhooks")
            .with_tags(["hmac", "signing"]),
        )
        .await
        .unwrap();
    store
        .add(&NewEntry::new("Slow bulk export", "Times out", "Use bulk operations"))
        .await
        .unwrap();

    let config = parse_config(
        "[suggestions]\ncategories = [\"webhooks\", \"orders-api\"]\nproducts = [\"checkout\"]\n",
    )
    .unwrap();
    let app = router(Arc::new(store), Arc::new(config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_run_server_with_sqlite() {
    let port = find_free_port();
    let tmp = TempDir::new().unwrap();
    let config: Config = parse_config(&format!(
        "[db]\npath = \"{}\"\n\n[server]\nbind = \"127.0.0.1:{}\"\n",
        tmp.path().join("kb.sqlite").display(),
        port
    ))
    .unwrap();

    let server_handle = tokio::spawn(async move {
        run_server(&config).await.ok();
    });
    wait_for_server(port).await;

    let base = format!("http://127.0.0.1:{}", port);
    let client = client();

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));

    let resp = client
        .post(format!("{}/entries", base))
        .form(&[
            ("title", "Refund stuck"),
            ("problem", "Refund pending for days"),
            ("solution", "Retry from the admin"),
            ("category", ""),
            ("tags", "refunds, admin"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/entries/1");

    let entry: Value = client
        .get(format!("{}/api/entries/1", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(entry["title"], "Refund stuck");
    assert_eq!(entry["category"], "general");
    assert_eq!(entry["tags"], serde_json::json!(["refunds", "admin"]));

    server_handle.abort();
}

#[tokio::test]
async fn test_pages_render() {
    let base = spawn_memory_server().await;
    let client = client();

    for path in ["/", "/entries", "/entries/new", "/entries/1", "/entries/1/edit", "/stats"] {
        let resp = client.get(format!("{}{}", base, path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", path);
        let body = resp.text().await.unwrap();
        assert!(body.contains("<html"), "GET {} did not render a page", path);
    }

    let body = client
        .get(format!("{}/", base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Webhook 403 errors"));
    assert!(body.contains("/search?tag=hmac"));

    let body = client
        .get(format!("{}/entries/new", base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(r#"<option value="orders-api">"#));
    assert!(body.contains(r#"<datalist id="products"><option value="checkout"></datalist>"#));
    assert!(body.contains(r#"list="products""#));

    let body = client
        .get(format!("{}/stats", base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("/search?category=webhooks"));
    assert!(body.contains("/search?tag=signing"));
}

#[tokio::test]
async fn test_unknown_entry_is_404() {
    let base = spawn_memory_server().await;
    let client = client();

    let resp = client.get(format!("{}/entries/99", base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.text().await.unwrap().contains("not found: entry 99"));

    let resp = client.get(format!("{}/api/entries/99", base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    let resp = client.get(format!("{}/no/such/page", base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_form_rerenders_with_input() {
    let base = spawn_memory_server().await;
    let client = client();

    let resp = client
        .post(format!("{}/entries", base))
        .form(&[
            ("title", "Half written"),
            ("problem", ""),
            ("solution", "something"),
            ("category", "webhooks"),
            ("tags", "draft"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.unwrap();
    assert!(body.contains("problem must not be empty"));
    assert!(body.contains(r#"value="Half written""#));
    assert!(body.contains(r#"value="draft""#));

    let resp = client
        .post(format!("{}/entries/1/edit", base))
        .form(&[
            ("title", ""),
            ("problem", "p"),
            ("solution", "s"),
            ("category", ""),
            ("tags", ""),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let entry: Value = client
        .get(format!("{}/api/entries/1", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(entry["title"], "Webhook 403 errors");
}

#[tokio::test]
async fn test_edit_and_use_redirect_back_to_entry() {
    let base = spawn_memory_server().await;
    let client = client();

    let resp = client
        .post(format!("{}/entries/2/edit", base))
        .form(&[
            ("title", "Slow bulk export"),
            ("problem", "Times out after 30s"),
            ("solution", "Use bulk operations"),
            ("category", "orders-api"),
            ("tags", "export"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/entries/2");

    let resp = client
        .post(format!("{}/entries/2/use", base))
        .form(&[("helpful", "true")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/entries/2");

    let entry: Value = client
        .get(format!("{}/api/entries/2", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(entry["problem"], "Times out after 30s");
    assert_eq!(entry["category"], "orders-api");
    assert_eq!(entry["usage_count"], 1);

    let resp = client
        .post(format!("{}/entries/2/use", base))
        .form(&[("notes", "Worked after raising the page size")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let body = client
        .get(format!("{}/entries/2", base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("<h2>Usage notes</h2>"));
    assert!(body.contains("Worked after raising the page size"));

    let resp = client
        .post(format!("{}/entries/99/use", base))
        .form(&[("helpful", "false")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_form_saves_optional_fields_and_product_search() {
    let base = spawn_memory_server().await;
    let client = client();

    let resp = client
        .post(format!("{}/entries", base))
        .form(&[
            ("title", "Discount not applied"),
            ("problem", "Code ignored"),
            ("solution", "Check the combination rules"),
            ("category", ""),
            ("tags", ""),
            ("product", " checkout "),
            ("api_version", "2024-01"),
            ("code_examples", "discountCodesUpdate"),
            ("notes", ""),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/entries/3");

    let entry: Value = client
        .get(format!("{}/api/entries/3", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(entry["product"], "checkout");
    assert_eq!(entry["api_version"], "2024-01");
    assert_eq!(entry["code_examples"], "discountCodesUpdate");
    assert!(entry["notes"].is_null());

    let body = client
        .get(format!("{}/entries/3", base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("product checkout"));
    assert!(body.contains("<h2>Code examples</h2>"));

    let hits: Value = client
        .get(format!("{}/api/search?product=Checkout", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["id"], 3);
}

#[tokio::test]
async fn test_search_page_and_api() {
    let base = spawn_memory_server().await;
    let client = client();

    let body = client
        .get(format!("{}/search?q=webhook", base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Webhook 403 errors"));
    assert!(!body.contains("Slow bulk export"));

    let hits: Value = client
        .get(format!("{}/api/search?category=GENERAL", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["title"], "Slow bulk export");

    let hits: Value = client
        .get(format!("{}/api/search?q=&tag=hmac&limit=5", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(hits.as_array().unwrap().len(), 1);

    let stats: Value = client
        .get(format!("{}/api/stats", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_count"], 2);
    assert_eq!(stats["per_category_counts"]["webhooks"], 1);
    assert_eq!(stats["per_tag_counts"]["hmac"], 1);
}
