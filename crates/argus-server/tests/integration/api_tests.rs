use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use argus_core::testutil::{FakePage, FakeSite, make_listing};

use crate::integration::common::{setup_test_app, setup_with_site};

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].as_str().is_some_and(|v| !v.is_empty()));
}

#[tokio::test]
async fn all_listings_merges_every_source() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(Request::get("/v1/listings").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 3);

    let mut titles: Vec<&str> = records
        .iter()
        .map(|r| r["title"].as_str().unwrap())
        .collect();
    titles.sort_unstable();
    assert_eq!(titles, ["Alpha loft", "Beta casa", "Beta depto"]);

    let alpha = records
        .iter()
        .find(|r| r["title"] == "Alpha loft")
        .unwrap();
    assert_eq!(alpha["price"], "1000");
    assert_eq!(alpha["company"], "alpha");
    assert_eq!(alpha["link"], "https://alpha.example.com/p/1");

    assert_eq!(app.provider.open_sessions(), 0, "all sessions released");
}

#[tokio::test]
async fn listings_by_slug_scope_to_that_source() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(Request::get("/v1/listings/beta").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r["company"] == "beta"));
}

#[tokio::test]
async fn unknown_slug_returns_404() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(
            Request::get("/v1/listings/ghost")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn list_scrapers_summarizes_the_registry() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(Request::get("/v1/scrapers").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let scrapers = json["scrapers"].as_array().unwrap();
    assert_eq!(scrapers.len(), 2);
    assert_eq!(scrapers[0]["slug"], "alpha");
    assert_eq!(scrapers[0]["baseUrl"], "https://alpha.example.com/list");
    assert_eq!(scrapers[1]["slug"], "beta");
}

#[tokio::test]
async fn registered_scraper_is_immediately_scrapeable() {
    let site = FakeSite::new().with_page(
        "https://gamma.example.com/list",
        FakePage::new().with_elements(
            ".property-item",
            vec![make_listing("Gamma PH", "$ 4.500 CAP", "/p/9")],
        ),
    );
    let app = setup_with_site(site);

    let payload = serde_json::json!({
        "name": "Gamma Homes",
        "url": "https://gamma.example.com/list",
        "selector": ".property-item",
        "mappings": {
            "title": ".title",
            "price": ".price",
            "url": "a.more"
        }
    });
    let response = app
        .router
        .clone()
        .oneshot(
            Request::post("/v1/scrapers")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["slug"], "gammahomes");
    assert_eq!(json["endpoint"], "/v1/listings/gammahomes");

    // No restart, no recompile: the slug serves records right away.
    let response = app
        .router
        .oneshot(
            Request::get("/v1/listings/gammahomes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["title"], "Gamma PH");
    assert_eq!(records[0]["price"], "4500");
    assert_eq!(records[0]["company"], "Gamma Homes");

    // Registration leaves a journal trail.
    let sources = app.journal.read_document("sources.md").unwrap();
    assert!(sources.contains("## Gamma Homes"));
}

#[tokio::test]
async fn invalid_payload_returns_400() {
    let app = setup_test_app();

    let payload = serde_json::json!({ "name": "No Url" });
    let response = app
        .router
        .oneshot(
            Request::post("/v1/scrapers")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_definition");
    assert!(json["message"].as_str().unwrap().contains("url"));
}

#[tokio::test]
async fn reregistering_a_name_swaps_the_definition() {
    let site = FakeSite::new().with_page(
        "https://delta.example.com/list",
        FakePage::new()
            .with_elements(
                ".property-item",
                vec![make_listing("Old layout", "$ 1", "/old")],
            )
            .with_elements(
                ".card-item",
                vec![make_listing("New layout", "$ 2", "/new")],
            ),
    );
    let app = setup_with_site(site);

    for selector in [".property-item", ".card-item"] {
        let payload = serde_json::json!({
            "name": "Delta",
            "url": "https://delta.example.com/list",
            "selector": selector,
            "mappings": { "title": ".title", "url": "a.more" }
        });
        let response = app
            .router
            .clone()
            .oneshot(
                Request::post("/v1/scrapers")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .router
        .oneshot(
            Request::get("/v1/listings/delta")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let json = body_json(response).await;
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["title"], "New layout");
}

#[tokio::test]
async fn journal_documents_round_trip() {
    let app = setup_test_app();

    let write = serde_json::json!({ "content": "# Context\n" });
    let response = app
        .router
        .clone()
        .oneshot(
            Request::put("/v1/journal/context.md")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&write).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let append = serde_json::json!({ "content": "More.\n" });
    let response = app
        .router
        .clone()
        .oneshot(
            Request::post("/v1/journal/context.md/append")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&append).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/v1/journal/context.md")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["content"], "# Context\nMore.\n");

    let response = app
        .router
        .oneshot(Request::get("/v1/journal").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_json(response).await;
    let documents = json["documents"].as_array().unwrap();
    assert!(documents.iter().any(|d| d == "context.md"));
}

#[tokio::test]
async fn unknown_journal_document_returns_404() {
    let app = setup_test_app();

    let response = app
        .router
        .oneshot(
            Request::get("/v1/journal/absent.md")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn traversal_document_names_are_rejected() {
    let app = setup_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/v1/journal/..%2Fescape.md")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let write = serde_json::json!({ "content": "x" });
    let response = app
        .router
        .oneshot(
            Request::put("/v1/journal/..%2Fescape.md")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&write).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_ne!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn journal_stats_and_report_reflect_registrations() {
    let site = FakeSite::new();
    let app = setup_with_site(site);

    let payload = serde_json::json!({
        "name": "Epsilon",
        "url": "https://epsilon.example.com/list",
        "selector": ".item",
        "mappings": { "title": ".t" }
    });
    app.router
        .clone()
        .oneshot(
            Request::post("/v1/scrapers")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/v1/journal/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats = body_json(response).await;
    assert_eq!(stats["totalScrapers"], 1);
    assert_eq!(stats["scrapers"][0]["name"], "Epsilon");
    assert_eq!(stats["scrapers"][0]["url"], "https://epsilon.example.com/list");

    let response = app
        .router
        .oneshot(
            Request::get("/v1/journal/report")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["scraperStats"]["totalScrapers"], 1);
    assert_eq!(report["journalStatus"]["totalNotes"], 1);
    assert!(report["generatedAt"].as_str().is_some());
    assert!(app.journal_dir.path().join("status_report.json").is_file());
}

#[tokio::test]
async fn empty_registry_serves_an_empty_array() {
    let app = setup_with_site(FakeSite::new());

    let response = app
        .router
        .oneshot(Request::get("/v1/listings").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 0);
}
