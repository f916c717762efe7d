use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower::ServiceExt;

use skue::domain::{Resource, ResourceId};
use skue::infra::cache::MemoryCache;
use skue::infra::db::MemoryStore;
use skue::infra::http::{API_KEY_HEADER, MIME_JSON, MIME_XML, REQUEST_ID_HEADER};
use skue::{ApiRouter, CacheAside, CrudService, ListLimits, MemoryCacher, View};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Player {
    id: String,
    name: String,
    age: i32,
}

impl Resource for Player {
    const COLLECTION: &'static str = "players";
    const ID_FIELD: &'static str = "Id";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: ResourceId) {
        self.id = id;
    }

    fn generate_id() -> Option<ResourceId> {
        Some(uuid::Uuid::new_v4().simple().to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Team {
    team_id: String,
    name: String,
}

impl Resource for Team {
    const COLLECTION: &'static str = "teams";
    const ID_FIELD: &'static str = "TeamId";

    fn id(&self) -> &str {
        &self.team_id
    }

    fn set_id(&mut self, id: ResourceId) {
        self.team_id = id;
    }
}

struct Harness {
    router: Router,
    store: MemoryStore,
    cache: Arc<MemoryCache>,
}

fn harness(view: View, api_key: Option<&str>, limits: ListLimits) -> Harness {
    let store = MemoryStore::new();
    let capacity = NonZeroUsize::new(64).expect("non-zero capacity");
    let memory = Arc::new(MemoryCache::new(capacity));
    let cacher: Arc<dyn MemoryCacher> = memory.clone();
    let cache = CacheAside::new(Some(cacher), Duration::from_secs(60));

    let players = Arc::new(
        CrudService::<Player>::new(Arc::new(store.clone()), cache.clone()).with_limits(limits),
    );
    let teams = Arc::new(CrudService::<Team>::new(Arc::new(store.clone()), cache));

    let router = ApiRouter::new(view)
        .with_api_key(api_key.map(str::to_string))
        .resource("/players", players)
        .resource("/teams", teams)
        .build();

    Harness {
        router,
        store,
        cache: memory,
    }
}

fn json_harness() -> Harness {
    harness(View::Json, None, ListLimits::default())
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, MIME_JSON)
            .body(Body::from(body.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    }
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be json")
}

async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("body should be utf8")
}

async fn expect_envelope(response: Response, status: StatusCode, message: &str) {
    assert_eq!(response.status(), status);
    assert_eq!(
        body_json(response).await,
        json!({"Status": status.as_u16(), "Message": message})
    );
}

#[tokio::test]
async fn player_lifecycle_over_http() {
    let app = json_harness();

    let response = send(
        &app.router,
        request(Method::POST, "/players", Some(json!({"Name": "Xavi", "Age": 44}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE),
        Some(&HeaderValue::from_static(MIME_JSON))
    );
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    let created = body_json(response).await;
    let id = created["Id"].as_str().expect("generated id").to_string();
    assert!(!id.is_empty());
    assert_eq!(created["Name"], "Xavi");

    let response = send(&app.router, request(Method::GET, &format!("/players/{id}"), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, created);

    let response = send(
        &app.router,
        request(
            Method::PUT,
            &format!("/players/{id}"),
            Some(json!({"Id": "ignored", "Name": "Xavi Hernandez", "Age": 44})),
        ),
    )
    .await;
    expect_envelope(response, StatusCode::OK, "Successfully updated").await;

    let response = send(&app.router, request(Method::GET, &format!("/players/{id}"), None)).await;
    let updated = body_json(response).await;
    assert_eq!(updated["Id"], id.as_str());
    assert_eq!(updated["Name"], "Xavi Hernandez");

    let response = send(&app.router, request(Method::DELETE, &format!("/players/{id}"), None)).await;
    expect_envelope(response, StatusCode::OK, "Successfully deleted").await;

    let response = send(&app.router, request(Method::GET, &format!("/players/{id}"), None)).await;
    expect_envelope(response, StatusCode::NOT_FOUND, "Item not found").await;

    let response = send(&app.router, request(Method::DELETE, &format!("/players/{id}"), None)).await;
    expect_envelope(response, StatusCode::NOT_FOUND, "Item not found").await;
}

#[tokio::test]
async fn update_of_missing_item_is_not_found() {
    let app = json_harness();
    let response = send(
        &app.router,
        request(Method::PUT, "/players/ghost", Some(json!({"Name": "Nobody"}))),
    )
    .await;
    expect_envelope(response, StatusCode::NOT_FOUND, "Item not found").await;
    assert_eq!(app.store.count("players").await, 0);
}

#[tokio::test]
async fn resources_without_generator_need_an_id() {
    let app = json_harness();

    let response = send(
        &app.router,
        request(Method::POST, "/teams", Some(json!({"Name": "Barcelona"}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.count("teams").await, 0);

    let response = send(
        &app.router,
        request(Method::POST, "/teams", Some(json!({"TeamId": "FCB", "Name": "Barcelona"}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(
        &app.router,
        request(Method::POST, "/teams", Some(json!({"TeamId": "FCB", "Name": "Again"}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    let message = body["Message"].as_str().expect("message");
    assert!(message.starts_with("Failed saving the item"), "{message}");
    assert_eq!(app.store.count("teams").await, 1);
}

#[tokio::test]
async fn malformed_bodies_leave_the_store_untouched() {
    let app = json_harness();

    let bad = Request::builder()
        .method(Method::POST)
        .uri("/players")
        .header(header::CONTENT_TYPE, MIME_JSON)
        .body(Body::from("{\"Name\": "))
        .expect("request should build");
    let response = send(&app.router, bad).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["Status"], 400);
    assert!(
        body["Message"]
            .as_str()
            .is_some_and(|m| m.starts_with("Failed reading from request")),
    );

    let bad_update = Request::builder()
        .method(Method::PUT)
        .uri("/players/p1")
        .header(header::CONTENT_TYPE, MIME_JSON)
        .body(Body::from("[1, 2"))
        .expect("request should build");
    let response = send(&app.router, bad_update).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.store.count("players").await, 0);
    assert!(app.cache.is_empty());
}

#[tokio::test]
async fn content_negotiation_errors() {
    let app = json_harness();

    let wrong_type = Request::builder()
        .method(Method::POST)
        .uri("/players")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("{}"))
        .expect("request should build");
    let response = send(&app.router, wrong_type).await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let refuses_json = Request::builder()
        .method(Method::GET)
        .uri("/players")
        .header(header::ACCEPT, "text/html")
        .body(Body::empty())
        .expect("request should build");
    let response = send(&app.router, refuses_json).await;
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);

    let wildcard = Request::builder()
        .method(Method::GET)
        .uri("/players")
        .header(header::ACCEPT, "text/html, */*;q=0.1")
        .body(Body::empty())
        .expect("request should build");
    let response = send(&app.router, wildcard).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.store.count("players").await, 0);
}

#[tokio::test]
async fn unknown_routes_and_verbs() {
    let app = json_harness();

    let response = send(&app.router, request(Method::GET, "/coaches", None)).await;
    expect_envelope(response, StatusCode::NOT_FOUND, "Not Found").await;

    let response = send(&app.router, request(Method::PATCH, "/players/p1", None)).await;
    expect_envelope(response, StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").await;

    let response = send(&app.router, request(Method::DELETE, "/players", None)).await;
    expect_envelope(response, StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").await;
}

#[tokio::test]
async fn list_limits_are_clamped() {
    let app = harness(View::Json, None, ListLimits { default: 2, max: 3 });

    for name in ["a", "b", "c", "d"] {
        let response = send(
            &app.router,
            request(Method::POST, "/players", Some(json!({"Name": name}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let cases = [
        ("/players", 2),
        ("/players?limit=1", 1),
        ("/players?limit=0", 1),
        ("/players?limit=50", 3),
    ];
    for (uri, expected) in cases {
        let response = send(&app.router, request(Method::GET, uri, None)).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().map(Vec::len), Some(expected), "{uri}");
    }

    let listed = body_json(send(&app.router, request(Method::GET, "/players", None)).await).await;
    assert_eq!(listed[0]["Name"], "a");
    assert_eq!(listed[1]["Name"], "b");

    let response = send(&app.router, request(Method::GET, "/players?limit=many", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_collections_list_as_empty_arrays() {
    let app = json_harness();
    let response = send(&app.router, request(Method::GET, "/teams", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn api_key_guards_every_route() {
    let app = harness(View::Json, Some("k-123"), ListLimits::default());

    let response = send(&app.router, request(Method::GET, "/players", None)).await;
    expect_envelope(
        response,
        StatusCode::UNAUTHORIZED,
        "You are not authorized to access this resource.",
    )
    .await;

    let mut wrong = request(Method::GET, "/coaches", None);
    wrong
        .headers_mut()
        .insert(API_KEY_HEADER, HeaderValue::from_static("k-124"));
    let response = send(&app.router, wrong).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut allowed = request(Method::POST, "/players", Some(json!({"Name": "Puyol"})));
    allowed
        .headers_mut()
        .insert(API_KEY_HEADER, HeaderValue::from_static("k-123"));
    let response = send(&app.router, allowed).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(app.store.count("players").await, 1);
}

#[tokio::test]
async fn xml_view_round_trip() {
    let app = harness(View::Xml, None, ListLimits::default());

    let create = Request::builder()
        .method(Method::POST)
        .uri("/players")
        .header(header::CONTENT_TYPE, MIME_XML)
        .body(Body::from("<Player><Name>Iniesta</Name><Age>40</Age></Player>"))
        .expect("request should build");
    let response = send(&app.router, create).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE),
        Some(&HeaderValue::from_static(MIME_XML))
    );
    let text = body_text(response).await;
    assert!(text.starts_with("<Player>"), "{text}");
    assert!(text.contains("<Name>Iniesta</Name>"), "{text}");

    let json_body = Request::builder()
        .method(Method::POST)
        .uri("/players")
        .header(header::CONTENT_TYPE, MIME_JSON)
        .body(Body::from("{}"))
        .expect("request should build");
    let response = send(&app.router, json_body).await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let text = body_text(response).await;
    assert!(text.contains("<Status>415</Status>"), "{text}");

    let response = send(&app.router, request(Method::GET, "/players/missing", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let text = body_text(response).await;
    assert!(text.contains("<Message>Item not found</Message>"), "{text}");
}
