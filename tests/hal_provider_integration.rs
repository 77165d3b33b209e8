use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::{Json, Router};
use hal_data_provider::{
    DataProvider, DataProviderError, HalClient, HalResource, HeaderSource, Link, OperationKind,
    OperationParams, Pagination, ProviderOptions, Sort,
};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

/// A canned response for one method and path.
struct Stub {
    method: Method,
    path: String,
    status: StatusCode,
    body: Value,
}

fn stub(method: Method, path: impl Into<String>, status: u16, body: Value) -> Stub {
    Stub {
        method,
        path: path.into(),
        status: StatusCode::from_u16(status).unwrap(),
        body,
    }
}

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    query: Option<String>,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

// Fake HAL API that answers from stubs and records every request
struct FakeHal {
    stubs: Vec<Stub>,
    requests: Mutex<Vec<Recorded>>,
}

impl FakeHal {
    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }
}

async fn answer(
    State(api): State<Arc<FakeHal>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    api.requests.lock().push(Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect(),
        body: serde_json::from_slice(&body).ok(),
    });

    match api
        .stubs
        .iter()
        .find(|s| s.method == method && s.path == uri.path())
    {
        Some(s) => (s.status, Json(s.body.clone())),
        None => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

/// Starts the fake API on an ephemeral port. Stubs are built once the base
/// URL is known so links can be absolute.
async fn serve(stubs: impl FnOnce(&str) -> Vec<Stub>) -> (String, Arc<FakeHal>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let api = Arc::new(FakeHal {
        stubs: stubs(&base_url),
        requests: Mutex::new(Vec::new()),
    });

    let app = Router::new().fallback(answer).with_state(Arc::clone(&api));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (base_url, api)
}

fn root(links: &[(&str, Link)]) -> Value {
    links
        .iter()
        .fold(HalResource::new(), |resource, (rel, link)| {
            resource.with_link(*rel, link.clone())
        })
        .to_value()
}

fn provider(base_url: &str) -> DataProvider<HalClient> {
    provider_with(base_url, ProviderOptions::default())
}

fn provider_with(base_url: &str, options: ProviderOptions) -> DataProvider<HalClient> {
    DataProvider::new(HalClient::new(None).unwrap(), base_url, options)
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn post(base_url: &str, id: &str, title: &str, author: &str) -> HalResource {
    HalResource::new()
        .with_link("self", Link::new(format!("{}/posts/{}", base_url, id)))
        .with_property("id", id)
        .with_property("title", title)
        .with_property("author", author)
        .with_property("active", true)
        .with_property("tag", "article")
}

fn flat_post(base_url: &str, id: &str, title: &str, author: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "author": author,
        "active": true,
        "tag": "article",
        "links": { "self": { "href": format!("{}/posts/{}", base_url, id) } },
        "embedded": {}
    })
}

#[tokio::test]
async fn list_sends_pagination_sort_and_filter_from_discovered_template() {
    let (first, second) = (new_id(), new_id());
    let (base_url, api) = {
        let (first, second) = (first.clone(), second.clone());
        serve(move |base| {
            vec![
                stub(
                    Method::GET,
                    "/",
                    200,
                    root(&[
                        ("self", Link::new(format!("{}/", base))),
                        (
                            "posts",
                            Link::templated(format!("{}/posts{{?page,perPage,sort*,filter*}}", base)),
                        ),
                    ]),
                ),
                stub(
                    Method::GET,
                    "/posts",
                    200,
                    HalResource::new()
                        .with_link("self", Link::new("/posts"))
                        .with_property("totalPosts", 36)
                        .with_resource("posts", post(base, &first, "My first post", "Jenny"))
                        .with_resource("posts", post(base, &second, "My second post", "James"))
                        .to_value(),
                ),
            ]
        })
        .await
    };

    let params = OperationParams {
        pagination: Some(Pagination::new(3, 2)),
        sort: Some(Sort::new("title", "asc")),
        filter: Some(object(json!({ "active": "true", "tag": "article" }))),
        ..Default::default()
    };
    let response = provider(&base_url)
        .handle(OperationKind::List, "posts", params)
        .await
        .unwrap();

    assert_eq!(
        response.to_json(),
        json!({
            "data": [
                flat_post(&base_url, &first, "My first post", "Jenny"),
                flat_post(&base_url, &second, "My second post", "James")
            ],
            "total": 36
        })
    );

    let requests = api.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, "/");
    assert_eq!(requests[1].path, "/posts");
    assert_eq!(
        requests[1].query.as_deref(),
        Some(
            "page=3&perPage=2&sort=%5B%22title%22%2C%22asc%22%5D\
             &filter=%5B%22active%22%2C%22true%22%5D&filter=%5B%22tag%22%2C%22article%22%5D"
        )
    );
}

#[tokio::test]
async fn get_one_fetches_resource_by_id() {
    let id = new_id();
    let (base_url, api) = {
        let id = id.clone();
        serve(move |base| {
            vec![
                stub(
                    Method::GET,
                    "/",
                    200,
                    root(&[("post", Link::templated(format!("{}/posts/{{id}}", base)))]),
                ),
                stub(
                    Method::GET,
                    format!("/posts/{}", id),
                    200,
                    post(base, &id, "My first post", "Jenny").to_value(),
                ),
            ]
        })
        .await
    };

    let response = provider(&base_url)
        .handle_named("GET_ONE", "posts", OperationParams::default().with_id(format!("posts:{}", id)))
        .await
        .unwrap();

    let mut expected = flat_post(&base_url, &id, "My first post", "Jenny");
    expected["id"] = json!(format!("posts:{}", id));
    assert_eq!(response.to_json(), json!({ "data": expected }));
    assert_eq!(api.requests()[1].path, format!("/posts/{}", id));
}

#[tokio::test]
async fn create_posts_payload_to_templated_relation() {
    let (post_id, comment_id) = (new_id(), new_id());
    let (base_url, api) = {
        let (post_id, comment_id) = (post_id.clone(), comment_id.clone());
        serve(move |base| {
            vec![
                stub(
                    Method::GET,
                    "/",
                    200,
                    root(&[
                        ("post", Link::templated(format!("{}/posts/{{id}}", base))),
                        ("postComments", Link::templated(format!("{}/posts/{{id}}/comments", base))),
                    ]),
                ),
                stub(
                    Method::POST,
                    format!("/posts/{}/comments", post_id),
                    201,
                    HalResource::new()
                        .with_link("self", Link::new(format!("{}/posts/{}/comments/{}", base, post_id, comment_id)))
                        .with_property("id", comment_id.as_str())
                        .with_property("title", "My Comment")
                        .with_property("body", "Best comment ever")
                        .to_value(),
                ),
            ]
        })
        .await
    };

    let payload = json!({ "id": post_id, "title": "My Comment", "body": "Best comment ever" });
    let response = provider(&base_url)
        .handle(
            OperationKind::Create,
            "postComments",
            OperationParams::default().with_data(object(payload.clone())),
        )
        .await
        .unwrap();

    assert_eq!(
        response.to_json(),
        json!({
            "data": {
                "id": comment_id,
                "title": "My Comment",
                "body": "Best comment ever",
                "links": { "self": { "href": format!("{}/posts/{}/comments/{}", base_url, post_id, comment_id) } },
                "embedded": {}
            }
        })
    );
    let requests = api.requests();
    assert_eq!(requests[1].method, Method::POST);
    assert_eq!(requests[1].query, None);
    assert_eq!(requests[1].body, Some(payload));
}

#[tokio::test]
async fn create_rejects_with_error_context_problem_and_status() {
    let post_id = new_id();
    let (base_url, _api) = {
        let post_id = post_id.clone();
        serve(move |base| {
            vec![
                stub(
                    Method::GET,
                    "/",
                    200,
                    root(&[("postComments", Link::templated(format!("{}/posts/{{id}}/comments", base)))]),
                ),
                stub(
                    Method::POST,
                    format!("/posts/{}/comments", post_id),
                    422,
                    HalResource::new()
                        .with_property("errorContext", json!({ "problem": "Bad things happen too" }))
                        .to_value(),
                ),
            ]
        })
        .await
    };

    let payload = json!({ "id": post_id, "title": "My Comment", "body": "Best comment ever" });
    let err = provider(&base_url)
        .handle(
            OperationKind::Create,
            "postComments",
            OperationParams::default().with_data(object(payload)),
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Bad things happen too");
    assert_eq!(err.status(), Some(422));
}

#[tokio::test]
async fn get_many_fetches_every_id() {
    let (first, second) = (new_id(), new_id());
    let (base_url, _api) = {
        let (first, second) = (first.clone(), second.clone());
        serve(move |base| {
            vec![
                stub(
                    Method::GET,
                    "/",
                    200,
                    root(&[("comment", Link::templated(format!("{}/comments/{{id}}", base)))]),
                ),
                stub(
                    Method::GET,
                    format!("/comments/{}", first),
                    200,
                    HalResource::new()
                        .with_link("self", Link::new(format!("{}/comments/{}", base, first)))
                        .with_property("id", first.as_str())
                        .with_property("title", "My comment")
                        .to_value(),
                ),
                stub(
                    Method::GET,
                    format!("/comments/{}", second),
                    200,
                    HalResource::new()
                        .with_link("self", Link::new(format!("{}/comments/{}", base, second)))
                        .with_property("id", second.as_str())
                        .with_property("title", "My other comment")
                        .to_value(),
                ),
            ]
        })
        .await
    };

    let response = provider(&base_url)
        .handle(
            OperationKind::ReadMany,
            "comments",
            OperationParams::default().with_ids([first.clone(), second.clone()]),
        )
        .await
        .unwrap();

    let json = response.to_json();
    assert_eq!(json["total"], json!(2));
    assert_eq!(json["data"][0]["id"], json!(first));
    assert_eq!(json["data"][0]["title"], json!("My comment"));
    assert_eq!(json["data"][1]["id"], json!(second));
    assert_eq!(
        json["data"][1]["links"],
        json!({ "self": { "href": format!("{}/comments/{}", base_url, second) } })
    );
}

#[tokio::test]
async fn get_many_reference_queries_by_target() {
    let post_id = new_id();
    let (base_url, api) = serve(|base| {
        let comment = |id: &str, title: &str| {
            HalResource::new()
                .with_link("self", Link::new(format!("{}/comments/{}", base, id)))
                .with_property("id", id)
                .with_property("title", title)
        };
        vec![
            stub(
                Method::GET,
                "/",
                200,
                root(&[("comments", Link::templated(format!("{}/comments{{?post}}", base)))]),
            ),
            stub(
                Method::GET,
                "/comments",
                200,
                HalResource::new()
                    .with_resources("comments", vec![comment("c1", "My comment"), comment("c2", "My other comment")])
                    .to_value(),
            ),
        ]
    })
    .await;

    let params = OperationParams {
        target: Some("post".to_string()),
        id: Some(post_id.clone().into()),
        ..Default::default()
    };
    let response = provider(&base_url)
        .handle(OperationKind::ReadManyByReference, "comments", params)
        .await
        .unwrap();

    let json = response.to_json();
    assert_eq!(json["total"], json!(2));
    assert_eq!(json["data"][1]["title"], json!("My other comment"));
    assert_eq!(api.requests()[1].query, Some(format!("post={}", post_id)));
}

#[tokio::test]
async fn update_puts_payload_to_singular_relation() {
    let id = new_id();
    let (base_url, api) = {
        let id = id.clone();
        serve(move |base| {
            vec![
                stub(
                    Method::GET,
                    "/",
                    200,
                    root(&[("post", Link::templated(format!("{}/posts/{{id}}", base)))]),
                ),
                stub(
                    Method::PUT,
                    format!("/posts/{}", id),
                    200,
                    HalResource::new()
                        .with_link("self", Link::new(format!("{}/posts/{}", base, id)))
                        .with_property("id", id.as_str())
                        .with_property("title", "My Comment")
                        .with_property("body", "Best comment ever")
                        .to_value(),
                ),
            ]
        })
        .await
    };

    let payload = json!({ "id": id, "title": "My Comment", "body": "Best comment ever" });
    let response = provider(&base_url)
        .handle(
            OperationKind::Update,
            "posts",
            OperationParams::default().with_data(object(payload.clone())),
        )
        .await
        .unwrap();

    assert_eq!(
        response.to_json(),
        json!({
            "data": {
                "id": id,
                "title": "My Comment",
                "body": "Best comment ever",
                "links": { "self": { "href": format!("{}/posts/{}", base_url, id) } },
                "embedded": {}
            }
        })
    );
    assert_eq!(api.requests()[1].body, Some(payload));
}

#[tokio::test]
async fn delete_returns_resource_fetched_before_deleting_via_self() {
    let id = new_id();
    let (base_url, api) = {
        let id = id.clone();
        serve(move |base| {
            vec![
                stub(
                    Method::GET,
                    "/",
                    200,
                    root(&[("post", Link::templated(format!("{}/posts/{{id}}", base)))]),
                ),
                stub(
                    Method::GET,
                    format!("/posts/{}", id),
                    200,
                    post(base, &id, "Going away", "Jenny").to_value(),
                ),
                stub(Method::DELETE, format!("/posts/{}", id), 200, json!({})),
            ]
        })
        .await
    };

    let response = provider(&base_url)
        .handle(OperationKind::Delete, "posts", OperationParams::default().with_id(id.clone()))
        .await
        .unwrap();

    assert_eq!(
        response.to_json(),
        json!({ "data": flat_post(&base_url, &id, "Going away", "Jenny") })
    );
    let calls: Vec<(Method, String)> = api
        .requests()
        .into_iter()
        .map(|r| (r.method, r.path))
        .collect();
    assert_eq!(
        calls,
        vec![
            (Method::GET, "/".to_string()),
            (Method::GET, format!("/posts/{}", id)),
            (Method::DELETE, format!("/posts/{}", id)),
        ]
    );
}

#[tokio::test]
async fn configured_and_per_call_headers_reach_every_request() {
    let id = new_id();
    let (base_url, api) = {
        let id = id.clone();
        serve(move |base| {
            vec![
                stub(
                    Method::GET,
                    "/",
                    200,
                    root(&[("post", Link::templated(format!("{}/posts/{{id}}", base)))]),
                ),
                stub(
                    Method::GET,
                    format!("/posts/{}", id),
                    200,
                    post(base, &id, "Secret", "Jenny").to_value(),
                ),
            ]
        })
        .await
    };

    let options = ProviderOptions::default()
        .with_header("X-Api-Key", "static-key".into())
        .with_header("Authorization", HeaderSource::dynamic(|| "Bearer fresh".to_string()));
    let params = OperationParams::default()
        .with_id(id.clone())
        .with_header("x-request-id", "req-1");

    provider_with(&base_url, options)
        .handle(OperationKind::ReadOne, "posts", params)
        .await
        .unwrap();

    for request in api.requests() {
        assert_eq!(request.header("x-api-key"), Some("static-key"));
        assert_eq!(request.header("authorization"), Some("Bearer fresh"));
        assert_eq!(request.header("x-request-id"), Some("req-1"));
    }
}

#[tokio::test]
async fn discovery_failure_propagates() {
    let (base_url, _api) = serve(|_| vec![stub(Method::GET, "/", 500, json!({}))]).await;

    let client = HalClient::with_client(reqwest::Client::new());
    let err = DataProvider::new(client, base_url, ProviderOptions::default())
        .handle(OperationKind::List, "posts", OperationParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, DataProviderError::Discovery { status: 500, .. }));
}
