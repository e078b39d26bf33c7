//! Document lifecycle against the live document server.
//!
//! # Design
//! Starts the server on a random port, then exercises every `StoreClient`
//! operation over real HTTP using ureq. Validates that request building and
//! response parsing agree with the server's wire format, and that the bridge
//! can persist through the server with `RemoteStore`.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use todo_bridge::{
    ApiError, Bridge, BridgeReply, HttpExecutor, HttpMethod, HttpRequest, HttpResponse,
    RemoteStore, StoreClient, TodoDocument,
};

/// Execute an `HttpRequest` using ureq and return an `HttpResponse`.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data rather than `Err`, letting the client
/// handle status interpretation.
fn execute(req: HttpRequest) -> HttpResponse {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let mut response = match (req.method, req.body) {
        (HttpMethod::Get, _) => agent.get(&req.path).call(),
        (HttpMethod::Put, Some(body)) => {
            agent.put(&req.path).content_type("application/json").send(body.as_bytes())
        }
        (HttpMethod::Put, None) => agent.put(&req.path).send_empty(),
    }
    .expect("HTTP transport error");

    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string().unwrap_or_default();

    HttpResponse {
        status,
        headers: Vec::new(),
        body,
    }
}

/// Runs the blocking ureq round-trip off the async worker.
struct UreqExecutor;

#[async_trait::async_trait]
impl HttpExecutor for UreqExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        tokio::task::spawn_blocking(move || execute(request))
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))
    }
}

fn doc(value: serde_json::Value) -> TodoDocument {
    serde_json::from_value(value).unwrap()
}

/// Start the server on a random port in its own thread.
fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            docstore_server::run(listener).await
        })
        .unwrap();
    });
    addr
}

#[test]
fn document_lifecycle() {
    // Step 1: start the server on a random port.
    let addr = start_server();

    let client = StoreClient::new(&format!("http://{addr}"), "todos");

    // Step 2: listing starts empty.
    let listing = client.parse_all_docs(execute(client.build_all_docs(true))).unwrap();
    assert!(listing.rows.is_empty(), "expected empty store");

    // Step 3: create a document.
    let req = client.build_put_doc(&doc(json!({"_id": "ck1", "title": "Walk dog"}))).unwrap();
    let created = client.parse_put_doc(execute(req)).unwrap();
    assert_eq!(created.id, "ck1");

    // Step 4: fetch it back with its revision.
    let fetched = client.parse_get_doc(execute(client.build_get_doc("ck1"))).unwrap();
    assert_eq!(fetched.rev(), Some(created.rev.as_str()));
    assert_eq!(fetched.get("title"), Some(&json!("Walk dog")));

    // Step 5: writing without the revision conflicts.
    let req = client.build_put_doc(&doc(json!({"_id": "ck1", "title": "Walk cat"}))).unwrap();
    let err = client.parse_put_doc(execute(req)).unwrap_err();
    assert!(matches!(err, ApiError::Conflict));

    // Step 6: merge onto the fetched copy and write with its revision.
    let merged = doc(json!({"_id": "ck1", "done": true})).merged_onto(Some(fetched));
    let updated = client.parse_put_doc(execute(client.build_put_doc(&merged).unwrap())).unwrap();
    assert!(updated.rev.starts_with("2-"));

    // Step 7: listing projects to the merged body.
    let listing = client.parse_all_docs(execute(client.build_all_docs(true))).unwrap();
    assert_eq!(
        listing.into_bodies(),
        vec![doc(json!({"_id": "ck1", "title": "Walk dog", "done": true}))]
    );

    // Step 8: unknown documents and databases are NotFound.
    let err = client.parse_get_doc(execute(client.build_get_doc("missing"))).unwrap_err();
    assert!(matches!(err, ApiError::NotFound));

    let other = StoreClient::new(&format!("http://{addr}"), "work");
    let err = other.parse_all_docs(execute(other.build_all_docs(false))).unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bridge_persists_through_the_document_server() {
    let addr = start_server();
    let store = RemoteStore::new(StoreClient::new(&format!("http://{addr}"), "todos"), UreqExecutor);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let bridge = Bridge::new(Arc::new(store), tx);

    bridge
        .persist(&json!([{"_id": "a", "title": "x"}, {"_id": "b", "title": "y"}]).to_string())
        .unwrap()
        .settled()
        .await;
    bridge
        .persist(&json!([{"_id": "a", "done": true}, {"_id": "a", "_rev": "9-stale", "note": "n"}]).to_string())
        .unwrap()
        .settled()
        .await;

    let mut saved = 0;
    while let Ok(reply) = rx.try_recv() {
        assert!(matches!(reply, BridgeReply::SaveSuccess(_)), "{reply:?}");
        saved += 1;
    }
    assert_eq!(saved, 4);

    bridge.fetch_all(Value::Null).await.unwrap();
    let Some(BridgeReply::GetSuccess(payload)) = rx.recv().await else {
        panic!("expected pouchGetSuccess");
    };
    let fetched: Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(
        fetched,
        json!([
            {"_id": "a", "title": "x", "done": true, "note": "n"},
            {"_id": "b", "title": "y"}
        ])
    );
}
