//! Shared test utilities for ontap-publickey integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Path, Query as QueryParams, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use ontap_publickey::clients::{Method, Query, RestResponse, Transport};
use ontap_publickey::ConnectionConfig;
use serde_json::{json, Value};
use tokio::net::TcpListener;

// =============================================================================
// Scripted transport
// =============================================================================

/// A request as seen by the scripted transport.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub api: String,
    pub query: Query,
    pub body: Option<Value>,
}

impl Request {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Replays canned responses in order and records every request.
///
/// Once the script is exhausted every further call fails, so a test notices
/// requests it did not expect.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<RestResponse>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<RestResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_request(
        &self,
        method: Method,
        api: &str,
        query: &Query,
        body: Option<&Value>,
    ) -> RestResponse {
        self.requests.lock().unwrap().push(Request {
            method,
            api: api.to_string(),
            query: query.clone(),
            body: body.cloned(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(end_of_sequence)
    }
}

// =============================================================================
// Canned responses
// =============================================================================

pub fn version(generation: u32, major: u32, minor: u32) -> RestResponse {
    RestResponse::ok(
        200,
        Some(json!({
            "version": {
                "generation": generation,
                "major": major,
                "minor": minor,
                "full": "dummy"
            }
        })),
    )
}

pub fn is_rest_9_8() -> RestResponse {
    version(9, 8, 0)
}

pub fn is_zapi() -> RestResponse {
    RestResponse {
        status: Some(400),
        body: Some(json!({})),
        error: Some("Unreachable".to_string()),
    }
}

pub fn empty_good() -> RestResponse {
    RestResponse::ok(200, Some(json!({})))
}

pub fn zero_record() -> RestResponse {
    RestResponse::ok(200, Some(json!({"records": [], "num_records": 0})))
}

pub fn generic_error() -> RestResponse {
    RestResponse::failed(Some(400), "Expected error")
}

pub fn end_of_sequence() -> RestResponse {
    RestResponse::failed(Some(500), "Unexpected call to send_request")
}

pub fn pk_record(index: u32) -> Value {
    json!({
        "account": {"name": "user123"},
        "owner": {"uuid": "98765"},
        "public_key": "161245ASDF",
        "index": index,
        "comment": "comment_123"
    })
}

pub fn pk_records(indexes: &[u32]) -> RestResponse {
    let records: Vec<Value> = indexes.iter().map(|i| pk_record(*i)).collect();
    RestResponse::ok(
        200,
        Some(json!({"num_records": records.len(), "records": records})),
    )
}

pub fn one_pk_record() -> RestResponse {
    pk_records(&[12])
}

pub fn two_pk_records() -> RestResponse {
    pk_records(&[12, 13])
}

// =============================================================================
// Fake ONTAP REST server
// =============================================================================

const OWNER_UUID: &str = "98765";

#[derive(Default)]
struct Cluster {
    version: (u32, u32, u32),
    keys: Vec<Value>,
    requests: Vec<String>,
}

type Shared = Arc<Mutex<Cluster>>;

fn ontap_error(status: StatusCode, message: &str, code: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({"error": {"message": message, "code": code}})),
    )
}

fn authorized(headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    if headers.contains_key(axum::http::header::AUTHORIZATION) {
        Ok(())
    } else {
        Err(ontap_error(StatusCode::UNAUTHORIZED, "not authorized", "6"))
    }
}

async fn get_cluster(
    State(cluster): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    authorized(&headers)?;
    let mut cluster = cluster.lock().unwrap();
    cluster.requests.push("GET cluster".to_string());
    let (generation, major, minor) = cluster.version;
    Ok(Json(json!({
        "version": {"generation": generation, "major": major, "minor": minor}
    })))
}

async fn list_keys(
    State(cluster): State<Shared>,
    headers: HeaderMap,
    QueryParams(query): QueryParams<HashMap<String, String>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    authorized(&headers)?;
    let mut cluster = cluster.lock().unwrap();
    cluster.requests.push("GET publickeys".to_string());
    let records: Vec<Value> = cluster
        .keys
        .iter()
        .filter(|k| match query.get("account.name") {
            Some(name) => k["account"]["name"] == json!(name),
            None => true,
        })
        .filter(|k| match query.get("index") {
            Some(index) => k["index"].to_string() == *index,
            None => true,
        })
        .cloned()
        .collect();
    Ok(Json(json!({"num_records": records.len(), "records": records})))
}

async fn create_key(
    State(cluster): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    authorized(&headers)?;
    let mut cluster = cluster.lock().unwrap();
    cluster.requests.push("POST publickeys".to_string());

    let account = body["account"]["name"].clone();
    let index = match body.get("index").and_then(Value::as_u64) {
        Some(index) => index,
        None => cluster
            .keys
            .iter()
            .filter(|k| k["account"]["name"] == account)
            .filter_map(|k| k["index"].as_u64())
            .max()
            .map(|i| i + 1)
            .unwrap_or(0),
    };
    let exists = cluster
        .keys
        .iter()
        .any(|k| k["account"]["name"] == account && k["index"] == json!(index));
    if exists {
        return Err(ontap_error(
            StatusCode::CONFLICT,
            "duplicate entry",
            "1",
        ));
    }

    cluster.keys.push(json!({
        "account": {"name": account},
        "owner": {"uuid": OWNER_UUID},
        "public_key": body["public_key"],
        "index": index,
        "comment": body.get("comment").cloned().unwrap_or(json!("")),
    }));
    Ok((StatusCode::CREATED, Json(json!({}))))
}

fn find_key(cluster: &Cluster, owner: &str, account: &str, index: u32) -> Option<usize> {
    cluster.keys.iter().position(|k| {
        k["owner"]["uuid"] == json!(owner)
            && k["account"]["name"] == json!(account)
            && k["index"] == json!(index)
    })
}

async fn modify_key(
    State(cluster): State<Shared>,
    headers: HeaderMap,
    Path((owner, account, index)): Path<(String, String, u32)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    authorized(&headers)?;
    let mut cluster = cluster.lock().unwrap();
    cluster.requests.push("PATCH publickeys".to_string());
    let pos = find_key(&cluster, &owner, &account, index)
        .ok_or_else(|| ontap_error(StatusCode::NOT_FOUND, "entry doesn't exist", "4"))?;
    if let Some(comment) = body.get("comment") {
        cluster.keys[pos]["comment"] = comment.clone();
    }
    Ok(Json(json!({})))
}

async fn delete_key(
    State(cluster): State<Shared>,
    headers: HeaderMap,
    Path((owner, account, index)): Path<(String, String, u32)>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    authorized(&headers)?;
    let mut cluster = cluster.lock().unwrap();
    cluster.requests.push("DELETE publickeys".to_string());
    let pos = find_key(&cluster, &owner, &account, index)
        .ok_or_else(|| ontap_error(StatusCode::NOT_FOUND, "entry doesn't exist", "4"))?;
    cluster.keys.remove(pos);
    Ok(Json(json!({})))
}

/// Fake cluster serving the subset of the ONTAP API used for public keys.
pub struct TestServer {
    pub addr: SocketAddr,
    cluster: Shared,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl TestServer {
    /// Spawn a fake cluster reporting the given version.
    pub async fn spawn(version: (u32, u32, u32)) -> Self {
        let cluster: Shared = Arc::new(Mutex::new(Cluster {
            version,
            ..Default::default()
        }));

        let router = Router::new()
            .route("/api/cluster", get(get_cluster))
            .route(
                "/api/security/authentication/publickeys",
                get(list_keys).post(create_key),
            )
            .route(
                "/api/security/authentication/publickeys/{owner}/{account}/{index}",
                axum::routing::patch(modify_key).delete(delete_key),
            )
            .with_state(cluster.clone());

        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
        let actual_addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr: actual_addr,
            cluster,
            shutdown_tx,
        }
    }

    /// Connection settings pointing at this server over plain HTTP.
    pub fn config(&self) -> ConnectionConfig {
        let mut config = ConnectionConfig::new(self.addr.ip().to_string());
        config.https = false;
        config.http_port = Some(self.addr.port());
        config.username = "admin".to_string();
        config.password = "password".to_string();
        config
    }

    /// Seed a key owned by the fake cluster.
    pub fn add_key(&self, account: &str, index: u32, public_key: &str, comment: &str) {
        self.cluster.lock().unwrap().keys.push(json!({
            "account": {"name": account},
            "owner": {"uuid": OWNER_UUID},
            "public_key": public_key,
            "index": index,
            "comment": comment,
        }));
    }

    pub fn keys(&self) -> Vec<Value> {
        self.cluster.lock().unwrap().keys.clone()
    }

    /// Requests served so far, e.g. `"POST publickeys"`.
    pub fn requests(&self) -> Vec<String> {
        self.cluster.lock().unwrap().requests.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}
