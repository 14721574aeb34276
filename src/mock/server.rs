// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::mock::args::Args;
use crate::mock::cluster::{generate_uuid, MockCluster};

pub struct MockState {
    cluster: MockCluster,
    sessions: Mutex<HashSet<String>>,
    username: String,
    password: String,
    simulate_members: bool,
}

pub type SharedState = Arc<MockState>;

impl MockState {
    pub fn new(cluster: MockCluster, args: &Args) -> Self {
        Self {
            cluster,
            sessions: Mutex::new(HashSet::new()),
            username: args.username.clone(),
            password: args.password.clone(),
            simulate_members: args.simulate_members,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcCall {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default)]
    pub id: Value,
}

fn success(id: &Value, result: Value) -> Json<Value> {
    Json(json!({ "jsonrpc": "2.0", "result": result, "id": id }))
}

fn failure(id: &Value, code: &str, data: Vec<Value>) -> Json<Value> {
    Json(json!({
        "jsonrpc": "2.0",
        "error": { "code": 1, "message": code, "data": data },
        "id": id,
    }))
}

/// Host part of the `Host` header, without the port.
fn request_host(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::HOST)?.to_str().ok()?;
    Some(value.rsplit_once(':').map_or(value, |(host, _)| host))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/jsonrpc", post(jsonrpc_handler))
        .route("/rrd_updates", get(rrd_updates_handler))
        .with_state(state)
}

pub async fn jsonrpc_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(call): Json<RpcCall>,
) -> Json<Value> {
    let id = &call.id;
    let param = |i: usize| call.params.get(i).and_then(Value::as_str).unwrap_or_default();

    if call.method == "session.login_with_password" {
        if state.simulate_members {
            if let (Some(primary), Some(addressed)) =
                (state.cluster.hosts.first(), request_host(&headers))
            {
                if addressed != primary.hostname {
                    info!(addressed, primary = %primary.hostname, "login on pool member");
                    return failure(id, "HOST_IS_SLAVE", vec![json!(primary.hostname)]);
                }
            }
        }
        if param(0) != state.username || param(1) != state.password {
            warn!(user = param(0), "rejected login");
            return failure(
                id,
                "SESSION_AUTHENTICATION_FAILED",
                vec![json!(param(0)), json!("Authentication failure")],
            );
        }
        let session = format!("OpaqueRef:{}", generate_uuid());
        state.sessions.lock().await.insert(session.clone());
        info!(user = param(0), "session opened");
        return success(id, json!(session));
    }

    let session = param(0);
    if !state.sessions.lock().await.contains(session) {
        return failure(id, "SESSION_INVALID", vec![json!(session)]);
    }

    if call.method == "session.logout" {
        state.sessions.lock().await.remove(session);
        return success(id, json!(""));
    }

    let records = call
        .method
        .strip_suffix(".get_all_records")
        .and_then(|class| state.cluster.all_records(class));
    match records {
        Some(records) => success(id, records),
        None => failure(id, "MESSAGE_METHOD_UNKNOWN", vec![json!(call.method)]),
    }
}

pub async fn rrd_updates_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "));
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"xapi\"")],
            "Authentication required",
        )
            .into_response();
    }

    let Some(host) = request_host(&headers).and_then(|h| state.cluster.host_by_name(h)) else {
        return (StatusCode::NOT_FOUND, "Unknown host").into_response();
    };

    let now = chrono::Utc::now().timestamp();
    (
        [(header::CONTENT_TYPE, "text/xml")],
        state.cluster.rrd_document(host, now),
    )
        .into_response()
}

/// Build the simulated pool and serve it until the process is stopped.
pub async fn start_server(args: Args) -> Result<()> {
    let cluster = MockCluster::generate(args.hosts, args.vms_per_host);
    for host in &cluster.hosts {
        info!(hostname = %host.hostname, uuid = %host.uuid, "simulated host");
    }
    info!(
        hosts = cluster.hosts.len(),
        vms = cluster.vms.len(),
        srs = cluster.srs.len(),
        "pool generated"
    );

    let state = Arc::new(MockState::new(cluster, &args));
    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
