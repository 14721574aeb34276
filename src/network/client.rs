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

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::common::config::AppConfig;
use crate::error::{Error, Result};
use crate::metrics::types::{HostRecord, StorageRepoRecord, VmRecord};
use crate::network::jsonrpc::{
    RpcRequest, RpcResponse, HOST_IS_SLAVE, SESSION_AUTHENTICATION_FAILED,
};
use crate::traits::control_plane::{ControlPlane, Credentials, Session};

const NULL_REF: &str = "OpaqueRef:NULL";

#[derive(Debug, Deserialize)]
struct HostRow {
    uuid: String,
    hostname: String,
}

#[derive(Debug, Deserialize)]
struct VmRow {
    uuid: String,
    name_label: String,
    #[serde(default)]
    resident_on: String,
    #[serde(default)]
    is_a_template: bool,
}

#[derive(Debug, Deserialize)]
struct PbdRow {
    #[serde(rename = "SR")]
    sr: String,
}

#[derive(Debug, Deserialize)]
struct SrRow {
    uuid: String,
    name_label: String,
}

/// XenAPI client speaking JSON-RPC to the pool master and plain HTTPS to
/// each host's rrd_updates handler.
///
/// Pool members usually carry self-signed certificates, so certificate
/// verification is disabled.
pub struct XenApiClient {
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl XenApiClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .connect_timeout(AppConfig::connection_timeout())
            .timeout(AppConfig::request_timeout())
            .build()
            .map_err(|source| Error::Http {
                url: "<client setup>".to_string(),
                source,
            })?;

        Ok(Self {
            client,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T> {
        let url = base_url(endpoint)?
            .join(AppConfig::JSONRPC_PATH)
            .map_err(|e| Error::MasterUnreachable(format!("{endpoint}: {e}")))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(method, params, id);

        debug!(%url, method, id, "XenAPI call");
        let http_err = |source| Error::Http {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .post(url.clone())
            .json(&request)
            .send()
            .await
            .map_err(http_err)?
            .error_for_status()
            .map_err(http_err)?;

        let envelope: RpcResponse<T> = response.json().await.map_err(http_err)?;
        envelope.into_result(method)
    }

    async fn login_once(&self, endpoint: &str, credentials: &Credentials) -> Result<Session> {
        let params = vec![
            Value::from(credentials.username.as_str()),
            Value::from(credentials.password.as_str()),
            Value::from(AppConfig::API_VERSION),
            Value::from(AppConfig::CLIENT_ORIGINATOR),
        ];
        let reference: String = self
            .call(endpoint, "session.login_with_password", params)
            .await
            .map_err(|e| match e {
                Error::Api { code, details, .. } if code == SESSION_AUTHENTICATION_FAILED => {
                    Error::Authentication {
                        endpoint: endpoint.to_string(),
                        details: details.join(" "),
                    }
                }
                other => other,
            })?;

        Ok(Session {
            endpoint: endpoint.to_string(),
            reference,
            credentials: credentials.clone(),
        })
    }

    async fn all_records<T: DeserializeOwned>(
        &self,
        session: &Session,
        class: &str,
    ) -> Result<BTreeMap<String, T>> {
        let method = format!("{class}.get_all_records");
        self.call(
            &session.endpoint,
            &method,
            vec![Value::from(session.reference.as_str())],
        )
        .await
    }
}

#[async_trait]
impl ControlPlane for XenApiClient {
    async fn login(&self, endpoint: &str, credentials: &Credentials) -> Result<Session> {
        match self.login_once(endpoint, credentials).await {
            Err(Error::Api { code, details, .. }) if code == HOST_IS_SLAVE => {
                let primary = details.first().ok_or_else(|| {
                    Error::MasterUnreachable(format!(
                        "{endpoint} is a pool member but did not name its primary"
                    ))
                })?;
                let redirected = endpoint_for(endpoint, primary);
                info!(member = endpoint, primary = %redirected, "redirecting login to pool primary");
                self.login_once(&redirected, credentials).await
            }
            other => other,
        }
    }

    async fn list_hosts(&self, session: &Session) -> Result<Vec<HostRecord>> {
        let rows: BTreeMap<String, HostRow> = self.all_records(session, "host").await?;
        let mut hosts: Vec<HostRecord> = rows
            .into_values()
            .map(|row| HostRecord {
                uuid: row.uuid,
                hostname: row.hostname,
            })
            .collect();
        hosts.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        Ok(hosts)
    }

    async fn list_vms(&self, session: &Session) -> Result<Vec<VmRecord>> {
        let rows: BTreeMap<String, VmRow> = self.all_records(session, "VM").await?;
        let mut vms: Vec<VmRecord> = rows
            .into_values()
            .filter(|row| !row.is_a_template && is_live_ref(&row.resident_on))
            .map(|row| VmRecord {
                uuid: row.uuid,
                name: row.name_label,
            })
            .collect();
        vms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(vms)
    }

    async fn list_storage_repos(&self, session: &Session) -> Result<Vec<StorageRepoRecord>> {
        let pbds: BTreeMap<String, PbdRow> = self.all_records(session, "PBD").await?;
        let plugged: HashSet<String> = pbds
            .into_values()
            .map(|pbd| pbd.sr)
            .filter(|sr| is_live_ref(sr))
            .collect();

        let rows: BTreeMap<String, SrRow> = self.all_records(session, "SR").await?;
        let mut repos: Vec<StorageRepoRecord> = rows
            .into_iter()
            .filter(|(reference, _)| plugged.contains(reference))
            .map(|(_, row)| StorageRepoRecord::new(row.uuid, &row.name_label))
            .collect();
        repos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(repos)
    }

    async fn fetch_time_series(
        &self,
        session: &Session,
        host: &str,
        window: Duration,
    ) -> Result<String> {
        let window_secs = window.as_secs().max(1);
        let start = rrd_start(chrono::Utc::now().timestamp(), window_secs);

        let mut url = base_url(&endpoint_for(&session.endpoint, host))?
            .join(AppConfig::RRD_UPDATES_PATH)
            .map_err(|e| Error::MasterUnreachable(format!("{host}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("start", &start.to_string())
            .append_pair("host", "true")
            .append_pair("cf", "ave")
            .append_pair("interval", &window_secs.to_string());

        debug!(%url, "fetching rrd_updates");
        let http_err = |source| Error::Http {
            url: url.to_string(),
            source,
        };
        self.client
            .get(url.clone())
            .basic_auth(
                &session.credentials.username,
                Some(&session.credentials.password),
            )
            .send()
            .await
            .map_err(http_err)?
            .error_for_status()
            .map_err(http_err)?
            .text()
            .await
            .map_err(http_err)
    }

    async fn logout(&self, session: &Session) -> Result<()> {
        let _: Value = self
            .call(
                &session.endpoint,
                "session.logout",
                vec![Value::from(session.reference.as_str())],
            )
            .await?;
        Ok(())
    }
}

/// First timestamp requested from rrd_updates: two windows back, so the
/// newest complete row is always included. Saturates for huge windows.
fn rrd_start(now: i64, window_secs: u64) -> i64 {
    let span = i64::try_from(window_secs)
        .unwrap_or(i64::MAX)
        .saturating_mul(2);
    now.saturating_sub(span)
}

fn is_live_ref(reference: &str) -> bool {
    !reference.is_empty() && reference != NULL_REF
}

/// Base URL of an endpoint given either as a bare host (`xs01`,
/// `10.0.0.1:8443`) or as a full URL. Bare hosts default to HTTPS.
pub fn base_url(endpoint: &str) -> Result<Url> {
    let candidate = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    };
    let mut url = Url::parse(&candidate)
        .map_err(|e| Error::MasterUnreachable(format!("invalid endpoint '{endpoint}': {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Endpoint for `host` that keeps the scheme and port of `reference` when
/// it was given as a full URL.
pub fn endpoint_for(reference: &str, host: &str) -> String {
    if reference.contains("://") {
        if let Ok(mut url) = Url::parse(reference) {
            if url.set_host(Some(host)).is_ok() {
                return url.as_str().trim_end_matches('/').to_string();
            }
        }
    }
    host.to_string()
}
