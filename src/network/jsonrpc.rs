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

//! JSON-RPC 2.0 envelopes as spoken by the XenAPI `/jsonrpc` endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// XenAPI failure code returned when logging in to a pool member.
pub const HOST_IS_SLAVE: &str = "HOST_IS_SLAVE";
/// XenAPI failure code for rejected credentials.
pub const SESSION_AUTHENTICATION_FAILED: &str = "SESSION_AUTHENTICATION_FAILED";

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: Vec<Value>,
    pub id: u64,
}

impl<'a> RpcRequest<'a> {
    pub fn new(method: &'a str, params: Vec<Value>, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Vec<Value>,
}

impl RpcError {
    /// Failure parameters rendered as plain strings.
    pub fn details(&self) -> Vec<String> {
        self.data
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

impl<T> RpcResponse<T> {
    /// Turn the envelope into the call's result, mapping XenAPI failures to
    /// [`Error::Api`].
    pub fn into_result(self, method: &str) -> Result<T, Error> {
        if let Some(err) = self.error {
            return Err(Error::Api {
                method: method.to_string(),
                code: err.message.clone(),
                details: err.details(),
            });
        }
        self.result.ok_or_else(|| Error::Api {
            method: method.to_string(),
            code: "EMPTY_RESPONSE".to_string(),
            details: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = RpcRequest::new(
            "session.login_with_password",
            vec![Value::from("root"), Value::from("secret")],
            7,
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["method"], "session.login_with_password");
        assert_eq!(json["params"][0], "root");
        assert_eq!(json["id"], 7);
    }

    #[test]
    fn test_success_response() {
        let body = r#"{"jsonrpc":"2.0","result":"OpaqueRef:1234","id":1}"#;
        let resp: RpcResponse<String> = serde_json::from_str(body).unwrap();
        assert_eq!(resp.into_result("session.login_with_password").unwrap(), "OpaqueRef:1234");
    }

    #[test]
    fn test_failure_response() {
        let body = r#"{"jsonrpc":"2.0","error":{"code":1,"message":"HOST_IS_SLAVE","data":["10.0.0.1"]},"id":1}"#;
        let resp: RpcResponse<String> = serde_json::from_str(body).unwrap();
        match resp.into_result("session.login_with_password") {
            Err(Error::Api { code, details, .. }) => {
                assert_eq!(code, HOST_IS_SLAVE);
                assert_eq!(details, vec!["10.0.0.1".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_response() {
        let resp: RpcResponse<String> = serde_json::from_str(r#"{"id":1}"#).unwrap();
        assert!(matches!(
            resp.into_result("host.get_all_records"),
            Err(Error::Api { code, .. }) if code == "EMPTY_RESPONSE"
        ));
    }

    #[test]
    fn test_non_string_details() {
        let err = RpcError {
            code: 1,
            message: "X".into(),
            data: vec![Value::from(3), Value::from("a")],
        };
        assert_eq!(err.details(), vec!["3".to_string(), "a".to_string()]);
    }
}
