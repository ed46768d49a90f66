//! Transport over TDLib's JSON interface (`libtdjson`).
//!
//! Requests are serialized with the query id folded in as `@extra`, which
//! TDLib echoes back verbatim on the matching response. Messages without
//! an `@extra` are push notifications and surface with request id 0.

use super::api::{Function, Object};
use super::transport::{Response, Transport};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::warn;
use serde_json::Value;
use std::ffi::{CStr, CString, c_char, c_double, c_int};
use std::time::Duration;
use tokio::sync::Mutex;

#[link(name = "tdjson")]
unsafe extern "C" {
    fn td_create_client_id() -> c_int;
    fn td_send(client_id: c_int, request: *const c_char);
    fn td_receive(timeout: c_double) -> *const c_char;
    fn td_execute(request: *const c_char) -> *const c_char;
}

pub struct TdJsonTransport {
    // td_receive must never run on two threads at once.
    receive_guard: Mutex<()>,
}

impl TdJsonTransport {
    pub fn new() -> Self {
        Self {
            receive_guard: Mutex::new(()),
        }
    }
}

impl Default for TdJsonTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for TdJsonTransport {
    fn create_client(&self) -> i32 {
        unsafe { td_create_client_id() }
    }

    fn send(&self, client_id: i32, query_id: u64, function: Function) {
        let Some(request) = encode_request(query_id, &function) else {
            warn!(target: "Td/Json", "failed to encode request {query_id}, dropping");
            return;
        };
        unsafe { td_send(client_id, request.as_ptr()) };
    }

    async fn receive(&self, timeout: Duration) -> Option<Response> {
        let _guard = self.receive_guard.lock().await;
        let secs = timeout.as_secs_f64();
        // The returned pointer is only valid until the next td_receive
        // call, so the copy happens inside the blocking closure.
        let raw = tokio::task::spawn_blocking(move || {
            let ptr = unsafe { td_receive(secs) };
            if ptr.is_null() {
                None
            } else {
                Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
            }
        })
        .await
        .ok()??;
        decode_response(&raw)
    }

    fn execute(&self, function: Function) -> Option<Object> {
        let request = encode_request(0, &function)?;
        let ptr = unsafe { td_execute(request.as_ptr()) };
        if ptr.is_null() {
            return None;
        }
        let raw = unsafe { CStr::from_ptr(ptr) }.to_string_lossy();
        match serde_json::from_str(&raw) {
            Ok(object) => Some(object),
            Err(e) => {
                warn!(target: "Td/Json", "unparseable execute result: {e}");
                None
            }
        }
    }
}

fn encode_request(query_id: u64, function: &Function) -> Option<CString> {
    let mut value = match serde_json::to_value(function) {
        Ok(value) => value,
        Err(e) => {
            warn!(target: "Td/Json", "failed to serialize request: {e}");
            return None;
        }
    };
    if query_id != 0 {
        if let Value::Object(map) = &mut value {
            map.insert("@extra".to_string(), Value::from(query_id));
        }
    }
    CString::new(value.to_string()).ok()
}

fn decode_response(raw: &str) -> Option<Response> {
    let mut value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(target: "Td/Json", "unparseable message from TDLib: {e}");
            return None;
        }
    };
    let client_id = value
        .get("@client_id")
        .and_then(Value::as_i64)
        .unwrap_or_default() as i32;
    let request_id = value
        .get("@extra")
        .and_then(Value::as_u64)
        .unwrap_or_default();
    if value.get("@type").and_then(Value::as_str) == Some("updateUser") {
        decode_minithumbnail(&mut value);
    }
    match serde_json::from_value(value) {
        Ok(object) => Some(Response {
            client_id,
            request_id,
            object,
        }),
        Err(e) => {
            warn!(target: "Td/Json", "failed to deserialize message: {e}");
            None
        }
    }
}

/// TDLib base64-encodes `bytes` fields on the JSON interface; the typed
/// layer wants raw bytes.
fn decode_minithumbnail(value: &mut Value) {
    let Some(data) = value.pointer_mut("/user/profile_photo/minithumbnail/data") else {
        return;
    };
    if let Value::String(encoded) = data {
        let bytes = BASE64.decode(encoded.as_bytes()).unwrap_or_default();
        *data = Value::Array(bytes.into_iter().map(Value::from).collect());
    }
}
