//! Newline-delimited JSON RPC.
//!
//! ```text
//! → {"path":"buildEventHandler.status","teamId":"t","siteId":"s"}
//! ← {"ok":true,"data":{"enabled":false}}
//! ← {"ok":false,"error":{"code":"BAD_REQUEST","message":"Both teamId and siteId are required"}}
//! ```

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use produce_core::types::RequestContext;

use crate::error::{io_err, ErrorCode, RouterError, ServerError};
use crate::paths::socket_path;
use crate::router::AppRouter;

/// Server-level paths handled by the runtime, not the router.
pub const SERVER_STATUS: &str = "server.status";
pub const SERVER_STOP: &str = "server.stop";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub path: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub input: Value,
    #[serde(flatten)]
    pub context: RequestContext,
}

impl RpcRequest {
    pub fn new(path: impl Into<String>, context: RequestContext) -> Self {
        Self {
            path: path.into(),
            input: Value::Null,
            context,
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(RpcErrorBody {
                code,
                message: message.into(),
            }),
        }
    }

    /// The cause of an internal error stays server-side; only the message
    /// crosses the wire.
    pub fn from_result(result: Result<Value, RouterError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::error(err.code(), err.to_string()),
        }
    }

    pub fn into_data(self) -> Result<Value, ServerError> {
        if self.ok {
            return Ok(self.data.unwrap_or(Value::Null));
        }
        let body = self.error.unwrap_or(RpcErrorBody {
            code: ErrorCode::InternalServerError,
            message: "unknown server error".to_string(),
        });
        Err(ServerError::Rpc {
            code: body.code,
            message: body.message,
        })
    }
}

/// Something that can carry an RPC call to the router.
pub trait RpcTransport {
    fn call(&self, request: &RpcRequest) -> Result<RpcResponse, ServerError>;
}

/// Calls the router directly on the current thread.
#[derive(Clone)]
pub struct InProcessTransport {
    router: Arc<AppRouter>,
}

impl InProcessTransport {
    pub fn new(router: Arc<AppRouter>) -> Self {
        Self { router }
    }
}

impl RpcTransport for InProcessTransport {
    fn call(&self, request: &RpcRequest) -> Result<RpcResponse, ServerError> {
        let result = self
            .router
            .dispatch(&request.path, &request.context, &request.input);
        Ok(RpcResponse::from_result(result))
    }
}

/// Talks to a running server over its Unix socket.
#[derive(Debug, Clone)]
pub struct SocketTransport {
    home: PathBuf,
}

impl SocketTransport {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }
}

impl RpcTransport for SocketTransport {
    fn call(&self, request: &RpcRequest) -> Result<RpcResponse, ServerError> {
        send_request(&self.home, request)
    }
}

/// Send one JSON request to the server socket and return one response.
pub fn send_request(home: &Path, request: &RpcRequest) -> Result<RpcResponse, ServerError> {
    let socket = socket_path(home);
    if !socket.exists() {
        return Err(ServerError::ServerNotRunning { socket });
    }

    let mut stream = UnixStream::connect(&socket).map_err(|err| {
        if matches!(
            err.kind(),
            std::io::ErrorKind::NotFound
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
        ) {
            ServerError::ServerNotRunning {
                socket: socket.clone(),
            }
        } else {
            io_err(&socket, err)
        }
    })?;

    let payload = serde_json::to_string(request)?;
    stream
        .write_all(payload.as_bytes())
        .map_err(|e| io_err(&socket, e))?;
    stream.write_all(b"\n").map_err(|e| io_err(&socket, e))?;
    stream.flush().map_err(|e| io_err(&socket, e))?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| io_err(&socket, e))?;
    if read == 0 {
        return Err(ServerError::Protocol(
            "server closed connection before responding".to_string(),
        ));
    }

    Ok(serde_json::from_str(line.trim_end())?)
}

pub fn request_status(home: &Path) -> Result<Value, ServerError> {
    send_request(home, &RpcRequest::new(SERVER_STATUS, RequestContext::default()))?.into_data()
}

pub fn request_stop(home: &Path) -> Result<(), ServerError> {
    send_request(home, &RpcRequest::new(SERVER_STOP, RequestContext::default()))?
        .into_data()
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use produce_core::types::{SiteId, TeamId};
    use produce_core::MemoryPlatform;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn request_wire_shape() {
        let request = RpcRequest::new(
            "buildEventHandler.status",
            RequestContext::new(Some(TeamId::from("t")), Some(SiteId::from("s"))),
        );
        let encoded = serde_json::to_value(&request).expect("encode");
        assert_eq!(
            encoded,
            json!({ "path": "buildEventHandler.status", "teamId": "t", "siteId": "s" })
        );

        let decoded: RpcRequest =
            serde_json::from_str(r#"{"path":"teamSettings.query"}"#).expect("decode");
        assert_eq!(decoded.context, RequestContext::default());
        assert_eq!(decoded.input, Value::Null);
    }

    #[test]
    fn error_response_wire_shape() {
        let response = RpcResponse::error(ErrorCode::BadRequest, "teamId is required");
        assert_eq!(
            serde_json::to_value(&response).expect("encode"),
            json!({ "ok": false, "error": { "code": "BAD_REQUEST", "message": "teamId is required" } })
        );
        let err = response.into_data().unwrap_err();
        assert!(matches!(
            err,
            ServerError::Rpc {
                code: ErrorCode::BadRequest,
                ..
            }
        ));
    }

    #[test]
    fn in_process_transport_dispatches() {
        let router = Arc::new(AppRouter::new(Arc::new(MemoryPlatform::new())));
        let transport = InProcessTransport::new(router);
        let response = transport
            .call(&RpcRequest::new("nope", RequestContext::default()))
            .expect("call");
        assert_eq!(response.error.map(|e| e.code), Some(ErrorCode::NotFound));
    }

    #[test]
    fn socket_transport_reports_not_running() {
        let home = TempDir::new().expect("home");
        let err = SocketTransport::new(home.path())
            .call(&RpcRequest::new(SERVER_STATUS, RequestContext::default()))
            .unwrap_err();
        assert!(matches!(err, ServerError::ServerNotRunning { .. }));
    }
}
