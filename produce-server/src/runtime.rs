use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::broadcast;

use produce_core::{manifest, LocalPlatform};

use crate::error::{io_err, ErrorCode, ServerError};
use crate::paths::{run_dir, socket_path};
use crate::protocol::{RpcRequest, RpcResponse, SERVER_STATUS, SERVER_STOP};
use crate::router::{AppRouter, Procedure};

/// Shared by every client connection.
struct ServerState {
    home: PathBuf,
    router: Arc<AppRouter>,
    started_at_unix: u64,
    served: AtomicU64,
}

/// Start the server runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), ServerError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Serve the settings router on `~/.produce/run/server.sock` until
/// `server.stop` or Ctrl-C.
pub async fn run(home: PathBuf) -> Result<(), ServerError> {
    let manifest = manifest::load_at(&home)?;
    let router = AppRouter::new(Arc::new(LocalPlatform::at(&home))).with_flag_key(manifest.flag_key);
    let state = Arc::new(ServerState {
        home: home.clone(),
        router: Arc::new(router),
        started_at_unix: unix_seconds_now(),
        served: AtomicU64::new(0),
    });

    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let state = state.clone();
        tokio::spawn(async move {
            let result = socket_server_task(state, shutdown.clone(), shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down server");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(ServerError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (socket_result, signal_result) = tokio::join!(socket_handle, signal_handle);
    for (task, joined) in [("socket server", socket_result), ("signal handler", signal_result)] {
        joined.map_err(|err| ServerError::Protocol(format!("{task} task panicked: {err}")))??;
    }
    Ok(())
}

async fn socket_server_task(
    state: Arc<ServerState>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    let run = run_dir(&state.home);
    if !run.exists() {
        fs::create_dir_all(&run).map_err(|e| io_err(&run, e))?;
    }

    let socket = socket_path(&state.home);
    if claim_socket_path(&socket)? == SocketSlot::Reclaimed {
        tracing::warn!(socket = %socket.display(), "removed stale server socket");
    }

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;
    tracing::info!(socket = %socket.display(), "rpc server listening");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let state = state.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    let (reader, writer) = stream.into_split();
                    if let Err(err) =
                        handle_client(BufReader::new(reader), writer, state, shutdown_tx).await
                    {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

/// Serve one connection: one response line per request line.
async fn handle_client<R, W>(
    reader: R,
    mut writer: W,
    state: Arc<ServerState>,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), ServerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("server socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: RpcRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                let rejected =
                    RpcResponse::error(ErrorCode::BadRequest, format!("invalid request JSON: {err}"));
                send_line(&mut writer, &rejected).await?;
                continue;
            }
        };

        let stop = request.path == SERVER_STOP;
        let response = match request.path.as_str() {
            SERVER_STATUS => RpcResponse::ok(build_status_payload(&state)),
            SERVER_STOP => {
                let _ = shutdown_tx.send(());
                RpcResponse::ok(json!({ "stopping": true }))
            }
            _ => dispatch(&state, request).await?,
        };

        send_line(&mut writer, &response).await?;
        if stop {
            break;
        }
    }

    Ok(())
}

/// Router procedures make blocking store calls; keep them off the reactor.
async fn dispatch(state: &Arc<ServerState>, request: RpcRequest) -> Result<RpcResponse, ServerError> {
    let router = state.router.clone();
    let path = request.path.clone();
    let result = tokio::task::spawn_blocking(move || {
        router.dispatch(&request.path, &request.context, &request.input)
    })
    .await
    .map_err(|err| ServerError::Protocol(format!("procedure join error: {err}")))?;

    state.served.fetch_add(1, Ordering::Relaxed);
    match &result {
        Ok(_) => tracing::debug!(path = %path, "procedure completed"),
        Err(err) => tracing::debug!(path = %path, code = %err.code(), error = %err, "procedure failed"),
    }
    Ok(RpcResponse::from_result(result))
}

fn build_status_payload(state: &ServerState) -> Value {
    let procedures: Vec<&str> = Procedure::all().iter().map(|p| p.path()).collect();
    json!({
        "running": true,
        "started_at_unix": state.started_at_unix,
        "requests_served": state.served.load(Ordering::Relaxed),
        "flag_key": state.router.flag_key(),
        "procedures": procedures,
        "socket": socket_path(&state.home).display().to_string(),
    })
}

/// What [`claim_socket_path`] found at the socket path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketSlot {
    Free,
    /// A socket file nobody was listening on; it has been deleted.
    Reclaimed,
}

/// Make `socket` bindable. Fails if another server still answers on it.
fn claim_socket_path(socket: &Path) -> Result<SocketSlot, ServerError> {
    match fs::symlink_metadata(socket) {
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(SocketSlot::Free),
        Err(err) => return Err(io_err(socket, err)),
        Ok(_) => {}
    }

    if StdUnixStream::connect(socket).is_ok() {
        return Err(ServerError::Protocol(format!(
            "another server is listening on {}",
            socket.display()
        )));
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(SocketSlot::Reclaimed),
        // Lost a race with another reclaimer; the path is free either way.
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(SocketSlot::Free),
        Err(err) => Err(io_err(socket, err)),
    }
}

/// One response, one `\n`-terminated line, one write.
async fn send_line<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &RpcResponse,
) -> Result<(), ServerError> {
    let mut frame = serde_json::to_vec(response)?;
    frame.push(b'\n');
    writer.write_all(&frame).await.map_err(|e| io_err("server socket write", e))?;
    writer.flush().await.map_err(|e| io_err("server socket flush", e))
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Line format for [`init_tracing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

const LOG_FORMAT_ENV_VAR: &str = "PRODUCE_LOG_FORMAT";

impl LogFormat {
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Install the fmt subscriber. `RUST_LOG` filters (default `info`);
/// `PRODUCE_LOG_FORMAT=json` switches to one JSON object per event.
/// Calling it again is a no-op.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let format = LogFormat::from_env_value(std::env::var(LOG_FORMAT_ENV_VAR).ok().as_deref());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = match format {
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), ServerError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), ServerError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use produce_core::MemoryPlatform;
    use tempfile::TempDir;
    use tokio::io::{duplex, AsyncReadExt};

    fn state(home: &Path) -> Arc<ServerState> {
        Arc::new(ServerState {
            home: home.to_path_buf(),
            router: Arc::new(AppRouter::new(Arc::new(MemoryPlatform::new()))),
            started_at_unix: 1_000_000,
            served: AtomicU64::new(0),
        })
    }

    /// Feed `input` to a client handler and collect every response line.
    async fn exchange(state: Arc<ServerState>, input: &str) -> (Vec<Value>, bool) {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let (client, server) = duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        let (mut client_read, mut client_write) = tokio::io::split(client);

        client_write
            .write_all(input.as_bytes())
            .await
            .expect("write requests");
        client_write.shutdown().await.expect("close request side");

        handle_client(BufReader::new(server_read), server_write, state, shutdown_tx)
            .await
            .expect("handle client");

        let mut raw = String::new();
        client_read
            .read_to_string(&mut raw)
            .await
            .expect("read responses");
        let responses = raw
            .lines()
            .map(|l| serde_json::from_str(l).expect("response json"))
            .collect();
        (responses, shutdown_rx.try_recv().is_ok())
    }

    #[tokio::test]
    async fn enable_then_status_over_the_wire() {
        let home = TempDir::new().expect("home");
        let input = concat!(
            r#"{"path":"buildEventHandler.enable","teamId":"t","siteId":"s"}"#,
            "\n",
            r#"{"path":"buildEventHandler.status","teamId":"t","siteId":"s"}"#,
            "\n",
        );
        let (responses, stopped) = exchange(state(home.path()), input).await;
        assert!(!stopped);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["data"]["success"], json!(true));
        assert_eq!(responses[1]["data"], json!({ "enabled": true }));
    }

    #[tokio::test]
    async fn bad_json_and_missing_context_are_bad_requests() {
        let home = TempDir::new().expect("home");
        let input = concat!(
            "not json\n",
            "\n",
            r#"{"path":"buildEventHandler.status","teamId":"t"}"#,
            "\n",
        );
        let (responses, _) = exchange(state(home.path()), input).await;
        assert_eq!(responses.len(), 2, "blank lines are skipped");
        assert_eq!(responses[0]["error"]["code"], json!("BAD_REQUEST"));
        assert_eq!(responses[1]["error"]["code"], json!("BAD_REQUEST"));
        assert_eq!(
            responses[1]["error"]["message"],
            json!("Both teamId and siteId are required")
        );
    }

    #[tokio::test]
    async fn stop_ends_connection_and_signals_shutdown() {
        let home = TempDir::new().expect("home");
        let input = concat!(
            r#"{"path":"server.stop"}"#,
            "\n",
            r#"{"path":"server.status"}"#,
            "\n",
        );
        let (responses, stopped) = exchange(state(home.path()), input).await;
        assert!(stopped);
        assert_eq!(responses.len(), 1, "requests after stop are not served");
        assert_eq!(responses[0]["data"], json!({ "stopping": true }));
    }

    #[tokio::test]
    async fn status_payload_counts_served_procedures() {
        let home = TempDir::new().expect("home");
        let state = state(home.path());
        let input = concat!(
            r#"{"path":"teamSettings.query","teamId":"t"}"#,
            "\n",
            r#"{"path":"server.status"}"#,
            "\n",
        );
        let (responses, _) = exchange(state, input).await;
        let status = &responses[1]["data"];
        assert_eq!(status["running"], json!(true));
        assert_eq!(status["started_at_unix"], json!(1_000_000u64));
        assert_eq!(status["requests_served"], json!(1u64));
        assert_eq!(status["flag_key"], json!("EXTENSIONPRODUCE0_ENABLED"));
        assert_eq!(status["procedures"].as_array().map(Vec::len), Some(5));
    }

    #[test]
    fn stale_socket_file_is_reclaimed() {
        let home = TempDir::new().expect("home");
        let socket = socket_path(home.path());
        fs::create_dir_all(socket.parent().unwrap()).unwrap();

        assert_eq!(claim_socket_path(&socket).expect("claim"), SocketSlot::Free);

        fs::write(&socket, b"").unwrap();
        assert_eq!(claim_socket_path(&socket).expect("claim"), SocketSlot::Reclaimed);
        assert!(!socket.exists());
    }

    #[test]
    fn live_socket_is_not_claimed() {
        let home = TempDir::new().expect("home");
        let socket = socket_path(home.path());
        fs::create_dir_all(socket.parent().unwrap()).unwrap();
        let _listener = std::os::unix::net::UnixListener::bind(&socket).expect("bind");

        let err = claim_socket_path(&socket).unwrap_err();
        assert!(err.to_string().contains("another server"), "got: {err}");
        assert!(socket.exists());
    }

    #[tokio::test]
    async fn each_response_is_one_newline_terminated_line() {
        let mut buf = Vec::new();
        send_line(&mut buf, &RpcResponse::ok(json!({ "a": "x\ny" })))
            .await
            .expect("send");
        send_line(&mut buf, &RpcResponse::error(ErrorCode::NotFound, "gone"))
            .await
            .expect("send");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(text.ends_with('\n'));
        let first: Value = serde_json::from_str(lines[0]).expect("json");
        assert_eq!(first["data"]["a"], json!("x\ny"));
    }

    #[test]
    fn log_format_defaults_to_text() {
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Text);
        assert_eq!(LogFormat::from_env_value(Some("pretty")), LogFormat::Text);
        assert_eq!(LogFormat::from_env_value(Some(" JSON ")), LogFormat::Json);
    }
}
