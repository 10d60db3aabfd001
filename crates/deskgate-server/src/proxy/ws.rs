//! WebSocket splicing for the WS namespace.
//!
//! The client upgrade is accepted first; the backend handshake runs inside
//! the upgraded task. Once both legs are up, frames flow in both directions
//! until either side closes or errors.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

use crate::state::AppState;

/// Handle a WebSocket upgrade for the WS namespace.
pub(crate) async fn forward_ws(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    ws: WebSocketUpgrade,
) -> Response {
    let request = match build_upstream_request(&state, &uri, &headers) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "Invalid upstream WebSocket request");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let protocols = client_protocols(&headers);
    let ws = if protocols.is_empty() {
        ws
    } else {
        ws.protocols(protocols)
    };

    ws.on_upgrade(move |socket| splice(socket, request))
}

/// Build the upstream handshake request mirroring the client's upgrade.
///
/// The offered subprotocols are forwarded so the backend can pick one.
/// Sec-WebSocket-Extensions is not forwarded; each leg negotiates its own.
fn build_upstream_request(
    state: &AppState,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<tungstenite::handshake::client::Request, tungstenite::Error> {
    use tungstenite::client::IntoClientRequest;

    let path = state.rewritten_path(uri.path());
    let query = uri.query().map(|q| format!("?{q}")).unwrap_or_default();
    let target = format!("{}{path}{query}", state.backend_ws_origin);

    let mut request = target.into_client_request()?;
    if let Some(protocol) = headers.get("sec-websocket-protocol") {
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", protocol.clone());
    }
    Ok(request)
}

/// Subprotocols offered by the client, in offer order.
fn client_protocols(headers: &HeaderMap) -> Vec<String> {
    headers
        .get("sec-websocket-protocol")
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .map(|protocol| protocol.trim().to_owned())
                .filter(|protocol| !protocol.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Connect the backend leg and splice frames between the two sockets.
///
/// A backend that cannot be reached within the connect timeout, or that
/// rejects the handshake, results in a close frame to the client rather
/// than a half-open connection. No retries are attempted.
async fn splice(client: WebSocket, request: tungstenite::handshake::client::Request) {
    let target = request.uri().to_string();
    let connect = tokio::time::timeout(
        super::CONNECT_TIMEOUT,
        tokio_tungstenite::connect_async(request),
    )
    .await;

    let upstream = match connect {
        Ok(Ok((upstream, _response))) => upstream,
        Ok(Err(err)) => {
            tracing::warn!(target = %target, error = %err, "Backend WebSocket handshake failed");
            close_client(client, "backend handshake failed").await;
            return;
        }
        Err(_) => {
            tracing::warn!(target = %target, "Backend WebSocket connect timed out");
            close_client(client, "backend connect timed out").await;
            return;
        }
    };
    tracing::debug!(target = %target, "WebSocket spliced");

    let (mut upstream_tx, mut upstream_rx) = upstream.split();
    let (mut client_tx, mut client_rx) = client.split();

    // One loop over both directions keeps the legs tied together: when
    // either side closes or errors, the loop ends and both halves drop.
    loop {
        tokio::select! {
            frame = client_rx.next() => match frame {
                Some(Ok(frame)) => {
                    let forward = to_upstream(frame);
                    let closing = matches!(forward, tungstenite::Message::Close(_));
                    if upstream_tx.send(forward).await.is_err() || closing {
                        break;
                    }
                }
                _ => break,
            },
            frame = upstream_rx.next() => match frame {
                Some(Ok(frame)) => {
                    if let Some(forward) = to_client(frame) {
                        let closing = matches!(forward, Message::Close(_));
                        if client_tx.send(forward).await.is_err() || closing {
                            break;
                        }
                    }
                }
                _ => break,
            },
        }
    }
}

/// Close the client connection after a failed backend leg.
async fn close_client(mut client: WebSocket, reason: &'static str) {
    let frame = CloseFrame {
        code: close_code::ERROR,
        reason: reason.into(),
    };
    if client.send(Message::Close(Some(frame))).await.is_err() {
        tracing::debug!("Client socket already gone during close");
    }
}

/// Convert a client frame for the upstream leg.
fn to_upstream(frame: Message) -> tungstenite::Message {
    match frame {
        Message::Text(text) => tungstenite::Message::Text(text.as_str().into()),
        Message::Binary(data) => tungstenite::Message::Binary(data),
        Message::Ping(data) => tungstenite::Message::Ping(data),
        Message::Pong(data) => tungstenite::Message::Pong(data),
        Message::Close(frame) => tungstenite::Message::Close(frame.map(|frame| {
            tungstenite::protocol::CloseFrame {
                code: frame.code.into(),
                reason: frame.reason.as_str().into(),
            }
        })),
    }
}

/// Convert an upstream frame for the client leg.
///
/// Raw protocol frames never surface through the client socket API and are
/// dropped.
fn to_client(frame: tungstenite::Message) -> Option<Message> {
    match frame {
        tungstenite::Message::Text(text) => Some(Message::Text(text.as_str().into())),
        tungstenite::Message::Binary(data) => Some(Message::Binary(data)),
        tungstenite::Message::Ping(data) => Some(Message::Ping(data)),
        tungstenite::Message::Pong(data) => Some(Message::Pong(data)),
        tungstenite::Message::Close(frame) => Some(Message::Close(frame.map(|frame| {
            CloseFrame {
                code: frame.code.into(),
                reason: frame.reason.as_str().into(),
            }
        }))),
        tungstenite::Message::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use crate::ServerConfig;

    use super::*;

    const RECV_TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn text_frames_cross_both_directions() {
        let out = to_upstream(Message::Text("hi".into()));
        assert!(matches!(out, tungstenite::Message::Text(ref t) if t.as_str() == "hi"));

        let back = to_client(tungstenite::Message::Text("yo".into()));
        assert!(matches!(back, Some(Message::Text(ref t)) if t.as_str() == "yo"));
    }

    #[test]
    fn binary_frames_pass_through_unchanged() {
        let payload = axum::body::Bytes::from_static(b"\x00\x01\x02");

        let out = to_upstream(Message::Binary(payload.clone()));
        assert!(matches!(out, tungstenite::Message::Binary(ref b) if *b == payload));

        let back = to_client(tungstenite::Message::Binary(payload.clone()));
        assert!(matches!(back, Some(Message::Binary(ref b)) if *b == payload));
    }

    #[test]
    fn close_frames_carry_code_and_reason() {
        let frame = CloseFrame {
            code: close_code::AWAY,
            reason: "done".into(),
        };

        match to_upstream(Message::Close(Some(frame))) {
            tungstenite::Message::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), close_code::AWAY);
                assert_eq!(frame.reason.as_str(), "done");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn offered_subprotocols_are_parsed_in_order() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "sec-websocket-protocol",
            "graphql-ws, chat".parse().unwrap(),
        );

        assert_eq!(client_protocols(&headers), vec!["graphql-ws", "chat"]);
        assert_eq!(client_protocols(&HeaderMap::new()), Vec::<String>::new());
    }

    /// Starts a backend that echoes every frame on `/ws/*`.
    async fn spawn_ws_echo_backend() -> SocketAddr {
        async fn ws_echo(ws: WebSocketUpgrade) -> Response {
            ws.on_upgrade(|mut socket| async move {
                while let Some(Ok(frame)) = socket.recv().await {
                    if socket.send(frame).await.is_err() {
                        break;
                    }
                }
            })
        }

        let app = axum::Router::new().route("/ws/{*rest}", axum::routing::any(ws_echo));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    /// Starts a gateway over a throwaway asset root. The tempdir must stay
    /// alive for the duration of the test.
    async fn spawn_gateway(backend_origin: &str) -> (SocketAddr, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.html"),
            "<html><head></head><body>App</body></html>",
        )
        .unwrap();

        let config = ServerConfig {
            asset_root: dir.path().to_path_buf(),
            backend_origin: backend_origin.to_owned(),
            ..ServerConfig::default()
        };
        let state = crate::build_state(&config).await.unwrap();
        let app = crate::app::create_router(Arc::new(state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, dir)
    }

    #[tokio::test]
    async fn frames_cross_the_splice_in_both_directions() {
        let backend = spawn_ws_echo_backend().await;
        let (gateway, _dir) = spawn_gateway(&format!("http://{backend}")).await;

        let (mut socket, _) =
            tokio_tungstenite::connect_async(format!("ws://{gateway}/ws/updates"))
                .await
                .unwrap();

        socket
            .send(tungstenite::Message::Text("ticket:42".into()))
            .await
            .unwrap();
        let reply = tokio::time::timeout(RECV_TIMEOUT, socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(reply, tungstenite::Message::Text("ticket:42".into()));

        socket
            .send(tungstenite::Message::Binary(
                axum::body::Bytes::from_static(b"\x01\x02"),
            ))
            .await
            .unwrap();
        let reply = tokio::time::timeout(RECV_TIMEOUT, socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(
            reply,
            tungstenite::Message::Binary(axum::body::Bytes::from_static(b"\x01\x02"))
        );
    }

    #[tokio::test]
    async fn unreachable_backend_closes_the_client_with_an_error_code() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = listener.local_addr().unwrap();
        drop(listener);

        let (gateway, _dir) = spawn_gateway(&format!("http://{dead}")).await;

        // The client-side upgrade succeeds; the splice then closes it
        let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{gateway}/ws/live"))
            .await
            .unwrap();

        let frame = tokio::time::timeout(RECV_TIMEOUT, socket.next())
            .await
            .unwrap();
        match frame {
            Some(Ok(tungstenite::Message::Close(Some(frame)))) => {
                assert_eq!(u16::from(frame.code), close_code::ERROR);
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }
}
