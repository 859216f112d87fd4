use futures::{SinkExt, StreamExt};
use parley_channels::{ChannelLease, RealtimeChannel, SocketChannel};
use parley_core::config::RealtimeConfig;
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};

struct ServerSession {
    frames: Vec<Value>,
    close_after_send: bool,
}

struct MockServer {
    url: String,
    connection_count: Arc<AtomicUsize>,
    received_rx: mpsc::UnboundedReceiver<Value>,
    closed_rx: mpsc::UnboundedReceiver<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MockServer {
    async fn spawn(sessions: Vec<ServerSession>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server listener");
        let addr = listener.local_addr().expect("get mock server address");
        let url = format!("ws://{}", addr);

        let connection_count = Arc::new(AtomicUsize::new(0));
        let conn_count_ref = Arc::clone(&connection_count);

        let (received_tx, received_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            for session in sessions {
                let (stream, _) = tokio::select! {
                    _ = &mut shutdown_rx => return,
                    accepted = listener.accept() => match accepted {
                        Ok(v) => v,
                        Err(_) => return,
                    }
                };

                conn_count_ref.fetch_add(1, Ordering::SeqCst);

                let ws = match accept_async(stream).await {
                    Ok(ws) => ws,
                    Err(_) => return,
                };
                let (mut write, mut read) = ws.split();

                for frame in session.frames {
                    if write.send(WsMessage::Text(frame.to_string())).await.is_err() {
                        return;
                    }
                }

                if session.close_after_send {
                    let _ = write.send(WsMessage::Close(None)).await;
                    continue;
                }

                loop {
                    tokio::select! {
                        _ = &mut shutdown_rx => {
                            let _ = write.send(WsMessage::Close(None)).await;
                            return;
                        }
                        ws_msg = read.next() => {
                            match ws_msg {
                                Some(Ok(WsMessage::Text(text))) => {
                                    if let Ok(parsed) = serde_json::from_str::<Value>(&text) {
                                        let _ = received_tx.send(parsed);
                                    }
                                }
                                Some(Ok(WsMessage::Close(_))) | None | Some(Err(_)) => {
                                    let _ = closed_tx.send(());
                                    break;
                                }
                                _ => {}
                            }
                        }
                    }
                }
            }
        });

        Self {
            url,
            connection_count,
            received_rx,
            closed_rx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    async fn recv_frame(&mut self) -> Value {
        timeout(Duration::from_secs(3), self.received_rx.recv())
            .await
            .expect("wait for client frame")
            .expect("receive client frame")
    }

    async fn wait_closed(&mut self) {
        timeout(Duration::from_secs(3), self.closed_rx.recv())
            .await
            .expect("wait for client close")
            .expect("client close signal");
    }

    fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::SeqCst)
    }

    async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = timeout(Duration::from_secs(3), task).await;
        }
    }
}

fn config(url: &str) -> RealtimeConfig {
    RealtimeConfig {
        url: url.to_string(),
        event: "chat message".to_string(),
        reconnect_delay_secs: 0,
    }
}

async fn wait_until<F: Fn() -> bool>(check: F) {
    timeout(Duration::from_secs(3), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_connect_then_disconnect_closes_socket() {
    let mut server = MockServer::spawn(vec![ServerSession {
        frames: Vec::new(),
        close_after_send: false,
    }])
    .await;

    let channel = SocketChannel::new(&config(&server.url));
    channel.connect().await.unwrap();
    assert!(channel.is_connected());
    assert_eq!(server.connection_count(), 1);

    channel.disconnect();
    assert!(!channel.is_connected());
    server.wait_closed().await;

    let err = channel.emit("chat message", json!({})).await.unwrap_err();
    assert!(err.to_string().contains("not connected"));
    server.shutdown().await;
}

#[tokio::test]
async fn test_emit_sends_envelope_and_receives_broadcast() {
    let mut server = MockServer::spawn(vec![ServerSession {
        frames: vec![json!({
            "event": "chat message",
            "data": {"message": "hi", "message_id": "a", "sender_id": 42}
        })],
        close_after_send: false,
    }])
    .await;

    let channel = SocketChannel::new(&config(&server.url));
    let mut rx = channel.subscribe("chat message");
    channel.connect().await.unwrap();

    let inbound = timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("wait inbound")
        .expect("inbound payload");
    assert_eq!(inbound["message_id"], json!("a"));

    channel
        .emit("chat message", json!({"message": "yo", "message_id": "b", "sender_id": 7}))
        .await
        .unwrap();
    let frame = server.recv_frame().await;
    assert_eq!(frame["event"], json!("chat message"));
    assert_eq!(frame["data"]["message"], json!("yo"));

    channel.disconnect();
    server.wait_closed().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let server = MockServer::spawn(vec![
        ServerSession {
            frames: Vec::new(),
            close_after_send: true,
        },
        ServerSession {
            frames: vec![json!({"event": "chat message", "data": {"message": "back"}})],
            close_after_send: false,
        },
    ])
    .await;

    let channel = SocketChannel::new(&config(&server.url));
    let mut rx = channel.subscribe("chat message");
    channel.connect().await.unwrap();

    let payload = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("wait for payload after reconnect")
        .expect("payload");
    assert_eq!(payload["message"], json!("back"));
    assert_eq!(server.connection_count(), 2);

    channel.disconnect();
    server.shutdown().await;
}

#[tokio::test]
async fn test_connection_closes_only_after_last_lease() {
    let mut server = MockServer::spawn(vec![ServerSession {
        frames: Vec::new(),
        close_after_send: false,
    }])
    .await;

    let channel = Arc::new(SocketChannel::new(&config(&server.url)));
    channel.connect().await.unwrap();

    let first = ChannelLease::new(channel.clone());
    let second = first.clone();

    assert!(!first.release());
    second
        .emit("chat message", json!({"message": "still here"}))
        .await
        .unwrap();
    assert_eq!(server.recv_frame().await["data"]["message"], json!("still here"));

    assert!(second.release());
    server.wait_closed().await;
    let probe = channel.clone();
    wait_until(move || !probe.is_connected()).await;

    server.shutdown().await;
}
