//! End-to-end scenarios against a scripted fake browser, over both the
//! pipe transport (in-memory duplex) and a real WebSocket.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};
use tokio_tungstenite::tungstenite::Message;

use cdp::domains::{browser, network, page, target};
use cdp::{CDPClient, CDPError, CDPSession};

type RemoteReader = BufReader<ReadHalf<DuplexStream>>;
type RemoteWriter = WriteHalf<DuplexStream>;

fn pipe_client() -> (Arc<CDPClient>, RemoteReader, RemoteWriter) {
    let (local, remote) = tokio::io::duplex(64 * 1024);
    let (read, write) = tokio::io::split(local);
    let client = CDPClient::connect_pipe(read, write);
    let (remote_read, remote_write) = tokio::io::split(remote);
    (client, BufReader::new(remote_read), remote_write)
}

async fn read_command(reader: &mut RemoteReader) -> Value {
    let mut frame = Vec::new();
    reader.read_until(0, &mut frame).await.unwrap();
    assert_eq!(frame.pop(), Some(0));
    serde_json::from_slice(&frame).unwrap()
}

async fn write_message(writer: &mut RemoteWriter, message: Value) {
    let mut bytes = serde_json::to_vec(&message).unwrap();
    bytes.push(0);
    writer.write_all(&bytes).await.unwrap();
}

async fn attach_session(
    client: &Arc<CDPClient>,
    reader: &mut RemoteReader,
    writer: &mut RemoteWriter,
    session_id: &str,
) -> Arc<CDPSession> {
    let attach = {
        let client = client.clone();
        tokio::spawn(async move { client.attach("tgt-1").await })
    };
    let command = read_command(reader).await;
    assert_eq!(command["method"], "Target.attachToTarget");
    write_message(
        writer,
        json!({"id": command["id"], "result": {"sessionId": session_id}}),
    )
    .await;
    attach.await.unwrap().unwrap()
}

#[tokio::test]
async fn typed_call_with_empty_result() {
    let (client, mut reader, mut writer) = pipe_client();

    let call = {
        let client = client.clone();
        tokio::spawn(async move { client.send(network::Enable::default()).await })
    };
    let command = read_command(&mut reader).await;
    assert_eq!(command["method"], "Network.enable");
    assert!(command.get("params").is_none());
    write_message(&mut writer, json!({"id": command["id"], "result": {}})).await;

    call.await.unwrap().unwrap();
}

#[tokio::test]
async fn typed_navigate_surfaces_remote_error() {
    let (client, mut reader, mut writer) = pipe_client();
    let session = attach_session(&client, &mut reader, &mut writer, "sess-1").await;

    let call = {
        let session = session.clone();
        tokio::spawn(async move { session.send(page::Navigate::new("http://example/")).await })
    };
    let command = read_command(&mut reader).await;
    assert_eq!(command["method"], "Page.navigate");
    assert_eq!(command["params"], json!({"url": "http://example/"}));
    assert_eq!(command["sessionId"], "sess-1");

    write_message(
        &mut writer,
        json!({
            "id": command["id"],
            "error": {"code": -32000, "message": "Cannot navigate"},
            "sessionId": "sess-1",
        }),
    )
    .await;

    match call.await.unwrap() {
        Err(CDPError::Remote { code, .. }) => assert_eq!(code, -32000),
        other => panic!("expected Remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn typed_lifecycle_event_is_decoded_on_the_session() {
    let (client, mut reader, mut writer) = pipe_client();
    let session = attach_session(&client, &mut reader, &mut writer, "abc").await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    session.on_event(move |event: page::LifecycleEvent| {
        let _ = tx.send(event.name);
    });

    write_message(
        &mut writer,
        json!({
            "method": "Page.lifecycleEvent",
            "params": {"frameId": "f1", "loaderId": "l1", "name": "load", "timestamp": 1.5},
            "sessionId": "abc",
        }),
    )
    .await;

    assert_eq!(rx.recv().await.unwrap(), "load");
}

#[tokio::test]
async fn typed_get_targets_unwraps_the_result_field() {
    let (client, mut reader, mut writer) = pipe_client();

    let call = {
        let client = client.clone();
        tokio::spawn(async move { client.send(target::GetTargets {}).await })
    };
    let command = read_command(&mut reader).await;
    assert_eq!(command["method"], "Target.getTargets");
    write_message(
        &mut writer,
        json!({
            "id": command["id"],
            "result": {"targetInfos": [{
                "targetId": "tgt-1",
                "type": "page",
                "title": "Example",
                "url": "http://example/",
                "attached": false,
            }]},
        }),
    )
    .await;

    let targets = call.await.unwrap().unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].target_id, "tgt-1");
    assert_eq!(targets[0].target_type, "page");
}

#[tokio::test]
async fn attach_uses_the_protocol_assigned_session_id() {
    let (client, mut reader, mut writer) = pipe_client();
    let session = attach_session(&client, &mut reader, &mut writer, "sess-9").await;
    assert_eq!(session.session_id(), "sess-9");
    assert_eq!(session.target_id(), "tgt-1");
}

#[tokio::test]
async fn deferred_typed_call_resolves_when_awaited() {
    let (client, mut reader, mut writer) = pipe_client();

    let pending = client.send_async(browser::GetVersion {}).await.unwrap();
    let command = read_command(&mut reader).await;
    assert_eq!(command["method"], "Browser.getVersion");
    write_message(
        &mut writer,
        json!({
            "id": command["id"],
            "result": {
                "protocolVersion": "1.3",
                "product": "FakeBrowser/1.0",
                "revision": "r0",
                "userAgent": "fake",
                "jsVersion": "0",
            },
        }),
    )
    .await;

    let version = pending.await.unwrap();
    assert_eq!(version.product, "FakeBrowser/1.0");
}

#[tokio::test]
async fn socket_transport_round_trip() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Text(text) => {
                    let command: Value = serde_json::from_str(&text).unwrap();
                    let response = json!({
                        "id": command["id"],
                        "result": {
                            "protocolVersion": "1.3",
                            "product": "FakeBrowser/1.0",
                            "revision": "r0",
                            "userAgent": "fake",
                            "jsVersion": "0",
                        },
                    });
                    ws.send(Message::Text(response.to_string())).await.unwrap();
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let client = CDPClient::connect(&format!("ws://{}", addr)).await.unwrap();
    let version = client.send(browser::GetVersion {}).await.unwrap();
    assert_eq!(version.product, "FakeBrowser/1.0");
    client.close().await;
    let _ = server.await;
}

#[tokio::test]
async fn connect_rejects_invalid_endpoint() {
    match CDPClient::connect("not a url").await {
        Err(CDPError::Connect(_)) => {}
        other => panic!("expected Connect error, got {:?}", other.map(|_| ())),
    }
}
