//! End-to-end tests driving the mock conductor over real WebSocket
//! connections, the way a conductor-api client would.

use std::time::Duration;

use assert_matches::assert_matches;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use conductor_mock::wire::codec::{decode_response, decode_signal, encode_envelope, encode_request};
use conductor_mock::wire::types::{DecodedResponse, Envelope, Request, Value};
use conductor_mock::wire::tags;
use conductor_mock::{ConductorConfig, ConductorError, MockConductor, MockResponse};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn map(entries: Vec<(&str, Value)>) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (Value::from(k), v))
            .collect(),
    )
}

async fn connect(port: u16) -> Client {
    let (ws, _) = connect_async(format!("ws://127.0.0.1:{port}"))
        .await
        .expect("client connect failed");
    ws
}

fn request_frame(id: u64, tag: &str, data: Value) -> Message {
    let request = Request::new(tag, data);
    let envelope = Envelope {
        id: Value::from(id),
        data: encode_request(&request).unwrap(),
    };
    Message::binary(encode_envelope(&envelope).unwrap())
}

async fn recv(ws: &mut Client) -> Message {
    timeout(RECV_TIMEOUT, ws.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("connection closed")
        .expect("read failed")
}

async fn recv_binary(ws: &mut Client) -> Vec<u8> {
    loop {
        match recv(ws).await {
            Message::Binary(bytes) => return bytes.to_vec(),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Issue one request and decode its reply.
async fn call(ws: &mut Client, id: u64, tag: &str, data: Value) -> DecodedResponse {
    ws.send(request_frame(id, tag, data))
        .await
        .expect("send failed");
    let bytes = recv_binary(ws).await;
    decode_response(&bytes, tag).unwrap()
}

#[tokio::test]
async fn any_response_answers_every_request() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let port = conductor.add_port(0).await.unwrap();
    conductor.register_any(MockResponse::ok(Value::from("fake-response")));

    let mut ws = connect(port).await;
    for id in 0..3u64 {
        let reply = call(&mut ws, id, tags::LIST_DNAS, Value::Nil).await;
        assert_eq!(reply.id, Value::from(id));
        assert_eq!(reply.tag, tags::LIST_DNAS);
        assert_eq!(reply.data, Value::from("fake-response"));
    }

    conductor.close().await;
}

#[tokio::test]
async fn next_responses_serve_in_registration_order() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let port = conductor.add_port(0).await.unwrap();
    conductor.register_next(MockResponse::ok(Value::from("first")));
    conductor.register_next(MockResponse::ok(Value::from("second")));
    conductor.register_any(MockResponse::ok(Value::from("fallback")));

    let mut ws = connect(port).await;
    // `next` ignores the request entirely, so unrelated types drain it.
    let reply = call(&mut ws, 1, tags::LIST_DNAS, Value::Nil).await;
    assert_eq!(reply.data, Value::from("first"));
    let reply = call(&mut ws, 2, tags::APP_INFO, Value::Nil).await;
    assert_eq!(reply.data, Value::from("second"));
    let reply = call(&mut ws, 3, tags::APP_INFO, Value::Nil).await;
    assert_eq!(reply.data, Value::from("fallback"));

    conductor.close().await;
}

#[tokio::test]
async fn next_takes_priority_over_once_and_any() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let port = conductor.add_port(0).await.unwrap();
    let data = map(vec![("installed_app_id", Value::from("test-app"))]);
    conductor
        .register_once(tags::APP_INFO, &data, MockResponse::ok(Value::from("keyed")))
        .unwrap();
    conductor.register_any(MockResponse::ok(Value::from("fallback")));
    conductor.register_next(MockResponse::ok(Value::from("jumped the queue")));

    let mut ws = connect(port).await;
    let reply = call(&mut ws, 1, tags::APP_INFO, data.clone()).await;
    assert_eq!(reply.data, Value::from("jumped the queue"));
    // Queue drained, the keyed response is still there.
    let reply = call(&mut ws, 2, tags::APP_INFO, data).await;
    assert_eq!(reply.data, Value::from("keyed"));

    conductor.close().await;
}

#[tokio::test]
async fn once_response_is_consumed_after_one_use() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let port = conductor.add_port(0).await.unwrap();
    let data = map(vec![("installed_app_id", Value::from("test-app"))]);
    let app_info = map(vec![(
        "cell_data",
        Value::Array(vec![Value::Array(vec![
            Value::Array(vec![Value::from("hash"), Value::from("agentKey")]),
            Value::from("cell-nick"),
        ])]),
    )]);
    conductor
        .register_once(tags::APP_INFO, &data, MockResponse::ok(app_info.clone()))
        .unwrap();

    let mut ws = connect(port).await;
    let reply = call(&mut ws, 1, tags::APP_INFO, data.clone()).await;
    assert_eq!(reply.tag, tags::APP_INFO);
    assert_eq!(reply.data, app_info);

    // Second identical request: queue exhausted, no fallback registered.
    let reply = call(&mut ws, 2, tags::APP_INFO, data).await;
    assert_eq!(reply.tag, tags::ERROR);
    assert_eq!(
        reply.data.as_str(),
        Some(r#"No more responses for: app_info:{"installed_app_id":"test-app"}"#)
    );

    conductor.close().await;
}

#[tokio::test]
async fn once_matching_ignores_volatile_fields() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let port = conductor.add_port(0).await.unwrap();
    let registered = map(vec![
        ("cell_id", Value::from("cell-1")),
        ("zome_name", Value::from("chat")),
        ("fn_name", Value::from("send")),
    ]);
    conductor
        .register_once(
            tags::ZOME_CALL,
            &registered,
            MockResponse::ok(Value::from("sent")),
        )
        .unwrap();

    // The live call carries payload and provenance; matching must not
    // look at either.
    let live = map(vec![
        ("cell_id", Value::from("cell-1")),
        ("zome_name", Value::from("chat")),
        ("fn_name", Value::from("send")),
        ("payload", map(vec![("message", Value::from("hi"))])),
        ("provenance", Value::Binary(vec![0x01, 0x02])),
    ]);
    let mut ws = connect(port).await;
    let reply = call(&mut ws, 1, tags::ZOME_CALL, live).await;
    assert_eq!(reply.tag, tags::ZOME_CALL);
    assert_eq!(reply.data, Value::from("sent"));

    conductor.close().await;
}

#[tokio::test]
async fn zome_call_reply_survives_the_doubled_encoding() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let port = conductor.add_port(0).await.unwrap();
    let result = map(vec![("entry_hash", Value::Binary(vec![0xaa, 0xbb]))]);
    conductor.register_any(MockResponse::ok(result.clone()));

    let mut ws = connect(port).await;
    let data = map(vec![
        ("cell_id", Value::from("cell-1")),
        ("zome_name", Value::from("chat")),
        ("fn_name", Value::from("create"))
    ]);
    let reply = call(&mut ws, 9, tags::ZOME_CALL, data).await;
    assert_eq!(reply.id, Value::from(9u64));
    assert_eq!(reply.data, result);

    conductor.close().await;
}

#[tokio::test]
async fn unmatched_request_gets_error_reply_with_same_id() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let port = conductor.add_port(0).await.unwrap();

    let mut ws = connect(port).await;
    let reply = call(&mut ws, 42, tags::APP_INFO, Value::Nil).await;
    assert_eq!(reply.id, Value::from(42u64));
    assert_eq!(reply.tag, tags::ERROR);
    assert_eq!(reply.data.as_str(), Some("No more responses for: app_info:{}"));

    conductor.close().await;
}

#[tokio::test]
async fn registered_error_replies_under_error_tag() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let port = conductor.add_port(0).await.unwrap();
    conductor.register_any(MockResponse::error(Value::from("deliberate failure")));

    let mut ws = connect(port).await;
    let reply = call(&mut ws, 1, tags::INSTALL_APP, Value::Nil).await;
    assert_eq!(reply.tag, tags::ERROR);
    assert_eq!(reply.data, Value::from("deliberate failure"));

    conductor.close().await;
}

#[tokio::test]
async fn compute_response_sees_the_live_request() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let port = conductor.add_port(0).await.unwrap();
    conductor.register_any(MockResponse::compute(|req| {
        let app_id = req
            .data
            .as_map()
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|(k, _)| k.as_str() == Some("installed_app_id"))
            })
            .and_then(|(_, v)| v.as_str())
            .unwrap_or("<missing>");
        Value::from(format!("info for {app_id}"))
    }));

    let mut ws = connect(port).await;
    let data = map(vec![("installed_app_id", Value::from("test-app"))]);
    let reply = call(&mut ws, 1, tags::APP_INFO, data).await;
    assert_eq!(reply.data, Value::from("info for test-app"));

    conductor.close().await;
}

#[tokio::test]
async fn clear_responses_drops_all_tiers() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let port = conductor.add_port(0).await.unwrap();
    conductor.register_next(MockResponse::ok(Value::from("queued")));
    conductor
        .register_once(tags::APP_INFO, &Value::Nil, MockResponse::ok(Value::Nil))
        .unwrap();
    conductor.register_any(MockResponse::ok(Value::from("fallback")));
    conductor.clear_responses();

    let mut ws = connect(port).await;
    let reply = call(&mut ws, 1, tags::APP_INFO, Value::Nil).await;
    assert_eq!(reply.tag, tags::ERROR);

    conductor.close().await;
}

#[tokio::test]
async fn register_once_rejects_unknown_request_type() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let err = conductor
        .register_once("bogus_op", &Value::Nil, MockResponse::ok(Value::Nil))
        .unwrap_err();
    assert_matches!(err, ConductorError::UnknownRequestType(tag) if tag == "bogus_op");
    conductor.close().await;
}

#[tokio::test]
async fn signal_reaches_every_app_client_on_every_port() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let port_a = conductor.add_port(0).await.unwrap();
    let port_b = conductor.add_port(0).await.unwrap();

    let mut clients = vec![
        connect(port_a).await,
        connect(port_a).await,
        connect(port_b).await,
    ];

    let cell_id = Value::Array(vec![Value::from("hash"), Value::from("agentKey")]);
    let payload = map(vec![("message", Value::from("ping"))]);
    conductor
        .broadcast_app_signal(cell_id.clone(), payload.clone())
        .await
        .unwrap();

    for ws in &mut clients {
        let bytes = recv_binary(ws).await;
        let (cell, data) = decode_signal(&bytes).unwrap();
        assert_eq!(cell, cell_id);
        assert_eq!(data, payload);
    }

    conductor.close().await;
}

#[tokio::test]
async fn broadcast_without_app_clients_errors() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    // A bound listener with nobody connected still counts as no receivers.
    conductor.add_port(0).await.unwrap();

    let err = conductor
        .broadcast_app_signal(Value::Nil, Value::Nil)
        .await
        .unwrap_err();
    assert_matches!(err, ConductorError::NoAppInterfaces);

    conductor.close().await;
}

#[tokio::test]
async fn admin_clients_do_not_receive_signals() {
    let conductor = MockConductor::bind(ConductorConfig::with_admin()).await.unwrap();
    let admin_port = conductor.admin_port().await.unwrap();
    let app_port = conductor.add_port(0).await.unwrap();

    let mut admin = connect(admin_port).await;
    let mut app = connect(app_port).await;

    conductor
        .broadcast_app_signal(Value::Nil, Value::from("only for apps"))
        .await
        .unwrap();

    let bytes = recv_binary(&mut app).await;
    let (_, payload) = decode_signal(&bytes).unwrap();
    assert_eq!(payload, Value::from("only for apps"));

    // The admin socket stays silent.
    let quiet = timeout(Duration::from_millis(200), admin.next()).await;
    assert!(quiet.is_err(), "admin connection unexpectedly got a frame");

    conductor.close().await;
}

#[tokio::test]
async fn add_port_returns_the_bound_port() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let port = conductor.add_port(0).await.unwrap();
    assert_ne!(port, 0);
    assert_eq!(conductor.app_ports().await, vec![port]);

    // And the port actually serves.
    conductor.register_any(MockResponse::ok(Value::Nil));
    let mut ws = connect(port).await;
    let reply = call(&mut ws, 1, tags::LIST_CELL_IDS, Value::Nil).await;
    assert_eq!(reply.tag, tags::LIST_CELL_IDS);

    conductor.close().await;
}

#[tokio::test]
async fn close_releases_every_bound_port() {
    let conductor = MockConductor::bind(ConductorConfig::with_admin()).await.unwrap();
    let admin_port = conductor.admin_port().await.unwrap();
    let app_port = conductor.add_port(0).await.unwrap();
    conductor.close().await;

    // Both ports are free for immediate rebinding.
    let rebound = MockConductor::bind(ConductorConfig {
        admin_port: Some(admin_port),
        app_ports: vec![app_port],
        ..ConductorConfig::default()
    })
    .await
    .unwrap();
    assert_eq!(rebound.admin_port().await, Some(admin_port));
    assert_eq!(rebound.app_ports().await, vec![app_port]);
    rebound.close().await;
}

#[tokio::test]
async fn close_apps_keeps_admin_serving() {
    let conductor = MockConductor::bind(ConductorConfig::with_admin()).await.unwrap();
    let admin_port = conductor.admin_port().await.unwrap();
    let app_port = conductor.add_port(0).await.unwrap();
    conductor.register_any(MockResponse::ok(Value::from("still here")));

    conductor.close_apps().await;
    assert!(conductor.app_ports().await.is_empty());

    // App port is gone...
    assert!(connect_async(format!("ws://127.0.0.1:{app_port}")).await.is_err());

    // ...but the admin interface and the registry are untouched.
    let mut admin = connect(admin_port).await;
    let reply = call(&mut admin, 1, tags::GENERATE_AGENT_PUB_KEY, Value::Nil).await;
    assert_eq!(reply.data, Value::from("still here"));

    conductor.close().await;
}

#[tokio::test]
async fn pipelined_requests_are_answered_in_order() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let port = conductor.add_port(0).await.unwrap();
    conductor.register_any(MockResponse::ok(Value::Nil));

    let mut ws = connect(port).await;
    for id in 0..10u64 {
        ws.send(request_frame(id, tags::APP_INFO, Value::Nil))
            .await
            .unwrap();
    }
    for id in 0..10u64 {
        let bytes = recv_binary(&mut ws).await;
        let reply = decode_response(&bytes, tags::APP_INFO).unwrap();
        assert_eq!(reply.id, Value::from(id));
    }

    conductor.close().await;
}

#[tokio::test]
async fn malformed_frame_closes_the_connection() {
    let conductor = MockConductor::bind(ConductorConfig::default()).await.unwrap();
    let port = conductor.add_port(0).await.unwrap();

    let mut ws = connect(port).await;
    ws.send(Message::binary(vec![0xc1, 0xff, 0x00])).await.unwrap();

    let frame = recv(&mut ws).await;
    assert_matches!(
        frame,
        Message::Close(Some(close)) if close.code == CloseCode::Protocol
    );

    // Other connections are unaffected.
    conductor.register_any(MockResponse::ok(Value::Nil));
    let mut ws2 = connect(port).await;
    let reply = call(&mut ws2, 1, tags::APP_INFO, Value::Nil).await;
    assert_eq!(reply.tag, tags::APP_INFO);

    conductor.close().await;
}
