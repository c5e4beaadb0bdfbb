//! Integration tests for the omok server, handler, and full connection flow.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use omok::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

fn tokens() -> TokenTable {
    [("alice", UserId(1)), ("bob", UserId(2))].into_iter().collect()
}

/// Starts a server on a random port and returns its address and store.
async fn start_server(room: RoomConfig) -> (String, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let server = OmokServer::builder()
        .bind("127.0.0.1:0")
        .room_config(room)
        .build(tokens(), Arc::clone(&store))
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    (addr, store)
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, payload: ClientRequest) {
    let envelope = Envelope {
        seq: 0,
        timestamp: 0,
        payload,
    };
    let text = serde_json::to_string(&envelope).expect("encode");
    ws.send(Message::Text(text.into())).await.expect("send");
}

/// Next server frame, skipping WebSocket control frames.
async fn recv(ws: &mut ClientWs) -> Envelope<ServerEvent> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("frame within 5s")
            .expect("stream open")
            .expect("valid frame");
        match msg {
            Message::Text(_) | Message::Binary(_) => {
                return serde_json::from_slice(&msg.into_data()).expect("decode");
            }
            _ => continue,
        }
    }
}

async fn recv_event(ws: &mut ClientWs) -> ServerEvent {
    recv(ws).await.payload
}

async fn expect_silence(ws: &mut ClientWs) {
    let got = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(got.is_err(), "unexpected frame: {got:?}");
}

async fn login(addr: &str, token: &str) -> ClientWs {
    let mut ws = connect(addr).await;
    send(
        &mut ws,
        ClientRequest::Auth {
            version: PROTOCOL_VERSION,
            token: token.into(),
        },
    )
    .await;
    assert!(matches!(recv_event(&mut ws).await, ServerEvent::AuthOk { .. }));
    ws
}

/// Logs both users in and pairs them. Returns (X socket, O socket, room).
async fn start_match(addr: &str) -> (ClientWs, ClientWs, RoomId) {
    let mut alice = login(addr, "alice").await;
    let mut bob = login(addr, "bob").await;

    send(&mut alice, ClientRequest::JoinQueue).await;
    assert_eq!(recv_event(&mut alice).await, ServerEvent::QueueWaiting);
    send(&mut bob, ClientRequest::JoinQueue).await;

    let (room_id, alice_symbol) = match recv_event(&mut alice).await {
        ServerEvent::QueueMatched {
            room_id,
            symbol,
            opponent,
        } => {
            assert_eq!(opponent, UserId(2));
            (room_id, symbol)
        }
        other => panic!("expected queue.matched, got {other:?}"),
    };
    match recv_event(&mut bob).await {
        ServerEvent::QueueMatched {
            room_id: bob_room,
            symbol,
            opponent,
        } => {
            assert_eq!(bob_room, room_id);
            assert_eq!(symbol, alice_symbol.other());
            assert_eq!(opponent, UserId(1));
        }
        other => panic!("expected queue.matched, got {other:?}"),
    }
    for ws in [&mut alice, &mut bob] {
        assert!(matches!(
            recv_event(ws).await,
            ServerEvent::RoomUpdate { turn: Symbol::X, .. }
        ));
    }

    if alice_symbol == Symbol::X {
        (alice, bob, room_id)
    } else {
        (bob, alice, room_id)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_handshake_success() {
    let (addr, _) = start_server(RoomConfig::default()).await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        ClientRequest::Auth {
            version: PROTOCOL_VERSION,
            token: "bob".into(),
        },
    )
    .await;

    let ack = recv(&mut ws).await;
    assert_eq!(ack.seq, 1);
    match ack.payload {
        ServerEvent::AuthOk { user_id, .. } => assert_eq!(user_id, UserId(2)),
        other => panic!("expected auth.ok, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handshake_version_mismatch() {
    let (addr, _) = start_server(RoomConfig::default()).await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        ClientRequest::Auth {
            version: 999,
            token: "alice".into(),
        },
    )
    .await;

    match recv_event(&mut ws).await {
        ServerEvent::Error { code, .. } => assert_eq!(code, 400),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handshake_auth_failure() {
    let (addr, _) = start_server(RoomConfig::default()).await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        ClientRequest::Auth {
            version: PROTOCOL_VERSION,
            token: "mallory".into(),
        },
    )
    .await;

    match recv_event(&mut ws).await {
        ServerEvent::Error { code, .. } => assert_eq!(code, 401),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_first_frame_must_be_auth() {
    let (addr, _) = start_server(RoomConfig::default()).await;
    let mut ws = connect(&addr).await;

    send(&mut ws, ClientRequest::JoinQueue).await;

    assert!(matches!(
        recv_event(&mut ws).await,
        ServerEvent::Error { code: 400, .. }
    ));
}

#[tokio::test]
async fn test_garbage_frame_keeps_connection_open() {
    let (addr, _) = start_server(RoomConfig::default()).await;
    let mut ws = login(&addr, "alice").await;

    ws.send(Message::text("{not json".to_string())).await.unwrap();
    assert!(matches!(
        recv_event(&mut ws).await,
        ServerEvent::Error { code: 400, .. }
    ));

    send(&mut ws, ClientRequest::Ping { client_time: 5 }).await;
    let pong = recv(&mut ws).await;
    assert!(pong.seq > 2);
    assert!(matches!(pong.payload, ServerEvent::Pong { client_time: 5, .. }));
}

#[tokio::test]
async fn test_five_in_row_wins() {
    let (addr, store) = start_server(RoomConfig::default()).await;
    let (mut x, mut o, room_id) = start_match(&addr).await;

    // X along row 7, O along row 0.
    for col in 3..7 {
        send(&mut x, ClientRequest::MakeMove { room_id, x: col, y: 7 }).await;
        recv_event(&mut x).await;
        recv_event(&mut o).await;
        send(&mut o, ClientRequest::MakeMove { room_id, x: col, y: 0 }).await;
        recv_event(&mut x).await;
        recv_event(&mut o).await;
    }
    send(&mut x, ClientRequest::MakeMove { room_id, x: 7, y: 7 }).await;

    for ws in [&mut x, &mut o] {
        match recv_event(ws).await {
            ServerEvent::RoomUpdate { board, status, .. } => {
                assert_eq!(status, MatchStatus::Ended);
                assert!((3..8).all(|col| board[7][col] == Some(Symbol::X)));
            }
            other => panic!("expected room.update, got {other:?}"),
        }
        match recv_event(ws).await {
            ServerEvent::RoomEnd {
                winner_symbol,
                reason,
                ..
            } => {
                assert_eq!(winner_symbol, Some(Symbol::X));
                assert_eq!(reason, EndReason::FiveInRow);
            }
            other => panic!("expected room.end, got {other:?}"),
        }
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_cell_taken_only_reaches_sender() {
    let (addr, _) = start_server(RoomConfig::default()).await;
    let (mut x, mut o, room_id) = start_match(&addr).await;

    send(&mut x, ClientRequest::MakeMove { room_id, x: 7, y: 7 }).await;
    recv_event(&mut x).await;
    recv_event(&mut o).await;

    send(&mut o, ClientRequest::MakeMove { room_id, x: 7, y: 7 }).await;

    match recv_event(&mut o).await {
        ServerEvent::RoomError { code, .. } => assert_eq!(code, RoomErrorCode::CellTaken),
        other => panic!("expected room.error, got {other:?}"),
    }
    expect_silence(&mut x).await;
}

#[tokio::test]
async fn test_turn_timeout_is_broadcast_and_persisted() {
    let room = RoomConfig {
        turn_timeout: Duration::from_millis(300),
        ..RoomConfig::default()
    };
    let (addr, store) = start_server(room).await;
    let (mut x, mut o, room_id) = start_match(&addr).await;

    for ws in [&mut x, &mut o] {
        match recv_event(ws).await {
            ServerEvent::RoomTimeout {
                room_id: timed_out,
                winner_symbol,
                ..
            } => {
                assert_eq!(timed_out, room_id);
                assert_eq!(winner_symbol, Symbol::O);
            }
            other => panic!("expected room.timeout, got {other:?}"),
        }
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    let records = store.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].end_reason, EndReason::Timeout);
    assert_eq!(records[0].winner_symbol, Some(Symbol::O));
}

#[tokio::test]
async fn test_reconnect_receives_room_state() {
    let (addr, _) = start_server(RoomConfig::default()).await;
    let (mut x, o, room_id) = start_match(&addr).await;

    send(&mut x, ClientRequest::MakeMove { room_id, x: 0, y: 0 }).await;
    recv_event(&mut x).await;
    drop(x);

    // Who was X depends on the coin flip; reconnect whoever it was.
    let mut o = o;
    send(&mut o, ClientRequest::RoomState { room_id }).await;
    let state = loop {
        if let ServerEvent::RoomState { state } = recv_event(&mut o).await {
            break state;
        }
    };
    let x_token = if state.players.x == UserId(1) { "alice" } else { "bob" };

    let mut again = login(&addr, x_token).await;
    match recv_event(&mut again).await {
        ServerEvent::RoomState { state } => {
            assert_eq!(state.room_id, room_id);
            assert_eq!(state.moves.len(), 1);
            assert_eq!(state.status, MatchStatus::Playing);
        }
        other => panic!("expected room.state, got {other:?}"),
    }
}
