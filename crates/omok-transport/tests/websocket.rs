//! Integration tests for the WebSocket transport.
//!
//! A real listener on an OS-assigned port and a `tokio-tungstenite`
//! client verify that frames flow in both directions.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use omok_transport::{Connection, Transport, TransportError, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn pair() -> (omok_transport::WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("accept task");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_text_frames_both_directions() {
        let (conn, mut client) = pair().await;

        client
            .send(Message::text("{\"hello\":1}".to_string()))
            .await
            .expect("client send");
        let received = conn.recv().await.expect("recv").expect("some frame");
        assert_eq!(received, b"{\"hello\":1}");

        conn.send(b"{\"world\":2}").await.expect("server send");
        let msg = client.next().await.unwrap().expect("client recv");
        assert_eq!(msg, Message::text("{\"world\":2}".to_string()));
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_pending() {
        let (conn, mut client) = pair().await;
        let conn = Arc::new(conn);

        // A reader parked in recv() must not block writers.
        let reader = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        tokio::time::timeout(Duration::from_secs(2), conn.send(b"{}"))
            .await
            .expect("send should not wait on the reader")
            .expect("send ok");
        let msg = client.next().await.unwrap().expect("client recv");
        assert_eq!(msg.into_data().as_ref(), b"{}");

        client.send(Message::text("x".to_string())).await.expect("send");
        let frame = reader.await.expect("join").expect("recv ok");
        assert_eq!(frame, Some(b"x".to_vec()));
    }

    #[tokio::test]
    async fn test_websocket_client_close_yields_none() {
        let (conn, mut client) = pair().await;
        client.close(None).await.expect("close");
        let result = conn.recv().await.expect("clean close is not an error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_websocket_connection_ids_are_unique() {
        let (a, _ca) = pair().await;
        let (b, _cb) = pair().await;
        assert_ne!(a.id(), b.id());
        assert!(a.peer_addr().ip().is_loopback());
    }

    #[tokio::test]
    async fn test_websocket_bind_reports_address_in_use() {
        let first = WebSocketTransport::bind("127.0.0.1:0").await.expect("bind");
        let taken = first.local_addr().expect("local addr").to_string();

        match WebSocketTransport::bind(&taken).await {
            Err(TransportError::Bind { addr, .. }) => assert_eq!(addr, taken),
            Err(other) => panic!("expected bind error, got {other}"),
            Ok(_) => panic!("second bind on {taken} should fail"),
        }
    }
}
