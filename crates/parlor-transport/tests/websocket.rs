//! Integration tests for the WebSocket transport.
//!
//! These spin up a real WebSocket server and client to verify that
//! frames actually flow over the network and that the request path
//! survives the upgrade.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use parlor_transport::{Connection, Transport, Upgrade, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on an OS-assigned port, connects one client to `path`, and
    /// returns both ends.
    async fn connected(
        path: &str,
    ) -> (parlor_transport::WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let incoming = transport.accept().await.expect("should accept");
            incoming.upgrade().await.expect("should upgrade")
        });

        let (client, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
                .await
                .expect("client should connect");
        let conn = server.await.expect("task should complete");
        (conn, client)
    }

    #[tokio::test]
    async fn test_accept_captures_request_path() {
        let (conn, _client) = connected("/ws/r1").await;
        assert_eq!(conn.path(), Some("/ws/r1"));
        assert!(conn.id().into_inner() > 0);
    }

    #[tokio::test]
    async fn test_accept_returns_before_upgrade_request() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().unwrap();

        // A client that connects and never speaks.
        let silent = tokio::net::TcpStream::connect(addr).await.unwrap();
        let incoming = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .expect("accept should not wait for the handshake")
            .expect("should accept");
        assert_eq!(incoming.peer_addr(), silent.local_addr().unwrap());

        drop(silent);
        let upgraded = incoming.upgrade().await;
        assert!(matches!(
            upgraded,
            Err(parlor_transport::TransportError::Handshake(_))
        ));
    }

    #[tokio::test]
    async fn test_text_frames_both_directions() {
        let (conn, mut client) = connected("/ws/lobby").await;

        conn.send_text("[lobby] hi").await.expect("send should succeed");
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), "[lobby] hi");

        client.send(Message::Text("42".to_string().into())).await.unwrap();
        let received = conn.recv().await.unwrap().expect("should have data");
        assert_eq!(received, b"42");
    }

    #[tokio::test]
    async fn test_send_while_recv_is_pending() {
        let (conn, mut client) = connected("/ws/r1").await;
        let conn = Arc::new(conn);

        // Park a reader first; the writer must still get through.
        let reader = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        conn.send_text("state").await.expect("send must not deadlock");
        let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("frame should arrive")
            .unwrap()
            .unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), "state");

        client.send(Message::Close(None)).await.unwrap();
        let result = reader.await.unwrap().expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }
}
