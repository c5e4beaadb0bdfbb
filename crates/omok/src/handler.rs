//! Per-connection handler: handshake, read loop, and writer task.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `auth` → validate version
//!   2. Authenticate token → bind an [`AuthenticatedSession`]
//!   3. Spawn the writer, which drains the session's outbound channel
//!   4. Loop: receive envelopes → hand requests to the orchestrator

use std::sync::Arc;
use std::time::Instant;

use omok_protocol::{ClientRequest, Codec, Envelope, ProtocolError, ServerEvent};
use omok_session::{AuthenticatedSession, Authenticator};
use omok_store::MatchStore;
use omok_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::orchestrator::Flow;
use crate::server::{PROTOCOL_VERSION, ServerState};
use crate::OmokError;

/// Drop guard that tells the orchestrator a connection went away.
///
/// Cleanup happens even if the handler panics. Since `Drop` is
/// synchronous, a fire-and-forget task takes the async locks.
struct SessionGuard<A, S, C>
where
    A: Authenticator,
    S: MatchStore,
    C: Codec,
{
    session: AuthenticatedSession,
    state: Arc<ServerState<A, S, C>>,
}

impl<A, S, C> Drop for SessionGuard<A, S, C>
where
    A: Authenticator,
    S: MatchStore,
    C: Codec,
{
    fn drop(&mut self) {
        let session = self.session.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.orchestrator.disconnect(&session).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, S, C>>,
) -> Result<(), OmokError>
where
    A: Authenticator,
    S: MatchStore,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let start = Instant::now();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    // --- Step 1: Handshake ---
    let token = perform_handshake(&conn, &state, &start).await?;

    // --- Step 2: Authenticate and bind ---
    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let session = match state.orchestrator.connect(&token, conn_id, outbound).await {
        Ok(session) => session,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "authentication rejected");
            send_error(&conn, &state.codec, 401, "unauthorized", &start).await?;
            return Err(e.into());
        }
    };
    let user_id = session.user_id;
    tracing::info!(%conn_id, %user_id, "user authenticated");

    let _guard = SessionGuard {
        session: session.clone(),
        state: Arc::clone(&state),
    };

    // --- Step 3: Writer ---
    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        outbound_rx,
        Arc::clone(&state),
        start,
    ));

    // --- Step 4: Read loop ---
    let idle_timeout = state.session.idle_timeout;
    loop {
        let data = match tokio::time::timeout(idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%user_id, %conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%user_id, %conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%user_id, %conn_id, "connection idle, closing");
                break;
            }
        };

        let envelope: Envelope<ClientRequest> = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%user_id, error = %e, "failed to decode envelope");
                session.send(ServerEvent::Error {
                    code: 400,
                    message: format!("invalid frame: {e}"),
                });
                continue;
            }
        };

        if state.orchestrator.handle(&session, envelope.payload).await == Flow::Close {
            break;
        }
    }

    // Room actors keep clones of the outbound sender, so the writer would
    // otherwise never see its channel close.
    writer.abort();
    let _ = conn.close().await;
    // _guard drops here → orchestrator disconnect fires.
    Ok(())
}

/// Receives the `auth` frame and checks the protocol version. Returns the
/// token for the orchestrator to verify.
async fn perform_handshake<A, S, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, S, C>,
    start: &Instant,
) -> Result<String, OmokError>
where
    A: Authenticator,
    S: MatchStore,
    C: Codec,
{
    let data = match tokio::time::timeout(state.session.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(OmokError::Transport(e)),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let request = state
        .codec
        .decode::<Envelope<ClientRequest>>(&data)
        .map(|envelope| envelope.payload);

    let (version, token) = match request {
        Ok(ClientRequest::Auth { version, token }) => (version, token),
        _ => {
            send_error(conn, &state.codec, 400, "expected auth", start).await?;
            return Err(ProtocolError::InvalidMessage("first message must be auth".into()).into());
        }
    };

    if version != PROTOCOL_VERSION {
        send_error(
            conn,
            &state.codec,
            400,
            &format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
            start,
        )
        .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    Ok(token)
}

/// Drains a session's outbound events onto the socket, numbering frames.
async fn write_loop<A, S, C>(
    conn: Arc<WebSocketConnection>,
    mut outbound: mpsc::UnboundedReceiver<ServerEvent>,
    state: Arc<ServerState<A, S, C>>,
    start: Instant,
) where
    A: Authenticator,
    S: MatchStore,
    C: Codec,
{
    let conn_id = conn.id();
    let mut seq: u64 = 1;

    while let Some(event) = outbound.recv().await {
        let envelope = Envelope {
            seq: next_seq(&mut seq),
            timestamp: elapsed_millis(&start),
            payload: event,
        };
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode outbound frame");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::warn!(%conn_id, error = %e, "outbound frame dropped, connection broken");
            break;
        }
    }
}

/// Sends an `error` frame straight to the socket. Used before a session
/// exists.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    code: u16,
    message: &str,
    start: &Instant,
) -> Result<(), OmokError> {
    let envelope = Envelope {
        seq: 0,
        timestamp: elapsed_millis(start),
        payload: ServerEvent::Error {
            code,
            message: message.to_string(),
        },
    };
    let bytes = codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

fn elapsed_millis(start: &Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
