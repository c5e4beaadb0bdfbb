//! The session orchestrator: connects authenticated users to the match
//! queue and to their rooms.
//!
//! Nothing here touches sockets. Every entry point takes the caller's
//! [`AuthenticatedSession`] explicitly and reports back through the
//! session's outbound channel, which keeps the whole request table
//! testable with plain channels.
//!
//! # Locking
//!
//! Sessions, the queue and the room registry each sit behind their own
//! mutex. When both are needed the registry is locked before the queue.
//! Pairing and room registration happen under one registry guard, and so
//! do rematch requests, so a user is never seated in two live rooms.
//! Room actors never touch the registry, so awaiting one while holding
//! the guard cannot deadlock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use omok_protocol::{ClientRequest, MatchStatus, RoomId, ServerEvent, UserId};
use omok_room::{
    MatchQueue, Room, RoomConfig, RoomError, RoomRegistry, RoomRequest, random_seating,
    spawn_room,
};
use omok_session::{AuthenticatedSession, Authenticator, Outbound, SessionError, SessionManager};
use omok_store::MatchStore;
use omok_transport::ConnectionId;
use tokio::sync::{Mutex, mpsc};

/// What the connection handler should do after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The client said goodbye; close the connection.
    Close,
}

/// Routes every authenticated request to the queue or to a room.
pub struct SessionOrchestrator<A, S> {
    auth: A,
    store: Arc<S>,
    config: RoomConfig,
    sessions: Mutex<SessionManager>,
    queue: Mutex<MatchQueue<AuthenticatedSession>>,
    rooms: Arc<Mutex<RoomRegistry>>,
    retired: mpsc::UnboundedSender<RoomId>,
}

impl<A: Authenticator, S: MatchStore> SessionOrchestrator<A, S> {
    /// Creates an orchestrator with an empty queue and registry.
    ///
    /// Must be called inside a Tokio runtime: it spawns the task that
    /// drops rooms from the registry once their actor stops.
    pub fn new(auth: A, store: Arc<S>, config: RoomConfig) -> Self {
        let rooms = Arc::new(Mutex::new(RoomRegistry::new()));
        let (retired, retired_rx) = mpsc::unbounded_channel();
        tokio::spawn(reap_rooms(Arc::clone(&rooms), retired_rx));

        Self {
            auth,
            store,
            config: config.validated(),
            sessions: Mutex::new(SessionManager::new()),
            queue: Mutex::new(MatchQueue::new()),
            rooms,
            retired,
        }
    }

    /// The room settings every new match uses.
    pub fn room_config(&self) -> &RoomConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------

    /// Verifies `token` and binds the user to a new connection.
    ///
    /// On success `auth.ok` is queued on `outbound`. A user who was
    /// already waiting in the queue keeps their place with the new
    /// connection; a user seated in a live room is rebound to it and sent
    /// the current `room.state`.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if the token is rejected. Nothing is
    /// registered in that case.
    pub async fn connect(
        &self,
        token: &str,
        conn_id: ConnectionId,
        outbound: Outbound,
    ) -> Result<AuthenticatedSession, SessionError> {
        let user_id = self.auth.authenticate(token).await?;
        let (session, _previous) = self.sessions.lock().await.bind(user_id, conn_id, outbound);

        session.send(ServerEvent::AuthOk {
            user_id,
            server_time: now_millis(),
        });

        {
            let mut queue = self.queue.lock().await;
            if queue.contains(user_id) {
                queue.enqueue(user_id, session.clone());
            }
        }

        let room = self.rooms.lock().await.room_for(user_id);
        if let Some(handle) = room {
            match handle.rebind(user_id, session.outbound.clone()).await {
                Ok(()) => tracing::info!(
                    %user_id,
                    %conn_id,
                    room_id = %handle.room_id(),
                    "reconnected into room"
                ),
                Err(error) => tracing::debug!(%user_id, %error, "room rebind failed"),
            }
        }

        Ok(session)
    }

    /// Cleans up after a connection closes.
    ///
    /// The user leaves the queue if this connection queued them. Rooms are
    /// left alone: only the turn clock ends an abandoned match, so a quick
    /// reconnect does not forfeit.
    pub async fn disconnect(&self, session: &AuthenticatedSession) {
        let user_id = session.user_id;
        let left_queue = self
            .queue
            .lock()
            .await
            .dequeue_if(user_id, |queued| queued.conn_id == session.conn_id)
            .is_some();

        match self.sessions.lock().await.unbind(session) {
            Ok(()) => tracing::info!(%user_id, conn_id = %session.conn_id, left_queue, "user disconnected"),
            Err(error) => tracing::debug!(%user_id, %error, "stale connection closed"),
        }
    }

    // -----------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------

    /// Handles one request from an authenticated connection.
    pub async fn handle(&self, session: &AuthenticatedSession, request: ClientRequest) -> Flow {
        match request {
            ClientRequest::Auth { .. } => {
                session.send(ServerEvent::Error {
                    code: 400,
                    message: "already authenticated".into(),
                });
            }
            ClientRequest::Ping { client_time } => {
                session.send(ServerEvent::Pong {
                    client_time,
                    server_time: now_millis(),
                });
            }
            ClientRequest::Disconnect { reason } => {
                tracing::info!(user_id = %session.user_id, %reason, "client disconnected");
                return Flow::Close;
            }
            ClientRequest::JoinQueue => self.join_queue(session).await,
            ClientRequest::LeaveQueue => self.leave_queue(session).await,
            ClientRequest::RoomState { room_id } => self.room_state(session, room_id).await,
            ClientRequest::MakeMove { room_id, x, y } => {
                self.room_request(session, room_id, RoomRequest::MakeMove { x, y })
                    .await;
            }
            ClientRequest::Resign { room_id } => {
                self.room_request(session, room_id, RoomRequest::Resign).await;
            }
            ClientRequest::NewGame { room_id } => {
                self.room_request(session, room_id, RoomRequest::NewGame).await;
            }
            ClientRequest::ConfirmNewGame { room_id } => {
                self.room_request(session, room_id, RoomRequest::ConfirmNewGame)
                    .await;
            }
            ClientRequest::RejectNewGame { room_id } => {
                self.room_request(session, room_id, RoomRequest::RejectNewGame)
                    .await;
            }
        }
        Flow::Continue
    }

    async fn join_queue(&self, session: &AuthenticatedSession) {
        let user_id = session.user_id;

        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.room_for(user_id) {
            let playing = handle
                .snapshot()
                .await
                .is_ok_and(|state| state.status == MatchStatus::Playing);
            if playing {
                tracing::debug!(%user_id, room_id = %handle.room_id(), "queue refused, match in progress");
                session.send(ServerEvent::QueueError {
                    message: format!("already playing in room {}", handle.room_id()),
                });
                return;
            }
        }

        let opponent = self.queue.lock().await.enqueue(user_id, session.clone());
        match opponent {
            None => {
                session.send(ServerEvent::QueueWaiting);
            }
            Some(entry) => self.start_match(&mut rooms, entry.connection, session.clone()),
        }
    }

    async fn leave_queue(&self, session: &AuthenticatedSession) {
        self.queue.lock().await.dequeue(session.user_id);
        session.send(ServerEvent::QueueLeft);
    }

    /// Seats a freshly paired couple in a new room. The caller holds the
    /// registry guard from the pairing until here, so a client acting on
    /// `queue.matched` always finds the room.
    fn start_match(
        &self,
        rooms: &mut RoomRegistry,
        first: AuthenticatedSession,
        second: AuthenticatedSession,
    ) {
        let players = random_seating(first.user_id, second.user_id);
        let room = Room::new(RoomId::generate(), players, self.config.clone());
        let room_id = room.id();

        for (session, opponent) in [(&first, second.user_id), (&second, first.user_id)] {
            if let Some(symbol) = players.symbol_of(session.user_id) {
                session.send(ServerEvent::QueueMatched {
                    room_id,
                    symbol,
                    opponent,
                });
            }
        }

        let senders = HashMap::from([
            (first.user_id, first.outbound.clone()),
            (second.user_id, second.outbound.clone()),
        ]);
        let handle = spawn_room(
            room,
            senders,
            self.config.clone(),
            Arc::clone(&self.store),
            self.retired.clone(),
        );
        rooms.insert(handle);

        tracing::info!(%room_id, x = %players.x, o = %players.o, "match started");
    }

    async fn room_state(&self, session: &AuthenticatedSession, room_id: RoomId) {
        let handle = self.rooms.lock().await.get(&room_id);
        let result = match handle {
            Some(handle) => handle.snapshot().await,
            None => Err(RoomError::NotFound(room_id)),
        };
        match result {
            Ok(state) => {
                session.send(ServerEvent::RoomState { state });
            }
            Err(error) => reject(session, &error),
        }
    }

    /// Forwards an in-room request. The room broadcasts successes itself;
    /// rejections go to the requester only.
    async fn room_request(
        &self,
        session: &AuthenticatedSession,
        room_id: RoomId,
        request: RoomRequest,
    ) {
        let user_id = session.user_id;
        let result = if matches!(request, RoomRequest::NewGame | RoomRequest::ConfirmNewGame) {
            self.rematch_request(user_id, room_id, request).await
        } else {
            let handle = self.rooms.lock().await.get(&room_id);
            match handle {
                None => Err(RoomError::NotFound(room_id)),
                Some(handle) if !handle.is_member(user_id) => {
                    Err(RoomError::NotAPlayer(user_id, room_id))
                }
                Some(handle) => handle.request(user_id, request).await,
            }
        };
        if let Err(error) = result {
            tracing::debug!(%user_id, %room_id, ?request, %error, "room request rejected");
            reject(session, &error);
        }
    }

    /// Requests that can restart a room. Both seats must still belong to
    /// this room, and the registry guard is held until the room answers so
    /// neither seat can be matched elsewhere in between.
    async fn rematch_request(
        &self,
        user_id: UserId,
        room_id: RoomId,
        request: RoomRequest,
    ) -> Result<(), RoomError> {
        let rooms = self.rooms.lock().await;
        let handle = rooms.get(&room_id).ok_or(RoomError::NotFound(room_id))?;
        if !handle.is_member(user_id) {
            return Err(RoomError::NotAPlayer(user_id, room_id));
        }
        for user in handle.members() {
            match rooms.room_of(user) {
                Some(current) if current != room_id => {
                    return Err(RoomError::PlayerMovedOn { user, room_id: current });
                }
                _ => {}
            }
        }
        handle.request(user_id, request).await
    }

    // -----------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------

    /// Number of users waiting for an opponent.
    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Number of active rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// The room `user_id` is seated in, if any.
    pub async fn room_of(&self, user_id: UserId) -> Option<RoomId> {
        self.rooms.lock().await.room_of(user_id)
    }

    /// Returns `true` if `user_id` has a live connection.
    pub async fn is_connected(&self, user_id: UserId) -> bool {
        self.sessions.lock().await.get(&user_id).is_some()
    }
}

fn reject(session: &AuthenticatedSession, error: &RoomError) {
    session.send(error.to_event());
}

fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Drops rooms from the registry as their actors stop. Ends once the
/// orchestrator and every room are gone.
async fn reap_rooms(rooms: Arc<Mutex<RoomRegistry>>, mut retired: mpsc::UnboundedReceiver<RoomId>) {
    while let Some(room_id) = retired.recv().await {
        rooms.lock().await.retire(room_id);
    }
}
