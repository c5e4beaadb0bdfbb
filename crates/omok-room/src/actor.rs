//! Room actor: an isolated Tokio task that owns one live [`Room`].
//!
//! Commands arrive on a bounded mpsc channel and are applied one at a
//! time. The turn clock and the rematch window are two more branches of
//! the same `select!`, so an expiry can never interleave with a move for
//! the same room.

use std::collections::HashMap;
use std::sync::Arc;

use omok_protocol::{RoomId, RoomSnapshot, ServerEvent, UserId};
use omok_session::Outbound;
use omok_store::MatchStore;
use omok_timer::Watchdog;
use tokio::sync::{mpsc, oneshot};

use crate::room::{ConfirmOutcome, MoveOutcome};
use crate::{Room, RoomConfig, RoomError};

/// A gameplay request from a seated player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomRequest {
    MakeMove { x: i32, y: i32 },
    Resign,
    NewGame,
    ConfirmNewGame,
    RejectNewGame,
}

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    /// A gameplay request; the reply says whether it was accepted.
    Request {
        user: UserId,
        request: RoomRequest,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Full state for `room.state`.
    Snapshot { reply: oneshot::Sender<RoomSnapshot> },

    /// Route a player's events to a new connection (reconnect). The
    /// current state is sent to it straight away.
    Rebind {
        user: UserId,
        outbound: Outbound,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Stop the actor.
    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone. The [`RoomRegistry`](crate::RoomRegistry) holds one per
/// active room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    members: [UserId; 2],
    sender: mpsc::Sender<RoomCommand>,
}

impl std::fmt::Debug for RoomCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request { user, request, .. } => f
                .debug_struct("Request")
                .field("user", user)
                .field("request", request)
                .finish_non_exhaustive(),
            Self::Snapshot { .. } => f.write_str("Snapshot"),
            Self::Rebind { user, .. } => f.debug_struct("Rebind").field("user", user).finish_non_exhaustive(),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

impl RoomHandle {
    /// The room's id.
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// The two users seated in this room. Rematches swap their symbols
    /// but never change who they are.
    pub fn members(&self) -> [UserId; 2] {
        self.members
    }

    /// Returns `true` if `user` holds a seat here.
    pub fn is_member(&self, user: UserId) -> bool {
        self.members.contains(&user)
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Submits a gameplay request on behalf of `user`.
    ///
    /// On success the actor has already broadcast the result to the room.
    ///
    /// # Errors
    /// The room's rejection, or [`RoomError::Unavailable`] if the actor
    /// is gone.
    pub async fn request(&self, user: UserId, request: RoomRequest) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Request {
            user,
            request,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    /// Fetches the full room state.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Snapshot { reply: reply_tx }).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Points `user`'s room events at a new connection.
    pub async fn rebind(&self, user: UserId, outbound: Outbound) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Rebind {
            user,
            outbound,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<S> {
    room: Room,
    config: RoomConfig,
    /// Per-player outbound channels.
    senders: HashMap<UserId, Outbound>,
    turn_clock: Watchdog,
    rematch_window: Watchdog,
    store: Arc<S>,
    receiver: mpsc::Receiver<RoomCommand>,
    retired: mpsc::UnboundedSender<RoomId>,
}

impl<S: MatchStore> RoomActor<S> {
    /// Runs the actor loop until shutdown, until every handle is dropped,
    /// or until the rematch window of a finished match closes.
    async fn run(mut self) {
        let room_id = self.room.id();
        let players = self.room.players();
        tracing::info!(%room_id, x = %players.x, o = %players.o, "room actor started");

        self.turn_clock.arm(self.config.turn_timeout);
        self.broadcast(&self.room.update_event());

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(RoomCommand::Shutdown) | None => {
                        tracing::info!(%room_id, "room shutting down");
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd),
                },
                _ = self.turn_clock.expired() => self.handle_turn_expired(),
                _ = self.rematch_window.expired() => {
                    tracing::info!(%room_id, "rematch window closed");
                    break;
                }
            }
        }

        let _ = self.retired.send(room_id);
        tracing::info!(%room_id, "room actor stopped");
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Request {
                user,
                request,
                reply,
            } => {
                let result = self.handle_request(user, request);
                if let Err(error) = &result {
                    tracing::debug!(
                        room_id = %self.room.id(),
                        user_id = %user,
                        ?request,
                        %error,
                        "request rejected"
                    );
                }
                let _ = reply.send(result);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.room.snapshot());
            }
            RoomCommand::Rebind {
                user,
                outbound,
                reply,
            } => {
                let result = self.handle_rebind(user, outbound);
                let _ = reply.send(result);
            }
            // Handled by the run loop.
            RoomCommand::Shutdown => {}
        }
    }

    fn handle_request(&mut self, user: UserId, request: RoomRequest) -> Result<(), RoomError> {
        let room_id = self.room.id();
        match request {
            RoomRequest::MakeMove { x, y } => {
                let outcome = self.room.make_move(user, x, y)?;
                self.broadcast(&self.room.update_event());
                match outcome {
                    MoveOutcome::Continue => {
                        self.turn_clock.arm(self.config.turn_timeout);
                    }
                    MoveOutcome::Won(_) | MoveOutcome::Draw => self.announce_end(),
                }
            }
            RoomRequest::Resign => {
                self.room.resign(user)?;
                self.announce_end();
            }
            RoomRequest::NewGame => {
                self.room.request_new_game(user)?;
                self.send_to(user, ServerEvent::NewGameRequestSent { room_id });
                if let Some(opponent) = self.room.players().opponent_of(user) {
                    self.send_to(
                        opponent,
                        ServerEvent::NewGameRequest {
                            room_id,
                            requested_by: user,
                        },
                    );
                }
            }
            RoomRequest::ConfirmNewGame => {
                let outcome = self.room.confirm_new_game(user)?;
                self.broadcast(&ServerEvent::NewGameConfirmed {
                    room_id,
                    user_id: user,
                });
                if outcome == ConfirmOutcome::Unanimous {
                    self.start_rematch();
                }
            }
            RoomRequest::RejectNewGame => {
                self.room.reject_new_game(user)?;
                self.broadcast(&ServerEvent::NewGameRejected {
                    room_id,
                    user_id: user,
                });
            }
        }
        Ok(())
    }

    fn handle_rebind(&mut self, user: UserId, outbound: Outbound) -> Result<(), RoomError> {
        if !self.room.players().contains(user) {
            return Err(RoomError::NotAPlayer(user, self.room.id()));
        }
        let _ = outbound.send(ServerEvent::RoomState {
            state: self.room.snapshot(),
        });
        self.senders.insert(user, outbound);
        tracing::info!(room_id = %self.room.id(), user_id = %user, "player rebound to room");
        Ok(())
    }

    fn handle_turn_expired(&mut self) {
        let room_id = self.room.id();
        let Some(timed_out) = self.room.expire_turn() else {
            tracing::debug!(%room_id, "turn expiry after match end ignored");
            return;
        };
        tracing::info!(
            %room_id,
            expired = %timed_out.expired,
            winner = %timed_out.winner.user_id,
            "turn timed out"
        );
        self.broadcast(&ServerEvent::RoomTimeout {
            room_id,
            timeout_player_id: timed_out.expired,
            winner_id: timed_out.winner.user_id,
            winner_symbol: timed_out.winner.symbol,
        });
        self.on_ended();
    }

    /// Broadcasts `room.end` and runs the end-of-match side effects.
    fn announce_end(&mut self) {
        if let Some(event) = self.room.end_event() {
            self.broadcast(&event);
        }
        self.on_ended();
    }

    fn on_ended(&mut self) {
        self.turn_clock.cancel();
        self.rematch_window.arm(self.config.rematch_window);
        tracing::info!(
            room_id = %self.room.id(),
            reason = ?self.room.end_reason(),
            winner = ?self.room.winner().map(|w| w.user_id),
            moves = self.room.moves().len(),
            "match ended"
        );
        self.persist();
    }

    /// Saves the finished match on a detached task. One attempt; a
    /// failure is logged and dropped.
    fn persist(&self) {
        let Some(record) = self.room.record() else {
            return;
        };
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let room_id = record.room_id;
            match store.save(record).await {
                Ok(()) => tracing::debug!(%room_id, "match record saved"),
                Err(error) => {
                    tracing::warn!(%room_id, %error, "failed to persist match record")
                }
            }
        });
    }

    fn start_rematch(&mut self) {
        self.room = self.room.rematch();
        self.rematch_window.cancel();
        self.turn_clock.arm(self.config.turn_timeout);

        let room_id = self.room.id();
        let players = self.room.players();
        tracing::info!(%room_id, x = %players.x, o = %players.o, "rematch started");

        for user in players.both() {
            if let (Some(symbol), Some(opponent)) =
                (players.symbol_of(user), players.opponent_of(user))
            {
                self.send_to(
                    user,
                    ServerEvent::NewGame {
                        room_id,
                        symbol,
                        opponent,
                    },
                );
            }
        }
        self.broadcast(&self.room.update_event());
    }

    fn broadcast(&self, event: &ServerEvent) {
        for user in self.room.players().both() {
            self.send_to(user, event.clone());
        }
    }

    /// Sends to a single player. Silently drops if their connection is
    /// gone; they can catch up with `room.state` after reconnecting.
    fn send_to(&self, user: UserId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&user) {
            if sender.send(event).is_err() {
                tracing::trace!(room_id = %self.room.id(), user_id = %user, "player outbound closed");
            }
        }
    }
}

/// Spawns a room actor for a freshly created `room` and returns its
/// handle.
///
/// The actor arms the turn clock and broadcasts the opening `room.update`
/// as soon as it starts. `senders` must hold one outbound channel per
/// seated player. When the actor stops it sends the room id on
/// `retired`, so the owner can drop it from its registry.
pub fn spawn_room<S: MatchStore>(
    room: Room,
    senders: HashMap<UserId, Outbound>,
    config: RoomConfig,
    store: Arc<S>,
    retired: mpsc::UnboundedSender<RoomId>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let room_id = room.id();
    let members = room.players().both();

    let actor = RoomActor {
        room,
        config,
        senders,
        turn_clock: Watchdog::new("turn"),
        rematch_window: Watchdog::new("rematch"),
        store,
        receiver: rx,
        retired,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        members,
        sender: tx,
    }
}
