//! Registry of active rooms.
//!
//! An explicit object rather than global state: the orchestrator owns one
//! (behind a mutex), and tests build a fresh one each time.

use std::collections::HashMap;

use omok_protocol::{RoomId, UserId};

use crate::RoomHandle;

/// Tracks every live room and which room each user belongs to.
///
/// A user maps to at most one room. Creating a new room for a user
/// replaces their old mapping; retiring a room only clears mappings that
/// still point at it.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, RoomHandle>,
    user_rooms: HashMap<UserId, RoomId>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly spawned room and indexes both of its members.
    pub fn insert(&mut self, handle: RoomHandle) {
        let room_id = handle.room_id();
        for user in handle.members() {
            self.user_rooms.insert(user, room_id);
        }
        self.rooms.insert(room_id, handle);
        tracing::info!(%room_id, rooms = self.rooms.len(), "room registered");
    }

    /// Removes a room whose actor stopped. Returns its handle if it was
    /// still registered.
    pub fn retire(&mut self, room_id: RoomId) -> Option<RoomHandle> {
        let handle = self.rooms.remove(&room_id)?;
        for user in handle.members() {
            if self.user_rooms.get(&user) == Some(&room_id) {
                self.user_rooms.remove(&user);
            }
        }
        tracing::info!(%room_id, rooms = self.rooms.len(), "room retired");
        Some(handle)
    }

    /// Looks up a room by id.
    pub fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms.get(room_id).cloned()
    }

    /// The room `user` currently belongs to.
    pub fn room_of(&self, user: UserId) -> Option<RoomId> {
        self.user_rooms.get(&user).copied()
    }

    /// The handle of the room `user` currently belongs to.
    pub fn room_for(&self, user: UserId) -> Option<RoomHandle> {
        self.room_of(user).and_then(|id| self.get(&id))
    }

    /// Ids of all active rooms.
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().copied().collect()
    }

    /// Number of active rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if there are no active rooms.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
