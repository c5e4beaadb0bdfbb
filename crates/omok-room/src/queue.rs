//! The matchmaking queue.
//!
//! Pairing is strictly first-come first-served in twos: the queue holds
//! at most one waiting player between calls, and the call that brings it
//! to two removes both entries before returning. `MatchQueue` has no lock
//! of its own; the orchestrator keeps it behind a mutex so each
//! `enqueue`/`dequeue` is one critical section.

use std::collections::VecDeque;

use omok_protocol::UserId;
use tokio::time::Instant;

/// A player waiting for an opponent.
///
/// `C` is whatever the caller needs to reach the player once matched,
/// typically their session.
#[derive(Debug, Clone)]
pub struct QueueEntry<C> {
    pub user_id: UserId,
    pub connection: C,
    pub enqueued_at: Instant,
}

/// FIFO pairing of waiting players.
#[derive(Debug)]
pub struct MatchQueue<C> {
    waiting: VecDeque<QueueEntry<C>>,
}

impl<C> Default for MatchQueue<C> {
    fn default() -> Self {
        Self {
            waiting: VecDeque::new(),
        }
    }
}

impl<C> MatchQueue<C> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `user_id`, pairing it if someone is already waiting.
    ///
    /// - Already queued: the stored connection is replaced (a reconnect)
    ///   and `None` is returned.
    /// - Otherwise the user is appended. If that makes a pair, both
    ///   entries are removed and the opponent's entry is returned.
    pub fn enqueue(&mut self, user_id: UserId, connection: C) -> Option<QueueEntry<C>> {
        if let Some(entry) = self.waiting.iter_mut().find(|e| e.user_id == user_id) {
            entry.connection = connection;
            tracing::debug!(%user_id, "already queued, connection refreshed");
            return None;
        }

        self.waiting.push_back(QueueEntry {
            user_id,
            connection,
            enqueued_at: Instant::now(),
        });

        if self.waiting.len() < 2 {
            tracing::debug!(%user_id, "queued, waiting for opponent");
            return None;
        }

        let opponent = self.waiting.pop_front()?;
        let own = self.waiting.pop_front()?;
        debug_assert_eq!(own.user_id, user_id);
        tracing::info!(
            first = %opponent.user_id,
            second = %own.user_id,
            waited_ms = opponent.enqueued_at.elapsed().as_millis() as u64,
            "players paired"
        );
        Some(opponent)
    }

    /// Removes `user_id` if queued. Removing an absent user is a no-op.
    pub fn dequeue(&mut self, user_id: UserId) -> Option<QueueEntry<C>> {
        self.dequeue_if(user_id, |_| true)
    }

    /// Removes `user_id` only if `matches` accepts its stored connection.
    ///
    /// Used on disconnect, so that an old connection closing cannot pull
    /// a user out of the queue after they re-queued from a new one.
    pub fn dequeue_if(
        &mut self,
        user_id: UserId,
        matches: impl FnOnce(&C) -> bool,
    ) -> Option<QueueEntry<C>> {
        let pos = self.waiting.iter().position(|e| e.user_id == user_id)?;
        if !matches(&self.waiting[pos].connection) {
            return None;
        }
        let entry = self.waiting.remove(pos);
        if entry.is_some() {
            tracing::debug!(%user_id, "left queue");
        }
        entry
    }

    /// Returns `true` if `user_id` is waiting.
    pub fn contains(&self, user_id: UserId) -> bool {
        self.waiting.iter().any(|e| e.user_id == user_id)
    }

    /// The stored connection of a waiting user.
    pub fn connection(&self, user_id: UserId) -> Option<&C> {
        self.waiting
            .iter()
            .find(|e| e.user_id == user_id)
            .map(|e| &e.connection)
    }

    /// Number of waiting users.
    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    /// Returns `true` if nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(id: u64) -> UserId {
        UserId(id)
    }

    #[test]
    fn test_enqueue_first_user_waits() {
        let mut queue = MatchQueue::new();
        assert!(queue.enqueue(uid(1), "c1").is_none());
        assert!(queue.contains(uid(1)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_enqueue_second_user_pairs_and_empties_queue() {
        let mut queue = MatchQueue::new();
        queue.enqueue(uid(1), "c1");

        let opponent = queue.enqueue(uid(2), "c2").expect("pair formed");

        assert_eq!(opponent.user_id, uid(1));
        assert_eq!(opponent.connection, "c1");
        assert!(queue.is_empty());
        assert!(!queue.contains(uid(1)));
        assert!(!queue.contains(uid(2)));
    }

    #[test]
    fn test_pairing_is_fifo_by_twos() {
        let mut queue = MatchQueue::new();
        let mut pairs = Vec::new();
        for id in 1..=6 {
            if let Some(opponent) = queue.enqueue(uid(id), ()) {
                pairs.push((opponent.user_id, uid(id)));
            }
        }
        assert_eq!(
            pairs,
            vec![(uid(1), uid(2)), (uid(3), uid(4)), (uid(5), uid(6))]
        );
    }

    #[test]
    fn test_enqueue_twice_refreshes_connection_without_pairing() {
        let mut queue = MatchQueue::new();
        queue.enqueue(uid(1), "old");

        assert!(queue.enqueue(uid(1), "new").is_none());

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.connection(uid(1)), Some(&"new"));
    }

    #[test]
    fn test_dequeue_is_idempotent() {
        let mut queue = MatchQueue::new();
        queue.enqueue(uid(1), ());

        assert!(queue.dequeue(uid(1)).is_some());
        assert!(queue.dequeue(uid(1)).is_none());
        assert!(queue.dequeue(uid(42)).is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_if_keeps_entry_on_mismatch() {
        let mut queue = MatchQueue::new();
        queue.enqueue(uid(1), 11_u64);

        assert!(queue.dequeue_if(uid(1), |c| *c == 10).is_none());
        assert!(queue.contains(uid(1)));
        assert!(queue.dequeue_if(uid(1), |c| *c == 11).is_some());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_left_user_is_not_paired() {
        let mut queue = MatchQueue::new();
        queue.enqueue(uid(1), ());
        queue.dequeue(uid(1));

        assert!(queue.enqueue(uid(2), ()).is_none());
        let opponent = queue.enqueue(uid(3), ()).unwrap();
        assert_eq!(opponent.user_id, uid(2));
    }
}
