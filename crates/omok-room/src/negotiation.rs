//! The rematch handshake of a finished room.

use std::collections::BTreeSet;

use omok_protocol::{NegotiationView, UserId};

/// A pending rematch request.
///
/// The requester is confirmed from the start. No user is ever both
/// confirmed and rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiation {
    requested_by: UserId,
    confirmed_by: BTreeSet<UserId>,
    rejected_by: BTreeSet<UserId>,
}

impl Negotiation {
    /// Opens a negotiation on behalf of `requested_by`.
    pub fn new(requested_by: UserId) -> Self {
        Self {
            requested_by,
            confirmed_by: BTreeSet::from([requested_by]),
            rejected_by: BTreeSet::new(),
        }
    }

    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }

    pub fn has_confirmed(&self, user: UserId) -> bool {
        self.confirmed_by.contains(&user)
    }

    pub fn has_rejected(&self, user: UserId) -> bool {
        self.rejected_by.contains(&user)
    }

    /// Records a confirmation, dropping any earlier rejection by `user`.
    /// Returns `false` if `user` had already confirmed.
    pub fn confirm(&mut self, user: UserId) -> bool {
        self.rejected_by.remove(&user);
        self.confirmed_by.insert(user)
    }

    /// Records a rejection, withdrawing any earlier confirmation.
    pub fn reject(&mut self, user: UserId) {
        self.confirmed_by.remove(&user);
        self.rejected_by.insert(user);
    }

    /// `true` once every user in `seats` has confirmed.
    pub fn is_unanimous(&self, seats: &[UserId]) -> bool {
        seats.iter().all(|u| self.confirmed_by.contains(u))
    }

    /// Wire view for `room.state`.
    pub fn view(&self) -> NegotiationView {
        NegotiationView {
            requested_by: self.requested_by,
            confirmed_by: self.confirmed_by.iter().copied().collect(),
            rejected_by: self.rejected_by.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requester_is_confirmed_from_the_start() {
        let n = Negotiation::new(UserId(1));
        assert!(n.has_confirmed(UserId(1)));
        assert!(!n.is_unanimous(&[UserId(1), UserId(2)]));
    }

    #[test]
    fn test_unanimous_after_both_confirm() {
        let mut n = Negotiation::new(UserId(1));
        assert!(n.confirm(UserId(2)));
        assert!(n.is_unanimous(&[UserId(1), UserId(2)]));
    }

    #[test]
    fn test_reject_withdraws_confirmation() {
        let mut n = Negotiation::new(UserId(1));
        n.reject(UserId(1));
        assert!(!n.has_confirmed(UserId(1)));
        assert!(n.has_rejected(UserId(1)));
    }

    #[test]
    fn test_confirm_reports_repeat_and_clears_rejection() {
        let mut n = Negotiation::new(UserId(1));
        assert!(!n.confirm(UserId(1)));

        n.reject(UserId(2));
        assert!(n.confirm(UserId(2)));
        assert!(!n.has_rejected(UserId(2)));
        assert!(n.is_unanimous(&[UserId(1), UserId(2)]));
    }

    #[test]
    fn test_view_lists_sorted_users() {
        let mut n = Negotiation::new(UserId(9));
        n.confirm(UserId(3));
        let view = n.view();
        assert_eq!(view.requested_by, UserId(9));
        assert_eq!(view.confirmed_by, vec![UserId(3), UserId(9)]);
        assert!(view.rejected_by.is_empty());
    }
}
