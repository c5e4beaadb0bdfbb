//! Room configuration.

use std::time::Duration;

use tracing::warn;

use crate::board::WIN_LENGTH;

/// Settings shared by every room on a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// Board width and height.
    pub board_size: usize,

    /// Contiguous stones needed to win. Longer runs also win.
    pub win_length: usize,

    /// How long the player to move has before the watchdog ends the
    /// match in the opponent's favor.
    pub turn_timeout: Duration,

    /// How long a finished room stays addressable for a rematch before
    /// it is retired.
    pub rematch_window: Duration,

    /// Capacity of each room actor's command channel.
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            board_size: 15,
            win_length: WIN_LENGTH,
            turn_timeout: Duration::from_secs(30),
            rematch_window: Duration::from_secs(120),
            channel_size: 64,
        }
    }
}

impl RoomConfig {
    /// Largest supported board.
    pub const MAX_BOARD_SIZE: usize = 64;

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// - `board_size` clamped to `1..=MAX_BOARD_SIZE`.
    /// - `win_length` clamped to `1..=board_size`.
    /// - `channel_size` at least 1.
    pub fn validated(mut self) -> Self {
        if self.board_size == 0 || self.board_size > Self::MAX_BOARD_SIZE {
            let clamped = self.board_size.clamp(1, Self::MAX_BOARD_SIZE);
            warn!(requested = self.board_size, clamped, "board_size out of range, clamping");
            self.board_size = clamped;
        }
        if self.win_length == 0 || self.win_length > self.board_size {
            let clamped = self.win_length.clamp(1, self.board_size);
            warn!(requested = self.win_length, clamped, "win_length out of range, clamping");
            self.win_length = clamped;
        }
        self.channel_size = self.channel_size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let cfg = RoomConfig::default();
        assert_eq!(cfg.board_size, 15);
        assert_eq!(cfg.win_length, 5);
        assert_eq!(cfg.turn_timeout, Duration::from_secs(30));
        assert_eq!(cfg.rematch_window, Duration::from_secs(120));
    }

    #[test]
    fn test_validated_keeps_sane_values() {
        assert_eq!(RoomConfig::default().validated(), RoomConfig::default());
    }

    #[test]
    fn test_validated_clamps_win_length_to_board() {
        let cfg = RoomConfig {
            board_size: 3,
            win_length: 5,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(cfg.win_length, 3);
    }

    #[test]
    fn test_validated_clamps_board_size() {
        let cfg = RoomConfig {
            board_size: 0,
            channel_size: 0,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(cfg.board_size, 1);
        assert_eq!(cfg.win_length, 1);
        assert_eq!(cfg.channel_size, 1);
    }
}
