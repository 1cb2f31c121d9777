//! Event catalogs shared with the game server.
//!
//! Two fixed catalogs describe the whole contract surface between the
//! server and its clients:
//!
//! | Catalog | Direction | Purpose |
//! |---------|-----------|---------|
//! | [`ServerEvent`] | Server → Client | Events the connector listens for |
//! | [`ClientEvent`] | Client → Server | Events the server accepts |
//!
//! Wire names are snake_case. Locally, events are known by their
//! normalized (hyphenated) name, and broadcast under the
//! [`BROADCAST_PREFIX`] namespace:
//!
//! | Wire | Local | Broadcast |
//! |------|-------|-----------|
//! | `state_change` | `state-change` | `party:state-change` |
//! | `player_joined` | `player-joined` | `party:player-joined` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

// ============================================================================
// Constants
// ============================================================================

/// Namespace prefix for events on the ambient broadcast channel.
pub const BROADCAST_PREFIX: &str = "party:";

// ============================================================================
// Normalization
// ============================================================================

/// Converts a wire event name into its local name.
///
/// Underscores become hyphens; nothing else changes.
///
/// # Example
///
/// ```
/// use party_connector::protocol::normalize;
///
/// assert_eq!(normalize("state_change"), "state-change");
/// assert_eq!(normalize("connect"), "connect");
/// ```
#[inline]
#[must_use]
pub fn normalize(wire_name: &str) -> String {
    wire_name.replace('_', "-")
}

// ============================================================================
// Catalog Macro
// ============================================================================

/// Generates a catalog enum, its `ALL` table, wire lookups, and domain groups
/// from a single list of `Variant => "wire_name"` entries.
macro_rules! define_catalog {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[doc = $doc:literal])*
                $variant:ident => $wire:literal
            ),* $(,)?
        }
        domain_groups {
            $(
                $(#[doc = $gdoc:literal])*
                $method:ident => [$($gv:ident),* $(,)?]
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                $(#[doc = $doc])*
                $variant,
            )*
        }

        impl $name {
            /// Every catalog entry in definition order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            /// Wire name as sent by the server.
            #[must_use]
            pub const fn wire_name(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)*
                }
            }

            /// Looks up a catalog entry by wire name.
            #[must_use]
            pub fn from_wire(wire_name: &str) -> Option<Self> {
                match wire_name {
                    $($wire => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Normalized local name (e.g. `state-change`).
            #[inline]
            #[must_use]
            pub fn local_name(self) -> String {
                normalize(self.wire_name())
            }

            $(
                $(#[doc = $gdoc])*
                #[must_use]
                pub const fn $method(self) -> bool {
                    matches!(self, $(Self::$gv)|*)
                }
            )*
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.wire_name())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_wire(s).ok_or_else(|| Error::unknown_event(s))
            }
        }
    };
}

// ============================================================================
// ServerEvent
// ============================================================================

define_catalog! {
    /// Inbound events the connector subscribes to.
    ///
    /// Anything the server sends that is not listed here is never observed.
    pub enum ServerEvent {
        // Lifecycle
        /// Socket.IO session established.
        Connect => "connect",
        /// Session lost or closed.
        Disconnect => "disconnect",
        /// Connection attempt failed.
        ConnectError => "connect_error",
        /// Automatic reconnection attempt starting.
        ReconnectAttempt => "reconnect_attempt",
        /// Bounded reconnection attempts exhausted.
        ReconnectFailed => "reconnect_failed",
        /// Server-side error report.
        Error => "error",

        // Auth and registration
        CreationResult => "creation_result",
        JoinResult => "join_result",
        RejoinResult => "rejoin_result",
        AdminAuthResult => "admin_auth_result",
        PlayerJoined => "player_joined",
        TeamKicked => "team_kicked",

        // State sync
        SyncState => "sync_state",
        StateChange => "state_change",
        ScoreUpdate => "score_update",

        // Buzzer
        BuzzerLocked => "buzzer_locked",
        BuzzerLockout => "buzzer_lockout",
        BuzzerReset => "buzzer_reset",

        // Pixel perfect
        PixelperfectRoundStart => "pixelperfect_round_start",
        PixelperfectLocked => "pixelperfect_locked",
        PixelperfectLockout => "pixelperfect_lockout",
        PixelperfectReset => "pixelperfect_reset",
        PixelperfectReveal => "pixelperfect_reveal",

        // Picture guess
        ShowPicture => "show_picture",
        PictureGuessReceived => "picture_guess_received",
        PictureGuessSubmitted => "picture_guess_submitted",
        PictureGuessSync => "picture_guess_sync",
        PictureGuessResult => "picture_guess_result",
        PictureRevealed => "picture_revealed",

        // Price guess
        ShowPriceProduct => "show_price_product",
        PriceGuessReceived => "price_guess_received",
        PriceGuessSubmitted => "price_guess_submitted",
        PriceGuessSync => "price_guess_sync",
        PriceRevealed => "price_revealed",
        SubmissionStatus => "submission_status",

        // Survival
        SurvivalVoteReceived => "survival_vote_received",
        SurvivalVoteConfirmed => "survival_vote_confirmed",
        SurvivalVoteUpdate => "survival_vote_update",
        SurvivalReveal => "survival_reveal",
        SurvivalRoundComplete => "survival_round_complete",
        SurvivalRoundReset => "survival_round_reset",

        // Timeline
        TimelineSubmission => "timeline_submission",
        TimelineStatus => "timeline_status",
        TimelineSync => "timeline_sync",
        TimelineResult => "timeline_result",
        TimelineComplete => "timeline_complete",

        // Timer
        TimerSync => "timer_sync",

        // Elimination
        Eliminated => "eliminated",
        EliminationUpdate => "elimination_update",

        // Audio control
        PlayAudio => "play_audio",
        StopAudio => "stop_audio",
        PauseAudio => "pause_audio",
        ResumeAudio => "resume_audio",
        RevealAudio => "reveal_audio",
        MusicToggle => "music_toggle",
        MusicNext => "music_next",
        MusicPrevious => "music_previous",

        // Generic UI signals
        QrVisibility => "qr_visibility",
        AvatarUpdated => "avatar_updated",
        Reaction => "reaction",
        ChatMessage => "chat_message",
    }
    domain_groups {
        /// Connection lifecycle signals raised by the transport itself.
        is_lifecycle => [Connect, Disconnect, ConnectError, ReconnectAttempt, ReconnectFailed],
        /// Audio and background music control.
        is_audio => [
            PlayAudio, StopAudio, PauseAudio, ResumeAudio, RevealAudio,
            MusicToggle, MusicNext, MusicPrevious,
        ],
        /// A team or player was locked out for a while.
        is_lockout => [BuzzerLockout, PixelperfectLockout],
    }
}

impl ServerEvent {
    /// Name on the ambient broadcast channel (e.g. `party:state-change`).
    #[must_use]
    pub fn broadcast_name(self) -> String {
        format!("{BROADCAST_PREFIX}{}", self.local_name())
    }
}

// ============================================================================
// ClientEvent
// ============================================================================

define_catalog! {
    /// Outbound events accepted by the game server.
    pub enum ClientEvent {
        // Platform
        RejoinSession => "rejoin_session",
        RequestTvSync => "request_tv_sync",
        CreateTeam => "create_team",
        JoinTeam => "join_team",

        // Admin
        AdminAuth => "admin_auth",
        SetState => "set_state",
        AddPoints => "add_points",
        ResetGame => "reset_game",
        KickTeam => "kick_team",

        // TV display
        ToggleQrCode => "toggle_qr_code",
        SelectAvatar => "select_avatar",
        SendReaction => "send_reaction",
        SendChatMessage => "send_chat_message",

        // Buzzer
        PressBuzzer => "press_buzzer",
        JudgeBuzzer => "judge_buzzer",
        PlayAudio => "play_audio",
        StopAudio => "stop_audio",
        RevealAudio => "reveal_audio",

        // Pixel perfect
        PressPixelperfectBuzzer => "press_pixelperfect_buzzer",
        JudgePixelperfect => "judge_pixelperfect",
        StartPixelperfectRound => "start_pixelperfect_round",
        RevealPixelperfect => "reveal_pixelperfect",

        // Picture guess
        SubmitPictureGuess => "submit_picture_guess",
        PictureGuessTyping => "picture_guess_typing",
        GradePictureGuess => "grade_picture_guess",
        RevealPicture => "reveal_picture",
        ShowPicture => "show_picture",

        // Price guess
        SubmitPriceGuess => "submit_price_guess",
        PriceGuessTyping => "price_guess_typing",
        RevealPrice => "reveal_price",
        ShowPriceProduct => "show_price_product",

        // Survival
        SurvivalVote => "survival_vote",
        SurvivalReveal => "survival_reveal",
        SurvivalResetRound => "survival_reset_round",

        // Timeline
        SubmitTimeline => "submit_timeline",
        TimelineUpdate => "timeline_update",
        CompleteTimeline => "complete_timeline",

        // Misc
        TimerControl => "timer_control",
        ToggleElimination => "toggle_elimination",
        MusicToggle => "music_toggle",
        MusicNext => "music_next",
        MusicPrevious => "music_previous",
    }
    domain_groups {
        /// Requires an authenticated admin client.
        is_admin => [
            SetState, AddPoints, ResetGame, KickTeam, JudgeBuzzer, PlayAudio,
            StopAudio, RevealAudio, JudgePixelperfect, StartPixelperfectRound,
            RevealPixelperfect, GradePictureGuess, RevealPicture, ShowPicture,
            RevealPrice, ShowPriceProduct, SurvivalReveal, SurvivalResetRound,
            CompleteTimeline, TimerControl, ToggleElimination, MusicToggle,
            MusicNext, MusicPrevious,
        ],
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("state_change"), "state-change");
        assert_eq!(normalize("pixelperfect_round_start"), "pixelperfect-round-start");
        assert_eq!(normalize("reaction"), "reaction");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_server_catalog_has_no_duplicates() {
        let mut seen = FxHashSet::default();
        for event in ServerEvent::ALL {
            assert!(seen.insert(event.wire_name()), "duplicate {event}");
        }
        assert_eq!(seen.len(), ServerEvent::ALL.len());
    }

    #[test]
    fn test_client_catalog_has_no_duplicates() {
        let mut seen = FxHashSet::default();
        for event in ClientEvent::ALL {
            assert!(seen.insert(event.wire_name()), "duplicate {event}");
        }
    }

    #[test]
    fn test_wire_lookup_matches_every_entry() {
        for &event in ServerEvent::ALL {
            assert_eq!(ServerEvent::from_wire(event.wire_name()), Some(event));
        }
        for &event in ClientEvent::ALL {
            assert_eq!(ClientEvent::from_wire(event.wire_name()), Some(event));
        }
    }

    #[test]
    fn test_local_names_are_normalized_wire_names() {
        for &event in ServerEvent::ALL {
            assert_eq!(event.local_name(), normalize(event.wire_name()));
            assert!(!event.local_name().contains('_'));
        }
    }

    #[test]
    fn test_broadcast_name() {
        assert_eq!(ServerEvent::StateChange.broadcast_name(), "party:state-change");
        assert_eq!(ServerEvent::Connect.broadcast_name(), "party:connect");
    }

    #[test]
    fn test_unknown_wire_name() {
        assert_eq!(ServerEvent::from_wire("not_an_event"), None);
        assert_eq!(ServerEvent::from_wire("state-change"), None);

        let err = "not_an_event".parse::<ClientEvent>().unwrap_err();
        assert!(matches!(err, Error::UnknownEvent { .. }));
    }

    #[test]
    fn test_from_str_and_display() {
        let event: ServerEvent = "player_joined".parse().expect("known event");
        assert_eq!(event, ServerEvent::PlayerJoined);
        assert_eq!(event.to_string(), "player_joined");
    }

    #[test]
    fn test_domain_groups() {
        assert!(ServerEvent::Connect.is_lifecycle());
        assert!(!ServerEvent::StateChange.is_lifecycle());
        assert!(ServerEvent::MusicNext.is_audio());
        assert!(ServerEvent::BuzzerLockout.is_lockout());
        assert!(ClientEvent::KickTeam.is_admin());
        assert!(!ClientEvent::PressBuzzer.is_admin());
    }

    proptest! {
        #[test]
        fn prop_normalize_only_touches_underscores(name in "[a-z_]{0,40}") {
            let local = normalize(&name);
            prop_assert_eq!(local.len(), name.len());
            prop_assert!(!local.contains('_'));
            prop_assert_eq!(local.replace('-', "_"), name);
        }
    }
}
