//! Read-model composition: turns store reads into the reconciled payloads
//! the hub serves and exports.

pub mod hub;
pub mod match_view;
pub mod tournament_view;

pub use hub::{build_hub_payload, HubPayload, HubSummary};
pub use match_view::{
    build_match_view, player_cards, MatchView, PlayerCard, SidePlayers, TeamEvents,
};
pub use tournament_view::{build_tournament_view, TournamentView};
