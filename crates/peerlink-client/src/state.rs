//! State-machine vocabulary: turns, commands, bridge outcomes.
//!
//! The interactive loop in [`crate::session`] owns the sockets; the
//! pure rules live here so they can be tested without I/O.

use peerlink_protocol::PeerAddr;

/// Whose move it is on a chat connection.
///
/// The chat wire carries no framing for direction, so both ends follow
/// a strict alternation: the side that dialed starts sending, the side
/// that accepted starts receiving, and every successful send or
/// receive flips the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// Our turn to type; the peer is reading.
    Send,
    /// The peer's turn; typed input is rejected, not queued.
    Recv,
}

impl Turn {
    /// The starting turn: dialers send first, acceptors receive first.
    pub fn initial(dialed: bool) -> Self {
        if dialed { Self::Send } else { Self::Recv }
    }

    /// The other turn.
    pub fn flip(self) -> Self {
        match self {
            Self::Send => Self::Recv,
            Self::Recv => Self::Send,
        }
    }
}

/// One line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// `/register`
    Register,
    /// `/bridge`
    Bridge,
    /// `/chat`
    Chat,
    /// `/id`
    Id,
    /// `/quit`
    Quit,
    /// A slash line that is not a known command.
    Unknown(String),
    /// Anything else: free text, a chat message when chatting.
    Text(String),
    /// A blank line.
    Empty,
}

/// Classifies a raw input line.
pub fn classify(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    if !trimmed.starts_with('/') {
        return Input::Text(trimmed.to_string());
    }
    match trimmed {
        "/register" => Input::Register,
        "/bridge" => Input::Bridge,
        "/chat" => Input::Chat,
        "/id" => Input::Id,
        "/quit" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}

/// What a BRIDGEACK means for the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// Empty answer: listen and wait for an incoming peer connection.
    WaitForPeer,
    /// A peer is known; stay idle until `/chat` dials it.
    PeerKnown(PeerAddr),
}

/// Maps the server's answer to the next move.
pub fn bridge_outcome(peer: Option<PeerAddr>) -> BridgeOutcome {
    match peer {
        None => BridgeOutcome::WaitForPeer,
        Some(peer) => BridgeOutcome::PeerKnown(peer),
    }
}
