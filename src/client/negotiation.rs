//! Client negotiation state machine
//!
//! Tracks a single client's progress through the handshake. Each signaling
//! round-trip is a suspension point: the flow may not advance past one until
//! its response has arrived, and the state machine enforces the order by
//! rejecting out-of-sequence transitions.

use crate::error::Error;

/// Negotiation lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationPhase {
    /// Flow not started
    Idle,
    /// Room joined, local device loaded with the router capabilities
    CapabilitiesLoaded,
    /// Server-side transport allocated
    TransportCreated,
    /// DTLS setup completed
    Connected,
    /// Send path established (broadcaster)
    Producing,
    /// Receive path established (listener)
    Consuming,
}

impl std::fmt::Display for NegotiationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NegotiationPhase::Idle => "idle",
            NegotiationPhase::CapabilitiesLoaded => "capabilities-loaded",
            NegotiationPhase::TransportCreated => "transport-created",
            NegotiationPhase::Connected => "connected",
            NegotiationPhase::Producing => "producing",
            NegotiationPhase::Consuming => "consuming",
        };
        write!(f, "{}", name)
    }
}

/// State machine for one negotiation flow
///
/// Not reentrant: a flow that left `Idle` must fail or reach a terminal
/// phase before the driver can be started again.
#[derive(Debug)]
pub struct NegotiationState {
    phase: NegotiationPhase,
}

impl NegotiationState {
    /// Start in `Idle`
    pub fn new() -> Self {
        Self {
            phase: NegotiationPhase::Idle,
        }
    }

    /// Current phase
    pub fn phase(&self) -> NegotiationPhase {
        self.phase
    }

    fn advance(&mut self, from: NegotiationPhase, to: NegotiationPhase) -> Result<(), Error> {
        if self.phase != from {
            return Err(Error::InvalidState(format!(
                "cannot move to {} from {}",
                to, self.phase
            )));
        }
        self.phase = to;
        Ok(())
    }

    /// Capabilities returned by join loaded into the local device
    pub fn capabilities_loaded(&mut self) -> Result<(), Error> {
        self.advance(NegotiationPhase::Idle, NegotiationPhase::CapabilitiesLoaded)
    }

    /// Server-side transport allocated
    pub fn transport_created(&mut self) -> Result<(), Error> {
        self.advance(
            NegotiationPhase::CapabilitiesLoaded,
            NegotiationPhase::TransportCreated,
        )
    }

    /// Connect round-trip completed
    pub fn connected(&mut self) -> Result<(), Error> {
        self.advance(NegotiationPhase::TransportCreated, NegotiationPhase::Connected)
    }

    /// Produce round-trip completed (broadcaster path)
    pub fn producing(&mut self) -> Result<(), Error> {
        self.advance(NegotiationPhase::Connected, NegotiationPhase::Producing)
    }

    /// Consume round-trip completed (listener path)
    pub fn consuming(&mut self) -> Result<(), Error> {
        self.advance(NegotiationPhase::Connected, NegotiationPhase::Consuming)
    }

    /// Reset to `Idle` so a failed flow can be retried by its caller
    pub fn reset(&mut self) {
        self.phase = NegotiationPhase::Idle;
    }
}

impl Default for NegotiationState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcaster_order() {
        let mut state = NegotiationState::new();
        assert_eq!(state.phase(), NegotiationPhase::Idle);

        state.capabilities_loaded().unwrap();
        state.transport_created().unwrap();
        state.connected().unwrap();
        state.producing().unwrap();
        assert_eq!(state.phase(), NegotiationPhase::Producing);
    }

    #[test]
    fn test_listener_order() {
        let mut state = NegotiationState::new();

        state.capabilities_loaded().unwrap();
        state.transport_created().unwrap();
        state.connected().unwrap();
        state.consuming().unwrap();
        assert_eq!(state.phase(), NegotiationPhase::Consuming);
    }

    #[test]
    fn test_out_of_order_transition_rejected() {
        let mut state = NegotiationState::new();

        // Cannot connect before the transport exists.
        assert!(state.connected().is_err());

        state.capabilities_loaded().unwrap();
        // Cannot produce straight from capabilities.
        assert!(state.producing().is_err());
        assert_eq!(state.phase(), NegotiationPhase::CapabilitiesLoaded);
    }

    #[test]
    fn test_terminal_phases_exclusive() {
        let mut state = NegotiationState::new();
        state.capabilities_loaded().unwrap();
        state.transport_created().unwrap();
        state.connected().unwrap();
        state.producing().unwrap();

        // A producing flow cannot also consume.
        assert!(state.consuming().is_err());
    }

    #[test]
    fn test_reset_allows_retry() {
        let mut state = NegotiationState::new();
        state.capabilities_loaded().unwrap();

        state.reset();
        assert_eq!(state.phase(), NegotiationPhase::Idle);
        state.capabilities_loaded().unwrap();
    }
}
