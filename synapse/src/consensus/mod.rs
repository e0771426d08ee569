//! Consensus participation for a single node.
//!
//! This module provides the client side of the consensus protocol:
//!
//! - the shared local neural-state slot ([`store::StateSlot`]),
//! - typed per-round outcomes ([`round::RoundSummary`]),
//! - the cancellable background loop ([`worker::ConsensusLoop`]),
//! - and the client error type ([`error::ClientError`]).

pub mod error;
pub mod round;
pub mod store;
pub mod worker;

pub use error::ClientError;
pub use round::{LoopPhase, RoundSummary, Step, StepOutcome};
pub use store::{SlotWriter, StateSlot};
pub use worker::ConsensusLoop;
