//! Data model of the present-proof 1.0 protocol, as seen by the prover.

pub mod credential;
pub mod exchange;
pub mod message;
pub mod preview;
pub mod proof_request;
