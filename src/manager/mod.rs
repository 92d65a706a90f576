//! State transitions of a presentation exchange and the storage behind them.

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    core::{exchange::PresentationExchangeRecord, message::Presentation},
    holder::RequestedCredentials,
};

pub mod store;

/// The exchange state machine, including proof construction.
#[async_trait]
pub trait PresentationManager: Send + Sync {
    /// Take in the request attached to `record`: move to `request_received`,
    /// persist, and return the updated record.
    async fn receive_request(
        &self,
        record: PresentationExchangeRecord,
    ) -> Result<PresentationExchangeRecord>;

    /// Build and sign a presentation from the given bindings, move to
    /// `presentation_sent`, persist, and return the message to send.
    async fn create_presentation(
        &self,
        record: PresentationExchangeRecord,
        requested_credentials: &RequestedCredentials,
        comment: Option<String>,
    ) -> Result<(PresentationExchangeRecord, Presentation)>;
}
