use thiserror::Error;
use uuid::Uuid;

/// No usable delivery context for an inbound message.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("no connection or associated connectionless exchange found for presentation request")]
    NoConnectionOrOob,

    #[error("connection {connection_id} used for presentation request not ready")]
    ConnectionNotReady { connection_id: String },

    #[error("out-of-band lookup failed")]
    OobLookup(#[source] anyhow::Error),
}

/// Failures of an [ExchangeStore](crate::manager::store::ExchangeStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no presentation exchange record for thread {thread_id}")]
    NotFound { thread_id: String },

    #[error("presentation exchange record {presentation_exchange_id} already exists")]
    Duplicate { presentation_exchange_id: Uuid },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Failures that the request handler reports to its caller.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("presentation request is malformed")]
    Malformed(#[source] anyhow::Error),

    #[error("presentation exchange storage failed")]
    Storage(#[from] StoreError),

    #[error("request-received transition failed")]
    Transition(#[source] anyhow::Error),
}
