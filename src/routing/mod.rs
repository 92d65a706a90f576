//! Decides where the reply to an inbound message goes: over an established
//! connection, or back along a connectionless out-of-band exchange.

use std::fmt::Debug;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::{core::message::PresentationRequest, error::RoutingError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Invitation,
    Request,
    Response,
    Active,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub connection_id: String,
    pub state: ConnectionState,
}

impl ConnectionRecord {
    pub fn new(connection_id: impl Into<String>, state: ConnectionState) -> Self {
        Self {
            connection_id: connection_id.into(),
            state,
        }
    }

    /// Only an established connection can carry protocol messages.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ConnectionState::Active | ConnectionState::Completed)
    }
}

/// The counterparty's inline service block from an out-of-band invitation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDecorator {
    pub recipient_keys: Vec<String>,
    #[serde(default)]
    pub routing_keys: Vec<String>,
    pub service_endpoint: Url,
}

/// An out-of-band exchange correlated with an inbound message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OobRecord {
    pub oob_id: String,
    pub invitation_msg_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub their_service: Option<ServiceDecorator>,
}

/// Metadata of the inbound message being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContext {
    pub thread_id: String,
    pub parent_thread_id: Option<String>,
    pub connection: Option<ConnectionRecord>,
    pub trace: bool,
}

impl MessageContext {
    pub fn for_request(message: &PresentationRequest) -> Self {
        Self {
            thread_id: message.thread_id().to_owned(),
            parent_thread_id: message.parent_thread_id().map(str::to_owned),
            connection: None,
            trace: message.trace.is_some(),
        }
    }

    pub fn with_connection(mut self, connection: ConnectionRecord) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.connection
            .as_ref()
            .map(|connection| connection.connection_id.as_str())
    }
}

/// Correlates inbound messages with out-of-band exchanges.
#[async_trait]
pub trait OobProcessor: Debug + Send + Sync {
    /// Find the out-of-band exchange this message answers, by thread or parent thread.
    async fn find_oob_record_for_inbound_message(
        &self,
        context: &MessageContext,
    ) -> Result<Option<OobRecord>>;
}

/// Where an outbound reply is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTarget {
    Connection { connection_id: String },
    Connectionless { oob_id: String, service: Option<ServiceDecorator> },
}

/// Resolve the reply target of an inbound message.
///
/// A connection, when present, must be ready and takes precedence; otherwise the
/// message has to belong to a known out-of-band exchange.
pub async fn resolve_reply_target(
    context: &MessageContext,
    oob: &dyn OobProcessor,
) -> Result<ReplyTarget, RoutingError> {
    if let Some(connection) = &context.connection {
        if !connection.is_ready() {
            return Err(RoutingError::ConnectionNotReady {
                connection_id: connection.connection_id.clone(),
            });
        }
        return Ok(ReplyTarget::Connection {
            connection_id: connection.connection_id.clone(),
        });
    }

    let record = oob
        .find_oob_record_for_inbound_message(context)
        .await
        .map_err(RoutingError::OobLookup)?;

    match record {
        Some(record) => {
            debug!(oob_id = %record.oob_id, "replying over connectionless exchange");
            Ok(ReplyTarget::Connectionless {
                oob_id: record.oob_id,
                service: record.their_service,
            })
        }
        None => Err(RoutingError::NoConnectionOrOob),
    }
}
