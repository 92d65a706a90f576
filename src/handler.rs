//! Prover-side handling of inbound `request-presentation` messages.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value as Json;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    config::Config,
    core::{
        exchange::{PresentationExchangeRecord, Role},
        message::{MessageType, Presentation, PresentationRequest},
    },
    error::{HandlerError, StoreError},
    holder::{
        selector::{EvidenceSelector, Selection, Shortfall},
        Holder,
    },
    manager::{store::ExchangeStore, PresentationManager},
    routing::{resolve_reply_target, ConnectionRecord, MessageContext, OobProcessor, ReplyTarget},
};

/// Outbound delivery of protocol messages.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn send_reply(&self, message: Presentation, target: &ReplyTarget) -> Result<()>;
}

/// What became of a well-formed, routable request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// A presentation was built and sent.
    Presented { presentation_exchange_id: Uuid },
    /// Automatic presentation is off for this exchange.
    AwaitingManual,
    /// Held evidence does not answer the request as proposed.
    Declined(Shortfall),
    /// Building or sending the presentation failed; the exchange was abandoned.
    Faulted { error_msg: String },
}

/// Inbound messages this crate knows how to handle, keyed by message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    RequestPresentation(PresentationRequest),
}

impl InboundMessage {
    /// Decode a message body according to its `@type`.
    pub fn parse(message_type: &str, body: Json) -> Result<Self> {
        match MessageType::try_from(message_type)? {
            MessageType::RequestPresentation => Ok(InboundMessage::RequestPresentation(
                serde_json::from_value(body).context("unable to parse request-presentation")?,
            )),
            other => bail!("no handler registered for {other}"),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            InboundMessage::RequestPresentation(_) => MessageType::RequestPresentation,
        }
    }
}

/// Answers proof requests, automatically when the exchange allows it.
#[derive(Clone)]
pub struct PresentationRequestHandler {
    config: Config,
    oob: Arc<dyn OobProcessor>,
    store: Arc<dyn ExchangeStore>,
    manager: Arc<dyn PresentationManager>,
    holder: Arc<dyn Holder>,
}

impl PresentationRequestHandler {
    pub fn builder() -> PresentationRequestHandlerBuilder {
        PresentationRequestHandlerBuilder::default()
    }

    /// Route a decoded inbound message to its handler.
    pub async fn dispatch(
        &self,
        connection: Option<ConnectionRecord>,
        message: &InboundMessage,
        responder: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        match message {
            InboundMessage::RequestPresentation(request) => {
                let mut context = MessageContext::for_request(request);
                context.connection = connection;
                self.handle(&context, request, responder).await
            }
        }
    }

    /// Handle one `request-presentation` message.
    ///
    /// Only routing, malformed attachment, storage and transition failures are
    /// returned as errors. Missing or inconsistent evidence, proof construction
    /// and delivery faults are reported through [HandlerOutcome].
    #[tracing::instrument(
        name = "presentation_request",
        skip_all,
        fields(thread_id = %context.thread_id)
    )]
    pub async fn handle(
        &self,
        context: &MessageContext,
        message: &PresentationRequest,
        responder: &dyn Responder,
    ) -> Result<HandlerOutcome, HandlerError> {
        debug!(connection_id = ?context.connection_id(), "received presentation request");

        let target = resolve_reply_target(context, self.oob.as_ref()).await?;
        let proof_request = message.proof_request().map_err(HandlerError::Malformed)?;

        let record = match self
            .store
            .retrieve_by_thread(&context.thread_id, Role::Prover, context.connection_id())
            .await
        {
            Ok(mut record) => {
                record.attach_request(proof_request, message);
                record
            }
            Err(StoreError::NotFound { .. }) => {
                let mut record = PresentationExchangeRecord::prover(
                    context.thread_id.clone(),
                    context.connection_id().map(str::to_owned),
                );
                record.auto_present = self.config.auto_respond_presentation_request;
                record.auto_remove = !self.config.preserve_exchange_records;
                record.trace = context.trace;
                record.attach_request(proof_request, message);
                self.store.create(record).await?
            }
            Err(err) => return Err(err.into()),
        };

        let record = self
            .manager
            .receive_request(record)
            .await
            .map_err(HandlerError::Transition)?;

        let Some(request) = record
            .presentation_request
            .clone()
            .filter(|_| record.ready_for_auto_presentation())
        else {
            debug!(
                auto_present = record.auto_present,
                state = ?record.state,
                "leaving presentation request for manual handling"
            );
            return Ok(HandlerOutcome::AwaitingManual);
        };

        let selector =
            EvidenceSelector::new(self.holder.as_ref(), self.config.credential_search_limit);
        let selection = selector.select(&request, record.preview()).await;
        let requested_credentials = match selection {
            Ok(Selection::Ready(requested_credentials)) => requested_credentials,
            Ok(Selection::Declined(shortfall)) => return Ok(HandlerOutcome::Declined(shortfall)),
            Err(err) => return Ok(self.record_fault(record, err).await),
        };

        let comment = format!("auto-presented for proof request nonce={}", request.nonce());
        let (record, presentation) = match self
            .manager
            .create_presentation(record.clone(), &requested_credentials, Some(comment))
            .await
        {
            Ok(created) => created,
            Err(err) => return Ok(self.record_fault(record, err).await),
        };

        if let Err(err) = responder.send_reply(presentation, &target).await {
            let err = err.context("unable to deliver presentation");
            return Ok(self.record_fault(record, err).await);
        }

        info!(
            presentation_exchange_id = %record.presentation_exchange_id,
            "auto-presented for proof request nonce={}",
            request.nonce()
        );
        Ok(HandlerOutcome::Presented {
            presentation_exchange_id: record.presentation_exchange_id,
        })
    }

    async fn record_fault(
        &self,
        mut record: PresentationExchangeRecord,
        err: anyhow::Error,
    ) -> HandlerOutcome {
        let error_msg = format!("{err:#}");
        error!(
            presentation_exchange_id = %record.presentation_exchange_id,
            "automatic presentation failed: {error_msg}"
        );
        if record.set_error_state(error_msg.clone()) {
            if let Err(save_err) = self.store.save(&record).await {
                error!("unable to persist error state: {save_err:#}");
            }
        }
        HandlerOutcome::Faulted { error_msg }
    }
}

/// Builder struct for [PresentationRequestHandler].
#[derive(Default)]
pub struct PresentationRequestHandlerBuilder {
    config: Config,
    oob: Option<Arc<dyn OobProcessor>>,
    store: Option<Arc<dyn ExchangeStore>>,
    manager: Option<Arc<dyn PresentationManager>>,
    holder: Option<Arc<dyn Holder>>,
}

impl PresentationRequestHandlerBuilder {
    pub fn build(self) -> Result<PresentationRequestHandler> {
        let Self {
            config,
            oob,
            store,
            manager,
            holder,
        } = self;

        let Some(oob) = oob else {
            bail!("out-of-band processor is required, see `with_oob_processor`")
        };

        let Some(store) = store else {
            bail!("exchange store is required, see `with_store`")
        };

        let Some(manager) = manager else {
            bail!("presentation manager is required, see `with_manager`")
        };

        let Some(holder) = holder else {
            bail!("holder is required, see `with_holder`")
        };

        Ok(PresentationRequestHandler {
            config,
            oob,
            store,
            manager,
            holder,
        })
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_oob_processor(mut self, oob: Arc<dyn OobProcessor>) -> Self {
        self.oob = Some(oob);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ExchangeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_manager(mut self, manager: Arc<dyn PresentationManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn with_holder(mut self, holder: Arc<dyn Holder>) -> Self {
        self.holder = Some(holder);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_types_only() {
        let body = json!({
            "@id": "request-1",
            "request_presentations~attach": [{
                "@id": "libindy-request-presentation-0",
                "data": {"json": {"name": "proof-request", "version": "1.0", "nonce": "1"}}
            }]
        });
        let message = InboundMessage::parse(
            "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/present-proof/1.0/request-presentation",
            body.clone(),
        )
        .unwrap();
        assert_eq!(MessageType::RequestPresentation, message.message_type());

        let ack = "https://didcomm.org/present-proof/1.0/ack";
        assert!(InboundMessage::parse(ack, body.clone()).is_err());
        let offer = "https://didcomm.org/issue-credential/1.0/offer-credential";
        assert!(InboundMessage::parse(offer, body).is_err());
    }

    #[test]
    fn builder_requires_collaborators() {
        assert!(PresentationRequestHandler::builder().build().is_err());
    }
}
