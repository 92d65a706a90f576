use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use uuid::Uuid;

use super::{
    message::{Presentation, PresentationProposal, PresentationRequest},
    preview::PresentationPreview,
    proof_request::ProofRequest,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Prover,
    Verifier,
}

/// Which party sent the first message of the exchange.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Initiator {
    #[serde(rename = "self")]
    Own,
    External,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    Initial,
    ProposalSent,
    ProposalReceived,
    RequestSent,
    RequestReceived,
    PresentationSent,
    PresentationReceived,
    Verified,
    PresentationAcked,
    Abandoned,
}

/// Persistent state of one presentation exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresentationExchangeRecord {
    pub presentation_exchange_id: Uuid,
    pub thread_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    pub initiator: Initiator,
    pub role: Role,
    pub state: State,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_proposal: Option<PresentationProposal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_request: Option<ProofRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_request_dict: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation: Option<Presentation>,
    #[serde(default)]
    pub auto_present: bool,
    #[serde(default)]
    pub auto_remove: bool,
    #[serde(default)]
    pub trace: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

impl PresentationExchangeRecord {
    /// A prover-side record opened by an inbound request on `thread_id`.
    pub fn prover(thread_id: impl Into<String>, connection_id: Option<String>) -> Self {
        Self {
            presentation_exchange_id: Uuid::new_v4(),
            thread_id: thread_id.into(),
            connection_id,
            initiator: Initiator::External,
            role: Role::Prover,
            state: State::Initial,
            presentation_proposal: None,
            presentation_request: None,
            presentation_request_dict: None,
            presentation: None,
            auto_present: false,
            auto_remove: false,
            trace: false,
            error_msg: None,
        }
    }

    pub fn with_proposal(mut self, proposal: PresentationProposal) -> Self {
        self.presentation_proposal = Some(proposal);
        self
    }

    pub fn with_auto_present(mut self, auto_present: bool) -> Self {
        self.auto_present = auto_present;
        self
    }

    /// The preview the holder volunteered earlier on this thread, if any.
    pub fn preview(&self) -> Option<&PresentationPreview> {
        self.presentation_proposal
            .as_ref()
            .map(|proposal| &proposal.presentation_proposal)
    }

    /// Attach an inbound request, keeping the raw message for audit.
    pub fn attach_request(&mut self, request: ProofRequest, message: &PresentationRequest) {
        self.presentation_request = Some(request);
        self.presentation_request_dict = serde_json::to_value(message).ok();
    }

    /// Whether the exchange is waiting for the prover to build a presentation
    /// automatically.
    pub fn ready_for_auto_presentation(&self) -> bool {
        self.auto_present
            && self.state == State::RequestReceived
            && self.presentation_request.is_some()
    }

    /// Abandon the exchange and keep the reason.
    ///
    /// Returns `false` when the record already holds this exact error, so
    /// callers can skip a redundant save.
    pub fn set_error_state(&mut self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        if self.state == State::Abandoned && self.error_msg.as_deref() == Some(reason.as_str()) {
            return false;
        }
        self.state = State::Abandoned;
        self.error_msg = Some(reason);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names() {
        let record = PresentationExchangeRecord::prover("thread-1", Some("dummy".to_owned()));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(json!("external"), value["initiator"]);
        assert_eq!(json!("prover"), value["role"]);
        assert_eq!(json!("initial"), value["state"]);
        assert_eq!(json!("self"), serde_json::to_value(Initiator::Own).unwrap());
        assert_eq!(
            json!("presentation_acked"),
            serde_json::to_value(State::PresentationAcked).unwrap()
        );
    }

    #[test]
    fn auto_presentation_requires_request_received() {
        let mut record =
            PresentationExchangeRecord::prover("thread-1", None).with_auto_present(true);
        assert!(!record.ready_for_auto_presentation());

        record.state = State::RequestReceived;
        assert!(!record.ready_for_auto_presentation());

        record.presentation_request = Some(ProofRequest::new("proof-request", "1.0", "1"));
        assert!(record.ready_for_auto_presentation());

        record.auto_present = false;
        assert!(!record.ready_for_auto_presentation());
    }

    #[test]
    fn error_state() {
        let mut record = PresentationExchangeRecord::prover("thread-1", None);
        assert!(record.set_error_state("wallet locked"));
        assert_eq!(State::Abandoned, record.state);
        assert!(!record.set_error_state("wallet locked"));
        assert!(record.set_error_state("ledger unreachable"));
        assert_eq!(Some("ledger unreachable"), record.error_msg.as_deref());
    }
}
