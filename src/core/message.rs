use std::fmt;

use anyhow::{bail, Context, Error, Result};
use base64::prelude::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value as Json;
use uuid::Uuid;

use super::{preview::PresentationPreview, proof_request::ProofRequest};
use crate::utils::NonEmptyVec;

pub const PROTOCOL_URI: &str = "https://didcomm.org/present-proof/1.0/";
pub const LEGACY_PROTOCOL_URI: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/present-proof/1.0/";

const INDY_REQUEST_ATTACH_ID: &str = "libindy-request-presentation-0";
const INDY_PROOF_ATTACH_ID: &str = "libindy-presentation-0";

/// Message families of the present-proof 1.0 protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    ProposePresentation,
    RequestPresentation,
    Presentation,
    PresentationAck,
}

impl MessageType {
    pub fn name(&self) -> &'static str {
        match self {
            MessageType::ProposePresentation => "propose-presentation",
            MessageType::RequestPresentation => "request-presentation",
            MessageType::Presentation => "presentation",
            MessageType::PresentationAck => "ack",
        }
    }

    /// Fully qualified type URI under the current prefix.
    pub fn uri(&self) -> String {
        format!("{PROTOCOL_URI}{}", self.name())
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

impl TryFrom<&str> for MessageType {
    type Error = Error;

    /// Accepts both the current and the legacy `did:sov` prefix.
    fn try_from(uri: &str) -> Result<Self> {
        let Some(name) = uri
            .strip_prefix(PROTOCOL_URI)
            .or_else(|| uri.strip_prefix(LEGACY_PROTOCOL_URI))
        else {
            bail!("'{uri}' is not a present-proof 1.0 message type")
        };
        Ok(match name {
            "propose-presentation" => MessageType::ProposePresentation,
            "request-presentation" => MessageType::RequestPresentation,
            "presentation" => MessageType::Presentation,
            "ack" => MessageType::PresentationAck,
            other => bail!("unknown present-proof 1.0 message '{other}'"),
        })
    }
}

/// The `~thread` decorator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thread {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pthid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttachmentData {
    #[serde(rename = "base64")]
    Base64(String),
    #[serde(rename = "json")]
    Json(Json),
}

/// An attachment carrying an Indy payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(
        rename = "mime-type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
    pub data: AttachmentData,
}

impl Attachment {
    /// Encode a JSON payload as a base64 attachment.
    pub fn encode(id: impl Into<String>, payload: &impl Serialize) -> Result<Self> {
        let bytes = serde_json::to_vec(payload).context("unable to serialize attachment payload")?;
        Ok(Self {
            id: id.into(),
            mime_type: Some("application/json".to_owned()),
            data: AttachmentData::Base64(BASE64_STANDARD.encode(bytes)),
        })
    }

    /// Decode the JSON payload, whichever form it was attached in.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.data {
            AttachmentData::Base64(encoded) => {
                let bytes = BASE64_STANDARD
                    .decode(encoded)
                    .with_context(|| format!("attachment '{}' is not valid base64", self.id))?;
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("attachment '{}' could not be parsed", self.id))
            }
            AttachmentData::Json(json) => serde_json::from_value(json.clone())
                .with_context(|| format!("attachment '{}' could not be parsed", self.id)),
        }
    }
}

/// A verifier's `request-presentation` message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresentationRequest {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "request_presentations~attach")]
    pub attachments: NonEmptyVec<Attachment>,
    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    #[serde(rename = "~trace", default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Json>,
}

impl PresentationRequest {
    pub fn new(request: &ProofRequest) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            comment: None,
            attachments: NonEmptyVec::new(Attachment::encode(INDY_REQUEST_ATTACH_ID, request)?),
            thread: None,
            trace: None,
        })
    }

    pub fn with_thread(mut self, thread: Thread) -> Self {
        self.thread = Some(thread);
        self
    }

    /// The thread this message belongs to; a message without `~thread` starts its own.
    pub fn thread_id(&self) -> &str {
        self.thread
            .as_ref()
            .and_then(|thread| thread.thid.as_deref())
            .unwrap_or(&self.id)
    }

    pub fn parent_thread_id(&self) -> Option<&str> {
        self.thread.as_ref().and_then(|thread| thread.pthid.as_deref())
    }

    /// The Indy proof request carried in the first attachment.
    pub fn proof_request(&self) -> Result<ProofRequest> {
        self.attachments.head().decode()
    }
}

/// A holder's `propose-presentation` message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresentationProposal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub presentation_proposal: PresentationPreview,
}

impl PresentationProposal {
    pub fn new(preview: PresentationPreview) -> Self {
        Self {
            comment: None,
            presentation_proposal: preview,
        }
    }
}

/// The prover's `presentation` reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Presentation {
    #[serde(rename = "@type")]
    pub message_type: String,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "presentations~attach")]
    pub attachments: NonEmptyVec<Attachment>,
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl Presentation {
    /// Wrap an Indy proof as the reply on `thread_id`.
    pub fn new(
        thread_id: impl Into<String>,
        proof: &Json,
        comment: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            message_type: MessageType::Presentation.uri(),
            id: Uuid::new_v4().to_string(),
            comment,
            attachments: NonEmptyVec::new(Attachment::encode(INDY_PROOF_ATTACH_ID, proof)?),
            thread: Thread {
                thid: Some(thread_id.into()),
                pthid: None,
            },
        })
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread.thid.as_deref()
    }

    pub fn proof(&self) -> Result<Json> {
        self.attachments.head().decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::proof_request::{AttributeGroupRequest, Restriction};
    use serde_json::json;

    #[test]
    fn message_types() {
        assert_eq!(
            MessageType::RequestPresentation,
            MessageType::try_from("https://didcomm.org/present-proof/1.0/request-presentation")
                .unwrap()
        );
        assert_eq!(
            MessageType::RequestPresentation,
            MessageType::try_from(
                "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/present-proof/1.0/request-presentation"
            )
            .unwrap()
        );
        let v2 = "https://didcomm.org/present-proof/2.0/request-presentation";
        assert!(MessageType::try_from(v2).is_err());
        assert!(MessageType::try_from("https://didcomm.org/present-proof/1.0/bogus").is_err());
    }

    #[test]
    fn request_attachment() {
        let request = ProofRequest::new("proof-request", "1.0", "1234567890")
            .with_attribute(
                "0_favourite_uuid",
                AttributeGroupRequest::new("favourite")
                    .with_restriction(Restriction::cred_def("cd")),
            )
            .unwrap();

        let message = PresentationRequest::new(&request).unwrap();
        assert_eq!(message.id, message.thread_id());
        assert_eq!(request, message.proof_request().unwrap());

        let wire = serde_json::to_value(&message).unwrap();
        let parsed: PresentationRequest = serde_json::from_value(wire).unwrap();
        assert_eq!(request, parsed.proof_request().unwrap());
    }

    #[test]
    fn json_attachment() {
        let message: PresentationRequest = serde_json::from_value(json!({
            "@id": "e5c5c2f0-7b8c-4b7a-9f3a-2a1b0e0f3c11",
            "request_presentations~attach": [{
                "@id": "libindy-request-presentation-0",
                "mime-type": "application/json",
                "data": {"json": {
                    "name": "proof-request",
                    "version": "1.0",
                    "nonce": "1234567890",
                    "requested_attributes": {},
                    "requested_predicates": {}
                }}
            }],
            "~thread": {"thid": "thread-1", "pthid": "oob-1"}
        }))
        .unwrap();

        assert_eq!("thread-1", message.thread_id());
        assert_eq!(Some("oob-1"), message.parent_thread_id());
        assert_eq!("1234567890", message.proof_request().unwrap().nonce());
    }

    #[test]
    fn presentation_on_thread() {
        let proof = json!({"proof": {}, "requested_proof": {}});
        let presentation = Presentation::new("thread-1", &proof, None).unwrap();
        assert_eq!(Some("thread-1"), presentation.thread_id());
        assert_eq!(proof, presentation.proof().unwrap());
        assert_eq!(
            "https://didcomm.org/present-proof/1.0/presentation",
            presentation.message_type
        );
    }
}
