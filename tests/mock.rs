#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use present_proof::{
    config::{Config, SearchLimit},
    core::{
        credential::CredentialInfo,
        exchange::{PresentationExchangeRecord, State},
        message::{Presentation, PresentationRequest, Thread},
        proof_request::ProofRequest,
    },
    handler::{PresentationRequestHandler, Responder},
    holder::{memory::MemoryHolder, Holder, RequestedCredentials},
    manager::{
        store::{ExchangeStore, MemoryStore},
        PresentationManager,
    },
    routing::{MessageContext, OobProcessor, OobRecord, ReplyTarget},
};
use serde_json::json;

pub const THREAD_ID: &str = "6b3b3e7f-3b1d-4d8e-9a5e-0d1c2b3a4f5e";
pub const S_ID: &str = "NcYxiDXkpYi6ov5FcYDi1e:2:vidya:1.0";
pub const CD_ID: &str = "NcYxiDXkpYi6ov5FcYDi1e:3:CL:NcYxiDXkpYi6ov5FcYDi1e:2:vidya:1.0:tag1";

#[derive(Debug, Default)]
pub struct MockOob {
    pub record: Option<OobRecord>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl OobProcessor for MockOob {
    async fn find_oob_record_for_inbound_message(
        &self,
        _context: &MessageContext,
    ) -> Result<Option<OobRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.record.clone())
    }
}

/// Moves records through their states in the given store; proof construction
/// echoes the bindings instead of signing anything.
#[derive(Debug)]
pub struct MockManager {
    pub store: MemoryStore,
    pub fail_construction: bool,
    pub received: AtomicUsize,
    pub constructed: Mutex<Vec<(RequestedCredentials, Option<String>)>>,
}

impl MockManager {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            fail_construction: false,
            received: AtomicUsize::new(0),
            constructed: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }

    pub fn constructed(&self) -> Vec<(RequestedCredentials, Option<String>)> {
        self.constructed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PresentationManager for MockManager {
    async fn receive_request(
        &self,
        mut record: PresentationExchangeRecord,
    ) -> Result<PresentationExchangeRecord> {
        self.received.fetch_add(1, Ordering::SeqCst);
        record.state = State::RequestReceived;
        self.store.save(&record).await?;
        Ok(record)
    }

    async fn create_presentation(
        &self,
        mut record: PresentationExchangeRecord,
        requested_credentials: &RequestedCredentials,
        comment: Option<String>,
    ) -> Result<(PresentationExchangeRecord, Presentation)> {
        self.constructed
            .lock()
            .unwrap()
            .push((requested_credentials.clone(), comment.clone()));
        if self.fail_construction {
            bail!("wallet not found")
        }
        let proof = json!({ "requested_proof": requested_credentials });
        let presentation = Presentation::new(record.thread_id.clone(), &proof, comment)?;
        record.state = State::PresentationSent;
        record.presentation = Some(presentation.clone());
        self.store.save(&record).await?;
        Ok((record, presentation))
    }
}

#[derive(Debug, Default)]
pub struct MockResponder {
    pub fail: bool,
    pub messages: Mutex<Vec<(Presentation, ReplyTarget)>>,
}

impl MockResponder {
    pub fn messages(&self) -> Vec<(Presentation, ReplyTarget)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Responder for MockResponder {
    async fn send_reply(&self, message: Presentation, target: &ReplyTarget) -> Result<()> {
        if self.fail {
            bail!("transport down")
        }
        self.messages
            .lock()
            .unwrap()
            .push((message, target.clone()));
        Ok(())
    }
}

/// A wallet whose searches always fail.
#[derive(Debug, Default)]
pub struct BrokenHolder;

#[async_trait]
impl Holder for BrokenHolder {
    async fn credentials_for_referent(
        &self,
        _request: &ProofRequest,
        _referent: &str,
        _limit: SearchLimit,
    ) -> Result<Vec<CredentialInfo>> {
        bail!("wallet storage is locked")
    }
}

/// Everything a handler test needs, wired together.
pub struct Harness {
    pub oob: Arc<MockOob>,
    pub store: MemoryStore,
    pub manager: Arc<MockManager>,
    pub holder: MemoryHolder,
    pub responder: MockResponder,
    pub handler: PresentationRequestHandler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Config::default(), MockOob::default(), false)
    }

    pub fn with(config: Config, oob: MockOob, fail_construction: bool) -> Self {
        let store = MemoryStore::default();
        let holder = MemoryHolder::default();
        Self::with_holder(
            config,
            oob,
            fail_construction,
            store,
            holder.clone(),
            Arc::new(holder),
        )
    }

    pub fn with_holder(
        config: Config,
        oob: MockOob,
        fail_construction: bool,
        store: MemoryStore,
        holder: MemoryHolder,
        search: Arc<dyn Holder>,
    ) -> Self {
        let oob = Arc::new(oob);
        let mut manager = MockManager::new(store.clone());
        manager.fail_construction = fail_construction;
        let manager = Arc::new(manager);
        let handler = PresentationRequestHandler::builder()
            .with_config(config)
            .with_oob_processor(oob.clone())
            .with_store(Arc::new(store.clone()))
            .with_manager(manager.clone())
            .with_holder(search)
            .build()
            .unwrap();
        Self {
            oob,
            store,
            manager,
            holder,
            responder: MockResponder::default(),
            handler,
        }
    }

    pub async fn hold(&self, credentials: impl IntoIterator<Item = CredentialInfo>) {
        for credential in credentials {
            self.holder.insert(credential).await.unwrap();
        }
    }

    /// The only record on the test thread.
    pub async fn record(&self) -> PresentationExchangeRecord {
        let mut records = self.store.on_thread(THREAD_ID).await.unwrap();
        assert_eq!(1, records.len(), "{records:?}");
        records.remove(0)
    }
}

pub fn message(request: &ProofRequest) -> PresentationRequest {
    PresentationRequest::new(request).unwrap().with_thread(Thread {
        thid: Some(THREAD_ID.to_owned()),
        pthid: None,
    })
}

pub fn vidya(referent: &str, attrs: &[(&str, &str)]) -> CredentialInfo {
    attrs
        .iter()
        .fold(CredentialInfo::new(referent, S_ID, CD_ID), |credential, (name, value)| {
            credential.with_attr(*name, *value)
        })
}
