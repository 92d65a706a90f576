//! Prover-side automatic presentation for [Aries RFC 0037: Present Proof 1.0].
//!
//! [Aries RFC 0037: Present Proof 1.0]: <https://github.com/hyperledger/aries-rfcs/tree/main/features/0037-present-proof>
//!
//! # Usage
//!
//! The [`PresentationRequestHandler`] answers inbound `request-presentation`
//! messages. It is assembled from the agent's collaborators:
//!
//! ```ignore
//! use std::sync::Arc;
//! use present_proof::handler::{InboundMessage, PresentationRequestHandler};
//! use present_proof::manager::store::MemoryStore;
//!
//! let handler = PresentationRequestHandler::builder()
//!     .with_config(config)
//!     .with_oob_processor(Arc::new(oob_processor))
//!     .with_store(Arc::new(MemoryStore::default()))
//!     .with_manager(Arc::new(presentation_manager))
//!     .with_holder(Arc::new(wallet))
//!     .build()?;
//!
//! let message = InboundMessage::parse(message_type, body)?;
//! let outcome = handler.dispatch(connection, &message, &responder).await?;
//! ```
//!
//! The agent's behavior is customized by implementing the [`OobProcessor`],
//! [`ExchangeStore`], [`PresentationManager`], [`Holder`] and [`Responder`]
//! traits.
//!
//! [`PresentationRequestHandler`]: crate::handler::PresentationRequestHandler
//! [`OobProcessor`]: crate::routing::OobProcessor
//! [`ExchangeStore`]: crate::manager::store::ExchangeStore
//! [`PresentationManager`]: crate::manager::PresentationManager
//! [`Holder`]: crate::holder::Holder
//! [`Responder`]: crate::handler::Responder
//!
//! # Protocol Overview
//!
//! 1. *Routing*: the reply goes over the message's connection, which must be
//!    ready, or back along the out-of-band exchange the message belongs to.
//!    See [`routing`].
//! 2. *Exchange record*: the exchange record of the thread is loaded, or created
//!    when the verifier opened the thread, and moved to `request_received` by
//!    the [`PresentationManager`].
//! 3. *Evidence selection*: when the record allows automatic presentation,
//!    every referent of the proof request is bound to a held credential. If the
//!    holder proposed values earlier on the thread, only credentials carrying
//!    exactly those values are eligible. See [`holder::selector`].
//! 4. *Presentation*: with every referent bound, the [`PresentationManager`]
//!    builds the proof and the presentation is sent. Anything short of that
//!    leaves the request for manual handling.
//!
//! [`routing`]: crate::routing
//! [`holder::selector`]: crate::holder::selector

pub mod config;
pub mod core;
pub mod error;
pub mod handler;
pub mod holder;
pub mod manager;
pub mod routing;
pub mod utils;
