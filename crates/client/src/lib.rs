//! Catering ordering client.
//!
//! The client keeps a shopping cart on the device and talks to a hosted
//! record/auth backend for everything else.
//!
//! # Architecture
//!
//! - The backend is the source of truth for orders, menu and profiles; the
//!   only local state is the cart and the persisted auth session
//! - Remote access goes through the [`backend::DataService`] and
//!   [`backend::AuthService`] traits, with an HTTP implementation
//!   ([`backend::RestBackend`]) and an in-process one
//!   ([`backend::MemoryBackend`])
//! - Local state goes through [`storage::KeyValueStore`]
//! - Catalog lookups are cached in memory via `moka`
//!
//! # Flows
//!
//! cart → [`services::CheckoutOrchestrator`] (order + line items) →
//! [`services::PaymentService`] (`pending` → `processing`) →
//! [`services::HistoryService`].
//!
//! Every async flow takes a [`CancelToken`]; a cancelled read discards its
//! result instead of handing stale data to a screen that went away.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cancel;
pub mod cart;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod state;
pub mod storage;

pub use cancel::{CancelToken, Cancelled};
pub use config::{ClientConfig, ClientOptions, ConfigError};
pub use error::{Alert, ClientError};
pub use state::CateringClient;
