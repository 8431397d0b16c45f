//! # prioritycards Core Library
//!
//! Business logic for prioritycards, a small tool for ranking work items
//! ("cards") by urgency/importance/effort or by the RICE formula. Cards live
//! in a hosted PostgREST backend; this crate keeps a client-side view of
//! them in sync. The CLI is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Cards**: data model, RICE scoring, and the field mapping between the
//!   application shape and the remote schema
//! - **Remote**: the four-operation CRUD contract with an HTTP client and an
//!   in-memory implementation
//! - **Store**: the synchronization store holding the ordered collection,
//!   selection, and observable status
//! - **Auth**: shared-credential login with explicit session persistence
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`CardStore`]: client-side card collection
//! - [`RemoteService`]: trait for the hosted backend
//! - [`AuthService`]: login/logout and session restore
//! - [`Config`]: application configuration management

pub mod auth;
pub mod card;
pub mod error;
pub mod remote;
pub mod storage;
pub mod store;

pub use auth::{AuthOptions, AuthService, AuthState, SessionStore};
pub use card::{rank_by_rice, rice_score, Card, CardPatch, Effort, Impact, NewCard, RiceFields};
pub use error::{AuthError, ConfigError, CoreError, RemoteError, SessionError, ValidationError};
pub use remote::{InMemoryRemote, RemoteService, RestClient};
pub use storage::{BackendSettings, Config};
pub use store::{CardStore, StoreStatus};
