//! Core types and traits for the copydesk article lifecycle.
//!
//! This crate defines the abstractions shared between the lifecycle engine
//! and the document-store backends:
//! - `Article` / `DraftPatch`: the record moving through the lifecycle and
//!   its mutable editorial payload
//! - `Collection`: the three logical collections (draft, version, publish)
//! - `DocumentStore`: the conditional-write primitives every backend must
//!   provide
//! - `StoreError` / `LifecycleError`: backend failures vs. operation
//!   failures

mod article;
mod error;
mod id;
mod store;

pub use article::{Article, Collection, DraftPatch};
pub use error::{LifecycleError, StoreError};
pub use id::{split_article_id, version_id};
pub use store::{CreateOutcome, DocumentStore, UpdateOutcome};
