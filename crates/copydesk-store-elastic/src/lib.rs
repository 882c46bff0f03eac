//! Elasticsearch-backed document store.
//!
//! One index per collection (`{prefix}-draft`, `{prefix}-version`,
//! `{prefix}-publish`). Conditional semantics map onto single document-API
//! calls: create-only via `_create`, the lock-owner predicate via a
//! painless script evaluated server-side, the publish pointer via
//! `doc_as_upsert`. Each call is one request, so the store's own atomicity
//! guarantees carry the cross-instance correctness of the lifecycle.

mod client;
mod store;

pub use store::ElasticStore;
