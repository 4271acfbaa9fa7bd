//! Core types and engines for the Docket service-request store.
//!
//! This crate has no database or CLI dependencies. It owns
//! the [`RequestManager`](manager::RequestManager), which keeps an ordered
//! index, a priority heap, a dependency graph and the lookup tables
//! consistent, plus the [`RequestStore`](store::RequestStore) trait that
//! persistence backends implement.

// `RequestStore` implementors write plain `async fn` bodies.
// The trait itself spells out the `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod graph;
pub mod heap;
pub mod index;
pub mod manager;
pub mod request;
pub mod store;

pub use error::{Error, Result};
