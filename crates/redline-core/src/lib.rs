//! Domain types and seams for the Redline analysis versioning engine.
//!
//! Files, analyses and the feedback schema live here, together with the three
//! traits the outer crates implement: [`store::VersionStore`],
//! [`producer::Producer`] and [`source::DocumentSource`]. No HTTP, no SQL.

// Trait methods are declared as `-> impl Future + Send`; implementors use
// `async fn`.
#![allow(async_fn_in_trait)]

pub mod analysis;
pub mod chain;
pub mod error;
pub mod feedback;
pub mod file;
pub mod ids;
pub mod producer;
pub mod source;
pub mod store;

pub use error::{Error, Result};
