//! Folio Server
//!
//! Uploads documents and serves their pages as text or HTML. Pages are
//! extracted lazily in small batches and cached, so a reader gets the first
//! pages of a large document quickly while the rest fill in on later requests.
//!
//! Layers, bottom-up:
//! - [`storage`]: uploaded document bytes and page counts
//! - [`cache`]: per-page content behind the [`cache::PageStore`] trait
//! - [`extract`]: the MuPDF extractor and the batch orchestrator
//! - [`content`] and [`export`]: the read/edit and aggregation facades
//! - [`routes`]: the HTTP API

pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod export;
pub mod extract;
pub mod routes;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;
