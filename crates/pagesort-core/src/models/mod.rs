//! Data models for pages, outcomes and configuration.

pub mod config;
pub mod page;

pub use config::PagesortConfig;
pub use page::{Classification, PageRecord, PageText, UnclassifiedReason, EMPTY_PAGE_MARKER};
