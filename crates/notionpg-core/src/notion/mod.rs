//! Notion API surface: typed wire protocol and the paginated client.

pub mod client;
pub mod wire;

pub use client::{HttpTransport, NotionClient, NotionTransport, PageFetcher};
