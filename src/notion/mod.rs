//! Notion-backed remote gateway.

mod client;

pub use client::NotionClient;
