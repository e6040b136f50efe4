// src/ingest/providers/mod.rs
pub mod fixture;
pub mod http_json;

pub use fixture::FixtureProvider;
pub use http_json::{build_http_client, HttpJsonProvider};
