//! Web of Science web services: session client, request envelopes and responses

pub mod client;
pub(crate) mod envelope;
pub mod models;
pub(crate) mod parser;
pub mod shape;

pub use client::WosClient;
pub use models::{
    CitedReference, Edition, MAX_PAGE_SIZE, RetrieveParameters, SearchOptions, SearchResponse,
    SearchSummary, SortField, SortOrder, TimeSpan,
};
pub use shape::ResponseShape;
