//! Async HTTP clients for fetching dependency metadata from upstream
//! package registries and code hosts.
//!
//! Each ecosystem module exposes a `fetch_metadata` function returning a
//! [`MetadataDraft`](crate::models::MetadataDraft): everything the upstream
//! could tell us, with a discrepancy recorded for each gap. The license
//! resolver fills the remaining holes afterwards.

pub mod github;
pub mod golang;
pub mod npm;
pub mod pypi;
