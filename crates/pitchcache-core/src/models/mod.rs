//! Data models for the interception layer.
//!
//! - `InterceptedRequest`: the request surface seen by the classifier
//! - `Response`: a response snapshot, as fetched or as stored in a compartment

pub mod request;
pub mod response;

pub use request::{InterceptedRequest, Url};
pub use response::{OfflineBody, Response};
