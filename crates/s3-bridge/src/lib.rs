//! S3 REST gateway for hierarchical object stores
//!
//! `s3-bridge` translates a subset of the Amazon S3 REST API onto a
//! hierarchical backing object store. Incoming requests are authenticated
//! (AWS Signature Version 2 and Version 4), resolved to a bucket and object
//! path across both S3 addressing conventions, routed to a logical
//! operation and executed against a pluggable [`StorageGateway`].
//!
//! # Architecture
//!
//! HTTP request → [`auth`] (signature verification, clock-skew check) →
//! [`path`] (bucket + path resolution) → [`router`] (operation selection) →
//! [`ops`] handlers over a [`StorageGateway`] → S3-style XML response.
//!
//! # Getting started
//!
//! 1. Implement [`StorageGateway`] for your backing store
//! 2. Build a [`BridgeConfig`] with your credentials and endpoint layout
//! 3. Serve [`service::S3Bridge`] with hyper
//!
//! [`StorageGateway`]: storage::StorageGateway
//! [`BridgeConfig`]: config::BridgeConfig

#[macro_use]
mod error;

mod time;

pub mod auth;
pub mod config;
pub mod http;
pub mod ops;
pub mod path;
pub mod router;
pub mod service;
pub mod sig_v2;
pub mod sig_v4;
pub mod storage;
pub mod xml;

pub use self::error::{ClockSkew, S3Error, S3ErrorCode, S3Result, SignatureMismatch};
pub use self::http::{Body, S3Request, S3Response};
pub use self::service::S3Bridge;
