//! # Fleetsync Server
//!
//! Transport-agnostic provisioning server role for Fleetsync.
//!
//! This crate provides:
//! - Log replication commands (query, receive, send)
//! - Named versioned-repository commands (range, checkout, commit)
//! - Deployment package commands (versions, full/fix package streams)
//! - Request batch limits and stream backpressure
//!
//! # Architecture
//!
//! The server is the peer side of the replication protocol: it answers the
//! same three log commands a transport carries, serves checkout and
//! compare-and-set commit against a fixed set of named repositories, and
//! builds deployment packages through the diff engine. It is deliberately
//! free of any network layer; an HTTP or other frontend maps its endpoints
//! onto [`RequestHandler`] calls and serializes the answers with the
//! `fleetsync_protocol` document codecs.
//!
//! Every collaborator (the [`LogStore`], the repositories, the snapshot
//! provider and the artifact source) is wired once at construction.
//! [`ProvisioningServer`] is that composition root.
//!
//! [`LogStore`]: fleetsync_log::LogStore

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use server::ProvisioningServer;
