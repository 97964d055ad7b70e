//! OpenStack identity and compute client.
//!
//! Implements [`ComputeApi`](crate::cluster::ComputeApi) on top of the
//! Keystone v3 token API and the Nova v2.1 servers API.

mod client;
mod models;

pub use client::ComputeClient;
pub use models::*;
