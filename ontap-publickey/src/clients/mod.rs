//! Clients for the ONTAP management interface.
//!
//! - rest: request transport (`Transport` trait and the reqwest-backed `RestClient`)

pub mod rest;

pub use rest::{Method, Query, RestClient, RestResponse, Transport};
