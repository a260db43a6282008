//! Access to the hosted data store.
//!
//! Everything above this module talks to a [`RemoteDataClient`]; the REST
//! adapter and the in-memory store are interchangeable behind it.

mod api_types;
mod client;
mod error;
mod memory;
mod rest;
mod types;

pub use client::RemoteDataClient;
pub use error::{RemoteError, RemoteResult};
pub use memory::MemoryClient;
pub use rest::RestClient;
pub use types::{Filter, Order, Row, SessionUser};
