//! Async query cache for server data.
//!
//! Inspired by TanStack Query: a process-wide [`QueryClient`] keyed by
//! [`QueryKey`], [`Query<T>`] observers polled from the event loop, and
//! [`Mutation<T>`] writes that invalidate keys once the backend confirmed them.

mod client;
mod key;
mod mutation;
mod observer;
mod state;

pub use client::{EntryStats, QueryClient};
pub use key::QueryKey;
pub use mutation::Mutation;
pub use observer::Query;
pub use state::QueryState;
