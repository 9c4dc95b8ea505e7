//! Parley — client side of a real-time two-party messaging service.
//!
//! The crate keeps one live WebSocket to the message-delivery service,
//! caches each conversation's history in memory, pages older history in on
//! demand and signals typing and presence. [`client::ChatClient`] wires it
//! together; [`presenter::Presenter`] holds all of the behavior and is usable
//! on its own.

pub mod api;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod model;
pub mod notify;
pub mod pagination;
pub mod presenter;
pub mod roster;
pub mod session;
pub mod store;
pub mod typing;
