//! Data types for the TBG forums and chat.
//!
//! This crate contains the serde-serializable shapes that the scraper in
//! `tbg-rs` produces and consumes. They represent the "protocol layer" of a
//! forum that has no API: what a page, a post icon or a chat poll looks like
//! once it has been pulled out of the server's HTML or XML.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * Lossless: Values the forum sends that we do not know about are kept
//!   verbatim instead of being rejected
//! * Stable: Changes only when the forum markup changes
//!
//! Entities with behavior (users, topics, messages) are built on top of these
//! types in `tbg-rs`.

pub mod chat;
pub mod forum;

pub use chat::*;
pub use forum::*;
