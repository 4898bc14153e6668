//! Agenda: a contact directory service.
//!
//! Contacts carry a phone number validated against a remote service (which
//! also yields their country and timezone) and a list of friends forming a
//! directed graph. Clients run named operations and choose which `Contact`
//! fields to resolve, including the computed local `time` and nested
//! `friends`.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;

pub mod phone;
pub mod store;

pub mod engine;
pub mod query;
pub mod schema;

pub mod server;
