//! bmorg: organize Netscape-format bookmark collections.
//!
//! The crate is layered: `domain` holds the arena-backed bookmark tree, the
//! document codec, mutation operations, the search index and the
//! classification engine; `application` orchestrates those behind a
//! workspace façade plus storage/classifier/preview services; `infrastructure`
//! provides the I/O boundary; `cli` is the command-line front end.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
