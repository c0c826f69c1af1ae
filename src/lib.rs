//! # AUTOSCAN
//!
//! Lazy resolution of declared type names to the source files that declare them.
//!
//! An [`Autoloader`](core::Autoloader) watches an ordered list of directories. The
//! first time an unknown name is requested it scans those directories, extracts
//! `class`/`interface`/`trait`/`enum` declarations from every source file, and
//! persists the resulting index on disk keyed by the directory list. Later runs
//! start from that cache and only re-read files whose modification time moved.
//!
//! ## Layout
//!
//! - **core**: scanning, freshness tracking, the disk cache and the resolver
//! - **parsers**: tokenizer and declaration extraction

pub mod core;
pub mod parsers;
