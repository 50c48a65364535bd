#![doc = "databook-credits-core: core logic library for databook-credits."]

//! This crate contains the contributor attribution pipeline: reading commit
//! history, resolving aliases and blacklists, reading the contributor roster,
//! merging everything into an ordered list and publishing it into
//! documentation.
//!
//! # Usage
//! The CLI crate drives [`pipeline::attribute`], [`pipeline::insert_authors`]
//! and [`directive::expand_directives`] with a [`history::GitHistory`] and a
//! [`roster::CsvRoster`]. Tests substitute the mocks generated for the traits
//! in [`contract`].

pub mod config;
pub mod contract;
pub mod directive;
pub mod error;
pub mod history;
pub mod merge;
pub mod patch;
pub mod pipeline;
pub mod resolve;
pub mod roster;

pub use error::{CreditsError, Result};
