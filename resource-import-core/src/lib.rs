#![doc = "resource-import-core: core logic library for resource-import."]

//! This crate contains the traversal and dispatch logic that turns a directory
//! tree of Turtle, SPARQL update and binary files into repository requests.
//! HTTP transport lives in the `resource-import` crate behind the
//! [`contract::RepositoryLoader`] trait.
//!
//! # Usage
//! Build an [`config::ImportConfig`], pick a loader and call [`import::run_import`].

pub mod config;
pub mod contract;
pub mod error;
pub mod finder;
pub mod formats;
pub mod import;
pub mod mode;
pub mod payload;
pub mod walk;
