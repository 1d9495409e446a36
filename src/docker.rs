#![allow(clippy::module_name_repetitions)]
//! Docker-compatible runtime CLI plumbing: discovery, images and argv construction.

pub(crate) mod env;
pub mod images;
pub mod run;
pub mod runtime;
