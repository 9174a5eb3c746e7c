//! Coriplus Core Library
//!
//! Core functionality for Coriplus, a small social network with
//! privacy-aware feeds. This crate provides the social graph, message
//! storage and the visibility-filtered, paginated feeds built on top of them.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

pub mod feed;
pub mod social;
