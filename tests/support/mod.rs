//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod parts;
pub mod socket_guard;
