//! Test fixtures for Flywheel integration tests

pub mod common;
