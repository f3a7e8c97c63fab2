//! Unit tests for the fragmentation primitives.
//!
//! Tests are split into focused submodules to keep each file short and easy
//! to navigate.

mod fragmenter_tests;
