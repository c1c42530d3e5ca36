//! Crate-level behaviour tests.

mod support;
mod workspace;
