//! Built-in mappers, one module per external system.

pub mod qtest;
pub(crate) mod support;
pub mod zephyr;
