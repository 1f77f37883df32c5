//! Small utility helpers.

pub mod hex;
