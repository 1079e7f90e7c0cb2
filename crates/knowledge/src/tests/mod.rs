//! Cross-module tests and the in-crate fakes they share.
