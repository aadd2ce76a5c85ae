//! Shared utilities for reading WordprocessingML parts.

pub mod encoding;
pub mod xml;
