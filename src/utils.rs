//! Internal helpers

pub(crate) mod str;
