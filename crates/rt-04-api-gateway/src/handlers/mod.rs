//! Route handlers.

pub mod feed;
pub mod history;
pub mod ops;
