//! Property-based tests for history tags and query modal bases

mod query_base;
mod tag_store;
