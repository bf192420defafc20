//! Integration tests for modal routing over an in-memory session history

mod chain_activation;
mod global_modals;
mod open_close;
mod query_modals;
mod test_utils;
