//! State module for link admission outcomes
//!
//! Every candidate handed to the link manager resolves to exactly one
//! `LinkState`.

mod link_state;

pub use link_state::LinkState;
