//! Agent module for Sahayi
//!
//! This module contains the agent runtime: conversation management and the
//! tool-calling execution loop.

pub mod conversation;
pub mod core;

pub use conversation::Conversation;
pub use core::Agent;
