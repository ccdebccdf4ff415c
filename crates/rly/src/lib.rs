//! Chat Relay Backend Library
//!
//! This library provides the core components for the streaming chat relay:
//! session persistence, token accounting, and the Anthropic SSE relay.

pub mod anthropic;
pub mod api;
pub mod auth;
pub mod chat;
pub mod db;
pub mod prompts;
pub mod relay;
pub mod user;
