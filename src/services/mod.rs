//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic over the board store so route handlers
//! can stay focused on protocol translation.

pub mod board;
