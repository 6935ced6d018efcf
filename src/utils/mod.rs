//! # Utility Modules
//!
//! Supporting utilities shared by the framing and codec layers.
//!
//! ## Components
//! - **Logging**: Structured logging configuration

pub mod logging;
