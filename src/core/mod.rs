//! Core types shared by every component.
//!
//! - [`error`]: the [`PicamError`] taxonomy and user-facing error rendering

pub mod error;

pub use error::{ErrorContext, PicamError, SwapStep, user_friendly_error};
