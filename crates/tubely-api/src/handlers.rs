//! Request handlers.

pub mod health;
pub mod thumbnails;
pub mod videos;

pub use health::*;
pub use thumbnails::*;
pub use videos::*;
