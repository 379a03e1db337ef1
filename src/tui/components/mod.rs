//! Reusable TUI components

pub mod toast;

pub use toast::Toast;
