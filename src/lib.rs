//! nanphoto - a thin web backend over the Gemini generative-AI API
//!
//! Builds mode-specific prompts for chat, image generation, image editing and
//! thermal-print stylization, normalizes the model's answers, and keeps recent
//! images in a bounded gallery.

pub mod ai;
pub mod app;
pub mod auth;
pub mod builder;
pub mod cdn;
pub mod error;
pub mod gallery;
pub mod models;
pub mod normalizer;
pub mod prompts;
pub mod request;
pub mod server;

pub use error::{Error, Result};
