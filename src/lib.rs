//! Mark impact locations on a vehicle photo and export the annotated image.

pub mod app;
pub mod config;
pub mod error;
pub mod input;
pub mod jobs;
pub mod overlay;
pub mod render;
pub mod session;
