//! Data models for the showcase content API.
//!
//! - `introduce`: introduce cards, their status and create/update payloads
//! - `image`: stored images and uploads

pub mod image;
pub mod introduce;

pub use image::{Image, ImageUpload};
pub use introduce::{Introduce, IntroduceUpdate, NewIntroduce, Status};
