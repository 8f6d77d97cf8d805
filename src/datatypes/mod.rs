// Wed Jan 15 2026 - Alex

pub mod cframe;
pub mod matrix;
pub mod vector;

pub use cframe::CFrame;
pub use matrix::Matrix4;
pub use vector::{Vector2, Vector3};
