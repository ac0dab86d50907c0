#[macro_use]
extern crate slog;

extern crate nalgebra as na;

pub mod colorimetry;
pub mod common;
pub mod cube;
pub mod render;
