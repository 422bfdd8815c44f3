#![deny(unsafe_code)]
//! Core synthesis for the backdrop procedural background generator.
//!
//! Provides `ScalarGrid`/`ColorImage` value types, uniform noise and box
//! smoothing, multi-octave turbulence, metaball masks, mask-weighted blending
//! and the layered `random_background` pipeline. All randomness flows through
//! the injectable `RandomSource` trait; `Xorshift64` is the seeded default.

pub mod compose;
pub mod error;
pub mod grid;
pub mod image;
pub mod metaball;
pub mod noise;
pub mod params;
pub mod prng;
pub mod recipe;
pub mod turbulence;

pub use compose::{blend, random_background, random_background_with, BackgroundParams};
pub use error::SynthError;
pub use grid::ScalarGrid;
pub use image::{ColorImage, Mask};
pub use metaball::{random_metaball, Combine, Falloff, InfluenceSource};
pub use noise::{generate_noise, smooth};
pub use prng::{RandomSource, Xorshift64};
pub use recipe::Recipe;
pub use turbulence::{turbulence, turbulence_rgb, TurbulenceParams};
