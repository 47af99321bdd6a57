//! Audio-reactive visualizer videos: a dot-matrix or mirrored-bar animation driven by the
//! amplitude of an audio file, muxed with that audio into an MP4.

pub mod audio;
pub mod cancel;
pub mod config;
pub mod encode;
pub mod error;
pub mod pipeline;
pub mod render;

pub use audio::decode::{decode_audio, duration_seconds, AudioBuffer};
pub use audio::timeline::AmplitudeTimeline;
pub use cancel::CancelToken;
pub use config::{Quality, Rgb, Style, VisualizationConfig, VisualizationOptions};
pub use error::{RenderError, RenderResult};
pub use pipeline::{render, RenderOutcome, Renderer};
