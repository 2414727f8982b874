//! Core library for the LED dot-matrix display service.
//!
//! The crate drives small addressable 16x16 LED panels: a registry hands
//! out per-device workers, a command interpreter turns free-form control
//! strings into typed actions, and a shared spectrum analyzer feeds the
//! audio-reactive wave effect. Each module owns one subsystem (frame
//! packing, sink protocol, command grammar, effects, spectrum, device,
//! registry) and the registry ties them together.

pub mod command;
pub mod config;
pub mod device;
pub mod effects;
pub mod error;
pub mod frame;
pub mod service;
pub mod sink;
pub mod spectrum;

pub use command::{Action, DeviceSettings};
pub use config::{ServiceConfig, SpectrumConfig, WorkerConfig};
pub use device::Device;
pub use error::{LedMatrixError, Result};
pub use frame::{FrameBuffer, BIT_ORDER, PANEL_HEIGHT, PANEL_WIDTH};
pub use service::{LedService, SinkFactory};
pub use sink::{FileSink, MemorySink, PatternSink, SinkLog};
pub use spectrum::{bar_heights, SpectrumAnalyzer, WAVE_BINS};
