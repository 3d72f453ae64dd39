//! Voice Glide - a voice-driven motion engine
//!
//! Core modules:
//! - `audio`: Block-wise loudness and autocorrelation pitch extraction
//! - `sim`: Motion, entity field, collisions and the session state machine
//! - `settings`: Data-driven configuration and gameplay variant presets
//! - `error`: Startup and configuration errors

pub mod audio;
pub mod error;
pub mod settings;
pub mod sim;

pub use audio::{AudioBlock, FeatureExtractor, FeatureSample, InputStatus};
pub use error::{EngineError, EngineResult};
pub use settings::{EngineConfig, Variant};
pub use sim::{EngineContext, SessionPhase};

/// Host timing constants
pub mod consts {
    /// Frame period of a 60 Hz display
    pub const FRAME_MS: f64 = 1000.0 / 60.0;
    /// Longest clock step fed to the engine after a stall (tab hidden etc.)
    pub const MAX_FRAME_STEP_MS: f64 = 250.0;
    /// Typical capture sample rate
    pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
    /// Analyser block length used by the browser front-end
    pub const DEFAULT_BLOCK_LEN: usize = 1024;
}
