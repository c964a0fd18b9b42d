//! Blockbridge Player - runs WASM synthesis engines on real audio devices
//!
//! - [`config`] - `config.toml` loading and defaults
//! - [`loader`] - Compile and instantiate engine modules
//! - [`endpoint`] - cpal output (and optional input) streams driving a bridge
//! - [`render`] - Offline rendering to WAV

pub mod config;
pub mod endpoint;
pub mod loader;
pub mod render;

pub use config::{AudioConfig, EngineConfig, PlayerConfig};
pub use endpoint::AudioEndpoint;
pub use loader::load_engine;
pub use render::render_to_wav;
