//! Engine module loading

use anyhow::{Context, Result};
use std::path::Path;

use blockbridge_core::{WasmEngine, WasmSynthEngine};

use crate::config::EngineConfig;

/// Compile and instantiate the engine module at `path`
///
/// Accepts binary `.wasm` and text `.wat` files.
pub fn load_engine(path: &Path, config: &EngineConfig) -> Result<WasmSynthEngine> {
    let engine = WasmEngine::new()?;
    let module = engine.load_module_file(path)?;
    WasmEngine::validate_module_memory(&module, config.memory_limit_bytes)?;

    let instance = WasmSynthEngine::new(&engine, &module, config.memory_limit_bytes)
        .with_context(|| format!("Failed to load engine {}", path.display()))?;
    tracing::info!("Loaded engine {}", path.display());
    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockbridge_core::SynthesisEngine;

    const ENGINE_WAT: &str = r#"
        (module
            (memory (export "memory") 1)
            (func (export "block_size") (result i32) (i32.const 32))
            (func (export "output_channels") (result i32) (i32.const 1))
            (func (export "input_channels") (result i32) (i32.const 0))
            (func (export "reference_level") (result f64) (f64.const 32768.0))
            (func (export "output_buffer") (result i32) (i32.const 0))
            (func (export "input_buffer") (result i32) (i32.const 0))
            (func (export "compute_block") (result i32) (i32.const 0))
        )
    "#;

    #[test]
    fn test_load_wat_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.wat");
        std::fs::write(&path, ENGINE_WAT).unwrap();

        let engine = load_engine(&path, &EngineConfig::default()).unwrap();
        assert_eq!(engine.block_size(), 32);
        assert_eq!(engine.reference_level(), 32768.0);
    }

    #[test]
    fn test_load_binary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.wasm");
        std::fs::write(&path, wat::parse_str(ENGINE_WAT).unwrap()).unwrap();

        let engine = load_engine(&path, &EngineConfig::default()).unwrap();
        assert_eq!(engine.output_channels(), 1);
    }

    #[test]
    fn test_memory_limit_below_module_minimum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.wat");
        let two_pages = ENGINE_WAT.replace(
            r#"(memory (export "memory") 1)"#,
            r#"(memory (export "memory") 2)"#,
        );
        std::fs::write(&path, two_pages).unwrap();

        let config = EngineConfig {
            memory_limit_bytes: 65536,
        };
        assert!(load_engine(&path, &config).is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_engine(&dir.path().join("nope.wasm"), &EngineConfig::default()).is_err());
    }
}
