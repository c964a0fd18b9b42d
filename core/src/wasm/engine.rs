//! WASM engine wrapper for loading and compiling modules

use anyhow::{Context, Result};
use wasmtime::{Engine, ExternType, Module};

/// WASM pages are 64KB
pub const WASM_PAGE_SIZE: usize = 65536;

/// Linear memory cap used when the caller doesn't pick one (64MB)
pub const DEFAULT_MEMORY_LIMIT: usize = 64 * 1024 * 1024;

/// Shared WASM engine (one per application)
pub struct WasmEngine {
    engine: Engine,
}

impl WasmEngine {
    /// Create a new WASM engine with default configuration
    pub fn new() -> Result<Self> {
        let engine = Engine::default();
        Ok(Self { engine })
    }

    /// Get a reference to the underlying wasmtime engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Load a WASM module from bytes
    pub fn load_module(&self, bytes: &[u8]) -> Result<Module> {
        Module::new(&self.engine, bytes).context("Failed to compile WASM module")
    }

    /// Load a WASM module from a `.wasm` or `.wat` file
    pub fn load_module_file(&self, path: &std::path::Path) -> Result<Module> {
        Module::from_file(&self.engine, path)
            .with_context(|| format!("Failed to compile WASM module {}", path.display()))
    }

    /// Validate that a module's declared memory fits `memory_limit`
    ///
    /// Call this before instantiating so an oversized engine fails with a
    /// clear message instead of an instantiation error.
    pub fn validate_module_memory(module: &Module, memory_limit: usize) -> Result<()> {
        for export in module.exports() {
            if let ExternType::Memory(mem_type) = export.ty() {
                let min_pages = mem_type.minimum();
                let min_bytes = min_pages as usize * WASM_PAGE_SIZE;

                if min_bytes > memory_limit {
                    anyhow::bail!(
                        "Module memory '{}' requires {} bytes ({} pages) minimum, \
                         but the engine memory limit is {} bytes",
                        export.name(),
                        min_bytes,
                        min_pages,
                        memory_limit
                    );
                }

                if mem_type.maximum().is_none() {
                    tracing::debug!(
                        "Module memory '{}' has no maximum declared; \
                         host will limit to {} bytes",
                        export.name(),
                        memory_limit
                    );
                }
            }
        }
        Ok(())
    }
}
