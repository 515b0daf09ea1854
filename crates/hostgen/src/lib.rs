//! Host module glue generation for the Silverfir runtime.
//!
//! Turns a WebAssembly text interface file into a C declarations/definitions
//! pair: the compiled module embedded as a byte array, one trampoline per
//! distinct signature shape, and a `host_func_info` binding table.
//!
//! ## Modules
//!
//! - [`ident`]: Identifier normalization for generated names
//! - [`compiler`]: External `wat2wasm` invocation
//! - [`signature`]: Single-line exported function extraction
//! - [`trampoline`]: Shape-deduplicated marshaling adapters
//! - [`binding`]: Binding table and hand-written implementation declarations
//! - [`emit`]: C text for the generated pair
//! - [`artifact`]: Pass orchestration and atomic output
//! - [`config`]: Generator configuration
//! - [`report`]: Generation report and warnings

pub mod artifact;
pub mod binding;
pub mod compiler;
pub mod config;
pub mod emit;
pub mod error;
pub mod ident;
pub mod report;
pub mod signature;
pub mod trampoline;

// Re-export key types for convenience
pub use artifact::{generate, GeneratedModule, OutputPaths};
pub use binding::{BindingEntry, BindingTable};
pub use compiler::{ModuleCompiler, Wat2Wasm};
pub use config::GeneratorConfig;
pub use error::{GenError, Result};
pub use ident::normalize;
pub use report::{GenWarning, GenerationReport};
pub use signature::{extract_signatures, FunctionSignature, SignatureShape, TypeTag};
pub use trampoline::{Trampoline, TrampolineSet};
