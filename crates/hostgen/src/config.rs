//! Generator configuration.
//!
//! Built-in defaults match the Silverfir runtime headers. An explicit TOML
//! file can override them; command-line flags are applied on top by the CLI.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};

/// Default external compiler program.
pub const DEFAULT_COMPILER: &str = "wat2wasm";

/// Default number of bytes per line in the embedded array.
pub const DEFAULT_BYTES_PER_LINE: usize = 16;

/// Settings for one generation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Program used to compile the interface text into a binary module.
    /// Either a bare name looked up on `PATH` or a path.
    pub compiler: String,
    /// Number of `0xNN` groups per line in the embedded byte array.
    #[serde(alias = "bytes-per-line")]
    pub bytes_per_line: usize,
    /// Includes emitted at the top of the declarations file.
    #[serde(alias = "header-includes")]
    pub header_includes: Vec<String>,
    /// Includes emitted at the top of the definitions file, before the
    /// generated header itself.
    #[serde(alias = "source-includes")]
    pub source_includes: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            compiler: DEFAULT_COMPILER.to_string(),
            bytes_per_line: DEFAULT_BYTES_PER_LINE,
            header_includes: ["host_modules.h", "types.h", "vm.h", "<stddef.h>"]
                .map(String::from)
                .to_vec(),
            source_includes: ["types.h", "trampoline.h", "module.h", "vm.h", "<stddef.h>"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl GeneratorConfig {
    /// Parse a configuration from a TOML string. Missing keys keep their defaults.
    pub fn parse(input: &str) -> Result<Self> {
        let config: GeneratorConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Check the invariants that parsing alone cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.compiler.trim().is_empty() {
            return Err(GenError::Config {
                detail: "compiler must not be empty".to_string(),
            });
        }
        if self.bytes_per_line == 0 {
            return Err(GenError::Config {
                detail: "bytes_per_line must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Render an include directive. Angle-bracketed entries are system includes.
pub(crate) fn include_line(entry: &str) -> String {
    if entry.starts_with('<') {
        format!("#include {entry}")
    } else {
        format!("#include \"{entry}\"")
    }
}
