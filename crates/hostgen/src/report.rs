//! Generation report and non-fatal findings.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// A finding that does not stop generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenWarning {
    /// The interface file declares no single-line exported functions; the
    /// binding table is empty.
    NoSignaturesFound,
    /// A result list had more than one type; only the first is kept.
    ResultTruncated { function: String, dropped: Vec<String> },
}

impl fmt::Display for GenWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSignaturesFound => {
                write!(f, "no exported function declarations found; binding table is empty")
            }
            Self::ResultTruncated { function, dropped } => write!(
                f,
                "function '{function}' declares multiple results; dropped: {}",
                dropped.join(" ")
            ),
        }
    }
}

/// One row of the binding table as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSummary {
    pub name: String,
    pub trampoline: String,
    pub implementation: String,
}

/// Summary of a successful generation pass.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    /// Identifier prefix shared by every generated symbol.
    pub module_name: String,
    /// Compiler that produced the embedded binary module.
    pub compiler: String,
    /// Written declarations file.
    pub header_path: PathBuf,
    /// Written definitions file.
    pub source_path: PathBuf,
    /// Size of the embedded binary module in bytes.
    pub module_size: usize,
    /// SHA-256 of the embedded binary module, lowercase hex.
    pub module_digest: String,
    /// Binding table rows in source order.
    pub functions: Vec<FunctionSummary>,
    /// Generated trampoline names in emission order.
    pub trampolines: Vec<String>,
    /// Non-fatal findings.
    pub warnings: Vec<GenWarning>,
}

/// SHA-256 of `bytes` as a lowercase hex string.
pub fn digest_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Host Module: {} ===", self.module_name)?;
        writeln!(f, "Compiler: {}", self.compiler)?;
        writeln!(f, "Header: {}", self.header_path.display())?;
        writeln!(f, "Source: {}", self.source_path.display())?;
        writeln!(f, "Binary: {} bytes (sha256 {})", self.module_size, self.module_digest)?;
        writeln!(f)?;

        writeln!(
            f,
            "--- Bindings ({} functions, {} trampolines) ---",
            self.functions.len(),
            self.trampolines.len()
        )?;
        for func in &self.functions {
            writeln!(f, "  {} -> {} via {}", func.name, func.implementation, func.trampoline)?;
        }

        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "--- Warnings ---")?;
            for warning in &self.warnings {
                writeln!(f, "  {warning}")?;
            }
        }

        Ok(())
    }
}
