//! Generator error types.

use std::path::PathBuf;

/// Errors that abort a generation pass.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    /// The interface file does not exist or is not a regular file.
    #[error("cannot read interface file {}", path.display())]
    InputNotFound { path: PathBuf },

    /// The output path is missing or is not a directory.
    #[error("target dir {} does not exist", path.display())]
    OutputDirInvalid { path: PathBuf },

    /// The external module compiler could not be located.
    #[error("{tool} not found. Please make sure it's in the PATH")]
    ToolNotFound { tool: String },

    /// The external module compiler rejected the input.
    #[error("{tool} failed on {} ({status}){}", input.display(), stderr_suffix(stderr))]
    CompileFailed {
        tool: String,
        input: PathBuf,
        status: String,
        stderr: String,
    },

    /// Two different sources normalized to the same generated identifier.
    #[error("generated identifier '{ident}' is produced by both {first} and {second}")]
    DuplicateGeneratedIdentifier {
        ident: String,
        first: String,
        second: String,
    },

    /// Invalid generator configuration.
    #[error("invalid configuration: {detail}")]
    Config { detail: String },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Result type alias for generator operations.
pub type Result<T> = std::result::Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_failed_includes_stderr() {
        let err = GenError::CompileFailed {
            tool: "wat2wasm".into(),
            input: PathBuf::from("spectest.wat"),
            status: "exit status: 1".into(),
            stderr: "spectest.wat:3:5: error: unexpected token\n".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("wat2wasm failed on spectest.wat"));
        assert!(msg.ends_with("unexpected token"));
    }

    #[test]
    fn compile_failed_without_stderr() {
        let err = GenError::CompileFailed {
            tool: "wat2wasm".into(),
            input: PathBuf::from("a.wat"),
            status: "exit status: 2".into(),
            stderr: "  \n".into(),
        };
        assert_eq!(err.to_string(), "wat2wasm failed on a.wat (exit status: 2)");
    }
}
