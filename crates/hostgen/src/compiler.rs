//! Binary module compilation through an external tool.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{GenError, Result};

/// Extension of the compiled binary module.
pub const BINARY_EXTENSION: &str = "wasm";

/// Turns an interface text file into a binary module file.
pub trait ModuleCompiler {
    /// Display name used in diagnostics.
    fn name(&self) -> &str;

    /// Compile `input` into a file inside `out_dir` and return its path.
    fn compile(&self, input: &Path, out_dir: &Path) -> Result<PathBuf>;
}

/// Path of the binary module produced for `input` inside `out_dir`.
///
/// `binary_output_path("host/spectest.wat", "out") == "out/spectest.wasm"`.
pub fn binary_output_path(input: &Path, out_dir: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_else(|| OsStr::new("module"));
    let mut file = PathBuf::from(stem);
    file.set_extension(BINARY_EXTENSION);
    out_dir.join(file)
}

/// Locate an executable. Names containing a path separator are taken as
/// paths; bare names are searched on `PATH`. Files without an execute
/// permission are skipped.
pub fn locate_program(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH").unwrap_or_default();
    locate_in(program, &paths)
}

/// [`locate_program`] against an explicit search path.
pub fn locate_in(program: &str, search_path: &OsStr) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    std::env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .find_map(|dir| {
            let full = dir.join(program);
            if is_executable(&full) {
                return Some(full);
            }
            if cfg!(windows) {
                let exe = full.with_extension("exe");
                if is_executable(&exe) {
                    return Some(exe);
                }
            }
            None
        })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// The WABT `wat2wasm` compiler, invoked as `<program> <input> -o <output>`.
#[derive(Debug, Clone)]
pub struct Wat2Wasm {
    program: String,
}

impl Wat2Wasm {
    /// Use the given program name or path.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The configured program name or path.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// First line of `<program> --version`, if the tool can be run.
    pub fn version(&self) -> Result<String> {
        let exe = self.locate()?;
        let output = Command::new(&exe).arg("--version").output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .next()
            .unwrap_or("(unknown version)")
            .trim()
            .to_string())
    }

    fn locate(&self) -> Result<PathBuf> {
        locate_program(&self.program).ok_or_else(|| GenError::ToolNotFound {
            tool: self.program.clone(),
        })
    }
}

impl Default for Wat2Wasm {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_COMPILER)
    }
}

impl ModuleCompiler for Wat2Wasm {
    fn name(&self) -> &str {
        &self.program
    }

    fn compile(&self, input: &Path, out_dir: &Path) -> Result<PathBuf> {
        let exe = self.locate()?;
        let output_path = binary_output_path(input, out_dir);

        tracing::debug!(
            compiler = %exe.display(),
            input = %input.display(),
            output = %output_path.display(),
            "compiling interface file"
        );

        let output = Command::new(&exe)
            .arg(input)
            .arg("-o")
            .arg(&output_path)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => GenError::ToolNotFound {
                    tool: self.program.clone(),
                },
                _ => GenError::Io(e),
            })?;

        if !output.status.success() {
            if output_path.exists() {
                let _ = std::fs::remove_file(&output_path);
            }
            return Err(GenError::CompileFailed {
                tool: self.program.clone(),
                input: input.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(output_path)
    }
}
