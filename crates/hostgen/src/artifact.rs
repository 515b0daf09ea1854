//! Generation pass orchestration and atomic output writing.
//!
//! `generate` validates its inputs, compiles the interface file, builds a
//! [`GeneratedModule`] in memory and writes `<stem>_gen.h` / `<stem>_gen.c`.
//! Both files are staged as temporaries in the output directory and only
//! then moved into place, so a failed pass leaves neither behind. The
//! intermediate binary module is always removed.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::binding::BindingTable;
use crate::compiler::{ModuleCompiler, BINARY_EXTENSION};
use crate::config::GeneratorConfig;
use crate::emit::{render_header, render_source};
use crate::error::{GenError, Result};
use crate::ident::normalize;
use crate::report::{digest_hex, FunctionSummary, GenWarning, GenerationReport};
use crate::signature::{FunctionSignature, SignatureExtractor};
use crate::trampoline::TrampolineSet;

/// Everything generated for one interface file, before it is written.
#[derive(Debug, Clone)]
pub struct GeneratedModule {
    /// Interface file stem; names the output files.
    pub file_stem: String,
    /// Identifier prefix for the binding table and implementations.
    pub module_name: String,
    /// Identifier of the embedded byte array.
    pub bytes_symbol: String,
    pub embedded_bytes: Vec<u8>,
    pub signatures: Vec<FunctionSignature>,
    pub trampolines: TrampolineSet,
    pub bindings: BindingTable,
    pub warnings: Vec<GenWarning>,
}

impl GeneratedModule {
    /// Extract, deduplicate and tabulate the functions of `interface_text`,
    /// embedding `bytes` as the compiled module.
    pub fn build(file_stem: &str, bytes: Vec<u8>, interface_text: &str) -> Result<Self> {
        let module_name = normalize(file_stem);
        let bytes_symbol = normalize(&format!("{file_stem}.{BINARY_EXTENSION}"));

        let extraction = SignatureExtractor::new().extract(interface_text);
        let mut trampolines = TrampolineSet::from_signatures(&extraction.signatures)?;
        let bindings = BindingTable::build(&module_name, &extraction.signatures, &mut trampolines)?;

        let module = Self {
            file_stem: file_stem.to_string(),
            module_name,
            bytes_symbol,
            embedded_bytes: bytes,
            signatures: extraction.signatures,
            trampolines,
            bindings,
            warnings: extraction.warnings,
        };
        module.check_identifiers()?;
        Ok(module)
    }

    /// Length constant emitted next to the byte array.
    pub fn embedded_length(&self) -> usize {
        self.embedded_bytes.len()
    }

    pub fn header_file_name(&self) -> String {
        format!("{}_gen.h", self.file_stem)
    }

    pub fn source_file_name(&self) -> String {
        format!("{}_gen.c", self.file_stem)
    }

    /// Every file-scope identifier defined or declared by the pair must be
    /// unique, or one definition would silently shadow another.
    fn check_identifiers(&self) -> Result<()> {
        let mut seen: HashMap<String, String> = HashMap::new();
        let mut claim = |ident: String, owner: String| -> Result<()> {
            if let Some(first) = seen.get(&ident) {
                return Err(GenError::DuplicateGeneratedIdentifier {
                    ident,
                    first: first.clone(),
                    second: owner,
                });
            }
            seen.insert(ident, owner);
            Ok(())
        };

        claim(self.bytes_symbol.clone(), "embedded module bytes".into())?;
        claim(format!("{}_len", self.bytes_symbol), "embedded module length".into())?;
        claim(self.bindings.table_symbol(), "binding table".into())?;
        claim(self.bindings.len_symbol(), "binding table length".into())?;
        for trampoline in self.trampolines.iter() {
            claim(trampoline.name.clone(), format!("trampoline for {}", trampoline.shape))?;
            claim(trampoline.pointer_type(), format!("pointer type for {}", trampoline.shape))?;
        }
        for entry in self.bindings.entries() {
            claim(
                entry.implementation_name.clone(),
                format!("implementation of \"{}\"", entry.exported_name),
            )?;
        }
        Ok(())
    }

    /// Summarize this module for a caller, given the compiler that produced
    /// it and where it was written.
    pub fn report(&self, compiler: &str, paths: &OutputPaths) -> GenerationReport {
        GenerationReport {
            module_name: self.module_name.clone(),
            compiler: compiler.to_string(),
            header_path: paths.header.clone(),
            source_path: paths.source.clone(),
            module_size: self.embedded_length(),
            module_digest: digest_hex(&self.embedded_bytes),
            functions: self
                .bindings
                .entries()
                .iter()
                .map(|e| FunctionSummary {
                    name: e.exported_name.clone(),
                    trampoline: e.trampoline_name.clone(),
                    implementation: e.implementation_name.clone(),
                })
                .collect(),
            trampolines: self.trampolines.iter().map(|t| t.name.clone()).collect(),
            warnings: self.warnings.clone(),
        }
    }
}

/// Locations of the generated pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub header: PathBuf,
    pub source: PathBuf,
}

impl OutputPaths {
    pub fn new(out_dir: &Path, module: &GeneratedModule) -> Self {
        Self {
            header: out_dir.join(module.header_file_name()),
            source: out_dir.join(module.source_file_name()),
        }
    }
}

/// Removes the intermediate binary module when dropped.
struct Intermediate(PathBuf);

impl Drop for Intermediate {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.0.display(), error = %e, "could not remove intermediate binary");
            }
        }
    }
}

/// Run one generation pass.
pub fn generate(
    input: &Path,
    out_dir: &Path,
    config: &GeneratorConfig,
    compiler: &dyn ModuleCompiler,
) -> Result<GenerationReport> {
    config.validate()?;
    if !input.is_file() {
        return Err(GenError::InputNotFound {
            path: input.to_path_buf(),
        });
    }
    if !out_dir.is_dir() {
        return Err(GenError::OutputDirInvalid {
            path: out_dir.to_path_buf(),
        });
    }

    let interface_text = std::fs::read_to_string(input)?;

    tracing::debug!(compiler = compiler.name(), input = %input.display(), "compiling");
    let binary = Intermediate(compiler.compile(input, out_dir)?);
    let bytes = std::fs::read(&binary.0)?;
    drop(binary);

    let file_stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string());
    let module = GeneratedModule::build(&file_stem, bytes, &interface_text)?;
    for warning in &module.warnings {
        tracing::warn!(module = %module.module_name, "{warning}");
    }

    let paths = OutputPaths::new(out_dir, &module);
    let header = render_header(&module, config);
    let source = render_source(&module, config);
    write_pair(out_dir, [(&paths.header, header), (&paths.source, source)])?;

    tracing::info!(
        compiler = compiler.name(),
        header = %paths.header.display(),
        source = %paths.source.display(),
        functions = module.bindings.len(),
        trampolines = module.trampolines.len(),
        "wrote host module"
    );

    Ok(module.report(compiler.name(), &paths))
}

/// Write both files or neither.
///
/// If a later file cannot be moved into place, every file already written by
/// this call is put back the way it was: restored from a backup when it
/// existed before, removed otherwise.
fn write_pair(out_dir: &Path, files: [(&PathBuf, String); 2]) -> Result<()> {
    let mut staged = Vec::with_capacity(files.len());
    for (path, contents) in files {
        let mut tmp = NamedTempFile::new_in(out_dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        staged.push((path, tmp));
    }

    let mut persisted: Vec<(&PathBuf, Option<NamedTempFile>)> = Vec::with_capacity(staged.len());
    for (path, tmp) in staged {
        let backup = if path.is_file() {
            let backup = NamedTempFile::new_in(out_dir)?;
            std::fs::copy(path, backup.path())?;
            Some(backup)
        } else {
            None
        };

        if let Err(e) = tmp.persist(path) {
            for (done, backup) in persisted {
                let restored = match backup {
                    Some(backup) => backup.persist(done).map(|_| ()).map_err(|e| e.error),
                    None => std::fs::remove_file(done),
                };
                if let Err(re) = restored {
                    tracing::warn!(path = %done.display(), error = %re, "could not roll back generated file");
                }
            }
            return Err(GenError::Io(e.error));
        }
        persisted.push((path, backup));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writes fixed bytes instead of running a real compiler.
    struct FixedCompiler(Vec<u8>);

    impl ModuleCompiler for FixedCompiler {
        fn name(&self) -> &str {
            "fixed"
        }

        fn compile(&self, input: &Path, out_dir: &Path) -> Result<PathBuf> {
            let path = crate::compiler::binary_output_path(input, out_dir);
            std::fs::write(&path, &self.0)?;
            Ok(path)
        }
    }

    #[test]
    fn build_collects_everything() {
        let module = GeneratedModule::build(
            "spectest",
            vec![1, 2, 3],
            r#"(func (export "print_i32") (param i32))"#,
        )
        .unwrap();
        assert_eq!(module.module_name, "spectest");
        assert_eq!(module.bytes_symbol, "spectest_wasm");
        assert_eq!(module.embedded_length(), 3);
        assert_eq!(module.header_file_name(), "spectest_gen.h");
        assert_eq!(module.source_file_name(), "spectest_gen.c");
        assert_eq!(module.bindings.len(), 1);
        assert!(module.warnings.is_empty());
    }

    #[test]
    fn stem_is_normalized_for_identifiers() {
        let module = GeneratedModule::build("wasi-preview1", vec![0], r#"(func (export "fd_close") (param i32) (result i32))"#)
            .unwrap();
        assert_eq!(module.module_name, "wasi_preview1");
        assert_eq!(module.bytes_symbol, "wasi_preview1_wasm");
        assert_eq!(module.header_file_name(), "wasi-preview1_gen.h");
        assert_eq!(module.bindings.entries()[0].implementation_name, "wasi_preview1_fd_close");
    }

    #[test]
    fn export_colliding_with_byte_array_is_rejected() {
        let err = GeneratedModule::build("m", vec![0], r#"(func (export "wasm") (param i32))"#)
            .unwrap_err();
        match err {
            GenError::DuplicateGeneratedIdentifier { ident, .. } => assert_eq!(ident, "m_wasm"),
            other => panic!("expected DuplicateGeneratedIdentifier, got {other:?}"),
        }
    }

    #[test]
    fn generate_writes_pair_and_removes_binary() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("spectest.wat");
        std::fs::write(&input, r#"(func (export "print_i32") (param i32))"#).unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();

        let report = generate(
            &input,
            &out,
            &GeneratorConfig::default(),
            &FixedCompiler(b"\0asm\x01\0\0\0".to_vec()),
        )
        .unwrap();

        assert_eq!(report.compiler, "fixed");
        assert!(report.header_path.is_file());
        assert!(report.source_path.is_file());
        assert!(!out.join("spectest.wasm").exists());
        let mut names: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["spectest_gen.c", "spectest_gen.h"]);
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate(
            &dir.path().join("nope.wat"),
            dir.path(),
            &GeneratorConfig::default(),
            &FixedCompiler(vec![0]),
        )
        .unwrap_err();
        assert!(matches!(err, GenError::InputNotFound { .. }));
    }

    #[test]
    fn output_must_be_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("m.wat");
        std::fs::write(&input, "(module)").unwrap();
        let err = generate(&input, &input, &GeneratorConfig::default(), &FixedCompiler(vec![0]))
            .unwrap_err();
        assert!(matches!(err, GenError::OutputDirInvalid { .. }));
    }

    #[test]
    fn failed_build_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("m.wat");
        std::fs::write(
            &input,
            "(func (export \"dup\") (param i32))\n(func (export \"dup\") (param i32))\n",
        )
        .unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();

        let err = generate(&input, &out, &GeneratorConfig::default(), &FixedCompiler(vec![0]))
            .unwrap_err();
        assert!(matches!(err, GenError::DuplicateGeneratedIdentifier { .. }));
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn write_pair_writes_both() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.h");
        let b = dir.path().join("b.c");
        write_pair(dir.path(), [(&a, "A".to_string()), (&b, "B".to_string())]).unwrap();
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "A");
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "B");
    }

    #[test]
    fn write_pair_rolls_back_first_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.h");
        // a directory in the way makes the second rename fail
        let b = dir.path().join("b.c");
        std::fs::create_dir(&b).unwrap();
        std::fs::write(b.join("keep"), "x").unwrap();

        assert!(write_pair(dir.path(), [(&a, "A".to_string()), (&b, "B".to_string())]).is_err());
        assert!(!a.exists());
        assert!(b.is_dir());
    }

    #[test]
    fn write_pair_restores_previous_first_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.h");
        std::fs::write(&a, "previous header").unwrap();
        let b = dir.path().join("b.c");
        std::fs::create_dir(&b).unwrap();
        std::fs::write(b.join("keep"), "x").unwrap();

        assert!(write_pair(dir.path(), [(&a, "A".to_string()), (&b, "B".to_string())]).is_err());
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "previous header");

        let mut names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["a.h", "b.c"]);
    }

    #[test]
    fn write_pair_replaces_previous_pair() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.h");
        let b = dir.path().join("b.c");
        std::fs::write(&a, "old A").unwrap();
        std::fs::write(&b, "old B").unwrap();

        write_pair(dir.path(), [(&a, "A".to_string()), (&b, "B".to_string())]).unwrap();
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "A");
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "B");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
