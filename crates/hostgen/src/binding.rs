//! The `host_func_info` binding table.
//!
//! Every exported function gets a row `{name, trampoline, implementation}`,
//! even when several rows share one trampoline. Implementations are named
//! `<module>_<export>` and are declared for the surrounding project to write
//! by hand.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::{GenError, Result};
use crate::ident::normalize;
use crate::signature::{FunctionSignature, SignatureShape};
use crate::trampoline::{native_parameters, TrampolineSet};

/// Marks the start of the hand-written implementation declarations.
pub const MANUAL_BEGIN: &str = "// The following functions needs to be manually implemented";
/// Marks the end of the hand-written implementation declarations.
pub const MANUAL_END: &str = "// The above functions needs to be manually implemented";

/// Identifier of the native implementation of `export` in `module`.
pub fn implementation_name(module: &str, export: &str) -> String {
    normalize(&format!("{module}_{export}"))
}

/// One row of the binding table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingEntry {
    pub exported_name: String,
    pub trampoline_name: String,
    pub implementation_name: String,
    pub shape: SignatureShape,
}

/// Binding table of one module, in source order.
#[derive(Debug, Clone)]
pub struct BindingTable {
    module_name: String,
    entries: Vec<BindingEntry>,
}

impl BindingTable {
    /// Build one entry per signature, resolving each shape through
    /// `trampolines` (registering shapes it has not seen yet).
    pub fn build(
        module_name: &str,
        signatures: &[FunctionSignature],
        trampolines: &mut TrampolineSet,
    ) -> Result<Self> {
        let mut entries = Vec::with_capacity(signatures.len());
        let mut owners: HashMap<String, &str> = HashMap::new();

        for sig in signatures {
            let shape = sig.shape();
            let trampoline_name = trampolines.register(&shape)?.name.clone();
            let implementation_name = implementation_name(module_name, &sig.name);

            if let Some(previous) = owners.get(&implementation_name) {
                return Err(GenError::DuplicateGeneratedIdentifier {
                    ident: implementation_name,
                    first: format!("export \"{previous}\""),
                    second: format!("export \"{}\" (line {})", sig.name, sig.line),
                });
            }
            owners.insert(implementation_name.clone(), &sig.name);

            entries.push(BindingEntry {
                exported_name: sig.name.clone(),
                trampoline_name,
                implementation_name,
                shape,
            });
        }

        Ok(Self {
            module_name: module_name.to_string(),
            entries,
        })
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn entries(&self) -> &[BindingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Symbol of the table array.
    pub fn table_symbol(&self) -> String {
        format!("{}_host_info", self.module_name)
    }

    /// Symbol of the table length constant.
    pub fn len_symbol(&self) -> String {
        format!("{}_host_info_len", self.module_name)
    }

    /// Append the `extern` declarations of the table and its length.
    pub fn render_table_declarations(&self, out: &mut String) {
        let _ = writeln!(out, "\nextern const host_func_info {}[];", self.table_symbol());
        let _ = writeln!(out, "\nextern const size_t {};", self.len_symbol());
    }

    /// Append the implementation declarations, fenced by the manual markers.
    pub fn render_manual_declarations(&self, out: &mut String) {
        let _ = write!(out, "\n{MANUAL_BEGIN}");
        for entry in &self.entries {
            let _ = write!(
                out,
                "\nextern r {} ({});",
                entry.implementation_name,
                native_parameters(&entry.shape)
            );
        }
        let _ = writeln!(out, "\n{MANUAL_END}");
    }

    /// Append the table definition and its length constant.
    ///
    /// An empty table still defines one zeroed element, since C forbids
    /// empty initializers; its length constant is `0`.
    pub fn render_definition(&self, out: &mut String) {
        let table = self.table_symbol();
        if self.entries.is_empty() {
            let _ = writeln!(out, "\nconst host_func_info {table}[1] = {{{{0}}}};");
            let _ = writeln!(out, "\nconst size_t {} = 0;", self.len_symbol());
            return;
        }

        let _ = writeln!(out, "\nconst host_func_info {table}[] = {{");
        for entry in &self.entries {
            let _ = writeln!(
                out,
                "    {{\"{}\", {}, (void*){}}},",
                entry.exported_name, entry.trampoline_name, entry.implementation_name
            );
        }
        out.push_str("};\n");
        let _ = writeln!(
            out,
            "\nconst size_t {} = array_len({table});",
            self.len_symbol()
        );
    }
}
