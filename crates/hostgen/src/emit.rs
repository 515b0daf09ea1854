//! C text for the generated declarations/definitions pair.

use std::fmt::Write as _;

use crate::artifact::GeneratedModule;
use crate::config::{include_line, GeneratorConfig};

/// Format `bytes` as comma-separated `0xNN` groups, `per_line` groups per
/// line, without a trailing comma. `per_line` of zero is treated as one.
pub fn hex_array(bytes: &[u8], per_line: usize) -> String {
    bytes
        .chunks(per_line.max(1))
        .map(|line| {
            line.iter()
                .map(|b| format!("0x{b:02x}"))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join(",\n")
}

fn banner(module: &GeneratedModule) -> String {
    format!("// Generated from {}.wat do not modify!\n", module.file_stem)
}

/// Render the declarations file (`<stem>_gen.h`).
pub fn render_header(module: &GeneratedModule, config: &GeneratorConfig) -> String {
    let mut out = banner(module);
    out.push_str("\n#pragma once\n");
    for include in &config.header_includes {
        let _ = write!(out, "\n{}", include_line(include));
    }
    out.push('\n');

    let bytes = &module.bytes_symbol;
    let _ = writeln!(out, "\nextern const u8 {bytes}[];");
    let _ = writeln!(out, "\nextern const size_t {bytes}_len;");
    module.bindings.render_table_declarations(&mut out);
    module.bindings.render_manual_declarations(&mut out);
    out
}

/// Render the definitions file (`<stem>_gen.c`).
pub fn render_source(module: &GeneratedModule, config: &GeneratorConfig) -> String {
    let mut out = banner(module);
    for include in &config.source_includes {
        let _ = write!(out, "\n{}", include_line(include));
    }
    let _ = writeln!(out, "\n{}", include_line(&module.header_file_name()));

    let bytes = &module.bytes_symbol;
    let _ = writeln!(out, "\nconst size_t {bytes}_len = {};", module.embedded_length());
    if module.embedded_bytes.is_empty() {
        // C forbids empty initializers; the length constant stays 0
        let _ = writeln!(out, "\nconst u8 {bytes}[1] = {{0}};\n");
    } else {
        let _ = writeln!(out, "\nconst u8 {bytes}[] = {{");
        out.push_str(&hex_array(&module.embedded_bytes, config.bytes_per_line));
        out.push_str("\n};\n\n");
    }

    module.trampolines.render(&mut out);
    module.bindings.render_definition(&mut out);
    out
}
