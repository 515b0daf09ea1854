//! Exported function signature extraction from interface text.
//!
//! This is not a WAT parser. Each line is matched on its own against three
//! patterns, so a declaration must keep its `export`, `param` and `result`
//! clauses on one line:
//!
//! ```text
//! (func (export "print_i32_f32") (param i32 f32))
//! (func (export "add") (param i32 i32) (result i32))
//! ```
//!
//! Clauses on the lines following a declaration are not seen; such a
//! function is extracted with `void` parameters and result.

use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::report::GenWarning;

/// Marker used for an absent parameter or result list.
pub const VOID: &str = "void";

/// A value type token as written in the interface file (`i32`, `f64`, ...).
///
/// Tags are not validated; they are emitted verbatim as C type names and as
/// `value_u` member suffixes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeTag(String);

impl TypeTag {
    /// Wrap a single token.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The `void` marker.
    pub fn void() -> Self {
        Self(VOID.to_string())
    }

    /// Whether this is the `void` marker.
    pub fn is_void(&self) -> bool {
        self.0 == VOID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An exported function found in the interface file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSignature {
    /// Exported symbol name.
    pub name: String,
    /// Parameter types in declaration order; `[void]` when absent.
    pub params: Vec<TypeTag>,
    /// Result types; `[void]` when absent, never more than one entry.
    pub results: Vec<TypeTag>,
    /// 1-based line of the declaration.
    pub line: usize,
}

impl FunctionSignature {
    /// The deduplication key of this signature.
    pub fn shape(&self) -> SignatureShape {
        SignatureShape {
            params: self.params.clone(),
            results: self.results.clone(),
        }
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" {}", self.name, self.shape())
    }
}

/// The `(params, results)` pair that decides which trampoline a function uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SignatureShape {
    pub params: Vec<TypeTag>,
    pub results: Vec<TypeTag>,
}

impl SignatureShape {
    /// Build a shape from token slices; empty slices become `[void]`.
    pub fn new(params: &[&str], results: &[&str]) -> Self {
        Self {
            params: tags_or_void(params.iter().copied()),
            results: tags_or_void(results.iter().copied()),
        }
    }

    /// Declared parameters, without the `void` marker.
    pub fn param_types(&self) -> impl Iterator<Item = &TypeTag> {
        self.params.iter().filter(|t| !t.is_void())
    }

    /// The single result type, if any.
    pub fn result_type(&self) -> Option<&TypeTag> {
        self.results.first().filter(|t| !t.is_void())
    }
}

impl fmt::Display for SignatureShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |tags: &[TypeTag]| {
            tags.iter()
                .map(TypeTag::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        };
        write!(f, "({}) -> ({})", join(&self.params), join(&self.results))
    }
}

fn tags_or_void<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<TypeTag> {
    let tags: Vec<TypeTag> = tokens.map(TypeTag::new).collect();
    if tags.is_empty() {
        vec![TypeTag::void()]
    } else {
        tags
    }
}

/// Signatures found in one interface file plus any non-fatal findings.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub signatures: Vec<FunctionSignature>,
    pub warnings: Vec<GenWarning>,
}

/// Line-oriented signature extractor.
#[derive(Debug, Clone)]
pub struct SignatureExtractor {
    func: Regex,
    param: Regex,
    result: Regex,
}

impl Default for SignatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureExtractor {
    pub fn new() -> Self {
        Self {
            func: Regex::new(r#"^.*func.*export\s*"([a-zA-Z0-9_]*)"\)"#).expect("valid pattern"),
            param: Regex::new(r"\(param\s*(.+?)\)").expect("valid pattern"),
            result: Regex::new(r"\(result\s*(.+?)\)").expect("valid pattern"),
        }
    }

    /// Match a single line. Returns `None` for lines without an exported
    /// function declaration. The second element lists result tokens that were
    /// dropped because only one result is supported.
    pub fn extract_line(&self, line: &str, line_no: usize) -> Option<(FunctionSignature, Vec<String>)> {
        let name = self.func.captures(line)?.get(1)?.as_str().to_string();

        let params = match self.param.captures(line).and_then(|c| c.get(1)) {
            Some(m) => tags_or_void(m.as_str().split_whitespace()),
            None => vec![TypeTag::void()],
        };

        let mut dropped = Vec::new();
        let results = match self.result.captures(line).and_then(|c| c.get(1)) {
            Some(m) => {
                let mut tokens = m.as_str().split_whitespace();
                let first = tokens.next();
                dropped.extend(tokens.map(str::to_string));
                tags_or_void(first.into_iter())
            }
            None => vec![TypeTag::void()],
        };

        Some((
            FunctionSignature {
                name,
                params,
                results,
                line: line_no,
            },
            dropped,
        ))
    }

    /// Extract every single-line exported function declaration, in source order.
    pub fn extract(&self, text: &str) -> Extraction {
        let mut extraction = Extraction::default();

        for (idx, line) in text.lines().enumerate() {
            let Some((sig, dropped)) = self.extract_line(line, idx + 1) else {
                continue;
            };
            tracing::debug!(line = sig.line, signature = %sig, "extracted signature");
            if !dropped.is_empty() {
                extraction.warnings.push(GenWarning::ResultTruncated {
                    function: sig.name.clone(),
                    dropped,
                });
            }
            extraction.signatures.push(sig);
        }

        if extraction.signatures.is_empty() {
            extraction.warnings.push(GenWarning::NoSignaturesFound);
        }

        extraction
    }
}

/// Extract signatures with the default extractor.
pub fn extract_signatures(text: &str) -> Extraction {
    SignatureExtractor::new().extract(text)
}
