//! Marshaling adapters ("trampolines") between the host dispatch convention
//! and concretely typed native functions.
//!
//! The runtime calls every host function as `r tr(tr_ctx ctx, void * f)`,
//! with arguments in `ctx.args` as `value_u` slots. A trampoline casts `f` to
//! the native signature, unpacks the slots, calls it, and stores a result back
//! into slot zero. One trampoline is generated per distinct
//! [`SignatureShape`], no matter how many exports share it.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::{GenError, Result};
use crate::ident::normalize;
use crate::signature::{FunctionSignature, SignatureShape, TypeTag};

/// Name of the trampoline for a shape.
///
/// Pure function of the type sequences:
/// `([i32, i32], [i32])` → `__tr_i32_i32_result_i32__`.
pub fn trampoline_name(shape: &SignatureShape) -> String {
    let join = |tags: &[TypeTag]| {
        tags.iter()
            .map(TypeTag::as_str)
            .collect::<Vec<_>>()
            .join("_")
    };
    normalize(&format!(
        "__tr_{}_result_{}__",
        join(&shape.params),
        join(&shape.results)
    ))
}

/// Parameter list of the native function implied by a shape: the call
/// context, the declared parameters, then a result out-pointer if any.
///
/// `([i32, i64], [i32])` → `tr_ctx, i32, i64, i32*`.
pub fn native_parameters(shape: &SignatureShape) -> String {
    let mut list = String::from("tr_ctx");
    for param in shape.param_types() {
        let _ = write!(list, ", {param}");
    }
    if let Some(result) = shape.result_type() {
        let _ = write!(list, ", {result}*");
    }
    list
}

/// A generated adapter for one signature shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trampoline {
    pub shape: SignatureShape,
    pub name: String,
}

impl Trampoline {
    pub fn new(shape: SignatureShape) -> Self {
        let name = trampoline_name(&shape);
        Self { shape, name }
    }

    /// Name of the function-pointer typedef for the native signature.
    pub fn pointer_type(&self) -> String {
        format!("_p{}", self.name)
    }

    /// Append the C definition of this trampoline to `out`.
    pub fn render(&self, out: &mut String) {
        let ptr = self.pointer_type();
        let result = self.shape.result_type();

        let _ = writeln!(out, "typedef r (*{ptr})({});", native_parameters(&self.shape));
        let _ = writeln!(out, "static r {} (tr_ctx ctx, void * f) {{", self.name);
        out.push_str("    check_prep(r);\n");
        if let Some(result) = result {
            let _ = writeln!(out, "    {result} result = 0;");
        }

        let _ = write!(out, "    check((({ptr})f)(ctx");
        for (slot, param) in self.shape.param_types().enumerate() {
            let _ = write!(out, ", ctx.args[{slot}].u_{param}");
        }
        if result.is_some() {
            out.push_str(", &result");
        }
        out.push_str("));\n");

        if let Some(result) = result {
            let _ = writeln!(out, "    ctx.args[0] = (value_u){{.u_{result} = result}};");
        }
        out.push_str("    return ok_r;\n");
        out.push_str("}\n\n");
    }
}

/// Shape-deduplicated trampolines of one generation pass, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct TrampolineSet {
    entries: Vec<Trampoline>,
    by_shape: HashMap<SignatureShape, usize>,
    by_name: HashMap<String, usize>,
}

impl TrampolineSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every signature's shape, in order.
    pub fn from_signatures(signatures: &[FunctionSignature]) -> Result<Self> {
        let mut set = Self::new();
        for sig in signatures {
            set.register(&sig.shape())?;
        }
        Ok(set)
    }

    /// Return the trampoline for `shape`, creating it on first sight.
    ///
    /// Fails if a different shape already produced the same name.
    pub fn register(&mut self, shape: &SignatureShape) -> Result<&Trampoline> {
        if let Some(&idx) = self.by_shape.get(shape) {
            return Ok(&self.entries[idx]);
        }

        let trampoline = Trampoline::new(shape.clone());
        if let Some(&idx) = self.by_name.get(&trampoline.name) {
            return Err(GenError::DuplicateGeneratedIdentifier {
                ident: trampoline.name,
                first: format!("shape {}", self.entries[idx].shape),
                second: format!("shape {shape}"),
            });
        }

        tracing::debug!(name = %trampoline.name, shape = %shape, "registered trampoline");
        let idx = self.entries.len();
        self.by_shape.insert(shape.clone(), idx);
        self.by_name.insert(trampoline.name.clone(), idx);
        self.entries.push(trampoline);
        Ok(&self.entries[idx])
    }

    /// The trampoline already registered for `shape`.
    pub fn get(&self, shape: &SignatureShape) -> Option<&Trampoline> {
        self.by_shape.get(shape).map(|&idx| &self.entries[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trampoline> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append every trampoline definition to `out`, in registration order.
    pub fn render(&self, out: &mut String) {
        for trampoline in &self.entries {
            trampoline.render(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::extract_signatures;

    #[test]
    fn names_follow_shape() {
        assert_eq!(
            trampoline_name(&SignatureShape::new(&["i32", "i32"], &["i32"])),
            "__tr_i32_i32_result_i32__"
        );
        assert_eq!(
            trampoline_name(&SignatureShape::new(&[], &[])),
            "__tr_void_result_void__"
        );
    }

    #[test]
    fn native_parameter_lists() {
        assert_eq!(native_parameters(&SignatureShape::new(&[], &[])), "tr_ctx");
        assert_eq!(
            native_parameters(&SignatureShape::new(&["i32", "f32"], &[])),
            "tr_ctx, i32, f32"
        );
        assert_eq!(
            native_parameters(&SignatureShape::new(&["i32", "i64"], &["i32"])),
            "tr_ctx, i32, i64, i32*"
        );
        assert_eq!(native_parameters(&SignatureShape::new(&[], &["i32"])), "tr_ctx, i32*");
    }

    #[test]
    fn render_void_trampoline() {
        let mut out = String::new();
        Trampoline::new(SignatureShape::new(&[], &[])).render(&mut out);
        assert_eq!(
            out,
            "typedef r (*_p__tr_void_result_void__)(tr_ctx);\n\
             static r __tr_void_result_void__ (tr_ctx ctx, void * f) {\n\
             \x20   check_prep(r);\n\
             \x20   check(((_p__tr_void_result_void__)f)(ctx));\n\
             \x20   return ok_r;\n\
             }\n\n"
        );
    }

    #[test]
    fn render_trampoline_with_result() {
        let mut out = String::new();
        Trampoline::new(SignatureShape::new(&["i32", "i64"], &["f64"])).render(&mut out);
        assert_eq!(
            out,
            "typedef r (*_p__tr_i32_i64_result_f64__)(tr_ctx, i32, i64, f64*);\n\
             static r __tr_i32_i64_result_f64__ (tr_ctx ctx, void * f) {\n\
             \x20   check_prep(r);\n\
             \x20   f64 result = 0;\n\
             \x20   check(((_p__tr_i32_i64_result_f64__)f)(ctx, ctx.args[0].u_i32, ctx.args[1].u_i64, &result));\n\
             \x20   ctx.args[0] = (value_u){.u_f64 = result};\n\
             \x20   return ok_r;\n\
             }\n\n"
        );
    }

    #[test]
    fn shared_shape_registers_once() {
        let ex = extract_signatures(
            r#"
(func (export "a") (param i32) (result i32))
(func (export "b") (param i32) (result i32))
(func (export "c") (param i32 i32) (result i32))
(func (export "d") (param i32) (result i32))
"#,
        );
        let set = TrampolineSet::from_signatures(&ex.signatures).unwrap();
        let names: Vec<_> = set.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["__tr_i32_result_i32__", "__tr_i32_i32_result_i32__"]);

        let a = set.get(&ex.signatures[0].shape()).unwrap();
        let d = set.get(&ex.signatures[3].shape()).unwrap();
        assert_eq!(a, d);
    }

    #[test]
    fn register_returns_existing() {
        let mut set = TrampolineSet::new();
        let shape = SignatureShape::new(&["f32"], &[]);
        let first = set.register(&shape).unwrap().name.clone();
        let second = set.register(&shape).unwrap().name.clone();
        assert_eq!(first, second);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn colliding_names_are_rejected() {
        let mut set = TrampolineSet::new();
        // both normalize to __tr_a_b_result_void__
        set.register(&SignatureShape::new(&["a", "b"], &[])).unwrap();
        let err = set
            .register(&SignatureShape::new(&["a_b"], &[]))
            .unwrap_err();
        match err {
            GenError::DuplicateGeneratedIdentifier { ident, .. } => {
                assert_eq!(ident, "__tr_a_b_result_void__");
            }
            other => panic!("expected DuplicateGeneratedIdentifier, got {other:?}"),
        }
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn render_follows_first_seen_order() {
        let mut set = TrampolineSet::new();
        set.register(&SignatureShape::new(&["f64"], &[])).unwrap();
        set.register(&SignatureShape::new(&["i32"], &[])).unwrap();
        let mut out = String::new();
        set.render(&mut out);
        let f64_pos = out.find("__tr_f64_result_void__ (").unwrap();
        let i32_pos = out.find("__tr_i32_result_void__ (").unwrap();
        assert!(f64_pos < i32_pos);
    }
}
