// Canonical type values and the registry that owns them.
//
// Types are plain values: cheap to clone, structurally comparable and
// hashable. Class/struct, interface and enum types carry a lightweight
// handle (uuid + naming data); the full layout lives in the registry,
// keyed by uuid, so nothing in the type graph owns a back-reference.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::module::ModuleId;
use frost_ast as ast;

/// Mangle prefix shared by every symbol the unit emits.
pub const MANGLE_PREFIX: &str = "_ZN$SN";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionType {
    pub args: Vec<Type>,
    pub ret: Box<Type>,
    pub variadic: bool,
    pub mutable: bool,
}

/// A named alias; transparent in comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasType {
    pub name: String,
    pub uuid: String,
    pub base: Box<Type>,
}

/// Handle to a user-defined class or struct. The layout is stored in the
/// registry under `uuid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefinedRef {
    pub uuid: String,
    pub name: String,
    /// Owning module's unique name (the mangling prefix)
    pub module: String,
    pub generics: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceRef {
    pub uuid: String,
    pub name: String,
    pub module: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumRef {
    pub uuid: String,
    pub name: String,
    pub module: String,
    pub generics: Vec<Type>,
}

/// The closed type sum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Int { bits: u8, signed: bool },
    Float { bits: u8 },
    Bool,
    Char,
    Void,
    Pointer { inner: Box<Type>, mutable: bool },
    Reference { inner: Box<Type>, mutable: bool },
    Function(FunctionType),
    Alias(AliasType),
    Defined(DefinedRef),
    Interface(InterfaceRef),
    Enum(EnumRef),
}

impl Type {
    pub const I8: Type = Type::Int { bits: 8, signed: true };
    pub const I16: Type = Type::Int { bits: 16, signed: true };
    pub const I32: Type = Type::Int { bits: 32, signed: true };
    pub const I64: Type = Type::Int { bits: 64, signed: true };
    pub const U8: Type = Type::Int { bits: 8, signed: false };
    pub const U16: Type = Type::Int { bits: 16, signed: false };
    pub const U32: Type = Type::Int { bits: 32, signed: false };
    pub const U64: Type = Type::Int { bits: 64, signed: false };
    pub const F32: Type = Type::Float { bits: 32 };
    pub const F64: Type = Type::Float { bits: 64 };

    /// Strip alias layers down to the underlying type.
    pub fn collapse(&self) -> &Type {
        let mut t = self;
        while let Type::Alias(a) = t {
            t = &a.base;
        }
        t
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.collapse(), Type::Reference { .. })
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.collapse(), Type::Pointer { .. })
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.collapse(), Type::Int { .. } | Type::Float { .. })
    }

    /// Inner type of a reference or pointer.
    pub fn inner(&self) -> Option<&Type> {
        match self.collapse() {
            Type::Pointer { inner, .. } | Type::Reference { inner, .. } => Some(inner),
            _ => None,
        }
    }

    /// Structural equality after alias collapsing (§ type model): two
    /// types are equal iff their canonical identities match.
    pub fn equals(&self, other: &Type) -> bool {
        match (self.collapse(), other.collapse()) {
            (Type::Int { bits: a, signed: s }, Type::Int { bits: b, signed: t }) => {
                a == b && s == t
            }
            (Type::Float { bits: a }, Type::Float { bits: b }) => a == b,
            (Type::Bool, Type::Bool) | (Type::Char, Type::Char) | (Type::Void, Type::Void) => true,
            (
                Type::Pointer { inner: a, mutable: m },
                Type::Pointer { inner: b, mutable: n },
            ) => m == n && a.equals(b),
            (
                Type::Reference { inner: a, mutable: m },
                Type::Reference { inner: b, mutable: n },
            ) => m == n && a.equals(b),
            (Type::Function(a), Type::Function(b)) => {
                a.variadic == b.variadic
                    && a.mutable == b.mutable
                    && a.ret.equals(&b.ret)
                    && a.args.len() == b.args.len()
                    && a.args.iter().zip(&b.args).all(|(x, y)| x.equals(y))
            }
            (Type::Defined(a), Type::Defined(b)) => {
                a.uuid == b.uuid
                    && a.generics.len() == b.generics.len()
                    && a.generics.iter().zip(&b.generics).all(|(x, y)| x.equals(y))
            }
            (Type::Interface(a), Type::Interface(b)) => a.uuid == b.uuid,
            (Type::Enum(a), Type::Enum(b)) => {
                a.uuid == b.uuid
                    && a.generics.len() == b.generics.len()
                    && a.generics.iter().zip(&b.generics).all(|(x, y)| x.equals(y))
            }
            _ => false,
        }
    }

    /// Deterministic mangled form. Primitives, references and pointers use
    /// fixed tags; function types use `_FntY.<ret>fAr<args>[VaGv]fAe`;
    /// nominal types concatenate module prefix, name length + name, and
    /// generics.
    pub fn mangle(&self) -> String {
        match self {
            Type::Int { bits, signed } => match (bits, signed) {
                (8, true) => "a".to_string(),
                (16, true) => "s".to_string(),
                (32, true) => "i".to_string(),
                (64, true) => "l".to_string(),
                (8, false) => "h".to_string(),
                (16, false) => "t".to_string(),
                (32, false) => "j".to_string(),
                _ => "m".to_string(),
            },
            Type::Float { bits } => {
                if *bits == 32 {
                    "f".to_string()
                } else {
                    "d".to_string()
                }
            }
            Type::Bool => "b".to_string(),
            Type::Char => "c".to_string(),
            Type::Void => "v".to_string(),
            Type::Pointer { inner, mutable } => {
                if *mutable {
                    format!("P{}", inner.mangle())
                } else {
                    format!("PK{}", inner.mangle())
                }
            }
            Type::Reference { inner, mutable } => {
                if *mutable {
                    format!("R{}", inner.mangle())
                } else {
                    format!("RK{}", inner.mangle())
                }
            }
            Type::Function(f) => {
                let mut out = String::from("_FntY.");
                out.push_str(&f.ret.mangle());
                out.push_str("fAr");
                for a in &f.args {
                    out.push_str(&a.mangle());
                }
                if f.variadic {
                    out.push_str("VaGv");
                }
                if f.mutable {
                    out.push_str("MuT");
                }
                out.push_str("fAe");
                out
            }
            Type::Alias(a) => a.base.mangle(),
            Type::Defined(d) => {
                let mut out = mangle_with_prefix(&d.module);
                out.push('&');
                out.push_str(&d.name.len().to_string());
                out.push_str(&d.name);
                for g in &d.generics {
                    out.push_str(&g.mangle());
                }
                out
            }
            Type::Interface(i) => {
                let mut out = mangle_with_prefix(&i.module);
                out.push('&');
                out.push_str(&i.name.len().to_string());
                out.push_str(&i.name);
                out
            }
            Type::Enum(e) => {
                let mut out = mangle_with_prefix(&e.module);
                out.push('&');
                out.push_str(&e.name.len().to_string());
                out.push_str(&e.name);
                for g in &e.generics {
                    out.push_str(&g.mangle());
                }
                out
            }
        }
    }

    /// Human-readable form for diagnostics.
    pub fn pretty(&self) -> String {
        match self {
            Type::Int { bits, signed } => {
                format!("{}{}", if *signed { "i" } else { "u" }, bits)
            }
            Type::Float { bits } => format!("f{}", bits),
            Type::Bool => "bool".to_string(),
            Type::Char => "char".to_string(),
            Type::Void => "void".to_string(),
            Type::Pointer { inner, mutable } => {
                format!("*{} {}", if *mutable { "mut" } else { "const" }, inner.pretty())
            }
            Type::Reference { inner, mutable } => {
                format!("&{}{}", if *mutable { "mut " } else { "" }, inner.pretty())
            }
            Type::Function(f) => {
                let mut args: Vec<String> = f.args.iter().map(Type::pretty).collect();
                if f.variadic {
                    args.push("...".to_string());
                }
                format!(
                    "function ({}) {}-> {}",
                    args.join(", "),
                    if f.mutable { "mut " } else { "" },
                    f.ret.pretty()
                )
            }
            Type::Alias(a) => a.name.clone(),
            Type::Defined(d) => pretty_with_generics(&d.name, &d.generics),
            Type::Interface(i) => i.name.clone(),
            Type::Enum(e) => pretty_with_generics(&e.name, &e.generics),
        }
    }

    /// Void and bare interface types are unsized; everything else is sized.
    pub fn is_sized(&self) -> bool {
        !matches!(self.collapse(), Type::Void | Type::Interface(_))
    }
}

fn pretty_with_generics(name: &str, generics: &[Type]) -> String {
    if generics.is_empty() {
        return name.to_string();
    }
    let inner: Vec<String> = generics.iter().map(Type::pretty).collect();
    format!("{}<{}>", name, inner.join(", "))
}

/// Prefix `base` with the mangle marker unless it already carries one.
pub fn mangle_with_prefix(base: &str) -> String {
    if base.starts_with(MANGLE_PREFIX) {
        base.to_string()
    } else {
        format!("{}{}", MANGLE_PREFIX, base)
    }
}

/// A single field of a class layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassField {
    pub name: String,
    pub ty: Type,
    pub privacy: ast::Privacy,
    /// Unevaluated default initializer from the declaration site
    pub default_value: Option<ast::Expression>,
    pub mutable: bool,
}

/// Full layout of a defined (class/struct) type, registry-owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassLayout {
    pub uuid: String,
    pub name: String,
    pub module: ModuleId,
    pub fields: Vec<ClassField>,
    /// Parent class uuid, resolved through the registry on demand
    pub parent: Option<String>,
    pub generics: Vec<Type>,
    pub interfaces: Vec<Type>,
    pub is_struct: bool,
    pub has_constructor: bool,
    pub has_vtable: bool,
    /// Virtual method names in slot order; an override keeps its
    /// ancestor's slot
    pub vtable_names: Vec<String>,
    /// Virtual table, in slot order, filled as methods are generated
    pub vtable: Vec<Option<crate::func::FuncId>>,
    pub privacy: ast::Privacy,
}

impl ClassLayout {
    /// Structural slot of field `k`: shifted by one when slot 0 holds the
    /// vtable pointer.
    pub fn structural_slot(&self, field_index: usize) -> usize {
        field_index + usize::from(self.has_vtable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberKind {
    Field,
    Method,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceMember {
    pub name: String,
    pub ty: Type,
    pub kind: MemberKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceLayout {
    pub uuid: String,
    pub name: String,
    pub module: ModuleId,
    pub members: Vec<InterfaceMember>,
    /// Uuids of the defined types implementing this interface
    pub implementors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumVariantLayout {
    pub name: String,
    pub payload: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumLayout {
    pub uuid: String,
    pub name: String,
    pub module: ModuleId,
    pub variants: Vec<EnumVariantLayout>,
    pub generics: Vec<Type>,
}

/// Owns every canonical type in the unit: an interner for structural
/// types and the layout side-tables for nominal ones. Read-mostly after
/// the initial primitive population.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    interned: DashMap<Type, Arc<Type>>,
    classes: DashMap<String, ClassLayout>,
    interfaces: DashMap<String, InterfaceLayout>,
    enums: DashMap<String, EnumLayout>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let registry = Self::default();
        for ty in [
            Type::I8,
            Type::I16,
            Type::I32,
            Type::I64,
            Type::U8,
            Type::U16,
            Type::U32,
            Type::U64,
            Type::F32,
            Type::F64,
            Type::Bool,
            Type::Char,
            Type::Void,
        ] {
            registry.intern(ty);
        }
        registry
    }

    /// Canonical shared handle for a structural type.
    pub fn intern(&self, ty: Type) -> Arc<Type> {
        self.interned
            .entry(ty.clone())
            .or_insert_with(|| Arc::new(ty))
            .clone()
    }

    pub fn int(&self, bits: u8, signed: bool) -> Type {
        Type::Int { bits, signed }
    }

    /// Wrap `ty` in a reference carrying the referent's mutability. A
    /// reference is never a reference to a reference.
    pub fn reference_to(&self, ty: Type, mutable: bool) -> Type {
        if ty.is_reference() {
            return ty;
        }
        let t = Type::Reference {
            inner: Box::new(ty),
            mutable,
        };
        self.intern(t.clone());
        t
    }

    pub fn pointer_to(&self, ty: Type, mutable: bool) -> Type {
        let t = Type::Pointer {
            inner: Box::new(ty),
            mutable,
        };
        self.intern(t.clone());
        t
    }

    /// Inner type of a reference or pointer; `None` otherwise.
    pub fn dereference(&self, ty: &Type) -> Option<Type> {
        ty.inner().cloned()
    }

    // ---- class layouts ----

    pub fn insert_class(&self, layout: ClassLayout) {
        self.classes.insert(layout.uuid.clone(), layout);
    }

    pub fn class(&self, uuid: &str) -> Option<ClassLayout> {
        self.classes.get(uuid).map(|l| l.clone())
    }

    pub fn with_class_mut<R>(&self, uuid: &str, f: impl FnOnce(&mut ClassLayout) -> R) -> Option<R> {
        self.classes.get_mut(uuid).map(|mut l| f(&mut l))
    }

    /// Whether `child_uuid` is `ancestor_uuid` or a descendant of it.
    pub fn is_descendant_of(&self, child_uuid: &str, ancestor_uuid: &str) -> bool {
        let mut cur = Some(child_uuid.to_string());
        while let Some(uuid) = cur {
            if uuid == ancestor_uuid {
                return true;
            }
            cur = self.classes.get(&uuid).and_then(|l| l.parent.clone());
        }
        false
    }

    // ---- interface layouts ----

    pub fn insert_interface(&self, layout: InterfaceLayout) {
        self.interfaces.insert(layout.uuid.clone(), layout);
    }

    pub fn interface(&self, uuid: &str) -> Option<InterfaceLayout> {
        self.interfaces.get(uuid).map(|l| l.clone())
    }

    pub fn with_interface_mut<R>(
        &self,
        uuid: &str,
        f: impl FnOnce(&mut InterfaceLayout) -> R,
    ) -> Option<R> {
        self.interfaces.get_mut(uuid).map(|mut l| f(&mut l))
    }

    // ---- enum layouts ----

    pub fn insert_enum(&self, layout: EnumLayout) {
        self.enums.insert(layout.uuid.clone(), layout);
    }

    pub fn enum_layout(&self, uuid: &str) -> Option<EnumLayout> {
        self.enums.get(uuid).map(|l| l.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mangle_determinism_across_registries() {
        let a = TypeRegistry::new();
        let b = TypeRegistry::new();
        let t1 = a.pointer_to(Type::I32, false);
        let t2 = b.pointer_to(Type::I32, false);
        assert_eq!(t1.mangle(), t2.mangle());
        assert_eq!(t1.mangle(), "PKi");
    }

    #[test]
    fn test_function_type_mangle_grammar() {
        let f = Type::Function(FunctionType {
            args: vec![Type::I32, Type::F64],
            ret: Box::new(Type::Bool),
            variadic: true,
            mutable: false,
        });
        assert_eq!(f.mangle(), "_FntY.bfAridVaGvfAe");
    }

    #[test]
    fn test_equality_congruent_with_mangle() {
        let a = Type::Reference {
            inner: Box::new(Type::U8),
            mutable: false,
        };
        let b = Type::Reference {
            inner: Box::new(Type::U8),
            mutable: false,
        };
        let c = Type::Reference {
            inner: Box::new(Type::U8),
            mutable: true,
        };
        assert!(a.equals(&b));
        assert_eq!(a.mangle(), b.mangle());
        assert!(!a.equals(&c));
        assert_ne!(a.mangle(), c.mangle());
    }

    #[test]
    fn test_alias_transparent_in_comparisons() {
        let alias = Type::Alias(AliasType {
            name: "Size".to_string(),
            uuid: "main.Size".to_string(),
            base: Box::new(Type::U64),
        });
        assert!(alias.equals(&Type::U64));
        assert_eq!(alias.mangle(), Type::U64.mangle());
        assert_eq!(alias.pretty(), "Size");
    }

    #[test]
    fn test_reference_never_wraps_reference() {
        let registry = TypeRegistry::new();
        let r = registry.reference_to(Type::I32, false);
        let rr = registry.reference_to(r.clone(), true);
        assert!(rr.is_reference());
        assert!(rr.inner().is_some_and(|t| !t.is_reference()));
    }

    #[test]
    fn test_pretty_round_trip_through_reference() {
        let registry = TypeRegistry::new();
        for t in [Type::I32, Type::Bool, registry.pointer_to(Type::U8, false)] {
            let r = registry.reference_to(t.clone(), false);
            let back = registry.dereference(&r).unwrap();
            assert_eq!(back.pretty(), t.pretty());
        }
    }

    #[test]
    fn test_sizedness() {
        assert!(!Type::Void.is_sized());
        let iface = Type::Interface(InterfaceRef {
            uuid: "main.Show".to_string(),
            name: "Show".to_string(),
            module: "main".to_string(),
        });
        assert!(!iface.is_sized());
        assert!(Type::I64.is_sized());
    }

    #[test]
    fn test_structural_slot_shift() {
        let mut layout = ClassLayout {
            uuid: "m.A".to_string(),
            name: "A".to_string(),
            module: ModuleId(0),
            fields: Vec::new(),
            parent: None,
            generics: Vec::new(),
            interfaces: Vec::new(),
            is_struct: false,
            has_constructor: false,
            has_vtable: false,
            vtable_names: Vec::new(),
            vtable: Vec::new(),
            privacy: ast::Privacy::Public,
        };
        assert_eq!(layout.structural_slot(0), 0);
        layout.has_vtable = true;
        assert_eq!(layout.structural_slot(0), 1);
        assert_eq!(layout.structural_slot(3), 4);
    }
}
