// Rendering of inline low-level IR bodies. Literal chunks are spliced
// verbatim; type-access chunks become the canonical mangled form, with a
// structural declaration of any aggregate they depend on emitted once per
// compilation unit.

use std::collections::HashSet;

use crate::func::LlvmChunk;
use crate::types::{Type, TypeRegistry};

/// Tracks which aggregate declarations were already emitted this unit.
#[derive(Debug, Default)]
pub struct EmittedTypes {
    seen: HashSet<String>,
}

impl EmittedTypes {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Textual name a type-access chunk splices into the body.
fn access_name(ty: &Type) -> String {
    match ty.collapse() {
        Type::Defined(_) | Type::Interface(_) | Type::Enum(_) => {
            format!("%\"{}\"", ty.mangle())
        }
        other => other.mangle(),
    }
}

/// Append the structural declaration of `ty` (and of every aggregate it
/// depends on, depth-first) unless it was already emitted.
fn declare_aggregate(
    ty: &Type,
    registry: &TypeRegistry,
    emitted: &mut EmittedTypes,
    out: &mut String,
) {
    let collapsed = ty.collapse();
    let Type::Defined(def) = collapsed else {
        return;
    };
    let mangled = collapsed.mangle();
    if !emitted.seen.insert(mangled.clone()) {
        return;
    }

    let mut elements = Vec::new();
    if let Some(layout) = registry.class(&def.uuid) {
        if layout.has_vtable {
            elements.push("ptr".to_string());
        }
        for field in &layout.fields {
            declare_aggregate(&field.ty, registry, emitted, out);
            elements.push(access_name(&field.ty));
        }
    }
    out.push_str(&format!(
        "%\"{}\" = type {{ {} }}\n",
        mangled,
        elements.join(", ")
    ));
}

/// Render an inline-IR chunk sequence into one splice-ready body string.
pub fn render(chunks: &[LlvmChunk], registry: &TypeRegistry, emitted: &mut EmittedTypes) -> String {
    let mut decls = String::new();
    for chunk in chunks {
        if let LlvmChunk::TypeAccess(ty) = chunk {
            declare_aggregate(ty, registry, emitted, &mut decls);
        }
    }

    let mut body = String::new();
    for chunk in chunks {
        match chunk {
            LlvmChunk::Code(code) => body.push_str(code),
            LlvmChunk::TypeAccess(ty) => body.push_str(&access_name(ty)),
        }
    }

    format!("{}{}", decls, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleId;
    use crate::types::{ClassField, ClassLayout, DefinedRef};
    use frost_ast::Privacy;

    fn defined(registry: &TypeRegistry, has_vtable: bool) -> Type {
        let uuid = "pkg$m.Point".to_string();
        registry.insert_class(ClassLayout {
            uuid: uuid.clone(),
            name: "Point".to_string(),
            module: ModuleId(0),
            fields: vec![
                ClassField {
                    name: "x".to_string(),
                    ty: Type::I32,
                    privacy: Privacy::Public,
                    default_value: None,
                    mutable: false,
                },
                ClassField {
                    name: "y".to_string(),
                    ty: Type::I32,
                    privacy: Privacy::Public,
                    default_value: None,
                    mutable: false,
                },
            ],
            parent: None,
            generics: Vec::new(),
            interfaces: Vec::new(),
            is_struct: true,
            has_constructor: false,
            has_vtable,
            vtable_names: Vec::new(),
            vtable: Vec::new(),
            privacy: Privacy::Public,
        });
        Type::Defined(DefinedRef {
            uuid,
            name: "Point".to_string(),
            module: "pkg$m".to_string(),
            generics: Vec::new(),
        })
    }

    #[test]
    fn test_render_splices_mangled_names() {
        let registry = TypeRegistry::new();
        let chunks = vec![
            LlvmChunk::Code("%r = add ".to_string()),
            LlvmChunk::TypeAccess(Type::I32),
            LlvmChunk::Code(" %a, %b".to_string()),
        ];
        let mut emitted = EmittedTypes::new();
        let out = render(&chunks, &registry, &mut emitted);
        assert_eq!(out, "%r = add i %a, %b");
    }

    #[test]
    fn test_aggregate_declared_once_per_unit() {
        let registry = TypeRegistry::new();
        let point = defined(&registry, false);
        let chunks = vec![LlvmChunk::TypeAccess(point.clone())];
        let mut emitted = EmittedTypes::new();

        let first = render(&chunks, &registry, &mut emitted);
        assert!(first.contains("= type { i, i }"));

        let second = render(&chunks, &registry, &mut emitted);
        assert!(!second.contains("= type"));
        assert!(second.contains(&point.mangle()));
    }

    #[test]
    fn test_vtable_reserves_leading_slot() {
        let registry = TypeRegistry::new();
        let point = defined(&registry, true);
        let chunks = vec![LlvmChunk::TypeAccess(point)];
        let mut emitted = EmittedTypes::new();
        let out = render(&chunks, &registry, &mut emitted);
        assert!(out.contains("= type { ptr, i, i }"));
    }
}
