// Name resolution: unqualified identifiers over the scope stack and the
// symbol cache, and `a.b` / `A::b` member resolution.

use super::{Found, IndexResult, SemaResult, Transformer};
use crate::item::Item;
use frost_ast as ast;
use frost_diagnostics::{Category, Span};
use frost_ir::{ops, ModuleId, Type, Value};

impl Transformer {
    pub(crate) fn get_from_identifier_node(&mut self, ident: &ast::Identifier) -> SemaResult<Found> {
        self.get_from_identifier(&ident.span, &ident.name, &ident.generics, None)
    }

    /// Lookup order: innermost scope outward; then the cache, by the UUID
    /// built from the current module path; then every UUID on the
    /// override stack.
    pub(crate) fn get_from_identifier(
        &mut self,
        span: &Span,
        name: &str,
        generics: &[ast::TypeRef],
        uuid_override: Option<&str>,
    ) -> SemaResult<Found> {
        if uuid_override.is_none() {
            if let Some(item) = self.ctx.get_item(name) {
                let item = item.clone();
                match item {
                    Item::Value(v) => {
                        return Ok(Found {
                            value: Some(v),
                            ..Found::empty()
                        });
                    }
                    Item::Functions(funcs) => {
                        return Ok(Found {
                            functions: Some(funcs),
                            ..Found::empty()
                        });
                    }
                    Item::Type(t) => {
                        return Ok(Found {
                            ty: Some(t),
                            ..Found::empty()
                        });
                    }
                    Item::Module(m) => {
                        return Ok(Found {
                            module: Some(m),
                            ..Found::empty()
                        });
                    }
                    Item::Macro(_) => {
                        return Err(Self::err(
                            Category::Syntax,
                            span,
                            "Macros cannot be used as values!",
                        )
                        .with_note(
                            "Macros are not values, they are used to generate code at compile time.",
                        ));
                    }
                    Item::Alias(expr) => return self.resolve_alias(span, &expr, generics),
                }
            }
        }

        // The cache probe transforms requested generics up front so
        // instantiation matching can compare canonical types.
        let wanted: Vec<Type> = generics
            .iter()
            .map(|g| self.transform_type(g))
            .collect::<SemaResult<_>>()?;

        let mut candidates: Vec<String> = Vec::new();
        candidates.push(match uuid_override {
            Some(base) => format!("{}.{}", base, name),
            None => self.node_uuid(name),
        });
        for base in self.ctx.uuid_stack.iter().rev() {
            candidates.push(format!("{}.{}", base, name));
        }

        for uuid in candidates {
            let functions = self.cache.transformed_function(&uuid).cloned();

            if let Some(instances) = self.cache.transformed_types(&uuid).cloned() {
                for instance in instances {
                    if type_generics_match(&instance, &wanted) {
                        return Ok(Found {
                            ty: Some(instance),
                            ..Found::empty()
                        });
                    }
                }
            }

            if self.cache.type_store(&uuid).is_some() {
                let ty = self.transform_type_from_base(&uuid, span, generics)?;
                return Ok(Found {
                    ty: Some(ty),
                    ..Found::empty()
                });
            }

            let overloads = self.cache.function(&uuid).cloned();
            if functions.is_some() || overloads.is_some() {
                return Ok(Found {
                    functions,
                    overloads,
                    ..Found::empty()
                });
            }

            if let Some(module) = self.cache.module(&uuid) {
                return Ok(Found {
                    module: Some(module),
                    ..Found::empty()
                });
            }
        }

        // Reserved-name fast path for the built-in types
        if generics.is_empty() {
            if let Some(primitive) = super::types::primitive_type(name) {
                return Ok(Found {
                    ty: Some(primitive),
                    ..Found::empty()
                });
            }
        }

        Ok(Found::empty())
    }

    fn resolve_alias(
        &mut self,
        span: &Span,
        aliased: &ast::Expression,
        generics: &[ast::TypeRef],
    ) -> SemaResult<Found> {
        match aliased {
            ast::Expression::Index(index) => {
                let mut index = index.clone();
                if !generics.is_empty() {
                    index.identifier.generics = generics.to_vec();
                }
                Ok(self.get_from_index(&index)?.found)
            }
            ast::Expression::Identifier(ident) => {
                self.get_from_identifier(span, &ident.name, generics, None)
            }
            _ => Err(Self::err(
                Category::CompilerBug,
                span,
                "unhandled alias expression shape",
            )),
        }
    }

    /// Resolve `base.member` / `Base::member` (§ member lookup). Returns
    /// the transformed base alongside so call sites can thread `self`.
    pub(crate) fn get_from_index(&mut self, index: &ast::Index) -> SemaResult<IndexResult> {
        let span = index.span.clone();
        match index.base.as_ref() {
            ast::Expression::Identifier(base_ident) => {
                let base = self.get_from_identifier_node(base_ident)?;
                self.dispatch_index_base(&span, base, index, &base_ident.name)
            }
            ast::Expression::Index(inner) => {
                let result = self.get_from_index(inner)?;
                self.dispatch_index_base(&span, result.found, index, &inner.identifier.name)
            }
            ast::Expression::TypeRef(type_ref) => {
                if !index.is_static {
                    return Err(Self::err(
                        Category::Type,
                        &span,
                        "Can't use type references for method calls / accesses!",
                    ));
                }
                let ty = self.transform_type(type_ref)?;
                self.found_from_type(&span, ty, None, &index.identifier)
            }
            other => {
                if index.is_static {
                    return Err(Self::err(
                        Category::Syntax,
                        &span,
                        "Static access / method call can only be used with identifiers!",
                    ));
                }
                let value = self.trans_expr(other)?;
                self.found_from_type(&span, value.ty.clone(), Some(value), &index.identifier)
            }
        }
    }

    fn dispatch_index_base(
        &mut self,
        span: &Span,
        base: Found,
        index: &ast::Index,
        base_name: &str,
    ) -> SemaResult<IndexResult> {
        if let Some(value) = base.value {
            if index.is_static {
                return Err(Self::err(
                    Category::Type,
                    span,
                    "Static method call / accesses can only be used with types, not values!",
                ));
            }
            return self.found_from_type(span, value.ty.clone(), Some(value), &index.identifier);
        }

        if let Some(module) = base.module {
            if !index.is_static {
                return Err(Self::err(
                    Category::Type,
                    span,
                    "Module members must be accessed by using static indexes!",
                ));
            }
            return self.found_from_module(span, module, &index.identifier);
        }

        if let Some(ty) = base.ty {
            if !index.is_static {
                return Err(Self::err(
                    Category::Type,
                    span,
                    "Can't use type references for method calls / accesses!",
                ));
            }
            return self.found_from_type(span, ty, None, &index.identifier);
        }

        if base.has_functions() {
            return Err(Self::err(
                Category::Type,
                span,
                "Can't use a function as an index base!",
            ));
        }

        Err(Self::err(
            Category::Variable,
            span,
            format!("Cannot find identifier `{}`!", base_name),
        )
        .with_info("this name is not defined"))
    }

    /// Member lookup on a type (§ get-from-index rules). A value base
    /// searches fields before member functions; a type base is static
    /// lookup only.
    pub(crate) fn found_from_type(
        &mut self,
        span: &Span,
        base_ty: Type,
        base_value: Option<Value>,
        ident: &ast::Identifier,
    ) -> SemaResult<IndexResult> {
        // Strip the outer reference and alias layers
        let mut ty = base_ty.collapse().clone();
        if let Type::Reference { inner, .. } = &ty {
            ty = inner.collapse().clone();
        }
        let is_static = base_value.is_none();

        match &ty {
            Type::Defined(def) => {
                let found = self.lookup_in_class_chain(span, &def.uuid, ident)?;

                let mut index_value = None;
                if !is_static {
                    if let (Some(base), Some(layout)) =
                        (base_value.as_ref(), self.types.class(&def.uuid))
                    {
                        if let Some(pos) =
                            layout.fields.iter().position(|f| f.name == ident.name)
                        {
                            index_value = Some(self.builder.index_extract(
                                span.clone(),
                                base.clone(),
                                &layout.fields[pos],
                                pos,
                            ));
                        }
                    }
                }

                if index_value.is_none() {
                    index_value = found.value.clone();
                }

                if index_value.is_none() && found.is_empty() {
                    return Err(Self::err(
                        Category::Variable,
                        span,
                        format!(
                            "Couldn't find '{}' inside type '{}'!",
                            ops::nice_name(&ident.name),
                            ty.pretty()
                        ),
                    ));
                }

                let accept_private = self.is_in_class_context(&def.uuid);
                Ok(IndexResult {
                    found: Found {
                        value: index_value,
                        ..found
                    },
                    accept_private,
                    base_value,
                })
            }
            Type::Enum(e) => {
                let layout = self.types.enum_layout(&e.uuid);
                if let Some(layout) = layout {
                    if let Some(variant) =
                        layout.variants.iter().find(|v| v.name == ident.name)
                    {
                        let value = if variant.payload.is_empty() {
                            Some(self.builder.enum_init(
                                span.clone(),
                                ty.clone(),
                                &variant.name,
                                Vec::new(),
                            ))
                        } else {
                            None
                        };
                        return Ok(IndexResult {
                            found: Found {
                                value,
                                enum_variant: Some((ty.clone(), variant.name.clone())),
                                ..Found::empty()
                            },
                            accept_private: false,
                            base_value,
                        });
                    }
                }
                // fall back to static functions declared on the enum
                let found =
                    self.get_from_identifier(span, &ident.name, &ident.generics, Some(&e.uuid))?;
                if found.is_empty() {
                    return Err(Self::err(
                        Category::Variable,
                        span,
                        format!(
                            "Couldn't find '{}' inside type '{}'!",
                            ident.name,
                            ty.pretty()
                        ),
                    ));
                }
                Ok(IndexResult {
                    found,
                    accept_private: false,
                    base_value,
                })
            }
            other => {
                // Primitives and pointers: only member functions, cached
                // under the type's canonical display name.
                let uuid = other.pretty();
                let found =
                    self.get_from_identifier(span, &ident.name, &ident.generics, Some(&uuid))?;
                if !found.has_functions() {
                    let name = ops::nice_name(&ident.name);
                    return Err(Self::err(
                        Category::Variable,
                        span,
                        format!(
                            "Couldn't find function '{}' inside type '{}'!",
                            name,
                            other.pretty()
                        ),
                    ));
                }
                Ok(IndexResult {
                    found,
                    accept_private: false,
                    base_value,
                })
            }
        }
    }

    fn found_from_module(
        &mut self,
        span: &Span,
        module: ModuleId,
        ident: &ast::Identifier,
    ) -> SemaResult<IndexResult> {
        let unique = self.modules.get(module).unique_name.clone();
        let found =
            self.get_from_identifier(span, &ident.name, &ident.generics, Some(&unique))?;
        if found.is_empty() {
            return Err(Self::err(
                Category::Variable,
                span,
                format!(
                    "Couldn't find '{}' inside module '{}'!",
                    ident.name,
                    self.modules.get(module).name
                ),
            ));
        }
        Ok(IndexResult {
            found,
            accept_private: self.ctx.module == module,
            base_value: None,
        })
    }

    /// Walk the inheritance chain until the member resolves.
    fn lookup_in_class_chain(
        &mut self,
        span: &Span,
        uuid: &str,
        ident: &ast::Identifier,
    ) -> SemaResult<Found> {
        let mut current = Some(uuid.to_string());
        while let Some(class_uuid) = current {
            let found = self.get_from_identifier(
                span,
                &ident.name,
                &ident.generics,
                Some(&class_uuid),
            )?;
            if !found.is_empty() {
                return Ok(found);
            }
            current = self.types.class(&class_uuid).and_then(|l| l.parent);
        }
        Ok(Found::empty())
    }

    /// Whether the current class is `uuid` or one of its descendants.
    pub(crate) fn is_in_class_context(&self, uuid: &str) -> bool {
        match &self.ctx.current_class {
            Some(Type::Defined(d)) => self.types.is_descendant_of(&d.uuid, uuid),
            _ => false,
        }
    }

    /// Probe for member functions by name without raising a missing-member
    /// diagnostic; used by operator lowering and boolean coercion.
    pub(crate) fn lookup_member_functions(
        &mut self,
        ty: &Type,
        name: &str,
        span: &Span,
    ) -> SemaResult<Found> {
        let mut base = ty.collapse().clone();
        if let Type::Reference { inner, .. } = &base {
            base = inner.collapse().clone();
        }

        let ident = ast::Identifier::new(name, span.clone());
        match &base {
            Type::Defined(def) => self.lookup_in_class_chain(span, &def.uuid, &ident),
            Type::Enum(e) => {
                self.get_from_identifier(span, name, &[], Some(&e.uuid.clone()))
            }
            other => {
                let uuid = other.pretty();
                self.get_from_identifier(span, name, &[], Some(&uuid))
            }
        }
    }
}

/// Compare an instantiated type's generic arguments against the requested
/// ones; an instantiation with no generics matches an empty request.
pub(crate) fn type_generics_match(instance: &Type, wanted: &[Type]) -> bool {
    let generics: &[Type] = match instance {
        Type::Defined(d) => &d.generics,
        Type::Enum(e) => &e.generics,
        _ => &[],
    };
    generics.len() == wanted.len()
        && generics.iter().zip(wanted).all(|(a, b)| a.equals(b))
}
