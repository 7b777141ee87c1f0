// Lowering of source type references into canonical types, plus generic
// parameter binding and where-clause execution.

use super::{SemaResult, Transformer};
use crate::cache::{TypeDeclAst, TypeStore};
use crate::item::Item;
use frost_ast as ast;
use frost_diagnostics::{Category, Span};
use frost_ir::{AliasType, EnumLayout, EnumRef, EnumVariantLayout, FunctionType, Type};

/// Reserved primitive type names.
pub(crate) fn primitive_type(name: &str) -> Option<Type> {
    Some(match name {
        "i8" => Type::I8,
        "i16" => Type::I16,
        "i32" => Type::I32,
        "i64" => Type::I64,
        "u8" => Type::U8,
        "u16" => Type::U16,
        "u32" => Type::U32,
        "u64" => Type::U64,
        "f32" => Type::F32,
        "f64" => Type::F64,
        "bool" => Type::Bool,
        "char" => Type::Char,
        "void" => Type::Void,
        _ => return None,
    })
}

impl Transformer {
    /// Lower a source type reference to its canonical type. Public so
    /// embedding tools can resolve types against a transformed unit.
    pub fn transform_type(&mut self, r: &ast::TypeRef) -> SemaResult<Type> {
        match &r.kind {
            ast::TypeRefKind::Pointer { inner, mutable } => {
                let inner = self.transform_type(inner)?;
                Ok(self.types.pointer_to(inner, *mutable))
            }
            ast::TypeRefKind::Reference { inner, mutable } => {
                let inner = self.transform_type(inner)?;
                Ok(self.types.reference_to(inner, *mutable))
            }
            ast::TypeRefKind::Function {
                args,
                ret,
                variadic,
            } => {
                let args = args
                    .iter()
                    .map(|a| self.transform_type(a))
                    .collect::<SemaResult<Vec<_>>>()?;
                let ret = self.transform_type(ret)?;
                Ok(Type::Function(FunctionType {
                    args,
                    ret: Box::new(ret),
                    variadic: *variadic,
                    mutable: false,
                }))
            }
            ast::TypeRefKind::Name { path, generics } => {
                self.transform_named_type(&r.span, path, generics, r)
            }
        }
    }

    fn transform_named_type(
        &mut self,
        span: &Span,
        path: &[String],
        generics: &[ast::TypeRef],
        r: &ast::TypeRef,
    ) -> SemaResult<Type> {
        if path.len() == 1 {
            let name = &path[0];
            if generics.is_empty() {
                if let Some(primitive) = primitive_type(name) {
                    return Ok(primitive);
                }
            }
            let found = self.get_from_identifier(span, name, generics, None)?;
            if let Some(ty) = found.ty {
                return Ok(ty);
            }
            return Err(Self::err(
                Category::Type,
                span,
                format!("Type '{}' not found!", r.pretty_name()),
            ));
        }

        // Qualified name: resolve the leading segments to modules or
        // enclosing types, then the final segment inside them.
        let mut base_uuid: Option<String> = None;
        for segment in &path[..path.len() - 1] {
            let found =
                self.get_from_identifier(span, segment, &[], base_uuid.as_deref())?;
            if let Some(module) = found.module {
                base_uuid = Some(self.modules.get(module).unique_name.clone());
            } else if let Some(Type::Defined(def)) = found.ty.as_ref().map(|t| t.collapse()) {
                base_uuid = Some(def.uuid.clone());
            } else {
                return Err(Self::err(
                    Category::Type,
                    span,
                    format!("Type '{}' not found!", r.pretty_name()),
                ));
            }
        }

        let last = &path[path.len() - 1];
        let found = self.get_from_identifier(span, last, generics, base_uuid.as_deref())?;
        found.ty.ok_or_else(|| {
            Self::err(
                Category::Type,
                span,
                format!("Type '{}' not found!", r.pretty_name()),
            )
        })
    }

    pub(crate) fn transform_sized_type(
        &mut self,
        r: &ast::TypeRef,
        what: &str,
    ) -> SemaResult<Type> {
        let ty = self.transform_type(r)?;
        if !ty.is_sized() {
            return Err(Self::err(
                Category::Type,
                &r.span,
                format!(
                    "{} must be sized but found '{}' (which is not sized)",
                    what,
                    ty.pretty()
                ),
            ));
        }
        Ok(ty)
    }

    /// Instantiate a cached type declaration on demand.
    pub(crate) fn transform_type_from_base(
        &mut self,
        uuid: &str,
        span: &Span,
        generics: &[ast::TypeRef],
    ) -> SemaResult<Type> {
        let store = self.cache.type_store(uuid).cloned().ok_or_else(|| {
            Self::err(
                Category::CompilerBug,
                span,
                format!("type store missing for '{}'", uuid),
            )
        })?;

        let params = store.ast.generics();
        let required = params.iter().filter(|g| g.default.is_none()).count();
        if generics.len() < required || generics.len() > params.len() {
            return Err(Self::err(
                Category::Type,
                span,
                format!(
                    "Type '{}' requires to have {} generic argument(s) but {} were given!",
                    store.ast.name(),
                    required,
                    generics.len()
                ),
            ));
        }

        // Generic arguments are transformed in the requesting context,
        // not inside the declaration's captured state.
        let generic_args = generics
            .iter()
            .map(|g| self.transform_type(g))
            .collect::<SemaResult<Vec<_>>>()?;

        match store.ast.clone() {
            TypeDeclAst::Class(class) => self.transform_class(&store, &class, generic_args),
            TypeDeclAst::Alias(alias) => self.transform_type_alias(&store, &alias, generic_args),
            TypeDeclAst::Enum(e) => self.transform_enum(&store, &e, generic_args),
        }
    }

    fn transform_type_alias(
        &mut self,
        store: &TypeStore,
        alias: &ast::TypeAliasDef,
        generic_args: Vec<Type>,
    ) -> SemaResult<Type> {
        let previous = self.ctx.swap_state(&store.state);
        self.ctx.push_scope();

        let result = (|| {
            self.bind_generic_params(&alias.generics, &generic_args)?;
            let base = self.transform_type(&alias.ty)?;
            Ok(Type::Alias(AliasType {
                name: alias.name.clone(),
                uuid: store.uuid.clone(),
                base: Box::new(base),
            }))
        })();

        self.ctx.pop_scope();
        self.ctx.restore_state(previous);
        result
    }

    fn transform_enum(
        &mut self,
        store: &TypeStore,
        def: &ast::EnumDef,
        generic_args: Vec<Type>,
    ) -> SemaResult<Type> {
        let previous = self.ctx.swap_state(&store.state);
        self.ctx.push_scope();

        let result = (|| {
            let instance_uuid = format!(
                "{}:{}",
                store.uuid,
                self.cache.instantiation_count(&store.uuid)
            );
            let ty = Type::Enum(EnumRef {
                uuid: instance_uuid.clone(),
                name: def.name.clone(),
                module: self.module_unique(),
                generics: generic_args.clone(),
            });
            // Register before the payloads so self-referential variants
            // resolve through the cache.
            self.cache.add_transformed_type(&store.uuid, ty.clone());
            self.ctx
                .add_item("Self", Item::Type(ty.clone()))
                .map_err(|_| {
                    Self::err(Category::Variable, &def.span, "'Self' is already defined")
                })?;
            self.bind_generic_params(&def.generics, &generic_args)?;

            let mut variants = Vec::new();
            for variant in &def.variants {
                let payload = variant
                    .payload
                    .iter()
                    .map(|t| self.transform_sized_type(t, "Enum payloads"))
                    .collect::<SemaResult<Vec<_>>>()?;
                variants.push(EnumVariantLayout {
                    name: variant.name.clone(),
                    payload,
                });
            }

            self.types.insert_enum(EnumLayout {
                uuid: instance_uuid.clone(),
                name: def.name.clone(),
                module: self.ctx.module,
                variants,
                generics: generic_args.clone(),
            });
            self.modules
                .get_mut(self.ctx.module)
                .type_info
                .insert(instance_uuid, ty.clone());
            Ok(ty)
        })();

        self.ctx.pop_scope();
        self.ctx.restore_state(previous);
        result
    }

    /// Bind generic parameter names to their supplied types, evaluating
    /// declared defaults for parameters beyond the supplied count, and
    /// run each parameter's where-clause predicates.
    pub(crate) fn bind_generic_params(
        &mut self,
        params: &[ast::GenericParam],
        supplied: &[Type],
    ) -> SemaResult<Vec<(String, Type)>> {
        let mut bound = Vec::new();
        for (i, param) in params.iter().enumerate() {
            let ty = match supplied.get(i) {
                Some(ty) => ty.clone(),
                None => match &param.default {
                    Some(default) => self.transform_type(default)?,
                    None => {
                        return Err(Self::err(
                            Category::Type,
                            &param.span,
                            format!("Missing generic argument '{}'!", param.name),
                        ));
                    }
                },
            };
            self.ctx
                .add_item(&param.name, Item::Type(ty.clone()))
                .map_err(|_| {
                    Self::err(
                        Category::Variable,
                        &param.span,
                        format!("'{}' is already defined in the current scope!", param.name),
                    )
                })?;
            self.execute_generic_tests(&param.bounds, &ty, &param.name)?;
            bound.push((param.name.clone(), ty));
        }
        Ok(bound)
    }

    /// Run where-clause predicates against a bound generic type.
    pub(crate) fn execute_generic_tests(
        &mut self,
        bounds: &[ast::TypeRef],
        ty: &Type,
        name: &str,
    ) -> SemaResult<()> {
        for bound in bounds {
            if let ast::TypeRefKind::Name { path, generics } = &bound.kind {
                if generics.is_empty() && path.len() == 1 && path[0] == "Sized" {
                    if !ty.is_sized() {
                        return Err(Self::err(
                            Category::Type,
                            &bound.span,
                            format!(
                                "Generic '{}' does not satisfy 'Sized': '{}' is not sized",
                                name,
                                ty.pretty()
                            ),
                        ));
                    }
                    continue;
                }
            }

            let predicate = self.transform_type(bound)?;
            let Type::Interface(interface) = predicate.collapse() else {
                return Err(Self::err(
                    Category::Type,
                    &bound.span,
                    format!(
                        "Where-clause predicates must name interfaces, found '{}'",
                        predicate.pretty()
                    ),
                ));
            };

            let implements = match ty.collapse() {
                Type::Defined(def) => self
                    .types
                    .interface(&interface.uuid)
                    .is_some_and(|l| l.implementors.iter().any(|u| u == &def.uuid)),
                _ => false,
            };
            if !implements {
                return Err(Self::err(
                    Category::Type,
                    &bound.span,
                    format!(
                        "Type '{}' does not implement '{}' (required by generic '{}')",
                        ty.pretty(),
                        predicate.pretty(),
                        name
                    ),
                ));
            }
        }
        Ok(())
    }
}
