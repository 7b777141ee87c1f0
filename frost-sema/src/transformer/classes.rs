// Class, struct and interface construction: inheritance, field merging,
// interface implementation, vtable assignment, and the synthesized
// assignment operators every user type receives.

use std::rc::Rc;

use super::{SemaResult, Transformer};
use crate::cache::{TypeDeclAst, TypeStore};
use crate::item::Item;
use frost_ast as ast;
use frost_diagnostics::{Category, Span};
use frost_ir::{
    ops, ClassField, ClassLayout, DefinedRef, FunctionType, InterfaceLayout, InterfaceMember,
    InterfaceRef, MemberKind, Type,
};

impl Transformer {
    /// Build a class/struct/interface instantiation on first request.
    pub(crate) fn transform_class(
        &mut self,
        store: &TypeStore,
        def: &ast::ClassDef,
        generic_args: Vec<Type>,
    ) -> SemaResult<Type> {
        let previous = self.ctx.swap_state(&store.state);
        self.ctx.push_scope();
        let backup_class = self.ctx.current_class.take();

        let result = if def.is_interface {
            self.transform_interface_inner(store, def, generic_args)
        } else {
            self.transform_class_inner(store, def, generic_args)
        };

        self.ctx.current_class = backup_class;
        self.ctx.pop_scope();
        self.ctx.restore_state(previous);
        result
    }

    fn transform_interface_inner(
        &mut self,
        store: &TypeStore,
        def: &ast::ClassDef,
        generic_args: Vec<Type>,
    ) -> SemaResult<Type> {
        let instance_uuid = format!(
            "{}:{}",
            store.uuid,
            self.cache.instantiation_count(&store.uuid)
        );
        let ty = Type::Interface(InterfaceRef {
            uuid: instance_uuid.clone(),
            name: def.name.clone(),
            module: self.module_unique(),
        });
        self.cache.add_transformed_type(&store.uuid, ty.clone());
        self.bind_self(&ty, &def.span)?;
        self.bind_generic_params(&def.generics, &generic_args)?;

        let mut members = Vec::new();
        for field in &def.fields {
            let declared = self.required_field_type(field, "interfaces")?;
            let field_ty = self.transform_sized_type(&declared, "Interface fields")?;
            members.push(InterfaceMember {
                name: field.name.clone(),
                ty: field_ty,
                kind: MemberKind::Field,
            });
        }
        for method in &def.methods {
            let signature = self.method_signature(method)?;
            members.push(InterfaceMember {
                name: method.name.clone(),
                ty: Type::Function(signature),
                kind: MemberKind::Method,
            });
        }

        self.types.insert_interface(InterfaceLayout {
            uuid: instance_uuid,
            name: def.name.clone(),
            module: self.ctx.module,
            members,
            implementors: Vec::new(),
        });
        Ok(ty)
    }

    fn transform_class_inner(
        &mut self,
        store: &TypeStore,
        def: &ast::ClassDef,
        generic_args: Vec<Type>,
    ) -> SemaResult<Type> {
        let instance_uuid = format!(
            "{}:{}",
            store.uuid,
            self.cache.instantiation_count(&store.uuid)
        );
        let ty = Type::Defined(DefinedRef {
            uuid: instance_uuid.clone(),
            name: def.name.clone(),
            module: self.module_unique(),
            generics: generic_args.clone(),
        });

        // Register the shell before touching fields or the parent so
        // self-referential members resolve through the cache.
        self.types.insert_class(ClassLayout {
            uuid: instance_uuid.clone(),
            name: def.name.clone(),
            module: self.ctx.module,
            fields: Vec::new(),
            parent: None,
            generics: generic_args.clone(),
            interfaces: Vec::new(),
            is_struct: def.is_struct,
            has_constructor: false,
            has_vtable: false,
            vtable_names: Vec::new(),
            vtable: Vec::new(),
            privacy: def.privacy,
        });
        self.cache.add_transformed_type(&store.uuid, ty.clone());
        self.bind_self(&ty, &def.span)?;
        self.bind_generic_params(&def.generics, &generic_args)?;

        // Parent must be a sized defined type; interfaces go through
        // `implements`.
        let mut parent_layout: Option<ClassLayout> = None;
        if let Some(parent_ref) = &def.parent {
            let parent = self.transform_sized_type(parent_ref, "Parent types")?;
            match parent.collapse() {
                Type::Defined(p) => {
                    parent_layout = self.types.class(&p.uuid);
                }
                _ => {
                    return Err(Self::err(
                        Category::Type,
                        &parent_ref.span,
                        format!("Can't inherit from '{}'", parent.pretty()),
                    )
                    .with_info("This is not a class nor a struct type!")
                    .with_note(
                        "Classes can only inherit from other classes or structs, \
                         so inheriting from a primitive type is not possible.",
                    )
                    .with_help(
                        "If trying to implement from an interface, use the \
                         `implements` keyword instead.",
                    ));
                }
            }
        }

        self.ctx.current_class = Some(ty.clone());

        // Nested type aliases become cache entries under the class uuid
        for alias in &def.type_aliases {
            let uuid = format!("{}.{}", instance_uuid, alias.name);
            self.cache.register_type(
                &uuid,
                TypeDeclAst::Alias(Rc::new(alias.clone())),
                self.ctx.snapshot(),
            );
        }

        // Parent fields merge ahead of own fields, preserving order
        let mut fields: Vec<ClassField> = parent_layout
            .as_ref()
            .map(|l| l.fields.clone())
            .unwrap_or_default();
        for field in &def.fields {
            let declared = self.required_field_type(field, "classes")?;
            let field_ty = self.transform_sized_type(&declared, "Class fields")?;
            fields.push(ClassField {
                name: field.name.clone(),
                ty: field_ty,
                privacy: field.privacy,
                default_value: field.value.clone(),
                mutable: field.mutable,
            });
        }
        let parent_uuid = parent_layout.as_ref().map(|l| l.uuid.clone());
        self.types.with_class_mut(&instance_uuid, |layout| {
            layout.fields = fields;
            layout.parent = parent_uuid;
        });

        // Interface implementation: members verified now, vtable slots
        // assigned in interface-declaration order.
        let mut interface_methods: Vec<String> = Vec::new();
        let mut interfaces: Vec<Type> = Vec::new();
        for impl_ref in &def.impls {
            let interface_ty = self.transform_type(impl_ref)?;
            let Type::Interface(interface) = interface_ty.collapse().clone() else {
                return Err(Self::err(
                    Category::Type,
                    &impl_ref.span,
                    format!("'{}' is not an interface!", interface_ty.pretty()),
                ));
            };
            let Some(interface_layout) = self.types.interface(&interface.uuid) else {
                return Err(Self::err(
                    Category::CompilerBug,
                    &impl_ref.span,
                    format!("interface layout missing for '{}'", interface.name),
                ));
            };

            for member in &interface_layout.members {
                match member.kind {
                    MemberKind::Field => {
                        let matches = self
                            .types
                            .class(&instance_uuid)
                            .is_some_and(|l| l.fields.iter().any(|f| f.name == member.name));
                        if !matches {
                            return Err(Self::err(
                                Category::Type,
                                &impl_ref.span,
                                format!(
                                    "Class '{}' is missing field '{}' required by interface '{}'!",
                                    def.name, member.name, interface.name
                                ),
                            ));
                        }
                    }
                    MemberKind::Method => {
                        if !def.methods.iter().any(|m| m.name == member.name) {
                            return Err(Self::err(
                                Category::Type,
                                &impl_ref.span,
                                format!(
                                    "Class '{}' does not implement method '{}' required by \
                                     interface '{}'!",
                                    def.name, member.name, interface.name
                                ),
                            ));
                        }
                        if !interface_methods.contains(&member.name) {
                            interface_methods.push(member.name.clone());
                        }
                    }
                }
            }

            self.types.with_interface_mut(&interface.uuid, |layout| {
                if !layout.implementors.contains(&instance_uuid) {
                    layout.implementors.push(instance_uuid.clone());
                }
            });
            interfaces.push(interface_ty);
        }
        self.types.with_class_mut(&instance_uuid, |layout| {
            layout.interfaces = interfaces;
        });

        if def.is_struct && !def.methods.is_empty() {
            return Err(Self::err(
                Category::Syntax,
                &def.span,
                format!("Struct '{}' cannot declare methods!", def.name),
            ));
        }

        // Vtable: interface methods first, then remaining virtuals in
        // source order; an override keeps its ancestor's slot.
        let mut vtable_names: Vec<String> = parent_layout
            .as_ref()
            .map(|l| l.vtable_names.clone())
            .unwrap_or_default();
        for name in &interface_methods {
            if !vtable_names.contains(name) {
                vtable_names.push(name.clone());
            }
        }
        for method in &def.methods {
            if (method.is_virtual || method.is_override) && !vtable_names.contains(&method.name) {
                vtable_names.push(method.name.clone());
            }
        }
        let ancestors_have_vtable = parent_layout.as_ref().is_some_and(|l| l.has_vtable)
            || parent_layout
                .as_ref()
                .and_then(|l| l.parent.clone())
                .map(|uuid| self.ancestor_chain_has_vtable(&uuid))
                .unwrap_or(false);
        let has_vtable = !vtable_names.is_empty() || ancestors_have_vtable;
        let vtable_len = vtable_names.len();
        self.types.with_class_mut(&instance_uuid, |layout| {
            layout.has_vtable = has_vtable;
            layout.vtable_names = vtable_names;
            layout.vtable = vec![None; vtable_len];
        });

        // Constructor policy: declared wins, then an inheritable parent
        // constructor, then a synthesized zero-initializing default.
        let is_builtin = def.attributes.has(ast::Attribute::Builtin);
        let declares_ctor = def.methods.iter().any(|m| m.name == ops::CONSTRUCTOR);
        let parent_has_ctor = parent_layout
            .as_ref()
            .is_some_and(|l| !l.is_struct && l.has_constructor);
        let mut synthesized_ctor = None;
        if !def.is_struct && !is_builtin && !declares_ctor && !parent_has_ctor {
            synthesized_ctor = Some(self.synthesize_default_constructor(&def.span));
        }
        self.types.with_class_mut(&instance_uuid, |layout| {
            layout.has_constructor = declares_ctor || parent_has_ctor || synthesized_ctor.is_some();
        });

        // Method registration runs in two passes, like the module-level
        // walk: declare everything, then generate bodies.
        let mut methods: Vec<ast::FunctionDef> = Vec::new();
        if !is_builtin {
            methods.extend(self.synthesize_equalizers(&def.span));
        }
        if let Some(ctor) = synthesized_ctor {
            methods.push(ctor);
        }
        methods.extend(def.methods.iter().cloned());

        let backup_generate = self.ctx.generate_function;
        let methods_result = (|| {
            self.ctx.generate_function = false;
            for method in &methods {
                self.trans_function_def(method)?;
            }
            self.ctx.generate_function = true;
            for method in &methods {
                self.trans_function_def(method)?;
            }
            Ok(())
        })();
        self.ctx.generate_function = backup_generate;
        methods_result?;

        self.modules
            .get_mut(self.ctx.module)
            .type_info
            .insert(instance_uuid, ty.clone());
        Ok(ty)
    }

    fn bind_self(&mut self, ty: &Type, span: &Span) -> SemaResult<()> {
        self.ctx
            .add_item("Self", Item::Type(ty.clone()))
            .map_err(|_| {
                Self::err(Category::Variable, span, "'Self' is already defined here!")
            })
    }

    fn ancestor_chain_has_vtable(&self, uuid: &str) -> bool {
        let mut current = Some(uuid.to_string());
        while let Some(u) = current {
            match self.types.class(&u) {
                Some(layout) => {
                    if layout.has_vtable {
                        return true;
                    }
                    current = layout.parent;
                }
                None => break,
            }
        }
        false
    }

    /// Class and interface fields must carry an explicit declared type.
    fn required_field_type(
        &self,
        field: &ast::VariableDecl,
        context: &str,
    ) -> SemaResult<ast::TypeRef> {
        field.ty.clone().ok_or_else(|| {
            Self::err(Category::Syntax, &field.span, "Can't infer type!")
                .with_info("The type of this variable can't be inferred!")
                .with_note(format!("This rule only applies to variables inside {}.", context))
                .with_help(
                    "Give the field an explicit type, for example:\n   let a: i32 = 10",
                )
        })
    }

    fn method_signature(&mut self, method: &ast::FunctionDef) -> SemaResult<FunctionType> {
        let args = method
            .params
            .iter()
            .map(|p| self.transform_type(&p.ty))
            .collect::<SemaResult<Vec<_>>>()?;
        let ret = match &method.ret {
            Some(r) => self.transform_type(r)?,
            None => Type::Void,
        };
        Ok(FunctionType {
            args,
            ret: Box::new(ret),
            variadic: method.is_variadic,
            mutable: method.is_mutable,
        })
    }

    /// The default `=` operator, with value-taking and reference-taking
    /// overloads.
    fn synthesize_equalizers(&self, span: &Span) -> Vec<ast::FunctionDef> {
        let assign = ops::identifier_for("=");
        let mut out = Vec::new();
        for by_reference in [false, true] {
            let mut func = ast::FunctionDef::new(&assign, span.clone());
            let self_ref = ast::TypeRef::name("Self", span.clone());
            let param_ty = if by_reference {
                ast::TypeRef {
                    kind: ast::TypeRefKind::Reference {
                        inner: Box::new(self_ref),
                        mutable: false,
                    },
                    span: span.clone(),
                }
            } else {
                self_ref
            };
            func.params = vec![ast::Param {
                name: "other".to_string(),
                ty: param_ty,
                default: None,
            }];
            func.ret = None;
            func.attributes.add(ast::Attribute::Builtin, ast::AttributeArgs::new());
            out.push(func);
        }
        out
    }

    fn synthesize_default_constructor(&self, span: &Span) -> ast::FunctionDef {
        let mut ctor = ast::FunctionDef::new(ops::CONSTRUCTOR, span.clone());
        ctor.ret = Some(ast::TypeRef::name("Self", span.clone()));
        ctor.is_static = true;
        ctor.attributes.add(ast::Attribute::Builtin, ast::AttributeArgs::new());
        ctor
    }
}
