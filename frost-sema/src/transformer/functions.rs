// Function declaration, on-demand instantiation and body synthesis.

use std::rc::Rc;

use super::{SemaResult, Transformer};
use crate::cache::FunctionStore;
use crate::item::Item;
use frost_ast as ast;
use frost_diagnostics::Category;
use frost_ir::{inline_ir, ops, Func, FuncArg, FuncId, LlvmChunk, Type, Value, ValueKind};

impl Transformer {
    /// Declare-phase: capture the definition into the symbol cache.
    /// Generate-phase: instantiate every non-generic definition (generic
    /// ones wait for their first use).
    pub(crate) fn trans_function_def(&mut self, node: &ast::FunctionDef) -> SemaResult<()> {
        let uuid = self.function_uuid(&node.name);

        if !self.ctx.generate_function {
            self.cache
                .register_function(&uuid, Rc::new(node.clone()), self.ctx.snapshot());
            log::trace!("declared '{}' under {}", node.name, uuid);
            return Ok(());
        }

        if node.is_generic() {
            return Ok(());
        }

        let stores = self.cache.function(&uuid).cloned().unwrap_or_default();
        for store in &stores {
            if store.ast.as_ref() == node {
                self.instantiate_function(store, Vec::new())?;
                return Ok(());
            }
        }

        Err(Self::err(
            Category::CompilerBug,
            &node.span,
            format!("function '{}' was never declared", node.name),
        ))
    }

    /// UUID a function's cache entry lives under: the enclosing class
    /// instantiation when there is one, the module path otherwise.
    pub(crate) fn function_uuid(&self, name: &str) -> String {
        match &self.ctx.current_class {
            Some(Type::Defined(d)) => format!("{}.{}", d.uuid, name),
            Some(other) => format!("{}.{}", other.pretty(), name),
            None => self.node_uuid(name),
        }
    }

    /// Re-enter a stored definition's declaration-site state and build
    /// the function with the given generic bindings. Idempotent per
    /// (store, generics) pair.
    pub(crate) fn instantiate_function(
        &mut self,
        store: &FunctionStore,
        generics: Vec<(String, Type)>,
    ) -> SemaResult<FuncId> {
        let generics_key: String = generics
            .iter()
            .map(|(_, t)| t.mangle())
            .collect::<Vec<_>>()
            .join(",");
        if let Some(existing) = self.cache.instantiation(store.id, &generics_key) {
            return Ok(existing);
        }

        log::debug!(
            "instantiating '{}' from {} ({} generic binding(s))",
            store.ast.name,
            store.uuid,
            generics.len()
        );

        let node = store.ast.clone();
        let previous = self.ctx.swap_state(&store.state);
        self.ctx.push_scope();
        let result = self.instantiate_inner(store, &node, generics, &generics_key);
        self.ctx.pop_scope();
        self.ctx.restore_state(previous);
        result
    }

    fn instantiate_inner(
        &mut self,
        store: &FunctionStore,
        node: &ast::FunctionDef,
        generics: Vec<(String, Type)>,
        generics_key: &str,
    ) -> SemaResult<FuncId> {
        // Bind deduced generics, evaluate defaults for the rest, and run
        // every where-clause predicate.
        let mut full_generics: Vec<(String, Type)> = Vec::new();
        for param in &node.generics {
            let ty = match generics.iter().find(|(n, _)| n == &param.name) {
                Some((_, ty)) => ty.clone(),
                None => match &param.default {
                    Some(default) => self.transform_type(default)?,
                    None => {
                        return Err(Self::err(
                            Category::Type,
                            &param.span,
                            format!(
                                "Could not infer generic '{}' for '{}'!",
                                param.name, node.name
                            ),
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
            full_generics.push((param.name.clone(), ty));
        }

        let parent_type = self.ctx.current_class.clone();
        let is_constructor = node.name == ops::CONSTRUCTOR && parent_type.is_some();

        let mut args: Vec<FuncArg> = Vec::new();
        if let Some(parent) = &parent_type {
            if !node.is_static && !is_constructor {
                let self_ty = self.types.reference_to(parent.clone(), node.is_mutable);
                args.push(FuncArg {
                    name: "self".to_string(),
                    ty: self_ty,
                    default: None,
                });
            }
        }
        for param in &node.params {
            args.push(FuncArg {
                name: param.name.clone(),
                ty: self.transform_type(&param.ty)?,
                default: param.default.clone(),
            });
        }

        let ret = match &node.ret {
            Some(r) => self.transform_type(r)?,
            None if is_constructor => parent_type.clone().unwrap_or(Type::Void),
            None => Type::Void,
        };

        let is_builtin = node.attributes.has(ast::Attribute::Builtin);
        let is_llvm = matches!(node.body, ast::FunctionBody::LlvmIr(_))
            || node.attributes.has(ast::Attribute::LlvmFunc);
        let is_extern = matches!(node.body, ast::FunctionBody::Extern);

        let func = Func {
            id: FuncId(0),
            identifier: node.name.clone(),
            module: self.ctx.module,
            module_prefix: self.module_unique(),
            parent_type: parent_type.clone(),
            args,
            ret,
            body: None,
            llvm_body: None,
            rendered_ir: None,
            symbols: Vec::new(),
            generics: full_generics,
            virtual_index: None,
            privacy: node.privacy,
            is_static: node.is_static || is_constructor,
            is_extern,
            is_anon: false,
            is_variadic: node.is_variadic,
            is_mutable: node.is_mutable,
            parent_scope: None,
            uses_parent_scope: false,
            attributes: node.attributes.clone(),
            external_name: node.external_name.clone(),
            span: node.span.clone(),
        };
        let id = self.funcs.add(func);

        // Virtual-table slot: overrides keep the ancestor's slot
        if let Some(Type::Defined(class)) = &parent_type {
            let slot = self
                .types
                .class(&class.uuid)
                .and_then(|l| l.vtable_names.iter().position(|n| n == &node.name));
            if let Some(slot) = slot {
                self.funcs.get_mut(id).virtual_index = Some(slot);
                self.types.with_class_mut(&class.uuid, |layout| {
                    if slot < layout.vtable.len() {
                        layout.vtable[slot] = Some(id);
                    }
                });
            }
        }

        self.cache.add_transformed_function(&store.uuid, id);
        self.cache
            .remember_instantiation(store.id, generics_key, id);
        self.modules.get_mut(self.ctx.module).add_function(id);

        if node.attributes.has(ast::Attribute::AllowForTest) {
            self.ctx.test_functions.push(id);
        }
        if node.attributes.has(ast::Attribute::AllowForBench) {
            self.ctx.bench_functions.push(id);
        }

        if is_llvm {
            if let ast::FunctionBody::LlvmIr(chunks) = &node.body {
                let mut lowered = Vec::new();
                for chunk in chunks {
                    lowered.push(match chunk {
                        ast::IrChunk::Code(code) => LlvmChunk::Code(code.clone()),
                        ast::IrChunk::TypeAccess(type_ref) => {
                            LlvmChunk::TypeAccess(self.transform_type(type_ref)?)
                        }
                    });
                }
                let rendered =
                    inline_ir::render(&lowered, &self.types, &mut self.emitted_ir_types);
                let func = self.funcs.get_mut(id);
                func.llvm_body = Some(lowered);
                func.rendered_ir = Some(rendered);
            } else {
                return Err(Self::err(
                    Category::Attribute,
                    &node.span,
                    "'llvm_func' requires an inline IR body!",
                ));
            }
        } else if self.ctx.generate_function && !is_builtin && !is_extern {
            if let ast::FunctionBody::Bodied(block) = &node.body {
                self.generate_function_body(id, node, block)?;
            }
        }

        Ok(id)
    }

    /// Build a function body: arguments become scope values, the entry
    /// block's stack slots come from a pre-pass over the declared locals,
    /// and constructors/void functions get their implicit returns.
    fn generate_function_body(
        &mut self,
        id: FuncId,
        node: &ast::FunctionDef,
        block: &ast::Block,
    ) -> SemaResult<()> {
        let backup_function = self.ctx.current_function.replace(id);
        self.ctx.push_scope();

        let result = (|| {
            let args = self.funcs.get(id).args.clone();
            for (i, arg) in args.iter().enumerate() {
                let value = self
                    .builder
                    .argument(node.span.clone(), &arg.name, i, arg.ty.clone());
                self.ctx.add_item(&arg.name, Item::Value(value)).map_err(|_| {
                    Self::err(
                        Category::Variable,
                        &node.span,
                        format!("'{}' is already defined in the current scope!", arg.name),
                    )
                })?;
            }

            let is_constructor = self.funcs.get(id).is_constructor();
            if is_constructor {
                let self_ty = self
                    .funcs
                    .get(id)
                    .parent_type
                    .clone()
                    .unwrap_or(Type::Void);
                let self_value =
                    self.builder
                        .variable(node.span.clone(), "self", self_ty, true, false);
                let _ = self.ctx.add_item("self", Item::Value(self_value));
            }

            let mut body = self.trans_block(block)?;

            let ret_ty = self.funcs.get(id).ret.clone();
            if is_constructor && !body.always_returns() {
                let self_ty = self
                    .funcs
                    .get(id)
                    .parent_type
                    .clone()
                    .unwrap_or(Type::Void);
                let self_value =
                    self.builder
                        .variable(node.span.clone(), "self", self_ty, true, false);
                let ret = self.builder.ret(node.span.clone(), Some(self_value));
                if let ValueKind::Block(values) = &mut body.kind {
                    values.push(ret);
                }
            } else if ret_ty.equals(&Type::Void) && !body.always_returns() {
                let ret = self.builder.ret(node.span.clone(), None);
                if let ValueKind::Block(values) = &mut body.kind {
                    values.push(ret);
                }
            }

            let mut symbols = Vec::new();
            collect_declared_locals(&body, &mut symbols);
            let func = self.funcs.get_mut(id);
            func.symbols = symbols;
            func.body = Some(body);
            Ok(())
        })();

        self.ctx.pop_scope();
        self.ctx.current_function = backup_function;
        result
    }
}

/// Pre-pass for entry-block slot allocation: every local declared
/// anywhere in the body, in source order.
pub(crate) fn collect_declared_locals(value: &Value, out: &mut Vec<(String, Type)>) {
    match &value.kind {
        ValueKind::VariableDecl { name, value: init, .. } => {
            out.push((name.clone(), value.ty.clone()));
            if let Some(init) = init {
                collect_declared_locals(init, out);
            }
        }
        ValueKind::Block(values) => {
            for v in values {
                collect_declared_locals(v, out);
            }
        }
        ValueKind::Conditional {
            condition,
            then_block,
            else_block,
        } => {
            collect_declared_locals(condition, out);
            collect_declared_locals(then_block, out);
            if let Some(e) = else_block {
                collect_declared_locals(e, out);
            }
        }
        ValueKind::WhileLoop {
            condition,
            body,
            step,
            ..
        } => {
            collect_declared_locals(condition, out);
            collect_declared_locals(body, out);
            if let Some(s) = step {
                collect_declared_locals(s, out);
            }
        }
        ValueKind::TryCatch { block, catches } => {
            collect_declared_locals(block, out);
            for c in catches {
                collect_declared_locals(&c.var, out);
                collect_declared_locals(&c.body, out);
            }
        }
        ValueKind::Switch { value: scrutinee, cases } => {
            collect_declared_locals(scrutinee, out);
            match cases {
                frost_ir::SwitchCases::Pattern(cases) => {
                    for c in cases {
                        collect_declared_locals(&c.body, out);
                    }
                }
                frost_ir::SwitchCases::CStyle { cases, default } => {
                    for (_, b) in cases {
                        collect_declared_locals(b, out);
                    }
                    if let Some(d) = default {
                        collect_declared_locals(d, out);
                    }
                }
            }
        }
        _ => {}
    }
}
