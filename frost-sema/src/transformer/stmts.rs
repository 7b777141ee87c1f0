// Statement lowering and top-level declaration registration.

use std::rc::Rc;

use super::{SemaResult, Transformer};
use crate::cache::TypeDeclAst;
use crate::item::Item;
use frost_ast as ast;
use frost_diagnostics::Category;
use frost_ir::{CatchIr, Func, FuncId, Module, PatternCaseIr, Type, Value, ValueKind};

impl Transformer {
    pub(crate) fn trans_stmt(&mut self, stmt: &ast::Statement) -> SemaResult<Option<Value>> {
        match stmt {
            // Declarations drive their own two-phase behavior
            ast::Statement::FunctionDef(f) => {
                self.trans_function_def(f)?;
                Ok(None)
            }
            ast::Statement::ClassDef(c) => {
                self.declare_type_stmt(&c.name, TypeDeclAst::Class(Rc::new(c.clone())), &c.span)?;
                Ok(None)
            }
            ast::Statement::TypeAlias(a) => {
                self.declare_type_stmt(&a.name, TypeDeclAst::Alias(Rc::new(a.clone())), &a.span)?;
                Ok(None)
            }
            ast::Statement::EnumDef(e) => {
                self.declare_type_stmt(&e.name, TypeDeclAst::Enum(Rc::new(e.clone())), &e.span)?;
                Ok(None)
            }
            ast::Statement::MacroDef(m) => {
                self.declare_macro(m)?;
                Ok(None)
            }
            ast::Statement::Import(i) => {
                self.transform_import(i)?;
                Ok(None)
            }
            ast::Statement::Namespace(n) => {
                self.trans_namespace(n)?;
                Ok(None)
            }

            // Executable statements are only built during body synthesis;
            // at module scope they wait for the generate phase and land in
            // the module initializer.
            ast::Statement::VariableDecl(v) => {
                if !self.ctx.generate_function {
                    return Ok(None);
                }
                let value = self.trans_var_decl(v)?;
                if self.ctx.current_function.is_none() {
                    self.append_to_module_ctor(value);
                    return Ok(None);
                }
                Ok(Some(value))
            }
            ast::Statement::Conditional(c) => self.executable(|t| t.trans_conditional(c)),
            ast::Statement::WhileLoop(w) => self.executable(|t| t.trans_while(w)),
            ast::Statement::Switch(s) => self.executable(|t| t.trans_switch(s)),
            ast::Statement::TryCatch(t) => self.executable(|x| x.trans_try_catch(t)),
            ast::Statement::Return(r) => self.executable(|t| t.trans_return(r)),
            ast::Statement::Throw(th) => self.executable(|t| {
                let value = t.trans_expr(&th.value)?;
                Ok(t.builder.throw(th.span.clone(), value))
            }),
            ast::Statement::LoopFlow(lf) => self.executable(|t| {
                Ok(t.builder.loop_flow(lf.span.clone(), lf.kind))
            }),
            ast::Statement::Block(b) => self.executable(|t| t.trans_block(b)),
            ast::Statement::Expression(e) => self.executable(|t| t.trans_expr(e)),
        }
    }

    fn executable(
        &mut self,
        f: impl FnOnce(&mut Self) -> SemaResult<Value>,
    ) -> SemaResult<Option<Value>> {
        if !self.ctx.generate_function {
            return Ok(None);
        }
        f(self).map(Some)
    }

    pub(crate) fn trans_block(&mut self, block: &ast::Block) -> SemaResult<Value> {
        self.ctx.push_scope();
        let mut values = Vec::new();
        let mut failure = None;
        for stmt in &block.statements {
            match self.trans_stmt(stmt) {
                Ok(Some(value)) => values.push(value),
                Ok(None) => {}
                Err(diag) => {
                    failure = Some(diag);
                    break;
                }
            }
        }
        self.ctx.pop_scope();
        if let Some(diag) = failure {
            return Err(diag);
        }
        Ok(self.builder.block(block.span.clone(), values))
    }

    /// Variable declaration: the declared type is inferred from the
    /// initializer when omitted; without an initializer the type must be
    /// explicit and the slot defaults to zero-initialized.
    fn trans_var_decl(&mut self, decl: &ast::VariableDecl) -> SemaResult<Value> {
        let span = decl.span.clone();
        let declared = match &decl.ty {
            Some(r) => Some(self.transform_sized_type(r, "Variables")?),
            None => None,
        };

        let init = match &decl.value {
            Some(expr) => {
                let value = self.trans_expr(expr)?;
                match &declared {
                    Some(target) => {
                        let found_ty = value.ty.pretty();
                        Some(self.adapt_value_to(value, target).ok_or_else(|| {
                            Self::err(
                                Category::Type,
                                &span,
                                format!(
                                    "expected '{}' but found '{}'",
                                    target.pretty(),
                                    found_ty
                                ),
                            )
                        })?)
                    }
                    None => Some(value),
                }
            }
            None => {
                let ty = declared.clone().ok_or_else(|| {
                    Self::err(
                        Category::Syntax,
                        &span,
                        format!(
                            "Variable '{}' needs an explicit type when it has no value!",
                            decl.name
                        ),
                    )
                })?;
                Some(self.builder.zero_initialized(span.clone(), ty))
            }
        };

        let value_ty = init
            .as_ref()
            .map(|v| v.ty.clone())
            .or_else(|| declared.clone())
            .unwrap_or(Type::Void);
        let variable =
            self.builder
                .variable(span.clone(), &decl.name, value_ty, decl.mutable, false);
        self.ctx
            .add_item(&decl.name, Item::Value(variable))
            .map_err(|_| {
                Self::err(
                    Category::Variable,
                    &span,
                    format!("'{}' is already defined in the current scope!", decl.name),
                )
            })?;

        Ok(self
            .builder
            .variable_decl(span, &decl.name, declared, init, decl.mutable))
    }

    fn trans_conditional(&mut self, node: &ast::Conditional) -> SemaResult<Value> {
        let condition = self.trans_expr(&node.condition)?;
        let condition = self.get_boolean_value(condition)?;
        let then_block = self.trans_block(&node.then_block)?;
        let else_block = match &node.else_block {
            Some(block) => Some(self.trans_block(block)?),
            None => None,
        };
        Ok(self
            .builder
            .conditional(node.span.clone(), condition, then_block, else_block))
    }

    fn trans_while(&mut self, node: &ast::WhileLoop) -> SemaResult<Value> {
        self.ctx.push_scope();
        let result = (|| {
            let condition = self.trans_expr(&node.condition)?;
            let condition = self.get_boolean_value(condition)?;
            let body = self.trans_block(&node.body)?;
            match &node.step {
                Some(step) => {
                    let step = self.trans_expr(step)?;
                    Ok(self
                        .builder
                        .from_for_loop(node.span.clone(), condition, body, step))
                }
                None => Ok(self.builder.while_loop(
                    node.span.clone(),
                    condition,
                    body,
                    node.is_do_while,
                )),
            }
        })();
        self.ctx.pop_scope();
        result
    }

    /// Return must match the enclosing function's return type, modulo
    /// implicit reference addition/removal.
    fn trans_return(&mut self, node: &ast::Return) -> SemaResult<Value> {
        let span = node.span.clone();
        let current = self.ctx.current_function.ok_or_else(|| {
            Self::err(Category::Syntax, &span, "'return' outside of a function!")
        })?;
        let ret_ty = self.funcs.get(current).ret.clone();
        let is_constructor = self.funcs.get(current).is_constructor();

        match &node.value {
            Some(expr) => {
                let value = self.trans_expr(expr)?;
                let found_ty = value.ty.pretty();
                let adapted = self.adapt_value_to(value, &ret_ty).ok_or_else(|| {
                    Self::err(
                        Category::Type,
                        &span,
                        format!("expected '{}' but found '{}'", ret_ty.pretty(), found_ty),
                    )
                })?;
                Ok(self.builder.ret(span, Some(adapted)))
            }
            None => {
                if !ret_ty.equals(&Type::Void) && !is_constructor {
                    return Err(Self::err(
                        Category::Type,
                        &span,
                        format!(
                            "Function with return type '{}' must return a value!",
                            ret_ty.pretty()
                        ),
                    ));
                }
                Ok(self.builder.ret(span, None))
            }
        }
    }

    fn trans_try_catch(&mut self, node: &ast::TryCatch) -> SemaResult<Value> {
        let block = self.trans_block(&node.block)?;

        let mut catches = Vec::new();
        for clause in &node.catches {
            let Some(declared) = &clause.var.ty else {
                return Err(Self::err(
                    Category::Syntax,
                    &clause.var.span,
                    "Catch variables must have a concrete declared type!",
                ));
            };
            let ty = self.transform_sized_type(declared, "Catch variables")?;

            self.ctx.push_scope();
            let result = (|| {
                let variable = self.builder.variable(
                    clause.var.span.clone(),
                    &clause.var.name,
                    ty.clone(),
                    clause.var.mutable,
                    false,
                );
                self.ctx
                    .add_item(&clause.var.name, Item::Value(variable))
                    .map_err(|_| {
                        Self::err(
                            Category::Variable,
                            &clause.var.span,
                            format!(
                                "'{}' is already defined in the current scope!",
                                clause.var.name
                            ),
                        )
                    })?;
                let var_decl = self.builder.variable_decl(
                    clause.var.span.clone(),
                    &clause.var.name,
                    Some(ty.clone()),
                    None,
                    clause.var.mutable,
                );
                let body = self.trans_block(&clause.block)?;
                Ok(CatchIr {
                    var: Box::new(var_decl),
                    body,
                })
            })();
            self.ctx.pop_scope();
            catches.push(result?);
        }

        Ok(self.builder.try_catch(node.span.clone(), block, catches))
    }

    /// Pattern switches are exhaustive over the scrutinee's enum
    /// variants; C-style switches dispatch over integral expressions.
    fn trans_switch(&mut self, node: &ast::Switch) -> SemaResult<Value> {
        let span = node.span.clone();
        let scrutinee = self.trans_expr(&node.value)?;

        match &node.kind {
            ast::SwitchKind::Pattern { cases } => {
                let Type::Enum(e) = scrutinee.ty.collapse().clone() else {
                    return Err(Self::err(
                        Category::Type,
                        &span,
                        format!(
                            "Pattern switch requires an enum value, found '{}'!",
                            scrutinee.ty.pretty()
                        ),
                    ));
                };
                let layout = self.types.enum_layout(&e.uuid).ok_or_else(|| {
                    Self::err(Category::CompilerBug, &span, "enum layout missing")
                })?;

                for variant in &layout.variants {
                    if !cases.iter().any(|c| c.variant == variant.name) {
                        return Err(Self::err(
                            Category::Type,
                            &span,
                            format!("Switch is missing a case for variant '{}'!", variant.name),
                        )
                        .with_help("pattern switches must be exhaustive"));
                    }
                }

                let mut ir_cases = Vec::new();
                for case in cases {
                    let variant = layout
                        .variants
                        .iter()
                        .find(|v| v.name == case.variant)
                        .ok_or_else(|| {
                            Self::err(
                                Category::Type,
                                &case.span,
                                format!(
                                    "'{}' is not a variant of '{}'!",
                                    case.variant,
                                    scrutinee.ty.pretty()
                                ),
                            )
                        })?;
                    if variant.payload.len() != case.bindings.len() {
                        return Err(Self::err(
                            Category::Type,
                            &case.span,
                            format!(
                                "Variant '{}' carries {} value(s) but {} binding(s) were given!",
                                variant.name,
                                variant.payload.len(),
                                case.bindings.len()
                            ),
                        ));
                    }

                    self.ctx.push_scope();
                    let body = (|| {
                        for (name, ty) in case.bindings.iter().zip(&variant.payload) {
                            let value = self.builder.variable(
                                case.span.clone(),
                                name,
                                ty.clone(),
                                false,
                                false,
                            );
                            self.ctx.add_item(name, Item::Value(value)).map_err(|_| {
                                Self::err(
                                    Category::Variable,
                                    &case.span,
                                    format!("'{}' is already defined in the current scope!", name),
                                )
                            })?;
                        }
                        self.trans_block(&case.block)
                    })();
                    self.ctx.pop_scope();

                    ir_cases.push(PatternCaseIr {
                        variant: case.variant.clone(),
                        bindings: case.bindings.clone(),
                        body: body?,
                    });
                }

                Ok(self.builder.switch_pattern(span, scrutinee, ir_cases))
            }
            ast::SwitchKind::CStyle { cases, default } => {
                if !matches!(scrutinee.ty.collapse(), Type::Int { .. }) {
                    return Err(Self::err(
                        Category::Type,
                        &span,
                        format!(
                            "C-style switch requires an integral value, found '{}'!",
                            scrutinee.ty.pretty()
                        ),
                    ));
                }

                let mut ir_cases = Vec::new();
                for (expr, block) in cases {
                    let case_value = self.trans_expr(expr)?;
                    if !matches!(case_value.ty.collapse(), Type::Int { .. }) {
                        return Err(Self::err(
                            Category::Type,
                            expr.span(),
                            format!(
                                "Switch cases must be integral, found '{}'!",
                                case_value.ty.pretty()
                            ),
                        ));
                    }
                    let body = self.trans_block(block)?;
                    ir_cases.push((case_value, body));
                }
                let default = match default {
                    Some(block) => Some(self.trans_block(block)?),
                    None => None,
                };
                Ok(self.builder.switch_c_style(span, scrutinee, ir_cases, default))
            }
        }
    }

    /// Namespaces create (or reopen) a nested module whose uniqueness
    /// derives from the enclosing module's UUID plus the namespace name.
    fn trans_namespace(&mut self, node: &ast::Namespace) -> SemaResult<()> {
        let uuid = self.node_uuid(&node.name);

        if !self.ctx.generate_function {
            if self.ctx.in_current_scope(&node.name) {
                return Err(Self::err(
                    Category::Variable,
                    &node.span,
                    format!(
                        "Namespace '{}' is already defined in the current scope!",
                        node.name
                    ),
                ));
            }

            let display = {
                let current = self.modules.get(self.ctx.module);
                if current.is_main {
                    node.name.clone()
                } else {
                    format!("{}::{}", current.name, node.name)
                }
            };
            let mut module = Module::new(&display, &uuid);
            module.source_path = self.modules.get(self.ctx.module).source_path.clone();
            let module_id = self.modules.add(module);
            self.cache.add_module(&uuid, module_id);

            self.ctx.uuid_stack.push(self.module_unique());
            let backup = self.ctx.module;
            self.ctx.module = module_id;
            self.ctx.push_scope();
            self.transform_top_level(&node.body);
            self.ctx.pop_scope();
            self.ctx.module = backup;
            self.ctx.uuid_stack.pop();

            self.ctx
                .add_item(&node.name, Item::Module(module_id))
                .map_err(|_| {
                    Self::err(
                        Category::Variable,
                        &node.span,
                        format!("'{}' is already defined in the current scope!", node.name),
                    )
                })?;
        } else {
            let module_id = self.cache.module(&uuid).ok_or_else(|| {
                Self::err(
                    Category::CompilerBug,
                    &node.span,
                    format!("namespace module '{}' missing from the cache", node.name),
                )
            })?;
            self.ctx.uuid_stack.push(self.module_unique());
            let backup = self.ctx.module;
            self.ctx.module = module_id;
            self.ctx.push_scope();
            self.transform_top_level(&node.body);
            self.ctx.pop_scope();
            self.ctx.module = backup;
            self.ctx.uuid_stack.pop();
        }
        Ok(())
    }

    fn declare_type_stmt(
        &mut self,
        name: &str,
        decl: TypeDeclAst,
        span: &frost_diagnostics::Span,
    ) -> SemaResult<()> {
        if self.ctx.generate_function {
            return Ok(());
        }
        let uuid = self.node_uuid(name);
        if self.cache.type_store(&uuid).is_some() {
            return Err(Self::err(
                Category::Variable,
                span,
                format!("Type '{}' is already defined!", name),
            ));
        }
        self.cache.register_type(&uuid, decl, self.ctx.snapshot());
        log::trace!("declared type '{}' under {}", name, uuid);
        Ok(())
    }

    fn declare_macro(&mut self, node: &ast::MacroDef) -> SemaResult<()> {
        if self.ctx.generate_function {
            return Ok(());
        }
        let uuid = self.node_uuid(&node.name);
        self.cache.add_macro(&uuid, node.clone());
        self.ctx
            .add_item(&node.name, Item::Macro(node.clone()))
            .map_err(|_| {
                Self::err(
                    Category::Variable,
                    &node.span,
                    format!("'{}' is already defined in the current scope!", node.name),
                )
            })?;
        if node.attributes.has(ast::Attribute::Export) {
            self.modules
                .get_mut(self.ctx.module)
                .exported_macros
                .insert(node.name.clone(), node.clone());
        }
        Ok(())
    }

    /// Module-scope variable declarations collect into a synthetic
    /// initializer that runs before `main`.
    fn append_to_module_ctor(&mut self, value: Value) {
        let module_id = self.ctx.module;
        let ctor = self.modules.get(module_id).global_ctor;
        let ctor = match ctor {
            Some(id) => id,
            None => {
                let span = value.span.clone();
                let func = Func {
                    id: FuncId(0),
                    identifier: "$ctor".to_string(),
                    module: module_id,
                    module_prefix: self.module_unique(),
                    parent_type: None,
                    args: Vec::new(),
                    ret: Type::Void,
                    body: Some(self.builder.block(span.clone(), Vec::new())),
                    llvm_body: None,
                    rendered_ir: None,
                    symbols: Vec::new(),
                    generics: Vec::new(),
                    virtual_index: None,
                    privacy: ast::Privacy::Private,
                    is_static: true,
                    is_extern: false,
                    is_anon: true,
                    is_variadic: false,
                    is_mutable: false,
                    parent_scope: None,
                    uses_parent_scope: false,
                    attributes: ast::Attributes::new(),
                    external_name: None,
                    span,
                };
                let id = self.funcs.add(func);
                let module = self.modules.get_mut(module_id);
                module.global_ctor = Some(id);
                module.add_function(id);
                id
            }
        };

        if let Some(body) = &mut self.funcs.get_mut(ctor).body {
            if let ValueKind::Block(values) = &mut body.kind {
                values.push(value);
            }
        }
    }
}
