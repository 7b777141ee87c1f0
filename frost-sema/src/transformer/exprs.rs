// Expression lowering.

use super::{SemaResult, Transformer};
use frost_ast as ast;
use frost_diagnostics::{Category, Span};
use frost_ir::{ops, Func, FuncArg, FuncId, Type, Value, ValueKind};

impl Transformer {
    pub(crate) fn trans_expr(&mut self, expr: &ast::Expression) -> SemaResult<Value> {
        match expr {
            ast::Expression::Constant(c) => self.trans_constant(c),
            ast::Expression::Identifier(ident) => self.trans_identifier(ident),
            ast::Expression::Index(index) => self.trans_index_value(index),
            ast::Expression::BinaryOp(op) => self.trans_binary(op),
            ast::Expression::FunctionCall(call) => self.transform_call(call),
            ast::Expression::NewInstance(new) => self.trans_new_instance(new),
            ast::Expression::Cast(cast) => self.trans_cast(cast),
            ast::Expression::Lambda(lambda) => self.trans_lambda(lambda),
            ast::Expression::PseudoVariable(p) => Err(Self::err(
                Category::Syntax,
                &p.span,
                format!("Pseudo-variable '#{}' is only valid inside macro bodies!", p.name),
            )),
            ast::Expression::TypeRef(r) => Err(Self::err(
                Category::Type,
                &r.span,
                "Can't use types as values!",
            )),
        }
    }

    /// Literal lowering: numeric prefixes and radices, f64 floats, u8
    /// chars, and strings that become runtime string constructions
    /// unless the `b` prefix keeps them as byte pointers.
    fn trans_constant(&mut self, c: &ast::ConstantValue) -> SemaResult<Value> {
        let span = c.span.clone();
        match c.kind {
            ast::ConstantKind::Number => {
                let mut text = c.value.as_str();
                let mut is_unsigned = false;
                let mut is_long = false;
                if let Some(rest) = text.strip_prefix('u') {
                    is_unsigned = true;
                    text = rest;
                }
                if let Some(rest) = text.strip_prefix('l') {
                    is_long = true;
                    text = rest;
                }

                let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                    i64::from_str_radix(hex, 16)
                } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
                    i64::from_str_radix(bin, 2)
                } else if let Some(oct) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
                    i64::from_str_radix(oct, 8)
                } else {
                    text.parse::<i64>()
                };
                let n = parsed.map_err(|_| {
                    Self::err(
                        Category::Syntax,
                        &span,
                        format!("Invalid numeric literal '{}'!", c.value),
                    )
                })?;

                let ty = match (is_unsigned, is_long) {
                    (true, true) => Type::U64,
                    (true, false) => Type::U32,
                    (false, true) => Type::I64,
                    (false, false) => Type::I32,
                };
                Ok(self.builder.constant_int(span, n, ty))
            }
            ast::ConstantKind::Float => {
                let value = c.value.parse::<f64>().map_err(|_| {
                    Self::err(
                        Category::Syntax,
                        &span,
                        format!("Invalid float literal '{}'!", c.value),
                    )
                })?;
                Ok(self.builder.constant_float(span, value))
            }
            ast::ConstantKind::Bool => Ok(self.builder.constant_bool(span, c.value == "true")),
            ast::ConstantKind::Char => {
                let inner = strip_quotes(&c.value);
                let byte = inner.bytes().next().unwrap_or(0);
                Ok(self.builder.constant_char(span, byte))
            }
            ast::ConstantKind::String => self.trans_string_constant(c, span),
        }
    }

    fn trans_string_constant(&mut self, c: &ast::ConstantValue, span: Span) -> SemaResult<Value> {
        let stripped = strip_quotes(&c.value).to_string();
        let raw = self.builder.constant_string(span.clone(), stripped.clone());

        match c.prefix.as_str() {
            "b" => Ok(raw),
            "" => {
                let length = self
                    .builder
                    .constant_int(span.clone(), stripped.len() as i64, Type::U64);

                // Inside the runtime's own modules `String` resolves
                // unqualified; user code goes through `std::String`.
                let base = if self.module_unique().starts_with("std") {
                    ast::Expression::Identifier(ast::Identifier::new("String", span.clone()))
                } else {
                    ast::Expression::Index(ast::Index {
                        base: Box::new(ast::Expression::Identifier(ast::Identifier::new(
                            "std",
                            span.clone(),
                        ))),
                        identifier: ast::Identifier::new("String", span.clone()),
                        is_static: true,
                        span: span.clone(),
                    })
                };
                let index = ast::Index {
                    base: Box::new(base),
                    identifier: ast::Identifier::new("from", span.clone()),
                    is_static: true,
                    span: span.clone(),
                };

                let result = self.get_from_index(&index)?;
                let func = self.resolve_overload(
                    &span,
                    result.found,
                    "String::from",
                    None,
                    &[raw.clone(), length.clone()],
                    &[],
                )?;
                self.finish_call(&span, func, None, vec![raw, length])
            }
            other => Err(Self::err(
                Category::Syntax,
                &span,
                format!("Invalid string prefix '{}'", other),
            )
            .with_info("Invalid prefix")
            .with_note("Valid prefixes are: '', 'b'")),
        }
    }

    fn trans_identifier(&mut self, ident: &ast::Identifier) -> SemaResult<Value> {
        let span = ident.span.clone();
        let found = self.get_from_identifier_node(ident)?;

        if !ident.generics.is_empty() {
            if found.value.is_some() {
                return Err(Self::err(
                    Category::Variable,
                    &span,
                    "Values can't contain generics!",
                ));
            }
            if found.has_functions() {
                // Explicit generics fully determine the instantiation;
                // the result is a function pointer load.
                let func =
                    self.resolve_by_generics(&span, found, &ident.name, &ident.generics)?;
                let fn_ty = self.funcs.get(func).function_type();
                return Ok(self.builder.value_extract(span, func, fn_ty));
            }
            if found.ty.is_some() {
                return Err(Self::err(
                    Category::Variable,
                    &span,
                    "Can't use types as values!",
                ));
            }
            if found.module.is_some() {
                return Err(Self::err(
                    Category::Variable,
                    &span,
                    "Can't use modules as values!",
                ));
            }
        }

        if let Some(value) = found.value {
            return Ok(value);
        }
        if found.has_functions() {
            // A function-set is only a value when fully determined
            let instantiated = found.functions.clone().unwrap_or_default();
            let stores = found.overloads.clone().unwrap_or_default();
            if instantiated.len() == 1 && stores.is_empty() {
                let func = instantiated[0];
                let fn_ty = self.funcs.get(func).function_type();
                return Ok(self.builder.value_extract(span, func, fn_ty));
            }
            if instantiated.is_empty() && stores.len() == 1 && !stores[0].ast.is_generic() {
                let store = stores[0].clone();
                let func = self.instantiate_function(&store, Vec::new())?;
                let fn_ty = self.funcs.get(func).function_type();
                return Ok(self.builder.value_extract(span, func, fn_ty));
            }
            return Err(Self::err(
                Category::Type,
                &span,
                format!("Can't use overloaded function '{}' as a value!", ident.name),
            ));
        }
        if found.ty.is_some() {
            return Err(Self::err(Category::Type, &span, "Can't use types as values!"));
        }
        if found.module.is_some() {
            return Err(Self::err(
                Category::Type,
                &span,
                "Can't use modules as values!",
            ));
        }

        let candidates = self.ctx.visible_names();
        let similar =
            frost_diagnostics::fuzzy::find_similar_names(&ident.name, &candidates, 0.7, 3);
        let mut diag = Self::err(
            Category::Variable,
            &span,
            format!("Cannot find identifier `{}`!", ident.name),
        )
        .with_info("this name is not defined");
        if !similar.is_empty() {
            diag = diag.with_help(format!("did you mean `{}`?", similar.join("`, `")));
        }
        Err(diag)
    }

    fn trans_index_value(&mut self, index: &ast::Index) -> SemaResult<Value> {
        let span = index.span.clone();
        let result = self.get_from_index(index)?;

        if let Some(value) = result.found.value {
            if let ValueKind::IndexExtract { field, .. } = &value.kind {
                self.check_field_privacy(
                    &span,
                    result.base_value.as_ref(),
                    field,
                    result.accept_private,
                )?;
            }
            return Ok(value);
        }
        if result.found.has_functions() {
            return Err(Self::err(
                Category::Type,
                &span,
                format!(
                    "Can't use method '{}' as a value!",
                    ops::nice_name(&index.identifier.name)
                ),
            ));
        }
        if result.found.ty.is_some() {
            return Err(Self::err(Category::Type, &span, "Can't use types as values!"));
        }
        if result.found.module.is_some() {
            return Err(Self::err(
                Category::Type,
                &span,
                "Can't use modules as values!",
            ));
        }
        if let Some((enum_ty, variant)) = result.found.enum_variant {
            return Err(Self::err(
                Category::Type,
                &span,
                format!(
                    "Variant '{}' of '{}' takes arguments!",
                    variant,
                    enum_ty.pretty()
                ),
            ));
        }
        Err(Self::err(
            Category::Variable,
            &span,
            format!("Couldn't resolve '{}'!", index.identifier.name),
        ))
    }

    fn check_field_privacy(
        &self,
        span: &Span,
        base: Option<&Value>,
        field: &str,
        accept_private: bool,
    ) -> SemaResult<()> {
        let Some(base) = base else { return Ok(()) };
        let mut ty = base.ty.collapse().clone();
        if let Type::Reference { inner, .. } = &ty {
            ty = inner.collapse().clone();
        }
        if let Type::Defined(def) = &ty {
            let is_private = self.types.class(&def.uuid).is_some_and(|l| {
                l.fields
                    .iter()
                    .any(|f| f.name == field && f.privacy == ast::Privacy::Private)
            });
            if is_private && !accept_private {
                return Err(Self::err(
                    Category::Variable,
                    span,
                    format!(
                        "'{}' is a private member of '{}' and cannot be accessed from here!",
                        field,
                        ty.pretty()
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Assignments stay structural; every other operator lowers to a call
    /// to the operator method on the left operand's type.
    fn trans_binary(&mut self, node: &ast::BinaryOp) -> SemaResult<Value> {
        let span = node.span.clone();

        if node.op.is_assignment() {
            let target = self.trans_expr(&node.lhs)?;
            if !target.is_mutable_lvalue() {
                return Err(Self::err(
                    Category::Type,
                    &span,
                    "Cannot assign to an immutable value!",
                )
                .with_info("this target is not assignable"));
            }

            let rhs = self.trans_expr(&node.rhs)?;
            let value = match compound_base_op(node.op) {
                Some(base) => {
                    let call = self.lower_operator_call(&span, base, target.clone(), rhs)?;
                    self.builder.operator_call(span.clone(), base, call)
                }
                None => {
                    let found_ty = rhs.ty.pretty();
                    self.adapt_value_to(rhs, &target.ty).ok_or_else(|| {
                        Self::err(
                            Category::Type,
                            &span,
                            format!(
                                "expected '{}' but found '{}'",
                                target.ty.pretty(),
                                found_ty
                            ),
                        )
                    })?
                }
            };
            return Ok(self.builder.assignment(span, node.op, target, value));
        }

        let lhs = self.trans_expr(&node.lhs)?;
        let rhs = self.trans_expr(&node.rhs)?;
        let call = self.lower_operator_call(&span, node.op, lhs, rhs)?;
        Ok(self.builder.operator_call(span, node.op, call))
    }

    pub(crate) fn lower_operator_call(
        &mut self,
        span: &Span,
        op: ast::OpType,
        lhs: Value,
        rhs: Value,
    ) -> SemaResult<Value> {
        let op_ident = ops::identifier_for(op.symbol());
        let found = self.lookup_member_functions(&lhs.ty, &op_ident, span)?;
        if !found.has_functions() {
            return Err(Self::err(
                Category::Type,
                span,
                format!(
                    "Operator '{}' is not defined for type '{}'!",
                    op.symbol(),
                    lhs.ty.pretty()
                ),
            ));
        }
        let args = vec![rhs];
        let func = self.resolve_overload(span, found, &op_ident, Some(&lhs), &args, &[])?;
        self.finish_call(span, func, Some(lhs), args)
    }

    fn trans_cast(&mut self, node: &ast::Cast) -> SemaResult<Value> {
        let span = node.span.clone();
        let value = self.trans_expr(&node.value)?;
        let target = self.transform_sized_type(&node.target, "Cast targets")?;

        let legal = value.ty.equals(&target)
            || (value.ty.is_numeric() && target.is_numeric())
            || (value.ty.is_pointer() && target.is_pointer())
            || (value.ty.is_reference() && target.is_pointer());
        if !legal {
            return Err(Self::err(
                Category::Type,
                &span,
                format!(
                    "Cannot cast from '{}' to '{}'!",
                    value.ty.pretty(),
                    target.pretty()
                ),
            ));
        }
        Ok(self.builder.cast(span, value, target))
    }

    /// `new T(args)` rewrites to the static constructor call and wraps
    /// the result in an object initialization.
    fn trans_new_instance(&mut self, node: &ast::NewInstance) -> SemaResult<Value> {
        let span = node.span.clone();
        let ctor = ast::Identifier::new(ops::CONSTRUCTOR, span.clone());
        let index = ast::Index {
            base: Box::new(ast::Expression::TypeRef(node.ty.clone())),
            identifier: ctor,
            is_static: true,
            span: span.clone(),
        };
        let call = ast::FunctionCall {
            callee: Box::new(ast::Expression::Index(index)),
            args: node.args.clone(),
            span: span.clone(),
        };
        let call_value = self.transform_call(&call)?;
        let ty = self.transform_sized_type(&node.ty, "Instantiated types")?;
        Ok(self.builder.object_init(span, ty, call_value))
    }

    /// Anonymous function: named after its source location, typed as the
    /// runtime function wrapper, linked to its enclosing function.
    fn trans_lambda(&mut self, lambda: &ast::Lambda) -> SemaResult<Value> {
        let span = lambda.span.clone();
        let node = &lambda.func;
        let parent = self.ctx.current_function;

        let ret = match &node.ret {
            Some(r) => self.transform_type(r)?,
            None => Type::Void,
        };
        let name = format!("[{}@{} lambda function]", span.file, span.line);

        let mut args = Vec::new();
        for param in &node.params {
            args.push(FuncArg {
                name: param.name.clone(),
                ty: self.transform_type(&param.ty)?,
                default: param.default.clone(),
            });
        }

        let mut attributes = node.attributes.clone();
        attributes.add(ast::Attribute::InternalLinkage, ast::AttributeArgs::new());

        let func = Func {
            id: FuncId(0),
            identifier: name,
            module: self.ctx.module,
            module_prefix: self.module_unique(),
            parent_type: None,
            args,
            ret,
            body: None,
            llvm_body: None,
            rendered_ir: None,
            symbols: Vec::new(),
            generics: Vec::new(),
            virtual_index: None,
            privacy: ast::Privacy::Private,
            is_static: false,
            is_extern: false,
            is_anon: true,
            is_variadic: node.is_variadic,
            is_mutable: false,
            parent_scope: parent,
            uses_parent_scope: false,
            attributes,
            external_name: None,
            span: span.clone(),
        };
        let id = self.funcs.add(func);
        self.modules.get_mut(self.ctx.module).add_function(id);

        if let ast::FunctionBody::Bodied(block) = &node.body {
            let backup_function = self.ctx.current_function.replace(id);
            self.ctx.push_scope();
            let body_result = (|| {
                let args = self.funcs.get(id).args.clone();
                for (i, arg) in args.iter().enumerate() {
                    let value = self
                        .builder
                        .argument(span.clone(), &arg.name, i, arg.ty.clone());
                    let _ = self.ctx.add_item(&arg.name, crate::item::Item::Value(value));
                }
                self.trans_block(block)
            })();
            self.ctx.pop_scope();
            self.ctx.current_function = backup_function;

            let mut body = body_result?;
            let ret_ty = self.funcs.get(id).ret.clone();
            if ret_ty.equals(&Type::Void) && !body.always_returns() {
                let ret = self.builder.ret(span.clone(), None);
                if let ValueKind::Block(values) = &mut body.kind {
                    values.push(ret);
                }
            }

            let mut bound: Vec<String> =
                self.funcs.get(id).args.iter().map(|a| a.name.clone()).collect();
            let mut locals = Vec::new();
            super::functions::collect_declared_locals(&body, &mut locals);
            bound.extend(locals.into_iter().map(|(n, _)| n));
            let captures = references_outside(&body, &bound);

            let mut symbols = Vec::new();
            super::functions::collect_declared_locals(&body, &mut symbols);
            let func = self.funcs.get_mut(id);
            func.body = Some(body);
            func.symbols = symbols;
            func.uses_parent_scope = captures;
        }

        let fn_ty = self.funcs.get(id).function_type();
        let wrapper = self.function_wrapper_type(Type::Function(fn_ty.clone()));
        let mut value = self.builder.value_extract(span, id, fn_ty);
        value.ty = wrapper;
        Ok(value)
    }
}

fn strip_quotes(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

fn compound_base_op(op: ast::OpType) -> Option<ast::OpType> {
    Some(match op {
        ast::OpType::PlusAssign => ast::OpType::Plus,
        ast::OpType::MinusAssign => ast::OpType::Minus,
        ast::OpType::MulAssign => ast::OpType::Mul,
        ast::OpType::DivAssign => ast::OpType::Div,
        ast::OpType::ModAssign => ast::OpType::Mod,
        _ => return None,
    })
}

/// Whether the body references any variable not bound inside it.
fn references_outside(value: &Value, bound: &[String]) -> bool {
    match &value.kind {
        ValueKind::Variable { name, .. } => !bound.iter().any(|b| b == name),
        ValueKind::VariableDecl { value: init, .. } => init
            .as_ref()
            .map(|v| references_outside(v, bound))
            .unwrap_or(false),
        ValueKind::ReferenceTo(v)
        | ValueKind::DereferenceTo(v)
        | ValueKind::Cast { value: v }
        | ValueKind::ObjectInit { call: v }
        | ValueKind::Throw(v) => references_outside(v, bound),
        ValueKind::IndexExtract { value: v, .. } => references_outside(v, bound),
        ValueKind::Call { callee, args } => {
            let in_callee = match callee {
                frost_ir::Callee::Indirect(v) => references_outside(v, bound),
                frost_ir::Callee::Func(_) => false,
            };
            in_callee || args.iter().any(|a| references_outside(a, bound))
        }
        ValueKind::BinaryOp { lowering, .. } => match lowering {
            frost_ir::BinOpLowering::Assignment { target, value } => {
                references_outside(target, bound) || references_outside(value, bound)
            }
            frost_ir::BinOpLowering::OperatorCall(call) => references_outside(call, bound),
        },
        ValueKind::Conditional {
            condition,
            then_block,
            else_block,
        } => {
            references_outside(condition, bound)
                || references_outside(then_block, bound)
                || else_block
                    .as_ref()
                    .map(|e| references_outside(e, bound))
                    .unwrap_or(false)
        }
        ValueKind::WhileLoop {
            condition,
            body,
            step,
            ..
        } => {
            references_outside(condition, bound)
                || references_outside(body, bound)
                || step
                    .as_ref()
                    .map(|s| references_outside(s, bound))
                    .unwrap_or(false)
        }
        ValueKind::Switch { value: scrutinee, cases } => {
            references_outside(scrutinee, bound)
                || match cases {
                    frost_ir::SwitchCases::Pattern(cases) => {
                        cases.iter().any(|c| references_outside(&c.body, bound))
                    }
                    frost_ir::SwitchCases::CStyle { cases, default } => {
                        cases
                            .iter()
                            .any(|(v, b)| {
                                references_outside(v, bound) || references_outside(b, bound)
                            })
                            || default
                                .as_ref()
                                .map(|d| references_outside(d, bound))
                                .unwrap_or(false)
                    }
                }
        }
        ValueKind::Return(v) => v
            .as_ref()
            .map(|v| references_outside(v, bound))
            .unwrap_or(false),
        ValueKind::TryCatch { block, catches } => {
            references_outside(block, bound)
                || catches.iter().any(|c| references_outside(&c.body, bound))
        }
        ValueKind::Block(values) => values.iter().any(|v| references_outside(v, bound)),
        ValueKind::EnumInit { args, .. } => {
            args.iter().any(|a| references_outside(a, bound))
        }
        _ => false,
    }
}
