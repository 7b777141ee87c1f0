// Function calls: candidate collection, overload resolution with
// implicit conversions, generic deduction, and final argument adaptation.

use std::collections::HashMap;

use super::{Found, SemaResult, Transformer};
use crate::cache::FunctionStore;
use frost_ast as ast;
use frost_diagnostics::{Category, Span};
use frost_ir::{Callee, FuncId, Type, Value};

/// Conversion cost of one argument: lower is better. The order encodes
/// the ranking rule: exact > widening > reference addition > variadic.
const RANK_EXACT: usize = 0;
const RANK_WIDEN: usize = 1;
const RANK_REF: usize = 2;
const RANK_VARIADIC: usize = 3;

#[derive(Debug, Clone)]
enum Candidate {
    Done(FuncId),
    Store(FunctionStore),
}

/// A candidate's deduced calling signature.
struct Signature {
    params: Vec<Type>,
    defaults: usize,
    variadic: bool,
    takes_self: bool,
    generics: Vec<(String, Type)>,
}

impl Transformer {
    /// Resolve a candidate set against argument types (§ overload
    /// resolution). `args` excludes `self`; `self_value` marks a member
    /// call. The winner is instantiated when it was a generic store.
    pub(crate) fn resolve_overload(
        &mut self,
        span: &Span,
        found: Found,
        name: &str,
        self_value: Option<&Value>,
        args: &[Value],
        explicit_generics: &[ast::TypeRef],
    ) -> SemaResult<FuncId> {
        let explicit: Vec<Type> = explicit_generics
            .iter()
            .map(|g| self.transform_type(g))
            .collect::<SemaResult<_>>()?;

        let mut candidates: Vec<Candidate> = Vec::new();
        if let Some(funcs) = &found.functions {
            for id in funcs {
                if !candidates
                    .iter()
                    .any(|c| matches!(c, Candidate::Done(existing) if existing == id))
                {
                    candidates.push(Candidate::Done(*id));
                }
            }
        }
        if let Some(stores) = &found.overloads {
            for store in stores {
                candidates.push(Candidate::Store(store.clone()));
            }
        }

        let arg_types: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();
        let arg_lvalues: Vec<bool> = args.iter().map(Value::is_lvalue).collect();

        let mut best: Option<(usize, Candidate, Signature)> = None;
        let mut ambiguous = false;

        for candidate in candidates.clone() {
            let signature = match &candidate {
                Candidate::Done(id) => self.done_signature(*id),
                Candidate::Store(store) => {
                    // Skip stores whose chosen instantiation is already a
                    // Done candidate; it represents them.
                    match self.deduce_store_signature(store, &explicit, &arg_types)? {
                        Some(sig) => {
                            let key: String = sig
                                .generics
                                .iter()
                                .map(|(_, t)| t.mangle())
                                .collect::<Vec<_>>()
                                .join(",");
                            if let Some(done) = self.cache.instantiation(store.id, &key) {
                                if candidates
                                    .iter()
                                    .any(|c| matches!(c, Candidate::Done(d) if *d == done))
                                {
                                    continue;
                                }
                            }
                            sig
                        }
                        None => continue,
                    }
                }
            };

            let score = match self.rank_candidate(
                &signature,
                self_value,
                &arg_types,
                &arg_lvalues,
            ) {
                Some(score) => score,
                None => continue,
            };

            match &best {
                Some((best_score, _, _)) if score > *best_score => {}
                Some((best_score, _, _)) if score == *best_score => ambiguous = true,
                _ => {
                    ambiguous = false;
                    best = Some((score, candidate, signature));
                }
            }
        }

        let (_, winner, signature) = best.ok_or_else(|| {
            let arg_list: Vec<String> = arg_types.iter().map(Type::pretty).collect();
            Self::err(
                Category::Type,
                span,
                format!("No matching overload found for call to '{}'!", name),
            )
            .with_note(format!("argument types: ({})", arg_list.join(", ")))
        })?;

        if ambiguous {
            return Err(Self::err(
                Category::Type,
                span,
                format!("Call to '{}' is ambiguous!", name),
            )
            .with_note("more than one overload matches these argument types equally well"));
        }

        match winner {
            Candidate::Done(id) => Ok(id),
            Candidate::Store(store) => self.instantiate_function(&store, signature.generics),
        }
    }

    /// Single-candidate resolution for a generic identifier used as a
    /// value: explicit generics fully determine the instantiation.
    pub(crate) fn resolve_by_generics(
        &mut self,
        span: &Span,
        found: Found,
        name: &str,
        explicit_generics: &[ast::TypeRef],
    ) -> SemaResult<FuncId> {
        let explicit: Vec<Type> = explicit_generics
            .iter()
            .map(|g| self.transform_type(g))
            .collect::<SemaResult<_>>()?;

        if let Some(stores) = &found.overloads {
            if stores.len() == 1 {
                let store = stores[0].clone();
                let mut generics = Vec::new();
                for (i, param) in store.ast.generics.iter().enumerate() {
                    match explicit.get(i) {
                        Some(ty) => generics.push((param.name.clone(), ty.clone())),
                        None => {
                            return Err(Self::err(
                                Category::Type,
                                span,
                                format!(
                                    "Could not infer generic '{}' for '{}'!",
                                    param.name, name
                                ),
                            ));
                        }
                    }
                }
                return self.instantiate_function(&store, generics);
            }
        }
        if let Some(funcs) = &found.functions {
            if funcs.len() == 1 && found.overloads.as_ref().map_or(true, |o| o.is_empty()) {
                return Ok(funcs[0]);
            }
        }
        Err(Self::err(
            Category::Type,
            span,
            format!("Reference to '{}' is ambiguous without arguments!", name),
        ))
    }

    fn done_signature(&self, id: FuncId) -> Signature {
        let func = self.funcs.get(id);
        Signature {
            params: func.args.iter().map(|a| a.ty.clone()).collect(),
            defaults: func.default_arg_count(),
            variadic: func.is_variadic,
            takes_self: func.parent_type.is_some() && !func.is_static,
            generics: func.generics.clone(),
        }
    }

    /// Deduce a store's signature: bind explicit generics, unify the rest
    /// from argument types, then transform the parameter types inside the
    /// declaration-site state. `None` prunes the candidate.
    fn deduce_store_signature(
        &mut self,
        store: &FunctionStore,
        explicit: &[Type],
        arg_types: &[Type],
    ) -> SemaResult<Option<Signature>> {
        let node = store.ast.clone();

        let mut map: HashMap<String, Type> = HashMap::new();
        let generic_names: Vec<&str> =
            node.generics.iter().map(|g| g.name.as_str()).collect();
        for (i, param) in node.generics.iter().enumerate() {
            if let Some(ty) = explicit.get(i) {
                map.insert(param.name.clone(), ty.clone());
            }
        }
        for (param, arg_ty) in node.params.iter().zip(arg_types) {
            match_type_param(&param.ty, arg_ty, &generic_names, &mut map);
        }

        let mut generics: Vec<(String, Type)> = Vec::new();
        for param in &node.generics {
            match map.get(&param.name) {
                Some(ty) => generics.push((param.name.clone(), ty.clone())),
                None if param.default.is_some() => {}
                None => return Ok(None),
            }
        }

        // Transform parameter types under the captured state with the
        // deduced generics bound.
        let previous = self.ctx.swap_state(&store.state);
        self.ctx.push_scope();
        let outcome = (|| -> SemaResult<Option<Signature>> {
            for (name, ty) in &generics {
                let _ = self
                    .ctx
                    .add_item(name, crate::item::Item::Type(ty.clone()));
            }
            for param in &node.generics {
                if !generics.iter().any(|(n, _)| n == &param.name) {
                    let Some(default) = &param.default else {
                        return Ok(None);
                    };
                    let ty = self.transform_type(default)?;
                    let _ = self
                        .ctx
                        .add_item(&param.name, crate::item::Item::Type(ty.clone()));
                }
            }

            let takes_self = self.ctx.current_class.is_some()
                && !node.is_static
                && node.name != frost_ir::ops::CONSTRUCTOR;
            let mut params = Vec::new();
            if takes_self {
                let class = self.ctx.current_class.clone().unwrap_or(Type::Void);
                params.push(self.types.reference_to(class, node.is_mutable));
            }
            for param in &node.params {
                match self.transform_type(&param.ty) {
                    Ok(ty) => params.push(ty),
                    // An unresolvable parameter type prunes the candidate
                    Err(_) => return Ok(None),
                }
            }

            let defaults = node
                .params
                .iter()
                .rev()
                .take_while(|p| p.default.is_some())
                .count();
            Ok(Some(Signature {
                params,
                defaults,
                variadic: node.is_variadic,
                takes_self,
                generics,
            }))
        })();
        self.ctx.pop_scope();
        self.ctx.restore_state(previous);
        outcome
    }

    /// Total conversion cost, or `None` when the candidate cannot accept
    /// these arguments.
    fn rank_candidate(
        &self,
        signature: &Signature,
        self_value: Option<&Value>,
        arg_types: &[Type],
        arg_lvalues: &[bool],
    ) -> Option<usize> {
        let mut provided: Vec<(Type, bool)> = Vec::new();
        if signature.takes_self {
            let base = self_value?;
            provided.push((base.ty.clone(), base.is_lvalue()));
        }
        provided.extend(
            arg_types
                .iter()
                .cloned()
                .zip(arg_lvalues.iter().copied()),
        );

        let params = &signature.params;
        let min_required = params.len().saturating_sub(signature.defaults);
        if provided.len() < min_required {
            return None;
        }
        if provided.len() > params.len() && !signature.variadic {
            return None;
        }

        let mut score = 0;
        for (i, (arg_ty, is_lvalue)) in provided.iter().enumerate() {
            match params.get(i) {
                Some(param_ty) => score += rank_conversion(self, arg_ty, *is_lvalue, param_ty)?,
                None => score += RANK_VARIADIC,
            }
        }
        Some(score)
    }

    /// Materialize a resolved call: thread `self`, adapt every argument,
    /// evaluate defaults for omitted trailing parameters, pass variadic
    /// extras through.
    pub(crate) fn finish_call(
        &mut self,
        span: &Span,
        func: FuncId,
        self_value: Option<Value>,
        args: Vec<Value>,
    ) -> SemaResult<Value> {
        let callee = self.funcs.get(func);
        let params = callee.args.clone();
        let ret = callee.ret.clone();
        let takes_self = callee.parent_type.is_some() && !callee.is_static;
        let is_inline_ir = callee.llvm_body.is_some()
            || callee.attributes.has(ast::Attribute::LlvmFunc);

        if is_inline_ir {
            let caller_is_unsafe = self
                .ctx
                .current_function
                .map(|id| self.funcs.get(id).attributes.has(ast::Attribute::Unsafe))
                .unwrap_or(false);
            if !caller_is_unsafe {
                return Err(Self::err(
                    Category::Attribute,
                    span,
                    "Calling an inline-IR function requires an 'unsafe' context!",
                ));
            }
        }

        let mut provided: Vec<Value> = Vec::new();
        if takes_self {
            let base = self_value.ok_or_else(|| {
                Self::err(
                    Category::Type,
                    span,
                    "Member functions need an instance to be called on!",
                )
            })?;
            provided.push(base);
        }
        provided.extend(args);

        let mut final_args = Vec::new();
        let mut provided_iter = provided.into_iter();
        for param in &params {
            match provided_iter.next() {
                Some(value) => {
                    let found = value.ty.pretty();
                    let adapted = self.adapt_value_to(value, &param.ty).ok_or_else(|| {
                        Self::err(
                            Category::Type,
                            span,
                            format!(
                                "expected '{}' but found '{}'",
                                param.ty.pretty(),
                                found
                            ),
                        )
                    })?;
                    final_args.push(adapted);
                }
                None => {
                    let default = param.default.clone().ok_or_else(|| {
                        Self::err(
                            Category::Type,
                            span,
                            format!("missing argument for parameter '{}'", param.name),
                        )
                    })?;
                    let value = self.trans_expr(&default)?;
                    let found = value.ty.pretty();
                    let adapted = self.adapt_value_to(value, &param.ty).ok_or_else(|| {
                        Self::err(
                            Category::Type,
                            span,
                            format!(
                                "expected '{}' but found '{}'",
                                param.ty.pretty(),
                                found
                            ),
                        )
                    })?;
                    final_args.push(adapted);
                }
            }
        }
        // variadic extras
        final_args.extend(provided_iter);

        Ok(self
            .builder
            .call(span.clone(), Callee::Func(func), final_args, ret))
    }

    /// Lower a `FunctionCall` expression.
    pub(crate) fn transform_call(&mut self, call: &ast::FunctionCall) -> SemaResult<Value> {
        let span = call.span.clone();
        match call.callee.as_ref() {
            ast::Expression::Identifier(ident) => {
                let found = self.get_from_identifier_node(ident)?;
                self.call_found(&span, found, &ident.name, None, call, &ident.generics, true)
            }
            ast::Expression::Index(index) => {
                let result = self.get_from_index(index)?;
                if let Some((enum_ty, variant)) = result.found.enum_variant.clone() {
                    return self.build_enum_init(&span, enum_ty, &variant, &call.args);
                }
                self.call_found(
                    &span,
                    result.found,
                    &index.identifier.name,
                    result.base_value,
                    call,
                    &index.identifier.generics,
                    result.accept_private,
                )
            }
            other => {
                let callee = self.trans_expr(other)?;
                self.indirect_call(&span, callee, &call.args)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn call_found(
        &mut self,
        span: &Span,
        found: Found,
        name: &str,
        base_value: Option<Value>,
        call: &ast::FunctionCall,
        generics: &[ast::TypeRef],
        accept_private: bool,
    ) -> SemaResult<Value> {
        if found.has_functions() {
            let args = call
                .args
                .iter()
                .map(|a| self.trans_expr(a))
                .collect::<SemaResult<Vec<_>>>()?;
            let func =
                self.resolve_overload(span, found, name, base_value.as_ref(), &args, generics)?;

            let callee = self.funcs.get(func);
            if callee.privacy == ast::Privacy::Private && !accept_private {
                return Err(Self::err(
                    Category::Variable,
                    span,
                    format!("'{}' is a private method and cannot be accessed from here!", name),
                ));
            }

            return self.finish_call(span, func, base_value, args);
        }

        if let Some(value) = found.value {
            return self.indirect_call(span, value, &call.args);
        }

        Err(Self::err(
            Category::Type,
            span,
            format!("'{}' is not callable!", name),
        ))
    }

    fn indirect_call(
        &mut self,
        span: &Span,
        callee: Value,
        args: &[ast::Expression],
    ) -> SemaResult<Value> {
        let Type::Function(fn_ty) = callee.ty.collapse().clone() else {
            return Err(Self::err(
                Category::Type,
                span,
                format!("Cannot call a value of type '{}'!", callee.ty.pretty()),
            ));
        };

        let provided = args
            .iter()
            .map(|a| self.trans_expr(a))
            .collect::<SemaResult<Vec<_>>>()?;
        if provided.len() != fn_ty.args.len() && !fn_ty.variadic {
            return Err(Self::err(
                Category::Type,
                span,
                format!(
                    "This function takes {} argument(s) but {} were supplied!",
                    fn_ty.args.len(),
                    provided.len()
                ),
            ));
        }

        let mut final_args = Vec::new();
        for (i, value) in provided.into_iter().enumerate() {
            match fn_ty.args.get(i) {
                Some(param_ty) => {
                    let found_ty = value.ty.pretty();
                    let adapted = self.adapt_value_to(value, param_ty).ok_or_else(|| {
                        Self::err(
                            Category::Type,
                            span,
                            format!("expected '{}' but found '{}'", param_ty.pretty(), found_ty),
                        )
                    })?;
                    final_args.push(adapted);
                }
                None => final_args.push(value),
            }
        }

        let ret = fn_ty.ret.as_ref().clone();
        Ok(self
            .builder
            .call(span.clone(), Callee::Indirect(Box::new(callee)), final_args, ret))
    }

    pub(crate) fn build_enum_init(
        &mut self,
        span: &Span,
        enum_ty: Type,
        variant: &str,
        args: &[ast::Expression],
    ) -> SemaResult<Value> {
        let Type::Enum(e) = enum_ty.collapse().clone() else {
            return Err(Self::err(Category::CompilerBug, span, "enum-init on a non-enum"));
        };
        let layout = self.types.enum_layout(&e.uuid).ok_or_else(|| {
            Self::err(Category::CompilerBug, span, "enum layout missing")
        })?;
        let payload = layout
            .variants
            .iter()
            .find(|v| v.name == variant)
            .map(|v| v.payload.clone())
            .ok_or_else(|| {
                Self::err(
                    Category::Type,
                    span,
                    format!("'{}' is not a variant of '{}'!", variant, enum_ty.pretty()),
                )
            })?;

        if payload.len() != args.len() {
            return Err(Self::err(
                Category::Type,
                span,
                format!(
                    "Variant '{}' takes {} argument(s) but {} were supplied!",
                    variant,
                    payload.len(),
                    args.len()
                ),
            ));
        }

        let mut values = Vec::new();
        for (arg, expected) in args.iter().zip(&payload) {
            let value = self.trans_expr(arg)?;
            let found_ty = value.ty.pretty();
            let adapted = self.adapt_value_to(value, expected).ok_or_else(|| {
                Self::err(
                    Category::Type,
                    span,
                    format!("expected '{}' but found '{}'", expected.pretty(), found_ty),
                )
            })?;
            values.push(adapted);
        }

        Ok(self.builder.enum_init(span.clone(), enum_ty, variant, values))
    }
}

/// Unify one parameter's source type against a canonical argument type to
/// bind generic names (first binding wins).
fn match_type_param(
    param: &ast::TypeRef,
    arg: &Type,
    generic_names: &[&str],
    map: &mut HashMap<String, Type>,
) {
    match &param.kind {
        ast::TypeRefKind::Name { path, generics } if path.len() == 1 => {
            let name = &path[0];
            if generics.is_empty() && generic_names.contains(&name.as_str()) {
                map.entry(name.clone()).or_insert_with(|| arg.clone());
                return;
            }
            // Recurse into matching nominal generics: Box<T> vs Box<i32>
            let arg_generics: &[Type] = match arg.collapse() {
                Type::Defined(d) if &d.name == name => &d.generics,
                Type::Enum(e) if &e.name == name => &e.generics,
                _ => return,
            };
            for (p, a) in generics.iter().zip(arg_generics) {
                match_type_param(p, a, generic_names, map);
            }
        }
        ast::TypeRefKind::Pointer { inner, .. } => {
            if let Type::Pointer { inner: arg_inner, .. } = arg.collapse() {
                match_type_param(inner, arg_inner, generic_names, map);
            }
        }
        ast::TypeRefKind::Reference { inner, .. } => {
            if let Type::Reference { inner: arg_inner, .. } = arg.collapse() {
                match_type_param(inner, arg_inner, generic_names, map);
            } else {
                // &T can also bind against a bare T (reference addition)
                match_type_param(inner, arg, generic_names, map);
            }
        }
        ast::TypeRefKind::Function { args, ret, .. } => {
            if let Type::Function(f) = arg.collapse() {
                for (p, a) in args.iter().zip(&f.args) {
                    match_type_param(p, a, generic_names, map);
                }
                match_type_param(ret, &f.ret, generic_names, map);
            }
        }
        _ => {}
    }
}

/// Per-argument conversion rank; `None` means no legal conversion.
fn rank_conversion(
    transformer: &Transformer,
    arg: &Type,
    arg_is_lvalue: bool,
    param: &Type,
) -> Option<usize> {
    if arg.equals(param) {
        return Some(RANK_EXACT);
    }

    // direct supertype of a defined argument type
    if let (Type::Defined(arg_def), Type::Defined(param_def)) =
        (arg.collapse(), param.collapse())
    {
        if transformer.types.is_descendant_of(&arg_def.uuid, &param_def.uuid) {
            return Some(RANK_WIDEN);
        }
    }

    // integer widening, same signedness, destination at least as wide
    if let (
        Type::Int { bits: from, signed: fs },
        Type::Int { bits: to, signed: ts },
    ) = (arg.collapse(), param.collapse())
    {
        if fs == ts && to >= from {
            return Some(RANK_WIDEN);
        }
    }

    // reference addition (lvalues only) and removal
    if let Type::Reference { inner, .. } = param.collapse() {
        if arg_is_lvalue && arg.equals(inner) {
            return Some(RANK_REF);
        }
    }
    if let Type::Reference { inner, .. } = arg.collapse() {
        if inner.equals(param) {
            return Some(RANK_REF);
        }
    }

    // a mutable reference argument satisfies a const reference parameter
    if let (
        Type::Reference { inner: from, mutable: true },
        Type::Reference { inner: to, mutable: false },
    ) = (arg.collapse(), param.collapse())
    {
        if from.equals(to) {
            return Some(RANK_REF);
        }
    }

    None
}
