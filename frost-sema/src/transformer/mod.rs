// The transformer: a two-phase visitor over every module's AST. Phase A
// registers declarations into the symbol cache without generating bodies;
// phase B walks again and builds them. All user errors travel as
// diagnostic values; recovery is structural (skip the declaration and
// continue with the next one).

mod calls;
mod classes;
mod exprs;
mod functions;
mod import_stmt;
mod lookup;
mod stmts;
mod types;

use std::collections::VecDeque;

use crate::builtins;
use crate::cache::{FunctionStore, SymbolCache};
use crate::context::Context;
use crate::frontend::Frontend;
use crate::imports::ImportDriver;
use frost_ast as ast;
use frost_diagnostics::{Category, Diagnostic, DiagnosticEngine, Span};
use frost_ir::inline_ir::EmittedTypes;
use frost_ir::{
    FuncId, FuncRegistry, IrBuilder, Module, ModuleId, ModuleRegistry, Type, TypeRegistry, Value,
};

pub type SemaResult<T> = Result<T, Diagnostic>;

/// Everything a name lookup can produce. At most one of the function
/// fields is used per resolution path; both can be present when a set of
/// instantiated overloads coexists with un-instantiated generic stores.
#[derive(Debug, Clone, Default)]
pub struct Found {
    pub value: Option<Value>,
    pub ty: Option<Type>,
    pub functions: Option<VecDeque<FuncId>>,
    pub overloads: Option<VecDeque<FunctionStore>>,
    pub module: Option<ModuleId>,
    /// Set when the resolution landed on an enum variant; call sites turn
    /// this into an enum-init with the supplied payload
    pub enum_variant: Option<(Type, String)>,
}

impl Found {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.ty.is_none()
            && self.functions.is_none()
            && self.overloads.is_none()
            && self.module.is_none()
            && self.enum_variant.is_none()
    }

    pub fn has_functions(&self) -> bool {
        self.functions.is_some() || self.overloads.is_some()
    }
}

/// Result of resolving `base.member` / `Base::member`.
#[derive(Debug, Clone, Default)]
pub struct IndexResult {
    pub found: Found,
    /// Whether private members of the base are visible from here
    pub accept_private: bool,
    /// The transformed base, when the base was a value
    pub base_value: Option<Value>,
}

pub struct Transformer {
    pub types: TypeRegistry,
    pub funcs: FuncRegistry,
    pub modules: ModuleRegistry,
    pub cache: SymbolCache,
    pub ctx: Context,
    pub diags: DiagnosticEngine,
    pub imports: ImportDriver,
    pub frontend: Box<dyn Frontend>,
    pub(crate) builder: IrBuilder,
    pub(crate) emitted_ir_types: EmittedTypes,
}

impl Transformer {
    pub fn new(frontend: Box<dyn Frontend>, imports: ImportDriver) -> Self {
        let types = TypeRegistry::new();
        let funcs = FuncRegistry::new();
        let mut modules = ModuleRegistry::new();

        let mut main = Module::new("main", "pkg$main");
        main.is_main = true;
        let main_id = modules.add(main);

        let mut transformer = Self {
            types,
            funcs,
            modules,
            cache: SymbolCache::new(),
            ctx: Context::new(main_id),
            diags: DiagnosticEngine::new(),
            imports,
            frontend,
            builder: IrBuilder::new(),
            emitted_ir_types: EmittedTypes::new(),
        };
        builtins::register(&mut transformer);
        transformer
    }

    pub fn main_module(&self) -> ModuleId {
        self.ctx.module
    }

    /// Run both transformation phases over a parsed file, then the
    /// post-transform analyzers.
    pub fn run(&mut self, file: &ast::File) -> anyhow::Result<()> {
        log::debug!("phase A (declare): {} top-level items", file.len());
        self.ctx.generate_function = false;
        self.transform_top_level(file);

        log::debug!("phase B (generate)");
        self.ctx.generate_function = true;
        self.transform_top_level(file);

        crate::analyzer::run(self);

        if self.diags.has_errors() {
            anyhow::bail!(
                "compilation failed with {} error(s)",
                self.diags.error_count()
            );
        }
        Ok(())
    }

    pub(crate) fn transform_top_level(&mut self, stmts: &[ast::Statement]) {
        for stmt in stmts {
            if self.diags.over_budget() {
                log::warn!("error budget exhausted; giving up on this unit");
                break;
            }
            if let Err(diag) = self.trans_stmt(stmt) {
                self.diags.emit(diag);
            }
        }
    }

    /// UUID of `name` as declared from the current module.
    pub(crate) fn node_uuid(&self, name: &str) -> String {
        self.ctx.create_identifier_name(&self.modules, name)
    }

    pub(crate) fn module_unique(&self) -> String {
        self.modules.get(self.ctx.module).unique_name.clone()
    }

    pub(crate) fn err(category: Category, span: &Span, message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(category, message, span.clone())
    }

    /// Coerce a condition to bool, going through the type's boolean-cast
    /// operator when it has one.
    pub(crate) fn get_boolean_value(&mut self, value: Value) -> SemaResult<Value> {
        if value.ty.equals(&Type::Bool) {
            return Ok(value);
        }
        let span = value.span.clone();
        if let Ok(found) = self.lookup_member_functions(&value.ty, frost_ir::ops::BOOL_CAST, &span) {
            if found.has_functions() {
                let func = self.resolve_overload(
                    &span,
                    found,
                    frost_ir::ops::BOOL_CAST,
                    Some(&value),
                    &[],
                    &[],
                )?;
                return self.finish_call(&span, func, Some(value), Vec::new());
            }
        }
        Err(Self::err(
            Category::Type,
            &span,
            format!("expected 'bool' but found '{}'", value.ty.pretty()),
        ))
    }

    /// Implicitly convert `value` to `target` where the conversion rules
    /// allow it: reference addition for lvalues, reference removal, and
    /// same-signedness integer widening.
    pub(crate) fn adapt_value_to(&mut self, value: Value, target: &Type) -> Option<Value> {
        if value.ty.equals(target) {
            return Some(value);
        }

        // reference addition: T -> &T for an lvalue; a mutable reference
        // additionally needs a mutable place
        if let Type::Reference { inner, mutable } = target.collapse() {
            if value.is_lvalue()
                && value.ty.equals(inner)
                && (!*mutable || value.is_mutable_lvalue())
            {
                let span = value.span.clone();
                let mut reference = self.builder.reference_to(span, value);
                reference.ty = target.clone();
                return Some(reference);
            }
        }

        // a mutable reference decays to a const one
        if let (
            Type::Reference { inner: from, mutable: true },
            Type::Reference { inner: to, mutable: false },
        ) = (value.ty.collapse(), target.collapse())
        {
            if from.equals(to) {
                let mut decayed = value;
                decayed.ty = target.clone();
                return Some(decayed);
            }
        }

        // reference removal
        if value.ty.is_reference() {
            if let Some(inner) = value.ty.inner() {
                if inner.equals(target) {
                    let span = value.span.clone();
                    return self.builder.dereference_to(span, value);
                }
            }
        }

        // integer widening, same signedness only
        if let (
            Type::Int { bits: from, signed: fs },
            Type::Int { bits: to, signed: ts },
        ) = (value.ty.collapse(), target.collapse())
        {
            if fs == ts && to >= from {
                let span = value.span.clone();
                return Some(self.builder.cast(span, value, target.clone()));
            }
        }

        None
    }
}
