// The symbol cache: canonical UUID -> transformable AST definitions and
// their already-instantiated results. UUIDs join the owning module's
// unique name with `.`-separated enclosing names; generic instantiations
// get a monotonically increasing `:<n>` suffix per base name.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::context::ContextSnapshot;
use frost_ast as ast;
use frost_ir::{FuncId, ModuleId, Type};

/// A function's AST plus the state captured at its declaration site.
#[derive(Debug, Clone)]
pub struct FunctionStore {
    pub id: usize,
    pub uuid: String,
    pub ast: Rc<ast::FunctionDef>,
    pub state: Rc<ContextSnapshot>,
}

#[derive(Debug, Clone)]
pub enum TypeDeclAst {
    Class(Rc<ast::ClassDef>),
    Alias(Rc<ast::TypeAliasDef>),
    Enum(Rc<ast::EnumDef>),
}

impl TypeDeclAst {
    pub fn generics(&self) -> &[ast::GenericParam] {
        match self {
            TypeDeclAst::Class(c) => &c.generics,
            TypeDeclAst::Alias(a) => &a.generics,
            TypeDeclAst::Enum(e) => &e.generics,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeDeclAst::Class(c) => &c.name,
            TypeDeclAst::Alias(a) => &a.name,
            TypeDeclAst::Enum(e) => &e.name,
        }
    }
}

/// A type declaration plus its captured declaration-site state.
#[derive(Debug, Clone)]
pub struct TypeStore {
    pub uuid: String,
    pub ast: TypeDeclAst,
    pub state: Rc<ContextSnapshot>,
}

#[derive(Debug, Default)]
pub struct SymbolCache {
    /// Un-instantiated function stores; overloads share a UUID in
    /// declaration order
    functions: HashMap<String, VecDeque<FunctionStore>>,
    /// Already-instantiated functions per UUID
    transformed_functions: HashMap<String, VecDeque<FuncId>>,
    /// Instantiations keyed by (store id, mangled generic arguments)
    instantiated: HashMap<(usize, String), FuncId>,
    /// Type declaration stores
    types: HashMap<String, TypeStore>,
    /// Instantiated types per base UUID, in first-use order
    transformed_types: HashMap<String, Vec<Type>>,
    modules: HashMap<String, ModuleId>,
    macros: HashMap<String, ast::MacroDef>,
    next_store_id: usize,
}

impl SymbolCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- functions ----

    pub fn register_function(
        &mut self,
        uuid: &str,
        ast: Rc<ast::FunctionDef>,
        state: Rc<ContextSnapshot>,
    ) -> usize {
        let id = self.next_store_id;
        self.next_store_id += 1;
        self.functions
            .entry(uuid.to_string())
            .or_default()
            .push_back(FunctionStore {
                id,
                uuid: uuid.to_string(),
                ast,
                state,
            });
        id
    }

    pub fn function(&self, uuid: &str) -> Option<&VecDeque<FunctionStore>> {
        self.functions.get(uuid)
    }

    pub fn add_transformed_function(&mut self, uuid: &str, func: FuncId) {
        self.transformed_functions
            .entry(uuid.to_string())
            .or_default()
            .push_back(func);
    }

    pub fn transformed_function(&self, uuid: &str) -> Option<&VecDeque<FuncId>> {
        self.transformed_functions.get(uuid)
    }

    /// Instantiation memo so transforming the same generic instantiation
    /// twice yields the same function.
    pub fn instantiation(&self, store_id: usize, generics_key: &str) -> Option<FuncId> {
        self.instantiated.get(&(store_id, generics_key.to_string())).copied()
    }

    pub fn remember_instantiation(&mut self, store_id: usize, generics_key: &str, func: FuncId) {
        self.instantiated
            .insert((store_id, generics_key.to_string()), func);
    }

    // ---- types ----

    pub fn register_type(&mut self, uuid: &str, ast: TypeDeclAst, state: Rc<ContextSnapshot>) {
        self.types.insert(
            uuid.to_string(),
            TypeStore {
                uuid: uuid.to_string(),
                ast,
                state,
            },
        );
    }

    pub fn type_store(&self, uuid: &str) -> Option<&TypeStore> {
        self.types.get(uuid)
    }

    pub fn add_transformed_type(&mut self, base_uuid: &str, ty: Type) {
        self.transformed_types
            .entry(base_uuid.to_string())
            .or_default()
            .push(ty);
    }

    pub fn transformed_types(&self, base_uuid: &str) -> Option<&Vec<Type>> {
        self.transformed_types.get(base_uuid)
    }

    /// Suffix for the next instantiation of `base_uuid`.
    pub fn instantiation_count(&self, base_uuid: &str) -> usize {
        self.transformed_types
            .get(base_uuid)
            .map_or(0, |v| v.len())
    }

    // ---- modules ----

    pub fn add_module(&mut self, uuid: &str, module: ModuleId) {
        self.modules.insert(uuid.to_string(), module);
    }

    pub fn module(&self, uuid: &str) -> Option<ModuleId> {
        self.modules.get(uuid).copied()
    }

    // ---- macros ----

    pub fn add_macro(&mut self, uuid: &str, def: ast::MacroDef) {
        self.macros.insert(uuid.to_string(), def);
    }

    pub fn macro_def(&self, uuid: &str) -> Option<&ast::MacroDef> {
        self.macros.get(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use frost_diagnostics::Span;

    #[test]
    fn test_overloads_share_uuid_in_order() {
        let mut cache = SymbolCache::new();
        let ctx = Context::new(ModuleId(0));
        let state = ctx.snapshot();

        let a = Rc::new(ast::FunctionDef::new("f", Span::unknown()));
        let b = Rc::new(ast::FunctionDef::new("f", Span::unknown()));
        cache.register_function("m.f", a, state.clone());
        cache.register_function("m.f", b, state);

        let stored = cache.function("m.f").unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored[0].id < stored[1].id);
    }

    #[test]
    fn test_instantiation_suffix_counts_per_base() {
        let mut cache = SymbolCache::new();
        assert_eq!(cache.instantiation_count("m.A"), 0);
        cache.add_transformed_type("m.A", Type::I32);
        assert_eq!(cache.instantiation_count("m.A"), 1);
        assert_eq!(cache.instantiation_count("m.B"), 0);
    }

    #[test]
    fn test_instantiation_memo() {
        let mut cache = SymbolCache::new();
        assert!(cache.instantiation(0, "i").is_none());
        cache.remember_instantiation(0, "i", FuncId(7));
        assert_eq!(cache.instantiation(0, "i"), Some(FuncId(7)));
        assert!(cache.instantiation(0, "d").is_none());
    }
}
