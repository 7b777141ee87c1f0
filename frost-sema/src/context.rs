// The transformer context: a stack of lexical scopes plus the state that
// tracks where in the program the walk currently is. Cross-module lookup
// goes through the UUID override stack.

use std::collections::HashMap;
use std::rc::Rc;

use crate::item::Item;
use frost_ir::{FuncId, ModuleId, ModuleRegistry, Type};

pub type Scope = HashMap<String, Item>;

/// Declaration-site state captured into cache entries, restored when a
/// stored function or type is later instantiated.
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    pub scopes: Vec<Scope>,
    pub module: ModuleId,
    pub current_class: Option<Type>,
}

#[derive(Debug)]
pub struct Context {
    scopes: Vec<Scope>,
    pub module: ModuleId,
    pub current_function: Option<FuncId>,
    pub current_class: Option<Type>,
    /// Two-phase control bit: off while discovering declarations, on
    /// while synthesizing bodies
    pub generate_function: bool,
    /// UUID override stack for cross-module lookup
    pub uuid_stack: Vec<String>,
    /// Functions registered by `allow_for_test` / `allow_for_bench`
    pub test_functions: Vec<FuncId>,
    pub bench_functions: Vec<FuncId>,
}

impl Context {
    pub fn new(module: ModuleId) -> Self {
        Self {
            scopes: vec![Scope::new()],
            module,
            current_function: None,
            current_class: None,
            generate_function: false,
            uuid_stack: Vec::new(),
            test_functions: Vec::new(),
            bench_functions: Vec::new(),
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Current nesting depth; recorded on lambdas for capture lowering.
    pub fn scope_index(&self) -> usize {
        self.scopes.len()
    }

    /// Add an item to the innermost scope. Two function items under one
    /// name merge into a single overload set; any other collision is
    /// rejected.
    pub fn add_item(&mut self, name: &str, item: Item) -> Result<(), ()> {
        let scope = match self.scopes.last_mut() {
            Some(s) => s,
            None => return Err(()),
        };
        match scope.get_mut(name) {
            None => {
                scope.insert(name.to_string(), item);
                Ok(())
            }
            Some(existing) if existing.is_functions() && item.is_functions() => {
                if let Item::Functions(new) = item {
                    for id in new {
                        existing.add_function(id);
                    }
                }
                Ok(())
            }
            Some(_) => Err(()),
        }
    }

    /// Innermost-out lookup.
    pub fn get_item(&self, name: &str) -> Option<&Item> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    pub fn in_current_scope(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|s| s.contains_key(name))
    }

    /// Names visible from here, for "did you mean" suggestions.
    pub fn visible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .scopes
            .iter()
            .flat_map(|s| s.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// UUID of `name` as declared from the current module.
    pub fn create_identifier_name(&self, modules: &ModuleRegistry, name: &str) -> String {
        format!("{}.{}", modules.get(self.module).unique_name, name)
    }

    pub fn snapshot(&self) -> Rc<ContextSnapshot> {
        Rc::new(ContextSnapshot {
            scopes: self.scopes.clone(),
            module: self.module,
            current_class: self.current_class.clone(),
        })
    }

    /// Swap in a captured state; returns the previous one so callers can
    /// restore it on every exit path.
    pub fn swap_state(&mut self, state: &ContextSnapshot) -> ContextSnapshot {
        let previous = ContextSnapshot {
            scopes: std::mem::replace(&mut self.scopes, state.scopes.clone()),
            module: std::mem::replace(&mut self.module, state.module),
            current_class: std::mem::replace(&mut self.current_class, state.current_class.clone()),
        };
        previous
    }

    pub fn restore_state(&mut self, state: ContextSnapshot) {
        self.scopes = state.scopes;
        self.module = state.module;
        self.current_class = state.current_class;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frost_ir::Type;

    #[test]
    fn test_shadowing_restores_outer_binding() {
        let mut ctx = Context::new(ModuleId(0));
        ctx.add_item("x", Item::Type(Type::I32)).unwrap();

        ctx.push_scope();
        ctx.add_item("x", Item::Type(Type::Bool)).unwrap();
        assert!(matches!(ctx.get_item("x"), Some(Item::Type(Type::Bool))));

        ctx.pop_scope();
        assert!(matches!(ctx.get_item("x"), Some(Item::Type(Type::I32))));
    }

    #[test]
    fn test_duplicate_name_in_scope_is_rejected() {
        let mut ctx = Context::new(ModuleId(0));
        ctx.add_item("x", Item::Type(Type::I32)).unwrap();
        assert!(ctx.add_item("x", Item::Type(Type::Bool)).is_err());
    }

    #[test]
    fn test_function_items_merge() {
        let mut ctx = Context::new(ModuleId(0));
        ctx.add_item("f", Item::function(frost_ir::FuncId(0))).unwrap();
        ctx.add_item("f", Item::function(frost_ir::FuncId(1))).unwrap();
        match ctx.get_item("f") {
            Some(Item::Functions(funcs)) => assert_eq!(funcs.len(), 2),
            other => panic!("expected function set, got {:?}", other),
        }
    }

    #[test]
    fn test_state_swap_round_trip() {
        let mut ctx = Context::new(ModuleId(0));
        ctx.add_item("only_here", Item::Type(Type::I32)).unwrap();
        let captured = ctx.snapshot();

        ctx.push_scope();
        ctx.add_item("later", Item::Type(Type::Bool)).unwrap();

        let previous = ctx.swap_state(&captured);
        assert!(ctx.get_item("later").is_none());
        assert!(ctx.get_item("only_here").is_some());

        ctx.restore_state(previous);
        assert!(ctx.get_item("later").is_some());
    }
}
