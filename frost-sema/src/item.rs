// Scope items: what a name can resolve to on the stack.

use std::collections::VecDeque;

use frost_ast as ast;
use frost_ir::{FuncId, ModuleId, Type, Value};

/// One named entry in a lexical scope. Function items hold every
/// already-instantiated overload sharing the name, so a single stack slot
/// can answer an overloaded lookup.
#[derive(Debug, Clone)]
pub enum Item {
    Value(Value),
    Type(Type),
    Functions(VecDeque<FuncId>),
    Module(ModuleId),
    Macro(ast::MacroDef),
    /// Unresolved AST alias, re-resolved at each use site
    Alias(ast::Expression),
}

impl Item {
    pub fn function(id: FuncId) -> Self {
        Item::Functions(VecDeque::from([id]))
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Item::Value(_))
    }

    pub fn is_type(&self) -> bool {
        matches!(self, Item::Type(_))
    }

    pub fn is_functions(&self) -> bool {
        matches!(self, Item::Functions(_))
    }

    pub fn is_module(&self) -> bool {
        matches!(self, Item::Module(_))
    }

    pub fn is_macro(&self) -> bool {
        matches!(self, Item::Macro(_))
    }

    /// Merge a newly instantiated overload into a function item.
    pub fn add_function(&mut self, id: FuncId) {
        if let Item::Functions(funcs) = self {
            funcs.push_front(id);
        }
    }
}
