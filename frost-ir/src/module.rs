// Compiled modules and their registry.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::func::FuncId;
use crate::types::Type;
use frost_ast as ast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub usize);

/// One compiled module. The unique name doubles as the mangling prefix
/// and the root of every UUID minted inside the module.
#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    /// Display name, e.g. `std::io`
    pub name: String,
    /// Unique name / mangling prefix, e.g. `pkg$a1b2c3`
    pub unique_name: String,
    pub source_path: Option<PathBuf>,
    pub is_main: bool,
    /// Functions generated into this module, in creation order
    pub functions: Vec<FuncId>,
    /// Defined types owned by this module: uuid -> type
    pub type_info: HashMap<String, Type>,
    /// Names this module exports, in declaration order
    pub exports: Vec<String>,
    pub exported_macros: HashMap<String, ast::MacroDef>,
    /// Module initializer run before `main`, when one exists
    pub global_ctor: Option<FuncId>,
}

impl Module {
    pub fn new(name: &str, unique_name: &str) -> Self {
        Self {
            id: ModuleId(0),
            name: name.to_string(),
            unique_name: unique_name.to_string(),
            source_path: None,
            is_main: false,
            functions: Vec::new(),
            type_info: HashMap::new(),
            exports: Vec::new(),
            exported_macros: HashMap::new(),
            global_ctor: None,
        }
    }

    pub fn add_function(&mut self, func: FuncId) {
        self.functions.push(func);
    }

    pub fn add_export(&mut self, name: &str) {
        if !self.exports.iter().any(|n| n == name) {
            self.exports.push(name.to_string());
        }
    }
}

/// Id-indexed store of every module in the unit.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<Module>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut module: Module) -> ModuleId {
        let id = ModuleId(self.modules.len());
        module.id = id;
        self.modules.push(module);
        id
    }

    pub fn get(&self, id: ModuleId) -> &Module {
        &self.modules[id.0]
    }

    pub fn get_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_registry_ids() {
        let mut registry = ModuleRegistry::new();
        let a = registry.add(Module::new("main", "pkg$main"));
        let b = registry.add(Module::new("std::io", "std$io"));
        assert_ne!(a, b);
        assert_eq!(registry.get(a).name, "main");
        assert_eq!(registry.get(b).unique_name, "std$io");
    }

    #[test]
    fn test_exports_deduplicate() {
        let mut module = Module::new("main", "pkg$main");
        module.add_export("f");
        module.add_export("f");
        assert_eq!(module.exports.len(), 1);
    }
}
