// IR functions and their registry.

use serde::{Deserialize, Serialize};

use crate::module::{ModuleId, ModuleRegistry};
use crate::ops;
use crate::types::{mangle_with_prefix, FunctionType, Type};
use crate::value::Value;
use frost_ast as ast;
use frost_diagnostics::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FuncId(pub usize);

/// Suffix every lambda identifier carries; rewritten at mangle time.
pub const LAMBDA_SUFFIX: &str = " lambda function]";
const LAMBDA_MANGLE_TAG: &str = ".$LmbdF";

/// One fragment of an inline low-level IR body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LlvmChunk {
    Code(String),
    TypeAccess(Type),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncArg {
    pub name: String,
    pub ty: Type,
    pub default: Option<ast::Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Func {
    pub id: FuncId,
    pub identifier: String,
    pub module: ModuleId,
    /// Owning module's unique name, used as the mangle base
    pub module_prefix: String,
    /// Defined type owning this method, if any
    pub parent_type: Option<Type>,
    pub args: Vec<FuncArg>,
    pub ret: Type,
    /// `None` for declarations and inline-IR functions
    pub body: Option<Value>,
    pub llvm_body: Option<Vec<LlvmChunk>>,
    /// Inline-IR body with type accesses already substituted, ready for
    /// textual splicing by the backend
    pub rendered_ir: Option<String>,
    /// Locally declared variables, discovered in a body pre-pass, for
    /// entry-block slot allocation
    pub symbols: Vec<(String, Type)>,
    pub generics: Vec<(String, Type)>,
    /// Virtual-table slot; `None` when the function is not virtual
    pub virtual_index: Option<usize>,
    pub privacy: ast::Privacy,
    pub is_static: bool,
    pub is_extern: bool,
    pub is_anon: bool,
    pub is_variadic: bool,
    pub is_mutable: bool,
    /// Enclosing function, for lambdas capturing scope
    pub parent_scope: Option<FuncId>,
    pub uses_parent_scope: bool,
    pub attributes: ast::Attributes,
    pub external_name: Option<String>,
    pub span: Span,
}

impl Func {
    pub fn is_constructor(&self) -> bool {
        self.identifier == ops::CONSTRUCTOR && self.parent_type.is_some()
    }

    /// The function's type, as seen by callers.
    pub fn function_type(&self) -> FunctionType {
        FunctionType {
            args: self.args.iter().map(|a| a.ty.clone()).collect(),
            ret: Box::new(self.ret.clone()),
            variadic: self.is_variadic,
            mutable: self.is_mutable,
        }
    }

    /// Arguments excluding the implicit `self`, when there is one.
    pub fn args_without_self(&self) -> &[FuncArg] {
        let has_self =
            !self.args.is_empty() && (self.parent_type.is_some() && !self.is_static);
        if has_self {
            &self.args[1..]
        } else {
            &self.args
        }
    }

    /// Number of trailing parameters that carry default values.
    pub fn default_arg_count(&self) -> usize {
        self.args
            .iter()
            .rev()
            .take_while(|a| a.default.is_some())
            .count()
    }

    /// `Owner::name<generics>` for diagnostics.
    pub fn nice_name(&self, modules: &ModuleRegistry) -> String {
        let base = match &self.parent_type {
            Some(parent) => format!("{}::", parent.pretty()),
            None => {
                let module = modules.get(self.module);
                if module.is_main {
                    String::new()
                } else {
                    format!("{}::", module.name)
                }
            }
        };
        let mut name = format!("{}{}", base, ops::nice_name(&self.identifier));
        if !self.generics.is_empty() {
            let list: Vec<String> = self.generics.iter().map(|(_, t)| t.pretty()).collect();
            name = format!("{}<{}>", name, list.join(", "));
        }
        name
    }

    /// External linkage symbol, in priority order: explicit override,
    /// `export(name=...)`, bare identifier under `no_mangle`, otherwise
    /// the structured mangle.
    pub fn mangle(&self) -> String {
        if let Some(name) = &self.external_name {
            return name.clone();
        }
        if let Some(args) = self.attributes.args(ast::Attribute::Export) {
            if let Some(name) = args.get("name") {
                return name.clone();
            }
        }
        if self.attributes.has(ast::Attribute::NoMangle) {
            return self.identifier.clone();
        }

        let base = match &self.parent_type {
            Some(parent) => parent.mangle(),
            None => self.module_prefix.clone(),
        };

        let mut name = self.identifier.clone();
        if let Some(stripped) = name.strip_suffix(LAMBDA_SUFFIX) {
            name = format!("{}{}", stripped, LAMBDA_MANGLE_TAG);
        }

        let mut mangled = mangle_with_prefix(&base);
        mangled.push('&');
        mangled.push_str(&name.len().to_string());
        mangled.push_str(&name);
        mangled.push_str("Cv");
        mangled.push_str(&self.id.0.to_string());
        mangled.push_str("Sa");
        for (i, arg) in self.args.iter().enumerate() {
            mangled.push('A');
            mangled.push_str(&(i + 1).to_string());
            mangled.push_str(&arg.ty.mangle());
        }
        mangled.push_str("FnE");
        mangled
    }

    /// Whether the symbol resolves outside the unit (not frost-mangled).
    pub fn is_external_symbol(name: &str) -> bool {
        !name.starts_with(crate::types::MANGLE_PREFIX)
    }
}

/// Id-indexed store of every function in the unit.
#[derive(Debug, Default)]
pub struct FuncRegistry {
    funcs: Vec<Func>,
}

impl FuncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut func: Func) -> FuncId {
        let id = FuncId(self.funcs.len());
        func.id = id;
        self.funcs.push(func);
        id
    }

    pub fn get(&self, id: FuncId) -> &Func {
        &self.funcs[id.0]
    }

    pub fn get_mut(&mut self, id: FuncId) -> &mut Func {
        &mut self.funcs[id.0]
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Func> {
        self.funcs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frost_diagnostics::Span;

    fn func(identifier: &str) -> Func {
        Func {
            id: FuncId(0),
            identifier: identifier.to_string(),
            module: ModuleId(0),
            module_prefix: "pkg$main".to_string(),
            parent_type: None,
            args: vec![FuncArg {
                name: "x".to_string(),
                ty: Type::I32,
                default: None,
            }],
            ret: Type::Void,
            body: None,
            llvm_body: None,
            rendered_ir: None,
            symbols: Vec::new(),
            generics: Vec::new(),
            virtual_index: None,
            privacy: ast::Privacy::Public,
            is_static: false,
            is_extern: false,
            is_anon: false,
            is_variadic: false,
            is_mutable: false,
            parent_scope: None,
            uses_parent_scope: false,
            attributes: ast::Attributes::new(),
            external_name: None,
            span: Span::unknown(),
        }
    }

    #[test]
    fn test_structured_mangle() {
        let f = func("greet");
        assert_eq!(f.mangle(), "_ZN$SNpkg$main&5greetCv0SaA1iFnE");
    }

    #[test]
    fn test_mangle_priority() {
        let mut f = func("greet");
        f.external_name = Some("main".to_string());
        assert_eq!(f.mangle(), "main");

        let mut f = func("greet");
        let mut args = ast::AttributeArgs::new();
        args.insert("name".to_string(), "c_greet".to_string());
        f.attributes.add(ast::Attribute::Export, args);
        assert_eq!(f.mangle(), "c_greet");

        let mut f = func("greet");
        f.attributes.add(ast::Attribute::NoMangle, ast::AttributeArgs::new());
        assert_eq!(f.mangle(), "greet");
    }

    #[test]
    fn test_lambda_suffix_rewrite() {
        let f = func("[main.fr@3 lambda function]");
        let mangled = f.mangle();
        assert!(mangled.contains(".$LmbdF"));
        assert!(!mangled.contains("lambda function"));
    }

    #[test]
    fn test_external_symbol_detection() {
        assert!(Func::is_external_symbol("printf"));
        assert!(!Func::is_external_symbol("_ZN$SNpkg&1fCv0SaFnE"));
    }
}
