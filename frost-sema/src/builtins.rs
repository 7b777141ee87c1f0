// The builtin runtime bootstrap. Populates the `std` module with the
// pieces literal lowering and operator resolution depend on: the string
// type and its byte-pointer constructor, the function wrapper, and the
// operator method sets of every primitive type. The type registry is
// read-mostly once this runs.

use crate::item::Item;
use crate::transformer::Transformer;
use frost_ast as ast;
use frost_diagnostics::Span;
use frost_ir::{
    ops, ClassLayout, DefinedRef, Func, FuncArg, FuncId, Module, ModuleId, Type,
};

const STD_UNIQUE: &str = "std";
const STRING_UUID: &str = "std.String";
const FUNCTION_UUID: &str = "std.Function";

pub fn register(t: &mut Transformer) {
    let std_id = t.modules.add(Module::new("std", STD_UNIQUE));
    t.cache.add_module(STD_UNIQUE, std_id);
    let _ = t.ctx.add_item("std", Item::Module(std_id));

    register_string(t, std_id);
    register_primitive_operators(t, std_id);
}

fn register_string(t: &mut Transformer, std_id: ModuleId) {
    let string_ty = Type::Defined(DefinedRef {
        uuid: STRING_UUID.to_string(),
        name: "String".to_string(),
        module: STD_UNIQUE.to_string(),
        generics: Vec::new(),
    });
    t.types.insert_class(ClassLayout {
        uuid: STRING_UUID.to_string(),
        name: "String".to_string(),
        module: std_id,
        fields: Vec::new(),
        parent: None,
        generics: Vec::new(),
        interfaces: Vec::new(),
        is_struct: false,
        has_constructor: true,
        has_vtable: false,
        vtable_names: Vec::new(),
        vtable: Vec::new(),
        privacy: ast::Privacy::Public,
    });
    t.cache.add_transformed_type(STRING_UUID, string_ty.clone());
    {
        let module = t.modules.get_mut(std_id);
        module
            .type_info
            .insert(STRING_UUID.to_string(), string_ty.clone());
        module.add_export("String");
    }

    // String::from(*const u8, u64) -> String
    let byte_ptr = t.types.pointer_to(Type::U8, false);
    let from = builtin_func(
        std_id,
        "from",
        Some(string_ty.clone()),
        true,
        vec![("bytes", byte_ptr), ("length", Type::U64)],
        string_ty,
    );
    let id = t.funcs.add(from);
    t.modules.get_mut(std_id).add_function(id);
    t.cache
        .add_transformed_function(&format!("{}.from", STRING_UUID), id);
}

/// Arithmetic and comparison method sets for the numeric primitives and
/// bool. Cached under `<type>.#<symbol>` so member lookup on a primitive
/// base resolves them like any other method.
fn register_primitive_operators(t: &mut Transformer, std_id: ModuleId) {
    const ARITHMETIC: &[&str] = &["+", "-", "*", "/", "%"];
    const COMPARISON: &[&str] = &["==", "!=", "<", ">", "<=", ">="];

    let numeric = [
        Type::I8,
        Type::I16,
        Type::I32,
        Type::I64,
        Type::U8,
        Type::U16,
        Type::U32,
        Type::U64,
        Type::F32,
        Type::F64,
    ];

    for ty in numeric {
        for symbol in ARITHMETIC {
            register_operator(t, std_id, ty.clone(), symbol, ty.clone());
        }
        for symbol in COMPARISON {
            register_operator(t, std_id, ty.clone(), symbol, Type::Bool);
        }
    }

    for symbol in ["&&", "||", "==", "!="] {
        register_operator(t, std_id, Type::Bool, symbol, Type::Bool);
    }
}

fn register_operator(t: &mut Transformer, std_id: ModuleId, ty: Type, symbol: &str, ret: Type) {
    let identifier = ops::identifier_for(symbol);
    let func = builtin_func(
        std_id,
        &identifier,
        Some(ty.clone()),
        false,
        vec![("self", ty.clone()), ("other", ty.clone())],
        ret,
    );
    let id = t.funcs.add(func);
    t.modules.get_mut(std_id).add_function(id);
    t.cache
        .add_transformed_function(&format!("{}.{}", ty.pretty(), identifier), id);
}

fn builtin_func(
    module: ModuleId,
    identifier: &str,
    parent_type: Option<Type>,
    is_static: bool,
    args: Vec<(&str, Type)>,
    ret: Type,
) -> Func {
    let mut attributes = ast::Attributes::new();
    attributes.add(ast::Attribute::Builtin, ast::AttributeArgs::new());
    Func {
        id: FuncId(0),
        identifier: identifier.to_string(),
        module,
        module_prefix: STD_UNIQUE.to_string(),
        parent_type,
        args: args
            .into_iter()
            .map(|(name, ty)| FuncArg {
                name: name.to_string(),
                ty,
                default: None,
            })
            .collect(),
        ret,
        body: None,
        llvm_body: None,
        rendered_ir: None,
        symbols: Vec::new(),
        generics: Vec::new(),
        virtual_index: None,
        privacy: ast::Privacy::Public,
        is_static,
        is_extern: true,
        is_anon: false,
        is_variadic: false,
        is_mutable: false,
        parent_scope: None,
        uses_parent_scope: false,
        attributes,
        external_name: None,
        span: Span::unknown(),
    }
}

impl Transformer {
    /// The runtime function wrapper `std::Function<F>`, instantiated per
    /// distinct function type and cached like any generic type.
    pub(crate) fn function_wrapper_type(&mut self, fn_ty: Type) -> Type {
        if let Some(instances) = self.cache.transformed_types(FUNCTION_UUID) {
            for instance in instances {
                if let Type::Defined(d) = instance {
                    if d.generics.len() == 1 && d.generics[0].equals(&fn_ty) {
                        return instance.clone();
                    }
                }
            }
        }

        let uuid = format!(
            "{}:{}",
            FUNCTION_UUID,
            self.cache.instantiation_count(FUNCTION_UUID)
        );
        let ty = Type::Defined(DefinedRef {
            uuid: uuid.clone(),
            name: "Function".to_string(),
            module: STD_UNIQUE.to_string(),
            generics: vec![fn_ty],
        });
        let std_id = self.cache.module(STD_UNIQUE).unwrap_or(self.ctx.module);
        self.types.insert_class(ClassLayout {
            uuid: uuid.clone(),
            name: "Function".to_string(),
            module: std_id,
            fields: Vec::new(),
            parent: None,
            generics: match &ty {
                Type::Defined(d) => d.generics.clone(),
                _ => Vec::new(),
            },
            interfaces: Vec::new(),
            is_struct: false,
            has_constructor: true,
            has_vtable: false,
            vtable_names: Vec::new(),
            vtable: Vec::new(),
            privacy: ast::Privacy::Public,
        });
        self.cache.add_transformed_type(FUNCTION_UUID, ty.clone());
        ty
    }
}
