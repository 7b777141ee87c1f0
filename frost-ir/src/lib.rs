// Frost intermediate representation: canonical types, typed values,
// functions and modules, plus the factory that builds them.

pub mod builder;
pub mod func;
pub mod inline_ir;
pub mod module;
pub mod ops;
pub mod types;
pub mod value;

pub use builder::IrBuilder;
pub use func::{Func, FuncArg, FuncId, FuncRegistry, LlvmChunk};
pub use module::{Module, ModuleId, ModuleRegistry};
pub use types::{
    AliasType, ClassField, ClassLayout, DefinedRef, EnumLayout, EnumRef, EnumVariantLayout,
    FunctionType, InterfaceLayout, InterfaceMember, InterfaceRef, MemberKind, Type, TypeRegistry,
};
pub use value::{
    BinOpLowering, Callee, CatchIr, Constant, PatternCaseIr, SwitchCases, Value, ValueKind,
};
