// The IR value factory. Every constructor attaches the span it is given
// and derives the value's type from its operands; nothing here touches
// scopes or registries beyond reading type structure.

use crate::func::FuncId;
use crate::types::{ClassField, FunctionType, Type};
use crate::value::{
    BinOpLowering, Callee, CatchIr, Constant, PatternCaseIr, SwitchCases, Value, ValueKind,
};
use frost_ast::{LoopFlowKind, OpType};
use frost_diagnostics::Span;

#[derive(Debug, Default, Clone, Copy)]
pub struct IrBuilder;

impl IrBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn constant_int(&self, span: Span, value: i64, ty: Type) -> Value {
        Value::new(ValueKind::Constant(Constant::Int(value)), ty, span)
    }

    pub fn constant_float(&self, span: Span, value: f64) -> Value {
        Value::new(ValueKind::Constant(Constant::Float(value)), Type::F64, span)
    }

    pub fn constant_bool(&self, span: Span, value: bool) -> Value {
        Value::new(ValueKind::Constant(Constant::Bool(value)), Type::Bool, span)
    }

    /// Char constants are byte-sized.
    pub fn constant_char(&self, span: Span, value: u8) -> Value {
        Value::new(ValueKind::Constant(Constant::Char(value)), Type::U8, span)
    }

    /// String constants start life as byte pointers; literal lowering
    /// decides whether to wrap them into the runtime string type.
    pub fn constant_string(&self, span: Span, value: String) -> Value {
        Value::new(
            ValueKind::Constant(Constant::String(value)),
            Type::Pointer {
                inner: Box::new(Type::U8),
                mutable: false,
            },
            span,
        )
    }

    pub fn variable(&self, span: Span, name: &str, ty: Type, is_mutable: bool, is_argument: bool) -> Value {
        Value::new(
            ValueKind::Variable {
                name: name.to_string(),
                is_argument,
                is_mutable,
            },
            ty,
            span,
        )
    }

    /// A declaration adopts the initializer's type when present, the
    /// declared type otherwise.
    pub fn variable_decl(
        &self,
        span: Span,
        name: &str,
        declared: Option<Type>,
        init: Option<Value>,
        is_mutable: bool,
    ) -> Value {
        let ty = init
            .as_ref()
            .map(|v| v.ty.clone())
            .or(declared)
            .unwrap_or(Type::Void);
        Value::new(
            ValueKind::VariableDecl {
                name: name.to_string(),
                value: init.map(Box::new),
                is_mutable,
            },
            ty,
            span,
        )
    }

    pub fn argument(&self, span: Span, name: &str, index: usize, ty: Type) -> Value {
        Value::new(
            ValueKind::Argument {
                name: name.to_string(),
                index,
            },
            ty,
            span,
        )
    }

    /// The result type is the referent's type wrapped in a reference
    /// carrying the referent's mutability.
    pub fn reference_to(&self, span: Span, value: Value) -> Value {
        let mutable = value.is_mutable_lvalue();
        let ty = if value.ty.is_reference() {
            value.ty.clone()
        } else {
            Type::Reference {
                inner: Box::new(value.ty.clone()),
                mutable,
            }
        };
        Value::new(ValueKind::ReferenceTo(Box::new(value)), ty, span)
    }

    /// Load through a reference or pointer; `None` when the operand has
    /// nothing to dereference.
    pub fn dereference_to(&self, span: Span, value: Value) -> Option<Value> {
        let inner = value.ty.inner().cloned()?;
        Some(Value::new(
            ValueKind::DereferenceTo(Box::new(value)),
            inner,
            span,
        ))
    }

    pub fn cast(&self, span: Span, value: Value, target: Type) -> Value {
        Value::new(ValueKind::Cast { value: Box::new(value) }, target, span)
    }

    /// Field access; the result type is the field's declared type.
    pub fn index_extract(&self, span: Span, value: Value, field: &ClassField, index: usize) -> Value {
        Value::new(
            ValueKind::IndexExtract {
                value: Box::new(value),
                field: field.name.clone(),
                index,
            },
            field.ty.clone(),
            span,
        )
    }

    /// Load a resolved function as a first-class value.
    pub fn value_extract(&self, span: Span, func: FuncId, fn_type: FunctionType) -> Value {
        Value::new(
            ValueKind::ValueExtract { func },
            Type::Function(fn_type),
            span,
        )
    }

    pub fn call(&self, span: Span, callee: Callee, args: Vec<Value>, ret: Type) -> Value {
        Value::new(ValueKind::Call { callee, args }, ret, span)
    }

    /// Wrap a constructor call into an initialization of `ty`.
    pub fn object_init(&self, span: Span, ty: Type, call: Value) -> Value {
        Value::new(ValueKind::ObjectInit { call: Box::new(call) }, ty, span)
    }

    pub fn assignment(&self, span: Span, op: OpType, target: Value, value: Value) -> Value {
        Value::new(
            ValueKind::BinaryOp {
                op,
                lowering: BinOpLowering::Assignment {
                    target: Box::new(target),
                    value: Box::new(value),
                },
            },
            Type::Void,
            span,
        )
    }

    /// A non-assignment operator; carries its lowered operator-method call
    /// and takes that call's result type.
    pub fn operator_call(&self, span: Span, op: OpType, call: Value) -> Value {
        let ty = call.ty.clone();
        Value::new(
            ValueKind::BinaryOp {
                op,
                lowering: BinOpLowering::OperatorCall(Box::new(call)),
            },
            ty,
            span,
        )
    }

    pub fn conditional(
        &self,
        span: Span,
        condition: Value,
        then_block: Value,
        else_block: Option<Value>,
    ) -> Value {
        Value::new(
            ValueKind::Conditional {
                condition: Box::new(condition),
                then_block: Box::new(then_block),
                else_block: else_block.map(Box::new),
            },
            Type::Void,
            span,
        )
    }

    pub fn while_loop(&self, span: Span, condition: Value, body: Value, is_do_while: bool) -> Value {
        Value::new(
            ValueKind::WhileLoop {
                condition: Box::new(condition),
                body: Box::new(body),
                is_do_while,
                step: None,
            },
            Type::Void,
            span,
        )
    }

    /// A for-loop lowered to a while with a trailing step expression.
    pub fn from_for_loop(&self, span: Span, condition: Value, body: Value, step: Value) -> Value {
        Value::new(
            ValueKind::WhileLoop {
                condition: Box::new(condition),
                body: Box::new(body),
                is_do_while: false,
                step: Some(Box::new(step)),
            },
            Type::Void,
            span,
        )
    }

    pub fn switch_pattern(&self, span: Span, value: Value, cases: Vec<PatternCaseIr>) -> Value {
        Value::new(
            ValueKind::Switch {
                value: Box::new(value),
                cases: SwitchCases::Pattern(cases),
            },
            Type::Void,
            span,
        )
    }

    pub fn switch_c_style(
        &self,
        span: Span,
        value: Value,
        cases: Vec<(Value, Value)>,
        default: Option<Value>,
    ) -> Value {
        Value::new(
            ValueKind::Switch {
                value: Box::new(value),
                cases: SwitchCases::CStyle {
                    cases,
                    default: default.map(Box::new),
                },
            },
            Type::Void,
            span,
        )
    }

    pub fn ret(&self, span: Span, value: Option<Value>) -> Value {
        Value::new(ValueKind::Return(value.map(Box::new)), Type::Void, span)
    }

    pub fn throw(&self, span: Span, value: Value) -> Value {
        Value::new(ValueKind::Throw(Box::new(value)), Type::Void, span)
    }

    pub fn try_catch(&self, span: Span, block: Value, catches: Vec<CatchIr>) -> Value {
        Value::new(
            ValueKind::TryCatch {
                block: Box::new(block),
                catches,
            },
            Type::Void,
            span,
        )
    }

    pub fn block(&self, span: Span, values: Vec<Value>) -> Value {
        Value::new(ValueKind::Block(values), Type::Void, span)
    }

    pub fn loop_flow(&self, span: Span, kind: LoopFlowKind) -> Value {
        Value::new(ValueKind::LoopFlow(kind), Type::Void, span)
    }

    pub fn enum_init(
        &self,
        span: Span,
        enum_ty: Type,
        variant: &str,
        args: Vec<Value>,
    ) -> Value {
        let enum_uuid = match enum_ty.collapse() {
            Type::Enum(e) => e.uuid.clone(),
            _ => String::new(),
        };
        Value::new(
            ValueKind::EnumInit {
                enum_uuid,
                variant: variant.to_string(),
                args,
            },
            enum_ty,
            span,
        )
    }

    pub fn zero_initialized(&self, span: Span, ty: Type) -> Value {
        Value::new(ValueKind::ZeroInitialized, ty, span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frost_ast::Privacy;

    fn span() -> Span {
        Span::unknown()
    }

    #[test]
    fn test_reference_wraps_with_referent_mutability() {
        let b = IrBuilder::new();
        let var = b.variable(span(), "x", Type::I32, true, false);
        let r = b.reference_to(span(), var);
        assert_eq!(
            r.ty,
            Type::Reference {
                inner: Box::new(Type::I32),
                mutable: true
            }
        );
    }

    #[test]
    fn test_variable_decl_prefers_initializer_type() {
        let b = IrBuilder::new();
        let init = b.constant_int(span(), 3, Type::I64);
        let decl = b.variable_decl(span(), "x", Some(Type::I32), Some(init), false);
        assert_eq!(decl.ty, Type::I64);

        let bare = b.variable_decl(span(), "y", Some(Type::I32), None, false);
        assert_eq!(bare.ty, Type::I32);
    }

    #[test]
    fn test_index_extract_takes_field_type() {
        let b = IrBuilder::new();
        let field = ClassField {
            name: "v".to_string(),
            ty: Type::F64,
            privacy: Privacy::Public,
            default_value: None,
            mutable: false,
        };
        let base = b.variable(span(), "obj", Type::I32, false, false);
        let extract = b.index_extract(span(), base, &field, 0);
        assert_eq!(extract.ty, Type::F64);
    }

    #[test]
    fn test_builder_attaches_span() {
        let b = IrBuilder::new();
        let s = Span::new("m.fr".to_string(), 4, 2, 1);
        let v = b.constant_bool(s.clone(), true);
        assert_eq!(v.span, s);
    }
}
