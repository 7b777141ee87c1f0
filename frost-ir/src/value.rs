// The IR value set. Every value carries its type and the source span it
// was lowered from; values own their operands, never the AST.

use serde::{Deserialize, Serialize};

use crate::func::FuncId;
use crate::types::Type;
use frost_ast::{LoopFlowKind, OpType};
use frost_diagnostics::Span;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(u8),
    String(String),
}

/// Call target: a resolved function or a first-class function value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Callee {
    Func(FuncId),
    Indirect(Box<Value>),
}

/// Lowering of a binary operator application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BinOpLowering {
    /// Plain or compound assignment into an assignable target
    Assignment {
        target: Box<Value>,
        value: Box<Value>,
    },
    /// Every other operator becomes a call to the operator method on the
    /// left operand's type
    OperatorCall(Box<Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCaseIr {
    pub variant: String,
    pub bindings: Vec<String>,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SwitchCases {
    /// Exhaustive match over the variants of an enum
    Pattern(Vec<PatternCaseIr>),
    /// C-style dispatch over integral expressions
    CStyle {
        cases: Vec<(Value, Value)>,
        default: Option<Box<Value>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchIr {
    /// The catch variable declaration (a `VariableDecl` value)
    pub var: Box<Value>,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueKind {
    Constant(Constant),
    /// Reference to an in-scope variable
    Variable {
        name: String,
        is_argument: bool,
        is_mutable: bool,
    },
    VariableDecl {
        name: String,
        value: Option<Box<Value>>,
        is_mutable: bool,
    },
    Argument {
        name: String,
        index: usize,
    },
    ReferenceTo(Box<Value>),
    DereferenceTo(Box<Value>),
    Cast {
        value: Box<Value>,
    },
    /// Field access by stable field index (structural slot shifting for
    /// vtables happens at the layout level)
    IndexExtract {
        value: Box<Value>,
        field: String,
        index: usize,
    },
    /// Load of a function as a first-class value
    ValueExtract {
        func: FuncId,
    },
    Call {
        callee: Callee,
        args: Vec<Value>,
    },
    /// Wraps a constructor call, typed as the constructed type
    ObjectInit {
        call: Box<Value>,
    },
    BinaryOp {
        op: OpType,
        lowering: BinOpLowering,
    },
    Conditional {
        condition: Box<Value>,
        then_block: Box<Value>,
        else_block: Option<Box<Value>>,
    },
    /// While, do-while, or a lowered for-loop with its trailing step
    WhileLoop {
        condition: Box<Value>,
        body: Box<Value>,
        is_do_while: bool,
        step: Option<Box<Value>>,
    },
    Switch {
        value: Box<Value>,
        cases: SwitchCases,
    },
    Return(Option<Box<Value>>),
    Throw(Box<Value>),
    TryCatch {
        block: Box<Value>,
        catches: Vec<CatchIr>,
    },
    Block(Vec<Value>),
    LoopFlow(LoopFlowKind),
    EnumInit {
        enum_uuid: String,
        variant: String,
        args: Vec<Value>,
    },
    ZeroInitialized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub kind: ValueKind,
    pub ty: Type,
    pub span: Span,
}

impl Value {
    pub fn new(kind: ValueKind, ty: Type, span: Span) -> Self {
        Self { kind, ty, span }
    }

    /// Whether this value can stand on the left of an assignment and be
    /// written through.
    pub fn is_mutable_lvalue(&self) -> bool {
        match &self.kind {
            ValueKind::Variable { is_mutable, .. } => *is_mutable,
            ValueKind::VariableDecl { is_mutable, .. } => *is_mutable,
            ValueKind::Argument { .. } => false,
            ValueKind::IndexExtract { value, .. } => value.is_mutable_lvalue(),
            ValueKind::DereferenceTo(inner) => {
                matches!(inner.ty.collapse(), Type::Pointer { mutable: true, .. })
                    || matches!(inner.ty.collapse(), Type::Reference { mutable: true, .. })
            }
            _ => false,
        }
    }

    /// Whether this value names a storage location (used for implicit
    /// reference addition at call sites).
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::Variable { .. }
                | ValueKind::VariableDecl { .. }
                | ValueKind::Argument { .. }
                | ValueKind::IndexExtract { .. }
                | ValueKind::DereferenceTo(_)
        )
    }

    /// Whether every path through this value ends in a return or throw.
    pub fn always_returns(&self) -> bool {
        match &self.kind {
            ValueKind::Return(_) | ValueKind::Throw(_) => true,
            ValueKind::Block(values) => values.iter().any(Value::always_returns),
            ValueKind::Conditional {
                then_block,
                else_block,
                ..
            } => {
                then_block.always_returns()
                    && else_block.as_ref().is_some_and(|e| e.always_returns())
            }
            ValueKind::TryCatch { block, catches } => {
                block.always_returns() && catches.iter().all(|c| c.body.always_returns())
            }
            ValueKind::Switch { cases, .. } => match cases {
                SwitchCases::Pattern(cases) => cases.iter().all(|c| c.body.always_returns()),
                SwitchCases::CStyle { cases, default } => {
                    default.as_ref().is_some_and(|d| d.always_returns())
                        && cases.iter().all(|(_, b)| b.always_returns())
                }
            },
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frost_diagnostics::Span;

    fn value(kind: ValueKind, ty: Type) -> Value {
        Value::new(kind, ty, Span::unknown())
    }

    #[test]
    fn test_mutable_lvalue_through_field() {
        let base = value(
            ValueKind::Variable {
                name: "p".to_string(),
                is_argument: false,
                is_mutable: true,
            },
            Type::I32,
        );
        let field = value(
            ValueKind::IndexExtract {
                value: Box::new(base),
                field: "x".to_string(),
                index: 0,
            },
            Type::I32,
        );
        assert!(field.is_mutable_lvalue());
    }

    #[test]
    fn test_deref_of_const_pointer_is_not_assignable() {
        let ptr = value(
            ValueKind::Variable {
                name: "p".to_string(),
                is_argument: false,
                is_mutable: true,
            },
            Type::Pointer {
                inner: Box::new(Type::I32),
                mutable: false,
            },
        );
        let deref = value(ValueKind::DereferenceTo(Box::new(ptr)), Type::I32);
        assert!(!deref.is_mutable_lvalue());
    }

    #[test]
    fn test_always_returns_through_branches() {
        let ret = || {
            value(
                ValueKind::Return(Some(Box::new(value(
                    ValueKind::Constant(Constant::Int(1)),
                    Type::I32,
                )))),
                Type::Void,
            )
        };
        let both = value(
            ValueKind::Conditional {
                condition: Box::new(value(ValueKind::Constant(Constant::Bool(true)), Type::Bool)),
                then_block: Box::new(ret()),
                else_block: Some(Box::new(ret())),
            },
            Type::Void,
        );
        assert!(both.always_returns());

        let one_sided = value(
            ValueKind::Conditional {
                condition: Box::new(value(ValueKind::Constant(Constant::Bool(true)), Type::Bool)),
                then_block: Box::new(ret()),
                else_block: None,
            },
            Type::Void,
        );
        assert!(!one_sided.always_returns());
    }
}
