// Secondary type-check pass: argument types of every direct call must
// match the callee signature (adaptation already happened during
// lowering, so a mismatch here is a real defect), and cast destinations
// must be legal.

use crate::transformer::Transformer;
use frost_diagnostics::{Category, Diagnostic};
use frost_ir::{BinOpLowering, Callee, SwitchCases, Value, ValueKind};

pub(super) fn check(transformer: &Transformer, body: &Value, diagnostics: &mut Vec<Diagnostic>) {
    walk(transformer, body, diagnostics);
}

fn walk(t: &Transformer, value: &Value, diagnostics: &mut Vec<Diagnostic>) {
    match &value.kind {
        ValueKind::Call { callee, args } => {
            if let Callee::Func(id) = callee {
                let callee_func = t.funcs.get(*id);
                for (arg, param) in args.iter().zip(&callee_func.args) {
                    if !arg.ty.equals(&param.ty) {
                        diagnostics.push(
                            Diagnostic::error(
                                Category::Type,
                                format!(
                                    "argument of type '{}' does not match parameter '{}' of '{}'",
                                    arg.ty.pretty(),
                                    param.ty.pretty(),
                                    callee_func.nice_name(&t.modules)
                                ),
                                arg.span.clone(),
                            ),
                        );
                    }
                }
                if args.len()
                    < callee_func
                        .args
                        .len()
                        .saturating_sub(callee_func.default_arg_count())
                {
                    diagnostics.push(Diagnostic::error(
                        Category::Type,
                        format!(
                            "call to '{}' is missing arguments",
                            callee_func.nice_name(&t.modules)
                        ),
                        value.span.clone(),
                    ));
                }
            }
            if let Callee::Indirect(v) = callee {
                walk(t, v, diagnostics);
            }
            for arg in args {
                walk(t, arg, diagnostics);
            }
        }
        ValueKind::Cast { value: inner } => {
            let legal = inner.ty.equals(&value.ty)
                || (inner.ty.is_numeric() && value.ty.is_numeric())
                || (inner.ty.is_pointer() && value.ty.is_pointer())
                || (inner.ty.is_reference() && value.ty.is_pointer());
            if !legal {
                diagnostics.push(Diagnostic::error(
                    Category::Type,
                    format!(
                        "illegal cast from '{}' to '{}'",
                        inner.ty.pretty(),
                        value.ty.pretty()
                    ),
                    value.span.clone(),
                ));
            }
            walk(t, inner, diagnostics);
        }
        ValueKind::VariableDecl { value: init, .. } => {
            if let Some(init) = init {
                walk(t, init, diagnostics);
            }
        }
        ValueKind::ReferenceTo(v)
        | ValueKind::DereferenceTo(v)
        | ValueKind::ObjectInit { call: v }
        | ValueKind::Throw(v) => walk(t, v, diagnostics),
        ValueKind::IndexExtract { value: v, .. } => walk(t, v, diagnostics),
        ValueKind::BinaryOp { lowering, .. } => match lowering {
            BinOpLowering::Assignment { target, value } => {
                walk(t, target, diagnostics);
                walk(t, value, diagnostics);
            }
            BinOpLowering::OperatorCall(call) => walk(t, call, diagnostics),
        },
        ValueKind::Conditional {
            condition,
            then_block,
            else_block,
        } => {
            walk(t, condition, diagnostics);
            walk(t, then_block, diagnostics);
            if let Some(e) = else_block {
                walk(t, e, diagnostics);
            }
        }
        ValueKind::WhileLoop {
            condition,
            body,
            step,
            ..
        } => {
            walk(t, condition, diagnostics);
            walk(t, body, diagnostics);
            if let Some(step) = step {
                walk(t, step, diagnostics);
            }
        }
        ValueKind::Switch { value: scrutinee, cases } => {
            walk(t, scrutinee, diagnostics);
            match cases {
                SwitchCases::Pattern(cases) => {
                    for c in cases {
                        walk(t, &c.body, diagnostics);
                    }
                }
                SwitchCases::CStyle { cases, default } => {
                    for (v, b) in cases {
                        walk(t, v, diagnostics);
                        walk(t, b, diagnostics);
                    }
                    if let Some(d) = default {
                        walk(t, d, diagnostics);
                    }
                }
            }
        }
        ValueKind::Return(v) => {
            if let Some(v) = v {
                walk(t, v, diagnostics);
            }
        }
        ValueKind::TryCatch { block, catches } => {
            walk(t, block, diagnostics);
            for c in catches {
                walk(t, &c.body, diagnostics);
            }
        }
        ValueKind::Block(values) => {
            for v in values {
                walk(t, v, diagnostics);
            }
        }
        ValueKind::EnumInit { args, .. } => {
            for arg in args {
                walk(t, arg, diagnostics);
            }
        }
        ValueKind::Constant(_)
        | ValueKind::Variable { .. }
        | ValueKind::Argument { .. }
        | ValueKind::ValueExtract { .. }
        | ValueKind::LoopFlow(_)
        | ValueKind::ZeroInitialized => {}
    }
}
