// Definite assignment: every read of a local must be dominated by an
// assignment on every path. Declarations without a real initializer
// (including the zero-initialized default) start out unassigned.

use std::collections::HashMap;

use frost_diagnostics::{Category, Diagnostic};
use frost_ir::{BinOpLowering, Callee, SwitchCases, Value, ValueKind};

pub(super) fn check(body: &Value, diagnostics: &mut Vec<Diagnostic>) {
    let mut state: HashMap<String, bool> = HashMap::new();
    walk(body, &mut state, diagnostics);
}

fn walk(value: &Value, state: &mut HashMap<String, bool>, diagnostics: &mut Vec<Diagnostic>) {
    match &value.kind {
        ValueKind::VariableDecl { name, value: init, .. } => {
            let assigned = match init {
                Some(init) => {
                    if matches!(init.kind, ValueKind::ZeroInitialized) {
                        false
                    } else {
                        walk(init, state, diagnostics);
                        true
                    }
                }
                None => false,
            };
            state.insert(name.clone(), assigned);
        }
        ValueKind::Variable { name, is_argument, .. } => {
            if !is_argument {
                if let Some(false) = state.get(name) {
                    diagnostics.push(
                        Diagnostic::error(
                            Category::Variable,
                            format!("Variable '{}' is used before being assigned!", name),
                            value.span.clone(),
                        )
                        .with_help("assign a value to it on every path before this use"),
                    );
                }
            }
        }
        ValueKind::BinaryOp { lowering, .. } => match lowering {
            BinOpLowering::Assignment { target, value: rhs } => {
                walk(rhs, state, diagnostics);
                if let ValueKind::Variable { name, .. } = &target.kind {
                    state.insert(name.clone(), true);
                } else {
                    walk(target, state, diagnostics);
                }
            }
            BinOpLowering::OperatorCall(call) => walk(call, state, diagnostics),
        },
        ValueKind::Block(values) => {
            for v in values {
                walk(v, state, diagnostics);
            }
        }
        ValueKind::Conditional {
            condition,
            then_block,
            else_block,
        } => {
            walk(condition, state, diagnostics);
            let mut then_state = state.clone();
            walk(then_block, &mut then_state, diagnostics);
            let mut else_state = state.clone();
            if let Some(else_block) = else_block {
                walk(else_block, &mut else_state, diagnostics);
            }
            // A variable is definitely assigned only when both paths
            // assigned it.
            for (name, assigned) in state.iter_mut() {
                let then_ok = then_state.get(name).copied().unwrap_or(false);
                let else_ok = else_state.get(name).copied().unwrap_or(false);
                *assigned = *assigned || (then_ok && else_ok);
            }
        }
        ValueKind::WhileLoop {
            condition,
            body,
            step,
            ..
        } => {
            walk(condition, state, diagnostics);
            // Loop bodies may run zero times; their assignments are not
            // definite afterwards.
            let mut loop_state = state.clone();
            walk(body, &mut loop_state, diagnostics);
            if let Some(step) = step {
                walk(step, &mut loop_state, diagnostics);
            }
        }
        ValueKind::Switch { value: scrutinee, cases } => {
            walk(scrutinee, state, diagnostics);
            match cases {
                SwitchCases::Pattern(cases) => {
                    for case in cases {
                        let mut case_state = state.clone();
                        for binding in &case.bindings {
                            case_state.insert(binding.clone(), true);
                        }
                        walk(&case.body, &mut case_state, diagnostics);
                    }
                }
                SwitchCases::CStyle { cases, default } => {
                    for (v, b) in cases {
                        walk(v, state, diagnostics);
                        let mut case_state = state.clone();
                        walk(b, &mut case_state, diagnostics);
                    }
                    if let Some(default) = default {
                        let mut default_state = state.clone();
                        walk(default, &mut default_state, diagnostics);
                    }
                }
            }
        }
        ValueKind::TryCatch { block, catches } => {
            let mut try_state = state.clone();
            walk(block, &mut try_state, diagnostics);
            for catch in catches {
                let mut catch_state = state.clone();
                walk(&catch.var, &mut catch_state, diagnostics);
                if let ValueKind::VariableDecl { name, .. } = &catch.var.kind {
                    catch_state.insert(name.clone(), true);
                }
                walk(&catch.body, &mut catch_state, diagnostics);
            }
        }
        ValueKind::ReferenceTo(v)
        | ValueKind::DereferenceTo(v)
        | ValueKind::Cast { value: v }
        | ValueKind::ObjectInit { call: v }
        | ValueKind::Throw(v) => walk(v, state, diagnostics),
        ValueKind::IndexExtract { value: v, .. } => walk(v, state, diagnostics),
        ValueKind::Call { callee, args } => {
            if let Callee::Indirect(v) = callee {
                walk(v, state, diagnostics);
            }
            for arg in args {
                walk(arg, state, diagnostics);
            }
        }
        ValueKind::Return(v) => {
            if let Some(v) = v {
                walk(v, state, diagnostics);
            }
        }
        ValueKind::EnumInit { args, .. } => {
            for arg in args {
                walk(arg, state, diagnostics);
            }
        }
        ValueKind::Constant(_)
        | ValueKind::Argument { .. }
        | ValueKind::ValueExtract { .. }
        | ValueKind::LoopFlow(_)
        | ValueKind::ZeroInitialized => {}
    }
}
