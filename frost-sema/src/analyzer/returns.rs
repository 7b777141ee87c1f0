// Exhaustive-return checking: every non-void, non-constructor function
// with a generated body must return on all paths.

use frost_diagnostics::{Category, Diagnostic};
use frost_ir::{Func, Type, Value};

pub(super) fn check(func: &Func, body: &Value, diagnostics: &mut Vec<Diagnostic>) {
    if func.ret.equals(&Type::Void) || func.is_constructor() {
        return;
    }
    if !body.always_returns() {
        diagnostics.push(
            Diagnostic::error(
                Category::Type,
                "Function lacks ending return statement!",
                func.span.clone(),
            )
            .with_info("Function does not return on all paths!"),
        );
    }
}
