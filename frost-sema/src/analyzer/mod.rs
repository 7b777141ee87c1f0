// Post-transform analyzer passes. Each pass walks every generated
// function body and pushes diagnostics; none of them mutates the IR.

mod definite_assignment;
mod returns;
mod type_check;

use crate::transformer::Transformer;
use frost_diagnostics::Diagnostic;

pub fn run(transformer: &mut Transformer) {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    for func in transformer.funcs.iter() {
        let Some(body) = &func.body else { continue };
        definite_assignment::check(body, &mut diagnostics);
        returns::check(func, body, &mut diagnostics);
        type_check::check(transformer, body, &mut diagnostics);
    }

    log::debug!("analyzers produced {} diagnostic(s)", diagnostics.len());
    for diag in diagnostics {
        transformer.diags.emit(diag);
    }
}
