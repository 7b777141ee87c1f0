// Shared AST-building helpers for the integration suites. Tests feed
// hand-built ASTs through the full two-phase pipeline via `run_main`.

use std::path::PathBuf;

use frost_ast::*;
use frost_diagnostics::Span;
use frost_sema::{ImportDriver, MapFrontend, Transformer};

pub fn sp() -> Span {
    Span::new("test.fr".to_string(), 1, 1, 1)
}

pub fn new_transformer(frontend: MapFrontend) -> Transformer {
    let _ = env_logger::builder().is_test(true).try_init();
    let driver = ImportDriver::new(
        PathBuf::from("/frost/std"),
        PathBuf::from("/work"),
        PathBuf::from("/work/.deps"),
    );
    Transformer::new(Box::new(frontend), driver)
}

pub fn num(text: &str) -> Expression {
    Expression::Constant(ConstantValue {
        kind: ConstantKind::Number,
        value: text.to_string(),
        prefix: String::new(),
        span: sp(),
    })
}

pub fn float(text: &str) -> Expression {
    Expression::Constant(ConstantValue {
        kind: ConstantKind::Float,
        value: text.to_string(),
        prefix: String::new(),
        span: sp(),
    })
}

pub fn boolean(value: bool) -> Expression {
    Expression::Constant(ConstantValue {
        kind: ConstantKind::Bool,
        value: value.to_string(),
        prefix: String::new(),
        span: sp(),
    })
}

pub fn string(text: &str, prefix: &str) -> Expression {
    Expression::Constant(ConstantValue {
        kind: ConstantKind::String,
        value: format!("\"{}\"", text),
        prefix: prefix.to_string(),
        span: sp(),
    })
}

pub fn ident(name: &str) -> Expression {
    Expression::Identifier(Identifier::new(name, sp()))
}

pub fn bin(op: OpType, lhs: Expression, rhs: Expression) -> Expression {
    Expression::BinaryOp(BinaryOp {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        span: sp(),
    })
}

pub fn call_ident(name: &str, args: Vec<Expression>) -> Expression {
    Expression::FunctionCall(FunctionCall {
        callee: Box::new(ident(name)),
        args,
        span: sp(),
    })
}

pub fn method_call(base: Expression, method: &str, args: Vec<Expression>) -> Expression {
    Expression::FunctionCall(FunctionCall {
        callee: Box::new(Expression::Index(Index {
            base: Box::new(base),
            identifier: Identifier::new(method, sp()),
            is_static: false,
            span: sp(),
        })),
        args,
        span: sp(),
    })
}

pub fn tyref(name: &str) -> TypeRef {
    TypeRef::name(name, sp())
}

pub fn let_stmt(name: &str, ty: Option<TypeRef>, value: Option<Expression>) -> Statement {
    Statement::VariableDecl(VariableDecl {
        name: name.to_string(),
        ty,
        value,
        mutable: false,
        privacy: Privacy::Private,
        span: sp(),
    })
}

pub fn block(statements: Vec<Statement>) -> Block {
    Block {
        statements,
        span: sp(),
    }
}

pub fn function(name: &str, params: Vec<(&str, &str)>, ret: Option<&str>, body: Vec<Statement>) -> Statement {
    let mut def = FunctionDef::new(name, sp());
    def.params = params
        .into_iter()
        .map(|(n, t)| Param {
            name: n.to_string(),
            ty: tyref(t),
            default: None,
        })
        .collect();
    def.ret = ret.map(tyref);
    def.body = FunctionBody::Bodied(block(body));
    Statement::FunctionDef(def)
}

pub fn main_fn(body: Vec<Statement>) -> Statement {
    function("main", Vec::new(), None, body)
}

/// Run the pipeline over a file containing `main` plus extra items.
pub fn run_file(file: File) -> Transformer {
    let mut transformer = new_transformer(MapFrontend::new());
    let _ = transformer.run(&file);
    transformer
}

pub fn run_main(stmts: Vec<Statement>) -> Transformer {
    run_file(vec![main_fn(stmts)])
}

/// The generated body of `main`, as a block's value list.
pub fn main_body(transformer: &Transformer) -> Vec<frost_ir::Value> {
    let main = transformer
        .funcs
        .iter()
        .find(|f| f.identifier == "main")
        .expect("main was not generated");
    match &main.body {
        Some(frost_ir::Value {
            kind: frost_ir::ValueKind::Block(values),
            ..
        }) => values.clone(),
        other => panic!("main body is not a block: {:?}", other),
    }
}
