// End-to-end scenarios: hand-built ASTs through both transformer phases,
// assertions on the produced IR.

mod common;

use common::*;
use frost_ast::*;
use frost_ir::{BinOpLowering, Callee, Type, Value, ValueKind};

fn as_call(value: &Value) -> (&frost_ir::FuncId, &Vec<Value>) {
    match &value.kind {
        ValueKind::Call {
            callee: Callee::Func(id),
            args,
        } => (id, args),
        other => panic!("expected a direct call, got {:?}", other),
    }
}

#[test]
fn scenario_binary_op_lowers_to_operator_call() {
    // let x = 1 + 2
    let t = run_main(vec![let_stmt(
        "x",
        None,
        Some(bin(OpType::Plus, num("1"), num("2"))),
    )]);
    assert!(!t.diags.has_errors(), "{:?}", t.diags.diagnostics());

    let body = main_body(&t);
    assert_eq!(body.len(), 1);

    let decl = &body[0];
    assert!(decl.ty.equals(&Type::I32), "x should be i32");
    let ValueKind::VariableDecl { name, value: Some(init), .. } = &decl.kind else {
        panic!("expected a variable declaration, got {:?}", decl.kind);
    };
    assert_eq!(name, "x");

    let ValueKind::BinaryOp {
        op: OpType::Plus,
        lowering: BinOpLowering::OperatorCall(call),
    } = &init.kind
    else {
        panic!("expected an operator call, got {:?}", init.kind);
    };
    assert!(call.ty.equals(&Type::I32));

    let (callee, args) = as_call(call);
    assert_eq!(t.funcs.get(*callee).nice_name(&t.modules), "i32::op+");
    assert_eq!(args.len(), 2);
    assert!(matches!(
        args[0].kind,
        ValueKind::Constant(frost_ir::Constant::Int(1))
    ));
    assert!(matches!(
        args[1].kind,
        ValueKind::Constant(frost_ir::Constant::Int(2))
    ));
}

fn generic_class_a() -> Statement {
    // class A<T> { let v: T; func id() T { return self.v } }
    let mut class = ClassDef::new("A", sp());
    class.generics = vec![GenericParam {
        name: "T".to_string(),
        bounds: Vec::new(),
        default: None,
        span: sp(),
    }];
    class.fields = vec![VariableDecl {
        name: "v".to_string(),
        ty: Some(tyref("T")),
        value: None,
        mutable: false,
        privacy: Privacy::Public,
        span: sp(),
    }];

    let mut id = FunctionDef::new("id", sp());
    id.ret = Some(tyref("T"));
    id.body = FunctionBody::Bodied(block(vec![Statement::Return(Return {
        value: Some(Expression::Index(Index {
            base: Box::new(ident("self")),
            identifier: Identifier::new("v", sp()),
            is_static: false,
            span: sp(),
        })),
        span: sp(),
    })]));
    class.methods = vec![id];
    Statement::ClassDef(class)
}

#[test]
fn scenario_generic_class_instantiation() {
    // class A<T> { ... }  followed by  new A<i32>() and a.id()
    let new_a = Expression::NewInstance(NewInstance {
        ty: TypeRef::generic("A", vec![tyref("i32")], sp()),
        args: Vec::new(),
        span: sp(),
    });
    let t = run_file(vec![
        generic_class_a(),
        main_fn(vec![
            let_stmt("a", None, Some(new_a)),
            Statement::Expression(method_call(ident("a"), "id", Vec::new())),
        ]),
    ]);
    assert!(!t.diags.has_errors(), "{:?}", t.diags.diagnostics());

    // One instantiation, with the expected uuid and generics
    let instances = t.cache.transformed_types("pkg$main.A").expect("A instantiated");
    assert_eq!(instances.len(), 1);
    let Type::Defined(def) = &instances[0] else {
        panic!("A<i32> should be a defined type");
    };
    assert_eq!(def.uuid, "pkg$main.A:0");
    assert_eq!(def.generics.len(), 1);
    assert!(def.generics[0].equals(&Type::I32));

    // A synthesized default constructor exists
    assert!(t
        .cache
        .transformed_function("pkg$main.A:0.#constructor")
        .is_some());

    // id() was instantiated returning i32
    let id_funcs = t
        .cache
        .transformed_function("pkg$main.A:0.id")
        .expect("id instantiated");
    let id_func = t.funcs.get(id_funcs[0]);
    assert!(id_func.ret.equals(&Type::I32));
    assert!(id_func.body.is_some());
}

#[test]
fn scenario_string_literals() {
    // "hello" -> std::String::from(bytes, 5); b"hello" -> *const u8
    let t = run_main(vec![
        Statement::Expression(string("hello", "")),
        Statement::Expression(string("hello", "b")),
    ]);
    assert!(!t.diags.has_errors(), "{:?}", t.diags.diagnostics());

    let body = main_body(&t);
    assert_eq!(body.len(), 2);

    let (callee, args) = as_call(&body[0]);
    let from = t.funcs.get(*callee);
    assert_eq!(from.identifier, "from");
    assert_eq!(
        from.parent_type.as_ref().map(|t| t.pretty()),
        Some("String".to_string())
    );
    assert_eq!(args.len(), 2);
    assert!(matches!(
        &args[1].kind,
        ValueKind::Constant(frost_ir::Constant::Int(5))
    ));
    assert!(args[1].ty.equals(&Type::U64));
    assert_eq!(body[0].ty.pretty(), "String");

    // byte string stays a bare byte pointer
    let bytes = &body[1];
    assert!(matches!(
        bytes.kind,
        ValueKind::Constant(frost_ir::Constant::String(_))
    ));
    assert!(bytes.ty.equals(&Type::Pointer {
        inner: Box::new(Type::U8),
        mutable: false
    }));
}

fn overload_pair() -> Vec<Statement> {
    vec![
        function("f", vec![("x", "i32")], None, Vec::new()),
        function("f", vec![("x", "f64")], None, Vec::new()),
    ]
}

#[test]
fn scenario_overload_resolution_picks_exact_match() {
    let mut file = overload_pair();
    file.push(main_fn(vec![
        Statement::Expression(call_ident("f", vec![num("1")])),
        Statement::Expression(call_ident("f", vec![float("1.0")])),
    ]));
    let t = run_file(file);
    assert!(!t.diags.has_errors(), "{:?}", t.diags.diagnostics());

    let body = main_body(&t);
    let (first, _) = as_call(&body[0]);
    let (second, _) = as_call(&body[1]);
    assert!(t.funcs.get(*first).args[0].ty.equals(&Type::I32));
    assert!(t.funcs.get(*second).args[0].ty.equals(&Type::F64));
}

#[test]
fn scenario_overload_resolution_rejects_unmatched_argument() {
    let mut file = overload_pair();
    file.push(main_fn(vec![Statement::Expression(call_ident(
        "f",
        vec![boolean(true)],
    ))]));
    let t = run_file(file);
    assert!(t.diags.has_errors());
    assert!(t
        .diags
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("No matching overload")));
}

#[test]
fn overload_resolution_is_insertion_order_independent() {
    // The winner does not depend on where irrelevant candidates sit.
    for flipped in [false, true] {
        let mut file = overload_pair();
        if flipped {
            file.reverse();
        }
        file.push(main_fn(vec![Statement::Expression(call_ident(
            "f",
            vec![num("1")],
        ))]));
        let t = run_file(file);
        assert!(!t.diags.has_errors(), "{:?}", t.diags.diagnostics());
        let body = main_body(&t);
        let (callee, _) = as_call(&body[0]);
        assert!(t.funcs.get(*callee).args[0].ty.equals(&Type::I32));
    }
}

#[test]
fn scenario_virtual_method_reserves_vtable_slot() {
    // class A {}  class B extends A { virtual func m() {} }
    let class_a = Statement::ClassDef(ClassDef::new("A", sp()));

    let mut class_b = ClassDef::new("B", sp());
    class_b.parent = Some(tyref("A"));
    let mut m = FunctionDef::new("m", sp());
    m.is_virtual = true;
    m.body = FunctionBody::Bodied(block(Vec::new()));
    class_b.methods = vec![m];
    class_b.fields = vec![VariableDecl {
        name: "flag".to_string(),
        ty: Some(tyref("bool")),
        value: None,
        mutable: false,
        privacy: Privacy::Public,
        span: sp(),
    }];

    let new_b = Expression::NewInstance(NewInstance {
        ty: tyref("B"),
        args: Vec::new(),
        span: sp(),
    });
    let t = run_file(vec![
        class_a,
        Statement::ClassDef(class_b),
        main_fn(vec![let_stmt("b", None, Some(new_b))]),
    ]);
    assert!(!t.diags.has_errors(), "{:?}", t.diags.diagnostics());

    let layout = t.types.class("pkg$main.B:0").expect("B layout");
    assert!(layout.has_vtable);
    assert_eq!(layout.vtable_names, vec!["m".to_string()]);
    // With a vtable, field 0 extracts from structural slot 1
    assert_eq!(layout.structural_slot(0), 1);

    let m_funcs = t
        .cache
        .transformed_function("pkg$main.B:0.m")
        .expect("m instantiated");
    assert_eq!(t.funcs.get(m_funcs[0]).virtual_index, Some(0));

    // A carries no vtable
    let a_layout = t.types.class("pkg$main.A:0").expect("A layout");
    assert!(!a_layout.has_vtable);
    assert_eq!(a_layout.structural_slot(0), 0);
}

#[test]
fn generic_instantiation_is_idempotent() {
    // Two `new A<i32>()` yield a single instantiation with one uuid
    let new_a = || {
        Expression::NewInstance(NewInstance {
            ty: TypeRef::generic("A", vec![tyref("i32")], sp()),
            args: Vec::new(),
            span: sp(),
        })
    };
    let t = run_file(vec![
        generic_class_a(),
        main_fn(vec![
            let_stmt("first", None, Some(new_a())),
            let_stmt("second", None, Some(new_a())),
        ]),
    ]);
    assert!(!t.diags.has_errors(), "{:?}", t.diags.diagnostics());

    let instances = t.cache.transformed_types("pkg$main.A").expect("A instantiated");
    assert_eq!(instances.len(), 1);

    let body = main_body(&t);
    assert!(body[0].ty.equals(&body[1].ty));
}

#[test]
fn namespaces_nest_modules_and_resolve_statically() {
    // namespace util { func helper() {} }  main { util::helper() }
    let helper = function("helper", Vec::new(), None, Vec::new());
    let ns = Statement::Namespace(Namespace {
        name: "util".to_string(),
        body: vec![helper],
        span: sp(),
    });
    let call = Expression::FunctionCall(FunctionCall {
        callee: Box::new(Expression::Index(Index {
            base: Box::new(ident("util")),
            identifier: Identifier::new("helper", sp()),
            is_static: true,
            span: sp(),
        })),
        args: Vec::new(),
        span: sp(),
    });
    let t = run_file(vec![ns, main_fn(vec![Statement::Expression(call)])]);
    assert!(!t.diags.has_errors(), "{:?}", t.diags.diagnostics());

    let helper = t
        .cache
        .transformed_function("pkg$main.util.helper")
        .expect("helper transformed");
    assert_eq!(t.funcs.get(helper[0]).module_prefix, "pkg$main.util");
}

#[test]
fn missing_return_in_non_void_function_is_reported() {
    let f = function("answer", Vec::new(), Some("i32"), Vec::new());
    let t = run_file(vec![f]);
    assert!(t.diags.has_errors());
    assert!(t
        .diags
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("return")));
}

#[test]
fn assignment_requires_mutable_target() {
    let decl = let_stmt("x", Some(tyref("i32")), Some(num("1")));
    let assign = Statement::Expression(bin(OpType::Assign, ident("x"), num("2")));
    let t = run_main(vec![decl, assign]);
    assert!(t.diags.has_errors());
    assert!(t
        .diags
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("immutable")));
}

#[test]
fn conditions_must_be_boolean() {
    let cond = Statement::Conditional(Conditional {
        condition: num("1"),
        then_block: block(Vec::new()),
        else_block: None,
        span: sp(),
    });
    let t = run_main(vec![cond]);
    assert!(t.diags.has_errors());
    assert!(t
        .diags
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("bool")));
}

#[test]
fn pattern_switch_must_be_exhaustive() {
    // enum Shape { Dot, Line(i32) } with a switch missing `Line`
    let shape = Statement::EnumDef(EnumDef {
        name: "Shape".to_string(),
        generics: Vec::new(),
        variants: vec![
            EnumVariant {
                name: "Dot".to_string(),
                payload: Vec::new(),
                span: sp(),
            },
            EnumVariant {
                name: "Line".to_string(),
                payload: vec![tyref("i32")],
                span: sp(),
            },
        ],
        privacy: Privacy::Public,
        span: sp(),
    });

    let scrutinee = Expression::Index(Index {
        base: Box::new(Expression::TypeRef(tyref("Shape"))),
        identifier: Identifier::new("Dot", sp()),
        is_static: true,
        span: sp(),
    });
    let switch = Statement::Switch(Switch {
        value: scrutinee,
        kind: SwitchKind::Pattern {
            cases: vec![PatternCase {
                variant: "Dot".to_string(),
                bindings: Vec::new(),
                block: block(Vec::new()),
                span: sp(),
            }],
        },
        span: sp(),
    });

    let t = run_file(vec![shape, main_fn(vec![switch])]);
    assert!(t.diags.has_errors());
    assert!(t
        .diags
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("missing a case")));
}

#[test]
fn numeric_literal_prefixes_select_width_and_sign() {
    let t = run_main(vec![
        let_stmt("a", None, Some(num("42"))),
        let_stmt("b", None, Some(num("l42"))),
        let_stmt("c", None, Some(num("u42"))),
        let_stmt("d", None, Some(num("ul42"))),
        let_stmt("e", None, Some(num("0x2a"))),
    ]);
    assert!(!t.diags.has_errors(), "{:?}", t.diags.diagnostics());

    let body = main_body(&t);
    assert!(body[0].ty.equals(&Type::I32));
    assert!(body[1].ty.equals(&Type::I64));
    assert!(body[2].ty.equals(&Type::U32));
    assert!(body[3].ty.equals(&Type::U64));
    assert!(body[4].ty.equals(&Type::I32));
    if let ValueKind::VariableDecl { value: Some(init), .. } = &body[4].kind {
        assert!(matches!(
            init.kind,
            ValueKind::Constant(frost_ir::Constant::Int(42))
        ));
    }
}
