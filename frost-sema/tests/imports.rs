// Import pipeline: dependency compilation, caching, rebinding errors,
// cycle detection, and macro re-exports.

mod common;

use common::*;
use frost_ast::*;
use frost_sema::MapFrontend;

fn import(package: &str, path: &[&str]) -> Statement {
    Statement::Import(Import {
        package: package.to_string(),
        path: path.iter().map(|s| s.to_string()).collect(),
        export_symbol: None,
        attributes: Attributes::new(),
        span: sp(),
    })
}

#[test]
fn import_binds_module_and_compiles_it() {
    let mut frontend = MapFrontend::new();
    frontend.insert(
        "/frost/std/io.fr",
        vec![function("print_line", Vec::new(), None, Vec::new())],
    );

    let mut t = new_transformer(frontend);
    let file = vec![import("std", &["io"]), main_fn(Vec::new())];
    let _ = t.run(&file);
    assert!(!t.diags.has_errors(), "{:?}", t.diags.diagnostics());

    // The dependency was fully generated before main continued
    assert!(t
        .cache
        .transformed_function("std$io.print_line")
        .is_some());
    let io = t
        .modules
        .iter()
        .find(|m| m.name == "std::io")
        .expect("io module created");
    assert_eq!(io.unique_name, "std$io");
}

#[test]
fn importing_the_same_name_twice_is_an_error() {
    let mut frontend = MapFrontend::new();
    frontend.insert("/frost/std/io.fr", Vec::new());

    let mut t = new_transformer(frontend);
    let file = vec![
        import("std", &["io"]),
        import("std", &["io"]),
        main_fn(Vec::new()),
    ];
    let _ = t.run(&file);

    assert!(t.diags.has_errors());
    assert!(t
        .diags
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("already defined")));
}

#[test]
fn an_alias_allows_importing_twice() {
    let mut frontend = MapFrontend::new();
    frontend.insert("/frost/std/io.fr", Vec::new());

    let mut t = new_transformer(frontend);
    let second = Import {
        package: "std".to_string(),
        path: vec!["io".to_string()],
        export_symbol: Some("io2".to_string()),
        attributes: Attributes::new(),
        span: sp(),
    };
    let file = vec![
        import("std", &["io"]),
        Statement::Import(second),
        main_fn(Vec::new()),
    ];
    let _ = t.run(&file);
    assert!(!t.diags.has_errors(), "{:?}", t.diags.diagnostics());
}

#[test]
fn import_cycles_are_detected() {
    let mut frontend = MapFrontend::new();
    frontend.insert("/work/a.fr", vec![import("$", &["b"])]);
    frontend.insert("/work/b.fr", vec![import("$", &["a"])]);

    let mut t = new_transformer(frontend);
    let file = vec![import("$", &["a"]), main_fn(Vec::new())];
    let _ = t.run(&file);

    assert!(t.diags.has_errors());
    assert!(t
        .diags
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("cycle")));
}

#[test]
fn exported_macros_re_export_on_request() {
    let mut exported = MacroDef {
        name: "trace".to_string(),
        params: Vec::new(),
        body: Vec::new(),
        attributes: Attributes::new(),
        span: sp(),
    };
    exported
        .attributes
        .add(Attribute::Export, AttributeArgs::new());
    let private = MacroDef {
        name: "hidden".to_string(),
        params: Vec::new(),
        body: Vec::new(),
        attributes: Attributes::new(),
        span: sp(),
    };

    let mut frontend = MapFrontend::new();
    frontend.insert(
        "/frost/std/macros.fr",
        vec![
            Statement::MacroDef(exported),
            Statement::MacroDef(private),
        ],
    );

    // importing with macros(trace) binds it; macros(hidden) errors
    let mut with_macros = Import {
        package: "std".to_string(),
        path: vec!["macros".to_string()],
        export_symbol: None,
        attributes: Attributes::new(),
        span: sp(),
    };
    let mut args = AttributeArgs::new();
    args.insert("trace".to_string(), String::new());
    with_macros.attributes.add(Attribute::Macros, args);

    let mut t = new_transformer(frontend);
    let file = vec![Statement::Import(with_macros), main_fn(Vec::new())];
    let _ = t.run(&file);
    assert!(!t.diags.has_errors(), "{:?}", t.diags.diagnostics());
    assert!(t.ctx.get_item("trace").is_some());
    assert!(t.ctx.get_item("hidden").is_none());
}

#[test]
fn requesting_a_missing_macro_is_an_attribute_error() {
    let mut frontend = MapFrontend::new();
    frontend.insert("/frost/std/macros.fr", Vec::new());

    let mut with_macros = Import {
        package: "std".to_string(),
        path: vec!["macros".to_string()],
        export_symbol: None,
        attributes: Attributes::new(),
        span: sp(),
    };
    let mut args = AttributeArgs::new();
    args.insert("nope".to_string(), String::new());
    with_macros.attributes.add(Attribute::Macros, args);

    let mut t = new_transformer(frontend);
    let file = vec![Statement::Import(with_macros), main_fn(Vec::new())];
    let _ = t.run(&file);

    assert!(t.diags.has_errors());
    assert!(t
        .diags
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("does not exist")));
}

#[test]
fn unresolvable_imports_report_an_import_error() {
    let mut t = new_transformer(MapFrontend::new());
    let file = vec![import("std", &["missing"]), main_fn(Vec::new())];
    let _ = t.run(&file);

    assert!(t.diags.has_errors());
    assert!(t
        .diags
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("not found")));
}
