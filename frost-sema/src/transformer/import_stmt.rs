// The import pipeline: resolve the path, detect cycles, drive the whole
// lex/parse/transform/analyze pipeline for the dependency, then bind the
// module (and any re-exported macros) into the importer's scope.

use super::{SemaResult, Transformer};
use crate::context::{ContextSnapshot, Scope};
use crate::imports::{ImportDriver, ImportState, STD_PACKAGE};
use crate::item::Item;
use frost_ast as ast;
use frost_diagnostics::{Category, Diagnostic, Span};
use frost_ir::Module;

fn already_defined(span: &Span, name: &str) -> Diagnostic {
    Transformer::err(
        Category::Import,
        span,
        format!("Import with name '{}' is already defined!", name),
    )
    .with_info("This is the import that was used")
    .with_note(
        "It may be possible that you have imported the same module twice\n\
         or that this symbol is already defined in the same stack.",
    )
    .with_help(
        "If you want to import the same module twice, you can use the 'as'\n\
         keyword to give it a different name.",
    )
}

impl Transformer {
    pub(crate) fn transform_import(&mut self, node: &ast::Import) -> SemaResult<()> {
        if self.ctx.generate_function {
            return Ok(());
        }
        let span = node.span.clone();

        let file_path = self
            .imports
            .resolve(&node.package, &node.path, self.frontend.as_ref())
            .map_err(|e| Self::err(Category::Import, &span, e.to_string()))?;

        let uuid = if node.package == STD_PACKAGE {
            format!("std${}", node.path.join("."))
        } else {
            self.imports.module_uuid(&file_path)
        };
        let export_name = ImportDriver::export_name(&node.path, node.export_symbol.as_deref());

        if self.ctx.get_item(&export_name).is_some() {
            return Err(already_defined(&span, &export_name));
        }

        let module_id = match self.imports.state(&file_path) {
            Some(ImportState::Done(id)) => id,
            Some(ImportState::InProgress) => {
                return Err(Self::err(
                    Category::Import,
                    &span,
                    format!(
                        "Import cycle detected while importing '{}::{}'!",
                        node.package,
                        node.path.join("::")
                    ),
                )
                .with_note("this module is still being transformed"));
            }
            None => self.compile_dependency(node, &span, &file_path, &uuid)?,
        };

        self.ctx
            .add_item(&export_name, Item::Module(module_id))
            .map_err(|_| already_defined(&span, &export_name))?;

        if let Some(args) = node.attributes.args(ast::Attribute::Macros).cloned() {
            let exported = self.modules.get(module_id).exported_macros.clone();
            if args.is_empty() {
                for (name, def) in exported {
                    self.bind_imported_macro(&span, &name, def)?;
                }
            } else {
                for (name, value) in args {
                    if !value.is_empty() {
                        return Err(Self::err(
                            Category::Attribute,
                            &span,
                            format!("Attribute 'macros({})' does not take any arguments!", name),
                        ));
                    }
                    let def = exported.get(&name).cloned().ok_or_else(|| {
                        Self::err(
                            Category::Attribute,
                            &span,
                            format!("Macro '{}' does not exist or hasn't been exported!", name),
                        )
                        .with_info("This is the macro that was used")
                        .with_note(
                            "It may be possible that you forgot to use the 'export' keyword\n\
                             or that this macro does not exist in the imported module.",
                        )
                        .with_help(
                            "If you want to import the macro from the module, you need to use\n\
                             the 'export' keyword in front of the macro.",
                        )
                    })?;
                    self.bind_imported_macro(&span, &name, def)?;
                }
            }
        }

        Ok(())
    }

    /// Synchronously run the whole pipeline for a dependency. The
    /// dependency is fully generated before the importer continues.
    fn compile_dependency(
        &mut self,
        node: &ast::Import,
        span: &Span,
        file_path: &std::path::Path,
        uuid: &str,
    ) -> SemaResult<frost_ir::ModuleId> {
        self.imports.mark_in_progress(file_path);

        let mut nice_name = format!("{}::{}", node.package, node.path.join("::"));
        if nice_name == "std::std" {
            nice_name = "std".to_string();
        }
        log::debug!("compiling dependency '{}' from {:?}", nice_name, file_path);

        let mut module = Module::new(&nice_name, uuid);
        module.source_path = Some(file_path.to_path_buf());
        let module_id = self.modules.add(module);
        self.cache.add_module(uuid, module_id);

        let parent_dir = file_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        self.imports.push_package_path(parent_dir);

        // Fresh context: a root scope carrying only the builtin module
        // binding, and a UUID stack rooted at the importer's root.
        let fresh = ContextSnapshot {
            scopes: vec![self.root_scope()],
            module: module_id,
            current_class: None,
        };
        let previous = self.ctx.swap_state(&fresh);
        let uuid_stack_backup = std::mem::take(&mut self.ctx.uuid_stack);
        if let Some(root) = uuid_stack_backup.first() {
            self.ctx.uuid_stack.push(root.clone());
        }

        let result = (|| -> SemaResult<()> {
            let file = self.frontend.load(file_path)?;
            let backup_generate = self.ctx.generate_function;
            self.ctx.generate_function = false;
            self.transform_top_level(&file);
            self.ctx.generate_function = true;
            self.transform_top_level(&file);
            self.ctx.generate_function = backup_generate;
            Ok(())
        })();

        self.ctx.uuid_stack = uuid_stack_backup;
        self.ctx.restore_state(previous);
        self.imports.pop_package_path();

        result.map_err(|diag| {
            Self::err(
                Category::Import,
                span,
                format!("Failed to compile module '{}'!", nice_name),
            )
            .with_note(diag.message)
        })?;

        self.imports.finish(file_path, module_id);
        Ok(module_id)
    }

    fn bind_imported_macro(
        &mut self,
        span: &Span,
        name: &str,
        def: ast::MacroDef,
    ) -> SemaResult<()> {
        if self.ctx.in_current_scope(name) {
            return Err(already_defined(span, name));
        }
        self.ctx
            .add_item(name, Item::Macro(def))
            .map_err(|_| already_defined(span, name))
    }

    /// The scope every fresh dependency starts from.
    fn root_scope(&self) -> Scope {
        let mut scope = Scope::new();
        if let Some(std_module) = self.cache.module("std") {
            scope.insert("std".to_string(), Item::Module(std_module));
        }
        scope
    }
}
