//! Statement lowering.

use crate::ast::{Expression, ExpressionKind, FunctionDecl, Statement, Type};

use super::types::{cpp_type_name, sanitize};
use super::CodeGenerator;

impl CodeGenerator {
    pub(crate) fn gen_statement(&mut self, stmt: &Statement) -> String {
        match stmt {
            Statement::VariableDeclaration {
                name,
                var_type,
                cpp_type,
                initializer,
                is_const,
            } => self.gen_variable_declaration(name, *var_type, cpp_type, initializer, *is_const),
            Statement::FunctionDeclaration(func) => self.gen_function_declaration(func),
            Statement::ClassDeclaration(class) => self.gen_class_declaration(class),
            Statement::Return(value) => {
                let mut out = format!("{}return", self.indent());
                if let Some(value) = value {
                    out.push(' ');
                    out.push_str(&self.gen_expression(value));
                }
                out.push_str(";\n");
                out
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut out = format!("{}if ({}) {{\n", self.indent(), self.gen_expression(condition));
                out.push_str(&self.gen_body(then_branch));
                out.push_str(&self.indent());
                out.push('}');
                if !else_branch.is_empty() {
                    out.push_str(" else {\n");
                    out.push_str(&self.gen_body(else_branch));
                    out.push_str(&self.indent());
                    out.push('}');
                }
                out.push('\n');
                out
            }
            Statement::While { condition, body } => {
                let mut out = format!(
                    "{}while ({}) {{\n",
                    self.indent(),
                    self.gen_expression(condition)
                );
                out.push_str(&self.gen_body(body));
                out.push_str(&self.indent());
                out.push_str("}\n");
                out
            }
            Statement::For {
                initializer,
                condition,
                increment,
                body,
            } => self.gen_for(initializer.as_deref(), condition, increment, body),
            Statement::Try {
                try_block,
                catch_var,
                catch_block,
                finally_block,
            } => self.gen_try(try_block, catch_var.as_deref(), catch_block, finally_block),
            Statement::Throw(expr) => {
                format!("{}throw {};\n", self.indent(), self.gen_expression(expr))
            }
            Statement::Block(statements) => {
                let mut out = format!("{}{{\n", self.indent());
                out.push_str(&self.gen_body(statements));
                out.push_str(&self.indent());
                out.push_str("}\n");
                out
            }
            Statement::Expression(expr) => {
                format!("{}{};\n", self.indent(), self.gen_expression(expr))
            }
        }
    }

    /// A statement list one level deeper than the current indent.
    pub(crate) fn gen_body(&mut self, statements: &[Statement]) -> String {
        let mut out = String::new();
        self.indent_level += 1;
        for stmt in statements {
            out.push_str(&self.gen_statement(stmt));
        }
        self.indent_level -= 1;
        out
    }

    fn gen_variable_declaration(
        &mut self,
        name: &str,
        var_type: Type,
        cpp_type: &Option<String>,
        initializer: &Option<Expression>,
        is_const: bool,
    ) -> String {
        let mut out = self.indent();
        if is_const {
            out.push_str("const ");
        }

        // An explicitly captured annotation wins so generic forms like
        // Array<Thread> pass through verbatim.
        let declared = match cpp_type {
            Some(cpp) => cpp.as_str(),
            None if var_type != Type::Any => cpp_type_name(var_type),
            None => "auto",
        };
        out.push_str(declared);
        out.push(' ');
        out.push_str(&sanitize(name));

        if let Some(init) = initializer {
            let is_empty_array = matches!(
                &init.kind,
                ExpressionKind::ArrayLiteral { elements, .. } if elements.is_empty()
            );
            let is_empty_generic_ctor = cpp_type.as_ref().is_some_and(|cpp| {
                matches!(
                    &init.kind,
                    ExpressionKind::New { class_name, arguments }
                        if arguments.is_empty() && cpp.starts_with(class_name.as_str())
                )
            });

            if is_empty_array && cpp_type.is_some() {
                // The annotation already fixes the element type.
                out.push_str(" = {}");
            } else if is_empty_generic_ctor {
                // Default construction: `Map<K, V> m;` instead of `= Map()`.
            } else {
                out.push_str(" = ");
                out.push_str(&self.gen_expression(init));
            }
        }
        out.push_str(";\n");

        // Remember the declared type so later member dispatch can resolve
        // this identifier. The annotation wins; otherwise the initializer's
        // derived type is the best local evidence.
        let recorded = if var_type != Type::Any {
            var_type
        } else {
            initializer.as_ref().map(|init| init.ty).unwrap_or(Type::Any)
        };
        self.record_variable_type(name, recorded);

        out
    }

    fn gen_function_declaration(&mut self, func: &FunctionDecl) -> String {
        // A user `main` keeps its name and gets the int return type the
        // backend expects.
        let is_main = func.name == "main";
        let return_type = if is_main {
            "int"
        } else {
            cpp_type_name(func.return_type)
        };
        let name = if is_main {
            func.name.clone()
        } else {
            sanitize(&func.name)
        };

        let params = func
            .params
            .iter()
            .map(|p| format!("{} {}", cpp_type_name(p.ty), sanitize(&p.name)))
            .collect::<Vec<_>>()
            .join(", ");

        let mut out = format!("{}{} {}({}) {{\n", self.indent(), return_type, name, params);
        out.push_str(&self.gen_body(&func.body));
        out.push_str(&self.indent());
        out.push_str("}\n\n");
        out
    }

    fn gen_for(
        &mut self,
        initializer: Option<&Statement>,
        condition: &Option<Expression>,
        increment: &Option<Expression>,
        body: &[Statement],
    ) -> String {
        let mut out = format!("{}for (", self.indent());
        if let Some(init) = initializer {
            // The initializer re-uses statement emission; the surrounding
            // whitespace and trailing ';' must not reach the for-header.
            let init_code = self.gen_statement(init);
            out.push_str(init_code.trim().trim_end_matches(';').trim_end());
        }
        out.push_str("; ");
        if let Some(condition) = condition {
            out.push_str(&self.gen_expression(condition));
        }
        out.push_str("; ");
        if let Some(increment) = increment {
            out.push_str(&self.gen_expression(increment));
        }
        out.push_str(") {\n");
        out.push_str(&self.gen_body(body));
        out.push_str(&self.indent());
        out.push_str("}\n");
        out
    }

    /// try/catch/finally lowers to a block-scoped structure. The finally body
    /// lives in a guard whose destructor runs on every exit path. Catch binds
    /// the thrown value for string and C-string payloads and falls back to a
    /// placeholder diagnostic for anything else.
    fn gen_try(
        &mut self,
        try_block: &[Statement],
        catch_var: Option<&str>,
        catch_block: &[Statement],
        finally_block: &[Statement],
    ) -> String {
        let outer = self.indent();
        let mut out = format!("{}{{\n", outer);
        self.indent_level += 1;

        if !finally_block.is_empty() {
            out.push_str(&format!("{}struct Finally {{\n", self.indent()));
            out.push_str(&format!("{}    std::function<void()> body;\n", self.indent()));
            out.push_str(&format!("{}    ~Finally() {{ body(); }}\n", self.indent()));
            out.push_str(&format!("{}}} finally_guard{{[&]() {{\n", self.indent()));
            out.push_str(&self.gen_body(finally_block));
            out.push_str(&format!("{}}}}};\n", self.indent()));
        }

        out.push_str(&format!("{}try {{\n", self.indent()));
        out.push_str(&self.gen_body(try_block));

        match catch_var {
            Some(var) => {
                let var = sanitize(var);
                out.push_str(&format!(
                    "{}}} catch (const std::string& {}) {{\n",
                    self.indent(),
                    var
                ));
                out.push_str(&self.gen_body(catch_block));

                out.push_str(&format!(
                    "{}}} catch (const char* {}_cstr) {{\n",
                    self.indent(),
                    var
                ));
                self.indent_level += 1;
                out.push_str(&format!(
                    "{}std::string {}({}_cstr);\n",
                    self.indent(),
                    var,
                    var
                ));
                self.indent_level -= 1;
                out.push_str(&self.gen_body(catch_block));

                out.push_str(&format!("{}}} catch (...) {{\n", self.indent()));
                self.indent_level += 1;
                out.push_str(&format!(
                    "{}std::string {} = \"Unknown error\";\n",
                    self.indent(),
                    var
                ));
                self.indent_level -= 1;
                out.push_str(&self.gen_body(catch_block));
                out.push_str(&format!("{}}}\n", self.indent()));
            }
            None => {
                // No catch clause: rethrow so the guard still runs while the
                // exception keeps propagating.
                out.push_str(&format!("{}}} catch (...) {{\n", self.indent()));
                self.indent_level += 1;
                out.push_str(&format!("{}throw;\n", self.indent()));
                self.indent_level -= 1;
                out.push_str(&format!("{}}}\n", self.indent()));
            }
        }

        self.indent_level -= 1;
        out.push_str(&format!("{}}}\n", outer));
        out
    }
}
