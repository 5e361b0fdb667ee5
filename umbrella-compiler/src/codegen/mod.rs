//! C++ code generation for the Umbrella compiler.
//!
//! The generator walks the AST and produces a single C++ translation unit
//! against the runtime headers. It is split into submodules:
//! - statements: statement lowering and the synthesized `main`
//! - expressions: expression lowering
//! - classes: class lowering
//! - types: C++ type mapping, sanitizer and string escaping
//!
//! Lowering is deterministic: the same program produces byte-identical
//! output on every run.

mod classes;
mod expressions;
mod statements;
pub mod types;

use std::collections::HashMap;

use crate::ast::{Program, Statement, Type};

/// Fixed preamble: standard facilities, the runtime headers, and the
/// directive that opens the runtime namespace.
const PREAMBLE: &str = "#include <iostream>\n\
#include <string>\n\
#include <vector>\n\
#include <chrono>\n\
#include <cmath>\n\
#include <algorithm>\n\
#include <cstdlib>\n\
#include <ctime>\n\
#include <functional>\n\
#include \"runtime.h\"\n\
#include \"system.h\"\n\
\n\
using namespace umbrella::runtime;\n\
\n";

pub struct CodeGenerator {
    indent_level: usize,
    warnings: Vec<String>,
    /// Declared variable types, recorded at each declaration so member
    /// dispatch and concatenation can resolve otherwise untyped identifiers.
    variable_types: HashMap<String, Type>,
}

impl CodeGenerator {
    pub fn new() -> Self {
        CodeGenerator {
            indent_level: 0,
            warnings: Vec::new(),
            variable_types: HashMap::new(),
        }
    }

    /// Render a program as C++ source. Function, class and module-level
    /// variable declarations land at file scope; the remaining loose
    /// statements are aggregated into a synthesized `main` unless the
    /// program declares its own.
    pub fn generate(&mut self, program: &Program) -> String {
        self.indent_level = 0;
        self.warnings.clear();
        self.variable_types.clear();

        let mut declarations = String::new();
        let mut loose: Vec<&Statement> = Vec::new();
        let mut has_user_main = false;

        for stmt in &program.statements {
            match stmt {
                Statement::FunctionDeclaration(func) => {
                    if func.name == "main" {
                        has_user_main = true;
                    }
                    declarations.push_str(&self.gen_statement(stmt));
                }
                Statement::ClassDeclaration(_) | Statement::VariableDeclaration { .. } => {
                    declarations.push_str(&self.gen_statement(stmt));
                }
                _ => loose.push(stmt),
            }
        }

        let mut out = String::from(PREAMBLE);
        out.push_str(&declarations);

        if !has_user_main {
            out.push_str("int main() {\n");
            self.indent_level = 1;
            for stmt in &loose {
                out.push_str(&self.gen_statement(stmt));
            }
            self.indent_level = 0;
            out.push_str("    return 0;\n}\n");
        } else if !loose.is_empty() {
            self.warnings.push(
                "top-level statements conflict with the user-declared 'main'; \
                 they are emitted at file scope and will likely not compile"
                    .to_string(),
            );
            for stmt in &loose {
                out.push_str(&self.gen_statement(stmt));
            }
        }

        out
    }

    /// Emit-time diagnostics collected during the last `generate` call.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub(crate) fn indent(&self) -> String {
        "    ".repeat(self.indent_level)
    }

    pub(crate) fn record_variable_type(&mut self, name: &str, ty: Type) {
        self.variable_types.insert(name.to_string(), ty);
    }

    pub(crate) fn declared_type_of(&self, name: &str) -> Option<Type> {
        self.variable_types.get(name).copied()
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}
