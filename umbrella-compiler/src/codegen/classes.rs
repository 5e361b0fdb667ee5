//! Class lowering: record types with public members, constructor and
//! methods in declaration order, public single inheritance.

use crate::ast::ClassDecl;

use super::types::{cpp_type_name, sanitize};
use super::CodeGenerator;

impl CodeGenerator {
    pub(crate) fn gen_class_declaration(&mut self, class: &ClassDecl) -> String {
        let mut out = format!("{}struct {}", self.indent(), sanitize(&class.name));
        if let Some(super_name) = &class.superclass {
            out.push_str(&format!(" : public {}", sanitize(super_name)));
        }
        out.push_str(" {\n");
        self.indent_level += 1;

        for field in &class.fields {
            out.push_str(&format!(
                "{}{} {}",
                self.indent(),
                cpp_type_name(field.ty),
                sanitize(&field.name)
            ));
            if let Some(init) = &field.initializer {
                out.push_str(" = ");
                out.push_str(&self.gen_expression(init));
            }
            out.push_str(";\n");
        }

        if let Some(ctor) = &class.constructor {
            let params = ctor
                .params
                .iter()
                .map(|p| format!("{} {}", cpp_type_name(p.ty), sanitize(&p.name)))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "\n{}{}({}) {{\n",
                self.indent(),
                sanitize(&class.name),
                params
            ));
            out.push_str(&self.gen_body(&ctor.body));
            out.push_str(&self.indent());
            out.push_str("}\n");
        }

        for method in &class.methods {
            let params = method
                .params
                .iter()
                .map(|p| format!("{} {}", cpp_type_name(p.ty), sanitize(&p.name)))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "\n{}{} {}({}) {{\n",
                self.indent(),
                cpp_type_name(method.return_type),
                sanitize(&method.name),
                params
            ));
            out.push_str(&self.gen_body(&method.body));
            out.push_str(&self.indent());
            out.push_str("}\n");
        }

        self.indent_level -= 1;
        out.push_str(&format!("{}}};\n\n", self.indent()));
        out
    }
}
