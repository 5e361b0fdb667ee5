//! Expression lowering.

use crate::ast::{AssignOp, BinaryOp, Expression, ExpressionKind, FunctionLiteral, Type, UnaryOp};

use super::types::{cpp_type_name, escape_string, is_static_namespace, is_string_method, sanitize};
use super::CodeGenerator;

impl CodeGenerator {
    pub(crate) fn gen_expression(&mut self, expr: &Expression) -> String {
        match &expr.kind {
            ExpressionKind::NumberLiteral(value) => value.into_inner().to_string(),
            ExpressionKind::StringLiteral(value) => {
                format!("std::string(\"{}\")", escape_string(value))
            }
            ExpressionKind::BooleanLiteral(value) => {
                if *value { "true" } else { "false" }.to_string()
            }
            ExpressionKind::Identifier(name) => {
                if name == "this" {
                    "this".to_string()
                } else {
                    sanitize(name)
                }
            }
            ExpressionKind::Binary { op, left, right } => self.gen_binary(*op, left, right),
            ExpressionKind::Unary { op, operand } => self.gen_unary(*op, operand),
            ExpressionKind::Assignment { left, op, right } => self.gen_assignment(left, *op, right),
            ExpressionKind::Call { callee, arguments } => self.gen_call(callee, arguments),
            ExpressionKind::ArrayLiteral {
                elements,
                element_type,
            } => self.gen_array_literal(elements, *element_type),
            ExpressionKind::MapLiteral {
                keys,
                values,
                value_type,
            } => self.gen_map_literal(keys, values, *value_type),
            ExpressionKind::Index { array, index } => {
                format!(
                    "{}[{}]",
                    self.gen_expression(array),
                    self.gen_expression(index)
                )
            }
            ExpressionKind::Member { object, property } => self.gen_member(object, property),
            ExpressionKind::New {
                class_name,
                arguments,
            } => {
                format!("{}({})", sanitize(class_name), self.gen_args(arguments))
            }
            ExpressionKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                format!(
                    "({} ? {} : {})",
                    self.gen_expression(condition),
                    self.gen_expression(then_expr),
                    self.gen_expression(else_expr)
                )
            }
            ExpressionKind::Function(func) => self.gen_function_literal(func),
        }
    }

    /// The expression's derived type, upgraded through the declared-variable
    /// table when the parser could only say `Any`.
    fn resolve_type(&self, expr: &Expression) -> Type {
        if expr.ty != Type::Any {
            return expr.ty;
        }
        if let ExpressionKind::Identifier(name) = &expr.kind {
            if let Some(ty) = self.declared_type_of(name) {
                return ty;
            }
        }
        Type::Any
    }

    fn gen_args(&mut self, arguments: &[Expression]) -> String {
        arguments
            .iter()
            .map(|arg| self.gen_expression(arg))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `+` dispatches on the derived operand types: when either side is a
    /// string, non-string sides are stringified so concatenation survives the
    /// C++ type system. Untyped (`Any`) operands fall back to plain addition
    /// text, which is what the runtime's operator overloads expect.
    fn gen_binary(&mut self, op: BinaryOp, left: &Expression, right: &Expression) -> String {
        let l = self.gen_expression(left);
        let r = self.gen_expression(right);
        let lt = self.resolve_type(left);
        let rt = self.resolve_type(right);

        if op == BinaryOp::Add && (lt == Type::String || rt == Type::String) {
            let ls = if lt == Type::Number || lt == Type::Boolean {
                format!("toString({})", l)
            } else {
                l
            };
            let rs = if rt == Type::Number || rt == Type::Boolean {
                format!("toString({})", r)
            } else {
                r
            };
            return format!("({} + {})", ls, rs);
        }

        // Bitwise operators need an integer view of the double number type.
        if op.is_bitwise() {
            return format!("((long long){} {} (long long){})", l, op.symbol(), r);
        }

        format!("({} {} {})", l, op.symbol(), r)
    }

    fn gen_unary(&mut self, op: UnaryOp, operand: &Expression) -> String {
        if op == UnaryOp::BitNot {
            return format!("(double)(~(long long){})", self.gen_expression(operand));
        }
        format!("({}{})", op.symbol(), self.gen_expression(operand))
    }

    fn gen_assignment(&mut self, left: &Expression, op: AssignOp, right: &Expression) -> String {
        let l = self.gen_expression(left);
        let r = self.gen_expression(right);
        // Compound bitwise assignment re-associates through the integer view.
        if let Some(base) = op.bitwise_base() {
            return format!("{} = ((long long){} {} (long long){})", l, l, base, r);
        }
        format!("{} {} {}", l, op.symbol(), r)
    }

    fn gen_call(&mut self, callee: &Expression, arguments: &[Expression]) -> String {
        // print/println lower to stream insertions so each argument keeps its
        // type-directed formatting.
        if let ExpressionKind::Identifier(name) = &callee.kind {
            if name == "print" || name == "println" {
                let mut out = String::from("std::cout");
                for arg in arguments {
                    out.push_str(" << ");
                    out.push_str(&self.gen_expression(arg));
                }
                if name == "println" {
                    out.push_str(" << std::endl");
                }
                return out;
            }
        }

        // Instance-style string methods become String:: helpers with the
        // receiver as first argument.
        if let ExpressionKind::Member { object, property } = &callee.kind {
            let object_is_namespace = matches!(
                &object.kind,
                ExpressionKind::Identifier(n) if is_static_namespace(n)
            );
            let receiver_ty = self.resolve_type(object);
            let receiver_may_be_string =
                receiver_ty == Type::String || receiver_ty == Type::Any;
            if !object_is_namespace && receiver_may_be_string && is_string_method(property) {
                let mut out = format!("String::{}({}", property, self.gen_expression(object));
                for arg in arguments {
                    out.push_str(", ");
                    out.push_str(&self.gen_expression(arg));
                }
                out.push(')');
                return out;
            }
        }

        format!("{}({})", self.gen_expression(callee), self.gen_args(arguments))
    }

    fn gen_member(&mut self, object: &Expression, property: &str) -> String {
        if let ExpressionKind::Identifier(name) = &object.kind {
            if is_static_namespace(name) {
                return format!("{}::{}", name, property);
            }
            if name == "this" {
                return format!("this->{}", property);
            }
        }
        if property == "length" {
            return format!("{}.length()", self.gen_expression(object));
        }
        format!("{}.{}", self.gen_expression(object), property)
    }

    fn gen_array_literal(&mut self, elements: &[Expression], element_type: Type) -> String {
        // Empty literals default to the number type unless a declaration-site
        // annotation overrides them (handled at the declaration).
        let ty = if element_type == Type::Any && elements.is_empty() {
            "double"
        } else {
            cpp_type_name(element_type)
        };
        format!(
            "Array<{}>(std::vector<{}>{{{}}})",
            ty,
            ty,
            self.gen_args(elements)
        )
    }

    fn gen_map_literal(
        &mut self,
        keys: &[String],
        values: &[Expression],
        value_type: Type,
    ) -> String {
        // Value type comes from the first entry; an untyped or empty map
        // holds owned strings.
        let ty = if value_type == Type::Any {
            "std::string"
        } else {
            cpp_type_name(value_type)
        };
        let entries = keys
            .iter()
            .zip(values)
            .map(|(key, value)| {
                format!("{{\"{}\", {}}}", escape_string(key), self.gen_expression(value))
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Map<std::string, {}>(std::map<std::string, {}>{{{}}})",
            ty, ty, entries
        )
    }

    /// Anonymous functions capture by copy and stay mutable so captured
    /// state behaves like the source language's closures.
    fn gen_function_literal(&mut self, func: &FunctionLiteral) -> String {
        let params = func
            .params
            .iter()
            .map(|p| format!("{} {}", cpp_type_name(p.ty), sanitize(&p.name)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut out = format!(
            "[=]({}) mutable -> {} {{\n",
            params,
            cpp_type_name(func.return_type)
        );
        self.indent_level += 1;
        for stmt in &func.body {
            out.push_str(&self.gen_statement(stmt));
        }
        self.indent_level -= 1;
        out.push_str(&self.indent());
        out.push('}');
        out
    }
}
