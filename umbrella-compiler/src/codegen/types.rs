//! C++ type mapping, identifier sanitizing and string escaping.

use lazy_static::lazy_static;
use std::collections::HashSet;

use crate::ast::Type;

/// Map a type tag to its C++ spelling. `Any` and friends deduce.
pub fn cpp_type_name(ty: Type) -> &'static str {
    match ty {
        Type::Number => "double",
        Type::String => "std::string",
        Type::Boolean => "bool",
        Type::Void => "void",
        Type::Any | Type::Function | Type::Array | Type::Class => "auto",
    }
}

lazy_static! {
    /// C++ reserved words an Umbrella identifier may collide with.
    static ref CPP_RESERVED: HashSet<&'static str> = [
        "alignas", "alignof", "and", "and_eq", "asm", "atomic_cancel", "atomic_commit",
        "atomic_noexcept", "auto", "bitand", "bitor", "bool", "break", "case", "catch",
        "char", "char16_t", "char32_t", "char8_t", "class", "compl", "concept", "const",
        "const_cast", "consteval", "constexpr", "constinit", "continue", "co_await",
        "co_return", "co_yield", "decltype", "default", "delete", "do", "double",
        "dynamic_cast", "else", "enum", "explicit", "export", "extern", "false", "float",
        "for", "friend", "goto", "if", "import", "inline", "int", "long", "module",
        "mutable", "namespace", "new", "noexcept", "not", "not_eq", "nullptr", "operator",
        "or", "or_eq", "private", "protected", "public", "register", "reinterpret_cast",
        "requires", "return", "short", "signed", "sizeof", "static", "static_assert",
        "static_cast", "struct", "switch", "synchronized", "template", "this",
        "thread_local", "throw", "true", "try", "typedef", "typeid", "typename", "union",
        "unsigned", "using", "virtual", "void", "volatile", "wchar_t", "while", "xor",
        "xor_eq",
    ]
    .into_iter()
    .collect();

    /// Blessed runtime namespaces whose members are accessed with `::`.
    static ref STATIC_NAMESPACES: HashSet<&'static str> = [
        "Math", "String", "Date", "JSON", "File", "Console", "HTTP", "Regex", "Env",
        "Thread", "Process", "Timer", "Database",
    ]
    .into_iter()
    .collect();

    /// Instance-style string methods rewritten to `String::` free functions
    /// with the receiver threaded as the first argument.
    static ref STRING_METHODS: HashSet<&'static str> = [
        "toUpperCase", "toLowerCase", "substring", "indexOf", "replace", "split", "trim",
        "startsWith", "endsWith", "repeat", "padStart", "padEnd",
    ]
    .into_iter()
    .collect();
}

/// Escape identifiers that collide with a C++ reserved word.
pub fn sanitize(name: &str) -> String {
    if CPP_RESERVED.contains(name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

pub fn is_static_namespace(name: &str) -> bool {
    STATIC_NAMESPACES.contains(name)
}

pub fn is_string_method(name: &str) -> bool {
    STRING_METHODS.contains(name)
}

/// Escape the bytes of a string literal for inclusion in C++ source.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}
