use std::fmt;

/// The closed type-annotation tag set. Types drive emission, not checking:
/// the parser records declared annotations and derives tags for the
/// expressions where the answer is locally evident, defaulting to `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Number,
    String,
    Boolean,
    Void,
    Any,
    Function,
    Array,
    Class,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Number => "number",
            Type::String => "string",
            Type::Boolean => "boolean",
            Type::Void => "void",
            Type::Any => "any",
            Type::Function => "function",
            Type::Array => "array",
            Type::Class => "class",
        };
        write!(f, "{}", name)
    }
}
