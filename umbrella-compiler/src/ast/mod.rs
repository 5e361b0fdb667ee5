//! Abstract Syntax Tree definitions for the Umbrella language.
//!
//! All node types are produced by the parser and consumed read-only by the
//! code generator. Expressions and statements are sum types so the emitter
//! can match exhaustively — adding a node variant without a lowering rule is
//! a compile error, not a silently dropped subtree.

pub mod nodes;
pub mod operators;
pub mod types;

pub use nodes::{
    ClassDecl, Constructor, Expression, ExpressionKind, Field, FunctionDecl, FunctionLiteral,
    Method, Param, Program, Statement,
};
pub use operators::{AssignOp, BinaryOp, UnaryOp};
pub use types::Type;
