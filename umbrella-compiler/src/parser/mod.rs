//! Recursive-descent parser for the Umbrella language.
//!
//! The parser owns statement dispatch, the operator-precedence chain and the
//! postfix call/member/index chain. Errors are collected rather than fatal:
//! each failed statement is recorded and the parser resynchronizes past the
//! next `;`, so one run can report several diagnostics while still handing
//! back the statements that did parse.

mod error;

pub use error::{ParserError, ParserResult};

use crate::ast::{
    AssignOp, BinaryOp, ClassDecl, Constructor, Expression, ExpressionKind, Field, FunctionDecl,
    FunctionLiteral, Method, Param, Program, Statement, Type, UnaryOp,
};
use crate::lexer::{Token, TokenType};

pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, current: 0 }
    }

    /// Parse the whole token stream. On failure the partial program and every
    /// collected diagnostic are returned so the driver can report all of them
    /// and the emitter can still produce best-effort output.
    pub fn parse(&mut self) -> Result<Program, (Program, Vec<ParserError>)> {
        let mut statements = Vec::new();
        let mut errors = Vec::new();

        while !self.is_at_end() {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    errors.push(err);
                    self.synchronize();
                }
            }
        }

        let program = Program { statements };
        if errors.is_empty() {
            Ok(program)
        } else {
            Err((program, errors))
        }
    }

    /// Discard tokens up to and including the next `;` so parsing can resume
    /// at a statement boundary.
    fn synchronize(&mut self) {
        while !self.is_at_end() && !self.check(TokenType::Semicolon) {
            self.advance();
        }
        if self.check(TokenType::Semicolon) {
            self.advance();
        }
    }

    fn peek(&self) -> &Token {
        let idx = self.current.min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn check(&self, token_type: TokenType) -> bool {
        !self.is_at_end() && self.peek().token_type == token_type
    }

    fn match_token(&mut self, token_type: TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            return true;
        }
        false
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> ParserResult<Token> {
        if self.check(token_type) {
            return Ok(self.advance());
        }
        Err(ParserError::from_token(message, self.peek()))
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> ParserResult<Statement> {
        match self.peek().token_type {
            TokenType::Let | TokenType::Const => {
                self.advance();
                self.parse_variable_declaration()
            }
            TokenType::Function => {
                self.advance();
                self.parse_function_declaration()
            }
            TokenType::Class => {
                self.advance();
                self.parse_class_declaration()
            }
            TokenType::Return => {
                self.advance();
                self.parse_return_statement()
            }
            TokenType::Throw => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(TokenType::Semicolon, "Expected ';' after throw")?;
                Ok(Statement::Throw(expr))
            }
            TokenType::If => {
                self.advance();
                self.parse_if_statement()
            }
            TokenType::While => {
                self.advance();
                self.parse_while_statement()
            }
            TokenType::For => {
                self.advance();
                self.parse_for_statement()
            }
            TokenType::Try => {
                self.advance();
                self.parse_try_statement()
            }
            TokenType::LeftBrace => {
                self.advance();
                let statements = self.parse_block_body("Expected '}' after block")?;
                Ok(Statement::Block(statements))
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// Statements until the closing `}` (which is consumed).
    fn parse_block_body(&mut self, brace_message: &str) -> ParserResult<Vec<Statement>> {
        let mut statements = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        self.consume(TokenType::RightBrace, brace_message)?;
        Ok(statements)
    }

    fn parse_variable_declaration(&mut self) -> ParserResult<Statement> {
        let is_const = self.previous().token_type == TokenType::Const;
        let name = self
            .consume(TokenType::Identifier, "Expected variable name")?
            .lexeme;

        let mut var_type = Type::Any;
        let mut cpp_type = None;
        if self.match_token(TokenType::Colon) {
            let start = self.current;
            var_type = self.parse_type()?;
            // Function annotations have no C++ spelling; they deduce.
            if var_type != Type::Function {
                let spelled = self.respell_annotation(start, self.current);
                if !spelled.is_empty() {
                    cpp_type = Some(spelled);
                }
            }
        }

        let mut initializer = None;
        if self.match_token(TokenType::Equal) {
            initializer = Some(self.parse_expression()?);
        }
        self.consume(
            TokenType::Semicolon,
            "Expected ';' after variable declaration",
        )?;

        Ok(Statement::VariableDeclaration {
            name,
            var_type,
            cpp_type,
            initializer,
            is_const,
        })
    }

    fn parse_function_declaration(&mut self) -> ParserResult<Statement> {
        let name = self
            .consume(TokenType::Identifier, "Expected function name")?
            .lexeme;
        self.consume(TokenType::LeftParen, "Expected '(' after function name")?;
        let params = self.parse_params()?;

        let mut return_type = Type::Any;
        if self.match_token(TokenType::Colon) {
            return_type = self.parse_type()?;
        }

        self.consume(TokenType::LeftBrace, "Expected '{' before function body")?;
        let body = self.parse_block_body("Expected '}' after function body")?;

        Ok(Statement::FunctionDeclaration(FunctionDecl {
            name,
            params,
            return_type,
            body,
        }))
    }

    fn parse_class_declaration(&mut self) -> ParserResult<Statement> {
        let name = self
            .consume(TokenType::Identifier, "Expected class name")?
            .lexeme;

        let mut superclass = None;
        if self.match_token(TokenType::Extends) {
            let super_name = self
                .consume(TokenType::Identifier, "Expected superclass name")?
                .lexeme;
            superclass = Some(super_name);
        }

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        let mut constructor = None;

        self.consume(TokenType::LeftBrace, "Expected '{' before class body")?;
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            if self.match_token(TokenType::Constructor) {
                self.consume(TokenType::LeftParen, "Expected '(' after constructor")?;
                let params = self.parse_params()?;
                self.consume(TokenType::LeftBrace, "Expected '{' before constructor body")?;
                let body = self.parse_block_body("Expected '}' after constructor body")?;
                constructor = Some(Constructor { params, body });
                continue;
            }

            let member_name = self
                .consume(TokenType::Identifier, "Expected member name")?
                .lexeme;
            if self.match_token(TokenType::LeftParen) {
                // Method
                let params = self.parse_params()?;
                let mut return_type = Type::Void;
                if self.match_token(TokenType::Colon) {
                    return_type = self.parse_type()?;
                }
                self.consume(TokenType::LeftBrace, "Expected '{' before method body")?;
                let body = self.parse_block_body("Expected '}' after method body")?;
                methods.push(Method {
                    name: member_name,
                    params,
                    return_type,
                    body,
                });
            } else {
                // Field
                let mut ty = Type::Any;
                if self.match_token(TokenType::Colon) {
                    ty = self.parse_type()?;
                }
                let mut initializer = None;
                if self.match_token(TokenType::Equal) {
                    initializer = Some(self.parse_expression()?);
                }
                self.consume(TokenType::Semicolon, "Expected ';' after field declaration")?;
                fields.push(Field {
                    name: member_name,
                    ty,
                    initializer,
                });
            }
        }
        self.consume(TokenType::RightBrace, "Expected '}' after class body")?;

        Ok(Statement::ClassDeclaration(ClassDecl {
            name,
            superclass,
            fields,
            methods,
            constructor,
        }))
    }

    fn parse_return_statement(&mut self) -> ParserResult<Statement> {
        let mut value = None;
        if !self.check(TokenType::Semicolon) {
            value = Some(self.parse_expression()?);
        }
        self.consume(TokenType::Semicolon, "Expected ';' after return statement")?;
        Ok(Statement::Return(value))
    }

    fn parse_if_statement(&mut self) -> ParserResult<Statement> {
        self.consume(TokenType::LeftParen, "Expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after condition")?;

        let then_branch = if self.match_token(TokenType::LeftBrace) {
            self.parse_block_body("Expected '}' after if body")?
        } else {
            vec![self.parse_statement()?]
        };

        let mut else_branch = Vec::new();
        if self.match_token(TokenType::Else) {
            else_branch = if self.match_token(TokenType::LeftBrace) {
                self.parse_block_body("Expected '}' after else body")?
            } else {
                vec![self.parse_statement()?]
            };
        }

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_while_statement(&mut self) -> ParserResult<Statement> {
        self.consume(TokenType::LeftParen, "Expected '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after condition")?;
        self.consume(TokenType::LeftBrace, "Expected '{' before while body")?;
        let body = self.parse_block_body("Expected '}' after while body")?;
        Ok(Statement::While { condition, body })
    }

    fn parse_for_statement(&mut self) -> ParserResult<Statement> {
        self.consume(TokenType::LeftParen, "Expected '(' after 'for'")?;

        // The initializer and the expression-statement variants consume their
        // own terminating ';'.
        let initializer = if self.match_token(TokenType::Semicolon) {
            None
        } else if self.match_token(TokenType::Let) || self.match_token(TokenType::Const) {
            Some(Box::new(self.parse_variable_declaration()?))
        } else {
            Some(Box::new(self.parse_expression_statement()?))
        };

        let mut condition = None;
        if !self.check(TokenType::Semicolon) {
            condition = Some(self.parse_expression()?);
        }
        self.consume(TokenType::Semicolon, "Expected ';' after for condition")?;

        let mut increment = None;
        if !self.check(TokenType::RightParen) {
            increment = Some(self.parse_expression()?);
        }
        self.consume(TokenType::RightParen, "Expected ')' after for clauses")?;

        self.consume(TokenType::LeftBrace, "Expected '{' before for body")?;
        let body = self.parse_block_body("Expected '}' after for body")?;

        Ok(Statement::For {
            initializer,
            condition,
            increment,
            body,
        })
    }

    fn parse_try_statement(&mut self) -> ParserResult<Statement> {
        self.consume(TokenType::LeftBrace, "Expected '{' before try block")?;
        let try_block = self.parse_block_body("Expected '}' after try block")?;

        let mut catch_var = None;
        let mut catch_block = Vec::new();
        if self.match_token(TokenType::Catch) {
            self.consume(TokenType::LeftParen, "Expected '(' after 'catch'")?;
            let var = self
                .consume(TokenType::Identifier, "Expected error variable name")?
                .lexeme;
            catch_var = Some(var);
            self.consume(TokenType::RightParen, "Expected ')' after error variable")?;
            self.consume(TokenType::LeftBrace, "Expected '{' before catch block")?;
            catch_block = self.parse_block_body("Expected '}' after catch block")?;
        }

        let mut finally_block = Vec::new();
        if self.match_token(TokenType::Finally) {
            self.consume(TokenType::LeftBrace, "Expected '{' before finally block")?;
            finally_block = self.parse_block_body("Expected '}' after finally block")?;
        }

        Ok(Statement::Try {
            try_block,
            catch_var,
            catch_block,
            finally_block,
        })
    }

    fn parse_expression_statement(&mut self) -> ParserResult<Statement> {
        let expr = self.parse_expression()?;
        self.consume(TokenType::Semicolon, "Expected ';' after expression")?;
        Ok(Statement::Expression(expr))
    }

    // ---- expressions, lowest to highest precedence ----

    pub fn parse_expression(&mut self) -> ParserResult<Expression> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParserResult<Expression> {
        let expr = self.parse_ternary()?;
        if let Some(op) = AssignOp::from_token(self.peek().token_type) {
            self.advance();
            // Right-associative.
            let value = self.parse_assignment()?;
            let ty = value.ty;
            return Ok(Expression::new(
                ExpressionKind::Assignment {
                    left: Box::new(expr),
                    op,
                    right: Box::new(value),
                },
                ty,
            ));
        }
        Ok(expr)
    }

    fn parse_ternary(&mut self) -> ParserResult<Expression> {
        let expr = self.parse_logical_or()?;
        if self.match_token(TokenType::Question) {
            let then_expr = self.parse_expression()?;
            self.consume(TokenType::Colon, "Expected ':' in ternary operator")?;
            // Right-associative.
            let else_expr = self.parse_ternary()?;
            let ty = if then_expr.ty == else_expr.ty {
                then_expr.ty
            } else {
                Type::Any
            };
            return Ok(Expression::new(
                ExpressionKind::Conditional {
                    condition: Box::new(expr),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                ty,
            ));
        }
        Ok(expr)
    }

    fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
        let ty = if op.is_comparison() {
            Type::Boolean
        } else if op.is_bitwise() {
            Type::Number
        } else if op == BinaryOp::Add
            && (left.ty == Type::String || right.ty == Type::String)
        {
            Type::String
        } else if left.ty == Type::Number && right.ty == Type::Number {
            Type::Number
        } else {
            Type::Any
        };
        Expression::new(
            ExpressionKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
        )
    }

    fn parse_logical_or(&mut self) -> ParserResult<Expression> {
        let mut expr = self.parse_logical_and()?;
        while self.match_token(TokenType::OrOr) {
            let right = self.parse_logical_and()?;
            expr = Self::binary(BinaryOp::LogicalOr, expr, right);
        }
        Ok(expr)
    }

    fn parse_logical_and(&mut self) -> ParserResult<Expression> {
        let mut expr = self.parse_bitwise_or()?;
        while self.match_token(TokenType::AndAnd) {
            let right = self.parse_bitwise_or()?;
            expr = Self::binary(BinaryOp::LogicalAnd, expr, right);
        }
        Ok(expr)
    }

    fn parse_bitwise_or(&mut self) -> ParserResult<Expression> {
        let mut expr = self.parse_bitwise_xor()?;
        while self.match_token(TokenType::Pipe) {
            let right = self.parse_bitwise_xor()?;
            expr = Self::binary(BinaryOp::BitOr, expr, right);
        }
        Ok(expr)
    }

    fn parse_bitwise_xor(&mut self) -> ParserResult<Expression> {
        let mut expr = self.parse_bitwise_and()?;
        while self.match_token(TokenType::Caret) {
            let right = self.parse_bitwise_and()?;
            expr = Self::binary(BinaryOp::BitXor, expr, right);
        }
        Ok(expr)
    }

    fn parse_bitwise_and(&mut self) -> ParserResult<Expression> {
        let mut expr = self.parse_equality()?;
        while self.match_token(TokenType::Ampersand) {
            let right = self.parse_equality()?;
            expr = Self::binary(BinaryOp::BitAnd, expr, right);
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> ParserResult<Expression> {
        let mut expr = self.parse_comparison()?;
        loop {
            let op = match self.peek().token_type {
                TokenType::EqualEqual => BinaryOp::Equal,
                TokenType::BangEqual => BinaryOp::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            expr = Self::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> ParserResult<Expression> {
        let mut expr = self.parse_shift()?;
        loop {
            let op = match self.peek().token_type {
                TokenType::Less => BinaryOp::Less,
                TokenType::LessEqual => BinaryOp::LessEqual,
                TokenType::Greater => BinaryOp::Greater,
                TokenType::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_shift()?;
            expr = Self::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_shift(&mut self) -> ParserResult<Expression> {
        let mut expr = self.parse_additive()?;
        loop {
            let op = match self.peek().token_type {
                TokenType::LeftShift => BinaryOp::ShiftLeft,
                TokenType::RightShift => BinaryOp::ShiftRight,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            expr = Self::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> ParserResult<Expression> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().token_type {
                TokenType::Plus => BinaryOp::Add,
                TokenType::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            expr = Self::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> ParserResult<Expression> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek().token_type {
                TokenType::Star => BinaryOp::Multiply,
                TokenType::Slash => BinaryOp::Divide,
                TokenType::Percent => BinaryOp::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            expr = Self::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> ParserResult<Expression> {
        if let Some(op) = UnaryOp::from_token(self.peek().token_type) {
            self.advance();
            let operand = self.parse_unary()?;
            let ty = match op {
                UnaryOp::Not => Type::Boolean,
                UnaryOp::Negate | UnaryOp::BitNot => Type::Number,
            };
            return Ok(Expression::new(
                ExpressionKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                ty,
            ));
        }
        self.parse_postfix()
    }

    /// Left-associative chain of calls, member accesses and index accesses
    /// applied to a primary.
    fn parse_postfix(&mut self) -> ParserResult<Expression> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.match_token(TokenType::LeftParen) {
                let arguments = self.parse_arguments()?;
                expr = Expression::new(
                    ExpressionKind::Call {
                        callee: Box::new(expr),
                        arguments,
                    },
                    Type::Any,
                );
            } else if self.match_token(TokenType::Dot) {
                let property = self
                    .consume(TokenType::Identifier, "Expected property name after '.'")?
                    .lexeme;
                expr = Expression::new(
                    ExpressionKind::Member {
                        object: Box::new(expr),
                        property,
                    },
                    Type::Any,
                );
            } else if self.match_token(TokenType::LeftBracket) {
                let index = self.parse_expression()?;
                self.consume(TokenType::RightBracket, "Expected ']' after index")?;
                expr = Expression::new(
                    ExpressionKind::Index {
                        array: Box::new(expr),
                        index: Box::new(index),
                    },
                    Type::Any,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Comma-separated expressions up to and including the closing `)`.
    fn parse_arguments(&mut self) -> ParserResult<Vec<Expression>> {
        let mut arguments = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                arguments.push(self.parse_expression()?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expected ')' after arguments")?;
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> ParserResult<Expression> {
        match self.peek().token_type {
            TokenType::True => {
                self.advance();
                Ok(Expression::boolean(true))
            }
            TokenType::False => {
                self.advance();
                Ok(Expression::boolean(false))
            }
            TokenType::Number => {
                let token = self.advance();
                let value: f64 = token
                    .lexeme
                    .parse()
                    .map_err(|_| ParserError::from_token("Invalid number literal", &token))?;
                Ok(Expression::number(value))
            }
            TokenType::Str => {
                let token = self.advance();
                Ok(Expression::string(token.lexeme))
            }
            TokenType::This => {
                self.advance();
                Ok(Expression::identifier("this"))
            }
            TokenType::LeftParen => {
                self.advance();
                self.parse_paren_or_arrow()
            }
            TokenType::Identifier => {
                let token = self.advance();
                // Single-parameter arrow: `x => ...`
                if self.match_token(TokenType::Arrow) {
                    let params = vec![Param {
                        name: token.lexeme,
                        ty: Type::Any,
                    }];
                    let body = self.parse_arrow_body()?;
                    return Ok(Expression::new(
                        ExpressionKind::Function(FunctionLiteral {
                            params,
                            return_type: Type::Any,
                            body,
                        }),
                        Type::Function,
                    ));
                }
                Ok(Expression::identifier(token.lexeme))
            }
            TokenType::LeftBracket => {
                self.advance();
                self.parse_array_literal()
            }
            TokenType::LeftBrace => {
                self.advance();
                self.parse_map_literal()
            }
            TokenType::Function => {
                self.advance();
                self.parse_function_expression()
            }
            TokenType::New => {
                self.advance();
                self.parse_new_expression()
            }
            TokenType::Invalid => {
                let token = self.peek();
                Err(ParserError::from_token(
                    format!("Unrecognized character '{}'", token.lexeme),
                    token,
                ))
            }
            _ => Err(ParserError::from_token("Expected expression", self.peek())),
        }
    }

    /// After `(` in expression position: speculatively parse a parameter
    /// list, and commit to an arrow function only if `=>` follows the `)`.
    /// Otherwise rewind and parse a parenthesized expression.
    fn parse_paren_or_arrow(&mut self) -> ParserResult<Expression> {
        let saved = self.current;
        if let Some(params) = self.try_parse_arrow_params() {
            self.consume(TokenType::Arrow, "Expected '=>' after parameters")?;
            let body = self.parse_arrow_body()?;
            return Ok(Expression::new(
                ExpressionKind::Function(FunctionLiteral {
                    params,
                    return_type: Type::Any,
                    body,
                }),
                Type::Function,
            ));
        }

        self.current = saved;
        let expr = self.parse_expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after expression")?;
        Ok(expr)
    }

    fn try_parse_arrow_params(&mut self) -> Option<Vec<Param>> {
        let mut params = Vec::new();
        if self.match_token(TokenType::RightParen) {
            return if self.check(TokenType::Arrow) {
                Some(params)
            } else {
                None
            };
        }
        loop {
            if !self.check(TokenType::Identifier) {
                return None;
            }
            let name = self.advance().lexeme;
            let mut ty = Type::Any;
            if self.match_token(TokenType::Colon) {
                ty = self.parse_type().ok()?;
            }
            params.push(Param { name, ty });
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        if self.match_token(TokenType::RightParen) && self.check(TokenType::Arrow) {
            Some(params)
        } else {
            None
        }
    }

    /// `{ statements }` or a bare expression that becomes `return expr;`.
    fn parse_arrow_body(&mut self) -> ParserResult<Vec<Statement>> {
        if self.match_token(TokenType::LeftBrace) {
            return self.parse_block_body("Expected '}' after arrow function body");
        }
        let expr = self.parse_expression()?;
        Ok(vec![Statement::Return(Some(expr))])
    }

    fn parse_function_expression(&mut self) -> ParserResult<Expression> {
        self.consume(TokenType::LeftParen, "Expected '(' after function")?;
        let params = self.parse_params()?;
        let mut return_type = Type::Any;
        if self.match_token(TokenType::Colon) {
            return_type = self.parse_type()?;
        }
        self.consume(TokenType::LeftBrace, "Expected '{' before function body")?;
        let body = self.parse_block_body("Expected '}' after function body")?;
        Ok(Expression::new(
            ExpressionKind::Function(FunctionLiteral {
                params,
                return_type,
                body,
            }),
            Type::Function,
        ))
    }

    fn parse_new_expression(&mut self) -> ParserResult<Expression> {
        let class_name = self
            .consume(TokenType::Identifier, "Expected class name after 'new'")?
            .lexeme;
        self.consume(TokenType::LeftParen, "Expected '(' after class name")?;
        let arguments = self.parse_arguments()?;
        Ok(Expression::new(
            ExpressionKind::New {
                class_name,
                arguments,
            },
            Type::Class,
        ))
    }

    fn parse_array_literal(&mut self) -> ParserResult<Expression> {
        let mut elements = Vec::new();
        let mut element_type = Type::Any;
        if !self.check(TokenType::RightBracket) {
            loop {
                let element = self.parse_expression()?;
                if elements.is_empty() {
                    element_type = element.ty;
                }
                elements.push(element);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightBracket, "Expected ']' after array elements")?;
        Ok(Expression::new(
            ExpressionKind::ArrayLiteral {
                elements,
                element_type,
            },
            Type::Array,
        ))
    }

    /// Map keys are restricted to string literals by the grammar.
    fn parse_map_literal(&mut self) -> ParserResult<Expression> {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        let mut value_type = Type::Any;
        if !self.check(TokenType::RightBrace) {
            loop {
                let key = self.consume(TokenType::Str, "Expected string key")?.lexeme;
                self.consume(TokenType::Colon, "Expected ':' after key")?;
                let value = self.parse_expression()?;
                if keys.is_empty() {
                    value_type = value.ty;
                }
                keys.push(key);
                values.push(value);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightBrace, "Expected '}' after map entries")?;
        Ok(Expression::new(
            ExpressionKind::MapLiteral {
                keys,
                values,
                value_type,
            },
            Type::Any,
        ))
    }

    fn parse_params(&mut self) -> ParserResult<Vec<Param>> {
        let mut params = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                let name = self
                    .consume(TokenType::Identifier, "Expected parameter name")?
                    .lexeme;
                let mut ty = Type::Any;
                if self.match_token(TokenType::Colon) {
                    ty = self.parse_type()?;
                }
                params.push(Param { name, ty });
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expected ')' after parameters")?;
        Ok(params)
    }

    // ---- type annotations ----

    fn parse_type(&mut self) -> ParserResult<Type> {
        if self.match_token(TokenType::TypeNumber) {
            return Ok(Type::Number);
        }
        if self.match_token(TokenType::TypeString) {
            return Ok(Type::String);
        }
        if self.match_token(TokenType::TypeBoolean) {
            return Ok(Type::Boolean);
        }
        if self.match_token(TokenType::TypeVoid) {
            return Ok(Type::Void);
        }
        if self.match_token(TokenType::Function) {
            return Ok(Type::Function);
        }

        if self.match_token(TokenType::TypeArray) {
            if self.match_token(TokenType::Less) {
                self.parse_type()?;
                self.consume(TokenType::Greater, "Expected '>' after array element type")?;
            }
            return Ok(Type::Array);
        }

        // Function type: (T, ...) => R
        if self.match_token(TokenType::LeftParen) {
            while !self.check(TokenType::RightParen) && !self.is_at_end() {
                let before = self.current;
                self.parse_type()?;
                self.match_token(TokenType::Comma);
                if self.current == before {
                    return Err(ParserError::from_token(
                        "Expected type in function type parameters",
                        self.peek(),
                    ));
                }
            }
            self.consume(TokenType::RightParen, "Expected ')' in function type")?;
            self.consume(
                TokenType::Arrow,
                "Expected '=>' after function type parameters",
            )?;
            self.parse_type()?;
            return Ok(Type::Function);
        }

        // Custom types and generics over them
        if self.match_token(TokenType::Identifier) {
            if self.match_token(TokenType::Less) {
                loop {
                    self.parse_type()?;
                    if !self.match_token(TokenType::Comma) {
                        break;
                    }
                }
                self.consume(
                    TokenType::Greater,
                    "Expected '>' after generic type arguments",
                )?;
            }
            return Ok(Type::Any);
        }

        Ok(Type::Any)
    }

    /// Re-spell the annotation tokens in `tokens[start..end]` as C++ so that
    /// generic forms like `Array<Thread>` pass through emission verbatim.
    fn respell_annotation(&self, start: usize, end: usize) -> String {
        let mut out = String::new();
        for token in &self.tokens[start..end.min(self.tokens.len())] {
            match token.token_type {
                TokenType::TypeNumber => out.push_str("double"),
                TokenType::TypeString => out.push_str("std::string"),
                TokenType::TypeBoolean => out.push_str("bool"),
                TokenType::TypeVoid => out.push_str("void"),
                TokenType::Function => out.push_str("auto"),
                TokenType::Comma => out.push_str(", "),
                _ => out.push_str(&token.lexeme),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::source::Source;
    use ordered_float::OrderedFloat;

    fn parse_ok(input: &str) -> Program {
        let mut source = Source::from_str(input);
        let tokens = Lexer::new(&mut source).tokenize();
        Parser::new(&tokens)
            .parse()
            .unwrap_or_else(|(_, errors)| panic!("parse failed: {:?}", errors))
    }

    fn parse_err(input: &str) -> (Program, Vec<ParserError>) {
        let mut source = Source::from_str(input);
        let tokens = Lexer::new(&mut source).tokenize();
        Parser::new(&tokens)
            .parse()
            .expect_err("expected parse errors")
    }

    fn first_expression(program: &Program) -> &Expression {
        match &program.statements[0] {
            Statement::Expression(expr) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_typed_declaration_with_precedence() {
        // let x: number = 1 + 2 * 3;
        let program = parse_ok("let x: number = 1 + 2 * 3;");
        assert_eq!(program.statements.len(), 1);

        match &program.statements[0] {
            Statement::VariableDeclaration {
                name,
                var_type,
                initializer,
                is_const,
                ..
            } => {
                assert_eq!(name, "x");
                assert_eq!(*var_type, Type::Number);
                assert!(!is_const);

                let init = initializer.as_ref().expect("initializer");
                match &init.kind {
                    ExpressionKind::Binary { op, left, right } => {
                        assert_eq!(*op, BinaryOp::Add);
                        assert_eq!(
                            left.kind,
                            ExpressionKind::NumberLiteral(OrderedFloat(1.0))
                        );
                        match &right.kind {
                            ExpressionKind::Binary { op, left, right } => {
                                assert_eq!(*op, BinaryOp::Multiply);
                                assert_eq!(
                                    left.kind,
                                    ExpressionKind::NumberLiteral(OrderedFloat(2.0))
                                );
                                assert_eq!(
                                    right.kind,
                                    ExpressionKind::NumberLiteral(OrderedFloat(3.0))
                                );
                            }
                            other => panic!("expected nested multiplication, got {:?}", other),
                        }
                    }
                    other => panic!("expected addition, got {:?}", other),
                }
                assert_eq!(init.ty, Type::Number);
            }
            other => panic!("expected variable declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_same_source_parses_to_same_tree() {
        let input = "let y = a * (b + 1) - c[2].field;";
        assert_eq!(parse_ok(input), parse_ok(input));
    }

    #[test]
    fn test_comparison_binds_tighter_than_bitwise_and() {
        // a & b == c  parses as  a & (b == c)
        let program = parse_ok("a & b == c;");
        match &first_expression(&program).kind {
            ExpressionKind::Binary { op, right, .. } => {
                assert_eq!(*op, BinaryOp::BitAnd);
                match &right.kind {
                    ExpressionKind::Binary { op, .. } => assert_eq!(*op, BinaryOp::Equal),
                    other => panic!("expected equality on the right, got {:?}", other),
                }
            }
            other => panic!("expected bitwise and at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_bitwise_tower_ordering() {
        // a | b ^ c & d  parses as  a | (b ^ (c & d))
        let program = parse_ok("a | b ^ c & d;");
        match &first_expression(&program).kind {
            ExpressionKind::Binary { op, right, .. } => {
                assert_eq!(*op, BinaryOp::BitOr);
                match &right.kind {
                    ExpressionKind::Binary { op, right, .. } => {
                        assert_eq!(*op, BinaryOp::BitXor);
                        match &right.kind {
                            ExpressionKind::Binary { op, .. } => {
                                assert_eq!(*op, BinaryOp::BitAnd)
                            }
                            other => panic!("expected bitwise and innermost, got {:?}", other),
                        }
                    }
                    other => panic!("expected bitwise xor, got {:?}", other),
                }
            }
            other => panic!("expected bitwise or at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_shift_binds_tighter_than_comparison() {
        // a << b < c  parses as  (a << b) < c
        let program = parse_ok("a << b < c;");
        match &first_expression(&program).kind {
            ExpressionKind::Binary { op, left, .. } => {
                assert_eq!(*op, BinaryOp::Less);
                match &left.kind {
                    ExpressionKind::Binary { op, .. } => assert_eq!(*op, BinaryOp::ShiftLeft),
                    other => panic!("expected shift on the left, got {:?}", other),
                }
            }
            other => panic!("expected comparison at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_ternary_is_right_associative() {
        // a ? b : c ? d : e  parses as  a ? b : (c ? d : e)
        let program = parse_ok("a ? b : c ? d : e;");
        match &first_expression(&program).kind {
            ExpressionKind::Conditional { else_expr, .. } => match &else_expr.kind {
                ExpressionKind::Conditional { .. } => {}
                other => panic!("expected nested conditional in else, got {:?}", other),
            },
            other => panic!("expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let program = parse_ok("a = b = c;");
        match &first_expression(&program).kind {
            ExpressionKind::Assignment { op, right, .. } => {
                assert_eq!(*op, AssignOp::Assign);
                match &right.kind {
                    ExpressionKind::Assignment { .. } => {}
                    other => panic!("expected nested assignment, got {:?}", other),
                }
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_minus_binds_tighter_than_multiplication() {
        // -a * b  parses as  (-a) * b
        let program = parse_ok("-a * b;");
        match &first_expression(&program).kind {
            ExpressionKind::Binary { op, left, .. } => {
                assert_eq!(*op, BinaryOp::Multiply);
                match &left.kind {
                    ExpressionKind::Unary { op, .. } => assert_eq!(*op, UnaryOp::Negate),
                    other => panic!("expected unary negation on the left, got {:?}", other),
                }
            }
            other => panic!("expected multiplication at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_postfix_chain_is_left_associative() {
        let program = parse_ok("obj.items[0].run(1, 2);");
        match &first_expression(&program).kind {
            ExpressionKind::Call { callee, arguments } => {
                assert_eq!(arguments.len(), 2);
                match &callee.kind {
                    ExpressionKind::Member { object, property } => {
                        assert_eq!(property, "run");
                        match &object.kind {
                            ExpressionKind::Index { array, .. } => match &array.kind {
                                ExpressionKind::Member { property, .. } => {
                                    assert_eq!(property, "items")
                                }
                                other => panic!("expected member innermost, got {:?}", other),
                            },
                            other => panic!("expected index access, got {:?}", other),
                        }
                    }
                    other => panic!("expected member callee, got {:?}", other),
                }
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_paren_arrow_disambiguation() {
        // Parenthesized expression rewinds cleanly...
        let program = parse_ok("let a = (x + 1) * 2;");
        match &program.statements[0] {
            Statement::VariableDeclaration { initializer, .. } => {
                match &initializer.as_ref().unwrap().kind {
                    ExpressionKind::Binary { op, .. } => assert_eq!(*op, BinaryOp::Multiply),
                    other => panic!("expected multiplication, got {:?}", other),
                }
            }
            other => panic!("expected declaration, got {:?}", other),
        }

        // ...while a parameter list followed by => commits to a function.
        let program = parse_ok("let f = (x: number, y) => x + y;");
        match &program.statements[0] {
            Statement::VariableDeclaration { initializer, .. } => {
                match &initializer.as_ref().unwrap().kind {
                    ExpressionKind::Function(func) => {
                        assert_eq!(func.params.len(), 2);
                        assert_eq!(func.params[0].name, "x");
                        assert_eq!(func.params[0].ty, Type::Number);
                        assert_eq!(func.params[1].ty, Type::Any);
                        assert!(matches!(func.body[0], Statement::Return(Some(_))));
                    }
                    other => panic!("expected function literal, got {:?}", other),
                }
            }
            other => panic!("expected declaration, got {:?}", other),
        }

        // Single-identifier arrows commit after the identifier.
        let program = parse_ok("let g = n => n * n;");
        match &program.statements[0] {
            Statement::VariableDeclaration { initializer, .. } => {
                match &initializer.as_ref().unwrap().kind {
                    ExpressionKind::Function(func) => assert_eq!(func.params[0].name, "n"),
                    other => panic!("expected function literal, got {:?}", other),
                }
            }
            other => panic!("expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_class_declaration_shape() {
        let program = parse_ok(
            "class Point extends Base { \
                 x: number = 0; \
                 y: number = 0; \
                 constructor(a: number, b: number) { this.x = a; this.y = b; } \
                 dist(): number { return this.x; } \
             }",
        );
        match &program.statements[0] {
            Statement::ClassDeclaration(class) => {
                assert_eq!(class.name, "Point");
                assert_eq!(class.superclass.as_deref(), Some("Base"));
                assert_eq!(class.fields.len(), 2);
                assert_eq!(class.fields[0].name, "x");
                assert_eq!(class.fields[1].name, "y");
                let ctor = class.constructor.as_ref().expect("constructor");
                assert_eq!(ctor.params.len(), 2);
                assert_eq!(class.methods.len(), 1);
                assert_eq!(class.methods[0].name, "dist");
                assert_eq!(class.methods[0].return_type, Type::Number);
            }
            other => panic!("expected class declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_for_initializer_is_declaration_or_expression() {
        let program = parse_ok("for (let i = 0; i < 3; i = i + 1) { print(i); }");
        match &program.statements[0] {
            Statement::For {
                initializer,
                condition,
                increment,
                ..
            } => {
                assert!(matches!(
                    initializer.as_deref(),
                    Some(Statement::VariableDeclaration { .. })
                ));
                assert!(condition.is_some());
                assert!(increment.is_some());
            }
            other => panic!("expected for statement, got {:?}", other),
        }

        let program = parse_ok("for (i = 0; i < 3; i = i + 1) { print(i); }");
        match &program.statements[0] {
            Statement::For { initializer, .. } => {
                assert!(matches!(
                    initializer.as_deref(),
                    Some(Statement::Expression(_))
                ));
            }
            other => panic!("expected for statement, got {:?}", other),
        }
    }

    #[test]
    fn test_leading_brace_is_a_block_not_a_map() {
        let program = parse_ok("{ let x = 1; }");
        assert!(matches!(program.statements[0], Statement::Block(_)));

        // In expression position the brace is a map literal.
        let program = parse_ok("let m = {\"a\": 1, \"b\": 2};");
        match &program.statements[0] {
            Statement::VariableDeclaration { initializer, .. } => {
                match &initializer.as_ref().unwrap().kind {
                    ExpressionKind::MapLiteral {
                        keys, value_type, ..
                    } => {
                        assert_eq!(keys, &vec!["a".to_string(), "b".to_string()]);
                        assert_eq!(*value_type, Type::Number);
                    }
                    other => panic!("expected map literal, got {:?}", other),
                }
            }
            other => panic!("expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_map_literal_rejects_computed_keys() {
        let (_, errors) = parse_err("let m = {key: 1};");
        assert!(errors[0].message.contains("Expected string key"));
    }

    #[test]
    fn test_error_recovery_skips_to_next_statement() {
        let (program, errors) = parse_err("let = 5; let y = 2; let == 3; let z = 4;");
        assert_eq!(errors.len(), 2);
        // The two well-formed declarations survive.
        assert_eq!(program.statements.len(), 2);
        assert!(errors[0].message.contains("Expected variable name"));
        assert_eq!(errors[0].span.line, 1);
    }

    #[test]
    fn test_invalid_token_is_surfaced_as_parse_error() {
        let (_, errors) = parse_err("let x = @;");
        assert!(errors[0].message.contains("Unrecognized character '@'"));
    }

    #[test]
    fn test_reserved_unused_tokens_are_rejected() {
        for input in ["import thing;", "let x = a ?? b;", "let y = ...rest;"] {
            let mut source = Source::from_str(input);
            let tokens = Lexer::new(&mut source).tokenize();
            assert!(
                Parser::new(&tokens).parse().is_err(),
                "expected error for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_generic_annotation_captured_verbatim() {
        let program = parse_ok("let rows: Map<string, Row> = m;");
        match &program.statements[0] {
            Statement::VariableDeclaration {
                cpp_type, var_type, ..
            } => {
                assert_eq!(cpp_type.as_deref(), Some("Map<std::string, Row>"));
                assert_eq!(*var_type, Type::Any);
            }
            other => panic!("expected declaration, got {:?}", other),
        }

        let program = parse_ok("let xs: Array<number> = [];");
        match &program.statements[0] {
            Statement::VariableDeclaration {
                cpp_type, var_type, ..
            } => {
                assert_eq!(cpp_type.as_deref(), Some("Array<double>"));
                assert_eq!(*var_type, Type::Array);
            }
            other => panic!("expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_try_catch_finally_shape() {
        let program = parse_ok(
            "try { throw \"boom\"; } catch (e) { print(e); } finally { print(\"done\"); }",
        );
        match &program.statements[0] {
            Statement::Try {
                try_block,
                catch_var,
                catch_block,
                finally_block,
            } => {
                assert_eq!(try_block.len(), 1);
                assert_eq!(catch_var.as_deref(), Some("e"));
                assert_eq!(catch_block.len(), 1);
                assert_eq!(finally_block.len(), 1);
            }
            other => panic!("expected try statement, got {:?}", other),
        }
    }

    #[test]
    fn test_string_concat_type_is_derived() {
        let program = parse_ok("\"a\" + 1;");
        assert_eq!(first_expression(&program).ty, Type::String);

        let program = parse_ok("1 + 2;");
        assert_eq!(first_expression(&program).ty, Type::Number);

        let program = parse_ok("a + 1;");
        assert_eq!(first_expression(&program).ty, Type::Any);
    }
}
