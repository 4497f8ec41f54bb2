//! Tokens → syntax tree.
//!
//! A recursive-descent parser with one function per precedence level.  It
//! never stops at the first mistake: each malformed declaration is recorded
//! as a [`LoxError::Parse`], the parser skips ahead to something that looks
//! like the start of the next statement, and parsing resumes there.
//!
//! ```text
//! program     := declaration* EOF
//! declaration := "class" IDENT "{" function* "}"
//!              | "fun" function
//!              | "var" IDENT ( "=" expression )? ";"
//!              | statement
//! function    := IDENT "(" ( IDENT ( "," IDENT )* )? ")" block
//! statement   := "print" expression ";"
//!              | "if" "(" expression ")" statement ( "else" statement )?
//!              | "while" "(" expression ")" statement
//!              | "for" "(" ( varDecl | exprStmt | ";" ) expression? ";" expression? ")" statement
//!              | "return" expression? ";"
//!              | block
//!              | expression ";"
//! block       := "{" declaration* "}"
//!
//! expression  := ( call "." )? IDENT "=" expression | or
//! or          := and ( "or" and )*
//! and         := equality ( "and" equality )*
//! equality    := comparison ( ( "==" | "!=" ) comparison )*
//! comparison  := term ( ( "<" | "<=" | ">" | ">=" ) term )*
//! term        := factor ( ( "+" | "-" ) factor )*
//! factor      := unary ( ( "*" | "/" ) unary )*
//! unary       := ( "!" | "-" ) unary | call
//! call        := primary ( "(" ( expression ( "," expression )* )? ")" | "." IDENT )*
//! primary     := NUMBER | STRING | "true" | "false" | "nil" | "this"
//!              | IDENT | "(" expression ")"
//! ```
//!
//! `for` is rewritten into `{ init; while (cond) { body; incr; } }` while it
//! is parsed, so later passes only ever see `while`.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

use log::{debug, info};

/// Most arguments a call may pass, and most parameters a function may name.
pub const MAX_ARGS: usize = 255;

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

/// Identity of a name-bearing expression (`Variable`, `Assign`, `This`).
///
/// The resolver records scope distances against it.  Ids come from one
/// process-wide counter, so nodes from separate parses never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

impl ExprId {
    fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Constant written directly in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    /// Contents without the quotes.
    Str(String),
    True,
    False,
    Nil,
}

/// Expression node.  `'a` is the lifetime of the source the tokens borrow.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'a> {
    Literal(LiteralValue),

    /// `!x` or `-x`.
    Unary {
        operator: Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Arithmetic, comparison and equality operators.
    Binary {
        left: Box<Expr<'a>>,
        operator: Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// `and` / `or`.  Kept apart from `Binary` because the right side may
    /// never be evaluated.
    Logical {
        left: Box<Expr<'a>>,
        operator: Token<'a>,
        right: Box<Expr<'a>>,
    },

    Grouping(Box<Expr<'a>>),

    Variable { id: ExprId, name: Token<'a> },

    Assign {
        id: ExprId,
        name: Token<'a>,
        value: Box<Expr<'a>>,
    },

    Call {
        callee: Box<Expr<'a>>,
        /// Closing `)`; runtime errors about the call point here.
        paren: Token<'a>,
        arguments: Vec<Expr<'a>>,
    },

    /// `object.name`
    Get {
        object: Box<Expr<'a>>,
        name: Token<'a>,
    },

    /// `object.name = value`
    Set {
        object: Box<Expr<'a>>,
        name: Token<'a>,
        value: Box<Expr<'a>>,
    },

    This { id: ExprId, keyword: Token<'a> },
}

/// Declaration of a function or method.
///
/// Closures hold the same `Rc`, so the body is never copied at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl<'a> {
    pub name: Token<'a>,
    pub params: Vec<Token<'a>>,
    pub body: Vec<Stmt<'a>>,
}

/// Statement node.  [`Parser::parse`] yields a program as a list of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt<'a> {
    Expression(Expr<'a>),

    Print(Expr<'a>),

    /// `var name;` leaves the variable `nil`.
    Var {
        name: Token<'a>,
        initializer: Option<Expr<'a>>,
    },

    Block(Vec<Stmt<'a>>),

    If {
        condition: Expr<'a>,
        then_branch: Box<Stmt<'a>>,
        else_branch: Option<Box<Stmt<'a>>>,
    },

    While {
        condition: Expr<'a>,
        body: Box<Stmt<'a>>,
    },

    Function(Rc<FunctionDecl<'a>>),

    Return {
        keyword: Token<'a>,
        /// `None` for a bare `return;`, which yields `nil`.
        value: Option<Expr<'a>>,
    },

    Class {
        name: Token<'a>,
        methods: Vec<Rc<FunctionDecl<'a>>>,
    },
}

const EQUALITY: [TokenType; 2] = [TokenType::EQUAL_EQUAL, TokenType::BANG_EQUAL];

const COMPARISON: [TokenType; 4] = [
    TokenType::LESS,
    TokenType::LESS_EQUAL,
    TokenType::GREATER,
    TokenType::GREATER_EQUAL,
];

const TERM: [TokenType; 2] = [TokenType::PLUS, TokenType::MINUS];

const FACTOR: [TokenType; 2] = [TokenType::STAR, TokenType::SLASH];

/// Tokens that can open a statement; error recovery stops in front of them.
const STATEMENT_STARTS: [TokenType; 8] = [
    TokenType::CLASS,
    TokenType::FUN,
    TokenType::VAR,
    TokenType::FOR,
    TokenType::IF,
    TokenType::WHILE,
    TokenType::PRINT,
    TokenType::RETURN,
];

/// Parser over the scanner's token list.  Diagnostics accumulate in
/// [`Parser::errors`] instead of ending the parse.
pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    current: usize,
    errors: Vec<LoxError>,
}

impl<'a> Parser<'a> {
    /// `tokens` normally ends with `EOF`; one is added when it does not.
    pub fn new(mut tokens: Vec<Token<'a>>) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        if tokens.last().map(|t| &t.token_type) != Some(&TokenType::EOF) {
            let line: usize = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenType::EOF, "", line));
        }

        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    /// Every statement that parsed cleanly.  The program must not be run if
    /// [`Parser::had_error`] is set afterwards.
    pub fn parse(&mut self) -> Vec<Stmt<'a>> {
        info!("Parsing program");

        let mut program: Vec<Stmt<'a>> = Vec::new();

        while !self.is_at_end() {
            program.extend(self.declaration());
        }

        info!(
            "Parsed {} statement(s), {} error(s)",
            program.len(),
            self.errors.len()
        );

        program
    }

    /// One expression spanning all of the input, for `parse` and `evaluate`.
    /// Anything left over after it is an error.
    pub fn parse_expression(&mut self) -> Option<Expr<'a>> {
        info!("Parsing a lone expression");

        let parsed: Result<Expr<'a>> = match self.expression() {
            Ok(_) if !self.is_at_end() => Err(LoxError::parse(
                self.peek(),
                "Expect end of expression.",
            )),
            other => other,
        };

        parsed.map_err(|e| self.errors.push(e)).ok()
    }

    pub fn errors(&self) -> &[LoxError] {
        &self.errors
    }

    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<LoxError> {
        std::mem::take(&mut self.errors)
    }

    /// `None` when the declaration was malformed; the error is recorded and
    /// the cursor sits at the next likely statement start.
    fn declaration(&mut self) -> Option<Stmt<'a>> {
        use TokenType::*;

        debug!("declaration at line {}", self.peek().line);

        let result = if self.matches(VAR) {
            self.var_declaration()
        } else if self.matches(FUN) {
            self.function("function").map(Stmt::Function)
        } else if self.matches(CLASS) {
            self.class_declaration()
        } else {
            self.statement()
        };

        result
            .map_err(|e| {
                self.errors.push(e);
                self.synchronize();
            })
            .ok()
    }

    fn class_declaration(&mut self) -> Result<Stmt<'a>> {
        let name: Token<'a> = self.consume(TokenType::IDENTIFIER, "Expect class name.")?;
        self.consume(TokenType::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl<'a>>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after class body.")?;

        debug!("class '{}' has {} method(s)", name.lexeme, methods.len());

        Ok(Stmt::Class { name, methods })
    }

    /// `kind` ("function" or "method") only appears in error messages.
    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl<'a>>> {
        let name: Token<'a> =
            self.consume(TokenType::IDENTIFIER, &format!("Expect {} name.", kind))?;
        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expect '(' after {} name.", kind),
        )?;

        let params: Vec<Token<'a>> = self.comma_separated("parameters", |parser| {
            parser.consume(TokenType::IDENTIFIER, "Expect parameter name.")
        })?;

        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;
        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expect '{{' before {} body.", kind),
        )?;

        let body: Vec<Stmt<'a>> = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> Result<Stmt<'a>> {
        let name: Token<'a> = self.consume(TokenType::IDENTIFIER, "Expect variable name.")?;

        let initializer: Option<Expr<'a>> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> Result<Stmt<'a>> {
        use TokenType::*;

        if self.matches(PRINT) {
            let value: Expr<'a> = self.expression()?;
            self.consume(SEMICOLON, "Expect ';' after value.")?;

            Ok(Stmt::Print(value))
        } else if self.matches(LEFT_BRACE) {
            self.block().map(Stmt::Block)
        } else if self.matches(IF) {
            self.if_statement()
        } else if self.matches(WHILE) {
            self.while_statement()
        } else if self.matches(FOR) {
            self.for_statement()
        } else if self.matches(RETURN) {
            self.return_statement()
        } else {
            let expr: Expr<'a> = self.expression()?;
            self.consume(SEMICOLON, "Expect ';' after expression.")?;

            Ok(Stmt::Expression(expr))
        }
    }

    fn if_statement(&mut self) -> Result<Stmt<'a>> {
        let condition: Expr<'a> = self.parenthesized("'if'", "if condition")?;
        let then_branch: Box<Stmt<'a>> = Box::new(self.statement()?);

        // `else` binds to the nearest `if`.
        let else_branch: Option<Box<Stmt<'a>>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt<'a>> {
        let condition: Expr<'a> = self.parenthesized("'while'", "condition")?;
        let body: Box<Stmt<'a>> = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn for_statement(&mut self) -> Result<Stmt<'a>> {
        use TokenType::*;

        self.consume(LEFT_PAREN, "Expect '(' after 'for'.")?;

        let initializer: Option<Stmt<'a>> = if self.matches(SEMICOLON) {
            None
        } else if self.matches(VAR) {
            Some(self.var_declaration()?)
        } else {
            let expr: Expr<'a> = self.expression()?;
            self.consume(SEMICOLON, "Expect ';' after expression.")?;
            Some(Stmt::Expression(expr))
        };

        let condition: Option<Expr<'a>> = self.unless_at(SEMICOLON)?;
        self.consume(SEMICOLON, "Expect ';' after loop condition.")?;

        let increment: Option<Expr<'a>> = self.unless_at(RIGHT_PAREN)?;
        self.consume(RIGHT_PAREN, "Expect ')' after for clauses.")?;

        let body: Stmt<'a> = self.statement()?;

        let body: Stmt<'a> = match increment {
            Some(increment) => Stmt::Block(vec![body, Stmt::Expression(increment)]),
            None => body,
        };

        let looped = Stmt::While {
            condition: condition.unwrap_or(Expr::Literal(LiteralValue::True)),
            body: Box::new(body),
        };

        Ok(match initializer {
            Some(initializer) => Stmt::Block(vec![initializer, looped]),
            None => looped,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt<'a>> {
        let keyword: Token<'a> = self.previous().clone();
        let value: Option<Expr<'a>> = self.unless_at(TokenType::SEMICOLON)?;

        self.consume(TokenType::SEMICOLON, "Expect ';' after return value.")?;

        Ok(Stmt::Return { keyword, value })
    }

    /// Body of a `{ ... }` whose opening brace is already consumed.
    fn block(&mut self) -> Result<Vec<Stmt<'a>>> {
        let mut statements: Vec<Stmt<'a>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.extend(self.declaration());
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after block.")?;

        Ok(statements)
    }

    fn expression(&mut self) -> Result<Expr<'a>> {
        self.assignment()
    }

    /// The target is parsed as an ordinary expression first and only then
    /// checked, since `a.b.c = 1` cannot be told apart from `a.b.c` until
    /// the `=` shows up.
    fn assignment(&mut self) -> Result<Expr<'a>> {
        let target: Expr<'a> = self.or()?;

        if !self.matches(TokenType::EQUAL) {
            return Ok(target);
        }

        let equals: Token<'a> = self.previous().clone();
        let value: Box<Expr<'a>> = Box::new(self.assignment()?);

        match target {
            Expr::Variable { name, .. } => Ok(Expr::Assign {
                id: ExprId::fresh(),
                name,
                value,
            }),
            Expr::Get { object, name } => Ok(Expr::Set {
                object,
                name,
                value,
            }),
            other => {
                // reported, but no resynchronisation needed
                self.error(&equals, "Invalid assignment target.");
                Ok(other)
            }
        }
    }

    fn or(&mut self) -> Result<Expr<'a>> {
        self.logical(TokenType::OR, Self::and)
    }

    fn and(&mut self) -> Result<Expr<'a>> {
        self.logical(TokenType::AND, Self::equality)
    }

    fn equality(&mut self) -> Result<Expr<'a>> {
        self.binary(&EQUALITY, Self::comparison)
    }

    fn comparison(&mut self) -> Result<Expr<'a>> {
        self.binary(&COMPARISON, Self::term)
    }

    fn term(&mut self) -> Result<Expr<'a>> {
        self.binary(&TERM, Self::factor)
    }

    fn factor(&mut self) -> Result<Expr<'a>> {
        self.binary(&FACTOR, Self::unary)
    }

    /// Left-associative chain `operand ( op operand )*` for any of `operators`.
    fn binary(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Self) -> Result<Expr<'a>>,
    ) -> Result<Expr<'a>> {
        let mut left: Expr<'a> = operand(self)?;

        while self.matches_any(operators) {
            let operator: Token<'a> = self.previous().clone();
            let right: Expr<'a> = operand(self)?;

            left = Expr::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn logical(
        &mut self,
        operator: TokenType,
        operand: fn(&mut Self) -> Result<Expr<'a>>,
    ) -> Result<Expr<'a>> {
        let mut left: Expr<'a> = operand(self)?;

        while self.matches(operator.clone()) {
            let operator: Token<'a> = self.previous().clone();
            let right: Expr<'a> = operand(self)?;

            left = Expr::Logical {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr<'a>> {
        if !self.matches_any(&[TokenType::BANG, TokenType::MINUS]) {
            return self.call();
        }

        let operator: Token<'a> = self.previous().clone();
        let right: Box<Expr<'a>> = Box::new(self.unary()?);

        Ok(Expr::Unary { operator, right })
    }

    fn call(&mut self) -> Result<Expr<'a>> {
        let mut expr: Expr<'a> = self.primary()?;

        loop {
            expr = if self.matches(TokenType::LEFT_PAREN) {
                let arguments: Vec<Expr<'a>> =
                    self.comma_separated("arguments", Self::expression)?;
                let paren: Token<'a> =
                    self.consume(TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?;

                Expr::Call {
                    callee: Box::new(expr),
                    paren,
                    arguments,
                }
            } else if self.matches(TokenType::DOT) {
                let name: Token<'a> =
                    self.consume(TokenType::IDENTIFIER, "Expect property name after '.'.")?;

                Expr::Get {
                    object: Box::new(expr),
                    name,
                }
            } else {
                return Ok(expr);
            };
        }
    }

    fn primary(&mut self) -> Result<Expr<'a>> {
        use TokenType::*;

        let token: Token<'a> = self.peek().clone();

        let expr: Expr<'a> = match token.token_type {
            TRUE => Expr::Literal(LiteralValue::True),
            FALSE => Expr::Literal(LiteralValue::False),
            NIL => Expr::Literal(LiteralValue::Nil),
            NUMBER(n) => Expr::Literal(LiteralValue::Number(n)),
            STRING(s) => Expr::Literal(LiteralValue::Str(s)),
            IDENTIFIER => Expr::Variable {
                id: ExprId::fresh(),
                name: token,
            },
            THIS => Expr::This {
                id: ExprId::fresh(),
                keyword: token,
            },
            LEFT_PAREN => {
                self.advance();
                let inner: Expr<'a> = self.expression()?;
                self.consume(RIGHT_PAREN, "Expect ')' after expression.")?;

                return Ok(Expr::Grouping(Box::new(inner)));
            }
            _ => return Err(LoxError::parse(&token, "Expect expression.")),
        };

        self.advance();

        Ok(expr)
    }

    // helpers

    /// Items of a parenthesised, comma-separated list up to (not including)
    /// the closing `)`.  Going over [`MAX_ARGS`] is reported but not fatal.
    fn comma_separated<T>(
        &mut self,
        what: &str,
        mut item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items: Vec<T> = Vec::new();

        if self.check(TokenType::RIGHT_PAREN) {
            return Ok(items);
        }

        loop {
            if items.len() >= MAX_ARGS {
                let at: Token<'a> = self.peek().clone();
                self.error(&at, &format!("Can't have more than {} {}.", MAX_ARGS, what));
            }

            items.push(item(self)?);

            if !self.matches(TokenType::COMMA) {
                return Ok(items);
            }
        }
    }

    /// `( condition )` after `keyword`.
    fn parenthesized(&mut self, keyword: &str, what: &str) -> Result<Expr<'a>> {
        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expect '(' after {}.", keyword),
        )?;
        let condition: Expr<'a> = self.expression()?;
        self.consume(
            TokenType::RIGHT_PAREN,
            &format!("Expect ')' after {}.", what),
        )?;

        Ok(condition)
    }

    /// An optional expression that is absent when `end` comes next.
    fn unless_at(&mut self, end: TokenType) -> Result<Option<Expr<'a>>> {
        if self.check(end) {
            return Ok(None);
        }

        self.expression().map(Some)
    }

    fn error(&mut self, token: &Token<'a>, message: &str) {
        self.errors.push(LoxError::parse(token, message));
    }

    fn consume(&mut self, kind: TokenType, message: &str) -> Result<Token<'a>> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }

        Err(LoxError::parse(self.peek(), message))
    }

    fn matches(&mut self, kind: TokenType) -> bool {
        self.matches_any(&[kind])
    }

    fn matches_any(&mut self, kinds: &[TokenType]) -> bool {
        let hit: bool = kinds.iter().any(|kind| self.at(kind));

        if hit {
            self.advance();
        }

        hit
    }

    fn check(&self, kind: TokenType) -> bool {
        self.at(&kind)
    }

    #[inline]
    fn at(&self, kind: &TokenType) -> bool {
        !self.is_at_end() && &self.peek().token_type == kind
    }

    fn advance(&mut self) -> &Token<'a> {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    #[inline]
    fn peek(&self) -> &Token<'a> {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token<'a> {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Skip the offending token, then stop after a `;` or in front of a
    /// keyword that opens a statement.
    fn synchronize(&mut self) {
        debug!("Recovering after error near line {}", self.peek().line);

        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::SEMICOLON
                || STATEMENT_STARTS.contains(&self.peek().token_type)
            {
                return;
            }

            self.advance();
        }
    }
}
