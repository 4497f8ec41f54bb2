//! Static checks and variable binding, run between parsing and execution.
//!
//! The resolver walks the tree once with a stack of block scopes.  For every
//! variable use it finds the nearest enclosing declaration and tells the
//! interpreter how many scopes out that is; uses it cannot find are globals
//! and get no entry.  Because distances are fixed here, a closure keeps
//! seeing the binding it was written against even when a later declaration
//! shadows the name.
//!
//! The same walk reports the errors that do not need a running program:
//! duplicate locals, a local read inside its own initializer, `return`
//! outside a function, a value returned from `init`, and `this` outside a
//! class.  All of them are collected before anything runs.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use log::{debug, info};

use crate::class::INITIALIZER;
use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::{Expr, ExprId, FunctionDecl, Stmt};
use crate::token::Token;

/// Names declared in one block.  `false` until the initializer is done.
type Scope<'a> = HashMap<&'a str, bool>;

/// Kind of function body being resolved, if any.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Method,
    Initializer,
}

pub struct Resolver<'i, 'a, W: Write> {
    interpreter: &'i mut Interpreter<'a, W>,
    scopes: Vec<Scope<'a>>,
    function: FunctionKind,
    in_class: bool,
    errors: Vec<LoxError>,
}

impl<'i, 'a, W: Write> Resolver<'i, 'a, W> {
    pub fn new(interpreter: &'i mut Interpreter<'a, W>) -> Self {
        Resolver {
            interpreter,
            scopes: Vec::new(),
            function: FunctionKind::None,
            in_class: false,
            errors: Vec::new(),
        }
    }

    /// Resolve a whole program, handing local distances to the interpreter.
    pub fn resolve(mut self, program: &[Stmt<'a>]) -> Result<(), Vec<LoxError>> {
        info!("Resolving {} statement(s)", program.len());

        self.statements(program);

        if !self.errors.is_empty() {
            info!("Resolver found {} error(s)", self.errors.len());
            return Err(self.errors);
        }

        Ok(())
    }

    fn statements(&mut self, statements: &[Stmt<'a>]) {
        statements.iter().for_each(|stmt| self.statement(stmt));
    }

    fn statement(&mut self, stmt: &Stmt<'a>) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.expression(expr),

            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.expression(initializer);
                }
                self.define(name);
            }

            Stmt::Block(body) => self.scoped(|r| r.statements(body)),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expression(condition);
                self.statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.statement(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.expression(condition);
                self.statement(body);
            }

            // Defined before the body so the function can call itself.
            Stmt::Function(function) => {
                self.declare(&function.name);
                self.define(&function.name);
                self.function(function, FunctionKind::Function);
            }

            Stmt::Return { keyword, value } => {
                match (self.function, value) {
                    (FunctionKind::None, _) => {
                        self.error(keyword, "Can't return from top-level code.")
                    }
                    (FunctionKind::Initializer, Some(_)) => {
                        self.error(keyword, "Can't return a value from an initializer.")
                    }
                    _ => {}
                }

                if let Some(value) = value {
                    self.expression(value);
                }
            }

            Stmt::Class { name, methods } => self.class(name, methods),
        }
    }

    fn class(&mut self, name: &Token<'a>, methods: &[Rc<FunctionDecl<'a>>]) {
        let was_in_class: bool = std::mem::replace(&mut self.in_class, true);

        self.declare(name);
        self.define(name);

        // every method sees `this` one scope outside its parameters
        self.scoped(|r| {
            r.define_name("this");

            for method in methods {
                let kind = if method.name.lexeme == INITIALIZER {
                    FunctionKind::Initializer
                } else {
                    FunctionKind::Method
                };

                r.function(method, kind);
            }
        });

        self.in_class = was_in_class;
    }

    /// Parameters and body share one scope, matching the single environment
    /// a call creates.
    fn function(&mut self, function: &FunctionDecl<'a>, kind: FunctionKind) {
        let enclosing: FunctionKind = std::mem::replace(&mut self.function, kind);

        self.scoped(|r| {
            for param in &function.params {
                r.declare(param);
                r.define(param);
            }

            r.statements(&function.body);
        });

        self.function = enclosing;
    }

    fn expression(&mut self, expr: &Expr<'a>) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) | Expr::Unary { right: inner, .. } => self.expression(inner),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.expression(left);
                self.expression(right);
            }

            Expr::Variable { id, name } => {
                let in_own_initializer: bool = self
                    .scopes
                    .last()
                    .is_some_and(|scope| scope.get(name.lexeme) == Some(&false));

                if in_own_initializer {
                    self.error(name, "Can't read local variable in its own initializer.");
                }

                self.bind(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.expression(value);
                self.bind(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.expression(callee);
                arguments.iter().for_each(|arg| self.expression(arg));
            }

            Expr::Get { object, .. } => self.expression(object),

            Expr::Set { object, value, .. } => {
                self.expression(value);
                self.expression(object);
            }

            Expr::This { id, keyword } if self.in_class => self.bind(*id, keyword),

            Expr::This { keyword, .. } => {
                self.error(keyword, "Can't use 'this' outside of a class.")
            }
        }
    }

    /// Run `body` inside a fresh innermost scope.
    fn scoped(&mut self, body: impl FnOnce(&mut Self)) {
        self.scopes.push(Scope::new());
        body(self);
        self.scopes.pop();
    }

    /// Globals are not tracked, so outside any block this does nothing.
    fn declare(&mut self, name: &Token<'a>) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(name.lexeme) {
            self.error(name, "Already a variable with this name in this scope.");
            return;
        }

        scope.insert(name.lexeme, false);
    }

    fn define(&mut self, name: &Token<'a>) {
        self.define_name(name.lexeme);
    }

    fn define_name(&mut self, name: &'a str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, true);
        }
    }

    /// Tell the interpreter how far out `name` lives, if it is a local.
    fn bind(&mut self, id: ExprId, name: &Token<'a>) {
        let distance: Option<usize> = self
            .scopes
            .iter()
            .rev()
            .position(|scope| scope.contains_key(name.lexeme));

        match distance {
            Some(distance) => {
                debug!("'{}' is local, {} scope(s) out", name.lexeme, distance);
                self.interpreter.note_local(id, distance);
            }
            None => debug!("'{}' is global", name.lexeme),
        }
    }

    fn error(&mut self, token: &Token<'a>, message: &str) {
        self.errors.push(LoxError::resolve(token, message));
    }
}
