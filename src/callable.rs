//! Things that can be invoked with `(…)`: user functions and native
//! functions.  Classes implement [`Callable`] too (see `class.rs`).

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::parser::FunctionDecl;
use crate::token::Token;
use crate::value::Value;

/// Common invocation protocol.  The interpreter checks arity before calling.
pub trait Callable<'a> {
    fn arity(&self) -> usize;

    /// `paren` is the call's closing parenthesis, used to locate errors.
    fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<'a, W>,
        arguments: Vec<Value<'a>>,
        paren: &Token<'a>,
    ) -> Result<Value<'a>>;
}

/// A user‑defined function or method together with its closure.
pub struct LoxFunction<'a> {
    declaration: Rc<FunctionDecl<'a>>,
    closure: Rc<RefCell<Environment<'a>>>,
    is_initializer: bool,
}

impl<'a> LoxFunction<'a> {
    pub fn new(
        declaration: Rc<FunctionDecl<'a>>,
        closure: Rc<RefCell<Environment<'a>>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &'a str {
        self.declaration.name.lexeme
    }

    /// Copy of this method whose closure gains a frame binding `this`.
    pub fn bind(&self, instance: Value<'a>) -> LoxFunction<'a> {
        debug!("Binding method '{}' to {}", self.name(), instance);

        let environment = Environment::child_of(&self.closure);
        environment.borrow_mut().define("this", instance);

        LoxFunction::new(Rc::clone(&self.declaration), environment, self.is_initializer)
    }

    /// The instance an initializer runs against (`this` in its closure).
    fn bound_this(&self, paren: &Token<'a>) -> Result<Value<'a>> {
        self.closure
            .borrow()
            .lookup_at(0, "this")
            .ok_or_else(|| LoxError::runtime(paren, "Initializer called without an instance."))
    }
}

impl<'a> Callable<'a> for LoxFunction<'a> {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<'a, W>,
        arguments: Vec<Value<'a>>,
        paren: &Token<'a>,
    ) -> Result<Value<'a>> {
        debug!("Calling user-defined function '{}'", self.name());

        // New frame hangs off the closure, not the caller's frame.
        let environment = Environment::child_of(&self.closure);

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.borrow_mut().define(param.lexeme, argument);
        }

        let flow: Flow<'a> = interpreter.execute_block(&self.declaration.body, environment)?;

        if self.is_initializer {
            return self.bound_this(paren);
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

impl<'a> fmt::Debug for LoxFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// A function implemented by the host, e.g. `clock`.
pub struct NativeFunction<'a> {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value<'a>]) -> std::result::Result<Value<'a>, String>,
}

impl<'a> Callable<'a> for NativeFunction<'a> {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call<W: Write>(
        &self,
        _interpreter: &mut Interpreter<'a, W>,
        arguments: Vec<Value<'a>>,
        paren: &Token<'a>,
    ) -> Result<Value<'a>> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(&arguments).map_err(|message| LoxError::runtime(paren, message))
    }
}

impl<'a> fmt::Debug for NativeFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}
