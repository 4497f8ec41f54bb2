use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::callable::{Callable, LoxFunction};
use crate::error::Result;
use crate::instance::LoxInstance;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

/// Name of the method run automatically on construction.
pub const INITIALIZER: &str = "init";

/// A class value: its name and unbound method table.
pub struct LoxClass<'a> {
    name: &'a str,
    methods: HashMap<String, Rc<LoxFunction<'a>>>,
}

impl<'a> LoxClass<'a> {
    pub fn new(name: &'a str, methods: HashMap<String, Rc<LoxFunction<'a>>>) -> Self {
        Self { name, methods }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction<'a>>> {
        self.methods.get(name).cloned()
    }
}

/// Calling a class constructs an instance and runs `init`, if any, on it.
impl<'a> Callable<'a> for Rc<LoxClass<'a>> {
    fn arity(&self) -> usize {
        self.find_method(INITIALIZER)
            .map_or(0, |initializer| initializer.arity())
    }

    fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<'a, W>,
        arguments: Vec<Value<'a>>,
        paren: &Token<'a>,
    ) -> Result<Value<'a>> {
        debug!("Instantiating class '{}'", self.name);

        let instance: Value<'a> = Value::Instance(Rc::new(RefCell::new(LoxInstance::new(
            Rc::clone(self),
        ))));

        if let Some(initializer) = self.find_method(INITIALIZER) {
            initializer
                .bind(instance.clone())
                .call(interpreter, arguments, paren)?;
        }

        Ok(instance)
    }
}

impl<'a> fmt::Debug for LoxClass<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}
