use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One frame of the lexical scope chain.
///
/// Frames are shared (`Rc<RefCell<_>>`): a closure keeps its defining frame
/// alive after the block that created it exits, and a write through any
/// holder is visible to all of them.  The parent link is fixed at creation,
/// so the chain can never form a cycle.
#[derive(Debug, Default)]
pub struct Environment<'a> {
    values: HashMap<String, Value<'a>>,
    enclosing: Option<Rc<RefCell<Environment<'a>>>>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment<'a>>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap a fresh child of `enclosing` in a shareable handle.
    pub fn child_of(enclosing: &Rc<RefCell<Environment<'a>>>) -> Rc<RefCell<Environment<'a>>> {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(enclosing))))
    }

    /// Bind `name` in this frame; redefinition overwrites.
    pub fn define(&mut self, name: &str, value: Value<'a>) {
        self.values.insert(name.to_string(), value);
    }

    /// Dynamic lookup walking the whole chain.  Used for globals, which the
    /// resolver leaves unresolved.
    pub fn get(&self, name: &Token<'a>) -> Result<Value<'a>> {
        if let Some(value) = self.values.get(name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    pub fn assign(&mut self, name: &Token<'a>, value: Value<'a>) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// Read `name` exactly `distance` frames up the chain, without searching.
    pub fn lookup_at(&self, distance: usize, name: &str) -> Option<Value<'a>> {
        if distance == 0 {
            self.values.get(name).cloned()
        } else {
            self.enclosing
                .as_ref()?
                .borrow()
                .lookup_at(distance - 1, name)
        }
    }

    pub fn get_at(&self, distance: usize, name: &Token<'a>) -> Result<Value<'a>> {
        self.lookup_at(distance, name.lexeme)
            .ok_or_else(|| undefined(name))
    }

    /// Write into the frame exactly `distance` hops up the chain.
    pub fn assign_at(&mut self, distance: usize, name: &Token<'a>, value: Value<'a>) -> Result<()> {
        if distance == 0 {
            match self.values.get_mut(name.lexeme) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(undefined(name)),
            }
        } else {
            match &self.enclosing {
                Some(enclosing) => enclosing
                    .borrow_mut()
                    .assign_at(distance - 1, name, value),
                None => Err(undefined(name)),
            }
        }
    }
}

fn undefined(name: &Token<'_>) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}
