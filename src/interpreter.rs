use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};

use crate::callable::{Callable, LoxFunction, NativeFunction};
use crate::class::{LoxClass, INITIALIZER};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::instance::LoxInstance;
use crate::parser::{Expr, ExprId, LiteralValue, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Call depth at which a program is stopped with `Stack overflow.`.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Host stack, in bytes, that nested calls may use before the program is
/// stopped with `Stack overflow.`.  Measured from the outermost call, so the
/// caller's own frames and one function body must fit in what the thread has
/// beyond this.  Fits the 2 MiB that spawned threads get by default.
pub const DEFAULT_MAX_STACK_BYTES: usize = 1024 * 1024;

/// How a statement finished.  `return` unwinds through enclosing blocks and
/// loops as `Flow::Return` until the function call that owns it.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow<'a> {
    Normal,
    Return(Value<'a>),
}

/// Tree‑walking evaluator.  `print` output goes to `W`.
pub struct Interpreter<'a, W: Write> {
    globals: Rc<RefCell<Environment<'a>>>,
    environment: Rc<RefCell<Environment<'a>>>,
    /// Resolver distances for local variable uses, keyed by node identity.
    locals: HashMap<ExprId, usize>,
    out: W,
    call_depth: usize,
    max_call_depth: usize,
    /// Stack position of the outermost active call; `None` between calls.
    stack_base: Option<usize>,
    max_stack_bytes: usize,
}

impl<'a> Interpreter<'a, io::Stdout> {
    /// Interpreter printing to standard output.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl<'a> Default for Interpreter<'a, io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, W: Write> Interpreter<'a, W> {
    /// Creates a new Interpreter and defines native functions such as `clock`.
    pub fn with_output(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction(Rc::new(NativeFunction {
                name: "clock",
                arity: 0,
                func: |_args: &[Value<'a>]| {
                    let timestamp: f64 = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
                        .as_secs_f64();
                    Ok(Value::Number(timestamp))
                },
            })),
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
            call_depth: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            stack_base: None,
            max_stack_bytes: DEFAULT_MAX_STACK_BYTES,
        }
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    /// Raise this only when running on a thread with a correspondingly
    /// larger stack.
    pub fn with_max_stack_bytes(mut self, max_stack_bytes: usize) -> Self {
        self.max_stack_bytes = max_stack_bytes;
        self
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Called by the resolver: the variable use `id` lives `depth` frames up.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        debug!("Noting local {:?} at depth {}", id, depth);

        self.locals.insert(id, depth);
    }

    /// Interprets a list of statements (a "program").  Stops at the first
    /// runtime error.
    pub fn interpret(&mut self, statements: &[Stmt<'a>]) -> Result<()> {
        info!("Interpreting {} statements", statements.len());

        for stmt in statements {
            self.execute(stmt)?;
        }

        self.out.flush()?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ───────────────────────────── statements ─────────────────────────────

    fn execute(&mut self, stmt: &Stmt<'a>) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value: Value<'a> = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
            }

            Stmt::Var { name, initializer } => {
                let value: Value<'a> = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let environment = Environment::child_of(&self.environment);
                return self.execute_block(statements, environment);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // Capture the current frame as the closure.
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment
                    .borrow_mut()
                    .define(declaration.name.lexeme, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value: Value<'a> = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);
                return Ok(Flow::Return(value));
            }

            Stmt::Class { name, methods } => {
                debug!("Defining class '{}'", name.lexeme);

                // Bound first so the class can be referenced while it is built.
                self.environment.borrow_mut().define(name.lexeme, Value::Nil);

                let mut table: HashMap<String, Rc<LoxFunction<'a>>> = HashMap::new();

                for method in methods {
                    let function = LoxFunction::new(
                        Rc::clone(method),
                        Rc::clone(&self.environment),
                        method.name.lexeme == INITIALIZER,
                    );

                    table.insert(method.name.lexeme.to_string(), Rc::new(function));
                }

                let class = LoxClass::new(name.lexeme, table);

                self.environment
                    .borrow_mut()
                    .assign(name, Value::Class(Rc::new(class)))?;
            }
        }

        Ok(Flow::Normal)
    }

    /// Runs `statements` with `environment` as the current frame and restores
    /// the previous frame afterwards, whether they finish, return or fail.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt<'a>],
        environment: Rc<RefCell<Environment<'a>>>,
    ) -> Result<Flow<'a>> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = self.run_statements(statements);
        self.environment = previous;

        result
    }

    fn run_statements(&mut self, statements: &[Stmt<'a>]) -> Result<Flow<'a>> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    // ──────────────────────────── expressions ─────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value<'a> = self.evaluate(left)?;

                let short_circuit: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Assign { id, name, value } => {
                let value: Value<'a> = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        self.environment
                            .borrow_mut()
                            .assign_at(distance, name, value.clone())?;
                    }
                    None => {
                        self.globals.borrow_mut().assign(name, value.clone())?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value<'a> = self.evaluate(callee)?;

                // Arguments are evaluated left to right even if the call
                // itself is about to fail.
                let mut values: Vec<Value<'a>> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                match callee {
                    Value::Function(function) => self.invoke(function.as_ref(), values, paren),
                    Value::NativeFunction(native) => self.invoke(native.as_ref(), values, paren),
                    Value::Class(class) => self.invoke(&class, values, paren),
                    other => {
                        debug!("Attempted to call a {}", other.type_name());
                        Err(LoxError::runtime(
                            paren,
                            "Can only call functions and classes.",
                        ))
                    }
                }
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value: Value<'a> = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }
        }
    }

    fn look_up_variable(&self, name: &Token<'a>, id: ExprId) -> Result<Value<'a>> {
        match self.locals.get(&id) {
            Some(&distance) => self.environment.borrow().get_at(distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// Arity and depth checks shared by every kind of callable.
    fn invoke<C: Callable<'a>>(
        &mut self,
        callee: &C,
        arguments: Vec<Value<'a>>,
        paren: &Token<'a>,
    ) -> Result<Value<'a>> {
        if arguments.len() != callee.arity() {
            return Err(LoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    callee.arity(),
                    arguments.len()
                ),
            ));
        }

        let here: usize = stack_position();
        let base: usize = *self.stack_base.get_or_insert(here);
        let used: usize = base.abs_diff(here);

        if self.call_depth >= self.max_call_depth || used > self.max_stack_bytes {
            debug!(
                "Stack overflow at depth {} with {} bytes in use",
                self.call_depth, used
            );

            if self.call_depth == 0 {
                self.stack_base = None;
            }

            return Err(LoxError::runtime(paren, "Stack overflow."));
        }

        self.call_depth += 1;
        let result = callee.call(self, arguments, paren);
        self.call_depth -= 1;

        if self.call_depth == 0 {
            self.stack_base = None;
        }

        result
    }

    fn evaluate_unary(&mut self, operator: &Token<'a>, right: &Expr<'a>) -> Result<Value<'a>> {
        let right: Value<'a> = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
            },

            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),

            _ => Err(LoxError::runtime(operator, "Invalid unary operator.")),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr<'a>,
        operator: &Token<'a>,
        right: &Expr<'a>,
    ) -> Result<Value<'a>> {
        let left: Value<'a> = self.evaluate(left)?;
        let right: Value<'a> = self.evaluate(right)?;

        match operator.token_type {
            TokenType::EQUAL_EQUAL => return Ok(Value::Bool(left == right)),
            TokenType::BANG_EQUAL => return Ok(Value::Bool(left != right)),
            TokenType::PLUS => {
                return match (left, right) {
                    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                    (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                    _ => Err(LoxError::runtime(
                        operator,
                        "Operands must be two numbers or two strings.",
                    )),
                }
            }
            _ => {}
        }

        let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
            return Err(LoxError::runtime(operator, "Operands must be numbers."));
        };
        let (a, b): (f64, f64) = (*a, *b);

        // Division by zero follows IEEE‑754 (inf / NaN), not an error.
        match operator.token_type {
            TokenType::MINUS => Ok(Value::Number(a - b)),
            TokenType::STAR => Ok(Value::Number(a * b)),
            TokenType::SLASH => Ok(Value::Number(a / b)),
            TokenType::GREATER => Ok(Value::Bool(a > b)),
            TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
            TokenType::LESS => Ok(Value::Bool(a < b)),
            TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
            _ => Err(LoxError::runtime(operator, "Invalid binary operator.")),
        }
    }
}

/// Address of a local in a fresh frame: a portable stand-in for the stack
/// pointer.  Only differences between two readings on one thread matter.
#[inline(never)]
fn stack_position() -> usize {
    let marker: u8 = 0;
    std::hint::black_box(&marker) as *const u8 as usize
}
