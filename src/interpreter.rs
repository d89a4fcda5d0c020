//! Tree‑walking evaluator.
//!
//! Statements evaluate to a [`Flow`]: either they complete normally or they
//! carry a `return` value up to the nearest function call, which is the only
//! place a `Flow::Return` is consumed.  Errors travel separately as
//! [`RuntimeError`], so a `return` is never mistaken for a failure.
//!
//! Variable references use the distances recorded by the resolver when one
//! exists and fall back to a dynamic walk of the environment chain otherwise.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::expr::{Expr, ExprId, LiteralValue, Segment};
use crate::module::{self, FsModuleSource, ModuleSource};
use crate::natives;
use crate::object::{LoxArray, LoxClass, LoxFunction, LoxInstance, LoxModule};
use crate::report::{ConsoleReporter, Reporter};
use crate::stmt::{ClassDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::{Callable, Value};

/// Convenient alias for evaluation results.
pub type IResult<T> = Result<T, RuntimeError>;

/// Everything the embedder decides: REPL mode, where diagnostics and `print`
/// output go, and where imported modules come from.
pub struct Context {
    pub interactive: bool,
    pub reporter: Box<dyn Reporter>,
    pub out: Box<dyn Write>,
    pub modules: Box<dyn ModuleSource>,
}

impl Default for Context {
    fn default() -> Self {
        Context {
            interactive: false,
            reporter: Box::new(ConsoleReporter::new()),
            out: Box::new(io::stdout()),
            modules: Box::new(FsModuleSource::new(".")),
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn output(mut self, out: impl Write + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub fn modules(mut self, modules: impl ModuleSource + 'static) -> Self {
        self.modules = Box::new(modules);
        self
    }
}

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    context: Context,
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    /// Resolver output: scope distance per variable‑referencing node.
    locals: HashMap<ExprId, usize>,
    native: Rc<LoxInstance>,
    origin: Rc<LoxClass>,
    /// Modules currently being executed, innermost last.
    loading: Vec<String>,
    /// Parsed and resolved module bodies by path, with the source they came
    /// from.  Re-importing unchanged source reuses the same nodes.
    parsed_modules: HashMap<String, (String, Rc<[Stmt]>)>,
}

impl Interpreter {
    /// Creates a new Interpreter with `Origin` defined as a global.
    pub fn new(context: Context) -> Self {
        info!(
            "Initializing Interpreter (interactive = {})",
            context.interactive
        );

        let origin: Rc<LoxClass> = Rc::new(LoxClass::origin());
        let globals: Rc<RefCell<Environment>> = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining global 'Origin'");
        globals
            .borrow_mut()
            .define("Origin", Value::Class(Rc::clone(&origin)));

        Self {
            context,
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            native: natives::native_object(),
            origin,
            loading: Vec::new(),
            parsed_modules: HashMap::new(),
        }
    }

    // ───────────────────────── embedding API ─────────────────────────

    pub fn is_interactive(&self) -> bool {
        self.context.interactive
    }

    pub fn reporter(&mut self) -> &mut dyn Reporter {
        self.context.reporter.as_mut()
    }

    pub fn globals(&self) -> Rc<RefCell<Environment>> {
        Rc::clone(&self.globals)
    }

    /// Called by the resolver for every reference it could place.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        debug!("Recording {:?} at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    /// Recorded scope distance of a node, if the resolver found one.
    pub fn distance(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Number of nodes the resolver has placed so far.
    pub fn resolved_count(&self) -> usize {
        self.locals.len()
    }

    /// Runs a resolved unit at the top level.  The first runtime error stops
    /// the unit and is reported before being returned.
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        debug!("Interpreting {} statements", statements.len());

        let result: IResult<()> = self.run_top_level(statements);

        if let Err(e) = &result {
            self.context.reporter.runtime_error(e);
        } else {
            info!("Interpretation completed successfully");
        }

        result
    }

    fn run_top_level(&mut self, statements: &[Stmt]) -> IResult<()> {
        for stmt in statements {
            if let (true, Stmt::Expression(expr)) = (self.echoes(), stmt) {
                let value: Value = self.evaluate(expr)?;

                if !expr.is_assignment() && value != Value::Nil {
                    self.write_line(&value)?;
                }

                continue;
            }

            if let Flow::Return(_) = self.execute(stmt)? {
                return Err(RuntimeError::StrayReturn);
            }
        }

        Ok(())
    }

    /// REPL echo applies to the user's own lines only, never to modules.
    fn echoes(&self) -> bool {
        self.context.interactive && self.loading.is_empty()
    }

    fn write_line(&mut self, value: &Value) -> IResult<()> {
        writeln!(self.context.out, "{}", value).map_err(|e: io::Error| RuntimeError::Output {
            message: e.to_string(),
        })
    }

    // ───────────────────────── module support ────────────────────────

    pub(crate) fn modules(&self) -> &dyn ModuleSource {
        self.context.modules.as_ref()
    }

    pub(crate) fn is_loading(&self, path: &str) -> bool {
        self.loading.iter().any(|p| p == path)
    }

    pub(crate) fn begin_loading(&mut self, path: &str) {
        self.loading.push(path.to_string());
    }

    pub(crate) fn end_loading(&mut self) {
        self.loading.pop();
    }

    pub(crate) fn parsed_module(&self, path: &str, source: &str) -> Option<Rc<[Stmt]>> {
        match self.parsed_modules.get(path) {
            Some((cached, statements)) if cached == source => Some(Rc::clone(statements)),
            _ => None,
        }
    }

    pub(crate) fn remember_module(&mut self, path: &str, source: String, statements: Rc<[Stmt]>) {
        self.parsed_modules
            .insert(path.to_string(), (source, statements));
    }

    /// A parentless frame with the same predefined names as the globals.
    pub(crate) fn fresh_root(&self) -> Rc<RefCell<Environment>> {
        let root: Rc<RefCell<Environment>> = Rc::new(RefCell::new(Environment::new()));
        root.borrow_mut()
            .define("Origin", Value::Class(Rc::clone(&self.origin)));
        root
    }

    /// Runs a module body in `env`.  Errors propagate to the importer.
    pub(crate) fn execute_module(
        &mut self,
        statements: &[Stmt],
        env: Rc<RefCell<Environment>>,
    ) -> IResult<()> {
        match self.execute_block(statements, env)? {
            Flow::Normal => Ok(()),
            Flow::Return(_) => Err(RuntimeError::StrayReturn),
        }
    }

    // ─────────────────────────── statements ──────────────────────────

    /// Runs `statements` with `env` as the current environment, restoring the
    /// previous one on every exit path.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        env: Rc<RefCell<Environment>>,
    ) -> IResult<Flow> {
        let previous: Rc<RefCell<Environment>> = mem::replace(&mut self.environment, env);

        let result: IResult<Flow> = self.execute_all(statements);

        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> IResult<Flow> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                self.write_line(&value)?;
            }

            Stmt::Var { name, initializer } => {
                debug!("Defining variable '{}'", name.lexeme);

                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::VarTuple {
                pattern,
                initializer,
                equal,
            } => {
                let value: Value = self.evaluate(initializer)?;

                self.define_pattern(pattern)?;
                self.unpack(pattern, value, equal.line)?;
            }

            Stmt::Block(statements) => {
                let env: Rc<RefCell<Environment>> = Environment::child(&self.environment);
                return self.execute_block(statements, env);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_stmt) = else_branch {
                    return self.execute(else_stmt);
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

                let function: LoxFunction = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment.borrow_mut().define(
                    &declaration.name.lexeme,
                    Value::Function(Rc::new(function)),
                );
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                return Ok(Flow::Return(value));
            }

            Stmt::Class(declaration) => self.class_declaration(declaration)?,

            Stmt::Import { path, alias, items } => {
                let module_path: &str = Stmt::import_path(path);
                let loaded: Rc<LoxModule> = module::load(self, module_path, path)?;

                if items.is_empty() {
                    let binding: &str = alias
                        .as_ref()
                        .map_or_else(|| module::namespace_name(module_path), |a| a.lexeme.as_str());

                    self.environment
                        .borrow_mut()
                        .define(binding, Value::Module(loaded));
                } else {
                    for item in items {
                        let value: Value = loaded.export(&item.name.lexeme, item.name.line)?;
                        self.environment
                            .borrow_mut()
                            .define(&item.binding().lexeme, value);
                    }
                }
            }
        }

        Ok(Flow::Normal)
    }

    fn class_declaration(&mut self, declaration: &ClassDecl) -> IResult<()> {
        let name: &Token = &declaration.name;

        debug!("Declaring class '{}'", name.lexeme);

        let superclass: Rc<LoxClass> = match &declaration.superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => class,
                _ => {
                    let super_name: String = match expr {
                        Expr::Variable { name, .. } => name.lexeme.clone(),
                        other => format!("{:?}", other),
                    };

                    return Err(RuntimeError::InvalidSuperclass {
                        name: super_name,
                        line: name.line,
                    });
                }
            },
            None => Rc::clone(&self.origin),
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        let class_env: Rc<RefCell<Environment>> = Environment::child(&self.environment);
        class_env
            .borrow_mut()
            .define("super", Value::Class(Rc::clone(&superclass)));

        for method in &declaration.static_methods {
            let function: LoxFunction =
                LoxFunction::new(Rc::clone(method), Rc::clone(&class_env), false);

            class_env
                .borrow_mut()
                .define(&method.name.lexeme, Value::Function(Rc::new(function)));
        }

        let previous: Rc<RefCell<Environment>> =
            mem::replace(&mut self.environment, Rc::clone(&class_env));
        let statics: IResult<()> = declaration.static_vars.iter().try_for_each(|var| {
            let value: Value = match &var.initializer {
                Some(expr) => self.evaluate(expr)?,
                None => Value::Nil,
            };
            class_env.borrow_mut().define(&var.name.lexeme, value);
            Ok(())
        });
        self.environment = previous;
        statics?;

        let methods: HashMap<String, Rc<LoxFunction>> = declaration
            .methods
            .iter()
            .map(|method| {
                let function: LoxFunction = LoxFunction::new(
                    Rc::clone(method),
                    Rc::clone(&class_env),
                    method.name.lexeme == "init",
                );
                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class: LoxClass = LoxClass::new(&name.lexeme, Some(superclass), methods, class_env);

        info!("Class '{}' defined", name.lexeme);

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Class(Rc::new(class)));

        Ok(())
    }

    /// Defines every identifier of a `var (…)` pattern as `nil`.
    fn define_pattern(&mut self, pattern: &[Expr]) -> IResult<()> {
        for leaf in pattern {
            match leaf {
                Expr::Variable { name, .. } => {
                    self.environment
                        .borrow_mut()
                        .define(&name.lexeme, Value::Nil);
                }
                Expr::Tuple(inner) => self.define_pattern(inner)?,
                other => {
                    return Err(RuntimeError::InvalidUnpackTarget { line: other.line() });
                }
            }
        }

        Ok(())
    }

    // ────────────────────────── expressions ──────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
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
                let left: Value = self.evaluate(left)?;

                let short_circuit: bool = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;
                self.assign_variable(*id, name, value.clone())?;
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => {
                let object: Value = self.evaluate(object)?;
                self.get_property(object, name)
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object: Value = self.evaluate(object)?;
                let value: Value = self.evaluate(value)?;
                self.set_property(object, name, value.clone())?;
                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),

            Expr::Interpolation { segments, .. } => {
                let mut text: String = String::new();

                for segment in segments {
                    match segment {
                        Segment::Text(s) => text.push_str(s),
                        Segment::Expr(e) => text.push_str(&self.evaluate(e)?.to_string()),
                    }
                }

                Ok(Value::String(text))
            }

            Expr::ArrayCreation { lengths, bracket } => {
                let mut dimensions: Vec<usize> = Vec::with_capacity(lengths.len());

                for length in lengths {
                    let value: Value = self.evaluate(length)?;
                    let dimension: usize =
                        value
                            .as_index()
                            .ok_or_else(|| RuntimeError::InvalidArrayLength {
                                value: value.to_string(),
                                line: bracket.line,
                            })?;
                    dimensions.push(dimension);
                }

                build_array(&dimensions, bracket.line)
            }

            Expr::Index {
                array,
                index,
                bracket,
            } => {
                let target: Value = self.evaluate(array)?;
                let index: Value = self.evaluate(index)?;
                index_get(&target, &index, bracket.line)
            }

            Expr::IndexSet {
                array,
                index,
                value,
                bracket,
            } => {
                let target: Value = self.evaluate(array)?;
                let index: Value = self.evaluate(index)?;
                let value: Value = self.evaluate(value)?;
                index_set(&target, &index, value.clone(), bracket.line)?;
                Ok(value)
            }

            Expr::Tuple(elements) => {
                let mut values: Vec<Value> = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Ok(Value::Tuple(Rc::from(values)))
            }

            Expr::TupleUnpack {
                targets,
                value,
                equal,
            } => {
                let value: Value = self.evaluate(value)?;
                self.unpack(targets, value.clone(), equal.line)?;
                Ok(value)
            }

            Expr::Native(_) => Ok(Value::Instance(Rc::clone(&self.native))),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> IResult<Value> {
        let right: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::OperandMustBeNumber {
                    operator: operator.lexeme.clone(),
                    line: operator.line,
                }),
            },
            _ => Ok(Value::Bool(!right.is_truthy())),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        let left: Value = self.evaluate(left)?;
        let right: Value = self.evaluate(right)?;

        let numbers = || -> IResult<(f64, f64)> {
            match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
                _ => Err(RuntimeError::OperandsMustBeNumbers {
                    operator: operator.lexeme.clone(),
                    line: operator.line,
                }),
            }
        };

        Ok(match operator.token_type {
            TokenType::PLUS => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
                (Value::String(a), other) => Value::String(format!("{}{}", a, other)),
                (other, Value::String(b)) => Value::String(format!("{}{}", other, b)),
                _ => {
                    return Err(RuntimeError::UnsupportedAddition {
                        line: operator.line,
                    })
                }
            },
            TokenType::MINUS => numbers().map(|(a, b)| Value::Number(a - b))?,
            TokenType::STAR => numbers().map(|(a, b)| Value::Number(a * b))?,
            TokenType::SLASH => numbers().map(|(a, b)| Value::Number(a / b))?,
            TokenType::GREATER => numbers().map(|(a, b)| Value::Bool(a > b))?,
            TokenType::GREATER_EQUAL => numbers().map(|(a, b)| Value::Bool(a >= b))?,
            TokenType::LESS => numbers().map(|(a, b)| Value::Bool(a < b))?,
            TokenType::LESS_EQUAL => numbers().map(|(a, b)| Value::Bool(a <= b))?,
            TokenType::EQUAL_EQUAL => Value::Bool(left == right),
            TokenType::BANG_EQUAL => Value::Bool(left != right),
            _ => {
                return Err(RuntimeError::OperandsMustBeNumbers {
                    operator: operator.lexeme.clone(),
                    line: operator.line,
                })
            }
        })
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> IResult<Value> {
        let callee: Value = self.evaluate(callee)?;

        let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.evaluate(argument)?);
        }

        let callable: Rc<dyn Callable> =
            callee
                .as_callable()
                .ok_or_else(|| RuntimeError::NotCallable {
                    value: callee.to_string(),
                    line: paren.line,
                })?;

        if args.len() != callable.arity() {
            return Err(RuntimeError::ArityMismatch {
                callee: callee.to_string(),
                expected: callable.arity(),
                got: args.len(),
                line: paren.line,
            });
        }

        callable.call(self, args, paren.line)
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        let superclass: Value = self.look_up_variable(id, keyword)?;
        let this: Value = self.environment.borrow().get("this", keyword.line)?;

        let (Value::Class(superclass), Value::Instance(instance)) = (&superclass, this) else {
            return Err(RuntimeError::UndefinedProperty {
                name: method.lexeme.clone(),
                line: method.line,
            });
        };

        let found: Rc<LoxFunction> =
            superclass
                .find_method(&method.lexeme)
                .ok_or_else(|| RuntimeError::UndefinedProperty {
                    name: method.lexeme.clone(),
                    line: method.line,
                })?;

        Ok(Value::Function(Rc::new(found.bind(instance))))
    }

    fn get_property(&self, object: Value, name: &Token) -> IResult<Value> {
        match object {
            Value::Instance(instance) => instance.get(&name.lexeme, name.line),
            Value::Class(class) => class.get_static(&name.lexeme, name.line),
            Value::Module(module) => module.export(&name.lexeme, name.line),
            other => Err(RuntimeError::NotAnObject {
                value: other.to_string(),
                line: name.line,
            }),
        }
    }

    fn set_property(&self, object: Value, name: &Token, value: Value) -> IResult<()> {
        match object {
            Value::Instance(instance) => instance.set(&name.lexeme, value),
            Value::Class(class) => class.set_static(&name.lexeme, value),
            Value::Module(module) => {
                return Err(RuntimeError::ReadOnlyModule {
                    module: module.name().to_string(),
                    line: name.line,
                })
            }
            other => {
                return Err(RuntimeError::NotAnObject {
                    value: other.to_string(),
                    line: name.line,
                })
            }
        }

        Ok(())
    }

    // ─────────────────────────── variables ───────────────────────────

    fn look_up_variable(&self, id: ExprId, name: &Token) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme, name.line),
            None => self.environment.borrow().get(&name.lexeme, name.line),
        }
    }

    fn assign_variable(&mut self, id: ExprId, name: &Token, value: Value) -> IResult<()> {
        match self.locals.get(&id) {
            Some(&distance) => {
                Environment::assign_at(&self.environment, distance, &name.lexeme, value, name.line)
            }
            None => self
                .environment
                .borrow_mut()
                .assign(&name.lexeme, value, name.line),
        }
    }

    // ─────────────────────────── unpacking ───────────────────────────

    /// Assigns the leading elements of `source` to `targets` by position.
    /// Extra elements on the right are ignored.
    fn unpack(&mut self, targets: &[Expr], source: Value, line: usize) -> IResult<()> {
        let elements: Vec<Value> = match &source {
            Value::Array(array) => array.elements().clone(),
            Value::Tuple(elements) => elements.to_vec(),
            other => {
                return Err(RuntimeError::UnpackSource {
                    value: other.to_string(),
                    line,
                })
            }
        };

        if targets.len() > elements.len() {
            return Err(RuntimeError::UnbalancedUnpack {
                left: targets.len(),
                right: elements.len(),
                line,
            });
        }

        for (target, value) in targets.iter().zip(elements) {
            self.assign_target(target, value, line)?;
        }

        Ok(())
    }

    fn assign_target(&mut self, target: &Expr, value: Value, line: usize) -> IResult<()> {
        match target {
            Expr::Variable { id, name } => self.assign_variable(*id, name, value),

            Expr::Get { object, name } => {
                let object: Value = self.evaluate(object)?;
                self.set_property(object, name, value)
            }

            Expr::Index {
                array,
                index,
                bracket,
            } => {
                let target: Value = self.evaluate(array)?;
                let index: Value = self.evaluate(index)?;
                index_set(&target, &index, value, bracket.line)
            }

            Expr::Tuple(inner) => self.unpack(inner, value, line),

            other => Err(RuntimeError::InvalidUnpackTarget { line: other.line().max(line) }),
        }
    }
}

// ───────────────────────────── helpers ─────────────────────────────

/// `[d0][d1]…` – nested arrays, innermost slots `nil`.
fn build_array(dimensions: &[usize], line: usize) -> IResult<Value> {
    let unallocatable = |length: usize| RuntimeError::InvalidArrayLength {
        value: length.to_string(),
        line,
    };

    match dimensions.split_first() {
        None => Ok(Value::Nil),
        Some((&length, rest)) if rest.is_empty() => {
            let array: LoxArray = LoxArray::new(length).map_err(|_| unallocatable(length))?;
            Ok(Value::Array(Rc::new(array)))
        }
        Some((&length, rest)) => {
            let mut rows: Vec<Value> = Vec::new();
            rows.try_reserve_exact(length)
                .map_err(|_| unallocatable(length))?;
            for _ in 0..length {
                rows.push(build_array(rest, line)?);
            }
            Ok(Value::Array(Rc::new(LoxArray::from_values(rows))))
        }
    }
}

fn checked_index(index: &Value, line: usize) -> IResult<usize> {
    index.as_index().ok_or_else(|| RuntimeError::InvalidIndex {
        value: index.to_string(),
        line,
    })
}

fn index_get(target: &Value, index: &Value, line: usize) -> IResult<Value> {
    match target {
        Value::Array(array) => array.get(checked_index(index, line)?, line),
        Value::Tuple(elements) => {
            let i: usize = checked_index(index, line)?;
            elements
                .get(i)
                .cloned()
                .ok_or(RuntimeError::IndexOutOfBounds {
                    index: i,
                    length: elements.len(),
                    line,
                })
        }
        other => Err(RuntimeError::NotAnArray {
            value: other.to_string(),
            line,
        }),
    }
}

fn index_set(target: &Value, index: &Value, value: Value, line: usize) -> IResult<()> {
    match target {
        Value::Array(array) => array.set(checked_index(index, line)?, value, line),
        Value::Tuple(_) => Err(RuntimeError::ImmutableTuple { line }),
        other => Err(RuntimeError::NotAnArray {
            value: other.to_string(),
            line,
        }),
    }
}
