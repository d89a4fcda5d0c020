//! Static resolver pass for the **Rox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (a stack of name sets) mirroring the environments
//!    the interpreter will create at run time.
//! 2. Report static errors (redeclaration, misplaced `return`/`this`/`super`,
//!    self‑inheritance, malformed tuple patterns, dotted import paths).
//! 3. Tell the interpreter, for *each* variable occurrence, at what depth it
//!    lives.  Names found in no scope are left to dynamic lookup and reported
//!    as warnings.
//!
//! A class body opens two scopes: an outer one for static members and the
//! implicit `super`, which the interpreter binds in the class environment,
//! and an inner one holding only `this`, which a bound method's closure
//! defines.  Instance methods are resolved inside both; static methods and
//! static field initializers only inside the outer one.

use std::collections::HashSet;

use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId, Segment};
use crate::interpreter::Interpreter;
use crate::module;
use crate::stmt::{ClassDecl, FunctionDecl, Stmt};
use crate::token::Token;
use log::{debug, info};

/// What kind of function body we are in.  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
    StaticMethod,
}

/// What kind of class member we are in.  `this`/`super` need `Class`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Static,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances by calling back into the interpreter.
pub struct Resolver<'interp> {
    interpreter: &'interp mut Interpreter,
    scopes: Vec<HashSet<String>>,
    current_function: FunctionType,
    current_class: ClassType,
    errors: Vec<LoxError>,
    /// Forward errors to the reporter as they are found.
    report: bool,
}

impl<'interp> Resolver<'interp> {
    /// Create a new resolver bound to the given interpreter.  The scope stack
    /// starts with the top level of the unit, which already holds `Origin`.
    pub fn new(interpreter: &'interp mut Interpreter) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            scopes: vec![HashSet::from([String::from("Origin")])],
            current_function: FunctionType::None,
            current_class: ClassType::None,
            errors: Vec::new(),
            report: true,
        }
    }

    /// Collect errors without reporting them; the caller surfaces the first
    /// one itself.
    pub fn silent(mut self) -> Self {
        self.report = false;
        self
    }

    /// Walk all top‑level statements.  Every error is reported; the first one
    /// is returned so the caller can skip interpretation.
    pub fn resolve(&mut self, statements: &[Stmt]) -> Result<()> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            info!("Resolve pass found {} error(s)", self.errors.len());
            Err(self.errors.remove(0))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::Var { name, initializer } => {
                // The initializer sees the enclosing binding, not this one.
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.declare(name);
            }

            Stmt::VarTuple {
                pattern,
                initializer,
                equal,
            } => {
                self.resolve_expr(initializer);
                self.declare_pattern(pattern, equal);
            }

            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Function(declaration) => {
                // The name is visible inside its own body.
                self.declare(&declaration.name);
                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Cannot return from top-level code");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Cannot return a value from an initializer");
                    }
                    self.resolve_expr(expr);
                }
            }

            Stmt::Class(declaration) => self.resolve_class(declaration),

            Stmt::Import { path, alias, items } => {
                let module_path: &str = Stmt::import_path(path);

                if module_path.contains('.') {
                    self.error(path, "A module path cannot contain '.'");
                }

                if items.is_empty() {
                    match alias {
                        Some(alias) => self.declare(alias),
                        None => {
                            let binding: Token = Token::synthetic(
                                path.token_type.clone(),
                                module::namespace_name(module_path),
                                path.line,
                            );
                            self.declare(&binding);
                        }
                    }
                } else {
                    for item in items {
                        self.declare(item.binding());
                    }
                }
            }
        }
    }

    fn resolve_class(&mut self, declaration: &ClassDecl) {
        let enclosing_class: ClassType = self.current_class;
        let name: &Token = &declaration.name;

        debug!("Resolving class '{}'", name.lexeme);

        self.declare(name);

        if let Some(superclass) = &declaration.superclass {
            if let Expr::Variable {
                name: super_name, ..
            } = superclass
            {
                if super_name.lexeme == name.lexeme {
                    self.error(super_name, "A class cannot inherit from itself");
                }
            }

            self.resolve_expr(superclass);
        }

        // ① static scope: `super`, static methods, static fields
        self.begin_scope();
        self.define_implicit("super");

        for method in &declaration.static_methods {
            self.declare(&method.name);
        }

        self.current_class = ClassType::Static;

        for var in &declaration.static_vars {
            if let Some(expr) = &var.initializer {
                self.resolve_expr(expr);
            }
            self.declare(&var.name);
        }

        for method in &declaration.static_methods {
            self.resolve_function(method, FunctionType::StaticMethod);
        }

        // ② instance scope: `this`
        self.current_class = ClassType::Class;
        self.begin_scope();
        self.define_implicit("this");

        for method in &declaration.methods {
            let kind: FunctionType = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            self.resolve_function(method, kind);
        }

        self.end_scope();
        self.end_scope();

        self.current_class = enclosing_class;
    }

    /// Declares each identifier of a `var (…)` pattern.
    fn declare_pattern(&mut self, pattern: &[Expr], equal: &Token) {
        for leaf in pattern {
            match leaf {
                Expr::Variable { name, .. } => self.declare(name),
                Expr::Tuple(inner) => self.declare_pattern(inner, equal),
                _ => self.error(equal, "Only identifiers can be declared in a tuple pattern"),
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) | Expr::Native(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => self.resolve_local(*id, name),

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::This { id, keyword } => {
                if self.check_in_method(keyword) {
                    self.resolve_local(*id, keyword);
                }
            }

            Expr::Super { id, keyword, .. } => {
                if self.check_in_method(keyword) {
                    self.resolve_local(*id, keyword);
                }
            }

            Expr::Interpolation { segments, .. } => {
                for segment in segments {
                    if let Segment::Expr(e) = segment {
                        self.resolve_expr(e);
                    }
                }
            }

            Expr::ArrayCreation { lengths, .. } => {
                for length in lengths {
                    self.resolve_expr(length);
                }
            }

            Expr::Index { array, index, .. } => {
                self.resolve_expr(array);
                self.resolve_expr(index);
            }

            Expr::IndexSet {
                array,
                index,
                value,
                ..
            } => {
                self.resolve_expr(array);
                self.resolve_expr(index);
                self.resolve_expr(value);
            }

            Expr::Tuple(elements) => {
                for element in elements {
                    self.resolve_expr(element);
                }
            }

            Expr::TupleUnpack {
                targets,
                value,
                equal,
            } => {
                self.resolve_expr(value);
                self.resolve_unpack_targets(targets, equal);
            }
        }
    }

    /// Targets of `(…) = value` must be assignable shapes.
    fn resolve_unpack_targets(&mut self, targets: &[Expr], equal: &Token) {
        for target in targets {
            match target {
                Expr::Variable { id, name } => self.resolve_local(*id, name),
                Expr::Get { object, .. } => self.resolve_expr(object),
                Expr::Index { array, index, .. } => {
                    self.resolve_expr(array);
                    self.resolve_expr(index);
                }
                Expr::Tuple(inner) => self.resolve_unpack_targets(inner, equal),
                _ => self.error(equal, "Invalid unpacking target"),
            }
        }
    }

    /// `this` and `super` need an enclosing instance method.
    fn check_in_method(&mut self, keyword: &Token) -> bool {
        let message: String = match self.current_class {
            ClassType::Class => return true,
            ClassType::Static => format!("Cannot use '{}' in a static method", keyword.lexeme),
            ClassType::None => format!("Cannot use '{}' outside of a class", keyword.lexeme),
        };

        self.error(keyword, &message);

        false
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, declaration: &FunctionDecl, kind: FunctionType) {
        let enclosing: FunctionType = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
        }
        for stmt in &declaration.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashSet::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        let duplicate: bool = match self.scopes.last_mut() {
            Some(scope) => !scope.insert(name.lexeme.clone()),
            None => false,
        };

        if duplicate {
            self.error(name, "Already a variable with this name in this scope");
        }
    }

    fn define_implicit(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        debug!("Resolve error at line {}: {}", token.line, message);

        if self.report {
            self.interpreter
                .reporter()
                .resolve_error(token.line, &token.lexeme, message);
        }
        self.errors
            .push(LoxError::resolve(token.line, &token.lexeme, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as either a local at depth `d`, or
    /// leave it to dynamic lookup if it is not found in *any* scope.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.interpreter.note_local(id, depth);
                return;
            }
        }

        debug!("'{}' left to dynamic lookup", name.lexeme);

        self.interpreter.reporter().unresolved(name.line, &name.lexeme);
    }
}
