use std::rc::Rc;

use serde::Serialize;

use crate::expr::Expr;
use crate::token::Token;

/// A function or method declaration.  Shared by every closure created from it,
/// so the body is never cloned when a function value is made or bound.
#[derive(Debug, Serialize)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaticVar {
    pub name: Token,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassDecl {
    pub name: Token,
    /// Always an `Expr::Variable` when present.
    pub superclass: Option<Expr>,
    pub methods: Vec<Rc<FunctionDecl>>,
    pub static_methods: Vec<Rc<FunctionDecl>>,
    pub static_vars: Vec<StaticVar>,
}

/// `name` or `name as alias` in an import list.
#[derive(Debug, Clone, Serialize)]
pub struct ImportItem {
    pub name: Token,
    pub alias: Option<Token>,
}

impl ImportItem {
    /// The name the item is bound to in the importing scope.
    pub fn binding(&self) -> &Token {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum Stmt {
    Expression(Expr),

    Print(Expr),

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// `var (a, (b, c)) = value;`  Leaves other than variables and nested
    /// tuples are rejected by the resolver.
    VarTuple {
        pattern: Vec<Expr>,
        initializer: Expr,
        equal: Token,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `for` loops are desugared into `while` by the parser.
    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    Function(Rc<FunctionDecl>),

    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    Class(ClassDecl),

    /// `import "path";`, `import "path" as m;`, `import "path": a, b as c;`
    Import {
        path: Token,
        alias: Option<Token>,
        items: Vec<ImportItem>,
    },
}

impl Stmt {
    /// Module path of an import statement, without quotes.
    pub fn import_path(path: &Token) -> &str {
        match &path.token_type {
            crate::token::TokenType::STRING(s) => s,
            _ => &path.lexeme,
        }
    }
}
