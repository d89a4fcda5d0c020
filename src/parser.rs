/*!
Recursive‑descent parser for Rox.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`                | `debug`| High‑level descent into grammar branches. |
| Error paths (`consume`, etc.)| `debug`| Context before returning structured error.|

--------------------------------------------------------------------------------
Grammar (EBNF, condensed)
--------------------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | importDecl | statement ;
classDecl      → "class" IDENT ( ":" IDENT )? "{" member* "}" ;
member         → "static" IDENT ( function | ( "=" expression )? ";" )
               | IDENT function ;
funDecl        → "fun" IDENT function ;
function       → "(" parameters? ")" block ;
varDecl        → "var" ( IDENT ( "=" expression )?
                       | "(" expression ( "," expression )* ")" "=" expression ) ";" ;
importDecl     → "import" STRING ( "as" IDENT
                                 | ":" item ( "," item )* )? ";" ;
item           → IDENT ( "as" IDENT )? ;
statement      → exprStmt | printStmt | forStmt | whileStmt
               | ifStmt | block | returnStmt ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
expression     → assignment ;
assignment     → ( call "." IDENT | call "[" expression "]" | IDENT | tuple )
                 "=" assignment
               | target ( "+=" | "-=" | "*=" | "/=" ) assignment
               | target ( "++" | "--" )
               | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality  ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT | "[" expression "]" )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this" | "native"
               | "f" STRING | IDENT | "super" "." IDENT
               | "(" expression ( "," expression )* ")"
               | ( "[" expression "]" )+ ;
```

In interactive mode the parser never recovers from errors; running out of
tokens in the middle of a statement yields [`LoxError::Incomplete`] instead
of a syntax error, and a missing final `;` is supplied automatically.
*/

use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId, LiteralValue, Segment};
use crate::scanner::Scanner;
use crate::stmt::{ClassDecl, FunctionDecl, ImportItem, StaticVar, Stmt};
use crate::token::{Token, TokenType};

use log::{debug, info};

const MAX_ARGUMENTS: usize = 255;

/// Top‑level parser over an immutable slice of tokens ending in `EOF`.
pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    interactive: bool,
}

impl<'a> Parser<'a> {
    /// Construct a new parser.
    pub fn new(tokens: &'a [Token]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            interactive: false,
        }
    }

    /// Switch REPL behaviour on or off.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program.  Outside interactive mode every syntax error is
    /// collected, recovering at the next statement boundary.
    pub fn parse(&mut self) -> std::result::Result<Vec<Stmt>, Vec<LoxError>> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();
        let mut errors: Vec<LoxError> = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),

                Err(e) => {
                    if self.interactive {
                        return Err(vec![e]);
                    }

                    errors.push(e);
                    self.synchronize();
                }
            }
        }

        if errors.is_empty() {
            info!("Parsed {} statement(s)", statements.len());
            Ok(statements)
        } else {
            Err(errors)
        }
    }

    /// Parse a single expression.  Used for `f"…{expr}…"` segments.
    pub fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        debug!("Entering declaration at line {}", self.peek().line);

        if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.matches(TokenType::FUN) {
            let name: Token = self.consume(TokenType::IDENTIFIER, "Expected function name")?;
            Ok(Stmt::Function(self.function(name, "function")?))
        } else if self.matches(TokenType::VAR) {
            if self.matches(TokenType::LEFT_PAREN) {
                self.var_tuple()
            } else {
                self.var_declaration()
            }
        } else if self.matches(TokenType::IMPORT) {
            self.import_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expected class name")?;

        let superclass: Option<Expr> = if self.matches(TokenType::COLON) {
            let super_name: Token =
                self.consume(TokenType::IDENTIFIER, "Expected superclass name after ':'")?;
            Some(Expr::variable(super_name))
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before class body")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();
        let mut static_methods: Vec<Rc<FunctionDecl>> = Vec::new();
        let mut static_vars: Vec<StaticVar> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if self.matches(TokenType::STATIC) {
                let member: Token =
                    self.consume(TokenType::IDENTIFIER, "Expected member name after 'static'")?;

                if self.check(TokenType::LEFT_PAREN) {
                    static_methods.push(self.function(member, "static method")?);
                } else {
                    let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
                        Some(self.expression()?)
                    } else {
                        None
                    };

                    self.consume(TokenType::SEMICOLON, "Expected ';' after static field")?;

                    static_vars.push(StaticVar {
                        name: member,
                        initializer,
                    });
                }
            } else {
                let method_name: Token = self.consume(TokenType::IDENTIFIER, "Expected method name")?;
                methods.push(self.function(method_name, "method")?);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after class body")?;

        Ok(Stmt::Class(ClassDecl {
            name,
            superclass,
            methods,
            static_methods,
            static_vars,
        }))
    }

    /// Parameters and body of a function whose name was already consumed.
    fn function(&mut self, name: Token, kind: &str) -> Result<Rc<FunctionDecl>> {
        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expected '(' after {} name", kind),
        )?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    return Err(self.error_at_peek("Cannot have more than 255 parameters"));
                }

                params.push(self.consume(TokenType::IDENTIFIER, "Expected parameter name")?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters")?;
        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expected '{{' before {} body", kind),
        )?;

        let body: Vec<Stmt> = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expected variable name")?;

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after variable declaration",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    /// `var ( … ) = value;` – the opening parenthesis is already consumed.
    /// Leaf validity is checked by the resolver.
    fn var_tuple(&mut self) -> Result<Stmt> {
        let pattern: Vec<Expr> = self.tuple_elements(Vec::new())?;
        let equal: Token = self.consume(TokenType::EQUAL, "A tuple declaration needs an initializer")?;
        let initializer: Expr = self.expression()?;

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after tuple declaration",
        )?;

        Ok(Stmt::VarTuple {
            pattern,
            initializer,
            equal,
        })
    }

    fn import_declaration(&mut self) -> Result<Stmt> {
        let path: Token = self.consume(
            TokenType::STRING(String::new()),
            "Expected module path string after 'import'",
        )?;

        let mut alias: Option<Token> = None;
        let mut items: Vec<ImportItem> = Vec::new();

        if self.matches(TokenType::AS) {
            alias = Some(self.consume(TokenType::IDENTIFIER, "Expected identifier after 'as'")?);
        } else if self.matches(TokenType::COLON) {
            loop {
                let name: Token =
                    self.consume(TokenType::IDENTIFIER, "Expected name of imported item")?;

                let item_alias: Option<Token> = if self.matches(TokenType::AS) {
                    Some(self.consume(TokenType::IDENTIFIER, "Expected identifier after 'as'")?)
                } else {
                    None
                };

                items.push(ImportItem {
                    name,
                    alias: item_alias,
                });

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::SEMICOLON, "Expected ';' after import")?;

        Ok(Stmt::Import { path, alias, items })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        if self.interactive && self.is_at_end() {
            return Err(LoxError::Incomplete);
        }

        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else {
            self.expression_statement()
        }
    }

    /// Desugars `for (init; cond; incr) body` into
    /// `{ init; while (cond) { body; incr; } }`.
    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'for'")?;

        let initializer: Option<Stmt> = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition: Expr = if !self.check(TokenType::SEMICOLON) {
            self.expression()?
        } else {
            Expr::Literal(LiteralValue::True)
        };
        self.consume(TokenType::SEMICOLON, "Expected ';' after loop condition")?;

        let increment: Option<Expr> = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after for clauses")?;

        let mut body: Stmt = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let mut desugared: Vec<Stmt> = Vec::with_capacity(2);
        desugared.extend(initializer);
        desugared.push(Stmt::While {
            condition,
            body: Box::new(body),
        });

        Ok(Stmt::Block(desugared))
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expected ';' after value")?;

        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expected ';' after expression")?;
        Ok(Stmt::Expression(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'if'")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
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

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'while'")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition")?;
        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) && !self.is_at_end() {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after return value")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block")?;
        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if self.matches(TokenType::EQUAL) {
            let equals: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            return match expr {
                Expr::Tuple(targets) => Ok(Expr::TupleUnpack {
                    targets,
                    value: Box::new(value),
                    equal: equals,
                }),
                other => Self::assignment_to(other, value)
                    .ok_or_else(|| LoxError::parse(equals.line, &equals.lexeme, "Invalid assignment target")),
            };
        }

        if self.matches(TokenType::PLUS_EQUAL)
            || self.matches(TokenType::MINUS_EQUAL)
            || self.matches(TokenType::STAR_EQUAL)
            || self.matches(TokenType::SLASH_EQUAL)
        {
            let compound: Token = self.previous().clone();
            let (tt, lexeme) = match compound.token_type {
                TokenType::PLUS_EQUAL => (TokenType::PLUS, "+"),
                TokenType::MINUS_EQUAL => (TokenType::MINUS, "-"),
                TokenType::STAR_EQUAL => (TokenType::STAR, "*"),
                _ => (TokenType::SLASH, "/"),
            };
            let right: Expr = self.assignment()?;

            return self.desugar_compound(expr, Token::synthetic(tt, lexeme, compound.line), right, &compound);
        }

        if self.matches(TokenType::PLUS_PLUS) || self.matches(TokenType::MINUS_MINUS) {
            let step: Token = self.previous().clone();
            let (tt, lexeme) = match step.token_type {
                TokenType::PLUS_PLUS => (TokenType::PLUS, "+"),
                _ => (TokenType::MINUS, "-"),
            };
            let one: Expr = Expr::Literal(LiteralValue::Number(1.0));

            return self.desugar_compound(expr, Token::synthetic(tt, lexeme, step.line), one, &step);
        }

        Ok(expr)
    }

    /// `target op= right` becomes `target = target op right`.
    fn desugar_compound(&self, target: Expr, operator: Token, right: Expr, at: &Token) -> Result<Expr> {
        let value: Expr = Expr::Binary {
            left: Box::new(target.fresh_copy()),
            operator,
            right: Box::new(right),
        };

        Self::assignment_to(target, value)
            .ok_or_else(|| LoxError::parse(at.line, &at.lexeme, "Invalid assignment target"))
    }

    /// Turn an l‑value shaped expression into the matching assignment node.
    fn assignment_to(target: Expr, value: Expr) -> Option<Expr> {
        match target {
            Expr::Variable { name, .. } => Some(Expr::Assign {
                id: ExprId::fresh(),
                name,
                value: Box::new(value),
            }),

            Expr::Get { object, name } => Some(Expr::Set {
                object,
                name,
                value: Box::new(value),
            }),

            Expr::Index {
                array,
                index,
                bracket,
            } => Some(Expr::IndexSet {
                array,
                index,
                value: Box::new(value),
                bracket,
            }),

            _ => None,
        }
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.matches(TokenType::BANG_EQUAL) || self.matches(TokenType::EQUAL_EQUAL) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.comparison()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.term()?;

        while self.matches(TokenType::GREATER)
            || self.matches(TokenType::GREATER_EQUAL)
            || self.matches(TokenType::LESS)
            || self.matches(TokenType::LESS_EQUAL)
        {
            let operator: Token = self.previous().clone();
            let right: Expr = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.factor()?;

        while self.matches(TokenType::MINUS) || self.matches(TokenType::PLUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.matches(TokenType::STAR) || self.matches(TokenType::SLASH) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::BANG) || self.matches(TokenType::MINUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token =
                    self.consume(TokenType::IDENTIFIER, "Expected property name after '.'")?;

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else if self.matches(TokenType::LEFT_BRACKET) {
                let index: Expr = self.expression()?;
                let bracket: Token =
                    self.consume(TokenType::RIGHT_BRACKET, "Expected ']' after index")?;

                expr = Expr::Index {
                    array: Box::new(expr),
                    index: Box::new(index),
                    bracket,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();
        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    return Err(self.error_at_peek("Cannot have more than 255 arguments"));
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(Expr::Literal(LiteralValue::False));
        }
        if self.matches(TokenType::TRUE) {
            return Ok(Expr::Literal(LiteralValue::True));
        }
        if self.matches(TokenType::NIL) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if let TokenType::NUMBER(n) = self.peek().token_type {
            self.advance();
            return Ok(Expr::Literal(LiteralValue::Number(n)));
        }

        if let TokenType::STRING(ref s) = self.peek().token_type {
            let s: String = s.clone();
            self.advance();
            return Ok(Expr::Literal(LiteralValue::Str(s)));
        }

        if self.matches(TokenType::IDENTIFIER) {
            let name: Token = self.previous().clone();

            if (name.lexeme == "f" || name.lexeme == "F")
                && matches!(self.peek().token_type, TokenType::STRING(_))
            {
                return self.interpolation();
            }

            return Ok(Expr::variable(name));
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let first: Expr = self.expression()?;

            if self.matches(TokenType::COMMA) {
                return Ok(Expr::Tuple(self.tuple_elements(vec![first])?));
            }

            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression")?;

            return Ok(Expr::Grouping(Box::new(first)));
        }

        if self.matches(TokenType::THIS) {
            return Ok(Expr::This {
                id: ExprId::fresh(),
                keyword: self.previous().clone(),
            });
        }

        if self.matches(TokenType::SUPER) {
            let keyword: Token = self.previous().clone();
            self.consume(TokenType::DOT, "Expected '.' after 'super'")?;
            let method: Token = self.consume(TokenType::IDENTIFIER, "Expected superclass method name")?;

            return Ok(Expr::Super {
                id: ExprId::fresh(),
                keyword,
                method,
            });
        }

        if self.matches(TokenType::LEFT_BRACKET) {
            return self.array_creation();
        }

        if self.matches(TokenType::NATIVE) {
            return Ok(Expr::Native(self.previous().clone()));
        }

        Err(self.error_at_peek("Expected expression"))
    }

    /// Remaining elements of a parenthesised, comma‑separated list; the
    /// opening `(` (and any elements in `elements`) are already consumed.
    fn tuple_elements(&mut self, mut elements: Vec<Expr>) -> Result<Vec<Expr>> {
        loop {
            elements.push(self.expression()?);

            if !self.matches(TokenType::COMMA) {
                break;
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after tuple")?;

        Ok(elements)
    }

    /// `[len]` or `[len][len]…` – the first `[` is already consumed.
    fn array_creation(&mut self) -> Result<Expr> {
        let mut lengths: Vec<Expr> = Vec::new();

        let bracket: Token = loop {
            lengths.push(self.expression()?);
            let bracket: Token =
                self.consume(TokenType::RIGHT_BRACKET, "Expected ']' after array length")?;

            if !self.matches(TokenType::LEFT_BRACKET) {
                break bracket;
            }
        };

        Ok(Expr::ArrayCreation { lengths, bracket })
    }

    /// `f"text {expr} text"` – the `f` is already consumed, the string is next.
    fn interpolation(&mut self) -> Result<Expr> {
        let literal: Token = self.advance().clone();
        let TokenType::STRING(ref text) = literal.token_type else {
            return Err(self.error_at_peek("Expected string after 'f'"));
        };

        let mut segments: Vec<Segment> = Vec::new();
        let mut plain: String = String::new();
        let mut chars = text.char_indices().peekable();

        while let Some((start, ch)) = chars.next() {
            if ch != '{' {
                plain.push(ch);
                continue;
            }

            // Find the matching '}' so that braces inside the embedded
            // expression do not end it early.
            let mut depth: usize = 1;
            let mut end: Option<usize> = None;

            for (i, c) in chars.by_ref() {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            end = Some(i);
                            break;
                        }
                    }
                    _ => {}
                }
            }

            let Some(end) = end else {
                return Err(LoxError::parse(
                    literal.line,
                    &literal.lexeme,
                    "Unterminated '{' in interpolated string",
                ));
            };

            if !plain.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut plain)));
            }

            let embedded: Expr = Self::embedded_expression(&text[start + 1..end], &literal)?;
            segments.push(Segment::Expr(embedded));
        }

        if !plain.is_empty() {
            segments.push(Segment::Text(plain));
        }

        Ok(Expr::Interpolation {
            segments,
            line: literal.line,
        })
    }

    fn embedded_expression(source: &str, literal: &Token) -> Result<Expr> {
        let invalid = |message: &str| -> LoxError {
            LoxError::parse(literal.line, &literal.lexeme, format!("Invalid interpolation: {}", message))
        };

        let mut tokens: Vec<Token> = Scanner::new(source).tokenize().map_err(|errors| {
            invalid(&errors.first().map_or_else(String::new, ToString::to_string))
        })?;

        for token in &mut tokens {
            token.line += literal.line - 1;
        }

        let mut parser: Parser<'_> = Parser::new(&tokens);
        let expr: Expr = parser.expression().map_err(|e| invalid(&e.to_string()))?;

        if !parser.is_at_end() {
            return Err(invalid("expected a single expression"));
        }

        Ok(expr)
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<Token> {
        if self.check(ttype.clone()) {
            return Ok(self.advance().clone());
        }

        if self.interactive && self.is_at_end() && ttype == TokenType::SEMICOLON {
            debug!("Auto-completing ';' at end of interactive input");
            return Ok(Token::synthetic(TokenType::SEMICOLON, ";", self.peek().line));
        }

        debug!("consume failed: {}", message);

        Err(self.error_at_peek(message))
    }

    /// Syntax error at the current token, or `Incomplete` when an interactive
    /// line simply ran out.
    fn error_at_peek(&self, message: &str) -> LoxError {
        if self.interactive && self.is_at_end() {
            return LoxError::Incomplete;
        }

        let token: &Token = self.peek();
        let lexeme: &str = if token.token_type == TokenType::EOF {
            "end"
        } else {
            &token.lexeme
        };

        LoxError::parse(token.line, lexeme, message)
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN
                | TokenType::IMPORT => return,
                _ => {}
            }

            self.advance();
        }
    }
}
