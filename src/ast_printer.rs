use crate::expr::{Expr, LiteralValue, Segment};
use crate::stmt::{FunctionDecl, Stmt};

/// Converts syntax trees to a parenthesised prefix form, one line per
/// top‑level statement.  Used by the `parse` subcommand.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3.0 → 3.0, not 3
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => Self::list(&format!("call {}", Self::print(callee)), arguments),

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            Expr::Interpolation { segments, .. } => {
                let mut s: String = String::from("(f");
                for segment in segments {
                    s.push(' ');
                    match segment {
                        Segment::Text(text) => s.push_str(&format!("{:?}", text)),
                        Segment::Expr(e) => s.push_str(&Self::print(e)),
                    }
                }
                s.push(')');
                s
            }

            Expr::ArrayCreation { lengths, .. } => Self::list("array", lengths),

            Expr::Index { array, index, .. } => {
                format!("([] {} {})", Self::print(array), Self::print(index))
            }

            Expr::IndexSet {
                array,
                index,
                value,
                ..
            } => format!(
                "(= ([] {} {}) {})",
                Self::print(array),
                Self::print(index),
                Self::print(value)
            ),

            Expr::Tuple(elements) => Self::list("tuple", elements),

            Expr::TupleUnpack { targets, value, .. } => format!(
                "(= {} {})",
                Self::list("tuple", targets),
                Self::print(value)
            ),

            Expr::Native(_) => "native".into(),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Print(expr) => format!("(print {})", Self::print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(expr) => format!("(var {} {})", name.lexeme, Self::print(expr)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::VarTuple {
                pattern,
                initializer,
                ..
            } => format!(
                "(var {} {})",
                Self::list("tuple", pattern),
                Self::print(initializer)
            ),

            Stmt::Block(statements) => Self::block("block", statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),

            Stmt::Function(declaration) => Self::function("fun", declaration),

            Stmt::Return { value, .. } => match value {
                Some(expr) => format!("(return {})", Self::print(expr)),
                None => "(return)".into(),
            },

            Stmt::Class(declaration) => {
                let mut s: String = format!("(class {}", declaration.name.lexeme);

                if let Some(superclass) = &declaration.superclass {
                    s.push_str(&format!(" : {}", Self::print(superclass)));
                }
                for var in &declaration.static_vars {
                    match &var.initializer {
                        Some(expr) => {
                            s.push_str(&format!(" (static {} {})", var.name.lexeme, Self::print(expr)))
                        }
                        None => s.push_str(&format!(" (static {})", var.name.lexeme)),
                    }
                }
                for method in &declaration.static_methods {
                    s.push(' ');
                    s.push_str(&Self::function("static", method));
                }
                for method in &declaration.methods {
                    s.push(' ');
                    s.push_str(&Self::function("method", method));
                }

                s.push(')');
                s
            }

            Stmt::Import { path, alias, items } => {
                let mut s: String = format!("(import {}", Stmt::import_path(path));

                if let Some(alias) = alias {
                    s.push_str(&format!(" as {}", alias.lexeme));
                }
                for item in items {
                    match &item.alias {
                        Some(alias) => s.push_str(&format!(" ({} as {})", item.name.lexeme, alias.lexeme)),
                        None => s.push_str(&format!(" {}", item.name.lexeme)),
                    }
                }

                s.push(')');
                s
            }
        }
    }

    fn list(head: &str, exprs: &[Expr]) -> String {
        let mut s: String = format!("({}", head);
        for e in exprs {
            s.push(' ');
            s.push_str(&Self::print(e));
        }
        s.push(')');
        s
    }

    fn block(head: &str, statements: &[Stmt]) -> String {
        let mut s: String = format!("({}", head);
        for stmt in statements {
            s.push(' ');
            s.push_str(&Self::print_stmt(stmt));
        }
        s.push(')');
        s
    }

    fn function(head: &str, declaration: &FunctionDecl) -> String {
        let params: Vec<&str> = declaration
            .params
            .iter()
            .map(|p| p.lexeme.as_str())
            .collect();

        format!(
            "({} {} ({}) {})",
            head,
            declaration.name.lexeme,
            params.join(" "),
            Self::block("body", &declaration.body)
        )
    }
}
