mod common;

#[cfg(test)]
mod resolver_tests {
    use rox as lox;

    use lox::expr::Expr;
    use lox::interpreter::{Context, Interpreter};
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::Scanner;
    use lox::stmt::Stmt;
    use lox::token::Token;

    use crate::common::{resolve_errors, run_ok, CollectingReporter, Session};

    /// Parses and resolves `source`, returning the statements and the
    /// interpreter holding the recorded distances.
    fn resolved(source: &str) -> (Vec<Stmt>, Interpreter, CollectingReporter) {
        let tokens: Vec<Token> = Scanner::new(source).tokenize().unwrap();
        let statements: Vec<Stmt> = Parser::new(&tokens).parse().unwrap();

        let reporter: CollectingReporter = CollectingReporter::default();
        let mut interpreter: Interpreter =
            Interpreter::new(Context::new().reporter(reporter.clone()));

        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("source should resolve");

        (statements, interpreter, reporter)
    }

    fn messages(source: &str) -> Vec<String> {
        resolve_errors(source)
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    #[test]
    fn test_block_distances() {
        let (statements, interpreter, _) = resolved("{ var a = 1; { print a; } }");

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected a block");
        };
        let Stmt::Block(inner) = &outer[1] else {
            panic!("expected a nested block");
        };
        let Stmt::Print(Expr::Variable { id, .. }) = &inner[0] else {
            panic!("expected print of a variable");
        };

        assert_eq!(interpreter.distance(*id), Some(1));
    }

    #[test]
    fn test_top_level_and_unresolved_names() {
        let (statements, interpreter, reporter) = resolved("var g = 1; print g; print h;");

        let Stmt::Print(Expr::Variable { id: g, .. }) = &statements[1] else {
            panic!("expected print of g");
        };
        let Stmt::Print(Expr::Variable { id: h, .. }) = &statements[2] else {
            panic!("expected print of h");
        };

        assert_eq!(interpreter.distance(*g), Some(0));
        assert_eq!(interpreter.distance(*h), None);
        assert_eq!(reporter.diagnostics().unresolved, ["h"]);
    }

    #[test]
    fn test_this_and_super_distances() {
        let (statements, interpreter, _) =
            resolved("class A {} class B : A { m() { return this; } n() { return super.m; } }");

        let Stmt::Class(class) = &statements[1] else {
            panic!("expected a class");
        };

        let Stmt::Return {
            value: Some(Expr::This { id, .. }),
            ..
        } = &class.methods[0].body[0]
        else {
            panic!("expected return this");
        };
        // method scope → `this` scope
        assert_eq!(interpreter.distance(*id), Some(1));

        let Stmt::Return {
            value: Some(Expr::Super { id, .. }),
            ..
        } = &class.methods[1].body[0]
        else {
            panic!("expected return super.m");
        };
        // method scope → `this` scope → static scope
        assert_eq!(interpreter.distance(*id), Some(2));
    }

    #[test]
    fn test_static_method_sees_static_fields() {
        let (statements, interpreter, reporter) =
            resolved("class C { static n = 1; static get() { return n; } }");

        let Stmt::Class(class) = &statements[0] else {
            panic!("expected a class");
        };
        let Stmt::Return {
            value: Some(Expr::Variable { id, .. }),
            ..
        } = &class.static_methods[0].body[0]
        else {
            panic!("expected return n");
        };

        assert_eq!(interpreter.distance(*id), Some(1));
        assert!(reporter.diagnostics().unresolved.is_empty());
    }

    #[test]
    fn test_same_scope_redeclaration_is_an_error() {
        assert_eq!(
            messages("{ var a = 1; var a = 2; }"),
            ["Already a variable with this name in this scope"]
        );
        assert_eq!(messages("fun f(a, a) {}").len(), 1);
        assert_eq!(messages("var (x, x) = (1, 2);").len(), 1);
        assert_eq!(messages("class K {} class K {}").len(), 1);
    }

    #[test]
    fn test_nested_shadowing_is_legal() {
        assert_eq!(
            run_ok("var a = \"outer\"; { var a = \"inner\"; print a; } print a;"),
            "inner\nouter\n"
        );
    }

    #[test]
    fn test_initializer_sees_enclosing_binding() {
        assert_eq!(run_ok("var a = 1; { var a = a + 1; print a; }"), "2\n");
    }

    #[test]
    fn test_return_placement() {
        assert_eq!(messages("return 1;"), ["Cannot return from top-level code"]);
        assert_eq!(
            messages("class A { init() { return 1; } }"),
            ["Cannot return a value from an initializer"]
        );

        // A bare return in an initializer is fine.
        assert_eq!(run_ok("class A { init() { return; } } print A();"), "<object: A>\n");
    }

    #[test]
    fn test_this_and_super_placement() {
        assert_eq!(messages("print this;"), ["Cannot use 'this' outside of a class"]);
        assert_eq!(
            messages("fun f() { return super.m; }"),
            ["Cannot use 'super' outside of a class"]
        );
        assert_eq!(
            messages("class A { static s() { return this; } }"),
            ["Cannot use 'this' in a static method"]
        );
        assert_eq!(
            messages("class A { static x = this; }"),
            ["Cannot use 'this' in a static method"]
        );

        // Closures inside methods may use `this`.
        assert_eq!(
            run_ok("class A { m() { fun inner() { return this; } return inner(); } } print A().m();"),
            "<object: A>\n"
        );
    }

    #[test]
    fn test_class_cannot_inherit_from_itself() {
        assert_eq!(
            messages("class A : A {}"),
            ["A class cannot inherit from itself"]
        );
    }

    #[test]
    fn test_malformed_tuple_targets() {
        assert_eq!(
            messages("var (a, 1) = (1, 2);"),
            ["Only identifiers can be declared in a tuple pattern"]
        );
        assert_eq!(
            messages("var a; (a, 1) = (1, 2);"),
            ["Invalid unpacking target"]
        );
    }

    #[test]
    fn test_import_path_cannot_contain_dot() {
        assert_eq!(
            messages("import \"lib.lox\";"),
            ["A module path cannot contain '.'"]
        );
    }

    #[test]
    fn test_every_error_is_reported_and_none_run() {
        let mut session: Session = Session::new();

        let result = session.run("print \"before\";\nreturn 1;\nprint this;");

        assert!(result.is_err());
        assert_eq!(session.output(), "");

        let diagnostics = session.diagnostics();
        assert_eq!(diagnostics.resolve.len(), 2);
        assert_eq!(diagnostics.resolve[0].line, 2);
        assert_eq!(diagnostics.resolve[0].lexeme, "return");
        assert_eq!(diagnostics.resolve[1].line, 3);
    }
}
