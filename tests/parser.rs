#[cfg(test)]
mod parser_tests {
    use rox as lox;

    use lox::ast_printer::AstPrinter;
    use lox::error::LoxError;
    use lox::expr::{Expr, Segment};
    use lox::parser::Parser;
    use lox::scanner::Scanner;
    use lox::stmt::Stmt;
    use lox::token::{Token, TokenType};

    fn tokens(source: &str) -> Vec<Token> {
        Scanner::new(source).tokenize().expect("source should scan")
    }

    fn parse(source: &str) -> Vec<Stmt> {
        let tokens: Vec<Token> = tokens(source);
        match Parser::new(&tokens).parse() {
            Ok(statements) => statements,
            Err(errors) => panic!("parse failed: {:?}", errors),
        }
    }

    fn parse_errors(source: &str) -> Vec<LoxError> {
        let tokens: Vec<Token> = tokens(source);
        Parser::new(&tokens)
            .parse()
            .expect_err("source should not parse")
    }

    fn printed(source: &str) -> Vec<String> {
        parse(source).iter().map(AstPrinter::print_stmt).collect()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(printed("1 + 2 * 3;"), ["(; (+ 1.0 (* 2.0 3.0)))"]);
        assert_eq!(printed("!(a or b) and c;"), ["(; (and (! (group (or a b))) c))"]);
    }

    #[test]
    fn test_for_desugars_to_while() {
        assert_eq!(
            printed("for (var i = 0; i < 1; i = i + 1) print i;"),
            ["(block (var i 0.0) (while (< i 1.0) (block (print i) (; (= i (+ i 1.0))))))"]
        );

        // Every clause optional; missing condition is `true`.
        assert_eq!(printed("for (;;) print 1;"), ["(block (while true (print 1.0)))"]);
    }

    #[test]
    fn test_compound_assignment_desugars() {
        assert_eq!(
            printed("x += 2; x++; o.f -= 1; a[0] *= 3; y--;"),
            [
                "(; (= x (+ x 2.0)))",
                "(; (= x (+ x 1.0)))",
                "(; (= (. o f) (- (. o f) 1.0)))",
                "(; (= ([] a 0.0) (* ([] a 0.0) 3.0)))",
                "(; (= y (- y 1.0)))",
            ]
        );
    }

    #[test]
    fn test_compound_assignment_copies_get_distinct_ids() {
        let statements: Vec<Stmt> = parse("x += 1;");

        let Stmt::Expression(Expr::Assign { id, value, .. }) = &statements[0] else {
            panic!("expected an assignment");
        };
        let Expr::Binary { left, .. } = value.as_ref() else {
            panic!("expected a binary value");
        };
        let Expr::Variable { id: read_id, .. } = left.as_ref() else {
            panic!("expected a variable read");
        };

        assert_ne!(id, read_id);
    }

    #[test]
    fn test_tuple_literal_and_unpack() {
        assert_eq!(printed("(1, (2, 3));"), ["(; (tuple 1.0 (tuple 2.0 3.0)))"]);
        assert_eq!(printed("(1);"), ["(; (group 1.0))"]);

        let statements: Vec<Stmt> = parse("(a, (o.b, c[0])) = t;");
        let Stmt::Expression(Expr::TupleUnpack { targets, .. }) = &statements[0] else {
            panic!("expected a tuple unpack");
        };

        assert_eq!(targets.len(), 2);
        assert!(matches!(&targets[1], Expr::Tuple(inner) if inner.len() == 2));
    }

    #[test]
    fn test_var_tuple_declaration() {
        let statements: Vec<Stmt> = parse("var (a, (b, c)) = (1, (2, 3));");

        let Stmt::VarTuple { pattern, .. } = &statements[0] else {
            panic!("expected a tuple declaration");
        };

        assert_eq!(pattern.len(), 2);
        assert!(matches!(&pattern[0], Expr::Variable { name, .. } if name.lexeme == "a"));
    }

    #[test]
    fn test_class_with_static_members() {
        let statements: Vec<Stmt> =
            parse("class B : A { static count = 1; static make() {} init(x) {} area() {} }");

        let Stmt::Class(class) = &statements[0] else {
            panic!("expected a class");
        };

        assert_eq!(class.name.lexeme, "B");
        assert!(matches!(&class.superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));
        assert_eq!(class.static_vars.len(), 1);
        assert_eq!(class.static_methods.len(), 1);
        assert_eq!(class.methods.len(), 2);
        assert_eq!(class.methods[0].params.len(), 1);
    }

    #[test]
    fn test_array_creation_and_indexing() {
        assert_eq!(printed("[2][3];"), ["(; (array 2.0 3.0))"]);
        assert_eq!(printed("g[1][2] = 5;"), ["(; (= ([] ([] g 1.0) 2.0) 5.0))"]);
    }

    #[test]
    fn test_import_forms() {
        assert_eq!(
            printed("import \"m\"; import \"lib/m\" as k; import \"m\": a, b as c;"),
            ["(import m)", "(import lib/m as k)", "(import m a (b as c))"]
        );

        let statements: Vec<Stmt> = parse("import \"m\": a, b as c;");
        let Stmt::Import { items, .. } = &statements[0] else {
            panic!("expected an import");
        };

        assert_eq!(items[0].binding().lexeme, "a");
        assert_eq!(items[1].binding().lexeme, "c");
    }

    #[test]
    fn test_interpolation_segments() {
        let statements: Vec<Stmt> = parse("f\"a{x}b{ f(1) }\";");

        let Stmt::Expression(Expr::Interpolation { segments, .. }) = &statements[0] else {
            panic!("expected an interpolated string");
        };

        assert_eq!(segments.len(), 4);
        assert!(matches!(&segments[0], Segment::Text(t) if t == "a"));
        assert!(matches!(&segments[1], Segment::Expr(Expr::Variable { .. })));
        assert!(matches!(&segments[2], Segment::Text(t) if t == "b"));
        assert!(matches!(&segments[3], Segment::Expr(Expr::Call { .. })));
    }

    #[test]
    fn test_interpolation_errors() {
        let errors: Vec<LoxError> = parse_errors("f\"a{x\";");
        assert!(errors[0].to_string().contains("Unterminated '{'"));

        let errors: Vec<LoxError> = parse_errors("f\"{1 2}\";");
        assert!(errors[0].to_string().contains("Invalid interpolation"));
    }

    #[test]
    fn test_error_recovery_collects_every_error() {
        let errors: Vec<LoxError> = parse_errors("var = 1;\nprint ;\nvar ok = 1;");

        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("[line 1]"));
        assert!(errors[1].to_string().contains("[line 2]"));
        assert!(errors[1].to_string().contains("Expected expression"));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let errors: Vec<LoxError> = parse_errors("1 = 2;");
        assert!(errors[0].to_string().contains("Invalid assignment target"));

        let errors: Vec<LoxError> = parse_errors("f() += 1;");
        assert!(errors[0].to_string().contains("Invalid assignment target"));
    }

    #[test]
    fn test_argument_limit() {
        let args: Vec<&str> = vec!["0"; 256];
        let source: String = format!("f({});", args.join(", "));

        let errors: Vec<LoxError> = parse_errors(&source);
        assert!(errors[0].to_string().contains("more than 255 arguments"));
    }

    #[test]
    fn test_interactive_mode() {
        // A missing final ';' is supplied.
        let toks: Vec<Token> = tokens("print 1");
        let statements = Parser::new(&toks).interactive(true).parse().unwrap();
        assert_eq!(statements.len(), 1);

        // Running out of input mid‑statement asks for more.
        for source in ["fun f() {", "1 +", "if (x)", "class A {"] {
            let toks: Vec<Token> = tokens(source);
            let errors: Vec<LoxError> = Parser::new(&toks).interactive(true).parse().unwrap_err();
            assert!(
                matches!(errors.as_slice(), [LoxError::Incomplete]),
                "{:?} should be incomplete",
                source
            );
        }

        // A real mistake is still a syntax error.
        let toks: Vec<Token> = tokens("print ;");
        let errors: Vec<LoxError> = Parser::new(&toks).interactive(true).parse().unwrap_err();
        assert!(matches!(errors.as_slice(), [LoxError::Parse { .. }]));
    }

    #[test]
    fn test_statements_serialize() {
        let statements: Vec<Stmt> = parse("var x = 1;");
        let json: String = serde_json::to_string(&statements).unwrap();

        assert!(json.contains("\"Var\""));
        assert!(json.contains("\"x\""));
    }

    #[test]
    fn test_native_and_super() {
        assert_eq!(printed("native.clock();"), ["(; (call (. native clock)))"]);
        assert_eq!(printed("super.m;"), ["(; (super m))"]);
        assert!(matches!(
            tokens("native")[0].token_type,
            TokenType::NATIVE
        ));
    }
}
