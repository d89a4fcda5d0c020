mod common;

#[cfg(test)]
mod module_tests {
    use rox as lox;

    use lox::error::{LoxError, RuntimeError};
    use lox::module::{namespace_name, MemoryModuleSource, ModuleSource};

    use crate::common::Session;

    const MATH: &str = r#"
        var pi = 3;
        fun square(x) { return x * x; }
        class Vec {
            init(x) { this.x = x; }
            twice() { return square(this.x) / this.x * 2; }
        }
    "#;

    fn library() -> MemoryModuleSource {
        MemoryModuleSource::new()
            .with("math", MATH)
            .with("lib/strings", "var greeting = \"hi\";")
            .with("noisy", "print \"loading\";")
            .with("shapes", "class Shape {}\nvar isRoot = native.is(Shape(), Origin);")
    }

    fn run(source: &str) -> (Session, Result<(), LoxError>) {
        let mut session: Session = Session::with_modules(library());
        let result = session.run(source);
        (session, result)
    }

    fn run_ok(source: &str) -> String {
        let (session, result) = run(source);

        if let Err(e) = result {
            panic!("program failed: {}\n{:?}", e, session.diagnostics());
        }

        session.output()
    }

    fn run_err(source: &str) -> RuntimeError {
        match run(source) {
            (_, Err(LoxError::Runtime(e))) => e,
            (_, other) => panic!("expected a runtime error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_namespace_name_is_last_segment() {
        assert_eq!(namespace_name("math"), "math");
        assert_eq!(namespace_name("lib/strings"), "strings");
        assert_eq!(namespace_name("a/b/c"), "c");
    }

    #[test]
    fn test_memory_source() {
        let source: MemoryModuleSource = library();

        assert!(source.load("math").unwrap().contains("square"));
        assert!(source.load("nowhere").is_err());
    }

    #[test]
    fn test_whole_module_import() {
        assert_eq!(
            run_ok("import \"math\"; print math.pi; print math.square(4); print math;"),
            "3\n16\n<module: math>\n"
        );
    }

    #[test]
    fn test_aliased_import() {
        assert_eq!(run_ok("import \"math\" as m; print m.pi;"), "3\n");
    }

    #[test]
    fn test_selective_import() {
        assert_eq!(
            run_ok("import \"math\": square, pi as p; print square(3); print p;"),
            "9\n3\n"
        );
    }

    #[test]
    fn test_nested_path_binds_last_segment() {
        assert_eq!(
            run_ok("import \"lib/strings\"; print strings.greeting;"),
            "hi\n"
        );
    }

    #[test]
    fn test_classes_from_module_keep_their_closures() {
        let source: &str = r#"
            import "math": Vec;
            var v = Vec(3);
            print v.x;
            print v.twice();
            print native.is(v, Vec);
        "#;

        assert_eq!(run_ok(source), "3\n6\ntrue\n");
    }

    #[test]
    fn test_origin_is_shared_with_modules() {
        assert_eq!(
            run_ok("import \"shapes\"; print shapes.isRoot; print native.is(shapes.Shape(), Origin);"),
            "true\ntrue\n"
        );
    }

    #[test]
    fn test_module_output_goes_to_importer_sink() {
        assert_eq!(
            run_ok("print \"before\"; import \"noisy\"; print \"after\";"),
            "before\nloading\nafter\n"
        );

        // Each import runs the module body again.
        assert_eq!(
            run_ok("import \"noisy\"; import \"noisy\" as again;"),
            "loading\nloading\n"
        );
    }

    #[test]
    fn test_reimport_reuses_resolved_body() {
        let mut session: Session = Session::with_modules(library());

        session.run("import \"math\";").unwrap();
        let resolved: usize = session.interpreter.resolved_count();
        assert!(resolved > 0);

        for _ in 0..3 {
            session.run("import \"math\";").unwrap();
        }
        assert_eq!(session.interpreter.resolved_count(), resolved);

        session.run("print math.square(5);").unwrap();
        assert_eq!(session.output(), "25\n");
    }

    #[test]
    fn test_module_does_not_see_importer_globals() {
        let modules: MemoryModuleSource =
            MemoryModuleSource::new().with("peek", "fun peek() { return secret; }");
        let mut session: Session = Session::with_modules(modules);

        let result = session.run("var secret = 1; import \"peek\"; print peek.peek();");

        assert!(matches!(
            result,
            Err(LoxError::Runtime(RuntimeError::UnboundVariable { ref name, .. })) if name == "secret"
        ));
    }

    #[test]
    fn test_missing_export() {
        assert_eq!(
            run_err("import \"math\": nope;"),
            RuntimeError::MissingExport {
                module: "math".into(),
                name: "nope".into(),
                line: 1
            }
        );
        assert!(matches!(
            run_err("import \"math\"; print math.nope;"),
            RuntimeError::MissingExport { .. }
        ));
    }

    #[test]
    fn test_module_not_found() {
        assert!(matches!(
            run_err("\nimport \"ghost\";"),
            RuntimeError::ModuleNotFound { ref path, line: 2, .. } if path == "ghost"
        ));
    }

    #[test]
    fn test_cyclic_import_is_detected() {
        let modules: MemoryModuleSource = MemoryModuleSource::new()
            .with("a", "import \"b\";")
            .with("b", "import \"a\";");
        let mut session: Session = Session::with_modules(modules);

        let result = session.run("import \"a\";");

        assert!(matches!(
            result,
            Err(LoxError::Runtime(RuntimeError::CyclicImport { ref path, .. })) if path == "a"
        ));

        // Loading state is unwound after the failure.
        let modules: MemoryModuleSource = MemoryModuleSource::new().with("a", "var ok = true;");
        let mut session: Session = Session::with_modules(modules);
        session.run("import \"a\"; print a.ok;").unwrap();
        assert_eq!(session.output(), "true\n");
    }

    #[test]
    fn test_broken_module_fails_import() {
        let modules: MemoryModuleSource = MemoryModuleSource::new()
            .with("broken", "var = ;")
            .with("unresolvable", "return 1;");
        let mut session: Session = Session::with_modules(modules);

        assert!(matches!(
            session.run("import \"broken\";"),
            Err(LoxError::Runtime(RuntimeError::ModuleFailed { ref path, .. })) if path == "broken"
        ));
        assert!(matches!(
            session.run("import \"unresolvable\";"),
            Err(LoxError::Runtime(RuntimeError::ModuleFailed { .. }))
        ));

        // Both failures surface once, as the importer's runtime error.
        let diagnostics = session.diagnostics();
        assert!(diagnostics.syntax.is_empty());
        assert!(diagnostics.resolve.is_empty());
        assert_eq!(diagnostics.runtime.len(), 2);
    }

    #[test]
    fn test_module_runtime_error_propagates() {
        let modules: MemoryModuleSource =
            MemoryModuleSource::new().with("boom", "print 1;\nnative.panic(\"no\");");
        let mut session: Session = Session::with_modules(modules);

        let result = session.run("import \"boom\";\nprint \"unreached\";");

        assert!(matches!(
            result,
            Err(LoxError::Runtime(RuntimeError::Panic { line: 2, .. }))
        ));
        assert_eq!(session.output(), "1\n");
    }

    #[test]
    fn test_module_is_read_only() {
        assert_eq!(
            run_err("import \"math\"; math.pi = 4;"),
            RuntimeError::ReadOnlyModule {
                module: "math".into(),
                line: 1
            }
        );
    }

    #[test]
    fn test_dotted_path_is_rejected_before_running() {
        let (session, result) = run("print 1; import \"math.lox\";");

        assert!(matches!(result, Err(LoxError::Resolve { .. })));
        assert_eq!(session.output(), "");
    }

    #[test]
    fn test_modules_do_not_echo_in_repl() {
        let modules: MemoryModuleSource =
            MemoryModuleSource::new().with("quiet", "1 + 2;\nprint \"side\";");
        let mut session: Session = Session::build(true, modules);

        session.run("import \"quiet\"").unwrap();
        session.run("1 + 1").unwrap();

        assert_eq!(session.output(), "side\n2\n");
    }
}
