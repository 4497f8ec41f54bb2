#[cfg(test)]
mod interpreter_tests {
    use rox as lox;

    use lox::interpreter::Interpreter;

    /// Run `source` to completion, returning what it printed and the
    /// rendered diagnostics, if any.
    fn interpret(source: &str) -> (String, Result<(), Vec<String>>) {
        interpret_with_depth(source, lox::interpreter::DEFAULT_MAX_CALL_DEPTH)
    }

    fn interpret_with_depth(source: &str, depth: usize) -> (String, Result<(), Vec<String>>) {
        let mut interpreter = Interpreter::with_output(Vec::new()).with_max_call_depth(depth);

        let result = lox::run(&mut interpreter, source)
            .map_err(|errors| errors.iter().map(|e| e.to_string()).collect());
        let output = String::from_utf8(interpreter.into_output()).expect("output is UTF-8");

        (output, result)
    }

    /// Output of a program expected to succeed.
    fn output_of(source: &str) -> String {
        let (output, result) = interpret(source);

        if let Err(errors) = result {
            panic!("program failed: {:?}\noutput so far:\n{}", errors, output);
        }

        output
    }

    /// The single error of a program expected to fail.
    fn error_of(source: &str) -> String {
        let (_, result) = interpret(source);

        match result {
            Ok(()) => panic!("program should have failed"),
            Err(errors) => errors.join("\n"),
        }
    }

    #[test]
    fn test_arithmetic_follows_host_doubles() {
        assert_eq!(
            output_of(
                "print 1 + 2 * 3; print 10 / 4; print (1 + 2) * 3; print 0.1 + 0.2; print -3 - -1;"
            ),
            "7\n2.5\n9\n0.30000000000000004\n-2\n"
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(output_of(r#"print "a" + "b";"#), "ab\n");
    }

    #[test]
    fn test_mixed_plus_is_a_type_error() {
        assert_eq!(
            error_of(r#"print "a" + 1;"#),
            "Operands must be two numbers or two strings.\n[line 1]"
        );
    }

    #[test]
    fn test_operand_type_errors_name_their_role() {
        assert_eq!(error_of("print -\"a\";"), "Operand must be a number.\n[line 1]");
        assert_eq!(error_of("print 1 < \"2\";"), "Operands must be numbers.\n[line 1]");
        assert_eq!(error_of("\n\nprint nil * 2;"), "Operands must be numbers.\n[line 3]");
    }

    #[test]
    fn test_division_by_zero_is_not_an_error() {
        assert_eq!(
            output_of("print 1 / 0 > 1000000; var nan = 0 / 0; print nan == nan;"),
            "true\nfalse\n"
        );
    }

    #[test]
    fn test_equality_across_kinds() {
        let source = r#"
            print nil == nil;
            print 1 == 1;
            print "a" == "a";
            print 1 == "1";
            print nil == false;
            print true != false;
            fun f() {}
            var g = f;
            print f == g;
            class A {}
            print A() == A();
            print A == A;
        "#;

        assert_eq!(
            output_of(source),
            "true\ntrue\ntrue\nfalse\nfalse\ntrue\ntrue\nfalse\ntrue\n"
        );
    }

    #[test]
    fn test_truthiness() {
        let source = r#"
            if (0) print "zero is truthy";
            if ("") print "empty is truthy";
            if (nil) print "unreachable"; else print "nil is falsy";
            print !false;
            print !nil;
            print !0;
        "#;

        assert_eq!(
            output_of(source),
            "zero is truthy\nempty is truthy\nnil is falsy\ntrue\ntrue\nfalse\n"
        );
    }

    #[test]
    fn test_logical_operators_short_circuit_and_return_operands() {
        let source = r#"
            print nil or "yes";
            print false and undefinedFunction();
            print 0 or 1;
            print "" and "x";
            var calls = 0;
            fun touch() { calls = calls + 1; return true; }
            print true or touch();
            print false and touch();
            print calls;
        "#;

        assert_eq!(output_of(source), "yes\nfalse\n0\nx\ntrue\nfalse\n0\n");
    }

    #[test]
    fn test_scope_shadowing() {
        assert_eq!(
            output_of("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_closures_resolve_lexically() {
        let source = r#"
            var a = "global";
            {
                fun showA() { print a; }
                showA();
                var a = "block";
                showA();
            }
        "#;

        assert_eq!(output_of(source), "global\nglobal\n");
    }

    #[test]
    fn test_nearest_enclosing_declaration_wins() {
        let source = r#"
            var a = "global";
            {
                var a = "outer";
                {
                    fun show() { print a; }
                    show();
                    a = "changed";
                    show();
                    var a = "inner";
                    show();
                    print a;
                }
            }
            print a;
        "#;

        assert_eq!(output_of(source), "outer\nchanged\nchanged\ninner\nglobal\n");
    }

    #[test]
    fn test_counters_capture_environments_independently() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    return i;
                }
                return count;
            }

            var c1 = makeCounter();
            var c2 = makeCounter();
            print c1();
            print c1();
            print c2();
            print c1();
        "#;

        assert_eq!(output_of(source), "1\n2\n1\n3\n");
    }

    #[test]
    fn test_closures_share_the_captured_frame() {
        let source = r#"
            fun pair() {
                var n = 0;
                fun inc() { n = n + 1; }
                fun get() { return n; }
                inc();
                inc();
                return get;
            }
            print pair()();

            fun outer() {
                var x = 1;
                fun set() { x = 2; }
                set();
                print x;
            }
            outer();
        "#;

        assert_eq!(output_of(source), "2\n2\n");
    }

    #[test]
    fn test_recursion_and_mutual_recursion() {
        let source = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(15);

            fun isEven(n) { if (n == 0) return true; return isOdd(n - 1); }
            fun isOdd(n) { if (n == 0) return false; return isEven(n - 1); }
            print isEven(10);
            print isOdd(7);
        "#;

        assert_eq!(output_of(source), "610\ntrue\ntrue\n");
    }

    #[test]
    fn test_for_matches_equivalent_while() {
        let with_for = output_of("for (var i = 0; i < 3; i = i + 1) print i;");
        let with_while = output_of("{ var i = 0; while (i < 3) { print i; i = i + 1; } }");

        assert_eq!(with_for, "0\n1\n2\n");
        assert_eq!(with_for, with_while);
    }

    #[test]
    fn test_for_with_omitted_clauses() {
        let source = r#"
            var i = 0;
            for (; i < 2;) { print i; i = i + 1; }
            for (i = 10; i < 12; i = i + 1) print i;
            fun firstOver(limit) {
                var n = 0;
                for (;;) {
                    if (n > limit) return n;
                    n = n + 3;
                }
            }
            print firstOver(7);
        "#;

        assert_eq!(output_of(source), "0\n1\n10\n11\n9\n");
    }

    #[test]
    fn test_return_unwinds_only_to_its_own_call() {
        let source = r#"
            fun find() {
                var i = 0;
                while (true) {
                    {
                        if (i == 3) return i;
                    }
                    i = i + 1;
                }
            }
            print find();
            print "after";
            fun nothing() { return; }
            print nothing();
            fun implicit() {}
            print implicit();
        "#;

        assert_eq!(output_of(source), "3\nafter\nnil\nnil\n");
    }

    #[test]
    fn test_initializer_always_returns_the_instance() {
        let source = r#"
            class Box {
                init(v) {
                    this.v = v;
                    if (v > 1) return;
                    this.v = v * 10;
                }
                get() { return this.v; }
                set(n) { this.v = n; }
            }

            var a = Box(1);
            print a.get();
            var b = Box(2);
            print b.get();
            b.set(7);
            print b.get();
            print b.init(3) == b;
            print b.v;
            print b;
        "#;

        assert_eq!(output_of(source), "10\n2\n7\ntrue\n3\n<Box instance>\n");
    }

    #[test]
    fn test_bound_methods_are_first_class() {
        let source = r#"
            class Person {
                init(name) { this.name = name; }
                greet() { print "hi " + this.name; }
            }

            var p = Person("ann");
            var g = p.greet;
            p.name = "bob";
            g();

            var q = Person("cy");
            q.greet = p.greet;
            q.greet();
        "#;

        assert_eq!(output_of(source), "hi bob\nhi bob\n");
    }

    #[test]
    fn test_fields_shadow_methods_and_set_creates_fields() {
        let source = r#"
            class A { m() { return "method"; } }
            var a = A();
            print a.m();
            a.m = "field";
            print a.m;
            a.extra = 1;
            a.extra = a.extra + 1;
            print a.extra;
        "#;

        assert_eq!(output_of(source), "method\nfield\n2\n");
    }

    #[test]
    fn test_class_can_refer_to_itself() {
        let source = r#"
            class Node {
                make() { return Node(); }
            }
            print Node().make();
            print Node;
        "#;

        assert_eq!(output_of(source), "<Node instance>\nNode\n");
    }

    #[test]
    fn test_value_text_forms() {
        let source = r#"
            fun f() {}
            print f;
            print clock;
            print 3.0;
            print 2.5;
            print nil;
            print true;
            print "text";
        "#;

        assert_eq!(
            output_of(source),
            "<fn f>\n<native fn>\n3\n2.5\nnil\ntrue\ntext\n"
        );
    }

    #[test]
    fn test_clock_is_a_zero_arity_native() {
        assert_eq!(output_of("print clock() > 0;"), "true\n");
        assert_eq!(
            error_of("clock(1);"),
            "Expected 0 arguments but got 1.\n[line 1]"
        );
    }

    #[test]
    fn test_arity_mismatch() {
        assert_eq!(
            error_of("fun f(a, b) {}\nf(1);"),
            "Expected 2 arguments but got 1.\n[line 2]"
        );
        assert_eq!(
            error_of("class A { init(x) {} }\nA();"),
            "Expected 1 arguments but got 0.\n[line 2]"
        );
        assert_eq!(
            error_of("class B {}\nB(1);"),
            "Expected 0 arguments but got 1.\n[line 2]"
        );
    }

    #[test]
    fn test_calling_non_callable_evaluates_arguments_first() {
        let source = r#"
            fun side() { print "evaluated"; return 1; }
            "not a function"(side());
        "#;
        let (output, result) = interpret(source);

        assert_eq!(output, "evaluated\n");
        assert_eq!(
            result,
            Err(vec!["Can only call functions and classes.\n[line 3]".to_string()])
        );
    }

    #[test]
    fn test_undefined_variables() {
        assert_eq!(error_of("print x;"), "Undefined variable 'x'.\n[line 1]");
        assert_eq!(error_of("x = 1;"), "Undefined variable 'x'.\n[line 1]");
    }

    #[test]
    fn test_property_errors() {
        assert_eq!(
            error_of("var a = 1; print a.b;"),
            "Only instances have properties.\n[line 1]"
        );
        assert_eq!(
            error_of("var a = \"s\"; a.b = 1;"),
            "Only instances have fields.\n[line 1]"
        );
        assert_eq!(
            error_of("class A {} print A().missing;"),
            "Undefined property 'missing'.\n[line 1]"
        );
    }

    #[test]
    fn test_runtime_error_halts_the_program() {
        let (output, result) = interpret("print 1;\nprint -\"a\";\nprint 2;");

        assert_eq!(output, "1\n");
        assert_eq!(
            result,
            Err(vec!["Operand must be a number.\n[line 2]".to_string()])
        );
    }

    #[test]
    fn test_runaway_recursion_is_reported() {
        let (_, result) = interpret_with_depth("fun f() { f(); }\nf();", 32);

        assert_eq!(result, Err(vec!["Stack overflow.\n[line 1]".to_string()]));
    }

    #[test]
    fn test_runaway_recursion_with_default_limits() {
        let (_, result) = interpret("fun f() { f(); }\nf();");

        assert_eq!(result, Err(vec!["Stack overflow.\n[line 1]".to_string()]));
    }

    #[test]
    fn test_nested_blocks_between_calls_still_hit_the_limit() {
        let source = r#"
fun f(n) {
  if (n > 0) { { { while (true) { return f(n + 1) + 1; } } } }
  return 0;
}
print f(1);"#;

        let (output, result) = interpret(source);

        assert_eq!(output, "");
        assert_eq!(result, Err(vec!["Stack overflow.\n[line 3]".to_string()]));
    }

    #[test]
    fn test_calls_work_again_after_a_stack_overflow() {
        let mut interpreter = Interpreter::with_output(Vec::new());

        assert!(lox::run(&mut interpreter, "fun f() { f(); }\nf();").is_err());
        lox::run(
            &mut interpreter,
            "fun g(n) { if (n == 0) return 0; return g(n - 1) + 1; }\nprint g(20);",
        )
        .expect("recursion after the overflow");

        let output = String::from_utf8(interpreter.into_output()).expect("output is UTF-8");
        assert_eq!(output, "20\n");
    }

    #[test]
    fn test_deep_recursion_on_a_large_stack() {
        let source = "fun count(n) { if (n == 0) return 0; return count(n - 1) + 1; }\n\
                      print count(1000);";

        let output = std::thread::Builder::new()
            .stack_size(64 << 20)
            .spawn(move || {
                let mut interpreter = Interpreter::with_output(Vec::new())
                    .with_max_call_depth(2000)
                    .with_max_stack_bytes(48 << 20);

                lox::run(&mut interpreter, source).expect("count(1000) should run");

                String::from_utf8(interpreter.into_output()).expect("output is UTF-8")
            })
            .expect("spawn interpreter thread")
            .join()
            .expect("interpreter thread panicked");

        assert_eq!(output, "1000\n");
    }

    #[test]
    fn test_environment_is_restored_after_errors() {
        let mut interpreter = Interpreter::with_output(Vec::new());

        let failing = "var a = \"global\"; { var a = \"local\"; a(); }";

        assert!(lox::run(&mut interpreter, failing).is_err());
        assert!(lox::run(&mut interpreter, "print a;").is_ok());

        let output = String::from_utf8(interpreter.into_output()).expect("output is UTF-8");
        assert_eq!(output, "global\n");
    }

    #[test]
    fn test_static_errors_prevent_running() {
        let (output, result) = interpret("print \"side effect\";\nreturn 1;");

        assert_eq!(output, "");
        assert_eq!(
            result,
            Err(vec![
                "[line 2] Error at 'return': Can't return from top-level code.".to_string()
            ])
        );

        let (output, result) = interpret("print \"side effect\";\nprint 1 +;\nprint (;");

        assert_eq!(output, "");
        assert_eq!(result.map_err(|errors| errors.len()), Err(2));
    }

    #[test]
    fn test_lexical_errors_are_reported_with_syntax_errors() {
        let (output, result) = interpret("print 1;\n@\nprint 2");

        assert_eq!(output, "");
        assert_eq!(
            result,
            Err(vec![
                "[line 2] Error: Unexpected character: @".to_string(),
                "[line 3] Error at end: Expect ';' after value.".to_string(),
            ])
        );
    }

    #[test]
    fn test_globals_persist_across_runs() {
        let mut interpreter = Interpreter::with_output(Vec::new());

        lox::run(&mut interpreter, "var a = 1; fun f() { return a; }").expect("first run");
        lox::run(&mut interpreter, "a = 2; print f();").expect("second run");

        let output = String::from_utf8(interpreter.into_output()).expect("output is UTF-8");
        assert_eq!(output, "2\n");
    }
}
