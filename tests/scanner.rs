#[cfg(test)]
mod scanner_tests {
    use rox as lox;

    use lox::error::LoxError;
    use lox::scanner::Scanner;
    use lox::token::TokenType;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let (tokens, errors) = Scanner::new(source).scan_tokens();

        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_two_char_operators_win_longest_match() {
        assert_token_sequence(
            "! != = == < <= > >= /",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_token_sequence(
            "and class else false for fun if nil or print return super this true var while \
             orchid _x1",
            &[
                (TokenType::AND, "and"),
                (TokenType::CLASS, "class"),
                (TokenType::ELSE, "else"),
                (TokenType::FALSE, "false"),
                (TokenType::FOR, "for"),
                (TokenType::FUN, "fun"),
                (TokenType::IF, "if"),
                (TokenType::NIL, "nil"),
                (TokenType::OR, "or"),
                (TokenType::PRINT, "print"),
                (TokenType::RETURN, "return"),
                (TokenType::SUPER, "super"),
                (TokenType::THIS, "this"),
                (TokenType::TRUE, "true"),
                (TokenType::VAR, "var"),
                (TokenType::WHILE, "while"),
                (TokenType::IDENTIFIER, "orchid"),
                (TokenType::IDENTIFIER, "_x1"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_number_literals() {
        let (tokens, errors) = Scanner::new("123 45.67 8. .5").scan_tokens();

        assert!(errors.is_empty());

        let kinds: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            kinds,
            vec![
                "NUMBER 123 123.0",
                "NUMBER 45.67 45.67",
                "NUMBER 8 8.0",
                "DOT . null",
                "DOT . null",
                "NUMBER 5 5.0",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_string_literal_spans_lines_without_escapes() {
        let (tokens, errors) = Scanner::new("\"a\\n\nb\" x").scan_tokens();

        assert!(errors.is_empty());
        assert_eq!(tokens[0].token_type, TokenType::STRING(String::new()));
        assert_eq!(tokens[0].literal(), "a\\n\nb");
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_comments_and_line_counting() {
        let source = "// leading comment\nvar a; // trailing\n\n   print a;";
        let (tokens, errors) = Scanner::new(source).scan_tokens();

        assert!(errors.is_empty());

        let lines: Vec<(&str, usize)> = tokens.iter().map(|t| (t.lexeme, t.line)).collect();
        assert_eq!(
            lines,
            vec![
                ("var", 2),
                ("a", 2),
                (";", 2),
                ("print", 4),
                ("a", 4),
                (";", 4),
                ("", 4),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_reports_and_still_ends_with_eof() {
        let (tokens, errors) = Scanner::new("print \"oops\nmore").scan_tokens();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "[line 2] Error: Unterminated string.");
        assert_eq!(tokens.last().map(|t| t.token_type.clone()), Some(TokenType::EOF));
    }

    #[test]
    fn test_unexpected_chars_are_skipped_and_reported() {
        let (tokens, errors) = Scanner::new(",.$(#").scan_tokens();

        let kinds: Vec<TokenType> = tokens.iter().map(|t| t.token_type.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                TokenType::COMMA,
                TokenType::DOT,
                TokenType::LEFT_PAREN,
                TokenType::EOF,
            ]
        );

        let messages: Vec<String> = errors.iter().map(LoxError::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "[line 1] Error: Unexpected character: $",
                "[line 1] Error: Unexpected character: #",
            ]
        );
    }

    #[test]
    fn test_errors_carry_their_own_line() {
        let (tokens, errors) = Scanner::new("a\n@\nb\n\"open").scan_tokens();

        let messages: Vec<String> = errors.iter().map(LoxError::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "[line 2] Error: Unexpected character: @",
                "[line 4] Error: Unterminated string.",
            ]
        );

        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme).collect();
        assert_eq!(lexemes, vec!["a", "b", ""]);
    }

    #[test]
    fn test_comment_at_end_of_input() {
        assert_token_sequence(
            "1 // no newline after this",
            &[(TokenType::NUMBER(0.0), "1"), (TokenType::EOF, "")],
        );
    }

    #[test]
    fn test_non_ascii_character_is_one_error() {
        let (tokens, errors) = Scanner::new("a é b").scan_tokens();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "[line 1] Error: Unexpected character: é");

        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme).collect();
        assert_eq!(lexemes, vec!["a", "b", ""]);
    }

    #[test]
    fn test_empty_source_is_just_eof() {
        let (tokens, errors) = Scanner::new("").scan_tokens();

        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].to_string(), "EOF  null");
    }
}
