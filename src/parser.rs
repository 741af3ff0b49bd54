use std::rc::Rc;

use crate::{
    ast::{Binding, Case, Expr, ExprKind, FunctionLiteral, Literal, Statement, Typename},
    error::ModlError,
    scanner::{scan, Token, TokenKind},
};


type ParseResult<O> = Result<O, ModlError>;

// Every production takes the remaining tokens and hands back what it did not consume
type Parsed<'a, O> = ParseResult<(&'a [Token], O)>;

fn error_at(tokens: &[Token], message: &str) -> ModlError {
    let (line, lexeme) = match tokens.first() {
        Some(token) if token.kind == TokenKind::Eof => (token.line, "<eof>".to_owned()),
        Some(token) => (token.line, token.lexeme.clone()),
        None => (0, "<eof>".to_owned()),
    };
    ModlError::Parse { line, lexeme, message: message.to_owned() }
}

fn check(tokens: &[Token], kind: TokenKind) -> bool {
    tokens.first().is_some_and(|token| token.kind == kind)
}

fn match_token(tokens: &[Token], kind: TokenKind) -> Option<(&[Token], &Token)> {
    match tokens.split_first() {
        Some((token, rest)) if token.kind == kind => Some((rest, token)),
        _ => None,
    }
}

fn parse_token<'a>(tokens: &'a [Token], kind: TokenKind, message: &str) -> Parsed<'a, &'a Token> {
    match_token(tokens, kind).ok_or_else(|| error_at(tokens, message))
}

fn literal_string(token: &Token) -> String {
    match &token.literal {
        Some(Literal::String(value)) => value.clone(),
        _ => token.lexeme.clone(),
    }
}

fn parse_statement(tokens: &[Token]) -> Parsed<Statement> {
    let (tokens, statement) = if let Some((tokens, _)) = match_token(tokens, TokenKind::Use) {
        let (tokens, module) = parse_token(tokens, TokenKind::String, "need a module name to import")?;
        (tokens, Statement::Use(literal_string(module)))
    } else if let Some((tokens, _)) = match_token(tokens, TokenKind::Let) {
        parse_let(tokens)?
    } else {
        let (tokens, expr) = parse_symchain(tokens)?;
        (tokens, Statement::Expr(expr))
    };

    let (tokens, _) = parse_token(tokens, TokenKind::Semicolon, "expect ';' at end of statement")?;
    Ok((tokens, statement))
}

fn parse_binding(tokens: &[Token]) -> Parsed<Binding> {
    // Only the bare name matters, operators can be bound like any identifier
    let (tokens, name) = match tokens.split_first() {
        Some((token, rest)) if matches!(token.kind, TokenKind::Identifier | TokenKind::Symbolic)
            => (rest, token.lexeme.clone()),
        _ => return Err(error_at(tokens, "can't assign to this")),
    };

    let (tokens, _) = parse_token(tokens, TokenKind::LeftArrow, "missing '<-'")?;
    let (tokens, value) = parse_symchain(tokens)?;
    Ok((tokens, Binding { name, value }))
}

fn parse_let(tokens: &[Token]) -> Parsed<Statement> {
    let (mut tokens, first) = parse_binding(tokens)?;
    let mut bindings = vec![first];

    while let Some((rest, _)) = match_token(tokens, TokenKind::Comma) {
        let (rest, binding) = parse_binding(rest)?;
        bindings.push(binding);
        tokens = rest;
    }

    Ok((tokens, Statement::Let(bindings)))
}

fn parse_symchain(tokens: &[Token]) -> Parsed<Expr> {
    // Recursing on the right makes every operator right associative,
    // with no precedence between them
    let (tokens, left) = parse_application(tokens)?;

    match match_token(tokens, TokenKind::Symbolic) {
        Some((rest, operator)) => {
            let (tokens, right) = parse_symchain(rest)?;
            Ok((tokens, Expr::new(ExprKind::Symchain {
                left: Box::new(left),
                operator: operator.lexeme.clone(),
                right: Box::new(right),
            })))
        }
        None => Ok((tokens, left)),
    }
}

fn parse_application(tokens: &[Token]) -> Parsed<Expr> {
    let mut elements = vec![];
    let mut tokens = tokens;

    while let (rest, Some(element)) = parse_typed_primary(tokens)? {
        elements.push(element);
        tokens = rest;
    }

    // Bang calls always receive the `!` sentinel as their first argument
    if matches!(elements.first(), Some(Expr { kind: ExprKind::Identifier(name), .. }) if name.ends_with('!')) {
        elements.insert(1, Expr::identifier("!"));
    }

    let expr = match elements.len() {
        0 => return Err(error_at(tokens, "expect expression")),
        1 => elements.swap_remove(0),
        _ => Expr::new(ExprKind::Application(elements)),
    };
    Ok((tokens, expr))
}

fn parse_typed_primary(tokens: &[Token]) -> Parsed<Option<Expr>> {
    let (tokens, primary) = parse_primary(tokens)?;
    let Some(mut primary) = primary else { return Ok((tokens, None)) };
    let Some((tokens, _)) = match_token(tokens, TokenKind::Colon) else { return Ok((tokens, Some(primary))) };

    let (mut tokens, first) = parse_token(tokens, TokenKind::Typename, "expected a type after ':'")?;
    let mut signature = vec![Typename(first.lexeme.clone())];

    while let Some((rest, _)) = match_token(tokens, TokenKind::RightArrow) {
        let (rest, typename) = parse_token(rest, TokenKind::Typename, "expected a type after '->'")?;
        signature.push(Typename(typename.lexeme.clone()));
        tokens = rest;
    }

    primary.signature = signature;
    Ok((tokens, Some(primary)))
}

fn parse_primary(tokens: &[Token]) -> Parsed<Option<Expr>> {
    let Some((token, rest)) = tokens.split_first() else { return Ok((tokens, None)) };

    let kind = match token.kind {
        TokenKind::OpenBrace => return parse_function(rest).map(|(tokens, expr)| (tokens, Some(expr))),
        TokenKind::OpenParen => return parse_group(rest).map(|(tokens, expr)| (tokens, Some(expr))),
        TokenKind::Cond => return parse_conditional(rest).map(|(tokens, expr)| (tokens, Some(expr))),
        TokenKind::String | TokenKind::Integer | TokenKind::Float => {
            let literal = token.literal.clone().ok_or_else(|| error_at(tokens, "literal without a value"))?;
            ExprKind::Literal(literal)
        }
        TokenKind::Identifier => ExprKind::Identifier(token.lexeme.clone()),
        TokenKind::Builtin => ExprKind::Builtin(literal_string(token)),
        TokenKind::Bang => return Err(error_at(tokens, "'!' can only end an identifier")),
        _ => return Ok((tokens, None)),
    };

    Ok((rest, Some(Expr::new(kind))))
}

fn parse_group(tokens: &[Token]) -> Parsed<Expr> {
    // `(+)` refers to the operator itself
    if let Some((rest, symbol)) = match_token(tokens, TokenKind::Symbolic) {
        let (rest, _) = parse_token(rest, TokenKind::CloseParen, "symbol expressions can only contain a symbol")?;
        return Ok((rest, Expr::identifier(symbol.lexeme.clone())));
    }

    let (tokens, expr) = parse_symchain(tokens)?;
    let (tokens, _) = parse_token(tokens, TokenKind::CloseParen, "missing closing parenthesis")?;
    Ok((tokens, expr))
}

// Statements up to, not including, the first terminator
fn parse_body<'a>(tokens: &'a [Token], terminators: &[TokenKind], empty_message: &str) -> Parsed<'a, Vec<Statement>> {
    let mut body = vec![];
    let mut tokens = tokens;

    while let Some(token) = tokens.first() {
        if token.kind == TokenKind::Eof || terminators.contains(&token.kind) { break; }

        let (rest, statement) = parse_statement(tokens)?;
        body.push(statement);
        tokens = rest;
    }

    if body.is_empty() { return Err(error_at(tokens, empty_message)); }
    Ok((tokens, body))
}

fn parse_function(tokens: &[Token]) -> Parsed<Expr> {
    let mut parameters = vec![];
    let mut tokens = tokens;

    while let Some((token, rest)) = tokens.split_first() {
        if !matches!(token.kind, TokenKind::Bang | TokenKind::Identifier) { break; }
        parameters.push(token.lexeme.clone());
        tokens = rest;
    }

    if parameters.is_empty() { return Err(error_at(tokens, "argument list cannot be empty")); }

    let (tokens, _) = parse_token(tokens, TokenKind::Pipe, "missing argument delimiter '|'")?;
    let (tokens, body) = parse_body(tokens, &[TokenKind::CloseBrace], "function body cannot be empty")?;
    let (tokens, _) = parse_token(tokens, TokenKind::CloseBrace, "unclosed function definition")?;

    Ok((tokens, Expr::new(ExprKind::Function(Rc::new(FunctionLiteral { parameters, body })))))
}

fn parse_conditional(tokens: &[Token]) -> Parsed<Expr> {
    if check(tokens, TokenKind::End) { return Err(error_at(tokens, "cond needs at least one case")); }

    let mut cases = vec![];
    let mut tokens = tokens;

    loop {
        let (rest, _) = parse_token(tokens, TokenKind::Pipe, "missing condition delimiter '|'")?;
        let (rest, condition) = parse_symchain(rest)?;
        let (rest, _) = parse_token(rest, TokenKind::RightArrow, "missing '->' after condition")?;
        let (rest, body) = parse_body(rest, &[TokenKind::Pipe, TokenKind::End], "case body cannot be empty")?;
        cases.push(Case { condition, body });

        if let Some((rest, _)) = match_token(rest, TokenKind::End) {
            tokens = rest;
            break;
        }
        tokens = rest;
    }

    Ok((tokens, Expr::new(ExprKind::Conditional(cases))))
}

/// Parses a whole token stream, as produced by [`scan`], into statements.
pub fn parse(tokens: &[Token]) -> ParseResult<Vec<Statement>> {
    let mut statements = vec![];
    let mut tokens = tokens;

    while !tokens.is_empty() && !check(tokens, TokenKind::Eof) {
        let (rest, statement) = parse_statement(tokens)?;
        statements.push(statement);
        tokens = rest;
    }

    tracing::debug!(count = statements.len(), "parsed statements");
    Ok(statements)
}

pub fn parse_source(source: &str) -> ParseResult<Vec<Statement>> {
    parse(&scan(source)?)
}

#[cfg(test)]
mod tests {
    use anyhow::bail;
    use num_bigint::BigInt;

    use crate::test_utils::{all_testcases, load_test_pair};

    use super::*;

    fn parse_one(source: &str) -> Statement {
        let mut statements = parse_source(source).unwrap();
        assert_eq!(statements.len(), 1, "{}", source);
        statements.remove(0)
    }

    fn parse_expr(source: &str) -> Expr {
        match parse_one(source) {
            Statement::Expr(expr) => expr,
            other => panic!("expected an expression, got {:?}", other),
        }
    }

    fn parse_error(source: &str) -> String {
        match parse_source(source) {
            Err(ModlError::Parse { message, .. }) => message,
            other => panic!("{:?} should not parse, got {:?}", source, other),
        }
    }

    fn integer(value: i64) -> Expr {
        Expr::new(ExprKind::Literal(Literal::Integer(BigInt::from(value))))
    }

    #[test]
    fn literal() {
        assert_eq!(parse_expr("5;"), integer(5));
        assert_eq!(parse_expr("\"hi\";").kind, ExprKind::Literal(Literal::String("hi".to_owned())));
    }

    #[test]
    fn use_statement() {
        assert_eq!(parse_one("use \"std\";"), Statement::Use("std".to_owned()));
        assert_eq!(parse_error("use std;"), "need a module name to import");
    }

    #[test]
    fn let_bindings_keep_order() {
        let Statement::Let(bindings) = parse_one("let a <- 1, f <- { x | x; };") else { panic!("not a let") };
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].name, "a");
        assert_eq!(bindings[1].name, "f");
        assert!(matches!(bindings[1].value.kind, ExprKind::Function(_)));
    }

    #[test]
    fn let_can_bind_operators() {
        let Statement::Let(bindings) = parse_one("let + <- {#add};") else { panic!("not a let") };
        assert_eq!(bindings[0].name, "+");
        assert_eq!(bindings[0].value.kind, ExprKind::Builtin("add".to_owned()));
    }

    #[test]
    fn let_errors() {
        assert_eq!(parse_error("let 5 <- 1;"), "can't assign to this");
        assert_eq!(parse_error("let a 1;"), "missing '<-'");
    }

    #[test]
    fn missing_semicolon() {
        assert_eq!(parse_error("a b"), "expect ';' at end of statement");
    }

    #[test]
    fn symchains_are_right_associative() {
        let expr = parse_expr("a - b - c;");
        let ExprKind::Symchain { left, operator, right } = expr.kind else { panic!("not a symchain") };
        assert_eq!(*left, Expr::identifier("a"));
        assert_eq!(operator, "-");
        assert!(matches!(right.kind, ExprKind::Symchain { .. }));
        assert_eq!(right.to_string(), "(b - c)");
    }

    #[test]
    fn application_by_juxtaposition() {
        let expr = parse_expr("f x (g y) 3;");
        let ExprKind::Application(elements) = &expr.kind else { panic!("not an application") };
        assert_eq!(elements.len(), 4);
        assert_eq!(expr.to_string(), "(f x (g y) 3)");
    }

    #[test]
    fn bang_calls_get_the_sentinel() {
        assert_eq!(parse_expr("print! x;").to_string(), "(print! ! x)");
        assert_eq!(parse_expr("read!;").to_string(), "(read! !)");
        // Only the head of a chain is rewritten
        assert_eq!(parse_expr("f print!;").to_string(), "(f print!)");
    }

    #[test]
    fn bare_bang_is_rejected() {
        assert_eq!(parse_error("f ! x;"), "'!' can only end an identifier");
    }

    #[test]
    fn symbol_groups() {
        assert_eq!(parse_expr("(+) 1 2;").to_string(), "(+ 1 2)");
        assert_eq!(parse_error("(+ 1);"), "symbol expressions can only contain a symbol");
        assert_eq!(parse_error("(a b;"), "missing closing parenthesis");
    }

    #[test]
    fn type_annotations_are_carried() {
        let expr = parse_expr("f x: Int -> Int;");
        let ExprKind::Application(elements) = expr.kind else { panic!("not an application") };
        assert_eq!(elements[1].signature, vec![Typename("Int".to_owned()), Typename("Int".to_owned())]);
        assert_eq!(parse_error("x: y;"), "expected a type after ':'");
    }

    #[test]
    fn function_literals() {
        let expr = parse_expr("{ ! x y | x; y; };");
        let ExprKind::Function(function) = expr.kind else { panic!("not a function") };
        assert_eq!(function.parameters, ["!", "x", "y"]);
        assert_eq!(function.body.len(), 2);

        assert_eq!(parse_error("{ | x; };"), "argument list cannot be empty");
        assert_eq!(parse_error("{ x | };"), "function body cannot be empty");
        assert_eq!(parse_error("{ x x;"), "missing argument delimiter '|'");
        assert_eq!(parse_error("{ x | x;"), "unclosed function definition");
    }

    #[test]
    fn conditional_with_single_case() {
        let expr = parse_expr("cond | 1 -> 1; end;");
        let ExprKind::Conditional(cases) = expr.kind else { panic!("not a conditional") };
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].condition, integer(1));
        assert_eq!(cases[0].body, vec![Statement::Expr(integer(1))]);
    }

    #[test]
    fn conditional_with_several_cases() {
        let expr = parse_expr("cond | a -> 1; 2; | otherwise -> 3; end;");
        let ExprKind::Conditional(cases) = expr.kind else { panic!("not a conditional") };
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].body.len(), 2);
        assert_eq!(cases[1].condition, Expr::identifier("otherwise"));
    }

    #[test]
    fn conditional_errors() {
        assert_eq!(parse_error("cond end;"), "cond needs at least one case");
        assert_eq!(parse_error("cond | -> 1; end;"), "expect expression");
        assert_eq!(parse_error("cond | a -> end;"), "case body cannot be empty");
        assert_eq!(parse_error("cond | a 1; end;"), "missing '->' after condition");
    }

    #[test]
    fn errors_point_at_the_token() {
        assert_eq!(
            parse_source("a;\nlet 3 <- 1;").unwrap_err(),
            ModlError::Parse { line: 2, lexeme: "3".to_owned(), message: "can't assign to this".to_owned() }
        );
    }

    fn assert_can_parse(testcase: (usize, usize), input: &str, expected: Result<(), String>) -> anyhow::Result<()> {
        let parse_result = parse_source(input);
        match (parse_result, expected) {
            (Ok(result), Err(expected)) if expected == "LexError" || expected == "ParseError"
                => bail!("Testcase {}:{} - Expected {} but got {:?}", testcase.0, testcase.1, expected, result),
            (Err(result), Ok(()))
                => bail!("Testcase {}:{} - Expected success but got {:?}", testcase.0, testcase.1, result),
            (Err(result), Err(expected)) if result.kind_name() != expected
                => bail!("Testcase {}:{} - Expected {} but got {:?}", testcase.0, testcase.1, expected, result),
            _ => Ok(()),
        }
    }

    #[test]
    fn parse_testcases() -> anyhow::Result<()> {
        for testcase in all_testcases() {
            println!("Running testcase {}", testcase);
            let entries = load_test_pair(testcase)?;

            for (lineno, (input, expected)) in entries.into_iter().enumerate() {
                let expected: Result<_, String> = expected.into();
                assert_can_parse((testcase, lineno), &input, expected.map(|_| ()))?;
            }
        }

        Ok(())
    }
}
