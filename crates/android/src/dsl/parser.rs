//! Statement parser for the Gradle Kotlin DSL subset
//!
//! The grammar covers what module build scripts use in practice:
//!
//! ```text
//! statement := path '=' expr
//!            | path '(' args ')' block?
//!            | path block
//! block     := '{' statement* '}'
//! expr      := string | int | 'true' | 'false' | path ( '(' args ')' )?
//! path      := ident ( '.' ident )*
//! ```

use super::lexer::{syntax_error, tokenize, Token, TokenKind};
use droidbuild_core::error::Result;

/// Deepest block or argument nesting accepted
const MAX_DEPTH: usize = 64;

/// Right-hand side values and call arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Str(String),
    Int(i64),
    Bool(bool),
    /// Dotted reference such as `JavaVersion.VERSION_17`
    Path(Vec<String>),
    /// Call such as `platform("g:a:v")` or `signingConfigs.getByName("debug")`
    Call { callee: Vec<String>, args: Vec<Expr> },
}

impl Expr {
    /// Short description used in type errors
    pub fn describe(&self) -> String {
        match self {
            Expr::Str(value) => format!("string \"{}\"", value),
            Expr::Int(value) => format!("integer {}", value),
            Expr::Bool(value) => format!("boolean {}", value),
            Expr::Path(path) => format!("reference `{}`", path.join(".")),
            Expr::Call { callee, .. } => format!("call `{}(...)`", callee.join(".")),
        }
    }
}

/// One statement of a script or block body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Assign {
        target: Vec<String>,
        value: Expr,
        line: usize,
    },
    /// Blocks (`android { }`), calls (`google()`) and calls with a trailing
    /// lambda (`getByName("release") { }`)
    Call {
        callee: Vec<String>,
        args: Vec<Expr>,
        block: Option<Vec<Statement>>,
        line: usize,
    },
}

impl Statement {
    /// Line the statement starts on
    pub fn line(&self) -> usize {
        match self {
            Statement::Assign { line, .. } | Statement::Call { line, .. } => *line,
        }
    }

    /// Dotted name of the assignment target or callee
    pub fn name(&self) -> String {
        match self {
            Statement::Assign { target, .. } => target.join("."),
            Statement::Call { callee, .. } => callee.join("."),
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        let line = self.line();
        match self.next() {
            Some(token) if &token.kind == kind => Ok(()),
            Some(token) => Err(syntax_error(
                line,
                format!("Expected {}, found {}", kind, token.kind),
            )),
            None => Err(syntax_error(
                line,
                format!("Expected {}, found end of input", kind),
            )),
        }
    }

    fn ident(&mut self) -> Result<String> {
        let line = self.line();
        match self.next() {
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) => Ok(name),
            Some(token) => Err(syntax_error(
                line,
                format!("Expected identifier, found {}", token.kind),
            )),
            None => Err(syntax_error(line, "Expected identifier, found end of input")),
        }
    }

    fn path(&mut self) -> Result<Vec<String>> {
        let mut segments = vec![self.ident()?];
        while self.eat(&TokenKind::Dot) {
            segments.push(self.ident()?);
        }
        Ok(segments)
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(syntax_error(
                self.line(),
                format!("Nesting too deep (limit {})", MAX_DEPTH),
            ));
        }
        Ok(())
    }

    /// Body of a `{ ... }` block, after the opening brace
    fn block(&mut self) -> Result<Vec<Statement>> {
        self.enter()?;
        let body = self.statements(true);
        self.depth -= 1;
        body
    }

    fn statements(&mut self, nested: bool) -> Result<Vec<Statement>> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                None if nested => {
                    return Err(syntax_error(self.line(), "Unclosed block, expected `}`"));
                }
                None => return Ok(body),
                Some(TokenKind::RBrace) if nested => {
                    self.pos += 1;
                    return Ok(body);
                }
                Some(TokenKind::RBrace) => {
                    return Err(syntax_error(self.line(), "Unexpected `}`"));
                }
                Some(_) => body.push(self.statement()?),
            }
        }
    }

    fn statement(&mut self) -> Result<Statement> {
        let line = self.line();
        let path = self.path()?;

        match self.peek() {
            Some(TokenKind::Eq) => {
                self.pos += 1;
                let value = self.expr()?;
                Ok(Statement::Assign {
                    target: path,
                    value,
                    line,
                })
            }
            Some(TokenKind::LParen) => {
                let args = self.args()?;
                let block = if self.eat(&TokenKind::LBrace) {
                    Some(self.block()?)
                } else {
                    None
                };
                Ok(Statement::Call {
                    callee: path,
                    args,
                    block,
                    line,
                })
            }
            Some(TokenKind::LBrace) => {
                self.pos += 1;
                let block = self.block()?;
                Ok(Statement::Call {
                    callee: path,
                    args: Vec::new(),
                    block: Some(block),
                    line,
                })
            }
            Some(other) => Err(syntax_error(
                self.line(),
                format!(
                    "Expected `=`, `(` or `{{` after `{}`, found {}",
                    path.join("."),
                    other
                ),
            )),
            None => Err(syntax_error(
                line,
                format!("Incomplete statement `{}`", path.join(".")),
            )),
        }
    }

    fn args(&mut self) -> Result<Vec<Expr>> {
        self.enter()?;
        let args = self.arg_list();
        self.depth -= 1;
        args
    }

    fn arg_list(&mut self) -> Result<Vec<Expr>> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat(&TokenKind::Comma) {
                // trailing comma
                if self.eat(&TokenKind::RParen) {
                    return Ok(args);
                }
                continue;
            }
            self.expect(&TokenKind::RParen)?;
            return Ok(args);
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        let line = self.line();
        match self.peek().cloned() {
            Some(TokenKind::Str(value)) => {
                self.pos += 1;
                Ok(Expr::Str(value))
            }
            Some(TokenKind::Int(value)) => {
                self.pos += 1;
                Ok(Expr::Int(value))
            }
            Some(TokenKind::Ident(name)) if name == "true" || name == "false" => {
                self.pos += 1;
                Ok(Expr::Bool(name == "true"))
            }
            Some(TokenKind::Ident(_)) => {
                let path = self.path()?;
                if self.peek() == Some(&TokenKind::LParen) {
                    let args = self.args()?;
                    Ok(Expr::Call { callee: path, args })
                } else {
                    Ok(Expr::Path(path))
                }
            }
            Some(other) => Err(syntax_error(
                line,
                format!("Expected a value, found {}", other),
            )),
            None => Err(syntax_error(line, "Expected a value, found end of input")),
        }
    }
}

/// Parse a whole script into top-level statements
pub fn parse(source: &str) -> Result<Vec<Statement>> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    parser.statements(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use droidbuild_core::ErrorCode;

    #[test]
    fn test_nested_blocks() {
        let statements = parse("android {\n  defaultConfig {\n    minSdk = 21\n  }\n}\n").unwrap();
        assert_eq!(statements.len(), 1);
        let Statement::Call { callee, block: Some(body), .. } = &statements[0] else {
            panic!("expected block");
        };
        assert_eq!(callee, &["android"]);
        let Statement::Call { block: Some(inner), .. } = &body[0] else {
            panic!("expected nested block");
        };
        assert_eq!(
            inner[0],
            Statement::Assign {
                target: vec!["minSdk".into()],
                value: Expr::Int(21),
                line: 3,
            }
        );
    }

    #[test]
    fn test_call_with_nested_call_argument() {
        let statements =
            parse(r#"implementation(platform("com.google.firebase:firebase-bom:32.8.1"))"#).unwrap();
        assert_eq!(
            statements[0],
            Statement::Call {
                callee: vec!["implementation".into()],
                args: vec![Expr::Call {
                    callee: vec!["platform".into()],
                    args: vec![Expr::Str("com.google.firebase:firebase-bom:32.8.1".into())],
                }],
                block: None,
                line: 1,
            }
        );
    }

    #[test]
    fn test_dotted_path_and_method_call_values() {
        let statements = parse(
            "sourceCompatibility = JavaVersion.VERSION_17\nsigningConfig = signingConfigs.getByName(\"debug\")",
        )
        .unwrap();
        let Statement::Assign { value, .. } = &statements[0] else {
            panic!("expected assignment");
        };
        assert_eq!(
            value,
            &Expr::Path(vec!["JavaVersion".into(), "VERSION_17".into()])
        );
        let Statement::Assign { value, .. } = &statements[1] else {
            panic!("expected assignment");
        };
        assert_eq!(
            value,
            &Expr::Call {
                callee: vec!["signingConfigs".into(), "getByName".into()],
                args: vec![Expr::Str("debug".into())],
            }
        );
    }

    #[test]
    fn test_call_with_trailing_lambda() {
        let statements = parse("getByName(\"release\") {\n isMinifyEnabled = true\n}").unwrap();
        let Statement::Call { args, block, .. } = &statements[0] else {
            panic!("expected call");
        };
        assert_eq!(args, &[Expr::Str("release".into())]);
        assert_eq!(block.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_booleans_and_trailing_comma() {
        let statements = parse("multiDexEnabled = true\nfoo(1, 2,)").unwrap();
        assert_eq!(statements[0].name(), "multiDexEnabled");
        let Statement::Call { args, .. } = &statements[1] else {
            panic!("expected call");
        };
        assert_eq!(args, &[Expr::Int(1), Expr::Int(2)]);
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse("android {\n namespace = \"a.b\"\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedConfig);
        assert!(err.message.contains("Unclosed block"));
    }

    #[test]
    fn test_infix_plugin_version_rejected() {
        let err = parse("plugins {\n id(\"x\") version \"1.0\"\n}").unwrap_err();
        assert_eq!(err.field.as_deref(), Some("line 2"));
    }

    #[test]
    fn test_deeply_nested_blocks_rejected() {
        let source = format!("{}{}", "a {".repeat(200_000), "}".repeat(200_000));
        let err = parse(&source).unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedConfig);
        assert!(err.message.contains("Nesting too deep"));
    }

    #[test]
    fn test_deeply_nested_calls_rejected() {
        let source = format!("x = {}1{}", "f(".repeat(10_000), ")".repeat(10_000));
        let err = parse(&source).unwrap_err();
        assert!(err.message.contains("Nesting too deep"));
    }

    #[test]
    fn test_nesting_at_limit_accepted() {
        let source = format!("{}{}", "a {".repeat(MAX_DEPTH), "}".repeat(MAX_DEPTH));
        assert!(parse(&source).is_ok());
        let source = format!("{}{}", "a {".repeat(MAX_DEPTH + 1), "}".repeat(MAX_DEPTH + 1));
        assert!(parse(&source).is_err());
    }

    #[test]
    fn test_stray_closing_brace() {
        let err = parse("}").unwrap_err();
        assert!(err.message.contains("Unexpected"));
    }
}
