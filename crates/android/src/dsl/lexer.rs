//! Tokenizer for the Gradle Kotlin DSL subset

use droidbuild_core::error::{Error, Result};
use std::iter::Peekable;
use std::str::Chars;

/// Token kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword (`android`, `true`)
    Ident(String),
    /// Decoded string literal
    Str(String),
    /// Integer literal
    Int(i64),
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `=`
    Eq,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier `{}`", name),
            TokenKind::Str(_) => write!(f, "string literal"),
            TokenKind::Int(value) => write!(f, "integer {}", value),
            TokenKind::LBrace => write!(f, "`{{`"),
            TokenKind::RBrace => write!(f, "`}}`"),
            TokenKind::LParen => write!(f, "`(`"),
            TokenKind::RParen => write!(f, "`)`"),
            TokenKind::Dot => write!(f, "`.`"),
            TokenKind::Comma => write!(f, "`,`"),
            TokenKind::Eq => write!(f, "`=`"),
        }
    }
}

/// A token with the 1-based line it starts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

pub(crate) fn syntax_error(line: usize, message: impl Into<String>) -> Error {
    Error::malformed(format!("line {}", line), message)
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    comments: usize,
}

impl<'a> Lexer<'a> {
    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_line_comment(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self, start: usize) -> Result<()> {
        let mut prev = '\0';
        while let Some(c) = self.bump() {
            if prev == '*' && c == '/' {
                return Ok(());
            }
            prev = c;
        }
        Err(syntax_error(start, "Unterminated block comment"))
    }

    fn string(&mut self, start: usize) -> Result<String> {
        if self.chars.peek() == Some(&'"') {
            // `""` is either the empty string or the start of a raw string
            self.bump();
            if self.chars.peek() == Some(&'"') {
                return Err(syntax_error(start, "Raw (triple-quoted) strings are not supported"));
            }
            return Ok(String::new());
        }

        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(syntax_error(start, "Unterminated string literal")),
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some('$') => value.push('$'),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some(other) => {
                        return Err(syntax_error(
                            self.line,
                            format!("Unsupported escape sequence \\{}", other),
                        ))
                    }
                    None => return Err(syntax_error(start, "Unterminated string literal")),
                },
                Some('$') => {
                    return Err(syntax_error(
                        self.line,
                        "String templates are not supported; escape `$` as `\\$`",
                    ))
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn integer(&mut self, first: char, line: usize) -> Result<i64> {
        let mut digits = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
            } else if c != '_' {
                break;
            }
            self.bump();
        }
        if self.chars.peek().is_some_and(|c| c.is_alphabetic() || *c == '.') {
            return Err(syntax_error(line, "Only plain integer literals are supported"));
        }
        digits
            .parse()
            .map_err(|_| syntax_error(line, format!("Integer literal out of range: {}", digits)))
    }

    fn ident(&mut self, first: char) -> String {
        let mut name = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        name
    }
}

/// Split source text into tokens, dropping whitespace and comments
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    lex(source).map(|(tokens, _)| tokens)
}

/// Number of `//` and `/* */` comments in `source`; text inside strings is not counted
pub fn count_comments(source: &str) -> Result<usize> {
    lex(source).map(|(_, comments)| comments)
}

fn lex(source: &str) -> Result<(Vec<Token>, usize)> {
    let mut lexer = Lexer {
        chars: source.chars().peekable(),
        line: 1,
        comments: 0,
    };
    let mut tokens = Vec::new();

    while let Some(c) = lexer.bump() {
        let line = lexer.line;
        let kind = match c {
            c if c.is_whitespace() => continue,
            ';' => continue,
            '/' if lexer.chars.peek() == Some(&'/') => {
                lexer.skip_line_comment();
                lexer.comments += 1;
                continue;
            }
            '/' if lexer.chars.peek() == Some(&'*') => {
                lexer.bump();
                lexer.skip_block_comment(line)?;
                lexer.comments += 1;
                continue;
            }
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            '=' => TokenKind::Eq,
            '"' => TokenKind::Str(lexer.string(line)?),
            c if c.is_ascii_digit() => TokenKind::Int(lexer.integer(c, line)?),
            c if c.is_alphabetic() || c == '_' => TokenKind::Ident(lexer.ident(c)),
            other => {
                return Err(syntax_error(line, format!("Unexpected character `{}`", other)));
            }
        };
        tokens.push(Token { kind, line });
    }

    Ok((tokens, lexer.comments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use droidbuild_core::ErrorCode;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_assignment_tokens() {
        assert_eq!(
            kinds("minSdk = 21"),
            vec![
                TokenKind::Ident("minSdk".into()),
                TokenKind::Eq,
                TokenKind::Int(21)
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = tokenize("// header\n/* block\ncomment */ google()\n").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::Ident("google".into()));
        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\"b\\c\$d""#),
            vec![TokenKind::Str("a\"b\\c$d".into())]
        );
        assert_eq!(kinds(r#""""#), vec![TokenKind::Str(String::new())]);
    }

    #[test]
    fn test_underscored_integer() {
        assert_eq!(kinds("1_000"), vec![TokenKind::Int(1000)]);
    }

    #[test]
    fn test_string_template_rejected() {
        let err = tokenize("versionName = \"${flutter.versionName}\"").unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedConfig);
        assert_eq!(err.field.as_deref(), Some("line 1"));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("\n\nnamespace = \"com.example").unwrap_err();
        assert_eq!(err.field.as_deref(), Some("line 3"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("signingConfigs[\"release\"]").unwrap_err();
        assert!(err.message.contains('['));
    }

    #[test]
    fn test_line_tracking() {
        let tokens = tokenize("a\n\nb\n").unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_count_comments() {
        let source = "// header\nandroid { /* inline */ namespace = \"com.example.app\" } // trailing\n";
        assert_eq!(count_comments(source).unwrap(), 3);
        assert_eq!(
            count_comments("maven { url = uri(\"https://repo.example.com/*x*/\") }").unwrap(),
            0
        );
        assert_eq!(count_comments("x = 1\n").unwrap(), 0);
        assert!(count_comments("/* open").is_err());
    }
}
