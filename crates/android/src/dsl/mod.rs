//! Gradle Kotlin DSL front end
//!
//! Turns `build.gradle.kts` text into a statement tree. Only the declarative
//! subset used by module build scripts is understood; anything else is
//! reported as `MalformedConfig` with the offending line.

mod lexer;
mod parser;

pub use lexer::{count_comments, tokenize, Token, TokenKind};
pub use parser::{parse, Expr, Statement};
