//! Puppetfile interpreter.
//!
//! A Puppetfile is a sequence of directive calls. Only three directives are
//! understood: `mod(title, args?)`, `forge(url)` and `moduledir(path)`.
//! Interpretation happens in two phases, mirroring how the file would be
//! evaluated as a script:
//!
//! 1. The whole text is tokenized and parsed into statements. A syntax error
//!    here means nothing is executed.
//! 2. Statements run in order against a fixed directive table. The first
//!    failing statement aborts the rest; declarations made before it are kept.
//!
//! [`parse`] never fails: every problem becomes a [`DocumentError`].

use std::collections::{BTreeMap, BTreeSet};

use crate::dependency::parse_title;
use crate::document::{
    ArgValue, DeclaredModule, Document, DocumentError, Location, ModuleArgs, ResolverFlag,
};
use crate::lexer::{Comment, Lexeme, Lexer, Token};

const FLAG_PREFIX: &str = "resolver:disable";

/// Interpret Puppetfile text into a [`Document`].
pub fn parse(text: &str) -> Document {
    let mut doc = Document::default();

    let (tokens, comments) = match Lexer::new(text).tokenize() {
        Ok(out) => out,
        Err(e) => {
            doc.validation_errors
                .push(DocumentError::new(e.message, Location::line(e.line)));
            return doc;
        }
    };

    let statements = match Parser::new(tokens).parse_program() {
        Ok(stmts) => stmts,
        Err(e) => {
            doc.validation_errors
                .push(DocumentError::new(e.message, e.location));
            return doc;
        }
    };

    let mut interpreter = Interpreter {
        doc: &mut doc,
        comments: &comments,
        seen: BTreeMap::new(),
    };
    for stmt in &statements {
        if let Err(e) = interpreter.execute(stmt) {
            tracing::debug!("Puppetfile aborted at line {}: {}", e.location.start_line, e.message);
            interpreter
                .doc
                .validation_errors
                .push(DocumentError::new(e.message, e.location));
            break;
        }
    }

    doc
}

#[derive(Debug)]
struct Failure {
    message: String,
    location: Location,
}

impl Failure {
    fn new(message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// An argument expression. Bare identifiers are nested method calls.
#[derive(Debug, Clone)]
enum Expr {
    Value(ArgValue),
    Call(String),
}

#[derive(Debug, Clone)]
enum Arg {
    Positional(Expr),
    Keyword(String, Expr),
}

#[derive(Debug, Clone)]
struct Statement {
    name: String,
    args: Vec<Arg>,
    location: Location,
}

struct Parser {
    tokens: Vec<Lexeme>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Lexeme>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn line(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn advance(&mut self) -> Lexeme {
        let lexeme = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        lexeme
    }

    fn unexpected(&self) -> Failure {
        Failure::new(
            format!("syntax error, unexpected {}", self.peek()),
            Location::line(self.line()),
        )
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Token::Newline) {
            self.advance();
        }
    }

    fn parse_program(&mut self) -> Result<Vec<Statement>, Failure> {
        let mut statements = Vec::new();
        loop {
            while matches!(self.peek(), Token::Newline | Token::Semi) {
                self.advance();
            }
            if matches!(self.peek(), Token::Eof) {
                return Ok(statements);
            }
            statements.push(self.parse_statement()?);
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, Failure> {
        let start_line = self.line();
        let name = match self.peek() {
            Token::Ident(name) => name.clone(),
            _ => return Err(self.unexpected()),
        };
        self.advance();

        let args = match self.peek() {
            Token::LParen => {
                self.advance();
                self.skip_newlines();
                let args = if matches!(self.peek(), Token::RParen) {
                    Vec::new()
                } else {
                    self.parse_arglist(true)?
                };
                self.skip_newlines();
                if !matches!(self.peek(), Token::RParen) {
                    return Err(self.unexpected());
                }
                self.advance();
                args
            }
            Token::Newline | Token::Semi | Token::Eof => Vec::new(),
            _ => self.parse_arglist(false)?,
        };

        let end_line = self.tokens[self.pos.saturating_sub(1)].line.max(start_line);
        if !matches!(self.peek(), Token::Newline | Token::Semi | Token::Eof) {
            return Err(self.unexpected());
        }

        Ok(Statement {
            name,
            args,
            location: Location {
                start_line,
                end_line,
            },
        })
    }

    fn parse_arglist(&mut self, in_parens: bool) -> Result<Vec<Arg>, Failure> {
        let mut args = Vec::new();
        let mut seen_keyword = false;
        loop {
            if in_parens {
                self.skip_newlines();
            }
            let arg_line = self.line();
            let arg = self.parse_arg()?;
            match arg {
                Arg::Keyword(..) => seen_keyword = true,
                Arg::Positional(_) if seen_keyword => {
                    return Err(Failure::new(
                        "syntax error, positional argument after options",
                        Location::line(arg_line),
                    ));
                }
                Arg::Positional(_) => {}
            }
            args.push(arg);

            if matches!(self.peek(), Token::Comma) {
                self.advance();
                // a trailing comma continues the call on the next line
                self.skip_newlines();
                if in_parens && matches!(self.peek(), Token::RParen) {
                    return Ok(args);
                }
                continue;
            }
            return Ok(args);
        }
    }

    fn parse_arg(&mut self) -> Result<Arg, Failure> {
        if let Token::Label(key) = self.peek() {
            let key = key.clone();
            self.advance();
            self.skip_newlines();
            return Ok(Arg::Keyword(key, self.parse_expr()?));
        }

        let expr = self.parse_expr()?;
        if matches!(self.peek(), Token::FatArrow) {
            let key = match &expr {
                Expr::Value(ArgValue::Str(s)) | Expr::Value(ArgValue::Symbol(s)) => s.clone(),
                _ => return Err(self.unexpected()),
            };
            self.advance();
            self.skip_newlines();
            return Ok(Arg::Keyword(key, self.parse_expr()?));
        }
        Ok(Arg::Positional(expr))
    }

    fn parse_expr(&mut self) -> Result<Expr, Failure> {
        let expr = match self.peek() {
            Token::Str(s) => Expr::Value(ArgValue::Str(s.clone())),
            Token::Symbol(s) => Expr::Value(ArgValue::Symbol(s.clone())),
            Token::Int(i) => Expr::Value(ArgValue::Int(*i)),
            Token::Ident(name) => match name.as_str() {
                "true" => Expr::Value(ArgValue::Bool(true)),
                "false" => Expr::Value(ArgValue::Bool(false)),
                "nil" => Expr::Value(ArgValue::Nil),
                _ => Expr::Call(name.clone()),
            },
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(expr)
    }
}

struct Interpreter<'a> {
    doc: &'a mut Document,
    comments: &'a [Comment],
    /// Module name to the index of its first declaration.
    seen: BTreeMap<String, usize>,
}

/// Evaluated call arguments: positionals, then trailing options.
struct CallArgs {
    positional: Vec<ArgValue>,
    options: BTreeMap<String, ArgValue>,
}

impl CallArgs {
    fn count(&self) -> usize {
        self.positional.len() + usize::from(!self.options.is_empty())
    }
}

impl Interpreter<'_> {
    fn execute(&mut self, stmt: &Statement) -> Result<(), Failure> {
        let args = self.evaluate(stmt)?;
        match stmt.name.as_str() {
            "mod" => self.directive_mod(stmt, args),
            "forge" => {
                let url = single_string(stmt, &args)?;
                self.doc.forge_uri = Some(url);
                Ok(())
            }
            "moduledir" => {
                let dir = single_string(stmt, &args)?;
                self.doc.moduledir = Some(dir);
                Ok(())
            }
            other => Err(unknown_directive(other, stmt.location)),
        }
    }

    fn evaluate(&self, stmt: &Statement) -> Result<CallArgs, Failure> {
        let mut out = CallArgs {
            positional: Vec::new(),
            options: BTreeMap::new(),
        };
        for arg in &stmt.args {
            match arg {
                Arg::Positional(expr) => out.positional.push(eval_expr(expr, stmt.location)?),
                Arg::Keyword(key, expr) => {
                    out.options.insert(key.clone(), eval_expr(expr, stmt.location)?);
                }
            }
        }
        Ok(out)
    }

    fn directive_mod(&mut self, stmt: &Statement, args: CallArgs) -> Result<(), Failure> {
        let given = args.count();
        if !(1..=2).contains(&given) {
            return Err(Failure::new(
                format!("wrong number of arguments for 'mod' (given {given}, expected 1..2)"),
                stmt.location,
            ));
        }

        let mut positional = args.positional.into_iter();
        let title = match positional.next() {
            Some(ArgValue::Str(title)) => title,
            Some(other) => {
                return Err(Failure::new(
                    format!("module title must be a string, got {other}"),
                    stmt.location,
                ))
            }
            None => {
                return Err(Failure::new(
                    "module title must be a string, got options",
                    stmt.location,
                ))
            }
        };

        let module_args = match positional.next() {
            Some(version @ (ArgValue::Str(_) | ArgValue::Symbol(_))) => ModuleArgs::Version(version),
            Some(other) => {
                return Err(Failure::new(
                    format!("module version must be a string or :latest, got {other}"),
                    stmt.location,
                ))
            }
            None if args.options.is_empty() => ModuleArgs::None,
            None => ModuleArgs::Options(args.options),
        };

        let name = parse_title(&title)
            .map(|(_, name)| name)
            .unwrap_or_else(|_| title.clone());
        if let Some(&first) = self.seen.get(&name) {
            let first_line = self.doc.modules[first].location.start_line;
            self.doc.validation_errors.push(DocumentError::new(
                format!(
                    "Duplicate module definition for '{name}' (first declared on line {})",
                    first_line + 1
                ),
                stmt.location,
            ));
        } else {
            self.seen.insert(name, self.doc.modules.len());
        }

        let flags = self.flags_for(stmt.location);
        self.doc.modules.push(DeclaredModule {
            title,
            args: module_args,
            location: stmt.location,
            flags,
        });
        Ok(())
    }

    /// Resolver flags from comments on the statement's lines, or from a
    /// full-line comment directly above it.
    fn flags_for(&self, location: Location) -> BTreeSet<ResolverFlag> {
        let mut flags = BTreeSet::new();
        for comment in self.comments {
            let on_statement =
                comment.line >= location.start_line && comment.line <= location.end_line;
            let just_above = !comment.trailing && comment.line + 1 == location.start_line;
            if !on_statement && !just_above {
                continue;
            }
            let Some(rest) = comment.text.trim().strip_prefix(FLAG_PREFIX) else {
                continue;
            };
            for name in rest.split([' ', ',', '\t']).filter(|s| !s.is_empty()) {
                match ResolverFlag::from_name(name) {
                    Some(flag) => {
                        flags.insert(flag);
                    }
                    None => tracing::warn!(
                        "line {}: ignoring unknown resolver flag '{name}'",
                        comment.line + 1
                    ),
                }
            }
        }
        flags
    }
}

fn eval_expr(expr: &Expr, location: Location) -> Result<ArgValue, Failure> {
    match expr {
        Expr::Value(v) => Ok(v.clone()),
        Expr::Call(name) => Err(unknown_directive(name, location)),
    }
}

fn unknown_directive(name: &str, location: Location) -> Failure {
    Failure::new(
        format!("Unknown Puppetfile directive '{name}'"),
        location,
    )
}

fn single_string(stmt: &Statement, args: &CallArgs) -> Result<String, Failure> {
    let given = args.count();
    if given != 1 {
        return Err(Failure::new(
            format!(
                "wrong number of arguments for '{}' (given {given}, expected 1)",
                stmt.name
            ),
            stmt.location,
        ));
    }
    match args.positional.first() {
        Some(ArgValue::Str(s)) => Ok(s.clone()),
        Some(ArgValue::Symbol(s)) => Ok(s.clone()),
        _ => Err(Failure::new(
            format!("'{}' expects a string argument", stmt.name),
            stmt.location,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_spans_continuation_lines() {
        let doc = parse("mod 'stdlib',\n  :git => 'https://x',\n  :tag => 'v1'\n");
        assert!(doc.is_valid(), "{:?}", doc.validation_errors);
        let m = &doc.modules[0];
        assert_eq!(m.location.start_line, 0);
        assert_eq!(m.location.end_line, 2);
    }

    #[test]
    fn flag_on_preceding_comment_line() {
        let doc = parse("# resolver:disable Dependency/Puppet\nmod 'puppetlabs/stdlib'\nmod 'puppetlabs/concat'\n");
        assert!(doc.modules[0].has_flag(ResolverFlag::DisablePuppetDependency));
        assert!(!doc.modules[1].has_flag(ResolverFlag::DisablePuppetDependency));
    }

    #[test]
    fn trailing_comment_on_previous_statement_does_not_leak() {
        let doc = parse("mod 'a/one' # resolver:disable Dependency/Puppet\nmod 'a/two'\n");
        assert!(doc.modules[0].has_flag(ResolverFlag::DisablePuppetDependency));
        assert!(!doc.modules[1].has_flag(ResolverFlag::DisablePuppetDependency));
    }
}
