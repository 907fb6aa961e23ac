//! The in-memory representation of an interpreted Puppetfile.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A literal argument value in a Puppetfile directive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Str(String),
    Symbol(String),
    Int(i64),
    Bool(bool),
    Nil,
}

impl ArgValue {
    /// Text of a string or symbol value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) | ArgValue::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Lossy rendering used where any value is accepted as text (e.g. a git ref).
    pub fn to_text(&self) -> String {
        match self {
            ArgValue::Str(s) | ArgValue::Symbol(s) => s.clone(),
            ArgValue::Int(i) => i.to_string(),
            ArgValue::Bool(b) => b.to_string(),
            ArgValue::Nil => String::new(),
        }
    }

    pub fn is_symbol(&self, name: &str) -> bool {
        matches!(self, ArgValue::Symbol(s) if s == name)
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Str(s) => write!(f, "'{s}'"),
            ArgValue::Symbol(s) => write!(f, ":{s}"),
            ArgValue::Int(i) => write!(f, "{i}"),
            ArgValue::Bool(b) => write!(f, "{b}"),
            ArgValue::Nil => f.write_str("nil"),
        }
    }
}

/// The raw argument set of a `mod` declaration, after the title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModuleArgs {
    /// `mod 'puppetlabs/stdlib'`
    #[default]
    None,
    /// `mod 'puppetlabs/stdlib', '6.0.0'` or `mod 'puppetlabs/stdlib', :latest`
    Version(ArgValue),
    /// `mod 'stdlib', :git => 'https://...', :tag => 'v6.0.0'`
    Options(BTreeMap<String, ArgValue>),
}

impl ModuleArgs {
    pub fn option(&self, key: &str) -> Option<&ArgValue> {
        match self {
            ModuleArgs::Options(map) => map.get(key),
            _ => None,
        }
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.option(key).is_some()
    }
}

/// Per-module switches set through `# resolver:disable <Flag>` comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResolverFlag {
    /// Ignore the module's requirement on the `puppet` platform version.
    DisablePuppetDependency,
}

impl ResolverFlag {
    /// Look up a flag by its comment name, e.g. `Dependency/Puppet`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Dependency/Puppet" => Some(ResolverFlag::DisablePuppetDependency),
            _ => None,
        }
    }
}

/// Zero-based, inclusive line span of a statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub start_line: usize,
    pub end_line: usize,
}

impl Location {
    pub fn line(line: usize) -> Self {
        Self {
            start_line: line,
            end_line: line,
        }
    }
}

/// One `mod` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredModule {
    pub title: String,
    pub args: ModuleArgs,
    pub location: Location,
    pub flags: BTreeSet<ResolverFlag>,
}

impl DeclaredModule {
    pub fn has_flag(&self, flag: ResolverFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// A structural problem found while interpreting a Puppetfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentError {
    pub message: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl DocumentError {
    pub fn new(message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            start_line: location.start_line,
            end_line: location.end_line,
        }
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "line {}: {}", self.start_line + 1, self.message)
        } else {
            write!(
                f,
                "lines {}-{}: {}",
                self.start_line + 1,
                self.end_line + 1,
                self.message
            )
        }
    }
}

/// An interpreted Puppetfile. Built once by [`crate::puppetfile::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Forge endpoint from a `forge` directive.
    pub forge_uri: Option<String>,
    /// Module install directory from a `moduledir` directive.
    pub moduledir: Option<String>,
    /// `mod` declarations in source order.
    pub modules: Vec<DeclaredModule>,
    pub validation_errors: Vec<DocumentError>,
}

impl Document {
    pub fn is_valid(&self) -> bool {
        self.validation_errors.is_empty()
    }
}
