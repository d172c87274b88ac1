use std::fmt;

/// An ordered list of command tokens: the program to run followed by its
/// arguments.
///
/// Tokens can only be appended, and only matter up to the point the process
/// is spawned; the spawn takes a snapshot. Rendering via [`fmt::Display`]
/// joins the tokens with single spaces for logging, it is not an escaped or
/// shell-safe command line.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    tokens: Vec<String>,
}

impl CommandLine {
    /// Create a command line for the given program, with no arguments yet.
    pub fn new(program: impl Into<String>) -> Self {
        CommandLine {
            tokens: vec![program.into()],
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.push_arg(arg);
        self
    }

    /// Append several arguments in order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self.push_arg(arg);
        }
        self
    }

    /// Append an argument in place.
    pub fn push_arg(&mut self, arg: impl Into<String>) {
        self.tokens.push(arg.into());
    }

    /// The program token.
    pub fn program(&self) -> &str {
        &self.tokens[0]
    }

    /// The argument tokens, in the order they were appended.
    pub fn arguments(&self) -> &[String] {
        &self.tokens[1..]
    }

    /// All tokens, program first.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}
