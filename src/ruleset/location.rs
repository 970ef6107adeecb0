//! Source locations and input descriptors.
//!
//! A rule remembers where in its input it was written so that diagnostics
//! can quote the original line. Locations are otherwise opaque to the
//! optimizer.

use std::fmt;
use std::rc::Rc;

/// Where a piece of input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// An in-memory buffer, e.g. a `-e` command line expression.
    Buffer,
    /// Interactive command line.
    Cli,
    Stdin,
    File,
    /// Generated internally; has no source text.
    Internal,
}

/// One unit of input, with its raw text retained for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDescriptor {
    pub kind: InputKind,
    pub name: String,
    pub data: String,
}

impl InputDescriptor {
    pub fn new(kind: InputKind, name: &str, data: &str) -> Rc<InputDescriptor> {
        Rc::new(InputDescriptor {
            kind,
            name: name.to_owned(),
            data: data.to_owned(),
        })
    }
}

/// A position within an input descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub indesc: Option<Rc<InputDescriptor>>,
    pub line: usize,
    pub column: usize,
    /// Byte offset of the line start, used for stdin input.
    pub line_offset: usize,
}

impl Location {
    pub fn new(indesc: Rc<InputDescriptor>, line: usize, column: usize) -> Location {
        Location {
            indesc: Some(indesc),
            line,
            column,
            line_offset: 0,
        }
    }

    /// A location for internally generated objects.
    pub fn internal() -> Location {
        Location {
            indesc: None,
            line: 0,
            column: 0,
            line_offset: 0,
        }
    }

    /// Recovers the originating line of text, when the input kind allows it.
    pub fn line_text(&self) -> Option<&str> {
        let indesc = self.indesc.as_deref()?;
        match indesc.kind {
            InputKind::Buffer | InputKind::Cli => indesc.data.lines().next(),
            InputKind::Stdin => indesc
                .data
                .get(self.line_offset..)
                .and_then(|tail| tail.lines().next()),
            InputKind::File => indesc.data.lines().nth(self.line.saturating_sub(1)),
            InputKind::Internal => None,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location::internal()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.indesc {
            Some(indesc) => write!(f, "{}:{}:{}", indesc.name, self.line, self.column),
            None => write!(f, "internal:0:0"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_file_line_recovery() {
        let indesc = InputDescriptor::new(
            InputKind::File,
            "ruleset.nft",
            "tcp dport 22 accept\ntcp dport 23 accept\n",
        );
        let loc = Location::new(indesc, 2, 1);
        assert_eq!(loc.line_text(), Some("tcp dport 23 accept"));
        assert_eq!(loc.to_string(), "ruleset.nft:2:1");
    }

    #[test]
    fn location_buffer_and_stdin_recovery() {
        let indesc = InputDescriptor::new(InputKind::Buffer, "<cmdline>", "udp dport 53 accept");
        assert_eq!(
            Location::new(indesc, 1, 1).line_text(),
            Some("udp dport 53 accept")
        );

        let indesc = InputDescriptor::new(InputKind::Stdin, "<stdin>", "first\nsecond\n");
        let mut loc = Location::new(indesc, 2, 1);
        loc.line_offset = 6;
        assert_eq!(loc.line_text(), Some("second"));
    }

    #[test]
    fn location_internal_has_no_text() {
        assert_eq!(Location::internal().line_text(), None);
        assert_eq!(Location::internal().to_string(), "internal:0:0");
    }
}
