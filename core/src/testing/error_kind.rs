use std::collections::BTreeMap;

use super::result::Status;

/// A runtime error recognised by name in a subject's stderr.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorKind {
    pub name: String,
    pub code: char,
}

impl ErrorKind {
    pub fn new(name: impl Into<String>, code: char) -> Self {
        Self {
            name: name.into(),
            code,
        }
    }
}

/// Table of recognised runtime error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorKinds {
    kinds: Vec<ErrorKind>,
}

impl Default for ErrorKinds {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ErrorKinds {
    const BUILTIN: &[(&'static str, char)] = &[
        ("AssertionError", 'b'),
        ("AttributeError", 'a'),
        ("EOFError", 'o'),
        ("ImportError", 'i'),
        ("IndentationError", 'n'),
        ("IndexError", 'x'),
        ("KeyError", 'k'),
        ("MemoryError", 'g'),
        ("ModuleNotFoundError", 'l'),
        ("NameError", 'm'),
        ("OverflowError", 'w'),
        ("RecursionError", 'c'),
        ("RuntimeError", 'r'),
        ("SyntaxError", 's'),
        ("TypeError", 'y'),
        ("UnboundLocalError", 'u'),
        ("ValueError", 'v'),
        ("ZeroDivisionError", 'z'),
    ];

    pub fn empty() -> Self {
        Self { kinds: Vec::new() }
    }

    pub fn builtin() -> Self {
        Self {
            kinds: Self::BUILTIN
                .iter()
                .map(|&(name, code)| ErrorKind::new(name, code))
                .collect(),
        }
    }

    /// Adds kinds, replacing the code of any kind already known by the same name.
    pub fn extend(mut self, extra: &BTreeMap<String, char>) -> Self {
        for (name, &code) in extra {
            match self.kinds.iter_mut().find(|k| &k.name == name) {
                Some(kind) => kind.code = code,
                None => self.kinds.push(ErrorKind::new(name.as_str(), code)),
            }
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorKind> {
        self.kinds.iter()
    }

    /// Finds the kind whose name occurs leftmost in `stderr`.
    /// When two names start at the same offset the longer one wins.
    pub fn find_in(&self, stderr: &str) -> Option<&ErrorKind> {
        self.kinds
            .iter()
            .filter_map(|kind| stderr.find(&kind.name).map(|pos| (pos, kind)))
            .min_by(|(pa, a), (pb, b)| pa.cmp(pb).then(b.name.len().cmp(&a.name.len())))
            .map(|(_, kind)| kind)
    }

    /// Status of a run that exited with a non-zero code.
    pub fn classify(&self, stderr: &str) -> Status {
        match self.find_in(stderr) {
            Some(kind) => Status::RuntimeError(kind.clone()),
            None => Status::DefaultError,
        }
    }
}

#[cfg(test)]
mod test {
    use maplit::btreemap;

    use super::*;

    const TRACEBACK: &str = "Traceback (most recent call last):\n  File \"sum.py\", line 2, in <module>\n    print(1 / 0)\nZeroDivisionError: division by zero\n";

    #[test]
    fn classify_traceback() {
        let kinds = ErrorKinds::builtin();
        assert_eq!(
            kinds.classify(TRACEBACK),
            Status::RuntimeError(ErrorKind::new("ZeroDivisionError", 'z'))
        );
        assert_eq!(kinds.classify("segmentation fault"), Status::DefaultError);
        assert_eq!(kinds.classify(""), Status::DefaultError);
    }

    #[test]
    fn leftmost_name_wins() {
        let kinds = ErrorKinds::builtin();
        let stderr = "ValueError raised while handling\nTypeError: bad operand\n";
        assert_eq!(kinds.classify(stderr).code(), 'v');

        let stderr = "TypeError first, then ValueError";
        assert_eq!(kinds.classify(stderr).code(), 'y');
    }

    #[test]
    fn longer_name_wins_at_same_offset() {
        let kinds = ErrorKinds::empty().extend(&btreemap! {
            "Error".to_owned() => '1',
            "ErrorX".to_owned() => '2',
        });
        assert_eq!(kinds.classify("ErrorX happened").code(), '2');
        assert_eq!(kinds.classify("Error happened").code(), '1');
    }

    #[test]
    fn extend_adds_and_overrides() {
        let kinds = ErrorKinds::builtin().extend(&btreemap! {
            "StopIteration".to_owned() => 'p',
            "ValueError".to_owned() => 'V',
        });
        assert_eq!(kinds.classify("StopIteration").code(), 'p');
        assert_eq!(kinds.classify("ValueError: x").code(), 'V');
        assert_eq!(kinds.iter().count(), ErrorKinds::BUILTIN.len() + 1);
    }
}
