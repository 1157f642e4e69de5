//! Named text transforms used to make output comparisons insensitive to
//! case, accents, whitespace and punctuation.

use std::{collections::BTreeSet, str::FromStr};

use strum::IntoEnumIterator;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// A registered normalizer.
///
/// Variants are declared in lexicographic order of their names, so the derived
/// `Ord` is the application order: `whites` always runs after `extra_whites`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Operator {
    Accents,
    Case,
    ExtraWhites,
    Linebreaks,
    Punctuation,
    Whites,
}

impl Operator {
    pub fn apply(self, text: &str) -> String {
        use Operator::*;
        match self {
            Accents => text.nfkd().filter(|&c| !is_combining_mark(c)).collect(),
            Case => text.to_lowercase(),
            ExtraWhites => text
                .lines()
                .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
                .collect::<Vec<_>>()
                .join("\n")
                .trim_end_matches('\n')
                .to_owned(),
            Linebreaks => text.replace("\r\n", " ").replace(['\n', '\r'], " "),
            Punctuation => text
                .chars()
                .map(|c| if c.is_ascii_punctuation() { ' ' } else { c })
                .collect(),
            Whites => text.chars().filter(|c| !c.is_whitespace()).collect(),
        }
    }
}

/// Sentinel accepted wherever a set of operator names is expected.
pub const ALL: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown normalizer '{}' (expected one of: {}, or 'all')", .0, known_names())]
pub struct UnknownOperator(pub String);

fn known_names() -> String {
    Operator::iter()
        .map(<&'static str>::from)
        .collect::<Vec<_>>()
        .join(", ")
}

/// An ordered set of operators. Iteration order is the application order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OperatorSet(BTreeSet<Operator>);

impl OperatorSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self(Operator::iter().collect())
    }

    /// `{case, accents, extra_whites}`
    pub fn standard() -> Self {
        Self::from_iter([Operator::Case, Operator::Accents, Operator::ExtraWhites])
    }

    pub fn parse<I, S>(names: I) -> Result<Self, UnknownOperator>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for name in names {
            let name = name.as_ref();
            if name == ALL {
                set.extend(Operator::iter());
                continue;
            }
            let op = Operator::from_str(name).map_err(|_| UnknownOperator(name.to_owned()))?;
            set.insert(op);
        }
        Ok(Self(set))
    }

    pub fn contains(&self, op: Operator) -> bool {
        self.0.contains(&op)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Operator> + '_ {
        self.0.iter().copied()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(<&'static str>::from).collect()
    }
}

impl FromIterator<Operator> for OperatorSet {
    fn from_iter<T: IntoIterator<Item = Operator>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl serde::Serialize for OperatorSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.names())
    }
}

pub fn preprocess(text: &str, ops: &OperatorSet) -> String {
    ops.iter().fold(text.to_owned(), |text, op| op.apply(&text))
}
