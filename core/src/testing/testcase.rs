use std::path::PathBuf;

use lazy_regex::{lazy_regex, Lazy, Regex};
use serde::{Deserialize, Serialize};

use crate::preprocess::{preprocess, OperatorSet, UnknownOperator};

static RE_TOKEN_MARKUP: Lazy<Regex> = lazy_regex!(r"\{\{(.*?)\}\}");

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TestKind {
    #[default]
    Io,
    Script,
}

/// A field that may be written either as a single string or as a list.
/// A single string is split on whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Words {
    One(String),
    Many(Vec<String>),
}

impl Words {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Words::One(s) => s.split_whitespace().map(str::to_owned).collect(),
            Words::Many(v) => v,
        }
    }
}

/// One test as written in the test document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TestEntry {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TestKind>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub tokens: Option<Words>,
    pub ignore: Option<Words>,
    pub script: Option<PathBuf>,
    pub files: Option<Words>,
}

/// The whole test document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TestDocument {
    /// Copied onto every test lacking its own `ignore`.
    pub ignore: Option<Words>,
    #[serde(default)]
    pub tests: Vec<TestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TestDefinitionError {
    #[error("Test {0}: missing field '{1}' required by type '{2}'")]
    MissingField(String, &'static str, TestKind),

    #[error("Test {0}: {1}")]
    UnknownOperator(String, #[source] UnknownOperator),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoTestCase {
    pub name: Option<String>,
    pub input: String,
    /// Expected stdout with token markup removed.
    pub output: String,
    pub ignore: OperatorSet,
    /// Tokens after preprocessing with `ignore`.
    pub tokens: Vec<String>,
    pub preprocessed_output: String,
    pub normalized_output: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTestCase {
    pub name: Option<String>,
    pub script: PathBuf,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestCase {
    Io(IoTestCase),
    Script(ScriptTestCase),
}

/// Splits `{{token}}` markup out of an expected output.
/// Returns the output with the brackets removed and the enclosed texts in order.
pub fn extract_tokens(output: &str) -> (String, Vec<String>) {
    let tokens = RE_TOKEN_MARKUP
        .captures_iter(output)
        .map(|c| c[1].to_owned())
        .collect();
    let plain = RE_TOKEN_MARKUP.replace_all(output, "$1").into_owned();
    (plain, tokens)
}

impl IoTestCase {
    pub fn new(
        name: Option<String>,
        input: impl Into<String>,
        output: &str,
        tokens: Option<Vec<String>>,
        ignore: OperatorSet,
    ) -> Self {
        let (output, extracted) = extract_tokens(output);
        let tokens = tokens
            .unwrap_or(extracted)
            .iter()
            .map(|t| preprocess(t, &ignore))
            .collect();
        Self {
            name,
            input: input.into(),
            preprocessed_output: preprocess(&output, &ignore),
            normalized_output: preprocess(&output, &OperatorSet::standard()),
            output,
            ignore,
            tokens,
            files: Vec::new(),
        }
    }
}

impl TestCase {
    pub fn kind(&self) -> TestKind {
        match self {
            TestCase::Io(_) => TestKind::Io,
            TestCase::Script(_) => TestKind::Script,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            TestCase::Io(t) => t.name.as_deref(),
            TestCase::Script(t) => t.name.as_deref(),
        }
    }

    pub fn files(&self) -> &[String] {
        match self {
            TestCase::Io(t) => &t.files,
            TestCase::Script(t) => &t.files,
        }
    }

    /// `index` is the zero-based position in the document, used in error messages.
    pub fn from_entry(index: usize, entry: TestEntry) -> Result<Self, TestDefinitionError> {
        let label = match &entry.name {
            Some(name) => format!("#{} ({})", index + 1, name),
            None => format!("#{}", index + 1),
        };
        let kind = entry.kind.unwrap_or_default();
        let files = entry.files.map(Words::into_vec).unwrap_or_default();

        match kind {
            TestKind::Script => {
                let script = entry
                    .script
                    .ok_or_else(|| TestDefinitionError::MissingField(label, "script", kind))?;
                Ok(TestCase::Script(ScriptTestCase {
                    name: entry.name,
                    script,
                    files,
                }))
            }
            TestKind::Io => {
                let output = entry
                    .output
                    .ok_or_else(|| TestDefinitionError::MissingField(label.clone(), "output", kind))?;
                let ignore = match entry.ignore {
                    Some(words) => OperatorSet::parse(words.into_vec())
                        .map_err(|e| TestDefinitionError::UnknownOperator(label, e))?,
                    None => OperatorSet::standard(),
                };
                let mut case = IoTestCase::new(
                    entry.name,
                    entry.input.unwrap_or_default(),
                    &output,
                    entry.tokens.map(Words::into_vec),
                    ignore,
                );
                case.files = files;
                Ok(TestCase::Io(case))
            }
        }
    }
}

impl TestDocument {
    pub fn into_cases(self) -> Result<Vec<TestCase>, TestDefinitionError> {
        let TestDocument { ignore, tests } = self;
        tests
            .into_iter()
            .enumerate()
            .map(|(i, mut entry)| {
                if entry.ignore.is_none() {
                    entry.ignore = ignore.clone();
                }
                TestCase::from_entry(i, entry)
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::preprocess::Operator;

    fn io(case: TestCase) -> IoTestCase {
        match case {
            TestCase::Io(t) => t,
            TestCase::Script(t) => panic!("expected io case, got {:?}", t),
        }
    }

    #[test]
    fn tokens_are_extracted_from_markup() {
        let (plain, tokens) = extract_tokens("{{X}}{{Y}}");
        assert_eq!(plain, "XY");
        assert_eq!(tokens, vec!["X", "Y"]);

        let (plain, tokens) = extract_tokens("The sum is {{5}} and {{ 12 }}.");
        assert_eq!(plain, "The sum is 5 and  12 .");
        assert_eq!(tokens, vec!["5", " 12 "]);
    }

    #[test]
    fn no_markup_means_no_tokens() {
        let entry = TestEntry {
            output: Some("5\n".into()),
            ..Default::default()
        };
        let t = io(TestCase::from_entry(0, entry).unwrap());
        assert!(t.tokens.is_empty());
        assert_eq!(t.ignore, OperatorSet::standard());
        assert_eq!(t.preprocessed_output, "5");
    }

    #[test]
    fn derived_forms_use_case_ignore_set() {
        let entry = TestEntry {
            input: Some("2\n3\n".into()),
            output: Some("The SUM is {{Cinco}}\n".into()),
            ignore: Some(Words::One("whites".into())),
            ..Default::default()
        };
        let t = io(TestCase::from_entry(0, entry).unwrap());
        assert_eq!(t.output, "The SUM is Cinco\n");
        assert_eq!(t.preprocessed_output, "TheSUMisCinco");
        assert_eq!(t.normalized_output, "the sum is cinco");
        assert_eq!(t.tokens, vec!["Cinco"]);
        assert!(!t.ignore.contains(Operator::Case));
    }

    #[test]
    fn explicit_tokens_take_precedence() {
        let entry = TestEntry {
            output: Some("Total: {{10}}".into()),
            tokens: Some(Words::One("Total 10".into())),
            ..Default::default()
        };
        let t = io(TestCase::from_entry(0, entry).unwrap());
        assert_eq!(t.tokens, vec!["total", "10"]);
        assert_eq!(t.output, "Total: 10");
    }

    #[test]
    fn missing_required_fields() {
        let err = TestCase::from_entry(2, TestEntry::default()).unwrap_err();
        assert_eq!(
            err,
            TestDefinitionError::MissingField("#3".into(), "output", TestKind::Io)
        );

        let entry = TestEntry {
            name: Some("checker".into()),
            kind: Some(TestKind::Script),
            ..Default::default()
        };
        let err = TestCase::from_entry(0, entry).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Test #1 (checker): missing field 'script' required by type 'script'"
        );
    }

    #[test]
    fn document_ignore_is_inherited() {
        let yaml = r#"
ignore: [punctuation, case]
tests:
  - output: "a, b"
  - output: "c"
    ignore: whites
  - type: script
    script: check.py
    files: data.txt extra.txt
"#;
        let suite: TestDocument = serde_yaml::from_str(yaml).unwrap();
        let cases = suite.into_cases().unwrap();
        assert_eq!(cases.len(), 3);
        let first = io(cases[0].clone());
        assert_eq!(first.ignore.names(), vec!["case", "punctuation"]);
        let second = io(cases[1].clone());
        assert_eq!(second.ignore.names(), vec!["whites"]);
        assert_eq!(cases[2].kind(), TestKind::Script);
        assert_eq!(cases[2].files(), &["data.txt", "extra.txt"]);
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let json = r#"{"tests": [{"output": "x", "ignore": ["case", "colors"]}]}"#;
        let suite: TestDocument = serde_json::from_str(json).unwrap();
        let err = suite.into_cases().unwrap_err();
        assert!(matches!(err, TestDefinitionError::UnknownOperator(..)));
    }

    #[test]
    fn unknown_type_fails_to_parse() {
        let res: Result<TestDocument, _> =
            serde_json::from_str(r#"{"tests": [{"type": "unit", "output": "x"}]}"#);
        assert!(res.is_err());
    }
}
