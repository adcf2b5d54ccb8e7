use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::BufRead;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("malformed report: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed report attribute: {0}")]
    Attribute(#[from] AttrError),
    #[error("report ends inside <{0}>")]
    Unbalanced(String),
}

/// Link between a flat test identity and a node of the report tree:
/// `<module>.<testcase>` paired with `<testcase>.<test>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    pub module_case: String,
    pub case_test: String,
}

impl CorrelationKey {
    pub fn new(module: &str, testcase: &str, test: &str) -> Self {
        Self {
            module_case: format!("{}.{}", module, testcase),
            case_test: format!("{}.{}", testcase, test),
        }
    }

    /// Key of a test record with suite `<prefix>/<abi>.<module>` and name
    /// `<testcase>.<test>`.
    ///
    /// The module is the last dot-separated segment of the suite, the test
    /// case everything before the first dot of the name. A name without a
    /// dot has no key.
    pub fn from_record(suite: &str, name: &str) -> Option<Self> {
        let module = suite.rsplit('.').next().unwrap_or(suite);
        let (testcase, test) = name.split_once('.')?;
        Some(Self::new(module, testcase, test))
    }
}

struct PendingFailure {
    message: Option<String>,
    stack_trace: Option<String>,
}

impl PendingFailure {
    fn into_detail(self) -> String {
        self.stack_trace.or(self.message).unwrap_or_default()
    }
}

/// Failure detail of every failed test in a structured report.
#[derive(Debug, Default)]
pub struct ReportIndex {
    failures: HashMap<CorrelationKey, String>,
}

impl ReportIndex {
    pub fn parse<R: BufRead>(report: R) -> Result<Self, ReportError> {
        let mut reader = Reader::from_reader(report);
        let mut buf = Vec::new();
        let mut open: Vec<String> = Vec::new();
        let mut failures = HashMap::new();

        let mut module: Option<String> = None;
        let mut testcase: Option<String> = None;
        let mut test: Option<String> = None;
        let mut failure: Option<PendingFailure> = None;
        let mut in_stack_trace = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(element) => {
                    match element.name().as_ref() {
                        b"Module" => module = attribute(&element, b"name")?,
                        b"TestCase" => testcase = attribute(&element, b"name")?,
                        b"Test" => test = attribute(&element, b"name")?,
                        b"Failure" => {
                            failure = Some(PendingFailure {
                                message: attribute(&element, b"message")?,
                                stack_trace: None,
                            })
                        }
                        b"StackTrace" => {
                            in_stack_trace = true;
                            if let Some(failure) = failure.as_mut() {
                                failure.stack_trace.get_or_insert_with(String::new);
                            }
                        }
                        _ => {}
                    }
                    open.push(String::from_utf8_lossy(element.name().as_ref()).into_owned());
                }
                Event::Empty(element) => {
                    if element.name().as_ref() == b"Failure" {
                        let pending = PendingFailure {
                            message: attribute(&element, b"message")?,
                            stack_trace: None,
                        };
                        if let Some(key) = current_key(&module, &testcase, &test) {
                            failures.insert(key, pending.into_detail());
                        }
                    }
                }
                Event::Text(text) if in_stack_trace => {
                    if let Some(trace) = failure.as_mut().and_then(|f| f.stack_trace.as_mut()) {
                        trace.push_str(&text.unescape().map_err(quick_xml::Error::from)?);
                    }
                }
                Event::CData(data) if in_stack_trace => {
                    if let Some(trace) = failure.as_mut().and_then(|f| f.stack_trace.as_mut()) {
                        trace.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::End(element) => {
                    open.pop();
                    match element.name().as_ref() {
                        b"StackTrace" => in_stack_trace = false,
                        b"Failure" => {
                            if let (Some(pending), Some(key)) =
                                (failure.take(), current_key(&module, &testcase, &test))
                            {
                                failures.insert(key, pending.into_detail());
                            }
                        }
                        b"Test" => test = None,
                        b"TestCase" => testcase = None,
                        b"Module" => module = None,
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(unclosed) = open.pop() {
            return Err(ReportError::Unbalanced(unclosed));
        }
        Ok(Self { failures })
    }

    pub fn failure(&self, key: &CorrelationKey) -> Option<&str> {
        self.failures.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, ReportError> {
    match element.try_get_attribute(name)? {
        Some(attribute) => Ok(Some(
            attribute
                .unescape_value()
                .map_err(quick_xml::Error::from)?
                .into_owned(),
        )),
        None => Ok(None),
    }
}

fn current_key(
    module: &Option<String>,
    testcase: &Option<String>,
    test: &Option<String>,
) -> Option<CorrelationKey> {
    match (module, testcase, test) {
        (Some(module), Some(testcase), Some(test)) => Some(CorrelationKey::new(module, testcase, test)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::service::tests::XML_RESULTS;

    #[test]
    fn indexes_failed_tests_only() {
        let index = ReportIndex::parse(XML_RESULTS.as_bytes()).unwrap();
        assert_eq!(index.len(), 1);
        let trace = index
            .failure(&CorrelationKey::new("module_foo", "TestCaseBar", "test_bar4"))
            .unwrap();
        assert!(trace.starts_with("java.lang.Error:\nat org.junit.Assert.fail"));
        assert!(index
            .failure(&CorrelationKey::new("module_foo", "TestCaseBar", "test_bar3"))
            .is_none());
    }

    #[test]
    fn failure_without_stack_trace_uses_message() {
        let report = r#"<Result><Module name="m"><TestCase name="C">
            <Test result="fail" name="t1"><Failure message="boom" /></Test>
            <Test result="fail" name="t2"><Failure message="bang"></Failure></Test>
        </TestCase></Module></Result>"#;
        let index = ReportIndex::parse(report.as_bytes()).unwrap();
        assert_eq!(index.failure(&CorrelationKey::new("m", "C", "t1")), Some("boom"));
        assert_eq!(index.failure(&CorrelationKey::new("m", "C", "t2")), Some("bang"));
    }

    #[test]
    fn stack_trace_entities_are_unescaped() {
        let report = r#"<Result><Module name="m"><TestCase name="C"><Test name="t">
            <Failure message="x"><StackTrace>expected:&lt;1&gt; but was:&lt;2&gt;</StackTrace></Failure>
        </Test></TestCase></Module></Result>"#;
        let index = ReportIndex::parse(report.as_bytes()).unwrap();
        assert_eq!(
            index.failure(&CorrelationKey::new("m", "C", "t")),
            Some("expected:<1> but was:<2>")
        );
    }

    #[test]
    fn empty_report_has_no_failures() {
        let index = ReportIndex::parse("".as_bytes()).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn truncated_report_is_an_error() {
        let truncated = &XML_RESULTS[..XML_RESULTS.find("</TestCase>").unwrap()];
        assert!(ReportIndex::parse(truncated.as_bytes()).is_err());
    }

    #[test]
    fn record_key_uses_last_suite_segment_and_first_name_dot() {
        let key = CorrelationKey::from_record("cts-lkft/arm64-v8a.module_foo", "TestCaseBar.test_bar4").unwrap();
        assert_eq!(key, CorrelationKey::new("module_foo", "TestCaseBar", "test_bar4"));

        let dotted = CorrelationKey::from_record("cts-lkft/arm64-v8a.CtsApp.sub", "Case.test.param").unwrap();
        assert_eq!(dotted.module_case, "sub.Case");
        assert_eq!(dotted.case_test, "Case.test.param");

        assert!(CorrelationKey::from_record("cts-lkft/arm64-v8a.module_foo", "no_dot").is_none());
    }
}
