use crate::report::index::{CorrelationKey, ReportIndex};
use crate::run::model::{StoreError, TestRecord};
use std::io::{BufReader, Read};
use tracing::{debug, info, warn};

/// Copy failure detail from a structured report onto matching test records.
///
/// The report is not read at all when `records` is empty. An unreadable
/// report leaves every record untouched. Each matched record is saved
/// individually; returns how many were updated.
pub async fn correlate<R, T>(report: R, records: &mut [T]) -> Result<usize, StoreError>
where
    R: Read + Send,
    T: TestRecord,
{
    if records.is_empty() {
        return Ok(0);
    }
    let index = match ReportIndex::parse(BufReader::new(report)) {
        Ok(index) => index,
        Err(err) => {
            warn!("structured report unusable: {}", err);
            return Ok(0);
        }
    };
    if index.is_empty() {
        debug!("report lists no failures");
        return Ok(0);
    }
    debug!("report lists {} failures", index.len());

    let mut updated = 0;
    for record in records.iter_mut() {
        let Some(key) = CorrelationKey::from_record(record.suite(), record.name()) else {
            continue;
        };
        let Some(detail) = index.failure(&key) else {
            continue;
        };
        record.set_log(detail.to_string());
        record.save().await?;
        updated += 1;
    }
    info!("assigned failure detail to {} of {} tests", updated, records.len());
    Ok(updated)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const XML_RESULTS: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='no' ?>
<Result start="1517218412388" end="1517221873527" suite_name="CTS" suite_version="8.1_r1" suite_plan="cts-lkft" report_version="5.0" command_line_args="cts-lkft -a arm64-v8a --disable-reboot --skip-preconditions --skip-device-info" devices="96B0201601000622">
  <Build build_abis_64="arm64-v8a" build_product="hikey" build_abi="arm64-v8a" build_id="OC-MR1" build_type="userdebug" />
  <Summary pass="3" failed="1" modules_done="1" modules_total="1" />
  <Module name="module_foo" abi="arm64-v8a" runtime="34082" done="true" pass="1">
    <TestCase name="TestCaseBar">
      <Test result="pass" name="test_bar1" />
      <Test result="pass" name="test_bar2" />
      <Test result="pass" name="test_bar3" />
      <Test result="pass" name="test_bar4" >
        <Failure message="java.lang.Error">
          <StackTrace>java.lang.Error:
at org.junit.Assert.fail(Assert.java:88)
</StackTrace>
        </Failure>
      </Test>
    </TestCase>
  </Module>
</Result>
"#;

    pub(crate) struct FakeRecord {
        suite: String,
        name: String,
        pub log: Option<String>,
        pub saves: AtomicUsize,
    }

    impl FakeRecord {
        pub(crate) fn new(suite: &str, name: &str) -> Self {
            Self {
                suite: suite.to_string(),
                name: name.to_string(),
                log: None,
                saves: AtomicUsize::new(0),
            }
        }

        pub(crate) fn save_count(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TestRecord for FakeRecord {
        fn suite(&self) -> &str {
            &self.suite
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn set_log(&mut self, log: String) {
            self.log = Some(log);
        }

        async fn save(&self) -> Result<(), StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn assigns_stack_trace_to_matching_test() {
        let mut records = vec![FakeRecord::new("cts-lkft/arm64-v8a.module_foo", "TestCaseBar.test_bar4")];
        let updated = correlate(XML_RESULTS.as_bytes(), &mut records).await.unwrap();
        assert_eq!(updated, 1);
        assert!(records[0].log.as_deref().unwrap().contains("java.lang.Error"));
        assert_eq!(records[0].save_count(), 1);
    }

    #[tokio::test]
    async fn empty_record_list_leaves_stream_unread() {
        let mut buf = Cursor::new(XML_RESULTS.as_bytes());
        let updated = correlate(&mut buf, &mut Vec::<FakeRecord>::new()).await.unwrap();
        assert_eq!(updated, 0);
        assert_eq!(buf.position(), 0);
    }

    #[tokio::test]
    async fn test_absent_from_report_is_not_saved() {
        let mut records = vec![FakeRecord::new("cts-lkft/arm64-v8a.module_foo", "TestCaseBar.test_bar5")];
        correlate(XML_RESULTS.as_bytes(), &mut records).await.unwrap();
        assert_eq!(records[0].save_count(), 0);
        assert!(records[0].log.is_none());
    }

    #[tokio::test]
    async fn passing_test_is_not_saved() {
        let mut records = vec![FakeRecord::new("cts-lkft/arm64-v8a.module_foo", "TestCaseBar.test_bar1")];
        correlate(XML_RESULTS.as_bytes(), &mut records).await.unwrap();
        assert_eq!(records[0].save_count(), 0);
    }

    #[tokio::test]
    async fn missing_report_is_not_an_error() {
        let mut records = vec![FakeRecord::new("cts-lkft/arm64-v8a.module_foo", "TestCaseBar.test_bar4")];
        let updated = correlate("".as_bytes(), &mut records).await.unwrap();
        assert_eq!(updated, 0);
        assert_eq!(records[0].save_count(), 0);
    }

    #[tokio::test]
    async fn malformed_report_mutates_nothing() {
        let mut records = vec![FakeRecord::new("cts-lkft/arm64-v8a.module_foo", "TestCaseBar.test_bar4")];
        let truncated = &XML_RESULTS[..XML_RESULTS.find("</Module>").unwrap()];
        let updated = correlate(truncated.as_bytes(), &mut records).await.unwrap();
        assert_eq!(updated, 0);
        assert!(records[0].log.is_none());
    }

    #[tokio::test]
    async fn other_module_is_not_saved() {
        let mut records = vec![
            FakeRecord::new("cts-lkft/arm64-v8a.module_foo1", "TestCaseBar.test_bar5"),
            FakeRecord::new("cts-lkft/arm64-v8a.module_foo1", "TestCaseBar.test_bar4"),
        ];
        correlate(XML_RESULTS.as_bytes(), &mut records).await.unwrap();
        assert!(records.iter().all(|record| record.save_count() == 0));
    }

    #[tokio::test]
    async fn dotted_module_name_resolves_to_last_segment() {
        let report = r#"<Result><Module name="CtsApp.sub"><TestCase name="Case">
            <Test name="t"><Failure message="m"><StackTrace>trace</StackTrace></Failure></Test>
        </TestCase></Module></Result>"#;
        let mut records = vec![FakeRecord::new("cts-lkft/arm64-v8a.CtsApp.sub", "Case.t")];
        let updated = correlate(report.as_bytes(), &mut records).await.unwrap();
        assert_eq!(updated, 0);
    }
}
