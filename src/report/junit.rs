use super::types::Report;
use crate::runner::state::{ScenarioResult, Severity};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

/// Generate JUnit XML, one test case per recorded step result
pub fn generate_junit_xml(report: &Report) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let total = report.steps.len();
    let failures = report.steps.iter().filter(|r| !r.succeeded).count();

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "leaderboard-probe"));
    suites_start.push_attribute(("tests", total.to_string().as_str()));
    suites_start.push_attribute(("failures", failures.to_string().as_str()));
    writer.write_event(Event::Start(suites_start))?;

    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", report.target_url.as_str()));
    suite_start.push_attribute(("tests", total.to_string().as_str()));
    suite_start.push_attribute(("failures", failures.to_string().as_str()));
    suite_start.push_attribute(("skipped", "0"));
    suite_start.push_attribute(("id", report.session_id.as_str()));
    suite_start.push_attribute(("timestamp", report.started_at.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    write_properties(&mut writer, report)?;

    for result in &report.steps {
        write_test_case(&mut writer, result)?;
    }

    let errors: Vec<String> = report
        .console
        .iter()
        .filter(|e| e.severity == Severity::Error)
        .map(|e| format!("[{}] {}", e.timestamp, e.message))
        .collect();
    if !errors.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("system-err")))?;
        writer.write_event(Event::Text(BytesText::new(&errors.join("\n"))))?;
        writer.write_event(Event::End(BytesEnd::new("system-err")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn write_properties<W: std::io::Write>(writer: &mut Writer<W>, report: &Report) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("properties")))?;
    let props = [
        ("verdict", report.verdict.to_string()),
        ("errorTolerance", report.error_tolerance.to_string()),
        ("consoleErrors", report.summary.console_errors.to_string()),
        ("clickSuccesses", report.summary.click_successes.to_string()),
    ];
    for (name, value) in &props {
        let mut prop = BytesStart::new("property");
        prop.push_attribute(("name", *name));
        prop.push_attribute(("value", value.as_str()));
        writer.write_event(Event::Empty(prop))?;
    }
    writer.write_event(Event::End(BytesEnd::new("properties")))?;
    Ok(())
}

fn write_test_case<W: std::io::Write>(writer: &mut Writer<W>, result: &ScenarioResult) -> Result<()> {
    let classname = format!("leaderboard_probe.{:?}", result.kind);

    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", result.step_name.as_str()));
    case_start.push_attribute(("classname", classname.as_str()));

    if result.succeeded {
        writer.write_event(Event::Empty(case_start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(case_start))?;

    let message = result.detail.as_deref().unwrap_or("Unknown error");
    let mut fail_start = BytesStart::new("failure");
    fail_start.push_attribute(("message", message));
    fail_start.push_attribute(("type", result.error_kind.as_deref().unwrap_or("Error")));
    writer.write_event(Event::Start(fail_start))?;
    writer.write_event(Event::Text(BytesText::new(message)))?;
    writer.write_event(Event::End(BytesEnd::new("failure")))?;

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write `junit.xml` to an exact path
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    let xml = generate_junit_xml(report)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, xml)?;
    log::info!("JUnit report saved to: {}", path.display());
    Ok(())
}
