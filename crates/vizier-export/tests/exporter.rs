//! End-to-end export tests against a real interpreter.
//!
//! These tests need a Python 3 interpreter on PATH and skip themselves
//! when none is found.

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use vizier_core::kernel::find_interpreter;
use vizier_core::{CodeCell, Document, Error, ExecutionStatus, ParameterQuoting, ParameterSet};
use vizier_export::{Exporter, ExporterConfig, TemplateKind};

fn basic_config() -> ExporterConfig {
    ExporterConfig {
        template: TemplateKind::Basic,
        warm_up: false,
        ..Default::default()
    }
}

fn start_exporter(config: ExporterConfig) -> Option<Exporter> {
    if find_interpreter(None).is_err() {
        eprintln!("skipping: no Python interpreter on PATH");
        return None;
    }
    Some(Exporter::new(config).expect("exporter should start"))
}

fn write_script(dir: &Path, name: &str, source: &str) -> std::path::PathBuf {
    let path = dir.join(format!("{}.py", name));
    fs::write(&path, source).unwrap();
    path
}

fn params(json: &str) -> ParameterSet {
    ParameterSet::from_json(json).unwrap()
}

#[test]
fn test_custom_visualization_output() {
    let Some(mut exporter) = start_exporter(basic_config()) else { return };

    let p = params(r#"{"x": 2}"#);
    let mut doc = Document::new();
    doc.bind_variables(p.clone())
        .append(CodeCell::from_parameters(&p, ParameterQuoting::Verbatim))
        .append(CodeCell::from_lines(["print(variables.get('x'))"]));

    let html = exporter.generate_html(&mut doc).unwrap();
    assert!(html.contains("<pre>2\n</pre>"));
    assert!(!html.contains("output_error"));
}

#[test]
fn test_render_script_with_parameters() {
    let Some(mut exporter) = start_exporter(basic_config()) else { return };
    let temp = TempDir::new().unwrap();
    let script = write_script(
        temp.path(),
        "echo",
        "print(source)\nprint(variables.get('target_lambda'))\n",
    );

    let rendered = exporter
        .render(
            &params(r#"{"source": "data.csv", "target_lambda": "lambda x: x"}"#),
            &script,
        )
        .unwrap();

    assert_eq!(rendered.status, ExecutionStatus::Succeeded);
    assert!(rendered.html.contains("data.csv"));
    assert!(rendered.html.contains("lambda x: x"));
    assert!(!rendered.html.contains("is not defined"));
    assert!(!rendered.html.contains("output_error"));
    assert_eq!(rendered.document.len(), 2);
}

#[test]
fn test_missing_script_fails_before_execution() {
    let Some(mut exporter) = start_exporter(basic_config()) else { return };

    let err = exporter
        .render(&params("{}"), Path::new("/nonexistent/roc.py"))
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err.core(), Some(Error::NotFound { .. })));
}

#[test]
fn test_error_is_rendered_not_raised() {
    let Some(mut exporter) = start_exporter(basic_config()) else { return };
    let temp = TempDir::new().unwrap();
    let script = write_script(temp.path(), "broken", "print(undefined_thing)\n");

    let rendered = exporter.render(&params("{}"), &script).unwrap();

    assert!(matches!(rendered.status, ExecutionStatus::Failed { cell: 1, .. }));
    assert!(rendered.html.contains("output_error"));
    assert!(rendered.html.contains("NameError"));
}

#[test]
fn test_timeout_halts_remaining_cells() {
    let config = ExporterConfig {
        timeout: Duration::from_secs(1),
        ..basic_config()
    };
    let Some(mut exporter) = start_exporter(config) else { return };

    let mut doc = Document::new();
    doc.append(CodeCell::new("import time\ntime.sleep(30)"))
        .append(CodeCell::new("print('never-printed')"));

    let html = exporter.generate_html(&mut doc).unwrap();
    assert!(doc.execution_status().is_some_and(ExecutionStatus::is_timeout));
    assert!(html.contains("TimeoutError"));
    assert!(!html.contains("never-printed\n"));
}

#[test]
fn test_export_is_repeatable_on_shared_session() {
    let Some(mut exporter) = start_exporter(basic_config()) else { return };
    let temp = TempDir::new().unwrap();
    let script = write_script(temp.path(), "sum", "print(sum(range(int(n))))\n");
    let p = params(r#"{"n": 10}"#);

    let first = exporter.render(&p, &script).unwrap();
    let second = exporter.render(&p, &script).unwrap();

    // Execution counts advance on a shared session; outputs do not change
    assert!(first.html.contains("<pre>45\n</pre>"));
    assert!(second.html.contains("<pre>45\n</pre>"));
}

#[test]
fn test_deterministic_across_fresh_exporters() {
    let Some(mut first) = start_exporter(basic_config()) else { return };
    let mut second = Exporter::new(basic_config()).unwrap();
    let temp = TempDir::new().unwrap();
    let script = write_script(temp.path(), "stable", "print(sorted(variables))\n");
    let p = params(r#"{"b": "1", "a": true}"#);

    let html_a = first.render(&p, &script).unwrap().html;
    let html_b = second.render(&p, &script).unwrap().html;
    assert_eq!(html_a, html_b);
}

#[test]
fn test_isolation_resets_between_documents() {
    let config = ExporterConfig {
        isolate: true,
        ..basic_config()
    };
    let Some(mut exporter) = start_exporter(config) else { return };

    let mut first = Document::new();
    first.append(CodeCell::new("leaked = 1"));
    exporter.generate_html(&mut first).unwrap();

    let mut second = Document::new();
    second.append(CodeCell::new("print(leaked)"));
    let html = exporter.generate_html(&mut second).unwrap();
    assert!(html.contains("output_error"));
}

#[test]
fn test_kernel_restarts_after_shutdown() {
    let Some(mut exporter) = start_exporter(basic_config()) else { return };
    exporter.shutdown();

    let mut doc = Document::new();
    doc.append(CodeCell::new("print('back')"));
    let html = exporter.generate_html(&mut doc).unwrap();
    assert!(html.contains("back"));
}

#[test]
fn test_full_template_is_standalone_page() {
    let config = ExporterConfig {
        template: TemplateKind::Full,
        ..basic_config()
    };
    let Some(mut exporter) = start_exporter(config) else { return };

    let mut doc = Document::new();
    doc.append(CodeCell::new("print('page')"));
    let html = exporter.generate_html(&mut doc).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<script"));
}

#[test]
fn test_bad_templates_dir_fails_fast() {
    let temp = TempDir::new().unwrap();
    let config = ExporterConfig {
        templates_dir: Some(temp.path().to_path_buf()),
        ..basic_config()
    };

    // Fails during template loading, so no interpreter is needed
    match Exporter::new(config) {
        Err(err) => assert!(matches!(err.core(), Some(Error::TemplateNotFound(_)))),
        Ok(_) => panic!("Expected missing templates to fail"),
    }
}
