//! Integration tests for document execution.
//!
//! These tests need a Python 3 interpreter on PATH and skip themselves
//! when none is found.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use vizier_core::kernel::find_interpreter;
use vizier_core::{
    CellOutput, CodeCell, Document, DocumentState, ExecutePreprocessor, ExecutionCallback,
    ExecutionStatus, FailureKind, KernelConfig, KernelSession, ParameterQuoting, ParameterSet,
};

fn start_kernel() -> Option<KernelSession> {
    if find_interpreter(None).is_err() {
        eprintln!("skipping: no Python interpreter on PATH");
        return None;
    }
    Some(KernelSession::start(KernelConfig::default()).expect("kernel should start"))
}

fn preprocessor() -> ExecutePreprocessor {
    ExecutePreprocessor::new(Duration::from_secs(30))
}

fn params_doc(json: &str, script: &str) -> Document {
    let params = ParameterSet::from_json(json).unwrap();
    let mut doc = Document::new();
    doc.append(CodeCell::from_parameters(&params, ParameterQuoting::Verbatim))
        .append(CodeCell::new(script));
    doc
}

#[test]
fn test_parameters_are_visible_to_script() {
    let Some(mut kernel) = start_kernel() else { return };
    let mut doc = params_doc(r#"{"source": "data.csv"}"#, "print(source)");

    let status = preprocessor().preprocess(&mut doc, &mut kernel).unwrap();

    assert_eq!(status, ExecutionStatus::Succeeded);
    assert_eq!(doc.state(), &DocumentState::Executed(ExecutionStatus::Succeeded));
    assert_eq!(doc.cells()[1].outputs, vec![CellOutput::stdout("data.csv\n")]);
    assert!(doc.cells().iter().all(|c| c.execution_count.is_some()));
}

#[test]
fn test_structured_parameters_bind() {
    let Some(mut kernel) = start_kernel() else { return };
    let mut doc = params_doc(r#"{"cfg": {"a": 1}, "xs": [1, 2]}"#, "print(cfg)\nprint(xs)");

    let status = preprocessor().preprocess(&mut doc, &mut kernel).unwrap();

    assert_eq!(status, ExecutionStatus::Succeeded);
    assert_eq!(
        doc.cells()[1].outputs,
        vec![CellOutput::stdout("{'a': 1}\n[1, 2]\n")]
    );
}

#[test]
fn test_empty_document_executes() {
    let Some(mut kernel) = start_kernel() else { return };
    let mut doc = Document::new();

    let status = preprocessor().preprocess(&mut doc, &mut kernel).unwrap();
    assert!(status.is_success());
    assert!(doc.is_executed());
}

#[test]
fn test_error_stops_later_cells() {
    let Some(mut kernel) = start_kernel() else { return };
    let mut doc = Document::new();
    doc.append(CodeCell::new("raise ValueError('bad input')"))
        .append(CodeCell::new("print('unreachable')"));

    let status = preprocessor().preprocess(&mut doc, &mut kernel).unwrap();

    match status {
        ExecutionStatus::Failed {
            cell: 0,
            failure: FailureKind::Error { ename, evalue },
        } => {
            assert_eq!(ename, "ValueError");
            assert_eq!(evalue, "bad input");
        }
        other => panic!("Expected error at cell 0, got {:?}", other),
    }
    assert!(doc.cells()[0].has_error());
    assert!(doc.cells()[1].outputs.is_empty());
    assert!(doc.cells()[1].execution_count.is_none());
}

#[test]
fn test_allow_errors_continues() {
    let Some(mut kernel) = start_kernel() else { return };
    let mut doc = Document::new();
    doc.append(CodeCell::new("1 / 0"))
        .append(CodeCell::new("print('still running')"));

    let status = preprocessor()
        .allow_errors(true)
        .preprocess(&mut doc, &mut kernel)
        .unwrap();

    assert!(matches!(status, ExecutionStatus::Failed { cell: 0, .. }));
    assert_eq!(doc.cells()[1].outputs, vec![CellOutput::stdout("still running\n")]);
}

#[test]
fn test_timeout_halts_document() {
    let Some(mut kernel) = start_kernel() else { return };
    let mut doc = Document::new();
    doc.append(CodeCell::new("import time\ntime.sleep(60)"))
        .append(CodeCell::new("print('later cell')"));

    let status = ExecutePreprocessor::new(Duration::from_secs(1))
        .preprocess(&mut doc, &mut kernel)
        .unwrap();

    assert!(status.is_timeout());
    assert!(matches!(
        status,
        ExecutionStatus::Failed {
            cell: 0,
            failure: FailureKind::Timeout { seconds: 1 }
        }
    ));
    match doc.cells()[0].outputs.last() {
        Some(CellOutput::Error { ename, .. }) => assert_eq!(ename, "TimeoutError"),
        other => panic!("Expected timeout error output, got {:?}", other),
    }
    assert!(doc.cells()[1].outputs.is_empty());
}

#[test]
fn test_variables_binding() {
    let Some(mut kernel) = start_kernel() else { return };
    let params = ParameterSet::from_json(r#"{"x": 2}"#).unwrap();
    let mut doc = Document::new();
    doc.bind_variables(params.clone())
        .append(CodeCell::from_parameters(&params, ParameterQuoting::Verbatim))
        .append(CodeCell::from_lines(["print(variables.get('x'))", "print(x)"]));

    let status = preprocessor().preprocess(&mut doc, &mut kernel).unwrap();
    assert!(status.is_success());
    assert_eq!(doc.cells()[1].outputs, vec![CellOutput::stdout("2\n2\n")]);
}

#[test]
fn test_execution_is_deterministic_across_fresh_kernels() {
    let Some(mut first) = start_kernel() else { return };
    let mut second = KernelSession::start(KernelConfig::default()).unwrap();

    let mut doc_a = params_doc(r#"{"n": 5}"#, "print(sum(range(int(n))))\nsorted({'b': 1, 'a': 2})");
    let mut doc_b = doc_a.clone();

    preprocessor().preprocess(&mut doc_a, &mut first).unwrap();
    preprocessor().preprocess(&mut doc_b, &mut second).unwrap();

    let outputs_a: Vec<_> = doc_a.cells().iter().map(|c| c.outputs.clone()).collect();
    let outputs_b: Vec<_> = doc_b.cells().iter().map(|c| c.outputs.clone()).collect();
    assert_eq!(outputs_a, outputs_b);
}

#[test]
fn test_re_execution_replaces_outputs() {
    let Some(mut kernel) = start_kernel() else { return };
    let mut doc = params_doc("{}", "print('once')");

    preprocessor().preprocess(&mut doc, &mut kernel).unwrap();
    preprocessor().preprocess(&mut doc, &mut kernel).unwrap();

    assert_eq!(doc.cells()[1].outputs, vec![CellOutput::stdout("once\n")]);
}

#[test]
fn test_state_leaks_across_documents_on_shared_session() {
    let Some(mut kernel) = start_kernel() else { return };

    let mut first = params_doc(r#"{"shared": "from first"}"#, "pass");
    preprocessor().preprocess(&mut first, &mut kernel).unwrap();

    let mut second = Document::new();
    second.append(CodeCell::new("print(shared)"));
    preprocessor().preprocess(&mut second, &mut kernel).unwrap();

    assert_eq!(second.cells()[0].outputs, vec![CellOutput::stdout("from first\n")]);
}

#[derive(Default, Clone)]
struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl ExecutionCallback for Recorder {
    fn on_cell_started(&self, index: usize, _source: &str) {
        self.events.lock().unwrap().push(format!("start {}", index));
    }

    fn on_cell_completed(&self, index: usize, _elapsed: Duration) {
        self.events.lock().unwrap().push(format!("done {}", index));
    }

    fn on_cell_error(&self, index: usize, _failure: &FailureKind) {
        self.events.lock().unwrap().push(format!("error {}", index));
    }
}

#[test]
fn test_callback_sees_every_cell() {
    let Some(mut kernel) = start_kernel() else { return };
    let recorder = Recorder::default();
    let mut doc = Document::new();
    doc.append(CodeCell::new("x = 1"))
        .append(CodeCell::new("x.missing"));

    preprocessor()
        .with_callback(recorder.clone())
        .preprocess(&mut doc, &mut kernel)
        .unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["start 0", "done 0", "start 1", "error 1"]
    );
}
