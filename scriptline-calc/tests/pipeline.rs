use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use scriptline::keys::compile;
use scriptline::{
    CacheKey, CancellationToken, DependencyBridge, NamedFragment, Position,
    Range, ResolvingConfigurator, ResolvingRestrictions, RestrictionRule,
    ScriptCompiler, ScriptSource, ScriptSourceFragments, Severity, flatten_classpath,
};
use scriptline_calc::interpreter::Value;
use scriptline_calc::{
    CalcBackend, FileResolver, HostOptions, OutputSink, compile_configuration,
    evaluation_configuration, scripting_host,
};
use tempfile::tempdir;

fn messages(reports: &[scriptline::Diagnostic]) -> Vec<(Severity, &str)> {
    reports
        .iter()
        .map(|report| (report.severity, report.message.as_str()))
        .collect()
}

#[tokio::test]
async fn evaluates_output_and_value() {
    let host = scripting_host(&HostOptions::default());
    let output = OutputSink::captured();

    let result = host
        .eval(
            compile_configuration(
                ScriptSource::from_text("let a = 6\nprintln(a * 7)\na + 1\n"),
                Vec::new(),
            ),
            evaluation_configuration(output.clone()),
        )
        .await;

    assert!(result.is_success(), "{:?}", result.reports());
    assert!(result.reports().is_empty());
    let value = result.into_value().unwrap().value.unwrap();
    assert_eq!(value.downcast_ref::<Value>(), Some(&Value::Integer(7)));
    assert_eq!(output.contents(), "42\n");
}

#[tokio::test]
async fn repository_and_depends_on_grow_the_classpath() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("vendor")).unwrap();
    fs::write(dir.path().join("vendor/greet.calc"), "let greeting = \"hi\"\n").unwrap();

    let bridge = DependencyBridge::new(Arc::new(FileResolver)).with_environment(
        [("SCRIPT_DIR".to_string(), dir.path().display().to_string())].into(),
    );
    let configurator = ResolvingConfigurator::new(bridge);
    let compiler = ScriptCompiler::new(Arc::new(CalcBackend));

    let result = compiler
        .compile(
            compile_configuration(
                ScriptSource::from_text(
                    "@repository(\"vendor\")\n@depends_on(\"greet.calc\")\nprintln(greeting)\n",
                ),
                Vec::new(),
            ),
            Some(&configurator),
        )
        .await;

    assert!(result.is_success(), "{:?}", result.reports());
    let script = result.into_value().unwrap();
    let classpath =
        flatten_classpath(script.configuration().get::<Vec<_>>(compile::DEPENDENCIES));
    assert_eq!(classpath, vec![dir.path().join("vendor/greet.calc")]);
    assert_eq!(
        script.configuration().get(compile::IMPORTED_PACKAGES),
        &vec!["greet".to_string()]
    );
}

#[tokio::test]
async fn warnings_precede_runtime_errors() {
    let host = scripting_host(&HostOptions::default());
    let output = OutputSink::captured();

    let result = host
        .eval(
            compile_configuration(
                ScriptSource::from_text("let unused = 1\nprintln(\"before\")\n1 / 0\n"),
                Vec::new(),
            ),
            evaluation_configuration(output.clone()),
        )
        .await;

    assert!(result.is_failure());
    assert_eq!(
        messages(result.reports()),
        vec![
            (Severity::Warning, "variable `unused` is never used"),
            (Severity::Error, "division by zero"),
        ]
    );
    assert_eq!(output.contents(), "before\n");
}

#[tokio::test]
async fn werror_fails_before_running() {
    let host = scripting_host(&HostOptions::default());
    let output = OutputSink::captured();

    let result = host
        .eval(
            compile_configuration(
                ScriptSource::from_text("let unused = 1\nprintln(1)\n"),
                Vec::new(),
            )
            .with(compile::COMPILER_OPTIONS, vec!["-Werror".to_string()]),
            evaluation_configuration(output.clone()),
        )
        .await;

    assert!(result.is_failure());
    assert_eq!(
        messages(result.reports()),
        vec![(Severity::Error, "variable `unused` is never used")]
    );
    assert!(output.contents().is_empty());
}

#[tokio::test]
async fn restricted_println_fails_compilation() {
    let host = scripting_host(&HostOptions::default());

    let result = host
        .eval(
            compile_configuration(ScriptSource::from_text("println(1)"), Vec::new()).with(
                compile::RESTRICTIONS,
                ResolvingRestrictions::new(vec![RestrictionRule::deny("println")]),
            ),
            evaluation_configuration(OutputSink::captured()),
        )
        .await;

    assert!(result.is_failure());
    assert_eq!(
        messages(result.reports()),
        vec![(Severity::Error, "access to `println` is restricted")]
    );
}

#[tokio::test]
async fn cached_scripts_are_reused() {
    let host = scripting_host(&HostOptions {
        script_dir: None,
        cache: true,
    });
    let configuration =
        compile_configuration(ScriptSource::from_text("println(3)"), Vec::new());
    let output = OutputSink::captured();

    for _ in 0..2 {
        let result = host
            .eval(configuration.clone(), evaluation_configuration(output.clone()))
            .await;
        assert!(result.is_success());
    }

    let key = CacheKey::of(configuration.get(compile::SOURCE_FRAGMENTS));
    assert!(host.compiler().cache().get(&key).is_some());
    assert_eq!(output.contents(), "3\n3\n");
}

#[tokio::test]
async fn only_fragments_are_compiled() {
    let text = "println(1)\nnot valid (\nprintln(2)\n";
    let fragment = |line: usize, start: usize, end: usize| {
        NamedFragment::new(
            None,
            Range::new(
                Position::with_offset(line, 1, start),
                Position::with_offset(line + 1, 1, end),
            ),
        )
    };
    let fragments = ScriptSourceFragments::new(
        ScriptSource::from_text(text),
        vec![fragment(1, 0, 11), fragment(3, 23, 34)],
    );
    let host = scripting_host(&HostOptions::default());
    let output = OutputSink::captured();

    let result = host
        .eval(
            compile_configuration(fragments.source.clone(), Vec::new())
                .with(compile::SOURCE_FRAGMENTS, fragments),
            evaluation_configuration(output.clone()),
        )
        .await;

    assert!(result.is_success(), "{:?}", result.reports());
    assert_eq!(output.contents(), "1\n2\n");
}

#[tokio::test]
async fn parse_errors_point_into_the_script() {
    let host = scripting_host(&HostOptions::default());

    let result = host
        .eval(
            compile_configuration(ScriptSource::from_text("1\nlet x = (\n"), Vec::new()),
            evaluation_configuration(OutputSink::captured()),
        )
        .await;

    assert!(result.is_failure());
    let location = result.reports()[0].location.unwrap();
    assert_eq!(location.start.line, 2);
}

#[tokio::test]
async fn cancelled_evaluation_never_compiles() {
    let host = scripting_host(&HostOptions::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = host
        .eval_cancellable(
            compile_configuration(ScriptSource::from_text("println(1)"), Vec::new()),
            evaluation_configuration(OutputSink::captured()),
            &cancel,
        )
        .await;

    assert_eq!(
        messages(result.reports()),
        vec![(Severity::Error, "cancelled during refinement")]
    );
}

#[tokio::test]
async fn stdlib_paths_are_loaded_from_the_configuration() {
    let dir = tempdir().unwrap();
    let library: PathBuf = dir.path().join("base.calc");
    fs::write(&library, "let base = 100\n").unwrap();
    let host = scripting_host(&HostOptions::default());

    let result = host
        .eval(
            compile_configuration(ScriptSource::from_text("base + 1"), vec![library]),
            evaluation_configuration(OutputSink::captured()),
        )
        .await;

    let value = result.into_value().unwrap().value.unwrap();
    assert_eq!(value.to_string(), "101");
}
