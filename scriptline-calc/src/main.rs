use std::path::{Path, PathBuf};
use std::process;

use clap::Parser as ClapParser;
use scriptline::{Diagnostic, ScriptSource};
use scriptline_calc::{
    HostOptions, OutputSink, compile_configuration, evaluation_configuration,
    scripting_host,
};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Script to execute
    #[arg(required = false, help = "The .calc script to execute")]
    files: Vec<String>,

    /// Library loaded ahead of the script; may be repeated
    #[arg(long = "stdlib", value_name = "PATH", help = "Add a standard library file or directory")]
    stdlib: Vec<PathBuf>,

    /// Keep compiled scripts in memory
    #[arg(long, help = "Cache compiled scripts")]
    cache: bool,
}

/// ` : <message>`, with the cause appended when it adds something.
fn render(diagnostic: &Diagnostic) -> String {
    let mut line = format!(" : {}", diagnostic.message);
    if let Some(cause) = &diagnostic.cause {
        let cause = cause.to_string();
        if cause != diagnostic.message {
            line.push_str(": ");
            line.push_str(&cause);
        }
    }
    line
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .init();

    let cli = Cli::parse();
    let [file] = cli.files.as_slice() else {
        println!("usage: scriptline-calc <script file>");
        return;
    };

    let path = Path::new(file);
    println!("Executing script {}", path.display());

    let source = match ScriptSource::from_path(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error reading script '{}': {}", file, err);
            process::exit(1);
        }
    };
    let options = HostOptions {
        script_dir: std::path::absolute(path)
            .ok()
            .and_then(|absolute| absolute.parent().map(Path::to_path_buf)),
        cache: cli.cache,
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error starting runtime: {}", err);
            process::exit(1);
        }
    };

    let host = scripting_host(&options);
    let result = runtime.block_on(host.eval(
        compile_configuration(source, cli.stdlib),
        evaluation_configuration(OutputSink::Stdout),
    ));

    for diagnostic in result.reports() {
        println!("{}", render(diagnostic));
    }
    if result.has_errors() {
        process::exit(1);
    }
}
