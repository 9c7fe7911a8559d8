use clap::Parser;
use ecmalite::{Engine, EngineConfig, EngineError};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ecmalite", version, about = "An ES5 interpreter")]
struct Cli {
    /// Script files, run in order in one realm
    files: Vec<PathBuf>,

    /// Evaluate inline source after the files
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// Nested calls allowed before a RangeError
    #[arg(long, default_value_t = EngineConfig::default().max_call_depth)]
    max_call_depth: usize,

    /// Allocations between garbage collections (0 disables automatic collection)
    #[arg(long, default_value_t = EngineConfig::default().gc_threshold)]
    gc_threshold: usize,

    /// Leave out escape, unescape, substr, getYear, setYear and toGMTString
    #[arg(long)]
    no_annex_b: bool,
}

impl Cli {
    fn config(&self) -> EngineConfig {
        EngineConfig {
            max_call_depth: self.max_call_depth,
            gc_threshold: self.gc_threshold,
            annex_b: !self.no_annex_b,
            print: true,
        }
    }
}

fn run_file(engine: &mut Engine, path: &Path) -> Result<(), EngineError> {
    let source = std::fs::read_to_string(path).inspect_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "cannot read script");
    })?;
    tracing::debug!(path = %path.display(), bytes = source.len(), "running script");
    engine.eval(&source).map(drop)
}

fn report(e: &EngineError) {
    match e {
        EngineError::Syntax(_) => eprintln!("Uncaught {e}"),
        _ => eprintln!("{e}"),
    }
}

fn run_repl(engine: &mut Engine) -> ExitCode {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("ecmalite v{}", env!("CARGO_PKG_VERSION"));
    println!("Type ES5 statements. Press Ctrl-D to exit.");

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match engine.eval(trimmed) {
                    Ok(v) => println!("{}", engine.display(&v)),
                    Err(e) => report(&e),
                }
            }
            Err(e) => {
                eprintln!("Read error: {e}");
                return ExitCode::from(1);
            }
        }
    }

    println!();
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    use tracing_subscriber::{EnvFilter, fmt};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let mut engine = Engine::with_config(cli.config());

    if cli.files.is_empty() && cli.eval.is_none() {
        return run_repl(&mut engine);
    }

    let mut result = Ok(());
    for path in &cli.files {
        result = run_file(&mut engine, path);
        if result.is_err() {
            break;
        }
    }
    if result.is_ok()
        && let Some(code) = &cli.eval
    {
        result = engine.eval(code).map(|v| println!("{}", engine.display(&v)));
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::from(1)
        }
    }
}
