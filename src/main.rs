use std::{io::Read, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use modl::{EvaluationContext, FileSystemLoader};

#[derive(Parser)]
#[command(name = "modl", version, about = "Runs a modl program")]
struct Cli {
    /// Program to run (use '-' or leave out to read from stdin)
    #[arg(value_name = "SCRIPT")]
    script: Option<PathBuf>,

    /// Directory `use` paths are resolved against. Defaults to the
    /// directory of the script, or the working directory.
    #[arg(long, value_name = "DIR")]
    module_root: Option<PathBuf>,

    /// Do not load the bundled prelude before the program
    #[arg(long)]
    no_prelude: bool,
}

/// Installs a stderr subscriber, but only when `RUST_LOG` asks for one.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn read_program(script: Option<&PathBuf>) -> anyhow::Result<String> {
    match script {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display())),
        _ => {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source).context("cannot read program from stdin")?;
            Ok(source)
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let source = read_program(cli.script.as_ref())?;
    let module_root = cli.module_root.clone().unwrap_or_else(|| {
        cli.script.as_ref()
            .filter(|path| path.as_os_str() != "-")
            .and_then(|path| path.parent())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let mut context = EvaluationContext::new().with_loader(FileSystemLoader::new(module_root));
    if !cli.no_prelude {
        context = context.with_prelude()?;
    }

    context.evaluate_str(&source)?;
    Ok(())
}
