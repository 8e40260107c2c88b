use std::{env, fs, process::ExitCode};

use miette::{IntoDiagnostic, Report, Result, WrapErr, miette};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scuttle_columns::{ColumnSet, DefaultsValidator, NameAndType};

const USAGE: &str = "usage: coldesc <schema-file> [--flatten]";

fn main() -> Result<ExitCode> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(false)
                .context_lines(3)
                .tab_width(4)
                .break_words(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    miette::set_panic_hook();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut path = None;
    let mut flatten = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--flatten" => flatten = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(ExitCode::SUCCESS);
            }
            _ if path.is_none() => path = Some(arg),
            _ => return Err(miette!("unexpected argument {arg}\n{USAGE}")),
        }
    }
    let Some(path) = path else {
        eprintln!("{USAGE}");
        return Ok(ExitCode::FAILURE);
    };

    let text = fs::read_to_string(&path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {path}"))?;

    let mut columns =
        ColumnSet::parse(&text).map_err(|err| Report::new(err).with_source_code(text.clone()))?;
    info!(path = %path, columns = columns.len(), "loaded column descriptions");

    if flatten {
        columns.flatten_nested();
    }

    print_view("ordinary", &columns.ordinary());
    print_view("materialized", &columns.materialized());
    print_view("alias", &columns.aliases());
    print_view("virtual", &columns.virtuals());

    let validated = DefaultsValidator::new().validate(&columns)?;
    println!("sample: {}", validated.sample);
    for (name, expression) in &validated.rewritten {
        println!("  {name} <- {expression}");
    }

    if flatten {
        print!("{columns}");
    }

    Ok(ExitCode::SUCCESS)
}

fn print_view(label: &str, view: &[NameAndType]) {
    let names: Vec<String> = view.iter().map(ToString::to_string).collect();
    println!("{label}: {}", names.join(", "));
}
