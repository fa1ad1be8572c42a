use std::fs;
use std::io::{self, BufRead, BufReader};
use std::process;

use clap::Parser;
use replisim_cli::{describe_error, describe_outcome, render_dump, App, Error};
use replisim_core::{Outcome, TransactionManager};
use replisim_parser::{is_trivia_line, parse_line, Command};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = App::parse();
    if let Err(err) = run(&app) {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn run(app: &App) -> Result<(), Error> {
    let reader: Box<dyn BufRead> = match &app.input {
        Some(path) => Box::new(BufReader::new(fs::File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut tm = TransactionManager::new();
    for line in reader.lines() {
        let line = line?;
        if is_trivia_line(&line) {
            continue;
        }
        match parse_line(&line) {
            Ok(Command::Exit) => break,
            Ok(Command::Op(op)) => report(&tm.process_operation(op, false), app.json)?,
            Err(err) => eprintln!("{}: {err}", line.trim()),
        }
    }
    Ok(())
}

fn report(
    result: &Result<Outcome, replisim_core::Error>,
    json: bool,
) -> Result<(), Error> {
    match result {
        Ok(Outcome::Dump(dump)) if json => println!("{}", serde_json::to_string(dump)?),
        Ok(Outcome::Dump(dump)) => print!("{}", render_dump(dump)),
        Ok(outcome) => {
            for notice in describe_outcome(outcome) {
                println!("{notice}");
            }
        }
        Err(err) => println!("{}", describe_error(err)),
    }
    Ok(())
}
