use std::env;
use std::process;

mod builtin;
mod error;
mod input;
mod jobs;
mod parser;
mod pipeline;
mod prompt;
mod shell;

fn print_help() {
    println!("psh - a small pipeline shell");
    println!();
    println!("Usage: psh [OPTIONS]");
    println!("  -h, --help       Print this help");
    println!("  -v, --version    Print version");
}

fn print_version() {
    println!("psh {}", env!("CARGO_PKG_VERSION"));
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Respond to common flags quickly so callers probing the binary don't hang.
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        process::exit(0);
    }
    if args.iter().any(|a| a == "-v" || a == "--version" || a == "-V") {
        print_version();
        process::exit(0);
    }

    let mut shell = shell::Shell::new();
    shell.run();
}
