use clap::Parser as ClapParser;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::process::{self, Command};

use umbrella_compiler::codegen::CodeGenerator;
use umbrella_compiler::lexer::{Lexer, Span};
use umbrella_compiler::parser::{Parser, ParserError};
use umbrella_compiler::runtime;
use umbrella_compiler::source::Source;

fn print_error_with_location(file_path: &str, source: &str, message: &str, span: Span) {
    let lines: Vec<&str> = source.lines().collect();
    let row = span.line.saturating_sub(1);
    let col = span.column.saturating_sub(1);

    eprintln!();
    eprintln!("In {}, line {}:", file_path, span.line);
    if row < lines.len() {
        eprintln!("    {}", lines[row].trim_end());
        eprint!("    ");
        for _ in 0..col {
            eprint!(" ");
        }
        eprintln!("^");
    }
    eprintln!("{}", message);
    eprintln!();
}

fn handle_parser_errors(file_path: &str, source: &str, errors: &[ParserError]) {
    for error in errors {
        print_error_with_location(file_path, source, &error.message, error.span);
    }
}

/// Umbrella compiler CLI
#[derive(ClapParser)]
#[command(name = "umbrella")]
#[command(version)]
#[command(about = "Compiler for the Umbrella scripting language", long_about = None)]
struct Cli {
    /// Input source file
    input: PathBuf,

    /// Output executable path
    #[arg(short, long, default_value = "a.out")]
    output: PathBuf,

    /// Print the generated C++ source and skip the backend compiler
    #[arg(long = "emit-cpp")]
    emit_cpp: bool,

    /// Show detailed compilation steps
    #[arg(long)]
    verbose: bool,

    /// Run the produced binary (the default)
    #[arg(long, overrides_with = "no_run")]
    #[allow(unused)]
    run: bool,

    /// Do not run the produced binary
    #[arg(long = "no-run")]
    no_run: bool,
}

/// Per-user cache root, keyed below by a hash of the input source. Absent a
/// home directory caching is skipped.
fn cache_root() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".umbrella").join("cache"))
}

fn source_key(source: &str) -> String {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn run_binary(output: &PathBuf) {
    let run_path = std::fs::canonicalize(output).unwrap_or_else(|_| output.clone());
    // The program's own exit code is not propagated.
    let _ = Command::new(run_path).status();
}

fn main() {
    let cli = Cli::parse();
    let do_run = !cli.no_run;
    let input_path = cli.input.to_string_lossy().to_string();

    if cli.verbose {
        println!("Reading source file: {}", input_path);
    }
    let source_text = match std::fs::read_to_string(&cli.input) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: could not open {}: {}", input_path, e);
            process::exit(1);
        }
    };

    // A cache hit bypasses re-emission and the backend compiler entirely.
    let key = source_key(&source_text);
    let cached_binary = cache_root().map(|root| root.join(format!("umb-{}", key)));
    if !cli.emit_cpp {
        if let Some(cached) = &cached_binary {
            if cached.exists() && std::fs::copy(cached, &cli.output).is_ok() {
                if cli.verbose {
                    println!("Cache hit: {}", cached.display());
                }
                println!("Output written to: {}", cli.output.display());
                if do_run {
                    run_binary(&cli.output);
                }
                return;
            }
        }
    }

    if cli.verbose {
        println!("Lexical analysis...");
    }
    let mut source = Source::from_str(&source_text);
    let tokens = Lexer::new(&mut source).tokenize();
    if cli.verbose {
        println!("Generated {} tokens", tokens.len());
        println!("Parsing...");
    }

    let mut parser = Parser::new(&tokens);
    let program = match parser.parse() {
        Ok(program) => program,
        Err((partial, errors)) => {
            handle_parser_errors(&input_path, &source_text, &errors);
            if cli.emit_cpp {
                // Best-effort output from whatever statements parsed.
                let cpp_code = CodeGenerator::new().generate(&partial);
                println!("{}", cpp_code);
            }
            process::exit(1);
        }
    };

    if cli.verbose {
        println!("Generating C++ code...");
    }
    let mut codegen = CodeGenerator::new();
    let cpp_code = codegen.generate(&program);
    for warning in codegen.warnings() {
        eprintln!("Warning: {}", warning);
    }

    if cli.emit_cpp {
        println!("{}", cpp_code);
        return;
    }

    let runtime_dir = cache_root()
        .unwrap_or_else(|| std::env::temp_dir().join("umbrella"))
        .join("runtime");
    let runtime_dir = match runtime::materialize(&runtime_dir) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error: could not write runtime sources: {}", e);
            process::exit(1);
        }
    };

    let cpp_file = std::env::temp_dir().join(format!("umbrella_{}.cpp", key));
    if let Err(e) = std::fs::write(&cpp_file, &cpp_code) {
        eprintln!("Error: could not write {}: {}", cpp_file.display(), e);
        process::exit(1);
    }

    if cli.verbose {
        println!("Compiling to native code...");
    }
    let mut args: Vec<String> = vec![
        "-std=c++17".to_string(),
        "-I".to_string(),
        runtime_dir.display().to_string(),
        cpp_file.display().to_string(),
        runtime_dir.join("runtime.cpp").display().to_string(),
    ];
    // Thread/Process/Timer/Database pull in the system translation unit and
    // its link libraries; plain programs skip them.
    if runtime::uses_system_runtime(&cpp_code) {
        args.push(runtime_dir.join("system.cpp").display().to_string());
        args.push("-pthread".to_string());
        args.push("-lsqlite3".to_string());
    }
    args.push("-o".to_string());
    args.push(cli.output.display().to_string());

    if cli.verbose {
        println!("Compile command: g++ {}", args.join(" "));
    }
    let compile_output = Command::new("g++").args(&args).output();
    let _ = std::fs::remove_file(&cpp_file);

    match compile_output {
        Ok(output) if output.status.success() => {}
        Ok(output) => {
            eprintln!("Error: compilation failed");
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: failed to run g++: {}", e);
            process::exit(1);
        }
    }

    if let Some(cached) = &cached_binary {
        if let Some(parent) = cached.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::copy(&cli.output, cached);
    }

    println!("Output written to: {}", cli.output.display());
    if do_run {
        run_binary(&cli.output);
    }
}
