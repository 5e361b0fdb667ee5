use std::fs;
use std::path::PathBuf;

use umbrella_compiler::ast::{Program, Statement};
use umbrella_compiler::lexer::Lexer;
use umbrella_compiler::parser::Parser;
use umbrella_compiler::source::Source;

fn parse_file(path: &PathBuf) -> Program {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    let mut source = Source::from_str(&text);
    let tokens = Lexer::new(&mut source).tokenize();
    Parser::new(&tokens)
        .parse()
        .unwrap_or_else(|(_, errors)| panic!("{} failed to parse: {:?}", path.display(), errors))
}

#[test]
fn test_all_scripts_parse() {
    let dir_path = PathBuf::from("../test_scripts");
    if !dir_path.exists() {
        panic!("Test scripts directory not found: {}", dir_path.display());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(&dir_path)
        .expect("read test_scripts")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("umb"))
        .collect();
    files.sort();

    for path in files {
        let program = parse_file(&path);
        assert!(
            !program.statements.is_empty(),
            "{} parsed to an empty program",
            path.display()
        );
        // Same source, same tree, every run.
        assert_eq!(program, parse_file(&path));
    }
}

#[test]
fn test_class_script_shape() {
    let program = parse_file(&PathBuf::from("../test_scripts/classes.umb"));

    match &program.statements[0] {
        Statement::ClassDeclaration(class) => {
            assert_eq!(class.name, "Point");
            assert!(class.superclass.is_none());
            let field_names: Vec<&str> =
                class.fields.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(field_names, vec!["x", "y"]);
            assert!(class.constructor.is_some());
            assert_eq!(class.methods[0].name, "dist");
        }
        other => panic!("expected class first, got {:?}", other),
    }

    assert!(matches!(
        program.statements[1],
        Statement::VariableDeclaration { .. }
    ));
    assert!(matches!(program.statements[2], Statement::Expression(_)));
}

#[test]
fn test_exception_script_shape() {
    let program = parse_file(&PathBuf::from("../test_scripts/exceptions.umb"));
    match &program.statements[0] {
        Statement::Try {
            try_block,
            catch_var,
            catch_block,
            finally_block,
        } => {
            assert!(matches!(try_block[0], Statement::Throw(_)));
            assert_eq!(catch_var.as_deref(), Some("e"));
            assert_eq!(catch_block.len(), 1);
            assert_eq!(finally_block.len(), 1);
        }
        other => panic!("expected try statement, got {:?}", other),
    }
}
