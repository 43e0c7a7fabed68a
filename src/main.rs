use std::{env, fs, process};

use sorrel_lint::diagnostics;
use sorrel_lint::language::lint::{check_module, LintOpts};
use sorrel_lint::language::reader::read_forms;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: sorrel-lint <file.srl>...");
        process::exit(2);
    }
    let mut failed = false;
    for path in &args[1..] {
        match run_check(path) {
            Ok(clean) => {
                if !clean {
                    failed = true;
                }
            }
            Err(err) => {
                eprintln!("{}: {}", path, err);
                failed = true;
            }
        }
    }
    if failed {
        process::exit(1);
    }
}

fn run_check(path: &str) -> Result<bool, std::io::Error> {
    let source = fs::read_to_string(path)?;
    let forms = match read_forms(&source) {
        Ok(forms) => forms,
        Err(err) => {
            diagnostics::report_read_error(path, &source, &err);
            return Ok(false);
        }
    };
    match check_module(&forms, path, LintOpts::default()) {
        Ok(report) => {
            diagnostics::emit_reports(path, &source, &[], &report.warnings);
            println!("{}: module {} ok", path, report.module);
            Ok(true)
        }
        Err(failure) => {
            diagnostics::emit_reports(&failure.file, &source, &failure.errors, &failure.warnings);
            Ok(false)
        }
    }
}
