use std::collections::{HashMap, HashSet};
use std::collections::BTreeSet;
use std::mem;

use crate::language::ast::{Form, Node, WILDCARD};
use crate::language::errors::{DiagKind, Diagnostic};

pub mod bitspec;
pub mod builtins;
mod checker;
pub mod env;
pub mod types;

pub use env::Env;

/// Runtime configuration of the checker. `maps` controls whether the map
/// forms exist at all on the target; `literal_map_keys` restricts map keys
/// in expressions and guards to literal values. Map patterns always require
/// literal keys.
#[derive(Clone, Copy, Debug)]
pub struct LintOpts {
    pub maps: bool,
    pub literal_map_keys: bool,
}

impl Default for LintOpts {
    fn default() -> Self {
        Self {
            maps: true,
            literal_map_keys: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Success {
    pub module: String,
    pub warnings: Vec<Diagnostic>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
    pub file: String,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

/// A record definition: field names in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub fields: Vec<String>,
}

#[derive(Clone, Debug)]
struct Export {
    name: String,
    arity: usize,
    line: u32,
}

#[derive(Clone, Debug)]
struct FuncDef {
    name: String,
    arity: usize,
    meta: Vec<Node>,
    def: Node,
    line: u32,
}

/// Check a whole module: every form collected and validated, every function
/// body checked against the module environment, exports checked against what
/// was actually defined.
pub fn check_module(forms: &[Form], file: &str, opts: LintOpts) -> Result<Success, Failure> {
    let mut st = Linter::new(file, opts);
    st.collect_module(forms);
    st.check_functions();
    st.check_exports();
    st.finish()
}

/// Check one top-level form by wrapping it in a synthetic empty module.
pub fn check_form(form: &Form) -> Result<Success, Failure> {
    let header = Form {
        line: form.line,
        node: Node::List(vec![
            Node::symbol("module-def"),
            Node::symbol("dummy"),
            Node::List(Vec::new()),
            Node::List(Vec::new()),
        ]),
    };
    check_module(&[header, form.clone()], "nofile", LintOpts::default())
}

/// Check a single expression against an empty environment.
pub fn check_expression(expr: &Node) -> Result<Vec<Diagnostic>, Failure> {
    let mut st = Linter::new("nofile", LintOpts::default());
    st.check_expr(expr, &Env::new(), 1);
    st.finish_free()
}

/// Check a single pattern against an empty environment.
pub fn check_pattern(pattern: &Node) -> Result<Vec<Diagnostic>, Failure> {
    let mut st = Linter::new("nofile", LintOpts::default());
    let mut pvs = BTreeSet::new();
    st.check_pattern(pattern, &mut pvs, &Env::new(), 1);
    st.finish_free()
}

pub(crate) struct Linter {
    module: Option<String>,
    mline: u32,
    exports: Vec<Export>,
    texports: Vec<Export>,
    imports: HashMap<(String, usize), (String, String)>,
    funcs: Vec<FuncDef>,
    func_set: HashSet<(String, usize)>,
    types: HashSet<(String, usize)>,
    specs: HashSet<(String, usize)>,
    records: HashMap<String, Record>,
    env: Env,
    func: Option<(String, usize)>,
    file: String,
    opts: LintOpts,
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
}

impl Linter {
    fn new(file: &str, opts: LintOpts) -> Self {
        Self {
            module: None,
            mline: 1,
            exports: Vec::new(),
            texports: Vec::new(),
            imports: HashMap::new(),
            funcs: Vec::new(),
            func_set: HashSet::new(),
            types: HashSet::new(),
            specs: HashSet::new(),
            records: HashMap::new(),
            env: Env::new(),
            func: None,
            file: file.to_string(),
            opts,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, line: u32, kind: DiagKind) {
        self.errors.push(Diagnostic::lint(line, kind));
    }

    fn types_error(&mut self, line: u32, kind: DiagKind) {
        self.errors.push(Diagnostic::types(line, kind));
    }

    fn warn(&mut self, line: u32, kind: DiagKind) {
        self.warnings.push(Diagnostic::lint(line, kind));
    }

    fn finish(self) -> Result<Success, Failure> {
        if self.errors.is_empty() {
            Ok(Success {
                module: self.module.unwrap_or_else(|| "dummy".to_string()),
                warnings: self.warnings,
            })
        } else {
            Err(Failure {
                file: self.file,
                errors: self.errors,
                warnings: self.warnings,
            })
        }
    }

    fn finish_free(self) -> Result<Vec<Diagnostic>, Failure> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(Failure {
                file: self.file,
                errors: self.errors,
                warnings: self.warnings,
            })
        }
    }

    fn collect_module(&mut self, forms: &[Form]) {
        if forms.is_empty() {
            self.error(1, DiagKind::BadModule);
            return;
        }
        let mut first = true;
        for form in forms {
            let line = form.line;
            let items = form.node.as_list();
            let head = items.and_then(|list| list.first()).and_then(Node::as_symbol);
            if first {
                first = false;
                if head == Some("module-def") {
                    if let Some(items) = items {
                        self.check_mdef(&items[1..], line);
                    }
                    continue;
                }
                self.error(line, DiagKind::BadModule);
            }
            let Some(items) = items else {
                self.error(line, DiagKind::UnknownForm(form.node.to_string()));
                continue;
            };
            let args = if items.is_empty() { items } else { &items[1..] };
            match head {
                Some("module-def") => self.error(line, DiagKind::BadModule),
                Some("define-function") => self.collect_function(args, line),
                Some("define-type") | Some("define-opaque") => match args {
                    [nameform, def] => self.define_type(nameform, def, line),
                    _ => self.error(line, DiagKind::BadTypeDef(form.node.to_string())),
                },
                Some("define-spec") => match args {
                    [nameform, clauses @ ..] => self.define_spec(nameform, clauses, line),
                    _ => self.error(line, DiagKind::BadSpec(form.node.to_string())),
                },
                Some("define-record") => match args {
                    [name, fields @ ..] => self.define_record(name, fields, line),
                    _ => self.error(line, DiagKind::BadRecordDef(form.node.to_string())),
                },
                Some(other) => self.error(line, DiagKind::UnknownForm(other.to_string())),
                None => self.error(line, DiagKind::UnknownForm(form.node.to_string())),
            }
        }
    }

    fn check_mdef(&mut self, args: &[Node], line: u32) {
        self.mline = line;
        let [name, meta, attrs] = args else {
            self.error(line, DiagKind::BadModule);
            return;
        };
        match name.as_symbol() {
            Some(name) if name != WILDCARD => self.module = Some(name.to_string()),
            _ => self.error(line, DiagKind::BadModule),
        }
        match meta.as_list() {
            Some(items) => {
                for item in items {
                    self.check_meta(item);
                }
            }
            None => self.error(line, DiagKind::BadModule),
        }
        match attrs.as_list() {
            Some(items) => {
                for item in items {
                    self.check_attr(item);
                }
            }
            None => self.error(line, DiagKind::BadModule),
        }
    }

    fn check_meta(&mut self, item: &Node) {
        let line = self.mline;
        let Some([head, rest @ ..]) = item.as_list() else {
            self.error(line, DiagKind::BadMeta(item.to_string()));
            return;
        };
        match head.as_symbol() {
            Some("doc") => self.check_doc_strings(rest, DiagKind::BadMeta("doc".to_string())),
            Some("type") | Some("opaque") => {
                for def in rest {
                    match def.as_list() {
                        Some([nameform, body]) => self.define_type(nameform, body, line),
                        _ => self.error(line, DiagKind::BadMeta("type".to_string())),
                    }
                }
            }
            Some("spec") => {
                for def in rest {
                    match def.as_list() {
                        Some([nameform, clauses @ ..]) => {
                            self.define_spec(nameform, clauses, line)
                        }
                        _ => self.error(line, DiagKind::BadMeta("spec".to_string())),
                    }
                }
            }
            Some("record") => {
                for def in rest {
                    match def.as_list() {
                        Some([name, fields @ ..]) => self.define_record(name, fields, line),
                        _ => self.error(line, DiagKind::BadMeta("record".to_string())),
                    }
                }
            }
            Some(other) => self.error(line, DiagKind::BadMeta(other.to_string())),
            None => self.error(line, DiagKind::BadMeta(item.to_string())),
        }
    }

    fn check_attr(&mut self, item: &Node) {
        let line = self.mline;
        let Some([head, rest @ ..]) = item.as_list() else {
            self.error(line, DiagKind::BadAttribute(item.to_string()));
            return;
        };
        match head.as_symbol() {
            Some("export") => self.check_export_attr(rest, false),
            Some("export-type") => self.check_export_attr(rest, true),
            Some("import") => {
                for spec in rest {
                    self.check_import_spec(spec);
                }
            }
            // Documentation moved into module metadata; an old-style doc
            // attribute still works but is flagged.
            Some("doc") => {
                self.warn(line, DiagKind::Deprecated("doc attribute"));
                self.check_doc_strings(rest, DiagKind::BadAttribute("doc".to_string()));
            }
            // Records as module attributes were removed in favour of
            // define-record.
            Some("record") => self.error(line, DiagKind::Deprecated("record attribute")),
            Some(other) => self.error(line, DiagKind::BadAttribute(other.to_string())),
            None => self.error(line, DiagKind::BadAttribute(item.to_string())),
        }
    }

    fn check_doc_strings(&mut self, docs: &[Node], kind: DiagKind) {
        if !docs.iter().all(|doc| matches!(doc, Node::Str(_))) {
            self.error(self.mline, kind);
        }
    }

    fn check_export_attr(&mut self, entries: &[Node], type_export: bool) {
        let line = self.mline;
        let attr = if type_export { "export-type" } else { "export" };
        for entry in entries {
            match entry.as_list() {
                Some([Node::Symbol(name), Node::Int(arity)]) if *arity >= 0 => {
                    let export = Export {
                        name: name.clone(),
                        arity: *arity as usize,
                        line,
                    };
                    let table = if type_export {
                        &mut self.texports
                    } else {
                        &mut self.exports
                    };
                    // The first-seen line wins for duplicate entries.
                    if !table
                        .iter()
                        .any(|e| e.name == export.name && e.arity == export.arity)
                    {
                        table.push(export);
                    }
                }
                _ => self.error(line, DiagKind::BadAttribute(attr.to_string())),
            }
        }
    }

    fn check_import_spec(&mut self, spec: &Node) {
        let line = self.mline;
        let Some([head, rest @ ..]) = spec.as_list() else {
            self.error(line, DiagKind::BadAttribute("import".to_string()));
            return;
        };
        match head.as_symbol() {
            Some("from") => {
                let [Node::Symbol(module), entries @ ..] = rest else {
                    self.error(line, DiagKind::BadAttribute("import".to_string()));
                    return;
                };
                for entry in entries {
                    match entry.as_list() {
                        Some([Node::Symbol(name), Node::Int(arity)]) if *arity >= 0 => {
                            self.imports.insert(
                                (name.clone(), *arity as usize),
                                (module.clone(), name.clone()),
                            );
                        }
                        _ => self.error(line, DiagKind::BadAttribute("import".to_string())),
                    }
                }
            }
            Some("rename") => {
                let [Node::Symbol(module), entries @ ..] = rest else {
                    self.error(line, DiagKind::BadAttribute("import".to_string()));
                    return;
                };
                for entry in entries {
                    match entry.as_list() {
                        Some([remote, Node::Symbol(local)]) => match remote.as_list() {
                            Some([Node::Symbol(name), Node::Int(arity)]) if *arity >= 0 => {
                                self.imports.insert(
                                    (local.clone(), *arity as usize),
                                    (module.clone(), name.clone()),
                                );
                            }
                            _ => self.error(line, DiagKind::BadAttribute("import".to_string())),
                        },
                        _ => self.error(line, DiagKind::BadAttribute("import".to_string())),
                    }
                }
            }
            // Prefixed imports were removed outright.
            Some("prefix") => self.error(line, DiagKind::Deprecated("prefixed import")),
            _ => self.error(line, DiagKind::BadAttribute("import".to_string())),
        }
    }

    fn collect_function(&mut self, args: &[Node], line: u32) {
        let [Node::Symbol(name), meta, def] = args else {
            self.error(line, DiagKind::BadForm("define-function".to_string()));
            return;
        };
        let Some(meta) = meta.as_list() else {
            self.error(line, DiagKind::BadForm("define-function".to_string()));
            return;
        };
        let Some(arity) = function_arity(def) else {
            self.error(line, DiagKind::BadForm("define-function".to_string()));
            return;
        };
        if !self.func_set.insert((name.clone(), arity)) {
            self.error(line, DiagKind::RedefineFunction(name.clone(), arity));
            return;
        }
        self.funcs.push(FuncDef {
            name: name.clone(),
            arity,
            meta: meta.to_vec(),
            def: def.clone(),
            line,
        });
    }

    fn define_type(&mut self, nameform: &Node, def: &Node, line: u32) {
        let Some([Node::Symbol(name), params @ ..]) = nameform.as_list() else {
            self.error(line, DiagKind::BadTypeDef(nameform.to_string()));
            return;
        };
        let arity = params.len();
        if builtins::is_builtin_type(name, arity) {
            self.error(line, DiagKind::BuiltinType(name.clone(), arity));
        }
        if !self.types.insert((name.clone(), arity)) {
            self.error(line, DiagKind::RedefineType(name.clone(), arity));
        }
        match types::check_type_def(params, def, &self.records) {
            Ok(counts) => self.check_singletons(&counts, line),
            Err((err, counts)) => {
                self.report_type_error(err, name, line);
                self.check_singletons(&counts, line);
            }
        }
    }

    fn define_spec(&mut self, nameform: &Node, clauses: &[Node], line: u32) {
        let Some([Node::Symbol(name), Node::Int(arity)]) = nameform.as_list() else {
            self.error(line, DiagKind::BadSpec(nameform.to_string()));
            return;
        };
        if *arity < 0 {
            self.error(line, DiagKind::BadSpec(name.clone()));
            return;
        }
        let arity = *arity as usize;
        if !self.specs.insert((name.clone(), arity)) {
            self.error(line, DiagKind::RedefineSpec(name.clone(), arity));
        }
        self.check_spec_clauses(clauses, name, arity, line);
    }

    fn check_spec_clauses(&mut self, clauses: &[Node], name: &str, arity: usize, line: u32) {
        match types::check_func_spec(clauses, arity, &self.records) {
            Ok(counts) => {
                for clause_counts in &counts {
                    self.check_singletons(clause_counts, line);
                }
            }
            Err((err, counts)) => {
                self.report_type_error(err, name, line);
                for clause_counts in &counts {
                    self.check_singletons(clause_counts, line);
                }
            }
        }
    }

    fn define_record(&mut self, name: &Node, fields: &[Node], line: u32) {
        let Some(name) = name.as_symbol() else {
            self.error(line, DiagKind::BadRecordDef(name.to_string()));
            return;
        };
        if self.records.contains_key(name) {
            self.error(line, DiagKind::RedefineRecord(name.to_string()));
            return;
        }
        let name = name.to_string();
        let mut fnames: Vec<String> = Vec::new();
        for field in fields {
            let (fname, ftype) = match field {
                Node::Symbol(s) => (s.clone(), None),
                Node::List(items) => match items.as_slice() {
                    [Node::Symbol(s), _default] => (s.clone(), None),
                    [Node::Symbol(s), _default, ty] => (s.clone(), Some(ty)),
                    _ => {
                        self.error(line, DiagKind::BadRecordDef(name.clone()));
                        continue;
                    }
                },
                _ => {
                    self.error(line, DiagKind::BadRecordDef(name.clone()));
                    continue;
                }
            };
            if fname == WILDCARD || fnames.contains(&fname) {
                self.error(line, DiagKind::BadRecordDef(name.clone()));
                continue;
            }
            if let Some(ty) = ftype {
                if let Err((err, _)) = types::check_type_expr(ty, &self.records) {
                    let kind = match err {
                        types::TypeError::UndefinedRecord(rec) => DiagKind::UndefinedRecord(rec),
                        _ => DiagKind::BadRecordDef(name.clone()),
                    };
                    self.types_error(line, kind);
                }
            }
            fnames.push(fname);
        }
        self.records.insert(name, Record { fields: fnames });
    }

    fn check_fmetas(&mut self, metas: &[Node], line: u32) {
        for meta in metas {
            let Some([head, rest @ ..]) = meta.as_list() else {
                self.error(line, DiagKind::BadMeta(meta.to_string()));
                continue;
            };
            match head.as_symbol() {
                Some("doc") => {
                    if !rest.iter().all(|doc| matches!(doc, Node::Str(_))) {
                        self.error(line, DiagKind::BadMeta("doc".to_string()));
                    }
                }
                Some("spec") => {
                    if let Some((name, arity)) = self.func.clone() {
                        self.check_spec_clauses(rest, &name, arity, line);
                    }
                }
                Some(other) => self.error(line, DiagKind::BadMeta(other.to_string())),
                None => self.error(line, DiagKind::BadMeta(meta.to_string())),
            }
        }
    }

    fn check_functions(&mut self) {
        let mut env = Env::new();
        for ((local, arity), (module, remote)) in &self.imports {
            env = env.bind_import(module, remote, *arity, local);
        }
        for func in &self.funcs {
            env = env.bind_function(&func.name, func.arity);
        }
        self.env = env;
        let env = self.env.clone();
        let funcs = mem::take(&mut self.funcs);
        for func in &funcs {
            self.func = Some((func.name.clone(), func.arity));
            self.check_fmetas(&func.meta, func.line);
            if let Some([head, rest @ ..]) = func.def.as_list() {
                match head.as_symbol() {
                    Some("lambda") => self.check_lambda(rest, &env, func.line),
                    Some("match-lambda") => self.check_match_lambda(rest, &env, func.line),
                    _ => {}
                }
            }
        }
        self.func = None;
        self.funcs = funcs;
    }

    fn check_exports(&mut self) {
        let exports = mem::take(&mut self.exports);
        for export in &exports {
            if !self.func_set.contains(&(export.name.clone(), export.arity)) {
                self.error(
                    export.line,
                    DiagKind::UndefinedFunction(export.name.clone(), export.arity),
                );
            }
        }
        self.exports = exports;
        let texports = mem::take(&mut self.texports);
        for export in &texports {
            if !self.types.contains(&(export.name.clone(), export.arity)) {
                self.error(
                    export.line,
                    DiagKind::UndefinedType(export.name.clone(), export.arity),
                );
            }
        }
        self.texports = texports;
    }

    fn check_singletons(&mut self, counts: &types::VarCounts, line: u32) {
        for (var, count) in counts {
            if *count == 1 && var != WILDCARD {
                self.error(line, DiagKind::SingletonTypeVar(var.clone()));
            }
        }
    }

    fn report_type_error(&mut self, err: types::TypeError, name: &str, line: u32) {
        let kind = match err {
            types::TypeError::BadType => DiagKind::BadTypeDef(name.to_string()),
            types::TypeError::BadSpec | types::TypeError::SpecArity { .. } => {
                DiagKind::BadSpec(name.to_string())
            }
            types::TypeError::UndefinedRecord(rec) => DiagKind::UndefinedRecord(rec),
        };
        self.types_error(line, kind);
    }
}

#[cfg(test)]
pub(crate) fn test_linter() -> Linter {
    Linter::new("test", LintOpts::default())
}

fn function_arity(def: &Node) -> Option<usize> {
    let items = def.as_list()?;
    match items {
        [head, args, ..] if head.is_symbol("lambda") => args.as_list().map(<[Node]>::len),
        [head, clause, ..] if head.is_symbol("match-lambda") => clause
            .as_list()?
            .first()?
            .as_list()
            .map(<[Node]>::len),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::reader::read_forms;

    fn lint(source: &str) -> Result<Success, Failure> {
        let forms = read_forms(source).expect("read");
        check_module(&forms, "test.srl", LintOpts::default())
    }

    fn error_kinds(source: &str) -> Vec<DiagKind> {
        match lint(source) {
            Ok(_) => Vec::new(),
            Err(failure) => failure.errors.into_iter().map(|d| d.kind).collect(),
        }
    }

    #[test]
    fn minimal_module_is_accepted() {
        let report = lint("(module-def dummy () ())\n(define-function f () (lambda () 1))")
            .expect("clean module");
        assert_eq!(report.module, "dummy");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn missing_header_still_checks_later_forms() {
        let kinds = error_kinds("(define-function f () (lambda () 1))\n(frobnicate 1 2)");
        assert_eq!(
            kinds,
            vec![
                DiagKind::BadModule,
                DiagKind::UnknownForm("frobnicate".to_string())
            ]
        );
    }

    #[test]
    fn empty_input_is_a_bad_module() {
        assert_eq!(error_kinds(""), vec![DiagKind::BadModule]);
    }

    #[test]
    fn misplaced_module_def_is_rejected() {
        let kinds = error_kinds("(module-def m () ())\n(module-def n () ())");
        assert_eq!(kinds, vec![DiagKind::BadModule]);
    }

    #[test]
    fn exporting_an_undefined_arity_is_reported_once() {
        let kinds = error_kinds(
            "(module-def m () ((export (f 2))))\n(define-function f () (lambda (x) x))",
        );
        assert_eq!(
            kinds,
            vec![DiagKind::UndefinedFunction("f".to_string(), 2)]
        );
    }

    #[test]
    fn export_type_must_name_a_known_type() {
        let kinds = error_kinds("(module-def m () ((export-type (pair 2))))");
        assert_eq!(kinds, vec![DiagKind::UndefinedType("pair".to_string(), 2)]);
        let clean = lint(
            "(module-def m ((type (((pair a b) (tuple a b))))) ((export-type (pair 2))))",
        );
        assert!(clean.is_ok());
    }

    #[test]
    fn redefining_a_function_is_an_error() {
        let kinds = error_kinds(
            "(module-def m () ())\n(define-function f () (lambda (x) x))\n(define-function f () (lambda (y) y))",
        );
        assert_eq!(kinds, vec![DiagKind::RedefineFunction("f".to_string(), 1)]);
    }

    #[test]
    fn functions_of_different_arity_coexist() {
        let report = lint(
            "(module-def m () ())\n(define-function f () (lambda (x) x))\n(define-function f () (lambda (x y) (tuple x y)))",
        );
        assert!(report.is_ok());
    }

    #[test]
    fn module_functions_are_mutually_recursive() {
        let report = lint(
            "(module-def m () ())\n(define-function even? () (lambda (n) (odd? (- n 1))))\n(define-function odd? () (lambda (n) (even? (- n 1))))",
        );
        assert!(report.is_ok());
    }

    #[test]
    fn imports_bind_local_names() {
        let report = lint(
            "(module-def m () ((import (from math (sqrt 1)) (rename math ((cos 1) cosine)))))\n(define-function f () (lambda (x) (sqrt (cosine x))))",
        );
        assert!(report.is_ok());
    }

    #[test]
    fn prefixed_imports_are_hard_errors() {
        let kinds = error_kinds("(module-def m () ((import (prefix math m-))))");
        assert_eq!(kinds, vec![DiagKind::Deprecated("prefixed import")]);
    }

    #[test]
    fn record_attribute_is_a_hard_error() {
        let kinds = error_kinds("(module-def m () ((record (point x y))))");
        assert_eq!(kinds, vec![DiagKind::Deprecated("record attribute")]);
    }

    #[test]
    fn doc_attribute_is_only_a_warning() {
        let report = lint("(module-def m () ((doc \"legacy placement\")))").expect("ok");
        assert_eq!(
            report.warnings.iter().map(|d| &d.kind).collect::<Vec<_>>(),
            vec![&DiagKind::Deprecated("doc attribute")]
        );
    }

    #[test]
    fn singleton_type_variables_are_errors() {
        let kinds = error_kinds("(module-def m ((type (((box a) (tuple))))) ())");
        assert_eq!(kinds, vec![DiagKind::SingletonTypeVar("a".to_string())]);
        // The wildcard symbol is exempt.
        let clean = lint("(module-def m ((type (((box _) (tuple))))) ())");
        assert!(clean.is_ok());
    }

    #[test]
    fn builtin_type_names_are_reserved() {
        let kinds = error_kinds("(module-def m ((type (((atom) (integer))))) ())");
        assert_eq!(kinds, vec![DiagKind::BuiltinType("atom".to_string(), 0)]);
    }

    #[test]
    fn type_redefinition_is_keyed_by_name_and_arity() {
        let kinds = error_kinds(
            "(module-def m ((type (((box a) (list a)) ((box a) (tuple a))))) ())",
        );
        assert_eq!(kinds, vec![DiagKind::RedefineType("box".to_string(), 1)]);
        let clean = lint("(module-def m ((type (((box) (integer)) ((box a) (list a))))) ())");
        assert!(clean.is_ok());
    }

    #[test]
    fn specs_are_checked_against_their_stated_arity() {
        let kinds = error_kinds(
            "(module-def m ((spec (((f 1) (((integer) (integer)) (integer)))))) ())\n(define-function f () (lambda (x) x))",
        );
        assert_eq!(kinds, vec![DiagKind::BadSpec("f".to_string())]);
    }

    #[test]
    fn function_spec_meta_uses_the_function_arity() {
        let clean = lint(
            "(module-def m () ())\n(define-function f ((spec (((integer)) (integer)))) (lambda (x) x))",
        );
        assert!(clean.is_ok());
        let kinds = error_kinds(
            "(module-def m () ())\n(define-function f ((spec (((integer) (atom)) (integer)))) (lambda (x) x))",
        );
        assert_eq!(kinds, vec![DiagKind::BadSpec("f".to_string())]);
    }

    #[test]
    fn record_definitions_register_fields() {
        let clean = lint(
            "(module-def m ((record (point (x 0 (integer)) (y 0 (integer))))) ())\n(define-function get-x () (lambda (p) (record-field p point x)))",
        );
        assert!(clean.is_ok());
    }

    #[test]
    fn duplicate_record_fields_are_rejected() {
        let kinds = error_kinds("(module-def m ((record (point x x))) ())");
        assert_eq!(kinds, vec![DiagKind::BadRecordDef("point".to_string())]);
    }

    #[test]
    fn record_redefinition_is_rejected() {
        let kinds = error_kinds("(module-def m ((record (point x) (point y))) ())");
        assert_eq!(kinds, vec![DiagKind::RedefineRecord("point".to_string())]);
    }

    #[test]
    fn bad_export_entries_are_flagged() {
        let kinds = error_kinds("(module-def m () ((export (f -1) f (f 1))))");
        assert_eq!(
            kinds,
            vec![
                DiagKind::BadAttribute("export".to_string()),
                DiagKind::BadAttribute("export".to_string()),
                DiagKind::UndefinedFunction("f".to_string(), 1),
            ]
        );
    }

    #[test]
    fn unknown_meta_and_attributes_are_flagged() {
        let kinds = error_kinds("(module-def m ((colour blue)) ((licence \"MIT\")))");
        assert_eq!(
            kinds,
            vec![
                DiagKind::BadMeta("colour".to_string()),
                DiagKind::BadAttribute("licence".to_string()),
            ]
        );
    }

    #[test]
    fn check_form_wraps_in_a_dummy_module() {
        let forms = read_forms("(define-function f () (lambda () 1))").expect("read");
        let report = check_form(&forms[0]).expect("ok");
        assert_eq!(report.module, "dummy");
    }

    #[test]
    fn failure_carries_the_file_name() {
        let failure = lint("(module-def m () ((export (g 1))))").unwrap_err();
        assert_eq!(failure.file, "test.srl");
    }

    #[test]
    fn checking_is_idempotent() {
        let source = "(module-def m () ((export (f 2) (g 0))))\n(define-function f () (lambda (x) (tuple x y)))";
        let first = lint(source);
        let second = lint(source);
        assert_eq!(first, second);
    }
}
