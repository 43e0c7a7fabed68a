use std::collections::BTreeSet;

use super::{bitspec, builtins, Env, Linter};
use crate::language::ast::{is_literal, is_string_shaped, Node, WILDCARD};
use crate::language::errors::DiagKind;

impl Linter {
    pub(super) fn check_expr(&mut self, expr: &Node, env: &Env, line: u32) {
        match expr {
            Node::Symbol(name) => {
                if !env.is_variable_bound(name) {
                    self.error(line, DiagKind::UnboundSymbol(name.clone()));
                }
            }
            Node::List(items) if items.is_empty() => {}
            Node::List(items) => self.check_expr_form(items, env, line),
            other => self.check_literal(other, line),
        }
    }

    fn check_exprs(&mut self, exprs: &[Node], env: &Env, line: u32) {
        for expr in exprs {
            self.check_expr(expr, env, line);
        }
    }

    fn check_body(&mut self, body: &[Node], env: &Env, line: u32, form: &str) {
        if body.is_empty() {
            self.error(line, DiagKind::BadForm(form.to_string()));
        }
        self.check_exprs(body, env, line);
    }

    fn check_literal(&mut self, node: &Node, line: u32) {
        if !is_literal(node) {
            self.error(line, DiagKind::IllegalLiteral);
        }
    }

    fn check_expr_form(&mut self, items: &[Node], env: &Env, line: u32) {
        let [head, args @ ..] = items else { return };
        let Some(op) = head.as_symbol() else {
            // A list of character codes is a string literal; any other
            // non-symbol head is not callable, but the arguments still get
            // checked so the pass keeps going.
            if !is_string_shaped(items) {
                self.error(line, DiagKind::BadForm("application".to_string()));
                self.check_exprs(args, env, line);
            }
            return;
        };
        match op {
            "quote" => {
                if let [value] = args {
                    self.check_literal(value, line);
                } else {
                    self.error(line, DiagKind::BadForm("quote".to_string()));
                }
            }
            "cons" => self.fixed_args("cons", args, 2, env, line),
            "car" => self.fixed_args("car", args, 1, env, line),
            "cdr" => self.fixed_args("cdr", args, 1, env, line),
            "list" | "tuple" => self.check_exprs(args, env, line),
            "tuple-ref" => self.fixed_args("tuple-ref", args, 2, env, line),
            "tuple-set" => self.fixed_args("tuple-set", args, 3, env, line),
            "binary" => self.check_bitsegs_expr(args, env, line),
            "map" | "map-size" | "map-get" | "map-set" | "map-update" | "map-remove" => {
                self.check_map_op(op, args, env, line)
            }
            "function" => match args {
                [Node::Symbol(_), Node::Int(arity)] if *arity >= 0 => {}
                [Node::Symbol(_), Node::Symbol(_), Node::Int(arity)] if *arity >= 0 => {}
                _ => self.error(line, DiagKind::BadForm("function".to_string())),
            },
            "record" => self.check_record_expr(args, env, line, false),
            "record-update" => self.check_record_expr(args, env, line, true),
            "record-index" => match args {
                [rec, field] => self.check_record_index(rec, field, line, "record-index"),
                _ => self.error(line, DiagKind::BadForm("record-index".to_string())),
            },
            "record-field" => match args {
                [expr, rec, field] => {
                    self.check_expr(expr, env, line);
                    self.check_record_index(rec, field, line, "record-field");
                }
                _ => self.error(line, DiagKind::BadForm("record-field".to_string())),
            },
            "andalso" | "orelse" => self.check_exprs(args, env, line),
            "lambda" => self.check_lambda(args, env, line),
            "match-lambda" => self.check_match_lambda(args, env, line),
            "let" => self.check_let(args, env, line),
            "let-function" => self.check_flet(args, env, line, false),
            "letrec-function" => self.check_flet(args, env, line, true),
            "progn" => self.check_body(args, env, line, "progn"),
            "if" => {
                if !(2..=3).contains(&args.len()) {
                    self.error(line, DiagKind::BadForm("if".to_string()));
                }
                self.check_exprs(args, env, line);
            }
            "case" => self.check_case(args, env, line),
            "receive" => self.check_receive(args, env, line),
            "catch" => self.check_body(args, env, line, "catch"),
            "try" => self.check_try(args, env, line),
            "funcall" => {
                if args.is_empty() {
                    self.error(line, DiagKind::BadForm("funcall".to_string()));
                }
                self.check_exprs(args, env, line);
            }
            "call" => {
                if args.len() < 2 {
                    self.error(line, DiagKind::BadForm("call".to_string()));
                }
                self.check_exprs(args, env, line);
            }
            name => {
                // Generic application: locally bound functions win over the
                // primitive tables.
                let arity = args.len();
                if !env.is_function_bound(name, arity)
                    && !builtins::is_core_primitive(name, arity)
                    && !builtins::is_host_primitive(name, arity)
                {
                    self.error(line, DiagKind::UndefinedFunction(name.to_string(), arity));
                }
                self.check_exprs(args, env, line);
            }
        }
    }

    fn fixed_args(&mut self, form: &str, args: &[Node], arity: usize, env: &Env, line: u32) {
        if args.len() != arity {
            self.error(line, DiagKind::BadForm(form.to_string()));
        }
        self.check_exprs(args, env, line);
    }

    fn check_map_op(&mut self, op: &str, args: &[Node], env: &Env, line: u32) {
        if !self.opts.maps {
            self.error(line, DiagKind::UndefinedFunction(op.to_string(), args.len()));
            self.check_exprs(args, env, line);
            return;
        }
        match op {
            "map" => {
                if args.len() % 2 != 0 {
                    self.error(line, DiagKind::BadForm("map".to_string()));
                }
                for (i, arg) in args.iter().enumerate() {
                    if i % 2 == 0 {
                        self.check_map_key(arg, env, line, false);
                    } else {
                        self.check_expr(arg, env, line);
                    }
                }
            }
            "map-size" => self.fixed_args("map-size", args, 1, env, line),
            "map-get" => match args {
                [map, key] => {
                    self.check_expr(map, env, line);
                    self.check_map_key(key, env, line, false);
                }
                _ => {
                    self.error(line, DiagKind::BadForm("map-get".to_string()));
                    self.check_exprs(args, env, line);
                }
            },
            "map-set" | "map-update" => match args {
                [map, pairs @ ..] if pairs.len() % 2 == 0 => {
                    self.check_expr(map, env, line);
                    for (i, arg) in pairs.iter().enumerate() {
                        if i % 2 == 0 {
                            self.check_map_key(arg, env, line, false);
                        } else {
                            self.check_expr(arg, env, line);
                        }
                    }
                }
                _ => {
                    self.error(line, DiagKind::BadForm(op.to_string()));
                    self.check_exprs(args, env, line);
                }
            },
            "map-remove" => match args {
                [map, keys @ ..] => {
                    self.check_expr(map, env, line);
                    for key in keys {
                        self.check_map_key(key, env, line, false);
                    }
                }
                _ => self.error(line, DiagKind::BadForm("map-remove".to_string())),
            },
            _ => {}
        }
    }

    fn check_map_key(&mut self, key: &Node, env: &Env, line: u32, guard: bool) {
        if self.opts.literal_map_keys {
            if !is_map_key_literal(key) {
                self.error(line, DiagKind::IllegalMapKey);
            }
        } else if guard {
            self.check_gexpr(key, env, line);
        } else {
            self.check_expr(key, env, line);
        }
    }

    fn check_record_expr(&mut self, args: &[Node], env: &Env, line: u32, update: bool) {
        let form = if update { "record-update" } else { "record" };
        let (name, pairs) = if update {
            let [expr, name, pairs @ ..] = args else {
                self.error(line, DiagKind::BadForm(form.to_string()));
                return;
            };
            self.check_expr(expr, env, line);
            (name, pairs)
        } else {
            let [name, pairs @ ..] = args else {
                self.error(line, DiagKind::BadForm(form.to_string()));
                return;
            };
            (name, pairs)
        };
        let Some(name) = name.as_symbol() else {
            self.error(line, DiagKind::BadForm(form.to_string()));
            return;
        };
        let Some(fields) = self.record_fields(name, line) else {
            return;
        };
        self.check_record_pairs(name, &fields, pairs, env, line, false);
    }

    fn check_record_index(&mut self, rec: &Node, field: &Node, line: u32, form: &str) {
        let (Some(rec), Some(field)) = (rec.as_symbol(), field.as_symbol()) else {
            self.error(line, DiagKind::BadForm(form.to_string()));
            return;
        };
        if let Some(fields) = self.record_fields(rec, line) {
            if !fields.iter().any(|f| f == field) {
                self.error(
                    line,
                    DiagKind::UndefinedRecordField(rec.to_string(), field.to_string()),
                );
            }
        }
    }

    fn record_fields(&mut self, name: &str, line: u32) -> Option<Vec<String>> {
        match self.records.get(name) {
            Some(record) => Some(record.fields.clone()),
            None => {
                self.error(line, DiagKind::UndefinedRecord(name.to_string()));
                None
            }
        }
    }

    fn check_record_pairs(
        &mut self,
        name: &str,
        fields: &[String],
        pairs: &[Node],
        env: &Env,
        line: u32,
        guard: bool,
    ) {
        let mut idx = 0;
        while idx < pairs.len() {
            match (pairs[idx].as_symbol(), pairs.get(idx + 1)) {
                (Some(fname), Some(value)) => {
                    // `(_ default)` stands for every unnamed field.
                    if fname != WILDCARD && !fields.iter().any(|f| f == fname) {
                        self.error(
                            line,
                            DiagKind::UndefinedRecordField(name.to_string(), fname.to_string()),
                        );
                    }
                    if guard {
                        self.check_gexpr(value, env, line);
                    } else {
                        self.check_expr(value, env, line);
                    }
                }
                (Some(fname), None) => self.error(
                    line,
                    DiagKind::MissingRecordFieldValue(name.to_string(), fname.to_string()),
                ),
                (None, _) => {
                    let kind = if guard {
                        DiagKind::BadGuardForm("record".to_string())
                    } else {
                        DiagKind::BadForm("record".to_string())
                    };
                    self.error(line, kind);
                    if let Some(value) = pairs.get(idx + 1) {
                        if guard {
                            self.check_gexpr(value, env, line);
                        } else {
                            self.check_expr(value, env, line);
                        }
                    }
                }
            }
            idx += 2;
        }
    }

    pub(super) fn check_lambda(&mut self, rest: &[Node], env: &Env, line: u32) {
        let Some((params, body)) = rest.split_first() else {
            self.error(line, DiagKind::BadForm("lambda".to_string()));
            return;
        };
        let mut inner = env.clone();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        match params.as_list() {
            Some(items) => {
                for param in items {
                    match param.as_symbol() {
                        Some(name) if name == WILDCARD => {}
                        Some(name) => {
                            if !seen.insert(name.to_string()) {
                                self.error(line, DiagKind::MultiVar(name.to_string()));
                            }
                            inner = inner.bind_variable(name);
                        }
                        None => self.error(line, DiagKind::BadForm("lambda".to_string())),
                    }
                }
            }
            None => self.error(line, DiagKind::BadForm("lambda".to_string())),
        }
        self.check_body(body, &inner, line, "lambda");
    }

    pub(super) fn check_match_lambda(&mut self, clauses: &[Node], env: &Env, line: u32) {
        if clauses.is_empty() {
            self.error(line, DiagKind::BadForm("match-lambda".to_string()));
            return;
        }
        // The first clause fixes the arity; the others are held to it.
        let arity = clauses
            .first()
            .and_then(Node::as_list)
            .and_then(|clause| clause.first())
            .and_then(Node::as_list)
            .map(<[Node]>::len);
        for clause in clauses {
            self.check_ml_clause(clause, arity, env, line);
        }
    }

    fn check_ml_clause(&mut self, clause: &Node, arity: Option<usize>, env: &Env, line: u32) {
        let Some([patterns, rest @ ..]) = clause.as_list() else {
            self.error(line, DiagKind::BadForm("match-lambda".to_string()));
            return;
        };
        let Some(patterns) = patterns.as_list() else {
            self.error(line, DiagKind::BadForm("match-lambda".to_string()));
            return;
        };
        if let Some(expected) = arity {
            if patterns.len() != expected {
                self.error(
                    line,
                    DiagKind::BadArity {
                        found: patterns.len(),
                        expected,
                    },
                );
            }
        }
        let mut pvs = BTreeSet::new();
        for pattern in patterns {
            self.check_pattern(pattern, &mut pvs, env, line);
        }
        self.check_clause_tail(rest, &pvs, env, line, "match-lambda");
    }

    fn check_clause(&mut self, clause: &Node, env: &Env, line: u32, form: &str) {
        let Some([pattern, rest @ ..]) = clause.as_list() else {
            self.error(line, DiagKind::BadForm(form.to_string()));
            return;
        };
        let mut pvs = BTreeSet::new();
        self.check_pattern(pattern, &mut pvs, env, line);
        self.check_clause_tail(rest, &pvs, env, line, form);
    }

    fn check_clause_tail(
        &mut self,
        rest: &[Node],
        pvs: &BTreeSet<String>,
        env: &Env,
        line: u32,
        form: &str,
    ) {
        let env = env.bind_variables(pvs);
        let (guard, body) = split_when(rest);
        if let Some(tests) = guard {
            self.check_guard(tests, &env, line);
        }
        self.check_body(body, &env, line, form);
    }

    fn check_let(&mut self, args: &[Node], env: &Env, line: u32) {
        let [bindings, body @ ..] = args else {
            self.error(line, DiagKind::BadForm("let".to_string()));
            return;
        };
        let mut all: BTreeSet<String> = BTreeSet::new();
        match bindings.as_list() {
            Some(items) => {
                for binding in items {
                    let mut pvs = BTreeSet::new();
                    match binding.as_list() {
                        Some([pattern, value]) => {
                            self.check_pattern(pattern, &mut pvs, env, line);
                            // Bindings are simultaneous: values see only the
                            // outer environment.
                            self.check_expr(value, env, line);
                        }
                        Some([pattern, guard, value]) if guard.is_form("when") => {
                            self.check_pattern(pattern, &mut pvs, env, line);
                            if let Some([_, tests @ ..]) = guard.as_list() {
                                self.check_guard(tests, &env.bind_variables(&pvs), line);
                            }
                            self.check_expr(value, env, line);
                        }
                        _ => self.error(line, DiagKind::BadForm("let".to_string())),
                    }
                    for var in pvs {
                        if all.contains(&var) {
                            self.error(line, DiagKind::MultiVar(var));
                        } else {
                            all.insert(var);
                        }
                    }
                }
            }
            None => self.error(line, DiagKind::BadForm("let".to_string())),
        }
        self.check_body(body, &env.bind_variables(&all), line, "let");
    }

    fn check_flet(&mut self, args: &[Node], env: &Env, line: u32, recursive: bool) {
        let form = if recursive {
            "letrec-function"
        } else {
            "let-function"
        };
        let [bindings, body @ ..] = args else {
            self.error(line, DiagKind::BadForm(form.to_string()));
            return;
        };
        let mut locals: Vec<(String, usize, Node)> = Vec::new();
        match bindings.as_list() {
            Some(items) => {
                for binding in items {
                    match binding.as_list() {
                        Some([Node::Symbol(name), def]) => match super::function_arity(def) {
                            Some(arity) => {
                                if locals.iter().any(|(n, a, _)| n == name && *a == arity) {
                                    self.error(
                                        line,
                                        DiagKind::RedefineFunction(name.clone(), arity),
                                    );
                                } else {
                                    locals.push((name.clone(), arity, def.clone()));
                                }
                            }
                            None => self.error(line, DiagKind::BadForm(form.to_string())),
                        },
                        _ => self.error(line, DiagKind::BadForm(form.to_string())),
                    }
                }
            }
            None => self.error(line, DiagKind::BadForm(form.to_string())),
        }
        let mut inner = env.clone();
        for (name, arity, _) in &locals {
            inner = inner.bind_function(name, *arity);
        }
        // letrec bindings see each other; plain let-function bodies see only
        // the outer environment.
        let def_env = if recursive { &inner } else { env };
        for (_, _, def) in &locals {
            if let Some([head, rest @ ..]) = def.as_list() {
                match head.as_symbol() {
                    Some("lambda") => self.check_lambda(rest, def_env, line),
                    Some("match-lambda") => self.check_match_lambda(rest, def_env, line),
                    _ => {}
                }
            }
        }
        self.check_body(body, &inner, line, form);
    }

    fn check_case(&mut self, args: &[Node], env: &Env, line: u32) {
        let [subject, clauses @ ..] = args else {
            self.error(line, DiagKind::BadForm("case".to_string()));
            return;
        };
        self.check_expr(subject, env, line);
        if clauses.is_empty() {
            self.error(line, DiagKind::BadForm("case".to_string()));
        }
        for clause in clauses {
            self.check_clause(clause, env, line, "case");
        }
    }

    fn check_receive(&mut self, args: &[Node], env: &Env, line: u32) {
        if args.is_empty() {
            self.error(line, DiagKind::BadForm("receive".to_string()));
            return;
        }
        let last = args.len() - 1;
        for (i, clause) in args.iter().enumerate() {
            if clause.is_form("after") {
                if i != last {
                    self.error(line, DiagKind::BadForm("receive".to_string()));
                }
                match clause.as_list() {
                    Some([_, timeout, body @ ..]) => {
                        self.check_expr(timeout, env, line);
                        self.check_body(body, env, line, "receive");
                    }
                    _ => self.error(line, DiagKind::BadForm("receive".to_string())),
                }
            } else {
                self.check_clause(clause, env, line, "receive");
            }
        }
    }

    fn check_try(&mut self, args: &[Node], env: &Env, line: u32) {
        let Some((subject, sections)) = args.split_first() else {
            self.error(line, DiagKind::BadForm("try".to_string()));
            return;
        };
        self.check_expr(subject, env, line);
        let mut rest = sections;
        let mut has_catch = false;
        let mut has_after = false;
        if let Some(section) = rest.first() {
            if section.is_form("case") {
                if let Some([_, clauses @ ..]) = section.as_list() {
                    if clauses.is_empty() {
                        self.error(line, DiagKind::BadForm("try".to_string()));
                    }
                    for clause in clauses {
                        self.check_clause(clause, env, line, "try");
                    }
                }
                rest = &rest[1..];
            }
        }
        if let Some(section) = rest.first() {
            if section.is_form("catch") {
                has_catch = true;
                if let Some([_, clauses @ ..]) = section.as_list() {
                    if clauses.is_empty() {
                        self.error(line, DiagKind::BadForm("try".to_string()));
                    }
                    for clause in clauses {
                        self.check_catch_clause(clause, env, line);
                    }
                }
                rest = &rest[1..];
            }
        }
        if let Some(section) = rest.first() {
            if section.is_form("after") {
                has_after = true;
                if let Some([_, body @ ..]) = section.as_list() {
                    self.check_body(body, env, line, "try");
                }
                rest = &rest[1..];
            }
        }
        if !rest.is_empty() || !(has_catch || has_after) {
            self.error(line, DiagKind::BadForm("try".to_string()));
        }
    }

    fn check_catch_clause(&mut self, clause: &Node, env: &Env, line: u32) {
        let Some([pattern, rest @ ..]) = clause.as_list() else {
            self.error(line, DiagKind::BadForm("try".to_string()));
            return;
        };
        let mut pvs = BTreeSet::new();
        match pattern {
            p if p.is_wildcard() => {}
            Node::List(items) => match items.as_slice() {
                [head, class, reason, stack] if head.is_symbol("tuple") => {
                    self.check_pattern(class, &mut pvs, env, line);
                    self.check_pattern(reason, &mut pvs, env, line);
                    match stack.as_symbol() {
                        Some(name) if name == WILDCARD => {}
                        Some(name) => {
                            // The stacktrace slot must introduce a fresh
                            // variable.
                            if env.is_variable_bound(name) {
                                self.error(line, DiagKind::IllegalStacktrace(name.to_string()));
                            } else {
                                pvs.insert(name.to_string());
                            }
                        }
                        None => {
                            self.error(line, DiagKind::IllegalStacktrace(stack.to_string()))
                        }
                    }
                }
                _ => self.error(line, DiagKind::IllegalException),
            },
            _ => self.error(line, DiagKind::IllegalException),
        }
        self.check_clause_tail(rest, &pvs, env, line, "try");
    }

    pub(super) fn check_guard(&mut self, tests: &[Node], env: &Env, line: u32) {
        for test in tests {
            self.check_gexpr(test, env, line);
        }
    }

    fn check_gexprs(&mut self, exprs: &[Node], env: &Env, line: u32) {
        for expr in exprs {
            self.check_gexpr(expr, env, line);
        }
    }

    fn check_gexpr(&mut self, expr: &Node, env: &Env, line: u32) {
        match expr {
            Node::Symbol(name) => {
                if !env.is_variable_bound(name) {
                    self.error(line, DiagKind::UnboundSymbol(name.clone()));
                }
            }
            Node::List(items) if items.is_empty() => {}
            Node::List(items) => self.check_gexpr_form(items, env, line),
            other => self.check_literal(other, line),
        }
    }

    fn check_gexpr_form(&mut self, items: &[Node], env: &Env, line: u32) {
        let [head, args @ ..] = items else { return };
        let Some(op) = head.as_symbol() else {
            if !is_string_shaped(items) {
                self.error(line, DiagKind::IllegalGuard);
            }
            return;
        };
        match op {
            "quote" => {
                if let [value] = args {
                    self.check_literal(value, line);
                } else {
                    self.error(line, DiagKind::BadGuardForm("quote".to_string()));
                }
            }
            "cons" => self.fixed_gargs("cons", args, 2, env, line),
            "car" => self.fixed_gargs("car", args, 1, env, line),
            "cdr" => self.fixed_gargs("cdr", args, 1, env, line),
            "list" | "tuple" => self.check_gexprs(args, env, line),
            "tuple-ref" => self.fixed_gargs("tuple-ref", args, 2, env, line),
            "tuple-set" => self.fixed_gargs("tuple-set", args, 3, env, line),
            "binary" => self.check_bitsegs_guard(args, env, line),
            // Everything that builds or reads a map stays legal in guards;
            // removal does not.
            "map" | "map-size" | "map-get" | "map-set" | "map-update" => {
                self.check_map_gop(op, args, env, line)
            }
            "record" => {
                let [name, pairs @ ..] = args else {
                    self.error(line, DiagKind::BadGuardForm("record".to_string()));
                    return;
                };
                let Some(name) = name.as_symbol() else {
                    self.error(line, DiagKind::BadGuardForm("record".to_string()));
                    return;
                };
                if let Some(fields) = self.record_fields(name, line) {
                    self.check_record_pairs(name, &fields, pairs, env, line, true);
                }
            }
            "record-index" => match args {
                [rec, field] => self.check_record_index(rec, field, line, "record-index"),
                _ => self.error(line, DiagKind::BadGuardForm("record-index".to_string())),
            },
            "record-field" => match args {
                [expr, rec, field] => {
                    self.check_gexpr(expr, env, line);
                    self.check_record_index(rec, field, line, "record-field");
                }
                _ => self.error(line, DiagKind::BadGuardForm("record-field".to_string())),
            },
            "andalso" | "orelse" => self.check_gexprs(args, env, line),
            "call" => match args {
                [module, fun, fargs @ ..] => {
                    match (quoted_symbol(module), quoted_symbol(fun)) {
                        (Some(module), Some(fun))
                            if module == builtins::CORE_MODULE
                                && builtins::is_guard_safe_primitive(fun, fargs.len()) =>
                        {
                            self.check_gexprs(fargs, env, line)
                        }
                        _ => self.error(line, DiagKind::IllegalGuard),
                    }
                }
                _ => self.error(line, DiagKind::IllegalGuard),
            },
            "lambda" | "match-lambda" | "let" | "let-function" | "letrec-function" | "if"
            | "case" | "receive" | "try" | "catch" | "progn" | "funcall" | "function"
            | "map-remove" | "record-update" => self.error(line, DiagKind::IllegalGuard),
            name => {
                // The inverse of ordinary application: a guard call must hit
                // a trusted primitive, and a local binding of the same name
                // poisons it instead of providing it.
                let arity = args.len();
                if builtins::is_guard_safe_primitive(name, arity)
                    && !env.is_function_bound(name, arity)
                {
                    self.check_gexprs(args, env, line);
                } else {
                    self.error(line, DiagKind::IllegalGuard);
                }
            }
        }
    }

    fn fixed_gargs(&mut self, form: &str, args: &[Node], arity: usize, env: &Env, line: u32) {
        if args.len() != arity {
            self.error(line, DiagKind::BadGuardForm(form.to_string()));
        }
        self.check_gexprs(args, env, line);
    }

    fn check_map_gop(&mut self, op: &str, args: &[Node], env: &Env, line: u32) {
        if !self.opts.maps {
            self.error(line, DiagKind::UndefinedFunction(op.to_string(), args.len()));
            self.check_gexprs(args, env, line);
            return;
        }
        match op {
            "map" => {
                if args.len() % 2 != 0 {
                    self.error(line, DiagKind::BadGuardForm("map".to_string()));
                }
                for (i, arg) in args.iter().enumerate() {
                    if i % 2 == 0 {
                        self.check_map_key(arg, env, line, true);
                    } else {
                        self.check_gexpr(arg, env, line);
                    }
                }
            }
            "map-size" => self.fixed_gargs("map-size", args, 1, env, line),
            "map-get" => match args {
                [map, key] => {
                    self.check_gexpr(map, env, line);
                    self.check_map_key(key, env, line, true);
                }
                _ => {
                    self.error(line, DiagKind::BadGuardForm("map-get".to_string()));
                    self.check_gexprs(args, env, line);
                }
            },
            "map-set" | "map-update" => match args {
                [map, pairs @ ..] if pairs.len() % 2 == 0 => {
                    self.check_gexpr(map, env, line);
                    for (i, arg) in pairs.iter().enumerate() {
                        if i % 2 == 0 {
                            self.check_map_key(arg, env, line, true);
                        } else {
                            self.check_gexpr(arg, env, line);
                        }
                    }
                }
                _ => {
                    self.error(line, DiagKind::BadGuardForm(op.to_string()));
                    self.check_gexprs(args, env, line);
                }
            },
            _ => {}
        }
    }

    pub(super) fn check_pattern(
        &mut self,
        pattern: &Node,
        pvs: &mut BTreeSet<String>,
        env: &Env,
        line: u32,
    ) {
        match pattern {
            Node::Symbol(name) => {
                // Repeated occurrences of the same name inside one pattern
                // are a match on equality, not an error here.
                if name != WILDCARD {
                    pvs.insert(name.clone());
                }
            }
            Node::List(items) if items.is_empty() => {}
            Node::List(items) => self.check_pattern_form(items, pvs, env, line),
            other => {
                if !is_literal(other) {
                    self.error(line, DiagKind::IllegalPattern);
                }
            }
        }
    }

    fn check_pattern_form(
        &mut self,
        items: &[Node],
        pvs: &mut BTreeSet<String>,
        env: &Env,
        line: u32,
    ) {
        let [head, args @ ..] = items else { return };
        match head.as_symbol() {
            Some("quote") => {
                if let [value] = args {
                    self.check_literal(value, line);
                } else {
                    self.error(line, DiagKind::IllegalPattern);
                }
            }
            Some("=") => {
                if args.len() != 2 {
                    self.error(line, DiagKind::IllegalPattern);
                }
                // Both sides share the variable set, so one name may appear
                // once on each side.
                for pattern in args {
                    self.check_pattern(pattern, pvs, env, line);
                }
                if let [left, right] = args {
                    if !pat_alias_compat(left, right) {
                        self.error(line, DiagKind::BadAlias);
                    }
                }
            }
            Some("cons") => {
                if args.len() != 2 {
                    self.error(line, DiagKind::IllegalPattern);
                }
                for pattern in args {
                    self.check_pattern(pattern, pvs, env, line);
                }
            }
            Some("list") | Some("tuple") => {
                for pattern in args {
                    self.check_pattern(pattern, pvs, env, line);
                }
            }
            Some("binary") => self.check_bitsegs_pattern(args, pvs, env, line),
            Some("map") => {
                if args.len() % 2 != 0 {
                    self.error(line, DiagKind::IllegalPattern);
                }
                for (i, arg) in args.iter().enumerate() {
                    if i % 2 == 0 {
                        // Matching needs statically known keys, whatever the
                        // expression-side strictness option says.
                        if !is_map_key_literal(arg) {
                            self.error(line, DiagKind::IllegalMapKey);
                        }
                    } else {
                        self.check_pattern(arg, pvs, env, line);
                    }
                }
            }
            Some("record") => {
                let [name, pairs @ ..] = args else {
                    self.error(line, DiagKind::IllegalPattern);
                    return;
                };
                let Some(name) = name.as_symbol() else {
                    self.error(line, DiagKind::IllegalPattern);
                    return;
                };
                let Some(fields) = self.record_fields(name, line) else {
                    return;
                };
                let name = name.to_string();
                let mut idx = 0;
                while idx < pairs.len() {
                    match (pairs[idx].as_symbol(), pairs.get(idx + 1)) {
                        (Some(fname), Some(value)) => {
                            if fname != WILDCARD && !fields.iter().any(|f| f == fname) {
                                self.error(
                                    line,
                                    DiagKind::UndefinedRecordField(
                                        name.clone(),
                                        fname.to_string(),
                                    ),
                                );
                            }
                            self.check_pattern(value, pvs, env, line);
                        }
                        (Some(fname), None) => self.error(
                            line,
                            DiagKind::MissingRecordFieldValue(name.clone(), fname.to_string()),
                        ),
                        (None, _) => {
                            self.error(line, DiagKind::IllegalPattern);
                            if let Some(value) = pairs.get(idx + 1) {
                                self.check_pattern(value, pvs, env, line);
                            }
                        }
                    }
                    idx += 2;
                }
            }
            _ => {
                // Legacy bare-list constructor: every element, head
                // included, is a sub-pattern.
                for pattern in items {
                    self.check_pattern(pattern, pvs, env, line);
                }
            }
        }
    }

    fn check_bitsegs_expr(&mut self, segments: &[Node], env: &Env, line: u32) {
        for segment in segments {
            self.check_bitseg(segment, env, line, false);
        }
    }

    fn check_bitsegs_guard(&mut self, segments: &[Node], env: &Env, line: u32) {
        for segment in segments {
            self.check_bitseg(segment, env, line, true);
        }
    }

    fn check_bitseg(&mut self, segment: &Node, env: &Env, line: u32, guard: bool) {
        match segment {
            Node::Str(_) => {}
            Node::List(items) if is_string_shaped(items) => {}
            Node::List(items) => {
                let [value, specs @ ..] = items.as_slice() else {
                    return;
                };
                match bitspec::parse(specs) {
                    Err(err) => self.report_bitspec_error(err, line),
                    Ok(spec) => match spec.size {
                        bitspec::BitSize::All => {
                            if !spec.kind.is_binary() {
                                self.error(line, DiagKind::IllegalBitSize);
                            }
                        }
                        bitspec::BitSize::None | bitspec::BitSize::Default(_) => {}
                        bitspec::BitSize::Expr(size) => {
                            if spec.kind.is_utf() {
                                self.error(line, DiagKind::IllegalBitSize);
                            } else if guard {
                                self.check_gexpr(&size, env, line);
                            } else {
                                self.check_expr(&size, env, line);
                            }
                        }
                    },
                }
                if guard {
                    self.check_gexpr(value, env, line);
                } else {
                    self.check_expr(value, env, line);
                }
            }
            other => {
                if guard {
                    self.check_gexpr(other, env, line);
                } else {
                    self.check_expr(other, env, line);
                }
            }
        }
    }

    fn check_bitsegs_pattern(
        &mut self,
        segments: &[Node],
        pvs: &mut BTreeSet<String>,
        env: &Env,
        line: u32,
    ) {
        // Variables a segment introduces are visible to the size
        // expressions of later segments, and only to those.
        let mut bitvars: BTreeSet<String> = BTreeSet::new();
        for segment in segments {
            match segment {
                Node::Str(_) => {}
                Node::List(items) if is_string_shaped(items) => {}
                Node::List(items) => {
                    let [value, specs @ ..] = items.as_slice() else {
                        continue;
                    };
                    match bitspec::parse(specs) {
                        Err(err) => self.report_bitspec_error(err, line),
                        Ok(spec) => match spec.size {
                            bitspec::BitSize::All => {
                                if !spec.kind.is_binary() {
                                    self.error(line, DiagKind::IllegalBitSize);
                                }
                            }
                            bitspec::BitSize::None | bitspec::BitSize::Default(_) => {}
                            bitspec::BitSize::Expr(size) => {
                                if spec.kind.is_utf() {
                                    self.error(line, DiagKind::IllegalBitSize);
                                } else {
                                    match &size {
                                        Node::Int(_) => {}
                                        Node::Symbol(name) => {
                                            if !bitvars.contains(name)
                                                && !env.is_variable_bound(name)
                                            {
                                                self.error(
                                                    line,
                                                    DiagKind::UnboundSymbol(name.clone()),
                                                );
                                            }
                                        }
                                        _ => self.error(line, DiagKind::IllegalBitSeg),
                                    }
                                }
                            }
                        },
                    }
                    self.check_bit_pattern_value(value, &mut bitvars, line);
                }
                other => self.check_bit_pattern_value(other, &mut bitvars, line),
            }
        }
        pvs.extend(bitvars);
    }

    fn check_bit_pattern_value(&mut self, value: &Node, bitvars: &mut BTreeSet<String>, line: u32) {
        match value {
            Node::Symbol(name) => {
                if name != WILDCARD {
                    bitvars.insert(name.clone());
                }
            }
            Node::Int(_) | Node::Float(_) | Node::Str(_) => {}
            Node::List(items) => match items.as_slice() {
                [quote, value] if quote.is_symbol("quote") => self.check_literal(value, line),
                _ => self.error(line, DiagKind::IllegalBitSeg),
            },
            _ => self.error(line, DiagKind::IllegalBitSeg),
        }
    }

    fn report_bitspec_error(&mut self, err: bitspec::BitSpecError, line: u32) {
        let kind = match err {
            bitspec::BitSpecError::UndefinedType(name) => DiagKind::UndefinedBitType(name),
            bitspec::BitSpecError::BadUnit | bitspec::BitSpecError::BadSpec => {
                DiagKind::IllegalBitSeg
            }
        };
        self.error(line, kind);
    }
}

fn split_when(rest: &[Node]) -> (Option<&[Node]>, &[Node]) {
    if let Some((first, more)) = rest.split_first() {
        if let Some([head, tests @ ..]) = first.as_list() {
            if head.is_symbol("when") {
                return (Some(tests), more);
            }
        }
    }
    (None, rest)
}

fn quoted_symbol(node: &Node) -> Option<&str> {
    match node.as_list() {
        Some([quote, value]) if quote.is_symbol("quote") => value.as_symbol(),
        _ => None,
    }
}

fn is_map_key_literal(key: &Node) -> bool {
    match key {
        Node::List(items) => match items.as_slice() {
            [quote, value] if quote.is_symbol("quote") => is_literal(value),
            items => is_string_shaped(items),
        },
        other => is_literal(other),
    }
}

/// Whether two aliased patterns can denote the same runtime value. A bare
/// variable goes with anything, two binary patterns never do, and the
/// list-building forms are normalized to head/tail spines before comparison.
fn pat_alias_compat(left: &Node, right: &Node) -> bool {
    if left.as_symbol().is_some() || right.as_symbol().is_some() {
        return true;
    }
    if left.is_form("binary") || right.is_form("binary") {
        return false;
    }
    if left.is_form("quote") || right.is_form("quote") {
        return left == right;
    }
    if let (Some(a), Some(b)) = (tuple_elems(left), tuple_elems(right)) {
        return a.len() == b.len()
            && a.iter().zip(b.iter()).all(|(x, y)| pat_alias_compat(x, y));
    }
    if is_list_like(left) && is_list_like(right) {
        return list_alias_compat(left, right);
    }
    left == right
}

fn tuple_elems(pattern: &Node) -> Option<&[Node]> {
    match pattern {
        Node::Tuple(items) => Some(items),
        _ => match pattern.as_list() {
            Some([head, rest @ ..]) if head.is_symbol("tuple") => Some(rest),
            _ => None,
        },
    }
}

fn is_list_like(pattern: &Node) -> bool {
    match pattern.as_list() {
        None => false,
        Some([]) => true,
        Some([head, ..]) => !matches!(
            head.as_symbol(),
            Some("quote" | "=" | "binary" | "map" | "record" | "tuple")
        ),
    }
}

fn list_alias_compat(left: &Node, right: &Node) -> bool {
    match (uncons(left), uncons(right)) {
        (None, None) => true,
        (Some((h1, t1)), Some((h2, t2))) => {
            pat_alias_compat(&h1, &h2) && pat_alias_compat(&t1, &t2)
        }
        _ => false,
    }
}

/// Split a list-building pattern into head and remaining-list patterns;
/// `None` is the empty list.
fn uncons(pattern: &Node) -> Option<(Node, Node)> {
    match pattern.as_list() {
        Some([head, rest @ ..]) if head.is_symbol("cons") => match rest {
            [car, cdr] => Some((car.clone(), cdr.clone())),
            _ => None,
        },
        Some([head, rest @ ..]) if head.is_symbol("list") => match rest {
            [] => None,
            [car, cdr @ ..] => {
                let mut tail = vec![head.clone()];
                tail.extend(cdr.iter().cloned());
                Some((car.clone(), Node::List(tail)))
            }
        },
        Some([car, cdr @ ..]) => Some((car.clone(), Node::List(cdr.to_vec()))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::language::errors::DiagKind;
    use crate::language::lint::{
        check_expression, check_module, check_pattern, Failure, LintOpts, Success,
    };
    use crate::language::reader::{read_forms, read_node};

    fn lint_with(source: &str, opts: LintOpts) -> Result<Success, Failure> {
        let forms = read_forms(source).expect("read");
        check_module(&forms, "t.srl", opts)
    }

    fn fun_errors_with(params: &str, body: &str, opts: LintOpts) -> Vec<DiagKind> {
        let source = format!(
            "(module-def m () ())\n(define-function f () (lambda {} {}))",
            params, body
        );
        match lint_with(&source, opts) {
            Ok(_) => Vec::new(),
            Err(failure) => failure.errors.into_iter().map(|d| d.kind).collect(),
        }
    }

    fn fun_errors(params: &str, body: &str) -> Vec<DiagKind> {
        fun_errors_with(params, body, LintOpts::default())
    }

    #[test]
    fn bound_variables_resolve() {
        assert_eq!(fun_errors("(x)", "x"), vec![]);
        assert_eq!(
            fun_errors("(x)", "y"),
            vec![DiagKind::UnboundSymbol("y".to_string())]
        );
    }

    #[test]
    fn quoted_data_is_literal() {
        assert_eq!(fun_errors("()", "'(1 2 #(a b) \"s\")"), vec![]);
        assert_eq!(
            fun_errors("()", "(quote a b)"),
            vec![DiagKind::BadForm("quote".to_string())]
        );
    }

    #[test]
    fn fixed_arity_forms_are_enforced() {
        assert_eq!(
            fun_errors("(x y)", "(car x y)"),
            vec![DiagKind::BadForm("car".to_string())]
        );
        assert_eq!(fun_errors("(x)", "(cons (car x) (cdr x))"), vec![]);
        assert_eq!(
            fun_errors("(x)", "(if x 1 2 3)"),
            vec![DiagKind::BadForm("if".to_string())]
        );
    }

    #[test]
    fn applications_resolve_locals_then_primitives() {
        assert_eq!(fun_errors("(x y)", "(+ x y 1)"), vec![]);
        assert_eq!(fun_errors("(x)", "(spawn x)"), vec![]);
        assert_eq!(
            fun_errors("(x)", "(frob x)"),
            vec![DiagKind::UndefinedFunction("frob".to_string(), 1)]
        );
        assert_eq!(
            fun_errors("(x)", "(is_atom x x)"),
            vec![DiagKind::UndefinedFunction("is_atom".to_string(), 2)]
        );
    }

    #[test]
    fn non_symbol_heads_are_flagged_but_tails_checked() {
        assert_eq!(fun_errors("()", "(1 2 3)"), vec![]);
        assert_eq!(
            fun_errors("(x)", "(1 x y)"),
            vec![
                DiagKind::BadForm("application".to_string()),
                DiagKind::UnboundSymbol("y".to_string()),
            ]
        );
    }

    #[test]
    fn lambda_parameters_must_be_distinct_symbols() {
        assert_eq!(
            fun_errors("(x)", "(lambda (y y) y)"),
            vec![DiagKind::MultiVar("y".to_string())]
        );
        assert_eq!(fun_errors("(x)", "(lambda (_ _) 1)"), vec![]);
        assert_eq!(
            fun_errors("(x)", "(lambda (1) 1)"),
            vec![DiagKind::BadForm("lambda".to_string())]
        );
    }

    #[test]
    fn match_lambda_clause_arity_follows_the_first_clause() {
        assert_eq!(
            fun_errors("()", "(match-lambda ((x) x) ((x y) x))"),
            vec![DiagKind::BadArity {
                found: 2,
                expected: 1
            }]
        );
        assert_eq!(
            fun_errors("()", "(match-lambda ((x) x) ((y) y))"),
            vec![]
        );
    }

    #[test]
    fn let_bindings_are_simultaneous() {
        assert_eq!(
            fun_errors("(x)", "(let ((a 1) (b a)) b)"),
            vec![DiagKind::UnboundSymbol("a".to_string())]
        );
    }

    #[test]
    fn let_sibling_bindings_must_be_disjoint() {
        assert_eq!(
            fun_errors(
                "(v1 v2)",
                "(let (((tuple a b) v1) ((tuple a c) v2)) (tuple a b c))"
            ),
            vec![DiagKind::MultiVar("a".to_string())]
        );
    }

    #[test]
    fn let_binding_guards_see_the_pattern_variables() {
        assert_eq!(
            fun_errors("(x)", "(let ((a (when (is_integer a)) x)) a)"),
            vec![]
        );
    }

    #[test]
    fn let_function_bodies_see_only_the_outer_environment() {
        assert_eq!(
            fun_errors(
                "(x)",
                "(let-function ((f (lambda (n) (g n))) (g (lambda (n) n))) (f x))"
            ),
            vec![DiagKind::UndefinedFunction("g".to_string(), 1)]
        );
    }

    #[test]
    fn letrec_function_bindings_are_mutually_visible() {
        assert_eq!(
            fun_errors(
                "(x)",
                "(letrec-function ((f (lambda (n) (g n))) (g (lambda (n) (f n)))) (f x))"
            ),
            vec![]
        );
    }

    #[test]
    fn sibling_function_bindings_must_not_collide() {
        assert_eq!(
            fun_errors(
                "(x)",
                "(let-function ((f (lambda (n) n)) (f (lambda (n) n))) (f x))"
            ),
            vec![DiagKind::RedefineFunction("f".to_string(), 1)]
        );
    }

    #[test]
    fn case_clauses_get_their_own_scopes() {
        assert_eq!(fun_errors("(x)", "(case x ((a a) (b b)))"), vec![]);
        assert_eq!(
            fun_errors("(x)", "(case x ((a b)))"),
            vec![DiagKind::UnboundSymbol("b".to_string())]
        );
        assert_eq!(
            fun_errors("(x)", "(case x)"),
            vec![DiagKind::BadForm("case".to_string())]
        );
    }

    #[test]
    fn receive_allows_one_trailing_after_clause() {
        assert_eq!(fun_errors("()", "(receive (y y) (after 10 1))"), vec![]);
        assert_eq!(fun_errors("()", "(receive (after 10 1))"), vec![]);
        assert_eq!(
            fun_errors("()", "(receive (after 10 1) (y y))"),
            vec![DiagKind::BadForm("receive".to_string())]
        );
    }

    #[test]
    fn try_requires_catch_or_after() {
        assert_eq!(fun_errors("()", "(try 1 (catch (_ 0)))"), vec![]);
        assert_eq!(fun_errors("()", "(try 1 (after 0))"), vec![]);
        assert_eq!(
            fun_errors("()", "(try 1)"),
            vec![DiagKind::BadForm("try".to_string())]
        );
        assert_eq!(
            fun_errors("()", "(try 1 (case (r r)) (catch (_ 0)) (after 0))"),
            vec![]
        );
    }

    #[test]
    fn catch_clause_patterns_are_restricted() {
        assert_eq!(
            fun_errors("()", "(try 1 (catch ((tuple _ r st) (tuple r st))))"),
            vec![]
        );
        assert_eq!(
            fun_errors("(st)", "(try 1 (catch ((tuple _ r st) r)))"),
            vec![DiagKind::IllegalStacktrace("st".to_string())]
        );
        assert_eq!(
            fun_errors("()", "(try 1 (catch ((list a b) a)))"),
            vec![DiagKind::IllegalException]
        );
    }

    #[test]
    fn guards_accept_trusted_primitives_only() {
        assert_eq!(fun_errors("(x)", "(case x ((y (when (is_atom y)) y)))"), vec![]);
        assert_eq!(
            fun_errors("(x)", "(case x ((y (when (spawn y)) y)))"),
            vec![DiagKind::IllegalGuard]
        );
        assert_eq!(
            fun_errors("(x)", "(case x ((y (when (lambda (z) z)) y)))"),
            vec![DiagKind::IllegalGuard]
        );
    }

    #[test]
    fn guard_forms_check_their_arity() {
        assert_eq!(
            fun_errors("(x)", "(case x ((y (when (car y y)) y)))"),
            vec![DiagKind::BadGuardForm("car".to_string())]
        );
    }

    #[test]
    fn qualified_guard_calls_must_hit_the_core_module() {
        assert_eq!(
            fun_errors("(x)", "(case x ((y (when (call 'core 'is_atom y)) y)))"),
            vec![]
        );
        assert_eq!(
            fun_errors("(x)", "(case x ((y (when (call 'os 'time)) y)))"),
            vec![DiagKind::IllegalGuard]
        );
        assert_eq!(
            fun_errors("(x)", "(case x ((y (when (call 'core 'spawn y)) y)))"),
            vec![DiagKind::IllegalGuard]
        );
    }

    #[test]
    fn local_bindings_poison_guard_calls_but_not_expressions() {
        // In an ordinary expression the local binding legitimately shadows
        // the primitive.
        assert_eq!(
            fun_errors("(x)", "(let-function ((is_atom (lambda (z) z))) (is_atom x))"),
            vec![]
        );
        // In guard position the same binding makes the call untrusted.
        assert_eq!(
            fun_errors(
                "(x)",
                "(let-function ((is_atom (lambda (z) z))) (case x ((y (when (is_atom y)) y))))"
            ),
            vec![DiagKind::IllegalGuard]
        );
    }

    #[test]
    fn guard_map_removal_is_rejected() {
        assert_eq!(
            fun_errors("(m)", "(case m ((y (when (map-size y)) y)))"),
            vec![]
        );
        assert_eq!(
            fun_errors("(m)", "(case m ((y (when (map-remove y 'k)) y)))"),
            vec![DiagKind::IllegalGuard]
        );
    }

    #[test]
    fn map_forms_require_the_map_capability() {
        let no_maps = LintOpts {
            maps: false,
            literal_map_keys: false,
        };
        assert_eq!(
            fun_errors_with("(m)", "(map-get m 'k)", no_maps),
            vec![DiagKind::UndefinedFunction("map-get".to_string(), 2)]
        );
        assert_eq!(fun_errors("(m)", "(map-get m 'k)"), vec![]);
    }

    #[test]
    fn strict_mode_requires_literal_map_keys_in_expressions() {
        let strict = LintOpts {
            maps: true,
            literal_map_keys: true,
        };
        assert_eq!(
            fun_errors_with("(x)", "(map (tuple x) 1)", strict),
            vec![DiagKind::IllegalMapKey]
        );
        assert_eq!(fun_errors_with("(x)", "(map 'k x)", strict), vec![]);
        // Relaxed mode lets keys be computed.
        assert_eq!(fun_errors("(x)", "(map (tuple x) 1)"), vec![]);
    }

    #[test]
    fn map_patterns_always_require_literal_keys() {
        assert_eq!(
            fun_errors("(m)", "(case m (((map (tuple 1 2) v) v)))"),
            vec![DiagKind::IllegalMapKey]
        );
        assert_eq!(fun_errors("(m)", "(case m (((map 'k v) v)))"), vec![]);
        assert_eq!(fun_errors("(m)", "(case m (((map 1 v) v)))"), vec![]);
    }

    #[test]
    fn binary_expression_sizes_are_expressions() {
        assert_eq!(fun_errors("(x n)", "(binary (x (size n)))"), vec![]);
        assert_eq!(
            fun_errors("(x)", "(binary (x (size n)))"),
            vec![DiagKind::UnboundSymbol("n".to_string())]
        );
        assert_eq!(fun_errors("(x)", "(binary (x (size 8)) (0 (size 8)))"), vec![]);
    }

    #[test]
    fn bit_size_rules_per_element_kind() {
        assert_eq!(
            fun_errors("(x)", "(binary (x (size all)))"),
            vec![DiagKind::IllegalBitSize]
        );
        assert_eq!(fun_errors("(x)", "(binary (x binary))"), vec![]);
        assert_eq!(
            fun_errors("(x)", "(binary (x utf8 (size 8)))"),
            vec![DiagKind::IllegalBitSize]
        );
        assert_eq!(fun_errors("(x)", "(binary (x utf8))"), vec![]);
        assert_eq!(
            fun_errors("(x)", "(binary (x quad))"),
            vec![DiagKind::UndefinedBitType("quad".to_string())]
        );
    }

    #[test]
    fn binary_pattern_sizes_see_earlier_segments_only() {
        assert_eq!(
            fun_errors("(b)", "(case b (((binary (n (size 8)) (x (size n))) x)))"),
            vec![]
        );
        assert_eq!(
            fun_errors("(b)", "(case b (((binary (x (size n)) (n (size 8))) x)))"),
            vec![DiagKind::UnboundSymbol("n".to_string())]
        );
        // Enclosing bindings are fine as sizes.
        assert_eq!(
            fun_errors("(b n)", "(case b (((binary (x (size n))) x)))"),
            vec![]
        );
    }

    #[test]
    fn binary_pattern_variables_join_the_pattern_set() {
        assert_eq!(
            fun_errors("(b)", "(case b (((binary (x (size 8)) (y binary)) (tuple x y))))"),
            vec![]
        );
    }

    #[test]
    fn alias_patterns_union_their_variables() {
        assert_eq!(
            fun_errors("(x)", "(case x (((= (list a b) (cons a (cons b ()))) (tuple a b))))"),
            vec![]
        );
    }

    #[test]
    fn incompatible_aliases_are_reported() {
        assert_eq!(
            fun_errors("(x)", "(case x (((= (tuple a) (tuple b c)) a)))"),
            vec![DiagKind::BadAlias]
        );
        assert_eq!(
            fun_errors(
                "(x)",
                "(case x (((= (binary (y (size 8))) (binary (z (size 8)))) y)))"
            ),
            vec![DiagKind::BadAlias]
        );
        assert_eq!(
            fun_errors("(x)", "(case x (((= (list a) ()) a)))"),
            vec![DiagKind::BadAlias]
        );
        // A bare variable aliases anything, binaries included.
        assert_eq!(
            fun_errors("(x)", "(case x (((= whole (binary (y (size 8)))) whole)))"),
            vec![]
        );
    }

    #[test]
    fn legacy_bare_list_patterns_still_work() {
        assert_eq!(fun_errors("(x)", "(case x (((a b) (tuple a b))))"), vec![]);
    }

    #[test]
    fn record_expressions_check_fields() {
        let source = "(module-def m ((record (point x y))) ())\n\
                      (define-function f () (lambda (p) (record point x 1 _ 0)))\n\
                      (define-function g () (lambda (p) (record-update p point z 1)))\n\
                      (define-function h () (lambda (p) (record-field p point x)))";
        let failure = lint_with(source, LintOpts::default()).unwrap_err();
        assert_eq!(
            failure.errors.iter().map(|d| &d.kind).collect::<Vec<_>>(),
            vec![&DiagKind::UndefinedRecordField(
                "point".to_string(),
                "z".to_string()
            )]
        );
    }

    #[test]
    fn unknown_records_stop_field_checking() {
        assert_eq!(
            fun_errors("(p)", "(record line x 1)"),
            vec![DiagKind::UndefinedRecord("line".to_string())]
        );
    }

    #[test]
    fn record_patterns_bind_their_field_values() {
        let source = "(module-def m ((record (point x y))) ())\n\
                      (define-function f () (lambda (p) (case p (((record point x px) px)))))";
        assert!(lint_with(source, LintOpts::default()).is_ok());
    }

    #[test]
    fn progn_and_funcall_and_call() {
        assert_eq!(fun_errors("(x)", "(progn x 1)"), vec![]);
        assert_eq!(fun_errors("(f x)", "(funcall f x)"), vec![]);
        assert_eq!(fun_errors("(x)", "(call 'os 'time)"), vec![]);
        assert_eq!(
            fun_errors("()", "(funcall)"),
            vec![DiagKind::BadForm("funcall".to_string())]
        );
    }

    #[test]
    fn function_captures_are_shape_checked() {
        assert_eq!(fun_errors("()", "(function car 1)"), vec![]);
        assert_eq!(fun_errors("()", "(function lists reverse 1)"), vec![]);
        assert_eq!(
            fun_errors("()", "(function car -1)"),
            vec![DiagKind::BadForm("function".to_string())]
        );
    }

    #[test]
    fn standalone_expression_entry_point() {
        assert!(check_expression(&read_node("(cons 1 ())").unwrap()).is_ok());
        let failure = check_expression(&read_node("(frob 1)").unwrap()).unwrap_err();
        assert_eq!(
            failure.errors[0].kind,
            DiagKind::UndefinedFunction("frob".to_string(), 1)
        );
    }

    #[test]
    fn standalone_pattern_entry_point() {
        // Repeating a variable inside one pattern is tolerated here;
        // cross-binding duplication is the binding forms' business.
        assert!(check_pattern(&read_node("(tuple x x)").unwrap()).is_ok());
        let failure =
            check_pattern(&read_node("(= (binary (x (size 8))) (binary (y (size 8))))").unwrap())
                .unwrap_err();
        assert_eq!(failure.errors[0].kind, DiagKind::BadAlias);
    }

    #[test]
    fn pattern_variables_accumulate_across_alias_sides() {
        let mut pvs = BTreeSet::new();
        let mut st = crate::language::lint::test_linter();
        let pattern = read_node("(= (tuple a b) (tuple a c))").unwrap();
        st.check_pattern(
            &pattern,
            &mut pvs,
            &crate::language::lint::Env::new(),
            1,
        );
        assert_eq!(
            pvs.into_iter().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }
}
