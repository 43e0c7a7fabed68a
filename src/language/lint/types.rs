//! Structural validator for type expressions and function specifications.
//! This is a syntactic well-formedness check, not inference: it walks a type
//! expression, counts type-variable occurrences and verifies record
//! references, leaving calls to types it cannot see (other modules) alone.

use std::collections::{BTreeMap, HashMap};

use super::Record;
use crate::language::ast::Node;

/// Occurrences per type variable, in name order.
pub type VarCounts = BTreeMap<String, u32>;

#[derive(Clone, Debug, PartialEq)]
pub enum TypeError {
    BadType,
    BadSpec,
    SpecArity { found: usize, expected: usize },
    UndefinedRecord(String),
}

/// Validate a type definition body against its parameter list. The
/// parameters count as occurrences, so a parameter the body never mentions
/// comes back with a count of one.
pub fn check_type_def(
    params: &[Node],
    def: &Node,
    records: &HashMap<String, Record>,
) -> Result<VarCounts, (TypeError, VarCounts)> {
    let mut counts = VarCounts::new();
    for param in params {
        match param.as_symbol() {
            Some(var) => bump(&mut counts, var),
            None => return Err((TypeError::BadType, counts)),
        }
    }
    match check_type(def, records, &mut counts) {
        Ok(()) => Ok(counts),
        Err(err) => Err((err, counts)),
    }
}

/// Validate the clauses of a function specification against the function's
/// arity. Type variables are scoped per clause, so each clause gets its own
/// usage counts.
pub fn check_func_spec(
    clauses: &[Node],
    arity: usize,
    records: &HashMap<String, Record>,
) -> Result<Vec<VarCounts>, (TypeError, Vec<VarCounts>)> {
    if clauses.is_empty() {
        return Err((TypeError::BadSpec, Vec::new()));
    }
    let mut all = Vec::new();
    for clause in clauses {
        let mut counts = VarCounts::new();
        let result = check_spec_clause(clause, arity, records, &mut counts);
        all.push(counts);
        if let Err(err) = result {
            return Err((err, all));
        }
    }
    Ok(all)
}

/// Validate one type expression on its own, as record field types need.
pub fn check_type_expr(
    ty: &Node,
    records: &HashMap<String, Record>,
) -> Result<VarCounts, (TypeError, VarCounts)> {
    let mut counts = VarCounts::new();
    match check_type(ty, records, &mut counts) {
        Ok(()) => Ok(counts),
        Err(err) => Err((err, counts)),
    }
}

fn check_spec_clause(
    clause: &Node,
    arity: usize,
    records: &HashMap<String, Record>,
    counts: &mut VarCounts,
) -> Result<(), TypeError> {
    match clause.as_list() {
        Some([Node::List(args), ret]) => {
            if args.len() != arity {
                return Err(TypeError::SpecArity {
                    found: args.len(),
                    expected: arity,
                });
            }
            for arg in args {
                check_type(arg, records, counts)?;
            }
            check_type(ret, records, counts)
        }
        _ => Err(TypeError::BadSpec),
    }
}

fn check_type(
    ty: &Node,
    records: &HashMap<String, Record>,
    counts: &mut VarCounts,
) -> Result<(), TypeError> {
    match ty {
        Node::Symbol(var) => {
            bump(counts, var);
            Ok(())
        }
        Node::Int(_) => Ok(()),
        Node::List(items) if items.is_empty() => Ok(()),
        Node::List(items) => check_type_form(items, records, counts),
        _ => Err(TypeError::BadType),
    }
}

fn check_type_form(
    items: &[Node],
    records: &HashMap<String, Record>,
    counts: &mut VarCounts,
) -> Result<(), TypeError> {
    let [head, args @ ..] = items else {
        return Err(TypeError::BadType);
    };
    match head.as_symbol() {
        None => Err(TypeError::BadType),
        Some("quote") => match args {
            [Node::Symbol(_)] | [Node::Int(_)] => Ok(()),
            _ => Err(TypeError::BadType),
        },
        Some("lambda") => match args {
            [any, ret] if any.is_symbol("any") => check_type(ret, records, counts),
            [Node::List(params), ret] => {
                for param in params {
                    check_type(param, records, counts)?;
                }
                check_type(ret, records, counts)
            }
            _ => Err(TypeError::BadType),
        },
        Some("map") => {
            if args.len() % 2 != 0 {
                return Err(TypeError::BadType);
            }
            for arg in args {
                check_type(arg, records, counts)?;
            }
            Ok(())
        }
        Some("record") => match args {
            [Node::Symbol(name)] => {
                if records.contains_key(name) {
                    Ok(())
                } else {
                    Err(TypeError::UndefinedRecord(name.clone()))
                }
            }
            _ => Err(TypeError::BadType),
        },
        Some("range") => match args {
            [Node::Int(_), Node::Int(_)] => Ok(()),
            _ => Err(TypeError::BadType),
        },
        Some("list") if args.len() > 1 => Err(TypeError::BadType),
        Some(_) => {
            // Builtin formers and calls to named types, local or remote;
            // unknown names are left for the module that owns them.
            for arg in args {
                check_type(arg, records, counts)?;
            }
            Ok(())
        }
    }
}

fn bump(counts: &mut VarCounts, var: &str) {
    *counts.entry(var.to_string()).or_insert(0) += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::reader::read_node;

    fn records_with_point() -> HashMap<String, Record> {
        let mut records = HashMap::new();
        records.insert(
            "point".to_string(),
            Record {
                fields: vec!["x".to_string(), "y".to_string()],
            },
        );
        records
    }

    fn ty(source: &str) -> Node {
        read_node(source).expect("type expression")
    }

    #[test]
    fn parameters_count_as_occurrences() {
        let params = [Node::symbol("a"), Node::symbol("b")];
        let counts =
            check_type_def(&params, &ty("(tuple a b)"), &HashMap::new()).expect("well formed");
        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.get("b"), Some(&2));
    }

    #[test]
    fn unused_parameter_is_a_singleton() {
        let params = [Node::symbol("a")];
        let counts = check_type_def(&params, &ty("(integer)"), &HashMap::new()).expect("ok");
        assert_eq!(counts.get("a"), Some(&1));
    }

    #[test]
    fn record_references_are_resolved() {
        assert!(check_type_expr(&ty("(record point)"), &records_with_point()).is_ok());
        let err = check_type_expr(&ty("(record line)"), &records_with_point());
        assert!(matches!(
            err,
            Err((TypeError::UndefinedRecord(name), _)) if name == "line"
        ));
    }

    #[test]
    fn spec_clause_arity_must_match() {
        let clauses = [ty("(((integer) (integer)) (integer))")];
        let err = check_func_spec(&clauses, 1, &HashMap::new());
        assert!(matches!(
            err,
            Err((TypeError::SpecArity { found: 2, expected: 1 }, _))
        ));
    }

    #[test]
    fn spec_variables_are_scoped_per_clause() {
        let clauses = [ty("((a) a)"), ty("((b) b)")];
        let counts = check_func_spec(&clauses, 1, &HashMap::new()).expect("ok");
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].get("a"), Some(&2));
        assert_eq!(counts[1].get("b"), Some(&2));
    }

    #[test]
    fn malformed_types_are_rejected() {
        assert!(matches!(
            check_type_expr(&ty("\"no\""), &HashMap::new()),
            Err((TypeError::BadType, _))
        ));
        assert!(matches!(
            check_type_expr(&ty("(lambda)"), &HashMap::new()),
            Err((TypeError::BadType, _))
        ));
    }
}
