//! Registry of the primitives the backend provides. Core primitives are the
//! pure data, arithmetic and type-test operations of the `core` module; host
//! primitives are the effectful runtime operations. The guard-safe list is
//! the subset of core primitives trusted in guard position.

/// Module qualified guard calls may only address this module.
pub const CORE_MODULE: &str = "core";

pub fn is_core_primitive(name: &str, arity: usize) -> bool {
    if is_guard_safe_primitive(name, arity) {
        return true;
    }
    matches!(
        (name, arity),
        ("atom_to_list", 1)
            | ("list_to_atom", 1)
            | ("integer_to_list", 1 | 2)
            | ("list_to_integer", 1 | 2)
            | ("float_to_list", 1)
            | ("list_to_float", 1)
            | ("binary_to_list", 1 | 3)
            | ("list_to_binary", 1)
            | ("bitstring_to_list", 1)
            | ("list_to_bitstring", 1)
            | ("tuple_to_list", 1)
            | ("list_to_tuple", 1)
            | ("setelement", 3)
            | ("split_binary", 2)
            | ("binary_part", 2 | 3)
            | ("iolist_to_binary", 1)
            | ("iolist_size", 1)
            | ("min", 2)
            | ("max", 2)
            | ("++", 2)
            | ("--", 2)
    )
}

pub fn is_host_primitive(name: &str, arity: usize) -> bool {
    matches!(
        (name, arity),
        ("spawn", 1 | 2 | 3)
            | ("spawn_link", 1 | 2 | 3)
            | ("send", 2)
            | ("self", 0)
            | ("exit", 1 | 2)
            | ("throw", 1)
            | ("error", 1 | 2)
            | ("raise", 3)
            | ("apply", 2 | 3)
            | ("make_ref", 0)
            | ("node", 0 | 1)
            | ("link", 1)
            | ("unlink", 1)
            | ("monitor", 2)
            | ("demonitor", 1)
            | ("register", 2)
            | ("unregister", 1)
            | ("whereis", 1)
            | ("process_flag", 2)
            | ("halt", 0 | 1)
    )
}

pub fn is_guard_safe_primitive(name: &str, arity: usize) -> bool {
    match (name, arity) {
        (
            "is_atom" | "is_binary" | "is_bitstring" | "is_boolean" | "is_float" | "is_function"
            | "is_integer" | "is_list" | "is_map" | "is_number" | "is_pid" | "is_port"
            | "is_reference" | "is_tuple",
            1,
        ) => true,
        ("is_function", 2) => true,
        ("==" | "/=" | "<" | ">" | "=<" | ">=" | "=:=" | "=/=", 2) => true,
        ("+" | "-" | "*" | "/", n) => n >= 1,
        ("div" | "rem" | "band" | "bor" | "bxor" | "bsl" | "bsr", 2) => true,
        ("and" | "or" | "xor", 2) => true,
        ("bnot" | "not" | "abs" | "trunc" | "round" | "float", 1) => true,
        ("element", 2) | ("map_get", 2) => true,
        (
            "hd" | "tl" | "length" | "size" | "tuple_size" | "byte_size" | "bit_size"
            | "map_size",
            1,
        ) => true,
        _ => false,
    }
}

pub fn is_builtin_type(name: &str, arity: usize) -> bool {
    match (name, arity) {
        (
            "any" | "none" | "term" | "atom" | "integer" | "non_neg_integer" | "pos_integer"
            | "neg_integer" | "float" | "number" | "boolean" | "byte" | "char" | "nil"
            | "string" | "binary" | "bitstring" | "pid" | "port" | "reference" | "map"
            | "function",
            0,
        ) => true,
        ("list", 0 | 1) => true,
        ("tuple" | "union", _) => true,
        ("range", 2) => true,
        _ => false,
    }
}
