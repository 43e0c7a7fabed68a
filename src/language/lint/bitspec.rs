//! Parser for binary segment specifier lists. Turns the raw specifier forms
//! of one segment into an element kind plus an effective size, applying the
//! per-kind defaults. Whether a given size is legal where the segment occurs
//! is the caller's business.

use crate::language::ast::Node;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitKind {
    Integer,
    Float,
    Binary,
    Bitstring,
    Utf8,
    Utf16,
    Utf32,
}

impl BitKind {
    pub fn is_binary(self) -> bool {
        matches!(self, BitKind::Binary | BitKind::Bitstring)
    }

    pub fn is_utf(self) -> bool {
        matches!(self, BitKind::Utf8 | BitKind::Utf16 | BitKind::Utf32)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BitSize {
    /// Default size for the element kind, in bits.
    Default(u32),
    /// The whole rest of the binary; default for binary kinds.
    All,
    /// No size at all; only the utf kinds get this.
    None,
    /// An explicit `(size EXPR)` specifier.
    Expr(Node),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
    Native,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BitSpec {
    pub size: BitSize,
    pub kind: BitKind,
    pub unit: Option<u32>,
    pub signed: bool,
    pub endian: Endian,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BitSpecError {
    UndefinedType(String),
    BadUnit,
    BadSpec,
}

pub fn parse(specifiers: &[Node]) -> Result<BitSpec, BitSpecError> {
    let mut kind = BitKind::Integer;
    let mut size = None;
    let mut unit = None;
    let mut signed = false;
    let mut endian = Endian::Big;
    for spec in specifiers {
        match spec {
            Node::Symbol(name) => match name.as_str() {
                "integer" => kind = BitKind::Integer,
                "float" => kind = BitKind::Float,
                "binary" | "bytes" => kind = BitKind::Binary,
                "bitstring" | "bits" => kind = BitKind::Bitstring,
                "utf8" => kind = BitKind::Utf8,
                "utf16" => kind = BitKind::Utf16,
                "utf32" => kind = BitKind::Utf32,
                "signed" => signed = true,
                "unsigned" => signed = false,
                "big" => endian = Endian::Big,
                "little" => endian = Endian::Little,
                "native" => endian = Endian::Native,
                other => return Err(BitSpecError::UndefinedType(other.to_string())),
            },
            Node::List(items) => match items.as_slice() {
                [head, value] if head.is_symbol("size") => {
                    if value.is_symbol("all") {
                        size = Some(BitSize::All);
                    } else {
                        size = Some(BitSize::Expr(value.clone()));
                    }
                }
                [head, Node::Int(n)] if head.is_symbol("unit") => {
                    if !(1..=256).contains(n) {
                        return Err(BitSpecError::BadUnit);
                    }
                    unit = Some(*n as u32);
                }
                _ => return Err(BitSpecError::BadSpec),
            },
            _ => return Err(BitSpecError::BadSpec),
        }
    }
    let size = size.unwrap_or(match kind {
        BitKind::Integer => BitSize::Default(8),
        BitKind::Float => BitSize::Default(64),
        BitKind::Binary | BitKind::Bitstring => BitSize::All,
        BitKind::Utf8 | BitKind::Utf16 | BitKind::Utf32 => BitSize::None,
    });
    Ok(BitSpec {
        size,
        kind,
        unit,
        signed,
        endian,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_defaults_to_eight_bits() {
        let spec = parse(&[]).unwrap();
        assert_eq!(spec.kind, BitKind::Integer);
        assert_eq!(spec.size, BitSize::Default(8));
        assert!(!spec.signed);
        assert_eq!(spec.endian, Endian::Big);
    }

    #[test]
    fn float_and_binary_defaults() {
        assert_eq!(
            parse(&[Node::symbol("float")]).unwrap().size,
            BitSize::Default(64)
        );
        assert_eq!(parse(&[Node::symbol("binary")]).unwrap().size, BitSize::All);
        assert_eq!(parse(&[Node::symbol("utf8")]).unwrap().size, BitSize::None);
    }

    #[test]
    fn explicit_size_and_flags() {
        let specs = [
            Node::List(vec![Node::symbol("size"), Node::Int(16)]),
            Node::symbol("little"),
            Node::symbol("signed"),
        ];
        let spec = parse(&specs).unwrap();
        assert_eq!(spec.size, BitSize::Expr(Node::Int(16)));
        assert_eq!(spec.endian, Endian::Little);
        assert!(spec.signed);
    }

    #[test]
    fn size_all_is_recognized() {
        let specs = [Node::List(vec![Node::symbol("size"), Node::symbol("all")])];
        assert_eq!(parse(&specs).unwrap().size, BitSize::All);
    }

    #[test]
    fn unknown_specifier_is_rejected() {
        assert_eq!(
            parse(&[Node::symbol("quad")]),
            Err(BitSpecError::UndefinedType("quad".to_string()))
        );
        let bad_unit = [Node::List(vec![Node::symbol("unit"), Node::Int(0)])];
        assert_eq!(parse(&bad_unit), Err(BitSpecError::BadUnit));
    }
}
