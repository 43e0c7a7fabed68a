use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::{char, multispace1},
    combinator::{map, opt, value},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult,
};

use crate::language::ast::{Form, Node};
use crate::language::errors::ReadError;

/// Read a whole source text into line-tagged top-level forms. The reader
/// produces plain expanded trees: `'x` becomes `(quote x)` and nothing else
/// is rewritten.
pub fn read_forms(source: &str) -> Result<Vec<Form>, ReadError> {
    let mut forms = Vec::new();
    let mut rest = source;
    loop {
        if let Ok((after, ())) = junk(rest) {
            rest = after;
        }
        if rest.is_empty() {
            break;
        }
        let line = line_at(source, rest);
        match node(rest) {
            Ok((after, parsed)) => {
                forms.push(Form { line, node: parsed });
                rest = after;
            }
            Err(_) => {
                return Err(ReadError {
                    line,
                    message: "malformed expression".to_string(),
                })
            }
        }
    }
    Ok(forms)
}

/// Read exactly one node, for checking isolated expressions and patterns.
pub fn read_node(source: &str) -> Result<Node, ReadError> {
    let forms = read_forms(source)?;
    let mut nodes = forms.into_iter();
    match (nodes.next(), nodes.next()) {
        (Some(form), None) => Ok(form.node),
        (None, _) => Err(ReadError {
            line: 1,
            message: "empty input".to_string(),
        }),
        (Some(_), Some(extra)) => Err(ReadError {
            line: extra.line,
            message: "more than one expression".to_string(),
        }),
    }
}

fn line_at(source: &str, rest: &str) -> u32 {
    let consumed = source.len() - rest.len();
    1 + source[..consumed].bytes().filter(|&b| b == b'\n').count() as u32
}

fn junk(input: &str) -> IResult<&str, ()> {
    value((), many0(alt((value((), multispace1), comment))))(input)
}

fn comment(input: &str) -> IResult<&str, ()> {
    value((), pair(char(';'), opt(is_not("\n"))))(input)
}

fn node(input: &str) -> IResult<&str, Node> {
    preceded(
        junk,
        alt((map_literal, tuple_literal, list, string, quoted, token)),
    )(input)
}

fn seq_body(input: &str) -> IResult<&str, Vec<Node>> {
    delimited(char('('), many0(node), preceded(junk, char(')')))(input)
}

fn list(input: &str) -> IResult<&str, Node> {
    map(seq_body, Node::List)(input)
}

fn tuple_literal(input: &str) -> IResult<&str, Node> {
    map(preceded(char('#'), seq_body), Node::Tuple)(input)
}

fn map_literal(input: &str) -> IResult<&str, Node> {
    let (rest, items) = preceded(alt((tag("#m"), tag("#M"))), seq_body)(input)?;
    if items.len() % 2 != 0 {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut items = items.into_iter();
    while let Some(key) = items.next() {
        if let Some(val) = items.next() {
            pairs.push((key, val));
        }
    }
    Ok((rest, Node::Map(pairs)))
}

fn quoted(input: &str) -> IResult<&str, Node> {
    map(preceded(char('\''), node), |quoted| {
        Node::List(vec![Node::symbol("quote"), quoted])
    })(input)
}

fn string(input: &str) -> IResult<&str, Node> {
    let (rest, _) = char('"')(input)?;
    let mut out = String::new();
    let mut chars = rest.char_indices();
    while let Some((at, c)) = chars.next() {
        match c {
            '"' => return Ok((&rest[at + 1..], Node::Str(out))),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, other)) => out.push(other),
                None => break,
            },
            other => out.push(other),
        }
    }
    Err(nom::Err::Failure(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

fn token(input: &str) -> IResult<&str, Node> {
    map(take_while1(is_token_char), classify)(input)
}

fn is_token_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '"' | ';' | '\'' | '#' | '`' | ',')
}

fn classify(word: &str) -> Node {
    if let Ok(int) = word.parse::<i64>() {
        return Node::Int(int);
    }
    let numeric = word
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
        .unwrap_or(false)
        && word.chars().any(|c| c.is_ascii_digit());
    if numeric {
        if let Ok(float) = word.parse::<f64>() {
            return Node::Float(float);
        }
    }
    Node::Symbol(word.to_string())
}
