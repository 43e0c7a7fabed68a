use crate::language::errors::{self, ReadError};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct LintReport {
    #[source_code]
    src: NamedSource,
    #[label("{label}")]
    span: SourceSpan,
    message: String,
    label: String,
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(severity(Warning))]
pub struct LintWarning {
    #[source_code]
    src: NamedSource,
    #[label("{label}")]
    span: SourceSpan,
    message: String,
    label: String,
}

pub fn emit_reports(
    path: &str,
    source: &str,
    errors: &[errors::Diagnostic],
    warnings: &[errors::Diagnostic],
) {
    for warning in warnings {
        let report = LintWarning {
            src: NamedSource::new(path, source.to_string()),
            span: line_span(source, warning.line),
            message: warning.kind.to_string(),
            label: warning.origin.to_string(),
        };
        eprintln!("{:?}", Report::new(report));
    }
    for error in errors {
        let report = LintReport {
            src: NamedSource::new(path, source.to_string()),
            span: line_span(source, error.line),
            message: error.kind.to_string(),
            label: error.origin.to_string(),
        };
        eprintln!("{:?}", Report::new(report));
    }
}

pub fn report_read_error(path: &str, source: &str, err: &ReadError) {
    let report = LintReport {
        src: NamedSource::new(path, source.to_string()),
        span: line_span(source, err.line),
        message: err.message.clone(),
        label: "reader".to_string(),
    };
    eprintln!("{:?}", Report::new(report));
}

/// Span of a whole 1-based source line, the position granularity the
/// checker works at.
fn line_span(source: &str, line: u32) -> SourceSpan {
    let mut offset = 0usize;
    for (i, text) in source.lines().enumerate() {
        if i as u32 + 1 == line {
            return (offset, text.len().max(1)).into();
        }
        offset += text.len() + 1;
    }
    (source.len().saturating_sub(1), 1).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_spans_cover_the_requested_line() {
        let source = "(a)\n(bb)\n(ccc)\n";
        assert_eq!(line_span(source, 1), (0, 3).into());
        assert_eq!(line_span(source, 2), (4, 4).into());
        assert_eq!(line_span(source, 3), (9, 5).into());
        // Out of range clamps to the end.
        assert_eq!(line_span(source, 9), (14, 1).into());
    }
}
