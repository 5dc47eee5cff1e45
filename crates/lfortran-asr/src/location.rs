//! Source spans and lazy line/column materialization.
//!
//! Grounded on `CodeRange`/`CodeLoc` in the teacher's `parse.rs`: a cheap
//! byte-offset pair carried on every node, with the expensive
//! line/column/preview computation deferred until a diagnostic is actually
//! rendered.
use std::cell::OnceCell;

/// A byte-offset span into one source file. Cheap to copy, carried on every
/// AST and ASR node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start must not exceed end");
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// A 1-indexed line/column pair, materialized only on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

/// Maps byte spans in one source file to `(file, line, column)` ranges.
///
/// The line-start table is built lazily on first use and cached: most
/// compilations never render a diagnostic, so most `SourceMap`s never pay
/// for it.
pub struct SourceMap {
    filename: String,
    source: String,
    line_starts: OnceCell<Vec<u32>>,
}

impl SourceMap {
    #[must_use]
    pub fn new(filename: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            source: source.into(),
            line_starts: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    fn line_starts(&self) -> &[u32] {
        self.line_starts.get_or_init(|| {
            let mut starts = vec![0u32];
            for (i, b) in self.source.bytes().enumerate() {
                if b == b'\n' {
                    starts.push(u32::try_from(i + 1).expect("source file larger than 4 GiB"));
                }
            }
            starts
        })
    }

    /// Materializes the `(start, end)` line/column range for `span`.
    ///
    /// Panics if `span` falls outside the source text; callers only ever
    /// materialize spans they themselves produced while walking this source.
    #[must_use]
    pub fn resolve(&self, span: Span) -> (LineCol, LineCol) {
        (self.locate(span.start), self.locate(span.end))
    }

    fn locate(&self, offset: u32) -> LineCol {
        let starts = self.line_starts();
        let line_idx = match starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = starts[line_idx];
        LineCol {
            line: u32::try_from(line_idx + 1).expect("line count overflow"),
            column: offset - line_start + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SourceMap, Span};

    #[test]
    fn resolves_line_and_column() {
        let map = SourceMap::new("main.f90", "integer :: x\nx = 5\n");
        let (start, end) = map.resolve(Span::new(13, 14));
        assert_eq!(start.line, 2);
        assert_eq!(start.column, 1);
        assert_eq!(end.line, 2);
        assert_eq!(end.column, 2);
    }

    #[test]
    fn merge_takes_the_covering_span() {
        let a = Span::new(5, 10);
        let b = Span::new(2, 7);
        assert_eq!(a.merge(b), Span::new(2, 10));
    }
}
