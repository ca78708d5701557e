//! Indentation-aware line writer for generated TypeScript.

const INDENT: &str = "  ";

/// Builds generated source text line by line.
#[derive(Debug, Default, Clone)]
pub struct CodeWriter {
    indent_level: usize,
    buffer: String,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line with the current indentation.
    pub fn line(&mut self, s: &str) -> &mut Self {
        for _ in 0..self.indent_level {
            self.buffer.push_str(INDENT);
        }
        self.buffer.push_str(s);
        self.buffer.push('\n');
        self
    }

    /// Add a blank line, collapsing runs of blank lines into one.
    pub fn blank(&mut self) -> &mut Self {
        if !self.buffer.is_empty() && !self.buffer.ends_with("\n\n") {
            self.buffer.push('\n');
        }
        self
    }

    /// Add a block: header line, indented body, closing line.
    pub fn block<F>(&mut self, header: &str, close: &str, body: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.line(header);
        self.indent_level += 1;
        body(self);
        self.indent_level = self.indent_level.saturating_sub(1);
        self.line(close)
    }

    /// Finish and return the text, ending with exactly one newline.
    pub fn build(mut self) -> String {
        while self.buffer.ends_with("\n\n") {
            self.buffer.pop();
        }
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_indents_body() {
        let mut w = CodeWriter::new();
        w.block("const x = {", "};", |w| {
            w.line("a: 1,");
            w.block("b: {", "},", |w| {
                w.line("c: 2,");
            });
        });
        assert_eq!(w.build(), "const x = {\n  a: 1,\n  b: {\n    c: 2,\n  },\n};\n");
    }

    #[test]
    fn test_blank_lines_collapse() {
        let mut w = CodeWriter::new();
        w.blank();
        w.line("a");
        w.blank().blank().blank();
        w.line("b");
        w.blank();
        assert_eq!(w.build(), "a\n\nb\n");
    }
}
