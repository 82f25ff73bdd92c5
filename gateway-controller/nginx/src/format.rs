/// Writes indented nginx configuration text.
#[derive(Debug)]
pub(crate) struct Formatter<'a> {
    /// Write destination
    dst: &'a mut String,

    /// Number of spaces to start a new line with
    spaces: usize,

    /// Number of spaces per indentation
    indent: usize,
}

const DEFAULT_INDENT: usize = 4;

// === impl Formatter ===

impl<'a> Formatter<'a> {
    pub(crate) fn new(dst: &'a mut String) -> Self {
        Self {
            dst,
            spaces: 0,
            indent: DEFAULT_INDENT,
        }
    }

    /// Writes `header { ... }`, calling `f` to write the body one level
    /// deeper.
    pub(crate) fn block<F>(&mut self, header: &str, f: F)
    where
        F: FnOnce(&mut Self),
    {
        self.line(&format!("{header} {{"));
        self.indent(f);
        self.line("}");
    }

    /// Writes `name params...;`.
    pub(crate) fn directive<I, S>(&mut self, name: &str, params: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut line = name.to_string();
        for param in params {
            line.push(' ');
            line.push_str(param.as_ref());
        }
        line.push(';');
        self.line(&line);
    }

    pub(crate) fn line(&mut self, line: &str) {
        if !line.is_empty() {
            self.push_spaces();
        }
        self.dst.push_str(line);
        self.dst.push('\n');
    }

    pub(crate) fn blank(&mut self) {
        self.dst.push('\n');
    }

    /// Call the given function with the indentation level incremented by one.
    fn indent<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.spaces += self.indent;
        let ret = f(self);
        self.spaces -= self.indent;
        ret
    }

    fn push_spaces(&mut self) {
        for _ in 0..self.spaces {
            self.dst.push(' ');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_nested_blocks() {
        let mut out = String::new();
        let mut fmt = Formatter::new(&mut out);
        fmt.block("server", |fmt| {
            fmt.directive("listen", ["80"]);
            fmt.block("location /", |fmt| {
                fmt.directive("return", ["404"]);
            });
        });
        assert_eq!(
            out,
            "server {\n    listen 80;\n    location / {\n        return 404;\n    }\n}\n"
        );
    }
}
