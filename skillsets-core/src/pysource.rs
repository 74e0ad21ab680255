//! Indentation-based outline of Python source: functions, classes, their
//! parameters, body extents and docstrings. It does not build a syntax tree;
//! it reads `def`/`class` headers and follows indentation, skipping the
//! contents of triple-quoted strings.

use once_cell::sync::Lazy;
use regex::Regex;

static DEF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)(async\s+)?def\s+(\w+)\s*\(").unwrap());
static CLASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)class\s+(\w+)").unwrap());
static CONTROL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:async\s+)?(if|elif|for|while|with|try|except)\b").unwrap()
});
static BOOL_OP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(and|or)\b").unwrap());
static STRING_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[rRuUbBfF]{0,2}("""|'''|"|')"#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Function,
    Class,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyBlock {
    pub kind: BlockKind,
    pub name: String,
    pub is_async: bool,
    /// 1-based line of the `def`/`class` keyword.
    pub line: usize,
    /// 1-based last line of the body.
    pub end_line: usize,
    pub indent: usize,
    /// Positional parameter names, `self` and `cls` included.
    pub params: Vec<String>,
    /// Name of the class whose body directly contains this block.
    pub class_name: Option<String>,
    pub docstring: Option<String>,
    /// 1-based first line after the header.
    body_start: usize,
}

impl PyBlock {
    pub fn length(&self) -> usize {
        self.end_line - self.line
    }

    pub fn is_public(&self) -> bool {
        !self.name.starts_with('_')
    }
}

#[derive(Debug, Clone, Default)]
pub struct PyModule {
    pub lines: Vec<String>,
    pub blocks: Vec<PyBlock>,
    pub docstring: Option<String>,
}

impl PyModule {
    pub fn functions(&self) -> impl Iterator<Item = &PyBlock> {
        self.blocks.iter().filter(|b| b.kind == BlockKind::Function)
    }

    pub fn classes(&self) -> impl Iterator<Item = &PyBlock> {
        self.blocks.iter().filter(|b| b.kind == BlockKind::Class)
    }

    /// Lines of the block body, paired with their 1-based numbers.
    pub fn body<'a>(&'a self, block: &PyBlock) -> impl Iterator<Item = (usize, &'a str)> + 'a {
        let start = block.body_start;
        let end = block.end_line;
        self.lines
            .iter()
            .enumerate()
            .skip(start.saturating_sub(1))
            .take(end.saturating_sub(start.saturating_sub(1)))
            .map(|(i, l)| (i + 1, l.as_str()))
    }

    /// McCabe-style count: one plus each branch statement and boolean operator.
    pub fn complexity(&self, block: &PyBlock) -> usize {
        let code = code_lines(&self.lines);
        let mut complexity = 1;
        for (n, line) in self.body(block) {
            if !code[n - 1] {
                continue;
            }
            let stripped = strip_comment(line.trim_start());
            if let Some(caps) = CONTROL_RE.captures(stripped) {
                if matches!(&caps[1], "if" | "elif" | "for" | "while" | "except") {
                    complexity += 1;
                }
            }
            complexity += BOOL_OP_RE.find_iter(&strip_strings(stripped)).count();
        }
        complexity
    }

    /// Deepest stack of `if`/`for`/`while`/`with`/`try` blocks in the body.
    pub fn nesting_depth(&self, block: &PyBlock) -> usize {
        let code = code_lines(&self.lines);
        let mut stack: Vec<usize> = Vec::new();
        let mut max_depth = 0;

        for (n, line) in self.body(block) {
            if !code[n - 1] || line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let indent = indent_of(line);
            while stack.last().is_some_and(|&top| top >= indent) {
                stack.pop();
            }
            if let Some(caps) = CONTROL_RE.captures(line.trim_start()) {
                if matches!(&caps[1], "if" | "for" | "while" | "with" | "try") {
                    stack.push(indent);
                    max_depth = max_depth.max(stack.len());
                }
            }
        }

        max_depth
    }
}

fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn strip_comment(line: &str) -> &str {
    // Good enough for header and keyword detection; a `#` inside a string
    // literal only shortens what is inspected.
    match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    }
}

fn strip_strings(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None => out.push(c),
        }
    }
    out
}

/// Marks lines that are code rather than the inside of a triple-quoted string.
/// The line that opens a string counts as code; following lines up to and
/// including the closing one do not.
pub fn code_lines(lines: &[String]) -> Vec<bool> {
    let mut flags = Vec::with_capacity(lines.len());
    let mut open: Option<&str> = None;

    for line in lines {
        match open {
            Some(delim) => {
                flags.push(false);
                if line.matches(delim).count() % 2 == 1 {
                    open = None;
                }
            }
            None => {
                flags.push(true);
                let code = strip_comment(line);
                for delim in ["\"\"\"", "'''"] {
                    if code.matches(delim).count() % 2 == 1 {
                        open = Some(delim);
                        break;
                    }
                }
            }
        }
    }

    flags
}

/// Splits the text between the outer parentheses of a signature into
/// positional parameter names. Parameters after a bare `*` or `*args`
/// are keyword-only or variadic and are not counted.
fn parse_params(signature: &str) -> Vec<String> {
    let Some(open) = signature.find('(') else {
        return Vec::new();
    };
    let mut depth = 0usize;
    let mut close = signature.len();
    for (i, c) in signature[open..].char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    close = open + i;
                    break;
                }
            }
            _ => {}
        }
    }
    let inner = &signature[open + 1..close.max(open + 1)];

    let mut params = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut parts = Vec::new();
    for c in inner.chars() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);

    for part in parts {
        let part = part.trim();
        if part.is_empty() || part == "/" {
            continue;
        }
        if part.starts_with('*') {
            break;
        }
        let name: String = part
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if !name.is_empty() {
            params.push(name);
        }
    }
    params
}

/// Reads a docstring starting at `lines[idx]`, returning its text.
fn read_docstring(lines: &[String], idx: usize) -> Option<String> {
    let first = lines.get(idx)?.trim_start();
    let caps = STRING_PREFIX_RE.captures(first)?;
    let delim = caps.get(1)?.as_str();
    let after = &first[caps.get(0)?.end()..];

    if let Some(end) = after.find(delim) {
        return Some(after[..end].trim().to_string());
    }
    if delim.len() == 1 {
        return Some(after.trim().to_string());
    }

    let mut text = vec![after.to_string()];
    for line in lines.iter().skip(idx + 1) {
        if let Some(end) = line.find(delim) {
            text.push(line[..end].to_string());
            break;
        }
        text.push(line.clone());
    }
    let joined = text
        .iter()
        .map(|l| l.trim())
        .collect::<Vec<_>>()
        .join("\n");
    Some(joined.trim().to_string())
}

fn first_statement(lines: &[String], code: &[bool], from: usize) -> Option<usize> {
    (from..lines.len()).find(|&i| {
        let t = lines[i].trim();
        code[i] && !t.is_empty() && !t.starts_with('#')
    })
}

pub fn parse(source: &str) -> PyModule {
    let lines: Vec<String> = source.lines().map(|l| l.to_string()).collect();
    let code = code_lines(&lines);

    let docstring = first_statement(&lines, &code, 0).and_then(|i| read_docstring(&lines, i));

    let mut blocks: Vec<PyBlock> = Vec::new();
    // Open classes as (indent, name) for finding direct members.
    let mut scopes: Vec<(usize, Option<String>)> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        if !code[i] || line.trim().is_empty() || line.trim_start().starts_with('#') {
            i += 1;
            continue;
        }

        let indent = indent_of(line);
        while scopes.last().is_some_and(|(d, _)| *d >= indent) {
            scopes.pop();
        }

        let header = if let Some(caps) = DEF_RE.captures(line) {
            Some((BlockKind::Function, caps[3].to_string(), caps.get(2).is_some()))
        } else {
            CLASS_RE
                .captures(line)
                .map(|caps| (BlockKind::Class, caps[2].to_string(), false))
        };

        let Some((kind, name, is_async)) = header else {
            i += 1;
            continue;
        };

        // Headers may span lines until the closing colon.
        let mut signature = line.clone();
        let mut header_end = i;
        let mut balance = paren_balance(strip_comment(line));
        while (balance > 0 || !strip_comment(&lines[header_end]).trim_end().ends_with(':'))
            && header_end + 1 < lines.len()
        {
            header_end += 1;
            signature.push(' ');
            signature.push_str(lines[header_end].trim());
            balance += paren_balance(strip_comment(&lines[header_end]));
        }

        let mut end_line = header_end + 1;
        for j in header_end + 1..lines.len() {
            let l = &lines[j];
            if !code[j] {
                end_line = j + 1;
                continue;
            }
            if l.trim().is_empty() || l.trim_start().starts_with('#') {
                continue;
            }
            if indent_of(l) <= indent {
                break;
            }
            end_line = j + 1;
        }

        let docstring = first_statement(&lines, &code, header_end + 1)
            .filter(|&d| d < end_line && indent_of(&lines[d]) > indent)
            .and_then(|d| read_docstring(&lines, d));

        let class_name = match scopes.last() {
            Some((_, Some(class))) => Some(class.clone()),
            _ => None,
        };

        blocks.push(PyBlock {
            kind,
            name: name.clone(),
            is_async,
            line: i + 1,
            end_line,
            indent,
            params: if kind == BlockKind::Function {
                parse_params(&signature)
            } else {
                Vec::new()
            },
            class_name,
            docstring,
            body_start: header_end + 2,
        });

        scopes.push((
            indent,
            (kind == BlockKind::Class).then(|| name.clone()),
        ));
        i = header_end + 1;
    }

    PyModule {
        lines,
        blocks,
        docstring,
    }
}

fn paren_balance(s: &str) -> i32 {
    s.chars().fold(0, |acc, c| match c {
        '(' | '[' | '{' => acc + 1,
        ')' | ']' | '}' => acc - 1,
        _ => acc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#""""Module docs."""

import os


class Loader:
    """Loads things."""

    def __init__(self, path):
        self.path = path

    async def fetch(self, a, b=1, *args, key=None, **kw):
        '''Fetch data.

        Args:
            a: first
        '''
        if a and b:
            for x in range(3):
                while x:
                    x -= 1
        return a


def helper(
    first,
    second,
):
    # no docstring here
    text = """
def not_a_function():
    pass
"""
    return text


def _private():
    pass
"#;

    #[test]
    fn test_module_docstring() {
        let module = parse(SOURCE);
        assert_eq!(module.docstring.as_deref(), Some("Module docs."));
    }

    #[test]
    fn test_blocks_found() {
        let module = parse(SOURCE);
        let names: Vec<&str> = module.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Loader", "__init__", "fetch", "helper", "_private"]);
    }

    #[test]
    fn test_class_membership() {
        let module = parse(SOURCE);
        let fetch = &module.blocks[2];
        assert_eq!(fetch.class_name.as_deref(), Some("Loader"));
        assert!(fetch.is_async);
        let helper = &module.blocks[3];
        assert_eq!(helper.class_name, None);
    }

    #[test]
    fn test_params() {
        let module = parse(SOURCE);
        assert_eq!(module.blocks[2].params, vec!["self", "a", "b"]);
        assert_eq!(module.blocks[3].params, vec!["first", "second"]);
    }

    #[test]
    fn test_docstrings() {
        let module = parse(SOURCE);
        assert_eq!(module.blocks[0].docstring.as_deref(), Some("Loads things."));
        assert!(module.blocks[1].docstring.is_none());
        let doc = module.blocks[2].docstring.as_deref().unwrap();
        assert!(doc.starts_with("Fetch data."));
        assert!(doc.contains("Args:"));
        assert!(module.blocks[3].docstring.is_none());
    }

    #[test]
    fn test_extent_includes_string_body() {
        let module = parse(SOURCE);
        let helper = &module.blocks[3];
        assert_eq!(module.lines[helper.end_line - 1].trim(), "return text");
    }

    #[test]
    fn test_complexity_and_nesting() {
        let module = parse(SOURCE);
        let fetch = &module.blocks[2];
        // if + and + for + while
        assert_eq!(module.complexity(fetch), 5);
        assert_eq!(module.nesting_depth(fetch), 3);

        let private = &module.blocks[4];
        assert_eq!(module.complexity(private), 1);
        assert_eq!(module.nesting_depth(private), 0);
    }

    #[test]
    fn test_code_lines() {
        let lines: Vec<String> = ["x = '''", "inside", "'''", "y = 1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(code_lines(&lines), vec![true, false, false, true]);
    }
}
