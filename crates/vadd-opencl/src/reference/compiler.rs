//! Front-end checks for OpenCL C used by the reference device.
//!
//! This is not a C compiler. It lexes the source, checks delimiter
//! structure and statement termination, and extracts `__kernel` entry
//! points with their parameter lists. Failures are rendered as a
//! clang-style build log, the same shape real OpenCL drivers report.

use std::fmt::Write as _;
use vadd_common::ClStatus;

/// File name used in diagnostics.
pub const SOURCE_NAME: &str = "<kernel>";

const ADDRESS_SPACES: &[&str] =
    &["__global", "global", "__local", "local", "__constant", "constant", "__private", "private"];

/// One kernel parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelParam {
    pub name: String,
    pub address_space: Option<String>,
    pub is_const: bool,
    pub is_pointer: bool,
}

/// A `__kernel` entry point found in the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSignature {
    pub name: String,
    pub params: Vec<KernelParam>,
    /// Body tokens between the braces. Parameter names are replaced by
    /// `$<position>`, so two kernels that differ only in parameter naming,
    /// layout or comments have equal bodies.
    pub body: Vec<String>,
}

/// A failed build: the status `clBuildProgram` returns plus the build log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFailure {
    pub status: ClStatus,
    pub log: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Punct(char),
    Literal(String),
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
    col: usize,
    end_col: usize,
}

#[derive(Debug)]
struct Diagnostic {
    line: usize,
    col: usize,
    message: String,
    note: Option<(usize, usize, String)>,
}

impl Diagnostic {
    fn new(line: usize, col: usize, message: impl Into<String>) -> Self {
        Self { line, col, message: message.into(), note: None }
    }

    fn with_note(mut self, line: usize, col: usize, note: impl Into<String>) -> Self {
        self.note = Some((line, col, note.into()));
        self
    }

    fn render(&self) -> String {
        let mut log = String::new();
        let _ = writeln!(log, "{SOURCE_NAME}:{}:{}: error: {}", self.line, self.col, self.message);
        if let Some((line, col, note)) = &self.note {
            let _ = writeln!(log, "{SOURCE_NAME}:{line}:{col}: note: {note}");
        }
        log.push_str("1 error generated.\n");
        log
    }

    fn into_failure(self) -> BuildFailure {
        BuildFailure { status: ClStatus::BUILD_PROGRAM_FAILURE, log: self.render() }
    }
}

/// Validate `clBuildProgram` options.
pub fn check_options(options: &str) -> Result<(), BuildFailure> {
    for opt in options.split_whitespace() {
        let known = ["-D", "-I", "-W", "-w", "-cl-"].iter().any(|p| opt.starts_with(p));
        if !known {
            return Err(BuildFailure {
                status: ClStatus::INVALID_BUILD_OPTIONS,
                log: format!("error: invalid build option '{opt}'\n"),
            });
        }
    }
    Ok(())
}

/// Check `source` and return its kernel entry points.
pub fn compile(source: &str) -> Result<Vec<KernelSignature>, BuildFailure> {
    let (tokens, eof) = lex(source).map_err(Diagnostic::into_failure)?;
    check_structure(&tokens, eof).map_err(Diagnostic::into_failure)?;
    find_kernels(&tokens).map_err(Diagnostic::into_failure)
}

fn lex(source: &str) -> Result<(Vec<Token>, (usize, usize)), Diagnostic> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let (mut i, mut line, mut col) = (0usize, 1usize, 1usize);
    let mut line_start = true;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            i += 1;
            line += 1;
            col = 1;
            line_start = true;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            col += 1;
            continue;
        }
        // Preprocessor directives run to end of line.
        if c == '#' && line_start {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        line_start = false;

        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            let (open_line, open_col) = (line, col);
            i += 2;
            col += 2;
            loop {
                match chars.get(i) {
                    None => {
                        return Err(Diagnostic::new(open_line, open_col, "unterminated /* comment"));
                    }
                    Some('*') if chars.get(i + 1) == Some(&'/') => {
                        i += 2;
                        col += 2;
                        break;
                    }
                    Some('\n') => {
                        i += 1;
                        line += 1;
                        col = 1;
                    }
                    Some(_) => {
                        i += 1;
                        col += 1;
                    }
                }
            }
            continue;
        }

        let (start, start_col) = (i, col);
        if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                ident.push(chars[i]);
                i += 1;
                col += 1;
            }
            tokens.push(Token { tok: Tok::Ident(ident), line, col: start_col, end_col: col });
        } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit))
        {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '.') {
                i += 1;
                col += 1;
            }
            let text = chars[start..i].iter().collect();
            tokens.push(Token { tok: Tok::Literal(text), line, col: start_col, end_col: col });
        } else if c == '"' || c == '\'' {
            i += 1;
            col += 1;
            while i < chars.len() && chars[i] != c && chars[i] != '\n' {
                if chars[i] == '\\' {
                    i += 1;
                    col += 1;
                }
                i += 1;
                col += 1;
            }
            if chars.get(i) != Some(&c) {
                return Err(Diagnostic::new(line, start_col, "missing terminating quote character"));
            }
            i += 1;
            col += 1;
            let text = chars[start..i].iter().collect();
            tokens.push(Token { tok: Tok::Literal(text), line, col: start_col, end_col: col });
        } else {
            i += 1;
            col += 1;
            tokens.push(Token { tok: Tok::Punct(c), line, col: start_col, end_col: col });
        }
    }
    Ok((tokens, (line, col)))
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn is_punct(token: Option<&Token>, c: char) -> bool {
    matches!(token, Some(Token { tok: Tok::Punct(p), .. }) if *p == c)
}

fn is_ident(token: Option<&Token>, name: &str) -> bool {
    matches!(token, Some(Token { tok: Tok::Ident(s), .. }) if s == name)
}

/// Balanced delimiters, and every statement block ends with a terminated statement.
fn check_structure(tokens: &[Token], eof: (usize, usize)) -> Result<(), Diagnostic> {
    // (opening char, line, col, is statement block)
    let mut stack: Vec<(char, usize, usize, bool)> = Vec::new();

    for (idx, token) in tokens.iter().enumerate() {
        let Tok::Punct(c) = token.tok else { continue };
        let prev = idx.checked_sub(1).map(|p| &tokens[p]);
        match c {
            '(' | '[' | '{' => {
                let block = c == '{'
                    && (prev.is_none()
                        || is_punct(prev, ')')
                        || is_punct(prev, ';')
                        || is_punct(prev, '{')
                        || is_punct(prev, '}')
                        || is_ident(prev, "else")
                        || is_ident(prev, "do"));
                stack.push((c, token.line, token.col, block));
            }
            ')' | ']' | '}' => {
                let Some((open, line, col, block)) = stack.pop() else {
                    return Err(Diagnostic::new(
                        token.line,
                        token.col,
                        format!("extraneous closing '{c}'"),
                    ));
                };
                let expected = closer_for(open);
                if c != expected {
                    return Err(Diagnostic::new(
                        token.line,
                        token.col,
                        format!("expected '{expected}'"),
                    )
                    .with_note(line, col, format!("to match this '{open}'")));
                }
                if block {
                    if let Some(p) = prev {
                        let terminated = is_punct(Some(p), ';')
                            || is_punct(Some(p), '{')
                            || is_punct(Some(p), '}');
                        if !terminated {
                            return Err(Diagnostic::new(
                                p.line,
                                p.end_col,
                                "expected ';' after expression",
                            ));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    if let Some((open, line, col, _)) = stack.pop() {
        return Err(Diagnostic::new(eof.0, eof.1, format!("expected '{}'", closer_for(open)))
            .with_note(line, col, format!("to match this '{open}'")));
    }
    Ok(())
}

/// Index of the token closing the delimiter opened at `open_idx`.
fn matching(tokens: &[Token], open_idx: usize) -> Option<usize> {
    let Tok::Punct(open) = tokens[open_idx].tok else { return None };
    let close = closer_for(open);
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open_idx) {
        match token.tok {
            Tok::Punct(c) if c == open => depth += 1,
            Tok::Punct(c) if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_param(tokens: &[Token]) -> Option<KernelParam> {
    let idents: Vec<&str> = tokens
        .iter()
        .filter_map(|t| match &t.tok {
            Tok::Ident(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();
    if idents.is_empty() || idents == ["void"] {
        return None;
    }
    let name = idents.last().map(|s| s.to_string()).unwrap_or_default();
    let address_space = idents
        .iter()
        .find(|s| ADDRESS_SPACES.contains(*s))
        .map(|s| s.trim_start_matches('_').to_string());
    Some(KernelParam {
        name,
        address_space,
        is_const: idents.contains(&"const"),
        is_pointer: tokens.iter().any(|t| t.tok == Tok::Punct('*')),
    })
}

fn normalize_body(tokens: &[Token], params: &[KernelParam]) -> Vec<String> {
    tokens
        .iter()
        .map(|t| match &t.tok {
            Tok::Ident(s) => match params.iter().position(|p| &p.name == s) {
                Some(pos) => format!("${pos}"),
                None => s.clone(),
            },
            Tok::Punct(c) => c.to_string(),
            Tok::Literal(text) => text.clone(),
        })
        .collect()
}

fn find_kernels(tokens: &[Token]) -> Result<Vec<KernelSignature>, Diagnostic> {
    let mut kernels: Vec<KernelSignature> = Vec::new();
    let mut depth = 0usize;
    let mut i = 0usize;

    while i < tokens.len() {
        match &tokens[i].tok {
            Tok::Punct('{') => depth += 1,
            Tok::Punct('}') => depth = depth.saturating_sub(1),
            Tok::Ident(kw) if depth == 0 && (kw == "__kernel" || kw == "kernel") => {
                let mut j = i + 1;
                if is_ident(tokens.get(j), "__attribute__") && is_punct(tokens.get(j + 1), '(') {
                    j = matching(tokens, j + 1).map_or(tokens.len(), |m| m + 1);
                }
                let Some(ret) = tokens.get(j) else {
                    return Err(Diagnostic::new(tokens[i].line, tokens[i].end_col, "expected function declaration"));
                };
                if !is_ident(Some(ret), "void") {
                    return Err(Diagnostic::new(ret.line, ret.col, "kernel must have void return type"));
                }
                let name_tok = tokens.get(j + 1);
                let Some(Token { tok: Tok::Ident(name), line, col, .. }) = name_tok else {
                    return Err(Diagnostic::new(ret.line, ret.end_col, "expected identifier"));
                };
                if !is_punct(tokens.get(j + 2), '(') {
                    return Err(Diagnostic::new(*line, *col, "expected '(' after kernel name"));
                }
                let close = matching(tokens, j + 2)
                    .ok_or_else(|| Diagnostic::new(*line, *col, "unterminated parameter list"))?;

                let mut params = Vec::new();
                let mut start = j + 3;
                let mut nesting = 0usize;
                for k in (j + 3)..=close {
                    let at_end = k == close;
                    match tokens[k].tok {
                        Tok::Punct('(') | Tok::Punct('[') => nesting += 1,
                        Tok::Punct(')') | Tok::Punct(']') if !at_end => nesting -= 1,
                        _ => {}
                    }
                    if at_end || (nesting == 0 && tokens[k].tok == Tok::Punct(',')) {
                        if let Some(param) = parse_param(&tokens[start..k]) {
                            if param.is_pointer && param.address_space.is_none() {
                                let t = &tokens[start];
                                return Err(Diagnostic::new(
                                    t.line,
                                    t.col,
                                    "pointer arguments to kernel functions must reside in \
                                     '__global', '__constant' or '__local' address space",
                                ));
                            }
                            params.push(param);
                        }
                        start = k + 1;
                    }
                }

                // Declarations without a body are not entry points.
                if is_punct(tokens.get(close + 1), '{') {
                    if kernels.iter().any(|k| &k.name == name) {
                        return Err(Diagnostic::new(*line, *col, format!("redefinition of '{name}'")));
                    }
                    let body_end = matching(tokens, close + 1).unwrap_or(tokens.len());
                    let body = normalize_body(&tokens[close + 2..body_end], &params);
                    kernels.push(KernelSignature { name: name.clone(), params, body });
                }
                i = close + 1;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    Ok(kernels)
}
