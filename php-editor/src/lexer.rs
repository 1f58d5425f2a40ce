//! Lossless PHP lexer.
//!
//! Every byte of the input ends up in exactly one token, whitespace and
//! comments included, so concatenating the token texts gives back the
//! original source. The reconciliation printer relies on this to copy
//! untouched regions verbatim.

use std::ops::Range;

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Text outside of `<?php ... ?>`
    InlineHtml,
    /// `<?php` (with the single whitespace character that follows it) or `<?=`
    OpenTag,
    /// `?>` plus an immediately following newline
    CloseTag,
    Whitespace,
    /// `// ...` or `# ...`
    LineComment,
    /// `/* ... */`
    BlockComment,
    /// `/** ... */`
    DocComment,
    /// `$name`
    Variable,
    /// Identifiers, keywords and (fully) qualified names such as `Foo\Bar`
    Name,
    Number,
    /// Single, double or backtick quoted strings
    String,
    /// `<<<LABEL ... LABEL`
    Heredoc,
    /// Any other single character
    Punct,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::LineComment
                | TokenKind::BlockComment
                | TokenKind::DocComment
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::LineComment | TokenKind::BlockComment | TokenKind::DocComment
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

/// Half-open range of token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

impl TokenSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// The tokens of one source text together with the text itself.
#[derive(Debug, Clone)]
pub struct TokenStream {
    source: String,
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn kind(&self, index: usize) -> Option<TokenKind> {
        self.tokens.get(index).map(|t| t.kind)
    }

    pub fn text(&self, index: usize) -> &str {
        self.tokens
            .get(index)
            .map_or("", |t| &self.source[t.span.clone()])
    }

    /// Byte offset where token `index` starts; one past the last token maps
    /// to the end of the source.
    pub fn offset(&self, index: usize) -> usize {
        self.tokens
            .get(index)
            .map_or(self.source.len(), |t| t.span.start)
    }

    /// Source text covering tokens `from..to`.
    pub fn between(&self, from: usize, to: usize) -> &str {
        let start = self.offset(from);
        let end = self.offset(to).max(start);
        &self.source[start..end]
    }

    pub fn slice(&self, span: TokenSpan) -> &str {
        self.between(span.start, span.end)
    }

    /// Case-insensitive keyword check, as PHP keywords are.
    pub fn is_keyword(&self, index: usize, keyword: &str) -> bool {
        self.kind(index) == Some(TokenKind::Name) && self.text(index).eq_ignore_ascii_case(keyword)
    }

    pub fn is_punct(&self, index: usize, ch: char) -> bool {
        self.kind(index) == Some(TokenKind::Punct) && self.text(index).starts_with(ch)
    }
}

/// Lex a whole file. Input starts as inline HTML until the first open tag.
pub fn lex(source: &str) -> Result<TokenStream, ParseError> {
    Lexer::new(source, Mode::Html).run()
}

/// Lex a code fragment that has no open tag, e.g. a method body.
pub fn lex_code(source: &str) -> Result<TokenStream, ParseError> {
    Lexer::new(source, Mode::Code).run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Html,
    Code,
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    mode: Mode,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, mode: Mode) -> Self {
        Self {
            source,
            pos: 0,
            mode,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<TokenStream, ParseError> {
        while self.pos < self.source.len() {
            match self.mode {
                Mode::Html => self.inline_html(),
                Mode::Code => self.code()?,
            }
        }

        Ok(TokenStream {
            source: self.source.to_string(),
            tokens: self.tokens,
        })
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            span: start..self.pos,
        });
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError::at(self.source, offset, message)
    }

    fn inline_html(&mut self) {
        let start = self.pos;

        if let Some(len) = open_tag_len(self.rest()) {
            self.pos += len;
            self.push(TokenKind::OpenTag, start);
            self.mode = Mode::Code;
            return;
        }

        self.pos = find_open_tag(self.rest()).map_or(self.source.len(), |i| self.pos + i);
        self.push(TokenKind::InlineHtml, start);
    }

    fn code(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let rest = self.rest();
        let Some(c) = rest.chars().next() else {
            return Ok(());
        };

        if rest.starts_with("?>") {
            self.pos += 2;
            if self.rest().starts_with("\r\n") {
                self.pos += 2;
            } else if self.rest().starts_with('\n') {
                self.pos += 1;
            }
            self.push(TokenKind::CloseTag, start);
            self.mode = Mode::Html;
        } else if c.is_ascii_whitespace() {
            self.pos += rest
                .find(|c: char| !c.is_ascii_whitespace())
                .unwrap_or(rest.len());
            self.push(TokenKind::Whitespace, start);
        } else if rest.starts_with("/*") {
            let doc = rest.starts_with("/**") && rest[3..].starts_with(|c: char| c.is_ascii_whitespace());
            let close = rest[2..]
                .find("*/")
                .ok_or_else(|| self.error(start, "unterminated comment"))?;
            self.pos += close + 4;
            let kind = if doc {
                TokenKind::DocComment
            } else {
                TokenKind::BlockComment
            };
            self.push(kind, start);
        } else if rest.starts_with("//") || (c == '#' && !rest.starts_with("#[")) {
            let line_end = rest.find('\n').unwrap_or(rest.len());
            let close_tag = rest[..line_end].find("?>").unwrap_or(line_end);
            self.pos += close_tag;
            self.push(TokenKind::LineComment, start);
        } else if c == '$' && rest[1..].starts_with(is_ident_start) {
            self.pos += 1;
            self.eat_ident();
            self.push(TokenKind::Variable, start);
        } else if rest.starts_with("<<<") {
            self.heredoc(start)?;
        } else if matches!(c, '\'' | '"' | '`') {
            self.quoted(c, start)?;
        } else if c.is_ascii_digit() {
            self.number();
            self.push(TokenKind::Number, start);
        } else if is_ident_start(c) || (c == '\\' && rest[1..].starts_with(is_ident_start)) {
            self.name();
            self.push(TokenKind::Name, start);
        } else {
            self.pos += c.len_utf8();
            self.push(TokenKind::Punct, start);
        }

        Ok(())
    }

    fn eat_ident(&mut self) {
        let rest = self.rest();
        self.pos += rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
    }

    fn name(&mut self) {
        if self.rest().starts_with('\\') {
            self.pos += 1;
        }
        loop {
            self.eat_ident();
            let rest = self.rest();
            if rest.starts_with('\\') && rest[1..].starts_with(is_ident_start) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn number(&mut self) {
        let bytes = self.source.as_bytes();
        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            let fraction = b == b'.' && bytes.get(self.pos + 1).is_some_and(u8::is_ascii_digit);
            if b.is_ascii_alphanumeric() || b == b'_' || fraction {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn quoted(&mut self, quote: char, start: usize) -> Result<(), ParseError> {
        let bytes = self.source.as_bytes();
        self.pos += 1;
        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            if b == b'\\' {
                self.pos += 2;
                continue;
            }
            self.pos += 1;
            if b == quote as u8 {
                self.push(TokenKind::String, start);
                return Ok(());
            }
        }
        Err(self.error(start, "unterminated string literal"))
    }

    fn heredoc(&mut self, start: usize) -> Result<(), ParseError> {
        self.pos += 3;
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start_matches([' ', '\t']).len();

        let quote = self.rest().chars().next().filter(|c| matches!(c, '\'' | '"'));
        if quote.is_some() {
            self.pos += 1;
        }

        let source = self.source;
        let label_start = self.pos;
        self.eat_ident();
        let label = &source[label_start..self.pos];
        if label.is_empty() {
            return Err(self.error(start, "invalid heredoc label"));
        }
        if let Some(q) = quote {
            if !self.rest().starts_with(q) {
                return Err(self.error(start, "unterminated heredoc label"));
            }
            self.pos += 1;
        }

        let newline = self
            .rest()
            .find('\n')
            .ok_or_else(|| self.error(start, "unterminated heredoc"))?;
        self.pos += newline + 1;

        loop {
            let line_start = self.pos;
            let rest = self.rest();
            let line_end = rest.find('\n').unwrap_or(rest.len());
            let line = &rest[..line_end];
            let body = line.trim_start_matches([' ', '\t']);

            if let Some(after) = body.strip_prefix(label) {
                if !after.starts_with(is_ident_char) {
                    self.pos = line_start + (line.len() - body.len()) + label.len();
                    self.push(TokenKind::Heredoc, start);
                    return Ok(());
                }
            }

            if line_end == rest.len() {
                return Err(self.error(start, "unterminated heredoc"));
            }
            self.pos += line_end + 1;
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic() || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

fn open_tag_len(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    if bytes.starts_with(b"<?=") {
        return Some(3);
    }
    if bytes.len() < 5 || !bytes[..5].eq_ignore_ascii_case(b"<?php") {
        return None;
    }
    match &bytes[5..] {
        [] => Some(5),
        [b'\r', b'\n', ..] => Some(7),
        [b, ..] if b.is_ascii_whitespace() => Some(6),
        _ => None,
    }
}

fn find_open_tag(rest: &str) -> Option<usize> {
    rest.match_indices("<?")
        .map(|(i, _)| i)
        .find(|&i| open_tag_len(&rest[i..]).is_some())
}

/// `true` for a plain identifier such as a class or method name.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_char)
}

/// `true` for a namespace-qualified name such as `Foo\Bar` or `\Foo\Bar`.
pub fn is_qualified_name(name: &str) -> bool {
    let name = name.strip_prefix('\\').unwrap_or(name);
    !name.is_empty() && name.split('\\').all(is_identifier)
}
