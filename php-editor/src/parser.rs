//! Structural parser for the parts of a PHP file the editor works with.
//!
//! Namespaces, `use` imports, class-like declarations and their methods are
//! parsed into nodes. Everything else (properties, constants, functions,
//! arbitrary statements) is kept as an opaque [`Statement`] whose extent is
//! found by balancing delimiters up to the terminating `;` or closing brace.
//! Every node is anchored to the tokens it came from, leading comments
//! included.

use crate::error::ParseError;
use crate::lexer::{self, TokenKind, TokenSpan, TokenStream};
use crate::syntax::{
    Anchor, ClassDecl, ClassKind, MethodDecl, Namespace, Node, NodeId, NodeKind, Origin,
    Statement, SyntaxTree, UseClause, UseDecl, UseKind, Visibility,
};

/// Parse a complete file into its syntax tree and token stream.
pub fn parse(source: &str) -> Result<(SyntaxTree, TokenStream), ParseError> {
    let tokens = lexer::lex(source)?;
    let tree = Parser::new(&tokens).file()?;
    Ok((tree, tokens))
}

/// Parse a snippet of statements, such as a method body.
///
/// A leading `<?php` tag is accepted and ignored.
pub fn parse_fragment(code: &str) -> Result<Vec<Statement>, ParseError> {
    let trimmed = code.trim_start();
    let code = match trimmed.get(..5) {
        Some(tag) if tag.eq_ignore_ascii_case("<?php") => &trimmed[5..],
        _ => code,
    };

    let tokens = lexer::lex_code(code)?;
    Parser::new(&tokens).statements(0, tokens.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    File,
    /// Body of `namespace Foo;`, which runs until the next namespace.
    Namespace,
    Block,
}

/// Statements that may end with a closing brace instead of `;`.
const BLOCK_KEYWORDS: &[&str] = &[
    "if", "for", "foreach", "while", "switch", "try", "function", "class", "interface", "trait",
    "enum", "abstract", "final", "declare",
];
const CONTINUATIONS: &[&str] = &["else", "elseif", "catch", "finally"];
const CLASS_MODIFIERS: &[&str] = &["abstract", "final", "readonly"];
const MEMBER_MODIFIERS: &[&str] = &[
    "public", "protected", "private", "static", "abstract", "final", "var", "readonly",
];

struct Parser<'t> {
    tokens: &'t TokenStream,
    tree: SyntaxTree,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t TokenStream) -> Self {
        Self {
            tokens,
            tree: SyntaxTree::default(),
        }
    }

    fn error(&self, index: usize, message: impl Into<String>) -> ParseError {
        ParseError::at(self.tokens.source(), self.tokens.offset(index), message)
    }

    /// Index of the first non-trivia token in `from..end`, or `end`. Text
    /// between `?>` and the next `<?php` counts as trivia.
    fn significant(&self, from: usize, end: usize) -> usize {
        (from..end)
            .find(|&i| {
                self.tokens.kind(i).is_some_and(|k| {
                    !k.is_trivia()
                        && !matches!(k, TokenKind::CloseTag | TokenKind::InlineHtml | TokenKind::OpenTag)
                })
            })
            .unwrap_or(end)
    }

    /// First comment in `from..sig`; comments belong to the node after them.
    fn leading(&self, from: usize, sig: usize) -> usize {
        (from..sig)
            .find(|&i| self.tokens.kind(i).is_some_and(TokenKind::is_comment))
            .unwrap_or(sig)
    }

    /// Extend `stop` over a comment that ends the same line.
    fn trailing(&self, stop: usize, end: usize) -> usize {
        let mut j = stop;
        if self.tokens.kind(j) == Some(TokenKind::Whitespace) && !self.tokens.text(j).contains('\n') {
            j += 1;
        }
        if j < end && self.tokens.kind(j) == Some(TokenKind::LineComment) {
            j + 1
        } else {
            stop
        }
    }

    /// Run [`Self::trailing`] for a freshly parsed node, growing its span.
    fn with_trailing(&mut self, id: NodeId, stop: usize, end: usize) -> usize {
        let extended = self.trailing(stop, end);
        if let Origin::Anchored(anchor) = &mut self.tree.node_mut(id).origin {
            anchor.span.end = anchor.span.end.max(extended);
        }
        extended
    }

    fn keyword_in(&self, index: usize, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.tokens.is_keyword(index, k))
    }

    fn is_name(&self, index: usize) -> bool {
        self.tokens.kind(index) == Some(TokenKind::Name)
    }

    fn push(&mut self, kind: NodeKind, span: TokenSpan, body: Option<TokenSpan>) -> NodeId {
        self.tree.push(Node::anchored(kind, Anchor { span, body }))
    }

    fn file(mut self) -> Result<SyntaxTree, ParseError> {
        let len = self.tokens.len();
        let open = (0..len)
            .find(|&i| self.tokens.kind(i) == Some(TokenKind::OpenTag))
            .ok_or_else(|| self.error(0, "expected `<?php` open tag"))?;
        // a final `?>` with nothing but inline text after it ends the code
        let last_open = (0..len)
            .rev()
            .find(|&i| self.tokens.kind(i) == Some(TokenKind::OpenTag))
            .unwrap_or(open);
        let end = (last_open + 1..len)
            .find(|&i| self.tokens.kind(i) == Some(TokenKind::CloseTag))
            .unwrap_or(len);

        let body = TokenSpan::new(open + 1, end);
        let (children, _) = self.list(body.start, body.end, Scope::File)?;
        let anchor = Anchor {
            span: TokenSpan::new(0, len),
            body: Some(body),
        };
        self.tree.push_root(Node::anchored(NodeKind::File(children), anchor));

        Ok(self.tree)
    }

    /// Parse the declarations in `from..end`, returning them together with
    /// the index just past the last one.
    fn list(
        &mut self,
        from: usize,
        end: usize,
        scope: Scope,
    ) -> Result<(Vec<NodeId>, usize), ParseError> {
        let mut children = Vec::new();
        let mut cursor = from;

        loop {
            let sig = self.significant(cursor, end);
            if sig >= end {
                break;
            }
            let start = self.leading(cursor, sig);

            let (id, next) = if self.is_namespace(sig, end) {
                match scope {
                    Scope::File => self.namespace(start, sig, end)?,
                    Scope::Namespace => break,
                    Scope::Block => {
                        return Err(self.error(sig, "namespace declarations cannot be nested"))
                    }
                }
            } else {
                let (id, next) = self.declaration(start, sig, end)?;
                (id, self.with_trailing(id, next, end))
            };

            children.push(id);
            cursor = next;
        }

        Ok((children, cursor))
    }

    fn is_namespace(&self, sig: usize, end: usize) -> bool {
        if !self.tokens.is_keyword(sig, "namespace") {
            return false;
        }
        let next = self.significant(sig + 1, end);
        next < end && (self.is_name(next) || self.tokens.is_punct(next, '{'))
    }

    fn namespace(
        &mut self,
        start: usize,
        keyword: usize,
        end: usize,
    ) -> Result<(NodeId, usize), ParseError> {
        let mut j = self.significant(keyword + 1, end);
        let name = if self.is_name(j) {
            let name = self.tokens.text(j).to_string();
            j = self.significant(j + 1, end);
            Some(name)
        } else {
            None
        };

        if name.is_some() && self.tokens.is_punct(j, ';') {
            let body_start = j + 1;
            let (children, body_end) = self.list(body_start, end, Scope::Namespace)?;
            let ns = Namespace {
                name,
                braced: false,
                children,
            };
            let id = self.push(
                NodeKind::Namespace(ns),
                TokenSpan::new(start, body_end),
                Some(TokenSpan::new(body_start, body_end)),
            );
            return Ok((id, body_end));
        }

        if !self.tokens.is_punct(j, '{') {
            return Err(self.error(j, "expected `;` or `{` after namespace name"));
        }
        let close = self.matching(j, end)?;
        let (children, _) = self.list(j + 1, close, Scope::Block)?;
        let ns = Namespace {
            name,
            braced: true,
            children,
        };
        let id = self.push(
            NodeKind::Namespace(ns),
            TokenSpan::new(start, close + 1),
            Some(TokenSpan::new(j + 1, close)),
        );

        Ok((id, close + 1))
    }

    fn declaration(
        &mut self,
        start: usize,
        sig: usize,
        end: usize,
    ) -> Result<(NodeId, usize), ParseError> {
        if self.tokens.is_keyword(sig, "use") {
            return self.use_decl(start, sig, end);
        }
        if let Some((keyword, modifiers)) = self.class_head(sig, end) {
            return self.class(start, keyword, modifiers, end);
        }

        let head = self.skip_attributes(sig, end)?;
        let block = self.tokens.is_punct(head, '{') || self.keyword_in(head, BLOCK_KEYWORDS);
        self.verbatim(start, sig, end, block)
    }

    fn verbatim(
        &mut self,
        start: usize,
        sig: usize,
        end: usize,
        block: bool,
    ) -> Result<(NodeId, usize), ParseError> {
        let stop = self.statement_end(sig, end, block)?;
        let statement = Statement::new(self.tokens.between(sig, stop));
        let id = self.push(
            NodeKind::Verbatim(statement),
            TokenSpan::new(start, stop),
            None,
        );
        Ok((id, stop))
    }

    fn use_decl(
        &mut self,
        start: usize,
        sig: usize,
        end: usize,
    ) -> Result<(NodeId, usize), ParseError> {
        let stop = self.statement_end(sig, end, false)?;

        // group imports (`use Foo\{Bar, Baz};`) are carried through untouched
        match self.use_clauses(sig, stop) {
            Some(decl) => {
                let id = self.push(NodeKind::Use(decl), TokenSpan::new(start, stop), None);
                Ok((id, stop))
            }
            None => self.verbatim(start, sig, end, false),
        }
    }

    fn use_clauses(&self, sig: usize, stop: usize) -> Option<UseDecl> {
        let mut j = self.significant(sig + 1, stop);
        let kind = if self.tokens.is_keyword(j, "function") {
            j = self.significant(j + 1, stop);
            UseKind::Function
        } else if self.tokens.is_keyword(j, "const") {
            j = self.significant(j + 1, stop);
            UseKind::Const
        } else {
            UseKind::Class
        };

        let mut clauses = Vec::new();
        loop {
            if !self.is_name(j) {
                return None;
            }
            let name = self.tokens.text(j).trim_start_matches('\\').to_string();
            j = self.significant(j + 1, stop);

            let mut alias = None;
            if self.tokens.is_keyword(j, "as") {
                let at = self.significant(j + 1, stop);
                if !self.is_name(at) {
                    return None;
                }
                alias = Some(self.tokens.text(at).to_string());
                j = self.significant(at + 1, stop);
            }
            clauses.push(UseClause { name, alias });

            if self.tokens.is_punct(j, ',') {
                j = self.significant(j + 1, stop);
                continue;
            }
            return self
                .tokens
                .is_punct(j, ';')
                .then_some(UseDecl { kind, clauses });
        }
    }

    /// Recognize `[#[...]] [abstract|final|readonly]* class|interface|trait Name`,
    /// returning the index of the keyword and the modifiers in front of it.
    fn class_head(&self, sig: usize, end: usize) -> Option<(usize, Vec<String>)> {
        let mut j = self.skip_attributes(sig, end).ok()?;
        let mut modifiers = Vec::new();
        while self.keyword_in(j, CLASS_MODIFIERS) {
            modifiers.push(self.tokens.text(j).to_ascii_lowercase());
            j = self.significant(j + 1, end);
        }

        if !self.is_name(j) || ClassKind::from_keyword(self.tokens.text(j)).is_none() {
            return None;
        }
        let name = self.significant(j + 1, end);
        self.is_name(name).then_some((j, modifiers))
    }

    fn class(
        &mut self,
        start: usize,
        keyword: usize,
        modifiers: Vec<String>,
        end: usize,
    ) -> Result<(NodeId, usize), ParseError> {
        let kind = ClassKind::from_keyword(self.tokens.text(keyword))
            .ok_or_else(|| self.error(keyword, "expected `class`, `interface` or `trait`"))?;
        let name_at = self.significant(keyword + 1, end);
        let name = self.tokens.text(name_at).to_string();

        let mut extends = Vec::new();
        let mut implements = Vec::new();
        let mut in_implements = None;
        let mut j = self.significant(name_at + 1, end);
        while !self.tokens.is_punct(j, '{') {
            if j >= end {
                return Err(self.error(name_at, "expected `{` after class header"));
            }
            if self.tokens.is_keyword(j, "extends") {
                in_implements = Some(false);
            } else if self.tokens.is_keyword(j, "implements") {
                in_implements = Some(true);
            } else if self.is_name(j) {
                let parent = self.tokens.text(j).to_string();
                match in_implements {
                    Some(false) => extends.push(parent),
                    Some(true) => implements.push(parent),
                    None => return Err(self.error(j, "unexpected name in class header")),
                }
            } else if !self.tokens.is_punct(j, ',') {
                return Err(self.error(j, "unexpected token in class header"));
            }
            j = self.significant(j + 1, end);
        }

        let close = self.matching(j, end)?;
        let children = self.members(j + 1, close)?;
        let decl = ClassDecl {
            kind,
            modifiers,
            name,
            extends,
            implements,
            children,
        };
        let id = self.push(
            NodeKind::Class(decl),
            TokenSpan::new(start, close + 1),
            Some(TokenSpan::new(j + 1, close)),
        );

        Ok((id, close + 1))
    }

    fn members(&mut self, from: usize, end: usize) -> Result<Vec<NodeId>, ParseError> {
        let mut children = Vec::new();
        let mut cursor = from;

        loop {
            let sig = self.significant(cursor, end);
            if sig >= end {
                // comments after the last member stay in front of later ones
                if let Some(id) = self.closing_comments(cursor, end) {
                    children.push(id);
                }
                break;
            }
            let start = self.leading(cursor, sig);
            let (id, next) = self.member(start, sig, end)?;
            let next = self.with_trailing(id, next, end);
            children.push(id);
            cursor = next;
        }

        Ok(children)
    }

    /// The comments in `from..end`, which holds no code, as one node.
    fn closing_comments(&mut self, from: usize, end: usize) -> Option<NodeId> {
        let first = self.leading(from, end);
        let last = (first..end)
            .rev()
            .find(|&i| self.tokens.kind(i).is_some_and(TokenKind::is_comment))?;

        let statement = Statement::new(self.tokens.between(first, last + 1));
        Some(self.push(
            NodeKind::Verbatim(statement),
            TokenSpan::new(first, last + 1),
            None,
        ))
    }

    fn member(
        &mut self,
        start: usize,
        sig: usize,
        end: usize,
    ) -> Result<(NodeId, usize), ParseError> {
        let mut j = self.skip_attributes(sig, end)?;
        let mut modifiers = Vec::new();
        while self.keyword_in(j, MEMBER_MODIFIERS) {
            modifiers.push(self.tokens.text(j).to_ascii_lowercase());
            j = self.significant(j + 1, end);
        }

        if self.tokens.is_keyword(j, "function") {
            return self.method(start, sig, j, modifiers, end);
        }

        // trait imports may carry an adaptation block: `use A, B { ... }`
        let block = self.tokens.is_keyword(j, "use");
        self.verbatim(start, sig, end, block)
    }

    fn method(
        &mut self,
        start: usize,
        sig: usize,
        function: usize,
        modifiers: Vec<String>,
        end: usize,
    ) -> Result<(NodeId, usize), ParseError> {
        let visibility = modifiers
            .iter()
            .find_map(|m| m.parse::<Visibility>().ok());
        let modifiers: Vec<String> = modifiers
            .into_iter()
            .filter(|m| m.parse::<Visibility>().is_err())
            .collect();

        let mut j = self.significant(function + 1, end);
        let by_ref = self.tokens.is_punct(j, '&');
        if by_ref {
            j = self.significant(j + 1, end);
        }
        if !self.is_name(j) {
            return Err(self.error(j, "expected method name"));
        }
        let name = self.tokens.text(j).to_string();

        let open = self.significant(j + 1, end);
        if !self.tokens.is_punct(open, '(') {
            return Err(self.error(open, "expected `(` after method name"));
        }
        let close = self.matching(open, end)?;
        let params = self.tokens.between(open + 1, close).trim().to_string();

        let mut j = self.significant(close + 1, end);
        let mut return_type = None;
        if self.tokens.is_punct(j, ':') {
            let from = j + 1;
            j = (from..end)
                .find(|&i| self.tokens.is_punct(i, '{') || self.tokens.is_punct(i, ';'))
                .unwrap_or(end);
            return_type = Some(self.tokens.between(from, j).trim().to_string());
        }

        let (body, stop) = if self.tokens.is_punct(j, '{') {
            let body_close = self.matching(j, end)?;
            (Some(self.statements(j + 1, body_close)?), body_close + 1)
        } else if self.tokens.is_punct(j, ';') {
            (None, j + 1)
        } else {
            return Err(self.error(j, "expected method body or `;`"));
        };

        let doc_comment = (start..sig)
            .rev()
            .find(|&i| self.tokens.kind(i) == Some(TokenKind::DocComment))
            .map(|i| self.tokens.text(i).to_string());

        let decl = MethodDecl {
            visibility,
            modifiers,
            by_ref,
            name,
            params,
            return_type,
            body,
            doc_comment,
        };
        let id = self.push(NodeKind::Method(decl), TokenSpan::new(start, stop), None);

        Ok((id, stop))
    }

    fn statements(&self, from: usize, end: usize) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        let mut cursor = from;

        loop {
            let sig = self.significant(cursor, end);
            let start = self.leading(cursor, sig);
            if sig >= end {
                let trailing = self.tokens.between(start, end).trim();
                if !trailing.is_empty() {
                    statements.push(Statement::new(trailing));
                }
                break;
            }

            let head = self.skip_attributes(sig, end)?;
            let block = self.tokens.is_punct(head, '{') || self.keyword_in(head, BLOCK_KEYWORDS);
            let stop = self.statement_end(sig, end, block)?;
            let stop = self.trailing(stop, end);
            statements.push(Statement::new(self.tokens.between(start, stop).trim()));
            cursor = stop;
        }

        Ok(statements)
    }

    fn skip_attributes(&self, from: usize, end: usize) -> Result<usize, ParseError> {
        let mut j = from;
        while self.tokens.is_punct(j, '#') && self.tokens.is_punct(j + 1, '[') {
            let close = self.matching(j + 1, end)?;
            j = self.significant(close + 1, end);
        }
        Ok(j)
    }

    /// Index just past the statement starting at `sig`: after its `;` at
    /// nesting depth zero or, for block statements, after the closing brace
    /// that is not followed by `else`, `catch` and the like.
    fn statement_end(&self, sig: usize, end: usize, block: bool) -> Result<usize, ParseError> {
        let mut stack = Vec::new();

        for j in sig..end {
            let Some(c) = self.delimiter(j) else {
                continue;
            };
            match c {
                '(' | '[' | '{' => stack.push((c, j)),
                ')' | ']' | '}' => {
                    self.close(&mut stack, c, j)?;
                    if c == '}' && block && stack.is_empty() && !self.continues(j + 1, end) {
                        return Ok(j + 1);
                    }
                }
                ';' if stack.is_empty() => return Ok(j + 1),
                _ => {}
            }
        }

        match stack.last() {
            Some(&(open, at)) => Err(self.error(at, format!("unclosed `{open}`"))),
            None => Err(self.error(sig, "expected `;` at the end of the statement")),
        }
    }

    /// Index of the delimiter closing the one at `open`.
    fn matching(&self, open: usize, end: usize) -> Result<usize, ParseError> {
        let mut stack = Vec::new();

        for j in open..end {
            match self.delimiter(j) {
                Some(c @ ('(' | '[' | '{')) => stack.push((c, j)),
                Some(c @ (')' | ']' | '}')) => {
                    self.close(&mut stack, c, j)?;
                    if stack.is_empty() {
                        return Ok(j);
                    }
                }
                _ => {}
            }
        }

        let c = self.tokens.text(open).chars().next().unwrap_or('{');
        Err(self.error(open, format!("unclosed `{c}`")))
    }

    fn delimiter(&self, index: usize) -> Option<char> {
        match self.tokens.kind(index) {
            Some(TokenKind::Punct) => {}
            // `?>` ends a statement like `;` does
            Some(TokenKind::CloseTag) => return Some(';'),
            _ => return None,
        }
        self.tokens
            .text(index)
            .chars()
            .next()
            .filter(|c| matches!(c, '(' | '[' | '{' | ')' | ']' | '}' | ';'))
    }

    fn close(&self, stack: &mut Vec<(char, usize)>, c: char, at: usize) -> Result<(), ParseError> {
        match stack.pop() {
            Some((open, _)) if closer(open) == c => Ok(()),
            Some((open, _)) => Err(self.error(
                at,
                format!("mismatched `{c}`, expected `{}` to close `{open}`", closer(open)),
            )),
            None => Err(self.error(at, format!("unexpected `{c}`"))),
        }
    }

    fn continues(&self, from: usize, end: usize) -> bool {
        let next = self.significant(from, end);
        next < end && self.keyword_in(next, CONTINUATIONS)
    }
}

fn closer(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}
