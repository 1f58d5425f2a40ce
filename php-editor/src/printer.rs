//! Canonical printer.
//!
//! Prints nodes in the default layout: four-space (configurable) indents,
//! braces of classes and methods on their own line, one blank line between
//! declarations and none between consecutive imports. The reconciliation
//! printer in [`crate::surgical`] falls back to this for every node that has
//! no original text.

use std::ops::Range;

use crate::config::Style;
use crate::lexer::{self, TokenKind};
use crate::syntax::{ClassDecl, MethodDecl, NodeId, NodeKind, SyntaxTree, UseDecl, UseKind};

/// How the children of a node are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Container {
    File,
    /// `namespace Foo;` followed by its statements, at the same indentation.
    Namespace,
    /// Anything between braces.
    Block,
}

impl Container {
    pub(crate) fn of(kind: &NodeKind) -> Self {
        match kind {
            NodeKind::File(_) => Container::File,
            NodeKind::Namespace(ns) if !ns.braced && ns.name.is_some() => Container::Namespace,
            _ => Container::Block,
        }
    }

    pub(crate) fn child_level(self, level: usize) -> usize {
        match self {
            Container::File | Container::Namespace => level,
            Container::Block => level + 1,
        }
    }
}

/// Line breaks in front of `next`; its indentation follows them.
pub(crate) fn gap(container: Container, prev: Option<&NodeKind>, next: &NodeKind) -> usize {
    match (prev, next) {
        (None, _) if container == Container::Namespace => 2,
        (None, _) => 1,
        (Some(NodeKind::Use(_)), NodeKind::Use(_)) => 1,
        _ => 2,
    }
}

/// Re-indent a block of code: the first line is trimmed, the common leading
/// whitespace of the remaining lines is replaced with `indent`, and lines
/// are joined with `newline`.
///
/// Lines that begin inside a quoted string belong to its value and are
/// copied as they are.
pub(crate) fn reindent(text: &str, indent: &str, newline: &str) -> String {
    let text = text.trim();
    let literals = string_literals(text);
    let in_literal = |offset: usize| literals.iter().any(|range| range.contains(&offset));

    // (line, starts inside a literal, ends inside a literal)
    let mut lines = Vec::new();
    let mut offset = 0;
    for line in text.split('\n') {
        let starts = offset > 0 && in_literal(offset - 1);
        let end = offset + line.len();
        lines.push((line, starts, end < text.len() && in_literal(end)));
        offset = end + 1;
    }

    let common = lines
        .iter()
        .skip(1)
        .filter(|(line, starts, _)| !starts && !line.trim().is_empty())
        .map(|(line, _, _)| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = String::new();
    for (i, &(line, starts, ends)) in lines.iter().enumerate() {
        let line = if ends { line } else { line.trim_end() };
        if starts {
            out.push('\n');
            out.push_str(line);
            continue;
        }
        if i == 0 {
            out.push_str(line.trim_start());
            continue;
        }
        out.push_str(newline);
        if !line.trim().is_empty() {
            out.push_str(indent);
            out.push_str(line.get(common..).unwrap_or(line.trim_start()));
        }
    }
    out
}

/// Byte ranges of the quoted strings in `code`.
fn string_literals(code: &str) -> Vec<Range<usize>> {
    lexer::lex_code(code)
        .map(|tokens| {
            tokens
                .tokens()
                .iter()
                .filter(|token| token.kind == TokenKind::String)
                .map(|token| token.span.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// Re-indent a `/** ... */` comment so its asterisks line up under `indent`.
pub(crate) fn reindent_comment(text: &str, indent: &str, newline: &str) -> String {
    let mut lines = text.trim().lines();
    let mut out = lines.next().unwrap_or("").trim().to_string();
    for line in lines {
        let line = line.trim();
        out.push_str(newline);
        out.push_str(indent);
        if line.starts_with('*') {
            out.push(' ');
        }
        out.push_str(line);
    }
    out
}

pub struct Printer<'a> {
    tree: &'a SyntaxTree,
    style: &'a Style,
}

impl<'a> Printer<'a> {
    pub fn new(tree: &'a SyntaxTree, style: &'a Style) -> Self {
        Self { tree, style }
    }

    /// Print the whole tree.
    pub fn print(&self) -> String {
        let mut out = String::new();
        self.node(&mut out, self.tree.root(), 0);
        out
    }

    /// Print one node, assuming its own indentation is already written.
    pub fn node(&self, out: &mut String, id: NodeId, level: usize) {
        let indent = self.style.indentation(level);
        let nl = self.style.newline();
        let kind = &self.tree.node(id).kind;
        let container = Container::of(kind);

        match kind {
            NodeKind::File(children) => {
                out.push_str("<?php");
                out.push_str(nl);
                self.children(out, container, children, level);
                if self.style.final_newline {
                    out.push_str(nl);
                }
            }
            NodeKind::Namespace(ns) => {
                match (&ns.name, container) {
                    (Some(name), Container::Namespace) => {
                        out.push_str(&format!("namespace {name};"));
                        self.children(out, container, &ns.children, level);
                    }
                    (name, _) => {
                        out.push_str("namespace ");
                        if let Some(name) = name {
                            out.push_str(name);
                            out.push(' ');
                        }
                        out.push('{');
                        self.children(out, container, &ns.children, level);
                        out.push_str(&format!("{nl}{indent}}}"));
                    }
                }
            }
            NodeKind::Use(decl) => out.push_str(&use_line(decl)),
            NodeKind::Class(class) => {
                out.push_str(&class_header(class));
                out.push_str(&format!("{nl}{indent}{{"));
                self.children(out, container, &class.children, level);
                out.push_str(&format!("{nl}{indent}}}"));
            }
            NodeKind::Method(method) => self.method(out, method, level),
            NodeKind::Verbatim(statement) => {
                out.push_str(&reindent(&statement.text, &indent, nl))
            }
        }
    }

    fn children(&self, out: &mut String, container: Container, children: &[NodeId], level: usize) {
        let level = container.child_level(level);
        let indent = self.style.indentation(level);
        let mut prev = None;

        for &child in children {
            let kind = &self.tree.node(child).kind;
            out.push_str(&self.style.newlines(gap(container, prev, kind)));
            out.push_str(&indent);
            self.node(out, child, level);
            prev = Some(kind);
        }
    }

    fn method(&self, out: &mut String, method: &MethodDecl, level: usize) {
        let indent = self.style.indentation(level);
        let nl = self.style.newline();

        if let Some(doc) = &method.doc_comment {
            out.push_str(&reindent_comment(doc, &indent, nl));
            out.push_str(nl);
            out.push_str(&indent);
        }

        let mut words: Vec<&str> = Vec::new();
        if let Some(visibility) = method.visibility {
            words.push(visibility.as_str());
        }
        words.extend(method.modifiers.iter().map(String::as_str));
        words.push("function");
        out.push_str(&words.join(" "));
        out.push(' ');
        if method.by_ref {
            out.push('&');
        }
        out.push_str(&format!("{}({})", method.name, method.params));
        if let Some(ret) = &method.return_type {
            out.push_str(&format!(": {ret}"));
        }

        let Some(body) = &method.body else {
            out.push(';');
            return;
        };

        let inner = self.style.indentation(level + 1);
        out.push_str(&format!("{nl}{indent}{{"));
        for statement in body {
            out.push_str(nl);
            out.push_str(&inner);
            out.push_str(&reindent(&statement.text, &inner, nl));
        }
        out.push_str(&format!("{nl}{indent}}}"));
    }
}

fn use_line(decl: &UseDecl) -> String {
    let prefix = match decl.kind {
        UseKind::Class => "",
        UseKind::Function => "function ",
        UseKind::Const => "const ",
    };
    let clauses: Vec<String> = decl
        .clauses
        .iter()
        .map(|clause| match &clause.alias {
            Some(alias) => format!("{} as {alias}", clause.name),
            None => clause.name.clone(),
        })
        .collect();

    format!("use {prefix}{};", clauses.join(", "))
}

fn class_header(class: &ClassDecl) -> String {
    let mut words: Vec<&str> = class.modifiers.iter().map(String::as_str).collect();
    words.push(class.kind.keyword());
    words.push(&class.name);

    let mut header = words.join(" ");
    if !class.extends.is_empty() {
        header.push_str(&format!(" extends {}", class.extends.join(", ")));
    }
    if !class.implements.is_empty() {
        header.push_str(&format!(" implements {}", class.implements.join(", ")));
    }
    header
}
