//! Format-preserving printer.
//!
//! Reprints a working tree against the original tree and token stream it
//! was cloned from. Nodes still at their original position are copied from
//! the source together with the whitespace and comments in front of them,
//! so a file that was not edited reprints byte for byte. Nodes that moved,
//! were detached, or were synthesized by an edit get the canonical gap and
//! indentation from [`crate::printer`].
//!
//! # Example
//! ```
//! use php_editor::config::Style;
//! use php_editor::parser::parse;
//! use php_editor::surgical::print_preserving;
//!
//! let source = "<?php\n// keep me\nclass Foo   {  }\n";
//! let (tree, tokens) = parse(source).unwrap();
//! let working = tree.clone();
//!
//! assert_eq!(print_preserving(&working, &tree, &tokens, &Style::default()), source);
//! ```

use crate::config::Style;
use crate::lexer::{TokenSpan, TokenStream};
use crate::printer::{gap, Container, Printer};
use crate::syntax::{NodeId, Origin, SyntaxTree};

/// Print `working`, reusing the original text of every node it shares with
/// `original`.
pub fn print_preserving(
    working: &SyntaxTree,
    original: &SyntaxTree,
    tokens: &TokenStream,
    style: &Style,
) -> String {
    let printer = SurgicalPrinter {
        working,
        original,
        tokens,
        style,
        canonical: Printer::new(working, style),
    };

    let mut out = String::new();
    printer.node(&mut out, working.root(), 0);
    out
}

struct SurgicalPrinter<'a> {
    working: &'a SyntaxTree,
    original: &'a SyntaxTree,
    tokens: &'a TokenStream,
    style: &'a Style,
    canonical: Printer<'a>,
}

impl SurgicalPrinter<'_> {
    fn node(&self, out: &mut String, id: NodeId, level: usize) {
        let Some(anchor) = self.working.node(id).origin.anchor() else {
            self.canonical.node(out, id, level);
            return;
        };

        match anchor.body {
            None => out.push_str(self.tokens.slice(anchor.span)),
            Some(body) => {
                out.push_str(self.tokens.between(anchor.span.start, body.start));
                self.body(out, id, body, level);
                out.push_str(self.tokens.between(body.end, anchor.span.end));
            }
        }
    }

    fn body(&self, out: &mut String, id: NodeId, body: TokenSpan, level: usize) {
        let container = Container::of(&self.working.node(id).kind);
        let child_level = container.child_level(level);
        let indent = self.style.indentation(child_level);

        let mut cursor = body.start;
        let mut prev: Option<NodeId> = None;
        let mut last_in_place = true;

        for &child in self.working.children(id) {
            let node = self.working.node(child);
            let in_place = match node.origin {
                Origin::Anchored(anchor) => {
                    anchor.span.start >= cursor && self.original_predecessor(id, child) == Some(prev)
                }
                Origin::Detached(_) | Origin::Synthesized => false,
            };

            if let (true, Some(anchor)) = (in_place, node.origin.anchor()) {
                out.push_str(self.tokens.between(cursor, anchor.span.start));
            } else {
                let prev_kind = prev.map(|p| &self.working.node(p).kind);
                out.push_str(&self.style.newlines(gap(container, prev_kind, &node.kind)));
                out.push_str(&indent);
            }

            self.node(out, child, child_level);

            if let Some(anchor) = node.origin.anchor() {
                cursor = cursor.max(anchor.span.end);
            }
            last_in_place = in_place;
            prev = Some(child);
        }

        let trailing = self.tokens.between(cursor, body.end);
        if !last_in_place && container == Container::Block && !trailing.contains('\n') {
            out.push_str(self.style.newline());
            out.push_str(&self.style.indentation(level));
            out.push_str(trailing.trim());
        } else {
            out.push_str(trailing);
        }
    }

    /// The sibling in front of `child` in the original tree: `Some(None)`
    /// when it was the first child, `None` when it was not there at all.
    fn original_predecessor(&self, parent: NodeId, child: NodeId) -> Option<Option<NodeId>> {
        let siblings = self.original.children(parent);
        let position = siblings.iter().position(|&id| id == child)?;
        Some(position.checked_sub(1).map(|i| siblings[i]))
    }
}
