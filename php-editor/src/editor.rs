//! The editing engine.
//!
//! A [`PhpEditor`] parses a file once, keeps the original tree and tokens
//! untouched, and applies every edit to a working copy. [`PhpEditor::render`]
//! reprints the working copy so that only the edited regions differ from the
//! source.

use std::collections::HashSet;

use crate::config::{LineEnding, Style};
use crate::docblock::DocBlock;
use crate::error::{Error, Result};
use crate::lexer::{self, TokenStream};
use crate::operations::Operation;
use crate::parser;
use crate::surgical::print_preserving;
use crate::syntax::{MethodDecl, Node, NodeId, NodeKind, SyntaxTree, UseDecl, UseKind, Visibility};

#[derive(Debug, Clone)]
pub struct PhpEditor {
    tokens: TokenStream,
    original: SyntaxTree,
    working: SyntaxTree,
    style: Style,
}

impl PhpEditor {
    pub fn parse(source: &str) -> Result<Self> {
        Self::parse_with_style(source, Style::default())
    }

    /// Parse `source`. Inserted code follows `style`, except that line
    /// breaks match the ones already in the file.
    pub fn parse_with_style(source: &str, mut style: Style) -> Result<Self> {
        if let Some(line_ending) = LineEnding::detect(source) {
            style.line_ending = line_ending;
        }
        let (original, tokens) = parser::parse(source)?;
        let working = original.clone();

        Ok(Self {
            tokens,
            original,
            working,
            style,
        })
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn original_source(&self) -> &str {
        self.tokens.source()
    }

    pub fn working_tree(&self) -> &SyntaxTree {
        &self.working
    }

    /// `true` once an edit has been applied.
    pub fn is_modified(&self) -> bool {
        self.working != self.original
    }

    /// Append a method to the end of the class body.
    ///
    /// `body` holds the statements of the method, without braces. The method
    /// takes no parameters; `doc` becomes its documentation comment.
    pub fn add_method(
        &mut self,
        visibility: Visibility,
        name: &str,
        body: &str,
        doc: &DocBlock,
    ) -> Result<&mut Self> {
        if !lexer::is_identifier(name) {
            return Err(Error::InvalidName {
                what: "method",
                name: name.to_string(),
            });
        }
        let statements = parser::parse_fragment(body)?;
        let (_, class) = self.working.class_scope().ok_or(Error::NoClass)?;

        let method = MethodDecl {
            visibility: Some(visibility),
            modifiers: Vec::new(),
            by_ref: false,
            name: name.to_string(),
            params: String::new(),
            return_type: None,
            body: Some(statements),
            doc_comment: Some(doc.render()),
        };
        let id = self.working.push(Node::synthesized(NodeKind::Method(method)));
        self.working
            .children_mut(class)
            .ok_or(Error::NoClass)?
            .push(id);

        tracing::debug!(method = name, %visibility, "added method");
        Ok(self)
    }

    pub fn add_public_method(&mut self, name: &str, body: &str, doc: &DocBlock) -> Result<&mut Self> {
        self.add_method(Visibility::Public, name, body, doc)
    }

    pub fn add_protected_method(
        &mut self,
        name: &str,
        body: &str,
        doc: &DocBlock,
    ) -> Result<&mut Self> {
        self.add_method(Visibility::Protected, name, body, doc)
    }

    pub fn add_private_method(&mut self, name: &str, body: &str, doc: &DocBlock) -> Result<&mut Self> {
        self.add_method(Visibility::Private, name, body, doc)
    }

    /// Import classes into the scope of the class.
    ///
    /// New and existing imports are merged, deduplicated (the first
    /// occurrence wins) and sorted by length, then alphabetically. They are
    /// placed at the top of the namespace, followed by the other statements
    /// that preceded the class, then the class itself.
    pub fn add_use<I, S>(&mut self, names: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref().trim();
                let name = name.strip_prefix('\\').unwrap_or(name);
                if lexer::is_qualified_name(name) {
                    Ok(name.to_string())
                } else {
                    Err(Error::InvalidName {
                        what: "class",
                        name: name.to_string(),
                    })
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let (scope, class) = self.working.class_scope().ok_or(Error::NoClass)?;
        let children = self.working.children(scope).to_vec();
        let class_at = children
            .iter()
            .position(|&id| id == class)
            .ok_or(Error::NoClass)?;

        let mut uses = Vec::new();
        let mut before = Vec::new();
        let mut after = Vec::new();
        for (i, &id) in children.iter().enumerate() {
            if matches!(self.working.node(id).kind, NodeKind::Use(_)) {
                uses.push(id);
            } else if i < class_at {
                before.push(id);
            } else if i > class_at {
                after.push(id);
            }
        }

        let mut seen = HashSet::new();
        let mut merged: Vec<NodeId> = Vec::new();
        for id in uses {
            if let NodeKind::Use(decl) = &self.working.node(id).kind {
                // a declaration survives while one of its clauses is new
                let mut fresh = false;
                for clause in &decl.clauses {
                    fresh |= seen.insert((decl.kind, clause.name.clone()));
                }
                if fresh {
                    merged.push(id);
                }
            }
        }
        let mut added = 0;
        for name in names {
            if seen.insert((UseKind::Class, name.clone())) {
                let id = self
                    .working
                    .push(Node::synthesized(NodeKind::Use(UseDecl::class(name))));
                merged.push(id);
                added += 1;
            }
        }

        let working = &self.working;
        merged.sort_by(|&a, &b| {
            let (a, b) = (use_name(working, a), use_name(working, b));
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        });

        self.working.node_mut(class).origin.detach();

        let mut body = merged;
        body.extend(before);
        body.push(class);
        body.extend(after);
        *self.working.children_mut(scope).ok_or(Error::NoClass)? = body;

        tracing::debug!(added, "merged use declarations");
        Ok(self)
    }

    pub fn apply(&mut self, operation: &Operation) -> Result<&mut Self> {
        match operation {
            Operation::AddMethod(op) => self.add_method(op.visibility, &op.name, &op.body, &op.doc),
            Operation::AddUse(op) => self.add_use(&op.names),
        }
    }

    /// The file with every edit applied.
    pub fn render(&self) -> String {
        print_preserving(&self.working, &self.original, &self.tokens, &self.style)
    }
}

fn use_name(tree: &SyntaxTree, id: NodeId) -> &str {
    match &tree.node(id).kind {
        NodeKind::Use(decl) => decl.name(),
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    const SKELETON: &str = "<?php\n\nnamespace Foo\\Bar;\n\nclass ClassName\n{\n}";

    #[test]
    fn test_unmodified_renders_source() {
        let editor = PhpEditor::parse(SKELETON).unwrap();
        assert!(!editor.is_modified());
        assert_eq!(editor.render(), SKELETON);
        assert_eq!(editor.original_source(), SKELETON);
    }

    #[test]
    fn test_add_public_method() {
        let mut editor = PhpEditor::parse(SKELETON).unwrap();
        editor
            .add_public_method("foobar", "return true;", &DocBlock::new())
            .unwrap();

        assert!(editor.is_modified());
        assert_eq!(
            editor.render(),
            "<?php\n\nnamespace Foo\\Bar;\n\nclass ClassName\n{\n    /**\n     *\n     */\n    public function foobar()\n    {\n        return true;\n    }\n}"
        );
    }

    #[test]
    fn test_method_visibility_variants() {
        let mut editor = PhpEditor::parse(SKELETON).unwrap();
        editor
            .add_protected_method("a", "return 1;", &DocBlock::new())
            .unwrap()
            .add_private_method("b", "", &DocBlock::new())
            .unwrap();

        let out = editor.render();
        assert!(out.contains("    protected function a()\n"));
        assert!(out.contains("    }\n\n    /**\n     *\n     */\n    private function b()\n    {\n    }\n}"));
    }

    #[test]
    fn test_method_with_docblock() {
        let mut doc = DocBlock::new();
        doc.set_message("Says hi").set_tag("return", "string");

        let mut editor = PhpEditor::parse(SKELETON).unwrap();
        editor.add_public_method("hi", "return 'hi';", &doc).unwrap();
        assert!(editor.render().contains(
            "    /**\n     * Says hi\n     *\n     * @return string\n     */\n    public function hi()\n"
        ));
    }

    #[test]
    fn test_add_single_use() {
        let mut editor = PhpEditor::parse(SKELETON).unwrap();
        editor.add_use(["Foo\\Bar\\Baz"]).unwrap();
        assert_eq!(
            editor.render(),
            "<?php\n\nnamespace Foo\\Bar;\n\nuse Foo\\Bar\\Baz;\n\nclass ClassName\n{\n}"
        );
    }

    #[test]
    fn test_uses_sort_by_length_then_alpha_across_calls() {
        let mut editor = PhpEditor::parse(SKELETON).unwrap();
        editor
            .add_use(["Foo\\Bar\\Cat"])
            .unwrap()
            .add_use(["Jhoff\\PhpEditor\\File"])
            .unwrap()
            .add_use(["\\Foo\\Bar\\Baz", "Foo\\Bar\\Cat"])
            .unwrap();

        assert_eq!(
            editor.render(),
            "<?php\n\nnamespace Foo\\Bar;\n\nuse Foo\\Bar\\Baz;\nuse Foo\\Bar\\Cat;\nuse Jhoff\\PhpEditor\\File;\n\nclass ClassName\n{\n}"
        );
    }

    #[test]
    fn test_use_merges_with_existing_imports() {
        let source = "<?php\nnamespace App;\n\nuse Illuminate\\Support\\Str;\nuse Carbon\\Carbon; // dates\n\nconst VERSION = 2;\n\nclass Thing\n{\n    public function a() {}\n}\n";
        let mut editor = PhpEditor::parse(source).unwrap();
        editor.add_use(["Illuminate\\Support\\Str", "App\\X"]).unwrap();

        assert_eq!(
            editor.render(),
            "<?php\nnamespace App;\n\nuse App\\X;\nuse Carbon\\Carbon; // dates\nuse Illuminate\\Support\\Str;\n\nconst VERSION = 2;\n\nclass Thing\n{\n    public function a() {}\n}\n"
        );
    }

    #[test]
    fn test_use_and_method_together() {
        let mut editor = PhpEditor::parse(SKELETON).unwrap();
        editor
            .add_use(["Foo\\Bar\\Baz"])
            .unwrap()
            .add_public_method("foobar", "return true;", &DocBlock::new())
            .unwrap();

        assert_eq!(
            editor.render(),
            "<?php\n\nnamespace Foo\\Bar;\n\nuse Foo\\Bar\\Baz;\n\nclass ClassName\n{\n    /**\n     *\n     */\n    public function foobar()\n    {\n        return true;\n    }\n}"
        );
    }

    #[test]
    fn test_file_level_class() {
        let mut editor = PhpEditor::parse("<?php\n\nclass Plain\n{\n}\n").unwrap();
        editor.add_use(["Foo"]).unwrap();
        assert_eq!(editor.render(), "<?php\n\nuse Foo;\n\nclass Plain\n{\n}\n");
    }

    #[test]
    fn test_invalid_input_leaves_tree_untouched() {
        let mut editor = PhpEditor::parse(SKELETON).unwrap();

        let err = editor.add_public_method("1abc", "return;", &DocBlock::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);

        let err = editor.add_public_method("ok", "return", &DocBlock::new()).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));

        let err = editor.add_use(["Good\\Name", "Bad Name"]).unwrap_err();
        assert!(matches!(err, Error::InvalidName { what: "class", .. }));

        assert!(!editor.is_modified());
        assert_eq!(editor.render(), SKELETON);
    }

    #[test]
    fn test_no_class() {
        let mut editor = PhpEditor::parse("<?php\n\nfunction helper() {}\n").unwrap();
        let err = editor.add_use(["Foo"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = editor.add_public_method("x", "", &DocBlock::new()).unwrap_err();
        assert!(matches!(err, Error::NoClass));
    }

    #[test]
    fn test_method_body_keeps_multiline_strings() {
        let mut editor = PhpEditor::parse(SKELETON).unwrap();
        editor
            .add_public_method("s", "$s = 'line1\nline2';\nreturn $s;", &DocBlock::new())
            .unwrap();

        assert!(editor.render().contains(
            "    public function s()\n    {\n        $s = 'line1\nline2';\n        return $s;\n    }\n}"
        ));
    }

    #[test]
    fn test_method_lands_after_closing_comment() {
        let source = "<?php\nclass A\n{\n    public function a() {}\n\n    // end of members\n}\n";
        let mut editor = PhpEditor::parse(source).unwrap();
        editor.add_public_method("b", "return 1;", &DocBlock::new()).unwrap();

        assert_eq!(
            editor.render(),
            "<?php\nclass A\n{\n    public function a() {}\n\n    // end of members\n\n    /**\n     *\n     */\n    public function b()\n    {\n        return 1;\n    }\n}\n"
        );
    }

    #[test]
    fn test_crlf_files_stay_crlf() {
        let source = "<?php\r\nnamespace A;\r\n\r\nuse Z\\Y;\r\n\r\nclass B\r\n{\r\n}\r\n";
        let mut editor = PhpEditor::parse(source).unwrap();
        assert_eq!(editor.style().line_ending, LineEnding::CrLf);

        editor
            .add_use(["C"])
            .unwrap()
            .add_public_method("b", "return 1;", &DocBlock::new())
            .unwrap();

        assert_eq!(
            editor.render(),
            "<?php\r\nnamespace A;\r\n\r\nuse C;\r\nuse Z\\Y;\r\n\r\nclass B\r\n{\r\n    /**\r\n     *\r\n     */\r\n    public function b()\r\n    {\r\n        return 1;\r\n    }\r\n}\r\n"
        );
    }

    #[test]
    fn test_use_skips_names_imported_by_later_clauses() {
        let source = "<?php\nnamespace App;\n\nuse A, B;\n\nclass C\n{\n}\n";
        let mut editor = PhpEditor::parse(source).unwrap();
        editor.add_use(["B", "D"]).unwrap();

        assert_eq!(
            editor.render(),
            "<?php\nnamespace App;\n\nuse A, B;\nuse D;\n\nclass C\n{\n}\n"
        );
    }

    #[test]
    fn test_close_tag_mid_file_round_trips() {
        let source = "<?php\nif (true): ?>x<?php endif;\nclass A {}\n";
        let mut editor = PhpEditor::parse(source).unwrap();
        assert_eq!(editor.render(), source);

        editor.add_use(["B"]).unwrap();
        let rendered = editor.render();
        assert!(rendered.contains("use B;\n"));
        assert!(rendered.contains("if (true): ?>x<?php endif;"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut editor = PhpEditor::parse(SKELETON).unwrap();
        editor.add_use(["A\\B"]).unwrap();
        assert_eq!(editor.render(), editor.render());
    }
}
