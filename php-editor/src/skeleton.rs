use crate::config::Style;
use crate::error::{Error, Result};
use crate::lexer::{is_identifier, is_qualified_name};
use crate::printer::Printer;
use crate::syntax::{ClassDecl, Namespace, Node, NodeKind, SyntaxTree};

/// Source of a file declaring an empty class.
///
/// An empty `namespace` puts the class at file level.
pub fn generate(namespace: &str, class: &str, style: &Style) -> Result<String> {
    let namespace = namespace.trim().trim_start_matches('\\');
    if !namespace.is_empty() && !is_qualified_name(namespace) {
        return Err(Error::InvalidName {
            what: "namespace",
            name: namespace.to_string(),
        });
    }
    if !is_identifier(class) {
        return Err(Error::InvalidName {
            what: "class",
            name: class.to_string(),
        });
    }

    let mut tree = SyntaxTree::default();
    let mut top = tree.push(Node::synthesized(NodeKind::Class(ClassDecl::new(class))));
    if !namespace.is_empty() {
        top = tree.push(Node::synthesized(NodeKind::Namespace(Namespace {
            name: Some(namespace.to_string()),
            braced: false,
            children: vec![top],
        })));
    }
    tree.push_root(Node::synthesized(NodeKind::File(vec![top])));

    Ok(Printer::new(&tree, style).print())
}
