//! Arena-backed syntax tree.
//!
//! Nodes live in a `Vec` and refer to each other by [`NodeId`]. Cloning a
//! tree keeps every id, so a working copy can be compared against the
//! original it came from by id alone. Each node records its [`Origin`],
//! which decides whether the printer copies its original text or prints it
//! in the default style.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::lexer::TokenSpan;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a node sits in the original token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// The node's tokens, leading comments included.
    pub span: TokenSpan,
    /// For containers, the tokens between the braces (or after `namespace X;`).
    pub body: Option<TokenSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Parsed from the source and still at its original position.
    Anchored(Anchor),
    /// Parsed from the source, but the whitespace in front of it is no longer
    /// taken from the original file.
    Detached(Anchor),
    /// Built by a mutation; has no source text.
    Synthesized,
}

impl Origin {
    pub fn anchor(&self) -> Option<&Anchor> {
        match self {
            Origin::Anchored(anchor) | Origin::Detached(anchor) => Some(anchor),
            Origin::Synthesized => None,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        matches!(self, Origin::Synthesized)
    }

    pub fn detach(&mut self) {
        if let Origin::Anchored(anchor) = *self {
            *self = Origin::Detached(anchor);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "protected" => Ok(Visibility::Protected),
            "private" => Ok(Visibility::Private),
            _ => Err(Error::InvalidName {
                what: "visibility",
                name: s.to_string(),
            }),
        }
    }
}

/// An opaque run of source text: one statement, or a class member the
/// parser does not model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseKind {
    Class,
    Function,
    Const,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseClause {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseDecl {
    pub kind: UseKind,
    pub clauses: Vec<UseClause>,
}

impl UseDecl {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            kind: UseKind::Class,
            clauses: vec![UseClause {
                name: name.into(),
                alias: None,
            }],
        }
    }

    /// The name the declaration is sorted and deduplicated by: its first clause.
    pub fn name(&self) -> &str {
        self.clauses.first().map_or("", |c| c.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub name: Option<String>,
    pub braced: bool,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
}

impl ClassKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ClassKind::Class => "class",
            ClassKind::Interface => "interface",
            ClassKind::Trait => "trait",
        }
    }

    pub(crate) fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "class" => Some(ClassKind::Class),
            "interface" => Some(ClassKind::Interface),
            "trait" => Some(ClassKind::Trait),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub kind: ClassKind,
    /// `abstract`, `final`, `readonly`
    pub modifiers: Vec<String>,
    pub name: String,
    pub extends: Vec<String>,
    pub implements: Vec<String>,
    pub children: Vec<NodeId>,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            kind: ClassKind::Class,
            modifiers: Vec::new(),
            name: name.into(),
            extends: Vec::new(),
            implements: Vec::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub visibility: Option<Visibility>,
    /// `static`, `abstract`, `final`
    pub modifiers: Vec<String>,
    pub by_ref: bool,
    pub name: String,
    /// Raw parameter list, without the parentheses.
    pub params: String,
    pub return_type: Option<String>,
    /// `None` for abstract and interface methods.
    pub body: Option<Vec<Statement>>,
    pub doc_comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    File(Vec<NodeId>),
    Namespace(Namespace),
    Use(UseDecl),
    Class(ClassDecl),
    Method(MethodDecl),
    Verbatim(Statement),
}

impl NodeKind {
    pub fn children(&self) -> &[NodeId] {
        match self {
            NodeKind::File(children) => children.as_slice(),
            NodeKind::Namespace(ns) => ns.children.as_slice(),
            NodeKind::Class(class) => class.children.as_slice(),
            NodeKind::Use(_) | NodeKind::Method(_) | NodeKind::Verbatim(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            NodeKind::File(children) => Some(children),
            NodeKind::Namespace(ns) => Some(&mut ns.children),
            NodeKind::Class(class) => Some(&mut class.children),
            NodeKind::Use(_) | NodeKind::Method(_) | NodeKind::Verbatim(_) => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            NodeKind::File(_) | NodeKind::Namespace(_) | NodeKind::Class(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub origin: Origin,
}

impl Node {
    pub fn synthesized(kind: NodeKind) -> Self {
        Self {
            kind,
            origin: Origin::Synthesized,
        }
    }

    pub fn anchored(kind: NodeKind, anchor: Anchor) -> Self {
        Self {
            kind,
            origin: Origin::Anchored(anchor),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl SyntaxTree {
    /// Push the root node. Builders add children first and the root last.
    pub(crate) fn push_root(&mut self, root: Node) -> NodeId {
        self.root = self.push(root);
        self.root
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Panics if `id` does not belong to this tree (or a clone of it).
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Some(node) => node.kind.children(),
            None => &[],
        }
    }

    pub fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        self.nodes.get_mut(id.0).and_then(|node| node.kind.children_mut())
    }

    /// The statement list holding the class being edited, and the class.
    ///
    /// That is the first namespace that declares a class, or the file itself
    /// when classes are declared outside of any namespace. The class is the
    /// last one declared in that list.
    pub fn class_scope(&self) -> Option<(NodeId, NodeId)> {
        let last_class = |scope: NodeId| {
            self.children(scope)
                .iter()
                .rev()
                .copied()
                .find(|&id| matches!(self.node(id).kind, NodeKind::Class(_)))
        };

        self.children(self.root)
            .iter()
            .copied()
            .filter(|&id| matches!(self.node(id).kind, NodeKind::Namespace(_)))
            .find_map(|ns| last_class(ns).map(|class| (ns, class)))
            .or_else(|| last_class(self.root).map(|class| (self.root, class)))
    }

    /// Fully qualified names of every class-like declaration in the file.
    pub fn declared_classes(&self) -> Vec<String> {
        let mut names = Vec::new();
        for &child in self.children(self.root) {
            match &self.node(child).kind {
                NodeKind::Namespace(ns) => {
                    for &member in &ns.children {
                        if let NodeKind::Class(class) = &self.node(member).kind {
                            names.push(qualify(ns.name.as_deref(), &class.name));
                        }
                    }
                }
                NodeKind::Class(class) => names.push(class.name.clone()),
                _ => {}
            }
        }
        names
    }
}

fn qualify(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}\\{}", ns.trim_start_matches('\\'), name),
        _ => name.to_string(),
    }
}
