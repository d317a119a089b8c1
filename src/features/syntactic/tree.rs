//! Arena syntax tree with typed node kinds and an explicit-stack walk.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Node kinds, labelled with their ESTree names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
    Program,
    // statements
    ExpressionStatement,
    BlockStatement,
    EmptyStatement,
    VariableDeclaration,
    VariableDeclarator,
    IfStatement,
    DoWhileStatement,
    WhileStatement,
    ForStatement,
    ForInStatement,
    ForOfStatement,
    SwitchStatement,
    SwitchCase,
    ContinueStatement,
    BreakStatement,
    ReturnStatement,
    LabeledStatement,
    ThrowStatement,
    TryStatement,
    CatchClause,
    WithStatement,
    // declarations
    FunctionDeclaration,
    ClassDeclaration,
    // expressions
    ThisExpression,
    Identifier,
    Literal,
    ArrayExpression,
    ObjectExpression,
    SpreadElement,
    FunctionExpression,
    ArrowFunctionExpression,
    ClassExpression,
    TemplateLiteral,
    MemberExpression,
    NewExpression,
    CallExpression,
    ImportExpression,
    ChainExpression,
    TaggedTemplateExpression,
    MetaProperty,
    AssignmentExpression,
    UnaryExpression,
    UpdateExpression,
    BinaryExpression,
    LogicalExpression,
    SequenceExpression,
    ConditionalExpression,
    AwaitExpression,
    YieldExpression,
    Super,
    // object and class members
    Property,
    TemplateElement,
    ClassBody,
    MethodDefinition,
    PropertyDefinition,
    StaticBlock,
    // patterns
    ObjectPattern,
    ArrayPattern,
    RestElement,
    AssignmentPattern,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Program => "Program",
            NodeType::ExpressionStatement => "ExpressionStatement",
            NodeType::BlockStatement => "BlockStatement",
            NodeType::EmptyStatement => "EmptyStatement",
            NodeType::VariableDeclaration => "VariableDeclaration",
            NodeType::VariableDeclarator => "VariableDeclarator",
            NodeType::IfStatement => "IfStatement",
            NodeType::DoWhileStatement => "DoWhileStatement",
            NodeType::WhileStatement => "WhileStatement",
            NodeType::ForStatement => "ForStatement",
            NodeType::ForInStatement => "ForInStatement",
            NodeType::ForOfStatement => "ForOfStatement",
            NodeType::SwitchStatement => "SwitchStatement",
            NodeType::SwitchCase => "SwitchCase",
            NodeType::ContinueStatement => "ContinueStatement",
            NodeType::BreakStatement => "BreakStatement",
            NodeType::ReturnStatement => "ReturnStatement",
            NodeType::LabeledStatement => "LabeledStatement",
            NodeType::ThrowStatement => "ThrowStatement",
            NodeType::TryStatement => "TryStatement",
            NodeType::CatchClause => "CatchClause",
            NodeType::WithStatement => "WithStatement",
            NodeType::FunctionDeclaration => "FunctionDeclaration",
            NodeType::ClassDeclaration => "ClassDeclaration",
            NodeType::ThisExpression => "ThisExpression",
            NodeType::Identifier => "Identifier",
            NodeType::Literal => "Literal",
            NodeType::ArrayExpression => "ArrayExpression",
            NodeType::ObjectExpression => "ObjectExpression",
            NodeType::SpreadElement => "SpreadElement",
            NodeType::FunctionExpression => "FunctionExpression",
            NodeType::ArrowFunctionExpression => "ArrowFunctionExpression",
            NodeType::ClassExpression => "ClassExpression",
            NodeType::TemplateLiteral => "TemplateLiteral",
            NodeType::MemberExpression => "MemberExpression",
            NodeType::NewExpression => "NewExpression",
            NodeType::CallExpression => "CallExpression",
            NodeType::ImportExpression => "ImportExpression",
            NodeType::ChainExpression => "ChainExpression",
            NodeType::TaggedTemplateExpression => "TaggedTemplateExpression",
            NodeType::MetaProperty => "MetaProperty",
            NodeType::AssignmentExpression => "AssignmentExpression",
            NodeType::UnaryExpression => "UnaryExpression",
            NodeType::UpdateExpression => "UpdateExpression",
            NodeType::BinaryExpression => "BinaryExpression",
            NodeType::LogicalExpression => "LogicalExpression",
            NodeType::SequenceExpression => "SequenceExpression",
            NodeType::ConditionalExpression => "ConditionalExpression",
            NodeType::AwaitExpression => "AwaitExpression",
            NodeType::YieldExpression => "YieldExpression",
            NodeType::Super => "Super",
            NodeType::Property => "Property",
            NodeType::TemplateElement => "TemplateElement",
            NodeType::ClassBody => "ClassBody",
            NodeType::MethodDefinition => "MethodDefinition",
            NodeType::PropertyDefinition => "PropertyDefinition",
            NodeType::StaticBlock => "StaticBlock",
            NodeType::ObjectPattern => "ObjectPattern",
            NodeType::ArrayPattern => "ArrayPattern",
            NodeType::RestElement => "RestElement",
            NodeType::AssignmentPattern => "AssignmentPattern",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    kind: NodeType,
    children: Vec<NodeId>,
}

/// Tree stored as a flat arena; node 0 is the root
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
}

impl SyntaxTree {
    pub fn new(root: NodeType) -> Self {
        Self {
            nodes: vec![Node {
                kind: root,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append `kind` as the last child of `parent`
    pub fn push(&mut self, parent: NodeId, kind: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn kind(&self, id: NodeId) -> NodeType {
        self.nodes[id.0].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Pre-order traversal from the root
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![self.root()],
        }
    }

    pub fn node_type_counts(&self) -> BTreeMap<NodeType, u32> {
        let mut counts = BTreeMap::new();
        for id in self.walk() {
            *counts.entry(self.kind(id)).or_insert(0) += 1;
        }
        counts
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self.root(), 1usize)];
        while let Some((id, d)) = stack.pop() {
            max = max.max(d);
            stack.extend(self.children(id).iter().map(|&c| (c, d + 1)));
        }
        max
    }
}

pub struct Walk<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Walk<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack.extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_is_preorder() {
        let mut t = SyntaxTree::new(NodeType::Program);
        let stmt = t.push(t.root(), NodeType::ExpressionStatement);
        let call = t.push(stmt, NodeType::CallExpression);
        t.push(call, NodeType::Identifier);
        t.push(call, NodeType::Literal);
        let kinds: Vec<NodeType> = t.walk().map(|id| t.kind(id)).collect();
        assert_eq!(
            kinds,
            vec![
                NodeType::Program,
                NodeType::ExpressionStatement,
                NodeType::CallExpression,
                NodeType::Identifier,
                NodeType::Literal,
            ]
        );
        assert_eq!(t.depth(), 4);
    }

    #[test]
    fn deep_chain_walks_without_recursion() {
        let mut t = SyntaxTree::new(NodeType::Program);
        let mut parent = t.root();
        for _ in 0..200_000 {
            parent = t.push(parent, NodeType::BlockStatement);
        }
        let counts = t.node_type_counts();
        assert_eq!(counts[&NodeType::BlockStatement], 200_000);
        assert_eq!(t.depth(), 200_001);
    }
}
