//! Bounded JavaScript parsing with boa, lowered into a [`SyntaxTree`].
//!
//! Size and estimated nesting are checked before the parser runs, since the
//! recursive-descent parser would otherwise overflow the stack on adversarial
//! input. Parsing runs on a dedicated worker thread with a large stack; a
//! worker that does not answer within the timeout is abandoned but keeps its
//! slot in the process-wide parser budget until it finishes.

use super::scan::estimate_nesting;
use super::tree::{NodeId, NodeType, SyntaxTree};
use boa_ast::declaration::{LexicalDeclaration, VarDeclaration, Variable};
use boa_ast::expression::access::{PropertyAccessField, SuperPropertyAccess};
use boa_ast::expression::literal::TemplateElement;
use boa_ast::expression::operator::binary::BinaryOp;
use boa_ast::expression::Identifier;
use boa_ast::function::{ClassElement, FormalParameter, FunctionBody};
use boa_ast::pattern::Pattern;
use boa_ast::expression::literal::PropertyDefinition;
use boa_ast::property::PropertyName;
use boa_ast::scope::Scope;
use boa_ast::statement::iteration::IterableLoopInitializer;
use boa_ast::statement::{Case, Catch};
use boa_ast::visitor::{VisitWith, Visitor};
use boa_ast::{Declaration, Expression, Statement};
use boa_interner::Interner;
use boa_parser::{Parser, Source};
use std::fmt;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

const PARSE_STACK_BYTES: usize = 64 * 1024 * 1024;

/// Parser threads alive in this process, abandoned ones included
static LIVE_PARSERS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone)]
pub struct ParseLimits {
    pub max_source_bytes: usize,
    pub max_nesting_depth: usize,
    pub max_expression_depth: usize,
    pub timeout: Option<Duration>,
    pub max_live_parsers: usize,
}

impl ParseLimits {
    /// Deepest lowered tree the visitor will build
    pub fn tree_depth_limit(&self) -> usize {
        self.max_nesting_depth + self.max_expression_depth
    }
}

impl From<&crate::config::SyntacticConfig> for ParseLimits {
    fn from(c: &crate::config::SyntacticConfig) -> Self {
        Self {
            max_source_bytes: c.max_source_bytes,
            max_nesting_depth: c.max_nesting_depth,
            max_expression_depth: c.max_expression_depth,
            timeout: c.parse_timeout(),
            max_live_parsers: c.max_live_parsers.max(c.worker_count()),
        }
    }
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self::from(&crate::config::SyntacticConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Syntax(String),
    TooLarge { bytes: usize, limit: usize },
    TooDeep { depth: usize, limit: usize },
    Timeout(Duration),
    /// Parser panicked or its worker went away
    Aborted,
    Spawn(String),
    /// Too many parser threads are still running, most of them timed out
    Saturated { live: usize, limit: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(msg) => write!(f, "syntax error: {}", msg),
            Self::TooLarge { bytes, limit } => {
                write!(f, "source is {} bytes, limit is {}", bytes, limit)
            }
            Self::TooDeep { depth, limit } => {
                write!(f, "nesting depth {} exceeds limit {}", depth, limit)
            }
            Self::Timeout(d) => write!(f, "parse exceeded {} ms", d.as_millis()),
            Self::Aborted => write!(f, "parser aborted"),
            Self::Spawn(msg) => write!(f, "could not start parser worker: {}", msg),
            Self::Saturated { live, limit } => {
                write!(f, "{} parser threads alive, limit is {}", live, limit)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse `source` as a script within `limits`
pub fn parse_script(source: &str, limits: &ParseLimits) -> Result<SyntaxTree, ParseError> {
    if source.len() > limits.max_source_bytes {
        return Err(ParseError::TooLarge {
            bytes: source.len(),
            limit: limits.max_source_bytes,
        });
    }
    let estimate = estimate_nesting(source);
    if estimate.descent > limits.max_nesting_depth {
        return Err(ParseError::TooDeep {
            depth: estimate.descent,
            limit: limits.max_nesting_depth,
        });
    }
    if estimate.depth > limits.max_expression_depth {
        return Err(ParseError::TooDeep {
            depth: estimate.depth,
            limit: limits.max_expression_depth,
        });
    }

    parse_on_worker(source.to_owned(), limits)
}

fn parse_on_worker(source: String, limits: &ParseLimits) -> Result<SyntaxTree, ParseError> {
    let slot = ParserSlot::acquire(limits.max_live_parsers)?;
    let max_depth = limits.tree_depth_limit();
    let (tx, rx) = mpsc::sync_channel(1);
    std::thread::Builder::new()
        .name("js-parse".into())
        .stack_size(PARSE_STACK_BYTES)
        .spawn(move || {
            let _slot = slot;
            let _ = tx.send(lower(&source, max_depth));
        })
        .map_err(|e| ParseError::Spawn(e.to_string()))?;

    match limits.timeout {
        Some(timeout) => match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ParseError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(ParseError::Aborted),
        },
        None => rx.recv().unwrap_or(Err(ParseError::Aborted)),
    }
}

/// One claimed parser thread; released when the worker drops it
struct ParserSlot;

impl ParserSlot {
    fn acquire(limit: usize) -> Result<Self, ParseError> {
        let mut live = LIVE_PARSERS.load(Ordering::SeqCst);
        loop {
            if live >= limit {
                return Err(ParseError::Saturated { live, limit });
            }
            match LIVE_PARSERS.compare_exchange(live, live + 1, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return Ok(Self),
                Err(updated) => live = updated,
            }
        }
    }
}

impl Drop for ParserSlot {
    fn drop(&mut self) {
        LIVE_PARSERS.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lower(source: &str, max_depth: usize) -> Result<SyntaxTree, ParseError> {
    let mut interner = Interner::default();
    let mut parser = Parser::new(Source::from_bytes(source));
    let scope = Scope::new_global();
    let script = parser
        .parse_script(&scope, &mut interner)
        .map_err(|e| ParseError::Syntax(e.to_string()))?;

    let mut builder = TreeBuilder::new(max_depth);
    if script.visit_with(&mut builder).is_break() {
        return Err(ParseError::TooDeep {
            depth: max_depth + 1,
            limit: max_depth,
        });
    }
    Ok(builder.tree)
}

/// Records each visited node under the node currently being visited
struct TreeBuilder {
    tree: SyntaxTree,
    path: Vec<NodeId>,
    max_depth: usize,
}

impl TreeBuilder {
    fn new(max_depth: usize) -> Self {
        let tree = SyntaxTree::new(NodeType::Program);
        let root = tree.root();
        Self {
            tree,
            path: vec![root],
            max_depth,
        }
    }

    fn parent(&self) -> NodeId {
        self.path.last().copied().unwrap_or_else(|| self.tree.root())
    }

    /// Record a childless node under the current one
    fn leaf(&mut self, kind: NodeType) {
        let parent = self.parent();
        self.tree.push(parent, kind);
    }

    /// Record `kind` (if any) with `leaves` under it, then descend into `node`'s
    /// children; `None` makes the node transparent. Breaks once the path would
    /// exceed `max_depth`.
    fn scoped<N: VisitWith>(
        &mut self,
        kind: Option<NodeType>,
        leaves: &[NodeType],
        node: &N,
    ) -> ControlFlow<()> {
        let Some(kind) = kind else {
            return node.visit_with(self);
        };
        if self.path.len() >= self.max_depth {
            return ControlFlow::Break(());
        }
        let parent = self.parent();
        let id = self.tree.push(parent, kind);
        self.path.push(id);
        for leaf in leaves {
            self.leaf(*leaf);
        }
        let flow = node.visit_with(self);
        self.path.pop();
        flow
    }

    fn parent_is(&self, kind: NodeType) -> bool {
        self.tree.kind(self.parent()) == kind
    }
}

impl<'ast> Visitor<'ast> for TreeBuilder {
    type BreakTy = ();

    fn visit_statement(&mut self, node: &'ast Statement) -> ControlFlow<Self::BreakTy> {
        self.scoped(statement_kind(node), &[], node)
    }

    fn visit_declaration(&mut self, node: &'ast Declaration) -> ControlFlow<Self::BreakTy> {
        let leaves: &[NodeType] = match node {
            Declaration::ClassDeclaration { .. } => &[NodeType::ClassBody],
            _ => &[],
        };
        self.scoped(declaration_kind(node), leaves, node)
    }

    fn visit_expression(&mut self, node: &'ast Expression) -> ControlFlow<Self::BreakTy> {
        let leaves: &[NodeType] = match node {
            Expression::ClassExpression { .. } => &[NodeType::ClassBody],
            Expression::SuperCall { .. } => &[NodeType::Super],
            _ => &[],
        };
        self.scoped(expression_kind(node), leaves, node)
    }

    fn visit_var_declaration(&mut self, node: &'ast VarDeclaration) -> ControlFlow<Self::BreakTy> {
        self.scoped(Some(NodeType::VariableDeclaration), &[], node)
    }

    fn visit_lexical_declaration(
        &mut self,
        node: &'ast LexicalDeclaration,
    ) -> ControlFlow<Self::BreakTy> {
        self.scoped(Some(NodeType::VariableDeclaration), &[], node)
    }

    fn visit_variable(&mut self, node: &'ast Variable) -> ControlFlow<Self::BreakTy> {
        let kind = (!self.parent_is(NodeType::VariableDeclarator)).then_some(NodeType::VariableDeclarator);
        self.scoped(kind, &[], node)
    }

    /// `for (var x in o)` declares without a declaration statement
    fn visit_iterable_loop_initializer(
        &mut self,
        node: &'ast IterableLoopInitializer,
    ) -> ControlFlow<Self::BreakTy> {
        match node {
            IterableLoopInitializer::Var { .. }
            | IterableLoopInitializer::Let { .. }
            | IterableLoopInitializer::Const { .. } => {
                if self.path.len() + 1 >= self.max_depth {
                    return ControlFlow::Break(());
                }
                let parent = self.parent();
                let decl = self.tree.push(parent, NodeType::VariableDeclaration);
                let declarator = self.tree.push(decl, NodeType::VariableDeclarator);
                self.path.extend([decl, declarator]);
                let flow = node.visit_with(self);
                self.path.truncate(self.path.len() - 2);
                flow
            }
            _ => node.visit_with(self),
        }
    }

    /// Parameters are bindings, not declarators
    fn visit_formal_parameter(&mut self, node: &'ast FormalParameter) -> ControlFlow<Self::BreakTy> {
        let variable = node.variable();
        let kind = if node.is_rest_param() {
            Some(NodeType::RestElement)
        } else if variable.init().is_some() {
            Some(NodeType::AssignmentPattern)
        } else {
            None
        };
        self.scoped(kind, &[], variable)
    }

    fn visit_pattern(&mut self, node: &'ast Pattern) -> ControlFlow<Self::BreakTy> {
        let kind = match node {
            Pattern::Object { .. } => NodeType::ObjectPattern,
            Pattern::Array { .. } => NodeType::ArrayPattern,
        };
        self.scoped(Some(kind), &[], node)
    }

    fn visit_function_body(&mut self, node: &'ast FunctionBody) -> ControlFlow<Self::BreakTy> {
        self.scoped(Some(NodeType::BlockStatement), &[], node)
    }

    fn visit_identifier(&mut self, node: &'ast Identifier) -> ControlFlow<Self::BreakTy> {
        let kind = (!self.parent_is(NodeType::Identifier)).then_some(NodeType::Identifier);
        self.scoped(kind, &[], node)
    }

    /// `a.b` names its property with an identifier; `a[b]` with an expression
    fn visit_property_access_field(
        &mut self,
        node: &'ast PropertyAccessField,
    ) -> ControlFlow<Self::BreakTy> {
        match node {
            PropertyAccessField::Const { .. } => self.scoped(Some(NodeType::Identifier), &[], node),
            _ => node.visit_with(self),
        }
    }

    fn visit_super_property_access(
        &mut self,
        node: &'ast SuperPropertyAccess,
    ) -> ControlFlow<Self::BreakTy> {
        self.leaf(NodeType::Super);
        node.visit_with(self)
    }

    fn visit_property_name(&mut self, node: &'ast PropertyName) -> ControlFlow<Self::BreakTy> {
        match node {
            PropertyName::Literal { .. } => self.scoped(Some(NodeType::Identifier), &[], node),
            _ => node.visit_with(self),
        }
    }

    fn visit_property_definition(
        &mut self,
        node: &'ast PropertyDefinition,
    ) -> ControlFlow<Self::BreakTy> {
        match node {
            PropertyDefinition::SpreadObject { .. } => {
                self.scoped(Some(NodeType::SpreadElement), &[], node)
            }
            // `{a}` keys and values with the same identifier
            PropertyDefinition::IdentifierReference { .. } => {
                self.scoped(Some(NodeType::Property), &[NodeType::Identifier], node)
            }
            PropertyDefinition::MethodDefinition { .. } => {
                self.scoped(Some(NodeType::Property), &[NodeType::FunctionExpression], node)
            }
            _ => self.scoped(Some(NodeType::Property), &[], node),
        }
    }

    fn visit_class_element(&mut self, node: &'ast ClassElement) -> ControlFlow<Self::BreakTy> {
        match node {
            ClassElement::MethodDefinition { .. } => self.scoped(
                Some(NodeType::MethodDefinition),
                &[NodeType::FunctionExpression],
                node,
            ),
            ClassElement::StaticBlock { .. } => self.scoped(Some(NodeType::StaticBlock), &[], node),
            _ => self.scoped(Some(NodeType::PropertyDefinition), &[], node),
        }
    }

    fn visit_template_element(&mut self, node: &'ast TemplateElement) -> ControlFlow<Self::BreakTy> {
        match node {
            TemplateElement::String { .. } => self.scoped(Some(NodeType::TemplateElement), &[], node),
            _ => node.visit_with(self),
        }
    }

    fn visit_case(&mut self, node: &'ast Case) -> ControlFlow<Self::BreakTy> {
        self.scoped(Some(NodeType::SwitchCase), &[], node)
    }

    fn visit_catch(&mut self, node: &'ast Catch) -> ControlFlow<Self::BreakTy> {
        self.scoped(Some(NodeType::CatchClause), &[], node)
    }
}

/// `var` and lexical declarations are recorded by their own visitor hooks
fn statement_kind(node: &Statement) -> Option<NodeType> {
    let kind = match node {
        Statement::Block { .. } => NodeType::BlockStatement,
        Statement::Empty { .. } => NodeType::EmptyStatement,
        Statement::Expression { .. } => NodeType::ExpressionStatement,
        Statement::If { .. } => NodeType::IfStatement,
        Statement::DoWhileLoop { .. } => NodeType::DoWhileStatement,
        Statement::WhileLoop { .. } => NodeType::WhileStatement,
        Statement::ForLoop { .. } => NodeType::ForStatement,
        Statement::ForInLoop { .. } => NodeType::ForInStatement,
        Statement::ForOfLoop { .. } => NodeType::ForOfStatement,
        Statement::Switch { .. } => NodeType::SwitchStatement,
        Statement::Continue { .. } => NodeType::ContinueStatement,
        Statement::Break { .. } => NodeType::BreakStatement,
        Statement::Return { .. } => NodeType::ReturnStatement,
        Statement::Labelled { .. } => NodeType::LabeledStatement,
        Statement::Throw { .. } => NodeType::ThrowStatement,
        Statement::Try { .. } => NodeType::TryStatement,
        Statement::With { .. } => NodeType::WithStatement,
        _ => return None,
    };
    Some(kind)
}

fn declaration_kind(node: &Declaration) -> Option<NodeType> {
    let kind = match node {
        Declaration::FunctionDeclaration { .. }
        | Declaration::GeneratorDeclaration { .. }
        | Declaration::AsyncFunctionDeclaration { .. }
        | Declaration::AsyncGeneratorDeclaration { .. } => NodeType::FunctionDeclaration,
        Declaration::ClassDeclaration { .. } => NodeType::ClassDeclaration,
        _ => return None,
    };
    Some(kind)
}

/// Identifiers are recorded by `visit_identifier`; parenthesized and
/// parser-internal forms have no ESTree node and stay transparent.
fn expression_kind(node: &Expression) -> Option<NodeType> {
    let kind = match node {
        Expression::This { .. } => NodeType::ThisExpression,
        Expression::Literal { .. } | Expression::RegExpLiteral { .. } => NodeType::Literal,
        Expression::ArrayLiteral { .. } => NodeType::ArrayExpression,
        Expression::ObjectLiteral { .. } => NodeType::ObjectExpression,
        Expression::Spread { .. } => NodeType::SpreadElement,
        Expression::FunctionExpression { .. }
        | Expression::GeneratorExpression { .. }
        | Expression::AsyncFunctionExpression { .. }
        | Expression::AsyncGeneratorExpression { .. } => NodeType::FunctionExpression,
        Expression::ArrowFunction { .. } | Expression::AsyncArrowFunction { .. } => {
            NodeType::ArrowFunctionExpression
        }
        Expression::ClassExpression { .. } => NodeType::ClassExpression,
        Expression::TemplateLiteral { .. } => NodeType::TemplateLiteral,
        Expression::PropertyAccess { .. } => NodeType::MemberExpression,
        Expression::New { .. } => NodeType::NewExpression,
        Expression::Call { .. } | Expression::SuperCall { .. } => NodeType::CallExpression,
        Expression::ImportCall { .. } => NodeType::ImportExpression,
        Expression::Optional { .. } => NodeType::ChainExpression,
        Expression::TaggedTemplate { .. } => NodeType::TaggedTemplateExpression,
        Expression::NewTarget { .. } | Expression::ImportMeta { .. } => NodeType::MetaProperty,
        Expression::Assign { .. } => NodeType::AssignmentExpression,
        Expression::Unary { .. } => NodeType::UnaryExpression,
        Expression::Update { .. } => NodeType::UpdateExpression,
        Expression::Binary(binary) => match binary.op() {
            BinaryOp::Logical(_) => NodeType::LogicalExpression,
            BinaryOp::Comma => NodeType::SequenceExpression,
            _ => NodeType::BinaryExpression,
        },
        Expression::BinaryInPrivate { .. } => NodeType::BinaryExpression,
        Expression::Conditional { .. } => NodeType::ConditionalExpression,
        Expression::Await { .. } => NodeType::AwaitExpression,
        Expression::Yield { .. } => NodeType::YieldExpression,
        _ => return None,
    };
    Some(kind)
}
