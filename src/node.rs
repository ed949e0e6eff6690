use std::{any, fmt};

use crate::{ArgumentMatcher, Context, FromArgument, Sender, Typed};

/// Produces completion candidates for a dynamic node.
pub type SuggestionProvider = Box<dyn Fn(&Context<'_>) -> Vec<String> + Send + Sync>;

type Handler = Box<dyn Fn(&Node, &mut Context<'_>, &str) + Send + Sync>;

/// The code run when a node is the end of a command.
///
/// The handler receives the node it is attached to, the context, and the arguments matched so
/// far joined by spaces.
pub struct Executor {
    sender_type: Option<&'static str>,
    accepts: fn(&dyn Sender) -> bool,
    handler: Handler,
}

impl Executor {
    /// Creates an executor which accepts any sender.
    pub fn new<F>(handler: F) -> Self
    where F: Fn(&Node, &mut Context<'_>, &str) + Send + Sync + 'static {
        Executor {
            sender_type: None,
            accepts: |_| true,
            handler: Box::new(handler),
        }
    }

    /// Creates an executor which only runs for senders of type `P`.
    pub fn for_sender<P, F>(handler: F) -> Self
    where
        P: Sender + 'static,
        F: Fn(&P, &Node, &mut Context<'_>, &str) + Send + Sync + 'static,
    {
        let mut executor = Executor::new(move |owner, ctx, matched| {
            let sender = ctx.sender();
            if let Some(sender) = sender.downcast_ref::<P>() {
                handler(sender, owner, ctx, matched);
            }
        });
        executor.sender_type = Some(any::type_name::<P>());
        executor.accepts = is_sender::<P>;
        executor
    }

    /// Returns whether this executor can run for the given sender.
    pub fn accepts(&self, sender: &dyn Sender) -> bool {
        (self.accepts)(sender)
    }

    /// The type name of the sender this executor is bound to, or `None` if it accepts any sender.
    pub fn sender_type(&self) -> Option<&'static str> {
        self.sender_type
    }

    pub(crate) fn exec(&self, owner: &Node, context: &mut Context<'_>, matched: &str) {
        (self.handler)(owner, context, matched)
    }
}

fn is_sender<P: Sender + 'static>(sender: &dyn Sender) -> bool {
    sender.is::<P>()
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("sender_type", &self.sender_type)
            .finish_non_exhaustive()
    }
}

/// The variant-specific part of a [`Node`].
pub enum NodeKind {
    /// The starting point of resolution. Never matched against a token.
    Root,
    /// A keyword accepting any of a fixed set of aliases. The first alias is canonical.
    Literal {
        /// The accepted spellings.
        aliases: Vec<String>,
        /// Hidden literals can be executed but are never suggested.
        hidden: bool,
    },
    /// A typed argument.
    Dynamic {
        /// A human readable name for the argument, such as `item`.
        label: String,
        /// Decides which tokens this argument accepts.
        matcher: Box<dyn ArgumentMatcher>,
        /// Completion candidates for this argument.
        suggestions: Option<SuggestionProvider>,
    },
}

/// One element of a command tree.
///
/// Trees are built once with the builder methods below and are read-only afterwards. Children are
/// tried in insertion order and the first match wins.
pub struct Node {
    kind: NodeKind,
    optional: bool,
    children: Vec<Node>,
    executor: Option<Executor>,
}

impl Node {
    fn with_kind(kind: NodeKind) -> Self {
        Node {
            kind,
            optional: false,
            children: Vec::new(),
            executor: None,
        }
    }

    pub(crate) fn root() -> Self {
        Self::with_kind(NodeKind::Root)
    }

    /// Creates a literal node matching `alias` exactly.
    pub fn literal(alias: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Literal {
            aliases: vec![alias.into()],
            hidden: false,
        })
    }

    /// Creates a dynamic node accepting the tokens for which `matcher` returns true.
    pub fn dynamic<F>(label: impl Into<String>, matcher: F) -> Self
    where F: Fn(&str, &Context<'_>) -> bool + Send + Sync + 'static {
        Self::matching(label, matcher)
    }

    /// Creates a dynamic node driven by an arbitrary [`ArgumentMatcher`].
    pub fn matching(label: impl Into<String>, matcher: impl ArgumentMatcher + 'static) -> Self {
        Self::with_kind(NodeKind::Dynamic {
            label: label.into(),
            matcher: Box::new(matcher),
            suggestions: None,
        })
    }

    /// Creates a dynamic node accepting values of type `T`. If `T` has a fixed set of values, they
    /// become the node's suggestions.
    pub fn argument<T>(label: impl Into<String>) -> Self
    where T: for<'a> FromArgument<'a> + 'static {
        let node = Self::matching(label, Typed::<T>::new());
        let values = T::suggestions();
        if values.is_empty() {
            node
        } else {
            node.suggests(move |_| values.clone())
        }
    }

    /// Adds another accepted spelling to a literal node. Has no effect on other nodes.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        if let NodeKind::Literal { aliases, .. } = &mut self.kind {
            aliases.push(alias.into());
        }
        self
    }

    /// Hides a literal node from suggestions. Has no effect on other nodes.
    pub fn hidden(mut self) -> Self {
        if let NodeKind::Literal { hidden, .. } = &mut self.kind {
            *hidden = true;
        }
        self
    }

    /// Marks this node as optional, allowing its parent to be executed without it.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Appends a child node.
    pub fn then(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Sets the executor of this node.
    pub fn executes<F>(self, handler: F) -> Self
    where F: Fn(&Node, &mut Context<'_>, &str) + Send + Sync + 'static {
        self.executor(Executor::new(handler))
    }

    /// Sets an executor which only runs for senders of type `P`.
    pub fn executes_as<P, F>(self, handler: F) -> Self
    where
        P: Sender + 'static,
        F: Fn(&P, &Node, &mut Context<'_>, &str) + Send + Sync + 'static,
    {
        self.executor(Executor::for_sender(handler))
    }

    /// Sets the executor of this node.
    pub fn executor(mut self, executor: Executor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Sets the suggestion provider of a dynamic node. Has no effect on other nodes.
    pub fn suggests<F>(mut self, provider: F) -> Self
    where F: Fn(&Context<'_>) -> Vec<String> + Send + Sync + 'static {
        if let NodeKind::Dynamic { suggestions, .. } = &mut self.kind {
            *suggestions = Some(Box::new(provider));
        }
        self
    }

    pub(crate) fn set_executor(&mut self, executor: Executor) {
        self.executor = Some(executor);
    }

    pub(crate) fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// The variant-specific data of this node.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The aliases of a literal node, or an empty slice.
    pub fn aliases(&self) -> &[String] {
        match &self.kind {
            NodeKind::Literal { aliases, .. } => aliases,
            _ => &[],
        }
    }

    /// A display name: the canonical alias of a literal, `<label>` for a dynamic node.
    pub fn name(&self) -> String {
        match &self.kind {
            NodeKind::Root => String::new(),
            NodeKind::Literal { aliases, .. } => aliases.first().cloned().unwrap_or_default(),
            NodeKind::Dynamic { label, .. } => format!("<{}>", label),
        }
    }

    /// Whether this node may be omitted when executing its parent.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether this node is a hidden literal.
    pub fn is_hidden(&self) -> bool {
        matches!(self.kind, NodeKind::Literal { hidden: true, .. })
    }

    /// The children of this node in matching order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// The executor attached to this node.
    pub fn executor_ref(&self) -> Option<&Executor> {
        self.executor.as_ref()
    }

    /// Whether execution may stop at this node: it has no children, one of its children is
    /// optional, or it has an executor.
    pub fn is_terminal(&self) -> bool {
        self.children.is_empty()
            || self.children.iter().any(Node::is_optional)
            || self.executor.is_some()
    }

    /// Returns whether this node accepts `token`.
    pub fn try_match(&self, token: &str, context: &Context<'_>) -> bool {
        match &self.kind {
            NodeKind::Root => false,
            NodeKind::Literal { aliases, .. } => aliases.iter().any(|alias| alias == token),
            NodeKind::Dynamic { matcher, .. } => matcher.try_match(token, context),
        }
    }

    /// Returns whether some completion of the partially typed `token` could be accepted by this
    /// node. Only dynamic nodes can rule a token out.
    pub fn try_partial_match(&self, token: &str, context: &Context<'_>) -> bool {
        match &self.kind {
            NodeKind::Dynamic { matcher, .. } => matcher.try_partial_match(token, context),
            _ => true,
        }
    }

    /// Returns the first child accepting `token`.
    pub fn match_child(&self, context: &Context<'_>, token: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|child| child.try_match(token, context))
    }

    /// The completion candidates this node contributes when it is a possible next argument.
    pub fn candidates(&self, context: &Context<'_>) -> Vec<String> {
        match &self.kind {
            NodeKind::Literal { aliases, hidden: false } => aliases.clone(),
            NodeKind::Dynamic {
                suggestions: Some(provider),
                ..
            } => provider(context),
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name())
            .field("optional", &self.optional)
            .field("hidden", &self.is_hidden())
            .field("executor", &self.executor)
            .field("children", &self.children)
            .finish()
    }
}
