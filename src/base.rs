use std::{fmt, sync::Arc};

use tracing::trace;

use crate::{
    notify::Diagnostics,
    Context,
    DispatchError,
    Executor,
    Messages,
    Mismatch,
    Node,
    Sender,
    UnknownCommandHook,
    UnknownNotify,
};

/// The root of a command tree, together with the notifiers used to report failures.
///
/// ```
/// use quartz_dispatch::{CommandBase, Context, Node, Sender};
///
/// struct Console;
///
/// impl Sender for Console {
///     fn send_message(&self, message: &str) {
///         println!("{}", message);
///     }
/// }
///
/// let give = CommandBase::new().then(
///     Node::argument::<String>("item")
///         .executes(|_, _, matched| println!("giving {}", matched)),
/// );
///
/// let mut context = Context::from_line("give sword", &Console).unwrap();
/// assert!(give.execute(&mut context));
/// ```
pub struct CommandBase {
    root: Node,
    diagnostics: Diagnostics,
}

impl Default for CommandBase {
    fn default() -> Self {
        CommandBase {
            root: Node::root(),
            diagnostics: Diagnostics::default(),
        }
    }
}

impl CommandBase {
    /// Creates an empty command.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a child to the root.
    pub fn then(mut self, child: Node) -> Self {
        self.root.push_child(child);
        self
    }

    /// Sets the executor used when the command is invoked without arguments.
    pub fn executes<F>(self, handler: F) -> Self
    where F: Fn(&Node, &mut Context<'_>, &str) + Send + Sync + 'static {
        self.executor(Executor::new(handler))
    }

    /// Sets an executor used when the command is invoked without arguments by a `P`.
    pub fn executes_as<P, F>(self, handler: F) -> Self
    where
        P: Sender + 'static,
        F: Fn(&P, &Node, &mut Context<'_>, &str) + Send + Sync + 'static,
    {
        self.executor(Executor::for_sender(handler))
    }

    /// Sets the executor used when the command is invoked without arguments.
    pub fn executor(mut self, executor: Executor) -> Self {
        self.root.set_executor(executor);
        self
    }

    /// Replaces the text used by the default notifiers.
    pub fn messages(mut self, messages: Messages) -> Self {
        self.diagnostics.messages = messages;
        self
    }

    /// Replaces the notifier used when an executor rejects the sender.
    pub fn incorrect_sender<F>(mut self, function: F) -> Self
    where F: Fn(&dyn Sender, &Context<'_>) + Send + Sync + 'static {
        self.diagnostics.incorrect_sender =
            Some(UnknownNotify::any(move |sender, context, _, _| function(sender, context)));
        self
    }

    /// Replaces the notifier used when a command is incomplete or has a bad argument.
    pub fn incorrect_command<F>(self, function: F) -> Self
    where F: Fn(&dyn Sender, &Context<'_>, Option<usize>, Mismatch) + Send + Sync + 'static {
        self.incorrect_command_notify(UnknownNotify::any(function))
    }

    /// Replaces the notifier used when a command is incomplete or has a bad argument.
    pub fn incorrect_command_notify(mut self, notify: UnknownNotify) -> Self {
        self.diagnostics.incorrect_command = Some(notify);
        self
    }

    /// Registers a platform integration which renders unknown-command errors natively. It is only
    /// consulted by the default command notifier.
    pub fn unknown_command_hook(mut self, hook: Arc<dyn UnknownCommandHook>) -> Self {
        self.diagnostics.hook = Some(hook);
        self
    }

    /// The root node of this command.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Resolves the context's arguments to a single node and runs its executor.
    ///
    /// Returns true if an executor ran and did not call `set_result(false)`, or if the command
    /// stopped at a node without an executor. Any other outcome is reported to the sender and
    /// recorded on the context as a [`DispatchError`].
    pub fn execute<'a>(&'a self, context: &mut Context<'a>) -> bool {
        context.result = true;
        context.failure = None;
        context.current = Some(&self.root);

        if context.raw_args().is_empty() {
            return if self.root.is_terminal() {
                context.index = 0;
                self.invoke(&self.root, context, "")
            } else {
                self.reject(context, None, Mismatch::Incomplete);
                false
            };
        }

        self.resolve(0, &self.root, context)
    }

    fn resolve<'a>(&'a self, cur: usize, component: &'a Node, context: &mut Context<'a>) -> bool {
        context.index = cur;
        context.current = Some(component);

        let found = match component.match_child(context, &context.raw_args()[cur]) {
            Some(found) => found,
            None => {
                self.reject(context, Some(cur + 1), Mismatch::BadArgument);
                return false;
            }
        };

        trace!("Matched argument {} to {}", cur, found.name());

        if cur + 1 < context.raw_args().len() && !found.children().is_empty() {
            self.resolve(cur + 1, found, context)
        } else if found.is_terminal() {
            let matched = context.matched_text(cur);
            self.invoke(found, context, &matched)
        } else {
            self.reject(context, Some(cur + 1), Mismatch::Incomplete);
            false
        }
    }

    fn invoke<'a>(&'a self, found: &'a Node, context: &mut Context<'a>, matched: &str) -> bool {
        context.current = Some(found);

        let executor = match found.executor_ref() {
            Some(executor) => executor,
            None => {
                self.diagnostics.empty_command(context);
                return context.result;
            }
        };

        if !executor.accepts(context.sender()) {
            self.diagnostics.sender_mismatch(context);
            context.result = false;
            context.failure = Some(DispatchError::IncorrectSender {
                expected: executor.sender_type().unwrap_or("Sender"),
            });
            return false;
        }

        executor.exec(found, context, matched);
        if !context.result {
            context.failure = Some(DispatchError::Rejected);
        }
        context.result
    }

    fn reject(&self, context: &mut Context<'_>, index: Option<usize>, state: Mismatch) {
        self.diagnostics.command_mismatch(context, index, state);
        context.result = false;
        context.failure = Some(match (state, index) {
            (Mismatch::BadArgument, Some(index)) => DispatchError::IncorrectArgument {
                index,
                token: context.raw_args()[index - 1].clone(),
            },
            _ => DispatchError::UnknownOrIncomplete { index },
        });
    }

    /// Produces completion candidates for the last argument in the context.
    ///
    /// Candidates come from the children of the deepest node matched by the preceding arguments
    /// and are kept if they contain the last argument, ignoring case. Typed arguments which could
    /// never accept the last argument contribute nothing. Returns `None` if there are no arguments
    /// or no candidates.
    pub fn suggest<'a>(&'a self, context: &mut Context<'a>) -> Option<Vec<String>> {
        if context.raw_args().is_empty() {
            return None;
        }

        self.complete(0, &self.root, context)
    }

    fn complete<'a>(
        &'a self,
        cur: usize,
        component: &'a Node,
        context: &mut Context<'a>,
    ) -> Option<Vec<String>>
    {
        context.index = cur;
        context.current = Some(component);

        let found = component.match_child(context, &context.raw_args()[cur]);
        if let Some(found) = found {
            context.current = Some(found);
        }

        let last = cur + 1 == context.raw_args().len();
        match found {
            Some(found) if !last => self.complete(cur + 1, found, context),
            _ if last => {
                let typed = context.raw_args()[cur].as_str();
                let current = typed.to_lowercase();
                let context = &*context;
                let candidates: Vec<String> = component
                    .children()
                    .iter()
                    .filter(|child| typed.is_empty() || child.try_partial_match(typed, context))
                    .flat_map(|child| child.candidates(context))
                    .filter(|candidate| {
                        current.is_empty() || candidate.to_lowercase().contains(&current)
                    })
                    .collect();

                trace!("{} candidates below {}", candidates.len(), component.name());
                if candidates.is_empty() {
                    None
                } else {
                    Some(candidates)
                }
            }
            _ => None,
        }
    }
}

impl fmt::Debug for CommandBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBase")
            .field("root", &self.root)
            .field("messages", &self.diagnostics.messages)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        cell::RefCell,
        sync::{Arc, Mutex},
    };

    #[derive(Default)]
    struct Recorder {
        inbox: RefCell<Vec<String>>,
    }

    impl Sender for Recorder {
        fn send_message(&self, message: &str) {
            self.inbox.borrow_mut().push(message.to_owned());
        }
    }

    fn context<'a>(sender: &'a Recorder, args: &[&str]) -> Context<'a> {
        Context::new("test", args.iter().map(|arg| (*arg).to_owned()).collect(), sender)
    }

    type Calls = Arc<Mutex<Vec<String>>>;

    fn recording(calls: &Calls) -> impl Fn(&Node, &mut Context<'_>, &str) + Send + Sync + 'static {
        let calls = calls.clone();
        move |_, _, matched| calls.lock().unwrap().push(matched.to_owned())
    }

    #[test]
    fn bare_command_runs_root_executor() {
        let calls = Calls::default();
        let command = CommandBase::new()
            .executes(recording(&calls))
            .then(Node::literal("sub"));
        let sender = Recorder::default();
        let mut ctx = context(&sender, &[]);
        assert!(command.execute(&mut ctx));
        assert_eq!(*calls.lock().unwrap(), vec![String::new()]);
        assert_eq!(ctx.index(), 0);
    }

    #[test]
    fn bare_command_without_executor_is_empty() {
        let command = CommandBase::new();
        let sender = Recorder::default();
        let mut ctx = context(&sender, &[]);
        assert!(command.execute(&mut ctx));
        assert_eq!(*sender.inbox.borrow(), vec!["§cEmpty command (no executor).".to_owned()]);
        assert!(ctx.failure().is_none());
    }

    #[test]
    fn bare_command_with_required_children_is_incomplete() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();
        let command = CommandBase::new()
            .then(Node::literal("sub"))
            .incorrect_command(move |_, _, index, state| {
                record.lock().unwrap().push((index, state));
            });
        let sender = Recorder::default();
        let mut ctx = context(&sender, &[]);
        assert!(!command.execute(&mut ctx));
        assert_eq!(*seen.lock().unwrap(), vec![(None, Mismatch::Incomplete)]);
        assert_eq!(ctx.failure(), Some(&DispatchError::UnknownOrIncomplete { index: None }));
    }

    #[test]
    fn optional_root_child_makes_bare_command_terminal() {
        let command = CommandBase::new().then(Node::literal("sub").optional());
        let sender = Recorder::default();
        assert!(command.execute(&mut context(&sender, &[])));
    }

    #[test]
    fn literal_path_passes_matched_text() {
        let calls = Calls::default();
        let command = CommandBase::new().then(Node::literal("a").then(
            Node::literal("b").then(Node::literal("c").executes(recording(&calls))),
        ));
        let sender = Recorder::default();
        let mut ctx = context(&sender, &["a", "b", "c"]);
        assert!(command.execute(&mut ctx));
        assert_eq!(*calls.lock().unwrap(), vec!["a b c".to_owned()]);
        assert_eq!(ctx.index(), 2);
        assert_eq!(ctx.current_node().map(Node::name), Some("c".to_owned()));
    }

    #[test]
    fn executor_can_report_soft_failure() {
        let command = CommandBase::new()
            .then(Node::literal("deny").executes(|_, ctx, _| ctx.set_result(false)));
        let sender = Recorder::default();
        let mut ctx = context(&sender, &["deny"]);
        assert!(!command.execute(&mut ctx));
        assert!(sender.inbox.borrow().is_empty());
        assert_eq!(ctx.failure(), Some(&DispatchError::Rejected));

        // The result is reset for every execution.
        let mut ctx = context(&sender, &["deny"]);
        ctx.set_result(false);
        let allow = CommandBase::new().then(Node::literal("deny").executes(|_, _, _| {}));
        assert!(allow.execute(&mut ctx));
    }

    #[test]
    fn unmatched_argument_is_bad_argument() {
        let command = CommandBase::new().then(Node::literal("give").then(Node::literal("sword")));
        let sender = Recorder::default();
        let mut ctx = context(&sender, &["give", "axe"]);
        assert!(!command.execute(&mut ctx));
        assert_eq!(ctx.failure(), Some(&DispatchError::IncorrectArgument {
            index: 2,
            token: "axe".to_owned()
        }));
        assert_eq!(*sender.inbox.borrow(), vec![
            "§cIncorrect argument for command".to_owned(),
            "§7test give §c§naxe§r§c§o<--[HERE]".to_owned(),
        ]);
    }

    #[test]
    fn leaf_ignores_extra_arguments() {
        let calls = Calls::default();
        let command = CommandBase::new().then(Node::literal("ping").executes(recording(&calls)));
        let sender = Recorder::default();
        assert!(command.execute(&mut context(&sender, &["ping", "extra"])));
        assert_eq!(*calls.lock().unwrap(), vec!["ping".to_owned()]);
    }

    #[test]
    fn descent_does_not_backtrack() {
        let calls = Calls::default();
        let command = CommandBase::new()
            .then(Node::argument::<String>("any").then(Node::literal("x")))
            .then(Node::literal("a").executes(recording(&calls)));
        let sender = Recorder::default();
        let mut ctx = context(&sender, &["a"]);
        assert!(!command.execute(&mut ctx));
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(ctx.failure(), Some(&DispatchError::UnknownOrIncomplete { index: Some(1) }));
    }

    struct Player;

    impl Sender for Player {
        fn send_message(&self, _message: &str) {}
    }

    #[test]
    fn sender_bound_executor_rejects_other_senders() {
        let calls = Calls::default();
        let record = calls.clone();
        let command = CommandBase::new().then(
            Node::literal("fly").executes_as::<Player, _>(move |_, _, _, matched| {
                record.lock().unwrap().push(matched.to_owned())
            }),
        );

        let console = Recorder::default();
        let mut ctx = context(&console, &["fly"]);
        assert!(!command.execute(&mut ctx));
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(*console.inbox.borrow(), vec!["§cIncorrect sender for command.".to_owned()]);
        assert!(matches!(ctx.failure(), Some(DispatchError::IncorrectSender { .. })));

        let player = Player;
        let mut ctx = Context::new("test", vec!["fly".to_owned()], &player);
        assert!(command.execute(&mut ctx));
        assert_eq!(*calls.lock().unwrap(), vec!["fly".to_owned()]);
    }

    #[test]
    fn incorrect_sender_override() {
        let command = CommandBase::new()
            .then(Node::literal("fly").executes_as::<Player, _>(|_, _, _, _| {}))
            .incorrect_sender(|sender, context| {
                sender.send_message(&format!("players only: /{}", context.name()))
            });
        let sender = Recorder::default();
        assert!(!command.execute(&mut context(&sender, &["fly"])));
        assert_eq!(*sender.inbox.borrow(), vec!["players only: /test".to_owned()]);
    }

    #[test]
    fn suggest_requires_arguments() {
        let command = CommandBase::new().then(Node::literal("give"));
        let sender = Recorder::default();
        assert_eq!(command.suggest(&mut context(&sender, &[])), None);
    }

    #[test]
    fn suggest_filters_by_substring_ignoring_case() {
        let command = CommandBase::new()
            .then(Node::literal("give"))
            .then(Node::literal("gamemode"))
            .then(Node::literal("kill"));
        let sender = Recorder::default();
        assert_eq!(
            command.suggest(&mut context(&sender, &["G"])),
            Some(vec!["give".to_owned(), "gamemode".to_owned()])
        );
        assert_eq!(
            command.suggest(&mut context(&sender, &["ill"])),
            Some(vec!["kill".to_owned()])
        );
        assert_eq!(command.suggest(&mut context(&sender, &["zzz"])), None);
        assert_eq!(command.suggest(&mut context(&sender, &[""])).map(|c| c.len()), Some(3));
    }

    #[test]
    fn suggest_looks_one_level_past_the_match() {
        let command = CommandBase::new().then(
            Node::literal("give")
                .then(Node::dynamic("item", |token, _| token != "air").suggests(|_| {
                    vec!["sword".to_owned(), "shield".to_owned()]
                }))
                .then(Node::literal("secret").hidden()),
        );
        let sender = Recorder::default();
        assert_eq!(
            command.suggest(&mut context(&sender, &["give", "s"])),
            Some(vec!["sword".to_owned(), "shield".to_owned()])
        );
        assert_eq!(command.suggest(&mut context(&sender, &["give", "sec"])), None);
        assert_eq!(command.suggest(&mut context(&sender, &["take", "s"])), None);
    }

    #[test]
    fn suggest_skips_typed_arguments_rejecting_the_partial_token() {
        let command = CommandBase::new().then(
            Node::literal("toggle")
                .then(Node::argument::<bool>("state"))
                .then(Node::literal("maybe-later")),
        );
        let sender = Recorder::default();
        assert_eq!(
            command.suggest(&mut context(&sender, &["toggle", "fa"])),
            Some(vec!["false".to_owned()])
        );
        assert_eq!(
            command.suggest(&mut context(&sender, &["toggle", "maybe"])),
            Some(vec!["maybe-later".to_owned()])
        );
        let all = command.suggest(&mut context(&sender, &["toggle", ""]));
        assert_eq!(all.map(|c| c.len()), Some(3));
    }

    #[test]
    fn suggest_is_idempotent() {
        let command = CommandBase::new().then(Node::literal("give").then(Node::literal("all")));
        let sender = Recorder::default();
        let mut ctx = context(&sender, &["give", ""]);
        let first = command.suggest(&mut ctx);
        let second = command.suggest(&mut ctx);
        assert_eq!(first, second);
        assert_eq!(first, Some(vec!["all".to_owned()]));
        assert_eq!(ctx.current_node().map(Node::name), Some("give".to_owned()));
    }
}
