use std::{any, fmt, sync::Arc};

use tracing::{debug, trace};

use crate::{Context, Sender};

/// Why a command could not be dispatched, as passed to an [`UnknownNotify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mismatch {
    /// The executor requires a different kind of sender.
    Sender,
    /// The input stopped at a node which needs more arguments.
    Incomplete,
    /// An argument did not match anything at its position.
    BadArgument,
}

impl Mismatch {
    /// The numeric state code: `1` for incomplete commands, `2` for bad arguments and `0` for
    /// sender mismatches.
    pub fn code(self) -> u8 {
        match self {
            Mismatch::Sender => 0,
            Mismatch::Incomplete => 1,
            Mismatch::BadArgument => 2,
        }
    }
}

type NotifyCallback =
    Box<dyn Fn(&dyn Sender, &Context<'_>, Option<usize>, Mismatch) + Send + Sync>;

/// A diagnostic callback bound to a sender type.
///
/// The callback receives the sender, the context, the one-based position of the last token typed
/// (`None` for a bare command name) and the kind of mismatch. If the sender is not of the bound
/// type, the callback is skipped.
pub struct UnknownNotify {
    sender_type: &'static str,
    callback: NotifyCallback,
}

impl UnknownNotify {
    /// Creates a notifier which only fires for senders of type `P`.
    pub fn new<P, F>(callback: F) -> Self
    where
        P: Sender + 'static,
        F: Fn(&P, &Context<'_>, Option<usize>, Mismatch) + Send + Sync + 'static,
    {
        let mut notify = UnknownNotify::any(move |sender, context, index, state| {
            match sender.downcast_ref::<P>() {
                Some(sender) => callback(sender, context, index, state),
                None => trace!("Skipping notifier bound to {}", any::type_name::<P>()),
            }
        });
        notify.sender_type = any::type_name::<P>();
        notify
    }

    /// Creates a notifier which fires for every sender.
    pub fn any<F>(callback: F) -> Self
    where F: Fn(&dyn Sender, &Context<'_>, Option<usize>, Mismatch) + Send + Sync + 'static {
        UnknownNotify {
            sender_type: any::type_name::<dyn Sender>(),
            callback: Box::new(callback),
        }
    }

    /// The type name of the sender this notifier is bound to.
    pub fn sender_type(&self) -> &'static str {
        self.sender_type
    }

    /// Invokes the callback with the context's sender.
    pub fn exec(&self, context: &Context<'_>, index: Option<usize>, state: Mismatch) {
        (self.callback)(context.sender(), context, index, state)
    }
}

impl fmt::Debug for UnknownNotify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnknownNotify")
            .field("sender_type", &self.sender_type)
            .finish_non_exhaustive()
    }
}

/// A platform integration which renders unknown-command errors natively, replacing the default
/// messages.
pub trait UnknownCommandHook: Send + Sync {
    /// Whether the platform can render unknown-command errors.
    fn is_supported(&self) -> bool;

    /// Renders the error. `pointer` is the truncated command text ending at the failing token.
    fn handle(&self, sender: &dyn Sender, pointer: &str, state: Mismatch);
}

/// Text used by the default notifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct Messages {
    /// Sent when the executor requires a different kind of sender.
    pub incorrect_sender: String,
    /// Sent when a command ends at a node without an executor.
    pub empty_command: String,
    /// Sent before the pointer line for incomplete commands.
    pub unknown_command: String,
    /// Sent before the pointer line for bad arguments.
    pub incorrect_argument: String,
    /// Prepended to the pointer line.
    pub pointer_prefix: String,
    /// Prepended to the failing token inside the pointer.
    pub error_token: String,
    /// Appended to the pointer line.
    pub here_marker: String,
    /// How many characters of already-typed text the pointer keeps.
    pub pointer_width: usize,
}

impl Default for Messages {
    fn default() -> Self {
        Messages {
            incorrect_sender: "§cIncorrect sender for command.".to_owned(),
            empty_command: "§cEmpty command (no executor).".to_owned(),
            unknown_command: "§cUnknown or incomplete command, see below for error".to_owned(),
            incorrect_argument: "§cIncorrect argument for command".to_owned(),
            pointer_prefix: "§7".to_owned(),
            error_token: "§c§n".to_owned(),
            here_marker: "§r§c§o<--[HERE]".to_owned(),
            pointer_width: 10,
        }
    }
}

impl Messages {
    /// Builds the text pointing at the failing token.
    ///
    /// The command name and the tokens before the failing one are joined and cut down to their
    /// last `pointer_width` characters (prefixed with `...`), then the failing token is appended
    /// with the error decoration.
    pub fn pointer(&self, name: &str, raw_args: &[String], index: Option<usize>) -> String {
        let typed = &raw_args[.. index.unwrap_or(0).min(raw_args.len())];
        let mut pointer = name.to_owned();
        if let [before @ .., _] = typed {
            if !before.is_empty() {
                pointer.push(' ');
                pointer.push_str(before.join(" ").trim());
            }
        }

        let length = pointer.chars().count();
        if length > self.pointer_width {
            let tail: String = pointer.chars().skip(length - self.pointer_width).collect();
            pointer = format!("...{}", tail);
        }

        if let Some(last) = typed.last() {
            pointer.push(' ');
            pointer.push_str(&self.error_token);
            pointer.push_str(last);
        }

        pointer
    }
}

/// The notifiers and message catalogue held by a command root.
#[derive(Default)]
pub(crate) struct Diagnostics {
    pub(crate) messages: Messages,
    pub(crate) hook: Option<Arc<dyn UnknownCommandHook>>,
    pub(crate) incorrect_sender: Option<UnknownNotify>,
    pub(crate) incorrect_command: Option<UnknownNotify>,
}

impl Diagnostics {
    pub(crate) fn sender_mismatch(&self, context: &Context<'_>) {
        debug!("Incorrect sender for command \"{}\"", context.name());
        let index = Some(context.index() + 1);
        match &self.incorrect_sender {
            Some(notify) => notify.exec(context, index, Mismatch::Sender),
            None => context.sender().send_message(&self.messages.incorrect_sender),
        }
    }

    pub(crate) fn command_mismatch(
        &self,
        context: &Context<'_>,
        index: Option<usize>,
        state: Mismatch,
    ) {
        debug!(
            "Command \"{}\" {:?} failed with {:?} at {:?}",
            context.name(),
            context.raw_args(),
            state,
            index
        );

        if let Some(notify) = &self.incorrect_command {
            notify.exec(context, index, state);
            return;
        }

        let sender = context.sender();
        let pointer = self
            .messages
            .pointer(context.name(), context.raw_args(), index);
        match self.hook.as_deref().filter(|hook| hook.is_supported()) {
            Some(hook) => hook.handle(sender, &pointer, state),
            None => {
                match state {
                    Mismatch::Incomplete => sender.send_message(&self.messages.unknown_command),
                    Mismatch::BadArgument => sender.send_message(&self.messages.incorrect_argument),
                    Mismatch::Sender => {}
                }
                sender.send_message(&format!(
                    "{}{}{}",
                    self.messages.pointer_prefix, pointer, self.messages.here_marker
                ));
            }
        }
    }

    pub(crate) fn empty_command(&self, context: &Context<'_>) {
        debug!("Command \"{}\" reached a node without an executor", context.name());
        context.sender().send_message(&self.messages.empty_command);
    }
}
