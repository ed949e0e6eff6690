use std::{any::Any, fmt};

use crate::{ArgumentTraverser, DispatchError, Error, FromArgument, Node};

/// Access to a value as [`Any`], implemented for every `'static` type. This allows a
/// `&dyn Sender` to be checked against a concrete sender type.
pub trait AsAny {
    /// Returns `self` as a `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Whoever issued a command: a player, the console, a command block and so on.
pub trait Sender: AsAny {
    /// Delivers a message to this sender.
    fn send_message(&self, message: &str);
}

impl<'s> dyn Sender + 's {
    /// Returns true if this sender is a `P`.
    pub fn is<P: Sender + 'static>(&self) -> bool {
        self.as_any().is::<P>()
    }

    /// Returns this sender as a `P`, if it is one.
    pub fn downcast_ref<P: Sender + 'static>(&self) -> Option<&P> {
        self.as_any().downcast_ref::<P>()
    }
}

/// The state of a single execution or suggestion call.
///
/// A context is created per call and is not retained after it returns. `index` and
/// `current_node` are advanced by the dispatcher as it walks the tree.
pub struct Context<'a> {
    name: String,
    raw_args: Vec<String>,
    pub(crate) index: usize,
    pub(crate) current: Option<&'a Node>,
    sender: &'a dyn Sender,
    pub(crate) result: bool,
    pub(crate) failure: Option<DispatchError>,
}

impl<'a> Context<'a> {
    /// Creates a context for the command `name` invoked with the given arguments.
    pub fn new(name: impl Into<String>, raw_args: Vec<String>, sender: &'a dyn Sender) -> Self {
        Context {
            name: name.into(),
            raw_args,
            index: 0,
            current: None,
            sender,
            result: true,
            failure: None,
        }
    }

    /// Splits a raw input line into a command name and its arguments. Returns `None` if the line
    /// has no command name.
    pub fn from_line(line: &str, sender: &'a dyn Sender) -> Option<Self> {
        let mut args = ArgumentTraverser::new(line);
        let name = args.next()?;
        Some(Context::new(name, args.map(str::to_owned).collect(), sender))
    }

    /// The command name as it was typed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The arguments following the command name.
    pub fn raw_args(&self) -> &[String] {
        &self.raw_args
    }

    /// The position of the argument currently being matched.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The node reached so far, or `None` before matching has started.
    pub fn current_node(&self) -> Option<&'a Node> {
        self.current
    }

    /// The sender which issued the command.
    pub fn sender(&self) -> &'a dyn Sender {
        self.sender
    }

    /// Returns the argument at `index + offset`, if there is one.
    pub fn argument(&self, offset: isize) -> Option<&str> {
        let position = (self.index as isize).checked_add(offset)?;
        usize::try_from(position)
            .ok()
            .and_then(|position| self.raw_args.get(position))
            .map(String::as_str)
    }

    /// Returns the argument matched by the current node.
    pub fn current_token(&self) -> Option<&str> {
        self.argument(0)
    }

    /// Parses the argument at `index + offset` as a `T`.
    pub fn parse<'s, T>(&'s self, offset: isize) -> Result<T, Error>
    where T: FromArgument<'s> {
        let arg = self
            .argument(offset)
            .ok_or_else(|| format!("No argument at offset {}", offset))?;
        T::from_arg(arg, self)
    }

    /// Overrides the outcome of the current execution. Executors call this with `false` to signal
    /// a soft failure, such as a denied permission, without producing a diagnostic.
    pub fn set_result(&mut self, value: bool) {
        self.result = value;
    }

    /// The outcome of the current execution.
    pub fn result(&self) -> bool {
        self.result
    }

    /// The failure reported during the last execution, if any.
    pub fn failure(&self) -> Option<&DispatchError> {
        self.failure.as_ref()
    }

    /// The arguments up to and including `last`, joined by single spaces.
    pub(crate) fn matched_text(&self, last: usize) -> String {
        let end = (last + 1).min(self.raw_args.len());
        self.raw_args[.. end].join(" ")
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name)
            .field("raw_args", &self.raw_args)
            .field("index", &self.index)
            .field("result", &self.result)
            .field("failure", &self.failure)
            .finish()
    }
}
