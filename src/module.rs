use tracing::debug;

use crate::{CommandBase, Context, DispatchError, Sender};

/// Defines a command module, or a set of command definitions with an associated dispatcher and
/// suggestion generator.
pub trait CommandModule {
    /// Dispatches the given command line for execution.
    fn dispatch(&self, command: &str, sender: &dyn Sender) -> Result<(), DispatchError>;

    /// Generates a list of suggestions to complete the final argument in the given command line.
    fn get_suggestions(&self, command: &str, sender: &dyn Sender) -> Vec<String>;
}

/// A command tree registered under a name and any number of aliases.
#[derive(Debug)]
pub struct Command {
    name: String,
    aliases: Vec<String>,
    base: CommandBase,
}

impl Command {
    /// Creates a command called `name`.
    pub fn new(name: impl Into<String>, base: CommandBase) -> Self {
        Command {
            name: name.into(),
            aliases: Vec::new(),
            base,
        }
    }

    /// Adds an alternative name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// The primary name of this command.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The primary name followed by the aliases.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Whether this command is invoked by `label`, ignoring case.
    pub fn answers_to(&self, label: &str) -> bool {
        self.labels().any(|name| name.eq_ignore_ascii_case(label))
    }

    /// The tree behind this command.
    pub fn base(&self) -> &CommandBase {
        &self.base
    }
}

/// An ordered collection of commands, dispatched by name.
#[derive(Debug, Default)]
pub struct CommandSet {
    commands: Vec<Command>,
}

impl CommandSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command. Earlier registrations win when names collide.
    pub fn register(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Finds the command invoked by `label`.
    pub fn get(&self, label: &str) -> Option<&Command> {
        self.commands.iter().find(|command| command.answers_to(label))
    }

    /// The registered commands in registration order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

impl CommandModule for CommandSet {
    fn dispatch(&self, command: &str, sender: &dyn Sender) -> Result<(), DispatchError> {
        let mut context = Context::from_line(command, sender).ok_or(DispatchError::EmptyLine)?;
        let target = match self.get(context.name()) {
            Some(target) => target,
            None => {
                debug!("No command registered as \"{}\"", context.name());
                return Err(DispatchError::UnknownCommand(context.name().to_owned()));
            }
        };

        if target.base.execute(&mut context) {
            Ok(())
        } else {
            Err(context.failure.take().unwrap_or(DispatchError::Rejected))
        }
    }

    fn get_suggestions(&self, command: &str, sender: &dyn Sender) -> Vec<String> {
        let mut context = match Context::from_line(command, sender) {
            Some(context) => context,
            None => return Vec::new(),
        };

        if context.raw_args().is_empty() {
            let typed = context.name().to_lowercase();
            return self
                .commands
                .iter()
                .flat_map(Command::labels)
                .filter(|label| label.to_lowercase().contains(&typed))
                .map(str::to_owned)
                .collect();
        }

        match self.get(context.name()) {
            Some(target) => target.base.suggest(&mut context).unwrap_or_default(),
            None => Vec::new(),
        }
    }
}
