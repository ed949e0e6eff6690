use lazy_static::lazy_static;
use regex::Regex;
use std::{iter::Peekable, marker::PhantomData, str::CharIndices};

use crate::{Context, Error};

/// Iterates over the individual arguments in a command line accounting for quoted arguments.
///
/// A line ending in a space yields a final empty argument, which is what the suggester expects
/// when the user has finished one argument and is about to type the next.
pub struct ArgumentTraverser<'cmd> {
    command: &'cmd str,
    chars: Peekable<CharIndices<'cmd>>,
    anchor: usize,
    index: usize,
}

impl<'cmd> ArgumentTraverser<'cmd> {
    /// Creates a traverser over the given command, stripping off the initial '/' if it exists.
    pub fn new(command: &'cmd str) -> Self {
        let command = command.strip_prefix('/').unwrap_or(command);
        let mut traverser = ArgumentTraverser {
            command,
            chars: command.char_indices().peekable(),
            anchor: 0,
            index: 0,
        };
        traverser.skip_leading_spaces();
        traverser
    }

    /// Returns whether or not this traverser has more arguments. If this function returns true,
    /// then `next` will not return `None`.
    pub fn has_next(&self) -> bool {
        self.index < self.command.len()
    }

    /// Returns the argument most recently produced by `next`, or an empty string if none was.
    pub fn current(&self) -> &'cmd str {
        &self.command[self.anchor .. self.index]
    }

    fn skip_leading_spaces(&mut self) {
        while matches!(self.chars.peek().copied(), Some((_, ' '))) {
            self.index += 1;
            self.chars.next();
        }
    }
}

impl<'cmd> Iterator for ArgumentTraverser<'cmd> {
    type Item = &'cmd str;

    fn next(&mut self) -> Option<&'cmd str> {
        if self.index >= self.command.len() {
            return None;
        }

        self.skip_leading_spaces();

        self.anchor = self.index;

        // Single or double quotes
        let mut quote_type: char = '\0';
        // Whether we're in quotes and should ignore spaces
        let mut in_quotes = false;
        // Used for escaping quotes with the '\' character
        let mut ignore_quote = false;

        self.index = loop {
            if !in_quotes {
                if let Some((index, ' ')) = self.chars.peek().copied() {
                    break index;
                }
            }

            let ch = match self.chars.next() {
                Some((_, ch)) => ch,
                None => break self.command.len(),
            };

            if (ch == '\'' || ch == '"') && !ignore_quote {
                if in_quotes {
                    if ch == quote_type {
                        in_quotes = false;
                    }
                } else {
                    quote_type = ch;
                    in_quotes = true;
                }
            }

            ignore_quote = !ignore_quote && ch == '\\';
        };

        Some(&self.command[self.anchor .. self.index])
    }
}

/// Trait for matching and converting string arguments to concrete types. Any type which implements
/// this trait can back a dynamic node through [`Node::argument`](crate::Node::argument).
pub trait FromArgument<'a>: Sized {
    /// Returns whether or not the given argument matches the format of `Self`. Returning true does
    /// not imply that [`from_arg`](crate::FromArgument::from_arg) will succeed, but it does
    /// imply that the argument could succeed given the correct context.
    fn matches(arg: &str) -> bool;

    /// This function follows similar rules to [`matches`](crate::FromArgument::matches), however
    /// it is not guaranteed that a full argument will be given to this function. This test is used
    /// while the user is part-way through typing an argument, and hence should return true
    /// whenever [`matches`](crate::FromArgument::matches) returns true, and should also return
    /// true for every truncation of every input for which
    /// [`matches`](crate::FromArgument::matches) returns true.
    fn partial_matches(partial_arg: &str) -> bool {
        Self::matches(partial_arg)
    }

    /// Parses the given argument given a context. This function should only fail if it is
    /// impossible to construct a valid `Self` from the given string and context. Any logical checks
    /// should be performed in executors.
    fn from_arg(arg: &'a str, context: &Context<'_>) -> Result<Self, Error>;

    /// Fixed completion candidates for this type, if it has a small closed set of values.
    fn suggestions() -> Vec<String> {
        Vec::new()
    }
}

macro_rules! impl_from_arg_for_int {
    ($($int:ty),*) => {$(
        impl<'a> FromArgument<'a> for $int {
            fn matches(arg: &str) -> bool {
                let digits = arg.strip_prefix('-').unwrap_or(arg);
                !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit())
            }

            fn from_arg(arg: &'a str, _ctx: &Context<'_>) -> Result<Self, Error> {
                arg.parse::<$int>().map_err(|e| e.to_string())
            }
        }
    )*};
}

impl_from_arg_for_int!(u8, i8, u16, i16, u32, i32, u64, i64, u128, i128, usize, isize);

macro_rules! impl_from_arg_for_float {
    ($float:ty, $full_regex:literal, $partial_regex:literal) => {
        impl<'a> FromArgument<'a> for $float {
            fn matches(arg: &str) -> bool {
                lazy_static! {
                    static ref FULL: Regex = Regex::new($full_regex).unwrap();
                }

                FULL.is_match(arg)
            }

            fn partial_matches(partial_arg: &str) -> bool {
                lazy_static! {
                    static ref PARTIAL: Regex = Regex::new($partial_regex).unwrap();
                }

                if partial_arg.is_empty() || partial_arg == "-" {
                    return true;
                }

                PARTIAL.is_match(partial_arg)
            }

            fn from_arg(arg: &'a str, _ctx: &Context<'_>) -> Result<Self, Error> {
                let trimmed = arg.trim_end_matches(|ch: char| !ch.is_ascii_digit() && ch != '.');
                if trimmed.is_empty() || trimmed == "-" {
                    return Err(format!("Invalid float: hanging suffix \"{}\"", arg));
                }

                if trimmed == "." || trimmed == "-." {
                    return Err("Invalid float: hanging point".to_owned());
                }

                let (sign, magnitude) = match trimmed.strip_prefix('-') {
                    Some(rest) => ("-", rest),
                    None => ("", trimmed),
                };

                let normalized = if magnitude.starts_with('.') {
                    format!("{}0{}", sign, magnitude)
                } else if magnitude.ends_with('.') {
                    format!("{}{}0", sign, magnitude)
                } else {
                    trimmed.to_owned()
                };

                normalized.parse::<$float>().map_err(|e| e.to_string())
            }
        }
    };
}

impl_from_arg_for_float!(
    f32,
    r"^-?(\d+\.\d+|\d+\.|\.\d+|\d+)[fF]?$",
    r"^-?(\d+\.\d*|\.\d*|\d+)[fF]?$"
);
impl_from_arg_for_float!(
    f64,
    r"^-?(\d+\.\d+|\d+\.|\.\d+|\d+)[dD]?$",
    r"^-?(\d+\.\d*|\.\d*|\d+)[dD]?$"
);

fn strip_quotes(arg: &str) -> &str {
    let mut chars = arg.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && (first == '"' || first == '\'') =>
            &arg[1 .. arg.len() - 1],
        _ => arg,
    }
}

impl<'a> FromArgument<'a> for String {
    fn matches(_arg: &str) -> bool {
        true
    }

    fn from_arg(arg: &'a str, _ctx: &Context<'_>) -> Result<Self, Error> {
        Ok(strip_quotes(arg).to_owned())
    }
}

impl<'a> FromArgument<'a> for &'a str {
    fn matches(_arg: &str) -> bool {
        true
    }

    fn from_arg(arg: &'a str, _ctx: &Context<'_>) -> Result<Self, Error> {
        Ok(strip_quotes(arg))
    }
}

impl<'a> FromArgument<'a> for bool {
    fn matches(arg: &str) -> bool {
        arg == "true" || arg == "false"
    }

    fn partial_matches(partial_arg: &str) -> bool {
        "true".starts_with(partial_arg) || "false".starts_with(partial_arg)
    }

    fn from_arg(arg: &str, _ctx: &Context<'_>) -> Result<Self, Error> {
        match arg {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(format!(
                "\"{}\" is not a valid boolean, must be \"true\" or \"false\"",
                arg
            )),
        }
    }

    fn suggestions() -> Vec<String> {
        vec!["true".to_owned(), "false".to_owned()]
    }
}

impl<'a> FromArgument<'a> for char {
    fn matches(arg: &str) -> bool {
        arg.chars().count() == 1
    }

    fn partial_matches(partial_arg: &str) -> bool {
        partial_arg.chars().count() <= 1
    }

    fn from_arg(arg: &str, _ctx: &Context<'_>) -> Result<Self, Error> {
        let mut chars = arg.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Err("Cannot parse an empty argument into a character".to_owned()),
            (Some(ch), None) => Ok(ch),
            (Some(_), Some(_)) => Err(format!(
                "Cannot parse \"{}\" into a character, length is greater than one",
                arg
            )),
        }
    }
}

impl<'a, T> FromArgument<'a> for Option<T>
where T: FromArgument<'a>
{
    fn matches(arg: &str) -> bool {
        T::matches(arg)
    }

    fn partial_matches(partial_arg: &str) -> bool {
        T::partial_matches(partial_arg)
    }

    fn from_arg(arg: &'a str, context: &Context<'_>) -> Result<Self, Error> {
        Ok(Some(T::from_arg(arg, context)?))
    }

    fn suggestions() -> Vec<String> {
        T::suggestions()
    }
}

/// Decides whether a token is accepted by a dynamic node.
pub trait ArgumentMatcher: Send + Sync {
    /// Returns true if `token` is a valid value for this argument in the given context.
    fn try_match(&self, token: &str, context: &Context<'_>) -> bool;

    /// Returns false if no completion of the partially typed `token` could be accepted. Matchers
    /// which cannot tell accept every prefix.
    fn try_partial_match(&self, _token: &str, _context: &Context<'_>) -> bool {
        true
    }
}

impl<F> ArgumentMatcher for F
where F: Fn(&str, &Context<'_>) -> bool + Send + Sync
{
    fn try_match(&self, token: &str, context: &Context<'_>) -> bool {
        self(token, context)
    }
}

/// Matches tokens which are accepted by `T`'s [`FromArgument`] implementation. A token must both
/// match the format of `T` and parse successfully.
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Typed<T> {
    /// Creates a matcher for `T`.
    pub fn new() -> Self {
        Typed(PhantomData)
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ArgumentMatcher for Typed<T>
where T: for<'a> FromArgument<'a>
{
    fn try_match(&self, token: &str, context: &Context<'_>) -> bool {
        T::matches(token) && T::from_arg(token, context).is_ok()
    }

    fn try_partial_match(&self, token: &str, _context: &Context<'_>) -> bool {
        T::partial_matches(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sender;

    struct Silent;

    impl Sender for Silent {
        fn send_message(&self, _message: &str) {}
    }

    fn split(line: &str) -> Vec<&str> {
        ArgumentTraverser::new(line).collect()
    }

    #[test]
    fn splits_on_spaces() {
        assert_eq!(split("give sword 5"), vec!["give", "sword", "5"]);
        assert_eq!(split("  give   sword"), vec!["give", "sword"]);
    }

    #[test]
    fn strips_leading_slash() {
        assert_eq!(split("/tp 1 2 3"), vec!["tp", "1", "2", "3"]);
    }

    #[test]
    fn trailing_space_yields_empty_argument() {
        assert_eq!(split("give "), vec!["give", ""]);
        assert_eq!(split("give sword  "), vec!["give", "sword", ""]);
    }

    #[test]
    fn empty_line_has_no_arguments() {
        assert!(split("").is_empty());
        assert!(split("   ").is_empty());
        assert!(!ArgumentTraverser::new("/").has_next());
    }

    #[test]
    fn quotes_group_arguments() {
        assert_eq!(split(r#"say "hello world" 'a b'"#), vec![
            "say",
            r#""hello world""#,
            "'a b'"
        ]);
        assert_eq!(split(r#"say "escaped \" quote" x"#), vec![
            "say",
            r#""escaped \" quote""#,
            "x"
        ]);
    }

    #[test]
    fn current_tracks_previous_argument() {
        let mut args = ArgumentTraverser::new("a bc");
        assert_eq!(args.current(), "");
        args.next();
        assert_eq!(args.current(), "a");
        args.next();
        assert_eq!(args.current(), "bc");
        assert_eq!(args.next(), None);
        assert_eq!(args.current(), "bc");
    }

    #[test]
    fn integers() {
        let sender = Silent;
        let ctx = Context::new("t", Vec::new(), &sender);
        assert!(u8::matches("12"));
        assert!(!u8::matches("1a"));
        assert!(!u8::matches(""));
        assert!(i32::matches("-4"));
        assert_eq!(i32::from_arg("-4", &ctx), Ok(-4));
        assert!(u8::from_arg("300", &ctx).is_err());
        assert!(!Typed::<u8>::new().try_match("300", &ctx));
        assert!(Typed::<u8>::new().try_match("30", &ctx));
    }

    #[test]
    fn floats() {
        let sender = Silent;
        let ctx = Context::new("t", Vec::new(), &sender);
        assert!(f32::matches("1.5f"));
        assert!(f64::matches(".5"));
        assert!(f64::matches("-2."));
        assert!(!f64::matches("abc"));
        assert_eq!(f32::from_arg("1.5f", &ctx), Ok(1.5));
        assert_eq!(f64::from_arg(".5", &ctx), Ok(0.5));
        assert_eq!(f64::from_arg("-2.", &ctx), Ok(-2.0));
        assert!(f64::from_arg(".", &ctx).is_err());
    }

    #[test]
    fn partial_matches_accept_prefixes_of_valid_values() {
        assert!(f32::partial_matches(""));
        assert!(f32::partial_matches("-"));
        assert!(f32::partial_matches("1."));
        assert!(f64::partial_matches(".2"));
        assert!(f64::partial_matches("3d"));
        assert!(!f64::partial_matches("3x"));
        assert!(!f64::partial_matches("abc"));
        assert!(bool::partial_matches("tr"));
        assert!(bool::partial_matches(""));
        assert!(!bool::partial_matches("yes"));
        assert!(char::partial_matches(""));
        assert!(!char::partial_matches("ab"));
        assert!(Option::<bool>::partial_matches("fa"));
        // Without an override the full format check is used.
        assert!(u8::partial_matches("12"));
        assert!(!u8::partial_matches("1a"));
    }

    #[test]
    fn typed_matchers_check_partial_tokens() {
        let sender = Silent;
        let ctx = Context::new("t", Vec::new(), &sender);
        assert!(Typed::<bool>::new().try_partial_match("fal", &ctx));
        assert!(!Typed::<bool>::new().try_partial_match("maybe", &ctx));
        assert!(selector.try_partial_match("anything", &ctx));
    }

    #[test]
    fn strings_strip_matching_quotes() {
        let sender = Silent;
        let ctx = Context::new("t", Vec::new(), &sender);
        assert_eq!(String::from_arg("\"a b\"", &ctx), Ok("a b".to_owned()));
        assert_eq!(<&str>::from_arg("'x", &ctx), Ok("'x"));
        assert_eq!(<&str>::from_arg("\"", &ctx), Ok("\""));
    }

    #[test]
    fn bools_and_chars() {
        let sender = Silent;
        let ctx = Context::new("t", Vec::new(), &sender);
        assert_eq!(bool::from_arg("true", &ctx), Ok(true));
        assert!(bool::from_arg("yes", &ctx).is_err());
        assert_eq!(bool::suggestions(), vec!["true", "false"]);
        assert_eq!(char::from_arg("x", &ctx), Ok('x'));
        assert!(char::from_arg("xy", &ctx).is_err());
        assert_eq!(Option::<u32>::from_arg("7", &ctx), Ok(Some(7)));
    }

    fn selector(token: &str, _: &Context<'_>) -> bool {
        token.starts_with('@')
    }

    #[test]
    fn functions_are_matchers() {
        let sender = Silent;
        let ctx = Context::new("t", Vec::new(), &sender);
        assert!(selector.try_match("@p", &ctx));
        assert!(!selector.try_match("p", &ctx));
    }
}
