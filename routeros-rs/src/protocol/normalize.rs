//! Conversion of API-style query tokens into a console command line.
//!
//! The API expresses filters as a stack program: `?key=value` pushes a condition and
//! `?#|` / `?#&` combine what was pushed so far. Console scripting instead wants an
//! infix expression after `where` (for `print`) or inside `[find ...]` (for commands
//! that act on existing items). [`normalize_to_command_line`] performs that rewrite.
//!
//! The rewrite is deliberately shallow: each `?#|` / `?#&` closes the conditions
//! pushed since the previous operator into one group, and the groups are then joined
//! with `and`. Tokens are never rejected; anything that is neither a plain argument
//! nor a group operator is treated as a condition.

use std::fmt::{self, Display, Formatter};

/// A group operator token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOp {
    /// `?#|`: closes the pending conditions as an `or` group.
    Or,
    /// `?#&`: closes the pending conditions as an `and` group.
    And,
    /// `?#()`: ignored.
    Noop,
}

/// A classified input token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// `=key=value`, an argument passed to the command itself.
    Argument {
        /// Name of the argument.
        key: &'a str,
        /// Value of the argument, [`None`] for a bare `=key`.
        value: Option<&'a str>,
    },
    /// `?key=value` or `?key`, with the leading `?` removed.
    Condition(&'a str),
    /// A group operator.
    Group(GroupOp),
}

impl<'a> Token<'a> {
    /// Classifies a token. Never fails.
    pub fn parse(token: &'a str) -> Self {
        match token {
            "?#|" => Token::Group(GroupOp::Or),
            "?#&" => Token::Group(GroupOp::And),
            "?#()" => Token::Group(GroupOp::Noop),
            _ => match token.strip_prefix('=') {
                Some(argument) => match argument.split_once('=') {
                    Some((key, value)) => Token::Argument {
                        key,
                        value: Some(value),
                    },
                    None => Token::Argument {
                        key: argument,
                        value: None,
                    },
                },
                None => Token::Condition(token.strip_prefix('?').unwrap_or(token)),
            },
        }
    }
}

/// How the terms of a [`Group`] are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    /// Terms joined with `and`.
    #[default]
    And,
    /// Terms joined with `or`.
    Or,
}

impl Combinator {
    fn keyword(&self) -> &'static str {
        match self {
            Combinator::And => " and ",
            Combinator::Or => " or ",
        }
    }
}

/// A run of conditions closed by a group operator (or by the end of input).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Group {
    /// How the terms are joined.
    pub combinator: Combinator,
    /// The conditions, in input order.
    pub terms: Vec<String>,
}

/// Tokens sorted into command arguments and condition groups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filter {
    /// Arguments rendered as `key=value`, values quoted when they contain whitespace.
    pub arguments: Vec<String>,
    /// Non-empty condition groups, in input order.
    pub groups: Vec<Group>,
}

impl Filter {
    /// Sorts `tokens` into arguments and groups.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Filter::default();
        let mut current = Group::default();

        for token in tokens {
            let token = token.as_ref();
            if token.is_empty() {
                continue;
            }
            match Token::parse(token) {
                Token::Argument { key, value } => filter.arguments.push(render_argument(key, value)),
                Token::Condition(term) => current.terms.push(term.to_string()),
                Token::Group(GroupOp::Or) => {
                    current.combinator = Combinator::Or;
                    filter.close_group(&mut current);
                }
                Token::Group(GroupOp::And) => filter.close_group(&mut current),
                Token::Group(GroupOp::Noop) => {}
            }
        }
        filter.close_group(&mut current);
        filter
    }

    /// The condition expression, [`None`] when there are no conditions.
    pub fn expression(&self) -> Option<String> {
        if self.groups.is_empty() {
            return None;
        }
        let nested = self.groups.len() > 1;
        let parts: Vec<String> = self
            .groups
            .iter()
            .map(|group| {
                let expr = group.terms.join(group.combinator.keyword());
                if nested && group.terms.len() > 1 {
                    format!("({expr})")
                } else {
                    expr
                }
            })
            .collect();
        Some(parts.join(" and "))
    }

    fn close_group(&mut self, current: &mut Group) {
        let group = std::mem::take(current);
        if !group.terms.is_empty() {
            self.groups.push(group);
        }
    }
}

fn render_argument(key: &str, value: Option<&str>) -> String {
    match value {
        Some(value) if value.chars().any(char::is_whitespace) => format!("{key}=\"{value}\""),
        Some(value) => format!("{key}={value}"),
        None => key.to_string(),
    }
}

/// The command family, decided by the last segment of the command path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// `print`: conditions go after `where`.
    Print,
    /// `set`, `remove`, `unset`, `disable`, `enable`: conditions select items with `find`.
    Modify,
    /// `add`: creates an item, conditions do not apply.
    Add,
    /// Any other command: conditions are appended as-is.
    Other,
}

impl Verb {
    /// Determines the verb of a command path such as `/ip/address/print`.
    pub fn of(path: &str) -> Self {
        let last = path.rsplit('/').next().unwrap_or(path).trim();
        match last {
            "print" => Verb::Print,
            "set" | "remove" | "unset" | "disable" | "enable" => Verb::Modify,
            "add" => Verb::Add,
            _ => Verb::Other,
        }
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.expression() {
            Some(expr) => f.write_str(&expr),
            None => Ok(()),
        }
    }
}

/// Converts a command path and its API tokens into a console command line.
///
/// | Verb                                          | Output                                 |
/// |-----------------------------------------------|----------------------------------------|
/// | `print`                                       | `<path> where <expr>`                  |
/// | `set`, `remove`, `unset`, `disable`, `enable` | `<path> <args> [find <expr>]`          |
/// | `add`                                         | `<path> <args>`                        |
/// | anything else                                 | `<path> <expr>`                        |
///
/// Missing parts are left out: without conditions `print` yields the bare path and
/// `set` yields `<path> <args>`. Arguments are only emitted for `add` and the `set`
/// family.
///
/// # Examples
///
/// ```
/// use routeros_rs::protocol::normalize::normalize_to_command_line;
///
/// let line = normalize_to_command_line("/x/print", ["?a=1", "?a=2", "?#|", "?b=3", "?#&"]);
/// assert_eq!(line, "/x/print where (a=1 or a=2) and b=3");
/// ```
pub fn normalize_to_command_line<I, S>(path: &str, tokens: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let filter = Filter::from_tokens(tokens);
    let mut line = path.to_string();

    match Verb::of(path) {
        Verb::Print => {
            if let Some(expr) = filter.expression() {
                line.push_str(" where ");
                line.push_str(&expr);
            }
        }
        Verb::Modify => {
            push_arguments(&mut line, &filter.arguments);
            if let Some(expr) = filter.expression() {
                line.push_str(" [find ");
                line.push_str(&expr);
                line.push(']');
            }
        }
        Verb::Add => push_arguments(&mut line, &filter.arguments),
        Verb::Other => {
            if let Some(expr) = filter.expression() {
                line.push(' ');
                line.push_str(&expr);
            }
        }
    }
    line
}

fn push_arguments(line: &mut String, arguments: &[String]) {
    for argument in arguments {
        line.push(' ');
        line.push_str(argument);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(path: &str, tokens: &[&str]) -> String {
        normalize_to_command_line(path, tokens)
    }

    #[test]
    fn test_print_single_condition() {
        assert_eq!(normalize("/x/print", &["?a=1"]), "/x/print where a=1");
    }

    #[test]
    fn test_print_conditions_default_to_and() {
        assert_eq!(normalize("/x/print", &["?a=1", "?b=2"]), "/x/print where a=1 and b=2");
    }

    #[test]
    fn test_print_single_or_group_is_not_parenthesized() {
        assert_eq!(
            normalize(
                "/ip/firewall/address-list/print",
                &["?list=aviso", "?list=block", "?#|"]
            ),
            "/ip/firewall/address-list/print where list=aviso or list=block"
        );
    }

    #[test]
    fn test_print_or_group_and_outer_and() {
        assert_eq!(
            normalize("/x/print", &["?a=1", "?a=2", "?#|", "?b=3", "?#&"]),
            "/x/print where (a=1 or a=2) and b=3"
        );
    }

    #[test]
    fn test_print_without_conditions() {
        assert_eq!(normalize("/x/print", &[]), "/x/print");
        assert_eq!(normalize("/x/print", &["?#()", "?#&"]), "/x/print");
    }

    #[test]
    fn test_remove_uses_find() {
        assert_eq!(
            normalize("/x/remove", &["?a=1", "?b=2", "?#&"]),
            "/x/remove [find a=1 and b=2]"
        );
    }

    #[test]
    fn test_set_with_arguments_and_groups() {
        assert_eq!(
            normalize(
                "/ip/firewall/address-list/set",
                &["=address=1.1.1.2", "?list=aviso", "?list=block", "?#|", "?disabled=no", "?#&"]
            ),
            "/ip/firewall/address-list/set address=1.1.1.2 [find (list=aviso or list=block) and disabled=no]"
        );
    }

    #[test]
    fn test_set_without_conditions_keeps_arguments() {
        assert_eq!(normalize("/x/set", &["=disabled=yes"]), "/x/set disabled=yes");
        assert_eq!(normalize("/x/enable", &[]), "/x/enable");
    }

    #[test]
    fn test_add_arguments() {
        assert_eq!(normalize("/x/add", &["=name=foo"]), "/x/add name=foo");
        assert_eq!(
            normalize(
                "/ip/firewall/address-list/add",
                &["=address=1.1.1.2", "=address=1.1.1.2", "=list=aviso"]
            ),
            "/ip/firewall/address-list/add address=1.1.1.2 address=1.1.1.2 list=aviso"
        );
    }

    #[test]
    fn test_add_ignores_conditions() {
        assert_eq!(normalize("/x/add", &["=name=foo", "?a=1"]), "/x/add name=foo");
    }

    #[test]
    fn test_argument_values_with_whitespace_are_quoted() {
        assert_eq!(
            normalize("/x/add", &["=comment=office uplink", "=disabled"]),
            "/x/add comment=\"office uplink\" disabled"
        );
    }

    #[test]
    fn test_other_verb() {
        assert_eq!(
            normalize("/interface/monitor-traffic", &["?interface=ether1"]),
            "/interface/monitor-traffic interface=ether1"
        );
        assert_eq!(normalize("/system/reboot", &[]), "/system/reboot");
    }

    #[test]
    fn test_bare_conditions_and_malformed_tokens() {
        assert_eq!(normalize("/x/print", &["?dynamic"]), "/x/print where dynamic");
        assert_eq!(normalize("/x/print", &["running", ""]), "/x/print where running");
    }

    #[test]
    fn test_token_parse() {
        assert_eq!(Token::parse("?#|"), Token::Group(GroupOp::Or));
        assert_eq!(Token::parse("?#()"), Token::Group(GroupOp::Noop));
        assert_eq!(Token::parse("?a=1"), Token::Condition("a=1"));
        assert_eq!(
            Token::parse("=a=b=c"),
            Token::Argument {
                key: "a",
                value: Some("b=c")
            }
        );
    }

    #[test]
    fn test_verb_of_path() {
        assert_eq!(Verb::of("/ip/address/print"), Verb::Print);
        assert_eq!(Verb::of("/ip/address/unset"), Verb::Modify);
        assert_eq!(Verb::of("/ip/address/add"), Verb::Add);
        assert_eq!(Verb::of("/interface/listen"), Verb::Other);
        assert_eq!(Verb::of("print"), Verb::Print);
    }
}
