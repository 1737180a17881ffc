use std::fmt::{self, Display, Formatter};

use super::ReplyKind;

/// Attribute key RouterOS uses to carry the correlation tag of a sentence.
pub const TAG_KEY: &str = ".tag";

/// Represents a word in a RouterOS [`Sentence`](super::sentence::Sentence).
///
/// Words can be of three types:
/// - A category word, which marks the type of a reply, such as `!done`, `!re` or `!trap`.
/// - An attribute word, which represents a key-value pair like `=name=ether1` or `.tag=7`.
/// - A bare word, which is anything else. Commands (`/interface/print`) and the reason
///   line of an untagged `!fatal` are bare words.
///
/// # Examples
///
/// ```
/// use routeros_rs::protocol::word::Word;
///
/// let word = Word::parse("=name=ether1");
/// assert_eq!(word.attribute(), Some(("name", "ether1")));
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Word<'a> {
    /// A word starting with `!`. Holds the full marker, including the `!`.
    Category(&'a str),
    /// A key-value pair.
    Attribute(WordAttribute<'a>),
    /// A word that is neither a category nor an attribute.
    Bare(&'a str),
}

impl<'a> Word<'a> {
    /// Classifies a raw word.
    ///
    /// A word containing `=` is an attribute: one leading `=` is stripped and the rest
    /// is split on the first `=`. The value may contain further `=` characters and is
    /// empty when no second `=` exists.
    pub fn parse(word: &'a str) -> Self {
        if word.starts_with('!') {
            return Word::Category(word);
        }
        if word.contains('=') {
            let stripped = word.strip_prefix('=').unwrap_or(word);
            let (key, value) = stripped.split_once('=').unwrap_or((stripped, ""));
            return Word::Attribute(WordAttribute { key, value });
        }
        Word::Bare(word)
    }

    /// Returns the reply kind of the word, if it is a known category word.
    pub fn reply_kind(&self) -> Option<ReplyKind> {
        match self {
            Word::Category(marker) => ReplyKind::from_marker(marker),
            _ => None,
        }
    }

    /// Returns the attribute of the word, if it is an attribute word.
    pub fn attribute(&self) -> Option<(&'a str, &'a str)> {
        match self {
            Word::Attribute(attribute) => Some((attribute.key, attribute.value)),
            _ => None,
        }
    }
}

impl Display for Word<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Word::Category(marker) => write!(f, "{marker}"),
            Word::Attribute(attribute) => write!(f, "{attribute}"),
            Word::Bare(word) => write!(f, "{word}"),
        }
    }
}

/// Represents a key-value pair in a RouterOS sentence.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct WordAttribute<'a> {
    /// The key of the attribute.
    pub key: &'a str,
    /// The value of the attribute, empty if none was given.
    pub value: &'a str,
}

impl WordAttribute<'_> {
    /// Whether this attribute is the `.tag` correlation attribute.
    pub fn is_tag(&self) -> bool {
        self.key == TAG_KEY
    }
}

impl Display for WordAttribute<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.key.starts_with('.') {
            write!(f, "{}={}", self.key, self.value)
        } else {
            write!(f, "={}={}", self.key, self.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_parsing() {
        assert_eq!(Word::parse("!done"), Word::Category("!done"));
        assert_eq!(Word::parse("!done").reply_kind(), Some(ReplyKind::Done));
        assert_eq!(Word::parse("!bogus").reply_kind(), None);

        assert_eq!(
            Word::parse(".tag=123"),
            Word::Attribute(WordAttribute {
                key: ".tag",
                value: "123"
            })
        );

        assert_eq!(Word::parse("=name=ether1").attribute(), Some(("name", "ether1")));
        assert_eq!(Word::parse("/interface/print"), Word::Bare("/interface/print"));
        assert_eq!(Word::parse("server down"), Word::Bare("server down"));
    }

    #[test]
    fn test_attribute_value_keeps_equals() {
        assert_eq!(
            Word::parse("=comment=a=b=c").attribute(),
            Some(("comment", "a=b=c"))
        );
        assert_eq!(Word::parse("=disabled").attribute(), Some(("disabled", "")));
        assert_eq!(Word::parse("=disabled=").attribute(), Some(("disabled", "")));
    }

    #[test]
    fn test_display_for_word() {
        assert_eq!(Word::parse("!done").to_string(), "!done");
        assert_eq!(Word::parse(".tag=123").to_string(), ".tag=123");
        assert_eq!(Word::parse("=name=ether1").to_string(), "=name=ether1");
        assert_eq!(Word::parse("unknownword").to_string(), "unknownword");
    }
}
