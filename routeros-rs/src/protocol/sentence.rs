use hashbrown::HashMap;

use super::{
    ReplyKind, Tag,
    word::{TAG_KEY, Word},
};

/// A complete sentence read from the device.
///
/// A sentence is an ordered sequence of words terminated by an empty word. Once
/// assembled it is treated as a mapping from attribute key to value, plus the
/// category marker (`!re`, `!done`, ...) and any bare words that carried neither.
///
/// Repeated keys or markers keep the last occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    marker: Option<String>,
    attributes: HashMap<String, String>,
    bare: Vec<String>,
}

impl Sentence {
    /// Creates an empty sentence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sentence from its words, in wire order.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sentence = Self::new();
        for word in words {
            sentence.push_word(word.as_ref());
        }
        sentence
    }

    /// Classifies a word and records it in the sentence. Empty words are ignored.
    pub fn push_word(&mut self, word: &str) {
        if word.is_empty() {
            return;
        }
        match Word::parse(word) {
            Word::Category(marker) => self.marker = Some(marker.to_string()),
            Word::Attribute(attribute) => {
                self.attributes
                    .insert(attribute.key.to_string(), attribute.value.to_string());
            }
            Word::Bare(bare) => self.bare.push(bare.to_string()),
        }
    }

    /// The raw category marker, including its leading `!`.
    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    /// The reply kind, if the sentence carries one of the known markers.
    pub fn reply_kind(&self) -> Option<ReplyKind> {
        self.marker.as_deref().and_then(ReplyKind::from_marker)
    }

    /// The correlation tag. [`None`] when absent or not a valid number.
    pub fn tag(&self) -> Option<Tag> {
        self.attributes.get(TAG_KEY)?.parse().ok()
    }

    /// Returns the value of an attribute.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// All attributes, including `.tag` when present.
    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Words that were neither a category nor an attribute.
    pub fn bare_words(&self) -> &[String] {
        &self.bare
    }

    /// The error text of the sentence: the `message` attribute, falling back to the
    /// first bare word (untagged `!fatal` replies carry their reason that way).
    pub fn message(&self) -> Option<&str> {
        self.get("message")
            .or_else(|| self.bare.first().map(String::as_str))
    }

    /// Consumes the sentence, returning its attributes without the `.tag` entry.
    pub fn into_data(mut self) -> HashMap<String, String> {
        self.attributes.remove(TAG_KEY);
        self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_from_words() {
        let sentence = Sentence::from_words(["!re", "=name=ether1", "=mtu=1500", ".tag=42"]);

        assert_eq!(sentence.reply_kind(), Some(ReplyKind::Reply));
        assert_eq!(sentence.tag(), Some(42));
        assert_eq!(sentence.get("name"), Some("ether1"));
        assert_eq!(sentence.get("mtu"), Some("1500"));
        assert!(sentence.bare_words().is_empty());

        let data = sentence.into_data();
        assert_eq!(data.len(), 2);
        assert!(!data.contains_key(".tag"));
    }

    #[test]
    fn test_sentence_without_category() {
        let sentence = Sentence::from_words(["/foo", "=a=b"]);
        assert_eq!(sentence.marker(), None);
        assert_eq!(sentence.reply_kind(), None);
        assert_eq!(sentence.tag(), None);
        assert_eq!(sentence.bare_words(), ["/foo".to_string()]);
    }

    #[test]
    fn test_sentence_unparsable_tag() {
        let sentence = Sentence::from_words(["!done", ".tag=abc"]);
        assert_eq!(sentence.tag(), None);
        assert_eq!(sentence.get(".tag"), Some("abc"));
    }

    #[test]
    fn test_sentence_unknown_marker() {
        let sentence = Sentence::from_words(["!bogus", ".tag=1"]);
        assert_eq!(sentence.marker(), Some("!bogus"));
        assert_eq!(sentence.reply_kind(), None);
    }

    #[test]
    fn test_sentence_with_fatal_message() {
        let sentence = Sentence::from_words(["!fatal", "not logged in"]);
        assert_eq!(sentence.reply_kind(), Some(ReplyKind::Fatal));
        assert_eq!(sentence.message(), Some("not logged in"));

        let trap = Sentence::from_words(["!trap", "=message=no such command", "stray"]);
        assert_eq!(trap.message(), Some("no such command"));
    }

    #[test]
    fn test_sentence_with_empty_response() {
        let sentence = Sentence::from_words(["!empty", ".tag=123", ""]);
        assert_eq!(sentence.reply_kind(), Some(ReplyKind::Empty));
        assert_eq!(sentence.tag(), Some(123));
        assert!(sentence.into_data().is_empty());
    }
}
