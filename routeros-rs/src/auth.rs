//! The `/login` handshake.
//!
//! Current RouterOS versions accept the password in the first `/login` sentence and
//! answer `!done`. Versions before 6.43 answer with a hex challenge in `=ret=` instead;
//! the client then proves knowledge of the password with an MD5 digest and logs in
//! again. [`LoginHandshake`] drives both variants without doing any I/O itself.

use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use md5::{Digest, Md5};
use thiserror::Error;

use crate::protocol::{ReplyKind, error::ProtocolError, sentence::Sentence};

/// Computes the legacy challenge response: `"00"` followed by the lowercase hex of
/// `MD5(0x00 || password || challenge)`.
pub fn challenge_response(challenge: &[u8], password: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update([0_u8]);
    hasher.update(password.as_bytes());
    hasher.update(challenge);
    format!("00{}", HEXLOWER.encode(&hasher.finalize()))
}

/// Errors ending a login attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The device answered `!trap` or `!fatal`.
    #[error("login rejected: {0}")]
    Rejected(ProtocolError),
    /// The `ret` challenge is not valid hex.
    #[error("invalid login challenge: {0}")]
    InvalidChallenge(String),
    /// The device kept sending sentences that neither accept nor reject the login.
    #[error("no login outcome after {0} sentences")]
    NoOutcome(usize),
}

/// Progress of a [`LoginHandshake`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// The credentials were sent; waiting for `!done` or a challenge.
    AwaitingFirstReply,
    /// The challenge response was sent; waiting for `!done`.
    AwaitingChallengeReply,
    /// The device accepted the login.
    Done,
}

/// What the caller must do after feeding a sentence to the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    /// Write this sentence, then keep reading.
    Send(Vec<String>),
    /// Keep reading; the sentence was not relevant.
    Continue,
    /// Login succeeded.
    Authenticated,
}

/// Sans-IO state machine for the `/login` exchange.
#[derive(Debug)]
pub struct LoginHandshake<'a> {
    username: &'a str,
    password: &'a str,
    state: LoginState,
    received: usize,
    max_sentences: usize,
}

impl<'a> LoginHandshake<'a> {
    /// Starts a handshake that gives up after `max_sentences` replies without an outcome.
    pub fn new(username: &'a str, password: &'a str, max_sentences: usize) -> Self {
        Self {
            username,
            password,
            state: LoginState::AwaitingFirstReply,
            received: 0,
            max_sentences,
        }
    }

    /// The current state.
    pub fn state(&self) -> LoginState {
        self.state
    }

    /// The first sentence to write: `/login` with name and password.
    pub fn initial_sentence(&self) -> Vec<String> {
        vec![
            "/login".to_string(),
            format!("=name={}", self.username),
            format!("=password={}", self.password),
        ]
    }

    /// Feeds a received sentence into the handshake.
    pub fn on_sentence(&mut self, sentence: &Sentence) -> Result<LoginStep, AuthError> {
        if self.state == LoginState::Done {
            return Ok(LoginStep::Authenticated);
        }

        self.received += 1;
        if self.received > self.max_sentences {
            return Err(AuthError::NoOutcome(self.max_sentences));
        }

        if self.state == LoginState::AwaitingFirstReply {
            if let Some(ret) = sentence.get("ret") {
                let challenge = HEXLOWER_PERMISSIVE
                    .decode(ret.as_bytes())
                    .map_err(|e| AuthError::InvalidChallenge(e.to_string()))?;
                self.state = LoginState::AwaitingChallengeReply;
                return Ok(LoginStep::Send(vec![
                    "/login".to_string(),
                    format!("=name={}", self.username),
                    format!(
                        "=response={}",
                        challenge_response(&challenge, self.password)
                    ),
                ]));
            }
        }

        match sentence.reply_kind() {
            Some(ReplyKind::Done) => {
                self.state = LoginState::Done;
                Ok(LoginStep::Authenticated)
            }
            Some(ReplyKind::Trap | ReplyKind::Fatal) => Err(AuthError::Rejected(
                ProtocolError::from_message(sentence.message()),
            )),
            _ => Ok(LoginStep::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHALLENGE: &str = "ebddd18303a54111e2dea05a92ab46b4";

    fn challenge_bytes() -> Vec<u8> {
        HEXLOWER.decode(CHALLENGE.as_bytes()).unwrap()
    }

    #[test]
    fn test_challenge_response_vectors() {
        assert_eq!(
            challenge_response(&challenge_bytes(), "secret"),
            "007319531c22b6b85e160d6ac355c1df2e"
        );
        assert_eq!(
            challenge_response(&challenge_bytes(), ""),
            "001ea726ed53ae38520c8334f82d44c9f2"
        );
    }

    #[test]
    fn test_plain_login() {
        let mut handshake = LoginHandshake::new("admin", "secret", 8);
        assert_eq!(
            handshake.initial_sentence(),
            ["/login", "=name=admin", "=password=secret"]
        );

        let step = handshake.on_sentence(&Sentence::from_words(["!done"])).unwrap();
        assert_eq!(step, LoginStep::Authenticated);
        assert_eq!(handshake.state(), LoginState::Done);
    }

    #[test]
    fn test_challenge_login() {
        let mut handshake = LoginHandshake::new("admin", "secret", 8);

        let ret = format!("=ret={CHALLENGE}");
        let step = handshake
            .on_sentence(&Sentence::from_words(["!done", ret.as_str()]))
            .unwrap();
        assert_eq!(
            step,
            LoginStep::Send(vec![
                "/login".to_string(),
                "=name=admin".to_string(),
                "=response=007319531c22b6b85e160d6ac355c1df2e".to_string(),
            ])
        );
        assert_eq!(handshake.state(), LoginState::AwaitingChallengeReply);

        let step = handshake.on_sentence(&Sentence::from_words(["!done"])).unwrap();
        assert_eq!(step, LoginStep::Authenticated);
    }

    #[test]
    fn test_rejected_login() {
        let mut handshake = LoginHandshake::new("admin", "wrong", 8);
        let err = handshake
            .on_sentence(&Sentence::from_words([
                "!trap",
                "=message=invalid user name or password (6)",
            ]))
            .unwrap_err();
        assert_eq!(
            err,
            AuthError::Rejected(ProtocolError {
                message: "invalid user name or password (6)".to_string()
            })
        );
    }

    #[test]
    fn test_unrelated_sentences_are_skipped_then_bounded() {
        let mut handshake = LoginHandshake::new("admin", "secret", 2);
        let noise = Sentence::from_words(["!re", "=foo=bar"]);

        assert_eq!(handshake.on_sentence(&noise).unwrap(), LoginStep::Continue);
        assert_eq!(handshake.on_sentence(&noise).unwrap(), LoginStep::Continue);
        assert_eq!(handshake.on_sentence(&noise), Err(AuthError::NoOutcome(2)));
    }

    #[test]
    fn test_invalid_challenge() {
        let mut handshake = LoginHandshake::new("admin", "secret", 8);
        let err = handshake
            .on_sentence(&Sentence::from_words(["!done", "=ret=xyz"]))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidChallenge(_)));
    }
}
