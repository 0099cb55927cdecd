//! Masked secret entry with mandatory confirmation
//!
//! Every secret typed for the token is entered twice. Pairs that differ, or
//! that fail a follow-up transform such as base32 decoding, are dropped and
//! the operator is asked again.

use tracing::debug;

use crate::crypto::Secret;
use crate::error::{LlaveroError, Result};

/// Prompt shown for the second entry
pub const CONFIRM_PROMPT: &str = "Confirm:";

/// Where masked operator input comes from
pub trait SecretSource {
    /// Show `prompt` and read one masked entry
    fn read_masked(&mut self, prompt: &str) -> Result<Secret>;

    /// Tell the operator why the last entry was thrown away
    fn reject(&mut self, reason: &LlaveroError);
}

/// How many times to re-prompt after a recoverable error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Keep asking until the operator gets it right
    pub fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    /// Give up after `attempts` tries (at least one)
    pub fn at_most(attempts: u32) -> Self {
        Self {
            max_attempts: Some(attempts.max(1)),
        }
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Run `attempt` until it succeeds or fails with a non-recoverable error
    ///
    /// `on_reject` sees every recoverable error that leads to another try.
    /// When the attempts run out the last recoverable error is returned.
    pub fn run<C, T>(
        &self,
        ctx: &mut C,
        mut attempt: impl FnMut(&mut C) -> Result<T>,
        mut on_reject: impl FnMut(&mut C, &LlaveroError),
    ) -> Result<T>
    where
        C: ?Sized,
    {
        let mut tries: u32 = 0;
        loop {
            tries += 1;
            match attempt(ctx) {
                Err(err) if err.is_recoverable() => {
                    if self.max_attempts.is_some_and(|max| tries >= max) {
                        return Err(err);
                    }
                    on_reject(ctx, &err);
                }
                other => return other,
            }
        }
    }
}

/// Confirmed secret entry on top of a `SecretSource`
pub struct SecretPrompt<'a> {
    source: &'a mut dyn SecretSource,
    policy: RetryPolicy,
}

impl<'a> SecretPrompt<'a> {
    pub fn new(source: &'a mut dyn SecretSource, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Read a secret twice until both entries match
    pub fn acquire(&mut self, prompt: &str) -> Result<Secret> {
        self.acquire_with(prompt, Ok)
    }

    /// Like `acquire`, then feed the agreed secret to `transform`
    ///
    /// A recoverable error from `transform` starts the entry over.
    pub fn acquire_with<T>(
        &mut self,
        prompt: &str,
        mut transform: impl FnMut(Secret) -> Result<T>,
    ) -> Result<T> {
        self.policy.run(
            &mut *self.source,
            |source| {
                let entry = source.read_masked(prompt)?;
                let confirmation = source.read_masked(CONFIRM_PROMPT)?;
                if entry != confirmation {
                    return Err(LlaveroError::ConfirmationMismatch);
                }
                drop(confirmation);
                transform(entry)
            },
            |source, err| {
                debug!(reason = %err, "secret entry rejected");
                source.reject(err);
            },
        )
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedSource;
    use super::*;

    #[test]
    fn test_matching_pair_accepted_first_time() {
        let mut source = ScriptedSource::new(&["pw1", "pw1"]);
        let secret = SecretPrompt::new(&mut source, RetryPolicy::unbounded())
            .acquire("Secret:")
            .unwrap();

        assert_eq!(&*secret, b"pw1");
        assert_eq!(source.prompts, vec!["Secret:", CONFIRM_PROMPT]);
        assert!(source.rejections.is_empty());
    }

    #[test]
    fn test_mismatched_pair_is_discarded() {
        let mut source = ScriptedSource::new(&["pw1", "pw2", "pw3", "pw3"]);
        let secret = SecretPrompt::new(&mut source, RetryPolicy::unbounded())
            .acquire("Secret:")
            .unwrap();

        assert_eq!(&*secret, b"pw3");
        assert_eq!(source.rejections.len(), 1);
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_unbounded_retry_keeps_asking() {
        let mut source = ScriptedSource::new(&["a", "b", "c", "d", "e", "f", "g", "g"]);
        let secret = SecretPrompt::new(&mut source, RetryPolicy::unbounded())
            .acquire("Secret:")
            .unwrap();

        assert_eq!(&*secret, b"g");
        assert_eq!(source.rejections.len(), 3);
    }

    #[test]
    fn test_bounded_retry_gives_up() {
        let mut source = ScriptedSource::new(&["a", "b", "c", "d", "e", "e"]);
        let err = SecretPrompt::new(&mut source, RetryPolicy::at_most(2))
            .acquire("Secret:")
            .unwrap_err();

        assert!(matches!(err, LlaveroError::ConfirmationMismatch));
        // Only the rejection that led to a second try is reported
        assert_eq!(source.rejections.len(), 1);
        assert_eq!(source.remaining(), 2);
    }

    #[test]
    fn test_transform_error_reprompts() {
        let mut source = ScriptedSource::new(&["bad", "bad", "good", "good"]);
        let value = SecretPrompt::new(&mut source, RetryPolicy::unbounded())
            .acquire_with("Seed:", |secret| {
                if &*secret == b"good" {
                    Ok(secret.len())
                } else {
                    Err(LlaveroError::Encoding("nope".into()))
                }
            })
            .unwrap();

        assert_eq!(value, 4);
        assert_eq!(source.rejections, vec!["Invalid base32 seed: nope"]);
    }

    #[test]
    fn test_source_failure_propagates() {
        let mut source = ScriptedSource::new(&["only one"]);
        let err = SecretPrompt::new(&mut source, RetryPolicy::unbounded())
            .acquire("Secret:")
            .unwrap_err();

        assert!(matches!(err, LlaveroError::Cancelled));
    }
}
