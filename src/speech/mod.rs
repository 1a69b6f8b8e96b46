//! Speech output.
//!
//! The core only hands complete sentences to a [`Speaker`]. Rendering audio
//! is up to the host; the speakers here log or record what they receive.

mod message;

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

pub use message::{
    in_front_phrase, MessageGenerator, CATEGORY_SUMMARY_PREFIX, HELP_PHRASE, LOCALE,
    NO_DETECTION_PHRASE, PRIORITY_ITEMS,
};

/// Speech collaborator.
pub trait Speaker: Send {
    fn speak(&mut self, utterance: &str, locale: &str) -> Result<()>;
}

impl<S: Speaker + ?Sized> Speaker for Box<S> {
    fn speak(&mut self, utterance: &str, locale: &str) -> Result<()> {
        (**self).speak(utterance, locale)
    }
}

/// Writes utterances to the log at `info`.
#[derive(Debug, Default)]
pub struct LogSpeaker {
    spoken: u64,
}

impl LogSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> u64 {
        self.spoken
    }
}

impl Speaker for LogSpeaker {
    fn speak(&mut self, utterance: &str, locale: &str) -> Result<()> {
        self.spoken += 1;
        log::info!("speak[{}] #{}: {}", locale, self.spoken, utterance);
        Ok(())
    }
}

/// Collects utterances in memory. Clones share the same transcript.
#[derive(Clone, Debug, Default)]
pub struct RecordingSpeaker {
    transcript: Arc<Mutex<Vec<String>>>,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> Vec<String> {
        self.transcript
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }
}

impl Speaker for RecordingSpeaker {
    fn speak(&mut self, utterance: &str, _locale: &str) -> Result<()> {
        self.transcript
            .lock()
            .map_err(|_| anyhow!("transcript lock poisoned"))?
            .push(utterance.to_string());
        Ok(())
    }
}

/// Skips an utterance identical to the previous one.
///
/// Frames arrive many times a second; repeating the same sentence while the
/// camera rests on one shelf is noise.
pub struct ChangesOnly<S> {
    inner: S,
    last: Option<String>,
}

impl<S: Speaker> ChangesOnly<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, last: None }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Speaker> Speaker for ChangesOnly<S> {
    fn speak(&mut self, utterance: &str, locale: &str) -> Result<()> {
        if self.last.as_deref() == Some(utterance) {
            log::trace!("repeat utterance skipped");
            return Ok(());
        }
        self.inner.speak(utterance, locale)?;
        self.last = Some(utterance.to_string());
        Ok(())
    }
}
