//! Command dispatch
//!
//! Turns a finalized transcript into a handler invocation. The wake
//! prefix is the anti-false-trigger gate for an always-on microphone:
//! anything heard without it is logged and dropped.

use tracing::warn;
use voxgate_stt::Transcript;

/// Zero-argument command action. Slot extraction and anything richer
/// belongs to the external command router that handlers call into.
pub type CommandHandler = Box<dyn Fn() + Send>;

struct CommandEntry {
    phrase: String,
    handler: CommandHandler,
}

/// Ordered phrase-to-action registry.
///
/// Lookups are case-insensitive. Registration order matters only in the
/// substring-fallback path, where the first registered phrase contained
/// in the command body wins; re-registering a phrase replaces its handler
/// in place so it keeps its original precedence slot.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<CommandEntry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, phrase: &str, handler: CommandHandler) {
        let phrase = phrase.trim().to_lowercase();
        if phrase.is_empty() {
            warn!("ignoring registration of empty command phrase");
            return;
        }
        match self.entries.iter_mut().find(|e| e.phrase == phrase) {
            Some(entry) => entry.handler = handler,
            None => self.entries.push(CommandEntry { phrase, handler }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Interim transcript; observational only, never dispatched
    NotFinal,
    /// Final transcript without the wake prefix
    MissingPrefix,
    /// A handler was invoked
    Dispatched { phrase: String, via_substring: bool },
    /// Wake prefix present but nothing matched (including an empty body)
    NoMatch,
}

pub fn dispatch(
    registry: &CommandRegistry,
    wake_prefix: &str,
    transcript: &Transcript,
) -> DispatchOutcome {
    if !transcript.is_final {
        return DispatchOutcome::NotFinal;
    }

    let normalized = transcript.normalized();
    let prefix = wake_prefix.trim().to_lowercase();

    let rest = match normalized.strip_prefix(&prefix) {
        Some(rest) => rest,
        None => return DispatchOutcome::MissingPrefix,
    };
    // The prefix must be a whole word: "voxel ..." is not "vox ..."
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return DispatchOutcome::MissingPrefix;
    }

    let body = rest.trim();
    if body.is_empty() {
        return DispatchOutcome::NoMatch;
    }

    if let Some(entry) = registry.entries.iter().find(|e| e.phrase == body) {
        (entry.handler)();
        return DispatchOutcome::Dispatched {
            phrase: entry.phrase.clone(),
            via_substring: false,
        };
    }

    // Fallback: first registered phrase contained in the body wins
    if let Some(entry) = registry.entries.iter().find(|e| body.contains(&e.phrase)) {
        (entry.handler)();
        return DispatchOutcome::Dispatched {
            phrase: entry.phrase.clone(),
            via_substring: true,
        };
    }

    DispatchOutcome::NoMatch
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn final_transcript(text: &str) -> Transcript {
        Transcript {
            utterance_id: 1,
            text: text.to_string(),
            is_final: true,
        }
    }

    fn counting_registry(phrases: &[&str]) -> (CommandRegistry, Vec<Arc<AtomicUsize>>) {
        let mut registry = CommandRegistry::new();
        let mut counters = Vec::new();
        for phrase in phrases {
            let counter = Arc::new(AtomicUsize::new(0));
            let c = counter.clone();
            registry.register(phrase, Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }));
            counters.push(counter);
        }
        (registry, counters)
    }

    #[test]
    fn exact_match_dispatches_exactly_once() {
        let (registry, counters) = counting_registry(&["turn on lights"]);
        let outcome = dispatch(&registry, "alpha", &final_transcript("alpha turn on lights"));
        assert_eq!(
            outcome,
            DispatchOutcome::Dispatched {
                phrase: "turn on lights".into(),
                via_substring: false
            }
        );
        assert_eq!(counters[0].load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_prefix_dispatches_nothing() {
        let (registry, counters) = counting_registry(&["turn on lights"]);
        let outcome = dispatch(&registry, "alpha", &final_transcript("turn on lights"));
        assert_eq!(outcome, DispatchOutcome::MissingPrefix);
        assert_eq!(counters[0].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn extra_words_dispatch_via_substring_fallback() {
        let (registry, counters) = counting_registry(&["turn on lights"]);
        let outcome = dispatch(
            &registry,
            "alpha",
            &final_transcript("alpha please turn on lights now"),
        );
        assert_eq!(
            outcome,
            DispatchOutcome::Dispatched {
                phrase: "turn on lights".into(),
                via_substring: true
            }
        );
        assert_eq!(counters[0].load(Ordering::SeqCst), 1);
    }

    #[test]
    fn first_registered_phrase_wins_fallback_ties() {
        let (registry, counters) = counting_registry(&["lights", "turn on lights"]);
        // Both phrases are contained in the body; registration order decides
        let outcome = dispatch(
            &registry,
            "vox",
            &final_transcript("vox please turn on lights"),
        );
        assert!(matches!(outcome, DispatchOutcome::Dispatched { via_substring: true, .. }));
        assert_eq!(counters[0].load(Ordering::SeqCst), 1);
        assert_eq!(counters[1].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn exact_match_beats_fallback_order() {
        let (registry, counters) = counting_registry(&["lights", "turn on lights"]);
        let outcome = dispatch(&registry, "vox", &final_transcript("vox turn on lights"));
        assert!(matches!(outcome, DispatchOutcome::Dispatched { via_substring: false, .. }));
        assert_eq!(counters[0].load(Ordering::SeqCst), 0);
        assert_eq!(counters[1].load(Ordering::SeqCst), 1);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let (registry, counters) = counting_registry(&["Turn On Lights"]);
        let outcome = dispatch(&registry, "VOX", &final_transcript("Vox TURN on lights"));
        assert!(matches!(outcome, DispatchOutcome::Dispatched { .. }));
        assert_eq!(counters[0].load(Ordering::SeqCst), 1);
    }

    #[test]
    fn interim_transcripts_are_never_dispatched() {
        let (registry, counters) = counting_registry(&["turn on lights"]);
        let transcript = Transcript {
            utterance_id: 1,
            text: "vox turn on lights".to_string(),
            is_final: false,
        };
        assert_eq!(
            dispatch(&registry, "vox", &transcript),
            DispatchOutcome::NotFinal
        );
        assert_eq!(counters[0].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn bare_wake_prefix_is_a_no_match() {
        let (registry, counters) = counting_registry(&["turn on lights"]);
        assert_eq!(
            dispatch(&registry, "vox", &final_transcript("vox")),
            DispatchOutcome::NoMatch
        );
        assert_eq!(
            dispatch(&registry, "vox", &final_transcript("  vox   ")),
            DispatchOutcome::NoMatch
        );
        assert_eq!(counters[0].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn prefix_must_be_a_whole_word() {
        let (registry, counters) = counting_registry(&["turn on lights"]);
        assert_eq!(
            dispatch(&registry, "vox", &final_transcript("voxel turn on lights")),
            DispatchOutcome::MissingPrefix
        );
        assert_eq!(counters[0].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn duplicate_registration_overwrites_in_place() {
        let mut registry = CommandRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let shadow = Arc::new(AtomicUsize::new(0));

        let c = first.clone();
        registry.register("lights", Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        let c = shadow.clone();
        registry.register("turn on lights", Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        let c = second.clone();
        registry.register("lights", Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(registry.len(), 2);

        // The replacement handler runs, and "lights" kept its original
        // precedence slot ahead of "turn on lights"
        dispatch(&registry, "vox", &final_transcript("vox turn on lights please"));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(shadow.load(Ordering::SeqCst), 0);
    }
}
