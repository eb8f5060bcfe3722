use std::collections::{BTreeMap, BTreeSet, HashMap};

use tandem_language::{Language, LanguageKey};

/// What the current result did to the session's language lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockDirective {
    /// A draft claimed (or re-asserted) exclusivity for the worker's own
    /// configured language.
    Lock(LanguageKey),
    /// A final closed the utterance and released the lock.
    Unlock,
}

/// Derived outcome of one arbitration update. Raw counters never leave the
/// module; consumers only see this and the snapshot map.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Locale of the dominant detection for the current utterance. Used to
    /// relabel a draft's displayed locale, never to decide exclusivity.
    pub resolved_locale: Language,
    pub directive: LockDirective,
    /// Per-language draft counts, `None` when no statistics exist.
    pub snapshot: Option<HashMap<LanguageKey, u32>>,
}

#[derive(Debug, Clone)]
struct DraftStatistic {
    count: u32,
    locale: Language,
}

/// Shared arbitration state for one session: per-worker draft statistics,
/// the language lock, and the enabled-locale set.
///
/// All three live behind a single serialization point in the session: the
/// lock directives from the two workers do not commute, so gate checks and
/// updates must be linearized together.
#[derive(Debug, Default)]
pub struct Arbitration {
    available: Vec<Language>,
    enabled: BTreeSet<LanguageKey>,
    lock: Option<LanguageKey>,
    stats: HashMap<LanguageKey, BTreeMap<LanguageKey, DraftStatistic>>,
}

impl Arbitration {
    pub fn new(available: &[Language]) -> Self {
        Self {
            available: available.to_vec(),
            enabled: available.iter().map(Language::key).collect(),
            lock: None,
            stats: available
                .iter()
                .map(|language| (language.key(), BTreeMap::new()))
                .collect(),
        }
    }

    /// Record one result for `worker` and derive the lock directive.
    ///
    /// Drafts always lock to the worker's own configured key, regardless of
    /// which language the text was detected as; the detection only shifts
    /// `resolved_locale`. A final clears the worker's statistics and the
    /// lock.
    pub fn update_language_state(
        &mut self,
        worker: &LanguageKey,
        is_final: bool,
        detected: &Language,
    ) -> Resolution {
        let stats = self.stats.entry(worker.clone()).or_default();
        let entry = stats
            .entry(detected.key())
            .or_insert_with(|| DraftStatistic {
                count: 0,
                locale: detected.clone(),
            });
        entry.count += 1;
        entry.locale = detected.clone();

        let resolved_locale = dominant(stats)
            .map(|stat| stat.locale.clone())
            .unwrap_or_else(|| detected.clone());
        let snapshot = if stats.is_empty() {
            None
        } else {
            Some(
                stats
                    .iter()
                    .map(|(key, stat)| (key.clone(), stat.count))
                    .collect(),
            )
        };

        let directive = if is_final {
            stats.clear();
            self.lock = None;
            LockDirective::Unlock
        } else {
            self.lock = Some(worker.clone());
            LockDirective::Lock(worker.clone())
        };

        Resolution {
            resolved_locale,
            directive,
            snapshot,
        }
    }

    /// Whether `key` may emit right now: the locked language only while a
    /// lock is held, otherwise available ∩ user-enabled.
    pub fn is_enabled(&self, key: &LanguageKey) -> bool {
        match &self.lock {
            Some(locked) => locked == key,
            None => {
                self.enabled.contains(key) && self.available.iter().any(|l| &l.key() == key)
            }
        }
    }

    pub fn enable(&mut self, language: &Language) {
        let key = language.key();
        if self.lock.as_ref() == Some(&key) {
            // Already the exclusive emitter; the set stays restricted to the
            // lock until the utterance finalizes.
            return;
        }
        if self.available.iter().any(|l| l.key() == key) {
            self.enabled.insert(key);
        }
    }

    pub fn disable(&mut self, language: &Language) {
        let key = language.key();
        if self.lock.as_ref() == Some(&key) {
            self.clear_lock();
            return;
        }
        self.enabled.remove(&key);
    }

    /// Replace the user-enabled set with `languages ∩ available`. Omitting
    /// the currently locked language counts as disabling it.
    pub fn set_enabled(&mut self, languages: &[Language]) {
        let requested: BTreeSet<LanguageKey> = languages
            .iter()
            .map(Language::key)
            .filter(|key| self.available.iter().any(|l| &l.key() == key))
            .collect();

        if let Some(locked) = &self.lock
            && !requested.contains(locked)
        {
            self.clear_lock();
            return;
        }
        self.enabled = requested;
    }

    /// The effective EnabledLocaleSet as configured languages.
    pub fn enabled_locales(&self) -> Vec<Language> {
        match &self.lock {
            Some(locked) => self
                .available
                .iter()
                .filter(|l| &l.key() == locked)
                .cloned()
                .collect(),
            None => self
                .available
                .iter()
                .filter(|l| self.enabled.contains(&l.key()))
                .cloned()
                .collect(),
        }
    }

    pub fn locked(&self) -> Option<&LanguageKey> {
        self.lock.as_ref()
    }

    fn clear_lock(&mut self) {
        self.lock = None;
        self.enabled = self.available.iter().map(Language::key).collect();
    }
}

/// Highest count wins; equal counts resolve to the lexicographically smaller
/// locale identifier. The tie-break is arbitrary but stable, not a
/// confidence ranking.
fn dominant(stats: &BTreeMap<LanguageKey, DraftStatistic>) -> Option<&DraftStatistic> {
    stats.values().reduce(|best, candidate| {
        let wins = candidate.count > best.count
            || (candidate.count == best.count
                && candidate.locale.identifier() < best.locale.identifier());
        if wins { candidate } else { best }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en() -> Language {
        Language::with_region("en", "US")
    }

    fn ko() -> Language {
        Language::with_region("ko", "KR")
    }

    fn bilingual() -> Arbitration {
        Arbitration::new(&[en(), ko()])
    }

    #[test]
    fn drafts_lock_to_the_workers_own_key() {
        let mut arbitration = bilingual();
        let worker = en().key();

        // Detected Korean, but the lock still belongs to the English worker.
        let resolution = arbitration.update_language_state(&worker, false, &ko());
        assert_eq!(resolution.directive, LockDirective::Lock(worker.clone()));
        assert_eq!(arbitration.locked(), Some(&worker));
        assert_eq!(resolution.resolved_locale, ko());
    }

    #[test]
    fn finals_clear_statistics_and_lock() {
        let mut arbitration = bilingual();
        let worker = en().key();

        arbitration.update_language_state(&worker, false, &en());
        arbitration.update_language_state(&worker, false, &en());
        let resolution = arbitration.update_language_state(&worker, true, &en());
        assert_eq!(resolution.directive, LockDirective::Unlock);
        assert_eq!(arbitration.locked(), None);

        // The next update starts from an empty map.
        let next = arbitration.update_language_state(&worker, false, &ko());
        let snapshot = next.snapshot.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(&ko().key()), Some(&1));
    }

    #[test]
    fn dominant_follows_the_highest_count() {
        let mut arbitration = bilingual();
        let worker = en().key();

        arbitration.update_language_state(&worker, false, &ko());
        arbitration.update_language_state(&worker, false, &en());
        let resolution = arbitration.update_language_state(&worker, false, &en());
        assert_eq!(resolution.resolved_locale, en());

        let snapshot = resolution.snapshot.unwrap();
        assert_eq!(snapshot.get(&en().key()), Some(&2));
        assert_eq!(snapshot.get(&ko().key()), Some(&1));
    }

    #[test]
    fn equal_counts_resolve_to_smaller_identifier() {
        let mut arbitration = bilingual();
        let worker = en().key();

        arbitration.update_language_state(&worker, false, &ko());
        let resolution = arbitration.update_language_state(&worker, false, &en());
        // en_US < ko_KR lexicographically.
        assert_eq!(resolution.resolved_locale, en());
    }

    #[test]
    fn workers_track_statistics_independently() {
        let mut arbitration = bilingual();

        arbitration.update_language_state(&en().key(), false, &en());
        let resolution = arbitration.update_language_state(&ko().key(), false, &ko());
        let snapshot = resolution.snapshot.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(&ko().key()), Some(&1));
    }

    #[test]
    fn lock_restricts_the_enabled_set_to_one_language() {
        let mut arbitration = bilingual();
        arbitration.update_language_state(&en().key(), false, &en());

        assert!(arbitration.is_enabled(&en().key()));
        assert!(!arbitration.is_enabled(&ko().key()));
        assert_eq!(arbitration.enabled_locales(), vec![en()]);
    }

    #[test]
    fn disabling_the_locked_language_restores_the_full_set() {
        let mut arbitration = bilingual();
        arbitration.update_language_state(&en().key(), false, &en());

        arbitration.disable(&en());
        assert_eq!(arbitration.locked(), None);
        assert_eq!(arbitration.enabled_locales(), vec![en(), ko()]);
    }

    #[test]
    fn enabling_the_locked_language_keeps_the_restriction() {
        let mut arbitration = bilingual();
        arbitration.update_language_state(&en().key(), false, &en());

        arbitration.enable(&en());
        assert_eq!(arbitration.locked(), Some(&en().key()));
        assert_eq!(arbitration.enabled_locales(), vec![en()]);
    }

    #[test]
    fn disabling_an_unlocked_language_only_removes_it() {
        let mut arbitration = bilingual();
        arbitration.disable(&ko());
        assert_eq!(arbitration.enabled_locales(), vec![en()]);
        assert!(!arbitration.is_enabled(&ko().key()));

        arbitration.enable(&ko());
        assert_eq!(arbitration.enabled_locales(), vec![en(), ko()]);
    }

    #[test]
    fn set_enabled_round_trips_without_a_lock() {
        let mut arbitration = bilingual();

        arbitration.set_enabled(&[en()]);
        assert_eq!(arbitration.enabled_locales(), vec![en()]);

        arbitration.set_enabled(&[en(), ko()]);
        assert_eq!(arbitration.enabled_locales(), vec![en(), ko()]);
    }

    #[test]
    fn set_enabled_omitting_the_locked_language_clears_the_lock() {
        let mut arbitration = bilingual();
        arbitration.update_language_state(&en().key(), false, &en());

        arbitration.set_enabled(&[ko()]);
        assert_eq!(arbitration.locked(), None);
        assert_eq!(arbitration.enabled_locales(), vec![en(), ko()]);
    }

    #[test]
    fn unknown_languages_are_ignored() {
        let mut arbitration = bilingual();
        arbitration.enable(&Language::new("fr"));
        arbitration.set_enabled(&[en(), Language::new("fr")]);
        assert_eq!(arbitration.enabled_locales(), vec![en()]);
    }
}
