use aural_catalog::{Arpeggiation, Interval, IntervalCatalog, Pitch, Scale};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ConfigurationError;

/// Monotonically increasing round counter.
pub type RoundVersion = u64;

/// One quiz item. Superseded by the next round, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub interval: Interval,
    pub arpeggiation: Arpeggiation,
    pub root: Pitch,
    /// `root` advanced by `interval.semitones` scale positions.
    pub second: Pitch,
    pub version: RoundVersion,
}

impl Round {
    /// Build a round from an explicit root, or `None` if the upper note falls off the scale.
    pub fn build(
        scale: &Scale,
        interval: Interval,
        arpeggiation: Arpeggiation,
        root: Pitch,
        version: RoundVersion,
    ) -> Option<Self> {
        let second = scale.step_up(root, interval.semitones)?;
        Some(Self {
            interval,
            arpeggiation,
            root,
            second,
            version,
        })
    }

    /// e.g. "Major 3rd (down)"
    pub fn test_name(&self) -> String {
        format!("{} ({})", self.interval.name, self.arpeggiation)
    }

    /// The two pitches in the order they should sound.
    pub fn playback_order(&self) -> [Pitch; 2] {
        if self.arpeggiation.is_descending() {
            [self.second, self.root]
        } else {
            [self.root, self.second]
        }
    }
}

/// Picks random rounds whose upper note always lies inside the scale.
pub struct QuizGenerator<R = StdRng> {
    scale: Scale,
    tests: Vec<(Interval, Arpeggiation)>,
    rng: R,
}

impl QuizGenerator<StdRng> {
    /// Generator over the full catalog and chromatic scale, seeded from the OS.
    pub fn standard() -> Result<Self, ConfigurationError> {
        Self::new(
            IntervalCatalog::new(),
            &Arpeggiation::ALL,
            Scale::chromatic(),
            StdRng::from_os_rng(),
        )
    }

    /// Generator with a reproducible random sequence.
    pub fn seeded(
        catalog: IntervalCatalog,
        arpeggiations: &[Arpeggiation],
        scale: Scale,
        seed: u64,
    ) -> Result<Self, ConfigurationError> {
        Self::new(catalog, arpeggiations, scale, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> QuizGenerator<R> {
    pub fn new(
        catalog: IntervalCatalog,
        arpeggiations: &[Arpeggiation],
        scale: Scale,
        rng: R,
    ) -> Result<Self, ConfigurationError> {
        for interval in catalog.iter() {
            if interval.semitones as usize >= scale.len() {
                return Err(ConfigurationError::IntervalTooWide {
                    code: interval.code.to_string(),
                    semitones: interval.semitones,
                    scale_len: scale.len(),
                });
            }
        }

        let mut directions: Vec<Arpeggiation> = Vec::new();
        for arpeggiation in arpeggiations {
            if !directions.contains(arpeggiation) {
                directions.push(*arpeggiation);
            }
        }
        if directions.is_empty() {
            return Err(ConfigurationError::NoArpeggiations);
        }

        let tests = catalog
            .iter()
            .flat_map(|interval| directions.iter().map(move |arp| (*interval, *arp)))
            .collect();

        Ok(Self { scale, tests, rng })
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    /// Number of distinct (interval, direction) pairs the generator draws from.
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Draw the next round, numbered `current_version + 1`.
    pub fn next_round(&mut self, current_version: RoundVersion) -> Round {
        let (interval, arpeggiation) = self.tests[self.rng.random_range(0..self.tests.len())];

        // Construction guarantees semitones < scale length, so the range is non-empty.
        let span = self.scale.len() - interval.semitones as usize;
        let root_index = self.rng.random_range(0..span);
        let pitches = self.scale.pitches();

        Round {
            interval,
            arpeggiation,
            root: pitches[root_index],
            second: pitches[root_index + interval.semitones as usize],
            version: current_version + 1,
        }
    }
}
