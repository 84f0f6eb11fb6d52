use std::collections::HashSet;

use crate::CatalogError;

/// A single playable tone.
///
/// Names follow the sample file convention used by the trainer's sound assets:
/// lowercase letter, `b` for flats, `s` for sharps, then the octave (`c2`, `db2`, `fs3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    name: &'static str,
    midi: u8,
}

impl Pitch {
    pub const fn new(name: &'static str, midi: u8) -> Self {
        Self { name, midi }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// MIDI note number (C4 = 60).
    pub fn midi(&self) -> u8 {
        self.midi
    }

    /// Equal-tempered frequency in Hz (A4 = 440 Hz).
    pub fn frequency(&self) -> f32 {
        440.0 * 2.0_f32.powf((self.midi as f32 - 69.0) / 12.0)
    }
}

impl std::fmt::Display for Pitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// C2 through B4, one entry per semitone.
const CHROMATIC: [Pitch; 36] = [
    Pitch::new("c2", 36),
    Pitch::new("db2", 37),
    Pitch::new("d2", 38),
    Pitch::new("eb2", 39),
    Pitch::new("e2", 40),
    Pitch::new("f2", 41),
    Pitch::new("fs2", 42),
    Pitch::new("g2", 43),
    Pitch::new("ab2", 44),
    Pitch::new("a2", 45),
    Pitch::new("bb2", 46),
    Pitch::new("b2", 47),
    Pitch::new("c3", 48),
    Pitch::new("db3", 49),
    Pitch::new("d3", 50),
    Pitch::new("eb3", 51),
    Pitch::new("e3", 52),
    Pitch::new("f3", 53),
    Pitch::new("fs3", 54),
    Pitch::new("g3", 55),
    Pitch::new("ab3", 56),
    Pitch::new("a3", 57),
    Pitch::new("bb3", 58),
    Pitch::new("b3", 59),
    Pitch::new("c4", 60),
    Pitch::new("db4", 61),
    Pitch::new("d4", 62),
    Pitch::new("eb4", 63),
    Pitch::new("e4", 64),
    Pitch::new("f4", 65),
    Pitch::new("fs4", 66),
    Pitch::new("g4", 67),
    Pitch::new("ab4", 68),
    Pitch::new("a4", 69),
    Pitch::new("bb4", 70),
    Pitch::new("b4", 71),
];

/// Ordered sequence of pitches with no duplicates.
///
/// Interval arithmetic is done on scale positions: the pitch `n` semitones above
/// the one at index `i` is the one at index `i + n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    pitches: Vec<Pitch>,
}

impl Scale {
    /// The three-octave chromatic scale the trainer ships with.
    pub fn chromatic() -> Self {
        Self {
            pitches: CHROMATIC.to_vec(),
        }
    }

    pub fn from_pitches(pitches: Vec<Pitch>) -> Result<Self, CatalogError> {
        if pitches.is_empty() {
            return Err(CatalogError::EmptyScale);
        }

        let mut seen = HashSet::new();
        for pitch in &pitches {
            if !seen.insert(pitch.name) {
                return Err(CatalogError::DuplicatePitch(pitch.name.to_string()));
            }
        }

        Ok(Self { pitches })
    }

    pub fn len(&self) -> usize {
        self.pitches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Pitch> {
        self.pitches.get(index).copied()
    }

    pub fn pitches(&self) -> &[Pitch] {
        &self.pitches
    }

    /// Look up a pitch by name.
    pub fn find(&self, name: &str) -> Option<Pitch> {
        self.pitches.iter().find(|p| p.name == name).copied()
    }

    pub fn index_of(&self, pitch: Pitch) -> Option<usize> {
        self.pitches.iter().position(|p| *p == pitch)
    }

    /// The pitch `semitones` scale steps above `pitch`, if still inside the scale.
    pub fn step_up(&self, pitch: Pitch, semitones: u8) -> Option<Pitch> {
        let index = self.index_of(pitch)?;
        self.get(index + semitones as usize)
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::chromatic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chromatic_scale_bounds() {
        let scale = Scale::chromatic();
        assert_eq!(scale.len(), 36);
        assert_eq!(scale.get(0).map(|p| p.name()), Some("c2"));
        assert_eq!(scale.get(35).map(|p| p.name()), Some("b4"));
        assert_eq!(scale.get(36), None);
    }

    #[test]
    fn test_chromatic_scale_is_contiguous() {
        let scale = Scale::chromatic();
        for pair in scale.pitches().windows(2) {
            assert_eq!(pair[1].midi(), pair[0].midi() + 1);
        }
    }

    #[test]
    fn test_step_up() {
        let scale = Scale::chromatic();
        let c2 = scale.find("c2").unwrap();

        assert_eq!(scale.step_up(c2, 4).map(|p| p.name()), Some("e2"));
        assert_eq!(scale.step_up(c2, 12).map(|p| p.name()), Some("c3"));

        let b4 = scale.find("b4").unwrap();
        assert_eq!(scale.step_up(b4, 1), None);
    }

    #[test]
    fn test_frequency() {
        let scale = Scale::chromatic();
        let a4 = scale.find("a4").unwrap();
        assert!((a4.frequency() - 440.0).abs() < 0.01);

        let a3 = scale.find("a3").unwrap();
        assert!((a3.frequency() - 220.0).abs() < 0.01);
    }

    #[test]
    fn test_from_pitches_rejects_duplicates() {
        let result = Scale::from_pitches(vec![Pitch::new("c2", 36), Pitch::new("c2", 36)]);
        assert_eq!(result, Err(CatalogError::DuplicatePitch("c2".to_string())));
    }

    #[test]
    fn test_from_pitches_rejects_empty() {
        assert_eq!(Scale::from_pitches(vec![]), Err(CatalogError::EmptyScale));
    }
}
