//! Static level table: what each level pays per tap, per hour, and how it looks.

/// Cosmetic variant shown for a level (which cat art the render sink paints).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatSkin {
    Kitten,
    Ginger,
    Tabby,
    Tuxedo,
    Shadow,
    Royal,
}

impl CatSkin {
    /// Stable identifier handed to the render sink.
    pub fn id(&self) -> &'static str {
        match self {
            CatSkin::Kitten => "cat-kitten",
            CatSkin::Ginger => "cat-ginger",
            CatSkin::Tabby => "cat-tabby",
            CatSkin::Tuxedo => "cat-tuxedo",
            CatSkin::Shadow => "cat-shadow",
            CatSkin::Royal => "cat-royal",
        }
    }
}

/// One row of the level table.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelEntry {
    pub name: &'static str,
    /// Score required to leave this level. `None` on the final level.
    pub score_threshold: Option<f64>,
    pub tap_value: f64,
    pub profit_per_hour: f64,
    pub energy_per_second: f64,
    pub skin: CatSkin,
}

impl LevelEntry {
    const fn row(
        name: &'static str,
        score_threshold: Option<f64>,
        tap_value: f64,
        profit_per_hour: f64,
        energy_per_second: f64,
        skin: CatSkin,
    ) -> Self {
        Self {
            name,
            score_threshold,
            tap_value,
            profit_per_hour,
            energy_per_second,
            skin,
        }
    }
}

const STANDARD: [LevelEntry; 10] = [
    LevelEntry::row("Kitten", Some(500.0), 1.0, 0.0, 1.0, CatSkin::Kitten),
    LevelEntry::row("Alley Cat", Some(2_000.0), 2.0, 360.0, 1.0, CatSkin::Kitten),
    LevelEntry::row("House Cat", Some(10_000.0), 3.0, 1_800.0, 2.0, CatSkin::Ginger),
    LevelEntry::row("Tabby", Some(50_000.0), 5.0, 7_200.0, 2.0, CatSkin::Ginger),
    LevelEntry::row("Street Boss", Some(200_000.0), 8.0, 36_000.0, 3.0, CatSkin::Tabby),
    LevelEntry::row("Tuxedo", Some(1_000_000.0), 12.0, 144_000.0, 3.0, CatSkin::Tabby),
    LevelEntry::row("Maine Coon", Some(5_000_000.0), 18.0, 720_000.0, 4.0, CatSkin::Tuxedo),
    LevelEntry::row("Panther", Some(25_000_000.0), 25.0, 3_600_000.0, 4.0, CatSkin::Shadow),
    LevelEntry::row("Lion", Some(100_000_000.0), 35.0, 14_400_000.0, 5.0, CatSkin::Shadow),
    LevelEntry::row("Cat God", None, 50.0, 72_000_000.0, 5.0, CatSkin::Royal),
];

/// Immutable lookup from level (1-based) to its entry.
#[derive(Clone, Debug)]
pub struct LevelTable {
    entries: Vec<LevelEntry>,
}

impl LevelTable {
    /// The shipped ten-level table.
    pub fn standard() -> Self {
        Self {
            entries: STANDARD.to_vec(),
        }
    }

    /// Build a custom table. Returns `None` for an empty table or one with
    /// negative or non-finite values (score must never run backwards).
    #[cfg(test)]
    pub fn new(entries: Vec<LevelEntry>) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        let sane = |v: f64| v.is_finite() && v >= 0.0;
        let valid = entries.iter().all(|e| {
            sane(e.tap_value)
                && sane(e.profit_per_hour)
                && sane(e.energy_per_second)
                && e.score_threshold.map_or(true, sane)
        });
        if !valid {
            return None;
        }
        Some(Self { entries })
    }

    /// Number of levels (N).
    pub fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn max_level(&self) -> u32 {
        self.len()
    }

    /// Clamp any level into `1..=N`.
    pub fn clamp_level(&self, level: u32) -> u32 {
        level.clamp(1, self.max_level())
    }

    /// Entry for `level`; out-of-range levels are clamped.
    pub fn entry(&self, level: u32) -> &LevelEntry {
        let idx = self.clamp_level(level) as usize - 1;
        &self.entries[idx]
    }

    /// Score needed to leave `level`, or `None` at the top.
    pub fn threshold(&self, level: u32) -> Option<f64> {
        if level >= self.max_level() {
            return None;
        }
        self.entry(level).score_threshold
    }
}
