//! Immutable lookup tables feeding the value and difficulty models.
//!
//! The tables are plain `'static` data. Callers receive a `&ScoringTables`
//! so tests can substitute their own.

/// Multiplier table keyed by an integer catalog code.
#[derive(Debug, Clone, Copy)]
pub struct CodeTable {
    entries: &'static [(i32, f64)],
}

impl CodeTable {
    pub const fn new(entries: &'static [(i32, f64)]) -> Self {
        Self { entries }
    }

    /// Factor for `code`; unknown or missing codes map to 1.0.
    pub fn factor(&self, code: Option<i32>) -> f64 {
        code.and_then(|c| {
            self.entries
                .iter()
                .find(|(key, _)| *key == c)
                .map(|(_, factor)| *factor)
        })
        .unwrap_or(1.0)
    }
}

/// Per-object-type constants for Messier objects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessierTypeEntry {
    /// SIMBAD object type code.
    pub code: &'static str,
    pub value: f64,
    pub difficulty: f64,
    /// Diffuse objects use the extended-source magnitude policy.
    pub extended: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct MessierTypeTable {
    entries: &'static [MessierTypeEntry],
    fallback: MessierTypeEntry,
}

impl MessierTypeTable {
    pub const fn new(entries: &'static [MessierTypeEntry], fallback: MessierTypeEntry) -> Self {
        Self { entries, fallback }
    }

    pub fn lookup(&self, object_type: &str) -> &MessierTypeEntry {
        let object_type = object_type.trim();
        self.entries
            .iter()
            .find(|entry| entry.code.eq_ignore_ascii_case(object_type))
            .unwrap_or(&self.fallback)
    }
}

/// All tables used by one scoring run.
#[derive(Debug, Clone, Copy)]
pub struct ScoringTables {
    /// astorb orbit classification (Aten, Apollo, Amor, Mars-crosser, ...).
    pub orbit_codes: CodeTable,
    /// astorb critical-list code.
    pub critical_codes: CodeTable,
    /// astorb astrometry-needed priority.
    pub astrometry_codes: CodeTable,
    /// Divides the product of the three asteroid factors.
    pub asteroid_divisor: f64,
    pub messier_types: MessierTypeTable,
}

impl ScoringTables {
    pub fn standard() -> &'static ScoringTables {
        &STANDARD_TABLES
    }
}

const ORBIT_CODE_FACTORS: &[(i32, f64)] = &[
    (1, 2.5),  // Aten
    (2, 2.5),  // Apollo
    (4, 2.0),  // Amor
    (8, 1.5),  // Mars crosser
    (16, 1.2), // outer-planet crosser
    (32, 1.5), // trans-Neptunian
];

const CRITICAL_CODE_FACTORS: &[(i32, f64)] = &[
    (1, 3.0), // lost
    (2, 2.5), // observed at two oppositions only
    (3, 2.0), // single opposition, long arc
    (4, 2.0), // Earth approaches
    (5, 1.5), // poorly determined
    (6, 1.5),
    (7, 1.2),
];

const ASTROMETRY_CODE_FACTORS: &[(i32, f64)] = &[
    (1, 1.1),
    (2, 1.2),
    (3, 1.3),
    (4, 1.4),
    (5, 1.5),
    (6, 1.7),
    (7, 1.9),
    (8, 2.1),
    (9, 2.4),
    (10, 3.0),
];

const MESSIER_TYPES: &[MessierTypeEntry] = &[
    MessierTypeEntry { code: "GlC", value: 3.0, difficulty: 1.0, extended: true },
    MessierTypeEntry { code: "OpC", value: 2.0, difficulty: 0.8, extended: true },
    MessierTypeEntry { code: "Cl*", value: 2.0, difficulty: 0.8, extended: true },
    MessierTypeEntry { code: "G", value: 4.0, difficulty: 1.5, extended: true },
    MessierTypeEntry { code: "Sy2", value: 4.0, difficulty: 1.5, extended: true },
    MessierTypeEntry { code: "LIN", value: 4.0, difficulty: 1.5, extended: true },
    MessierTypeEntry { code: "PN", value: 3.5, difficulty: 1.3, extended: true },
    MessierTypeEntry { code: "HII", value: 3.5, difficulty: 1.2, extended: true },
    MessierTypeEntry { code: "RNe", value: 3.5, difficulty: 1.4, extended: true },
    MessierTypeEntry { code: "SNR", value: 4.5, difficulty: 1.6, extended: true },
    MessierTypeEntry { code: "As*", value: 1.0, difficulty: 0.5, extended: false },
    MessierTypeEntry { code: "**", value: 1.0, difficulty: 0.5, extended: false },
];

const MESSIER_FALLBACK: MessierTypeEntry = MessierTypeEntry {
    code: "",
    value: 3.0,
    difficulty: 1.0,
    extended: true,
};

pub static STANDARD_TABLES: ScoringTables = ScoringTables {
    orbit_codes: CodeTable::new(ORBIT_CODE_FACTORS),
    critical_codes: CodeTable::new(CRITICAL_CODE_FACTORS),
    astrometry_codes: CodeTable::new(ASTROMETRY_CODE_FACTORS),
    asteroid_divisor: 2.0,
    messier_types: MessierTypeTable::new(MESSIER_TYPES, MESSIER_FALLBACK),
};
