#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

/// Stage of the online migration from the legacy integer transaction columns
/// to the new transaction-id columns.
///
/// `LegacyOnly -> WriteBothReadLegacy -> WriteBothReadNew -> NewOnly`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MigrationPhase {
    LegacyOnly,
    WriteBothReadLegacy,
    WriteBothReadNew,
    #[default]
    NewOnly,
}

impl MigrationPhase {
    pub const ALL: [Self; 4] = [
        Self::LegacyOnly,
        Self::WriteBothReadLegacy,
        Self::WriteBothReadNew,
        Self::NewOnly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LegacyOnly => "legacy-only",
            Self::WriteBothReadLegacy => "write-both-read-legacy",
            Self::WriteBothReadNew => "write-both-read-new",
            Self::NewOnly => "new-only",
        }
    }

    pub fn writes_legacy(self) -> bool {
        !matches!(self, Self::NewOnly)
    }

    pub fn writes_new(self) -> bool {
        !matches!(self, Self::LegacyOnly)
    }

    pub fn reads_new(self) -> bool {
        matches!(self, Self::WriteBothReadNew | Self::NewOnly)
    }
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown migration phase `{0}`")]
pub struct PhaseParseError(pub String);

impl FromStr for MigrationPhase {
    type Err = PhaseParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == value)
            .ok_or_else(|| PhaseParseError(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_phase_writes_the_column_it_reads() {
        for phase in MigrationPhase::ALL {
            if phase.reads_new() {
                assert!(phase.writes_new(), "{phase} reads new but does not write it");
            } else {
                assert!(phase.writes_legacy(), "{phase} reads legacy but does not write it");
            }
        }
    }

    #[test]
    fn dual_write_phases_write_both_columns() {
        assert!(MigrationPhase::WriteBothReadLegacy.writes_legacy());
        assert!(MigrationPhase::WriteBothReadLegacy.writes_new());
        assert!(!MigrationPhase::WriteBothReadLegacy.reads_new());
        assert!(MigrationPhase::WriteBothReadNew.writes_legacy());
        assert!(MigrationPhase::WriteBothReadNew.writes_new());
        assert!(MigrationPhase::WriteBothReadNew.reads_new());
        assert!(!MigrationPhase::LegacyOnly.writes_new());
        assert!(!MigrationPhase::NewOnly.writes_legacy());
    }

    #[test]
    fn phase_names_round_trip() {
        for phase in MigrationPhase::ALL {
            assert_eq!(phase.as_str().parse::<MigrationPhase>(), Ok(phase));
        }
        assert_eq!(
            "write-both".parse::<MigrationPhase>(),
            Err(PhaseParseError("write-both".to_string()))
        );
    }
}
