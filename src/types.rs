//! Type definitions shared across the safety engine

use crate::error::ParseSqlModeError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Classified SQL operation of one statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Select,
    With,
    Insert,
    Update,
    Delete,
    CreateTable,
    CreateView,
    CreateIndex,
    Drop,
    Alter,
    Truncate,
    GrantRevoke,
    Copy,
    VacuumAnalyze,
    FunctionOrProcedure,
    /// Unrecognized leading keyword; forbidden in every mode
    Unknown,
}

impl OperationKind {
    pub const ALL: [OperationKind; 16] = [
        Self::Select,
        Self::With,
        Self::Insert,
        Self::Update,
        Self::Delete,
        Self::CreateTable,
        Self::CreateView,
        Self::CreateIndex,
        Self::Drop,
        Self::Alter,
        Self::Truncate,
        Self::GrantRevoke,
        Self::Copy,
        Self::VacuumAnalyze,
        Self::FunctionOrProcedure,
        Self::Unknown,
    ];

    /// Row-returning reads eligible for a row cap
    pub fn is_read(self) -> bool {
        matches!(self, Self::Select | Self::With)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Select => "SELECT",
            Self::With => "WITH",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::CreateTable => "CREATE TABLE",
            Self::CreateView => "CREATE VIEW",
            Self::CreateIndex => "CREATE INDEX",
            Self::Drop => "DROP",
            Self::Alter => "ALTER",
            Self::Truncate => "TRUNCATE",
            Self::GrantRevoke => "GRANT/REVOKE",
            Self::Copy => "COPY",
            Self::VacuumAnalyze => "VACUUM/ANALYZE",
            Self::FunctionOrProcedure => "FUNCTION/PROCEDURE",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

const READ_ONLY_KINDS: &[OperationKind] = &[OperationKind::Select, OperationKind::With];

const WRITE_NO_DELETE_KINDS: &[OperationKind] = &[
    OperationKind::Select,
    OperationKind::With,
    OperationKind::Insert,
    OperationKind::Update,
    OperationKind::CreateTable,
    OperationKind::CreateView,
    OperationKind::CreateIndex,
];

const WRITE_FULL_KINDS: &[OperationKind] = &[
    OperationKind::Select,
    OperationKind::With,
    OperationKind::Insert,
    OperationKind::Update,
    OperationKind::Delete,
    OperationKind::CreateTable,
    OperationKind::CreateView,
    OperationKind::CreateIndex,
];

/// Permission tier controlling which operation kinds may run
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SqlMode {
    #[default]
    ReadOnly,
    WriteNoDelete,
    WriteFull,
}

impl SqlMode {
    pub const ALL: [SqlMode; 3] = [Self::ReadOnly, Self::WriteNoDelete, Self::WriteFull];

    /// Fixed allow-set for this mode
    ///
    /// DROP, ALTER, TRUNCATE, GRANT/REVOKE, COPY, VACUUM/ANALYZE, functions and
    /// procedures, and unknown statements appear in no mode.
    pub fn allowed_kinds(self) -> &'static [OperationKind] {
        match self {
            Self::ReadOnly => READ_ONLY_KINDS,
            Self::WriteNoDelete => WRITE_NO_DELETE_KINDS,
            Self::WriteFull => WRITE_FULL_KINDS,
        }
    }

    /// # Examples
    /// ```
    /// # use nl2sql_safety::types::{OperationKind, SqlMode};
    /// assert!(SqlMode::WriteFull.allows(OperationKind::Delete));
    /// assert!(!SqlMode::WriteNoDelete.allows(OperationKind::Delete));
    /// assert!(!SqlMode::WriteFull.allows(OperationKind::Drop));
    /// ```
    pub fn allows(self, kind: OperationKind) -> bool {
        self.allowed_kinds().contains(&kind)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::WriteNoDelete => "write_no_delete",
            Self::WriteFull => "write_full",
        }
    }
}

impl std::fmt::Display for SqlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SqlMode {
    type Err = ParseSqlModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "read_only" | "readonly" => Ok(Self::ReadOnly),
            "write_no_delete" => Ok(Self::WriteNoDelete),
            "write_full" => Ok(Self::WriteFull),
            _ => Err(ParseSqlModeError(s.to_string())),
        }
    }
}

/// Non-fatal finding attached to an accepted validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanWarning {
    /// A quote, comment or dollar block was still open at end of input, so
    /// the statement boundaries after it may not be what the author meant
    UnterminatedConstruct {
        /// 1-based statement index
        statement_index: usize,
        construct: String,
    },
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnterminatedConstruct {
                statement_index,
                construct,
            } => write!(
                f,
                "Statement #{} has an unterminated {}; statement boundaries may be unreliable",
                statement_index, construct
            ),
        }
    }
}

/// Accepted statement, ready to hand to the executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PreparedStatement {
    /// 1-based position in the batch
    pub index: usize,

    /// Classified operation
    pub kind: OperationKind,

    /// Statement text, trimmed, row cap applied for reads
    pub sql: String,

    /// Whether the statement writes, including data-modifying CTEs
    pub modifies_data: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_allow_sets_are_nested() {
        for kind in OperationKind::ALL {
            if SqlMode::ReadOnly.allows(kind) {
                assert!(SqlMode::WriteNoDelete.allows(kind), "{} lost in write_no_delete", kind);
            }
            if SqlMode::WriteNoDelete.allows(kind) {
                assert!(SqlMode::WriteFull.allows(kind), "{} lost in write_full", kind);
            }
        }
        assert!(!SqlMode::WriteNoDelete.allows(OperationKind::Delete));
        assert!(SqlMode::WriteFull.allows(OperationKind::Delete));
    }

    #[test]
    fn test_never_allowed_kinds() {
        let forbidden = [
            OperationKind::Drop,
            OperationKind::Alter,
            OperationKind::Truncate,
            OperationKind::GrantRevoke,
            OperationKind::Copy,
            OperationKind::VacuumAnalyze,
            OperationKind::FunctionOrProcedure,
            OperationKind::Unknown,
        ];
        for mode in SqlMode::ALL {
            for kind in forbidden {
                assert!(!mode.allows(kind), "{} allowed in {}", kind, mode);
            }
        }
    }

    #[test]
    fn test_mode_parse_and_display() {
        for mode in SqlMode::ALL {
            assert_eq!(mode.to_string().parse::<SqlMode>(), Ok(mode));
        }
        assert_eq!("Write-Full".parse::<SqlMode>(), Ok(SqlMode::WriteFull));
        assert!("admin".parse::<SqlMode>().is_err());
    }

    #[test]
    fn test_mode_serializes_snake_case() {
        let json = serde_json::to_string(&SqlMode::WriteNoDelete);
        assert!(json.is_ok());
        if let Ok(json) = json {
            assert_eq!(json, "\"write_no_delete\"");
        }
    }

    #[test]
    fn test_warning_serializes_with_tag() {
        let warning = ScanWarning::UnterminatedConstruct {
            statement_index: 2,
            construct: "string literal".to_string(),
        };
        let value = serde_json::to_value(&warning);
        assert!(value.is_ok());
        if let Ok(value) = value {
            assert_eq!(value["kind"], "unterminated_construct");
            assert_eq!(value["statement_index"], 2);
        }
    }
}
