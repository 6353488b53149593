use serde::Serialize;

/// What started a backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupTrigger {
    Manual,
    Scheduled,
}

impl BackupTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupTrigger::Manual => "manual",
            BackupTrigger::Scheduled => "scheduled",
        }
    }
}

impl std::fmt::Display for BackupTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an export goes and what it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTarget {
    pub output_location: String,
    pub collections: Vec<String>,
}

/// An export request the platform accepted. The export itself may still be running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub output_location: String,
    pub trigger: BackupTrigger,
    pub collections: Vec<String>,
    /// Long-running operation name reported by the export API.
    pub operation: Option<String>,
}
