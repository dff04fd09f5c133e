//! Format versions and the fields each version adds.
//!
//! Every version-dependent decision in the decoder goes through
//! [`FormatVersion::supports`]; supporting a new version means adding a row to
//! [`Feature::introduced_in`] and bumping [`MAX_SUPPORTED_VERSION`].

use crate::types::ParseError;

/// Highest format version this decoder understands.
pub const MAX_SUPPORTED_VERSION: i32 = 9;

/// Version-gated wire fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Evaluation id as the seventh execution-context integer.
    EvaluationId,
    /// "Import ignored" flag on project-imported records.
    ImportIgnored,
    /// Build reason on target-started records.
    TargetBuildReason,
    /// Profiler result on evaluation-finished records.
    ProfilerResult,
    /// Id and parent id on evaluation locations.
    EvaluationLocationIds,
    /// Global properties on project-started records.
    GlobalProperties,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::EvaluationId,
        Feature::ImportIgnored,
        Feature::TargetBuildReason,
        Feature::ProfilerResult,
        Feature::EvaluationLocationIds,
        Feature::GlobalProperties,
    ];

    /// The first format version whose records carry this field.
    pub const fn introduced_in(self) -> i32 {
        match self {
            Feature::EvaluationId => 2,
            Feature::ImportIgnored => 3,
            Feature::TargetBuildReason => 4,
            Feature::ProfilerResult => 5,
            Feature::EvaluationLocationIds => 6,
            Feature::GlobalProperties => 7,
        }
    }
}

/// The format version declared in a log's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion(i32);

impl FormatVersion {
    pub fn new(version: i32) -> Result<Self, ParseError> {
        if !(0..=MAX_SUPPORTED_VERSION).contains(&version) {
            return Err(ParseError::UnsupportedVersion {
                version,
                max: MAX_SUPPORTED_VERSION,
            });
        }
        Ok(FormatVersion(version))
    }

    pub fn get(self) -> i32 {
        self.0
    }

    pub fn supports(self, feature: Feature) -> bool {
        self.0 >= feature.introduced_in()
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
