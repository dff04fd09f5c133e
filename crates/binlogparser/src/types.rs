use std::collections::HashMap;

// === Error types ===

/// Errors that can occur while decoding a binary build log.
///
/// Every variant is fatal for the session that produced it: the format has no
/// resynchronization markers, so nothing after the failure point can be trusted.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported format version {version} (highest supported is {max})")]
    UnsupportedVersion { version: i32, max: i32 },

    #[error("malformed 7-bit encoded integer (more than 5 bytes)")]
    MalformedVarint,

    #[error("unexpected end of stream")]
    TruncatedStream,

    #[error("unrecognized record kind: {0}")]
    UnrecognizedRecordKind(i32),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        // Both a short file and a short gzip member surface as UnexpectedEof.
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ParseError::TruncatedStream
        } else {
            ParseError::Io(e)
        }
    }
}

// === Record kinds ===

/// Tag values identifying the records of a binary log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordKind {
    EndOfFile = 0,
    BuildStarted = 1,
    BuildFinished = 2,
    ProjectStarted = 3,
    ProjectFinished = 4,
    TargetStarted = 5,
    TargetFinished = 6,
    TaskStarted = 7,
    TaskFinished = 8,
    Error = 9,
    Warning = 10,
    Message = 11,
    TaskCommandLine = 12,
    CriticalBuildMessage = 13,
    ProjectEvaluationStarted = 14,
    ProjectEvaluationFinished = 15,
    ProjectImported = 16,
    ProjectImportArchive = 17,
    TargetSkipped = 18,
    PropertyReassignment = 19,
    UninitializedPropertyRead = 20,
    EnvironmentVariableRead = 21,
    PropertyInitialValueSet = 22,
}

impl RecordKind {
    /// Every kind that can be decoded into a [`BuildEvent`].
    pub const MATERIALIZED: [RecordKind; 9] = [
        RecordKind::BuildStarted,
        RecordKind::ProjectStarted,
        RecordKind::ProjectFinished,
        RecordKind::ProjectEvaluationStarted,
        RecordKind::ProjectEvaluationFinished,
        RecordKind::TargetStarted,
        RecordKind::TargetFinished,
        RecordKind::TaskStarted,
        RecordKind::TaskFinished,
    ];

    pub fn from_tag(tag: i32) -> Option<Self> {
        let kind = match tag {
            0 => Self::EndOfFile,
            1 => Self::BuildStarted,
            2 => Self::BuildFinished,
            3 => Self::ProjectStarted,
            4 => Self::ProjectFinished,
            5 => Self::TargetStarted,
            6 => Self::TargetFinished,
            7 => Self::TaskStarted,
            8 => Self::TaskFinished,
            9 => Self::Error,
            10 => Self::Warning,
            11 => Self::Message,
            12 => Self::TaskCommandLine,
            13 => Self::CriticalBuildMessage,
            14 => Self::ProjectEvaluationStarted,
            15 => Self::ProjectEvaluationFinished,
            16 => Self::ProjectImported,
            17 => Self::ProjectImportArchive,
            18 => Self::TargetSkipped,
            19 => Self::PropertyReassignment,
            20 => Self::UninitializedPropertyRead,
            21 => Self::EnvironmentVariableRead,
            22 => Self::PropertyInitialValueSet,
            _ => return None,
        };
        Some(kind)
    }

    pub fn tag(self) -> i32 {
        self as i32
    }

    /// Whether records of this kind have an event form.
    pub fn is_materialized(self) -> bool {
        Self::MATERIALIZED.contains(&self)
    }
}

/// A set of materialized record kinds, used to select which events a reader yields.
///
/// Kinds without an event form are never members; they are always skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSet(u32);

impl KindSet {
    pub const fn empty() -> Self {
        KindSet(0)
    }

    pub fn all() -> Self {
        Self::from_kinds(&RecordKind::MATERIALIZED)
    }

    pub fn from_kinds(kinds: &[RecordKind]) -> Self {
        let mut set = Self::empty();
        for &kind in kinds {
            set.insert(kind);
        }
        set
    }

    pub fn insert(&mut self, kind: RecordKind) {
        if kind.is_materialized() {
            self.0 |= 1 << kind.tag();
        }
    }

    pub fn contains(&self, kind: RecordKind) -> bool {
        self.0 & (1 << kind.tag()) != 0
    }
}

impl Default for KindSet {
    fn default() -> Self {
        Self::all()
    }
}

// === Basic types ===

/// Number of 100ns ticks between 0001-01-01 and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateTimeKind {
    #[default]
    Unspecified,
    Utc,
    Local,
}

impl DateTimeKind {
    pub(crate) fn from_i32(v: i32) -> Self {
        match v {
            1 => Self::Utc,
            2 => Self::Local,
            _ => Self::Unspecified,
        }
    }
}

/// A point in time as 100ns ticks since 0001-01-01T00:00:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DateTime {
    pub ticks: i64,
    pub kind: DateTimeKind,
}

impl DateTime {
    /// Nanoseconds since the Unix epoch.
    pub fn unix_nanos(&self) -> i64 {
        self.ticks
            .saturating_sub(UNIX_EPOCH_TICKS)
            .saturating_mul(100)
    }
}

/// A duration as a signed count of 100ns ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimeSpan {
    pub ticks: i64,
}

impl TimeSpan {
    pub fn nanos(&self) -> i64 {
        self.ticks.saturating_mul(100)
    }
}

// === Execution context ===

/// Identifies where in the build an event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionContext {
    pub node_id: i32,
    pub project_context_id: i32,
    pub target_id: i32,
    pub task_id: i32,
    pub submission_id: i32,
    pub project_instance_id: i32,
    /// [`ExecutionContext::INVALID_ID`] for logs older than format version 2.
    pub evaluation_id: i32,
}

impl ExecutionContext {
    pub const INVALID_ID: i32 = -1;
}

// === Common fields ===

/// The optional fields shared by every record, present as declared by the record's bitmask.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommonFields {
    pub message: Option<String>,
    pub context: Option<ExecutionContext>,
    pub thread_id: Option<i32>,
    pub help_keyword: Option<String>,
    pub sender_name: Option<String>,
    pub timestamp: Option<DateTime>,
    pub subcategory: Option<String>,
    pub code: Option<String>,
    pub file: Option<String>,
    pub project_file: Option<String>,
    pub line_number: Option<i32>,
    pub column_number: Option<i32>,
    pub end_line_number: Option<i32>,
    pub end_column_number: Option<i32>,
}

// === Items ===

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskItem {
    pub item_spec: String,
    pub metadata: HashMap<String, String>,
}

/// An item together with its item type, as listed on a project start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectItem {
    pub item_type: String,
    pub item: TaskItem,
}

// === Evaluation profiling ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationLocationKind {
    Element,
    Condition,
    Glob,
    Unknown(i32),
}

impl EvaluationLocationKind {
    pub(crate) fn from_i32(v: i32) -> Self {
        match v {
            0 => Self::Element,
            1 => Self::Condition,
            2 => Self::Glob,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationPass {
    TotalEvaluation,
    TotalGlobbing,
    InitialProperties,
    Properties,
    ItemDefinitionGroups,
    Items,
    LazyItems,
    UsingTasks,
    Targets,
    Unknown(i32),
}

impl EvaluationPass {
    pub(crate) fn from_i32(v: i32) -> Self {
        match v {
            0 => Self::TotalEvaluation,
            1 => Self::TotalGlobbing,
            2 => Self::InitialProperties,
            3 => Self::Properties,
            4 => Self::ItemDefinitionGroups,
            5 => Self::Items,
            6 => Self::LazyItems,
            7 => Self::UsingTasks,
            8 => Self::Targets,
            other => Self::Unknown(other),
        }
    }
}

/// A location in project evaluation that profiling data is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EvaluationLocation {
    /// Zero for logs older than format version 6.
    pub id: i64,
    pub parent_id: Option<i64>,
    pub evaluation_pass: EvaluationPass,
    pub evaluation_description: Option<String>,
    pub file: Option<String>,
    pub line: Option<i32>,
    pub element_name: Option<String>,
    pub description: Option<String>,
    pub kind: EvaluationLocationKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfiledLocation {
    pub number_of_hits: i32,
    pub exclusive_time: TimeSpan,
    pub inclusive_time: TimeSpan,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfilerResult {
    pub locations: HashMap<EvaluationLocation, ProfiledLocation>,
}

// === Events ===

/// A decoded build event.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildEvent {
    pub fields: CommonFields,
    pub data: EventData,
}

impl BuildEvent {
    /// The execution context, if the record carried one.
    pub fn context(&self) -> Option<&ExecutionContext> {
        self.fields.context.as_ref()
    }

    pub fn kind(&self) -> RecordKind {
        match &self.data {
            EventData::BuildStarted(_) => RecordKind::BuildStarted,
            EventData::ProjectStarted(_) => RecordKind::ProjectStarted,
            EventData::ProjectFinished(_) => RecordKind::ProjectFinished,
            EventData::ProjectEvaluationStarted(_) => RecordKind::ProjectEvaluationStarted,
            EventData::ProjectEvaluationFinished(_) => RecordKind::ProjectEvaluationFinished,
            EventData::TargetStarted(_) => RecordKind::TargetStarted,
            EventData::TargetFinished(_) => RecordKind::TargetFinished,
            EventData::TaskStarted(_) => RecordKind::TaskStarted,
            EventData::TaskFinished(_) => RecordKind::TaskFinished,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.data {
            EventData::BuildStarted(_) => "BuildStarted",
            EventData::ProjectStarted(_) => "ProjectStarted",
            EventData::ProjectFinished(_) => "ProjectFinished",
            EventData::ProjectEvaluationStarted(_) => "ProjectEvaluationStarted",
            EventData::ProjectEvaluationFinished(_) => "ProjectEvaluationFinished",
            EventData::TargetStarted(_) => "TargetStarted",
            EventData::TargetFinished(_) => "TargetFinished",
            EventData::TaskStarted(_) => "TaskStarted",
            EventData::TaskFinished(_) => "TaskFinished",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    BuildStarted(BuildStarted),
    ProjectStarted(ProjectStarted),
    ProjectFinished(ProjectFinished),
    ProjectEvaluationStarted(ProjectEvaluationStarted),
    ProjectEvaluationFinished(ProjectEvaluationFinished),
    TargetStarted(TargetStarted),
    TargetFinished(TargetFinished),
    TaskStarted(TaskStarted),
    TaskFinished(TaskFinished),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildStarted {
    pub environment: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectStarted {
    pub parent_context: Option<ExecutionContext>,
    pub project_file: Option<String>,
    pub project_id: i32,
    pub target_names: String,
    pub tools_version: Option<String>,
    /// Always `None` below format version 7.
    pub global_properties: Option<HashMap<String, String>>,
    pub properties: Option<HashMap<String, String>>,
    pub items: Option<Vec<ProjectItem>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectFinished {
    pub project_file: Option<String>,
    pub succeeded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectEvaluationStarted {
    pub project_file: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectEvaluationFinished {
    pub project_file: String,
    pub profiler_result: Option<ProfilerResult>,
}

/// Why a target was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetBuiltReason {
    #[default]
    None,
    BeforeTargets,
    DependsOn,
    AfterTargets,
    Unknown(i32),
}

impl TargetBuiltReason {
    pub(crate) fn from_i32(v: i32) -> Self {
        match v {
            0 => Self::None,
            1 => Self::BeforeTargets,
            2 => Self::DependsOn,
            3 => Self::AfterTargets,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetStarted {
    pub target_name: Option<String>,
    pub project_file: Option<String>,
    pub target_file: Option<String>,
    pub parent_target: Option<String>,
    pub build_reason: TargetBuiltReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetFinished {
    pub succeeded: bool,
    pub project_file: Option<String>,
    pub target_file: Option<String>,
    pub target_name: Option<String>,
    pub target_outputs: Option<Vec<TaskItem>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskStarted {
    pub task_name: Option<String>,
    pub project_file: Option<String>,
    pub task_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskFinished {
    pub succeeded: bool,
    pub task_name: Option<String>,
    pub project_file: Option<String>,
    pub task_file: Option<String>,
}
