use std::io::Read;

use crate::reader::EventReader;
use crate::types::*;
use crate::version::Feature;

/// One record read from the stream.
#[derive(Debug)]
pub(crate) enum Record {
    Event(BuildEvent),
    /// A record that was decoded only far enough to reach the next tag.
    Skipped(RecordKind),
    /// An embedded blob of the given length.
    Blob(u64),
    EndOfFile,
}

impl<R: Read> EventReader<R> {
    /// Read the next record, materializing it if its kind is in `interest`.
    pub(crate) fn read_record(&mut self, interest: KindSet) -> Result<Record, ParseError> {
        let tag = self.read_int32()?;
        let kind = RecordKind::from_tag(tag).ok_or(ParseError::UnrecognizedRecordKind(tag))?;

        match kind {
            RecordKind::EndOfFile => Ok(Record::EndOfFile),
            RecordKind::ProjectImportArchive => self.skip_blob().map(Record::Blob),
            kind if interest.contains(kind) => match self.read_event(kind)? {
                Some(event) => Ok(Record::Event(event)),
                None => Ok(Record::Skipped(kind)),
            },
            kind => {
                self.skip_record(kind)?;
                Ok(Record::Skipped(kind))
            }
        }
    }

    fn skip_blob(&mut self) -> Result<u64, ParseError> {
        let len = self.read_count("blob length")? as u64;
        self.skip_bytes(len)?;
        Ok(len)
    }

    /// Decode the body of a record into an event.
    ///
    /// Kinds without an event form are skipped and yield `None`.
    pub(crate) fn read_event(&mut self, kind: RecordKind) -> Result<Option<BuildEvent>, ParseError> {
        if !kind.is_materialized() {
            self.skip_record(kind)?;
            return Ok(None);
        }

        let fields = self.read_common_fields()?;

        let data = match kind {
            RecordKind::BuildStarted => EventData::BuildStarted(self.build_started()?),
            RecordKind::ProjectStarted => EventData::ProjectStarted(self.project_started()?),
            RecordKind::ProjectFinished => EventData::ProjectFinished(self.project_finished()?),
            RecordKind::ProjectEvaluationStarted => {
                EventData::ProjectEvaluationStarted(self.project_evaluation_started()?)
            }
            RecordKind::ProjectEvaluationFinished => {
                EventData::ProjectEvaluationFinished(self.project_evaluation_finished()?)
            }
            RecordKind::TargetStarted => EventData::TargetStarted(self.target_started()?),
            RecordKind::TargetFinished => EventData::TargetFinished(self.target_finished()?),
            RecordKind::TaskStarted => EventData::TaskStarted(self.task_started()?),
            RecordKind::TaskFinished => EventData::TaskFinished(self.task_finished()?),
            other => {
                return Err(ParseError::InvalidData(format!(
                    "{other:?} records have no event form"
                )))
            }
        };

        Ok(Some(BuildEvent { fields, data }))
    }

    /// Consume a record body without allocating any of its values.
    pub(crate) fn skip_record(&mut self, kind: RecordKind) -> Result<(), ParseError> {
        match kind {
            RecordKind::EndOfFile => Ok(()),
            RecordKind::ProjectImportArchive => self.skip_blob().map(drop),
            _ => {
                self.skip_common_fields()?;
                self.skip_record_body(kind)
            }
        }
    }

    /// Skip everything after the common fields.
    fn skip_record_body(&mut self, kind: RecordKind) -> Result<(), ParseError> {
        match kind {
            RecordKind::EndOfFile | RecordKind::ProjectImportArchive => Ok(()),

            // --- Lifecycle ---
            RecordKind::BuildStarted => self.skip_string_map(),
            RecordKind::BuildFinished => self.skip_bool(),
            RecordKind::ProjectStarted => {
                if self.read_bool()? {
                    self.skip_execution_context()?;
                }
                self.skip_optional_string()?;
                self.skip_varint32()?;
                self.skip_string()?;
                self.skip_optional_string()?;
                if self.version.supports(Feature::GlobalProperties) && self.read_bool()? {
                    self.skip_string_map()?;
                }
                self.skip_string_map()?;
                self.skip_items()
            }
            RecordKind::ProjectFinished => {
                self.skip_optional_string()?;
                self.skip_bool()
            }
            RecordKind::ProjectEvaluationStarted => self.skip_string(),
            RecordKind::ProjectEvaluationFinished => {
                self.skip_string()?;
                self.skip_profiler_result()
            }
            RecordKind::TargetStarted => {
                for _ in 0..4 {
                    self.skip_optional_string()?;
                }
                if self.version.supports(Feature::TargetBuildReason) {
                    self.skip_varint32()?;
                }
                Ok(())
            }
            RecordKind::TargetFinished => {
                self.skip_bool()?;
                for _ in 0..3 {
                    self.skip_optional_string()?;
                }
                self.skip_item_list()
            }
            RecordKind::TaskStarted => {
                for _ in 0..3 {
                    self.skip_optional_string()?;
                }
                Ok(())
            }
            RecordKind::TaskFinished => {
                self.skip_bool()?;
                for _ in 0..3 {
                    self.skip_optional_string()?;
                }
                Ok(())
            }

            // --- Diagnostics ---
            RecordKind::Error | RecordKind::Warning | RecordKind::CriticalBuildMessage => Ok(()),
            RecordKind::Message => self.skip_varint32(),
            RecordKind::TaskCommandLine => {
                self.skip_varint32()?;
                self.skip_optional_string()?;
                self.skip_optional_string()
            }

            // --- Imports and property tracking ---
            RecordKind::ProjectImported => {
                self.skip_varint32()?;
                if self.version.supports(Feature::ImportIgnored) {
                    self.skip_bool()?;
                }
                self.skip_optional_string()?;
                self.skip_optional_string()
            }
            RecordKind::TargetSkipped => {
                self.skip_varint32()?;
                for _ in 0..3 {
                    self.skip_optional_string()?;
                }
                self.skip_varint32()
            }
            RecordKind::PropertyReassignment => {
                self.skip_varint32()?;
                for _ in 0..4 {
                    self.skip_optional_string()?;
                }
                Ok(())
            }
            RecordKind::UninitializedPropertyRead | RecordKind::EnvironmentVariableRead => {
                self.skip_varint32()?;
                self.skip_optional_string()
            }
            RecordKind::PropertyInitialValueSet => {
                self.skip_varint32()?;
                for _ in 0..3 {
                    self.skip_optional_string()?;
                }
                Ok(())
            }
        }
    }

    // --- Materialized records ---

    fn build_started(&mut self) -> Result<BuildStarted, ParseError> {
        Ok(BuildStarted {
            environment: self.read_string_map()?,
        })
    }

    fn project_started(&mut self) -> Result<ProjectStarted, ParseError> {
        let parent_context = if self.read_bool()? {
            Some(self.read_execution_context()?)
        } else {
            None
        };

        let project_file = self.read_optional_string()?;
        let project_id = self.read_int32()?;
        let target_names = self.read_string()?;
        let tools_version = self.read_optional_string()?;

        let global_properties =
            if self.version.supports(Feature::GlobalProperties) && self.read_bool()? {
                self.read_string_map()?
            } else {
                None
            };

        let properties = self.read_string_map()?;
        let items = self.read_items()?;

        Ok(ProjectStarted {
            parent_context,
            project_file,
            project_id,
            target_names,
            tools_version,
            global_properties,
            properties,
            items,
        })
    }

    fn project_finished(&mut self) -> Result<ProjectFinished, ParseError> {
        Ok(ProjectFinished {
            project_file: self.read_optional_string()?,
            succeeded: self.read_bool()?,
        })
    }

    fn project_evaluation_started(&mut self) -> Result<ProjectEvaluationStarted, ParseError> {
        Ok(ProjectEvaluationStarted {
            project_file: self.read_string()?,
        })
    }

    fn project_evaluation_finished(&mut self) -> Result<ProjectEvaluationFinished, ParseError> {
        let project_file = self.read_string()?;
        let profiler_result = self.read_profiler_result()?;
        Ok(ProjectEvaluationFinished {
            project_file,
            profiler_result,
        })
    }

    fn target_started(&mut self) -> Result<TargetStarted, ParseError> {
        let target_name = self.read_optional_string()?;
        let project_file = self.read_optional_string()?;
        let target_file = self.read_optional_string()?;
        let parent_target = self.read_optional_string()?;
        let build_reason = if self.version.supports(Feature::TargetBuildReason) {
            TargetBuiltReason::from_i32(self.read_int32()?)
        } else {
            TargetBuiltReason::None
        };

        Ok(TargetStarted {
            target_name,
            project_file,
            target_file,
            parent_target,
            build_reason,
        })
    }

    fn target_finished(&mut self) -> Result<TargetFinished, ParseError> {
        Ok(TargetFinished {
            succeeded: self.read_bool()?,
            project_file: self.read_optional_string()?,
            target_file: self.read_optional_string()?,
            target_name: self.read_optional_string()?,
            target_outputs: self.read_item_list()?,
        })
    }

    fn task_started(&mut self) -> Result<TaskStarted, ParseError> {
        Ok(TaskStarted {
            task_name: self.read_optional_string()?,
            project_file: self.read_optional_string()?,
            task_file: self.read_optional_string()?,
        })
    }

    fn task_finished(&mut self) -> Result<TaskFinished, ParseError> {
        Ok(TaskFinished {
            succeeded: self.read_bool()?,
            task_name: self.read_optional_string()?,
            project_file: self.read_optional_string()?,
            task_file: self.read_optional_string()?,
        })
    }
}
