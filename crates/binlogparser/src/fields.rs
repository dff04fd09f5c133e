//! Compound structures built from the primitive reads: the per-record field
//! bitmask, execution contexts, string maps, items and evaluation profiling data.

use std::collections::HashMap;
use std::io::Read;

use crate::reader::EventReader;
use crate::types::*;
use crate::version::Feature;

/// A field that a record may carry, as flagged in its leading bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Message,
    Context,
    ThreadId,
    HelpKeyword,
    SenderName,
    Timestamp,
    Subcategory,
    Code,
    File,
    ProjectFile,
    LineNumber,
    ColumnNumber,
    EndLineNumber,
    EndColumnNumber,
}

impl Field {
    /// The order in which flagged fields follow the bitmask on the wire.
    /// This is not the order of their bit values.
    const WIRE_ORDER: [Field; 14] = [
        Field::Message,
        Field::Context,
        Field::ThreadId,
        Field::HelpKeyword,
        Field::SenderName,
        Field::Timestamp,
        Field::Subcategory,
        Field::Code,
        Field::File,
        Field::ProjectFile,
        Field::LineNumber,
        Field::ColumnNumber,
        Field::EndLineNumber,
        Field::EndColumnNumber,
    ];

    const fn bit(self) -> u32 {
        match self {
            Field::Context => 1 << 0,
            Field::HelpKeyword => 1 << 1,
            Field::Message => 1 << 2,
            Field::SenderName => 1 << 3,
            Field::ThreadId => 1 << 4,
            Field::Timestamp => 1 << 5,
            Field::Subcategory => 1 << 6,
            Field::Code => 1 << 7,
            Field::File => 1 << 8,
            Field::ProjectFile => 1 << 9,
            Field::LineNumber => 1 << 10,
            Field::ColumnNumber => 1 << 11,
            Field::EndLineNumber => 1 << 12,
            Field::EndColumnNumber => 1 << 13,
        }
    }

    fn present_in(flags: u32) -> impl Iterator<Item = Field> {
        Self::WIRE_ORDER
            .into_iter()
            .filter(move |f| flags & f.bit() != 0)
    }
}

impl<R: Read> EventReader<R> {
    // --- Strings and maps ---

    /// Read a string preceded by a presence flag.
    pub fn read_optional_string(&mut self) -> Result<Option<String>, ParseError> {
        if self.read_bool()? {
            Ok(Some(self.read_string()?))
        } else {
            Ok(None)
        }
    }

    pub fn skip_optional_string(&mut self) -> Result<(), ParseError> {
        if self.read_bool()? {
            self.skip_string()?;
        }
        Ok(())
    }

    /// Read a counted string-to-string map. A zero count means "no map".
    pub fn read_string_map(&mut self) -> Result<Option<HashMap<String, String>>, ParseError> {
        let n = self.read_count("map count")?;
        if n == 0 {
            return Ok(None);
        }
        let mut map = HashMap::with_capacity(n.min(1024));
        for _ in 0..n {
            let key = self.read_string()?;
            let value = self.read_string()?;
            map.insert(key, value);
        }
        Ok(Some(map))
    }

    pub fn skip_string_map(&mut self) -> Result<(), ParseError> {
        let n = self.read_count("map count")?;
        for _ in 0..n {
            self.skip_string()?;
            self.skip_string()?;
        }
        Ok(())
    }

    // --- Items ---

    pub fn read_item(&mut self) -> Result<TaskItem, ParseError> {
        let item_spec = self.read_string()?;
        let n = self.read_count("metadata count")?;
        let mut metadata = HashMap::with_capacity(n.min(1024));
        for _ in 0..n {
            let name = self.read_string()?;
            let value = self.read_string()?;
            metadata.insert(name, value);
        }
        Ok(TaskItem {
            item_spec,
            metadata,
        })
    }

    pub fn skip_item(&mut self) -> Result<(), ParseError> {
        self.skip_string()?;
        let n = self.read_count("metadata count")?;
        for _ in 0..n {
            self.skip_string()?;
            self.skip_string()?;
        }
        Ok(())
    }

    /// Read items keyed by their item type.
    pub fn read_items(&mut self) -> Result<Option<Vec<ProjectItem>>, ParseError> {
        let n = self.read_count("item count")?;
        if n == 0 {
            return Ok(None);
        }
        let mut items = Vec::with_capacity(n.min(1024));
        for _ in 0..n {
            let item_type = self.read_string()?;
            let item = self.read_item()?;
            items.push(ProjectItem { item_type, item });
        }
        Ok(Some(items))
    }

    pub fn skip_items(&mut self) -> Result<(), ParseError> {
        let n = self.read_count("item count")?;
        for _ in 0..n {
            self.skip_string()?;
            self.skip_item()?;
        }
        Ok(())
    }

    pub fn read_item_list(&mut self) -> Result<Option<Vec<TaskItem>>, ParseError> {
        let n = self.read_count("item count")?;
        if n == 0 {
            return Ok(None);
        }
        let mut items = Vec::with_capacity(n.min(1024));
        for _ in 0..n {
            items.push(self.read_item()?);
        }
        Ok(Some(items))
    }

    pub fn skip_item_list(&mut self) -> Result<(), ParseError> {
        let n = self.read_count("item count")?;
        for _ in 0..n {
            self.skip_item()?;
        }
        Ok(())
    }

    // --- Execution context ---

    pub fn read_execution_context(&mut self) -> Result<ExecutionContext, ParseError> {
        let node_id = self.read_int32()?;
        let project_context_id = self.read_int32()?;
        let target_id = self.read_int32()?;
        let task_id = self.read_int32()?;
        let submission_id = self.read_int32()?;
        let project_instance_id = self.read_int32()?;
        let evaluation_id = if self.version.supports(Feature::EvaluationId) {
            self.read_int32()?
        } else {
            ExecutionContext::INVALID_ID
        };

        Ok(ExecutionContext {
            node_id,
            project_context_id,
            target_id,
            task_id,
            submission_id,
            project_instance_id,
            evaluation_id,
        })
    }

    pub fn skip_execution_context(&mut self) -> Result<(), ParseError> {
        let n = if self.version.supports(Feature::EvaluationId) {
            7
        } else {
            6
        };
        for _ in 0..n {
            self.skip_varint32()?;
        }
        Ok(())
    }

    // --- Common fields ---

    pub fn read_common_fields(&mut self) -> Result<CommonFields, ParseError> {
        let flags = self.read_varint32()?;
        let mut fields = CommonFields::default();

        for field in Field::present_in(flags) {
            match field {
                Field::Message => fields.message = Some(self.read_string()?),
                Field::Context => fields.context = Some(self.read_execution_context()?),
                Field::ThreadId => fields.thread_id = Some(self.read_int32()?),
                Field::HelpKeyword => fields.help_keyword = Some(self.read_string()?),
                Field::SenderName => fields.sender_name = Some(self.read_string()?),
                Field::Timestamp => fields.timestamp = Some(self.read_datetime()?),
                Field::Subcategory => fields.subcategory = Some(self.read_string()?),
                Field::Code => fields.code = Some(self.read_string()?),
                Field::File => fields.file = Some(self.read_string()?),
                Field::ProjectFile => fields.project_file = Some(self.read_string()?),
                Field::LineNumber => fields.line_number = Some(self.read_int32()?),
                Field::ColumnNumber => fields.column_number = Some(self.read_int32()?),
                Field::EndLineNumber => fields.end_line_number = Some(self.read_int32()?),
                Field::EndColumnNumber => fields.end_column_number = Some(self.read_int32()?),
            }
        }

        Ok(fields)
    }

    pub fn skip_common_fields(&mut self) -> Result<(), ParseError> {
        let flags = self.read_varint32()?;

        for field in Field::present_in(flags) {
            match field {
                Field::Message
                | Field::HelpKeyword
                | Field::SenderName
                | Field::Subcategory
                | Field::Code
                | Field::File
                | Field::ProjectFile => self.skip_string()?,
                Field::Context => self.skip_execution_context()?,
                Field::Timestamp => self.skip_datetime()?,
                Field::ThreadId
                | Field::LineNumber
                | Field::ColumnNumber
                | Field::EndLineNumber
                | Field::EndColumnNumber => self.skip_varint32()?,
            }
        }

        Ok(())
    }

    // --- Evaluation profiling ---

    pub fn read_evaluation_location(&mut self) -> Result<EvaluationLocation, ParseError> {
        let element_name = self.read_optional_string()?;
        let description = self.read_optional_string()?;
        let evaluation_description = self.read_optional_string()?;
        let file = self.read_optional_string()?;
        let kind = EvaluationLocationKind::from_i32(self.read_int32()?);
        let evaluation_pass = EvaluationPass::from_i32(self.read_int32()?);
        let line = if self.read_bool()? {
            Some(self.read_int32()?)
        } else {
            None
        };

        let (id, parent_id) = if self.version.supports(Feature::EvaluationLocationIds) {
            let id = self.read_int64()?;
            let parent_id = if self.read_bool()? {
                Some(self.read_int64()?)
            } else {
                None
            };
            (id, parent_id)
        } else {
            (0, None)
        };

        Ok(EvaluationLocation {
            id,
            parent_id,
            evaluation_pass,
            evaluation_description,
            file,
            line,
            element_name,
            description,
            kind,
        })
    }

    pub fn skip_evaluation_location(&mut self) -> Result<(), ParseError> {
        for _ in 0..4 {
            self.skip_optional_string()?;
        }
        self.skip_varint32()?;
        self.skip_varint32()?;
        if self.read_bool()? {
            self.skip_varint32()?;
        }
        if self.version.supports(Feature::EvaluationLocationIds) {
            self.skip_int64()?;
            if self.read_bool()? {
                self.skip_int64()?;
            }
        }
        Ok(())
    }

    pub fn read_profiled_location(&mut self) -> Result<ProfiledLocation, ParseError> {
        let number_of_hits = self.read_int32()?;
        let exclusive_time = self.read_timespan()?;
        let inclusive_time = self.read_timespan()?;
        Ok(ProfiledLocation {
            number_of_hits,
            exclusive_time,
            inclusive_time,
        })
    }

    pub fn skip_profiled_location(&mut self) -> Result<(), ParseError> {
        self.skip_varint32()?;
        self.skip_timespan()?;
        self.skip_timespan()
    }

    /// Read the optional profiler result that closes an evaluation-finished record.
    pub fn read_profiler_result(&mut self) -> Result<Option<ProfilerResult>, ParseError> {
        if !self.version.supports(Feature::ProfilerResult) || !self.read_bool()? {
            return Ok(None);
        }
        let n = self.read_count("profiler entry count")?;
        let mut locations = HashMap::with_capacity(n.min(1024));
        for _ in 0..n {
            let location = self.read_evaluation_location()?;
            let profiled = self.read_profiled_location()?;
            locations.insert(location, profiled);
        }
        Ok(Some(ProfilerResult { locations }))
    }

    pub fn skip_profiler_result(&mut self) -> Result<(), ParseError> {
        if !self.version.supports(Feature::ProfilerResult) || !self.read_bool()? {
            return Ok(());
        }
        let n = self.read_count("profiler entry count")?;
        for _ in 0..n {
            self.skip_evaluation_location()?;
            self.skip_profiled_location()?;
        }
        Ok(())
    }
}
