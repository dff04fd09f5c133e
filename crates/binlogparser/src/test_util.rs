//! Encoder for hand-assembled logs in tests. Shared with the integration tests.
#![allow(dead_code)]

use std::io::Write;

pub mod tags {
    pub const END_OF_FILE: i32 = 0;
    pub const BUILD_STARTED: i32 = 1;
    pub const BUILD_FINISHED: i32 = 2;
    pub const PROJECT_STARTED: i32 = 3;
    pub const PROJECT_FINISHED: i32 = 4;
    pub const TARGET_STARTED: i32 = 5;
    pub const TARGET_FINISHED: i32 = 6;
    pub const TASK_STARTED: i32 = 7;
    pub const TASK_FINISHED: i32 = 8;
    pub const ERROR: i32 = 9;
    pub const WARNING: i32 = 10;
    pub const MESSAGE: i32 = 11;
    pub const TASK_COMMAND_LINE: i32 = 12;
    pub const CRITICAL_BUILD_MESSAGE: i32 = 13;
    pub const PROJECT_EVALUATION_STARTED: i32 = 14;
    pub const PROJECT_EVALUATION_FINISHED: i32 = 15;
    pub const PROJECT_IMPORTED: i32 = 16;
    pub const PROJECT_IMPORT_ARCHIVE: i32 = 17;
    pub const TARGET_SKIPPED: i32 = 18;
    pub const PROPERTY_REASSIGNMENT: i32 = 19;
    pub const UNINITIALIZED_PROPERTY_READ: i32 = 20;
    pub const ENVIRONMENT_VARIABLE_READ: i32 = 21;
    pub const PROPERTY_INITIAL_VALUE_SET: i32 = 22;
}

// Bitmask values of the common fields.
const CONTEXT: i32 = 1 << 0;
const HELP_KEYWORD: i32 = 1 << 1;
const MESSAGE: i32 = 1 << 2;
const SENDER_NAME: i32 = 1 << 3;
const THREAD_ID: i32 = 1 << 4;
const TIMESTAMP: i32 = 1 << 5;
const SUBCATEGORY: i32 = 1 << 6;
const CODE: i32 = 1 << 7;
const FILE: i32 = 1 << 8;
const PROJECT_FILE: i32 = 1 << 9;
const LINE_NUMBER: i32 = 1 << 10;
const COLUMN_NUMBER: i32 = 1 << 11;
const END_LINE_NUMBER: i32 = 1 << 12;
const END_COLUMN_NUMBER: i32 = 1 << 13;

pub fn encode_varint(mut v: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(5);
    while v >= 0x80 {
        out.push((v as u8) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
    out
}

/// The common fields of a record. Timestamps are raw ticks.
#[derive(Debug, Clone, Default)]
pub struct TestFields<'a> {
    pub message: Option<&'a str>,
    pub context: Option<[i32; 7]>,
    pub thread_id: Option<i32>,
    pub help_keyword: Option<&'a str>,
    pub sender_name: Option<&'a str>,
    pub timestamp: Option<i64>,
    pub subcategory: Option<&'a str>,
    pub code: Option<&'a str>,
    pub file: Option<&'a str>,
    pub project_file: Option<&'a str>,
    pub line_number: Option<i32>,
    pub column_number: Option<i32>,
    pub end_line_number: Option<i32>,
    pub end_column_number: Option<i32>,
}

/// Writes log bytes for a given format version.
pub struct LogWriter {
    buf: Vec<u8>,
    version: i32,
}

impl LogWriter {
    /// A writer for record bytes only, without the version header.
    pub fn new(version: i32) -> Self {
        LogWriter {
            buf: Vec::new(),
            version,
        }
    }

    /// A writer that starts with the four-byte version header.
    pub fn with_header(version: i32) -> Self {
        let mut w = Self::new(version);
        w.buf.extend_from_slice(&version.to_le_bytes());
        w
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn gzip(self) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&self.buf).unwrap();
        encoder.finish().unwrap()
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn varint(&mut self, v: i32) -> &mut Self {
        self.buf.extend_from_slice(&encode_varint(v as u32));
        self
    }

    pub fn bool(&mut self, b: bool) -> &mut Self {
        self.buf.push(b as u8);
        self
    }

    pub fn int64(&mut self, v: i64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn string(&mut self, s: &str) -> &mut Self {
        self.varint(s.len() as i32);
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    pub fn opt_string(&mut self, s: Option<&str>) -> &mut Self {
        match s {
            Some(s) => self.bool(true).string(s),
            None => self.bool(false),
        }
    }

    pub fn datetime(&mut self, ticks: i64, kind: i32) -> &mut Self {
        self.int64(ticks).varint(kind)
    }

    pub fn map(&mut self, entries: &[(&str, &str)]) -> &mut Self {
        self.varint(entries.len() as i32);
        for (k, v) in entries {
            self.string(k).string(v);
        }
        self
    }

    pub fn item(&mut self, spec: &str, metadata: &[(&str, &str)]) -> &mut Self {
        self.string(spec).map(metadata)
    }

    /// Writes six ids, plus the evaluation id from version 2 on.
    pub fn context(&mut self, ids: [i32; 7]) -> &mut Self {
        let n = if self.version > 1 { 7 } else { 6 };
        for id in &ids[..n] {
            self.varint(*id);
        }
        self
    }

    pub fn fields(&mut self, f: &TestFields<'_>) -> &mut Self {
        let mut flags = 0;
        let mut set = |present: bool, bit: i32| {
            if present {
                flags |= bit;
            }
        };
        set(f.message.is_some(), MESSAGE);
        set(f.context.is_some(), CONTEXT);
        set(f.thread_id.is_some(), THREAD_ID);
        set(f.help_keyword.is_some(), HELP_KEYWORD);
        set(f.sender_name.is_some(), SENDER_NAME);
        set(f.timestamp.is_some(), TIMESTAMP);
        set(f.subcategory.is_some(), SUBCATEGORY);
        set(f.code.is_some(), CODE);
        set(f.file.is_some(), FILE);
        set(f.project_file.is_some(), PROJECT_FILE);
        set(f.line_number.is_some(), LINE_NUMBER);
        set(f.column_number.is_some(), COLUMN_NUMBER);
        set(f.end_line_number.is_some(), END_LINE_NUMBER);
        set(f.end_column_number.is_some(), END_COLUMN_NUMBER);
        self.varint(flags);

        if let Some(s) = f.message {
            self.string(s);
        }
        if let Some(ids) = f.context {
            self.context(ids);
        }
        if let Some(v) = f.thread_id {
            self.varint(v);
        }
        for s in [f.help_keyword, f.sender_name].into_iter().flatten() {
            self.string(s);
        }
        if let Some(ticks) = f.timestamp {
            self.datetime(ticks, 1);
        }
        for s in [f.subcategory, f.code, f.file, f.project_file]
            .into_iter()
            .flatten()
        {
            self.string(s);
        }
        for v in [
            f.line_number,
            f.column_number,
            f.end_line_number,
            f.end_column_number,
        ]
        .into_iter()
        .flatten()
        {
            self.varint(v);
        }
        self
    }

    pub fn evaluation_location(
        &mut self,
        element_name: Option<&str>,
        kind: i32,
        pass: i32,
        line: Option<i32>,
        id: i64,
        parent_id: Option<i64>,
    ) -> &mut Self {
        self.opt_string(element_name);
        self.opt_string(None);
        self.opt_string(None);
        self.opt_string(None);
        self.varint(kind).varint(pass);
        match line {
            Some(line) => self.bool(true).varint(line),
            None => self.bool(false),
        };
        if self.version > 5 {
            self.int64(id);
            match parent_id {
                Some(p) => self.bool(true).int64(p),
                None => self.bool(false),
            };
        }
        self
    }
}
