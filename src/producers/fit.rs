//! FIT activity file producer
//!
//! Walks the record structure of a FIT file and extracts heart-rate samples from
//! `record` messages. Session calories and the device label are picked up from the
//! `session` and `file_id` messages; every other message is skipped.

use crate::error::PipelineError;
use crate::types::{Sample, SessionMeta, SourceFormat, Stream};
use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, warn};

use super::{finish, FormatProducer};

const FIT_MAGIC: &[u8; 4] = b".FIT";

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00Z)
pub(crate) const FIT_EPOCH_OFFSET: i64 = 631_065_600;

const MESG_FILE_ID: u16 = 0;
const MESG_SESSION: u16 = 18;
const MESG_RECORD: u16 = 20;

const FIELD_TIMESTAMP: u8 = 253;
const RECORD_HEART_RATE: u8 = 3;
const SESSION_TOTAL_CALORIES: u8 = 11;
const FILE_ID_MANUFACTURER: u8 = 1;
const FILE_ID_PRODUCT: u8 = 2;

const LOCAL_TYPES: usize = 16;

const CRC_TABLE: [u16; 16] = [
    0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
    0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
];

/// Check the `.FIT` magic at bytes 8..12
pub fn is_fit(raw: &[u8]) -> bool {
    raw.len() >= 12 && &raw[8..12] == FIT_MAGIC
}

/// FIT CRC-16 over `bytes`
pub(crate) fn crc16(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |crc, &byte| {
        let crc = crc_nibble(crc, byte & 0x0F);
        crc_nibble(crc, byte >> 4)
    })
}

fn crc_nibble(crc: u16, nibble: u8) -> u16 {
    let tmp = CRC_TABLE[(crc & 0x0F) as usize];
    let crc = (crc >> 4) & 0x0FFF;
    crc ^ tmp ^ CRC_TABLE[nibble as usize]
}

/// FIT file producer
pub struct FitProducer;

impl FormatProducer for FitProducer {
    fn produce(&self, raw: &[u8], _file_name: Option<&str>) -> Result<Stream, PipelineError> {
        let mut meta = SessionMeta::new(SourceFormat::Fit);
        let mut samples = Vec::new();
        let mut dropouts = 0usize;
        let mut skipped_messages = 0usize;

        for message in FitReader::new(raw)? {
            let message = message?;
            match message.global {
                MESG_RECORD => match record_sample(&message)? {
                    Some(sample) => samples.push(sample),
                    None => dropouts += 1,
                },
                MESG_SESSION => {
                    if let FieldRead::Value(kcal) = message.uint(SESSION_TOTAL_CALORIES) {
                        let kcal = u32::try_from(kcal).unwrap_or(u32::MAX);
                        meta.calories = Some(meta.calories.unwrap_or(0).saturating_add(kcal));
                    }
                }
                MESG_FILE_ID => meta.device = device_label(&message),
                _ => skipped_messages += 1,
            }
        }

        if dropouts > 0 {
            warn!(dropouts, "skipped FIT records with invalid heart rate or timestamp");
        }
        debug!(
            samples = samples.len(),
            skipped_messages,
            "decoded FIT file"
        );

        finish(meta, samples)
    }
}

/// Turn a `record` message into a sample. `Ok(None)` is a sensor dropout.
fn record_sample(message: &FitMessage) -> Result<Option<Sample>, PipelineError> {
    let fit_time = match message.uint(FIELD_TIMESTAMP) {
        FieldRead::Value(ts) => ts,
        FieldRead::Invalid => return Ok(None),
        FieldRead::Absent => match message.compressed_timestamp {
            Some(ts) => u64::from(ts),
            None => return Err(PipelineError::field_missing("timestamp", "FIT record message")),
        },
    };

    let heart_rate = match message.uint(RECORD_HEART_RATE) {
        FieldRead::Value(hr) => hr,
        FieldRead::Invalid => return Ok(None),
        FieldRead::Absent => {
            return Err(PipelineError::field_missing("heart_rate", "FIT record message"))
        }
    };

    let Some(timestamp) = fit_datetime(fit_time) else {
        return Ok(None);
    };

    Ok(u16::try_from(heart_rate)
        .ok()
        .and_then(|hr| Sample::new(timestamp, hr)))
}

fn fit_datetime(fit_time: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(fit_time).ok()? + FIT_EPOCH_OFFSET;
    Utc.timestamp_opt(secs, 0).single()
}

fn device_label(message: &FitMessage) -> Option<String> {
    let FieldRead::Value(manufacturer) = message.uint(FILE_ID_MANUFACTURER) else {
        return None;
    };
    let name = match manufacturer {
        1 => "garmin".to_string(),
        23 => "suunto".to_string(),
        32 => "wahoo_fitness".to_string(),
        123 => "polar".to_string(),
        255 => "development".to_string(),
        294 => "coros".to_string(),
        other => format!("manufacturer-{other}"),
    };
    match message.uint(FILE_ID_PRODUCT) {
        FieldRead::Value(product) => Some(format!("{name}:{product}")),
        _ => Some(name),
    }
}

/// Outcome of reading an unsigned field from a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRead {
    /// Field is not part of the message definition
    Absent,
    /// Field holds the invalid sentinel (all bits set) or has an unsupported width
    Invalid,
    Value(u64),
}

#[derive(Debug, Clone)]
struct RawField {
    number: u8,
    bytes: Vec<u8>,
}

/// One decoded data message
#[derive(Debug, Clone)]
pub struct FitMessage {
    /// Global message number (20 = record, 18 = session, ...)
    pub global: u16,
    /// Timestamp carried by a compressed-timestamp record header
    pub compressed_timestamp: Option<u32>,
    big_endian: bool,
    fields: Vec<RawField>,
}

impl FitMessage {
    /// Read field `number` as an unsigned integer of its defined width
    pub fn uint(&self, number: u8) -> FieldRead {
        let Some(field) = self.fields.iter().find(|f| f.number == number) else {
            return FieldRead::Absent;
        };
        let width = field.bytes.len();
        if !matches!(width, 1 | 2 | 4 | 8) {
            return FieldRead::Invalid;
        }

        let fold = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
        let value = if self.big_endian {
            field.bytes.iter().fold(0, fold)
        } else {
            field.bytes.iter().rev().fold(0, fold)
        };

        if value == u64::MAX >> (64 - 8 * width) {
            FieldRead::Invalid
        } else {
            FieldRead::Value(value)
        }
    }
}

#[derive(Debug, Clone)]
struct Definition {
    global: u16,
    big_endian: bool,
    /// (field number, size in bytes)
    fields: Vec<(u8, usize)>,
    developer_bytes: usize,
}

/// Pull-based reader over the data messages of a FIT file.
///
/// Definition messages are consumed internally. The first error ends iteration.
pub struct FitReader<'a> {
    data: &'a [u8],
    pos: usize,
    definitions: [Option<Definition>; LOCAL_TYPES],
    last_timestamp: Option<u32>,
    failed: bool,
}

impl<'a> FitReader<'a> {
    /// Validate header and CRCs, then position the reader at the first record.
    pub fn new(raw: &'a [u8]) -> Result<Self, PipelineError> {
        if !is_fit(raw) {
            return Err(PipelineError::format("missing .FIT header magic"));
        }

        let header_size = usize::from(raw[0]);
        if header_size != 12 && header_size != 14 {
            return Err(PipelineError::format(format!(
                "unsupported FIT header size {header_size}"
            )));
        }
        if raw.len() < header_size {
            return Err(PipelineError::format("truncated FIT header"));
        }

        if header_size == 14 {
            let header_crc = u16::from_le_bytes([raw[12], raw[13]]);
            if header_crc != 0 && header_crc != crc16(&raw[..12]) {
                return Err(PipelineError::format("FIT header CRC mismatch"));
            }
        }

        let data_size = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]) as usize;
        let data_end = header_size
            .checked_add(data_size)
            .ok_or_else(|| PipelineError::format("FIT data size overflow"))?;
        if raw.len() < data_end + 2 {
            return Err(PipelineError::format(format!(
                "truncated FIT file: header declares {data_size} data bytes, file has {}",
                raw.len().saturating_sub(header_size + 2)
            )));
        }

        let file_crc = u16::from_le_bytes([raw[data_end], raw[data_end + 1]]);
        if file_crc != crc16(&raw[..data_end]) {
            return Err(PipelineError::format("FIT file CRC mismatch"));
        }

        Ok(Self {
            data: &raw[header_size..data_end],
            pos: 0,
            definitions: Default::default(),
            last_timestamp: None,
            failed: false,
        })
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], PipelineError> {
        let end = self.pos + n;
        if end > self.data.len() {
            return Err(PipelineError::format(format!(
                "truncated FIT record at data offset {}",
                self.pos
            )));
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_definition(&mut self, local: usize, developer: bool) -> Result<(), PipelineError> {
        let fixed = self.take(5)?;
        let big_endian = match fixed[1] {
            0 => false,
            1 => true,
            other => {
                return Err(PipelineError::format(format!(
                    "unknown FIT architecture {other}"
                )))
            }
        };
        let global = if big_endian {
            u16::from_be_bytes([fixed[2], fixed[3]])
        } else {
            u16::from_le_bytes([fixed[2], fixed[3]])
        };
        let field_count = usize::from(fixed[4]);

        let fields = self
            .take(field_count * 3)?
            .chunks_exact(3)
            .map(|f| (f[0], usize::from(f[1])))
            .collect();

        let developer_bytes = if developer {
            let count = usize::from(self.take(1)?[0]);
            self.take(count * 3)?
                .chunks_exact(3)
                .map(|f| usize::from(f[1]))
                .sum()
        } else {
            0
        };

        self.definitions[local] = Some(Definition {
            global,
            big_endian,
            fields,
            developer_bytes,
        });
        Ok(())
    }

    fn read_data(
        &mut self,
        local: usize,
        compressed_timestamp: Option<u32>,
    ) -> Result<FitMessage, PipelineError> {
        let definition = self.definitions[local].clone().ok_or_else(|| {
            PipelineError::format(format!(
                "FIT data message uses undefined local type {local}"
            ))
        })?;

        let mut fields = Vec::with_capacity(definition.fields.len());
        for &(number, size) in &definition.fields {
            fields.push(RawField {
                number,
                bytes: self.take(size)?.to_vec(),
            });
        }
        self.take(definition.developer_bytes)?;

        let message = FitMessage {
            global: definition.global,
            compressed_timestamp,
            big_endian: definition.big_endian,
            fields,
        };

        if let FieldRead::Value(ts) = message.uint(FIELD_TIMESTAMP) {
            self.last_timestamp = u32::try_from(ts).ok();
        }

        Ok(message)
    }

    fn next_message(&mut self) -> Result<Option<FitMessage>, PipelineError> {
        while self.pos < self.data.len() {
            let header = self.take(1)?[0];

            if header & 0x80 != 0 {
                let local = usize::from((header >> 5) & 0x03);
                let offset = u32::from(header & 0x1F);
                let last = self.last_timestamp.ok_or_else(|| {
                    PipelineError::format("compressed timestamp before any full timestamp")
                })?;
                let mut timestamp = (last & !0x1F).wrapping_add(offset);
                if offset < (last & 0x1F) {
                    timestamp = timestamp.wrapping_add(0x20);
                }
                self.last_timestamp = Some(timestamp);
                return self.read_data(local, Some(timestamp)).map(Some);
            }

            let local = usize::from(header & 0x0F);
            if header & 0x40 != 0 {
                self.read_definition(local, header & 0x20 != 0)?;
            } else {
                return self.read_data(local, None).map(Some);
            }
        }
        Ok(None)
    }
}

impl Iterator for FitReader<'_> {
    type Item = Result<FitMessage, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_message() {
            Ok(message) => message.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const UINT8: u8 = 0x02;
    const UINT16: u8 = 0x84;
    const UINT32: u8 = 0x86;

    /// Builds FIT files with valid header and file CRCs
    pub(crate) struct FitBuilder {
        data: Vec<u8>,
    }

    impl FitBuilder {
        pub(crate) fn new() -> Self {
            Self { data: Vec::new() }
        }

        /// Definition message; `fields` are (number, size, base type)
        pub(crate) fn define(mut self, local: u8, global: u16, fields: &[(u8, u8, u8)]) -> Self {
            self.data.push(0x40 | local);
            self.data.extend_from_slice(&[0, 0]);
            self.data.extend_from_slice(&global.to_le_bytes());
            self.data.push(fields.len() as u8);
            for &(number, size, base) in fields {
                self.data.extend_from_slice(&[number, size, base]);
            }
            self
        }

        pub(crate) fn define_big_endian(
            mut self,
            local: u8,
            global: u16,
            fields: &[(u8, u8, u8)],
        ) -> Self {
            self.data.push(0x40 | local);
            self.data.extend_from_slice(&[0, 1]);
            self.data.extend_from_slice(&global.to_be_bytes());
            self.data.push(fields.len() as u8);
            for &(number, size, base) in fields {
                self.data.extend_from_slice(&[number, size, base]);
            }
            self
        }

        pub(crate) fn define_with_developer(
            mut self,
            local: u8,
            global: u16,
            fields: &[(u8, u8, u8)],
            developer_sizes: &[u8],
        ) -> Self {
            self.data.push(0x60 | local);
            self.data.extend_from_slice(&[0, 0]);
            self.data.extend_from_slice(&global.to_le_bytes());
            self.data.push(fields.len() as u8);
            for &(number, size, base) in fields {
                self.data.extend_from_slice(&[number, size, base]);
            }
            self.data.push(developer_sizes.len() as u8);
            for (i, &size) in developer_sizes.iter().enumerate() {
                self.data.extend_from_slice(&[i as u8, size, 0]);
            }
            self
        }

        pub(crate) fn message(mut self, local: u8, bytes: &[u8]) -> Self {
            self.data.push(local);
            self.data.extend_from_slice(bytes);
            self
        }

        pub(crate) fn compressed(mut self, local: u8, offset: u8, bytes: &[u8]) -> Self {
            self.data.push(0x80 | (local << 5) | (offset & 0x1F));
            self.data.extend_from_slice(bytes);
            self
        }

        /// Standard record definition (timestamp + heart rate) on `local`
        pub(crate) fn define_record(self, local: u8) -> Self {
            self.define(
                local,
                MESG_RECORD,
                &[(FIELD_TIMESTAMP, 4, UINT32), (RECORD_HEART_RATE, 1, UINT8)],
            )
        }

        pub(crate) fn record(self, local: u8, fit_time: u32, heart_rate: u8) -> Self {
            let mut bytes = fit_time.to_le_bytes().to_vec();
            bytes.push(heart_rate);
            self.message(local, &bytes)
        }

        pub(crate) fn build(self) -> Vec<u8> {
            let mut out = vec![14, 0x20];
            out.extend_from_slice(&2132u16.to_le_bytes());
            out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
            out.extend_from_slice(FIT_MAGIC);
            let header_crc = crc16(&out);
            out.extend_from_slice(&header_crc.to_le_bytes());
            out.extend_from_slice(&self.data);
            let file_crc = crc16(&out);
            out.extend_from_slice(&file_crc.to_le_bytes());
            out
        }
    }

    /// Unix seconds for a FIT timestamp
    fn unix(fit_time: u32) -> i64 {
        i64::from(fit_time) + FIT_EPOCH_OFFSET
    }

    fn unix_readings(stream: &Stream) -> Vec<(i64, u16)> {
        stream
            .iter()
            .map(|s| (s.timestamp.timestamp(), s.heart_rate))
            .collect()
    }

    #[test]
    fn test_crc_of_crc_terminated_buffer_is_zero() {
        let file = FitBuilder::new().define_record(0).record(0, 1_000, 80).build();
        assert_eq!(crc16(&file), 0);
    }

    #[test]
    fn test_decode_records() {
        let file = FitBuilder::new()
            .define_record(0)
            .record(0, 1_000_000_000, 92)
            .record(0, 1_000_000_001, 95)
            .record(0, 1_000_000_002, 97)
            .build();

        let stream = FitProducer.produce(&file, None).unwrap();

        assert_eq!(stream.meta().format, SourceFormat::Fit);
        assert_eq!(
            unix_readings(&stream),
            vec![
                (unix(1_000_000_000), 92),
                (unix(1_000_000_001), 95),
                (unix(1_000_000_002), 97)
            ]
        );
        assert_eq!(stream.start().unwrap().timestamp(), 1_631_065_600);
    }

    #[test]
    fn test_unknown_messages_and_fields_are_skipped() {
        let file = FitBuilder::new()
            // event message, never interpreted
            .define(0, 21, &[(FIELD_TIMESTAMP, 4, UINT32), (0, 1, 0x00)])
            .message(0, &[0, 0, 0, 0, 9])
            // record with cadence (4) and distance (5) fields around heart rate
            .define(
                1,
                MESG_RECORD,
                &[
                    (FIELD_TIMESTAMP, 4, UINT32),
                    (4, 1, UINT8),
                    (RECORD_HEART_RATE, 1, UINT8),
                    (5, 4, UINT32),
                ],
            )
            .message(1, &[100, 0, 0, 0, 88, 140, 1, 2, 3, 4])
            .build();

        let stream = FitProducer.produce(&file, None).unwrap();
        assert_eq!(unix_readings(&stream), vec![(unix(100), 140)]);
    }

    #[test]
    fn test_missing_magic_is_format_error() {
        let mut file = FitBuilder::new().define_record(0).record(0, 1, 80).build();
        file[8..12].copy_from_slice(b"XXXX");

        let result = FitProducer.produce(&file, None);
        assert!(matches!(result, Err(PipelineError::Format(_))));
    }

    #[test]
    fn test_short_input_is_format_error() {
        let result = FitProducer.produce(b"tiny", None);
        assert!(matches!(result, Err(PipelineError::Format(_))));
    }

    #[test]
    fn test_file_crc_mismatch_is_format_error() {
        let mut file = FitBuilder::new().define_record(0).record(0, 1, 80).build();
        let last = file.len() - 3;
        file[last] ^= 0xFF;

        let result = FitProducer.produce(&file, None);
        assert!(matches!(result, Err(PipelineError::Format(_))));
    }

    #[test]
    fn test_header_crc_mismatch_is_format_error() {
        let mut file = FitBuilder::new().define_record(0).record(0, 1, 80).build();
        file[12] ^= 0x01;

        let result = FitProducer.produce(&file, None);
        assert!(matches!(result, Err(PipelineError::Format(_))));
    }

    #[test]
    fn test_truncated_record_is_format_error() {
        // record message declares 5 bytes but only 2 follow
        let file = FitBuilder::new()
            .define_record(0)
            .message(0, &[1, 2])
            .build();

        let result = FitProducer.produce(&file, None);
        assert!(matches!(result, Err(PipelineError::Format(_))));
    }

    #[test]
    fn test_undefined_local_type_is_format_error() {
        let file = FitBuilder::new().record(3, 1, 80).build();

        let result = FitProducer.produce(&file, None);
        assert!(matches!(result, Err(PipelineError::Format(_))));
    }

    #[test]
    fn test_record_without_heart_rate_field() {
        let file = FitBuilder::new()
            .define(0, MESG_RECORD, &[(FIELD_TIMESTAMP, 4, UINT32)])
            .message(0, &[1, 0, 0, 0])
            .build();

        match FitProducer.produce(&file, None) {
            Err(PipelineError::FieldMissing { field, .. }) => assert_eq!(field, "heart_rate"),
            other => panic!("expected FieldMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_record_without_timestamp_field() {
        let file = FitBuilder::new()
            .define(0, MESG_RECORD, &[(RECORD_HEART_RATE, 1, UINT8)])
            .message(0, &[120])
            .build();

        match FitProducer.produce(&file, None) {
            Err(PipelineError::FieldMissing { field, .. }) => assert_eq!(field, "timestamp"),
            other => panic!("expected FieldMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_heart_rate_is_dropped() {
        let file = FitBuilder::new()
            .define_record(0)
            .record(0, 10, 0xFF)
            .record(0, 11, 0)
            .record(0, 12, 101)
            .build();

        let stream = FitProducer.produce(&file, None).unwrap();
        assert_eq!(unix_readings(&stream), vec![(unix(12), 101)]);
    }

    #[test]
    fn test_compressed_timestamp_headers() {
        let file = FitBuilder::new()
            .define_record(0)
            .define(1, MESG_RECORD, &[(RECORD_HEART_RATE, 1, UINT8)])
            .record(0, 1_000, 100)
            .compressed(1, 10, &[101])
            .compressed(1, 3, &[102])
            .build();

        let stream = FitProducer.produce(&file, None).unwrap();
        assert_eq!(
            unix_readings(&stream),
            vec![(unix(1_000), 100), (unix(1_002), 101), (unix(1_027), 102)]
        );
    }

    #[test]
    fn test_compressed_timestamp_without_reference_is_format_error() {
        let file = FitBuilder::new()
            .define(1, MESG_RECORD, &[(RECORD_HEART_RATE, 1, UINT8)])
            .compressed(1, 4, &[90])
            .build();

        let result = FitProducer.produce(&file, None);
        assert!(matches!(result, Err(PipelineError::Format(_))));
    }

    #[test]
    fn test_big_endian_definition() {
        let file = FitBuilder::new()
            .define_big_endian(
                0,
                MESG_RECORD,
                &[(FIELD_TIMESTAMP, 4, UINT32), (RECORD_HEART_RATE, 1, UINT8)],
            )
            .message(0, &[0x00, 0x00, 0x01, 0x00, 77])
            .build();

        let stream = FitProducer.produce(&file, None).unwrap();
        assert_eq!(unix_readings(&stream), vec![(unix(256), 77)]);
    }

    #[test]
    fn test_developer_fields_are_skipped() {
        let file = FitBuilder::new()
            .define_with_developer(
                0,
                MESG_RECORD,
                &[(FIELD_TIMESTAMP, 4, UINT32), (RECORD_HEART_RATE, 1, UINT8)],
                &[2, 1],
            )
            .message(0, &[5, 0, 0, 0, 130, 0xAA, 0xBB, 0xCC])
            .message(0, &[6, 0, 0, 0, 131, 0xAA, 0xBB, 0xCC])
            .build();

        let stream = FitProducer.produce(&file, None).unwrap();
        assert_eq!(unix_readings(&stream), vec![(unix(5), 130), (unix(6), 131)]);
    }

    #[test]
    fn test_out_of_order_records_are_sorted() {
        let file = FitBuilder::new()
            .define_record(0)
            .record(0, 30, 90)
            .record(0, 10, 80)
            .record(0, 20, 85)
            .build();

        let stream = FitProducer.produce(&file, None).unwrap();
        assert_eq!(
            unix_readings(&stream),
            vec![(unix(10), 80), (unix(20), 85), (unix(30), 90)]
        );
    }

    #[test]
    fn test_session_calories_and_device_label() {
        let file = FitBuilder::new()
            .define(
                0,
                MESG_FILE_ID,
                &[(0, 1, 0x00), (FILE_ID_MANUFACTURER, 2, UINT16), (FILE_ID_PRODUCT, 2, UINT16)],
            )
            .message(0, &[4, 1, 0, 0x8C, 0x0A])
            .define_record(1)
            .record(1, 50, 120)
            .define(2, MESG_SESSION, &[(SESSION_TOTAL_CALORIES, 2, UINT16)])
            .message(2, &[0x2C, 0x01])
            .build();

        let stream = FitProducer.produce(&file, None).unwrap();
        assert_eq!(stream.meta().calories, Some(300));
        assert_eq!(stream.meta().device.as_deref(), Some("garmin:2700"));
    }

    #[test]
    fn test_file_without_records_is_empty() {
        let file = FitBuilder::new()
            .define(0, 21, &[(FIELD_TIMESTAMP, 4, UINT32)])
            .message(0, &[1, 0, 0, 0])
            .build();

        let result = FitProducer.produce(&file, None);
        assert!(matches!(result, Err(PipelineError::EmptyStream)));
    }

    #[test]
    fn test_reader_stops_after_error() {
        let file = FitBuilder::new().record(0, 1, 80).record(0, 2, 81).build();
        let mut reader = FitReader::new(&file).unwrap();

        assert!(matches!(reader.next(), Some(Err(PipelineError::Format(_)))));
        assert!(reader.next().is_none());
    }
}
