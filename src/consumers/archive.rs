//! ZIP packaging of heart-rate logs

use super::writer::DetailFile;
use crate::error::PipelineError;
use chrono::{Datelike, Timelike};
use sha1::{Digest, Sha1};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A packaged archive and its content-addressed name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedArchive {
    /// `splits-<sha1 of the entry bodies>.zip`
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Deflate `files` into one archive, in the order given. Each entry's modification
/// time is the file's last reading, so extracting keeps the hour ordering visible.
///
/// Files sharing a name (the same hour from two recordings) are all kept: later ones
/// go under a `copy-<n>/` directory, leaving the base name readable as a log.
pub fn package_archive<'a, I>(files: I) -> Result<PackagedArchive, PipelineError>
where
    I: IntoIterator<Item = &'a DetailFile>,
{
    let mut hasher = Sha1::new();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut written: HashSet<String> = HashSet::new();
    let mut renamed = 0usize;

    for file in files {
        let entry_name = unique_entry_name(&file.name, &written);
        if entry_name != file.name {
            renamed += 1;
        }

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip_time(file));
        writer.start_file(entry_name.as_str(), options)?;
        writer.write_all(&file.bytes)?;
        hasher.update(&file.bytes);
        written.insert(entry_name);
    }

    let bytes = writer.finish()?.into_inner();
    let name = format!("splits-{}.zip", hex::encode(hasher.finalize()));
    debug!(
        entries = written.len(),
        renamed,
        bytes = bytes.len(),
        name = %name,
        "packaged archive"
    );

    Ok(PackagedArchive { name, bytes })
}

fn unique_entry_name(name: &str, written: &HashSet<String>) -> String {
    if !written.contains(name) {
        return name.to_string();
    }
    let mut copy = 2usize;
    loop {
        let candidate = format!("copy-{copy}/{name}");
        if !written.contains(&candidate) {
            return candidate;
        }
        copy += 1;
    }
}

/// ZIP timestamps carry no zone and only cover 1980..=2107. Times outside that range
/// fall back to the format's epoch.
fn zip_time(file: &DetailFile) -> zip::DateTime {
    let t = file.modified;
    let (Ok(year), Ok(month), Ok(day), Ok(hour), Ok(minute), Ok(second)) = (
        u16::try_from(t.year()),
        u8::try_from(t.month()),
        u8::try_from(t.day()),
        u8::try_from(t.hour()),
        u8::try_from(t.minute()),
        u8::try_from(t.second()),
    ) else {
        return zip::DateTime::default();
    };
    zip::DateTime::from_date_and_time(year, month, day, hour, minute, second)
        .unwrap_or_default()
}
