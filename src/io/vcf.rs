//! # Seekable VCF Reading
//!
//! Lets you seek through a variant file and read records.
//!
//! Conceptually the reader keeps a cursor on one of the lines, the
//! "current record". You can ask for that record, or the genomic position
//! it represents, or a byte offset at the beginning of the record
//! (`current_offset`) or just after it (`next_offset`). The previous
//! record and its start offset are kept as well.
//!
//! This is not a VCF parser. Records are tab-separated lines, comment
//! lines start with `#`, line endings are single LF and fields are ASCII.
//! Only fields 0 (contig), 1 (start), 3 (REF) and 7 (INFO, for a leading
//! `END=` tag) are ever inspected. What this type is really about is
//! combining line-oriented reads with seeks to arbitrary byte offsets,
//! plus the logic of copying a shard of the file while splitting the
//! records that straddle its boundaries.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::data::position::{ContigOrder, Position};
use crate::error::{Result, ShardrError};
use crate::io::reference::ReferenceSource;

/// Returned by [`VcfReader::previous_offset`] when no record has been
/// passed since the last seek.
pub const UNKNOWN_OFFSET: i64 = -1;

/// Buffer size for the raw byte copy in the middle of a shard.
const COPY_BUF_BYTES: usize = 1024 * 1024;

/// Seekable line-oriented reader over one variant file.
pub struct VcfReader {
    input: BufReader<File>,
    path: PathBuf,
    contigs: Arc<ContigOrder>,
    reference: Arc<dyn ReferenceSource>,
    /// Offset we'll next read from.
    channel_offset: u64,
    /// Offset where the previous record begins, or `UNKNOWN_OFFSET` if
    /// only one record has been read since the last seek.
    prev_offset: i64,
    /// Latest line we read. `None` at EOF.
    latest_line: Option<String>,
    prev_line: Option<String>,
    primed: bool,
}

impl VcfReader {
    /// Open a variant file. The contig order must be the one from the
    /// shards table the cut positions come from.
    pub fn open(
        path: &Path,
        contigs: Arc<ContigOrder>,
        reference: Arc<dyn ReferenceSource>,
    ) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            input: BufReader::new(file),
            path: path.to_path_buf(),
            contigs,
            reference,
            channel_offset: 0,
            prev_offset: UNKNOWN_OFFSET,
            latest_line: None,
            prev_line: None,
            primed: false,
        })
    }

    /// Size of the underlying file in bytes.
    pub fn channel_size(&self) -> Result<u64> {
        Ok(self.input.get_ref().metadata()?.len())
    }

    /// Seek to a byte offset, which must fall on a line boundary (offsets
    /// from the mindex or from [`Self::previous_offset`] qualify). Clears
    /// the current/previous records; the next accessor re-primes.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.input.seek(SeekFrom::Start(offset))?;
        self.channel_offset = offset;
        self.prev_offset = UNKNOWN_OFFSET;
        self.latest_line = None;
        self.prev_line = None;
        self.primed = false;
        Ok(())
    }

    /// Returns the current record, or `None` at EOF. Does not advance.
    pub fn current(&mut self) -> Result<Option<&str>> {
        self.prime()?;
        Ok(self.latest_line.as_deref())
    }

    /// Returns the previous record, if any. Does not advance.
    pub fn previous(&mut self) -> Result<Option<&str>> {
        self.prime()?;
        Ok(self.prev_line.as_deref())
    }

    /// True at the end of the file.
    pub fn is_eof(&mut self) -> Result<bool> {
        self.prime()?;
        Ok(self.latest_line.is_none())
    }

    /// Genomic position of the current record, or `None` at EOF.
    pub fn position(&mut self) -> Result<Option<Position>> {
        self.prime()?;
        match &self.latest_line {
            None => Ok(None),
            Some(line) => self.parse_position(line).map(Some),
        }
    }

    /// Genomic position of the previous record, if any.
    pub fn previous_position(&mut self) -> Result<Option<Position>> {
        self.prime()?;
        match &self.prev_line {
            None => Ok(None),
            Some(line) => self.parse_position(line).map(Some),
        }
    }

    /// Offset of the record before the current one, or `UNKNOWN_OFFSET`.
    pub fn previous_offset(&mut self) -> Result<i64> {
        self.prime()?;
        Ok(self.prev_offset)
    }

    /// Offset at which the current record starts.
    pub fn current_offset(&self) -> u64 {
        match &self.latest_line {
            // At EOF (or before priming) the cursor sits at the channel offset.
            None => self.channel_offset,
            Some(line) => self.channel_offset - line.len() as u64 - 1,
        }
    }

    /// Offset just past the current record.
    pub fn next_offset(&self) -> u64 {
        self.channel_offset
    }

    /// Advance to the next record, skipping comment lines.
    ///
    /// A fresh (or freshly sought) reader starts on the first record, so
    /// calling this once moves to the second.
    pub fn next(&mut self) -> Result<()> {
        self.prime()?;
        self.inner_next()
    }

    /// Parse the record's (contig, start).
    pub fn parse_position(&self, line: &str) -> Result<Position> {
        let mut fields = line.splitn(3, '\t');
        let contig = fields.next().unwrap_or_default();
        let pos = fields.next().ok_or_else(|| {
            // Seen when the mindex is stale and a seek lands mid-record.
            ShardrError::vcf(format!(
                "expected at least 2 tab-separated fields in {line:?}"
            ))
        })?;
        let pos: u32 = pos
            .parse()
            .map_err(|_| ShardrError::vcf(format!("expected integer position in {line:?}")))?;
        Ok(Position::new(contig, pos, Arc::clone(&self.contigs)))
    }

    /// End position of a reference block, i.e. the value of a leading
    /// `END=` tag in the INFO field. `None` for ordinary records.
    pub fn parse_end_position(&self, line: &str) -> Result<Option<Position>> {
        let fields: Vec<&str> = line.splitn(9, '\t').collect();
        if fields.len() < 8 {
            // No END tag because that column isn't there at all.
            return Ok(None);
        }
        let Some(end) = fields[7].strip_prefix("END=") else {
            return Ok(None);
        };
        let end: u32 = end
            .parse()
            .map_err(|_| ShardrError::vcf(format!("malformed END tag in {line:?}")))?;
        Ok(Some(Position::new(
            fields[0],
            end,
            Arc::clone(&self.contigs),
        )))
    }

    /// Move forward until the current position is at or past `target`.
    ///
    /// With `throw_if_past`, starting beyond the target is an error: it
    /// means a mindex entry sent us too far.
    pub fn advance_to(&mut self, target: &Position, throw_if_past: bool) -> Result<()> {
        if self.is_eof()? {
            return Ok(());
        }
        let mut current = match self.position()? {
            Some(position) => position,
            None => return Ok(()),
        };
        if throw_if_past && *target < current {
            return Err(ShardrError::bug(format!(
                "{}: current position {current} already beyond the target {target}",
                self.path.display()
            )));
        }
        while current < *target {
            self.next()?;
            match self.position()? {
                None => break,
                Some(position) => current = position,
            }
        }
        Ok(())
    }

    /// Like [`Self::advance_to`], but starting past the target is fine.
    pub fn advance_to_at_least(&mut self, target: &Position) -> Result<()> {
        if self.is_eof()? {
            return Ok(());
        }
        self.advance_to(target, false)
    }

    /// "Primes the pump": materializes the first record after a seek.
    fn prime(&mut self) -> Result<()> {
        if !self.primed {
            self.inner_next()?;
            self.primed = true;
        }
        Ok(())
    }

    fn inner_next(&mut self) -> Result<()> {
        self.read_line()?;
        while matches!(&self.latest_line, Some(line) if line.starts_with('#')) {
            self.read_line()?;
        }
        Ok(())
    }

    /// Read one line, updating the cursor state. At EOF the current record
    /// becomes `None`.
    fn read_line(&mut self) -> Result<()> {
        self.prev_offset = self.current_offset() as i64;
        let line_start = self.channel_offset;
        let mut buf = Vec::new();
        let read = self.input.read_until(b'\n', &mut buf)?;
        self.prev_line = self.latest_line.take();
        if read == 0 {
            return Ok(());
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        // Single-LF line endings and single-byte characters are assumed;
        // all the offset arithmetic depends on it.
        self.channel_offset += buf.len() as u64 + 1;
        let line = String::from_utf8(buf).map_err(|_| {
            ShardrError::vcf(format!(
                "{}: record at offset {line_start} is not valid UTF-8",
                self.path.display()
            ))
        })?;
        self.latest_line = Some(line);
        Ok(())
    }

    /// Write the first record of a shard that begins at `start`, splitting
    /// the straddling reference block if there is one. Returns the offset
    /// just past the current record, where the raw copy can resume.
    ///
    /// The caller must have sought to an offset at or before the record
    /// covering `start`.
    pub fn save_first_record(&mut self, start: &Position, dest: &mut dyn Write) -> Result<u64> {
        self.advance_to(start, true)?;
        let Some(after_cut) = self.position()? else {
            return self.channel_size();
        };
        if after_cut != *start {
            // The previous record starts before the cut. We may have to
            // split it:
            //
            //   -[-----------]  +                   +------------
            //    ^before        ^start (in a gap)   ^after_cut
            //
            //   -[----------+------]+-------
            //    ^before    ^start  ^after_cut
            //
            // In the first layout nothing before after_cut belongs to this
            // shard. In the second, the previous record runs through the
            // cut and its second half must open the shard.
            let line_before = match self.previous()? {
                Some(line) => line.to_owned(),
                None => {
                    return Err(ShardrError::bug(
                        "copy() given an offset too close to the safe cut",
                    ))
                }
            };
            let before_pos = self.parse_position(&line_before)?;
            if before_pos >= *start {
                return Err(ShardrError::bug(format!(
                    "record before the cut should have been included: {line_before:?} \
                     is at {before_pos} and the cut starts at {start}"
                )));
            }
            if let Some(end_of_before) = self.parse_end_position(&line_before)? {
                if end_of_before >= *start {
                    let mut fields: Vec<String> =
                        line_before.split('\t').map(String::from).collect();
                    let base = self.reference.base_at(start.contig(), start.pos())?;
                    fields[1] = start.pos().to_string();
                    fields[3] = char::from(base).to_string();
                    let second_half = fields.join("\t");
                    dest.write_all(second_half.as_bytes())?;
                    dest.write_all(b"\n")?;
                }
            }
        }
        if let Some(line) = self.current()? {
            dest.write_all(line.as_bytes())?;
            dest.write_all(b"\n")?;
        }
        Ok(self.next_offset())
    }

    /// Write every record from the cursor up to (and excluding) the first
    /// record at or past `excluded`. If the last written record is a
    /// reference block extending past the cut, its `END` is trimmed to
    /// `excluded - 1`. Returns the number of bytes written.
    pub fn save_last_record(&mut self, excluded: &Position, dest: &mut dyn Write) -> Result<u64> {
        let mut total: u64 = 0;
        let mut old_line: Option<String> = None;
        loop {
            if let Some(line) = &old_line {
                // The line before the boundary candidate is included as-is.
                dest.write_all(line.as_bytes())?;
                dest.write_all(b"\n")?;
                total += line.len() as u64 + 1;
            }
            old_line = self.previous()?.map(str::to_owned);
            let Some(position) = self.position()? else {
                // The file ends before the cut; the trailing record is
                // still included (and trimmed below if it straddles).
                break;
            };
            self.next()?;
            if position >= *excluded {
                break;
            }
        }
        if let Some(line) = old_line {
            let mut line = line;
            if let Some(end_pos) = self.parse_end_position(&line)? {
                if *excluded < end_pos {
                    if excluded.contig() != end_pos.contig() {
                        return Err(ShardrError::bug(format!(
                            "record ends after the target but starts in a different \
                             contig: {line:?}, target {excluded}"
                        )));
                    }
                    let mut fields: Vec<String> = line.split('\t').map(String::from).collect();
                    fields[7] = format!("END={}", excluded.pos() - 1);
                    line = fields.join("\t");
                }
            }
            dest.write_all(line.as_bytes())?;
            dest.write_all(b"\n")?;
            total += line.len() as u64 + 1;
        }
        Ok(total)
    }

    /// Copy the shard `[start_offset, end_offset)` of this file to `dest`,
    /// splitting the boundary records: the first record is rewritten to
    /// begin at `start_position`, and when `end_position` is given the
    /// last record is trimmed to end just before it. Positions are 1-based
    /// inclusive as everywhere else; offsets are plain 0-based bytes.
    ///
    /// `start_offset` must sit at the beginning of a line at or before the
    /// record covering `start_position` (a mindex entry or a saved
    /// `previous_offset`). Returns the total number of bytes written.
    pub fn copy(
        &mut self,
        start_offset: i64,
        start_position: &Position,
        end_offset: i64,
        end_position: Option<&Position>,
        dest: &mut dyn Write,
    ) -> Result<u64> {
        if start_offset < 0 || end_offset < 0 {
            return Err(ShardrError::bug(format!(
                "negative shard offsets ({start_offset}, {end_offset}) for {}",
                self.path.display()
            )));
        }
        let size = self.channel_size()?;
        if start_offset as u64 > size {
            // No data to copy from this file.
            return Ok(0);
        }
        let mut dest = CountingWriter::new(dest);
        self.seek(start_offset as u64)?;

        // First record, with a possible split.
        let mut offset = self.save_first_record(start_position, &mut dest)?;

        // Raw byte copy in the middle.
        let end_offset = end_offset as u64;
        let mut buf = vec![0u8; COPY_BUF_BYTES];
        let file = self.input.get_mut();
        file.seek(SeekFrom::Start(offset))?;
        while offset < end_offset {
            let want = COPY_BUF_BYTES.min((end_offset - offset) as usize);
            let count = file.read(&mut buf[..want])?;
            if count == 0 {
                break;
            }
            dest.write_all(&buf[..count])?;
            offset += count as u64;
        }

        // Last record, with a possible trim. One of the lines at or after
        // end_offset is the boundary.
        if let Some(excluded) = end_position {
            self.seek(offset)?;
            self.save_last_record(excluded, &mut dest)?;
        }
        Ok(dest.written())
    }
}

/// Write adapter that counts the bytes passed through.
struct CountingWriter<'a> {
    inner: &'a mut dyn Write,
    written: u64,
}

impl<'a> CountingWriter<'a> {
    fn new(inner: &'a mut dyn Write) -> Self {
        Self { inner, written: 0 }
    }

    fn written(&self) -> u64 {
        self.written
    }
}

impl Write for CountingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
