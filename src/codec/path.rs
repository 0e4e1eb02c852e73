//! `Path` binary container: header + segment headers + concatenated,
//! padded `PostfixExpression` blobs.

use crate::codec::{PostfixReader, PostfixWriter};
use crate::consts::{PATH_HEADER_SIZE, PATH_SEGMENT_HEADER_SIZE};

bitflags::bitflags! {
    /// `PathHeader.flags` bits.
    pub struct PathFlags: u8 {
        /// Segment timestamps wrap around the 32-bit time axis; readers
        /// must use origin-shifted, wraparound-aware comparisons instead of
        /// raw numeric ordering.
        const OVERFLOW = 1 << 0;
    }
}

/// One decoded segment header entry (not the expression bytes themselves).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSegmentHeader {
    pub start_time: u32,
    pub offset: u16,
    pub size: u16,
}

#[inline]
fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// One segment as collected by [`PathWriter`] before serialization.
#[derive(Debug, Clone, Default)]
struct SegmentEntry {
    start_time: u32,
    expr: PostfixWriter,
}

/// Incrementally builds a `Path` buffer from an ordered list of segments.
#[derive(Debug, Clone, Default)]
pub struct PathWriter {
    segments: Vec<SegmentEntry>,
}

impl PathWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Append a new segment starting at `start_time` and return a handle to
    /// its expression writer so the caller can append ops to it.
    pub fn add_segment(&mut self, start_time: u32) -> &mut PostfixWriter {
        self.segments.push(SegmentEntry {
            start_time,
            expr: PostfixWriter::new(),
        });
        &mut self.segments.last_mut().unwrap().expr
    }

    fn headers_size(&self) -> usize {
        PATH_HEADER_SIZE + self.segments.len() * PATH_SEGMENT_HEADER_SIZE
    }

    pub fn data_size(&self) -> usize {
        let mut size = self.headers_size();
        for segment in &self.segments {
            size += align4(segment.expr.data_size());
        }
        size
    }

    /// Serialize into `buf`, computing the Overflow flag from the appended
    /// segment start times. Returns `false` if `buf` is too small.
    pub fn write(&self, buf: &mut [u8]) -> bool {
        let headers_size = self.headers_size();
        if buf.len() < headers_size {
            return false;
        }

        buf[0..2].copy_from_slice(&(self.segments.len() as u16).to_le_bytes());
        let mut flags = PathFlags::empty();
        for pair in self.segments.windows(2) {
            if pair[1].start_time < pair[0].start_time {
                flags.insert(PathFlags::OVERFLOW);
            }
        }
        buf[2] = flags.bits();
        buf[3] = 0;

        let mut offset = headers_size;
        for (i, segment) in self.segments.iter().enumerate() {
            let header_at = PATH_HEADER_SIZE + i * PATH_SEGMENT_HEADER_SIZE;
            let size = segment.expr.data_size();
            buf[header_at..header_at + 4].copy_from_slice(&segment.start_time.to_le_bytes());
            buf[header_at + 4..header_at + 6].copy_from_slice(&(offset as u16).to_le_bytes());
            buf[header_at + 6..header_at + 8].copy_from_slice(&(size as u16).to_le_bytes());

            if buf.len() < offset + size {
                return false;
            }
            if !segment.expr.write(&mut buf[offset..offset + size]) {
                return false;
            }
            let padded = align4(size);
            for b in &mut buf[offset + size..offset + padded] {
                *b = 0;
            }
            offset += padded;
        }
        true
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.data_size()];
        self.write(&mut buf);
        buf
    }
}

/// Zero-copy view over a `Path` buffer.
///
/// `read` additionally verifies (per the wire-format invariants) that every
/// segment's declared expression slice parses as a `PostfixExpression` —
/// this is stricter than [`PostfixReader::read`]'s own bounds check, since a
/// `Path` reader has enough context to validate its children eagerly.
#[derive(Debug, Clone, Copy)]
pub struct PathReader<'a> {
    buffer: &'a [u8],
    segment_size: u16,
    flags: PathFlags,
}

impl<'a> PathReader<'a> {
    pub fn read(data: &'a [u8]) -> Option<Self> {
        if data.len() < PATH_HEADER_SIZE {
            return None;
        }
        let segment_size = u16::from_le_bytes([data[0], data[1]]);
        let flags = PathFlags::from_bits_truncate(data[2]);
        let reader = PathReader {
            buffer: data,
            segment_size,
            flags,
        };

        let headers_end =
            PATH_HEADER_SIZE + segment_size as usize * PATH_SEGMENT_HEADER_SIZE;
        if data.len() < headers_end {
            return None;
        }

        for i in 0..segment_size {
            let header = reader.segment_header(i);
            let end = header.offset as usize + header.size as usize;
            if data.len() < end {
                return None;
            }
            PostfixReader::read(&data[header.offset as usize..end])?;
        }

        Some(reader)
    }

    pub fn flags(&self) -> PathFlags {
        self.flags
    }

    pub fn segment_size(&self) -> u16 {
        self.segment_size
    }

    pub fn segment_header(&self, index: u16) -> PathSegmentHeader {
        let at = PATH_HEADER_SIZE + index as usize * PATH_SEGMENT_HEADER_SIZE;
        let bytes = &self.buffer[at..at + PATH_SEGMENT_HEADER_SIZE];
        PathSegmentHeader {
            start_time: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            offset: u16::from_le_bytes(bytes[4..6].try_into().unwrap()),
            size: u16::from_le_bytes(bytes[6..8].try_into().unwrap()),
        }
    }

    /// Parse the inline `PostfixExpression` for segment `index`.
    ///
    /// Returns `None` only if the declared slice fails to parse, which
    /// [`PathReader::read`] already rules out for any `PathReader` obtained
    /// through it — callers that construct headers by hand should still
    /// check this.
    pub fn segment_expr(&self, index: u16) -> Option<PostfixReader<'a>> {
        let header = self.segment_header(index);
        let end = header.offset as usize + header.size as usize;
        if self.buffer.len() < end {
            return None;
        }
        PostfixReader::read(&self.buffer[header.offset as usize..end])
    }
}
