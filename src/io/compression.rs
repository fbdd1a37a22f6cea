//! Transparent compression for file sources and writers.
//!
//! Codecs are matched by file extension first, then (for readers) by magic
//! bytes. Gzip is built in behind the `compression-gzip` feature; further
//! codecs can be plugged in with [`register_codec`].
//!
//! ```no_run
//! use boundflow::io::compression::{create_writer, open_reader};
//! use std::io::{BufRead, Write};
//! # fn main() -> std::io::Result<()> {
//!
//! let mut w = create_writer("words.jsonl.gz")?;
//! w.write_all(b"{\"text\":\"hello\"}\n")?;
//! w.finish()?;
//!
//! let first = open_reader("words.jsonl.gz")?.lines().next();
//! # Ok(())
//! # }
//! ```

use std::fs::{File, create_dir_all};
use std::io::{BufRead, BufReader, BufWriter, Read, Result, Write};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

static REGISTERED: RwLock<Vec<Arc<dyn CompressionCodec>>> = RwLock::new(Vec::new());

/// A writer whose output is complete only once [`finish`](Self::finish) returns.
///
/// Compressors write their trailer there. Dropping an unfinished writer may
/// still complete the stream, but any error doing so is lost.
pub trait FinishWrite: Write {
    /// Write any trailer and flush everything down to the underlying file.
    ///
    /// # Errors
    /// The I/O error from the final writes.
    fn finish(&mut self) -> Result<()> {
        self.flush()
    }
}

impl<W: Write> FinishWrite for BufWriter<W> {}

impl<W: FinishWrite + ?Sized> FinishWrite for Box<W> {
    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// A pluggable compression format.
pub trait CompressionCodec: Send + Sync {
    fn name(&self) -> &str;

    /// Lowercase extensions including the leading dot, e.g. `&[".gz"]`.
    fn extensions(&self) -> &[&str];

    /// Signature at the start of a compressed stream, if the format has one.
    fn magic_bytes(&self) -> Option<&[u8]>;

    fn wrap_reader(&self, reader: Box<dyn Read>) -> Result<Box<dyn Read>>;

    fn wrap_writer(&self, writer: Box<dyn FinishWrite>) -> Result<Box<dyn FinishWrite>>;
}

/// Make `codec` available to every reader and writer opened afterwards.
pub fn register_codec(codec: Arc<dyn CompressionCodec>) {
    REGISTERED
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(codec);
}

fn codecs() -> Vec<Arc<dyn CompressionCodec>> {
    let mut all: Vec<Arc<dyn CompressionCodec>> = vec![
        #[cfg(feature = "compression-gzip")]
        Arc::new(GzipCodec),
    ];
    all.extend(
        REGISTERED
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned(),
    );
    all
}

fn detect_from_extension(path: &Path) -> Option<Arc<dyn CompressionCodec>> {
    let name = path.to_string_lossy().to_lowercase();
    codecs()
        .into_iter()
        .find(|codec| codec.extensions().iter().any(|ext| name.ends_with(ext)))
}

fn detect_from_magic<R: BufRead>(reader: &mut R) -> Option<Arc<dyn CompressionCodec>> {
    let head = reader.fill_buf().ok()?;
    if head.is_empty() {
        return None;
    }
    codecs()
        .into_iter()
        .find(|codec| codec.magic_bytes().is_some_and(|magic| head.starts_with(magic)))
}

/// Wrap `reader` with a decompressor if `path_hint` or its first bytes name one.
///
/// # Errors
/// Propagates failures from the codec's setup.
pub fn auto_detect_reader<R: Read + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn Read>> {
    if let Some(codec) = detect_from_extension(path_hint.as_ref()) {
        return codec.wrap_reader(Box::new(reader));
    }
    let mut buffered = BufReader::new(reader);
    if let Some(codec) = detect_from_magic(&mut buffered) {
        return codec.wrap_reader(Box::new(buffered));
    }
    Ok(Box::new(buffered))
}

/// Wrap `writer` with a compressor if `path_hint` has a codec extension.
///
/// # Errors
/// Propagates failures from the codec's setup.
pub fn auto_detect_writer<W: Write + 'static>(
    writer: W,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn FinishWrite>> {
    match detect_from_extension(path_hint.as_ref()) {
        Some(codec) => codec.wrap_writer(Box::new(BufWriter::new(writer))),
        None => Ok(Box::new(BufWriter::new(writer))),
    }
}

/// Open `path` for buffered line reading, decompressing as needed.
///
/// # Errors
/// Returns the I/O error from opening the file or setting up the codec.
pub fn open_reader(path: impl AsRef<Path>) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    Ok(Box::new(BufReader::new(auto_detect_reader(file, path)?)))
}

/// Create `path` (and missing parent directories), compressing by extension.
///
/// Call [`FinishWrite::finish`] once everything is written; compressed
/// output is not complete before that.
///
/// # Errors
/// Returns the I/O error from creating the file or setting up the codec.
pub fn create_writer(path: impl AsRef<Path>) -> Result<Box<dyn FinishWrite>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent)?;
    }
    auto_detect_writer(File::create(path)?, path)
}

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> Result<Box<dyn Read>> {
        use flate2::read::MultiGzDecoder;
        Ok(Box::new(MultiGzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn FinishWrite>) -> Result<Box<dyn FinishWrite>> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        Ok(Box::new(GzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-gzip")]
impl<W: FinishWrite> FinishWrite for flate2::write::GzEncoder<W> {
    fn finish(&mut self) -> Result<()> {
        self.try_finish()?;
        self.get_mut().finish()
    }
}
