//! Archive writers
//!
//! Every codec is driven the same way: open it on a fresh file, `add` entries
//! one at a time, then `close` it. Nothing is guaranteed to be on disk until
//! `close` returns successfully.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::{Compression, GzBuilder};
use shipwright_schema::ArchiveFormat;
use xz2::write::XzEncoder;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::errors::{DistError, DistResult};

const GZ_LEVEL: u32 = 6;
const XZ_LEVEL: u32 = 9;

/// The ways we know how to write an archive
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Codec {
    /// .tar
    Tar,
    /// .tar.gz
    TarGz,
    /// .tar.xz
    TarXz,
    /// .zip
    Zip,
}

impl Codec {
    /// The codec for an archive format, `None` for formats that don't produce an archive
    pub fn for_format(format: ArchiveFormat) -> Option<Self> {
        match format {
            ArchiveFormat::Tar => Some(Codec::Tar),
            ArchiveFormat::TarGz => Some(Codec::TarGz),
            ArchiveFormat::TarXz => Some(Codec::TarXz),
            ArchiveFormat::Zip => Some(Codec::Zip),
            ArchiveFormat::Binary => None,
        }
    }
}

/// An archive being written
pub trait Archive: Send {
    /// Add the file at `path` to the archive under `name`
    fn add(&mut self, name: &str, path: &Utf8Path) -> DistResult<()>;
    /// Finish writing the archive
    fn close(self: Box<Self>) -> DistResult<()>;
}

/// Create `dest` and start writing an archive to it
pub fn new_archive(codec: Codec, dest: &Utf8Path) -> DistResult<Box<dyn Archive>> {
    let file = File::create(dest).map_err(|details| DistError::ArchiveCreate {
        path: dest.to_owned(),
        details,
    })?;
    let out = BufWriter::new(file);
    let dest = dest.to_owned();
    let archive: Box<dyn Archive> = match codec {
        Codec::Tar => Box::new(TarArchive::new(dest, TarStream::Plain(out))),
        Codec::TarGz => {
            // record the inner .tar name in the gzip header
            let inner = dest
                .file_name()
                .and_then(|n| n.strip_suffix(".gz"))
                .unwrap_or("archive.tar")
                .to_owned();
            let gz = GzBuilder::new()
                .filename(inner)
                .write(out, Compression::new(GZ_LEVEL));
            Box::new(TarArchive::new(dest, TarStream::Gzip(gz)))
        }
        Codec::TarXz => Box::new(TarArchive::new(
            dest,
            TarStream::Xzip(XzEncoder::new(out, XZ_LEVEL)),
        )),
        Codec::Zip => Box::new(ZipArchive::new(dest, out)),
    };
    Ok(archive)
}

enum TarStream {
    Plain(BufWriter<File>),
    Gzip(flate2::write::GzEncoder<BufWriter<File>>),
    Xzip(XzEncoder<BufWriter<File>>),
}

impl TarStream {
    fn finish(self) -> io::Result<()> {
        let mut out = match self {
            TarStream::Plain(out) => out,
            TarStream::Gzip(gz) => gz.finish()?,
            TarStream::Xzip(xz) => xz.finish()?,
        };
        out.flush()?;
        out.get_ref().sync_all()
    }
}

impl Write for TarStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            TarStream::Plain(w) => w.write(buf),
            TarStream::Gzip(w) => w.write(buf),
            TarStream::Xzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            TarStream::Plain(w) => w.flush(),
            TarStream::Gzip(w) => w.flush(),
            TarStream::Xzip(w) => w.flush(),
        }
    }
}

struct TarArchive {
    path: Utf8PathBuf,
    tar: tar::Builder<TarStream>,
}

impl TarArchive {
    fn new(path: Utf8PathBuf, stream: TarStream) -> Self {
        Self {
            path,
            tar: tar::Builder::new(stream),
        }
    }
}

impl Archive for TarArchive {
    fn add(&mut self, name: &str, path: &Utf8Path) -> DistResult<()> {
        self.tar
            .append_path_with_name(path, name)
            .map_err(|details| DistError::ArchiveAdd {
                path: self.path.clone(),
                name: name.to_owned(),
                details,
            })
    }

    fn close(self: Box<Self>) -> DistResult<()> {
        let TarArchive { path, tar } = *self;
        tar.into_inner()
            .and_then(TarStream::finish)
            .map_err(|details| DistError::ArchiveClose { path, details })
    }
}

struct ZipArchive {
    path: Utf8PathBuf,
    zip: ZipWriter<BufWriter<File>>,
    buffer: Vec<u8>,
}

impl ZipArchive {
    fn new(path: Utf8PathBuf, out: BufWriter<File>) -> Self {
        Self {
            path,
            zip: ZipWriter::new(out),
            buffer: Vec::new(),
        }
    }

    fn add_inner(&mut self, name: &str, path: &Utf8Path) -> io::Result<()> {
        let mut file = File::open(path)?;
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(file_mode(&file)?);

        // zip entries always use unix separators
        let unix_name = name.replace('\\', "/");
        self.zip.start_file(unix_name, options)?;
        file.read_to_end(&mut self.buffer)?;
        let res = self.zip.write_all(&self.buffer);
        self.buffer.clear();
        res
    }
}

impl Archive for ZipArchive {
    fn add(&mut self, name: &str, path: &Utf8Path) -> DistResult<()> {
        self.add_inner(name, path)
            .map_err(|details| DistError::ArchiveAdd {
                path: self.path.clone(),
                name: name.to_owned(),
                details,
            })
    }

    fn close(self: Box<Self>) -> DistResult<()> {
        let ZipArchive { path, mut zip, .. } = *self;
        let res = zip.finish().map_err(io::Error::from).and_then(|mut out| {
            out.flush()?;
            out.get_ref().sync_all()
        });
        res.map_err(|details| DistError::ArchiveClose { path, details })
    }
}

#[cfg(unix)]
fn file_mode(file: &File) -> io::Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    Ok(file.metadata()?.permissions().mode())
}

#[cfg(not(unix))]
fn file_mode(_file: &File) -> io::Result<u32> {
    Ok(0o755)
}
