//! One codec module per compression format used by ar/tar members, so the
//! rest of the crate never branches on the format directly.
use crate::error::*;
use std::io::{Read, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Xz,
    /// Legacy "format alone" LZMA stream, as used by old `data.tar.lzma` members.
    LzmaAlone,
    Bzip2,
}

impl Compression {
    /// Guess the compression of an ar/tar member from its trailing extension.
    pub fn from_suffix(name: &str) -> Self {
        if name.ends_with(".gz") {
            Self::Gzip
        } else if name.ends_with(".xz") {
            Self::Xz
        } else if name.ends_with(".lzma") {
            Self::LzmaAlone
        } else if name.ends_with(".bz2") {
            Self::Bzip2
        } else {
            Self::None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Gzip => ".gz",
            Self::Xz => ".xz",
            Self::LzmaAlone => ".lzma",
            Self::Bzip2 => ".bz2",
        }
    }
}

/// Compression level used for the crate's own `build()` output. Chosen to
/// match `xz -6`/`gzip -9`, the defaults used by `dpkg-deb`.
const XZ_PRESET: u32 = 6;

pub fn compress(format: Compression, data: &[u8]) -> DtResult<Vec<u8>> {
    match format {
        Compression::None => Ok(data.to_vec()),
        Compression::Gzip => {
            use flate2::{write::GzEncoder, Compression as GzLevel};
            let mut enc = GzEncoder::new(Vec::new(), GzLevel::best());
            enc.write_all(data)?;
            Ok(enc.finish()?)
        },
        Compression::Xz => {
            let mut enc = xz2::write::XzEncoder::new(Vec::new(), XZ_PRESET);
            enc.write_all(data)?;
            Ok(enc.finish()?)
        },
        Compression::LzmaAlone => {
            let stream = xz2::stream::Stream::new_lzma_encoder(&xz2::stream::LzmaOptions::new_preset(XZ_PRESET).map_err(DebtoolError::LzmaCompressionError)?)
                .map_err(DebtoolError::LzmaCompressionError)?;
            let mut enc = xz2::write::XzEncoder::new_stream(Vec::new(), stream);
            enc.write_all(data)?;
            Ok(enc.finish()?)
        },
        Compression::Bzip2 => Err(DebtoolError::UnsupportedCompression("bzip2 (write)".into())),
    }
}

pub fn decompress(format: Compression, data: &[u8]) -> DtResult<Vec<u8>> {
    match format {
        Compression::None => Ok(data.to_vec()),
        Compression::Gzip => {
            let mut out = Vec::new();
            flate2::read::GzDecoder::new(data).read_to_end(&mut out)?;
            Ok(out)
        },
        Compression::Xz => {
            let mut out = Vec::new();
            xz2::read::XzDecoder::new(data).read_to_end(&mut out)?;
            Ok(out)
        },
        Compression::LzmaAlone => {
            let stream = xz2::stream::Stream::new_lzma_decoder(u64::MAX).map_err(DebtoolError::LzmaCompressionError)?;
            let mut out = Vec::new();
            xz2::read::XzDecoder::new_stream(data, stream).read_to_end(&mut out)?;
            Ok(out)
        },
        Compression::Bzip2 => {
            let mut out = Vec::new();
            bzip2::read::BzDecoder::new(data).read_to_end(&mut out)?;
            Ok(out)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_round_trips() {
        let data = b"hello jailbreak world".repeat(100);
        let c = compress(Compression::Gzip, &data).unwrap();
        assert_eq!(decompress(Compression::Gzip, &c).unwrap(), data);
    }

    #[test]
    fn xz_round_trips() {
        let data = b"hello jailbreak world".repeat(100);
        let c = compress(Compression::Xz, &data).unwrap();
        assert_eq!(decompress(Compression::Xz, &c).unwrap(), data);
    }

    #[test]
    fn lzma_alone_round_trips() {
        let data = b"hello jailbreak world".repeat(100);
        let c = compress(Compression::LzmaAlone, &data).unwrap();
        assert_eq!(decompress(Compression::LzmaAlone, &c).unwrap(), data);
    }

    #[test]
    fn suffix_detection() {
        assert_eq!(Compression::from_suffix("data.tar.gz"), Compression::Gzip);
        assert_eq!(Compression::from_suffix("data.tar.xz"), Compression::Xz);
        assert_eq!(Compression::from_suffix("data.tar.lzma"), Compression::LzmaAlone);
        assert_eq!(Compression::from_suffix("Packages.bz2"), Compression::Bzip2);
        assert_eq!(Compression::from_suffix("data.tar"), Compression::None);
    }
}
