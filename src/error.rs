use quick_error::quick_error;
use std::{fmt, io, time};

quick_error! {
    #[derive(Debug)]
    #[non_exhaustive]
    pub enum DebtoolError {
        Io(err: io::Error) {
            from()
            display("I/O error: {}", err)
            source(err)
        }
        MalformedContainer(msg: &'static str) {
            display("Malformed ar container: {msg}")
        }
        UnsupportedCompression(name: String) {
            display("Unsupported compression format: {name}")
        }
        MissingMember(name: &'static str) {
            display("Archive is missing required member: {name}")
        }
        MissingRequiredField(field: &'static str) {
            display("Control stanza is missing required field: {field}")
        }
        VerifyFailed(msg: String) {
            display("Archive verification failed: {msg}")
        }
        Network(err: reqwest::Error) {
            from()
            display("Network error: {err}")
            source(err)
        }
        CacheMiss {
            display("Cache entry not present or expired")
        }
        CacheCorrupt(msg: String) {
            display("Cache entry is corrupt: {msg}")
        }
        Cancelled {
            display("Operation was cancelled")
        }
        ParseJSON(err: serde_json::Error) {
            from()
            display("Unable to parse JSON: {err}")
            source(err)
        }
        LzmaCompressionError(err: xz2::stream::Error) {
            display("Lzma/xz compression error: {err:?}")
        }
        SystemTime(err: time::SystemTimeError) {
            from()
            display("Unable to get system time: {err}")
            source(err)
        }
        Str(msg: &'static str) {
            display("{msg}")
            from()
        }
        Context(msg: String, err: Box<DebtoolError>) {
            display("{msg}")
            source(err)
        }
    }
}

impl DebtoolError {
    pub(crate) fn context(self, msg: impl fmt::Display) -> Self {
        Self::Context(msg.to_string(), Box::new(self))
    }
}

impl From<fmt::Error> for DebtoolError {
    fn from(_: fmt::Error) -> Self {
        Self::Str("fmt")
    }
}

pub type DtResult<T> = Result<T, DebtoolError>;
