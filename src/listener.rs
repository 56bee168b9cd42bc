use std::error::Error;
use std::io::Write;
use std::path::Path;

/// Every long-running operation reports through this seam instead of
/// writing to stdout/stderr or talking to a UI toolkit directly.
#[cfg_attr(test, mockall::automock)]
pub trait Listener: Send + Sync {
    fn warning(&self, s: String);
    fn info(&self, s: String);

    fn progress(&self, operation: &str, detail: String) {
        self.info(format!("{operation}: {detail}"));
    }

    #[allow(unused_parens)]
    fn error(&self, error: &(dyn Error + 'static)) {
        log::error!("{error}");
    }

    /// Called once a `.deb`/tarball has been fully written to `path`.
    fn generated_archive(&self, path: &Path) {
        log::info!("generated {}", path.display());
    }

    /// Called when an entry is dropped from an archive because its
    /// resolved path would have escaped the extraction directory.
    fn unsafe_path_skipped(&self, member: &str) {
        self.warning(format!("skipped unsafe path in archive: {member}"));
    }
}

pub struct NoOpListener;
impl Listener for NoOpListener {
    fn info(&self, _s: String) {}
    fn warning(&self, _s: String) {}
    fn progress(&self, _op: &str, _s: String) {}
    fn generated_archive(&self, _: &Path) {}
}

pub struct StdErrListener {
    pub verbose: bool,
    pub quiet: bool,
}

impl StdErrListener {
    fn label(&self, label: &str, text: &str) {
        let mut out = std::io::stderr().lock();
        let _ = writeln!(out, "{label}: {text}");
    }
}

impl Listener for StdErrListener {
    fn warning(&self, s: String) {
        if !self.quiet {
            self.label("warning", &s);
        }
    }

    fn info(&self, s: String) {
        if self.verbose {
            self.label("info", &s);
        }
    }

    fn progress(&self, operation: &str, detail: String) {
        if self.verbose {
            let mut out = std::io::stderr().lock();
            let _ = writeln!(out, "{operation:>12} {detail}");
        }
    }
}

pub(crate) struct PrefixedListener<'l>(pub &'l str, pub &'l dyn Listener);
impl Listener for PrefixedListener<'_> {
    fn warning(&self, mut s: String) {
        s.insert_str(0, self.0);
        self.1.warning(s);
    }

    fn error(&self, err: &(dyn Error + 'static)) {
        self.1.error(err);
    }

    fn info(&self, mut s: String) {
        s.insert_str(0, self.0);
        self.1.info(s);
    }

    fn progress(&self, operation: &str, mut s: String) {
        s.insert_str(0, self.0);
        self.1.progress(operation, s);
    }
}
