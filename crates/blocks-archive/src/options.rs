use blocks_fs::{CancelToken, Filter, OctalMode};

#[derive(Clone, Debug, Default)]
pub struct CreateOptions {
    /// Restricts which files are stored; directories are always traversed.
    pub filter: Filter,
    pub cancel: Option<CancelToken>,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExtractOptions {
    /// Mode for directories created during the directory phase.
    pub directory_mode: OctalMode,
    pub cancel: Option<CancelToken>,
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directory_mode(mut self, mode: OctalMode) -> Self {
        self.directory_mode = mode;
        self
    }

    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Outcome of [`ArchiveCodec::create_archive`](crate::ArchiveCodec::create_archive).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub files: usize,
    pub bytes: u64,
}

/// Outcome of [`ArchiveCodec::extract_archive`](crate::ArchiveCodec::extract_archive).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Directories created by the directory phase.
    pub directories: usize,
    pub files: usize,
    /// Platform metadata entries that were ignored.
    pub skipped: usize,
}
