use crate::golden::GoldenMode;

use std::path::{Path, PathBuf};

/// Embedded metafiles nested deeper than this are reported instead of walked.
pub const DEFAULT_MAX_EMBEDDING_DEPTH: usize = 64;

/// Configuration shared by [`crate::verify`], [`crate::replay`] and the stream walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSettings {
    description: String,
    descend_embedded: bool,
    max_embedding_depth: usize,
    validate_header: bool,
    golden_mode: GoldenMode,
    golden_dir: Option<PathBuf>,
}

impl Default for CheckSettings {
    fn default() -> Self {
        CheckSettings {
            description: String::new(),
            descend_embedded: true,
            max_embedding_depth: DEFAULT_MAX_EMBEDDING_DEPTH,
            validate_header: true,
            golden_mode: GoldenMode::Off,
            golden_dir: None,
        }
    }
}

impl CheckSettings {
    pub fn new() -> Self {
        CheckSettings::default()
    }

    /// Names the run in logs. Also used as the golden file name.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether metafiles embedded as EMF+ image objects are walked as well.
    pub fn descend_embedded(mut self, descend: bool) -> Self {
        self.descend_embedded = descend;
        self
    }

    /// Deepest embedded metafile that is walked; the outer container is depth 0.
    pub fn max_embedding_depth(mut self, depth: usize) -> Self {
        self.max_embedding_depth = depth;
        self
    }

    /// Whether `EMR_HEADER` is checked (signature, `nBytes`, `nRecords`).
    pub fn validate_header(mut self, validate: bool) -> Self {
        self.validate_header = validate;
        self
    }

    pub fn golden_mode(mut self, mode: GoldenMode) -> Self {
        self.golden_mode = mode;
        self
    }

    /// Directory golden metafiles are saved to and loaded from.
    pub fn golden_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.golden_dir = Some(dir.into());
        self
    }

    pub fn golden(self, mode: GoldenMode, dir: impl Into<PathBuf>) -> Self {
        self.golden_mode(mode).golden_dir(dir)
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }

    pub fn should_descend_embedded(&self) -> bool {
        self.descend_embedded
    }

    pub fn get_max_embedding_depth(&self) -> usize {
        self.max_embedding_depth
    }

    pub fn should_validate_header(&self) -> bool {
        self.validate_header
    }

    pub fn get_golden_mode(&self) -> GoldenMode {
        self.golden_mode
    }

    pub fn get_golden_dir(&self) -> Option<&Path> {
        self.golden_dir.as_deref()
    }
}
