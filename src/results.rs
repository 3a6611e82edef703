//! Presentable view of a generation result

use serde::Serialize;

use crate::remote::GenerationResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactEntry {
    /// 1-based position in the manifest.
    pub position: usize,
    pub id: String,
    pub content_type: String,
}

impl ArtifactEntry {
    fn new(position: usize, id: &str) -> Self {
        Self {
            position,
            id: id.to_owned(),
            content_type: mime_guess::from_path(id)
                .first_or_octet_stream()
                .essence_str()
                .to_owned(),
        }
    }

    pub fn file_name(&self) -> &str {
        self.id.rsplit(['/', '\\']).next().unwrap_or(&self.id)
    }
}

/// Artifacts for individual preview plus the optional archive for bulk
/// download. Built from a [`GenerationResult`] alone, so the same result
/// always yields the same view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultView {
    pub artifacts: Vec<ArtifactEntry>,
    pub archive: Option<ArtifactEntry>,
}

impl ResultView {
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty() && self.archive.is_none()
    }

    pub fn get(&self, position: usize) -> Option<&ArtifactEntry> {
        position
            .checked_sub(1)
            .and_then(|index| self.artifacts.get(index))
    }
}

impl From<&GenerationResult> for ResultView {
    fn from(result: &GenerationResult) -> Self {
        Self {
            artifacts: result
                .artifacts
                .iter()
                .enumerate()
                .map(|(index, id)| ArtifactEntry::new(index + 1, id))
                .collect(),
            archive: result.archive.as_deref().map(|id| ArtifactEntry::new(1, id)),
        }
    }
}
