use std::fmt;

/// Where a save currently is
///
/// `Idle → Validating → WritingMetadata → UploadingMedia → ReconcilingHints → Done`, with
/// `Errored` reachable from every stage after `Idle` that is not terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveStage {
    Idle,
    Validating,
    WritingMetadata,
    UploadingMedia,
    ReconcilingHints,
    Done,
    Errored,
}

impl SaveStage {
    fn successor(&self) -> Option<SaveStage> {
        match self {
            SaveStage::Idle => Some(SaveStage::Validating),
            SaveStage::Validating => Some(SaveStage::WritingMetadata),
            SaveStage::WritingMetadata => Some(SaveStage::UploadingMedia),
            SaveStage::UploadingMedia => Some(SaveStage::ReconcilingHints),
            SaveStage::ReconcilingHints => Some(SaveStage::Done),
            SaveStage::Done | SaveStage::Errored => None,
        }
    }

    pub fn can_advance_to(&self, next: SaveStage) -> bool {
        if next == SaveStage::Errored {
            return !matches!(self, SaveStage::Idle) && !self.is_terminal();
        }
        self.successor() == Some(next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SaveStage::Done | SaveStage::Errored)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SaveStage::Idle => "idle",
            SaveStage::Validating => "validating",
            SaveStage::WritingMetadata => "writing metadata",
            SaveStage::UploadingMedia => "uploading media",
            SaveStage::ReconcilingHints => "reconciling hints",
            SaveStage::Done => "done",
            SaveStage::Errored => "errored",
        }
    }
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_a_line() {
        let chain = [
            SaveStage::Idle,
            SaveStage::Validating,
            SaveStage::WritingMetadata,
            SaveStage::UploadingMedia,
            SaveStage::ReconcilingHints,
            SaveStage::Done,
        ];
        for pair in chain.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
            assert!(!pair[1].can_advance_to(pair[0]));
        }
        assert!(!SaveStage::Validating.can_advance_to(SaveStage::UploadingMedia));
    }

    #[test]
    fn errored_is_reachable_from_running_stages_only() {
        assert!(!SaveStage::Idle.can_advance_to(SaveStage::Errored));
        assert!(SaveStage::Validating.can_advance_to(SaveStage::Errored));
        assert!(SaveStage::UploadingMedia.can_advance_to(SaveStage::Errored));
        assert!(!SaveStage::Done.can_advance_to(SaveStage::Errored));
        assert!(!SaveStage::Errored.can_advance_to(SaveStage::Errored));
        assert!(SaveStage::Errored.is_terminal());
    }
}
