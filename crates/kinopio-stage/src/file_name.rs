//! Stage file names: `{StageName}{Design|Map|Sound}{Scenario}.{ext}`.

use std::fmt;

use crate::{Error, FileKind, Result};

/// The parts of a stage file name.
///
/// ```
/// use kinopio_stage::{FileKind, StageFileName};
///
/// let name = StageFileName::parse("StageData/FirstStageMap1.szs").unwrap();
/// assert_eq!(name.stage, "FirstStage");
/// assert_eq!(name.kind, FileKind::Map);
/// assert_eq!(name.scenario, 1);
/// assert_eq!(name.to_string(), "FirstStageMap1.szs");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StageFileName {
    pub stage: String,
    pub kind: FileKind,
    pub scenario: u32,
    pub extension: String,
}

impl StageFileName {
    /// Parse a file name. Leading directories are ignored.
    pub fn parse(path: &str) -> Result<Self> {
        let file_name = path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path);
        let invalid = |reason| Error::InvalidFileName {
            name: file_name.to_string(),
            reason,
        };

        let (stem, extension) = file_name.rsplit_once('.').ok_or_else(|| invalid("missing extension"))?;
        let digits_start = stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let (rest, digits) = stem.split_at(digits_start);
        if digits.is_empty() {
            return Err(invalid("missing scenario number"));
        }
        let scenario = digits.parse().map_err(|_| invalid("scenario number out of range"))?;

        let (stage, kind) = FileKind::ALL
            .iter()
            .find_map(|kind| rest.strip_suffix(kind.as_str()).map(|stage| (stage, *kind)))
            .ok_or_else(|| invalid("expected Design, Map or Sound before the scenario number"))?;
        if stage.is_empty() {
            return Err(invalid("missing stage name"));
        }

        Ok(Self {
            stage: stage.to_string(),
            kind,
            scenario,
            extension: extension.to_string(),
        })
    }

    /// File name of the same stage and scenario for another kind.
    pub fn with_kind(&self, kind: FileKind) -> Self {
        Self { kind, ..self.clone() }
    }
}

impl fmt::Display for StageFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}.{}", self.stage, self.kind, self.scenario, self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        let name = StageFileName::parse("EnterCatMarioStageDesign12.szs").unwrap();
        assert_eq!(name.stage, "EnterCatMarioStage");
        assert_eq!(name.kind, FileKind::Design);
        assert_eq!(name.scenario, 12);
        assert_eq!(name.extension, "szs");

        let sound = name.with_kind(FileKind::Sound);
        assert_eq!(sound.to_string(), "EnterCatMarioStageSound12.szs");
    }

    #[test]
    fn test_stage_name_may_contain_kind_word() {
        let name = StageFileName::parse("WorldMapStageMap1.szs").unwrap();
        assert_eq!(name.stage, "WorldMapStage");
        assert_eq!(name.kind, FileKind::Map);
    }

    #[test]
    fn test_invalid_names() {
        for name in ["FirstStageMap1", "FirstStageMap.szs", "FirstStage1.szs", "Map1.szs"] {
            assert!(
                matches!(StageFileName::parse(name), Err(Error::InvalidFileName { .. })),
                "{}",
                name
            );
        }
    }
}
