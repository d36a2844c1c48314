//! Loading and saving whole stage archives.

use kinopio_byml::{Byml, DecodeOptions, EncodeOptions};
use kinopio_common::Endian;
use kinopio_narc::Narc;

use crate::{Error, Result, StageBuilder, StageConfig, StageData, StageFileName};

/// One stage file: its name, the byte order it was stored in, and its objects.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub file_name: StageFileName,
    pub endian: Endian,
    pub data: StageData,
    /// The archive the stage was loaded from. Entries other than the stage
    /// document are written back untouched.
    pub archive: Narc,
}

impl Stage {
    /// Load a stage archive (Yaz0-compressed or plain NARC).
    ///
    /// `file_name` decides the file kind, e.g. `FirstStageMap1.szs`.
    pub fn load_archive(file_name: &str, data: &[u8], config: &StageConfig) -> Result<Self> {
        let file_name = StageFileName::parse(file_name)?;
        let narc = Narc::read(data)?;
        let entry = narc
            .get(&config.stage_entry)
            .ok_or_else(|| Error::MissingEntry(config.stage_entry.clone()))?;

        let options = DecodeOptions {
            encoding: config.encoding,
        };
        let doc = Byml::parse_with(entry, &options)?;
        let data = StageBuilder::new(config.clone()).build(&doc, file_name.kind)?;

        tracing::info!(
            stage = %file_name,
            objects = data.objects.len(),
            rails = data.rails.len(),
            warnings = data.warnings.len(),
            "loaded stage"
        );
        Ok(Self {
            file_name,
            endian: doc.endian(),
            data,
            archive: narc,
        })
    }

    /// Write the stage back into a compressed archive.
    ///
    /// The stage document replaces (or is added as) `config.stage_entry`;
    /// every other entry of [`archive`](Self::archive) is kept.
    pub fn to_archive(&self, config: &StageConfig, level: Option<u8>) -> Result<Vec<u8>> {
        let doc = self.data.to_byml(config, self.endian)?;
        let options = EncodeOptions {
            encoding: config.encoding,
            ..EncodeOptions::default()
        };
        let mut narc = self.archive.clone();
        narc.replace(config.stage_entry.as_str(), doc.to_bytes_with(&options)?);
        Ok(narc.write_compressed(level)?)
    }
}

#[cfg(test)]
mod tests {
    use kinopio_byml::{Dictionary, Node};

    use super::*;
    use crate::{FileKind, ObjKind};

    fn stage_archive(endian: Endian) -> Vec<u8> {
        stage_narc(endian).write_compressed(None).unwrap()
    }

    fn stage_narc(endian: Endian) -> Narc {
        let mut doc = Byml::new(endian, 1);
        let mut record = Dictionary::new();
        record.insert("name".into(), Node::from("Kinopio"));
        record.insert("pos_y".into(), Node::Float(200.0));
        let record = doc.add_dictionary_with(record);
        let list = doc.add_array_with(vec![record]);

        let mut infos = Dictionary::new();
        infos.insert("ObjInfo".into(), list);
        let infos = doc.add_dictionary_with(infos);
        let mut root = Dictionary::new();
        root.insert("AllInfos".into(), infos);
        let root = doc.add_dictionary_with(root);
        doc.set_root(root);

        let mut narc = Narc::new();
        narc.insert("StageData.byml", doc.to_bytes().unwrap()).unwrap();
        narc
    }

    #[test]
    fn test_load_archive() {
        let config = StageConfig::default();
        let stage = Stage::load_archive("StageData/FirstStageDesign1.szs", &stage_archive(Endian::Big), &config).unwrap();

        assert_eq!(stage.file_name.stage, "FirstStage");
        assert_eq!(stage.endian, Endian::Big);
        assert_eq!(stage.data.file_kind, FileKind::Design);
        let obj = &stage.data.objects[0];
        assert_eq!(obj.kind, ObjKind::Regular);
        assert_eq!(obj.base.file_kind, FileKind::Design);
        assert_eq!(obj.name(), Some("Kinopio"));
        let y = obj.base.translation(config.translation_scale).unwrap().y;
        assert!((y - 2.0).abs() < 1e-6);
        assert_eq!(stage.archive.names().collect::<Vec<_>>(), ["StageData.byml"]);
    }

    #[test]
    fn test_archive_round_trip() {
        let config = StageConfig {
            translation_scale: 1.0,
            ..StageConfig::default()
        };
        let stage = Stage::load_archive("FirstStageMap1.szs", &stage_archive(Endian::Little), &config).unwrap();
        let bytes = stage.to_archive(&config, Some(3)).unwrap();
        let reloaded = Stage::load_archive("FirstStageMap1.szs", &bytes, &config).unwrap();
        assert_eq!(reloaded.file_name, stage.file_name);
        assert_eq!(reloaded.endian, stage.endian);
        assert_eq!(reloaded.data, stage.data);
    }

    #[test]
    fn test_other_entries_kept() {
        let config = StageConfig::default();
        let mut narc = stage_narc(Endian::Big);
        narc.insert("CameraParam.byml", vec![1, 2, 3, 4]).unwrap();
        narc.insert("Sound/Bgm.bin", vec![9; 5]).unwrap();
        let bytes = narc.write_compressed(None).unwrap();

        let stage = Stage::load_archive("FirstStageDesign1.szs", &bytes, &config).unwrap();
        let saved = Narc::read(&stage.to_archive(&config, None).unwrap()).unwrap();
        assert_eq!(saved.len(), 3);
        assert_eq!(saved.get("CameraParam.byml"), Some(&[1u8, 2, 3, 4][..]));
        assert_eq!(saved.get("Sound/Bgm.bin"), Some(&[9u8; 5][..]));

        let reloaded = Stage::load_archive("FirstStageDesign1.szs", &saved.write().unwrap(), &config).unwrap();
        assert_eq!(reloaded.data, stage.data);
    }

    #[test]
    fn test_missing_entry() {
        let archive = Narc::new().write().unwrap();
        let err = Stage::load_archive("FirstStageMap1.szs", &archive, &StageConfig::default()).unwrap_err();
        assert!(matches!(err, Error::MissingEntry(name) if name == "StageData.byml"));
    }

    #[test]
    fn test_bad_file_name() {
        let err = Stage::load_archive("readme.txt", &stage_archive(Endian::Big), &StageConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidFileName { .. }));
    }
}
