//! Kinopio - platformer stage file library.
//!
//! This crate provides a unified interface to the Kinopio crates for
//! reading and writing stage assets.
//!
//! # Crates
//!
//! - [`kinopio_common`] - Common utilities (endian-aware binary reading and writing)
//! - [`kinopio_yaz0`] - Yaz0 compression
//! - [`kinopio_narc`] - NARC archives and the actor archive cache
//! - [`kinopio_byml`] - BYML binary trees
//! - [`kinopio_stage`] - Typed stage object graph
//!
//! # Example
//!
//! ```no_run
//! use kinopio::prelude::*;
//!
//! let data = std::fs::read("StageData/FirstStageMap1.szs")?;
//! let stage = Stage::load_archive("FirstStageMap1.szs", &data, &StageConfig::default())?;
//! for obj in &stage.data.objects {
//!     println!("{:?} {:?}", obj.kind, obj.name());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use kinopio_byml as byml;
pub use kinopio_common as common;
pub use kinopio_narc as narc;
pub use kinopio_stage as stage;
pub use kinopio_yaz0 as yaz0;

#[cfg(feature = "parallel")]
pub mod batch;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use kinopio_byml::{Byml, DecodeOptions, EncodeOptions, Node, NodeId, TextEncoding};
    pub use kinopio_common::{BinaryReader, BinaryWriter, Endian};
    pub use kinopio_narc::{ActorCache, Narc, NarcEntry};
    pub use kinopio_stage::{
        ClassNameTable, FileKind, ObjKind, Property, RailObj, Stage, StageBuilder, StageConfig, StageData,
        StageFileName, StageObj, StageWarning,
    };
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use kinopio_byml::Dictionary;

    /// Stage graph to byml to narc to Yaz0 and back.
    #[test]
    fn test_full_pipeline() {
        let mut doc = Byml::new(Endian::Big, 1);
        let mut record = Dictionary::new();
        record.insert("name".into(), Node::from("Goomba"));
        record.insert("pos_x".into(), Node::Float(100.0));
        record.insert("ExtraField".into(), Node::Int(42));
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
        let compressed = narc.write_compressed(Some(6)).unwrap();
        assert!(crate::yaz0::is_yaz0(&compressed));

        let config = StageConfig::default();
        let stage = Stage::load_archive("FirstStageMap1.szs", &compressed, &config).unwrap();
        let obj = &stage.data.objects[0];
        assert_eq!(obj.name(), Some("Goomba"));
        assert_eq!(obj.base.properties["ExtraField"], Property::Int(42));

        let saved = stage.to_archive(&config, None).unwrap();
        let archive = Narc::read(&saved).unwrap();
        let written = Byml::parse(archive.get("StageData.byml").unwrap()).unwrap();
        let infos = written.dictionary(&written.root_dictionary().unwrap()["AllInfos"]).unwrap();
        let records = written.array(&infos["ObjInfo"]).unwrap();
        let record = written.dictionary(&records[0]).unwrap();
        assert_eq!(record["ExtraField"], Node::Int(42));
        assert_eq!(record["name"].as_str(), Some("Goomba"));
        assert_eq!(record["pos_x"], Node::Float(100.0));
        assert!(!record.contains_key("pos_y"));
    }
}
