//! Stage object graph.
//!
//! A stage file is a compressed archive whose `StageData.byml` lists rails
//! under `AllRailInfos` and placed objects under `AllInfos`, one array per
//! object category. [`StageBuilder`] turns that document into typed
//! [`StageObj`]s and [`RailObj`]s:
//!
//! - Fields the model knows are parsed into typed, optional fields.
//! - Everything else is kept verbatim in each object's `properties`.
//! - Objects refer to rails by embedding the rail's own record. The builder
//!   resolves those by container identity, not by content.
//! - Inconsistencies that do not prevent loading are collected as
//!   [`StageWarning`]s.
//!
//! [`StageData::to_byml`] performs the reverse.

mod builder;
mod class_table;
mod error;
mod file_name;
mod object;
mod property;
mod stage;
mod write;

pub use builder::{StageBuilder, StageConfig, StageData};
pub use class_table::{ClassNameTable, CLASS_TABLE_ENTRY, CLASS_TABLE_PATH};
pub use error::{Error, Result, StageWarning};
pub use file_name::StageFileName;
pub use object::{
    AreaFields, ChildLink, FileKind, ObjBase, ObjKind, PointShape, PointType, RailId, RailObj, RailPoint, StageObj,
    StoredVector, Switches, Vector3, ARG_COUNT,
};
pub use property::{Properties, Property};
pub use stage::Stage;
