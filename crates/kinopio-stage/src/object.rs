//! Typed stage objects.

use std::fmt;

use crate::property::{Properties, Property};

/// A position, rotation or scale.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Multiply every component by `factor`.
    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

/// The `x`/`y`/`z` keys of one vector exactly as stored.
///
/// Each component is `None` when its key was absent, so a record keeps the
/// same keys and bit patterns when written back.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StoredVector {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
}

impl StoredVector {
    pub const EMPTY: Self = Self {
        x: None,
        y: None,
        z: None,
    };

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none()
    }

    pub fn components(&self) -> [Option<f32>; 3] {
        [self.x, self.y, self.z]
    }

    /// The vector with missing components set to `default`, or `None` if
    /// every component is missing.
    pub fn resolve(&self, default: f32) -> Option<Vector3> {
        if self.is_empty() {
            return None;
        }
        Some(Vector3::new(
            self.x.unwrap_or(default),
            self.y.unwrap_or(default),
            self.z.unwrap_or(default),
        ))
    }
}

impl From<Vector3> for StoredVector {
    fn from(vector: Vector3) -> Self {
        Self {
            x: Some(vector.x),
            y: Some(vector.y),
            z: Some(vector.z),
        }
    }
}

/// Divide by a translation scale, leaving the value alone for a zero scale.
fn unscale(vector: Vector3, factor: f32) -> Vector3 {
    if factor == 0.0 {
        return vector;
    }
    vector.scaled(1.0 / factor)
}

/// Which of a stage's three files an object was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Design,
    Map,
    Sound,
}

impl FileKind {
    pub const ALL: [FileKind; 3] = [FileKind::Design, FileKind::Map, FileKind::Sound];

    /// Suffix used in stage file names.
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Design => "Design",
            FileKind::Map => "Map",
            FileKind::Sound => "Sound",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjKind {
    Area,
    CameraArea,
    Goal,
    Regular,
    StartEvent,
    Start,
    DemoScene,
    Rail,
}

/// `AllInfos` keys and the object kinds they hold.
const INFO_KEYS: [(&str, ObjKind); 7] = [
    ("AreaObjInfo", ObjKind::Area),
    ("CameraAreaInfo", ObjKind::CameraArea),
    ("GoalObjInfo", ObjKind::Goal),
    ("ObjInfo", ObjKind::Regular),
    ("StartEventObjInfo", ObjKind::StartEvent),
    ("StartInfo", ObjKind::Start),
    ("DemoSceneObjInfo", ObjKind::DemoScene),
];

impl ObjKind {
    /// Kind stored under an `AllInfos` key.
    pub fn from_info_key(key: &str) -> Option<Self> {
        INFO_KEYS.iter().find(|(name, _)| *name == key).map(|(_, kind)| *kind)
    }

    /// The `AllInfos` key for this kind. Rails live under `AllRailInfos`.
    pub fn info_key(self) -> Option<&'static str> {
        INFO_KEYS.iter().find(|(_, kind)| *kind == self).map(|(name, _)| *name)
    }

    /// Areas carry a priority, a shape and parent links.
    pub fn is_area_like(self) -> bool {
        matches!(self, ObjKind::Area | ObjKind::CameraArea)
    }

    pub fn has_switches(self) -> bool {
        !matches!(self, ObjKind::Start | ObjKind::Rail)
    }
}

/// Index into [`StageData::rails`](crate::StageData::rails).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RailId(pub usize);

/// How a child hangs off its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildLink {
    /// Listed under the parent's `AreaChildren`.
    Area,
    /// Listed under the parent's `GenerateChildren`.
    Generate,
}

impl ChildLink {
    pub fn key(self) -> &'static str {
        match self {
            ChildLink::Area => "AreaChildren",
            ChildLink::Generate => "GenerateChildren",
        }
    }
}

/// Fields shared by every placed object, rails included.
///
/// Every field is optional so that keys absent from the source stay absent
/// when the stage is written back.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjBase {
    pub file_kind: FileKind,
    pub name: Option<String>,
    pub layer: Option<String>,
    pub link_id: Option<i32>,
    /// `pos_*`, unscaled.
    pub pos: StoredVector,
    /// `dir_*`.
    pub dir: StoredVector,
    /// `scale_*`.
    pub scale: StoredVector,
    /// Every key the model does not claim, verbatim.
    pub properties: Properties,
}

impl ObjBase {
    pub fn new(file_kind: FileKind) -> Self {
        Self {
            file_kind,
            name: None,
            layer: None,
            link_id: None,
            pos: StoredVector::EMPTY,
            dir: StoredVector::EMPTY,
            scale: StoredVector::EMPTY,
            properties: Properties::new(),
        }
    }

    /// Position multiplied by `factor`, usually
    /// [`StageConfig::translation_scale`](crate::StageConfig::translation_scale).
    pub fn translation(&self, factor: f32) -> Option<Vector3> {
        self.pos.resolve(0.0).map(|pos| pos.scaled(factor))
    }

    /// Store a position given in the same units [`translation`](Self::translation) returns.
    pub fn set_translation(&mut self, translation: Vector3, factor: f32) {
        self.pos = unscale(translation, factor).into();
    }

    pub fn rotation(&self) -> Option<Vector3> {
        self.dir.resolve(0.0)
    }

    pub fn scaling(&self) -> Option<Vector3> {
        self.scale.resolve(1.0)
    }
}

/// Switch ids an object listens on or fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Switches {
    pub a: Option<i32>,
    pub b: Option<i32>,
    pub appear: Option<i32>,
    pub dead_on: Option<i32>,
    pub kill: Option<i32>,
}

impl Switches {
    pub(crate) const KEYS: [&'static str; 5] = ["SwitchA", "SwitchB", "SwitchAppear", "SwitchDeadOn", "SwitchKill"];

    pub(crate) fn slots_mut(&mut self) -> [&mut Option<i32>; 5] {
        [&mut self.a, &mut self.b, &mut self.appear, &mut self.dead_on, &mut self.kill]
    }

    pub(crate) fn slots(&self) -> [Option<i32>; 5] {
        [self.a, self.b, self.appear, self.dead_on, self.kill]
    }
}

/// Fields only areas have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AreaFields {
    pub priority: Option<i32>,
    pub shape_model_no: Option<i32>,
    /// `AreaParent` when stored as a plain id.
    pub area_parent: Option<i32>,
    /// `GenerateParent` when stored as a plain id.
    pub generate_parent: Option<i32>,
}

/// Number of `Arg*` slots.
pub const ARG_COUNT: usize = 8;

/// A placed object other than a rail.
#[derive(Debug, Clone, PartialEq)]
pub struct StageObj {
    pub kind: ObjKind,
    pub base: ObjBase,
    pub args: [Option<i32>; ARG_COUNT],
    pub switches: Switches,
    pub view_id: Option<i32>,
    pub camera_id: Option<i32>,
    pub clipping_group_id: Option<i32>,
    /// Present for area-like kinds only.
    pub area: Option<AreaFields>,
    pub rail: Option<RailId>,
    /// Set on objects listed in a parent's child array.
    pub link: Option<ChildLink>,
    pub area_children: Vec<StageObj>,
    pub generate_children: Vec<StageObj>,
}

impl StageObj {
    pub fn new(kind: ObjKind, file_kind: FileKind) -> Self {
        Self {
            kind,
            base: ObjBase::new(file_kind),
            args: [None; ARG_COUNT],
            switches: Switches::default(),
            view_id: None,
            camera_id: None,
            clipping_group_id: None,
            area: kind.is_area_like().then(AreaFields::default),
            rail: None,
            link: None,
            area_children: Vec::new(),
            generate_children: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.base.name.as_deref()
    }

    /// `Arg{index}`, or -1 when unset.
    pub fn arg(&self, index: usize) -> i32 {
        self.args.get(index).copied().flatten().unwrap_or(-1)
    }

    /// Parent id from `AreaParent`, whether stored as an id or an embedded record.
    pub fn area_parent_id(&self) -> Option<i32> {
        self.parent_id("AreaParent", |area| area.area_parent)
    }

    /// Parent id from `GenerateParent`, whether stored as an id or an embedded record.
    pub fn generate_parent_id(&self) -> Option<i32> {
        self.parent_id("GenerateParent", |area| area.generate_parent)
    }

    fn parent_id(&self, key: &str, typed: impl Fn(&AreaFields) -> Option<i32>) -> Option<i32> {
        self.area.as_ref().and_then(typed).or_else(|| {
            self.base
                .properties
                .get(key)
                .and_then(Property::as_map)
                .and_then(|record| record.get("l_id"))
                .and_then(Property::as_i32)
        })
    }

    /// Children of both relations, area children first.
    pub fn children(&self) -> impl Iterator<Item = &StageObj> {
        self.area_children.iter().chain(&self.generate_children)
    }
}

/// Point interpolation of a rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointType {
    Linear,
    Bezier,
}

impl PointType {
    pub fn as_str(self) -> &'static str {
        match self {
            PointType::Linear => "Linear",
            PointType::Bezier => "Bezier",
        }
    }
}

/// Geometry of one rail point: `pnt0_*`, plus `pnt1_*` and `pnt2_*` for bezier rails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointShape {
    Linear(StoredVector),
    Bezier {
        point: StoredVector,
        control1: StoredVector,
        control2: StoredVector,
    },
}

/// A rail control point. Coordinates are stored unscaled.
#[derive(Debug, Clone, PartialEq)]
pub struct RailPoint {
    pub shape: PointShape,
    pub properties: Properties,
}

impl RailPoint {
    fn stored_point(&self) -> Vector3 {
        match self.shape {
            PointShape::Linear(point) | PointShape::Bezier { point, .. } => point.resolve(0.0).unwrap_or(Vector3::ZERO),
        }
    }

    /// Point position multiplied by `factor`.
    pub fn position(&self, factor: f32) -> Vector3 {
        self.stored_point().scaled(factor)
    }

    /// Bezier control points multiplied by `factor`. A control point with
    /// no stored components sits on the point itself.
    pub fn controls(&self, factor: f32) -> Option<(Vector3, Vector3)> {
        let PointShape::Bezier { control1, control2, .. } = self.shape else {
            return None;
        };
        let point = self.stored_point();
        let control = |stored: StoredVector| stored.resolve(0.0).unwrap_or(point).scaled(factor);
        Some((control(control1), control(control2)))
    }
}

/// A path other objects follow.
#[derive(Debug, Clone, PartialEq)]
pub struct RailObj {
    pub base: ObjBase,
    /// `IsClosed`; `Some(true)` for `"CLOSE"`.
    pub closed: Option<bool>,
    pub rail_no: Option<i32>,
    /// `Type`; anything but `"Bezier"` reads as linear.
    pub point_type: Option<PointType>,
    /// `Num_Pnt` as stored. May disagree with `points.len()`.
    pub declared_points: Option<i32>,
    pub points: Vec<RailPoint>,
}

impl RailObj {
    pub fn new(file_kind: FileKind) -> Self {
        Self {
            base: ObjBase::new(file_kind),
            closed: None,
            rail_no: None,
            point_type: None,
            declared_points: None,
            points: Vec::new(),
        }
    }

    pub fn kind(&self) -> ObjKind {
        ObjKind::Rail
    }

    pub fn is_closed(&self) -> bool {
        self.closed.unwrap_or(false)
    }

    pub fn is_bezier(&self) -> bool {
        self.point_type == Some(PointType::Bezier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_key_table() {
        for (key, kind) in INFO_KEYS {
            assert_eq!(ObjKind::from_info_key(key), Some(kind));
            assert_eq!(kind.info_key(), Some(key));
        }
        assert_eq!(ObjKind::from_info_key("MapPartsInfo"), None);
        assert_eq!(ObjKind::Rail.info_key(), None);
    }

    #[test]
    fn test_arg_sentinel() {
        let mut obj = StageObj::new(ObjKind::Regular, FileKind::Map);
        obj.args[2] = Some(5);
        assert_eq!(obj.arg(2), 5);
        assert_eq!(obj.arg(0), -1);
        assert_eq!(obj.arg(100), -1);
        assert!(obj.area.is_none());
        assert!(StageObj::new(ObjKind::CameraArea, FileKind::Map).area.is_some());
    }

    #[test]
    fn test_stored_vector_defaults() {
        let mut base = ObjBase::new(FileKind::Map);
        assert_eq!(base.translation(0.01), None);
        assert_eq!(base.scaling(), None);

        base.pos.y = Some(200.0);
        base.scale.x = Some(2.0);
        assert_eq!(base.translation(0.5), Some(Vector3::new(0.0, 100.0, 0.0)));
        assert_eq!(base.scaling(), Some(Vector3::new(2.0, 1.0, 1.0)));

        base.set_translation(Vector3::new(1.0, -2.0, 0.0), 0.5);
        assert_eq!(base.pos.components(), [Some(2.0), Some(-4.0), Some(0.0)]);
        base.set_translation(Vector3::ONE, 0.0);
        assert_eq!(base.pos, StoredVector::from(Vector3::ONE));
    }

    #[test]
    fn test_point_controls_default_to_point() {
        let point = RailPoint {
            shape: PointShape::Bezier {
                point: Vector3::new(100.0, 0.0, 0.0).into(),
                control1: StoredVector {
                    y: Some(50.0),
                    ..StoredVector::EMPTY
                },
                control2: StoredVector::EMPTY,
            },
            properties: Properties::new(),
        };
        assert_eq!(point.position(0.5), Vector3::new(50.0, 0.0, 0.0));
        let (control1, control2) = point.controls(0.5).unwrap();
        assert_eq!(control1, Vector3::new(0.0, 25.0, 0.0));
        assert_eq!(control2, Vector3::new(50.0, 0.0, 0.0));

        let linear = RailPoint {
            shape: PointShape::Linear(StoredVector::EMPTY),
            properties: Properties::new(),
        };
        assert_eq!(linear.position(1.0), Vector3::ZERO);
        assert_eq!(linear.controls(1.0), None);
    }

    #[test]
    fn test_parent_from_embedded_record() {
        let mut obj = StageObj::new(ObjKind::Area, FileKind::Design);
        let mut parent = Properties::new();
        parent.insert("l_id".into(), Property::Int(12));
        obj.base.properties.insert("AreaParent".into(), Property::Map(parent));
        assert_eq!(obj.area_parent_id(), Some(12));

        obj.area.as_mut().unwrap().generate_parent = Some(3);
        assert_eq!(obj.generate_parent_id(), Some(3));
    }
}
