//! Building the object graph from a decoded `StageData.byml`.

use std::hash::BuildHasherDefault;

use hashbrown::{HashMap, HashSet};
use kinopio_byml::{Byml, Dictionary, Node, NodeId, TextEncoding};
use rustc_hash::FxHasher;

use crate::object::{
    ChildLink, FileKind, ObjBase, ObjKind, PointShape, PointType, RailId, RailObj, RailPoint, StageObj, StoredVector,
    Switches, ARG_COUNT,
};
use crate::property::{expansion_budget, Properties, Property};
use crate::{Error, Result, StageWarning};

type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;
type FxHashSet<T> = HashSet<T, BuildHasherDefault<FxHasher>>;

const MAX_DEPTH: usize = 256;

pub(crate) const ARG_KEYS: [&str; ARG_COUNT] = ["Arg0", "Arg1", "Arg2", "Arg3", "Arg4", "Arg5", "Arg6", "Arg7"];

/// Stage loading and writing options.
#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    /// Factor between stored `pos_*` and rail point coordinates and the
    /// values [`ObjBase::translation`] and [`RailPoint::position`] return.
    pub translation_scale: f32,
    /// Archive entry holding the stage document.
    pub stage_entry: String,
    /// Text encoding of the stage document.
    pub encoding: TextEncoding,
    /// BYML version used when writing.
    pub byml_version: u16,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            translation_scale: 0.01,
            stage_entry: "StageData.byml".to_string(),
            encoding: TextEncoding::ShiftJis,
            byml_version: 1,
        }
    }
}

/// The objects of one stage file.
#[derive(Debug, Clone, PartialEq)]
pub struct StageData {
    pub file_kind: FileKind,
    /// `AllRailInfos.RailInfo` in order. [`RailId`]s index this list.
    pub rails: Vec<RailObj>,
    /// Top-level objects in `AllInfos` order.
    pub objects: Vec<StageObj>,
    /// `AllInfos` categories present in the source, empty ones included.
    pub categories: Vec<ObjKind>,
    /// Whether the source had an `AllRailInfos` entry.
    pub has_rail_infos: bool,
    /// Root keys other than `AllInfos` and `AllRailInfos`.
    pub root_properties: Properties,
    pub warnings: Vec<StageWarning>,
}

impl StageData {
    pub fn new(file_kind: FileKind) -> Self {
        Self {
            file_kind,
            rails: Vec::new(),
            objects: Vec::new(),
            categories: Vec::new(),
            has_rail_infos: false,
            root_properties: Properties::new(),
            warnings: Vec::new(),
        }
    }

    pub fn rail(&self, id: RailId) -> Option<&RailObj> {
        self.rails.get(id.0)
    }

    /// Top-level objects of one kind.
    pub fn objects_of(&self, kind: ObjKind) -> impl Iterator<Item = &StageObj> {
        self.objects.iter().filter(move |obj| obj.kind == kind)
    }

    /// Every object including children, depth first.
    pub fn all_objects(&self) -> Vec<&StageObj> {
        let mut out = Vec::new();
        let mut stack: Vec<&StageObj> = self.objects.iter().rev().collect();
        while let Some(obj) = stack.pop() {
            out.push(obj);
            let children: Vec<&StageObj> = obj.children().collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }
}

/// Turns stage documents into [`StageData`].
///
/// # Example
///
/// ```no_run
/// use kinopio_byml::Byml;
/// use kinopio_stage::{FileKind, StageBuilder, StageConfig};
///
/// let doc = Byml::parse(&std::fs::read("StageData.byml")?)?;
/// let stage = StageBuilder::new(StageConfig::default()).build(&doc, FileKind::Map)?;
/// for obj in &stage.objects {
///     println!("{:?} {:?}", obj.kind, obj.name());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct StageBuilder {
    config: StageConfig,
}

impl StageBuilder {
    pub fn new(config: StageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Build the objects of `byml`, read from a file of kind `file_kind`.
    pub fn build(&self, byml: &Byml, file_kind: FileKind) -> Result<StageData> {
        let root = byml.root_dictionary().map_err(|err| match err {
            kinopio_byml::Error::MalformedStage(reason) => Error::MalformedStage(reason),
            other => Error::Byml(other),
        })?;

        let mut ctx = Context {
            doc: byml,
            file_kind,
            rail_ids: FxHashMap::default(),
            records: FxHashMap::default(),
            budget: expansion_budget(byml),
            warnings: Vec::new(),
        };
        let mut data = StageData::new(file_kind);

        // Rails first: records refer to them and sort before them.
        if let Some(value) = root.get("AllRailInfos") {
            data.has_rail_infos = true;
            if !ctx.read_rail_infos(value, &mut data)? {
                let value = ctx.copy_out(value)?;
                data.root_properties.insert("AllRailInfos".to_string(), value);
            }
        }

        for (key, value) in root {
            match key.as_str() {
                "AllRailInfos" => {}
                "AllInfos" => {
                    if !ctx.read_all_infos(value, &mut data)? {
                        data.root_properties.insert(key.clone(), ctx.copy_out(value)?);
                    }
                }
                _ => {
                    data.root_properties.insert(key.clone(), ctx.copy_out(value)?);
                }
            }
        }

        data.warnings = ctx.warnings;
        tracing::debug!(
            %file_kind,
            rails = data.rails.len(),
            objects = data.objects.len(),
            warnings = data.warnings.len(),
            "built stage data"
        );
        Ok(data)
    }
}

/// Keys of one record, tracking which ones the model has taken.
struct Fields<'a> {
    path: String,
    entries: &'a Dictionary,
    claimed: FxHashSet<&'a str>,
}

impl<'a> Fields<'a> {
    fn new(path: String, entries: &'a Dictionary) -> Self {
        Self {
            path,
            entries,
            claimed: FxHashSet::default(),
        }
    }

    fn peek(&self, key: &str) -> Option<&'a Node> {
        self.entries.get(key)
    }

    fn claim(&mut self, key: &str) {
        if let Some((key, _)) = self.entries.get_key_value(key) {
            self.claimed.insert(key.as_str());
        }
    }
}

struct Context<'a> {
    doc: &'a Byml,
    file_kind: FileKind,
    /// Rail record container to the rail built from it.
    rail_ids: FxHashMap<NodeId, RailId>,
    /// Object record container to the number of times it was built.
    records: FxHashMap<NodeId, usize>,
    /// Values left to build or copy before the document counts as malformed.
    budget: usize,
    warnings: Vec<StageWarning>,
}

impl<'a> Context<'a> {
    fn warn(&mut self, path: &str, reason: String) {
        tracing::warn!(path, %reason, "stage data inconsistent");
        self.warnings.push(StageWarning::StageDataInconsistent {
            path: path.to_string(),
            reason,
        });
    }

    fn mismatch(&mut self, path: &str, key: &str, node: &Node, expected: &str) {
        self.warn(
            path,
            format!("{} is {:?}, expected {}", key, node.node_type(), expected),
        );
    }

    fn spend(&mut self, path: &str, cost: usize) -> Result<()> {
        self.budget = self.budget.checked_sub(cost).ok_or_else(|| {
            Error::MalformedStage(format!("{}: shared containers expand past the document size", path))
        })?;
        Ok(())
    }

    fn copy_out(&mut self, node: &Node) -> Result<Property> {
        Property::from_node_within(self.doc, node, &mut self.budget)
    }

    /// Returns `false` if the value is not a dictionary and was left alone.
    fn read_rail_infos(&mut self, value: &'a Node, data: &mut StageData) -> Result<bool> {
        let Some(entries) = self.doc.dictionary(value) else {
            self.mismatch("", "AllRailInfos", value, "a dictionary");
            return Ok(false);
        };
        let Some(list) = entries.get("RailInfo") else {
            return Ok(true);
        };
        let Some(items) = self.doc.array(list) else {
            self.mismatch("AllRailInfos", "RailInfo", list, "an array");
            return Ok(true);
        };

        for (i, item) in items.iter().enumerate() {
            let path = format!("AllRailInfos/RailInfo[{}]", i);
            if let Some(rail) = self.build_rail(item, path)? {
                if let Node::Dictionary(id) = item {
                    self.rail_ids.entry(*id).or_insert(RailId(data.rails.len()));
                }
                data.rails.push(rail);
            }
        }
        Ok(true)
    }

    fn read_all_infos(&mut self, value: &'a Node, data: &mut StageData) -> Result<bool> {
        let Some(categories) = self.doc.dictionary(value) else {
            self.mismatch("", "AllInfos", value, "a dictionary");
            return Ok(false);
        };

        for (key, list) in categories {
            let kind = ObjKind::from_info_key(key).ok_or_else(|| Error::UnknownStageObjType(key.clone()))?;
            data.categories.push(kind);

            let Some(records) = self.doc.array(list) else {
                self.mismatch("AllInfos", key, list, "an array");
                continue;
            };
            for (i, record) in records.iter().enumerate() {
                let path = format!("AllInfos/{}[{}]", key, i);
                if let Some(obj) = self.build_object(kind, record, path, None, 0)? {
                    data.objects.push(obj);
                }
            }
        }
        Ok(true)
    }

    // Typed fields claim only the node type the writer emits. Other types
    // stay in properties.

    fn read_i32(&mut self, fields: &mut Fields<'a>, key: &str) -> Option<i32> {
        let node = fields.peek(key)?;
        match *node {
            Node::Int(value) => {
                fields.claim(key);
                Some(value)
            }
            _ => {
                self.mismatch(&fields.path, key, node, "an Int");
                None
            }
        }
    }

    fn read_f32(&mut self, fields: &mut Fields<'a>, key: &str) -> Option<f32> {
        let node = fields.peek(key)?;
        match *node {
            Node::Float(value) => {
                fields.claim(key);
                Some(value)
            }
            _ => {
                self.mismatch(&fields.path, key, node, "a Float");
                None
            }
        }
    }

    fn read_string(&mut self, fields: &mut Fields<'a>, key: &str) -> Option<String> {
        let node = fields.peek(key)?;
        match node.as_str() {
            Some(value) => {
                fields.claim(key);
                Some(value.to_string())
            }
            None => {
                self.mismatch(&fields.path, key, node, "a string");
                None
            }
        }
    }

    /// `{prefix}x`, `{prefix}y`, `{prefix}z` as stored.
    fn read_vector(&mut self, fields: &mut Fields<'a>, prefix: &str) -> StoredVector {
        StoredVector {
            x: self.read_f32(fields, &format!("{}x", prefix)),
            y: self.read_f32(fields, &format!("{}y", prefix)),
            z: self.read_f32(fields, &format!("{}z", prefix)),
        }
    }

    fn read_base(&mut self, fields: &mut Fields<'a>) -> ObjBase {
        ObjBase {
            file_kind: self.file_kind,
            name: self.read_string(fields, "name"),
            layer: self.read_string(fields, "LayerName"),
            link_id: self.read_i32(fields, "l_id"),
            pos: self.read_vector(fields, "pos_"),
            dir: self.read_vector(fields, "dir_"),
            scale: self.read_vector(fields, "scale_"),
            properties: Properties::new(),
        }
    }

    /// Everything not claimed, copied out of the document.
    fn leftovers(&mut self, fields: Fields<'a>) -> Result<Properties> {
        let mut properties = Properties::new();
        for (key, value) in fields.entries {
            if !fields.claimed.contains(key.as_str()) {
                properties.insert(key.clone(), self.copy_out(value)?);
            }
        }
        Ok(properties)
    }

    /// Look up a non-empty array field. Null and empty arrays are left unclaimed.
    fn read_list(&mut self, fields: &Fields<'a>, key: &str) -> Option<&'a [Node]> {
        let node = fields.peek(key)?;
        match self.doc.array(node) {
            Some(items) if !items.is_empty() => Some(items),
            Some(_) => None,
            None => {
                if !node.is_null() {
                    self.mismatch(&fields.path, key, node, "an array");
                }
                None
            }
        }
    }

    fn build_rail(&mut self, node: &'a Node, path: String) -> Result<Option<RailObj>> {
        let Some(entries) = self.doc.dictionary(node) else {
            self.warn(&path, format!("rail record is {:?}, expected a dictionary", node.node_type()));
            return Ok(None);
        };
        let mut fields = Fields::new(path, entries);

        let mut rail = RailObj::new(self.file_kind);
        rail.base = self.read_base(&mut fields);
        rail.closed = self.read_string(&mut fields, "IsClosed").map(|value| value == "CLOSE");
        rail.rail_no = self.read_i32(&mut fields, "RailNo");
        rail.point_type = self.read_string(&mut fields, "Type").map(|value| {
            if value == "Bezier" {
                PointType::Bezier
            } else {
                PointType::Linear
            }
        });
        rail.declared_points = self.read_i32(&mut fields, "Num_Pnt");

        if let Some(items) = self.read_list(&fields, "Points") {
            fields.claim("Points");
            for (i, item) in items.iter().enumerate() {
                let path = format!("{}/Points[{}]", fields.path, i);
                if let Some(point) = self.build_point(item, path, rail.is_bezier())? {
                    rail.points.push(point);
                }
            }
        }

        if let Some(declared) = rail.declared_points {
            if usize::try_from(declared).ok() != Some(rail.points.len()) {
                let reason = format!("Num_Pnt is {} but the rail has {} points", declared, rail.points.len());
                self.warn(&fields.path, reason);
            }
        }

        rail.base.properties = self.leftovers(fields)?;
        Ok(Some(rail))
    }

    fn build_point(&mut self, node: &'a Node, path: String, bezier: bool) -> Result<Option<RailPoint>> {
        let Some(entries) = self.doc.dictionary(node) else {
            self.warn(&path, format!("rail point is {:?}, expected a dictionary", node.node_type()));
            return Ok(None);
        };
        let mut fields = Fields::new(path, entries);

        let point = self.read_vector(&mut fields, "pnt0_");
        let shape = if bezier {
            PointShape::Bezier {
                point,
                control1: self.read_vector(&mut fields, "pnt1_"),
                control2: self.read_vector(&mut fields, "pnt2_"),
            }
        } else {
            PointShape::Linear(point)
        };

        Ok(Some(RailPoint {
            shape,
            properties: self.leftovers(fields)?,
        }))
    }

    fn build_object(
        &mut self,
        kind: ObjKind,
        node: &'a Node,
        path: String,
        link: Option<ChildLink>,
        depth: usize,
    ) -> Result<Option<StageObj>> {
        if depth > MAX_DEPTH {
            return Err(Error::MalformedStage(format!("{}: children nested too deeply", path)));
        }
        let Some(entries) = self.doc.dictionary(node) else {
            self.warn(&path, format!("record is {:?}, expected a dictionary", node.node_type()));
            return Ok(None);
        };
        self.spend(&path, entries.len() + 1)?;
        if let Node::Dictionary(id) = node {
            let seen = self.records.entry(*id).or_insert(0);
            *seen += 1;
            if *seen == 2 {
                self.warn(&path, "record is listed more than once and is built as a copy".to_string());
            }
        }
        let mut fields = Fields::new(path, entries);

        let mut obj = StageObj::new(kind, self.file_kind);
        obj.link = link;
        obj.base = self.read_base(&mut fields);

        for (slot, key) in obj.args.iter_mut().zip(ARG_KEYS) {
            *slot = self.read_i32(&mut fields, key);
        }
        if kind.has_switches() {
            for (slot, key) in obj.switches.slots_mut().into_iter().zip(Switches::KEYS) {
                *slot = self.read_i32(&mut fields, key);
            }
        }
        obj.view_id = self.read_i32(&mut fields, "ViewId");
        obj.camera_id = self.read_i32(&mut fields, "CameraId");
        obj.clipping_group_id = self.read_i32(&mut fields, "ClippingGroupId");

        if let Some(area) = obj.area.as_mut() {
            area.priority = self.read_i32(&mut fields, "Priority");
            area.shape_model_no = self.read_i32(&mut fields, "ShapeModelNo");
            area.area_parent = read_parent(&mut fields, "AreaParent");
            area.generate_parent = read_parent(&mut fields, "GenerateParent");
        }

        if let Some(rail) = fields.peek("Rail") {
            match rail {
                Node::Dictionary(id) => match self.rail_ids.get(id) {
                    Some(&rail_id) => {
                        fields.claim("Rail");
                        obj.rail = Some(rail_id);
                    }
                    None => self.warn(&fields.path, "Rail does not refer to a known rail record".to_string()),
                },
                Node::Null => {}
                other => self.mismatch(&fields.path, "Rail", other, "a dictionary"),
            }
        }

        for link in [ChildLink::Area, ChildLink::Generate] {
            let Some(items) = self.read_list(&fields, link.key()) else {
                continue;
            };
            fields.claim(link.key());
            let mut children = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let path = format!("{}/{}[{}]", fields.path, link.key(), i);
                if let Some(child) = self.build_object(kind, item, path, Some(link), depth + 1)? {
                    children.push(child);
                }
            }
            match link {
                ChildLink::Area => obj.area_children = children,
                ChildLink::Generate => obj.generate_children = children,
            }
        }

        obj.base.properties = self.leftovers(fields)?;
        Ok(Some(obj))
    }
}

/// Parent links stored as plain ids are claimed; embedded records stay in properties.
fn read_parent(fields: &mut Fields<'_>, key: &str) -> Option<i32> {
    let Node::Int(id) = *fields.peek(key)? else {
        return None;
    };
    fields.claim(key);
    Some(id)
}
