//! Writing stage data back into a BYML document.

use std::collections::BTreeMap;

use kinopio_byml::{Byml, Dictionary, Node};
use kinopio_common::Endian;

use crate::builder::ARG_KEYS;
use crate::object::{ObjBase, PointShape, RailObj, RailPoint, StageObj, StoredVector, Switches};
use crate::property::Properties;
use crate::{Error, Result, StageConfig, StageData};

impl StageData {
    /// Rebuild a stage document.
    ///
    /// Fields that were absent on load are left out, vector components
    /// included. Each rail is written once; objects referencing it share
    /// its container.
    pub fn to_byml(&self, config: &StageConfig, order: Endian) -> Result<Byml> {
        let mut doc = Byml::new(order, config.byml_version);
        let mut root = Dictionary::new();
        insert_properties(&mut doc, &mut root, &self.root_properties);

        let rails: Vec<Node> = self.rails.iter().map(|rail| write_rail(&mut doc, rail)).collect();
        if self.has_rail_infos || !rails.is_empty() {
            let list = doc.add_array_with(rails.clone());
            let mut infos = Dictionary::new();
            infos.insert("RailInfo".to_string(), list);
            root.insert("AllRailInfos".to_string(), doc.add_dictionary_with(infos));
        }

        if !root.contains_key("AllInfos") {
            let mut categories: BTreeMap<&'static str, Vec<Node>> = self
                .categories
                .iter()
                .filter_map(|kind| kind.info_key())
                .map(|key| (key, Vec::new()))
                .collect();
            for obj in &self.objects {
                let key = obj
                    .kind
                    .info_key()
                    .ok_or_else(|| Error::MalformedStage(format!("{:?} cannot be listed under AllInfos", obj.kind)))?;
                let node = write_object(&mut doc, obj, &rails)?;
                categories.entry(key).or_default().push(node);
            }

            let mut infos = Dictionary::new();
            for (key, records) in categories {
                infos.insert(key.to_string(), doc.add_array_with(records));
            }
            root.insert("AllInfos".to_string(), doc.add_dictionary_with(infos));
        }

        let root = doc.add_dictionary_with(root);
        doc.set_root(root);
        Ok(doc)
    }
}

fn insert_properties(doc: &mut Byml, entries: &mut Dictionary, properties: &Properties) {
    for (key, value) in properties {
        entries.insert(key.clone(), value.to_node(doc));
    }
}

fn insert_vector(entries: &mut Dictionary, prefix: &str, vector: StoredVector) {
    for (axis, value) in ["x", "y", "z"].into_iter().zip(vector.components()) {
        if let Some(value) = value {
            entries.insert(format!("{}{}", prefix, axis), Node::Float(value));
        }
    }
}

fn insert_i32(entries: &mut Dictionary, key: &str, value: Option<i32>) {
    if let Some(value) = value {
        entries.insert(key.to_string(), Node::Int(value));
    }
}

fn write_base(doc: &mut Byml, entries: &mut Dictionary, base: &ObjBase) {
    insert_properties(doc, entries, &base.properties);
    if let Some(name) = &base.name {
        entries.insert("name".to_string(), Node::from(name.as_str()));
    }
    if let Some(layer) = &base.layer {
        entries.insert("LayerName".to_string(), Node::from(layer.as_str()));
    }
    insert_i32(entries, "l_id", base.link_id);
    insert_vector(entries, "pos_", base.pos);
    insert_vector(entries, "dir_", base.dir);
    insert_vector(entries, "scale_", base.scale);
}

fn write_rail(doc: &mut Byml, rail: &RailObj) -> Node {
    let mut entries = Dictionary::new();
    write_base(doc, &mut entries, &rail.base);

    if let Some(closed) = rail.closed {
        entries.insert("IsClosed".to_string(), Node::from(if closed { "CLOSE" } else { "OPEN" }));
    }
    insert_i32(&mut entries, "RailNo", rail.rail_no);
    if let Some(point_type) = rail.point_type {
        entries.insert("Type".to_string(), Node::from(point_type.as_str()));
    }
    if rail.declared_points.is_some() {
        insert_i32(&mut entries, "Num_Pnt", i32::try_from(rail.points.len()).ok());
    }
    if !rail.points.is_empty() {
        let points = rail.points.iter().map(|point| write_point(doc, point)).collect();
        entries.insert("Points".to_string(), doc.add_array_with(points));
    }

    doc.add_dictionary_with(entries)
}

fn write_point(doc: &mut Byml, point: &RailPoint) -> Node {
    let mut entries = Dictionary::new();
    insert_properties(doc, &mut entries, &point.properties);
    match point.shape {
        PointShape::Linear(position) => insert_vector(&mut entries, "pnt0_", position),
        PointShape::Bezier {
            point,
            control1,
            control2,
        } => {
            insert_vector(&mut entries, "pnt0_", point);
            insert_vector(&mut entries, "pnt1_", control1);
            insert_vector(&mut entries, "pnt2_", control2);
        }
    }
    doc.add_dictionary_with(entries)
}

fn write_object(doc: &mut Byml, obj: &StageObj, rails: &[Node]) -> Result<Node> {
    let mut entries = Dictionary::new();
    write_base(doc, &mut entries, &obj.base);

    for (key, value) in ARG_KEYS.iter().zip(obj.args) {
        insert_i32(&mut entries, key, value);
    }
    if obj.kind.has_switches() {
        for (key, value) in Switches::KEYS.iter().zip(obj.switches.slots()) {
            insert_i32(&mut entries, key, value);
        }
    }
    insert_i32(&mut entries, "ViewId", obj.view_id);
    insert_i32(&mut entries, "CameraId", obj.camera_id);
    insert_i32(&mut entries, "ClippingGroupId", obj.clipping_group_id);

    if let Some(area) = &obj.area {
        insert_i32(&mut entries, "Priority", area.priority);
        insert_i32(&mut entries, "ShapeModelNo", area.shape_model_no);
        insert_i32(&mut entries, "AreaParent", area.area_parent);
        insert_i32(&mut entries, "GenerateParent", area.generate_parent);
    }

    if let Some(rail) = obj.rail {
        let node = rails.get(rail.0).ok_or(Error::InvalidRail {
            rail: rail.0,
            count: rails.len(),
        })?;
        entries.insert("Rail".to_string(), node.clone());
    }

    for (key, children) in [
        ("AreaChildren", &obj.area_children),
        ("GenerateChildren", &obj.generate_children),
    ] {
        if children.is_empty() {
            continue;
        }
        let nodes = children
            .iter()
            .map(|child| write_object(doc, child, rails))
            .collect::<Result<Vec<_>>>()?;
        entries.insert(key.to_string(), doc.add_array_with(nodes));
    }

    Ok(doc.add_dictionary_with(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ChildLink, FileKind, ObjKind, PointType, RailId, Vector3};
    use crate::{Property, StageBuilder};

    fn exact() -> StageConfig {
        StageConfig {
            translation_scale: 1.0,
            ..StageConfig::default()
        }
    }

    fn sample_stage() -> StageData {
        let mut data = StageData::new(FileKind::Design);
        data.has_rail_infos = true;
        data.categories = vec![ObjKind::Area, ObjKind::Goal, ObjKind::Regular];
        data.root_properties.insert("StageName".into(), Property::from("FirstStage"));

        let mut rail = RailObj::new(FileKind::Design);
        rail.base.name = Some("Rail".into());
        rail.closed = Some(true);
        rail.point_type = Some(PointType::Bezier);
        rail.declared_points = Some(1);
        rail.points.push(RailPoint {
            shape: PointShape::Bezier {
                point: Vector3::new(1.0, 2.0, 3.0).into(),
                control1: Vector3::new(1.5, 2.0, 3.0).into(),
                control2: StoredVector {
                    x: Some(0.5),
                    ..StoredVector::EMPTY
                },
            },
            properties: [("id".to_string(), Property::Int(0))].into(),
        });
        data.rails.push(rail.clone());
        data.rails.push(rail);

        let mut lift = StageObj::new(ObjKind::Regular, FileKind::Design);
        lift.base.name = Some("Lift".into());
        lift.base.pos = Vector3::new(10.0, 0.5, -4.0).into();
        lift.base.dir = StoredVector {
            y: Some(90.0),
            ..StoredVector::EMPTY
        };
        lift.args[3] = Some(2);
        lift.switches.appear = Some(12);
        lift.rail = Some(RailId(1));
        lift.base.properties.insert("ModelName".into(), Property::from("LiftA"));

        let mut coin = StageObj::new(ObjKind::Regular, FileKind::Design);
        coin.base.name = Some("Coin".into());
        coin.link = Some(ChildLink::Generate);
        lift.generate_children.push(coin);

        let mut area = StageObj::new(ObjKind::Area, FileKind::Design);
        area.base.name = Some("DeathArea".into());
        if let Some(fields) = area.area.as_mut() {
            fields.priority = Some(0);
            fields.generate_parent = Some(7);
        }

        data.objects = vec![area, lift];
        data
    }

    #[test]
    fn test_round_trip() {
        let data = sample_stage();
        for order in [Endian::Big, Endian::Little] {
            let doc = data.to_byml(&exact(), order).unwrap();
            let decoded = Byml::parse(&doc.to_bytes().unwrap()).unwrap();
            let rebuilt = StageBuilder::new(exact()).build(&decoded, FileKind::Design).unwrap();
            assert_eq!(rebuilt, data);
        }
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let mut data = StageData::new(FileKind::Map);
        let mut obj = StageObj::new(ObjKind::Goal, FileKind::Map);
        obj.base.name = Some("GoalPole".into());
        data.objects.push(obj);

        let doc = data.to_byml(&StageConfig::default(), Endian::Little).unwrap();
        let root = doc.root_dictionary().unwrap();
        assert!(!root.contains_key("AllRailInfos"));

        let infos = doc.dictionary(&root["AllInfos"]).unwrap();
        let records = doc.array(&infos["GoalObjInfo"]).unwrap();
        let record = doc.dictionary(&records[0]).unwrap();
        let keys: Vec<_> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, ["name"]);
    }

    #[test]
    fn test_rail_container_shared() {
        let data = sample_stage();
        let doc = data.to_byml(&exact(), Endian::Little).unwrap();
        let root = doc.root_dictionary().unwrap();

        let rail_infos = doc.dictionary(&root["AllRailInfos"]).unwrap();
        let rails = doc.array(&rail_infos["RailInfo"]).unwrap();
        let infos = doc.dictionary(&root["AllInfos"]).unwrap();
        let objects = doc.array(&infos["ObjInfo"]).unwrap();
        let lift = doc.dictionary(&objects[0]).unwrap();

        assert_eq!(lift["Rail"].container_id(), rails[1].container_id());
        assert_ne!(lift["Rail"].container_id(), rails[0].container_id());
        assert!(doc.array(&infos["GoalObjInfo"]).unwrap().is_empty());
    }

    #[test]
    fn test_translation_unscaled() {
        let mut data = StageData::new(FileKind::Map);
        let mut obj = StageObj::new(ObjKind::Regular, FileKind::Map);
        obj.base.set_translation(Vector3::new(0.5, 0.0, -0.25), StageConfig::default().translation_scale);
        data.objects.push(obj);

        let doc = data.to_byml(&StageConfig::default(), Endian::Little).unwrap();
        let root = doc.root_dictionary().unwrap();
        let infos = doc.dictionary(&root["AllInfos"]).unwrap();
        let records = doc.array(&infos["ObjInfo"]).unwrap();
        let record = doc.dictionary(&records[0]).unwrap();
        let x = record["pos_x"].as_f32().unwrap();
        let z = record["pos_z"].as_f32().unwrap();
        assert!((x - 50.0).abs() < 1e-3);
        assert!((z + 25.0).abs() < 1e-3);
    }

    fn object_records(doc: &Byml, key: &str) -> Vec<Dictionary> {
        let root = doc.root_dictionary().unwrap();
        let infos = doc.dictionary(&root["AllInfos"]).unwrap();
        doc.array(&infos[key])
            .unwrap()
            .iter()
            .map(|record| doc.dictionary(record).unwrap().clone())
            .collect()
    }

    #[test]
    fn test_default_config_keeps_bits() {
        let mut source = Byml::new(Endian::Little, 1);
        let mut record = Dictionary::new();
        record.insert("pos_x".into(), Node::Float(1234.5));
        record.insert("pos_y".into(), Node::Float(7777.77));
        record.insert("pos_z".into(), Node::Float(-0.3));
        record.insert("scale_y".into(), Node::Float(1.1));
        let record = source.add_dictionary_with(record);
        let list = source.add_array_with(vec![record]);
        let mut infos = Dictionary::new();
        infos.insert("ObjInfo".into(), list);
        let infos = source.add_dictionary_with(infos);
        let mut root = Dictionary::new();
        root.insert("AllInfos".into(), infos);
        let root = source.add_dictionary_with(root);
        source.set_root(root);

        let config = StageConfig::default();
        let data = StageBuilder::new(config.clone()).build(&source, FileKind::Map).unwrap();
        let written = data.to_byml(&config, Endian::Little).unwrap();
        let decoded = Byml::parse(&written.to_bytes().unwrap()).unwrap();

        let before = object_records(&source, "ObjInfo");
        let after = object_records(&decoded, "ObjInfo");
        assert_eq!(after.len(), 1);
        let keys: Vec<_> = after[0].keys().map(String::as_str).collect();
        assert_eq!(keys, ["pos_x", "pos_y", "pos_z", "scale_y"]);
        for key in keys {
            let Node::Float(expected) = before[0][key] else { panic!("{} not a float", key) };
            let Node::Float(actual) = after[0][key] else { panic!("{} not a float", key) };
            assert_eq!(actual.to_bits(), expected.to_bits(), "{}", key);
        }
    }

    #[test]
    fn test_keys_and_types_unchanged() {
        let mut source = Byml::new(Endian::Big, 1);
        let mut record = Dictionary::new();
        record.insert("pos_x".into(), Node::Double(1.0));
        record.insert("Arg0".into(), Node::UInt(5));
        record.insert("dir_y".into(), Node::Int(90));
        let record = source.add_dictionary_with(record);
        let list = source.add_array_with(vec![record]);
        let mut infos = Dictionary::new();
        infos.insert("ObjInfo".into(), list);
        let infos = source.add_dictionary_with(infos);
        let mut root = Dictionary::new();
        root.insert("AllInfos".into(), infos);
        let root = source.add_dictionary_with(root);
        source.set_root(root);

        let config = StageConfig::default();
        let data = StageBuilder::new(config.clone()).build(&source, FileKind::Map).unwrap();
        let written = data.to_byml(&config, Endian::Big).unwrap();
        let decoded = Byml::parse(&written.to_bytes().unwrap()).unwrap();

        assert_eq!(object_records(&decoded, "ObjInfo"), object_records(&source, "ObjInfo"));
    }

    #[test]
    fn test_invalid_rail() {
        let mut data = StageData::new(FileKind::Map);
        let mut obj = StageObj::new(ObjKind::Regular, FileKind::Map);
        obj.rail = Some(RailId(3));
        data.objects.push(obj);

        assert!(matches!(
            data.to_byml(&StageConfig::default(), Endian::Little),
            Err(Error::InvalidRail { rail: 3, count: 0 })
        ));
    }
}
