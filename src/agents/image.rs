// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde_json::Value;

use crate::model::{coord_pair, ChangeRecord, ObjectId, ObjectKind};
use crate::scene::Scene;

use super::{attributes_from_bag, object, target_or_bag_id, AgentContext, AgentResult, ChangeAgent};

/// Background image. Parents are `[url, [x, y], [width, height]]` with
/// the size in board units, not pixels; the pixel conversion happens at
/// the import/export boundary.
#[derive(Debug, Default)]
pub struct ImageAgent;

impl ChangeAgent for ImageAgent {
    fn create(
        &self,
        scene: &mut Scene,
        change: &ChangeRecord,
        _ctx: &AgentContext<'_>,
    ) -> AgentResult {
        let parents = change.parents.as_deref()?;
        let url = parents.first()?.as_str()?.to_owned();
        let [Some(x), Some(y)] = coord_pair(parents.get(1)?)? else {
            return None;
        };
        let size = parents.get(2).and_then(coord_pair);

        let id = target_or_bag_id(change).unwrap_or_else(ObjectId::generate);
        let mut attributes = attributes_from_bag(change.single_properties(), &[]);
        attributes.insert("url".to_owned(), Value::String(url));
        if let Some([Some(width), Some(height)]) = size {
            attributes.insert(
                "size".to_owned(),
                crate::model::coord_value(width, height),
            );
        }

        scene
            .insert(id.clone(), ObjectKind::Image, Some((x, y)), attributes, Vec::new())
            .then(|| vec![id])
    }

    fn update(&self, scene: &mut Scene, change: &ChangeRecord) -> AgentResult {
        let id = change.target_ids().first()?;
        let bag = change.single_properties()?;
        object::update_object(scene, id, bag).then(Vec::new)
    }

    fn delete(&self, scene: &mut Scene, change: &ChangeRecord) -> AgentResult {
        let id = change.target_ids().first()?;
        let removed = object::delete_object(scene, id);
        (!removed.is_empty()).then_some(removed)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ImageAgent;
    use crate::agents::{AgentContext, ChangeAgent};
    use crate::model::{ChangeOp, ChangeRecord, ChangeTarget, ObjectId, ObjectKind, PropertyBag};
    use crate::scene::Scene;

    fn bag(value: serde_json::Value) -> PropertyBag {
        PropertyBag(value.as_object().expect("object").clone())
    }

    #[test]
    fn create_stores_url_position_and_unit_size() {
        let mut scene = Scene::new();
        let change = ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(ObjectKind::Image))
            .with_parents(vec![json!("my/image/url"), json!([0, 0]), json!([10, 10])])
            .with_properties(bag(json!({ "id": "i1" })));

        ImageAgent
            .create(&mut scene, &change, &AgentContext::detached())
            .expect("created");

        let id = ObjectId::new("i1").expect("id");
        let object = scene.get(&id).expect("image");
        assert_eq!(object.str_attribute("url"), Some("my/image/url"));
        assert_eq!(object.position(), Some((0.0, 0.0)));
        assert_eq!(object.attribute("size"), Some(&json!([10, 10])));
    }

    #[test]
    fn create_without_coords_is_a_noop() {
        let mut scene = Scene::new();
        let change = ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(ObjectKind::Image))
            .with_parents(vec![json!("my/image/url")]);
        assert!(ImageAgent
            .create(&mut scene, &change, &AgentContext::detached())
            .is_none());
    }

    #[test]
    fn url_update_lands_in_attributes() {
        let mut scene = Scene::new();
        let create = ChangeRecord::new(ChangeOp::Create, ChangeTarget::Kind(ObjectKind::Image))
            .with_parents(vec![json!("old/url"), json!([0, 0]), json!([5, 5])])
            .with_properties(bag(json!({ "id": "i1" })));
        ImageAgent.create(&mut scene, &create, &AgentContext::detached());

        let id = ObjectId::new("i1").expect("id");
        let update = ChangeRecord::new(ChangeOp::Update, ChangeTarget::Kind(ObjectKind::Image))
            .with_target_ids(id.clone())
            .with_properties(bag(json!({ "url": "new/url" })));
        ImageAgent.update(&mut scene, &update).expect("updated");
        assert_eq!(
            scene.get(&id).expect("image").str_attribute("url"),
            Some("new/url")
        );
    }
}
