//! Session resource registry

use crate::object::ObjectTemplate;
use crate::path::Path;
use bee_core::{BeeError, ObjectId, PathId, Result, Sprite};
use std::collections::HashMap;
use std::sync::Arc;

/// Object templates, paths and sprites for one session.
///
/// Resources are added while loading. Once [`close`](Registry::close) is
/// called further registration fails, and the registry is typically put
/// behind an `Arc` and shared with every room.
#[derive(Debug, Default)]
pub struct Registry {
    objects: Vec<Arc<ObjectTemplate>>,
    object_names: HashMap<String, ObjectId>,
    paths: Vec<Path>,
    path_names: HashMap<String, PathId>,
    sprites: HashMap<String, Sprite>,
    is_closed: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop accepting new resources
    pub fn close(&mut self) {
        log::debug!(
            target: "bee::resource",
            "registry closed with {} objects, {} paths, {} sprites",
            self.objects.len(),
            self.paths.len(),
            self.sprites.len()
        );
        self.is_closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    fn check_open(&self, kind: &'static str, name: &str) -> Result<()> {
        if self.is_closed {
            return Err(BeeError::RegistrationClosed {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn add_object(&mut self, object: ObjectTemplate) -> Result<ObjectId> {
        self.check_open("object", &object.name)?;
        if self.object_names.contains_key(&object.name) {
            return Err(BeeError::DuplicateName(object.name));
        }
        let id = ObjectId(self.objects.len());
        self.object_names.insert(object.name.clone(), id);
        self.objects.push(Arc::new(object));
        Ok(id)
    }

    pub fn add_path(&mut self, path: Path) -> Result<PathId> {
        self.check_open("path", &path.name)?;
        if self.path_names.contains_key(&path.name) {
            return Err(BeeError::DuplicateName(path.name));
        }
        let id = PathId(self.paths.len());
        self.path_names.insert(path.name.clone(), id);
        self.paths.push(path);
        Ok(id)
    }

    pub fn add_sprite(&mut self, sprite: Sprite) -> Result<()> {
        self.check_open("sprite", &sprite.name)?;
        if self.sprites.contains_key(&sprite.name) {
            return Err(BeeError::DuplicateName(sprite.name));
        }
        self.sprites.insert(sprite.name.clone(), sprite);
        Ok(())
    }

    pub fn object(&self, id: ObjectId) -> Option<&Arc<ObjectTemplate>> {
        self.objects.get(id.index())
    }

    pub fn object_id(&self, name: &str) -> Result<ObjectId> {
        self.object_names
            .get(name)
            .copied()
            .ok_or_else(|| BeeError::ObjectNotFound(name.to_string()))
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &ObjectTemplate)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjectId(i), o.as_ref()))
    }

    pub fn path(&self, id: PathId) -> Option<&Path> {
        self.paths.get(id.index())
    }

    /// Waypoint edits, for loaders building paths in place
    pub fn path_mut(&mut self, id: PathId) -> Option<&mut Path> {
        self.paths.get_mut(id.index())
    }

    pub fn path_id(&self, name: &str) -> Result<PathId> {
        self.path_names
            .get(name)
            .copied()
            .ok_or_else(|| BeeError::PathNotFound(name.to_string()))
    }

    pub fn sprite(&self, name: &str) -> Result<&Sprite> {
        self.sprites
            .get(name)
            .ok_or_else(|| BeeError::SpriteNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        let mut reg = Registry::new();
        let bee = reg.add_object(ObjectTemplate::new("obj_bee")).unwrap();
        let wall = reg.add_object(ObjectTemplate::new("obj_wall")).unwrap();
        assert_ne!(bee, wall);
        assert_eq!(reg.object_id("obj_wall").unwrap(), wall);
        assert_eq!(reg.object(bee).unwrap().name, "obj_bee");
        assert!(matches!(
            reg.object_id("obj_missing"),
            Err(BeeError::ObjectNotFound(_))
        ));
        assert_eq!(reg.objects().count(), 2);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut reg = Registry::new();
        reg.add_path(Path::new("path_a")).unwrap();
        assert!(matches!(
            reg.add_path(Path::new("path_a")),
            Err(BeeError::DuplicateName(name)) if name == "path_a"
        ));
        reg.add_sprite(Sprite::new("spr_a", 1, 1)).unwrap();
        assert!(reg.add_sprite(Sprite::new("spr_a", 2, 2)).is_err());
        assert_eq!(reg.sprite("spr_a").unwrap().width, 1);
        assert!(matches!(reg.sprite("spr_b"), Err(BeeError::SpriteNotFound(_))));
    }

    #[test]
    fn closed_registry_refuses_new_resources() {
        let mut reg = Registry::new();
        reg.add_object(ObjectTemplate::new("obj_early")).unwrap();
        reg.close();
        assert!(reg.is_closed());

        let err = reg.add_object(ObjectTemplate::new("obj_late")).unwrap_err();
        assert!(matches!(
            err,
            BeeError::RegistrationClosed { kind: "object", ref name } if name == "obj_late"
        ));
        assert!(reg.object_id("obj_late").is_err());
        assert!(reg.add_path(Path::new("path_late")).is_err());
        assert!(reg.add_sprite(Sprite::new("spr_late", 1, 1)).is_err());
    }

    #[test]
    fn paths_can_be_edited_in_place() {
        let mut reg = Registry::new();
        let id = reg.add_path(Path::new("path_edit")).unwrap();
        reg.path_mut(id).unwrap().add_coordinate(1.0, 2.0, 0.0, 1.0);
        assert_eq!(reg.path(reg.path_id("path_edit").unwrap()).unwrap().len(), 1);
    }
}
