//! Resource registry
//!
//! Find-or-create cache mapping resource names to logical resources. Resources
//! live in one of two pools, chosen by the [`Lifetime`] passed on the first
//! acquisition of a name; later acquisitions never move a resource between
//! pools.

use std::collections::{BTreeMap, HashMap};

use crate::render_graph::error::{GraphError, GraphResult};
use crate::render_graph::resource::*;

/// Registry owning every [`Resource`] of a frame graph
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    names: HashMap<String, ResourceId>,
    transient: BTreeMap<ResourceId, Resource>,
    permanent: BTreeMap<ResourceId, Resource>,
    next_id: u32,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the image called `name`, or create it from `info`.
    ///
    /// Returns the resource and whether it already existed.
    pub fn acquire_image(
        &mut self,
        name: &str,
        info: &ImageInfo,
    ) -> GraphResult<(&mut Resource, bool)> {
        self.acquire(name, ResourceDesc::Image(info.clone()))
    }

    /// Find the buffer called `name`, or create it from `info`.
    ///
    /// Returns the resource and whether it already existed.
    pub fn acquire_buffer(
        &mut self,
        name: &str,
        info: &BufferInfo,
    ) -> GraphResult<(&mut Resource, bool)> {
        self.acquire(name, ResourceDesc::Buffer(info.clone()))
    }

    fn acquire(&mut self, name: &str, desc: ResourceDesc) -> GraphResult<(&mut Resource, bool)> {
        let expected = match desc {
            ResourceDesc::Image(_) => ResourceKind::Image,
            ResourceDesc::Buffer(_) => ResourceKind::Buffer,
        };

        if let Some(&id) = self.names.get(name) {
            let resource = self
                .get_mut(id)
                .ok_or_else(|| GraphError::UnknownResource {
                    name: name.to_string(),
                })?;
            if resource.kind() != expected {
                return Err(GraphError::KindMismatch {
                    name: name.to_string(),
                    expected,
                    found: resource.kind(),
                });
            }
            if *resource.desc() != desc {
                log::warn!(
                    "Resource '{}' re-acquired with a different description; keeping the first one",
                    name
                );
            }
            return Ok((resource, true));
        }

        let id = ResourceId(self.next_id);
        self.next_id += 1;
        let resource = Resource::new(id, name, desc);
        log::trace!(
            "Registering {} '{}' as {:?} ({:?})",
            resource.kind(),
            name,
            resource.lifetime(),
            id
        );
        self.names.insert(name.to_string(), id);

        let pool = match resource.lifetime() {
            Lifetime::Transient => &mut self.transient,
            Lifetime::Permanent => &mut self.permanent,
        };
        Ok((pool.entry(id).or_insert(resource), false))
    }

    /// Look a resource up by name; `None` means "not declared yet"
    pub fn get_by_name(&self, name: &str) -> Option<&Resource> {
        self.names.get(name).and_then(|&id| self.get(id))
    }

    pub fn id_of(&self, name: &str) -> Option<ResourceId> {
        self.names.get(name).copied()
    }

    #[inline]
    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.transient.get(&id).or_else(|| self.permanent.get(&id))
    }

    #[inline]
    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut Resource> {
        match self.transient.get_mut(&id) {
            Some(resource) => Some(resource),
            None => self.permanent.get_mut(&id),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Remove a resource from whichever pool holds it
    pub(crate) fn remove(&mut self, id: ResourceId) -> Option<Resource> {
        let resource = self
            .transient
            .remove(&id)
            .or_else(|| self.permanent.remove(&id))?;
        self.names.remove(resource.name());
        Some(resource)
    }

    pub fn len(&self) -> usize {
        self.transient.len() + self.permanent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn transient_count(&self) -> usize {
        self.transient.len()
    }

    pub fn permanent_count(&self) -> usize {
        self.permanent.len()
    }

    /// Iterate transient resources in creation order
    pub fn iter_transient(&self) -> impl Iterator<Item = &Resource> {
        self.transient.values()
    }

    /// Iterate permanent resources in creation order
    pub fn iter_permanent(&self) -> impl Iterator<Item = &Resource> {
        self.permanent.values()
    }

    /// Iterate every resource, permanent pool first
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.permanent.values().chain(self.transient.values())
    }

    pub(crate) fn iter_transient_mut(&mut self) -> impl Iterator<Item = &mut Resource> {
        self.transient.values_mut()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Resource> {
        self.permanent
            .values_mut()
            .chain(self.transient.values_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::Format;

    #[test]
    fn test_acquire_is_idempotent() {
        let mut registry = ResourceRegistry::new();
        let info = ImageInfo::new_2d(640, 480, Format::Rgba8Unorm);

        let (first, found) = registry.acquire_image("albedo", &info).unwrap();
        let first_id = first.id();
        assert!(!found);

        let (second, found) = registry.acquire_image("albedo", &info).unwrap();
        assert!(found);
        assert_eq!(second.id(), first_id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_pool_placement_is_fixed_by_first_acquisition() {
        let mut registry = ResourceRegistry::new();
        let transient = BufferInfo::new(64);

        registry.acquire_buffer("lights", &transient).unwrap();
        let (resource, found) = registry
            .acquire_buffer("lights", &transient.clone().permanent())
            .unwrap();
        assert!(found);
        assert_eq!(resource.lifetime(), Lifetime::Transient);
        assert_eq!(registry.transient_count(), 1);
        assert_eq!(registry.permanent_count(), 0);
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let mut registry = ResourceRegistry::new();
        registry.acquire_buffer("camera", &BufferInfo::new(128)).unwrap();

        let err = registry
            .acquire_image("camera", &ImageInfo::new_2d(1, 1, Format::R32Float))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::KindMismatch {
                name: "camera".to_string(),
                expected: ResourceKind::Image,
                found: ResourceKind::Buffer,
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_and_removal() {
        let mut registry = ResourceRegistry::new();
        assert!(registry.get_by_name("shadow").is_none());

        let info = ImageInfo::new_2d(2048, 2048, Format::Depth32Float).permanent();
        let (resource, _) = registry.acquire_image("shadow", &info).unwrap();
        let id = resource.id();

        assert_eq!(registry.get_by_name("shadow").map(Resource::id), Some(id));
        assert_eq!(registry.permanent_count(), 1);

        let removed = registry.remove(id).unwrap();
        assert_eq!(removed.name(), "shadow");
        assert!(!registry.contains("shadow"));
        assert!(registry.is_empty());

        // A re-declaration creates a brand new resource
        let (again, found) = registry.acquire_image("shadow", &info).unwrap();
        assert!(!found);
        assert_ne!(again.id(), id);
    }
}
