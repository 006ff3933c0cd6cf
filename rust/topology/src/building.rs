// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building-level entities: layers, slabs, roofs and roof openings.

use floorkit_geometry::{Loop, Point2d, Region};

use crate::arena::*;
use crate::context::KernelContext;
use crate::dirty::DirtyFlags;
use crate::error::{Error, Result};
use crate::face::FaceSpec;
use crate::id::EntityId;
use crate::keys::*;

/// Attributes of a layer being created.
#[derive(Debug, Clone)]
pub struct LayerSpec {
    pub name: String,
    pub elevation: f64,
    pub height: f64,
    /// Falls back to the configured default thickness when `None`.
    pub slab_thickness: Option<f64>,
}

impl Default for LayerSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            elevation: 0.0,
            height: 2.8,
            slab_thickness: None,
        }
    }
}

/// Attributes of a roof being created.
#[derive(Debug, Clone)]
pub struct RoofSpec {
    pub boundary: Loop,
    pub room_height: f64,
    pub linked_walls: Vec<EntityId>,
    pub generation: RoofGeneration,
}

impl RoofData {
    pub fn new(id: EntityId, layer: LayerKey, spec: RoofSpec) -> Self {
        Self {
            id,
            layer: Some(layer),
            boundary: spec.boundary,
            room_height: spec.room_height,
            linked_walls: spec.linked_walls,
            generation: spec.generation,
            openings: Vec::new(),
            dirty: DirtyFlags::NONE,
        }
    }
}

impl TopologyGraph {
    // --- Layers ---

    /// Creates a layer on top of the existing ones.
    pub fn create_layer(&mut self, ctx: &mut KernelContext, spec: LayerSpec) -> LayerKey {
        let id = ctx.next_id();
        let key = self.layers.insert(LayerData {
            id,
            name: spec.name,
            elevation: spec.elevation,
            height: spec.height,
            slab_thickness: spec.slab_thickness.unwrap_or(ctx.config.default_slab_thickness),
            room_loops: Vec::new(),
            walls: Vec::new(),
            hole_regions: Vec::new(),
            sketch: None,
            slabs: Vec::new(),
            roofs: Vec::new(),
            floor_faces: Vec::new(),
            ceiling_faces: Vec::new(),
            dirty: DirtyFlags::NONE,
        });
        self.layer_order.push(key);
        key
    }

    /// Removes a layer with its sketch, slabs and roofs.
    pub fn remove_layer(&mut self, layer: LayerKey) -> Result<()> {
        let data = self.layers.get(layer).ok_or(Error::LayerNotFound(layer))?;
        let (sketch, slabs, roofs) = (data.sketch, data.slabs.clone(), data.roofs.clone());
        if let Some(sketch) = sketch {
            self.remove_sketch(sketch)?;
        }
        for slab in slabs {
            self.remove_slab(slab)?;
        }
        for roof in roofs {
            self.remove_roof(roof)?;
        }
        self.layers.remove(layer);
        self.layer_order.retain(|l| *l != layer);
        Ok(())
    }

    /// Layers bottom to top.
    pub fn layers(&self) -> &[LayerKey] {
        &self.layer_order
    }

    pub fn previous_layer(&self, layer: LayerKey) -> Option<LayerKey> {
        let index = self.layer_order.iter().position(|l| *l == layer)?;
        index.checked_sub(1).map(|i| self.layer_order[i])
    }

    pub fn next_layer(&self, layer: LayerKey) -> Option<LayerKey> {
        let index = self.layer_order.iter().position(|l| *l == layer)?;
        self.layer_order.get(index + 1).copied()
    }

    pub fn add_room_loop(&mut self, layer: LayerKey, lp: Loop) -> Result<()> {
        let data = self.layers.get_mut(layer).ok_or(Error::LayerNotFound(layer))?;
        data.room_loops.push(lp);
        self.mark_dirty(EntityKey::Layer(layer), DirtyFlags::GEOMETRY);
        Ok(())
    }

    pub fn add_wall(&mut self, ctx: &mut KernelContext, layer: LayerKey, path: Vec<Point2d>, width: f64) -> Result<EntityId> {
        let data = self.layers.get_mut(layer).ok_or(Error::LayerNotFound(layer))?;
        let id = ctx.next_id();
        data.walls.push(Wall { id, path, width });
        self.mark_dirty(EntityKey::Layer(layer), DirtyFlags::GEOMETRY);
        Ok(id)
    }

    /// Registers a region to cut out of the layer's slabs.
    pub fn add_hole_region(&mut self, ctx: &mut KernelContext, layer: LayerKey, region: Region) -> Result<EntityId> {
        let id = ctx.next_id();
        self.insert_hole_region(layer, HoleRegion { id, region })?;
        Ok(id)
    }

    pub fn insert_hole_region(&mut self, layer: LayerKey, hole: HoleRegion) -> Result<()> {
        let data = self.layers.get_mut(layer).ok_or(Error::LayerNotFound(layer))?;
        data.hole_regions.push(hole);
        self.mark_dirty(EntityKey::Layer(layer), DirtyFlags::GEOMETRY);
        Ok(())
    }

    pub fn remove_hole_region(&mut self, layer: LayerKey, id: EntityId) -> Result<Option<HoleRegion>> {
        let data = self.layers.get_mut(layer).ok_or(Error::LayerNotFound(layer))?;
        let removed = data
            .hole_regions
            .iter()
            .position(|h| h.id == id)
            .map(|i| data.hole_regions.remove(i));
        if removed.is_some() {
            self.mark_dirty(EntityKey::Layer(layer), DirtyFlags::GEOMETRY);
        }
        Ok(removed)
    }

    /// Installs `sketch` as the layer's sketch, returning the previous one.
    pub fn set_layer_sketch(&mut self, layer: LayerKey, sketch: SketchKey) -> Result<Option<SketchKey>> {
        if !self.sketches.contains_key(sketch) {
            return Err(Error::SketchNotFound(sketch));
        }
        let data = self.layers.get_mut(layer).ok_or(Error::LayerNotFound(layer))?;
        let previous = data.sketch.replace(sketch);
        self.sketches[sketch].layer = Some(layer);
        self.mark_dirty(EntityKey::Layer(layer), DirtyFlags::GEOMETRY);
        Ok(previous)
    }

    // --- Slabs ---

    pub fn create_slab(
        &mut self,
        ctx: &mut KernelContext,
        layer: LayerKey,
        kind: SlabKind,
        profile: Vec<Region>,
        thickness: f64,
    ) -> Result<SlabKey> {
        if !self.layers.contains_key(layer) {
            return Err(Error::LayerNotFound(layer));
        }
        let id = ctx.next_id();
        let key = self.slabs.insert(SlabData {
            id,
            kind,
            layer: Some(layer),
            profile,
            thickness,
            top_faces: Vec::new(),
            bottom_faces: Vec::new(),
            holes: Vec::new(),
            dirty: DirtyFlags::NONE,
        });
        self.layers[layer].slabs.push(key);
        Ok(key)
    }

    /// Creates a face owned by `slab` on its top or bottom side.
    pub fn add_slab_face(
        &mut self,
        ctx: &mut KernelContext,
        slab: SlabKey,
        region: &Region,
        elevation: f64,
        top: bool,
    ) -> Result<FaceKey> {
        if !self.slabs.contains_key(slab) {
            return Err(Error::SlabNotFound(slab));
        }
        let spec = FaceSpec::default()
            .with_owner(FaceOwner::Slab(slab))
            .at_elevation(elevation);
        let face = self.create_face(ctx, region, spec)?;
        let data = &mut self.slabs[slab];
        if top {
            data.top_faces.push(face);
        } else {
            data.bottom_faces.push(face);
        }
        Ok(face)
    }

    /// Removes a slab and its faces.
    pub fn remove_slab(&mut self, slab: SlabKey) -> Result<()> {
        let data = self.slabs.get(slab).ok_or(Error::SlabNotFound(slab))?;
        let faces: Vec<FaceKey> = data.top_faces.iter().chain(data.bottom_faces.iter()).copied().collect();
        for face in faces {
            self.remove_face(face)?;
        }
        if let Some(data) = self.slabs.remove(slab) {
            if let Some(layer) = data.layer.and_then(|l| self.layers.get_mut(l)) {
                layer.slabs.retain(|s| *s != slab);
            }
        }
        Ok(())
    }

    /// Slabs of a layer with the given kind, in creation order.
    pub fn layer_slabs(&self, layer: LayerKey, kind: SlabKind) -> Vec<SlabKey> {
        self.layers
            .get(layer)
            .map(|l| {
                l.slabs
                    .iter()
                    .copied()
                    .filter(|s| self.slabs.get(*s).is_some_and(|d| d.kind == kind))
                    .collect()
            })
            .unwrap_or_default()
    }

    // --- Roofs ---

    pub fn create_roof(&mut self, ctx: &mut KernelContext, layer: LayerKey, spec: RoofSpec) -> Result<RoofKey> {
        if !self.layers.contains_key(layer) {
            return Err(Error::LayerNotFound(layer));
        }
        self.attach_roof(RoofData::new(ctx.next_id(), layer, spec))
    }

    /// Adds a roof to its layer, keeping its id. Used for new roofs and for
    /// data returned by [`remove_roof`](Self::remove_roof); openings are not
    /// carried over.
    pub fn attach_roof(&mut self, mut data: RoofData) -> Result<RoofKey> {
        let layer = data.layer.ok_or(Error::UnresolvedReference(data.id))?;
        if !self.layers.contains_key(layer) {
            return Err(Error::LayerNotFound(layer));
        }
        data.openings.clear();
        data.dirty = DirtyFlags::NONE;
        let key = self.roofs.insert(data);
        self.layers[layer].roofs.push(key);
        self.mark_dirty(EntityKey::Roof(key), DirtyFlags::GEOMETRY);
        Ok(key)
    }

    /// Removes a roof and its openings.
    pub fn remove_roof(&mut self, roof: RoofKey) -> Result<RoofData> {
        let openings = self.roofs.get(roof).ok_or(Error::RoofNotFound(roof))?.openings.clone();
        for opening in openings {
            self.openings.remove(opening);
        }
        let mut data = self.roofs.remove(roof).ok_or(Error::RoofNotFound(roof))?;
        data.openings.clear();
        if let Some(layer) = data.layer.and_then(|l| self.layers.get_mut(l)) {
            layer.roofs.retain(|r| *r != roof);
        }
        Ok(data)
    }

    /// Replaces a roof's boundary loop.
    pub fn set_roof_boundary(&mut self, roof: RoofKey, boundary: Loop) -> Result<()> {
        let data = self.roofs.get_mut(roof).ok_or(Error::RoofNotFound(roof))?;
        data.boundary = boundary;
        self.mark_dirty(EntityKey::Roof(roof), DirtyFlags::GEOMETRY);
        Ok(())
    }

    pub fn add_opening(&mut self, ctx: &mut KernelContext, roof: RoofKey, profile: Loop) -> Result<OpeningKey> {
        if !self.roofs.contains_key(roof) {
            return Err(Error::RoofNotFound(roof));
        }
        let id = ctx.next_id();
        let key = self.openings.insert(OpeningData {
            id,
            host: Some(roof),
            profile,
            dirty: DirtyFlags::NONE,
        });
        self.roofs[roof].openings.push(key);
        self.mark_dirty(EntityKey::Roof(roof), DirtyFlags::CLIP_GEOMETRY);
        Ok(key)
    }

    pub fn remove_opening(&mut self, opening: OpeningKey) -> Result<()> {
        let data = self.openings.remove(opening).ok_or(Error::OpeningNotFound(opening))?;
        if let Some(roof) = data.host {
            if let Some(host) = self.roofs.get_mut(roof) {
                host.openings.retain(|o| *o != opening);
            }
            self.mark_dirty(EntityKey::Roof(roof), DirtyFlags::CLIP_GEOMETRY);
        }
        Ok(())
    }

    /// Removes every opening of a roof, returning how many were removed.
    pub fn remove_all_openings(&mut self, roof: RoofKey) -> Result<usize> {
        let openings = self.roofs.get(roof).ok_or(Error::RoofNotFound(roof))?.openings.clone();
        for opening in &openings {
            self.remove_opening(*opening)?;
        }
        Ok(openings.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Loop {
        Loop::rectangle(Point2d::new(0.0, 0.0), Point2d::new(4.0, 4.0)).unwrap()
    }

    #[test]
    fn layer_order_neighbours() {
        let mut ctx = KernelContext::default();
        let mut graph = TopologyGraph::new();
        let ground = graph.create_layer(&mut ctx, LayerSpec::default());
        let first = graph.create_layer(&mut ctx, LayerSpec::default());
        assert_eq!(graph.previous_layer(first), Some(ground));
        assert_eq!(graph.previous_layer(ground), None);
        assert_eq!(graph.next_layer(ground), Some(first));
        assert_eq!(graph.layer(ground).unwrap().slab_thickness, 0.12);

        graph.remove_layer(ground).unwrap();
        assert_eq!(graph.layers(), &[first]);
    }

    #[test]
    fn roof_openings_are_owned() {
        let mut ctx = KernelContext::default();
        let mut graph = TopologyGraph::new();
        let layer = graph.create_layer(&mut ctx, LayerSpec::default());
        let roof = graph
            .create_roof(
                &mut ctx,
                layer,
                RoofSpec {
                    boundary: square(),
                    room_height: 2.6,
                    linked_walls: Vec::new(),
                    generation: RoofGeneration::Gable,
                },
            )
            .unwrap();
        graph.add_opening(&mut ctx, roof, Loop::rectangle(Point2d::new(1.0, 1.0), Point2d::new(2.0, 2.0)).unwrap())
            .unwrap();
        graph.add_opening(&mut ctx, roof, Loop::rectangle(Point2d::new(2.5, 2.5), Point2d::new(3.0, 3.0)).unwrap())
            .unwrap();
        assert_eq!(graph.opening_count(), 2);
        assert_eq!(graph.remove_all_openings(roof).unwrap(), 2);
        assert_eq!(graph.opening_count(), 0);
        assert!(graph.roof(roof).unwrap().openings.is_empty());
    }

    #[test]
    fn removed_roof_reattaches_under_its_id() {
        let mut ctx = KernelContext::default();
        let mut graph = TopologyGraph::new();
        let layer = graph.create_layer(&mut ctx, LayerSpec::default());
        let spec = RoofSpec {
            boundary: square(),
            room_height: 2.6,
            linked_walls: Vec::new(),
            generation: RoofGeneration::Shed,
        };
        let roof = graph.create_roof(&mut ctx, layer, spec).unwrap();
        graph.add_opening(&mut ctx, roof, Loop::rectangle(Point2d::new(1.0, 1.0), Point2d::new(2.0, 2.0)).unwrap())
            .unwrap();
        let id = graph.roof(roof).unwrap().id;

        let data = graph.remove_roof(roof).unwrap();
        assert_eq!(graph.find_roof(id), None);
        let again = graph.attach_roof(data).unwrap();
        assert_eq!(graph.find_roof(id), Some(again));
        assert_eq!(graph.layer(layer).unwrap().roofs, vec![again]);
        assert!(graph.roof(again).unwrap().openings.is_empty());
        assert_eq!(graph.opening_count(), 0);
        assert!(graph.dirty_flags(EntityKey::Roof(again)).geometry);

        graph.remove_layer(layer).unwrap();
        let orphan = RoofData::new(id, layer, RoofSpec {
            boundary: square(),
            room_height: 2.6,
            linked_walls: Vec::new(),
            generation: RoofGeneration::Flat,
        });
        assert!(matches!(graph.attach_roof(orphan), Err(Error::LayerNotFound(_))));
    }

    #[test]
    fn hole_regions_by_id() {
        let mut ctx = KernelContext::default();
        let mut graph = TopologyGraph::new();
        let layer = graph.create_layer(&mut ctx, LayerSpec::default());
        let id = graph.add_hole_region(&mut ctx, layer, Region::new(square())).unwrap();
        assert!(graph.remove_hole_region(layer, id).unwrap().is_some());
        assert!(graph.remove_hole_region(layer, id).unwrap().is_none());
    }
}
