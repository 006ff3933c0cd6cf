// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sketch operations: face membership, background, guidelines and
//! per-face extrusion values.

use std::collections::BTreeMap;

use floorkit_geometry::{Curve2d, Matrix4, Region};
use tracing::debug;

use crate::arena::*;
use crate::context::KernelContext;
use crate::dirty::DirtyFlags;
use crate::error::{Error, Result};
use crate::face::FaceSpec;
use crate::keys::*;

impl TopologyGraph {
    pub fn create_sketch(&mut self, ctx: &mut KernelContext, layer: Option<LayerKey>) -> SketchKey {
        let id = ctx.next_id();
        self.sketches.insert(SketchData {
            id,
            layer,
            faces: Vec::new(),
            background: Background::default(),
            guidelines: Vec::new(),
            extrusion_values: BTreeMap::new(),
            transform: Matrix4::identity(),
            dirty: DirtyFlags::NONE,
        })
    }

    /// Removes a sketch together with all its faces.
    pub fn remove_sketch(&mut self, sketch: SketchKey) -> Result<()> {
        let faces = self
            .sketches
            .get(sketch)
            .ok_or(Error::SketchNotFound(sketch))?
            .faces
            .clone();
        for face in faces {
            self.remove_face(face)?;
        }
        if let Some(data) = self.sketches.remove(sketch) {
            if let Some(layer) = data.layer.and_then(|l| self.layers.get_mut(l)) {
                if layer.sketch == Some(sketch) {
                    layer.sketch = None;
                }
            }
        }
        Ok(())
    }

    /// Creates a face owned by `sketch`.
    pub fn add_sketch_face(
        &mut self,
        ctx: &mut KernelContext,
        sketch: SketchKey,
        region: &Region,
        tags: &[&str],
    ) -> Result<FaceKey> {
        if !self.sketches.contains_key(sketch) {
            return Err(Error::SketchNotFound(sketch));
        }
        let spec = FaceSpec {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            elevation: 0.0,
            owner: FaceOwner::Sketch(sketch),
        };
        let face = self.create_face(ctx, region, spec)?;
        self.sketches[sketch].faces.push(face);
        self.mark_dirty(EntityKey::Sketch(sketch), DirtyFlags::GEOMETRY);
        Ok(face)
    }

    pub fn sketch_faces(&self, sketch: SketchKey) -> &[FaceKey] {
        self.sketches.get(sketch).map(|s| s.faces.as_slice()).unwrap_or(&[])
    }

    /// Faces of a sketch carrying `tag`, in sketch order.
    pub fn sketch_faces_tagged(&self, sketch: SketchKey, tag: &str) -> Vec<FaceKey> {
        self.sketch_faces(sketch)
            .iter()
            .copied()
            .filter(|f| self.faces.get(*f).is_some_and(|d| d.has_tag(tag)))
            .collect()
    }

    pub fn set_sketch_background(&mut self, sketch: SketchKey, regions: Vec<Region>) -> Result<()> {
        let data = self.sketches.get_mut(sketch).ok_or(Error::SketchNotFound(sketch))?;
        data.background.regions = regions;
        self.mark_dirty(EntityKey::Sketch(sketch), DirtyFlags::GEOMETRY);
        Ok(())
    }

    pub fn add_guideline(&mut self, sketch: SketchKey, curve: Curve2d) -> Result<()> {
        let data = self.sketches.get_mut(sketch).ok_or(Error::SketchNotFound(sketch))?;
        data.guidelines.push(curve);
        Ok(())
    }

    pub fn set_sketch_transform(&mut self, sketch: SketchKey, transform: Matrix4<f64>) -> Result<()> {
        let data = self.sketches.get_mut(sketch).ok_or(Error::SketchNotFound(sketch))?;
        data.transform = transform;
        self.mark_dirty(EntityKey::Sketch(sketch), DirtyFlags::GEOMETRY);
        Ok(())
    }

    /// Stores the extrusion value of a face owned by `sketch`.
    ///
    /// Returns `false` if the face is not one of the sketch's faces. On
    /// success the face and the whole sketch are marked geometry-dirty.
    pub fn set_extrusion_value(&mut self, sketch: SketchKey, face: FaceKey, value: f64) -> bool {
        let Some(data) = self.sketches.get(sketch) else {
            return false;
        };
        let Some(&owned) = data.faces.iter().find(|f| **f == face) else {
            debug!(?sketch, ?face, "Extrusion value for a face the sketch does not own");
            return false;
        };
        let face_id = self.faces[owned].id;
        self.sketches[sketch].extrusion_values.insert(face_id, value);
        self.mark_dirty(EntityKey::Face(owned), DirtyFlags::GEOMETRY);
        self.mark_dirty(EntityKey::Sketch(sketch), DirtyFlags::GEOMETRY);
        true
    }

    /// Drops the extrusion value of a face, returning the removed value.
    pub fn clear_extrusion_value(&mut self, sketch: SketchKey, face: FaceKey) -> Option<f64> {
        let id = self.faces.get(face)?.id;
        let removed = self.sketches.get_mut(sketch)?.extrusion_values.remove(&id);
        if removed.is_some() {
            self.mark_dirty(EntityKey::Face(face), DirtyFlags::GEOMETRY);
            self.mark_dirty(EntityKey::Sketch(sketch), DirtyFlags::GEOMETRY);
        }
        removed
    }

    pub fn extrusion_value(&self, sketch: SketchKey, face: FaceKey) -> Option<f64> {
        let id = self.faces.get(face)?.id;
        self.sketches.get(sketch)?.extrusion_values.get(&id).copied()
    }

    /// Copies the boundary and tags of `source` onto `target`, then moves
    /// the extrusion value keyed by the source face to the target face.
    pub fn copy_face(
        &mut self,
        ctx: &mut KernelContext,
        sketch: SketchKey,
        source: FaceKey,
        target: FaceKey,
    ) -> Result<()> {
        let data = self.sketches.get(sketch).ok_or(Error::SketchNotFound(sketch))?;
        for face in [source, target] {
            if !data.faces.contains(&face) {
                return Err(Error::NotOwned(face, sketch));
            }
        }
        let region = self.face_region(source, ctx.tolerance())?;
        let source_data = &self.faces[source];
        let (source_id, tags) = (source_data.id, source_data.tags.clone());

        self.set_face_region(ctx, target, &region)?;
        let target_data = &mut self.faces[target];
        target_data.tags = tags;
        let target_id = target_data.id;

        let values = &mut self.sketches[sketch].extrusion_values;
        if let Some(value) = values.remove(&source_id) {
            values.insert(target_id, value);
        }
        self.mark_dirty(EntityKey::Sketch(sketch), DirtyFlags::GEOMETRY);
        Ok(())
    }
}
