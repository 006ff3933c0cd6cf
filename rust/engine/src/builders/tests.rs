// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use floorkit_geometry::{Loop, Point2d, Region};
use floorkit_topology::{KernelContext, LayerKey, LayerSpec, SlabKind, TopologyGraph, SLAB_HOLE_TAG};

use super::*;
use crate::error::{Error, PipelineError};

const TOL: f64 = 1e-6;

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Loop {
    Loop::rectangle(Point2d::new(x0, y0), Point2d::new(x1, y1)).unwrap()
}

fn layer(graph: &mut TopologyGraph, ctx: &mut KernelContext, elevation: f64) -> LayerKey {
    graph.create_layer(
        ctx,
        LayerSpec {
            name: format!("L{elevation}"),
            elevation,
            height: 3.0,
            slab_thickness: Some(0.2),
        },
    )
}

#[test]
fn square_layer_with_one_hole() {
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let ground = layer(&mut graph, &mut ctx, 0.0);
    graph.add_room_loop(ground, rect(0.0, 0.0, 10.0, 10.0)).unwrap();
    let hole_id = graph
        .add_hole_region(&mut ctx, ground, Region::new(rect(2.0, 2.0, 4.0, 4.0)))
        .unwrap();

    let report = LayerSketchBuilder::rebuild(&mut graph, &mut ctx, ground).unwrap();

    assert_eq!(report.background.len(), 1);
    assert_relative_eq!(report.background[0].area(), 100.0, epsilon = 1e-6);
    assert_eq!(report.slab_holes.len(), 1);
    let hole = &report.slab_holes[0];
    assert_eq!(hole.id, hole_id);
    assert!(hole.profile.is_anticlockwise());
    assert_relative_eq!(hole.profile.area(), 4.0, epsilon = 1e-6);

    let slab = graph.slab(report.floor_slab).unwrap();
    assert_eq!(slab.top_faces.len(), 1);
    assert_eq!(slab.bottom_faces.len(), 1);
    for &face in slab.top_faces.iter().chain(slab.bottom_faces.iter()) {
        let holes = graph.face_hole_loops(face, TOL).unwrap();
        assert_eq!(holes.len(), 1);
        assert!(holes[0].is_anticlockwise());
        assert_relative_eq!(holes[0].area(), 4.0, epsilon = 1e-6);
        assert_relative_eq!(graph.face_area(face, TOL).unwrap(), 96.0, epsilon = 1e-6);
    }
    assert_relative_eq!(graph.face(slab.top_faces[0]).unwrap().elevation, 0.0);
    assert_relative_eq!(graph.face(slab.bottom_faces[0]).unwrap().elevation, -0.2, epsilon = 1e-12);

    let sketch = graph.layer(ground).unwrap().sketch.unwrap();
    assert_eq!(sketch, report.sketch);
    assert_eq!(graph.sketch_faces_tagged(sketch, SLAB_HOLE_TAG).len(), 1);
    assert_eq!(graph.sketch_faces(sketch).len(), 2);
    assert_eq!(graph.layer(ground).unwrap().floor_faces, slab.top_faces);
}

#[test]
fn empty_background_leaves_layer_untouched() {
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let ground = layer(&mut graph, &mut ctx, 0.0);
    let sketches = graph.sketch_count();

    let err = LayerSketchBuilder::rebuild(&mut graph, &mut ctx, ground).unwrap_err();

    assert!(matches!(err, Error::Pipeline(PipelineError::EmptyBackground(l)) if l == ground));
    assert_eq!(graph.sketch_count(), sketches);
    assert!(graph.layer(ground).unwrap().sketch.is_none());
    assert!(graph.layer(ground).unwrap().slabs.is_empty());
}

#[test]
fn rebuild_replaces_previous_sketch() {
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let ground = layer(&mut graph, &mut ctx, 0.0);
    graph.add_room_loop(ground, rect(0.0, 0.0, 6.0, 4.0)).unwrap();

    let first = LayerSketchBuilder::rebuild(&mut graph, &mut ctx, ground).unwrap();
    let room = graph.sketch_faces(first.sketch)[0];
    assert!(graph.set_extrusion_value(first.sketch, room, 2.5));

    let second = LayerSketchBuilder::rebuild(&mut graph, &mut ctx, ground).unwrap();

    assert!(graph.sketch(first.sketch).is_none());
    assert_eq!(graph.sketch_count(), 1);
    assert_eq!(graph.layer_slabs(ground, SlabKind::Floor), vec![second.floor_slab]);
    let carried = graph.sketch_faces(second.sketch)[0];
    assert_eq!(graph.extrusion_value(second.sketch, carried), Some(2.5));
}

#[test]
fn failed_floor_build_keeps_previous_state() {
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let ground = layer(&mut graph, &mut ctx, 0.0);
    let upper = layer(&mut graph, &mut ctx, 3.0);
    graph.add_room_loop(upper, rect(0.0, 0.0, 8.0, 5.0)).unwrap();
    let first = LayerSketchBuilder::rebuild(&mut graph, &mut ctx, upper).unwrap();
    let ceiling = first.ceiling_slab.unwrap();
    let counts = |g: &TopologyGraph| {
        [g.sketch_count(), g.slab_count(), g.face_count(), g.edge_count(), g.vertex_count()]
    };
    let before = counts(&graph);

    // floor vertices beyond the coordinate limit fail after the ceiling below
    // has been built
    graph.layer_mut(upper).unwrap().elevation = 2.0 * ctx.config.max_vertex_value;
    graph.add_room_loop(upper, rect(8.0, 0.0, 12.0, 5.0)).unwrap();
    let result = LayerSketchBuilder::rebuild(&mut graph, &mut ctx, upper);

    assert!(matches!(
        result,
        Err(Error::Topology(floorkit_topology::Error::InvalidVertex(..)))
    ));
    assert_eq!(counts(&graph), before);
    assert_eq!(graph.layer(upper).unwrap().sketch, Some(first.sketch));
    assert_eq!(graph.layer_slabs(upper, SlabKind::Floor), vec![first.floor_slab]);
    assert_eq!(graph.layer_slabs(ground, SlabKind::Ceiling), vec![ceiling]);
    assert_eq!(
        graph.layer(upper).unwrap().floor_faces,
        graph.slab(first.floor_slab).unwrap().top_faces
    );
    let ceiling_face = graph.layer(ground).unwrap().ceiling_faces[0];
    assert_relative_eq!(graph.face_area(ceiling_face, TOL).unwrap(), 40.0, epsilon = 1e-6);
}

#[test]
fn walls_contribute_to_background() {
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let ground = layer(&mut graph, &mut ctx, 0.0);
    graph
        .add_wall(&mut ctx, ground, vec![Point2d::new(0.0, 0.0), Point2d::new(10.0, 0.0)], 0.2)
        .unwrap();

    let background = LayerSketchBuilder::generate_background(&graph, &ctx, ground).unwrap();

    assert_eq!(background.len(), 1);
    assert_relative_eq!(background[0].area(), 2.0, epsilon = 1e-6);
}

#[test]
fn hole_outside_background_is_dropped() {
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let ground = layer(&mut graph, &mut ctx, 0.0);
    graph.add_room_loop(ground, rect(0.0, 0.0, 10.0, 10.0)).unwrap();
    graph
        .add_hole_region(&mut ctx, ground, Region::new(rect(20.0, 20.0, 22.0, 22.0)))
        .unwrap();

    let report = LayerSketchBuilder::rebuild(&mut graph, &mut ctx, ground).unwrap();

    assert!(report.slab_holes.is_empty());
    let top = graph.slab(report.floor_slab).unwrap().top_faces[0];
    assert!(graph.face_hole_loops(top, TOL).unwrap().is_empty());
}

#[test]
fn upper_layer_builds_ceiling_of_layer_below() {
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let ground = layer(&mut graph, &mut ctx, 0.0);
    let upper = layer(&mut graph, &mut ctx, 3.0);
    graph.add_room_loop(upper, rect(0.0, 0.0, 8.0, 5.0)).unwrap();

    let report = RoomBuilder::build(&mut graph, &mut ctx, upper).unwrap();

    let ceiling = report.ceiling_slab.unwrap();
    assert_eq!(graph.slab(ceiling).unwrap().layer, Some(ground));
    assert_eq!(graph.layer_slabs(ground, SlabKind::Ceiling), vec![ceiling]);
    let ceiling_faces = &graph.layer(ground).unwrap().ceiling_faces;
    assert_eq!(ceiling_faces.len(), 1);
    assert_relative_eq!(graph.face(ceiling_faces[0]).unwrap().elevation, 3.0, epsilon = 1e-12);
    assert_relative_eq!(graph.face_area(ceiling_faces[0], TOL).unwrap(), 40.0, epsilon = 1e-6);
}

#[test]
fn merge_clips_holes_to_background() {
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let sketch = graph.create_sketch(&mut ctx, None);
    graph
        .set_sketch_background(sketch, vec![Region::new(rect(0.0, 0.0, 10.0, 10.0))])
        .unwrap();
    graph
        .add_sketch_face(&mut ctx, sketch, &Region::new(rect(8.0, 8.0, 12.0, 12.0)), &[SLAB_HOLE_TAG])
        .unwrap();
    graph
        .add_sketch_face(&mut ctx, sketch, &Region::new(rect(7.0, 7.0, 9.0, 9.0)), &[SLAB_HOLE_TAG])
        .unwrap();

    let outcome = Sketch2dBuilder::merge_faces(&mut graph, &mut ctx, sketch).unwrap();

    assert_eq!(outcome.holes.len(), 1);
    assert_eq!(outcome.rooms.len(), 1);
    // (7,7)-(9,9) joined with the clipped (8,8)-(10,10)
    assert_relative_eq!(graph.face_area(outcome.holes[0], TOL).unwrap(), 7.0, epsilon = 1e-6);
    assert_relative_eq!(graph.face_area(outcome.rooms[0], TOL).unwrap(), 93.0, epsilon = 1e-6);
}
