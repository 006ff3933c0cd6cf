// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use floorkit_geometry::{Loop, Point2d, Region};
use floorkit_topology::io::{dump_all, from_json, load_json};
use floorkit_topology::*;
use rustc_hash::FxHashMap;
use serde_json::json;

const TOL: f64 = 1e-6;

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Loop {
    Loop::rectangle(Point2d::new(x0, y0), Point2d::new(x1, y1)).unwrap()
}

struct Document {
    graph: TopologyGraph,
    ctx: KernelContext,
    layer: LayerKey,
    sketch: SketchKey,
    room: FaceKey,
}

fn document() -> Document {
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let layer = graph.create_layer(
        &mut ctx,
        LayerSpec {
            name: "Ground".into(),
            height: 3.0,
            ..LayerSpec::default()
        },
    );
    graph.add_room_loop(layer, rect(0.0, 0.0, 10.0, 10.0)).unwrap();
    let sketch = graph.create_sketch(&mut ctx, Some(layer));
    graph.set_layer_sketch(layer, sketch).unwrap();
    let room = graph
        .add_sketch_face(
            &mut ctx,
            sketch,
            &Region::with_holes(rect(0.0, 0.0, 10.0, 10.0), vec![rect(2.0, 2.0, 4.0, 4.0)]),
            &["room"],
        )
        .unwrap();
    assert!(graph.set_extrusion_value(sketch, room, 2.7));

    let slab = graph
        .create_slab(&mut ctx, layer, SlabKind::Floor, vec![Region::new(rect(0.0, 0.0, 10.0, 10.0))], 0.2)
        .unwrap();
    graph
        .add_slab_face(&mut ctx, slab, &Region::new(rect(0.0, 0.0, 10.0, 10.0)), 0.0, true)
        .unwrap();

    let roof = graph
        .create_roof(
            &mut ctx,
            layer,
            RoofSpec {
                boundary: rect(0.0, 0.0, 10.0, 10.0),
                room_height: 3.0,
                linked_walls: Vec::new(),
                generation: RoofGeneration::Hip,
            },
        )
        .unwrap();
    graph.add_opening(&mut ctx, roof, rect(4.0, 4.0, 5.0, 5.0)).unwrap();

    Document {
        graph,
        ctx,
        layer,
        sketch,
        room,
    }
}

#[test]
fn document_survives_a_json_round_trip() {
    let doc = document();
    let records = dump_all(&doc.graph, &mut DumpOptions::default()).unwrap();
    let json = serde_json::to_string(&records).unwrap();

    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    from_json(&mut graph, &mut ctx, &json, &mut LoadContext::new()).unwrap();

    assert_eq!(graph.layer_count(), 1);
    assert_eq!(graph.sketch_count(), 1);
    assert_eq!(graph.slab_count(), 1);
    assert_eq!(graph.roof_count(), 1);
    assert_eq!(graph.opening_count(), 1);
    assert_eq!(graph.face_count(), doc.graph.face_count());
    assert_eq!(graph.edge_count(), doc.graph.edge_count());
    assert_eq!(graph.vertex_count(), doc.graph.vertex_count());

    let layer = graph.layers()[0];
    let data = graph.layer(layer).unwrap();
    assert_eq!(data.name, "Ground");
    assert_eq!(data.room_loops.len(), 1);
    let sketch = data.sketch.unwrap();
    assert_eq!(graph.sketch(sketch).unwrap().layer, Some(layer));

    let room_id = doc.graph.face(doc.room).unwrap().id;
    let room = graph.find_face(room_id).unwrap();
    assert_eq!(graph.face(room).unwrap().owner, FaceOwner::Sketch(sketch));
    assert!(graph.face(room).unwrap().has_tag("room"));
    assert_relative_eq!(graph.face_area(room, TOL).unwrap(), 96.0, epsilon = 1e-9);
    assert_eq!(graph.extrusion_value(sketch, room), Some(2.7));

    let roof = graph.layer(layer).unwrap().roofs[0];
    assert_eq!(graph.roof(roof).unwrap().generation, RoofGeneration::Hip);
    let opening = graph.roof(roof).unwrap().openings[0];
    assert_eq!(graph.opening(opening).unwrap().host, Some(roof));

    // fresh ids never collide with loaded ones
    let next = ctx.next_id();
    assert!(next > doc.graph.entity_id(EntityKey::Layer(doc.layer)).unwrap());
    assert!(graph.find_face(next).is_none());
}

#[test]
fn moving_a_loaded_vertex_updates_the_loaded_face() {
    let doc = document();
    let records = dump_all(&doc.graph, &mut DumpOptions::default()).unwrap();

    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    io::load(&mut graph, &mut ctx, &records, &mut LoadContext::new()).unwrap();

    let room = graph.find_face(doc.graph.face(doc.room).unwrap().id).unwrap();
    let corner = graph.face_vertices(room).unwrap()[2];
    let [x, y, _] = graph.vertex_coords(corner).unwrap();
    assert_eq!((x, y), (10.0, 10.0));
    assert!(graph.set_vertex(&ctx, corner, 12.0, 10.0, 0.0, true));
    assert!(graph.dirty_flags(EntityKey::Face(room)).geometry);
    assert_relative_eq!(graph.face_area(room, TOL).unwrap(), 106.0, epsilon = 1e-9);
}

#[test]
fn importing_with_an_id_map_assigns_fresh_ids() {
    let mut doc = document();
    let records = dump_all(&doc.graph, &mut DumpOptions::default()).unwrap();
    let sketch_id = doc.graph.sketch(doc.sketch).unwrap().id;

    let mut id_map = FxHashMap::default();
    id_map.insert(sketch_id, EntityId(10_000));
    let mut lctx = LoadContext::remapping(id_map);
    io::load(&mut doc.graph, &mut doc.ctx, &records, &mut lctx).unwrap();

    assert_eq!(doc.graph.layer_count(), 2);
    assert_eq!(doc.graph.layers().len(), 2);

    let imported = doc.graph.layers()[1];
    let sketch = doc.graph.layer(imported).unwrap().sketch.unwrap();
    assert_eq!(doc.graph.sketch(sketch).unwrap().id, EntityId(10_000));

    // every imported face got a new id and keeps its extrusion value
    let room = doc.graph.sketch_faces(sketch)[0];
    let room_id = doc.graph.face(room).unwrap().id;
    assert_ne!(room_id, doc.graph.face(doc.room).unwrap().id);
    assert_eq!(doc.graph.extrusion_value(sketch, room), Some(2.7));
    assert_eq!(doc.graph.extrusion_value(doc.sketch, doc.room), Some(2.7));
}

#[test]
fn legacy_documents_load() {
    let value = json!([
        { "Class": "Vertex", "id": 1, "x": 0.0, "y": 0.0 },
        { "Class": "Vertex", "id": 2, "x": 4.0, "y": 0.0 },
        { "Class": "Vertex", "id": 3, "x": 4.0, "y": 3.0 },
        { "Class": "Edge", "id": 4, "start": 1, "end": 2,
          "curve": { "type": "line", "start": [0.0, 0.0], "end": [4.0, 0.0] } },
        { "Class": "Edge", "id": 5, "start": 2, "end": 3,
          "curve": { "type": "line", "start": [4.0, 0.0], "end": [4.0, 3.0] } },
        { "Class": "Edge", "id": 6, "start": 3, "end": 1,
          "curve": { "type": "line", "start": [4.0, 3.0], "end": [0.0, 0.0] } },
        { "Class": "Face", "id": 7,
          "outer": { "edges": [4, 5, 6], "orientations": [true, true, true] } },
        { "Class": "Sketch2D", "id": 8, "faces": [7],
          "_extrusionValueMap": { "7": 1.5 },
          "transform": [1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 2, 0, 0, 1] }
    ]);

    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let keys = load_json(&mut graph, &mut ctx, value, &mut LoadContext::new()).unwrap();
    let EntityKey::Sketch(sketch) = keys[7] else {
        panic!("expected a sketch key, got {:?}", keys[7]);
    };
    let EntityKey::Face(face) = keys[6] else {
        panic!("expected a face key, got {:?}", keys[6]);
    };

    assert_eq!(graph.extrusion_value(sketch, face), Some(1.5));
    assert_relative_eq!(graph.face_area(face, TOL).unwrap(), 6.0, epsilon = 1e-9);

    let path = graph.face_world_raw_path2d(face).unwrap();
    assert_eq!(path.outer.len(), 3);
    assert_relative_eq!(path.outer[0].start().x, 2.0, epsilon = 1e-12);

    // written back under the canonical key and tag
    let records = io::dump(&graph, sketch.into(), &mut DumpOptions::default()).unwrap();
    let written = serde_json::to_value(&records).unwrap();
    let sketch_record = &written[written.as_array().unwrap().len() - 1];
    assert_eq!(sketch_record["Class"], json!("Sketch2d"));
    assert_eq!(sketch_record["extrusionValueMap"], json!([[7, 1.5]]));
    assert_eq!(sketch_record["transform"]["elements"][12], json!(2.0));
}

#[test]
fn unknown_classes_are_rejected() {
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let result = load_json(
        &mut graph,
        &mut ctx,
        json!([{ "Class": "Beam", "id": 1 }]),
        &mut LoadContext::new(),
    );
    assert!(matches!(result, Err(Error::UnknownClass(tag)) if tag == "Beam"));
    assert_eq!(graph.vertex_count(), 0);
}

fn two_vertices_and(edge: serde_json::Value) -> serde_json::Value {
    json!([
        { "Class": "Vertex", "id": 1, "x": 0.0, "y": 0.0 },
        { "Class": "Vertex", "id": 2, "x": 1.0, "y": 0.0 },
        edge
    ])
}

#[test]
fn malformed_arc_edges_are_rejected() {
    let value = two_vertices_and(json!({
        "Class": "Edge", "id": 3, "start": 1, "end": 2,
        "curve": { "type": "arc", "center": [50.0, 50.0], "radius": -3.0,
                   "start": [7.0, 7.0], "end": [9.0, 9.0], "clockwise": false }
    }));
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let result = load_json(&mut graph, &mut ctx, value, &mut LoadContext::new());
    assert!(matches!(result, Err(Error::Geometry(floorkit_geometry::Error::InvalidCurve(_)))));
    assert_eq!(graph.vertex_count(), 0);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn edge_curve_must_end_on_its_vertices() {
    let value = two_vertices_and(json!({
        "Class": "Edge", "id": 3, "start": 1, "end": 2,
        "curve": { "type": "line", "start": [0.0, 0.0], "end": [5.0, 0.0] }
    }));
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let result = load_json(&mut graph, &mut ctx, value, &mut LoadContext::new());
    assert!(matches!(result, Err(Error::CurveMismatch)));
}

#[test]
fn open_face_wires_are_rejected() {
    let value = json!([
        { "Class": "Vertex", "id": 1, "x": 0.0, "y": 0.0 },
        { "Class": "Vertex", "id": 2, "x": 4.0, "y": 0.0 },
        { "Class": "Vertex", "id": 3, "x": 4.0, "y": 3.0 },
        { "Class": "Edge", "id": 4, "start": 1, "end": 2,
          "curve": { "type": "line", "start": [0.0, 0.0], "end": [4.0, 0.0] } },
        { "Class": "Edge", "id": 5, "start": 2, "end": 3,
          "curve": { "type": "line", "start": [4.0, 0.0], "end": [4.0, 3.0] } },
        { "Class": "Face", "id": 6,
          "outer": { "edges": [4, 5], "orientations": [true, true] } }
    ]);
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let result = load_json(&mut graph, &mut ctx, value, &mut LoadContext::new());
    assert!(matches!(result, Err(Error::Geometry(floorkit_geometry::Error::OpenLoop(..)))));
    assert_eq!(graph.face_count(), 0);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn ids_at_the_end_of_the_range_are_rejected() {
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let result = load_json(
        &mut graph,
        &mut ctx,
        json!([{ "Class": "Vertex", "id": u64::MAX, "x": 0.0, "y": 0.0 }]),
        &mut LoadContext::new(),
    );
    assert!(matches!(result, Err(Error::IdOutOfRange(EntityId(u64::MAX)))));
    assert_eq!(graph.vertex_count(), 0);
    assert_eq!(ctx.next_id(), EntityId(1));
}

#[test]
fn failed_load_leaves_the_graph_unchanged() {
    let doc = document();
    let mut records = dump_all(&doc.graph, &mut DumpOptions::default()).unwrap();
    records.push(EntityRecord::Edge(io::EdgeRecord {
        id: EntityId(90_000),
        start: EntityId(91_000),
        end: EntityId(92_000),
        curve: floorkit_geometry::Curve2d::line(Point2d::new(0.0, 0.0), Point2d::new(1.0, 0.0)),
    }));

    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let existing = graph.create_layer(&mut ctx, LayerSpec::default());
    let mut lctx = LoadContext::new();
    let result = io::load(&mut graph, &mut ctx, &records, &mut lctx);

    assert!(matches!(result, Err(Error::UnresolvedReference(EntityId(91_000)))));
    assert_eq!(graph.layers(), &[existing]);
    assert_eq!(graph.layer_count(), 1);
    assert_eq!(graph.vertex_count(), 0);
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.face_count(), 0);
    assert_eq!(graph.sketch_count(), 0);
    assert_eq!(graph.slab_count(), 0);
    assert_eq!(graph.roof_count(), 0);
    assert_eq!(graph.opening_count(), 0);
    assert!(lctx.key_of(doc.graph.face(doc.room).unwrap().id).is_none());
}

#[test]
fn failed_load_restores_owners_from_an_earlier_load() {
    let doc = document();
    let records = dump_all(&doc.graph, &mut DumpOptions::default()).unwrap();
    let mut ctx = KernelContext::default();
    let mut graph = TopologyGraph::new();
    let mut lctx = LoadContext::new();
    io::load(&mut graph, &mut ctx, &records, &mut lctx).unwrap();

    let room_id = doc.graph.face(doc.room).unwrap().id;
    let room = graph.find_face(room_id).unwrap();
    let owner = graph.face(room).unwrap().owner;
    let sketch_count = graph.sketch_count();

    // a second sketch claims the room, then a dangling edge aborts the load
    let second = json!([
        { "Class": "Sketch2d", "id": 80_000, "faces": [room_id.0] },
        { "Class": "Edge", "id": 80_001, "start": 81_000, "end": 82_000,
          "curve": { "type": "line", "start": [0.0, 0.0], "end": [1.0, 0.0] } }
    ]);
    assert!(load_json(&mut graph, &mut ctx, second, &mut lctx).is_err());
    assert_eq!(graph.face(room).unwrap().owner, owner);
    assert_eq!(graph.sketch_count(), sketch_count);
    assert_eq!(lctx.key_of(room_id), Some(EntityKey::Face(room)));
}
