//! Golden tests for lumen-atlas.
//!
//! These tests verify determinism of relaxation and export, and the
//! load/save round-trip law of atlas documents.

use lumen_atlas::{
    canonical_hash_hex, Atlas, AtlasDocument, CancellationToken, Dimensions, EdgeSet,
    NodeMetadata, RelaxationPolicy, SessionId, Vec2,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Two strips on a jacket front, with surface and region annotations.
fn build_jacket() -> Atlas {
    let mut atlas = Atlas::default();
    let session = SessionId::new("session_golden");

    let left: Vec<_> = (0..5)
        .map(|i| {
            atlas.create_node(
                NodeMetadata::new()
                    .with_chunk("left", i)
                    .with_region("front_left"),
            )
        })
        .collect();
    let right: Vec<_> = (0..5)
        .map(|i| {
            atlas.create_node(
                NodeMetadata::new()
                    .with_chunk("right", i)
                    .with_region("front_right")
                    .with_tag("zipper"),
            )
        })
        .collect();

    for strip in [&left, &right] {
        for w in strip.windows(2) {
            atlas.upsert_edge(EdgeSet::Strip, w[0], w[1], 1.0).unwrap();
        }
    }
    for (l, r) in left.iter().zip(&right) {
        atlas.upsert_edge(EdgeSet::Surface, *l, *r, 0.75).unwrap();
    }
    atlas.upsert_edge(EdgeSet::Region, left[0], right[0], 1.0).unwrap();

    for (i, &id) in left.iter().enumerate() {
        atlas
            .observe_and_place(id, Vec2::new(0.0, i as f64 * 12.0), Some(session.clone()))
            .unwrap();
    }
    for (i, &id) in right.iter().enumerate() {
        atlas
            .observe_and_place(id, Vec2::new(30.0, i as f64 * 12.0 + 1.0), Some(session.clone()))
            .unwrap();
    }
    atlas.place_manually(right[4], Vec2::new(3.0, 4.0)).unwrap();
    atlas
}

// ─────────────────────────────────────────────────────────────────────────────
// Determinism
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_same_state_same_export_100_runs() {
    let mut atlas = build_jacket();
    atlas.relax(&CancellationToken::new()).unwrap();

    for dims in [Dimensions::Two, Dimensions::Three] {
        let reference = atlas.export(dims);
        let fingerprint = reference.fingerprint();
        for _ in 0..100 {
            let again = atlas.export(dims);
            assert_eq!(again, reference);
            assert_eq!(again.fingerprint(), fingerprint);
        }
    }
}

#[test]
fn test_independent_builds_relax_identically() {
    let mut first = build_jacket();
    let mut second = build_jacket();
    let r1 = first.relax(&CancellationToken::new()).unwrap();
    let r2 = second.relax(&CancellationToken::new()).unwrap();
    assert_eq!(r1.iterations, r2.iterations);

    let e1 = first.export(Dimensions::Three);
    let e2 = second.export(Dimensions::Three);
    for (id, p1) in &e1.positions {
        let p2 = e2.get(*id).unwrap();
        assert_eq!(p1.x.to_bits(), p2.x.to_bits());
        assert_eq!(p1.y.to_bits(), p2.y.to_bits());
        assert_eq!(p1.z, p2.z);
    }
}

#[test]
fn test_snapshot_id_tracks_state() {
    let mut atlas = build_jacket();
    let before = atlas.snapshot().snapshot_id;
    assert_eq!(before, atlas.snapshot().snapshot_id);

    atlas.relax(&CancellationToken::new()).unwrap();
    let after = atlas.snapshot().snapshot_id;
    assert_ne!(before, after);
    assert_eq!(atlas.export(Dimensions::Two).snapshot_id, after);
}

#[test]
fn test_policy_param_change_changes_hash() {
    let policy = RelaxationPolicy::default();
    let mut tweaked = RelaxationPolicy::default();
    tweaked.forces.surface_attraction = 0.06;

    assert_eq!(policy.params_hash(), RelaxationPolicy::default().params_hash());
    assert_ne!(policy.params_hash(), tweaked.params_hash());
    // Sub-quantum noise does not change the hash.
    let mut noisy = RelaxationPolicy::default();
    noisy.max_step += 1e-9;
    assert_eq!(policy.params_hash(), noisy.params_hash());
}

#[test]
fn test_canonical_hash_determinism() {
    let data = vec![("strip", 1u64, 2u64), ("surface", 1, 3)];
    let h1 = canonical_hash_hex(&data);
    let h2 = canonical_hash_hex(&data);
    assert_eq!(h1, h2);
    assert_eq!(h1.len(), 16);
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip law
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_saved_atlas_round_trips_exactly() {
    let mut atlas = build_jacket();
    atlas.relax(&CancellationToken::new()).unwrap();

    for include_coordinates in [true, false] {
        let saved = atlas.to_document(include_coordinates).to_json_string().unwrap();
        let doc = AtlasDocument::from_json_str(&saved).unwrap();
        let reloaded = Atlas::from_document(doc, RelaxationPolicy::default()).unwrap();
        let resaved = reloaded
            .to_document(include_coordinates)
            .to_json_string()
            .unwrap();
        assert_eq!(saved, resaved);
    }
}

#[test]
fn test_reload_with_coordinates_exports_identically() {
    let mut atlas = build_jacket();
    atlas.relax(&CancellationToken::new()).unwrap();

    let doc = atlas.to_document(true);
    let reloaded = Atlas::from_document(doc, RelaxationPolicy::default()).unwrap();
    assert_eq!(atlas.export(Dimensions::Three), reloaded.export(Dimensions::Three));
}

const HAND_WRITTEN: &str = r#"{
  "schema_version": "lumen_atlas_v1",
  "nodes": [
    {
      "id": 10,
      "metadata": {
        "chunk_id": "hood",
        "index_in_chunk": 0,
        "region": "hood",
        "tags": ["edge", "visible"],
        "description": "first pixel after the connector",
        "confidence": 0.9,
        "color_order": "GRB",
        "solder": {"rework": true, "by": "mk"}
      },
      "created_at": "2026-03-01T12:00:00Z",
      "active": true
    },
    {
      "id": 11,
      "metadata": {"chunk_id": "hood", "index_in_chunk": 1},
      "created_at": "2026-03-01T12:00:05Z",
      "active": true
    },
    {
      "id": 4,
      "metadata": {},
      "created_at": "2026-03-02T08:30:00Z",
      "active": false
    }
  ],
  "strip": [[10, 11, 1.0]],
  "surface": [[4, 11, 0.25], [10, 11, 0.5]],
  "region": [],
  "observations": [
    {"sequence": 2, "node": 10, "camera_position": {"x": 101.5, "y": 40.25}, "session": "s1"},
    {"sequence": 5, "node": 11, "camera_position": {"x": 111.0, "y": 40.0}},
    {"sequence": 9, "node": 10, "camera_position": {"x": 102.5, "y": 39.75}, "session": "s2"}
  ],
  "atlas_coordinates": [
    {"node": 10, "position": {"x": 0.0, "y": 0.0}, "seed": {"x": 0.5, "y": -0.5}, "source": "observed"},
    {"node": 11, "position": {"x": 1.0, "y": 0.125}, "seed": {"x": 1.0, "y": 0.0}, "source": "manual"}
  ]
}"#;

#[test]
fn test_hand_written_document_round_trips_with_unknown_keys() {
    let original: serde_json::Value = serde_json::from_str(HAND_WRITTEN).unwrap();

    let doc = AtlasDocument::from_json_str(HAND_WRITTEN).unwrap();
    let atlas = Atlas::from_document(doc, RelaxationPolicy::default()).unwrap();
    let saved = atlas.to_document(true).to_json_string().unwrap();
    let resaved: serde_json::Value = serde_json::from_str(&saved).unwrap();

    assert_eq!(original, resaved);
    let hood = atlas.nodes().nodes_in_region("hood").next().unwrap();
    assert_eq!(hood.metadata.extra["color_order"], "GRB");
}
