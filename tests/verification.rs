use nettree::{
    CellLocator, Level, LocatorKind, MetricKind, NetParams, NetTree, NodeId, PointId, PointSet,
    Verifier, Violation,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn build<const D: usize>(
    rows: &[[f64; D]],
    params: NetParams,
    kind: LocatorKind,
) -> (NetTree, Vec<PointId>) {
    let (points, ids) = PointSet::from_rows(MetricKind::Euclidean, rows.iter().copied()).unwrap();
    let mut tree = NetTree::new(points, params);
    tree.construct(&ids, kind).unwrap();
    (tree, ids)
}

fn rows_1d(values: &[f64]) -> Vec<[f64; 1]> {
    values.iter().map(|&v| [v]).collect()
}

fn find_node(tree: &NetTree, point: PointId, level: i32) -> NodeId {
    tree.arena()
        .iter()
        .find(|(_, n)| n.point() == point && n.level() == Level::Finite(level))
        .map(|(id, _)| id)
        .unwrap()
}

const KINDS: [LocatorKind; 4] = [
    LocatorKind::Cells,
    LocatorKind::SinglePath,
    LocatorKind::Frontier,
    LocatorKind::None,
];

fn assert_local(tree: &NetTree, ids: &[PointId]) {
    let verifier = Verifier::new(tree, ids);
    assert_eq!(verifier.relatives_violation(), None);
    assert_eq!(verifier.semi_compression_violation(), None);
    assert_eq!(verifier.local_net_tree_violation(), None);
}

/// Test 1: Three-dimensional points on a line, tau = 4
#[test]
fn test_verify_points_on_a_line() {
    let rows: Vec<[f64; 3]> = [8.0, 1.0, 2.0, 32.0, 64.0, 81.0, 80.0, 160.0]
        .iter()
        .map(|&x| [x, 0.0, 1.0])
        .collect();
    let params = NetParams::new(4.0, 1.0, 1.0, Some(4.0)).unwrap();
    for kind in KINDS {
        let (tree, ids) = build(&rows, params, kind);
        assert_local(&tree, &ids);

        let verifier = Verifier::new(&tree, &ids)
            .with_packing(1.0 / 6.0)
            .with_covering(4.0 / 3.0);
        assert!(verifier.is_global_net_tree());

        let strict = Verifier::new(&tree, &ids);
        assert!(matches!(
            strict.global_net_tree_violation(),
            Some(Violation::Packing { .. })
        ));
    }
}

/// Test 2: Small one-dimensional sets with tau = 5
#[test]
fn test_verify_small_sets() {
    let params = NetParams::new(5.0, 1.0, 1.0, None).unwrap();
    for values in [
        &[7.0, 44.0, 30.0, 24.0, 76.0][..],
        &[25.0, 20.0, 54.0, 30.0, 40.0, 0.0][..],
    ] {
        for kind in KINDS {
            let (tree, ids) = build(&rows_1d(values), params, kind);
            assert_local(&tree, &ids);
            let verifier = Verifier::new(&tree, &ids)
                .with_covering(5.0 / 4.0)
                .with_packing(1.0 / 4.0);
            assert!(verifier.is_global_net_tree(), "{:?} with {:?}", values, kind);
        }
    }
}

/// Test 3: Negative coordinates and near-duplicates, tau = 7
#[test]
fn test_verify_negative_values() {
    let params = NetParams::new(7.0, 1.0, 1.0, None).unwrap();
    let values = [-55.0, 93.0, -90.0, -14.0, -13.0, -12.0];
    for kind in KINDS {
        let (tree, ids) = build(&rows_1d(&values), params, kind);
        assert_local(&tree, &ids);
    }
}

/// Test 4: Two far-apart points stay semi-compressed
#[test]
fn test_two_points_semi_compressed() {
    let params = NetParams::new(7.0, 1.0, 1.0, Some(14.0 / 3.0)).unwrap();
    let (tree, ids) = build(&rows_1d(&[-9956.0, 1288.0]), params, LocatorKind::Cells);
    let verifier = Verifier::new(&tree, &ids);
    assert!(verifier.is_semi_compressed());
    assert!(verifier.relatives_correct());
}

/// Test 5: Random planar sets satisfy every invariant, globally with the
/// sufficient constants
#[test]
fn test_verify_random_planar_sets() {
    let mut rng = StdRng::seed_from_u64(7);
    let tau = 7.0;
    let params = NetParams::new(tau, 1.0, 1.0, None).unwrap();
    let cc = tau / (tau - 1.0);
    let cp = (tau - 3.0) / (2.0 * (tau - 1.0));

    for _ in 0..10 {
        let n = rng.gen_range(2..60);
        let rows: Vec<[f64; 2]> = (0..n)
            .map(|_| [rng.gen_range(-1000.0..1000.0), rng.gen_range(-1000.0..1000.0)])
            .collect();
        for kind in KINDS {
            let (tree, ids) = build(&rows, params, kind);
            assert_local(&tree, &ids);
            let verifier = Verifier::new(&tree, &ids)
                .with_covering(cc)
                .with_packing(cp);
            assert_eq!(verifier.global_net_tree_violation(), None);
        }
    }
}

/// Test 6: Local invariants hold after every single insertion
#[test]
fn test_invariants_after_each_insert() {
    let mut rng = StdRng::seed_from_u64(21);
    let params = NetParams::new(5.0, 1.0, 1.0, None).unwrap();
    let rows: Vec<[f64; 3]> = (0..40)
        .map(|_| {
            [
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
            ]
        })
        .collect();
    let (points, ids) = PointSet::from_rows(MetricKind::Euclidean, rows).unwrap();
    let mut tree = NetTree::new(points, params);
    tree.set_root(ids[0]).unwrap();

    for i in 1..ids.len() {
        tree.insert(ids[i], None).unwrap();
        assert_local(&tree, &ids[..=i]);
    }
}

/// Test 7: Pending points only ever move closer to their center
#[test]
fn test_cell_distances_never_increase() {
    let mut rng = StdRng::seed_from_u64(3);
    let params = NetParams::new(5.0, 1.0, 1.0, None).unwrap();
    let rows: Vec<[f64; 2]> = (0..60)
        .map(|_| [rng.gen_range(0..20) as f64, rng.gen_range(0..20) as f64])
        .collect();
    let (points, ids) = PointSet::from_rows(MetricKind::Euclidean, rows).unwrap();
    let mut tree = NetTree::new(points, params);
    tree.set_root(ids[0]).unwrap();
    let locator = CellLocator::new(&tree.view(), ids[1..].iter().copied()).unwrap();
    tree.set_locator(Box::new(locator));

    let mut last: Vec<f64> = ids[1..].iter().map(|&p| tree.nn_dist(p).unwrap()).collect();
    for i in 1..ids.len() {
        tree.insert(ids[i], None).unwrap();
        for j in i + 1..ids.len() {
            let d = tree.nn_dist(ids[j]).unwrap();
            assert!(d <= last[j - 1] + 1e-9, "point {} moved away", j);
            last[j - 1] = d;
        }
    }

    let mut unique: Vec<PointId> = Vec::new();
    for &id in &ids {
        if !unique.iter().any(|&u| tree.points().same(u, id)) {
            unique.push(id);
        }
    }
    assert_local(&tree, &unique);
}

/// Test 8: A missing relative link is reported
#[test]
fn test_missing_relative_detected() {
    let params = NetParams::new(2.0, 1.0, 1.0, Some(4.0)).unwrap();
    let (mut tree, ids) = build(&rows_1d(&[0.0, 2.0, 11.0, 28.0]), params, LocatorKind::Cells);
    let a = find_node(&tree, ids[0], 4);
    let b = find_node(&tree, ids[3], 4);
    assert!(tree.relatives(a).unwrap().contains(&b));

    tree.arena_mut().remove_relative(a, b);
    let verifier = Verifier::new(&tree, &ids);
    assert!(!verifier.relatives_correct());
    assert!(matches!(
        verifier.relatives_violation(),
        Some(Violation::MissingRelative { level: 4, .. })
    ));
}

/// Test 9: A redundant materialised node breaks semi-compression
#[test]
fn test_redundant_node_detected() {
    let params = NetParams::new(2.0, 1.0, 1.0, Some(4.0)).unwrap();
    let (mut tree, ids) = build(&rows_1d(&[0.0, 2.0, 11.0, 28.0]), params, LocatorKind::Cells);
    assert!(Verifier::new(&tree, &ids).is_semi_compressed());

    let upper = find_node(&tree, ids[2], 2);
    let bottom = tree.get_child(upper).unwrap();
    let arena = tree.arena_mut();
    let extra = arena.alloc(ids[2], Level::Finite(1));
    arena.add_child(upper, extra);
    arena.add_child(extra, bottom);

    let verifier = Verifier::new(&tree, &ids);
    assert!(!verifier.is_semi_compressed());
    assert!(verifier.is_local_net_tree());
}
