use nettree::{
    Level, LocatorKind, MetricKind, NetParams, NetTree, NodeId, PointId, PointSet, TreeStats,
    Verifier,
};

const SCENARIO: &str = "0@inf[0@5[0@4[0@3[0@2[0@1[0@0[0@-1[0@-inf]],2@0[2@-1[2@-inf]]]]],\
11@3[11@2[11@-inf]]],28@4[28@3[28@-inf]]]]";

fn tree_1d(values: &[f64], tau: f64, cr: Option<f64>) -> (NetTree, Vec<PointId>) {
    let (points, ids) =
        PointSet::from_rows(MetricKind::Euclidean, values.iter().map(|&v| [v])).unwrap();
    let params = NetParams::new(tau, 1.0, 1.0, cr).unwrap();
    (NetTree::new(points, params), ids)
}

/// Canonical rendering: `x@level` followed by the sorted renderings of the
/// children in brackets.
fn render(tree: &NetTree, id: NodeId) -> String {
    let point = tree.point_of(id).unwrap();
    let mut out = format!("{}@{}", tree.points()[point][0], tree.level(id).unwrap());
    let children = tree.children(id).unwrap();
    if !children.is_empty() {
        let mut parts: Vec<String> = children.iter().map(|&c| render(tree, c)).collect();
        parts.sort();
        out.push('[');
        out.push_str(&parts.join(","));
        out.push(']');
    }
    out
}

fn child_with_point(tree: &NetTree, id: NodeId, point: PointId) -> NodeId {
    tree.children(id)
        .unwrap()
        .iter()
        .copied()
        .find(|&c| tree.point_of(c) == Some(point))
        .unwrap()
}

fn scenario_tree() -> (NetTree, Vec<PointId>) {
    let (mut tree, ids) = tree_1d(&[0.0, 2.0, 11.0, 28.0], 2.0, Some(4.0));
    let root = tree.set_root(ids[0]).unwrap();
    tree.insert(ids[1], Some(root)).unwrap();
    tree.insert(ids[2], Some(root)).unwrap();
    let top = tree.get_child(root).unwrap();
    let below = child_with_point(&tree, top, ids[2]);
    tree.insert(ids[3], Some(below)).unwrap();
    (tree, ids)
}

/// Test 1: Inserting 0, 2, 11, 28 reproduces the reference level assignment
#[test]
fn test_insert_scenario_levels() {
    let (tree, ids) = scenario_tree();
    let root = tree.root().unwrap();
    assert_eq!(render(&tree, root), SCENARIO);

    let top = tree.get_child(root).unwrap();
    assert_eq!(tree.point_of(top), Some(ids[0]));
    assert_eq!(tree.level(top), Some(Level::Finite(5)));

    let n1 = child_with_point(&tree, top, ids[0]);
    let n2 = child_with_point(&tree, top, ids[3]);
    assert_eq!(tree.level(n1), Some(Level::Finite(4)));
    assert_eq!(tree.level(n2), Some(Level::Finite(4)));

    let n4 = child_with_point(&tree, n1, ids[2]);
    assert_eq!(tree.level(n4), Some(Level::Finite(3)));
    let n4_child = tree.get_child(n4).unwrap();
    assert_eq!(tree.level(n4_child), Some(Level::Finite(2)));
    assert_eq!(
        tree.level(tree.get_child(n4_child).unwrap()),
        Some(Level::NegInf)
    );
}

/// Test 2: The scenario tree passes every check
#[test]
fn test_insert_scenario_verifies() {
    let (tree, ids) = scenario_tree();
    let verifier = Verifier::new(&tree, &ids);

    assert!(verifier.is_local_net_tree());
    assert!(verifier.is_global_net_tree());
    assert!(verifier.is_semi_compressed());
    assert!(verifier.relatives_correct());

    let levels = verifier.uncomp_levels();
    assert_eq!(levels.keys().copied().collect::<Vec<_>>(), (-1..=5).collect::<Vec<_>>());
    assert_eq!(levels[&0].len(), 4);
    assert_eq!(levels[&5].len(), 1);
}

/// Test 3: Minimum relative levels for every pair of scenario points
#[test]
fn test_min_level_table() {
    let (tree, ids) = scenario_tree();
    let verifier = Verifier::new(&tree, &ids);
    let expected = [
        ((0, 1), -1),
        ((0, 2), 2),
        ((0, 3), 3),
        ((1, 2), 2),
        ((1, 3), 3),
        ((2, 3), 3),
    ];
    for ((a, b), level) in expected {
        assert_eq!(verifier.min_level(ids[a], ids[b]), Level::Finite(level));
        assert_eq!(verifier.min_level(ids[b], ids[a]), Level::Finite(level));
    }
    assert_eq!(verifier.min_level(ids[2], ids[2]), Level::NegInf);
}

/// Test 4: Rebuilding the level tables is repeatable
#[test]
fn test_level_tables_are_pure() {
    let (tree, ids) = scenario_tree();
    let mut verifier = Verifier::new(&tree, &ids);
    let levels = verifier.find_uncomp_levels().clone();
    let mins = verifier.find_min_level_rels().clone();
    verifier.populate();
    assert_eq!(verifier.find_uncomp_levels(), &levels);
    assert_eq!(verifier.find_min_level_rels(), &mins);
}

/// Test 5: Construction with every locator reproduces the scenario tree
#[test]
fn test_construct_matches_insertion() {
    for kind in [
        LocatorKind::Cells,
        LocatorKind::SinglePath,
        LocatorKind::Frontier,
        LocatorKind::None,
    ] {
        let (mut tree, ids) = tree_1d(&[0.0, 2.0, 11.0, 28.0], 2.0, Some(4.0));
        let root = tree.construct(&ids, kind).unwrap();
        assert_eq!(render(&tree, root), SCENARIO, "locator {:?}", kind);
        assert_eq!(tree.locator().kind(), kind);
    }
}

/// Test 6: Statistics of constructed trees
#[test]
fn test_construct_stats() {
    let cases: [(&[f64], f64, Option<f64>, TreeStats); 3] = [
        (
            &[2.0, 11.0, 28.0, 0.0],
            2.0,
            Some(4.0),
            TreeStats {
                node_count: 12,
                child_count: 12,
                relative_count: 26,
                level_count: 6,
                jump_count: 0,
            },
        ),
        (
            &[25.0, 20.0, 54.0, 30.0, 40.0, 0.0],
            5.0,
            None,
            TreeStats {
                node_count: 10,
                child_count: 10,
                relative_count: 30,
                level_count: 3,
                jump_count: 0,
            },
        ),
        (
            &[2.0, 65.0, 69.0, 0.0],
            2.0,
            Some(4.0),
            TreeStats {
                node_count: 14,
                child_count: 14,
                relative_count: 26,
                level_count: 6,
                jump_count: 2,
            },
        ),
    ];

    for (values, tau, cr, expected) in cases {
        for kind in [
            LocatorKind::Cells,
            LocatorKind::SinglePath,
            LocatorKind::Frontier,
            LocatorKind::None,
        ] {
            let (mut tree, ids) = tree_1d(values, tau, cr);
            tree.construct(&ids, kind).unwrap();
            assert_eq!(TreeStats::of(&tree), expected, "{:?} with {:?}", values, kind);
        }
    }
}

/// Test 7: Stats of a tree holding only its root
#[test]
fn test_stats_of_root_only_tree() {
    let (mut tree, ids) = tree_1d(&[4.0], 5.0, None);
    assert_eq!(TreeStats::of(&tree), TreeStats::default());
    tree.set_root(ids[0]).unwrap();
    assert_eq!(TreeStats::of(&tree), TreeStats::default());
}
