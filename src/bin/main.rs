use cordyceps_avl::AvlMap;

fn keys(map: &AvlMap<u32, &str>) -> Vec<u32> {
    map.iter().map(|(key, _)| *key).collect()
}

fn main() {
    let mut map = AvlMap::new();

    // Ascending inserts trigger single rotations.
    for key in 1..=7 {
        map.insert(key, "ascending");
        map.assert_invariants();
        println!("{:?} (height {})", keys(&map), map.height());
    }

    let first = map.pop_first();
    assert_eq!(first, Some((1, "ascending")));
    map.assert_invariants();
    println!("{:?} (height {})", keys(&map), map.height());

    // The root has two children, so its predecessor takes its place.
    assert_eq!(map.remove(&4), Some("ascending"));
    map.assert_invariants();
    println!("{:?} (height {})", keys(&map), map.height());

    // Overwriting a key keeps the tree's shape.
    assert_eq!(map.insert(5, "replaced"), Some("ascending"));
    assert_eq!(map.lookup(&5), Ok(&"replaced"));

    match map.lookup(&42) {
        Ok(value) => println!("42 => {value}"),
        Err(err) => println!("42: {err}"),
    }

    // A zig-zag insert triggers a double rotation.
    let mut zig_zag: AvlMap<u32, ()> = [(30, ()), (10, ())].into_iter().collect();
    zig_zag.insert(20, ());
    zig_zag.assert_invariants();

    println!("{}", map.to_dotgraph("map"));
    println!("{}", zig_zag.to_dotgraph("zig-zag"));
}
