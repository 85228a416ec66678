use userprops_core::{
    open_scene_file, open_scene_in_memory, AttributeSpec, HostError, NodeKind, NodeRef,
    PropertyStore, PropertyValue, SceneHost, SqliteScene, StoreError,
};

#[test]
fn properties_persist_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shot010.sqlite3");

    let cube_id = {
        let conn = open_scene_file(&path).unwrap();
        let scene = SqliteScene::new(&conn).unwrap();
        let root = scene.create_node("set", None, NodeKind::Dag).unwrap();
        let cube = scene.create_node("pCube1", Some(root), NodeKind::Dag).unwrap();

        let mut store = PropertyStore::open(&scene, "|set|pCube1").unwrap();
        store.set("scale", 2.5).unwrap();
        store.set(1, PropertyValue::Vector([0.0, 1.0, 0.0])).unwrap();
        cube
    };

    let conn = open_scene_file(&path).unwrap();
    let scene = SqliteScene::new(&conn).unwrap();
    let store = PropertyStore::open(&scene, NodeRef::Id(cube_id)).unwrap();
    assert_eq!(store.node_path().unwrap(), "|set|pCube1");
    assert_eq!(store.get("scale").unwrap(), &PropertyValue::Float(2.5));
    assert_eq!(
        store.get(1).unwrap(),
        &PropertyValue::Vector([0.0, 1.0, 0.0])
    );
    assert_eq!(
        scene.get_string_attribute("|set|pCube1", "nts").unwrap(),
        store.read_buffer().unwrap()
    );
}

#[test]
fn corrupt_notes_are_replaced_with_empty_mapping() {
    let conn = open_scene_in_memory().unwrap();
    let scene = SqliteScene::new(&conn).unwrap();
    scene.create_node("pSphere1", None, NodeKind::Dag).unwrap();
    scene
        .add_string_attribute("|pSphere1", &AttributeSpec::default())
        .unwrap();
    scene
        .set_string_attribute("|pSphere1", "notes", "<<binary junk>>")
        .unwrap();

    let store = PropertyStore::open(&scene, "pSphere1").unwrap();
    assert!(store.is_empty());
    assert_eq!(
        scene.get_string_attribute("|pSphere1", "notes").unwrap(),
        "{}"
    );
}

#[test]
fn locked_node_blocks_attribute_creation_only() {
    let conn = open_scene_in_memory().unwrap();
    let scene = SqliteScene::new(&conn).unwrap();
    let node = scene.create_node("cam_grp", None, NodeKind::Dag).unwrap();
    scene.set_locked(node, true).unwrap();

    let mut store = PropertyStore::open(&scene, "cam_grp").unwrap();
    store.ensure_attribute().unwrap();
    assert!(!scene.has_attribute("|cam_grp", "notes").unwrap());
    assert!(matches!(
        store.set("focal", 35),
        Err(StoreError::AttributeMissing { .. })
    ));

    assert!(matches!(
        scene.rename_node(node, "camera_grp"),
        Err(HostError::Locked(_))
    ));

    scene.set_locked(node, false).unwrap();
    store.set("focal", 35).unwrap();
    assert!(scene.has_attribute("|cam_grp", "notes").unwrap());
}

#[test]
fn hierarchy_edits_are_reflected_in_paths() {
    let conn = open_scene_in_memory().unwrap();
    let scene = SqliteScene::new(&conn).unwrap();
    let rig = scene.create_node("rig", None, NodeKind::Dag).unwrap();
    let spine = scene.create_node("spine", Some(rig), NodeKind::Dag).unwrap();
    let head = scene.create_node("head", Some(spine), NodeKind::Dag).unwrap();

    let store = PropertyStore::open(&scene, "head").unwrap();
    assert_eq!(store.node_path().unwrap(), "|rig|spine|head");

    scene.reparent_node(head, Some(rig)).unwrap();
    assert_eq!(store.node_path().unwrap(), "|rig|head");

    scene.rename_node(rig, "skeleton").unwrap();
    assert_eq!(store.node_path().unwrap(), "|skeleton|head");

    assert!(matches!(
        scene.reparent_node(rig, Some(spine)),
        Err(HostError::InvalidHierarchy(_))
    ));
}

#[test]
fn sibling_paths_must_be_unique_and_names_valid() {
    let conn = open_scene_in_memory().unwrap();
    let scene = SqliteScene::new(&conn).unwrap();
    let rig = scene.create_node("rig", None, NodeKind::Dag).unwrap();
    scene.create_node("ctrl", Some(rig), NodeKind::Dag).unwrap();

    assert!(matches!(
        scene.create_node("ctrl", Some(rig), NodeKind::Dag),
        Err(HostError::InvalidHierarchy(_))
    ));
    assert!(matches!(
        scene.create_node("bad name", None, NodeKind::Dag),
        Err(HostError::InvalidName(_))
    ));
    assert!(matches!(
        scene.create_node("shader", Some(rig), NodeKind::Dependency),
        Err(HostError::InvalidHierarchy(_))
    ));

    scene.create_node("ctrl", None, NodeKind::Dag).unwrap();
    assert!(matches!(
        scene.resolve(&NodeRef::Name("ctrl".to_string())),
        Err(HostError::AmbiguousName(_))
    ));
}

#[test]
fn list_nodes_reports_paths_and_lock_state() {
    let conn = open_scene_in_memory().unwrap();
    let scene = SqliteScene::new(&conn).unwrap();
    let rig = scene.create_node("rig", None, NodeKind::Dag).unwrap();
    scene.create_node("arm", Some(rig), NodeKind::Dag).unwrap();
    scene
        .create_node("blinn1", None, NodeKind::Dependency)
        .unwrap();
    scene.set_locked(rig, true).unwrap();

    let nodes = scene.list_nodes().unwrap();
    let paths: Vec<_> = nodes.iter().map(|node| node.path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            Some("|rig".to_string()),
            Some("|rig|arm".to_string()),
            None
        ]
    );
    assert!(nodes[0].locked);
    assert_eq!(nodes[2].kind, NodeKind::Dependency);
}

#[test]
fn remove_attribute_then_store_recreates_it() {
    let conn = open_scene_in_memory().unwrap();
    let scene = SqliteScene::new(&conn).unwrap();
    scene.create_node("pPlane1", None, NodeKind::Dag).unwrap();

    let mut store = PropertyStore::open(&scene, "pPlane1").unwrap();
    store.set("a", 1).unwrap();
    scene.remove_attribute("|pPlane1", "notes").unwrap();
    assert!(matches!(
        store.read_buffer(),
        Err(StoreError::AttributeMissing { .. })
    ));

    store.set("b", 2).unwrap();
    let reopened = PropertyStore::open(&scene, "pPlane1").unwrap();
    assert_eq!(reopened.len(), 2);
}

#[test]
fn dependency_node_keeps_its_name_to_itself() {
    let conn = open_scene_in_memory().unwrap();
    let scene = SqliteScene::new(&conn).unwrap();
    let rig = scene.create_node("rig", None, NodeKind::Dag).unwrap();
    let shared = scene
        .create_node("shared", None, NodeKind::Dependency)
        .unwrap();

    assert!(matches!(
        scene.create_node("shared", None, NodeKind::Dag),
        Err(HostError::InvalidHierarchy(_))
    ));
    assert!(matches!(
        scene.create_node("shared", Some(rig), NodeKind::Dag),
        Err(HostError::InvalidHierarchy(_))
    ));
    assert!(matches!(
        scene.rename_node(rig, "shared"),
        Err(HostError::InvalidHierarchy(_))
    ));

    let mut store = PropertyStore::open(&scene, shared).unwrap();
    store.set("a", 1).unwrap();
    let reopened = PropertyStore::open(&scene, NodeRef::Id(shared)).unwrap();
    assert_eq!(reopened.get("a").unwrap(), &PropertyValue::Int(1));
}
