use std::fs;

use tagsheet_printing::{Orientation, PrinterProfile};
use tagsheet_settings::{LocationError, PrinterGroupStore, DEFAULT_LOCATION_NAME};
use tempfile::tempdir;

fn zebra() -> PrinterProfile {
    PrinterProfile::new("Zebra ZD421", 50.0, 30.0, Orientation::Portrait)
}

#[test]
fn initialize_creates_default_location_once() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("locations.json");

    let mut store = PrinterGroupStore::load(&path).expect("load empty");
    assert!(store.list().is_empty());

    let id = store.initialize().expect("initialize").expect("created");
    assert_eq!(store.initialize().expect("second initialize"), None);

    let group = store.get(id).expect("default group");
    assert_eq!(group.name, DEFAULT_LOCATION_NAME);
    assert_eq!(group.permanent_printer.width, 50.0);
    assert_eq!(group.non_permanent_printer.height, 30.0);
    assert!(!group.permanent_printer.is_configured());
    assert!(path.exists());
}

#[test]
fn ids_are_never_reused_after_removal() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("locations.json");

    let mut store = PrinterGroupStore::load(&path).expect("load");
    let first = store.add("Hall A", zebra(), PrinterProfile::default()).expect("add");
    let second = store.add("Hall B", zebra(), PrinterProfile::default()).expect("add");
    store.remove(second).expect("remove");

    let mut reloaded = PrinterGroupStore::load(&path).expect("reload");
    let third = reloaded.add("Hall C", zebra(), PrinterProfile::default()).expect("add");
    assert_eq!((first, second, third), (1, 2, 3));
    let names: Vec<&str> = reloaded.list().iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Hall A", "Hall C"]);
}

#[test]
fn update_round_trips_profiles() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("locations.json");

    let mut store = PrinterGroupStore::load(&path).expect("load");
    let id = store.add("Hall A", PrinterProfile::default(), PrinterProfile::default()).expect("add");
    let mut group = store.get(id).cloned().expect("group");
    group.non_permanent_printer =
        PrinterProfile::new("Brother QL-820", 102.5, 32.5, Orientation::Landscape);
    store.update(group).expect("update");

    let reloaded = PrinterGroupStore::load(&path).expect("reload");
    let group = reloaded.find_by_name("hall a").expect("lookup by name");
    assert_eq!(group.non_permanent_printer.name, "Brother QL-820");
    assert_eq!(group.non_permanent_printer.orientation, Orientation::Landscape);
}

#[test]
fn rejects_blank_names_and_unknown_ids() {
    let temp = tempdir().expect("tempdir");
    let mut store = PrinterGroupStore::load(temp.path().join("locations.json")).expect("load");

    assert!(matches!(
        store.add("   ", zebra(), zebra()),
        Err(LocationError::EmptyName)
    ));
    assert!(matches!(store.remove(42), Err(LocationError::NotFound(42))));

    let id = store.add("Hall A", zebra(), zebra()).expect("add");
    let mut group = store.get(id).cloned().expect("group");
    group.id = 99;
    assert!(matches!(store.update(group), Err(LocationError::NotFound(99))));
}

#[test]
fn stale_next_id_is_repaired_on_load() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("locations.json");
    fs::write(
        &path,
        r#"{
            "nextId": 1,
            "groups": [
                { "id": 4, "name": "Warehouse", "permanentPrinter": { "name": "Zebra", "width": 50, "height": 30, "orientation": "portrait" } }
            ]
        }"#,
    )
    .expect("write store");

    let mut store = PrinterGroupStore::load(&path).expect("load");
    let group = store.get(4).expect("group");
    assert_eq!(group.non_permanent_printer.width, 102.5);
    let id = store.add("Hall B", zebra(), zebra()).expect("add");
    assert_eq!(id, 5);
}
