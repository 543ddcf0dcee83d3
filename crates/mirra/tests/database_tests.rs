//! Database lifecycle: lazy reflection, lookups, resets and options

use mirra::{Any, Database, DatabaseOptions, Inherits, Reflect, TypeFactory};
use std::sync::atomic::{AtomicUsize, Ordering};

static WIDGET_INITS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Default, PartialEq)]
struct Widget {
    parts: Vec<u16>,
}

impl Reflect for Widget {
    fn init(factory: &TypeFactory<Self>) {
        WIDGET_INITS.fetch_add(1, Ordering::SeqCst);
        factory
            .make_default_constructible()
            .make_copyable()
            .make_constructible::<(Vec<u16>,), _>(|(parts,)| Widget { parts });
    }
}

#[derive(Debug, Clone)]
struct Gadget;

impl Reflect for Gadget {}

static SPROCKET_INITS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone)]
struct Sprocket {
    teeth: Vec<u16>,
}

impl Reflect for Sprocket {
    fn init(factory: &TypeFactory<Self>) {
        SPROCKET_INITS.fetch_add(1, Ordering::SeqCst);
        factory.make_constructible::<(Vec<u16>,), _>(|(teeth,)| Sprocket { teeth });
    }
}

#[derive(Debug, Clone, Default)]
struct Hub;

impl Reflect for Hub {}

#[derive(Debug, Clone, Default)]
struct Axle;

impl Reflect for Axle {}

struct Teeth;
struct Spokes;

#[derive(Debug, Clone, Default)]
struct Gear {
    hub: Hub,
    axle: Axle,
    size: u32,
}

impl Inherits<Hub> for Gear {
    fn upcast(&self) -> &Hub {
        &self.hub
    }

    fn upcast_mut(&mut self) -> &mut Hub {
        &mut self.hub
    }
}

impl Inherits<Axle> for Gear {
    fn upcast(&self) -> &Axle {
        &self.axle
    }

    fn upcast_mut(&mut self) -> &mut Axle {
        &mut self.axle
    }
}

impl PartialEq for Gear {
    fn eq(&self, other: &Gear) -> bool {
        self.size == other.size
    }
}

impl PartialEq<u32> for Gear {
    fn eq(&self, other: &u32) -> bool {
        self.size == *other
    }
}

impl Reflect for Gear {
    fn init(factory: &TypeFactory<Self>) {
        factory
            .add_parent::<Hub>()
            .make_copyable()
            .make_convertible_with::<u32, _>(|g: &Gear| g.size)
            .make_constructible::<(u32,), _>(|(size,)| Gear {
                size,
                ..Gear::default()
            })
            .make_equality_comparable::<Gear>()
            .enumerate("Small", 8u8)
            .attribute(7u16)
            .facet_with(Teeth);
    }
}

// ============================================================================
// Reflection
// ============================================================================

#[test]
fn test_reflection_is_lazy_and_idempotent() {
    let db = Database::new();
    assert!(db.is_empty());
    assert!(!db.get_type("u32").is_valid());

    let first = db.type_of::<Sprocket>();
    let second = db.type_of::<Sprocket>();
    assert_eq!(first, second);
    assert_eq!(SPROCKET_INITS.load(Ordering::SeqCst), 1);

    let teeth = Any::new_in(&db, vec![3u16, 4]);
    let sprocket = first.construct(&[teeth]).unwrap();
    assert_eq!(sprocket.get::<Sprocket>().map(|s| s.teeth.len()), Some(2));

    // Initialisation pulled in the argument types
    assert!(db.contains("alloc::vec::Vec<u16>"));
    assert!(db.contains("u16"));
    assert_eq!(db.get_type(first.name()), first);
}

#[test]
fn test_types_sorted_by_name() {
    let db = Database::new();
    db.type_of::<u8>();
    let names: Vec<&str> = db.types().iter().map(|t| t.name()).collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
    assert_eq!(names.len(), db.len());
}

#[test]
fn test_unregistered_type_has_no_tables() {
    let db = Database::new();
    let ty = db.type_of::<Gadget>();
    assert!(ty.is_valid());
    assert!(ty.is_class());
    assert!(!ty.is_copyable());
    assert!(ty.constructors().is_empty());
    assert!(Any::new_in(&db, Gadget).try_clone().is_err());
}

#[test]
fn test_databases_are_independent() {
    let first = Database::new();
    let second = Database::new();
    first.reflect::<Widget>().make_convertible_with::<usize, _>(|w: &Widget| w.parts.len());

    assert!(first.type_of::<Widget>().convertible_to(&first.type_of::<usize>()));
    assert!(!second.type_of::<Widget>().convertible_to(&second.type_of::<usize>()));
    assert_ne!(first.type_of::<Widget>(), second.type_of::<Widget>());
}

// ============================================================================
// Reset
// ============================================================================

#[test]
fn test_reset_reruns_initialiser() {
    let db = Database::new();
    db.reflect::<Widget>().make_convertible_with::<usize, _>(|w: &Widget| w.parts.len());
    let ty = db.type_of::<Widget>();
    assert_eq!(ty.conversions().len(), 1);

    let before = WIDGET_INITS.load(Ordering::SeqCst);
    assert!(db.reset::<Widget>());
    assert!(WIDGET_INITS.load(Ordering::SeqCst) > before);

    // Handles taken before the reset see the fresh tables
    assert!(ty.conversions().is_empty());
    assert!(ty.is_default_constructible());
    assert!(!db.reset_type("no::such::Type"));
}

#[test]
fn test_reset_restores_initial_tables() {
    let db = Database::new();
    let ty = db.type_of::<Gear>();
    let parents = ty.parents();
    let conversions = ty.conversions();
    let constructors = ty.constructors();
    let comparable = ty.comparable_types();
    let enumerations = ty.enumerations();
    let attributes = ty.attributes();
    let facets = ty.facets();

    db.reflect::<Gear>()
        .add_parent::<Axle>()
        .make_convertible_with::<u64, _>(|g: &Gear| u64::from(g.size))
        .make_constructible::<(u64, u64), _>(|(size, _)| Gear {
            size: size as u32,
            ..Gear::default()
        })
        .make_equality_comparable::<u32>()
        .enumerate("Large", 64u8)
        .attribute(String::from("extra"))
        .facet_with(Spokes);

    assert_eq!(ty.parents().len(), parents.len() + 1);
    assert_eq!(ty.conversions().len(), conversions.len() + 1);
    assert_eq!(ty.constructors().len(), constructors.len() + 1);
    assert_eq!(ty.comparable_types().len(), comparable.len() + 1);
    assert_eq!(ty.enumerations().len(), enumerations.len() + 1);
    assert_eq!(ty.attributes().len(), attributes.len() + 1);
    assert_eq!(ty.facets().len(), facets.len() + 1);

    assert!(db.reset::<Gear>());
    assert_eq!(ty.parents(), parents);
    assert_eq!(ty.conversions(), conversions);
    assert_eq!(ty.constructors(), constructors);
    assert_eq!(ty.comparable_types(), comparable);
    assert_eq!(ty.enumerations(), enumerations);
    assert_eq!(ty.attributes(), attributes);
    assert_eq!(ty.facets(), facets);
    assert!(ty.is_copyable());
}

#[test]
fn test_reset_all() {
    let db = Database::new();
    db.reflect::<Widget>().attribute(7u8);
    db.reflect::<Gadget>().attribute(String::from("tag"));
    let count = db.len();

    db.reset_all();
    assert_eq!(db.len(), count);
    assert!(db.type_of::<Widget>().attributes().is_empty());
    assert!(db.type_of::<Gadget>().attributes().is_empty());
    assert!(db.type_of::<Widget>().is_copyable());
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn test_preload_builtins() {
    let db = Database::with_options(DatabaseOptions::new().with_preload_builtins(true));
    for name in ["()", "bool", "char", "i8", "u64", "f32", "f64", "usize"] {
        assert!(db.contains(name), "{name} not preloaded");
    }

    let plain = Database::new();
    assert!(plain.is_empty());
}

#[test]
fn test_spin_limit_option() {
    let db = Database::with_options(DatabaseOptions::new().with_spin_limit(1));
    assert_eq!(db.options().spin_limit, 1);
    let value = db.type_of::<Widget>().construct(&[]).unwrap();
    assert_eq!(value.get::<Widget>(), Some(&Widget::default()));
}
