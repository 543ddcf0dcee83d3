//! Casts, borrows and construction across a small type hierarchy

use mirra::{Any, ArgSpec, Database, Inherits, Reflect, TypeFactory};

// Animal <- Pet <- Dog, with Dog also carrying a Tag parent.

#[derive(Debug, Clone, PartialEq)]
struct Animal {
    legs: u32,
}

#[derive(Debug, Clone, PartialEq)]
struct Pet {
    animal: Animal,
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Tag {
    id: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct Dog {
    tag: Tag,
    pet: Pet,
}

impl Inherits<Animal> for Pet {
    fn upcast(&self) -> &Animal {
        &self.animal
    }

    fn upcast_mut(&mut self) -> &mut Animal {
        &mut self.animal
    }
}

impl Inherits<Pet> for Dog {
    fn upcast(&self) -> &Pet {
        &self.pet
    }

    fn upcast_mut(&mut self) -> &mut Pet {
        &mut self.pet
    }
}

impl Inherits<Tag> for Dog {
    fn upcast(&self) -> &Tag {
        &self.tag
    }

    fn upcast_mut(&mut self) -> &mut Tag {
        &mut self.tag
    }
}

impl Reflect for Animal {
    fn init(factory: &TypeFactory<Self>) {
        factory
            .make_copyable()
            .make_constructible::<(u32,), _>(|(legs,)| Animal { legs });
    }
}

impl Reflect for Pet {
    fn init(factory: &TypeFactory<Self>) {
        factory
            .add_parent::<Animal>()
            .make_copyable()
            .make_convertible_with::<String, _>(|pet: &Pet| pet.name.clone());
    }
}

impl Reflect for Tag {
    fn init(factory: &TypeFactory<Self>) {
        factory.make_copyable();
    }
}

impl Reflect for Dog {
    fn init(factory: &TypeFactory<Self>) {
        factory
            .add_parent::<Tag>()
            .add_parent::<Pet>()
            .make_copyable();
    }
}

fn rex() -> Dog {
    Dog {
        tag: Tag { id: 17 },
        pet: Pet {
            animal: Animal { legs: 4 },
            name: "Rex".to_string(),
        },
    }
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn test_parents_and_inheritance() {
    let db = Database::new();
    let dog = db.type_of::<Dog>();
    let animal = db.type_of::<Animal>();

    assert_eq!(dog.parents(), vec![db.type_of::<Tag>(), db.type_of::<Pet>()]);
    assert!(dog.inherits_from(&animal));
    assert!(!animal.inherits_from(&dog));
    assert!(dog.compatible_with(&animal));
    assert!(dog.convertible_to(&db.type_of::<String>()));
}

#[test]
fn test_upcast_through_second_parent() {
    let db = Database::new();
    let dog = Any::new_in(&db, rex());

    let animal = dog.cast(&db.type_of::<Animal>()).unwrap();
    assert!(animal.is_ref());
    assert!(animal.is_const());
    assert_eq!(animal.get::<Animal>(), Some(&Animal { legs: 4 }));

    let tag = dog.try_cast(&db.type_of::<Tag>());
    assert_eq!(tag.get::<Tag>().map(|t| t.id), Some(17));

    assert_eq!(dog.as_type::<Pet>().map(|p| p.name.as_str()), Some("Rex"));
}

#[test]
fn test_mutable_upcast() {
    let db = Database::new();
    let mut dog = Any::new_in(&db, rex());
    {
        let mut animal = dog.cast_mut(&db.type_of::<Animal>()).unwrap();
        assert!(!animal.is_const());
        animal.get_mut::<Animal>().unwrap().legs = 3;
    }
    assert_eq!(dog.get::<Dog>().unwrap().pet.animal.legs, 3);

    let view = dog.by_ref();
    let mut through_const = Any::from_ref_in(&db, view.get::<Dog>().unwrap());
    let animal = through_const.cast_mut(&db.type_of::<Animal>()).unwrap();
    assert!(animal.is_const());
}

#[test]
fn test_conversion_found_through_parent() {
    let db = Database::new();
    let dog = Any::new_in(&db, rex());
    let name = dog.cast(&db.type_of::<String>()).unwrap();
    assert!(name.is_owned());
    assert_eq!(name.get::<String>().map(String::as_str), Some("Rex"));

    let err = dog.cast(&db.type_of::<u8>()).unwrap_err();
    assert_eq!(err.to, "u8");
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_construct_from_derived_argument() {
    let db = Database::new();
    let ty = db.type_of::<Animal>();

    // The copy constructor accepts a Dog through its Animal parent
    let copy = ty.construct(&[Any::new_in(&db, rex())]).unwrap();
    assert_eq!(copy.get::<Animal>(), Some(&Animal { legs: 4 }));

    // Arithmetic arguments convert to the declared u32
    let tripod = ty.construct(&[Any::new_in(&db, 3i64)]).unwrap();
    assert_eq!(tripod.get::<Animal>(), Some(&Animal { legs: 3 }));

    assert!(ty.constructible_from(&[ArgSpec::shared::<Dog>()]));
    assert!(!ty.constructible_from(&[ArgSpec::value::<String>()]));
}

#[test]
fn test_construct_error_lists_arguments() {
    let db = Database::new();
    let err = db
        .type_of::<Animal>()
        .construct(&[Any::new_in(&db, "four")])
        .unwrap_err();
    assert_eq!(err.args, vec![ArgSpec::value::<&'static str>()]);
    assert!(err.to_string().contains("&str"));
}

// ============================================================================
// Copies
// ============================================================================

#[test]
fn test_clone_and_assign() {
    let db = Database::new();
    let original = Any::new_in(&db, rex());
    let copy = original.try_clone().unwrap();
    assert!(!copy.is_inline());
    assert_eq!(copy.get::<Dog>(), original.get::<Dog>());

    let mut target = Any::new_in(&db, Tag { id: 1 });
    target.assign_from(&original).unwrap();
    assert_eq!(target.type_handle(), &db.type_of::<Dog>());

    target.assign_from(&Any::empty()).unwrap();
    assert!(target.is_empty());
}
