//! End-to-end tests over a hand-written accessor layer for a small game
//! schema, the way generated code would drive the builder and accessors.

use flatbuf::{
    root_table, Builder, Cursor, Error, Result, TableAccessor, TableAccessorMut, Vector,
    VectorMut,
};

mod game {
    use flatbuf::{
        root_table_with_identifier, Builder, Cursor, Result, StringOffset, StructOffset,
        TableAccessor, TableOffset, Vector, VectorAccessor, VectorElement, VectorOffset,
    };

    pub const IDENTIFIER: &str = "MONS";

    /// `struct Vec3 { x: f32, y: f32, z: f32 }`
    #[derive(Debug, Clone, Copy)]
    pub struct Vec3<'a> {
        cursor: Cursor<'a>,
    }

    impl<'a> Vec3<'a> {
        pub const SIZE: usize = 12;
        pub const ALIGN: usize = 4;

        pub fn new(cursor: Cursor<'a>) -> Self {
            Self { cursor }
        }

        pub fn x(&self) -> Result<f32> {
            self.cursor.load(0)
        }

        pub fn y(&self) -> Result<f32> {
            self.cursor.load(4)
        }

        pub fn z(&self) -> Result<f32> {
            self.cursor.load(8)
        }
    }

    impl<'a> VectorElement<'a> for Vec3<'a> {
        fn read(vector: &VectorAccessor<'a>, index: usize) -> Result<Self> {
            Ok(Self::new(vector.get_struct(index, Self::SIZE)?))
        }
    }

    /// Writes a `Vec3` body; fields go last to first.
    pub fn write_vec3(builder: &mut Builder<'_>, x: f32, y: f32, z: f32) -> Result<StructOffset> {
        builder.start_struct(Vec3::SIZE, Vec3::ALIGN)?;
        builder.put(z)?;
        builder.put(y)?;
        builder.put(x)?;
        Ok(builder.end_struct())
    }

    pub fn create_path(builder: &mut Builder<'_>, points: &[(f32, f32, f32)]) -> Result<VectorOffset> {
        builder.start_vector(Vec3::SIZE, points.len(), Vec3::ALIGN)?;
        for &(x, y, z) in points.iter().rev() {
            write_vec3(builder, x, y, z)?;
        }
        builder.end_vector()
    }

    /// `table Weapon { name: string; damage: short; }`
    pub mod weapon {
        pub const NAME: usize = 0;
        pub const DAMAGE: usize = 1;
        pub const FIELD_COUNT: usize = 2;
    }

    pub fn create_weapon(
        builder: &mut Builder<'_>,
        name: StringOffset,
        damage: i16,
    ) -> Result<TableOffset> {
        builder.start_object(weapon::FIELD_COUNT)?;
        builder.add_offset_field(weapon::NAME, name)?;
        builder.add_field::<i16>(weapon::DAMAGE, damage, 0)?;
        builder.end_object()
    }

    /// `table Monster` field indices.
    pub mod monster {
        pub const POS: usize = 0;
        pub const MANA: usize = 1;
        pub const HP: usize = 2;
        pub const NAME: usize = 3;
        pub const INVENTORY: usize = 4;
        pub const COLOR: usize = 5;
        pub const WEAPONS: usize = 6;
        pub const PATH: usize = 7;
        pub const NESTED: usize = 8;
        pub const FIELD_COUNT: usize = 9;

        pub const DEFAULT_MANA: i16 = 150;
        pub const DEFAULT_HP: i16 = 100;
        pub const DEFAULT_COLOR: u8 = 8;
    }

    #[derive(Debug, Default)]
    pub struct MonsterArgs {
        pub pos: Option<(f32, f32, f32)>,
        pub mana: Option<i16>,
        pub hp: Option<i16>,
        pub name: Option<StringOffset>,
        pub inventory: Option<VectorOffset>,
        pub color: Option<u8>,
        pub weapons: Option<VectorOffset>,
        pub path: Option<VectorOffset>,
        pub nested: Option<VectorOffset>,
    }

    pub fn create_monster(builder: &mut Builder<'_>, args: &MonsterArgs) -> Result<TableOffset> {
        use monster::*;

        builder.start_object(FIELD_COUNT)?;
        if let Some((x, y, z)) = args.pos {
            let pos = write_vec3(builder, x, y, z)?;
            builder.add_struct_field(POS, pos)?;
        }
        for (index, offset) in [
            (NESTED, args.nested),
            (PATH, args.path),
            (WEAPONS, args.weapons),
            (INVENTORY, args.inventory),
        ] {
            if let Some(offset) = offset {
                builder.add_offset_field(index, offset)?;
            }
        }
        if let Some(name) = args.name {
            builder.add_offset_field(NAME, name)?;
        }
        builder.add_field(HP, args.hp.unwrap_or(DEFAULT_HP), DEFAULT_HP)?;
        builder.add_field(MANA, args.mana.unwrap_or(DEFAULT_MANA), DEFAULT_MANA)?;
        builder.add_field(COLOR, args.color.unwrap_or(DEFAULT_COLOR), DEFAULT_COLOR)?;
        let table = builder.end_object()?;
        builder.required(table, NAME)?;
        Ok(table)
    }

    #[derive(Debug, Clone, Copy)]
    pub struct Monster<'a> {
        table: TableAccessor<'a>,
    }

    impl<'a> Monster<'a> {
        pub fn root(buf: &'a [u8]) -> Result<Self> {
            Ok(Self {
                table: root_table_with_identifier(buf, IDENTIFIER)?,
            })
        }

        pub fn table(&self) -> TableAccessor<'a> {
            self.table
        }

        pub fn pos(&self) -> Result<Option<Vec3<'a>>> {
            Ok(self.table.get_struct(monster::POS)?.map(Vec3::new))
        }

        pub fn mana(&self) -> Result<i16> {
            self.table.get(monster::MANA, monster::DEFAULT_MANA)
        }

        pub fn hp(&self) -> Result<i16> {
            self.table.get(monster::HP, monster::DEFAULT_HP)
        }

        pub fn name(&self) -> Result<Option<&'a str>> {
            self.table.get_str(monster::NAME)
        }

        pub fn inventory(&self) -> Result<Option<Vector<'a, u8>>> {
            self.table.get_vector_of(monster::INVENTORY)
        }

        pub fn color(&self) -> Result<u8> {
            self.table.get(monster::COLOR, monster::DEFAULT_COLOR)
        }

        pub fn weapons(&self) -> Result<Option<Vector<'a, TableAccessor<'a>>>> {
            self.table.get_vector_of(monster::WEAPONS)
        }

        pub fn path(&self) -> Result<Option<Vector<'a, Vec3<'a>>>> {
            self.table.get_vector_of(monster::PATH)
        }

        pub fn nested(&self) -> Result<Option<Monster<'a>>> {
            match self.table.get_vector(monster::NESTED)? {
                Some(bytes) => Ok(Some(Monster::root(bytes.nested_buffer()?)?)),
                None => Ok(None),
            }
        }
    }
}

use game::{monster, weapon, Monster, MonsterArgs};

fn vtable_position(table: &TableAccessor<'_>) -> i64 {
    let cursor = table.cursor();
    cursor.position() as i64 - cursor.load::<i32>(0).unwrap() as i64
}

fn build_orc(builder: &mut Builder<'_>) -> Result<()> {
    let name = builder.create_string("orc")?;
    let inventory = builder.create_vector(&[0u8, 1, 2, 3, 4])?;

    let sword_name = builder.create_string("sword")?;
    let axe_name = builder.create_string("axe")?;
    let sword = game::create_weapon(builder, sword_name, 3)?;
    let axe = game::create_weapon(builder, axe_name, 5)?;
    let weapons = builder.create_vector_of_offsets(&[sword, axe])?;

    let path = game::create_path(builder, &[(1.0, 2.0, 3.0), (4.0, 5.0, 6.0)])?;

    let orc = game::create_monster(
        builder,
        &MonsterArgs {
            pos: Some((1.0, 2.0, 3.0)),
            hp: Some(300),
            name: Some(name),
            inventory: Some(inventory),
            color: Some(1),
            weapons: Some(weapons),
            path: Some(path),
            ..MonsterArgs::default()
        },
    )?;
    builder.finish_with_identifier(orc, game::IDENTIFIER)
}

#[test]
fn test_default_omission_scenario() {
    let mut builder = Builder::new();
    let name = builder.create_string("x").unwrap();
    builder.start_object(3).unwrap();
    builder.add_offset_field(2, name).unwrap();
    builder.add_field::<i16>(1, 80, 100).unwrap();
    builder.add_field::<i16>(0, 150, 150).unwrap();
    let table = builder.end_object().unwrap();
    builder.finish(table).unwrap();

    let table = root_table(builder.finished_data().unwrap()).unwrap();
    assert_eq!(table.field_offset(0), 0);
    assert_ne!(table.field_offset(1), 0);
    assert_ne!(table.field_offset(2), 0);
    assert_eq!(table.get::<i16>(0, 150).unwrap(), 150);
    assert_eq!(table.get::<i16>(1, 100).unwrap(), 80);
    assert_eq!(table.get_str(2).unwrap(), Some("x"));
}

#[test]
fn test_identical_tables_share_vtable() {
    let mut builder = Builder::new();
    let mut tables = Vec::new();
    for (a, b) in [(1i32, 2i32), (3, 4)] {
        builder.start_object(2).unwrap();
        builder.add_field(0, a, 0).unwrap();
        builder.add_field(1, b, 0).unwrap();
        tables.push(builder.end_object().unwrap());
    }
    let list = builder.create_vector_of_offsets(&tables).unwrap();
    builder.start_object(1).unwrap();
    builder.add_offset_field(0, list).unwrap();
    let root = builder.end_object().unwrap();
    builder.finish(root).unwrap();

    let buf = builder.finished_data().unwrap();
    let list: Vector<'_, TableAccessor<'_>> =
        root_table(buf).unwrap().get_vector_of(0).unwrap().unwrap();
    let first = list.get(0).unwrap();
    let second = list.get(1).unwrap();
    assert_eq!(first.get::<i32>(0, 0).unwrap(), 1);
    assert_eq!(second.get::<i32>(1, 0).unwrap(), 4);
    assert_ne!(first.cursor().position(), second.cursor().position());
    assert_eq!(vtable_position(&first), vtable_position(&second));
}

#[test]
fn test_vector_of_strings() {
    let mut builder = Builder::new();
    let strings = ["a", "bb", "ccc"]
        .iter()
        .map(|s| builder.create_string(s))
        .collect::<Result<Vec<_>>>()
        .unwrap();
    let list = builder.create_vector_of_offsets(&strings).unwrap();
    builder.start_object(1).unwrap();
    builder.add_offset_field(0, list).unwrap();
    let root = builder.end_object().unwrap();
    builder.finish(root).unwrap();

    let table = root_table(builder.finished_data().unwrap()).unwrap();
    let vector = table.get_vector(0).unwrap().unwrap();
    assert_eq!(vector.len(), 3);
    assert_eq!(vector.get_str(1).unwrap(), "bb");
    assert_eq!(vector.get_string_bytes(1).unwrap().len(), 2);

    let typed: Vector<'_, &str> = table.get_vector_of(0).unwrap().unwrap();
    let all = typed.iter().collect::<Result<Vec<_>>>().unwrap();
    assert_eq!(all, vec!["a", "bb", "ccc"]);
}

#[test]
fn test_golden_wire_layout() {
    let mut builder = Builder::new();
    let name = builder.create_string("hi").unwrap();
    builder.start_object(1).unwrap();
    builder.add_offset_field(0, name).unwrap();
    let table = builder.end_object().unwrap();
    builder.finish(table).unwrap();

    #[rustfmt::skip]
    let expected: &[u8] = &[
        12, 0, 0, 0,    // root uoffset
        0, 0,           // padding
        6, 0, 8, 0,     // vtable: its size, table size
        4, 0,           // field 0 at table + 4
        6, 0, 0, 0,     // table: soffset to the vtable
        4, 0, 0, 0,     // field 0: uoffset to the string
        2, 0, 0, 0,     // string length
        b'h', b'i', 0,  // bytes and NUL
        0,              // padding
    ];
    assert_eq!(builder.finished_data().unwrap(), expected);
}

#[test]
fn test_full_monster_round_trip() {
    let mut builder = Builder::with_capacity(16);
    build_orc(&mut builder).unwrap();
    let buf = builder.finished_data().unwrap();

    let orc = Monster::root(buf).unwrap();
    assert_eq!(orc.name().unwrap(), Some("orc"));
    assert_eq!(orc.hp().unwrap(), 300);
    assert_eq!(orc.mana().unwrap(), monster::DEFAULT_MANA);
    assert_eq!(orc.color().unwrap(), 1);

    let pos = orc.pos().unwrap().unwrap();
    assert_eq!((pos.x().unwrap(), pos.y().unwrap(), pos.z().unwrap()), (1.0, 2.0, 3.0));

    let inventory = orc.inventory().unwrap().unwrap();
    assert_eq!(inventory.to_vec().unwrap(), vec![0, 1, 2, 3, 4]);
    assert_eq!(inventory.accessor().as_bytes().unwrap(), &[0, 1, 2, 3, 4]);

    let weapons = orc.weapons().unwrap().unwrap();
    let mut damage = 0;
    for item in weapons {
        damage += item.unwrap().get::<i16>(weapon::DAMAGE, 0).unwrap();
    }
    assert_eq!(damage, 8);
    let axe = weapons.get(1).unwrap();
    assert_eq!(axe.get_str(weapon::NAME).unwrap(), Some("axe"));
    assert_eq!(vtable_position(&axe), vtable_position(&weapons.get(0).unwrap()));

    let path = orc.path().unwrap().unwrap();
    assert_eq!(path.len(), 2);
    assert_eq!(path.get(1).unwrap().z().unwrap(), 6.0);
    assert!(matches!(path.get(2), Err(Error::IndexOutOfRange { .. })));

    assert!(orc.nested().unwrap().is_none());
    assert!(Monster::root(&buf[..8]).is_err());
}

#[test]
fn test_required_name() {
    let mut builder = Builder::new();
    let err = game::create_monster(&mut builder, &MonsterArgs::default()).unwrap_err();
    assert_eq!(
        err,
        Error::MissingRequiredField {
            index: monster::NAME
        }
    );
}

#[test]
fn test_nested_flatbuffer() {
    let mut inner = Builder::new();
    build_orc(&mut inner).unwrap();
    let inner_bytes = inner.to_finished_vec().unwrap();

    let mut builder = Builder::new();
    let nested = builder.create_byte_vector(&inner_bytes).unwrap();
    let name = builder.create_string("host").unwrap();
    let host = game::create_monster(
        &mut builder,
        &MonsterArgs {
            name: Some(name),
            nested: Some(nested),
            ..MonsterArgs::default()
        },
    )
    .unwrap();
    builder.finish_with_identifier(host, game::IDENTIFIER).unwrap();

    let host = Monster::root(builder.finished_data().unwrap()).unwrap();
    let orc = host.nested().unwrap().unwrap();
    assert_eq!(orc.name().unwrap(), Some("orc"));
    assert_eq!(orc.inventory().unwrap().unwrap().len(), 5);

    let bytes = host.table().get_vector(monster::NESTED).unwrap().unwrap();
    assert_eq!(bytes.nested_buffer().unwrap(), inner_bytes.as_slice());
    assert_eq!(bytes.nested_root().unwrap().get::<i16>(monster::HP, 0).unwrap(), 300);
}

#[test]
fn test_mutate_in_place() {
    let mut builder = Builder::new();
    build_orc(&mut builder).unwrap();
    let mut buf = builder.to_finished_vec().unwrap();
    let len = buf.len();

    {
        let mut orc = TableAccessorMut::root(&mut buf).unwrap();
        assert!(orc.mutate::<i16>(monster::HP, 10).unwrap());
        // mana was left at its default, so there is nothing to overwrite
        assert!(!orc.mutate::<i16>(monster::MANA, 1).unwrap());

        let mut pos = orc.get_struct_mut(monster::POS).unwrap();
        pos.store::<f32>(4, -2.0).unwrap();

        let inventory = orc.get_vector_mut(monster::INVENTORY).unwrap().unwrap();
        let mut inventory: VectorMut<'_, u8> = VectorMut::new(inventory);
        inventory.set(0, 9).unwrap();
        inventory.copy_from(&[7, 7], 0, 3, 2).unwrap();
        assert!(inventory.set(5, 1).is_err());

        let mut weapons = orc.get_vector_mut(monster::WEAPONS).unwrap().unwrap();
        assert!(weapons.set::<u32>(2, 0).is_err());
    }

    assert_eq!(buf.len(), len);
    let orc = Monster::root(&buf).unwrap();
    assert_eq!(orc.hp().unwrap(), 10);
    assert_eq!(orc.mana().unwrap(), monster::DEFAULT_MANA);
    assert_eq!(orc.pos().unwrap().unwrap().y().unwrap(), -2.0);
    assert_eq!(orc.inventory().unwrap().unwrap().to_vec().unwrap(), vec![9, 1, 2, 7, 7]);
}

#[test]
fn test_mutate_sub_table() {
    let mut builder = Builder::new();
    let name = builder.create_string("dagger").unwrap();
    let dagger = game::create_weapon(&mut builder, name, 2).unwrap();
    builder.start_object(1).unwrap();
    builder.add_offset_field(0, dagger).unwrap();
    let root = builder.end_object().unwrap();
    builder.finish(root).unwrap();
    let mut buf = builder.to_finished_vec().unwrap();

    {
        let mut root = TableAccessorMut::root(&mut buf).unwrap();
        let mut dagger = root.get_table_mut(0).unwrap().unwrap();
        assert!(dagger.mutate::<i16>(weapon::DAMAGE, 12).unwrap());
        assert!(root.get_table_mut(1).unwrap().is_none());
    }
    let dagger = root_table(&buf).unwrap().get_table(0).unwrap().unwrap();
    assert_eq!(dagger.get::<i16>(weapon::DAMAGE, 0).unwrap(), 12);
}

#[test]
fn test_schema_evolution_defaults() {
    // an older writer that only knew about the first two monster fields
    let mut builder = Builder::new();
    builder.start_object(2).unwrap();
    builder.add_field::<i16>(monster::MANA, 20, monster::DEFAULT_MANA).unwrap();
    let table = builder.end_object().unwrap();
    builder.finish_with_identifier(table, game::IDENTIFIER).unwrap();

    let old = Monster::root(builder.finished_data().unwrap()).unwrap();
    assert_eq!(old.mana().unwrap(), 20);
    assert_eq!(old.hp().unwrap(), monster::DEFAULT_HP);
    assert_eq!(old.name().unwrap(), None);
    assert!(old.weapons().unwrap().is_none());
    assert!(old.pos().unwrap().is_none());
}

#[test]
fn test_cursor_root_and_identifier() {
    let mut builder = Builder::new();
    build_orc(&mut builder).unwrap();
    let buf = builder.finished_data().unwrap();

    assert!(TableAccessor::has_identifier(buf, "MONS").unwrap());
    assert!(matches!(
        flatbuf::root_table_with_identifier(buf, "WEAP"),
        Err(Error::MalformedBuffer(_))
    ));
    let root = Cursor::root(buf).unwrap();
    assert_eq!(root.position(), root_table(buf).unwrap().cursor().position());
}
