//! Purpose: Build plants from a JSON description and render plants back out.
//! Exports: `Description`, `load`, `dump`, `render_header`.
//! Role: Debug/introspection helper layer used by the CLI; walks plants via public accessors.
//! Invariants: Plant references are written as indices into the dumped plant list.
//! Invariants: Output leaf order is creation order; the "type" leaf comes first.
//! Invariants: JSON is text, so non-UTF-8 keys and strings are dumped lossily.
use bstr::ByteSlice;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::flags::LeafFlags;
use crate::core::plant::{TYPE_KEY, types};
use crate::core::seed::SeedType;
use crate::core::store::Store;
use crate::core::value::{FuncPtr, PlantId, Value, Values, VoidPtr};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Description {
    #[serde(default)]
    pub plants: Vec<PlantDescription>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PlantDescription {
    #[serde(rename = "type")]
    pub plant_type: i32,
    #[serde(default)]
    pub leaves: Vec<LeafDescription>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LeafDescription {
    pub key: String,
    pub seed: String,
    #[serde(default)]
    pub values: Vec<JsonValue>,
    #[serde(default)]
    pub flags: u32,
}

/// Creates every described plant, then fills leaves in order.
///
/// Plants are created up front so `plantptr` values may point forward. On error the
/// plants created so far are freed again.
pub fn load(store: &mut Store, description: &Description) -> Result<Vec<PlantId>> {
    let mut created = Vec::with_capacity(description.plants.len());
    for plant in &description.plants {
        match store.plant_new(plant.plant_type) {
            Ok(id) => created.push(id),
            Err(err) => {
                release(store, &created);
                return Err(err);
            }
        }
    }

    for (plant, id) in description.plants.iter().zip(&created) {
        for leaf in &plant.leaves {
            if let Err(err) = fill_leaf(store, *id, leaf, &created) {
                release(store, &created);
                return Err(err);
            }
        }
    }
    Ok(created)
}

fn release(store: &mut Store, created: &[PlantId]) {
    for id in created {
        let _ = store.plant_free(*id);
    }
}

fn fill_leaf(store: &mut Store, plant: PlantId, leaf: &LeafDescription, created: &[PlantId]) -> Result<()> {
    let seed = SeedType::from_short_name(&leaf.seed).ok_or_else(|| {
        Error::new(ErrorKind::WrongSeedType)
            .with_message(format!("unknown seed '{}'", leaf.seed))
            .with_key(leaf.key.as_str())
    })?;
    let mut elements = Vec::with_capacity(leaf.values.len());
    for (idx, raw) in leaf.values.iter().enumerate() {
        let element = element_from_json(seed, raw, created).map_err(|err| {
            let message = format!("element {idx}: {}", err.message().unwrap_or("invalid value"));
            err.with_message(message).with_key(leaf.key.as_str())
        })?;
        elements.push(element);
    }
    let values = Values::from_elements(seed, elements).ok_or_else(|| {
        Error::new(ErrorKind::WrongSeedType).with_key(leaf.key.as_str())
    })?;
    store.set_values(plant, &leaf.key, values)?;
    if leaf.flags != 0 {
        store.leaf_set_flags(plant, &leaf.key, LeafFlags::from_bits(leaf.flags))?;
    }
    Ok(())
}

fn element_from_json(seed: SeedType, raw: &JsonValue, created: &[PlantId]) -> Result<Value> {
    let mismatch = || {
        Error::new(ErrorKind::WrongSeedType)
            .with_message(format!("{raw} is not a valid {}", seed.short_name()))
    };
    let value = match seed {
        SeedType::Int => Value::Int(raw.as_i64().and_then(|n| i32::try_from(n).ok()).ok_or_else(mismatch)?),
        SeedType::Double => Value::Double(raw.as_f64().ok_or_else(mismatch)?),
        SeedType::Boolean => Value::Boolean(raw.as_bool().ok_or_else(mismatch)?),
        SeedType::String => Value::Str(raw.as_str().ok_or_else(mismatch)?.into()),
        SeedType::Int64 => Value::Int64(raw.as_i64().ok_or_else(mismatch)?),
        SeedType::UInt => Value::UInt(raw.as_u64().and_then(|n| u32::try_from(n).ok()).ok_or_else(mismatch)?),
        SeedType::UInt64 => Value::UInt64(raw.as_u64().ok_or_else(mismatch)?),
        SeedType::FuncPtr => Value::FuncPtr(FuncPtr::from_addr(address(raw).ok_or_else(mismatch)?)),
        SeedType::VoidPtr => Value::VoidPtr(VoidPtr::from_addr(address(raw).ok_or_else(mismatch)?)),
        SeedType::PlantPtr => {
            if raw.is_null() {
                Value::PlantPtr(PlantId::NULL)
            } else {
                let index = raw.as_u64().ok_or_else(mismatch)? as usize;
                let target = created.get(index).copied().ok_or_else(|| {
                    Error::new(ErrorKind::NoSuchPlant)
                        .with_message(format!("plant index {index} out of range"))
                })?;
                Value::PlantPtr(target)
            }
        }
    };
    Ok(value)
}

fn address(raw: &JsonValue) -> Option<usize> {
    if raw.is_null() {
        return Some(0);
    }
    raw.as_u64().and_then(|n| usize::try_from(n).ok())
}

/// JSON view of `plants` in the same shape [`load`] accepts, plus element counts.
pub fn dump(store: &Store, plants: &[PlantId]) -> JsonValue {
    let values: Vec<JsonValue> = plants
        .iter()
        .filter(|id| store.is_live(**id))
        .map(|id| plant_json(store, *id, plants))
        .collect();
    json!({ "plants": values })
}

fn plant_json(store: &Store, plant: PlantId, plants: &[PlantId]) -> JsonValue {
    let leaves: Vec<JsonValue> = store
        .plant_list_leaves(plant)
        .iter()
        .filter_map(|key| {
            let values = store.get_values(plant, key).ok()?;
            let elements: Vec<JsonValue> = values
                .elements()
                .into_iter()
                .map(|element| element_json(element, plants))
                .collect();
            Some(json!({
                "key": key.to_str_lossy(),
                "seed": values.seed_type().short_name(),
                "count": values.len(),
                "flags": store.leaf_get_flags(plant, key).bits(),
                "values": elements,
            }))
        })
        .collect();
    let plant_type = store.plant_type(plant).ok();
    json!({
        "type": plant_type,
        "leaves": leaves,
    })
}

fn element_json(element: Value, plants: &[PlantId]) -> JsonValue {
    match element {
        Value::Int(v) => json!(v),
        Value::Double(v) => json!(v),
        Value::Boolean(v) => json!(v),
        Value::Str(v) => json!(v.to_str_lossy()),
        Value::Int64(v) => json!(v),
        Value::UInt(v) => json!(v),
        Value::UInt64(v) => json!(v),
        Value::FuncPtr(v) => json!(v.addr()),
        Value::VoidPtr(v) => json!(v.addr()),
        Value::PlantPtr(target) => plants
            .iter()
            .position(|id| *id == target)
            .map(|index| json!(index))
            .unwrap_or(JsonValue::Null),
    }
}

/// C struct definitions mirroring each live plant, one `typedef` per plant.
pub fn render_header(store: &Store, plants: &[PlantId], name: &str) -> String {
    let base = c_identifier(name);
    let guard = format!("{}_H", base.to_ascii_uppercase());
    let mut out = String::new();
    out.push_str(&format!("#ifndef {guard}\n#define {guard}\n\n#include <stdint.h>\n\n"));
    out.push_str("typedef void (*pst_funcptr_t)(void);\n");
    out.push_str("typedef uint64_t pst_plant_t;\n");

    for (index, plant) in plants.iter().enumerate() {
        if !store.is_live(*plant) {
            continue;
        }
        let plant_type = store.plant_type(*plant).ok();
        let label = match plant_type {
            Some(code) => match types::name(code) {
                Some(known) => format!("type {code} ({known})"),
                None => format!("type {code}"),
            },
            None => "untyped".to_string(),
        };
        out.push_str(&format!("\n/* plant {index}: {label} */\ntypedef struct {{\n"));
        for key in store.plant_list_leaves(*plant) {
            out.push_str(&field_line(store, *plant, &key));
        }
        out.push_str(&format!("}} {base}_{index}_t;\n"));
    }
    out.push_str(&format!("\n#endif /* {guard} */\n"));
    out
}

fn field_line(store: &Store, plant: PlantId, key: &[u8]) -> String {
    let Some(seed) = store.leaf_seed_type(plant, key) else {
        return String::new();
    };
    let count = store.leaf_num_elements(plant, key);
    let label = key.to_str_lossy();
    let ident = c_identifier(&label);
    let ctype = seed.ctype();
    let sep = if ctype.ends_with('*') { "" } else { " " };

    let mut notes = Vec::new();
    if ident != label {
        notes.push(format!("\"{label}\""));
    }
    let flags = store.leaf_get_flags(plant, key);
    if flags.is_immutable() {
        notes.push("immutable".to_string());
    }
    if flags.is_undeletable() {
        notes.push("undeletable".to_string());
    }
    if key == TYPE_KEY.as_bytes() && !flags.is_undeletable() {
        notes.push("reserved".to_string());
    }
    let comment = if notes.is_empty() {
        String::new()
    } else {
        format!(" /* {} */", notes.join(", "))
    };

    match count {
        0 => format!("    /* {ident}: {ctype}, no elements */\n"),
        1 => format!("    {ctype}{sep}{ident};{comment}\n"),
        n => format!("    {ctype}{sep}{ident}[{n}];{comment}\n"),
    }
}

fn c_identifier(raw: &str) -> String {
    let mut ident: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Description {
        serde_json::from_str(text).expect("description")
    }

    #[test]
    fn load_resolves_forward_plant_references() {
        let description = parse(
            r#"{"plants":[
                {"type":2,"leaves":[
                    {"key":"name","seed":"string","values":["blur"],"flags":2},
                    {"key":"params","seed":"plantptr","values":[1,null]}
                ]},
                {"type":7,"leaves":[{"key":"range","seed":"double","values":[0.0,1.5]}]}
            ]}"#,
        );
        let mut store = Store::new();
        let plants = load(&mut store, &description).expect("load");
        assert_eq!(plants.len(), 2);
        assert_eq!(
            store.get_plantptr_array(plants[0], "params").expect("refs"),
            [plants[1], PlantId::NULL]
        );
        assert!(store.leaf_get_flags(plants[0], "name").is_immutable());
        assert_eq!(store.get_double_array(plants[1], "range").expect("range"), [0.0, 1.5]);
    }

    #[test]
    fn load_rejects_bad_values_and_frees_partial_work() {
        let mut store = Store::new();
        let bad_seed = parse(r#"{"plants":[{"type":1,"leaves":[{"key":"x","seed":"float","values":[1]}]}]}"#);
        let err = load(&mut store, &bad_seed).expect_err("unknown seed");
        assert_eq!(err.kind(), ErrorKind::WrongSeedType);
        assert_eq!(store.plant_count(), 0);

        let overflow = parse(r#"{"plants":[{"type":1,"leaves":[{"key":"x","seed":"int","values":[4294967296]}]}]}"#);
        let err = load(&mut store, &overflow).expect_err("overflow");
        assert_eq!(err.kind(), ErrorKind::WrongSeedType);
        assert_eq!(err.key(), Some("x"));

        let dangling = parse(r#"{"plants":[{"type":1,"leaves":[{"key":"p","seed":"plantptr","values":[3]}]}]}"#);
        let err = load(&mut store, &dangling).expect_err("dangling");
        assert_eq!(err.kind(), ErrorKind::NoSuchPlant);
        assert_eq!(store.plant_count(), 0);
        assert_eq!(store.allocator().in_use(), 0);
    }

    #[test]
    fn dump_reloads_to_the_same_view() {
        let description = parse(
            r#"{"plants":[
                {"type":255,"leaves":[
                    {"key":"api_version","seed":"int","values":[200]},
                    {"key":"empty","seed":"string","values":[]},
                    {"key":"self","seed":"plantptr","values":[0]}
                ]}
            ]}"#,
        );
        let mut store = Store::new();
        let plants = load(&mut store, &description).expect("load");
        let first = dump(&store, &plants);
        assert_eq!(first["plants"][0]["type"], 255);
        assert_eq!(first["plants"][0]["leaves"][0]["key"], TYPE_KEY);
        assert_eq!(first["plants"][0]["leaves"][2]["count"], 0);
        assert_eq!(first["plants"][0]["leaves"][3]["values"][0], 0);

        let reparsed: Description = serde_json::from_value(first.clone()).expect("reparse");
        let mut other = Store::new();
        let reloaded = load(&mut other, &reparsed).expect("reload");
        assert_eq!(dump(&other, &reloaded), first);
    }

    #[test]
    fn header_declares_arrays_and_notes_flags() {
        let mut store = Store::new();
        let plant = store.plant_new(types::PARAMETER).expect("plant");
        store.set_string(plant, "name", Some("gain")).expect("set");
        store.set_double_array(plant, "min-max", &[0.0, 1.0]).expect("set");
        store.set_int_array(plant, "none", &[]).expect("set");
        store
            .leaf_set_flags(plant, "name", LeafFlags::IMMUTABLE)
            .expect("flags");

        let header = render_header(&store, &[plant], "fx");
        assert!(header.contains("#ifndef FX_H"));
        assert!(header.contains("/* plant 0: type 7 (PARAMETER) */"));
        assert!(header.contains("    int32_t type; /* reserved */\n"));
        assert!(header.contains("    char *name; /* immutable */\n"));
        assert!(header.contains("    double min_max[2]; /* \"min-max\" */\n"));
        assert!(header.contains("    /* none: int32_t, no elements */\n"));
        assert!(header.contains("} fx_0_t;"));
    }
}
