//! Rule bundle loading from ZIP files, directories and single JSON files.
//!
//! A bundle is a set of JSON files whose file stem names the table they hold,
//! e.g. `shapes_by_name.json` or `data/terrain_textures.json`. A single JSON
//! file is parsed as a whole [`RuleTables`] document.

use super::RuleTables;
use crate::error::{CompilerError, Result};
use serde_json::{Map, Value};
use std::io::Read;
use std::path::Path;

/// Table names recognised as file stems.
pub const TABLE_NAMES: &[&str] = &[
    "shapes_by_name",
    "shapes_by_pattern",
    "shape_geometry",
    "rotations",
    "variants",
    "terrain_textures",
    "block_textures",
    "carried_textures",
    "use_carried_textures",
    "block_name_remaps",
    "tints",
    "transparency",
    "flipbook_sizes",
    "ignored_blocks",
    "ignored_block_entities",
];

/// Load rule tables from a file path.
///
/// Supports directories, ZIP files and single JSON documents.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<RuleTables> {
    let path = path.as_ref();

    if path.is_dir() {
        load_from_directory(path)
    } else if path.extension().map(|e| e == "json").unwrap_or(false) {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    } else {
        let data = std::fs::read(path)?;
        load_from_bytes(&data)
    }
}

/// Load rule tables from bytes (ZIP data).
pub fn load_from_bytes(data: &[u8]) -> Result<RuleTables> {
    let cursor = std::io::Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor)?;
    let mut tables = Map::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }

        let file_path = file.name().to_string();
        if !file_path.ends_with(".json") {
            continue;
        }

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        add_table(&mut tables, &file_path, &contents)?;
    }

    finish(tables)
}

/// Load rule tables from a directory, recursively.
fn load_from_directory(path: &Path) -> Result<RuleTables> {
    let mut tables = Map::new();
    let mut result = Ok(());
    load_json_files_recursive(path, &mut |file_path, contents| {
        if result.is_ok() {
            result = add_table(&mut tables, file_path, contents);
        }
    })?;
    result?;

    finish(tables)
}

fn add_table(tables: &mut Map<String, Value>, file_path: &str, contents: &str) -> Result<()> {
    let stem = table_stem(file_path);
    if !TABLE_NAMES.contains(&stem) {
        log::warn!("Ignoring unrecognised rule file {}", file_path);
        return Ok(());
    }
    if tables.contains_key(stem) {
        return Err(CompilerError::InvalidRuleBundle(format!(
            "Table {} defined twice (second copy in {})",
            stem, file_path
        )));
    }

    let value: Value = serde_json::from_str(contents)?;
    tables.insert(stem.to_string(), value);
    Ok(())
}

fn finish(tables: Map<String, Value>) -> Result<RuleTables> {
    if tables.is_empty() {
        return Err(CompilerError::InvalidRuleBundle(
            "No rule tables found".to_string(),
        ));
    }
    Ok(serde_json::from_value(Value::Object(tables))?)
}

/// "data/shape_geometry.json" -> "shape_geometry"
fn table_stem(file_path: &str) -> &str {
    let file_name = file_path.rsplit(['/', '\\']).next().unwrap_or(file_path);
    file_name.trim_end_matches(".json")
}

/// Load JSON files recursively from a directory.
fn load_json_files_recursive<F>(dir: &Path, handler: &mut F) -> Result<()>
where
    F: FnMut(&str, &str),
{
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            load_json_files_recursive(&path, handler)?;
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            let contents = std::fs::read_to_string(&path)?;
            handler(&path.to_string_lossy().replace('\\', "/"), &contents);
        }
    }
    Ok(())
}
