//! GeoPackage point layers.
//!
//! The first feature table listed in `gpkg_contents` is read. Geometries are
//! GeoPackage binary blobs: an 8 byte header, an optional envelope, then a
//! WKB point.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use super::{Attribute, DatasetError, PointDataset};

const WKB_POINT: u32 = 1;

struct Layer {
    table: String,
    geometry_column: String,
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn first_feature_layer(conn: &Connection) -> Result<Layer, DatasetError> {
    let layer = conn.query_row(
        "SELECT c.table_name, g.column_name
         FROM gpkg_contents c
         JOIN gpkg_geometry_columns g ON g.table_name = c.table_name
         WHERE c.data_type = 'features'
         ORDER BY c.rowid
         LIMIT 1",
        [],
        |row| {
            Ok(Layer {
                table: row.get(0)?,
                geometry_column: row.get(1)?,
            })
        },
    );
    match layer {
        Ok(layer) => Ok(layer),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(DatasetError::GeoPackage(
            "no feature table in gpkg_contents".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Attribute columns of `table`: everything except the primary key and the geometry.
fn attribute_columns(conn: &Connection, layer: &Layer) -> Result<Vec<String>, DatasetError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(&layer.table)))?;
    let rows = stmt.query_map([], |row| {
        let name: String = row.get(1)?;
        let pk: i64 = row.get(5)?;
        Ok((name, pk))
    })?;

    let mut columns = Vec::new();
    for row in rows {
        let (name, pk) = row?;
        if pk == 0 && !name.eq_ignore_ascii_case(&layer.geometry_column) {
            columns.push(name);
        }
    }
    Ok(columns)
}

fn read_u32(bytes: &[u8], little_endian: bool) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    Some(if little_endian {
        u32::from_le_bytes(raw)
    } else {
        u32::from_be_bytes(raw)
    })
}

fn read_f64(bytes: &[u8], little_endian: bool) -> Option<f64> {
    let raw: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
    Some(if little_endian {
        f64::from_le_bytes(raw)
    } else {
        f64::from_be_bytes(raw)
    })
}

/// Decodes a GeoPackage geometry blob holding a point into `(x, y)`.
pub(crate) fn decode_point(blob: &[u8]) -> Result<(f64, f64), String> {
    if blob.len() < 8 || &blob[..2] != b"GP" {
        return Err("geometry is not a GeoPackage blob".to_string());
    }
    let flags = blob[3];
    let envelope_len = match (flags >> 1) & 0x07 {
        0 => 0,
        1 => 32,
        2 | 3 => 48,
        4 => 64,
        code => return Err(format!("invalid envelope code {}", code)),
    };
    if flags & 0x10 != 0 {
        return Err("geometry is empty".to_string());
    }

    let wkb = blob
        .get(8 + envelope_len..)
        .ok_or_else(|| "geometry blob is truncated".to_string())?;
    let little_endian = match wkb.first() {
        Some(0) => false,
        Some(1) => true,
        _ => return Err("invalid WKB byte order".to_string()),
    };
    let geometry_type = read_u32(&wkb[1..], little_endian).ok_or("WKB header is truncated")?;
    // ISO Z/M/ZM point codes share the base type modulo 1000
    if geometry_type % 1000 != WKB_POINT {
        return Err(format!("expected a point geometry, found WKB type {}", geometry_type));
    }
    let x = read_f64(&wkb[5..], little_endian).ok_or("WKB point is truncated")?;
    let y = wkb
        .get(13..)
        .and_then(|rest| read_f64(rest, little_endian))
        .ok_or("WKB point is truncated")?;
    Ok((x, y))
}

fn numeric_value(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => std::str::from_utf8(t).ok()?.trim().parse().ok(),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

/// Reads the first point layer of a GeoPackage.
pub fn read_geopackage(path: &Path) -> Result<PointDataset, DatasetError> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let layer = first_feature_layer(&conn)?;
    let columns = attribute_columns(&conn, &layer)?;
    log::debug!(
        "Reading GeoPackage layer '{}' (geometry column '{}')",
        layer.table,
        layer.geometry_column
    );

    let mut select = vec![quote_identifier(&layer.geometry_column)];
    select.extend(columns.iter().map(|c| quote_identifier(c)));
    let sql = format!("SELECT {} FROM {}", select.join(", "), quote_identifier(&layer.table));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut lon = Vec::new();
    let mut lat = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); columns.len()];
    let mut index = 0;

    while let Some(row) = rows.next()? {
        let blob = match row.get_ref(0)? {
            ValueRef::Blob(b) => b,
            ValueRef::Null => {
                log::warn!("Skipping feature {} with no geometry", index);
                index += 1;
                continue;
            }
            _ => {
                return Err(DatasetError::InvalidGeometry {
                    index,
                    reason: "geometry column does not hold a blob".to_string(),
                })
            }
        };
        let (x, y) = decode_point(blob).map_err(|reason| DatasetError::InvalidGeometry { index, reason })?;
        lon.push(x);
        lat.push(y);
        for (i, column) in values.iter_mut().enumerate() {
            column.push(numeric_value(row.get_ref(i + 1)?));
        }
        index += 1;
    }

    let attributes = columns
        .into_iter()
        .zip(values)
        .map(|(name, values)| Attribute::new(name, values))
        .collect();

    PointDataset::new(path, lon, lat, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_blob(x: f64, y: f64) -> Vec<u8> {
        // "GP", version 0, flags: little-endian header, no envelope; srs_id 4326
        let mut blob = vec![b'G', b'P', 0, 0x01];
        blob.extend_from_slice(&4326i32.to_le_bytes());
        blob.push(1);
        blob.extend_from_slice(&WKB_POINT.to_le_bytes());
        blob.extend_from_slice(&x.to_le_bytes());
        blob.extend_from_slice(&y.to_le_bytes());
        blob
    }

    fn create_geopackage(path: &Path, points: &[(f64, f64, Option<f64>)]) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE gpkg_contents (table_name TEXT PRIMARY KEY, data_type TEXT NOT NULL);
             CREATE TABLE gpkg_geometry_columns (table_name TEXT, column_name TEXT, geometry_type_name TEXT);
             CREATE TABLE soundings (fid INTEGER PRIMARY KEY AUTOINCREMENT, geom BLOB, depth REAL, label TEXT);
             INSERT INTO gpkg_contents VALUES ('soundings', 'features');
             INSERT INTO gpkg_geometry_columns VALUES ('soundings', 'geom', 'POINT');",
        )
        .unwrap();
        for (x, y, z) in points {
            conn.execute(
                "INSERT INTO soundings (geom, depth, label) VALUES (?1, ?2, 'p')",
                rusqlite::params![point_blob(*x, *y), z],
            )
            .unwrap();
        }
    }

    #[test]
    fn test_decode_point_with_envelope() {
        let mut blob = vec![b'G', b'P', 0, 0x03];
        blob.extend_from_slice(&0i32.to_le_bytes());
        for v in [1.0f64, 2.0, 3.0, 4.0] {
            blob.extend_from_slice(&v.to_le_bytes());
        }
        // big-endian WKB, ISO PointZ
        blob.push(0);
        blob.extend_from_slice(&1001u32.to_be_bytes());
        blob.extend_from_slice(&1.5f64.to_be_bytes());
        blob.extend_from_slice(&3.5f64.to_be_bytes());
        blob.extend_from_slice(&9.0f64.to_be_bytes());
        assert_eq!(decode_point(&blob).unwrap(), (1.5, 3.5));
    }

    #[test]
    fn test_decode_rejects_non_points() {
        let mut blob = point_blob(0.0, 0.0);
        blob[9..13].copy_from_slice(&3u32.to_le_bytes());
        assert!(decode_point(&blob).is_err());
        assert!(decode_point(b"XX").is_err());
    }

    #[test]
    fn test_read_first_feature_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.gpkg");
        create_geopackage(&path, &[(10.0, 60.0, Some(-3.0)), (10.5, 60.5, None)]);

        let dataset = read_geopackage(&path).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.attribute_names(), vec!["depth", "label"]);
        assert_eq!(dataset.attribute("depth").unwrap().values, vec![Some(-3.0), None]);

        let points = dataset.xyz("depth").unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!((points[0].x, points[0].y, points[0].z), (10.0, 60.0, -3.0));
    }

    #[test]
    fn test_no_feature_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.gpkg");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE gpkg_contents (table_name TEXT, data_type TEXT);
             CREATE TABLE gpkg_geometry_columns (table_name TEXT, column_name TEXT);",
        )
        .unwrap();
        drop(conn);

        let result = read_geopackage(&path);
        assert!(matches!(result, Err(DatasetError::GeoPackage(_))));
    }
}
