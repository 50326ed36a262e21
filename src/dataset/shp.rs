//! ESRI shapefile point layers with a `.dbf` attribute table.

use std::path::Path;

use shapefile::dbase::{self, FieldValue};
use shapefile::{Reader, Shape};

use super::{Attribute, DatasetError, PointDataset};

fn numeric_value(value: Option<&FieldValue>) -> Option<f64> {
    match value? {
        FieldValue::Numeric(v) => *v,
        FieldValue::Float(v) => v.map(f64::from),
        FieldValue::Double(v) => Some(*v),
        FieldValue::Integer(v) => Some(f64::from(*v)),
        FieldValue::Currency(v) => Some(*v),
        FieldValue::Character(Some(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Attribute names in the order they are declared in the `.dbf` header.
fn field_names(path: &Path) -> Result<Vec<String>, DatasetError> {
    let dbf = dbase::Reader::from_path(path.with_extension("dbf"))
        .map_err(|e| DatasetError::Shapefile(e.to_string()))?;
    Ok(dbf
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .filter(|name| name != "DeletionFlag")
        .collect())
}

/// Reads every point shape and its record from a shapefile.
pub fn read_shapefile(path: &Path) -> Result<PointDataset, DatasetError> {
    let names = field_names(path)?;
    let mut reader = Reader::from_path(path)?;

    let mut lon = Vec::new();
    let mut lat = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];

    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result?;
        let (x, y) = match shape {
            Shape::Point(p) => (p.x, p.y),
            Shape::PointM(p) => (p.x, p.y),
            Shape::PointZ(p) => (p.x, p.y),
            Shape::NullShape => {
                log::warn!("Skipping feature {} with a null shape", index);
                continue;
            }
            other => {
                return Err(DatasetError::InvalidGeometry {
                    index,
                    reason: format!("expected a point, found {:?}", other.shapetype()),
                })
            }
        };
        lon.push(x);
        lat.push(y);
        for (name, column) in names.iter().zip(values.iter_mut()) {
            column.push(numeric_value(record.get(name)));
        }
    }

    let attributes = names
        .into_iter()
        .zip(values)
        .map(|(name, values)| Attribute::new(name, values))
        .collect();

    PointDataset::new(path, lon, lat, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::XyzPoint;

    #[test]
    fn test_numeric_field_values() {
        assert_eq!(numeric_value(Some(&FieldValue::Numeric(Some(2.5)))), Some(2.5));
        assert_eq!(numeric_value(Some(&FieldValue::Numeric(None))), None);
        assert_eq!(numeric_value(Some(&FieldValue::Integer(7))), Some(7.0));
        assert_eq!(
            numeric_value(Some(&FieldValue::Character(Some(" -12.25 ".to_string())))),
            Some(-12.25)
        );
        assert_eq!(numeric_value(Some(&FieldValue::Character(Some("n/a".to_string())))), None);
        assert_eq!(numeric_value(Some(&FieldValue::Logical(Some(true)))), None);
        assert_eq!(numeric_value(None), None);
    }

    #[test]
    fn test_reads_points_and_attributes_in_field_order() {
        use shapefile::dbase::{FieldName, Record, TableWriterBuilder};
        use shapefile::{Point, Writer};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("soundings.shp");
        {
            let table = TableWriterBuilder::new()
                .add_numeric_field(FieldName::try_from("DEPTH").unwrap(), 12, 3)
                .add_character_field(FieldName::try_from("NAME").unwrap(), 16);
            let mut writer = Writer::from_path(&path, table).unwrap();
            for (x, y, depth, name) in [(4.5, 52.0, 3.5, "a"), (4.6, 52.1, -1.0, "b")] {
                let mut record = Record::default();
                record.insert("DEPTH".to_string(), FieldValue::Numeric(Some(depth)));
                record.insert("NAME".to_string(), FieldValue::Character(Some(name.to_string())));
                writer.write_shape_and_record(&Point::new(x, y), &record).unwrap();
            }
        }

        let dataset = read_shapefile(&path).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.attribute_names(), vec!["DEPTH", "NAME"]);
        assert_eq!(dataset.attribute("DEPTH").unwrap().values, vec![Some(3.5), Some(-1.0)]);
        assert_eq!(dataset.attribute("NAME").unwrap().values, vec![None, None]);

        let points = dataset.xyz("DEPTH").unwrap();
        assert_eq!(points[0], XyzPoint::new(4.5, 52.0, 3.5));
        assert_eq!(points[1], XyzPoint::new(4.6, 52.1, -1.0));
        assert!(dataset.xyz("NAME").is_err());
    }

    #[test]
    fn test_missing_dbf_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.shp");
        std::fs::write(&path, b"not a shapefile").unwrap();
        assert!(read_shapefile(&path).is_err());
    }
}
