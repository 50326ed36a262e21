//! Delimited text points: one row per point, longitude/latitude columns
//! located by name, every other column an attribute.

use std::path::Path;

use csv::ReaderBuilder;

use super::{Attribute, DatasetError, PointDataset};

const LON_ALIASES: [&str; 4] = ["longitude", "lon", "lng", "x"];
const LAT_ALIASES: [&str; 3] = ["latitude", "lat", "y"];

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|alias| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(alias))
    })
}

fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok()
}

/// Reads a comma-separated point file with a header row.
pub fn read_delimited(path: &Path) -> Result<PointDataset, DatasetError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::Headers)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let lon_col = find_column(&headers, &LON_ALIASES);
    let lat_col = find_column(&headers, &LAT_ALIASES);
    let (lon_col, lat_col) = match (lon_col, lat_col) {
        (Some(lon), Some(lat)) => (lon, lat),
        _ => {
            return Err(DatasetError::MissingColumns(format!(
                "expected longitude and latitude columns, found: {}",
                headers.join(", ")
            )))
        }
    };

    let attribute_cols: Vec<usize> = (0..headers.len())
        .filter(|&i| i != lon_col && i != lat_col)
        .collect();

    let mut lon = Vec::new();
    let mut lat = Vec::new();
    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); attribute_cols.len()];

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let coordinate = |col: usize, what: &str| {
            parse_cell(record.get(col).unwrap_or("")).ok_or_else(|| DatasetError::InvalidGeometry {
                index,
                reason: format!("{} '{}' is not a number", what, record.get(col).unwrap_or("")),
            })
        };
        lon.push(coordinate(lon_col, "longitude")?);
        lat.push(coordinate(lat_col, "latitude")?);

        for (values, &col) in columns.iter_mut().zip(&attribute_cols) {
            values.push(record.get(col).and_then(parse_cell));
        }
    }

    let attributes = attribute_cols
        .iter()
        .zip(columns)
        .map(|(&col, values)| Attribute::new(headers[col].trim(), values))
        .collect();

    PointDataset::new(path, lon, lat, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_reads_attributes_in_file_order() {
        let file = write_csv("id,Longitude,Latitude,depth,name\n1,10.0,60.0,-5.5,a\n2,10.1,60.1,,b\n");
        let dataset = read_delimited(file.path()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.attribute_names(), vec!["id", "depth", "name"]);
        let depth = dataset.attribute("depth").unwrap();
        assert_eq!(depth.values, vec![Some(-5.5), None]);
        assert!(!dataset.attribute("name").unwrap().is_numeric());
    }

    #[test]
    fn test_short_column_aliases() {
        let file = write_csv("x,y,z\n1.0,2.0,3.0\n");
        let dataset = read_delimited(file.path()).unwrap();
        assert_eq!(dataset.attribute_names(), vec!["z"]);
        let points = dataset.xyz("z").unwrap();
        assert_eq!(points[0].x, 1.0);
        assert_eq!(points[0].y, 2.0);
    }

    #[test]
    fn test_missing_coordinate_columns() {
        let file = write_csv("a,b,c\n1,2,3\n");
        let result = read_delimited(file.path());
        assert!(matches!(result, Err(DatasetError::MissingColumns(_))));
    }

    #[test]
    fn test_bad_coordinate_reports_row() {
        let file = write_csv("lon,lat,z\n1,2,3\nabc,2,3\n");
        let result = read_delimited(file.path());
        assert!(matches!(result, Err(DatasetError::InvalidGeometry { index: 1, .. })));
    }

    #[test]
    fn test_header_only_is_empty() {
        let file = write_csv("lon,lat,z\n");
        let result = read_delimited(file.path());
        assert!(matches!(result, Err(DatasetError::Empty)));
    }
}
