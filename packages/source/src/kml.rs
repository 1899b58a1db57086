//! KML and KMZ import.
//!
//! A `.kmz` file is a zip archive holding the KML document; anything else
//! is read as plain KML text. Each `Placemark` becomes one feature whose
//! properties are its `name`, `description` and `ExtendedData` values, and
//! whose geometry is its `Point`, `LineString`, `Polygon` or
//! `MultiGeometry`.

use std::io::{Cursor, Read as _};
use std::path::Path;

use geojson::{Feature, Geometry, JsonObject, JsonValue, Value};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use suburb_explorer_layer_models::Collection;

use crate::SourceError;

/// Entry name Google Earth uses for the main document of a KMZ.
const KMZ_ROOT_DOCUMENT: &str = "doc.kml";

/// Reads a KML or KMZ file from disk.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or converted.
pub async fn load_kml_file(path: &Path) -> Result<Collection, SourceError> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_kml_upload(&file_name, &bytes)
}

/// Converts an uploaded KML/KMZ file, choosing the container by its
/// extension (case-insensitive).
///
/// # Errors
///
/// Returns [`SourceError`] if a KMZ holds no usable KML entry, the text is
/// not UTF-8 XML, or the document contains no placemarks.
pub fn parse_kml_upload(file_name: &str, bytes: &[u8]) -> Result<Collection, SourceError> {
    let text = if has_extension(file_name, "kmz") {
        extract_kml_from_kmz(bytes)?
    } else {
        String::from_utf8(bytes.to_vec()).map_err(|e| SourceError::Kml {
            message: format!("{file_name} is not UTF-8 text: {e}"),
        })?
    };

    let collection = kml_to_collection(&text)?;
    log::info!("KML: converted {} placemarks from {file_name}", collection.len());
    Ok(collection)
}

fn has_extension(name: &str, extension: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Pulls the KML document out of a KMZ archive.
///
/// The archive must hold exactly one `.kml` entry; when it holds several,
/// the conventional `doc.kml` is used if present.
///
/// # Errors
///
/// Returns [`SourceError`] if the archive is unreadable or no single KML
/// entry can be chosen.
pub fn extract_kml_from_kmz(bytes: &[u8]) -> Result<String, SourceError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    let kml_entries: Vec<String> = archive
        .file_names()
        .filter(|name| has_extension(name, "kml"))
        .map(String::from)
        .collect();

    let entry_name = match kml_entries.as_slice() {
        [] => {
            return Err(SourceError::Kml {
                message: "KMZ archive contains no .kml file".to_string(),
            });
        }
        [only] => only.clone(),
        several => several
            .iter()
            .find(|name| name.eq_ignore_ascii_case(KMZ_ROOT_DOCUMENT))
            .cloned()
            .ok_or_else(|| SourceError::Kml {
                message: format!(
                    "KMZ archive contains {} .kml files ({}); expected exactly one",
                    several.len(),
                    several.join(", ")
                ),
            })?,
    };

    let mut entry = archive.by_name(&entry_name)?;
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(text)
}

/// A geometry element being assembled.
enum Shape {
    Point(Option<Vec<f64>>),
    LineString(Vec<Vec<f64>>),
    Polygon {
        outer: Option<Vec<Vec<f64>>>,
        inner: Vec<Vec<Vec<f64>>>,
    },
    Multi(Vec<Geometry>),
}

impl Shape {
    fn open(tag: &str) -> Option<Self> {
        match tag {
            "Point" => Some(Self::Point(None)),
            "LineString" => Some(Self::LineString(Vec::new())),
            "Polygon" => Some(Self::Polygon {
                outer: None,
                inner: Vec::new(),
            }),
            "MultiGeometry" => Some(Self::Multi(Vec::new())),
            _ => None,
        }
    }

    fn finish(self) -> Option<Geometry> {
        let value = match self {
            Self::Point(position) => Value::Point(position?),
            Self::LineString(positions) if positions.len() >= 2 => Value::LineString(positions),
            Self::LineString(_) => return None,
            Self::Polygon { outer, inner } => {
                let mut rings = vec![outer?];
                rings.extend(inner);
                Value::Polygon(rings)
            }
            Self::Multi(parts) => merge_parts(parts)?,
        };
        Some(Geometry::new(value))
    }
}

/// Collapses homogeneous `MultiGeometry` parts into their `Multi*`
/// variant, falling back to a geometry collection.
fn merge_parts(parts: Vec<Geometry>) -> Option<Value> {
    if parts.is_empty() {
        return None;
    }
    if parts.iter().all(|g| matches!(g.value, Value::Point(_))) {
        return Some(Value::MultiPoint(
            parts
                .into_iter()
                .filter_map(|g| match g.value {
                    Value::Point(p) => Some(p),
                    _ => None,
                })
                .collect(),
        ));
    }
    if parts.iter().all(|g| matches!(g.value, Value::LineString(_))) {
        return Some(Value::MultiLineString(
            parts
                .into_iter()
                .filter_map(|g| match g.value {
                    Value::LineString(l) => Some(l),
                    _ => None,
                })
                .collect(),
        ));
    }
    if parts.iter().all(|g| matches!(g.value, Value::Polygon(_))) {
        return Some(Value::MultiPolygon(
            parts
                .into_iter()
                .filter_map(|g| match g.value {
                    Value::Polygon(p) => Some(p),
                    _ => None,
                })
                .collect(),
        ));
    }
    Some(Value::GeometryCollection(parts))
}

/// Parses a KML `coordinates` text block (`lon,lat[,alt]` tuples separated
/// by whitespace). Tuples without two numbers are skipped.
fn parse_coordinates(text: &str) -> Vec<Vec<f64>> {
    text.split_whitespace()
        .filter_map(|tuple| {
            let ordinates: Vec<f64> = tuple
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse)
                .collect::<Result<_, _>>()
                .ok()?;
            (ordinates.len() >= 2).then_some(ordinates)
        })
        .collect()
}

/// A `Placemark` being assembled.
#[derive(Default)]
struct Placemark {
    properties: JsonObject,
    geometries: Vec<Geometry>,
}

impl Placemark {
    fn finish(mut self) -> Feature {
        let geometry = match self.geometries.len() {
            0 => None,
            1 => self.geometries.pop(),
            _ => Some(Geometry::new(Value::GeometryCollection(self.geometries))),
        };
        Feature {
            bbox: None,
            geometry,
            id: None,
            properties: Some(self.properties),
            foreign_members: None,
        }
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn name_attribute(start: &BytesStart<'_>) -> Result<Option<String>, SourceError> {
    match start.try_get_attribute("name").map_err(quick_xml::Error::from)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Converts a KML document to a feature collection.
///
/// # Errors
///
/// Returns [`SourceError::Xml`] for malformed XML and [`SourceError::Kml`]
/// when the document holds no placemarks.
pub fn kml_to_collection(text: &str) -> Result<Collection, SourceError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut features: Vec<Feature> = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut placemark: Option<Placemark> = None;
    let mut shapes: Vec<Shape> = Vec::new();
    let mut data_name: Option<String> = None;
    let mut simple_data_name: Option<String> = None;
    let mut text_buf = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let tag = local_name(&start);
                text_buf.clear();

                if tag == "Placemark" {
                    placemark = Some(Placemark::default());
                } else if placemark.is_some() {
                    if let Some(shape) = Shape::open(&tag) {
                        shapes.push(shape);
                    } else if tag == "Data" {
                        data_name = name_attribute(&start)?;
                    } else if tag == "SimpleData" {
                        simple_data_name = name_attribute(&start)?;
                    }
                }
                path.push(tag);
            }
            Event::Text(t) => text_buf.push_str(&t.unescape()?),
            Event::CData(c) => text_buf.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(_) => {
                let Some(tag) = path.pop() else {
                    continue;
                };
                let parent = path.last().map(String::as_str);
                let text = std::mem::take(&mut text_buf);

                let Some(current) = placemark.as_mut() else {
                    continue;
                };

                match tag.as_str() {
                    "Placemark" => {
                        shapes.clear();
                        if let Some(done) = placemark.take() {
                            features.push(done.finish());
                        }
                    }
                    "name" | "description" if parent == Some("Placemark") => {
                        current
                            .properties
                            .insert(tag.clone(), JsonValue::String(text.trim().to_string()));
                    }
                    "value" if parent == Some("Data") => {
                        if let Some(name) = &data_name {
                            current
                                .properties
                                .insert(name.clone(), JsonValue::String(text.trim().to_string()));
                        }
                    }
                    "Data" => data_name = None,
                    "SimpleData" => {
                        if let Some(name) = simple_data_name.take() {
                            current
                                .properties
                                .insert(name, JsonValue::String(text.trim().to_string()));
                        }
                    }
                    "coordinates" => {
                        let positions = parse_coordinates(&text);
                        let in_outer = path.iter().any(|t| t == "outerBoundaryIs");
                        match shapes.last_mut() {
                            Some(Shape::Point(point)) => *point = positions.into_iter().next(),
                            Some(Shape::LineString(line)) => *line = positions,
                            Some(Shape::Polygon { outer, inner }) if positions.len() >= 4 => {
                                if in_outer {
                                    *outer = Some(positions);
                                } else {
                                    inner.push(positions);
                                }
                            }
                            _ => {}
                        }
                    }
                    "Point" | "LineString" | "Polygon" | "MultiGeometry" => {
                        if let Some(geometry) = shapes.pop().and_then(Shape::finish) {
                            match shapes.last_mut() {
                                Some(Shape::Multi(parts)) => parts.push(geometry),
                                _ => current.geometries.push(geometry),
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if features.is_empty() {
        return Err(SourceError::Kml {
            message: "document contains no placemarks".to_string(),
        });
    }

    Ok(features.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>Intake areas</name>
    <Folder>
      <Placemark>
        <name>Perth Modern</name>
        <description><![CDATA[<b>Selective</b> school]]></description>
        <ExtendedData>
          <Data name="code"><displayName>Code</displayName><value>4027</value></Data>
          <SchemaData schemaUrl="#s"><SimpleData name="level">high</SimpleData></SchemaData>
        </ExtendedData>
        <Point><coordinates>115.84,-31.94,0</coordinates></Point>
      </Placemark>
      <Placemark>
        <name>Area &amp; surrounds</name>
        <Polygon>
          <outerBoundaryIs><LinearRing><coordinates>
            115.0,-32.0 116.0,-32.0 116.0,-31.0 115.0,-32.0
          </coordinates></LinearRing></outerBoundaryIs>
          <innerBoundaryIs><LinearRing><coordinates>
            115.4,-31.8 115.6,-31.8 115.6,-31.6 115.4,-31.8
          </coordinates></LinearRing></innerBoundaryIs>
        </Polygon>
      </Placemark>
      <Placemark>
        <name>Routes</name>
        <MultiGeometry>
          <LineString><coordinates>115.0,-32.0 115.1,-32.1</coordinates></LineString>
          <LineString><coordinates>115.2,-32.2 115.3,-32.3</coordinates></LineString>
        </MultiGeometry>
      </Placemark>
    </Folder>
  </Document>
</kml>"##;

    fn kmz(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, body) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn converts_placemarks() {
        let collection = kml_to_collection(SAMPLE).unwrap();
        let features: Vec<&Feature> = collection.iter().collect();
        assert_eq!(features.len(), 3);

        let school = features[0];
        assert_eq!(school.property("name"), Some(&JsonValue::from("Perth Modern")));
        assert_eq!(
            school.property("description"),
            Some(&JsonValue::from("<b>Selective</b> school"))
        );
        assert_eq!(school.property("code"), Some(&JsonValue::from("4027")));
        assert_eq!(school.property("level"), Some(&JsonValue::from("high")));
        assert_eq!(
            school.geometry.as_ref().unwrap().value,
            Value::Point(vec![115.84, -31.94, 0.0])
        );

        let area = features[1];
        assert_eq!(area.property("name"), Some(&JsonValue::from("Area & surrounds")));
        match &area.geometry.as_ref().unwrap().value {
            Value::Polygon(rings) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[0][1], vec![116.0, -32.0]);
            }
            other => panic!("expected polygon, got {other:?}"),
        }

        match &features[2].geometry.as_ref().unwrap().value {
            Value::MultiLineString(lines) => assert_eq!(lines.len(), 2),
            other => panic!("expected multilinestring, got {other:?}"),
        }
    }

    #[test]
    fn document_without_placemarks_fails() {
        let err = kml_to_collection("<kml><Document><name>x</name></Document></kml>").unwrap_err();
        assert!(matches!(err, SourceError::Kml { .. }));
    }

    #[test]
    fn kmz_with_single_entry_is_extracted() {
        let bytes = kmz(&[("files/Intake.KML", SAMPLE), ("files/icon.png", "png")]);
        let collection = parse_kml_upload("areas.KMZ", &bytes).unwrap();
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn kmz_without_kml_entry_fails() {
        let bytes = kmz(&[("readme.txt", "nothing here")]);
        let err = parse_kml_upload("empty.kmz", &bytes).unwrap_err();
        assert_eq!(
            err.to_string(),
            "KML conversion failed: KMZ archive contains no .kml file"
        );
    }

    #[test]
    fn kmz_with_several_entries_prefers_doc_kml() {
        let bytes = kmz(&[("a.kml", "<kml/>"), ("doc.kml", SAMPLE)]);
        assert_eq!(extract_kml_from_kmz(&bytes).unwrap(), SAMPLE);

        let ambiguous = kmz(&[("a.kml", SAMPLE), ("b.kml", SAMPLE)]);
        assert!(matches!(
            extract_kml_from_kmz(&ambiguous),
            Err(SourceError::Kml { .. })
        ));
    }

    #[test]
    fn plain_kml_is_read_as_text() {
        let collection = parse_kml_upload("areas.kml", SAMPLE.as_bytes()).unwrap();
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn coordinates_skip_bad_tuples() {
        assert_eq!(
            parse_coordinates(" 1,2 3,x 4\n5,6,7 "),
            vec![vec![1.0, 2.0], vec![5.0, 6.0, 7.0]]
        );
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let tmp = std::env::temp_dir().join("suburb_explorer_kml_test");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join("areas.kmz");
        std::fs::write(&path, kmz(&[("doc.kml", SAMPLE)])).unwrap();

        let collection = load_kml_file(&path).await.unwrap();
        assert_eq!(collection.len(), 3);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
