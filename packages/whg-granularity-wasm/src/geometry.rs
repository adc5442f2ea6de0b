// Checked conversion from GeoJSON geometry values into geo-types.
//
// The geojson crate's own TryFrom indexes positions directly and panics on
// short arrays, so positions are validated here before geo sees them.

use geo::BoundingRect;
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use geojson::{Position, Value};

use crate::error::{GranularityError, Result};

/// GeoJSON type name of a geometry value.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

pub fn is_lineal(value: &Value) -> bool {
    matches!(value, Value::LineString(_) | Value::MultiLineString(_))
}

pub fn is_polygonal(value: &Value) -> bool {
    matches!(value, Value::Polygon(_) | Value::MultiPolygon(_))
}

fn coord(position: &Position) -> Result<Coord<f64>> {
    match position.as_slice() {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        _ => Err(GranularityError::InvalidCoordinates(format!(
            "position {:?} needs two finite numbers",
            position
        ))),
    }
}

fn line_string(positions: &[Position]) -> Result<LineString<f64>> {
    if positions.is_empty() {
        return Err(GranularityError::InvalidCoordinates(
            "line string has no positions".to_string(),
        ));
    }
    positions.iter().map(coord).collect::<Result<Vec<_>>>().map(LineString::new)
}

fn ring(positions: &[Position]) -> Result<LineString<f64>> {
    if positions.len() < 4 {
        return Err(GranularityError::InvalidCoordinates(format!(
            "polygon ring has {} positions, need at least 4",
            positions.len()
        )));
    }
    line_string(positions)
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first().ok_or_else(|| {
        GranularityError::InvalidCoordinates("polygon has no rings".to_string())
    })?;
    let interiors = interiors.iter().map(|r| ring(r)).collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(ring(exterior)?, interiors))
}

/// Convert a GeoJSON geometry value into a geo-types geometry, rejecting
/// short, empty or non-finite positions.
pub fn to_geo(value: &Value) -> Result<Geometry<f64>> {
    Ok(match value {
        Value::Point(p) => Geometry::Point(Point::from(coord(p)?)),
        Value::MultiPoint(ps) => Geometry::MultiPoint(MultiPoint::new(
            ps.iter().map(|p| coord(p).map(Point::from)).collect::<Result<Vec<_>>>()?,
        )),
        Value::LineString(ls) => Geometry::LineString(line_string(ls)?),
        Value::MultiLineString(mls) => Geometry::MultiLineString(MultiLineString::new(
            mls.iter().map(|ls| line_string(ls)).collect::<Result<Vec<_>>>()?,
        )),
        Value::Polygon(rings) => Geometry::Polygon(polygon(rings)?),
        Value::MultiPolygon(polys) => Geometry::MultiPolygon(MultiPolygon::new(
            polys.iter().map(|p| polygon(p)).collect::<Result<Vec<_>>>()?,
        )),
        Value::GeometryCollection(children) => Geometry::GeometryCollection(GeometryCollection::from(
            children.iter().map(|g| to_geo(&g.value)).collect::<Result<Vec<_>>>()?,
        )),
    })
}

/// Centre of the bounding box, the anchor for the local projection.
pub fn bbox_centre(geometry: &Geometry<f64>) -> Result<Coord<f64>> {
    let rect = geometry.bounding_rect().ok_or_else(|| {
        GranularityError::InvalidCoordinates("geometry has no extent".to_string())
    })?;
    Ok(rect.center())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_polygon_with_hole() {
        let value = Value::Polygon(vec![
            vec![vec![0.0, 0.0], vec![4.0, 0.0], vec![4.0, 4.0], vec![0.0, 0.0]],
            vec![vec![1.0, 1.0], vec![2.0, 1.0], vec![2.0, 2.0], vec![1.0, 1.0]],
        ]);
        match to_geo(&value).unwrap() {
            Geometry::Polygon(p) => assert_eq!(p.interiors().len(), 1),
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn rejects_short_positions() {
        let value = Value::LineString(vec![vec![0.0, 0.0], vec![1.0]]);
        assert!(matches!(to_geo(&value), Err(GranularityError::InvalidCoordinates(_))));
        assert!(to_geo(&Value::Point(vec![])).is_err());
        assert!(to_geo(&Value::LineString(vec![])).is_err());
    }

    #[test]
    fn bbox_centre_of_line() {
        let g = to_geo(&Value::LineString(vec![vec![10.0, 20.0], vec![14.0, 26.0]])).unwrap();
        let c = bbox_centre(&g).unwrap();
        assert_eq!((c.x, c.y), (12.0, 23.0));
    }
}
