//! Classification-derived speed fields.
//!
//! A classifier maps a coordinate to a discrete [`SurfaceClass`]; the static
//! definition table turns that class into a speed constant.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{
    coordinate::Coordinate,
    geometry::{buffer_all, AuthoritativeGeometry, PreparedLayer},
    speed_field::SpeedField,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SurfaceTags: u8 {
        const WATER = 0b0000_0001;
        const FRESHWATER = 0b0000_0010;
        const TRAVERSABLE = 0b0000_0100;
        const FROZEN = 0b0000_1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceClass {
    Ocean,
    Land,
    Lake,
    River,
    Glacier,
}

#[derive(Debug, Clone, Copy)]
pub struct SurfaceDefinition {
    pub class: SurfaceClass,
    pub tags: SurfaceTags,
    pub speed: f64,
}

fn def(class: SurfaceClass, tags: SurfaceTags, speed: f64) -> SurfaceDefinition {
    SurfaceDefinition { class, tags, speed }
}

pub fn surface_definition(class: SurfaceClass) -> SurfaceDefinition {
    use SurfaceTags as Tag;

    match class {
        SurfaceClass::Ocean => def(class, Tag::WATER, 0.0),
        SurfaceClass::Land => def(class, Tag::TRAVERSABLE, 0.055),
        // Fresh water is passable but drains power quickly; it is never a barrier.
        SurfaceClass::Lake => def(class, Tag::WATER | Tag::FRESHWATER | Tag::TRAVERSABLE, 5.0),
        SurfaceClass::River => def(class, Tag::WATER | Tag::FRESHWATER | Tag::TRAVERSABLE, 5.0),
        SurfaceClass::Glacier => def(class, Tag::FROZEN | Tag::TRAVERSABLE, 0.01),
    }
}

pub trait SurfaceClassifier {
    fn classify(&self, coordinate: Coordinate) -> SurfaceClass;
}

impl<F> SurfaceClassifier for F
where
    F: Fn(Coordinate) -> SurfaceClass,
{
    fn classify(&self, coordinate: Coordinate) -> SurfaceClass {
        self(coordinate)
    }
}

/// Speed field backed by a classifier and the static definition table.
#[derive(Debug, Clone)]
pub struct ClassifiedSpeedField<C> {
    classifier: C,
}

impl<C: SurfaceClassifier> ClassifiedSpeedField<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }
}

impl<C: SurfaceClassifier> SpeedField for ClassifiedSpeedField<C> {
    fn speed_at(&self, coordinate: Coordinate) -> f64 {
        surface_definition(self.classifier.classify(coordinate)).speed
    }
}

/// Point-in-polygon classifier over authoritative layers.
///
/// Glaciers are land. Anything outside land and glaciers is ocean; inside,
/// lakes win over river corridors, which win over glaciers.
#[derive(Debug, Clone, Default)]
pub struct GeometryClassifier {
    land: PreparedLayer,
    lakes: PreparedLayer,
    rivers: PreparedLayer,
    glaciers: PreparedLayer,
}

impl GeometryClassifier {
    /// `river_corridor_deg` is the half-width used to turn river lines into
    /// areas; zero ignores rivers.
    pub fn new(geometry: &AuthoritativeGeometry, river_corridor_deg: f64) -> Self {
        let rivers = geometry
            .rivers
            .as_deref()
            .and_then(|lines| buffer_all(lines, river_corridor_deg))
            .map(PreparedLayer::from_shape)
            .unwrap_or_default();

        Self {
            land: PreparedLayer::new(geometry.land.iter().chain(&geometry.glaciers).cloned()),
            lakes: PreparedLayer::new(geometry.lakes.iter().flatten().cloned()),
            rivers,
            glaciers: PreparedLayer::new(geometry.glaciers.iter().cloned()),
        }
    }
}

impl SurfaceClassifier for GeometryClassifier {
    fn classify(&self, coordinate: Coordinate) -> SurfaceClass {
        if !self.land.contains(coordinate) {
            SurfaceClass::Ocean
        } else if self.lakes.contains(coordinate) {
            SurfaceClass::Lake
        } else if self.rivers.contains(coordinate) {
            SurfaceClass::River
        } else if self.glaciers.contains(coordinate) {
            SurfaceClass::Glacier
        } else {
            SurfaceClass::Land
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryInput;
    use geo::{line_string, polygon};

    fn island() -> AuthoritativeGeometry {
        AuthoritativeGeometry::new(GeometryInput::Single(polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ]))
        .with_lakes(GeometryInput::Single(polygon![
            (x: 1.0, y: 1.0),
            (x: 3.0, y: 1.0),
            (x: 3.0, y: 3.0),
            (x: 1.0, y: 3.0),
        ]))
        .with_rivers(GeometryInput::Single(line_string![
            (x: 5.0, y: 0.0),
            (x: 5.0, y: 10.0),
        ]))
    }

    #[test]
    fn classifier_orders_layers() {
        let classifier = GeometryClassifier::new(&island(), 0.25);
        assert_eq!(classifier.classify(Coordinate::new(-1.0, 5.0)), SurfaceClass::Ocean);
        assert_eq!(classifier.classify(Coordinate::new(2.0, 2.0)), SurfaceClass::Lake);
        assert_eq!(classifier.classify(Coordinate::new(5.1, 5.0)), SurfaceClass::River);
        assert_eq!(classifier.classify(Coordinate::new(8.0, 8.0)), SurfaceClass::Land);
    }

    #[test]
    fn glacier_off_the_land_layer_is_glacier() {
        let geometry = island().with_glaciers(GeometryInput::Single(polygon![
            (x: 12.0, y: 0.0),
            (x: 14.0, y: 0.0),
            (x: 14.0, y: 2.0),
            (x: 12.0, y: 2.0),
        ]));
        let field = ClassifiedSpeedField::new(GeometryClassifier::new(&geometry, 0.25));
        assert_eq!(
            field.classifier().classify(Coordinate::new(13.0, 1.0)),
            SurfaceClass::Glacier
        );
        assert_eq!(
            field.speed_at(Coordinate::new(13.0, 1.0)),
            surface_definition(SurfaceClass::Glacier).speed
        );
        assert_eq!(
            field.classifier().classify(Coordinate::new(15.0, 1.0)),
            SurfaceClass::Ocean
        );
    }

    #[test]
    fn classified_field_reads_table() {
        let field = ClassifiedSpeedField::new(GeometryClassifier::new(&island(), 0.25));
        assert_eq!(field.speed_at(Coordinate::new(-1.0, 5.0)), 0.0);
        assert_eq!(field.speed_at(Coordinate::new(2.0, 2.0)), 5.0);
        assert_eq!(
            field.speed_at(Coordinate::new(8.0, 8.0)),
            surface_definition(SurfaceClass::Land).speed
        );
    }

    #[test]
    fn only_ocean_is_impassable() {
        for class in [
            SurfaceClass::Land,
            SurfaceClass::Lake,
            SurfaceClass::River,
            SurfaceClass::Glacier,
        ] {
            let definition = surface_definition(class);
            assert!(definition.speed > 0.0, "{class:?} should be passable");
            assert!(definition.tags.contains(SurfaceTags::TRAVERSABLE));
        }
        assert!(!surface_definition(SurfaceClass::Ocean)
            .tags
            .contains(SurfaceTags::TRAVERSABLE));
    }
}
