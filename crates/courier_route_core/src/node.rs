use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const NINETY: f64 = 90.0;
const ONE_EIGHTY: f64 = NINETY * 2.0;

/// A WGS84 position in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Parses a `lat,lng` token.
    pub fn parse(token: &str) -> Result<Self> {
        let mut it = token.trim().split(',');
        let lat_s = it
            .next()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::invalid_input(format!("missing latitude in '{token}'")))?;
        let lng_s = it
            .next()
            .ok_or_else(|| Error::invalid_input(format!("missing longitude in '{token}'")))?;
        if it.next().is_some() {
            return Err(Error::invalid_input(format!(
                "expected 'lat,lng' but got extra comma fields: {token}"
            )));
        }

        let lat: f64 = lat_s
            .trim()
            .parse()
            .map_err(|_| Error::invalid_input(format!("invalid latitude: {lat_s}")))?;
        let lng: f64 = lng_s
            .trim()
            .parse()
            .map_err(|_| Error::invalid_input(format!("invalid longitude: {lng_s}")))?;

        Ok(Self::new(lat, lng))
    }

    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-NINETY..=NINETY).contains(&self.lat)
            && (-ONE_EIGHTY..=ONE_EIGHTY).contains(&self.lng)
    }

    pub(crate) fn as_row(self) -> [f64; 2] {
        [self.lat, self.lng]
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut b1 = ryu::Buffer::new();
        let mut b2 = ryu::Buffer::new();
        write!(f, "{},{}", b1.format(self.lat), b2.format(self.lng))
    }
}

#[cfg(test)]
mod tests {
    use super::Coordinate;

    #[test]
    fn valid_bounds_are_accepted() {
        assert!(Coordinate::new(-90.0, -180.0).is_valid());
        assert!(Coordinate::new(90.0, 180.0).is_valid());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn display_formats_as_lat_lng() {
        let coord = Coordinate::new(4.5981, -74.0758);
        assert_eq!(coord.to_string(), "4.5981,-74.0758");
    }

    #[test]
    fn parse_reads_lat_lng_pair() {
        let coord = Coordinate::parse(" 4.6,-74.08 ").expect("parse coordinate");
        assert_eq!(coord, Coordinate::new(4.6, -74.08));
    }

    #[test]
    fn parse_rejects_extra_fields_and_bad_numbers() {
        let err = Coordinate::parse("1,2,3").expect_err("extra fields should fail");
        assert!(err.to_string().contains("expected 'lat,lng'"));

        let err = Coordinate::parse("a,2").expect_err("invalid latitude should fail");
        assert!(err.to_string().contains("invalid latitude"));

        let err = Coordinate::parse("4.6").expect_err("missing longitude should fail");
        assert!(err.to_string().contains("missing longitude"));
    }
}
