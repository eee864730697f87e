//! Coordinate Reference System handling

#[cfg(not(feature = "gdal"))]
mod native;
mod transform;

pub use transform::Transformer;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG code of WGS84 geographic coordinates
pub const WGS84_EPSG: u32 = 4326;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// Parse the forms users and file formats commonly carry.
    ///
    /// Accepts `EPSG:4326`, a bare code (`4326`), OGC URNs
    /// (`urn:ogc:def:crs:EPSG::32632`), `OGC:CRS84`, PROJ strings and WKT.
    pub fn from_user_input(input: &str) -> Result<Self> {
        let s = input.trim();
        let upper = s.to_ascii_uppercase();

        if matches!(
            upper.as_str(),
            "OGC:CRS84" | "CRS84" | "WGS84" | "URN:OGC:DEF:CRS:OGC:1.3:CRS84" | "URN:OGC:DEF:CRS:OGC::CRS84"
        ) {
            return Ok(Self::wgs84());
        }

        if let Some(code) = upper.strip_prefix("EPSG:") {
            return parse_code(code, input).map(Self::from_epsg);
        }

        if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            // urn:ogc:def:crs:EPSG:<version>:<code>, version usually empty
            let code = upper.rsplit(':').next().unwrap_or_default();
            return parse_code(code, input).map(Self::from_epsg);
        }

        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            return parse_code(s, input).map(Self::from_epsg);
        }

        if s.starts_with("+proj") || s.starts_with("proj=") {
            return Ok(Self::from_proj(s));
        }

        if s.contains('[') {
            return Ok(Self::from_wkt(s));
        }

        Err(Error::UnsupportedCrs(input.to_string()))
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(WGS84_EPSG)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// EPSG code, also recognising the PROJ spelling of plain WGS84.
    pub fn to_epsg(&self) -> Option<u32> {
        if let Some(code) = self.epsg {
            return Some(code);
        }
        let proj = self.proj.as_deref()?;
        let is_longlat = proj.contains("+proj=longlat") || proj.contains("+proj=lonlat");
        let is_wgs84 = proj.contains("+datum=WGS84") || proj.contains("+ellps=WGS84");
        (is_longlat && is_wgs84).then_some(WGS84_EPSG)
    }

    /// True when this CRS is EPSG:4326
    pub fn is_wgs84(&self) -> bool {
        self.to_epsg() == Some(WGS84_EPSG)
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.to_epsg(), other.to_epsg()) {
            return a == b;
        }

        // If both have WKT, compare (this is imperfect)
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return a == b;
        }

        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            let end = wkt.char_indices().nth(50).map_or(wkt.len(), |(i, _)| i);
            return format!("WKT:{}", &wkt[..end]);
        }
        "Unknown".to_string()
    }
}

fn parse_code(code: &str, input: &str) -> Result<u32> {
    code.trim()
        .parse()
        .map_err(|_| Error::UnsupportedCrs(input.to_string()))
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl std::str::FromStr for CRS {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_user_input(s)
    }
}
