use crate::config::MapConfig;
use crate::models::{AnnotatedStation, RiskTier};
use serde::Serialize;

const HIGH_THRESHOLD: f64 = 60.0;
const MODERATE_THRESHOLD: f64 = 40.0;

impl RiskTier {
    /// High above 60, moderate above 40, low otherwise. Both boundaries fall to the lower tier.
    pub fn from_risk(risk: f64) -> Self {
        if risk > HIGH_THRESHOLD {
            RiskTier::High
        } else if risk > MODERATE_THRESHOLD {
            RiskTier::Moderate
        } else {
            RiskTier::Low
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RiskTier::High => "red",
            RiskTier::Moderate => "blue",
            RiskTier::Low => "green",
        }
    }

    pub fn radius(self) -> u32 {
        match self {
            RiskTier::High => 15,
            RiskTier::Moderate => 12,
            RiskTier::Low => 10,
        }
    }

    pub fn status_label(self) -> &'static str {
        match self {
            RiskTier::High => "High Alert",
            RiskTier::Moderate => "Moderate Risk",
            RiskTier::Low => "Low Risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub color: &'static str,
    pub radius: u32,
}

pub fn marker_style(risk: f64) -> MarkerStyle {
    let tier = RiskTier::from_risk(risk);
    MarkerStyle {
        color: tier.color(),
        radius: tier.radius(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: Option<i32>,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub risk: f64,
    pub risk_label: String,
    pub tier: RiskTier,
    pub status: &'static str,
    #[serde(flatten)]
    pub style: MarkerStyle,
}

impl Marker {
    pub fn from_station(station: &AnnotatedStation) -> Self {
        let tier = station.tier;
        Self {
            id: station.record.station_number,
            name: station.record.name.clone(),
            lat: station.record.latitude,
            lng: station.record.longitude,
            risk: station.risk_percentage,
            risk_label: format!("{:.2}%", station.risk_percentage),
            tier,
            status: tier.status_label(),
            style: marker_style(station.risk_percentage),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Viewport {
    Default { center: [f64; 2], zoom: u8 },
    Fit { south_west: [f64; 2], north_east: [f64; 2] },
}

impl Viewport {
    pub fn default_for(map: &MapConfig) -> Self {
        Viewport::Default {
            center: map.default_center,
            zoom: map.default_zoom,
        }
    }

    /// Smallest box containing every marker, or `None` when there are none.
    pub fn bounding(markers: &[Marker]) -> Option<Self> {
        let first = markers.first()?;
        let (mut south, mut west) = (first.lat, first.lng);
        let (mut north, mut east) = (first.lat, first.lng);

        for m in &markers[1..] {
            south = south.min(m.lat);
            north = north.max(m.lat);
            west = west.min(m.lng);
            east = east.max(m.lng);
        }

        Some(Viewport::Fit {
            south_west: [south, west],
            north_east: [north, east],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapState {
    pub markers: Vec<Marker>,
    pub viewport: Viewport,
}

impl MapState {
    pub fn empty(map: &MapConfig) -> Self {
        Self {
            markers: Vec::new(),
            viewport: Viewport::default_for(map),
        }
    }
}

pub fn project(stations: &[AnnotatedStation], map: &MapConfig) -> MapState {
    let markers: Vec<Marker> = stations.iter().map(Marker::from_station).collect();
    let viewport = Viewport::bounding(&markers).unwrap_or_else(|| Viewport::default_for(map));
    MapState { markers, viewport }
}
