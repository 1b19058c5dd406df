//! Stroke geometry for circular progress indicators.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProgressSize {
    Small,
    #[default]
    Medium,
    Large,
    ExtraLarge,
}

impl ProgressSize {
    pub fn diameter(self) -> f64 {
        match self {
            ProgressSize::Small => 60.0,
            ProgressSize::Medium => 80.0,
            ProgressSize::Large => 100.0,
            ProgressSize::ExtraLarge => 120.0,
        }
    }

    pub fn default_thickness(self) -> f64 {
        match self {
            ProgressSize::Small => 6.0,
            ProgressSize::Medium => 8.0,
            ProgressSize::Large => 10.0,
            ProgressSize::ExtraLarge => 12.0,
        }
    }
}

/// Inputs of a single progress ring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcParams {
    pub value: f64,
    pub max: f64,
    pub size: ProgressSize,
    pub thickness: Option<f64>,
}

impl ArcParams {
    /// Percentage ring (`max = 100`).
    pub fn percent(value: f64, size: ProgressSize) -> Self {
        Self {
            value,
            max: 100.0,
            size,
            thickness: None,
        }
    }

    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = Some(thickness);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub diameter: f64,
    pub thickness: f64,
    pub radius: f64,
    pub circumference: f64,
    pub dash_offset: f64,
    /// Filled share in `[0, 1]`.
    pub fraction: f64,
}

pub fn compute_arc(params: ArcParams) -> Arc {
    let diameter = params.size.diameter();
    let thickness = params
        .thickness
        .unwrap_or_else(|| params.size.default_thickness());
    let radius = (diameter - thickness) / 2.0;
    let circumference = 2.0 * PI * radius;

    let fraction = if params.max > 0.0 {
        params.value.max(0.0).min(params.max) / params.max
    } else {
        0.0
    };

    Arc {
        diameter,
        thickness,
        radius,
        circumference,
        dash_offset: circumference * (1.0 - fraction),
        fraction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn half_value_offsets_half_the_circumference() {
        let arc = compute_arc(ArcParams {
            value: 50.0,
            max: 100.0,
            size: ProgressSize::Large,
            thickness: None,
        });
        assert!(close(arc.radius, 45.0));
        assert!(close(arc.circumference, 90.0 * PI));
        assert!(close(arc.dash_offset, arc.circumference * 0.5));
    }

    #[test]
    fn zero_max_yields_an_empty_arc() {
        let arc = compute_arc(ArcParams {
            value: 12.0,
            max: 0.0,
            size: ProgressSize::Medium,
            thickness: None,
        });
        assert_eq!(arc.fraction, 0.0);
        assert!(close(arc.dash_offset, arc.circumference));
        assert!(arc.dash_offset.is_finite());
    }

    #[test]
    fn value_is_clamped_into_range() {
        let over = compute_arc(ArcParams::percent(180.0, ProgressSize::Small));
        assert_eq!(over.fraction, 1.0);
        assert!(close(over.dash_offset, 0.0));

        let under = compute_arc(ArcParams::percent(-20.0, ProgressSize::Small));
        assert_eq!(under.fraction, 0.0);
        assert!(close(under.dash_offset, under.circumference));
    }

    #[test]
    fn explicit_thickness_overrides_size_default() {
        let arc = compute_arc(ArcParams::percent(0.0, ProgressSize::ExtraLarge).with_thickness(20.0));
        assert_eq!(arc.thickness, 20.0);
        assert!(close(arc.radius, 50.0));

        let default = compute_arc(ArcParams::percent(0.0, ProgressSize::ExtraLarge));
        assert_eq!(default.thickness, 12.0);
        assert!(close(default.radius, 54.0));
    }
}
