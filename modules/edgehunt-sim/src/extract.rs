//! Minimal extraction contract over scenario documents.
//!
//! Backends only need three values out of a full scenario document, read
//! from its parameter declarations:
//! `<ParameterDeclaration name="EgoVehicleSpeed" ... value="95.0"/>`.

use std::sync::LazyLock;

use regex::Regex;

pub const EGO_SPEED_PARAM: &str = "EgoVehicleSpeed";
pub const ADVERSARY_SPEED_PARAM: &str = "AdversaryVehicleSpeed";
pub const LATERAL_OFFSET_PARAM: &str = "CutInLateralOffset";
pub const LANE_CHANGE_DURATION_PARAM: &str = "LaneChangeDuration";
pub const ROAD_CONDITION_PARAM: &str = "RoadCondition";

pub const DEFAULT_EGO_SPEED: f64 = 50.0;
pub const DEFAULT_LATERAL_OFFSET: f64 = 10.0;
pub const DEFAULT_LANE_CHANGE_DURATION: f64 = 3.0;

static RE_EGO_SPEED: LazyLock<Regex> = LazyLock::new(|| param_regex(EGO_SPEED_PARAM));
static RE_LATERAL_OFFSET: LazyLock<Regex> = LazyLock::new(|| param_regex(LATERAL_OFFSET_PARAM));
static RE_DURATION: LazyLock<Regex> = LazyLock::new(|| param_regex(LANE_CHANGE_DURATION_PARAM));

fn param_regex(name: &str) -> Regex {
    Regex::new(&format!(r#"name="{name}".*?value="(\d+\.?\d*)""#)).unwrap()
}

/// Values pulled out of a scenario document. `None` means the parameter was
/// absent or unparseable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScenarioExtract {
    pub ego_speed: Option<f64>,
    pub lateral_offset: Option<f64>,
    pub lane_change_duration: Option<f64>,
}

impl ScenarioExtract {
    pub fn from_document(document: &str) -> Self {
        Self {
            ego_speed: capture(&RE_EGO_SPEED, document),
            lateral_offset: capture(&RE_LATERAL_OFFSET, document),
            lane_change_duration: capture(&RE_DURATION, document),
        }
    }

    pub fn ego_speed_or_default(&self) -> f64 {
        self.ego_speed.unwrap_or(DEFAULT_EGO_SPEED)
    }

    pub fn lateral_offset_or_default(&self) -> f64 {
        self.lateral_offset.unwrap_or(DEFAULT_LATERAL_OFFSET)
    }

    pub fn lane_change_duration_or_default(&self) -> f64 {
        self.lane_change_duration
            .unwrap_or(DEFAULT_LANE_CHANGE_DURATION)
    }
}

fn capture(re: &Regex, document: &str) -> Option<f64> {
    re.captures(document)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_declared_parameters() {
        let doc = r#"
            <ParameterDeclaration name="EgoVehicleSpeed" parameterType="double" value="104.25"/>
            <ParameterDeclaration name="CutInLateralOffset" parameterType="double" value="2.5"/>
            <ParameterDeclaration name="LaneChangeDuration" parameterType="double" value="1.2"/>
        "#;
        let extract = ScenarioExtract::from_document(doc);
        assert_eq!(extract.ego_speed, Some(104.25));
        assert_eq!(extract.lateral_offset, Some(2.5));
        assert_eq!(extract.lane_change_duration, Some(1.2));
    }

    #[test]
    fn missing_parameters_fall_back_to_defaults() {
        let extract = ScenarioExtract::from_document("<OpenSCENARIO/>");
        assert_eq!(extract, ScenarioExtract::default());
        assert_eq!(extract.ego_speed_or_default(), 50.0);
        assert_eq!(extract.lateral_offset_or_default(), 10.0);
        assert_eq!(extract.lane_change_duration_or_default(), 3.0);
    }

    #[test]
    fn integer_values_are_accepted() {
        let doc = r#"<ParameterDeclaration name="EgoVehicleSpeed" value="90"/>"#;
        assert_eq!(ScenarioExtract::from_document(doc).ego_speed, Some(90.0));
    }
}
