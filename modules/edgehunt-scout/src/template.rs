//! Scenario encoding — substitutes parameters into an OpenSCENARIO document.

use std::path::Path;
use std::sync::LazyLock;

use edgehunt_common::ScenarioParameters;
use regex::Regex;
use thiserror::Error;

const BUILTIN_CUT_IN: &str = include_str!("../templates/cut_in.xosc");

const PLACEHOLDERS: [&str; 5] = [
    "ego_speed",
    "adversary_speed",
    "lateral_offset",
    "lane_change_duration",
    "road_condition",
];

static RE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template is missing placeholder {{{0}}}")]
    MissingPlaceholder(&'static str),

    #[error("template contains unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),

    #[error("failed to read template {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ScenarioTemplate {
    source: String,
}

impl ScenarioTemplate {
    /// The cut-in scenario shipped with the crate.
    pub fn builtin() -> Self {
        Self {
            source: BUILTIN_CUT_IN.to_string(),
        }
    }

    pub fn from_source(source: impl Into<String>) -> Result<Self, TemplateError> {
        let template = Self {
            source: source.into(),
        };
        template.check()?;
        Ok(template)
    }

    pub fn from_path(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_source(source)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Substitute every placeholder. Numbers are written with their shortest
    /// exact decimal form, the road condition as its lowercase name.
    pub fn render(&self, params: &ScenarioParameters) -> Result<String, TemplateError> {
        self.check()?;

        let values = [
            params.ego_speed.to_string(),
            params.adversary_speed.to_string(),
            params.lateral_offset.to_string(),
            params.lane_change_duration.to_string(),
            params.road_condition.as_str().to_string(),
        ];

        let mut document = self.source.clone();
        for (name, value) in PLACEHOLDERS.iter().zip(values.iter()) {
            document = document.replace(&format!("{{{name}}}"), value);
        }
        Ok(document)
    }

    fn check(&self) -> Result<(), TemplateError> {
        for name in PLACEHOLDERS {
            if !self.source.contains(&format!("{{{name}}}")) {
                return Err(TemplateError::MissingPlaceholder(name));
            }
        }
        for caps in RE_PLACEHOLDER.captures_iter(&self.source) {
            let name = &caps[1];
            if !PLACEHOLDERS.contains(&name) {
                return Err(TemplateError::UnknownPlaceholder(name.to_string()));
            }
        }
        Ok(())
    }
}

impl Default for ScenarioTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use edgehunt_common::RoadCondition;
    use edgehunt_sim::ScenarioExtract;

    use super::*;

    fn params() -> ScenarioParameters {
        ScenarioParameters {
            ego_speed: 104.5,
            adversary_speed: 118.0,
            lateral_offset: 2.25,
            lane_change_duration: 1.2,
            road_condition: RoadCondition::Snowy,
        }
    }

    #[test]
    fn builtin_renders_every_field() {
        let doc = ScenarioTemplate::builtin().render(&params()).unwrap();
        assert!(doc.contains(r#"name="EgoVehicleSpeed" parameterType="double" value="104.5""#));
        assert!(doc.contains(r#"name="AdversaryVehicleSpeed" parameterType="double" value="118""#));
        assert!(doc.contains(r#"name="RoadCondition" parameterType="string" value="snowy""#));
        assert!(!RE_PLACEHOLDER.is_match(&doc));
    }

    #[test]
    fn rendered_document_satisfies_extraction_contract() {
        let doc = ScenarioTemplate::builtin().render(&params()).unwrap();
        let extract = ScenarioExtract::from_document(&doc);
        assert_eq!(extract.ego_speed, Some(104.5));
        assert_eq!(extract.lateral_offset, Some(2.25));
        assert_eq!(extract.lane_change_duration, Some(1.2));
    }

    #[test]
    fn missing_placeholder_is_rejected() {
        let source = BUILTIN_CUT_IN.replace("{lateral_offset}", "3.0");
        assert!(matches!(
            ScenarioTemplate::from_source(source),
            Err(TemplateError::MissingPlaceholder("lateral_offset"))
        ));
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let source = format!("{BUILTIN_CUT_IN}<!-- {{weather}} -->");
        match ScenarioTemplate::from_source(source) {
            Err(TemplateError::UnknownPlaceholder(name)) => assert_eq!(name, "weather"),
            other => panic!("expected unknown placeholder, got {other:?}"),
        }
    }

    #[test]
    fn from_path_reads_custom_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.xosc");
        std::fs::write(
            &path,
            "{ego_speed} {adversary_speed} {lateral_offset} {lane_change_duration} {road_condition}",
        )
        .unwrap();
        let doc = ScenarioTemplate::from_path(&path).unwrap().render(&params()).unwrap();
        assert_eq!(doc, "104.5 118 2.25 1.2 snowy");

        assert!(matches!(
            ScenarioTemplate::from_path(&dir.path().join("absent.xosc")),
            Err(TemplateError::Read { .. })
        ));
    }
}
