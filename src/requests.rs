//! Job payloads sent to the creation endpoints
//!
//! Each payload type knows which resource it creates through [`JobSpec::KIND`], so the
//! submission step can pick the endpoint path without a separate argument.

use crate::types::{JobId, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A serializable job-creation payload
pub trait JobSpec: Serialize + Send + Sync {
    /// Resource the payload creates
    const KIND: ResourceKind;
}

/// HRU selection settings for a project
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HruSettings {
    /// Selection method (`area`, `percentage`, ...)
    pub method: String,
    /// Threshold value for the method, sent as an integer when it is whole
    pub target: serde_json::Number,
    /// Units of `target`
    pub units: String,
}

/// Payload for `/builder/project/*`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRequest {
    /// Watershed dataset (`HUC8`, `HUC10`, `HUC12`)
    pub dataset: String,
    /// Outlet subbasin of the watershed
    pub downstream_subbasin: String,
    /// HRU settings
    pub set_hrus: HruSettings,
}

impl JobSpec for ProjectRequest {
    const KIND: ResourceKind = ResourceKind::Project;
}

impl ProjectRequest {
    /// HUC8 watershed 07100009 with 1 km² area HRUs, which satisfies the ICLUS requirements
    pub fn huc8_default() -> Self {
        Self {
            dataset: "HUC8".to_string(),
            downstream_subbasin: "07100009".to_string(),
            set_hrus: HruSettings {
                method: "area".to_string(),
                target: 1.into(),
                units: "km2".to_string(),
            },
        }
    }
}

/// Statistics requested for one SWAT output file
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSelection {
    /// Statistic names such as `daily_avg`
    pub statistics: Vec<String>,
}

/// Report formats and outputs requested for a scenario
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    /// Output formats (`csv`, `netcdf`)
    pub formats: Vec<String>,
    /// Unit system (`metric`, `english`)
    pub units: String,
    /// Requested statistics, keyed by output file (`rch`, `sub`, `hru`, ...)
    pub outputs: BTreeMap<String, OutputSelection>,
}

impl Default for ReportData {
    fn default() -> Self {
        let mut outputs = BTreeMap::new();
        outputs.insert(
            "rch".to_string(),
            OutputSelection {
                statistics: vec!["daily_avg".to_string()],
            },
        );
        Self {
            formats: vec!["csv".to_string(), "netcdf".to_string()],
            units: "metric".to_string(),
            outputs,
        }
    }
}

/// SWAT editor database setting
///
/// The API takes either a boolean or the string `"access"`; the latter is needed for a
/// later project zip to contain GIS data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SwatEditorDb {
    /// Write (or skip) the default database
    Enabled(bool),
    /// Write a named database format
    Format(String),
}

impl SwatEditorDb {
    /// Microsoft Access database
    pub fn access() -> Self {
        SwatEditorDb::Format("access".to_string())
    }
}

/// Payload for `/builder/scenario/*`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRequest {
    /// Parent project request
    pub project_request_id: JobId,
    /// Scenario name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_name: Option<String>,
    /// Weather dataset (`PRISM`, or a CMIP model such as `GISS-E2-R`)
    pub weather_dataset: String,
    /// Climate scenario for CMIP weather data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climate_scenario: Option<String>,
    /// Use ICLUS land use projections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_iclus: Option<bool>,
    /// First simulated day, `YYYY-MM-DD`
    pub starting_simulation_date: String,
    /// Last simulated day, `YYYY-MM-DD`
    pub ending_simulation_date: String,
    /// Warm-up years excluded from output
    pub warmup_years: u32,
    /// Print frequency (`daily`, `monthly`, `yearly`)
    pub output_print_setting: String,
    /// SWAT editor database output
    pub write_swat_editor_db: SwatEditorDb,
    /// Requested report
    pub report_data: ReportData,
}

impl JobSpec for ScenarioRequest {
    const KIND: ResourceKind = ResourceKind::Scenario;
}

impl ScenarioRequest {
    /// PRISM weather, 1981-1989 daily run with a two-year warm-up
    pub fn default_for(project_id: JobId) -> Self {
        Self {
            project_request_id: project_id,
            scenario_name: None,
            weather_dataset: "PRISM".to_string(),
            climate_scenario: None,
            use_iclus: None,
            starting_simulation_date: "1981-01-01".to_string(),
            ending_simulation_date: "1989-12-31".to_string(),
            warmup_years: 2,
            output_print_setting: "daily".to_string(),
            write_swat_editor_db: SwatEditorDb::Enabled(true),
            report_data: ReportData::default(),
        }
    }

    /// GISS-E2-R RCP4.5 weather with ICLUS land use, 2030-2040
    pub fn iclus(project_id: JobId) -> Self {
        Self {
            scenario_name: Some("iclus-scenario".to_string()),
            weather_dataset: "GISS-E2-R".to_string(),
            climate_scenario: Some("RCP45".to_string()),
            use_iclus: Some(true),
            starting_simulation_date: "2030-01-01".to_string(),
            ending_simulation_date: "2040-12-31".to_string(),
            write_swat_editor_db: SwatEditorDb::access(),
            ..Self::default_for(project_id)
        }
    }

    /// Default scenario named for a custom land use upload
    pub fn custom_lup(project_id: JobId) -> Self {
        Self::default_for(project_id).named("custom-lup-scenario")
    }

    /// Default scenario named for a point source upload
    pub fn point_source(project_id: JobId) -> Self {
        Self::default_for(project_id).named("point-source-scenario")
    }

    /// Set the scenario name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.scenario_name = Some(name.into());
        self
    }
}
