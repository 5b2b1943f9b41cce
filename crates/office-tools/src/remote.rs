//! Catalogue of the weather tools served by the tool server.

use std::sync::Arc;

use agent_core::tool::{ParameterSchema, ToolRegistry, ToolSchema};

use crate::index::DocumentIndex;
use crate::search::SearchOfficesTool;

pub const GEOCODE_LOCATION: &str = "geocode_location";
pub const GET_WEATHER: &str = "get_weather";
pub const CONVERT_C_TO_F: &str = "convert_c_to_f";

pub fn geocode_location() -> ToolSchema {
    ToolSchema {
        name: GEOCODE_LOCATION.into(),
        description: "Look up the coordinates of a city or place.".into(),
        parameters: vec![ParameterSchema::required("name", "string", "City or place name, e.g. 'New York'")],
        returns: Some("{name, lat, lon}".into()),
    }
}

pub fn get_weather() -> ToolSchema {
    ToolSchema {
        name: GET_WEATHER.into(),
        description: "Current weather at a coordinate, temperature in Celsius.".into(),
        parameters: vec![
            ParameterSchema::required("lat", "number", "Latitude"),
            ParameterSchema::required("lon", "number", "Longitude"),
        ],
        returns: Some("{conditions, temp_c}".into()),
    }
}

pub fn convert_c_to_f() -> ToolSchema {
    ToolSchema {
        name: CONVERT_C_TO_F.into(),
        description: "Convert a Celsius temperature to Fahrenheit.".into(),
        parameters: vec![ParameterSchema::required("c", "number", "Degrees Celsius")],
        returns: Some("degrees Fahrenheit".into()),
    }
}

pub fn remote_tools() -> Vec<ToolSchema> {
    vec![geocode_location(), get_weather(), convert_c_to_f()]
}

/// Registry with `search_offices` followed by the remote weather tools.
pub fn office_registry(index: Arc<DocumentIndex>, top_k: usize) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register_local(SearchOfficesTool::new(index).with_top_k(top_k));
    for schema in remote_tools() {
        registry.register_remote(schema);
    }
    registry
}
