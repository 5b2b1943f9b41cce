//! # office-tools
//!
//! The office domain for the agent: a searchable index of office documents
//! exposed as `search_offices`, plus the catalogue of weather tools the
//! tool server provides.
//!
//! ```text
//!   search_offices ──► local DocumentIndex (cosine over term vectors)
//!   geocode_location ┐
//!   get_weather      ├─► tool server session
//!   convert_c_to_f   ┘
//! ```

pub mod error;
pub mod index;
pub mod remote;
pub mod search;

pub use error::{OfficeError, Result};
pub use index::{Chunk, DocumentIndex};
pub use remote::{office_registry, remote_tools};
pub use search::{NO_RESULTS, SearchOfficesTool};

/// Role and purpose, placed before the tool catalogue
pub const OFFICE_AGENT_PROMPT: &str = "You are an office information agent. You answer questions about company
offices by searching a database and looking up live weather data.";

/// Worked examples and rules, placed after the response format
pub const OFFICE_AGENT_GUIDELINES: &str = r#"Examples:

User: What is the weather at our HQ?
Thought: I need to find the HQ address first
Action: search_offices
Args: {"query": "HQ headquarters address"}

Observation: HQ: 100 Main Street, New York. 1,200 employees.
Thought: HQ is in New York, I need its coordinates
Action: geocode_location
Args: {"name": "New York"}

Observation: {"name":"New York","lat":40.71,"lon":-74.01}
Thought: Now I can get the weather
Action: get_weather
Args: {"lat": 40.71, "lon": -74.01}

Observation: {"conditions":"Clear","temp_c":15}
Thought: The user will want Fahrenheit too
Action: convert_c_to_f
Args: {"c": 15}

Rules:
- Exactly one Action per reply, followed by its Args on the next line.
- Args must be a valid JSON object. Use {} when a tool takes no arguments.
- Never invent office data, coordinates or temperatures. Only use what an Observation told you.
- Use the tools in order: search_offices, then geocode_location, then get_weather, then convert_c_to_f.
- Only call the weather tools when the question needs weather.
- If a tool returns an Error, adjust the arguments or explain the problem in your Answer.
- Only answer questions about office locations and weather."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guidelines_mention_every_tool() {
        for name in ["search_offices", "geocode_location", "get_weather", "convert_c_to_f"] {
            assert!(OFFICE_AGENT_GUIDELINES.contains(name), "{name} missing");
        }
    }

    #[test]
    fn test_guidelines_do_not_trip_guard() {
        let guard = agent_core::GuardFilter::default();
        assert!(guard.check_input(OFFICE_AGENT_PROMPT).clean);
        assert!(guard.check_input(OFFICE_AGENT_GUIDELINES).clean);
    }
}
