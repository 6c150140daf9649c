//! Output parsers and parsing templates
//!
//! A parser is a container image that post-processes application output
//! files. A parsing template chains parsers for one application interface.

use serde::{Deserialize, Serialize};

use crate::ids::DEFAULT_ID;

string_enum! {
    /// Whether a parser endpoint is a file or a scalar property
    IoType {
        File => "FILE",
        Property => "PROPERTY",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserInput {
    #[serde(default = "default_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub required_input: bool,
    #[serde(default)]
    pub parser_id: String,
    #[serde(rename = "type", default = "default_io_type")]
    pub io_type: IoType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserOutput {
    #[serde(default = "default_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub required_output: bool,
    #[serde(default)]
    pub parser_id: String,
    #[serde(rename = "type", default = "default_io_type")]
    pub io_type: IoType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parser {
    #[serde(default = "default_id")]
    pub id: String,
    pub image_name: String,
    pub output_dir_path: String,
    pub input_dir_path: String,
    pub execution_command: String,
    #[serde(default)]
    pub input_files: Vec<ParserInput>,
    #[serde(default)]
    pub output_files: Vec<ParserOutput>,
    pub gateway_id: String,
}

/// Seed value for one parser input when a template starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingTemplateInput {
    #[serde(default = "default_id")]
    pub id: String,
    pub target_input_id: String,
    #[serde(default)]
    pub application_output_name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub parsing_template_id: String,
}

/// Wires one parser output into another parser's input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserConnectorInput {
    #[serde(default = "default_id")]
    pub id: String,
    pub input_id: String,
    #[serde(default)]
    pub parent_output_id: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub parser_connector_id: String,
}

/// Edge between a parent and a child parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserConnector {
    #[serde(default = "default_id")]
    pub id: String,
    pub parent_parser_id: String,
    pub child_parser_id: String,
    #[serde(default)]
    pub connector_inputs: Vec<ParserConnectorInput>,
    #[serde(default)]
    pub parsing_template_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingTemplate {
    #[serde(default = "default_id")]
    pub id: String,
    pub application_interface: String,
    #[serde(default)]
    pub initial_inputs: Vec<ParsingTemplateInput>,
    #[serde(default)]
    pub parser_connections: Vec<ParserConnector>,
    pub gateway_id: String,
}

impl ParsingTemplate {
    /// Parsers referenced by this template, parents before children where possible
    pub fn parser_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for conn in &self.parser_connections {
            for id in [conn.parent_parser_id.as_str(), conn.child_parser_id.as_str()] {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }
}

fn default_id() -> String {
    DEFAULT_ID.to_string()
}

fn default_io_type() -> IoType {
    IoType::File
}
