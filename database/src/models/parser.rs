use appcatalog_core::{ParserInput, ParserOutput, ParsingTemplateInput, Result};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ParserRow {
    pub parser_id: String,
    pub image_name: String,
    pub output_dir_path: String,
    pub input_dir_path: String,
    pub execution_command: String,
    pub gateway_id: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ParserInputRow {
    pub parser_input_id: String,
    pub parser_id: String,
    pub name: String,
    pub required_input: bool,
    pub io_type: String,
}

impl ParserInputRow {
    pub fn into_input(self) -> Result<ParserInput> {
        Ok(ParserInput {
            id: self.parser_input_id,
            name: self.name,
            required_input: self.required_input,
            parser_id: self.parser_id,
            io_type: self.io_type.parse()?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ParserOutputRow {
    pub parser_output_id: String,
    pub parser_id: String,
    pub name: String,
    pub required_output: bool,
    pub io_type: String,
}

impl ParserOutputRow {
    pub fn into_output(self) -> Result<ParserOutput> {
        Ok(ParserOutput {
            id: self.parser_output_id,
            name: self.name,
            required_output: self.required_output,
            parser_id: self.parser_id,
            io_type: self.io_type.parse()?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ParsingTemplateRow {
    pub parsing_template_id: String,
    pub application_interface_id: String,
    pub gateway_id: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ParsingTemplateInputRow {
    pub parsing_template_input_id: String,
    pub parsing_template_id: String,
    pub target_input_id: String,
    pub application_output_name: Option<String>,
    pub value: Option<String>,
}

impl From<ParsingTemplateInputRow> for ParsingTemplateInput {
    fn from(row: ParsingTemplateInputRow) -> Self {
        ParsingTemplateInput {
            id: row.parsing_template_input_id,
            target_input_id: row.target_input_id,
            application_output_name: row.application_output_name,
            value: row.value,
            parsing_template_id: row.parsing_template_id,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ParserConnectorRow {
    pub parser_connector_id: String,
    pub parsing_template_id: String,
    pub parent_parser_id: String,
    pub child_parser_id: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ParserConnectorInputRow {
    pub parser_connector_input_id: String,
    pub parser_connector_id: String,
    pub input_id: String,
    pub parent_output_id: Option<String>,
    pub value: Option<String>,
}
