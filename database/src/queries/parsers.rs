//! Parser and parsing template queries
//!
//! Parsers and templates belong to a gateway; removal is refused when the
//! caller's gateway does not own the row.

use appcatalog_core::{
    ensure_id, Error, Parser, ParserConnector, ParserConnectorInput, ParserInput, ParserOutput,
    ParsingTemplate, ParsingTemplateInput, Result,
};
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{error, info, instrument};

use super::DbResultExt;
use crate::models::{
    ParserConnectorInputRow, ParserConnectorRow, ParserInputRow, ParserOutputRow, ParserRow,
    ParsingTemplateInputRow, ParsingTemplateRow,
};

fn not_owned(entity: &str, id: &str, gateway_id: &str) -> Error {
    error!(entity, id, gateway_id, "Refused to remove entity owned by another gateway");
    Error::AppCatalogError(format!(
        "{} {} does not belong to gateway {}",
        entity, id, gateway_id
    ))
}

async fn upsert_parser_input(conn: &mut SqliteConnection, parser_id: &str, input: &ParserInput) -> Result<String> {
    let id = ensure_id(&input.id, &input.name);
    sqlx::query(
        r#"
        INSERT INTO parser_inputs (parser_input_id, parser_id, name, required_input, io_type)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(parser_input_id) DO UPDATE SET
            parser_id = excluded.parser_id,
            name = excluded.name,
            required_input = excluded.required_input,
            io_type = excluded.io_type
        "#,
    )
    .bind(&id)
    .bind(parser_id)
    .bind(&input.name)
    .bind(input.required_input)
    .bind(input.io_type.as_str())
    .execute(&mut *conn)
    .await
    .db_context("Failed to save parser input")?;
    Ok(id)
}

async fn upsert_parser_output(
    conn: &mut SqliteConnection,
    parser_id: &str,
    output: &ParserOutput,
) -> Result<String> {
    let id = ensure_id(&output.id, &output.name);
    sqlx::query(
        r#"
        INSERT INTO parser_outputs (parser_output_id, parser_id, name, required_output, io_type)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(parser_output_id) DO UPDATE SET
            parser_id = excluded.parser_id,
            name = excluded.name,
            required_output = excluded.required_output,
            io_type = excluded.io_type
        "#,
    )
    .bind(&id)
    .bind(parser_id)
    .bind(&output.name)
    .bind(output.required_output)
    .bind(output.io_type.as_str())
    .execute(&mut *conn)
    .await
    .db_context("Failed to save parser output")?;
    Ok(id)
}

/// Insert or update a parser and replace its input and output files
#[instrument(skip(pool, parser), fields(image = %parser.image_name, gateway_id = %parser.gateway_id))]
pub async fn save_parser(pool: &Pool<Sqlite>, parser: &Parser) -> Result<String> {
    let id = ensure_id(&parser.id, "Parser");

    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    sqlx::query(
        r#"
        INSERT INTO parsers (
            parser_id, image_name, output_dir_path, input_dir_path, execution_command, gateway_id
        )
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(parser_id) DO UPDATE SET
            image_name = excluded.image_name,
            output_dir_path = excluded.output_dir_path,
            input_dir_path = excluded.input_dir_path,
            execution_command = excluded.execution_command,
            gateway_id = excluded.gateway_id
        "#,
    )
    .bind(&id)
    .bind(&parser.image_name)
    .bind(&parser.output_dir_path)
    .bind(&parser.input_dir_path)
    .bind(&parser.execution_command)
    .bind(&parser.gateway_id)
    .execute(&mut *tx)
    .await
    .db_context("Failed to save parser")?;

    for table in ["parser_inputs", "parser_outputs"] {
        sqlx::query(&format!("DELETE FROM {} WHERE parser_id = ?", table))
            .bind(&id)
            .execute(&mut *tx)
            .await
            .db_context("Failed to clear parser files")?;
    }
    for input in &parser.input_files {
        upsert_parser_input(&mut tx, &id, input).await?;
    }
    for output in &parser.output_files {
        upsert_parser_output(&mut tx, &id, output).await?;
    }
    tx.commit().await.db_context("Failed to commit parser")?;

    info!(parser_id = %id, "Parser saved");
    Ok(id)
}

#[instrument(skip(pool))]
pub async fn get_parser(pool: &Pool<Sqlite>, id: &str) -> Result<Parser> {
    let row = sqlx::query_as::<_, ParserRow>(
        r#"
        SELECT parser_id, image_name, output_dir_path, input_dir_path, execution_command, gateway_id
        FROM parsers
        WHERE parser_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get parser")?
    .ok_or_else(|| Error::not_found("Parser", id))?;

    let input_files = sqlx::query_as::<_, ParserInputRow>(
        r#"
        SELECT parser_input_id, parser_id, name, required_input, io_type
        FROM parser_inputs
        WHERE parser_id = ?
        ORDER BY name
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get parser inputs")?
    .into_iter()
    .map(ParserInputRow::into_input)
    .collect::<Result<Vec<_>>>()?;

    let output_files = sqlx::query_as::<_, ParserOutputRow>(
        r#"
        SELECT parser_output_id, parser_id, name, required_output, io_type
        FROM parser_outputs
        WHERE parser_id = ?
        ORDER BY name
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get parser outputs")?
    .into_iter()
    .map(ParserOutputRow::into_output)
    .collect::<Result<Vec<_>>>()?;

    Ok(Parser {
        id: row.parser_id,
        image_name: row.image_name,
        output_dir_path: row.output_dir_path,
        input_dir_path: row.input_dir_path,
        execution_command: row.execution_command,
        input_files,
        output_files,
        gateway_id: row.gateway_id,
    })
}

#[instrument(skip(pool))]
pub async fn list_all_parsers(pool: &Pool<Sqlite>, gateway_id: &str) -> Result<Vec<Parser>> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT parser_id FROM parsers WHERE gateway_id = ? ORDER BY parser_id")
        .bind(gateway_id)
        .fetch_all(pool)
        .await
        .db_context("Failed to list parsers")?;

    let mut parsers = Vec::with_capacity(ids.len());
    for id in ids {
        parsers.push(get_parser(pool, &id).await?);
    }
    Ok(parsers)
}

async fn parser_gateway(pool: &Pool<Sqlite>, parser_id: &str) -> Result<Option<String>> {
    sqlx::query_scalar("SELECT gateway_id FROM parsers WHERE parser_id = ?")
        .bind(parser_id)
        .fetch_optional(pool)
        .await
        .db_context("Failed to get parser gateway")
}

/// Delete a parser the gateway owns; its files and connectors go with it
#[instrument(skip(pool))]
pub async fn remove_parser(pool: &Pool<Sqlite>, id: &str, gateway_id: &str) -> Result<()> {
    match parser_gateway(pool, id).await? {
        None => return Err(Error::not_found("Parser", id)),
        Some(owner) if owner != gateway_id => return Err(not_owned("Parser", id, gateway_id)),
        Some(_) => {}
    }

    sqlx::query("DELETE FROM parsers WHERE parser_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .db_context("Failed to delete parser")?;
    info!(parser_id = %id, "Parser removed");
    Ok(())
}

/// Insert or update one parser input; the parser must exist
#[instrument(skip(pool, input), fields(parser_id = %input.parser_id))]
pub async fn save_parser_input(pool: &Pool<Sqlite>, input: &ParserInput) -> Result<String> {
    if parser_gateway(pool, &input.parser_id).await?.is_none() {
        return Err(Error::not_found("Parser", &input.parser_id));
    }
    let mut conn = pool.acquire().await.db_context("Failed to acquire connection")?;
    upsert_parser_input(&mut conn, &input.parser_id, input).await
}

#[instrument(skip(pool))]
pub async fn get_parser_input(pool: &Pool<Sqlite>, id: &str) -> Result<ParserInput> {
    sqlx::query_as::<_, ParserInputRow>(
        "SELECT parser_input_id, parser_id, name, required_input, io_type FROM parser_inputs WHERE parser_input_id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get parser input")?
    .ok_or_else(|| Error::not_found("Parser input", id))?
    .into_input()
}

#[instrument(skip(pool))]
pub async fn remove_parser_input(pool: &Pool<Sqlite>, id: &str, gateway_id: &str) -> Result<()> {
    let input = get_parser_input(pool, id).await?;
    if parser_gateway(pool, &input.parser_id).await?.as_deref() != Some(gateway_id) {
        return Err(not_owned("Parser input", id, gateway_id));
    }
    sqlx::query("DELETE FROM parser_inputs WHERE parser_input_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .db_context("Failed to delete parser input")?;
    Ok(())
}

/// Insert or update one parser output; the parser must exist
#[instrument(skip(pool, output), fields(parser_id = %output.parser_id))]
pub async fn save_parser_output(pool: &Pool<Sqlite>, output: &ParserOutput) -> Result<String> {
    if parser_gateway(pool, &output.parser_id).await?.is_none() {
        return Err(Error::not_found("Parser", &output.parser_id));
    }
    let mut conn = pool.acquire().await.db_context("Failed to acquire connection")?;
    upsert_parser_output(&mut conn, &output.parser_id, output).await
}

#[instrument(skip(pool))]
pub async fn get_parser_output(pool: &Pool<Sqlite>, id: &str) -> Result<ParserOutput> {
    sqlx::query_as::<_, ParserOutputRow>(
        "SELECT parser_output_id, parser_id, name, required_output, io_type FROM parser_outputs WHERE parser_output_id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get parser output")?
    .ok_or_else(|| Error::not_found("Parser output", id))?
    .into_output()
}

#[instrument(skip(pool))]
pub async fn remove_parser_output(pool: &Pool<Sqlite>, id: &str, gateway_id: &str) -> Result<()> {
    let output = get_parser_output(pool, id).await?;
    if parser_gateway(pool, &output.parser_id).await?.as_deref() != Some(gateway_id) {
        return Err(not_owned("Parser output", id, gateway_id));
    }
    sqlx::query("DELETE FROM parser_outputs WHERE parser_output_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .db_context("Failed to delete parser output")?;
    Ok(())
}

async fn insert_connector(
    conn: &mut SqliteConnection,
    template_id: &str,
    connector: &ParserConnector,
) -> Result<()> {
    let connector_id = ensure_id(&connector.id, "Parser_Connector");
    sqlx::query(
        r#"
        INSERT INTO parser_connectors (
            parser_connector_id, parsing_template_id, parent_parser_id, child_parser_id
        )
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&connector_id)
    .bind(template_id)
    .bind(&connector.parent_parser_id)
    .bind(&connector.child_parser_id)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save parser connector")?;

    for input in &connector.connector_inputs {
        sqlx::query(
            r#"
            INSERT INTO parser_connector_inputs (
                parser_connector_input_id, parser_connector_id, input_id, parent_output_id, value
            )
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(ensure_id(&input.id, "Parser_Connector_Input"))
        .bind(&connector_id)
        .bind(&input.input_id)
        .bind(&input.parent_output_id)
        .bind(&input.value)
        .execute(&mut *conn)
        .await
        .db_context("Failed to save parser connector input")?;
    }
    Ok(())
}

/// Insert or update a template and replace its initial inputs and connectors
#[instrument(skip(pool, template), fields(interface = %template.application_interface))]
pub async fn save_parsing_template(pool: &Pool<Sqlite>, template: &ParsingTemplate) -> Result<String> {
    let id = ensure_id(&template.id, "Parsing_Template");

    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    sqlx::query(
        r#"
        INSERT INTO parsing_templates (parsing_template_id, application_interface_id, gateway_id)
        VALUES (?, ?, ?)
        ON CONFLICT(parsing_template_id) DO UPDATE SET
            application_interface_id = excluded.application_interface_id,
            gateway_id = excluded.gateway_id
        "#,
    )
    .bind(&id)
    .bind(&template.application_interface)
    .bind(&template.gateway_id)
    .execute(&mut *tx)
    .await
    .db_context("Failed to save parsing template")?;

    for table in ["parsing_template_inputs", "parser_connectors"] {
        sqlx::query(&format!("DELETE FROM {} WHERE parsing_template_id = ?", table))
            .bind(&id)
            .execute(&mut *tx)
            .await
            .db_context("Failed to clear parsing template children")?;
    }

    for input in &template.initial_inputs {
        sqlx::query(
            r#"
            INSERT INTO parsing_template_inputs (
                parsing_template_input_id, parsing_template_id, target_input_id,
                application_output_name, value
            )
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(ensure_id(&input.id, "Parsing_Template_Input"))
        .bind(&id)
        .bind(&input.target_input_id)
        .bind(&input.application_output_name)
        .bind(&input.value)
        .execute(&mut *tx)
        .await
        .db_context("Failed to save parsing template input")?;
    }
    for connector in &template.parser_connections {
        insert_connector(&mut tx, &id, connector).await?;
    }
    tx.commit().await.db_context("Failed to commit parsing template")?;

    info!(parsing_template_id = %id, "Parsing template saved");
    Ok(id)
}

#[instrument(skip(pool))]
pub async fn get_parsing_template(pool: &Pool<Sqlite>, id: &str) -> Result<ParsingTemplate> {
    let row = sqlx::query_as::<_, ParsingTemplateRow>(
        "SELECT parsing_template_id, application_interface_id, gateway_id FROM parsing_templates WHERE parsing_template_id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get parsing template")?
    .ok_or_else(|| Error::not_found("Parsing template", id))?;

    let initial_inputs = sqlx::query_as::<_, ParsingTemplateInputRow>(
        r#"
        SELECT parsing_template_input_id, parsing_template_id, target_input_id,
               application_output_name, value
        FROM parsing_template_inputs
        WHERE parsing_template_id = ?
        ORDER BY parsing_template_input_id
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get parsing template inputs")?
    .into_iter()
    .map(ParsingTemplateInput::from)
    .collect();

    let connector_rows = sqlx::query_as::<_, ParserConnectorRow>(
        r#"
        SELECT parser_connector_id, parsing_template_id, parent_parser_id, child_parser_id
        FROM parser_connectors
        WHERE parsing_template_id = ?
        ORDER BY parser_connector_id
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get parser connectors")?;

    let mut parser_connections = Vec::with_capacity(connector_rows.len());
    for connector in connector_rows {
        let connector_inputs = sqlx::query_as::<_, ParserConnectorInputRow>(
            r#"
            SELECT parser_connector_input_id, parser_connector_id, input_id, parent_output_id, value
            FROM parser_connector_inputs
            WHERE parser_connector_id = ?
            ORDER BY parser_connector_input_id
            "#,
        )
        .bind(&connector.parser_connector_id)
        .fetch_all(pool)
        .await
        .db_context("Failed to get parser connector inputs")?
        .into_iter()
        .map(|input| ParserConnectorInput {
            id: input.parser_connector_input_id,
            input_id: input.input_id,
            parent_output_id: input.parent_output_id,
            value: input.value,
            parser_connector_id: input.parser_connector_id,
        })
        .collect();

        parser_connections.push(ParserConnector {
            id: connector.parser_connector_id,
            parent_parser_id: connector.parent_parser_id,
            child_parser_id: connector.child_parser_id,
            connector_inputs,
            parsing_template_id: connector.parsing_template_id,
        });
    }

    Ok(ParsingTemplate {
        id: row.parsing_template_id,
        application_interface: row.application_interface_id,
        initial_inputs,
        parser_connections,
        gateway_id: row.gateway_id,
    })
}

async fn get_templates_where(pool: &Pool<Sqlite>, column: &str, value: &str) -> Result<Vec<ParsingTemplate>> {
    let ids: Vec<String> = sqlx::query_scalar(&format!(
        "SELECT parsing_template_id FROM parsing_templates WHERE {} = ? ORDER BY parsing_template_id",
        column
    ))
    .bind(value)
    .fetch_all(pool)
    .await
    .db_context("Failed to list parsing templates")?;

    let mut templates = Vec::with_capacity(ids.len());
    for id in ids {
        templates.push(get_parsing_template(pool, &id).await?);
    }
    Ok(templates)
}

#[instrument(skip(pool))]
pub async fn get_parsing_templates_for_application(
    pool: &Pool<Sqlite>,
    application_interface_id: &str,
) -> Result<Vec<ParsingTemplate>> {
    get_templates_where(pool, "application_interface_id", application_interface_id).await
}

#[instrument(skip(pool))]
pub async fn list_all_parsing_templates(pool: &Pool<Sqlite>, gateway_id: &str) -> Result<Vec<ParsingTemplate>> {
    get_templates_where(pool, "gateway_id", gateway_id).await
}

#[instrument(skip(pool))]
pub async fn remove_parsing_template(pool: &Pool<Sqlite>, id: &str, gateway_id: &str) -> Result<()> {
    let owner: Option<String> =
        sqlx::query_scalar("SELECT gateway_id FROM parsing_templates WHERE parsing_template_id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
            .db_context("Failed to get parsing template gateway")?;
    match owner {
        None => return Err(Error::not_found("Parsing template", id)),
        Some(owner) if owner != gateway_id => {
            return Err(not_owned("Parsing template", id, gateway_id));
        }
        Some(_) => {}
    }

    sqlx::query("DELETE FROM parsing_templates WHERE parsing_template_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .db_context("Failed to delete parsing template")?;
    info!(parsing_template_id = %id, "Parsing template removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;
    use appcatalog_core::{IoType, DEFAULT_ID};

    const GATEWAY: &str = "seagrid";

    fn parser(image: &str) -> Parser {
        Parser {
            id: DEFAULT_ID.to_string(),
            image_name: image.to_string(),
            output_dir_path: "/output".to_string(),
            input_dir_path: "/input".to_string(),
            execution_command: "python parse.py".to_string(),
            input_files: vec![ParserInput {
                id: DEFAULT_ID.to_string(),
                name: "log".to_string(),
                required_input: true,
                parser_id: String::new(),
                io_type: IoType::File,
            }],
            output_files: vec![ParserOutput {
                id: DEFAULT_ID.to_string(),
                name: "energy".to_string(),
                required_output: false,
                parser_id: String::new(),
                io_type: IoType::Property,
            }],
            gateway_id: GATEWAY.to_string(),
        }
    }

    #[tokio::test]
    async fn test_parser_round_trip_and_update() {
        let pool = test_pool().await;
        let id = save_parser(&pool, &parser("gaussian-parser")).await.unwrap();

        let stored = get_parser(&pool, &id).await.unwrap();
        assert_eq!(stored.image_name, "gaussian-parser");
        assert_eq!(stored.input_files.len(), 1);
        assert_eq!(stored.input_files[0].parser_id, id);
        assert_eq!(stored.output_files[0].io_type, IoType::Property);

        let mut changed = stored.clone();
        changed.execution_command = "python parse.py --json".to_string();
        changed.output_files.clear();
        save_parser(&pool, &changed).await.unwrap();

        let stored = get_parser(&pool, &id).await.unwrap();
        assert_eq!(stored.execution_command, "python parse.py --json");
        assert!(stored.output_files.is_empty());
        assert_eq!(list_all_parsers(&pool, GATEWAY).await.unwrap().len(), 1);
        assert!(list_all_parsers(&pool, "other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_removal_checks_gateway() {
        let pool = test_pool().await;
        let id = save_parser(&pool, &parser("gaussian-parser")).await.unwrap();
        let input_id = get_parser(&pool, &id).await.unwrap().input_files[0].id.clone();

        let err = remove_parser_input(&pool, &input_id, "other").await.unwrap_err();
        assert!(matches!(err, Error::AppCatalogError(_)));
        remove_parser_input(&pool, &input_id, GATEWAY).await.unwrap();
        assert!(get_parser_input(&pool, &input_id).await.unwrap_err().is_not_found());

        let err = remove_parser(&pool, &id, "other").await.unwrap_err();
        assert!(matches!(err, Error::AppCatalogError(_)));
        remove_parser(&pool, &id, GATEWAY).await.unwrap();
        assert!(get_parser(&pool, &id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_single_files() {
        let pool = test_pool().await;
        let id = save_parser(&pool, &parser("gaussian-parser")).await.unwrap();

        let output_id = save_parser_output(
            &pool,
            &ParserOutput {
                id: "homo-lumo".to_string(),
                name: "gap".to_string(),
                required_output: true,
                parser_id: id.clone(),
                io_type: IoType::Property,
            },
        )
        .await
        .unwrap();
        assert_eq!(output_id, "homo-lumo");
        assert!(get_parser_output(&pool, &output_id).await.unwrap().required_output);
        remove_parser_output(&pool, &output_id, GATEWAY).await.unwrap();

        let err = save_parser_input(
            &pool,
            &ParserInput {
                id: DEFAULT_ID.to_string(),
                name: "orphan".to_string(),
                required_input: false,
                parser_id: "missing".to_string(),
                io_type: IoType::File,
            },
        )
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_parsing_template_lifecycle() {
        let pool = test_pool().await;
        let first = save_parser(&pool, &parser("gaussian-parser")).await.unwrap();
        let second = save_parser(&pool, &parser("energy-plotter")).await.unwrap();

        let template = ParsingTemplate {
            id: DEFAULT_ID.to_string(),
            application_interface: "Gaussian_interface".to_string(),
            initial_inputs: vec![ParsingTemplateInput {
                id: DEFAULT_ID.to_string(),
                target_input_id: "log".to_string(),
                application_output_name: Some("Gaussian-Application-Output".to_string()),
                value: None,
                parsing_template_id: String::new(),
            }],
            parser_connections: vec![ParserConnector {
                id: DEFAULT_ID.to_string(),
                parent_parser_id: first.clone(),
                child_parser_id: second.clone(),
                connector_inputs: vec![ParserConnectorInput {
                    id: DEFAULT_ID.to_string(),
                    input_id: "energies".to_string(),
                    parent_output_id: Some("energy".to_string()),
                    value: None,
                    parser_connector_id: String::new(),
                }],
                parsing_template_id: String::new(),
            }],
            gateway_id: GATEWAY.to_string(),
        };

        let id = save_parsing_template(&pool, &template).await.unwrap();
        let stored = get_parsing_template(&pool, &id).await.unwrap();
        assert_eq!(stored.initial_inputs.len(), 1);
        assert_eq!(stored.initial_inputs[0].parsing_template_id, id);
        assert_eq!(stored.parser_ids(), vec![first.as_str(), second.as_str()]);
        assert_eq!(stored.parser_connections[0].connector_inputs.len(), 1);

        let mut changed = stored.clone();
        changed.parser_connections.clear();
        save_parsing_template(&pool, &changed).await.unwrap();
        assert!(get_parsing_template(&pool, &id)
            .await
            .unwrap()
            .parser_connections
            .is_empty());

        assert_eq!(
            get_parsing_templates_for_application(&pool, "Gaussian_interface")
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(list_all_parsing_templates(&pool, GATEWAY).await.unwrap().len(), 1);

        assert!(remove_parsing_template(&pool, &id, "other").await.is_err());
        remove_parsing_template(&pool, &id, GATEWAY).await.unwrap();
        assert!(get_parsing_template(&pool, &id).await.unwrap_err().is_not_found());
    }
}
