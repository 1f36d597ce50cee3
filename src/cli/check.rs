//! Run calculator scripts from the command line

use std::{path::PathBuf, rc::Rc};

use super::{CliError, catalog};
use crate::{
    Environment, HostConfig, evaluate_program, parse_source,
    output::{to_json, to_json_pretty},
    value::Value,
};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The script to run
    pub script: String,
    /// JSON object whose fields are bound as variables
    pub bindings: Option<String>,
    /// JSON Lines catalog backing the host built-ins
    pub catalog: Option<PathBuf>,
    /// Prefix for `/`-relative thumbnails
    pub thumbnail_base: Option<String>,
    /// Where `download(...)` writes files
    pub download_dir: Option<PathBuf>,
    /// Print results as JSON, pretty-printed
    pub pretty: bool,
    /// Only report parse errors, don't evaluate
    pub syntax_only: bool,
    /// Print the parsed program instead of evaluating it
    pub print_ast: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// The script parsed without errors
    SyntaxValid,
    /// The parsed program, rendered as source
    Ast(String),
    /// The script's value, rendered for display
    Success(String),
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let program = parse_source(&options.script);

    if options.syntax_only {
        let errors = program.errors();
        return if errors.is_empty() {
            Ok(CheckResult::SyntaxValid)
        } else {
            Err(CliError::Syntax(
                errors.into_iter().map(str::to_string).collect(),
            ))
        };
    }

    if options.print_ast {
        return Ok(CheckResult::Ast(program.to_string()));
    }

    let mut env = match &options.catalog {
        Some(path) => {
            let mut host = catalog::load(path)?;
            if let Some(dir) = &options.download_dir {
                host = host.with_download_dir(dir);
            }
            let mut config = HostConfig::new(Rc::new(host));
            config.thumbnail_base = options.thumbnail_base.clone();
            Environment::with_host(config)
        }
        None => Environment::new(),
    };

    if let Some(bindings) = &options.bindings {
        let json: serde_json::Value = serde_json::from_str(bindings)?;
        let object = json.as_object().ok_or(CliError::BindingsNotObject)?;
        env.bind_json_object(object);
    }

    let value = evaluate_program(&program, &mut env);
    Ok(CheckResult::Success(render(&value, options.pretty)))
}

/// Strings print bare; other values print as JSON when `pretty` is set and
/// in their string form otherwise.
fn render(value: &Value, pretty: bool) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(_) | Value::Function(_) | Value::Code(_) | Value::Element(_) => {
            value.to_string()
        }
        _ if pretty => to_json_pretty(value),
        _ => to_json(value),
    }
}
