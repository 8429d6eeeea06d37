//! Parsing of visualization requests.
//!
//! Clients post a single form field, `arguments`, holding a command line
//! such as `--type roc_curve --arguments '{"source": "data.csv"}'`. It is
//! split with shell quoting rules and then parsed like CLI flags.

use clap::Parser;
use vizier_core::ParameterSet;

use crate::error::{ServerError, ServerResult};

/// Flags accepted in the `arguments` form field.
#[derive(Debug, Parser)]
#[command(name = "visualization", no_binary_name = true, disable_help_flag = true)]
pub struct VisualizationArgs {
    /// Type of visualization to be generated
    #[arg(long = "type", default_value = "roc_curve")]
    pub kind: String,

    /// JSON object of arguments provided to the visualization
    #[arg(long, default_value = "{}")]
    pub arguments: String,

    /// Input path, made available to the script as `input_path`
    #[arg(long)]
    pub input_path: Option<String>,
}

/// A parsed request: which script to run and with which parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationRequest {
    pub kind: String,
    pub params: ParameterSet,
}

impl VisualizationRequest {
    /// Parse the raw `arguments` form field.
    pub fn parse(raw: &str) -> ServerResult<Self> {
        let words = split_shell_words(raw)?;
        let args = VisualizationArgs::try_parse_from(words)
            .map_err(|e| ServerError::BadRequest(e.render().to_string().trim().to_string()))?;

        let mut params = ParameterSet::from_json(&args.arguments)
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;
        if let Some(input_path) = args.input_path {
            params.insert("input_path", input_path);
        }

        Ok(Self {
            kind: args.kind,
            params,
        })
    }
}

/// Split a command line into words using POSIX shell quoting.
///
/// Single quotes are literal, double quotes allow backslash escapes of
/// `"`, `\`, `$` and `` ` ``, and a bare backslash escapes the next
/// character.
pub fn split_shell_words(line: &str) -> ServerResult<Vec<String>> {
    enum Quote {
        None,
        Single,
        Double,
    }

    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote = Quote::None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match quote {
            Quote::Single => match c {
                '\'' => quote = Quote::None,
                _ => word.push(c),
            },
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' => match chars.next() {
                    Some(next @ ('"' | '\\' | '$' | '`')) => word.push(next),
                    Some('\n') => {}
                    Some(next) => {
                        word.push('\\');
                        word.push(next);
                    }
                    None => return Err(unterminated()),
                },
                _ => word.push(c),
            },
            Quote::None => match c {
                '\'' => {
                    quote = Quote::Single;
                    in_word = true;
                }
                '"' => {
                    quote = Quote::Double;
                    in_word = true;
                }
                '\\' => match chars.next() {
                    Some('\n') => {}
                    Some(next) => {
                        word.push(next);
                        in_word = true;
                    }
                    None => return Err(ServerError::BadRequest("trailing backslash in arguments".to_string())),
                },
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut word));
                        in_word = false;
                    }
                }
                _ => {
                    word.push(c);
                    in_word = true;
                }
            },
        }
    }

    if !matches!(quote, Quote::None) {
        return Err(unterminated());
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

fn unterminated() -> ServerError {
    ServerError::BadRequest("unterminated quote in arguments".to_string())
}
