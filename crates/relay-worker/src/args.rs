//! Positional command-line arguments of a worker process.
//!
//! Layout: `[className, methodName, jsonParameters, retryCount, requestId]`.
//! Only the first two are required; parameters default to an empty array,
//! the retry count to 0, and a missing request id is generated fresh so
//! hand-launched processes still get a correlation id.

use relay_core::RequestId;
use relay_jobs::JobRequest;
use serde_json::Value;
use thiserror::Error;

/// Parsed worker arguments.
#[derive(Debug, Clone)]
pub struct CliArgs {
    pub class_name: String,
    pub method_name: String,
    pub parameters: Vec<Value>,
    pub retry_count: u32,
    pub request_id: RequestId,
}

impl CliArgs {
    /// Converts the arguments into a job request.
    #[must_use]
    pub fn into_request(self) -> JobRequest {
        JobRequest {
            request_id: self.request_id,
            class_name: self.class_name,
            method_name: self.method_name,
            parameters: self.parameters,
            retry_count: self.retry_count,
        }
    }
}

/// Argument parsing errors. All of these are fatal for the process.
#[derive(Debug, Error)]
pub enum ArgsError {
    #[error("Missing argument: {0}")]
    Missing(&'static str),

    #[error("Parameters must be a JSON array: {0}")]
    InvalidParameters(String),

    #[error("Invalid retry count: {0}")]
    InvalidRetryCount(String),

    #[error("Invalid request id: {0}")]
    InvalidRequestId(String),
}

/// Parses the positional arguments, program name already stripped.
pub fn parse(mut args: impl Iterator<Item = String>) -> Result<CliArgs, ArgsError> {
    let class_name = args.next().ok_or(ArgsError::Missing("className"))?;
    let method_name = args.next().ok_or(ArgsError::Missing("methodName"))?;
    let json_parameters = args.next().unwrap_or_else(|| "[]".to_string());

    let retry_count = match args.next() {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| ArgsError::InvalidRetryCount(raw.clone()))?,
        None => 0,
    };

    let request_id = match args.next() {
        Some(raw) => RequestId::parse(&raw)
            .map_err(|_| ArgsError::InvalidRequestId(raw.clone()))?,
        None => RequestId::new(),
    };

    let parameters: Vec<Value> = serde_json::from_str(&json_parameters)
        .map_err(|e| ArgsError::InvalidParameters(e.to_string()))?;

    Ok(CliArgs {
        class_name,
        method_name,
        parameters,
        retry_count,
        request_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn argv(args: &[&str]) -> impl Iterator<Item = String> {
        args.iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_full_argument_list() {
        let request_id = RequestId::new();
        let id_string = request_id.to_string();
        let cli = parse(argv(&[
            "jobs.Report",
            "generate",
            r#"[{"day":7}]"#,
            "2",
            &id_string,
        ]))
        .unwrap();

        assert_eq!(cli.class_name, "jobs.Report");
        assert_eq!(cli.method_name, "generate");
        assert_eq!(cli.parameters, vec![json!({"day": 7})]);
        assert_eq!(cli.retry_count, 2);
        assert_eq!(cli.request_id, request_id);
    }

    #[test]
    fn test_optional_arguments_default() {
        let cli = parse(argv(&["jobs.Report", "generate"])).unwrap();
        assert!(cli.parameters.is_empty());
        assert_eq!(cli.retry_count, 0);
    }

    #[test]
    fn test_missing_class_or_method() {
        assert!(matches!(parse(argv(&[])), Err(ArgsError::Missing(_))));
        assert!(matches!(
            parse(argv(&["jobs.Report"])),
            Err(ArgsError::Missing(_))
        ));
    }

    #[test]
    fn test_parameters_must_be_a_json_array() {
        let err = parse(argv(&["jobs.Report", "generate", r#"{"day":7}"#])).unwrap_err();
        assert!(matches!(err, ArgsError::InvalidParameters(_)));

        let err = parse(argv(&["jobs.Report", "generate", "not json"])).unwrap_err();
        assert!(matches!(err, ArgsError::InvalidParameters(_)));
    }

    #[test]
    fn test_invalid_retry_count() {
        let err = parse(argv(&["jobs.Report", "generate", "[]", "-1"])).unwrap_err();
        assert!(matches!(err, ArgsError::InvalidRetryCount(_)));
    }

    #[test]
    fn test_into_request_preserves_fields() {
        let cli = parse(argv(&["jobs.Report", "generate", "[1,2]", "1"])).unwrap();
        let expected_id = cli.request_id;
        let request = cli.into_request();
        assert_eq!(request.request_id, expected_id);
        assert_eq!(request.retry_count, 1);
        assert_eq!(request.parameters, vec![json!(1), json!(2)]);
    }
}
