use std::fmt;

#[derive(Debug)]
pub struct CliError(pub String);

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CliError {}

impl From<toml::de::Error> for CliError {
    fn from(e: toml::de::Error) -> Self {
        CliError(format!("config error: {e}"))
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_errors_are_labelled() {
        let err: CliError = toml::from_str::<toml::Value>("not = = toml")
            .unwrap_err()
            .into();
        assert!(err.0.contains("config error"), "{}", err.0);
    }
}
