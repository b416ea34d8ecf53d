use std::io::Write;

use crate::cli::CliError;
use crate::config::WatchConfig;
use crate::crypt::{Decryptor, SodiumDecryptor};

const VALUE_OPTION: &str = "value";

/// Print the plaintext of `value`
pub fn run(config: &WatchConfig, value: Option<&str>, out: &mut dyn Write) -> Result<(), CliError> {
    let value = value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CliError::Usage(VALUE_OPTION.to_string()))?;

    let key = config.crypt_key().ok_or(CliError::MissingKey)?;
    let plaintext = SodiumDecryptor::new(&key).decrypt(value)?;

    writeln!(out, "{}", plaintext)?;
    Ok(())
}
