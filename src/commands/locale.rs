use anyhow::Result;
use regex::Regex;

/// Normalize `en-US` or `en_US` to the Mix form `en_US`.
pub fn to_mix_locale(raw: &str) -> Result<String> {
    let pattern = Regex::new(r"^([a-z]{2})[_-]([A-Z]{2})$")?;

    let captures = pattern
        .captures(raw.trim())
        .ok_or_else(|| anyhow::anyhow!("Invalid locale '{}', expected a form like en_US or en-US", raw))?;
    Ok(format!("{}_{}", &captures[1], &captures[2]))
}
