use crate::error::UpdateError;

/// Coerce a command-line argument into an integer.
///
/// Surrounding whitespace and a single leading sign are tolerated.
pub fn parse_integer(field: &'static str, raw: &str) -> Result<i64, UpdateError> {
    raw.trim().parse::<i64>().map_err(|_| UpdateError::InvalidArgument {
        field,
        value: raw.to_owned(),
    })
}

/// Render a human-friendly byte count.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;

    let value = bytes as f64;
    if value < KIB {
        format!("{bytes} B")
    } else if value < MIB {
        format!("{:.1} KB", value / KIB)
    } else {
        format!("{:.1} MB", value / MIB)
    }
}
