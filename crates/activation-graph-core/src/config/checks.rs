//! Small range checks shared by the section validators.

pub(super) fn finite(name: &str, value: f64) -> Result<(), String> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(format!("{} must be finite, got {}", name, value))
    }
}

/// Closed interval check.
pub(super) fn in_range(name: &str, value: f64, lo: f64, hi: f64) -> Result<(), String> {
    finite(name, value)?;
    if value < lo || value > hi {
        return Err(format!("{} must be in [{}, {}], got {}", name, lo, hi, value));
    }
    Ok(())
}

pub(super) fn positive(name: &str, value: f64) -> Result<(), String> {
    finite(name, value)?;
    if value <= 0.0 {
        return Err(format!("{} must be > 0, got {}", name, value));
    }
    Ok(())
}

pub(super) fn non_negative(name: &str, value: f64) -> Result<(), String> {
    finite(name, value)?;
    if value < 0.0 {
        return Err(format!("{} must be >= 0, got {}", name, value));
    }
    Ok(())
}

pub(super) fn non_zero(name: &str, value: u64) -> Result<(), String> {
    if value == 0 {
        return Err(format!("{} must be > 0", name));
    }
    Ok(())
}

pub(super) fn ordered(lo_name: &str, lo: f64, hi_name: &str, hi: f64) -> Result<(), String> {
    if lo > hi {
        return Err(format!(
            "{} ({}) must not exceed {} ({})",
            lo_name, lo, hi_name, hi
        ));
    }
    Ok(())
}
