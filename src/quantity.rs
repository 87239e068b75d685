//! Resource quantity parsing and rendering.
//!
//! CPU is accounted in millicores and memory in bytes. Rendering goes back to
//! the notation operators write in manifests (`20m`, `10Mi`) so messages can
//! be compared against the declared values at a glance.

use crate::error::{HygieneError, Result};
use regex::Regex;
use std::sync::LazyLock;

// ============================================================================
// CPU
// ============================================================================

/// Regex for CPU values (e.g., "100m", "1", "1.5", "250000n")
static CPU_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)(m|u|n)?$").unwrap());

/// Parse a CPU quantity to millicores.
///
/// # Examples
/// - "100m" -> 100
/// - "1" -> 1000
/// - "0.5" -> 500
/// - "500000000n" -> 500
pub fn parse_cpu(cpu: &str) -> Result<u64> {
    let invalid = || HygieneError::Quantity {
        kind: "cpu",
        value: cpu.to_string(),
    };

    let caps = CPU_REGEX.captures(cpu.trim()).ok_or_else(invalid)?;
    let value: f64 = caps[1].parse().map_err(|_| invalid())?;

    let millicores = match caps.get(2).map(|m| m.as_str()) {
        None => value * 1000.0,
        Some("m") => value,
        Some("u") => value / 1_000.0,
        Some("n") => value / 1_000_000.0,
        Some(_) => return Err(invalid()),
    };

    Ok(millicores.round() as u64)
}

/// Render millicores the way requests are usually written (e.g., "250m").
pub fn format_cpu(millicores: u64) -> String {
    format!("{}m", millicores)
}

// ============================================================================
// Memory
// ============================================================================

/// Regex for memory values (e.g., "128Mi", "1Gi", "1.5G", "1000000000")
static MEMORY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)(Ki|Mi|Gi|Ti|Pi|Ei|k|K|M|G|T|P|E)?$").unwrap()
});

/// Parse a memory quantity to bytes.
///
/// # Examples
/// - "128Mi" -> 134217728
/// - "1Gi" -> 1073741824
/// - "1k" -> 1000
pub fn parse_memory(memory: &str) -> Result<u64> {
    let invalid = || HygieneError::Quantity {
        kind: "memory",
        value: memory.to_string(),
    };

    let caps = MEMORY_REGEX.captures(memory.trim()).ok_or_else(invalid)?;
    let value: f64 = caps[1].parse().map_err(|_| invalid())?;

    let multiplier: f64 = match caps.get(2).map(|m| m.as_str()).unwrap_or("") {
        "" => 1.0,
        "Ki" => 1024.0,
        "Mi" => 1024.0_f64.powi(2),
        "Gi" => 1024.0_f64.powi(3),
        "Ti" => 1024.0_f64.powi(4),
        "Pi" => 1024.0_f64.powi(5),
        "Ei" => 1024.0_f64.powi(6),
        // Decimal units
        "k" | "K" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        _ => return Err(invalid()),
    };

    Ok((value * multiplier).round() as u64)
}

/// Binary units tried from the largest down, as `(suffix, shift)`.
const BINARY_UNITS: [(&str, u32); 4] = [("Ti", 40), ("Gi", 30), ("Mi", 20), ("Ki", 10)];

/// Render bytes in the largest binary unit that divides them exactly.
///
/// Amounts that no unit divides are shown in whole `Mi` (rounded down) once
/// they reach a mebibyte, as raw bytes below that.
///
/// # Examples
/// - 20971520 -> "20Mi"
/// - 62914660 (60Mi and 100 bytes) -> "60Mi"
/// - 512 -> "512"
pub fn format_memory(bytes: u64) -> String {
    let exact = BINARY_UNITS
        .iter()
        .find(|(_, shift)| bytes >> shift > 0 && bytes % (1u64 << shift) == 0);

    match exact {
        Some((suffix, shift)) => format!("{}{}", bytes >> shift, suffix),
        None if bytes >> 20 > 0 => format!("{}Mi", bytes >> 20),
        None => bytes.to_string(),
    }
}
