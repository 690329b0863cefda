//! Human-readable byte sizes.

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

/// Formats `bytes` with binary units and two decimals.
///
/// ```
/// use rangefetch_core::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// assert_eq!(format_size(2 * 1024 * 1024), "2.00 MB");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    let value = bytes as f64;
    if bytes >= GIB {
        format!("{:.2} GB", value / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MB", value / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KB", value / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_unit_boundaries() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(MIB - 1), "1024.00 KB");
        assert_eq!(format_size(MIB), "1.00 MB");
        assert_eq!(format_size(GIB + GIB / 4), "1.25 GB");
    }
}
