// Linux-specific helpers: thermal zones under /sys/class/thermal.

/// Read `(zone type, °C)` for every thermal zone that reports a temperature (Linux).
pub(super) fn read_thermal_zones_linux() -> Vec<(String, f32)> {
    #[cfg(target_os = "linux")]
    {
        let Ok(entries) = std::fs::read_dir("/sys/class/thermal") else {
            return Vec::new();
        };
        let mut zones = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_zone = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("thermal_zone"));
            if !is_zone {
                continue;
            }
            let kind = std::fs::read_to_string(path.join("type")).unwrap_or_default();
            if let Ok(raw) = std::fs::read_to_string(path.join("temp"))
                && let Some(celsius) = parse_millidegrees(&raw)
            {
                zones.push((kind.trim().to_string(), celsius));
            }
        }
        zones
    }
    #[cfg(not(target_os = "linux"))]
    Vec::new()
}

/// Thermal zone files report millidegrees Celsius.
pub(super) fn parse_millidegrees(raw: &str) -> Option<f32> {
    let millis: i64 = raw.trim().parse().ok()?;
    Some(millis as f32 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_millidegrees() {
        assert_eq!(parse_millidegrees("45000\n"), Some(45.0));
        assert_eq!(parse_millidegrees("51500"), Some(51.5));
        assert_eq!(parse_millidegrees("n/a"), None);
    }
}
