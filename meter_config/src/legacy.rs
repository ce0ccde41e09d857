//! The original `Level_Meter.cfg` format: one `Key=Value` pair per line.
//!
//! Parsing is driven by [`LEGACY_KEYS`]: each known key names the typed config
//! field it feeds, the collected values are assembled into a TOML table and the
//! final `Config` comes out of serde, so defaults and types live in one place.

use crate::{Config, Loaded};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Int,
    Float,
    Text,
}

/// `(legacy key, section, field, value kind)`, in the order files are written.
const LEGACY_KEYS: &[(&str, &str, &str, Kind)] = &[
    ("Camera", "camera", "index", Kind::Int),
    ("Resolution", "camera", "resolution", Kind::Text),
    ("Distance_to_object", "geometry", "object_distance", Kind::Float),
    ("Tube_diameter", "geometry", "tube_diameter", Kind::Float),
    ("Line_Width", "display", "line_width", Kind::Int),
    ("Font_Size", "display", "font_size", Kind::Int),
    ("Canvas_Width", "display", "canvas_width", Kind::Int),
    ("Canvas_Height", "display", "canvas_height", Kind::Int),
    ("Percent_X", "roi", "percent_x", Kind::Int),
    ("Percent_Y", "roi", "percent_y", Kind::Int),
    ("Score_Threshold", "detector", "score_threshold", Kind::Float),
    ("Host", "output", "host", Kind::Text),
    ("Port", "output", "port", Kind::Int),
];

fn lookup(key: &str) -> Option<(&'static str, &'static str, Kind)> {
    LEGACY_KEYS
        .iter()
        .find(|(k, ..)| *k == key)
        .map(|&(_, section, field, kind)| (section, field, kind))
}

fn coerce(kind: Kind, raw: &str) -> Result<toml::Value, String> {
    match kind {
        Kind::Int => raw
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|e| format!("expected an integer, got {raw:?} ({e})")),
        Kind::Float => raw
            .parse::<f64>()
            .map(toml::Value::Float)
            .map_err(|e| format!("expected a number, got {raw:?} ({e})")),
        Kind::Text => Ok(toml::Value::String(raw.to_string())),
    }
}

/// Parse a legacy config. Blank lines and `#` comments are skipped; a later
/// occurrence of a key overrides an earlier one.
pub fn load_legacy(text: &str) -> eyre::Result<Loaded> {
    let mut root = toml::Table::new();
    let mut unknown_keys = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            eyre::bail!("line {lineno}: expected Key=Value, got {line:?}");
        };
        let (key, value) = (key.trim(), value.trim());
        if value.is_empty() {
            eyre::bail!("line {lineno}: {key} has an empty value");
        }
        let Some((section, field, kind)) = lookup(key) else {
            unknown_keys.push(key.to_string());
            continue;
        };
        let v = coerce(kind, value).map_err(|e| eyre::eyre!("line {lineno}: {key}: {e}"))?;
        let entry = root
            .entry(section.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if let toml::Value::Table(t) = entry {
            t.insert(field.to_string(), v);
        }
    }

    let config: Config = toml::Value::Table(root)
        .try_into()
        .map_err(|e| eyre::eyre!("invalid legacy config: {e}"))?;
    Ok(Loaded {
        config,
        unknown_keys,
        created: false,
    })
}

/// Render every schema key of `cfg` in legacy form.
pub fn to_legacy(cfg: &Config) -> eyre::Result<String> {
    let value = toml::Value::try_from(cfg).map_err(|e| eyre::eyre!("serialize config: {e}"))?;
    let mut out = String::new();
    for (key, section, field, _) in LEGACY_KEYS {
        let v = value
            .get(section)
            .and_then(|s| s.get(field))
            .ok_or_else(|| eyre::eyre!("config has no {section}.{field}"))?;
        let rendered = match v {
            toml::Value::String(s) => s.clone(),
            toml::Value::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            other => other.to_string(),
        };
        out.push_str(key);
        out.push('=');
        out.push_str(&rendered);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_targets_a_distinct_field() {
        for (i, a) in LEGACY_KEYS.iter().enumerate() {
            for b in &LEGACY_KEYS[i + 1..] {
                assert_ne!(a.0, b.0);
                assert!((a.1, a.2) != (b.1, b.2), "{} and {} collide", a.0, b.0);
            }
        }
    }

    #[test]
    fn floats_render_like_the_original_integers() {
        let text = to_legacy(&Config::default()).unwrap();
        assert!(text.contains("Distance_to_object=200\n"));
        assert!(text.contains("Tube_diameter=6\n"));
        assert!(text.contains("Score_Threshold=0.2"));
    }
}
