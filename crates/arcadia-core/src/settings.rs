//! Player-facing settings forwarded into running programs.
//!
//! Catalog programs get [`LISTENER_SCRIPT`] appended so they react to
//! `SETTING_CHANGE` messages. Generated programs are left untouched and may
//! or may not listen.

/// Visual intensity in `0.0..=1.0`; drives a brightness/saturation filter.
pub const NEON_INTENSITY: &str = "neonIntensity";
/// Input sensitivity multiplier read by games from `window.gameSettings`.
pub const SENSITIVITY: &str = "sensitivity";

/// Keys the bundled listener script knows how to apply.
pub const KNOWN_KEYS: &[&str] = &[NEON_INTENSITY, SENSITIVITY];

/// Stores every setting in `window.gameSettings` and applies `neonIntensity`
/// directly as a CSS filter on the document body.
pub const LISTENER_SCRIPT: &str = r#"<script>
window.addEventListener('message', function (event) {
    var data = event.data;
    if (!data || data.type !== 'SETTING_CHANGE') return;
    if (data.key === 'neonIntensity') {
        document.body.style.filter = 'brightness(' + (0.8 + data.value * 0.4) + ') saturate(' + (1.2 + data.value * 0.8) + ')';
    }
    window.gameSettings = window.gameSettings || {};
    window.gameSettings[data.key] = data.value;
});
</script>"#;

/// Insert the listener script into a program's markup.
///
/// Placed before the last `</body>` when present, otherwise appended. Empty
/// programs stay empty so they still render as a blank region.
pub fn with_settings_listener(program: &str) -> String {
    if program.trim().is_empty() {
        return program.to_string();
    }
    match rfind_ascii_ci(program, "</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(program.len() + LISTENER_SCRIPT.len() + 1);
            out.push_str(&program[..idx]);
            out.push_str(LISTENER_SCRIPT);
            out.push('\n');
            out.push_str(&program[idx..]);
            out
        },
        None => format!("{program}\n{LISTENER_SCRIPT}"),
    }
}

fn rfind_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().rfind(needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_before_closing_body() {
        let html = "<html><body><canvas></canvas></body></html>";
        let out = with_settings_listener(html);
        let script_at = out.find("<script>").unwrap();
        let body_close = out.rfind("</body>").unwrap();
        assert!(script_at < body_close);
        assert!(out.starts_with("<html><body><canvas></canvas>"));
        assert!(out.ends_with("</body></html>"));
    }

    #[test]
    fn closing_tag_match_ignores_case() {
        let out = with_settings_listener("<BODY>x</BODY>");
        assert!(out.find("SETTING_CHANGE").unwrap() < out.find("</BODY>").unwrap());
    }

    #[test]
    fn appends_when_no_body_tag() {
        let out = with_settings_listener("<canvas></canvas>");
        assert!(out.starts_with("<canvas></canvas>\n<script>"));
    }

    #[test]
    fn empty_program_stays_empty() {
        assert_eq!(with_settings_listener(""), "");
        assert_eq!(with_settings_listener("  "), "  ");
    }

    #[test]
    fn script_applies_intensity_and_stores_the_rest() {
        assert!(LISTENER_SCRIPT.contains(&format!("'{NEON_INTENSITY}'")));
        assert!(LISTENER_SCRIPT.contains("window.gameSettings[data.key]"));
    }
}
