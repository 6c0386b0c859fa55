use regex::Regex;
use std::sync::LazyLock;

/// Marker the model emits when the story is finished.
pub const END_SENTINEL: &str = "END";

static TITLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\*\*Title\*\*:.*$").expect("valid title regex"));

static CONTINUE_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)Type ['"‘’“”`]?Continue['"‘’“”`]? to receive the next part\.?"#)
        .expect("valid continue regex")
});

/// Fills the first `{TITLE}` and the first `{LANGUAGE}` of a template.
pub fn render_template(template: &str, title: &str, language: &str) -> String {
    template
        .replacen("{TITLE}", title, 1)
        .replacen("{LANGUAGE}", language, 1)
}

/// Removes the first end marker. Returns whether one was present.
///
/// This is a plain substring match, so a part that happens to contain
/// "END" inside a word or sentence ends the story too.
pub fn take_end_sentinel(text: &str) -> (String, bool) {
    if text.contains(END_SENTINEL) {
        (text.replacen(END_SENTINEL, "", 1), true)
    } else {
        (text.to_string(), false)
    }
}

/// Strips prompt artifacts from a generated part.
pub fn clean_part(text: &str) -> String {
    let text = TITLE_LINE.replace_all(text, "");
    let text = text.replace("{LANGUAGE}", "");
    let text = CONTINUE_HINT.replace_all(&text, "");
    text.trim().to_string()
}

/// Text handed to the speech engine: no markdown emphasis, straight and
/// curly quotes folded to an apostrophe.
pub fn narration_text(story: &str) -> String {
    story.replace('*', "").replace(['"', '“', '”', '‘', '’'], "'")
}
