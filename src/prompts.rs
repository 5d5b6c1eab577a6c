//! Prompt templates and the prompt builder for map-reduce summarisation.
//!
//! Every built-in prompt lives here so changing summarisation behaviour means
//! editing exactly one place, and tests can inspect the prompts without a
//! model.
//!
//! Templates carry two placeholders: `{text}` (the page text or the joined
//! page summaries) and `{max_words}` (the word ceiling). Callers can replace
//! the built-ins through [`crate::config::RunConfig::map_template`] and
//! [`crate::config::RunConfig::reduce_template`].

use crate::error::TemplateError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// System message used when the run does not supply a custom one.
pub const DEFAULT_SYS_MESSAGE: &str = "You are a helpful assistant that writes accurate, \
well-structured summaries of documents. You only use information present in the text \
you are given.";

/// Map step: summarise the text of a single page.
pub const SUMMARY_PROMPT_TPL: &str = r#"Write a concise summary of the following text delimited by triple backquotes.
Capture the key points, figures and conclusions. Do not add information that is not in the text.
Use at most {max_words} words.

```{text}```

SUMMARY:"#;

/// Reduce step: merge consecutive page summaries into one final summary.
pub const REDUCE_SUMMARY_PROMPT_TPL: &str = r#"The following text delimited by triple backquotes is a series of summaries of consecutive pages of one document.
Combine them into a single, coherent summary of the whole document. Remove repetition, keep the original order of ideas and preserve important details.
Use at most {max_words} words.

```{text}```

FINAL SUMMARY:"#;

const TEXT_PLACEHOLDER: &str = "{text}";
const MAX_WORDS_PLACEHOLDER: &str = "{max_words}";

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(text|max_words)\}").unwrap());

/// Fail with [`TemplateError`] unless `template` has both placeholders.
pub fn check_template(template: &str) -> Result<(), TemplateError> {
    if !template.contains(TEXT_PLACEHOLDER) {
        return Err(TemplateError::MissingPlaceholder {
            placeholder: "text",
        });
    }
    if !template.contains(MAX_WORDS_PLACEHOLDER) {
        return Err(TemplateError::MissingPlaceholder {
            placeholder: "max_words",
        });
    }
    Ok(())
}

/// Render `template` with `text` and `max_words` substituted.
///
/// Substitution is a single pass over the template, so placeholder-like
/// sequences inside `text` are left untouched. The resulting prompt is not
/// checked against any model context limit.
pub fn build_prompt(template: &str, text: &str, max_words: u32) -> Result<String, TemplateError> {
    check_template(template)?;
    let words = max_words.to_string();
    let rendered = PLACEHOLDER_RE.replace_all(template, |caps: &Captures<'_>| {
        match &caps[1] {
            "text" => text.to_string(),
            _ => words.clone(),
        }
    });
    Ok(rendered.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_templates_are_valid() {
        assert!(check_template(SUMMARY_PROMPT_TPL).is_ok());
        assert!(check_template(REDUCE_SUMMARY_PROMPT_TPL).is_ok());
    }

    #[test]
    fn substitutes_both_placeholders() {
        let p = build_prompt("Summarise in {max_words} words: {text}", "hello", 42).unwrap();
        assert_eq!(p, "Summarise in 42 words: hello");
    }

    #[test]
    fn substitutes_every_occurrence() {
        let p = build_prompt("{text}|{text} ({max_words}/{max_words})", "x", 7).unwrap();
        assert_eq!(p, "x|x (7/7)");
    }

    #[test]
    fn text_is_not_resubstituted() {
        let p = build_prompt("{max_words}: {text}", "a {max_words} b {text}", 9).unwrap();
        assert_eq!(p, "9: a {max_words} b {text}");
    }

    #[test]
    fn other_braces_are_left_alone() {
        let p = build_prompt("{\"json\": 1} {text} {max_words} {other}", "t", 1).unwrap();
        assert_eq!(p, "{\"json\": 1} t 1 {other}");
    }

    #[test]
    fn missing_text_placeholder() {
        assert_eq!(
            build_prompt("Use {max_words} words.", "t", 10),
            Err(TemplateError::MissingPlaceholder {
                placeholder: "text"
            })
        );
    }

    #[test]
    fn missing_max_words_placeholder() {
        assert_eq!(
            build_prompt("Summarise {text}", "t", 10),
            Err(TemplateError::MissingPlaceholder {
                placeholder: "max_words"
            })
        );
    }

    #[test]
    fn build_is_deterministic() {
        let a = build_prompt(SUMMARY_PROMPT_TPL, "Some page text.", 150).unwrap();
        let b = build_prompt(SUMMARY_PROMPT_TPL, "Some page text.", 150).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("at most 150 words"));
        assert!(a.contains("```Some page text.```"));
    }
}
