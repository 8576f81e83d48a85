//! Literal-substring placeholder expansion for the prompt-template file.
//!
//! Deliberately dumb: literal substring replacement for each `(key, value)`
//! pair, no escaping, no recursive expansion. This is the compatibility
//! surface for the shipped prompt file (see [`crate::config::Prompts`]).

/// Expand every `$KEY$`-style placeholder in `template` with its value.
///
/// Replacement is literal substring replacement, applied once per pair in
/// the order given. A value that itself contains a placeholder token is
/// not re-expanded (this function never loops back over its own output).
///
/// # Example
///
/// ```
/// use aioptim::prompt_template::render;
///
/// let out = render(
///     "Rewrite this $LANGUAGE$ method:\n$CODE$",
///     &[("$LANGUAGE$", "Python"), ("$CODE$", "def f(): pass")],
/// );
/// assert_eq!(out, "Rewrite this Python method:\ndef f(): pass");
/// ```
pub fn render(template: &str, replacements: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (key, value) in replacements {
        rendered = rendered.replace(key, value);
    }
    rendered
}
